//! 日期收集器
//!
//! 日期以 epoch 毫秒存储，按 UTC 截断或分解为子字段

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};

use super::encoding::EncodedKey;
use super::{CollectContext, KeyCollector, KeySet};
use crate::core::error::{DBError, DBResult};
use crate::core::DocId;
use crate::query::executor::group_tree::GroupKey;
use crate::query::request::{DateSubField, DateUnit};
use crate::storage::ShardSearcher;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}

fn date_start_millis(date: NaiveDate) -> Option<i64> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// 将时间戳截断到指定单位的起点
pub fn truncate(millis: i64, unit: DateUnit) -> Option<i64> {
    const SECOND: i64 = 1_000;
    const MINUTE: i64 = 60 * SECOND;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    match unit {
        DateUnit::Second => Some(millis.div_euclid(SECOND) * SECOND),
        DateUnit::Minute => Some(millis.div_euclid(MINUTE) * MINUTE),
        DateUnit::Hour => Some(millis.div_euclid(HOUR) * HOUR),
        DateUnit::Day => Some(millis.div_euclid(DAY) * DAY),
        DateUnit::Week => {
            let date = to_datetime(millis)?.date_naive();
            let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
            date_start_millis(monday)
        }
        DateUnit::Month => {
            let date = to_datetime(millis)?.date_naive();
            date_start_millis(NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?)
        }
        DateUnit::Quarter => {
            let date = to_datetime(millis)?.date_naive();
            let month = (date.month() - 1) / 3 * 3 + 1;
            date_start_millis(NaiveDate::from_ymd_opt(date.year(), month, 1)?)
        }
        DateUnit::Year => {
            let date = to_datetime(millis)?.date_naive();
            date_start_millis(NaiveDate::from_ymd_opt(date.year(), 1, 1)?)
        }
    }
}

/// 按截断单位格式化
pub fn format_truncated(millis: i64, unit: Option<DateUnit>) -> Option<String> {
    let dt = to_datetime(millis)?;
    let text = match unit {
        None => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        Some(DateUnit::Second) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        Some(DateUnit::Minute) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Some(DateUnit::Hour) => dt.format("%Y-%m-%d %H:00").to_string(),
        Some(DateUnit::Day) | Some(DateUnit::Week) => dt.format("%Y-%m-%d").to_string(),
        Some(DateUnit::Month) => dt.format("%Y-%m").to_string(),
        Some(DateUnit::Quarter) => format!("{}-Q{}", dt.year(), (dt.month() - 1) / 3 + 1),
        Some(DateUnit::Year) => dt.format("%Y").to_string(),
    };
    Some(text)
}

fn invalid_date(key: EncodedKey) -> DBError {
    DBError::Internal(format!("无法解析的日期键: {}", key))
}

/// 可选截断的日期收集器，键为截断后的毫秒
#[derive(Debug)]
pub struct DateCollector {
    field: String,
    unit: Option<DateUnit>,
    multi_valued: bool,
}

impl DateCollector {
    pub fn new(field: impl Into<String>, unit: Option<DateUnit>, multi_valued: bool) -> Self {
        Self {
            field: field.into(),
            unit,
            multi_valued,
        }
    }
}

impl KeyCollector for DateCollector {
    fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        let values = ctx.read_values(&self.field, doc)?;
        let take = if self.multi_valued { values.len() } else { 1 };
        for &millis in values.iter().take(take) {
            let key = match self.unit {
                Some(unit) => truncate(millis, unit),
                None => Some(millis),
            };
            if let Some(key) = key {
                out.insert(key);
            }
        }
        ctx.release_values(values);
        Ok(())
    }

    fn resolve(&self, _searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey> {
        let display = format_truncated(key, self.unit).ok_or_else(|| invalid_date(key))?;
        Ok(GroupKey::numeric(display, key))
    }
}

/// 日期子字段收集器，键为子字段整数值
#[derive(Debug)]
pub struct DateSubFieldCollector {
    field: String,
    sub_field: DateSubField,
    multi_valued: bool,
}

impl DateSubFieldCollector {
    pub fn new(field: impl Into<String>, sub_field: DateSubField, multi_valued: bool) -> Self {
        Self {
            field: field.into(),
            sub_field,
            multi_valued,
        }
    }

    fn extract(&self, millis: i64) -> Option<i64> {
        let dt = to_datetime(millis)?;
        let value = match self.sub_field {
            DateSubField::Minute => i64::from(dt.minute()),
            DateSubField::Hour => i64::from(dt.hour()),
            DateSubField::Day => i64::from(dt.day()),
            DateSubField::Month => i64::from(dt.month()),
            DateSubField::Year => i64::from(dt.year()),
        };
        Some(value)
    }
}

impl KeyCollector for DateSubFieldCollector {
    fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        let values = ctx.read_values(&self.field, doc)?;
        let take = if self.multi_valued { values.len() } else { 1 };
        for &millis in values.iter().take(take) {
            if let Some(key) = self.extract(millis) {
                out.insert(key);
            }
        }
        ctx.release_values(values);
        Ok(())
    }

    fn resolve(&self, _searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey> {
        let display = match self.sub_field {
            DateSubField::Month => usize::try_from(key - 1)
                .ok()
                .and_then(|i| MONTH_NAMES.get(i))
                .map(|name| name.to_string())
                .ok_or_else(|| invalid_date(key))?,
            _ => key.to_string(),
        };
        Ok(GroupKey::numeric(display, key))
    }
}
