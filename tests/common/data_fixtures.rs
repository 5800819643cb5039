//! 测试数据构造

use chrono::NaiveDate;
use pivotdb::core::{FieldInfo, FieldType, ShardId};
use pivotdb::storage::{MemoryColumnStore, MemoryShard};

/// 一个布尔字段 `flag` 的分片
pub fn flag_shard(id: ShardId, values: &[bool]) -> MemoryShard {
    let mut shard = MemoryShard::new(id);
    shard.define_field("flag", FieldInfo::single(FieldType::Boolean));
    for (i, &v) in values.iter().enumerate() {
        let doc = shard.add_doc(format!("doc-{}-{}", id, i));
        shard.set_bools(doc, "flag", &[v]).expect("写入布尔值失败");
    }
    shard
}

pub fn epoch_millis(y: i32, m: u32, d: u32) -> i64 {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .expect("无效日期")
}

/// 商品记录
pub struct Product {
    pub name: &'static str,
    pub category: &'static str,
    pub tags: &'static [&'static str],
    pub price: f64,
    pub stock: i64,
    pub listed: i64,
}

pub fn products() -> Vec<Product> {
    vec![
        Product {
            name: "Red Apple",
            category: "fruit",
            tags: &["fresh", "red"],
            price: 1.5,
            stock: 40,
            listed: epoch_millis(2024, 1, 15),
        },
        Product {
            name: "Green Apple",
            category: "fruit",
            tags: &["fresh", "green"],
            price: 1.2,
            stock: 25,
            listed: epoch_millis(2024, 2, 3),
        },
        Product {
            name: "Banana",
            category: "fruit",
            tags: &["fresh"],
            price: 0.5,
            stock: 100,
            listed: epoch_millis(2024, 2, 20),
        },
        Product {
            name: "Cheddar",
            category: "dairy",
            tags: &["aged"],
            price: 7.0,
            stock: 12,
            listed: epoch_millis(2024, 4, 1),
        },
        Product {
            name: "Milk",
            category: "dairy",
            tags: &[],
            price: 0.99,
            stock: 60,
            listed: epoch_millis(2024, 4, 9),
        },
        Product {
            name: "Sourdough Bread",
            category: "bakery",
            tags: &["fresh", "aged"],
            price: 4.25,
            stock: 8,
            listed: epoch_millis(2024, 7, 30),
        },
    ]
}

fn define_product_fields(shard: &mut MemoryShard) {
    shard
        .define_field("name", FieldInfo::single(FieldType::Text))
        .define_field("category", FieldInfo::single(FieldType::Text))
        .define_field("tags", FieldInfo::multi(FieldType::Text))
        .define_field("price", FieldInfo::single(FieldType::Double))
        .define_field("stock", FieldInfo::single(FieldType::Long))
        .define_field("listed", FieldInfo::single(FieldType::Date));
}

pub fn product_shard(id: ShardId, items: &[Product]) -> MemoryShard {
    let mut shard = MemoryShard::new(id);
    define_product_fields(&mut shard);
    for item in items {
        let doc = shard.add_doc(item.name);
        shard.set_texts(doc, "name", &[item.name]).expect("写入失败");
        shard.set_texts(doc, "category", &[item.category]).expect("写入失败");
        shard.set_texts(doc, "tags", item.tags).expect("写入失败");
        shard.set_doubles(doc, "price", &[item.price]).expect("写入失败");
        shard.set_longs(doc, "stock", &[item.stock]).expect("写入失败");
        shard.set_dates(doc, "listed", &[item.listed]).expect("写入失败");
    }
    shard
}

/// 按轮转方式把商品分散到 `shards` 个分片
pub fn product_store(shards: u32) -> MemoryColumnStore {
    let store = MemoryColumnStore::new();
    let all = products();
    let mut buckets: Vec<Vec<Product>> = (0..shards).map(|_| Vec::new()).collect();
    for (i, product) in all.into_iter().enumerate() {
        buckets[i % shards as usize].push(product);
    }
    for (id, items) in buckets.iter().enumerate() {
        store.add_shard(product_shard(id as ShardId, items));
    }
    store
}

/// 组织结构：员工 -> 经理（传递关系），员工 -> 部门
///
/// ```text
/// ceo <- vp <- lead <- dev1, dev2
///              lead <- qa
/// ```
pub fn org_shard() -> MemoryShard {
    let mut shard = MemoryShard::new(0);
    shard
        .define_field("manager", FieldInfo::single(FieldType::Link))
        .define_field("department", FieldInfo::single(FieldType::Link))
        .define_field("title", FieldInfo::single(FieldType::Text))
        .define_field("dept_name", FieldInfo::single(FieldType::Text));

    let eng = shard.add_doc("engineering");
    let ops = shard.add_doc("operations");
    shard.set_texts(eng, "dept_name", &["Engineering"]).expect("写入失败");
    shard.set_texts(ops, "dept_name", &["Operations"]).expect("写入失败");

    let ceo = shard.add_doc("ceo");
    let vp = shard.add_doc("vp");
    let lead = shard.add_doc("lead");
    let dev1 = shard.add_doc("dev1");
    let dev2 = shard.add_doc("dev2");
    let qa = shard.add_doc("qa");

    for (doc, title) in [
        (ceo, "Chief"),
        (vp, "Vice President"),
        (lead, "Lead"),
        (dev1, "Engineer"),
        (dev2, "Engineer"),
        (qa, "Tester"),
    ] {
        shard.set_texts(doc, "title", &[title]).expect("写入失败");
    }
    for (doc, manager) in [(vp, ceo), (lead, vp), (dev1, lead), (dev2, lead), (qa, lead)] {
        shard.set_links(doc, "manager", &[manager]).expect("写入失败");
    }
    for (doc, dept) in [(ceo, ops), (vp, eng), (lead, eng), (dev1, eng), (dev2, eng), (qa, ops)] {
        shard.set_links(doc, "department", &[dept]).expect("写入失败");
    }
    shard.define_query("people".into(), [ceo, vp, lead, dev1, dev2, qa]);
    shard.define_query("engineers".into(), [dev1, dev2]);
    shard
}
