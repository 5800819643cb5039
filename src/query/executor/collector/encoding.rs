//! 分组键编码
//!
//! 同一收集器值域内，`EncodedKey` 的有符号比较顺序必须与值的自然顺序一致。
//! 负浮点数的 IEEE-754 位模式顺序与数值顺序相反，因此编码时去掉符号位后取负。

use crate::core::FieldType;

/// 收集阶段的 64 位分组键，整个 i64 值域都是合法键
pub type EncodedKey = i64;

const FLOAT_SIGN_BIT: u32 = 0x8000_0000;
const FLOAT_MAGNITUDE_MASK: u32 = 0x7FFF_FFFF;
const DOUBLE_SIGN_BIT: u64 = 0x8000_0000_0000_0000;
const DOUBLE_MAGNITUDE_MASK: u64 = 0x7FFF_FFFF_FFFF_FFFF;

/// 32 位浮点位模式 -> 有序键
pub fn encode_float_bits(bits: u32) -> EncodedKey {
    if bits & FLOAT_SIGN_BIT != 0 {
        -i64::from(bits & FLOAT_MAGNITUDE_MASK)
    } else {
        i64::from(bits)
    }
}

pub fn decode_float_bits(key: EncodedKey) -> u32 {
    if key < 0 {
        ((-key) as u32) | FLOAT_SIGN_BIT
    } else {
        key as u32
    }
}

pub fn encode_float(value: f32) -> EncodedKey {
    encode_float_bits(value.to_bits())
}

pub fn decode_float(key: EncodedKey) -> f32 {
    f32::from_bits(decode_float_bits(key))
}

/// 64 位浮点位模式 -> 有序键
pub fn encode_double_bits(bits: u64) -> EncodedKey {
    if bits & DOUBLE_SIGN_BIT != 0 {
        -((bits & DOUBLE_MAGNITUDE_MASK) as i64)
    } else {
        bits as i64
    }
}

pub fn decode_double_bits(key: EncodedKey) -> u64 {
    if key < 0 {
        (key.unsigned_abs()) | DOUBLE_SIGN_BIT
    } else {
        key as u64
    }
}

pub fn encode_double(value: f64) -> EncodedKey {
    encode_double_bits(value.to_bits())
}

pub fn decode_double(key: EncodedKey) -> f64 {
    f64::from_bits(decode_double_bits(key))
}

/// 将搜索器读出的原始值解释为数值
///
/// 非数值类型返回 `None`
pub fn raw_to_f64(field_type: FieldType, raw: i64) -> Option<f64> {
    match field_type {
        FieldType::Boolean | FieldType::Integer | FieldType::Long | FieldType::Date => {
            Some(raw as f64)
        }
        FieldType::Float => Some(f64::from(f32::from_bits(raw as u32))),
        FieldType::Double => Some(f64::from_bits(raw as u64)),
        FieldType::Text | FieldType::Link => None,
    }
}
