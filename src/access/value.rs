use crate::access::record::Record;
use crate::edm::{PrimitiveKind, TypeKey};
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::ser::{Error as _, SerializeSeq};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

/// An enum value, carried as its underlying integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    pub type_key: TypeKey,
    pub value: i64,
}

impl EnumValue {
    pub fn new(type_key: TypeKey, value: i64) -> Self {
        Self { type_key, value }
    }

    /// True when every flag set in `flags` is also set here
    pub fn has(&self, flags: &EnumValue) -> bool {
        self.type_key == flags.type_key && self.value & flags.value == flags.value
    }
}

/// Values a record field or a literal can hold
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Binary(Bytes),
    Date(NaiveDate),
    DateTimeOffset(DateTime<FixedOffset>),
    TimeOfDay(NaiveTime),
    Duration(chrono::Duration),
    Guid(Uuid),
    Enum(EnumValue),
    Record(Arc<dyn Record>),
    Collection(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The primitive kind of this value, if it is a primitive
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Value::Boolean(_) => PrimitiveKind::Boolean,
            Value::Byte(_) => PrimitiveKind::Byte,
            Value::SByte(_) => PrimitiveKind::SByte,
            Value::Int16(_) => PrimitiveKind::Int16,
            Value::Int32(_) => PrimitiveKind::Int32,
            Value::Int64(_) => PrimitiveKind::Int64,
            Value::Single(_) => PrimitiveKind::Single,
            Value::Double(_) => PrimitiveKind::Double,
            Value::Decimal(_) => PrimitiveKind::Decimal,
            Value::String(_) => PrimitiveKind::String,
            Value::Binary(_) => PrimitiveKind::Binary,
            Value::Date(_) => PrimitiveKind::Date,
            Value::DateTimeOffset(_) => PrimitiveKind::DateTimeOffset,
            Value::TimeOfDay(_) => PrimitiveKind::TimeOfDay,
            Value::Duration(_) => PrimitiveKind::Duration,
            Value::Guid(_) => PrimitiveKind::Guid,
            Value::Null | Value::Enum(_) | Value::Record(_) | Value::Collection(_) => {
                return None
            }
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integral values widened to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::SByte(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Integral and decimal values as an exact decimal
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            other => other.as_i64().map(Decimal::from),
        }
    }

    /// Any numeric value as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Single(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Decimal(d) => d.to_f64(),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn is_integral(&self) -> bool {
        self.as_i64().is_some()
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Value::Single(_) | Value::Double(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_floating() || matches!(self, Value::Decimal(_))
    }

    /// Order two non-null values, promoting numerics to a common representation.
    ///
    /// Returns `None` when the values are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if self.is_numeric() && other.is_numeric() {
            if let (Some(a), Some(b)) = (self.as_i64(), other.as_i64()) {
                return Some(a.cmp(&b));
            }
            if !self.is_floating() && !other.is_floating() {
                return Some(self.as_decimal()?.cmp(&other.as_decimal()?));
            }
            return self.as_f64()?.partial_cmp(&other.as_f64()?);
        }

        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTimeOffset(a), Value::DateTimeOffset(b)) => Some(a.cmp(b)),
            (Value::TimeOfDay(a), Value::TimeOfDay(b)) => Some(a.cmp(b)),
            (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
            (Value::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
            (Value::Enum(a), Value::Enum(b)) if a.type_key == b.type_key => {
                Some(a.value.cmp(&b.value))
            }
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Record(a), Value::Record(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Collection(a), Value::Collection(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Single(a), Value::Single(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (a, b) if a.primitive_kind().is_some() && a.primitive_kind() == b.primitive_kind() => {
                a.compare(b) == Some(Ordering::Equal)
            }
            _ => false,
        }
    }
}

/// ISO 8601 text of a duration, e.g. `P1DT2H30M` or `-PT0.5S`
pub fn format_duration(duration: &chrono::Duration) -> String {
    let negative = *duration < chrono::Duration::zero();
    let duration = if negative { -*duration } else { *duration };

    let days = duration.num_days();
    let hours = duration.num_hours() % 24;
    let minutes = duration.num_minutes() % 60;
    let seconds = duration.num_seconds() % 60;
    let nanos = duration.subsec_nanos();

    let mut text = String::from(if negative { "-P" } else { "P" });
    if days > 0 {
        text.push_str(&format!("{}D", days));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || nanos > 0 || days == 0 {
        text.push('T');
        if hours > 0 {
            text.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            text.push_str(&format!("{}M", minutes));
        }
        if seconds > 0 || nanos > 0 || (hours == 0 && minutes == 0) {
            if nanos > 0 {
                let fraction = format!("{:09}", nanos);
                text.push_str(&format!("{}.{}S", seconds, fraction.trim_end_matches('0')));
            } else {
                text.push_str(&format!("{}S", seconds));
            }
        }
    }
    text
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Byte(v) => serializer.serialize_u8(*v),
            Value::SByte(v) => serializer.serialize_i8(*v),
            Value::Int16(v) => serializer.serialize_i16(*v),
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::Single(v) => serializer.serialize_f32(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            // Decimals keep their exact text
            Value::Decimal(d) => serializer.serialize_str(&d.to_string()),
            Value::String(s) => serializer.serialize_str(s),
            Value::Binary(b) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
            Value::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            Value::DateTimeOffset(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            Value::TimeOfDay(t) => serializer.serialize_str(&t.format("%H:%M:%S%.f").to_string()),
            Value::Duration(d) => serializer.serialize_str(&format_duration(d)),
            Value::Guid(g) => serializer.serialize_str(&g.to_string()),
            Value::Enum(e) => serializer.serialize_i64(e.value),
            Value::Collection(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(record) => Err(S::Error::custom(format!(
                "record of type '{}' must be projected before serialization",
                record.type_key().host_name()
            ))),
        }
    }
}

macro_rules! value_from {
    ($($host:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$host> for Value {
                fn from(value: $host) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    u8 => Byte,
    i8 => SByte,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Single,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Bytes => Binary,
    NaiveDate => Date,
    DateTime<FixedOffset> => DateTimeOffset,
    NaiveTime => TimeOfDay,
    chrono::Duration => Duration,
    Uuid => Guid,
    EnumValue => Enum,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<R: Record + 'static> From<Arc<R>> for Value {
    fn from(record: Arc<R>) -> Self {
        Value::Record(record)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Collection(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_numeric_comparison_promotes() {
        assert_eq!(Value::Int32(5).compare(&Value::Int64(5)), Some(Ordering::Equal));
        assert_eq!(
            Value::Decimal(Decimal::from_str("469.01").unwrap()).compare(&Value::Int32(469)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Double(2.5).compare(&Value::Int16(3)), Some(Ordering::Less));
        assert_eq!(
            Value::Byte(1).compare(&Value::Decimal(Decimal::ONE)),
            Some(Ordering::Equal)
        );
        assert_eq!(Value::String("a".into()).compare(&Value::Int32(1)), None);
    }

    #[test]
    fn test_equality() {
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::from("iPhone"), Value::String("iPhone".to_string()));
        assert_ne!(Value::Int32(1), Value::Int64(1));
        assert_eq!(Value::from(Some(3i64)), Value::Int64(3));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(
            Value::from(vec![1i32, 2]),
            Value::Collection(vec![Value::Int32(1), Value::Int32(2)])
        );
    }

    #[test]
    fn test_enum_has() {
        struct Colour;
        let key = TypeKey::of::<Colour>();
        let value = EnumValue::new(key, 5);
        assert!(value.has(&EnumValue::new(key, 1)));
        assert!(value.has(&EnumValue::new(key, 4)));
        assert!(!value.has(&EnumValue::new(key, 2)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(
            format_duration(&(chrono::Duration::days(1) + chrono::Duration::hours(2))),
            "P1DT2H"
        );
        assert_eq!(format_duration(&chrono::Duration::minutes(90)), "PT1H30M");
        assert_eq!(format_duration(&chrono::Duration::zero()), "PT0S");
        assert_eq!(format_duration(&chrono::Duration::milliseconds(-500)), "-PT0.5S");
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(Value::Collection(vec![
            Value::Decimal(Decimal::from_str("2.50").unwrap()),
            Value::Date(NaiveDate::from_ymd_opt(2000, 12, 18).unwrap()),
            Value::Binary(Bytes::from_static(b"hi")),
            Value::Null,
        ]))
        .unwrap();
        assert_eq!(json, serde_json::json!(["2.50", "2000-12-18", "aGk=", null]));
    }
}
