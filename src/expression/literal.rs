//! Literal constants and the rules that turn literal text into typed values.

use crate::access::{EnumValue, Value};
use crate::edm::{EdmModel, EdmType, PrimitiveKind};
use crate::error::{ODataError, Result};
use crate::filter::token::TokenKind;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// A literal in an expression tree.
///
/// Keeps the literal text exactly as written next to its typed value.
#[derive(Debug, PartialEq)]
pub struct ConstantNode {
    /// `None` for the `null` literal, which has no type of its own
    edm_type: Option<EdmType>,
    literal_text: String,
    value: Value,
}

static TRUE: Lazy<Arc<ConstantNode>> =
    Lazy::new(|| ConstantNode::primitive(PrimitiveKind::Boolean, "true", Value::Boolean(true)));
static FALSE: Lazy<Arc<ConstantNode>> =
    Lazy::new(|| ConstantNode::primitive(PrimitiveKind::Boolean, "false", Value::Boolean(false)));
static NULL: Lazy<Arc<ConstantNode>> = Lazy::new(|| {
    Arc::new(ConstantNode {
        edm_type: None,
        literal_text: "null".to_string(),
        value: Value::Null,
    })
});
static INT32_ZERO: Lazy<Arc<ConstantNode>> =
    Lazy::new(|| ConstantNode::primitive(PrimitiveKind::Int32, "0", Value::Int32(0)));
static INT64_ZERO: Lazy<Arc<ConstantNode>> =
    Lazy::new(|| ConstantNode::primitive(PrimitiveKind::Int64, "0L", Value::Int64(0)));

impl ConstantNode {
    fn primitive(kind: PrimitiveKind, text: &str, value: Value) -> Arc<Self> {
        Arc::new(ConstantNode {
            edm_type: Some(EdmType::Primitive(kind)),
            literal_text: text.to_string(),
            value,
        })
    }

    pub fn boolean(value: bool) -> Arc<Self> {
        if value {
            TRUE.clone()
        } else {
            FALSE.clone()
        }
    }

    pub fn null() -> Arc<Self> {
        NULL.clone()
    }

    pub fn int32_zero() -> Arc<Self> {
        INT32_ZERO.clone()
    }

    pub fn int64_zero() -> Arc<Self> {
        INT64_ZERO.clone()
    }

    pub fn edm_type(&self) -> Option<&EdmType> {
        self.edm_type.as_ref()
    }

    pub fn literal_text(&self) -> &str {
        &self.literal_text
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Build a constant from a literal token.
    ///
    /// Enum literals are looked up in `model` by the type's full name.
    pub fn parse(kind: TokenKind, text: &str, model: &EdmModel) -> Result<Arc<Self>> {
        let invalid = |what: &str| {
            ODataError::syntax(format!("The literal '{}' is not a valid {}", text, what))
                .with_target(text)
        };

        let (kind, value) = match kind {
            TokenKind::Boolean => match text {
                "true" => return Ok(Self::boolean(true)),
                "false" => return Ok(Self::boolean(false)),
                _ => return Err(invalid("boolean")),
            },
            TokenKind::Null => return Ok(Self::null()),
            TokenKind::Integer => return Self::parse_integer(text),
            TokenKind::Decimal => {
                let digits = text.trim_end_matches(['m', 'M']);
                let value = Decimal::from_str(digits).map_err(|_| invalid("decimal"))?;
                (PrimitiveKind::Decimal, Value::Decimal(value))
            }
            TokenKind::Double => {
                let digits = text.trim_end_matches(['d', 'D']);
                let value = f64::from_str(digits).map_err(|_| invalid("double"))?;
                (PrimitiveKind::Double, Value::Double(value))
            }
            TokenKind::Single => {
                let digits = text.trim_end_matches(['f', 'F']);
                let value = f32::from_str(digits).map_err(|_| invalid("single"))?;
                (PrimitiveKind::Single, Value::Single(value))
            }
            TokenKind::Date => {
                let value =
                    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid("date"))?;
                (PrimitiveKind::Date, Value::Date(value))
            }
            TokenKind::DateTimeOffset => {
                let value = parse_date_time_offset(text).ok_or_else(|| invalid("date-time"))?;
                (PrimitiveKind::DateTimeOffset, Value::DateTimeOffset(value))
            }
            TokenKind::TimeOfDay => {
                let value = NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                    .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
                    .map_err(|_| invalid("time of day"))?;
                (PrimitiveKind::TimeOfDay, Value::TimeOfDay(value))
            }
            TokenKind::Duration => {
                let body = quoted_body(text, "duration").ok_or_else(|| invalid("duration"))?;
                let value = parse_duration(body).ok_or_else(|| invalid("duration"))?;
                (PrimitiveKind::Duration, Value::Duration(value))
            }
            TokenKind::Guid => {
                let value = Uuid::parse_str(text).map_err(|_| invalid("guid"))?;
                (PrimitiveKind::Guid, Value::Guid(value))
            }
            TokenKind::Binary => {
                let body = quoted_body(text, "binary").ok_or_else(|| invalid("binary"))?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(body)
                    .map_err(|_| invalid("binary"))?;
                (PrimitiveKind::Binary, Value::Binary(Bytes::from(bytes)))
            }
            TokenKind::String => {
                let body = text
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .ok_or_else(|| invalid("string"))?;
                (PrimitiveKind::String, Value::String(body.replace("''", "'")))
            }
            TokenKind::Enum => return Self::parse_enum(text, model),
            other => {
                return Err(ODataError::syntax(format!(
                    "The token '{}' of kind {:?} is not a literal",
                    text, other
                ))
                .with_target(text))
            }
        };

        Ok(Self::primitive(kind, text, value))
    }

    fn parse_integer(text: &str) -> Result<Arc<Self>> {
        match text {
            "0" => return Ok(Self::int32_zero()),
            "0L" => return Ok(Self::int64_zero()),
            _ => {}
        }

        let out_of_range = || {
            ODataError::syntax(format!("The integer literal '{}' is out of range", text))
                .with_target(text)
        };

        if let Some(digits) = text.strip_suffix(['l', 'L']) {
            let value = i64::from_str(digits).map_err(|_| out_of_range())?;
            return Ok(Self::primitive(PrimitiveKind::Int64, text, Value::Int64(value)));
        }

        // Widen to 64 bits only when the value does not fit in 32
        match i32::from_str(text) {
            Ok(value) => Ok(Self::primitive(PrimitiveKind::Int32, text, Value::Int32(value))),
            Err(_) => {
                let value = i64::from_str(text).map_err(|_| out_of_range())?;
                Ok(Self::primitive(PrimitiveKind::Int64, text, Value::Int64(value)))
            }
        }
    }

    /// `Namespace.Type'Member[,Member...]'`, members OR-ed together
    fn parse_enum(text: &str, model: &EdmModel) -> Result<Arc<Self>> {
        let (type_name, rest) = text.split_once('\'').ok_or_else(|| {
            ODataError::syntax(format!("The literal '{}' is not a valid enum", text))
                .with_target(text)
        })?;
        let members = rest.strip_suffix('\'').unwrap_or(rest);

        let enum_type = model.enum_type_by_name(type_name).ok_or_else(|| {
            ODataError::resolution(
                format!("The enum type '{}' is not part of the model", type_name),
                type_name,
            )
        })?;

        let mut value = 0i64;
        for member in members.split(',').map(str::trim) {
            let member_value = match enum_type.member(member) {
                Some(m) => m.value,
                None => member.parse::<i64>().map_err(|_| {
                    ODataError::resolution(
                        format!(
                            "The enum type '{}' does not have a member named '{}'",
                            type_name, member
                        ),
                        member,
                    )
                })?,
            };
            value |= member_value;
        }

        Ok(Arc::new(ConstantNode {
            edm_type: Some(EdmType::Enum(enum_type.key())),
            literal_text: text.to_string(),
            value: Value::Enum(EnumValue::new(enum_type.key(), value)),
        }))
    }
}

/// The text between the quotes of `prefix'...'`
fn quoted_body<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix)?
        .strip_prefix('\'')?
        .strip_suffix('\'')
}

/// ISO 8601 extended date-time; seconds, fraction and offset are optional and a
/// missing offset means UTC.
fn parse_date_time_offset(text: &str) -> Option<DateTime<chrono::FixedOffset>> {
    let normalized = match text.strip_suffix('Z') {
        Some(local) => format!("{}+00:00", local),
        None => text.to_string(),
    };

    for format in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(value) = DateTime::parse_from_str(&normalized, format) {
            return Some(value);
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(value) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(value.and_utc().fixed_offset());
        }
    }
    None
}

/// `[-]P[nD][T[nH][nM][n[.n]S]]`, with at least one component and at least one
/// after a `T`. Values outside the range of a time span are rejected.
fn parse_duration(text: &str) -> Option<chrono::Duration> {
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut rest = text.strip_prefix('P')?;
    let mut total = chrono::Duration::zero();
    let mut components = 0;
    let mut in_time = false;
    let mut time_components = 0;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('T') {
            if in_time {
                return None;
            }
            in_time = true;
            rest = after;
            continue;
        }

        let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
        let (number, tail) = rest.split_at(end);
        let mut chars = tail.chars();
        let unit = chars.next()?;
        rest = chars.as_str();

        let part = match (in_time, unit) {
            (false, 'D') => chrono::Duration::try_days(number.parse().ok()?)?,
            (true, 'H') => chrono::Duration::try_hours(number.parse().ok()?)?,
            (true, 'M') => chrono::Duration::try_minutes(number.parse().ok()?)?,
            (true, 'S') => {
                let nanos = number.parse::<f64>().ok()? * 1e9;
                if !nanos.is_finite() || nanos.abs() >= i64::MAX as f64 {
                    return None;
                }
                chrono::Duration::nanoseconds(nanos.round() as i64)
            }
            _ => return None,
        };
        total = total.checked_add(&part)?;
        components += 1;
        if in_time {
            time_components += 1;
        }
    }

    if components == 0 || (in_time && time_components == 0) {
        return None;
    }
    Some(if negative { -total } else { total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{self, Colour};
    use crate::edm::TypeKey;
    use chrono::{Datelike, Timelike};

    fn parse(kind: TokenKind, text: &str) -> Arc<ConstantNode> {
        let model = demo::model().unwrap();
        ConstantNode::parse(kind, text, &model).unwrap()
    }

    #[test]
    fn test_round_trip_literal_text() {
        let cases = [
            (TokenKind::Decimal, "2.345M", Value::Decimal(Decimal::from_str("2.345").unwrap())),
            (TokenKind::Integer, "64L", Value::Int64(64)),
            (TokenKind::Integer, "42", Value::Int32(42)),
            (TokenKind::Integer, "3000000000", Value::Int64(3_000_000_000)),
            (TokenKind::Double, "1e3", Value::Double(1000.0)),
            (TokenKind::Double, "2.5d", Value::Double(2.5)),
            (TokenKind::Single, "2.5f", Value::Single(2.5)),
            (
                TokenKind::Date,
                "2000-12-18",
                Value::Date(NaiveDate::from_ymd_opt(2000, 12, 18).unwrap()),
            ),
            (TokenKind::String, "'O''Neil'", Value::String("O'Neil".to_string())),
            (TokenKind::Binary, "binary'aGk='", Value::Binary(Bytes::from_static(b"hi"))),
            (
                TokenKind::Guid,
                "0f8fad5b-d9cb-469f-a165-70867728950e",
                Value::Guid(Uuid::from_u128(0x0f8fad5b_d9cb_469f_a165_70867728950e)),
            ),
            (
                TokenKind::TimeOfDay,
                "13:20:05",
                Value::TimeOfDay(NaiveTime::from_hms_opt(13, 20, 5).unwrap()),
            ),
            (
                TokenKind::DateTimeOffset,
                "2024-03-01T09:15:00Z",
                Value::DateTimeOffset(
                    DateTime::parse_from_rfc3339("2024-03-01T09:15:00+00:00").unwrap(),
                ),
            ),
            (
                TokenKind::Duration,
                "duration'PT2H'",
                Value::Duration(chrono::Duration::hours(2)),
            ),
            (
                TokenKind::Enum,
                "Sample.Model.Colour'Blue,Black'",
                Value::Enum(EnumValue::new(TypeKey::of::<Colour>(), 12)),
            ),
        ];
        for (kind, text, expected) in cases {
            let node = parse(kind, text);
            assert_eq!(node.literal_text(), text);
            assert_eq!(node.value(), &expected, "literal {}", text);
        }
    }

    #[test]
    fn test_singletons_are_shared() {
        let model = demo::model().unwrap();
        let again = |kind, text| ConstantNode::parse(kind, text, &model).unwrap();

        assert!(Arc::ptr_eq(&again(TokenKind::Boolean, "true"), &ConstantNode::boolean(true)));
        assert!(Arc::ptr_eq(&again(TokenKind::Boolean, "false"), &ConstantNode::boolean(false)));
        assert!(Arc::ptr_eq(&again(TokenKind::Null, "null"), &ConstantNode::null()));
        assert!(Arc::ptr_eq(&again(TokenKind::Integer, "0"), &again(TokenKind::Integer, "0")));
        assert!(Arc::ptr_eq(&again(TokenKind::Integer, "0L"), &ConstantNode::int64_zero()));
        assert_eq!(ConstantNode::int64_zero().value(), &Value::Int64(0));
        assert_eq!(ConstantNode::null().edm_type(), None);
    }

    #[test]
    fn test_date_time_offset() {
        let node = parse(TokenKind::DateTimeOffset, "2024-03-01T09:15:30.5+02:00");
        let Value::DateTimeOffset(value) = node.value() else {
            panic!("expected date-time");
        };
        assert_eq!(value.offset().local_minus_utc(), 7200);
        assert_eq!(value.hour(), 9);
        assert_eq!(value.nanosecond(), 500_000_000);

        let node = parse(TokenKind::DateTimeOffset, "2024-03-01T09:15");
        let Value::DateTimeOffset(value) = node.value() else {
            panic!("expected date-time");
        };
        assert_eq!(value.offset().local_minus_utc(), 0);
        assert_eq!(value.day(), 1);
    }

    #[test]
    fn test_duration() {
        let node = parse(TokenKind::Duration, "duration'P1DT2H30M'");
        assert_eq!(
            node.value(),
            &Value::Duration(
                chrono::Duration::days(1) + chrono::Duration::hours(2) + chrono::Duration::minutes(30)
            )
        );
        let node = parse(TokenKind::Duration, "duration'-PT1.5S'");
        assert_eq!(
            node.value(),
            &Value::Duration(-chrono::Duration::milliseconds(1500))
        );
        assert_eq!(parse_duration("P1H"), None);
    }

    #[test]
    fn test_duration_needs_a_component() {
        assert_eq!(parse_duration("P"), None);
        assert_eq!(parse_duration("PT"), None);
        assert_eq!(parse_duration("P1DT"), None);
        assert_eq!(parse_duration("-P"), None);
        assert_eq!(parse_duration("P0D"), Some(chrono::Duration::zero()));

        let model = demo::model().unwrap();
        for text in ["duration'P'", "duration'PT'"] {
            let err = ConstantNode::parse(TokenKind::Duration, text, &model).unwrap_err();
            assert!(matches!(err, ODataError::Syntax { .. }), "literal {}", text);
            assert_eq!(err.target(), Some(text));
        }
    }

    #[test]
    fn test_duration_out_of_range_is_a_syntax_error() {
        let model = demo::model().unwrap();
        for text in [
            "duration'P9999999999999999D'",
            "duration'PT9999999999999999H'",
            "duration'PT9999999999999999M'",
            "duration'PT99999999999999999999S'",
            "duration'P99999999999999999999D'",
            "duration'P100000000000DT2000000000000H'",
        ] {
            let err = ConstantNode::parse(TokenKind::Duration, text, &model).unwrap_err();
            assert!(matches!(err, ODataError::Syntax { .. }), "literal {}", text);
        }
    }

    #[test]
    fn test_enum_literal() {
        let node = parse(TokenKind::Enum, "Sample.Model.Colour'Red,Blue'");
        assert_eq!(
            node.value(),
            &Value::Enum(EnumValue::new(TypeKey::of::<Colour>(), 5))
        );
        assert_eq!(node.edm_type(), Some(&EdmType::Enum(TypeKey::of::<Colour>())));

        let model = demo::model().unwrap();
        let err = ConstantNode::parse(TokenKind::Enum, "Sample.Model.Colour'Purple'", &model)
            .unwrap_err();
        assert!(matches!(err, ODataError::Resolution { .. }));
        assert_eq!(err.target(), Some("Purple"));

        let err =
            ConstantNode::parse(TokenKind::Enum, "Sample.Model.Shade'Red'", &model).unwrap_err();
        assert_eq!(err.target(), Some("Sample.Model.Shade"));
    }

    #[test]
    fn test_invalid_literals() {
        let model = demo::model().unwrap();
        let err = ConstantNode::parse(TokenKind::Date, "2000-13-40", &model).unwrap_err();
        assert!(matches!(err, ODataError::Syntax { .. }));
        assert_eq!(err.target(), Some("2000-13-40"));

        let err =
            ConstantNode::parse(TokenKind::Integer, "99999999999999999999", &model).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
