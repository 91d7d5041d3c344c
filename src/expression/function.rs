//! Canonical filter functions.

use crate::access::Value;
use crate::edm::{EdmType, PrimitiveKind};
use crate::error::{ODataError, Result};
use chrono::{Datelike, Timelike};
use rust_decimal::Decimal;
use std::fmt;
use std::ops::RangeInclusive;

/// The functions a filter may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    // String
    Contains,
    StartsWith,
    EndsWith,
    Length,
    IndexOf,
    Substring,
    ToLower,
    ToUpper,
    Trim,
    Concat,

    // Date and time
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,

    // Arithmetic
    Round,
    Floor,
    Ceiling,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "contains" => Function::Contains,
            "startswith" => Function::StartsWith,
            "endswith" => Function::EndsWith,
            "length" => Function::Length,
            "indexof" => Function::IndexOf,
            "substring" => Function::Substring,
            "tolower" => Function::ToLower,
            "toupper" => Function::ToUpper,
            "trim" => Function::Trim,
            "concat" => Function::Concat,
            "year" => Function::Year,
            "month" => Function::Month,
            "day" => Function::Day,
            "hour" => Function::Hour,
            "minute" => Function::Minute,
            "second" => Function::Second,
            "round" => Function::Round,
            "floor" => Function::Floor,
            "ceiling" => Function::Ceiling,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Contains => "contains",
            Function::StartsWith => "startswith",
            Function::EndsWith => "endswith",
            Function::Length => "length",
            Function::IndexOf => "indexof",
            Function::Substring => "substring",
            Function::ToLower => "tolower",
            Function::ToUpper => "toupper",
            Function::Trim => "trim",
            Function::Concat => "concat",
            Function::Year => "year",
            Function::Month => "month",
            Function::Day => "day",
            Function::Hour => "hour",
            Function::Minute => "minute",
            Function::Second => "second",
            Function::Round => "round",
            Function::Floor => "floor",
            Function::Ceiling => "ceiling",
        }
    }

    /// Accepted number of parameters
    pub fn arity(&self) -> RangeInclusive<usize> {
        match self {
            Function::Contains
            | Function::StartsWith
            | Function::EndsWith
            | Function::IndexOf
            | Function::Concat => 2..=2,
            Function::Substring => 2..=3,
            _ => 1..=1,
        }
    }

    /// Result type for the given parameter types, `None` when they do not fit.
    ///
    /// A `None` parameter type is a `null` literal and fits any position.
    pub fn return_type(&self, parameters: &[Option<EdmType>]) -> Option<EdmType> {
        let kind = |i: usize| -> Option<Option<PrimitiveKind>> {
            parameters.get(i).map(|p| p.as_ref().and_then(EdmType::primitive_kind))
        };
        let is = |i: usize, accept: &dyn Fn(PrimitiveKind) -> bool| match parameters.get(i) {
            Some(None) => true,
            Some(Some(t)) => t.primitive_kind().is_some_and(accept),
            None => false,
        };
        let string = |k: PrimitiveKind| k == PrimitiveKind::String;
        let integral = |k: PrimitiveKind| k.is_integral();

        let result = match self {
            Function::Contains | Function::StartsWith | Function::EndsWith => {
                (is(0, &string) && is(1, &string)).then_some(PrimitiveKind::Boolean)
            }
            Function::Length => is(0, &string).then_some(PrimitiveKind::Int32),
            Function::IndexOf => (is(0, &string) && is(1, &string)).then_some(PrimitiveKind::Int32),
            Function::Substring => {
                let length_fits = parameters.len() < 3 || is(2, &integral);
                (is(0, &string) && is(1, &integral) && length_fits)
                    .then_some(PrimitiveKind::String)
            }
            Function::ToLower | Function::ToUpper | Function::Trim => {
                is(0, &string).then_some(PrimitiveKind::String)
            }
            Function::Concat => (is(0, &string) && is(1, &string)).then_some(PrimitiveKind::String),
            Function::Year | Function::Month | Function::Day => is(0, &|k| {
                matches!(k, PrimitiveKind::Date | PrimitiveKind::DateTimeOffset)
            })
            .then_some(PrimitiveKind::Int32),
            Function::Hour | Function::Minute | Function::Second => is(0, &|k| {
                matches!(k, PrimitiveKind::TimeOfDay | PrimitiveKind::DateTimeOffset)
            })
            .then_some(PrimitiveKind::Int32),
            Function::Round | Function::Floor | Function::Ceiling => match kind(0)? {
                Some(k @ (PrimitiveKind::Decimal | PrimitiveKind::Double | PrimitiveKind::Single)) => {
                    Some(k)
                }
                Some(k) if k.is_integral() => Some(k),
                None => Some(PrimitiveKind::Double),
                Some(_) => None,
            },
        };
        result.map(EdmType::Primitive)
    }

    /// Apply the function to evaluated arguments. Any null argument gives null.
    pub fn evaluate(&self, arguments: &[Value]) -> Result<Value> {
        if arguments.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }

        let mismatch = || {
            ODataError::evaluation(format!(
                "The function '{}' cannot be applied to {:?}",
                self.name(),
                arguments
            ))
        };
        let text = |i: usize| arguments.get(i).and_then(Value::as_str).ok_or_else(mismatch);
        let integer = |i: usize| arguments.get(i).and_then(Value::as_i64).ok_or_else(mismatch);

        Ok(match self {
            Function::Contains => Value::Boolean(text(0)?.contains(text(1)?)),
            Function::StartsWith => Value::Boolean(text(0)?.starts_with(text(1)?)),
            Function::EndsWith => Value::Boolean(text(0)?.ends_with(text(1)?)),
            Function::Length => Value::Int32(text(0)?.chars().count() as i32),
            Function::IndexOf => {
                let haystack = text(0)?;
                let index = haystack
                    .find(text(1)?)
                    .map_or(-1, |byte| haystack[..byte].chars().count() as i32);
                Value::Int32(index)
            }
            Function::Substring => {
                let start = usize::try_from(integer(1)?.max(0)).unwrap_or(usize::MAX);
                let chars = text(0)?.chars().skip(start);
                let result: String = if arguments.len() > 2 {
                    let length = usize::try_from(integer(2)?.max(0)).unwrap_or(usize::MAX);
                    chars.take(length).collect()
                } else {
                    chars.collect()
                };
                Value::String(result)
            }
            Function::ToLower => Value::String(text(0)?.to_lowercase()),
            Function::ToUpper => Value::String(text(0)?.to_uppercase()),
            Function::Trim => Value::String(text(0)?.trim().to_string()),
            Function::Concat => Value::String(format!("{}{}", text(0)?, text(1)?)),
            Function::Year | Function::Month | Function::Day => {
                let date = match &arguments[0] {
                    Value::Date(d) => *d,
                    Value::DateTimeOffset(dt) => dt.date_naive(),
                    _ => return Err(mismatch()),
                };
                Value::Int32(match self {
                    Function::Year => date.year(),
                    Function::Month => date.month() as i32,
                    _ => date.day() as i32,
                })
            }
            Function::Hour | Function::Minute | Function::Second => {
                let time = match &arguments[0] {
                    Value::TimeOfDay(t) => *t,
                    Value::DateTimeOffset(dt) => dt.time(),
                    _ => return Err(mismatch()),
                };
                Value::Int32(match self {
                    Function::Hour => time.hour(),
                    Function::Minute => time.minute(),
                    _ => time.second(),
                } as i32)
            }
            Function::Round | Function::Floor | Function::Ceiling => match &arguments[0] {
                Value::Decimal(d) => Value::Decimal(self.round_decimal(*d)),
                Value::Double(v) => Value::Double(self.round_float(*v)),
                Value::Single(v) => Value::Single(self.round_float(f64::from(*v)) as f32),
                other if other.is_integral() => other.clone(),
                _ => return Err(mismatch()),
            },
        })
    }

    fn round_decimal(&self, value: Decimal) -> Decimal {
        match self {
            Function::Floor => value.floor(),
            Function::Ceiling => value.ceil(),
            _ => value.round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero),
        }
    }

    fn round_float(&self, value: f64) -> f64 {
        match self {
            Function::Floor => value.floor(),
            Function::Ceiling => value.ceil(),
            _ => value.round(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
