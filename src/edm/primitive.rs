//! Primitive EDM types.

use std::fmt;

/// The primitive kinds a host scalar can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Binary,
    Boolean,
    Byte,
    Date,
    DateTimeOffset,
    Decimal,
    Double,
    Duration,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    String,
    TimeOfDay,
}

/// Descriptor for a primitive type. One static instance exists per kind.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct EdmPrimitiveType {
    pub kind: PrimitiveKind,
    pub full_name: &'static str,
}

static BINARY: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Binary, "Edm.Binary");
static BOOLEAN: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Boolean, "Edm.Boolean");
static BYTE: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Byte, "Edm.Byte");
static DATE: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Date, "Edm.Date");
static DATE_TIME_OFFSET: EdmPrimitiveType =
    EdmPrimitiveType::new(PrimitiveKind::DateTimeOffset, "Edm.DateTimeOffset");
static DECIMAL: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Decimal, "Edm.Decimal");
static DOUBLE: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Double, "Edm.Double");
static DURATION: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Duration, "Edm.Duration");
static GUID: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Guid, "Edm.Guid");
static INT16: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Int16, "Edm.Int16");
static INT32: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Int32, "Edm.Int32");
static INT64: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Int64, "Edm.Int64");
static SBYTE: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::SByte, "Edm.SByte");
static SINGLE: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::Single, "Edm.Single");
static STRING: EdmPrimitiveType = EdmPrimitiveType::new(PrimitiveKind::String, "Edm.String");
static TIME_OF_DAY: EdmPrimitiveType =
    EdmPrimitiveType::new(PrimitiveKind::TimeOfDay, "Edm.TimeOfDay");

impl EdmPrimitiveType {
    const fn new(kind: PrimitiveKind, full_name: &'static str) -> Self {
        Self { kind, full_name }
    }
}

impl PrimitiveKind {
    /// The process-wide descriptor for this kind
    pub fn descriptor(self) -> &'static EdmPrimitiveType {
        match self {
            PrimitiveKind::Binary => &BINARY,
            PrimitiveKind::Boolean => &BOOLEAN,
            PrimitiveKind::Byte => &BYTE,
            PrimitiveKind::Date => &DATE,
            PrimitiveKind::DateTimeOffset => &DATE_TIME_OFFSET,
            PrimitiveKind::Decimal => &DECIMAL,
            PrimitiveKind::Double => &DOUBLE,
            PrimitiveKind::Duration => &DURATION,
            PrimitiveKind::Guid => &GUID,
            PrimitiveKind::Int16 => &INT16,
            PrimitiveKind::Int32 => &INT32,
            PrimitiveKind::Int64 => &INT64,
            PrimitiveKind::SByte => &SBYTE,
            PrimitiveKind::Single => &SINGLE,
            PrimitiveKind::String => &STRING,
            PrimitiveKind::TimeOfDay => &TIME_OF_DAY,
        }
    }

    pub fn full_name(self) -> &'static str {
        self.descriptor().full_name
    }

    /// Reference-like kinds are nullable unless the host marks them required.
    pub fn is_reference(self) -> bool {
        matches!(self, PrimitiveKind::String | PrimitiveKind::Binary)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::SByte
                | PrimitiveKind::Int16
                | PrimitiveKind::Int32
                | PrimitiveKind::Int64
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral()
            || matches!(
                self,
                PrimitiveKind::Decimal | PrimitiveKind::Double | PrimitiveKind::Single
            )
    }

    /// Rank used to pick the wider kind when two numerics meet in arithmetic.
    fn numeric_rank(self) -> u8 {
        match self {
            PrimitiveKind::Byte | PrimitiveKind::SByte => 1,
            PrimitiveKind::Int16 => 2,
            PrimitiveKind::Int32 => 3,
            PrimitiveKind::Int64 => 4,
            PrimitiveKind::Decimal => 5,
            PrimitiveKind::Single => 6,
            PrimitiveKind::Double => 7,
            _ => 0,
        }
    }

    /// The kind produced by arithmetic over `self` and `other`, if both are numeric.
    pub fn promote(self, other: PrimitiveKind) -> Option<PrimitiveKind> {
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }
        let wider = if self.numeric_rank() >= other.numeric_rank() {
            self
        } else {
            other
        };
        Some(match wider {
            // Small integrals widen to Int32 like the host arithmetic does
            PrimitiveKind::Byte | PrimitiveKind::SByte | PrimitiveKind::Int16 => {
                PrimitiveKind::Int32
            }
            kind => kind,
        })
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors_are_singletons() {
        assert!(std::ptr::eq(
            PrimitiveKind::String.descriptor(),
            PrimitiveKind::String.descriptor()
        ));
        assert_eq!(PrimitiveKind::Int64.full_name(), "Edm.Int64");
        assert_eq!(PrimitiveKind::TimeOfDay.to_string(), "Edm.TimeOfDay");
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(
            PrimitiveKind::Int32.promote(PrimitiveKind::Int64),
            Some(PrimitiveKind::Int64)
        );
        assert_eq!(
            PrimitiveKind::Byte.promote(PrimitiveKind::Int16),
            Some(PrimitiveKind::Int32)
        );
        assert_eq!(
            PrimitiveKind::Decimal.promote(PrimitiveKind::Int32),
            Some(PrimitiveKind::Decimal)
        );
        assert_eq!(
            PrimitiveKind::Decimal.promote(PrimitiveKind::Double),
            Some(PrimitiveKind::Double)
        );
        assert_eq!(PrimitiveKind::String.promote(PrimitiveKind::Int32), None);
    }
}
