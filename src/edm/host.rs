//! Host type metadata.
//!
//! Host record types describe themselves through [`HostType`], which stands in for
//! runtime reflection: each type returns a [`TypeShape`] naming its fields, base type
//! or enum members. Field types are referenced through [`TypeRef`], whose shape is
//! only produced on demand so self-referencing graphs can be described.

use crate::edm::edm_type::TypeKey;
use crate::edm::primitive::PrimitiveKind;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// A host type that can be mapped into the EDM.
pub trait HostType: 'static {
    fn shape() -> TypeShape;
}

/// A lazily expanded reference to a host type.
#[derive(Clone, Copy)]
pub struct TypeRef {
    key: TypeKey,
    shape: fn() -> TypeShape,
}

impl TypeRef {
    pub fn of<T: HostType>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            shape: T::shape,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn shape(&self) -> TypeShape {
        (self.shape)()
    }
}

impl std::fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeRef({})", self.key.host_name())
    }
}

/// What a host type looks like.
#[derive(Debug, Clone)]
pub enum TypeShape {
    Primitive(PrimitiveKind),
    /// A value that may be absent, such as `Option<T>`
    Optional(TypeRef),
    /// A single-argument sequence, such as `Vec<T>`
    Sequence(TypeRef),
    /// Any other generic instantiation; these cannot be mapped
    Generic {
        name: &'static str,
        arguments: Vec<TypeRef>,
    },
    Record(RecordShape),
    Enum(EnumShape),
}

/// A declared field of a record.
#[derive(Debug, Clone)]
pub struct FieldShape {
    pub name: &'static str,
    pub type_ref: TypeRef,
    pub required: bool,
}

/// A record type with its declared fields.
#[derive(Debug, Clone)]
pub struct RecordShape {
    pub namespace: &'static str,
    pub name: &'static str,
    pub base: Option<TypeRef>,
    pub fields: Vec<FieldShape>,
}

impl RecordShape {
    pub fn new(namespace: &'static str, name: &'static str) -> Self {
        Self {
            namespace,
            name,
            base: None,
            fields: Vec::new(),
        }
    }

    /// Declare the base type this record extends
    pub fn extends<T: HostType>(mut self) -> Self {
        self.base = Some(TypeRef::of::<T>());
        self
    }

    pub fn field<T: HostType>(mut self, name: &'static str) -> Self {
        self.fields.push(FieldShape {
            name,
            type_ref: TypeRef::of::<T>(),
            required: false,
        });
        self
    }

    /// Declare a field carrying the "required" marker
    pub fn required<T: HostType>(mut self, name: &'static str) -> Self {
        self.fields.push(FieldShape {
            name,
            type_ref: TypeRef::of::<T>(),
            required: true,
        });
        self
    }
}

impl From<RecordShape> for TypeShape {
    fn from(shape: RecordShape) -> Self {
        TypeShape::Record(shape)
    }
}

/// An enumeration and its members.
#[derive(Debug, Clone)]
pub struct EnumShape {
    pub namespace: &'static str,
    pub name: &'static str,
    pub flags: bool,
    pub members: Vec<(&'static str, i64)>,
}

impl EnumShape {
    pub fn new(namespace: &'static str, name: &'static str) -> Self {
        Self {
            namespace,
            name,
            flags: false,
            members: Vec::new(),
        }
    }

    /// Mark the enum as a flags enum whose members combine bitwise
    pub fn flags(mut self) -> Self {
        self.flags = true;
        self
    }

    pub fn member(mut self, name: &'static str, value: i64) -> Self {
        self.members.push((name, value));
        self
    }
}

impl From<EnumShape> for TypeShape {
    fn from(shape: EnumShape) -> Self {
        TypeShape::Enum(shape)
    }
}

macro_rules! primitive_host_type {
    ($($host:ty => $kind:ident),* $(,)?) => {
        $(
            impl HostType for $host {
                fn shape() -> TypeShape {
                    TypeShape::Primitive(PrimitiveKind::$kind)
                }
            }
        )*
    };
}

primitive_host_type! {
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
}

impl<T: HostType> HostType for Option<T> {
    fn shape() -> TypeShape {
        TypeShape::Optional(TypeRef::of::<T>())
    }
}

impl<T: HostType> HostType for Vec<T> {
    fn shape() -> TypeShape {
        TypeShape::Sequence(TypeRef::of::<T>())
    }
}

impl<K: HostType, V: HostType> HostType for HashMap<K, V> {
    fn shape() -> TypeShape {
        TypeShape::Generic {
            name: "HashMap",
            arguments: vec![TypeRef::of::<K>(), TypeRef::of::<V>()],
        }
    }
}

impl<K: HostType, V: HostType> HostType for BTreeMap<K, V> {
    fn shape() -> TypeShape {
        TypeShape::Generic {
            name: "BTreeMap",
            arguments: vec![TypeRef::of::<K>(), TypeRef::of::<V>()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    impl HostType for Widget {
        fn shape() -> TypeShape {
            RecordShape::new("Sample", "Widget")
                .required::<i32>("Id")
                .field::<Option<String>>("Label")
                .field::<Vec<Widget>>("Parts")
                .into()
        }
    }

    #[test]
    fn test_record_shape_builder() {
        let TypeShape::Record(shape) = Widget::shape() else {
            panic!("expected record shape");
        };
        assert_eq!(shape.name, "Widget");
        assert_eq!(shape.fields.len(), 3);
        assert!(shape.fields[0].required);
        assert!(!shape.fields[1].required);
        assert_eq!(shape.fields[2].type_ref.key(), TypeKey::of::<Vec<Widget>>());
    }

    #[test]
    fn test_generic_shapes() {
        assert!(matches!(
            <Vec<i32>>::shape(),
            TypeShape::Sequence(inner) if inner.key() == TypeKey::of::<i32>()
        ));
        assert!(matches!(
            <Option<Uuid>>::shape(),
            TypeShape::Optional(inner) if inner.key() == TypeKey::of::<Uuid>()
        ));
        assert!(matches!(
            <HashMap<String, i32>>::shape(),
            TypeShape::Generic { name: "HashMap", ref arguments } if arguments.len() == 2
        ));
    }
}
