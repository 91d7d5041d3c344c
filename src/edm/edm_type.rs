//! Type descriptors: complex, collection and enum types.

use crate::edm::primitive::PrimitiveKind;
use crate::edm::property::EdmProperty;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a host type.
///
/// Equality and hashing only look at the `TypeId`, so two keys built for the same
/// host type in unrelated places always compare equal.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The host type name, for diagnostics
    pub fn host_name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

/// A type descriptor.
///
/// Complex and enum descriptors are referenced by key; their details live in the
/// `EdmModel` that resolved them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdmType {
    Primitive(PrimitiveKind),
    Complex(TypeKey),
    Collection(Box<EdmType>),
    Enum(TypeKey),
}

impl EdmType {
    pub fn collection(element: EdmType) -> Self {
        EdmType::Collection(Box::new(element))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, EdmType::Collection(_))
    }

    /// Element type of a collection, the type itself otherwise
    pub fn element_type(&self) -> &EdmType {
        match self {
            EdmType::Collection(inner) => inner,
            other => other,
        }
    }

    /// Key of the complex type this type is, or contains
    pub fn complex_key(&self) -> Option<TypeKey> {
        match self.element_type() {
            EdmType::Complex(key) => Some(*key),
            _ => None,
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            EdmType::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, EdmType::Primitive(PrimitiveKind::Boolean))
    }

    pub fn is_numeric(&self) -> bool {
        self.primitive_kind().is_some_and(PrimitiveKind::is_numeric)
    }
}

/// A named record type.
#[derive(Debug)]
pub struct EdmComplexType {
    pub(crate) key: TypeKey,
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) base_type: Option<TypeKey>,
    /// All properties, inherited ones included, ordered by name
    pub(crate) properties: Vec<Arc<EdmProperty>>,
}

impl EdmComplexType {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn base_type(&self) -> Option<TypeKey> {
        self.base_type
    }

    pub fn properties(&self) -> &[Arc<EdmProperty>] {
        &self.properties
    }

    /// Properties declared on this type, excluding inherited ones
    pub fn declared_properties(&self) -> impl Iterator<Item = &Arc<EdmProperty>> {
        self.properties
            .iter()
            .filter(move |property| property.declaring_type() == self.key)
    }

    pub fn property(&self, name: &str) -> Option<&Arc<EdmProperty>> {
        self.properties.iter().find(|property| property.name() == name)
    }
}

impl PartialEq for EdmComplexType {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

/// A single enum member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

/// An enumeration type.
#[derive(Debug, Clone)]
pub struct EdmEnumType {
    pub(crate) key: TypeKey,
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) is_flags: bool,
    pub(crate) members: Vec<EnumMember>,
}

impl EdmEnumType {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn is_flags(&self) -> bool {
        self.is_flags
    }

    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|member| member.name == name)
    }

    /// Member names making up `value`, comma joined
    pub fn format_value(&self, value: i64) -> Option<String> {
        if let Some(member) = self.members.iter().find(|m| m.value == value) {
            return Some(member.name.clone());
        }
        if !self.is_flags {
            return None;
        }
        let parts: Vec<&str> = self
            .members
            .iter()
            .filter(|m| m.value != 0 && value & m.value == m.value)
            .map(|m| m.name.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(","))
        }
    }
}

impl PartialEq for EdmEnumType {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    #[test]
    fn test_type_key_identity() {
        assert_eq!(TypeKey::of::<Alpha>(), TypeKey::of::<Alpha>());
        assert_ne!(TypeKey::of::<Alpha>(), TypeKey::of::<Beta>());
        assert!(TypeKey::of::<Alpha>().host_name().ends_with("Alpha"));
    }

    #[test]
    fn test_edm_type_helpers() {
        let orders = EdmType::collection(EdmType::Complex(TypeKey::of::<Alpha>()));
        assert!(orders.is_collection());
        assert_eq!(orders.complex_key(), Some(TypeKey::of::<Alpha>()));
        assert_eq!(
            EdmType::Primitive(PrimitiveKind::Int32).complex_key(),
            None
        );
        assert!(EdmType::Primitive(PrimitiveKind::Decimal).is_numeric());
        assert!(!EdmType::Primitive(PrimitiveKind::String).is_numeric());
    }

    #[test]
    fn test_enum_format_value() {
        let colour = EdmEnumType {
            key: TypeKey::of::<Alpha>(),
            namespace: "Sample".to_string(),
            name: "Colour".to_string(),
            is_flags: true,
            members: vec![
                EnumMember { name: "Red".to_string(), value: 1 },
                EnumMember { name: "Green".to_string(), value: 2 },
                EnumMember { name: "Blue".to_string(), value: 4 },
            ],
        };
        assert_eq!(colour.full_name(), "Sample.Colour");
        assert_eq!(colour.format_value(2).as_deref(), Some("Green"));
        assert_eq!(colour.format_value(5).as_deref(), Some("Red,Blue"));
        assert_eq!(colour.format_value(8), None);
    }
}
