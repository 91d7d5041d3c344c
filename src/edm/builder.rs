//! Builds an `EdmModel` from host type metadata.
//!
//! Building happens in two phases. Registration resolves every reachable host type
//! into descriptors, leaving property navigability unresolved. `build()` then resolves
//! navigability once against the complete set of registered entity sets, flattens
//! inherited properties and produces the immutable model.

use crate::edm::edm_type::{EdmComplexType, EdmEnumType, EdmType, EnumMember, TypeKey};
use crate::edm::entity_set::{Capabilities, EntitySet};
use crate::edm::host::{HostType, RecordShape, TypeRef, TypeShape};
use crate::edm::model::EdmModel;
use crate::edm::property::EdmProperty;
use crate::error::{ODataError, Result};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A property as seen during phase 1, before navigability is known
#[derive(Debug, Clone)]
struct PropertyDraft {
    name: String,
    property_type: EdmType,
    nullable: bool,
}

/// A complex type under construction.
///
/// Inserted into the resolver with an empty property list before its fields are
/// resolved, so cyclic references find it instead of recursing.
#[derive(Debug, Clone)]
struct ComplexDraft {
    namespace: String,
    name: String,
    base_type: Option<TypeKey>,
    properties: Vec<PropertyDraft>,
}

/// Memoizing resolver from host types to descriptors
#[derive(Debug, Default)]
struct TypeResolver {
    resolved: HashMap<TypeKey, EdmType>,
    complex: HashMap<TypeKey, ComplexDraft>,
    enums: HashMap<TypeKey, EdmEnumType>,
    names: HashMap<String, TypeKey>,
}

impl TypeResolver {
    fn resolve(&mut self, type_ref: TypeRef) -> Result<EdmType> {
        if let Some(resolved) = self.resolved.get(&type_ref.key()) {
            return Ok(resolved.clone());
        }

        let resolved = match type_ref.shape() {
            TypeShape::Primitive(kind) => EdmType::Primitive(kind),
            TypeShape::Optional(inner) => self.resolve(inner)?,
            TypeShape::Sequence(element) => EdmType::collection(self.resolve(element)?),
            TypeShape::Generic { name, arguments } => {
                return Err(ODataError::configuration(format!(
                    "The generic type '{}' with {} type argument(s) is not a supported sequence type ({})",
                    name,
                    arguments.len(),
                    type_ref.key().host_name()
                )));
            }
            TypeShape::Enum(shape) => {
                let key = type_ref.key();
                let enum_type = EdmEnumType {
                    key,
                    namespace: shape.namespace.to_string(),
                    name: shape.name.to_string(),
                    is_flags: shape.flags,
                    members: shape
                        .members
                        .iter()
                        .map(|(name, value)| EnumMember {
                            name: name.to_string(),
                            value: *value,
                        })
                        .collect(),
                };
                self.claim_name(enum_type.full_name(), key)?;
                self.enums.insert(key, enum_type);
                EdmType::Enum(key)
            }
            TypeShape::Record(shape) => self.resolve_record(type_ref.key(), shape)?,
        };

        self.resolved.insert(type_ref.key(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_record(&mut self, key: TypeKey, shape: RecordShape) -> Result<EdmType> {
        let base_type = match shape.base {
            Some(base) => match self.resolve(base)? {
                EdmType::Complex(base_key) => Some(base_key),
                other => {
                    return Err(ODataError::configuration(format!(
                        "The base type of '{}' must be a record type, found {:?}",
                        shape.name, other
                    )))
                }
            },
            None => None,
        };

        let full_name = format!("{}.{}", shape.namespace, shape.name);
        self.claim_name(full_name, key)?;

        // Placeholder first: fields referring back to this type find it here
        self.complex.insert(
            key,
            ComplexDraft {
                namespace: shape.namespace.to_string(),
                name: shape.name.to_string(),
                base_type,
                properties: Vec::new(),
            },
        );
        self.resolved.insert(key, EdmType::Complex(key));

        let mut properties = Vec::with_capacity(shape.fields.len());
        for field in &shape.fields {
            let property_type = self.resolve(field.type_ref)?;
            let optional = matches!(field.type_ref.shape(), TypeShape::Optional(_));
            let reference_like = match &property_type {
                EdmType::Primitive(kind) => kind.is_reference(),
                EdmType::Complex(_) => true,
                EdmType::Enum(_) => false,
                EdmType::Collection(_) => true,
            };
            let nullable =
                optional || property_type.is_collection() || (reference_like && !field.required);

            properties.push(PropertyDraft {
                name: field.name.to_string(),
                property_type,
                nullable,
            });
        }
        properties.sort_by(|a, b| a.name.cmp(&b.name));

        if let Some(draft) = self.complex.get_mut(&key) {
            draft.properties = properties;
        }
        Ok(EdmType::Complex(key))
    }

    fn claim_name(&mut self, full_name: String, key: TypeKey) -> Result<()> {
        match self.names.get(&full_name) {
            Some(existing) if *existing != key => Err(ODataError::configuration(format!(
                "The type name '{}' is used by both '{}' and '{}'",
                full_name,
                existing.host_name(),
                key.host_name()
            ))),
            _ => {
                self.names.insert(full_name, key);
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
struct EntitySetDraft {
    name: String,
    entity_type: TypeKey,
    key: Option<String>,
    capabilities: Capabilities,
}

/// Collects entity set registrations and builds the model.
#[derive(Debug, Default)]
pub struct EdmModelBuilder {
    resolver: TypeResolver,
    entity_sets: Vec<EntitySetDraft>,
}

impl EdmModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity set backed by the record type `T`.
    ///
    /// The whole type graph reachable from `T` is resolved immediately; unsupported
    /// shapes fail here rather than at query time.
    pub fn register<T: HostType>(
        &mut self,
        name: &str,
        key: Option<&str>,
        capabilities: Capabilities,
    ) -> Result<&mut Self> {
        if self
            .entity_sets
            .iter()
            .any(|set| set.name.eq_ignore_ascii_case(name))
        {
            return Err(ODataError::configuration(format!(
                "The entity set '{}' is already registered",
                name
            )));
        }

        let entity_type = match self.resolver.resolve(TypeRef::of::<T>())? {
            EdmType::Complex(key) => key,
            other => {
                return Err(ODataError::configuration(format!(
                    "The entity set '{}' must be backed by a record type, found {:?}",
                    name, other
                )))
            }
        };

        self.entity_sets.push(EntitySetDraft {
            name: name.to_string(),
            entity_type,
            key: key.map(str::to_string),
            capabilities,
        });
        log::debug!("registered entity set '{}' ({})", name, entity_type.host_name());
        Ok(self)
    }

    /// Resolve a type that is not behind an entity set, such as an enum used in literals
    pub fn register_type<T: HostType>(&mut self) -> Result<EdmType> {
        self.resolver.resolve(TypeRef::of::<T>())
    }

    /// Resolve navigability against the registered entity sets and publish the model
    pub fn build(self) -> Result<EdmModel> {
        let TypeResolver {
            complex,
            enums,
            names,
            ..
        } = self.resolver;

        let entity_types: HashSet<TypeKey> =
            self.entity_sets.iter().map(|set| set.entity_type).collect();

        // Phase 2: navigability, once, against the finished registry
        let declared: HashMap<TypeKey, Vec<Arc<EdmProperty>>> = complex
            .iter()
            .map(|(key, draft)| {
                let properties = draft
                    .properties
                    .iter()
                    .map(|property| {
                        let navigable = property
                            .property_type
                            .complex_key()
                            .is_some_and(|target| entity_types.contains(&target));
                        Arc::new(EdmProperty {
                            name: property.name.clone(),
                            declaring_type: *key,
                            property_type: property.property_type.clone(),
                            nullable: property.nullable,
                            navigable,
                        })
                    })
                    .collect();
                (*key, properties)
            })
            .collect();

        let mut complex_types = HashMap::with_capacity(complex.len());
        for (key, draft) in &complex {
            let mut properties = Vec::new();
            let mut current = Some(*key);
            let mut seen = HashSet::new();
            while let Some(type_key) = current {
                if !seen.insert(type_key) {
                    return Err(ODataError::configuration(format!(
                        "The type '{}' inherits from itself",
                        draft.name
                    )));
                }
                if let Some(own) = declared.get(&type_key) {
                    for property in own {
                        // A derived declaration hides an inherited one of the same name
                        if !properties
                            .iter()
                            .any(|p: &Arc<EdmProperty>| p.name == property.name)
                        {
                            properties.push(property.clone());
                        }
                    }
                }
                current = complex.get(&type_key).and_then(|d| d.base_type);
            }
            properties.sort_by(|a, b| a.name.cmp(&b.name));

            complex_types.insert(
                *key,
                EdmComplexType {
                    key: *key,
                    namespace: draft.namespace.clone(),
                    name: draft.name.clone(),
                    base_type: draft.base_type,
                    properties,
                },
            );
        }

        let mut entity_sets = HashMap::with_capacity(self.entity_sets.len());
        for draft in self.entity_sets {
            let key = match &draft.key {
                Some(key_name) => {
                    let property = complex_types
                        .get(&draft.entity_type)
                        .and_then(|t| t.property(key_name))
                        .cloned()
                        .ok_or_else(|| {
                            ODataError::configuration(format!(
                                "The key property '{}' of entity set '{}' does not exist",
                                key_name, draft.name
                            ))
                        })?;
                    Some(property)
                }
                None => None,
            };
            entity_sets.insert(
                draft.name.to_lowercase(),
                EntitySet {
                    name: draft.name,
                    entity_type: draft.entity_type,
                    key,
                    capabilities: draft.capabilities,
                },
            );
        }

        log::debug!(
            "built model: {} entity set(s), {} complex type(s), {} enum type(s)",
            entity_sets.len(),
            complex_types.len(),
            enums.len()
        );

        Ok(EdmModel {
            entity_sets,
            complex_types,
            enum_types: enums,
            names,
            single_paths: DashMap::new(),
            paths: DashMap::new(),
        })
    }
}
