//! The resolved, read-only model and the handle used to publish it.

use crate::edm::edm_type::{EdmComplexType, EdmEnumType, EdmType, TypeKey};
use crate::edm::entity_set::EntitySet;
use crate::edm::property::PropertyPath;
use crate::error::{ODataError, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// An immutable model of entity sets and the types behind them.
///
/// Built by `EdmModelBuilder`. The only interior mutability is the property path
/// cache, which is filled on first use with insert-if-absent semantics.
#[derive(Debug)]
pub struct EdmModel {
    /// Keyed by lower-cased entity set name
    pub(crate) entity_sets: HashMap<String, EntitySet>,
    pub(crate) complex_types: HashMap<TypeKey, EdmComplexType>,
    pub(crate) enum_types: HashMap<TypeKey, EdmEnumType>,
    /// Full type name to key, for enum literals and diagnostics
    pub(crate) names: HashMap<String, TypeKey>,
    pub(crate) single_paths: DashMap<(TypeKey, String), Arc<PropertyPath>>,
    pub(crate) paths: DashMap<(TypeKey, String), Arc<PropertyPath>>,
}

impl EdmModel {
    /// Look up an entity set by name, ignoring case
    pub fn entity_set(&self, name: &str) -> Result<&EntitySet> {
        self.entity_sets
            .get(&name.to_lowercase())
            .ok_or_else(|| {
                ODataError::resolution(
                    format!("The entity set '{}' is not registered", name),
                    name,
                )
            })
    }

    /// Entity sets ordered by name
    pub fn entity_sets(&self) -> Vec<&EntitySet> {
        let mut sets: Vec<&EntitySet> = self.entity_sets.values().collect();
        sets.sort_by(|a, b| a.name.cmp(&b.name));
        sets
    }

    /// The entity set backed by a given type, if one is registered
    pub fn entity_set_for(&self, key: TypeKey) -> Option<&EntitySet> {
        self.entity_sets.values().find(|set| set.entity_type == key)
    }

    pub fn complex_type(&self, key: TypeKey) -> Option<&EdmComplexType> {
        self.complex_types.get(&key)
    }

    /// Like `complex_type`, but a missing type is an error
    pub fn require_complex_type(&self, key: TypeKey) -> Result<&EdmComplexType> {
        self.complex_type(key).ok_or_else(|| {
            ODataError::resolution(
                format!("The type '{}' is not part of the model", key.host_name()),
                key.host_name(),
            )
        })
    }

    pub fn enum_type(&self, key: TypeKey) -> Option<&EdmEnumType> {
        self.enum_types.get(&key)
    }

    /// Look up an enum type by its full name, e.g. `Sample.Model.Colour`
    pub fn enum_type_by_name(&self, full_name: &str) -> Option<&EdmEnumType> {
        self.names
            .get(full_name)
            .and_then(|key| self.enum_types.get(key))
    }

    pub fn complex_type_by_name(&self, full_name: &str) -> Option<&EdmComplexType> {
        self.names
            .get(full_name)
            .and_then(|key| self.complex_types.get(key))
    }

    /// Display name of a type descriptor
    pub fn type_name(&self, edm_type: &EdmType) -> String {
        match edm_type {
            EdmType::Primitive(kind) => kind.full_name().to_string(),
            EdmType::Complex(key) => self
                .complex_type(*key)
                .map(EdmComplexType::full_name)
                .unwrap_or_else(|| key.host_name().to_string()),
            EdmType::Enum(key) => self
                .enum_type(*key)
                .map(EdmEnumType::full_name)
                .unwrap_or_else(|| key.host_name().to_string()),
            EdmType::Collection(inner) => format!("Collection({})", self.type_name(inner)),
        }
    }

    /// Resolve a single property of a type, cached by property identity.
    pub fn resolve_property(&self, type_key: TypeKey, name: &str) -> Result<Arc<PropertyPath>> {
        let cache_key = (type_key, name.to_string());
        if let Some(path) = self.single_paths.get(&cache_key) {
            return Ok(path.value().clone());
        }

        let complex_type = self.require_complex_type(type_key)?;
        let property = complex_type.property(name).ok_or_else(|| {
            ODataError::resolution(
                format!(
                    "The type '{}' does not contain a property named '{}'",
                    complex_type.full_name(),
                    name
                ),
                name,
            )
        })?;

        let path = Arc::new(PropertyPath::new(property.clone(), None));
        Ok(self
            .single_paths
            .entry(cache_key)
            .or_insert(path)
            .value()
            .clone())
    }

    /// Resolve a `/` separated property path against a type.
    ///
    /// Every segment except the last must be navigable.
    pub fn resolve_path(&self, type_key: TypeKey, path: &str) -> Result<Arc<PropertyPath>> {
        if !path.contains('/') {
            return self.resolve_property(type_key, path);
        }

        let cache_key = (type_key, path.to_string());
        if let Some(cached) = self.paths.get(&cache_key) {
            return Ok(cached.value().clone());
        }

        let names: Vec<&str> = path.split('/').collect();
        let mut segments = Vec::with_capacity(names.len());
        let mut current = type_key;

        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(ODataError::syntax(format!(
                    "The property path '{}' contains an empty segment",
                    path
                ))
                .with_target(path));
            }
            let single = self.resolve_property(current, name)?;
            let property = single.property().clone();

            if i + 1 < names.len() {
                if !property.is_navigable() {
                    return Err(ODataError::resolution(
                        format!(
                            "The property '{}' in the path '{}' is not navigable",
                            name, path
                        ),
                        *name,
                    ));
                }
                current = property.property_type().complex_key().ok_or_else(|| {
                    ODataError::resolution(
                        format!(
                            "The property '{}' in the path '{}' is not navigable",
                            name, path
                        ),
                        *name,
                    )
                })?;
            }
            segments.push(property);
        }

        let resolved = PropertyPath::from_segments(segments)
            .ok_or_else(|| ODataError::syntax("Empty property path"))?;
        Ok(self
            .paths
            .entry(cache_key)
            .or_insert(resolved)
            .value()
            .clone())
    }
}

/// Shared handle to the active model.
///
/// Readers take a cheap `Arc` snapshot; `publish` replaces the whole model at once.
#[derive(Debug, Clone, Default)]
pub struct ModelHandle {
    current: Arc<RwLock<Option<Arc<EdmModel>>>>,
}

impl ModelHandle {
    pub fn new(model: EdmModel) -> Self {
        let handle = Self::default();
        handle.publish(model);
        handle
    }

    /// Replace the active model
    pub fn publish(&self, model: EdmModel) -> Arc<EdmModel> {
        let model = Arc::new(model);
        *self.current.write() = Some(model.clone());
        log::debug!(
            "published model with {} entity set(s)",
            model.entity_sets.len()
        );
        model
    }

    /// Snapshot of the active model
    pub fn current(&self) -> Result<Arc<EdmModel>> {
        self.current
            .read()
            .clone()
            .ok_or_else(|| ODataError::usage("No model has been published", None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{self, Category, Product};
    use crate::edm::{Capabilities, EdmModelBuilder};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_entity_set_lookup_is_case_insensitive() -> Result<()> {
        let model = demo::model()?;
        assert_eq!(model.entity_set("products")?.name(), "Products");
        assert_eq!(model.entity_set("PRODUCTS")?.name(), "Products");

        let err = model.entity_set("Widgets").unwrap_err();
        assert!(matches!(err, ODataError::Resolution { .. }));
        assert_eq!(err.target(), Some("Widgets"));
        Ok(())
    }

    #[test]
    fn test_resolve_property_is_cached() -> Result<()> {
        let model = demo::model()?;
        let product = TypeKey::of::<Product>();

        let first = model.resolve_property(product, "Name")?;
        let second = model.resolve_property(product, "Name")?;
        assert!(Arc::ptr_eq(&first, &second));

        let err = model.resolve_property(product, "Colour2").unwrap_err();
        assert_eq!(err.target(), Some("Colour2"));
        Ok(())
    }

    #[test]
    fn test_resolve_multi_segment_path() -> Result<()> {
        let model = demo::model()?;
        let product = TypeKey::of::<Product>();

        let path = model.resolve_path(product, "Category/Name")?;
        assert_eq!(path.to_string(), "Category/Name");
        assert_eq!(path.terminal().declaring_type(), TypeKey::of::<Category>());

        let again = model.resolve_path(product, "Category/Name")?;
        assert!(Arc::ptr_eq(&path, &again));
        Ok(())
    }

    #[test]
    fn test_non_navigable_segment_is_rejected() -> Result<()> {
        let model = demo::model()?;
        let err = model
            .resolve_path(TypeKey::of::<Product>(), "Name/Length")
            .unwrap_err();

        assert!(matches!(err, ODataError::Resolution { .. }));
        assert_eq!(err.target(), Some("Name"));
        assert_eq!(
            err.to_string(),
            "Resolution error: The property 'Name' in the path 'Name/Length' is not navigable"
        );
        Ok(())
    }

    #[test]
    fn test_model_handle_publish_swaps_model() -> Result<()> {
        let handle = ModelHandle::default();
        assert!(handle.current().is_err());

        handle.publish(demo::model()?);
        let first = handle.current()?;
        assert!(first.entity_set("Products").is_ok());

        let mut builder = EdmModelBuilder::new();
        builder.register::<Category>("Categories", Some("Id"), Capabilities::NONE)?;
        handle.publish(builder.build()?);

        let second = handle.current()?;
        assert!(second.entity_set("Products").is_err());
        // Snapshots taken earlier keep working
        assert!(first.entity_set("Products").is_ok());
        Ok(())
    }

    #[test]
    fn test_racing_resolutions_share_one_path() -> Result<()> {
        let model = demo::model()?;
        let product = TypeKey::of::<Product>();
        let barrier = Barrier::new(8);

        let paths = thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        (
                            model.resolve_path(product, "Category/Name"),
                            model.resolve_property(product, "Price"),
                        )
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().unwrap())
                .collect::<Vec<_>>()
        });

        let (first_path, first_property) = (paths[0].0.clone()?, paths[0].1.clone()?);
        for (path, property) in paths {
            assert!(Arc::ptr_eq(&path?, &first_path));
            assert!(Arc::ptr_eq(&property?, &first_property));
        }
        assert!(Arc::ptr_eq(
            &model.resolve_path(product, "Category/Name")?,
            &first_path
        ));
        Ok(())
    }

    #[test]
    fn test_concurrent_publish_swaps_whole_models() -> Result<()> {
        let handle = ModelHandle::new(demo::model()?);

        thread::scope(|scope| {
            let publisher = scope.spawn(|| -> Result<()> {
                for round in 0..20 {
                    if round % 2 == 0 {
                        let mut builder = EdmModelBuilder::new();
                        builder.register::<Category>("Categories", Some("Id"), Capabilities::NONE)?;
                        handle.publish(builder.build()?);
                    } else {
                        handle.publish(demo::model()?);
                    }
                }
                Ok(())
            });

            let readers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| -> Result<()> {
                        for _ in 0..200 {
                            let model = handle.current()?;
                            let sets = model.entity_sets().len();
                            // Either model in full, never a mix of the two
                            assert!(sets == 1 || sets == 5, "saw {} entity sets", sets);
                            assert_eq!(model.entity_set("Products").is_ok(), sets == 5);
                        }
                        Ok(())
                    })
                })
                .collect();

            publisher.join().unwrap()?;
            for reader in readers {
                reader.join().unwrap()?;
            }
            Ok::<(), ODataError>(())
        })?;

        assert_eq!(handle.current()?.entity_sets().len(), 5);
        Ok(())
    }
}
