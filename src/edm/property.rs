//! Properties and property paths.

use crate::edm::edm_type::{EdmType, TypeKey};
use std::fmt;
use std::sync::Arc;

/// A property declared on a complex type.
#[derive(Debug, Clone, PartialEq)]
pub struct EdmProperty {
    pub(crate) name: String,
    pub(crate) declaring_type: TypeKey,
    pub(crate) property_type: EdmType,
    pub(crate) nullable: bool,
    pub(crate) navigable: bool,
}

impl EdmProperty {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> TypeKey {
        self.declaring_type
    }

    pub fn property_type(&self) -> &EdmType {
        &self.property_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// True when the property's type is an entity set type, or a collection of one
    pub fn is_navigable(&self) -> bool {
        self.navigable
    }
}

/// A chain of properties such as `Category/Name`.
#[derive(Debug, PartialEq)]
pub struct PropertyPath {
    property: Arc<EdmProperty>,
    next: Option<Arc<PropertyPath>>,
}

impl PropertyPath {
    pub fn new(property: Arc<EdmProperty>, next: Option<Arc<PropertyPath>>) -> Self {
        Self { property, next }
    }

    /// Build a path from its segments, first segment first.
    ///
    /// Returns `None` for an empty segment list.
    pub fn from_segments(segments: Vec<Arc<EdmProperty>>) -> Option<Arc<PropertyPath>> {
        segments.into_iter().rev().fold(None, |next, property| {
            Some(Arc::new(PropertyPath::new(property, next)))
        })
    }

    pub fn property(&self) -> &Arc<EdmProperty> {
        &self.property
    }

    pub fn next(&self) -> Option<&Arc<PropertyPath>> {
        self.next.as_ref()
    }

    /// The segments of the path, in order
    pub fn segments(&self) -> Segments<'_> {
        Segments {
            current: Some(self),
        }
    }

    /// The last property of the path
    pub fn terminal(&self) -> &Arc<EdmProperty> {
        let mut current = self;
        while let Some(next) = current.next.as_deref() {
            current = next;
        }
        &current.property
    }

    pub fn len(&self) -> usize {
        self.segments().count()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, property) in self.segments().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(property.name())?;
        }
        Ok(())
    }
}

/// Iterator over the properties of a path
pub struct Segments<'a> {
    current: Option<&'a PropertyPath>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a Arc<EdmProperty>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = node.next.as_deref();
        Some(&node.property)
    }
}
