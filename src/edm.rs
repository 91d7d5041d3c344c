//! Entity data model: the type registry queries are resolved against.
//!
//! Host record types are described through [`HostType`] and registered with an
//! [`EdmModelBuilder`]. The resulting [`EdmModel`] is immutable; [`ModelHandle`]
//! publishes a rebuilt model by replacing it as a whole.

pub mod builder;
pub mod edm_type;
pub mod entity_set;
pub mod host;
pub mod model;
pub mod primitive;
pub mod property;

pub use builder::EdmModelBuilder;
pub use edm_type::{EdmComplexType, EdmEnumType, EdmType, EnumMember, TypeKey};
pub use entity_set::{Capabilities, EntitySet};
pub use host::{EnumShape, FieldShape, HostType, RecordShape, TypeRef, TypeShape};
pub use model::{EdmModel, ModelHandle};
pub use primitive::{EdmPrimitiveType, PrimitiveKind};
pub use property::{EdmProperty, PropertyPath, Segments};
