//! Entity sets and their capabilities.

use crate::edm::edm_type::TypeKey;
use crate::edm::property::EdmProperty;
use std::ops::BitOr;
use std::sync::Arc;

/// What a client may do with an entity set besides reading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    pub const INSERTABLE: Capabilities = Capabilities(1);
    pub const UPDATABLE: Capabilities = Capabilities(2);
    pub const DELETABLE: Capabilities = Capabilities(4);
    pub const ALL: Capabilities = Capabilities(7);

    pub fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Self) -> Self::Output {
        Capabilities(self.0 | rhs.0)
    }
}

/// A named, queryable collection backed by one complex type
#[derive(Debug, Clone)]
pub struct EntitySet {
    pub(crate) name: String,
    pub(crate) entity_type: TypeKey,
    pub(crate) key: Option<Arc<EdmProperty>>,
    pub(crate) capabilities: Capabilities,
}

impl EntitySet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_type(&self) -> TypeKey {
        self.entity_type
    }

    pub fn key(&self) -> Option<&Arc<EdmProperty>> {
        self.key.as_ref()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let caps = Capabilities::INSERTABLE | Capabilities::DELETABLE;
        assert!(caps.contains(Capabilities::INSERTABLE));
        assert!(caps.contains(Capabilities::DELETABLE));
        assert!(!caps.contains(Capabilities::UPDATABLE));
        assert!(Capabilities::ALL.contains(caps));
        assert!(Capabilities::NONE.is_empty());
        assert!(caps.contains(Capabilities::NONE));
    }
}
