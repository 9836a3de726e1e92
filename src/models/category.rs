use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// Name shown for the synthetic category that unions every stored domain.
pub const ALL_DOMAINS_NAME: &str = "All Domains";

/// A named grouping of domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    id: EntityId,
    name: String,
}

impl Category {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
        }
    }

    /// Rebuilds a category from stored fields, keeping its original id.
    #[must_use]
    pub fn restore(id: EntityId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }

    /// The synthetic category selecting every domain regardless of grouping.
    /// It carries the nil id and is never persisted.
    #[must_use]
    pub fn all_domains() -> Self {
        Self {
            id: EntityId::nil(),
            name: ALL_DOMAINS_NAME.to_string(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub const fn is_all_domains(&self) -> bool {
        self.id.is_nil()
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Category {}

impl Hash for Category {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_name() {
        let a = Category::new("blogs");
        let mut b = a.clone();
        b.set_name("renamed");
        assert_eq!(a, b);
        assert_ne!(a, Category::new("blogs"));
    }

    #[test]
    fn test_all_domains_is_synthetic() {
        let all = Category::all_domains();
        assert!(all.is_all_domains());
        assert_eq!(all.name(), ALL_DOMAINS_NAME);
        assert!(!Category::new("real").is_all_domains());
    }
}
