use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// A search phrase tracked for some domain. The value is free text and may
/// contain spaces; it is query-escaped only at scrape time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    id: EntityId,
    value: String,
}

impl Keyword {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            value: value.into(),
        }
    }

    /// Rebuilds a keyword from stored fields, keeping its original id.
    #[must_use]
    pub fn restore(id: EntityId, value: impl Into<String>) -> Self {
        Self { id, value: value.into() }
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Keyword {}

impl Hash for Keyword {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
