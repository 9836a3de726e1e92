use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::now_secs;

/// A web site whose search placement is tracked. Each domain carries the set
/// of engines it is queried against plus creation and update timestamps.
///
/// The name is matched against result URLs by case-insensitive prefix, so it
/// is normally entered with its scheme, e.g. `https://example.com`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    id: EntityId,
    name: String,
    engines: BTreeSet<EntityId>,
    #[serde(with = "chrono::serde::ts_seconds")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    updated_at: DateTime<Utc>,
}

impl Domain {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_secs();
        Self {
            id: EntityId::new(),
            name: name.into(),
            engines: BTreeSet::new(),
            created_at: now,
            updated_at: now,
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
        self.touch();
    }

    /// Identifiers of the engines this domain is ranked against, in stable
    /// order. Duplicates are impossible; membership is what counts.
    #[must_use]
    pub const fn engines(&self) -> &BTreeSet<EntityId> {
        &self.engines
    }

    /// Adds an engine to the query set. Returns `false` when it was already
    /// present, in which case nothing changes.
    pub fn add_engine(&mut self, engine: EntityId) -> bool {
        let added = self.engines.insert(engine);
        if added {
            self.touch();
        }
        added
    }

    /// Removes an engine from the query set. Returns `false` when it was not
    /// present.
    pub fn remove_engine(&mut self, engine: EntityId) -> bool {
        let removed = self.engines.remove(&engine);
        if removed {
            self.touch();
        }
        removed
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = now_secs();
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Domain {}

impl Hash for Domain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
