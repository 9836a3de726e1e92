//! Search engine integrations.
//!
//! Engines live in a process-level [`EngineRegistry`] and stored entities
//! reference them by id only, so a domain record stays decodable even when
//! its engine is not configured. Lookups that cannot be resolved fail with
//! [`EngineError::UnknownEngine`] at use time.

pub mod google;

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::EntityId;
use crate::progress::ProgressSink;

pub use google::GoogleEngine;

/// Identifier of the built-in google.com engine.
pub const GOOGLE_COM_ID: EntityId =
    EntityId::from_uuid(Uuid::from_u128(0x134d93aa_39c7_40c8_9834_c882b09ae93a));

/// Identifier of the built-in google.co.uk engine.
pub const GOOGLE_UK_ID: EntityId =
    EntityId::from_uuid(Uuid::from_u128(0x6d984c2d_0f13_4da0_ae7c_e7f6f5f47e74));

/// Failure while configuring an engine or running a query through it.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no engine registered under id {0}")]
    UnknownEngine(EntityId),
    #[error("invalid engine base url: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("failed to prepare html selector: {0}")]
    Selector(String),
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Tuning for the paginated crawl every engine performs.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeOptions {
    /// Pause between result pages, to stay under rate limits.
    pub page_delay: Duration,
    /// Positions scanned before giving up on a domain.
    pub scan_limit: i32,
    /// Timeout for one page fetch.
    pub request_timeout: Duration,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_secs(13),
            scan_limit: 100,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of one rank query: the position found (or the not-found sentinel)
/// and the address of the result page it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankOutcome {
    pub rank: i32,
    pub page_url: String,
}

/// One search provider. Implementations own their HTTP session and crawl
/// pacing; callers only see the final outcome plus progress updates.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    fn id(&self) -> EntityId;

    /// Short name, e.g. `google.com`.
    fn name(&self) -> &str;

    /// Human-readable label, e.g. `Google/UK`.
    fn description(&self) -> &str;

    fn base_url(&self) -> &str;

    /// Finds where `domain` places in this engine's results for `phrase`.
    /// Reports cumulative positions scanned through `progress` while the
    /// crawl runs, and always finishes with the full scan limit.
    async fn rank_query(
        &self,
        domain: &str,
        phrase: &str,
        progress: &dyn ProgressSink,
    ) -> Result<RankOutcome, EngineError>;
}

/// Shared handle to a registered engine. Two handles are equal when they
/// point at the same engine id, whatever the instances behind them.
#[derive(Clone)]
pub struct EngineRef(Arc<dyn SearchEngine>);

impl EngineRef {
    #[must_use]
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self(engine)
    }
}

impl Deref for EngineRef {
    type Target = dyn SearchEngine;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for EngineRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for EngineRef {}

impl fmt::Debug for EngineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRef")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

/// All engines available to this process, keyed by id.
#[derive(Default)]
pub struct EngineRegistry {
    engines: HashMap<EntityId, Arc<dyn SearchEngine>>,
}

impl EngineRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry with the built-in Google engines, taking base
    /// URLs and crawl tuning from `config`.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let options = config.scraper.options();
        let mut registry = Self::new();
        registry.register(Arc::new(GoogleEngine::new(
            GOOGLE_COM_ID,
            "google.com",
            "Google",
            &config.engines.google_base_url,
            options,
        )?));
        registry.register(Arc::new(GoogleEngine::new(
            GOOGLE_UK_ID,
            "google.uk",
            "Google/UK",
            &config.engines.google_uk_base_url,
            options,
        )?));
        Ok(registry)
    }

    /// Adds an engine, replacing any previous one under the same id.
    pub fn register(&mut self, engine: Arc<dyn SearchEngine>) {
        self.engines.insert(engine.id(), engine);
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<EngineRef> {
        self.engines.get(&id).map(|engine| EngineRef::new(Arc::clone(engine)))
    }

    /// Like [`EngineRegistry::get`] but an unknown id is an error, for call
    /// sites that cannot proceed without the engine.
    pub fn resolve(&self, id: EntityId) -> Result<EngineRef, EngineError> {
        self.get(id).ok_or(EngineError::UnknownEngine(id))
    }

    /// Handles to every registered engine, in no particular order.
    pub fn engines(&self) -> impl Iterator<Item = EngineRef> + '_ {
        self.engines.values().map(|engine| EngineRef::new(Arc::clone(engine)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
