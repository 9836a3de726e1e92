//! Rankarr tracks where domains place in search engine results.
//!
//! Domains are grouped into categories and carry the keywords to watch; each
//! refresh queries the domain's engines and appends one observation per
//! engine to the rank history. Everything lands in a single transactional
//! store, so histories survive restarts and crashes intact.

pub mod config;
pub mod db;
pub mod engines;
pub mod models;
pub mod progress;
pub mod services;

pub use config::Config;
pub use db::{Store, StoreError, Txn, TxnMode};
pub use engines::{EngineRegistry, SearchEngine};
pub use services::RankingService;
