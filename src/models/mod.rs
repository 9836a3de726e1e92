pub mod category;
pub mod domain;
pub mod entity;
pub mod keyword;
pub mod ranking;
pub mod tree;

pub use category::{ALL_DOMAINS_NAME, Category};
pub use domain::Domain;
pub use entity::EntityId;
pub use keyword::Keyword;
pub use ranking::{KeywordEngine, RANK_NOT_FOUND, RankDiff, Ranking, RankingKey};
pub use tree::TreeEntry;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time truncated to whole seconds, the resolution timestamps are
/// stored at. Always use this for generated timestamps so values compare
/// equal after a storage round trip.
#[must_use]
pub fn now_secs() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
