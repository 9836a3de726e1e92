use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// Rank recorded when the domain never appeared within the scan window.
pub const RANK_NOT_FOUND: i32 = -1;

/// One rank observation: where a domain sat in the result list for a keyword
/// on an engine at a given moment. A negative rank means it was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub rank: i32,
    pub page_url: String,
}

impl Ranking {
    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.rank >= 0
    }
}

/// Secondary index key: all observations for one keyword on one engine hang
/// off this pair, keyed by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEngine {
    pub keyword: EntityId,
    pub engine: EntityId,
}

/// Primary key of a single observation. Encoded with the timestamp last so
/// records for one keyword/engine pair sort chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingKey {
    pub keyword: EntityId,
    pub engine: EntityId,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl RankingKey {
    #[must_use]
    pub const fn new(pair: KeywordEngine, timestamp: DateTime<Utc>) -> Self {
        Self {
            keyword: pair.keyword,
            engine: pair.engine,
            timestamp,
        }
    }
}

/// Movement between the two most recent observations. Positive delta means
/// the domain climbed towards position one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankDiff {
    pub delta: i32,
    pub latest: Ranking,
    pub previous: Ranking,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now_secs;

    #[test]
    fn test_sentinel_rank_is_not_found() {
        let hit = Ranking {
            timestamp: now_secs(),
            rank: 1,
            page_url: "https://www.google.com/search?q=x".to_string(),
        };
        let miss = Ranking {
            timestamp: now_secs(),
            rank: RANK_NOT_FOUND,
            page_url: String::new(),
        };
        assert!(hit.is_found());
        assert!(!miss.is_found());
    }
}
