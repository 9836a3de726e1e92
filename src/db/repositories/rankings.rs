use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::codec::{decode, encode};
use crate::db::tables::{KEYWORD_RANKINGS, RANKINGS};
use crate::db::{Store, StoreError, Txn};
use crate::models::{EntityId, Keyword, KeywordEngine, RankDiff, Ranking, RankingKey};

/// Observation timestamp as stored in the history index: bare seconds, so the
/// duplicate values sort chronologically under their keyword/engine key.
#[derive(Serialize, Deserialize)]
struct IndexedTime(#[serde(with = "chrono::serde::ts_seconds")] DateTime<Utc>);

impl Store {
    // ========================================================================
    // Write Path
    // ========================================================================

    /// Records one rank observation: the record itself under its composite
    /// key, plus its timestamp in the per-pair history index. Both writes
    /// belong to the caller's transaction, so they land together or not at
    /// all.
    pub fn store_ranking(
        &self,
        txn: &Txn,
        keyword: &Keyword,
        engine: EntityId,
        ranking: &Ranking,
    ) -> Result<(), StoreError> {
        debug!(
            keyword = keyword.value(),
            engine = %engine,
            rank = ranking.rank,
            "storing ranking"
        );
        let pair = KeywordEngine { keyword: keyword.id(), engine };
        let key = encode(&RankingKey::new(pair, ranking.timestamp))?;
        txn.put(RANKINGS, &key, &encode(ranking)?)?;
        txn.add_child(
            KEYWORD_RANKINGS,
            &encode(&pair)?,
            &encode(&IndexedTime(ranking.timestamp))?,
        )
    }

    /// Drops the whole history for a keyword on one engine.
    pub fn delete_rankings(
        &self,
        txn: &Txn,
        keyword: &Keyword,
        engine: EntityId,
    ) -> Result<(), StoreError> {
        let pair = KeywordEngine { keyword: keyword.id(), engine };
        let pair_bytes = encode(&pair)?;
        let stamps = txn.children(KEYWORD_RANKINGS, &pair_bytes)?;
        if stamps.is_empty() {
            debug!(keyword = keyword.value(), engine = %engine, "no rank history to delete");
            return Ok(());
        }
        for bytes in &stamps {
            let IndexedTime(timestamp) = decode(bytes)?;
            if !txn.delete(RANKINGS, &encode(&RankingKey::new(pair, timestamp))?)? {
                warn!(keyword = keyword.value(), "rank record already absent");
            }
        }
        txn.remove_children(KEYWORD_RANKINGS, &pair_bytes)?;
        debug!(keyword = keyword.value(), engine = %engine, removed = stamps.len(), "rank history deleted");
        Ok(())
    }

    // ========================================================================
    // History Queries
    // ========================================================================

    /// Full history for a keyword on one engine, oldest first.
    pub fn rankings(
        &self,
        txn: &Txn,
        keyword: &Keyword,
        engine: EntityId,
    ) -> Result<Vec<Ranking>, StoreError> {
        let pair = KeywordEngine { keyword: keyword.id(), engine };
        let mut history = Vec::new();
        for bytes in txn.children(KEYWORD_RANKINGS, &encode(&pair)?)? {
            let IndexedTime(timestamp) = decode(&bytes)?;
            if let Some(ranking) = self.ranking_record(txn, pair, timestamp)? {
                history.push(ranking);
            }
        }
        Ok(history)
    }

    /// Most recent observation for a keyword on one engine.
    pub fn last_ranking(
        &self,
        txn: &Txn,
        keyword: &Keyword,
        engine: EntityId,
    ) -> Result<Option<Ranking>, StoreError> {
        let pair = KeywordEngine { keyword: keyword.id(), engine };
        match txn.last_child(KEYWORD_RANKINGS, &encode(&pair)?)? {
            Some(bytes) => {
                let IndexedTime(timestamp) = decode(&bytes)?;
                self.ranking_record(txn, pair, timestamp)
            }
            None => Ok(None),
        }
    }

    /// Observation immediately before `ranking` in the same keyword/engine
    /// stream. Never crosses into a neighbouring stream, whatever sits next
    /// to it in the table.
    pub fn prev_ranking(
        &self,
        txn: &Txn,
        keyword: &Keyword,
        engine: EntityId,
        ranking: &Ranking,
    ) -> Result<Option<Ranking>, StoreError> {
        let pair = KeywordEngine { keyword: keyword.id(), engine };
        let lower = encode(&RankingKey::new(pair, DateTime::<Utc>::UNIX_EPOCH))?;
        let upper = encode(&RankingKey::new(pair, ranking.timestamp))?;
        match txn.latest_below(RANKINGS, &lower, &upper)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Movement between the two most recent observations. `None` until two
    /// exist, or when either of them is a not-found sentinel.
    pub fn diff_ranking(
        &self,
        txn: &Txn,
        keyword: &Keyword,
        engine: EntityId,
    ) -> Result<Option<RankDiff>, StoreError> {
        let pair = KeywordEngine { keyword: keyword.id(), engine };
        let stamps = txn.children(KEYWORD_RANKINGS, &encode(&pair)?)?;
        if stamps.len() < 2 {
            return Ok(None);
        }
        let IndexedTime(latest_at) = decode(&stamps[stamps.len() - 1])?;
        let IndexedTime(previous_at) = decode(&stamps[stamps.len() - 2])?;
        let (Some(latest), Some(previous)) = (
            self.ranking_record(txn, pair, latest_at)?,
            self.ranking_record(txn, pair, previous_at)?,
        ) else {
            return Ok(None);
        };
        if !latest.is_found() || !previous.is_found() {
            return Ok(None);
        }
        // Positive delta means the domain climbed towards position one.
        Ok(Some(RankDiff {
            delta: previous.rank - latest.rank,
            latest,
            previous,
        }))
    }

    /// Best real rank ever observed for a keyword on one engine. A sentinel
    /// comes back only when no real rank exists at all; `None` when there is
    /// no history.
    pub fn best_ranking(
        &self,
        txn: &Txn,
        keyword: &Keyword,
        engine: EntityId,
    ) -> Result<Option<Ranking>, StoreError> {
        let mut best: Option<Ranking> = None;
        for candidate in self.rankings(txn, keyword, engine)? {
            best = Some(match best {
                None => candidate,
                Some(current) => {
                    if !current.is_found() || (candidate.is_found() && candidate.rank < current.rank)
                    {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }
        Ok(best)
    }

    /// Loads the record a history entry points at, tolerating one that has
    /// gone missing underneath it.
    fn ranking_record(
        &self,
        txn: &Txn,
        pair: KeywordEngine,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<Ranking>, StoreError> {
        match txn.get(RANKINGS, &encode(&RankingKey::new(pair, timestamp))?)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => {
                warn!(%timestamp, "history entry points at a missing rank record, skipping");
                Ok(None)
            }
        }
    }
}
