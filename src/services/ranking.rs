//! Orchestrates rank refreshes: runs the scrapes, composes progress across
//! engines, keywords and domains, and lands every observation in the store.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::db::{Store, StoreError, TxnMode};
use crate::engines::{EngineRef, EngineRegistry};
use crate::models::{Domain, Keyword, Ranking, now_secs};
use crate::progress::{OffsetProgress, ProgressSink, TrackingProgress};

pub struct RankingService {
    store: Store,
    registry: Arc<EngineRegistry>,
}

impl RankingService {
    #[must_use]
    pub const fn new(store: Store, registry: Arc<EngineRegistry>) -> Self {
        Self { store, registry }
    }

    /// Queries every engine of `domain` for `keyword` and records one
    /// observation per engine, all sharing a single timestamp. The caller is
    /// trusted on the keyword belonging to the domain; nothing verifies it.
    ///
    /// Progress accumulates across engines without normalization: each engine
    /// contributes up to its scan limit on top of the previous ones.
    pub async fn refresh_keyword(
        &self,
        keyword: &Keyword,
        domain: &Domain,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<()> {
        info!(
            keyword = keyword.value(),
            domain = domain.name(),
            engines = domain.engines().len(),
            "refreshing keyword"
        );
        let tracker = Arc::new(TrackingProgress::new(progress));
        let taken_at = now_secs();
        for engine_id in domain.engines() {
            let engine = self.registry.resolve(*engine_id)?;
            let child = OffsetProgress::new(
                tracker.current(),
                Arc::clone(&tracker) as Arc<dyn ProgressSink>,
            );
            let outcome = engine
                .rank_query(domain.name(), keyword.value(), &child)
                .await?;
            let ranking = Ranking {
                timestamp: taken_at,
                rank: outcome.rank,
                page_url: outcome.page_url,
            };
            self.store_observation(keyword, &engine, &ranking)?;
        }
        Ok(())
    }

    /// Refreshes every keyword of `domain`, chaining their progress so the
    /// total keeps growing monotonically over the whole run.
    pub async fn refresh_domain(
        &self,
        domain: &Domain,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<()> {
        let keywords = {
            let txn = self.store.begin(TxnMode::ReadOnly)?;
            let keywords = self.store.keywords(&txn, domain)?;
            txn.commit()?;
            keywords
        };
        info!(
            domain = domain.name(),
            keywords = keywords.len(),
            "refreshing domain"
        );
        let tracker = Arc::new(TrackingProgress::new(progress));
        for keyword in &keywords {
            let child = OffsetProgress::new(
                tracker.current(),
                Arc::clone(&tracker) as Arc<dyn ProgressSink>,
            );
            self.refresh_keyword(keyword, domain, Arc::new(child)).await?;
        }
        Ok(())
    }

    /// Refreshes a whole collection of domains, one after another, under one
    /// accumulated progress stream.
    pub async fn refresh_domains(
        &self,
        domains: &[Domain],
        progress: Arc<dyn ProgressSink>,
    ) -> Result<()> {
        info!(count = domains.len(), "refreshing domain collection");
        let tracker = Arc::new(TrackingProgress::new(progress));
        for domain in domains {
            let child = OffsetProgress::new(
                tracker.current(),
                Arc::clone(&tracker) as Arc<dyn ProgressSink>,
            );
            self.refresh_domain(domain, Arc::new(child)).await?;
        }
        Ok(())
    }

    /// Commits one observation in its own short transaction. On quota
    /// exhaustion the transaction is dropped, capacity raised and the write
    /// retried fresh, exactly once per raise.
    fn store_observation(
        &self,
        keyword: &Keyword,
        engine: &EngineRef,
        ranking: &Ranking,
    ) -> Result<()> {
        loop {
            match self.try_store(keyword, engine, ranking) {
                Ok(()) => return Ok(()),
                Err(StoreError::CapacityExhausted { used, capacity }) => {
                    warn!(used, capacity, "storage quota exhausted, raising capacity");
                    self.store.increase_capacity();
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn try_store(
        &self,
        keyword: &Keyword,
        engine: &EngineRef,
        ranking: &Ranking,
    ) -> Result<(), StoreError> {
        let txn = self.store.begin(TxnMode::ReadWrite)?;
        self.store.store_ranking(&txn, keyword, engine.id(), ranking)?;
        txn.commit()
    }
}
