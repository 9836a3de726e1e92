use tracing::{debug, info, warn};

use crate::db::codec::{decode, encode};
use crate::db::tables::{DOMAIN_KEYWORDS, KEYWORDS};
use crate::db::{Store, StoreError, Txn};
use crate::models::{Domain, EntityId, Keyword};

impl Store {
    /// Writes a keyword and records it under `domain`.
    pub fn store_keyword(
        &self,
        txn: &Txn,
        keyword: &Keyword,
        domain: &Domain,
    ) -> Result<(), StoreError> {
        debug!(
            id = %keyword.id(),
            value = keyword.value(),
            domain = domain.name(),
            "storing keyword"
        );
        txn.put(KEYWORDS, &encode(&keyword.id())?, &encode(keyword)?)?;
        txn.add_child(
            DOMAIN_KEYWORDS,
            &encode(&domain.id())?,
            &encode(&keyword.id())?,
        )
    }

    /// Rewrites a keyword record in place without touching its domain link.
    pub fn update_keyword(&self, txn: &Txn, keyword: &Keyword) -> Result<(), StoreError> {
        debug!(id = %keyword.id(), value = keyword.value(), "updating keyword");
        txn.put(KEYWORDS, &encode(&keyword.id())?, &encode(keyword)?)
    }

    /// Keywords tracked for `domain`, skipping entries whose row is gone.
    pub fn keywords(&self, txn: &Txn, domain: &Domain) -> Result<Vec<Keyword>, StoreError> {
        let mut keywords = Vec::new();
        for id_bytes in txn.children(DOMAIN_KEYWORDS, &encode(&domain.id())?)? {
            match txn.get(KEYWORDS, &id_bytes)? {
                Some(bytes) => keywords.push(decode(&bytes)?),
                None => {
                    let id: EntityId = decode(&id_bytes)?;
                    warn!(
                        keyword = %id,
                        domain = domain.name(),
                        "keyword entry points at a missing row, skipping"
                    );
                }
            }
        }
        Ok(keywords)
    }

    /// Number of keywords under `domain`, without decoding any of them.
    pub fn count_keywords(&self, txn: &Txn, domain: &Domain) -> Result<u64, StoreError> {
        txn.children_count(DOMAIN_KEYWORDS, &encode(&domain.id())?)
    }

    /// Imports one keyword per line of `text`, trimming surrounding
    /// whitespace and skipping blank lines. Returns the keywords created.
    pub fn import_keywords(
        &self,
        txn: &Txn,
        domain: &Domain,
        text: &str,
    ) -> Result<Vec<Keyword>, StoreError> {
        let mut imported = Vec::new();
        for line in text.lines() {
            let value = line.trim();
            if value.is_empty() {
                continue;
            }
            let keyword = Keyword::new(value);
            self.store_keyword(txn, &keyword, domain)?;
            imported.push(keyword);
        }
        info!(domain = domain.name(), count = imported.len(), "imported keywords");
        Ok(imported)
    }

    /// Deletes a keyword, its domain link and its rank history across the
    /// domain's engines. Parts already gone are logged and skipped.
    pub fn delete_keyword(
        &self,
        txn: &Txn,
        keyword: &Keyword,
        domain: &Domain,
    ) -> Result<(), StoreError> {
        debug!(id = %keyword.id(), value = keyword.value(), "deleting keyword");
        if !txn.delete(KEYWORDS, &encode(&keyword.id())?)? {
            warn!(id = %keyword.id(), "keyword row already absent");
        }
        if !txn.remove_child(
            DOMAIN_KEYWORDS,
            &encode(&domain.id())?,
            &encode(&keyword.id())?,
        )? {
            warn!(
                id = %keyword.id(),
                domain = domain.name(),
                "keyword link already absent"
            );
        }
        for engine in domain.engines() {
            self.delete_rankings(txn, keyword, *engine)?;
        }
        Ok(())
    }
}
