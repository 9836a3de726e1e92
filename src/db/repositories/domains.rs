use tracing::{debug, warn};

use crate::db::codec::{decode, encode};
use crate::db::tables::{CATEGORY_DOMAINS, DOMAINS};
use crate::db::{Store, StoreError, Txn};
use crate::models::{Category, Domain, EntityId};

impl Store {
    /// Writes a domain and, when the category is a real one, records its
    /// membership there. Filing under the synthetic all-domains category
    /// stores the domain without any grouping.
    pub fn store_domain(
        &self,
        txn: &Txn,
        domain: &Domain,
        category: &Category,
    ) -> Result<(), StoreError> {
        debug!(
            id = %domain.id(),
            name = domain.name(),
            category = category.name(),
            "storing domain"
        );
        txn.put(DOMAINS, &encode(&domain.id())?, &encode(domain)?)?;
        if !category.is_all_domains() {
            txn.add_child(
                CATEGORY_DOMAINS,
                &encode(&category.id())?,
                &encode(&domain.id())?,
            )?;
        }
        Ok(())
    }

    /// Rewrites a domain record in place without touching its grouping.
    pub fn update_domain(&self, txn: &Txn, domain: &Domain) -> Result<(), StoreError> {
        debug!(id = %domain.id(), name = domain.name(), "updating domain");
        txn.put(DOMAINS, &encode(&domain.id())?, &encode(domain)?)
    }

    /// Every stored domain regardless of grouping, in id order.
    pub fn domains(&self, txn: &Txn) -> Result<Vec<Domain>, StoreError> {
        let mut domains = Vec::new();
        for bytes in txn.scan_values(DOMAINS)? {
            domains.push(decode(&bytes)?);
        }
        Ok(domains)
    }

    /// Domains grouped under `category`. The synthetic all-domains category
    /// yields every domain; membership entries whose domain row is gone are
    /// skipped with a warning.
    pub fn domains_in(&self, txn: &Txn, category: &Category) -> Result<Vec<Domain>, StoreError> {
        if category.is_all_domains() {
            return self.domains(txn);
        }
        let mut domains = Vec::new();
        for id_bytes in txn.children(CATEGORY_DOMAINS, &encode(&category.id())?)? {
            match txn.get(DOMAINS, &id_bytes)? {
                Some(bytes) => domains.push(decode(&bytes)?),
                None => {
                    let id: EntityId = decode(&id_bytes)?;
                    warn!(
                        domain = %id,
                        category = category.name(),
                        "membership entry points at a missing domain, skipping"
                    );
                }
            }
        }
        Ok(domains)
    }

    /// Deletes a domain together with its keywords and their rank history.
    /// Category membership entries naming the domain stay behind; reads skip
    /// them and [`Store::delete_category`] clears them with the category.
    pub fn delete_domain(&self, txn: &Txn, domain: &Domain) -> Result<(), StoreError> {
        debug!(id = %domain.id(), name = domain.name(), "deleting domain");
        for keyword in self.keywords(txn, domain)? {
            self.delete_keyword(txn, &keyword, domain)?;
        }
        if !txn.delete(DOMAINS, &encode(&domain.id())?)? {
            warn!(id = %domain.id(), "domain row already absent");
        }
        Ok(())
    }
}
