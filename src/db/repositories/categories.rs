use tracing::{debug, warn};

use crate::db::codec::{decode, encode};
use crate::db::tables::{CATEGORIES, CATEGORY_DOMAINS};
use crate::db::{Store, StoreError, Txn};
use crate::models::Category;

impl Store {
    /// Writes a category record, inserting or replacing by id.
    pub fn store_category(&self, txn: &Txn, category: &Category) -> Result<(), StoreError> {
        debug!(id = %category.id(), name = category.name(), "storing category");
        txn.put(CATEGORIES, &encode(&category.id())?, &encode(category)?)
    }

    /// The synthetic all-domains category followed by every stored category
    /// in id order. The synthetic entry is built fresh on each call and never
    /// touches storage.
    pub fn categories(&self, txn: &Txn) -> Result<Vec<Category>, StoreError> {
        let mut categories = vec![Category::all_domains()];
        for bytes in txn.scan_values(CATEGORIES)? {
            categories.push(decode(&bytes)?);
        }
        Ok(categories)
    }

    /// Deletes a category together with every domain grouped under it,
    /// keywords and rank history included. On the synthetic all-domains
    /// category this clears every stored domain; there is no category row to
    /// remove in that case.
    pub fn delete_category(&self, txn: &Txn, category: &Category) -> Result<(), StoreError> {
        debug!(id = %category.id(), name = category.name(), "deleting category");
        for domain in self.domains_in(txn, category)? {
            self.delete_domain(txn, &domain)?;
        }
        if category.is_all_domains() {
            return Ok(());
        }
        let key = encode(&category.id())?;
        txn.remove_children(CATEGORY_DOMAINS, &key)?;
        if !txn.delete(CATEGORIES, &key)? {
            warn!(id = %category.id(), "category row already absent");
        }
        Ok(())
    }
}
