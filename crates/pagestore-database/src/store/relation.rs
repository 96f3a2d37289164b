//! Batched attachment of related records.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;

use pagestore_core::result::AppResult;

use crate::executor::Executor;

/// Loads related records for a page and splices them onto it.
///
/// An implementation is invoked once per page with every record of that page
/// and is expected to issue a single batched query, typically with
/// [`collect_keys`] and `Store::list_by_ids` on the related store bound to
/// `executor`.
#[async_trait]
pub trait Relation<T: Send + Sync + 'static>: Send + Sync {
    /// Attach related data to `records` in place.
    async fn attach(&self, executor: &Arc<dyn Executor>, records: &mut [T]) -> AppResult<()>;
}

/// Collect the keys `key` yields for `records`, dropping duplicates and
/// keeping first-seen order.
pub fn collect_keys<T, K, F>(records: &[T], mut key: F) -> Vec<K>
where
    K: Eq + Hash + Clone,
    F: FnMut(&T) -> Option<K>,
{
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|r| key(r))
        .filter(|k| seen.insert(k.clone()))
        .collect()
}
