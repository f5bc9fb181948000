use std::collections::BTreeMap;

use appsync_core::{CatalogRecord, InventoryApp, KnownApp, WorkspacePage};
use tracing::debug;

/// Records keyed by app name, iterated in lexical name order.
pub type NameIndex<T> = BTreeMap<String, T>;

/// Later records replace earlier ones with the same key.
pub fn build_index<T>(records: impl IntoIterator<Item = T>, key: impl Fn(&T) -> String) -> NameIndex<T> {
    let mut index = NameIndex::new();
    for record in records {
        let name = key(&record);
        if index.insert(name.clone(), record).is_some() {
            debug!(%name, "duplicate name, keeping the later record");
        }
    }
    index
}

/// Archived and trashed pages are left out.
pub fn index_workspace(pages: Vec<WorkspacePage>) -> NameIndex<WorkspacePage> {
    build_index(pages.into_iter().filter(WorkspacePage::is_live), |p| p.name_key())
}

pub fn index_inventory(apps: Vec<InventoryApp>) -> NameIndex<InventoryApp> {
    build_index(apps, |a| a.name_key())
}

pub fn index_known(apps: Vec<KnownApp>) -> NameIndex<KnownApp> {
    build_index(apps, |k| k.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_duplicate_wins_and_order_is_lexical() {
        let index = build_index(
            vec![("b", 1), ("a", 2), ("b", 3)],
            |(name, _)| name.to_string(),
        );
        let entries: Vec<_> = index.iter().map(|(k, v)| (k.as_str(), v.1)).collect();
        assert_eq!(entries, vec![("a", 2), ("b", 3)]);
    }

    #[test]
    fn empty_input_gives_empty_index() {
        let index = build_index(Vec::<String>::new(), |s| s.clone());
        assert!(index.is_empty());
    }
}
