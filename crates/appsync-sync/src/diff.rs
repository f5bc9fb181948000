use appsync_core::CatalogRecord;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::index::NameIndex;

/// Values of `left` whose name has no entry in `right`, in `left` order.
pub fn missing<'a, L, R>(left: &'a NameIndex<L>, right: &NameIndex<R>) -> Vec<&'a L> {
    left.iter()
        .filter(|(name, _)| !right.contains_key(*name))
        .map(|(name, value)| {
            info!(%name, "missing from target");
            value
        })
        .collect()
}

/// Values of `left` whose counterpart in `right` was modified strictly
/// earlier. Names present on one side only are ignored.
pub fn stale_in<'a, L, R>(
    left: &'a NameIndex<L>,
    left_time: impl Fn(&L) -> DateTime<Utc>,
    right: &NameIndex<R>,
    right_time: impl Fn(&R) -> DateTime<Utc>,
) -> Vec<&'a L> {
    left.iter()
        .filter_map(|(name, value)| {
            let other = right.get(name)?;
            (left_time(value) > right_time(other)).then_some(value)
        })
        .collect()
}

/// What `target` lacks relative to `source`.
#[derive(Debug)]
pub struct DiffResult<'a, S> {
    pub missing: Vec<&'a S>,
    pub stale: Vec<&'a S>,
}

pub fn diff<'a, S, T>(source: &'a NameIndex<S>, target: &NameIndex<T>) -> DiffResult<'a, S>
where
    S: CatalogRecord,
    T: CatalogRecord,
{
    DiffResult {
        missing: missing(source, target),
        stale: stale_in(source, S::last_modified, target, T::last_modified),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_index;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec {
        name: &'static str,
        at: DateTime<Utc>,
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, day, 0, 0, 0).single().unwrap()
    }

    fn index(records: &[(&'static str, u32)]) -> NameIndex<Rec> {
        build_index(
            records.iter().map(|&(name, day)| Rec { name, at: at(day) }),
            |r| r.name.to_string(),
        )
    }

    fn names(records: Vec<&Rec>) -> Vec<&'static str> {
        records.into_iter().map(|r| r.name).collect()
    }

    #[test]
    fn nothing_is_missing_from_itself() {
        let left = index(&[("Foo", 1), ("Bar", 2)]);
        assert!(missing(&left, &left).is_empty());
    }

    #[test]
    fn disjoint_sets_are_entirely_missing() {
        let left = index(&[("Foo", 1), ("Bar", 2), ("Foo", 3)]);
        let right = index(&[("Baz", 1)]);
        assert_eq!(names(missing(&left, &right)), vec!["Bar", "Foo"]);
    }

    #[test]
    fn stale_only_considers_shared_names() {
        let left = index(&[("Foo", 5), ("Bar", 5)]);
        let right = index(&[("Bar", 1), ("Baz", 1)]);
        let stale = stale_in(&left, |r| r.at, &right, |r| r.at);
        assert_eq!(names(stale), vec!["Bar"]);
    }

    #[test]
    fn equal_timestamps_are_not_stale() {
        let left = index(&[("Foo", 3), ("Bar", 4)]);
        let right = index(&[("Foo", 3), ("Bar", 3)]);
        let stale = stale_in(&left, |r| r.at, &right, |r| r.at);
        assert_eq!(names(stale), vec!["Bar"]);

        let reverse = stale_in(&right, |r| r.at, &left, |r| r.at);
        assert!(reverse.is_empty());
    }
}
