// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Grouping and joining of typed records.

use std::hash::Hash;

use hashbrown::HashMap;
use indexmap::IndexMap;

/// Group records by a key. Groups (and records inside them) keep the order of first appearance.
pub fn group_by<R, K, F>(records: impl IntoIterator<Item = R>, key: F) -> IndexMap<K, Vec<R>>
where
    K: Hash + Eq,
    F: Fn(&R) -> K,
{
    let mut groups: IndexMap<K, Vec<R>> = IndexMap::new();
    for record in records {
        groups.entry(key(&record)).or_default().push(record);
    }
    groups
}

/// Inner join of two tables. Records without a key never match.
///
/// Every pair of records with equal keys is returned (many-to-many),
/// ordered by the position of the left record.
pub fn inner_join<'a, L, R, K, FL, FR>(
    left: &'a [L],
    right: &'a [R],
    left_key: FL,
    right_key: FR,
) -> Vec<(&'a L, &'a R)>
where
    K: Hash + Eq,
    FL: Fn(&L) -> Option<K>,
    FR: Fn(&R) -> Option<K>,
{
    let mut index: HashMap<K, Vec<&R>> = HashMap::new();
    for record in right {
        if let Some(key) = right_key(record) {
            index.entry(key).or_default().push(record);
        }
    }

    let mut joined = Vec::new();
    for record in left {
        let Some(key) = left_key(record) else {
            continue;
        };

        if let Some(matches) = index.get(&key) {
            joined.extend(matches.iter().map(|&r| (record, r)));
        }
    }

    joined
}
