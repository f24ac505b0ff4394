//! Bucketing of records by match key

use std::collections::{HashMap, HashSet};

use super::match_key::Keyed;

/// Records of one side grouped by match-key string
///
/// Keys remember the order they were first seen in, and records keep their
/// input order inside each group. The reducer relies on the latter to decide
/// which records of an oversized group are the excess.
#[derive(Debug, Clone)]
pub struct Grouping<T> {
    groups: HashMap<String, Vec<T>>,
    order: Vec<String>,
}

impl<T> Grouping<T> {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Records sharing `key`, empty if the key is absent
    pub fn get(&self, key: &str) -> &[T] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Keys present in this grouping, in first-seen order
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total number of records across all groups
    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    fn push(&mut self, key: String, record: T) {
        match self.groups.get_mut(&key) {
            Some(group) => group.push(record),
            None => {
                self.order.push(key.clone());
                self.groups.insert(key, vec![record]);
            }
        }
    }
}

impl<T> Default for Grouping<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> FromIterator<T> for Grouping<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut grouping = Grouping::new();
        for record in iter {
            grouping.push(record.match_key().to_string(), record);
        }
        grouping
    }
}

/// Group records by their match key, preserving input order within groups
pub fn group_by_key<T: Keyed>(records: impl IntoIterator<Item = T>) -> Grouping<T> {
    records.into_iter().collect()
}

/// Deduplicated union of two key lists
///
/// Transaction-side keys come first, followed by bank-side keys not already
/// present. Every record of either side belongs to exactly one returned key.
pub fn combine_keys(transaction_keys: &[String], bank_keys: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(transaction_keys.len() + bank_keys.len());
    transaction_keys
        .iter()
        .chain(bank_keys)
        .filter(|key| seen.insert(key.as_str()))
        .cloned()
        .collect()
}
