use serde::Serialize;
use std::collections::BTreeMap;

use crate::process::Record;

/// All records sharing one group key, in the order they were encountered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub key: String,
    pub records: Vec<Record>,
    /// Sum of `records[..].value()`.
    pub total: f64,
}

impl GroupAggregate {
    fn new(key: String) -> Self {
        Self {
            key,
            records: Vec::new(),
            total: 0.0,
        }
    }

    fn push(&mut self, record: Record) {
        self.total += record.value();
        self.records.push(record);
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

/// Group `records` by `key_of`, summing values per group.
///
/// Each call starts from an empty map, so the same input always yields the
/// same output.
pub fn aggregate<I, F>(records: I, key_of: F) -> BTreeMap<String, GroupAggregate>
where
    I: IntoIterator<Item = Record>,
    F: Fn(&Record) -> String,
{
    let mut groups: BTreeMap<String, GroupAggregate> = BTreeMap::new();
    for record in records {
        let key = key_of(&record);
        groups
            .entry(key.clone())
            .or_insert_with(|| GroupAggregate::new(key))
            .push(record);
    }
    groups
}
