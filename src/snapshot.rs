// src/snapshot.rs

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::config::Columns;
use crate::process::{self, GroupAggregate, Record};

/// One complete parse + aggregate pass over an export.
///
/// A snapshot is never updated; the next ingestion builds a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Data rows in the export, before any owner filtering.
    pub row_count: usize,
    pub groups: BTreeMap<String, GroupAggregate>,
}

impl Snapshot {
    /// Parse `text` and aggregate the amount column for each of `owners`.
    ///
    /// Owners with no qualifying rows are simply absent from `groups`.
    #[tracing::instrument(level = "info", skip_all, fields(owners = owners.len()))]
    pub fn build(text: &str, columns: &Columns, owners: &[&str]) -> Self {
        let rows = process::parse(text);

        let mut records: Vec<Record> = Vec::new();
        for (i, owner) in owners.iter().enumerate() {
            // a repeated owner would otherwise be counted twice
            if owners[..i].contains(owner) {
                continue;
            }
            records.extend(process::normalize(&rows, &columns.owner, owner, &columns.amount));
        }

        let owner_col = columns.owner.as_str();
        let groups = process::aggregate(records, |r| r.get(owner_col).trim().to_string());

        info!(rows = rows.len(), groups = groups.len(), "built snapshot");
        Self {
            row_count: rows.len(),
            groups,
        }
    }

    pub fn group(&self, owner: &str) -> Option<&GroupAggregate> {
        self.groups.get(owner)
    }

    /// Aggregated amount for `owner`, `0.0` when it has no records.
    pub fn total_for(&self, owner: &str) -> f64 {
        self.group(owner).map_or(0.0, |g| g.total)
    }

    /// Sum over every group in the snapshot.
    pub fn grand_total(&self) -> f64 {
        self.groups.values().map(|g| g.total).sum()
    }
}
