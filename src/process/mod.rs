// src/process/mod.rs
pub mod aggregate;
pub mod date_parser;
pub mod normalize;
pub mod utils;

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::process::utils::clean_str;

pub use aggregate::{aggregate, GroupAggregate};
pub use normalize::{normalize, Record};

const BOM: char = '\u{feff}';

/// One data line of an export, keyed by the header line.
///
/// Field order follows the header. Looking up a column that is not in the
/// header yields `""`, so callers never branch on whether a key exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl RawRow {
    /// Pad or truncate `values` to the header width.
    fn aligned(headers: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(headers.len(), String::new());
        Self { headers, values }
    }

    /// Value of column `name`, or `""` when the header has no such column.
    /// With duplicate header names the first one wins.
    pub fn get(&self, name: &str) -> &str {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|i| self.values[i].as_str())
            .unwrap_or("")
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// `(header, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Split one line on commas that sit outside a double-quoted span.
///
/// Quote characters are kept in the raw field and stripped later by
/// [`clean_str`]. Every `"` flips the quoted state, so a doubled quote inside
/// a quoted field is not an escape.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields.iter().map(|f| clean_str(f)).collect()
}

/// Parse a comma-delimited export into header-keyed rows.
///
/// The first non-blank line is the header. Blank lines are skipped, short rows
/// are padded with empty fields and extra trailing fields are dropped. This
/// never fails: malformed quoting just produces whatever fields the scan
/// yields.
#[tracing::instrument(level = "debug", skip(text), fields(bytes = text.len()))]
pub fn parse(text: &str) -> Vec<RawRow> {
    let text = text.strip_prefix(BOM).unwrap_or(text).trim_end();

    let mut lines = text.split('\n').filter(|l| !l.trim().is_empty());
    let headers: Arc<[String]> = match lines.next() {
        Some(line) => split_line(line).into(),
        None => {
            debug!("no header line; empty export");
            return Vec::new();
        }
    };

    let rows: Vec<RawRow> = lines
        .map(|line| {
            let fields = split_line(line);
            if fields.len() != headers.len() {
                trace!(
                    expected = headers.len(),
                    found = fields.len(),
                    "aligning row to header width"
                );
            }
            RawRow::aligned(Arc::clone(&headers), fields)
        })
        .collect();

    debug!(columns = headers.len(), rows = rows.len(), "parsed export");
    rows
}
