use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::process::date_parser::parse_date;
use crate::process::utils::parse_amount;
use crate::process::RawRow;

/// A row that passed the scope filter, with its amount column as a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(flatten)]
    row: RawRow,
    value: f64,
}

impl Record {
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Raw (cleaned) text of column `name`; `""` when absent.
    pub fn get(&self, name: &str) -> &str {
        self.row.get(name)
    }

    /// Column `name` read as a calendar date, if it holds one.
    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        parse_date(self.row.get(name))
    }

    pub fn row(&self) -> &RawRow {
        &self.row
    }
}

/// Keep the rows whose `group_field` equals `group_value` and whose
/// `amount_field` is non-empty, converting the amount into [`Record::value`].
///
/// The group comparison is exact and case-sensitive after trimming. A row with
/// an unparseable amount is kept with value `0.0`; a row with an empty amount
/// is dropped.
pub fn normalize(
    rows: &[RawRow],
    group_field: &str,
    group_value: &str,
    amount_field: &str,
) -> Vec<Record> {
    let records: Vec<Record> = rows
        .iter()
        .filter(|row| row.get(group_field).trim() == group_value)
        .filter_map(|row| {
            let amount = row.get(amount_field).trim();
            if amount.is_empty() {
                return None;
            }
            Some(Record {
                row: row.clone(),
                value: parse_amount(amount),
            })
        })
        .collect();

    debug!(
        group = group_value,
        kept = records.len(),
        scanned = rows.len(),
        "normalized rows"
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::parse;

    const EXPORT: &str = "\
Owner,Account,Stage,Close Date,Amount
Tony Goh,Acme Builders,Proposal,2026-03-31,\"$1,234,567.89\"
Tony Goh,Beta Homes,Discovery,2026-05-01,abc
Tony Goh,Gamma Civil,Qualify,2026-06-30,
tony goh,Delta Dev,Proposal,2026-02-01,$10
 Tony Goh ,Epsilon,Negotiate,01/07/2026,$20
Alex,Zeta,Proposal,2026-04-01,$999
";

    #[test]
    fn filters_by_exact_owner_and_non_empty_amount() {
        let rows = parse(EXPORT);
        let records = normalize(&rows, "Owner", "Tony Goh", "Amount");

        let accounts: Vec<&str> = records.iter().map(|r| r.get("Account")).collect();
        assert_eq!(accounts, vec!["Acme Builders", "Beta Homes", "Epsilon"]);
    }

    #[test]
    fn amount_conversion_outcomes() {
        let rows = parse(EXPORT);
        let records = normalize(&rows, "Owner", "Tony Goh", "Amount");

        assert_eq!(records[0].value(), 1234567.89);
        // unparseable amount is kept as zero, unlike the empty one which is dropped
        assert_eq!(records[1].value(), 0.0);
        assert_eq!(records[2].value(), 20.0);
    }

    #[test]
    fn missing_columns_select_nothing() {
        let rows = parse(EXPORT);
        assert!(normalize(&rows, "Rep", "Tony Goh", "Amount").is_empty());
        assert!(normalize(&rows, "Owner", "Tony Goh", "Margin").is_empty());
    }

    #[test]
    fn records_expose_dates() {
        let rows = parse(EXPORT);
        let records = normalize(&rows, "Owner", "Tony Goh", "Amount");
        assert_eq!(
            records[0].date("Close Date"),
            NaiveDate::from_ymd_opt(2026, 3, 31)
        );
        assert_eq!(
            records[2].date("Close Date"),
            NaiveDate::from_ymd_opt(2026, 7, 1)
        );
        assert_eq!(records[0].date("Stage"), None);
    }
}
