use chrono::NaiveDate;

/// Day-first formats are tried after ISO so `2026/03/04` stays year-first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Parse the date part of a CRM export cell.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `DD/MM/YYYY` and `DD-MM-YYYY`, each
/// optionally followed by a time (`"2026/03/31 17:00:00"`). The time is ignored.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date_part = s.split_whitespace().next()?;
    let date_part = date_part.split('T').next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_layouts() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 31);
        assert_eq!(parse_date("2026-03-31"), expected);
        assert_eq!(parse_date("2026/03/31 17:00:00"), expected);
        assert_eq!(parse_date("31/03/2026"), expected);
        assert_eq!(parse_date(" 31-03-2026 "), expected);
        assert_eq!(parse_date("2026-03-31T09:30:00Z"), expected);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("next quarter"), None);
        assert_eq!(parse_date("2026-13-01"), None);
    }
}
