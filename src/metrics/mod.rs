//! Coverage and target arithmetic.
//!
//! Every function here is pure. Divisors must be finite and strictly positive;
//! a bad divisor is reported as [`MetricsError`] rather than turned into an
//! infinite or NaN result. Results are checked too: a quotient that overflows
//! to infinity, or a rounded figure outside `i64`, is an error. Percentages and
//! counts are rounded half away from zero.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricsError {
    #[error("{name} must be greater than zero, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be a finite number, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("{name} of {value} does not fit a whole-number result")]
    OutOfRange { name: &'static str, value: f64 },
}

pub type MetricsResult<T> = std::result::Result<T, MetricsError>;

fn finite(name: &'static str, value: f64) -> MetricsResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MetricsError::NonFinite { name, value })
    }
}

fn positive(name: &'static str, value: f64) -> MetricsResult<f64> {
    let value = finite(name, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(MetricsError::NonPositive { name, value })
    }
}

/// Round half away from zero into an `i64`, refusing values `as` would clamp.
fn whole_number(name: &'static str, value: f64) -> MetricsResult<i64> {
    let rounded = finite(name, value)?.round();
    // i64::MAX as f64 is 2^63, one past the largest i64
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(MetricsError::OutOfRange { name, value });
    }
    Ok(rounded as i64)
}

fn round_percent(name: &'static str, part: f64, whole: f64) -> MetricsResult<i64> {
    whole_number(name, part / whole * 100.0)
}

/// `round(pipeline / target * 100)`.
pub fn percent_of_target(pipeline: f64, target: f64) -> MetricsResult<i64> {
    let pipeline = finite("pipeline", pipeline)?;
    let target = positive("target", target)?;
    round_percent("percent of target", pipeline, target)
}

/// Pipeline volume needed to close `target` at `win_rate_percent` (e.g. `30` for 30%).
pub fn required_pipeline(target: f64, win_rate_percent: f64) -> MetricsResult<f64> {
    let target = finite("target", target)?;
    let win_rate = positive("win rate", win_rate_percent)?;
    finite("required pipeline", target / (win_rate / 100.0))
}

/// `round(pipeline / required_pipeline * 100)`.
pub fn coverage_percent(pipeline: f64, required_pipeline: f64) -> MetricsResult<i64> {
    let pipeline = finite("pipeline", pipeline)?;
    let required = positive("required pipeline", required_pipeline)?;
    round_percent("coverage percent", pipeline, required)
}

/// Number of wins of `avg_value_per_win` needed to reach `target`.
pub fn deals_required(target: f64, avg_value_per_win: f64) -> MetricsResult<i64> {
    let target = finite("target", target)?;
    let avg = positive("average value per win", avg_value_per_win)?;
    whole_number("deals required", target / avg)
}

/// Share of `whole` made up by `part`, as a rounded percentage.
pub fn mix_percent(part: f64, whole: f64) -> MetricsResult<i64> {
    let part = finite("part", part)?;
    let whole = positive("whole", whole)?;
    round_percent("mix percent", part, whole)
}

/// Required pipeline scaled by the coverage ratio the business wants to hold.
pub fn coverage_pipeline_target(required_pipeline: f64, coverage_ratio: f64) -> MetricsResult<f64> {
    let required = finite("required pipeline", required_pipeline)?;
    let ratio = positive("coverage ratio", coverage_ratio)?;
    finite("coverage pipeline target", required * ratio)
}
