//! Individual check routines.
//!
//! Each routine inspects one aspect of a single state's row and reports any
//! findings to the [`ResultLog`]. Nothing here panics on bad data; a value
//! the routine cannot judge is simply reported.

use chrono::{DateTime, FixedOffset};

use crate::dates;
use crate::error::Result;
use crate::forecast::Forecast;
use crate::model::{CountyDay, HistoryDay, StateDay};
use crate::result_log::ResultLog;

/// Acceptance band around the forecast projections: the observed value must
/// lie between `0.95 * linear` and `1.1 * exponential`.
pub const FIT_THRESHOLDS: [f64; 2] = [0.95, 1.1];

/// Cumulative metrics covered by the day-over-day increase checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Positive,
    Negative,
    Death,
    Total,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Positive,
        Metric::Negative,
        Metric::Death,
        Metric::Total,
    ];

    fn name(self) -> &'static str {
        match self {
            Metric::Positive => "positive",
            Metric::Negative => "negative",
            Metric::Death => "death",
            Metric::Total => "total",
        }
    }

    fn of_day(self, row: &StateDay) -> i64 {
        match self {
            Metric::Positive => row.positive,
            Metric::Negative => row.negative,
            Metric::Death => row.death,
            Metric::Total => row.total,
        }
    }

    fn of_history(self, row: &HistoryDay) -> i64 {
        match self {
            Metric::Positive => row.positive,
            Metric::Negative => row.negative,
            Metric::Death => row.death,
            Metric::Total => row.total,
        }
    }

    /// Below this value an unchanged metric is not worth flagging.
    fn ignore_threshold(self) -> i64 {
        match self {
            Metric::Positive => 100,
            Metric::Negative => 900,
            Metric::Death => 20,
            Metric::Total => 1000,
        }
    }

    /// Expected day-over-day percent growth band.
    fn expected_percent(self) -> (f64, f64) {
        match self {
            Metric::Positive => (5.0, 40.0),
            Metric::Negative => (5.0, 50.0),
            Metric::Death => (0.0, 10.0),
            Metric::Total => (5.0, 50.0),
        }
    }
}

/// Check that pendings, positive, and negative sum to the reported total.
pub fn total(row: &StateDay, log: &mut ResultLog) {
    let diff = row.total - (row.positive + row.negative + row.pending);
    if diff != 0 {
        log.error(
            &row.state,
            format!(
                "Formula broken -> Positive ({}) + Negative ({}) + Pending ({}) != Total ({}), delta = {}",
                fmt_count(row.positive),
                fmt_count(row.negative),
                fmt_count(row.pending),
                fmt_count(row.total),
                fmt_count(diff)
            ),
        );
    }
}

/// Source has updated within a reasonable timeframe.
pub fn last_update(row: &StateDay, now: DateTime<FixedOffset>, log: &mut ResultLog) {
    let days = (now - row.last_update_et).num_seconds() as f64 / 86_400.0;
    if days >= 1.5 {
        log.error(
            &row.state,
            format!("source hasn't updated in {days:.1} days"),
        );
    }
}

/// Data was checked within a reasonable timeframe.
pub fn last_checked(row: &StateDay, now: DateTime<FixedOffset>, log: &mut ResultLog) {
    let updated_at = row.last_update_et;
    let checked_at = row.last_check_et;

    let hours = (updated_at - checked_at).num_seconds() as f64 / 3_600.0;
    if hours > 2.0 {
        log.error(
            &row.state,
            format!(
                "updated since last check: {hours:.0} hours ago at {}, checked at {}",
                updated_at.format("%m/%d %H:%M"),
                checked_at.format("%m/%d %H:%M")
            ),
        );
        return;
    }

    let hours = (now - updated_at).num_seconds() as f64 / 3_600.0;
    if hours > 12.0 {
        log.warning(
            &row.state,
            format!(
                "source has not been checked in {hours:.0} hours at {}",
                checked_at.format("%m/%d %H:%M")
            ),
        );
    }
}

/// Confirm that checker initials are recorded.
pub fn checkers_initials(row: &StateDay, log: &mut ResultLog) {
    if row.checker.trim().is_empty() {
        log.warning(&row.state, "Missing checker initials");
        return;
    }
    if row.double_checker.trim().is_empty() {
        log.warning(&row.state, "Missing double-checker initials");
    }
}

/// Check that positives compose a plausible share of test results.
pub fn positives_rate(row: &StateDay, log: &mut ResultLog) {
    let n_tot = row.positive + row.negative + row.death;
    let percent = percent_of(row.positive, n_tot);
    let limit = if n_tot > 100 { 40.0 } else { 80.0 };
    if percent > limit && row.positive > 20 {
        log.error(
            &row.state,
            format!(
                "Too many positive {percent:.0}% (positive={}, total={})",
                fmt_count(row.positive),
                fmt_count(n_tot)
            ),
        );
    }
}

/// Check that deaths are a small share of test results.
pub fn death_rate(row: &StateDay, log: &mut ResultLog) {
    let n_tot = row.positive + row.negative + row.death;
    let percent = percent_of(row.death, n_tot);
    let limit = if n_tot > 100 { 5.0 } else { 10.0 };
    if percent > limit {
        log.error(
            &row.state,
            format!(
                "Too many deaths {percent:.0}% (death={}, total={})",
                fmt_count(row.death),
                fmt_count(n_tot)
            ),
        );
    }
}

/// Check that we don't have more recovered than positive.
pub fn less_recovered_than_positive(row: &StateDay, log: &mut ResultLog) {
    if row.recovered > row.positive {
        log.error(
            &row.state,
            format!(
                "More recovered than positive (recovered={}, positive={})",
                fmt_count(row.recovered),
                fmt_count(row.positive)
            ),
        );
    }
}

/// Check that pendings are not an outsized share of the total.
pub fn pendings_rate(row: &StateDay, log: &mut ResultLog) {
    let n_tot = row.positive + row.negative + row.death;
    let percent = percent_of(row.pending, n_tot);
    let limit = if n_tot > 1000 { 20.0 } else { 80.0 };
    if percent > limit {
        log.warning(
            &row.state,
            format!(
                "Too many pending {percent:.0}% (pending={}, total={})",
                fmt_count(row.pending),
                fmt_count(n_tot)
            ),
        );
    }
}

/// Check that new values are at least the previous values.
///
/// `history` holds the state's historical rows, newest first. Returns whether
/// any metric actually changed, which gates the forecast check.
pub fn increasing_values(row: &StateDay, history: &[&HistoryDay], log: &mut ResultLog) -> bool {
    let prior: Vec<&HistoryDay> = history
        .iter()
        .copied()
        .filter(|day| day.date < row.target_date)
        .collect();

    let mut has_changed = false;

    for metric in Metric::ALL {
        let val = metric.of_day(row);
        let prev_val = prior.first().map(|day| metric.of_history(day)).unwrap_or(0);

        if val < prev_val {
            log.error(
                &row.state,
                format!(
                    "{} value ({}) is less than prior value ({})",
                    metric.name(),
                    fmt_count(val),
                    fmt_count(prev_val)
                ),
            );
        }
        if val != prev_val {
            has_changed = true;
        }

        // allow a value to stay flat while it is still small
        if val < metric.ignore_threshold() {
            continue;
        }

        if val == prev_val {
            match days_since_change(val, metric, &prior) {
                Some((n_days, date)) => {
                    let since = dates::short_mmdd(date);
                    let message = format!(
                        "{} value ({}) has not changed since {since} ({n_days} days)",
                        metric.name(),
                        fmt_count(val)
                    );
                    if prev_val > 20 {
                        log.error(&row.state, message);
                    } else {
                        log.warning(&row.state, message);
                    }
                }
                None => {
                    log.error(
                        &row.state,
                        format!(
                            "{} value ({}) constant for all time",
                            metric.name(),
                            fmt_count(val)
                        ),
                    );
                }
            }
            continue;
        }

        if prev_val > 0 {
            let p_observed = 100.0 * val as f64 / prev_val as f64 - 100.0;
            let (p_min, p_max) = metric.expected_percent();
            if p_observed < p_min || p_observed > p_max {
                log.warning(
                    &row.state,
                    format!(
                        "{} value ({}) is a {p_observed:.0}% increase, expected: {p_min:.0} to {p_max:.0}%",
                        metric.name(),
                        fmt_count(val)
                    ),
                );
            }
        } else {
            log.internal(
                &row.state,
                format!(
                    "{} value ({}) has no prior value to compute a percent increase",
                    metric.name(),
                    fmt_count(val)
                ),
            );
        }
    }

    has_changed
}

/// Number of days the metric has held `val`, with the date of the last
/// different value. `None` when the metric never changed in the history.
fn days_since_change(val: i64, metric: Metric, history: &[&HistoryDay]) -> Option<(usize, u32)> {
    for (index, day) in history.iter().enumerate() {
        if metric.of_history(day) != val {
            return Some((index + 1, day.date));
        }
    }
    None
}

/// Check that a state's timeseries values are monotonically increasing.
///
/// Input is the full history for a single state, in any order. Totals are
/// excluded on purpose: pending counts fold into them and legitimately
/// shrink as tests resolve.
pub fn monotonically_increasing(state: &str, history: &[&HistoryDay], log: &mut ResultLog) {
    let mut rows: Vec<&HistoryDay> = history.to_vec();
    rows.sort_by_key(|day| day.date);

    let columns: [(&str, fn(&HistoryDay) -> i64); 4] = [
        ("positive", |day| day.positive),
        ("negative", |day| day.negative),
        ("hospitalized", |day| day.hospitalized),
        ("death", |day| day.death),
    ];

    for (name, value_of) in columns {
        let mut error_dates: Vec<String> = Vec::new();
        for pair in rows.windows(2) {
            if value_of(pair[0]) > value_of(pair[1]) {
                error_dates.push(pair[1].date.to_string());
            }
        }
        if !error_dates.is_empty() {
            log.error(
                state,
                format!(
                    "{name} values decreased from the previous day (on {})",
                    error_dates.join(", ")
                ),
            );
        }
    }
}

/// Reconcile a state's row against its county rollup.
///
/// Counties summing past the state value is an outright error; a state value
/// well above the rollup only warns, since county reporting lags.
pub fn counties_rollup_to_state(row: &StateDay, counties: &[&CountyDay], log: &mut ResultLog) {
    if counties.is_empty() {
        return;
    }

    let county_positive: i64 = counties.iter().map(|county| county.positive).sum();
    let county_death: i64 = counties.iter().map(|county| county.death).sum();

    for (name, state_value, county_value) in [
        ("positive", row.positive, county_positive),
        ("death", row.death, county_death),
    ] {
        if county_value > state_value {
            log.error(
                &row.state,
                format!(
                    "county rollup for {name} ({}) exceeds state value ({})",
                    fmt_count(county_value),
                    fmt_count(state_value)
                ),
            );
        } else if county_value > 0 && (state_value - county_value) * 10 > state_value {
            log.warning(
                &row.state,
                format!(
                    "state {name} ({}) exceeds county rollup ({})",
                    fmt_count(state_value),
                    fmt_count(county_value)
                ),
            );
        }
    }
}

/// Flag states that report no test results at all.
pub fn missing_tests(rows: &[StateDay], log: &mut ResultLog) {
    for row in rows {
        if row.total == 0 {
            log.warning(&row.state, "no tests reported");
        }
    }
}

/// Fit the state's positive-case history and compare the reported value
/// against the projected range.
pub fn expected_positive_increase(
    row: &StateDay,
    history: &[&HistoryDay],
    log: &mut ResultLog,
) -> Result<Forecast> {
    let forecast = Forecast::fit(&row.state, row.target_date, row.positive, history)?;

    let min_value = (FIT_THRESHOLDS[0] * forecast.expected_linear) as i64;
    let max_value = (FIT_THRESHOLDS[1] * forecast.expected_exp) as i64;

    if !(min_value..=max_value).contains(&row.positive) {
        let direction = if (row.positive as f64) < forecast.expected_linear {
            "drop"
        } else {
            "increase"
        };
        log.error(
            &row.state,
            format!(
                "Unexpected {direction} in positive cases ({}) for {}, expected between {} and {}",
                fmt_count(row.positive),
                row.target_date,
                fmt_count(min_value),
                fmt_count(max_value)
            ),
        );
    }

    Ok(forecast)
}

fn percent_of(value: i64, total: i64) -> f64 {
    if total > 0 {
        100.0 * value as f64 / total as f64
    } else {
        0.0
    }
}

/// Renders a count with thousands separators, matching the report style.
pub fn fmt_count(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::new();
    for (index, c) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}
