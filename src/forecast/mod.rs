//! Short-horizon forecasts of state-level positive cases.
//!
//! The daily increase check needs an expected range for "today's" value. A
//! linear least-squares fit over the recent history serves as the lower
//! bound and an exponential fit as the upper bound; cumulative case counts
//! sit between the two while a state's curve bends.

pub mod plot;

use chrono::NaiveDate;

use crate::dates;
use crate::error::{Result, ScanError};
use crate::model::HistoryDay;

/// Minimum number of usable history points for a fit.
const MIN_POINTS: usize = 3;

/// A fitted forecast for one state and target date.
#[derive(Debug, Clone)]
pub struct Forecast {
    pub state: String,
    /// Target date as `yyyymmdd`.
    pub date: u32,
    /// The value reported for the target date.
    pub actual_value: i64,
    /// Linear projection for the target date.
    pub expected_linear: f64,
    /// Exponential projection for the target date.
    pub expected_exp: f64,
    /// Observed history, oldest first.
    pub observed: Vec<(NaiveDate, i64)>,
    /// Day offset of the target date relative to the first observation.
    pub target_day: f64,
    /// Linear fit coefficients (slope, intercept).
    linear: (f64, f64),
    /// Exponential fit coefficients on the log scale (slope, intercept).
    exp_log: (f64, f64),
}

impl Forecast {
    /// Fits both curves to the state's positive-case history. `history` is
    /// newest first, as sliced from the dataset; rows on or after the target
    /// date are ignored.
    pub fn fit(
        state: &str,
        target_date: u32,
        actual_value: i64,
        history: &[&HistoryDay],
    ) -> Result<Self> {
        let target = dates::yyyymmdd_to_date(target_date)?;

        let mut observed: Vec<(NaiveDate, i64)> = Vec::new();
        for day in history {
            if day.date >= target_date {
                continue;
            }
            observed.push((dates::yyyymmdd_to_date(day.date)?, day.positive));
        }
        observed.sort_by_key(|(date, _)| *date);

        if observed.len() < MIN_POINTS {
            return Err(ScanError::Forecast(format!(
                "{state}: only {} usable history points, need {MIN_POINTS}",
                observed.len()
            )));
        }

        let origin = observed[0].0;
        let points: Vec<(f64, f64)> = observed
            .iter()
            .map(|(date, value)| ((*date - origin).num_days() as f64, *value as f64))
            .collect();
        let target_day = (target - origin).num_days() as f64;

        let (slope, intercept) = linear_fit(&points)
            .ok_or_else(|| ScanError::Forecast(format!("{state}: degenerate history")))?;
        let expected_linear = (slope * target_day + intercept).max(0.0);

        let log_points: Vec<(f64, f64)> = points
            .iter()
            .filter(|(_, value)| *value > 0.0)
            .map(|(day, value)| (*day, value.ln()))
            .collect();
        if log_points.len() < MIN_POINTS {
            return Err(ScanError::Forecast(format!(
                "{state}: not enough non-zero history for the exponential fit"
            )));
        }
        let (log_slope, log_intercept) = linear_fit(&log_points)
            .ok_or_else(|| ScanError::Forecast(format!("{state}: degenerate history")))?;
        let expected_exp = (log_slope * target_day + log_intercept).exp();

        Ok(Self {
            state: state.to_string(),
            date: target_date,
            actual_value,
            expected_linear,
            expected_exp,
            observed,
            target_day,
            linear: (slope, intercept),
            exp_log: (log_slope, log_intercept),
        })
    }

    /// Actual value plus the two projections, in that order.
    pub fn results(&self) -> (i64, f64, f64) {
        (self.actual_value, self.expected_linear, self.expected_exp)
    }

    /// Linear fit evaluated at the given day offset, floored at zero.
    pub fn linear_at(&self, day: f64) -> f64 {
        (self.linear.0 * day + self.linear.1).max(0.0)
    }

    /// Exponential fit evaluated at the given day offset.
    pub fn exp_at(&self, day: f64) -> f64 {
        (self.exp_log.0 * day + self.exp_log.1).exp()
    }
}

/// Ordinary least squares over `(x, y)` points: returns `(slope, intercept)`,
/// or `None` when all x values coincide.
fn linear_fit(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let var_x: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if var_x == 0.0 {
        return None;
    }
    let cov: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    let slope = cov / var_x;
    Some((slope, mean_y - slope * mean_x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(state: &str, date: u32, positive: i64) -> HistoryDay {
        HistoryDay {
            state: state.to_string(),
            date,
            positive,
            negative: 0,
            death: 0,
            hospitalized: 0,
            total: positive,
        }
    }

    #[test]
    fn linear_fit_recovers_exact_line() {
        let points = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)];
        let (slope, intercept) = linear_fit(&points).unwrap();
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);
        assert!(linear_fit(&[(1.0, 2.0), (1.0, 4.0)]).is_none());
    }

    #[test]
    fn fit_projects_linear_and_exponential_bounds() {
        let rows = [
            history("WA", 20_200_330, 100),
            history("WA", 20_200_331, 200),
            history("WA", 20_200_401, 300),
            history("WA", 20_200_402, 400),
        ];
        let refs: Vec<&HistoryDay> = rows.iter().rev().collect();
        let forecast = Forecast::fit("WA", 20_200_403, 520, &refs).unwrap();

        assert_eq!(forecast.target_day, 4.0);
        assert!((forecast.expected_linear - 500.0).abs() < 1e-6);
        // exponential growth overshoots a straight line
        assert!(forecast.expected_exp > forecast.expected_linear);
        assert_eq!(forecast.results().0, 520);

        // the curve accessors agree with the target-date projections
        assert!((forecast.linear_at(forecast.target_day) - forecast.expected_linear).abs() < 1e-9);
        assert!((forecast.exp_at(forecast.target_day) - forecast.expected_exp).abs() < 1e-9);
        assert!((forecast.linear_at(0.0) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn fit_ignores_rows_on_or_after_the_target_date() {
        let rows = [
            history("WA", 20_200_330, 100),
            history("WA", 20_200_331, 200),
            history("WA", 20_200_401, 300),
            history("WA", 20_200_403, 9_999),
        ];
        let refs: Vec<&HistoryDay> = rows.iter().collect();
        let forecast = Forecast::fit("WA", 20_200_403, 400, &refs).unwrap();
        assert_eq!(forecast.observed.len(), 3);
    }

    #[test]
    fn fit_needs_enough_history() {
        let rows = [history("GU", 20_200_401, 5), history("GU", 20_200_402, 6)];
        let refs: Vec<&HistoryDay> = rows.iter().collect();
        assert!(Forecast::fit("GU", 20_200_403, 7, &refs).is_err());
    }
}
