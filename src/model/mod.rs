use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

/// Part of the daily publishing cycle a scan runs in. Derived from the
/// current Eastern time; staleness checks use it only for context in the
/// report header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Morning data entry window.
    Prepare,
    /// Afternoon double-checking window.
    Cleaning,
    /// Evening publish window.
    Publish,
}

impl Phase {
    /// Maps an Eastern-time instant onto the publishing cycle.
    pub fn from_eastern(instant: DateTime<FixedOffset>) -> Self {
        match instant.hour() {
            0..=11 => Phase::Prepare,
            12..=16 => Phase::Cleaning,
            _ => Phase::Publish,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Prepare => write!(f, "prepare"),
            Phase::Cleaning => write!(f, "cleaning"),
            Phase::Publish => write!(f, "publish"),
        }
    }
}

/// A single state's row from the working or current sheet. Counts are
/// cumulative. The `target_*` fields and `phase` are assigned by the scan
/// run, not read from the sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDay {
    pub state: String,
    pub positive: i64,
    pub negative: i64,
    pub pending: i64,
    pub hospitalized: i64,
    pub death: i64,
    pub recovered: i64,
    pub total: i64,
    pub last_update_et: DateTime<FixedOffset>,
    pub last_check_et: DateTime<FixedOffset>,
    pub checker: String,
    pub double_checker: String,
    /// Scan target date as `yyyymmdd`; zero until the run assigns it.
    pub target_date: u32,
    pub target_date_et: Option<DateTime<FixedOffset>>,
    pub phase: Option<Phase>,
}

/// One historical row per state and date, newest rows first in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryDay {
    pub state: String,
    /// Date encoded as `yyyymmdd`.
    pub date: u32,
    pub positive: i64,
    pub negative: i64,
    pub death: i64,
    pub hospitalized: i64,
    pub total: i64,
}

/// County-level rollup row used to reconcile state totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountyDay {
    pub state: String,
    pub county: String,
    pub positive: i64,
    pub death: i64,
}

/// Parsed workbook contents. `working` and `history` are always present;
/// the published snapshot and the county rollup are optional sheets.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    pub working: Vec<StateDay>,
    pub history: Vec<HistoryDay>,
    pub current: Option<Vec<StateDay>>,
    pub county_rollup: Option<Vec<CountyDay>>,
}

impl DataSet {
    /// History rows for one state, newest first.
    pub fn history_for(&self, state: &str) -> Vec<&HistoryDay> {
        let mut rows: Vec<&HistoryDay> = self
            .history
            .iter()
            .filter(|row| row.state == state)
            .collect();
        rows.sort_by(|lhs, rhs| rhs.date.cmp(&lhs.date));
        rows
    }

    /// County rollup rows for one state, if the sheet was present.
    pub fn counties_for(&self, state: &str) -> Vec<&CountyDay> {
        self.county_rollup
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|row| row.state == state)
            .collect()
    }

    /// Distinct states appearing in the history sheet, in first-seen order.
    pub fn history_states(&self) -> Vec<&str> {
        let mut states: Vec<&str> = Vec::new();
        for row in &self.history {
            if !states.contains(&row.state.as_str()) {
                states.push(&row.state);
            }
        }
        states
    }
}
