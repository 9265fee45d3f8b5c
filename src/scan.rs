//! Scan entry points: run the check routines over a parsed dataset.

use std::fs;

use chrono::{DateTime, Duration, FixedOffset, Timelike};
use tracing::{debug, info, instrument, warn};

use crate::checks;
use crate::config::ScanConfig;
use crate::dates;
use crate::error::{Result, ScanError};
use crate::forecast::{Forecast, plot};
use crate::io::excel_read::CURRENT_SHEET;
use crate::io::report;
use crate::model::{DataSet, Phase, StateDay};
use crate::result_log::ResultLog;

/// Publish date of the pinned `current` snapshot; the upstream API does not
/// expose when results were published.
const PUBLISH_DATE: u32 = 20_200_403;

/// Eastern hour before which a run still targets the previous day.
const ROLLOVER_HOUR: u32 = 8;

/// Current Eastern time and the publishing-cycle phase it falls in.
pub fn current_time_and_phase() -> (DateTime<FixedOffset>, Phase) {
    let now = dates::now_as_eastern();
    (now, Phase::from_eastern(now))
}

/// Check the unpublished rows the team is currently editing.
#[instrument(level = "info", skip_all, fields(states = ds.working.len()))]
pub fn check_working(ds: &DataSet, config: &ScanConfig) -> Result<ResultLog> {
    let mut log = ResultLog::new();

    // target_date is the day the sheet is working on; before the rollover
    // hour the team is still finishing the previous day.
    let (now, phase) = current_time_and_phase();
    let mut target = now;
    if now.hour() < ROLLOVER_HOUR {
        warn!(hour = now.hour(), "adjusting target date to the previous day");
        target -= Duration::days(1);
    }
    let target_date = dates::date_to_yyyymmdd(target.date_naive());
    let target_date_et = dates::naive_as_eastern(
        target
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ScanError::InvalidDate("midnight construction failed".to_string()))?,
    )?;

    info!(target_date, %phase, "running working-sheet scan");

    let rows = assign_run_fields(&ds.working, target_date, target_date_et, phase);
    let mut fitted: Vec<Forecast> = Vec::new();

    for (cnt, row) in rows.iter().enumerate() {
        checks::total(row, &mut log);
        checks::last_update(row, now, &mut log);
        checks::last_checked(row, now, &mut log);
        checks::checkers_initials(row, &mut log);
        checks::positives_rate(row, &mut log);
        checks::death_rate(row, &mut log);
        checks::less_recovered_than_positive(row, &mut log);
        checks::pendings_rate(row, &mut log);

        let history = ds.history_for(&row.state);
        let has_changed = checks::increasing_values(row, &history, &mut log);
        if has_changed {
            match checks::expected_positive_increase(row, &history, &mut log) {
                Ok(forecast) => fitted.push(forecast),
                Err(error) => log.internal(&row.state, error.to_string()),
            }
        }

        let counties = ds.counties_for(&row.state);
        if !counties.is_empty() {
            checks::counties_rollup_to_state(row, &counties, &mut log);
        }

        if cnt != 0 && cnt % 10 == 0 {
            info!(processed = cnt, "states processed");
        }
    }
    info!(processed = rows.len(), "states processed");

    checks::missing_tests(&rows, &mut log);

    if config.plot_models && config.save_results {
        let images_dir = config.images_dir().join("working");
        for forecast in &fitted {
            match plot::plot_to_file(forecast, &images_dir, checks::FIT_THRESHOLDS) {
                Ok(path) => debug!(state = %forecast.state, path = %path.display(), "plot written"),
                Err(error) => log.internal(&forecast.state, error.to_string()),
            }
        }
        info!(plotted = fitted.len(), "forecast plots written");
    }

    log.consolidate();
    Ok(log)
}

/// Check the published snapshot.
#[instrument(level = "info", skip_all)]
pub fn check_current(ds: &DataSet, config: &ScanConfig) -> Result<ResultLog> {
    let mut log = ResultLog::new();

    let current = ds
        .current
        .as_ref()
        .ok_or_else(|| ScanError::MissingSheet(CURRENT_SHEET.to_string()))?;

    warn!(publish_date = PUBLISH_DATE, "current-date is pinned");
    warn!("the API does not tell us the date the results were published");

    // run settings equivalent to the publish date at 5PM Eastern
    let publish_day = dates::yyyymmdd_to_date(PUBLISH_DATE)?;
    let publish_timestamp = dates::naive_as_eastern(
        publish_day
            .and_hms_opt(17, 0, 0)
            .ok_or_else(|| ScanError::InvalidDate("publish timestamp construction".to_string()))?,
    )?;

    let mut rows = assign_run_fields(current, PUBLISH_DATE, publish_timestamp, Phase::Publish);
    for row in &mut rows {
        row.last_check_et = publish_timestamp;
    }

    let mut fitted: Vec<Forecast> = Vec::new();
    for row in &rows {
        checks::total(row, &mut log);
        checks::last_update(row, publish_timestamp, &mut log);
        checks::positives_rate(row, &mut log);
        checks::death_rate(row, &mut log);
        checks::pendings_rate(row, &mut log);

        let history = ds.history_for(&row.state);
        let has_changed = checks::increasing_values(row, &history, &mut log);
        if has_changed {
            match checks::expected_positive_increase(row, &history, &mut log) {
                Ok(forecast) => fitted.push(forecast),
                Err(error) => log.internal(&row.state, error.to_string()),
            }
        }

        let counties = ds.counties_for(&row.state);
        if !counties.is_empty() {
            checks::counties_rollup_to_state(row, &counties, &mut log);
        }
    }

    if config.plot_models && config.save_results {
        let images_dir = config.images_dir().join("current");
        for forecast in &fitted {
            if let Err(error) = plot::plot_to_file(forecast, &images_dir, checks::FIT_THRESHOLDS) {
                log.internal(&forecast.state, error.to_string());
            }
        }
    }

    log.consolidate();
    Ok(log)
}

/// Check that every state's history is monotonically non-decreasing.
#[instrument(level = "info", skip_all, fields(rows = ds.history.len()))]
pub fn check_history(ds: &DataSet) -> Result<ResultLog> {
    let mut log = ResultLog::new();

    for state in ds.history_states() {
        let rows = ds.history_for(state);
        checks::monotonically_increasing(state, &rows, &mut log);
    }

    log.consolidate();
    Ok(log)
}

/// Writes the JSON and Excel reports under the configured results directory.
#[instrument(level = "info", skip_all, fields(dir = %config.results_dir.display()))]
pub fn save_results(log: &ResultLog, config: &ScanConfig) -> Result<()> {
    fs::create_dir_all(&config.results_dir)?;
    let json_path = config.results_dir.join("results.json");
    let xlsx_path = config.results_dir.join("results.xlsx");
    report::write_report_json(&json_path, log)?;
    report::write_report_workbook(&xlsx_path, log)?;
    info!(
        json = %json_path.display(),
        workbook = %xlsx_path.display(),
        findings = log.entries().len(),
        "reports written"
    );
    Ok(())
}

fn assign_run_fields(
    rows: &[StateDay],
    target_date: u32,
    target_date_et: DateTime<FixedOffset>,
    phase: Phase,
) -> Vec<StateDay> {
    rows.iter()
        .cloned()
        .map(|mut row| {
            row.target_date = target_date;
            row.target_date_et = Some(target_date_et);
            row.phase = Some(phase);
            row
        })
        .collect()
}
