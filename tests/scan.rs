use std::fs;
use std::path::Path;

use qc_scanner::io::excel_read;
use qc_scanner::result_log::Level;
use qc_scanner::{ScanConfig, scan};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

fn write_sheet(workbook: &mut Workbook, name: &str, headers: &[&str], rows: &[Vec<String>]) {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(name).expect("sheet name");
    for (col_idx, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, col_idx as u16, *header)
            .expect("header written");
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            worksheet
                .write_string((row_idx + 1) as u32, col_idx as u16, cell)
                .expect("cell written");
        }
    }
}

fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

/// Builds a small but realistic dataset workbook: two states, five days of
/// history, a published snapshot with one planted totals error, and a county
/// rollup for NY. NY's history carries one planted positive-case dip.
fn write_dataset_workbook(path: &Path) {
    let mut workbook = Workbook::new();

    let state_headers = [
        "state",
        "positive",
        "negative",
        "pending",
        "hospitalized",
        "death",
        "recovered",
        "total",
        "lastUpdateEt",
        "lastCheckEt",
        "checker",
        "doubleChecker",
    ];
    write_sheet(
        &mut workbook,
        excel_read::WORKING_SHEET,
        &state_headers,
        &[
            strings(&[
                "NY", "900", "7200", "0", "90", "45", "0", "8100",
                "4/3/2020 12:00", "4/3/2020 12:30", "AB", "CD",
            ]),
            strings(&[
                "WA", "500", "4000", "100", "50", "0", "0", "4600",
                "4/3/2020 11:00", "4/3/2020 11:15", "EF", "GH",
            ]),
        ],
    );

    let history_headers = [
        "state",
        "date",
        "positive",
        "negative",
        "death",
        "hospitalized",
        "total",
    ];
    write_sheet(
        &mut workbook,
        excel_read::HISTORY_SHEET,
        &history_headers,
        &[
            // NY: positive dips on 3/30, everything else monotone
            strings(&["NY", "20200329", "450", "3000", "18", "40", "3450"]),
            strings(&["NY", "20200330", "400", "3200", "20", "40", "3600"]),
            strings(&["NY", "20200331", "520", "4160", "26", "52", "4680"]),
            strings(&["NY", "20200401", "640", "5120", "32", "64", "5760"]),
            strings(&["NY", "20200402", "760", "6080", "38", "76", "6840"]),
            strings(&["WA", "20200330", "100", "800", "0", "10", "900"]),
            strings(&["WA", "20200331", "200", "1600", "0", "20", "1800"]),
            strings(&["WA", "20200401", "300", "2400", "0", "30", "2700"]),
            strings(&["WA", "20200402", "400", "3200", "0", "40", "3600"]),
        ],
    );

    let current_headers = [
        "state",
        "positive",
        "negative",
        "pending",
        "death",
        "total",
        "lastUpdateEt",
    ];
    write_sheet(
        &mut workbook,
        excel_read::CURRENT_SHEET,
        &current_headers,
        &[
            strings(&[
                "NY", "900", "7200", "0", "45", "8100", "4/3/2020 12:00",
            ]),
            // totals off by ten
            strings(&[
                "WA", "500", "4000", "100", "0", "4610", "4/3/2020 11:00",
            ]),
        ],
    );

    write_sheet(
        &mut workbook,
        excel_read::COUNTY_SHEET,
        &["state", "county", "positive", "death"],
        &[
            strings(&["NY", "Kings", "500", "20"]),
            strings(&["NY", "Queens", "360", "23"]),
        ],
    );

    workbook.save(path).expect("workbook saved");
}

#[test]
fn workbook_roundtrips_into_a_dataset() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("dataset.xlsx");
    write_dataset_workbook(&path);

    let dataset = excel_read::read_dataset(&path).expect("dataset read");

    assert_eq!(dataset.working.len(), 2);
    assert_eq!(dataset.history.len(), 9);
    assert_eq!(dataset.current.as_ref().map(Vec::len), Some(2));
    assert_eq!(dataset.county_rollup.as_ref().map(Vec::len), Some(2));

    let ny = &dataset.working[0];
    assert_eq!(ny.state, "NY");
    assert_eq!(ny.positive, 900);
    assert_eq!(ny.checker, "AB");
    // April timestamps carry the daylight-saving offset
    assert_eq!(ny.last_update_et.offset().local_minus_utc(), -4 * 3600);

    let history: Vec<u32> = dataset
        .history_for("NY")
        .iter()
        .map(|row| row.date)
        .collect();
    assert_eq!(
        history,
        vec![20_200_402, 20_200_401, 20_200_331, 20_200_330, 20_200_329]
    );
}

#[test]
fn history_scan_finds_the_planted_dip() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("dataset.xlsx");
    write_dataset_workbook(&path);

    let dataset = excel_read::read_dataset(&path).expect("dataset read");
    let log = scan::check_history(&dataset).expect("history scan");

    let errors: Vec<&str> = log
        .entries()
        .iter()
        .filter(|entry| entry.level == Level::Error)
        .map(|entry| entry.message.as_str())
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("positive values decreased"));
    assert!(errors[0].contains("20200330"));
    assert_eq!(log.entries()[0].location, "NY");
}

#[test]
fn current_scan_flags_the_broken_totals() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("dataset.xlsx");
    write_dataset_workbook(&path);

    let dataset = excel_read::read_dataset(&path).expect("dataset read");
    let config = ScanConfig::default();
    let log = scan::check_current(&dataset, &config).expect("current scan");

    let wa_errors: Vec<&str> = log
        .entries()
        .iter()
        .filter(|entry| entry.level == Level::Error && entry.location == "WA")
        .map(|entry| entry.message.as_str())
        .collect();
    assert_eq!(wa_errors.len(), 1, "log: {:?}", log.entries());
    assert!(wa_errors[0].contains("Formula broken"));
    assert!(wa_errors[0].contains("delta = 10"));

    // NY tracks its history, so it produces no errors
    assert!(
        !log.entries()
            .iter()
            .any(|entry| entry.level == Level::Error && entry.location == "NY"),
        "log: {:?}",
        log.entries()
    );
}

#[test]
fn working_scan_runs_against_an_old_snapshot() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("dataset.xlsx");
    write_dataset_workbook(&path);

    let dataset = excel_read::read_dataset(&path).expect("dataset read");
    let log = scan::check_working(&dataset, &ScanConfig::default()).expect("working scan");

    // the snapshot predates the run by years, so staleness must fire
    assert!(
        log.entries()
            .iter()
            .any(|entry| entry.message.contains("hasn't updated")),
        "log: {:?}",
        log.entries()
    );
}

#[test]
fn reports_are_saved_under_the_results_dir() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("dataset.xlsx");
    write_dataset_workbook(&path);

    let dataset = excel_read::read_dataset(&path).expect("dataset read");
    let config = ScanConfig {
        results_dir: dir.path().join("results"),
        save_results: true,
        plot_models: false,
    };
    let log = scan::check_current(&dataset, &config).expect("current scan");
    scan::save_results(&log, &config).expect("reports saved");

    assert!(config.results_dir.join("results.json").exists());
    assert!(config.results_dir.join("results.xlsx").exists());

    let json = fs::read_to_string(config.results_dir.join("results.json")).expect("json read");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("json parsed");
    assert!(!parsed["entries"].as_array().expect("entries array").is_empty());
}
