use std::fs;
use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::error::Result;
use crate::result_log::ResultLog;

/// Sheet name the findings land on in the report workbook.
pub const RESULTS_SHEET: &str = "Results";

const HEADERS: [&str; 3] = ["level", "location", "message"];

/// Writes the consolidated findings to an Excel report with an autofilter
/// table, one finding per row.
pub fn write_report_workbook(path: &Path, log: &ResultLog) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(RESULTS_SHEET)?;

    for (col_idx, header) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, *header)?;
    }

    for (row_idx, entry) in log.entries().iter().enumerate() {
        let row = (row_idx + 1) as u32;
        worksheet.write_string(row, 0, entry.level.to_string())?;
        worksheet.write_string(row, 1, &entry.location)?;
        worksheet.write_string(row, 2, &entry.message)?;
    }

    let mut table = rust_xlsxwriter::Table::new();
    table.set_autofilter(true);
    let row_end = if log.is_empty() {
        0
    } else {
        log.entries().len() as u32
    };
    worksheet.add_table(0, 0, row_end, (HEADERS.len() - 1) as u16, &table)?;

    workbook.save(path)?;
    Ok(())
}

/// Writes the consolidated findings as pretty-printed JSON.
pub fn write_report_json(path: &Path, log: &ResultLog) -> Result<()> {
    let json = serde_json::to_string_pretty(log)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn json_report_serialises_entries() {
        let mut log = ResultLog::new();
        log.error("NY", "totals do not add up");
        log.warning("WA", "Missing checker initials");
        log.consolidate();

        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        write_report_json(&path, &log).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        let entries = parsed["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["level"], "error");
        assert_eq!(entries[0]["location"], "NY");
    }

    #[test]
    fn workbook_report_round_trips_through_calamine() {
        use calamine::{DataType, Reader, Xlsx, open_workbook};

        let mut log = ResultLog::new();
        log.error("NY", "totals do not add up");
        log.warning("WA", "Missing checker initials");
        log.consolidate();

        let dir = tempdir().unwrap();
        let path = dir.path().join("results.xlsx");
        write_report_workbook(&path, &log).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook
            .worksheet_range(RESULTS_SHEET)
            .expect("results sheet present")
            .unwrap();
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        DataType::String(value) => value.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect();

        assert_eq!(rows[0], vec!["level", "location", "message"]);
        assert_eq!(rows[1], vec!["ERROR", "NY", "totals do not add up"]);
        assert_eq!(rows[2], vec!["WARNING", "WA", "Missing checker initials"]);
    }

    #[test]
    fn empty_log_still_writes_a_report() {
        let log = ResultLog::new();
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.xlsx");
        write_report_workbook(&path, &log).unwrap();
        assert!(path.exists());
    }
}
