use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use chrono::{DateTime, FixedOffset};

use crate::dates;
use crate::error::{Result, ScanError};
use crate::model::{CountyDay, DataSet, HistoryDay, StateDay};

/// Sheet holding the unpublished rows the team is currently editing.
pub const WORKING_SHEET: &str = "Working";
/// Sheet holding one row per state and date.
pub const HISTORY_SHEET: &str = "History";
/// Optional sheet with the last published snapshot.
pub const CURRENT_SHEET: &str = "Current";
/// Optional sheet with county-level rollup rows.
pub const COUNTY_SHEET: &str = "CountyRollup";

/// Reads a dataset workbook. `Working` and `History` are required; the
/// published snapshot and county rollup sheets are picked up when present.
pub fn read_dataset(path: &Path) -> Result<DataSet> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let working_range = read_required_sheet(&mut workbook, WORKING_SHEET)?;
    let history_range = read_required_sheet(&mut workbook, HISTORY_SHEET)?;
    let current_range = read_optional_sheet(&mut workbook, CURRENT_SHEET)?;
    let county_range = read_optional_sheet(&mut workbook, COUNTY_SHEET)?;

    Ok(DataSet {
        working: parse_state_rows(&working_range, WORKING_SHEET)?,
        history: parse_history_rows(&history_range)?,
        current: current_range
            .map(|range| parse_state_rows(&range, CURRENT_SHEET))
            .transpose()?,
        county_rollup: county_range.map(|range| parse_county_rows(&range)).transpose()?,
    })
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ScanError::MissingSheet(name.to_string()))?;
    let range = range_result.map_err(ScanError::from)?;
    Ok(range)
}

fn read_optional_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Option<calamine::Range<DataType>>> {
    match workbook.worksheet_range(name) {
        Some(range_result) => Ok(Some(range_result.map_err(ScanError::from)?)),
        None => Ok(None),
    }
}

/// Maps trimmed header names to column indices for one sheet.
struct HeaderMap {
    sheet: String,
    columns: Vec<String>,
}

impl HeaderMap {
    fn new(range: &calamine::Range<DataType>, sheet: &str) -> Self {
        let columns = match range.rows().next() {
            Some(first_row) => first_row
                .iter()
                .map(|cell| cell_to_string(Some(cell)).trim().to_string())
                .collect(),
            None => Vec::new(),
        };
        Self {
            sheet: sheet.to_string(),
            columns,
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.find(name).ok_or_else(|| ScanError::MissingColumn {
            sheet: self.sheet.clone(),
            column: name.to_string(),
        })
    }
}

fn parse_state_rows(range: &calamine::Range<DataType>, sheet: &str) -> Result<Vec<StateDay>> {
    let headers = HeaderMap::new(range, sheet);
    let state_col = headers.require("state")?;
    let positive_col = headers.require("positive")?;
    let negative_col = headers.require("negative")?;
    let pending_col = headers.require("pending")?;
    let hospitalized_col = headers.find("hospitalized");
    let death_col = headers.require("death")?;
    let recovered_col = headers.find("recovered");
    let total_col = headers.require("total")?;
    let update_col = headers.require("lastUpdateEt")?;
    // published snapshots carry no checking metadata
    let check_col = headers.find("lastCheckEt");
    let checker_col = headers.find("checker");
    let double_checker_col = headers.find("doubleChecker");

    let mut rows = Vec::new();
    for row in range.rows().skip(1) {
        let state = cell_to_string(row.get(state_col));
        if state.trim().is_empty() {
            continue;
        }

        let last_update_et = cell_to_eastern(row.get(update_col), sheet, "lastUpdateEt")?;
        let last_check_et = match check_col {
            Some(col) if !cell_is_blank(row.get(col)) => {
                cell_to_eastern(row.get(col), sheet, "lastCheckEt")?
            }
            _ => last_update_et,
        };

        rows.push(StateDay {
            state: state.trim().to_string(),
            positive: cell_to_i64(row.get(positive_col), sheet, "positive")?,
            negative: cell_to_i64(row.get(negative_col), sheet, "negative")?,
            pending: cell_to_i64(row.get(pending_col), sheet, "pending")?,
            hospitalized: optional_i64(row, hospitalized_col, sheet, "hospitalized")?,
            death: cell_to_i64(row.get(death_col), sheet, "death")?,
            recovered: optional_i64(row, recovered_col, sheet, "recovered")?,
            total: cell_to_i64(row.get(total_col), sheet, "total")?,
            last_update_et,
            last_check_et,
            checker: optional_string(row, checker_col),
            double_checker: optional_string(row, double_checker_col),
            target_date: 0,
            target_date_et: None,
            phase: None,
        });
    }

    Ok(rows)
}

fn parse_history_rows(range: &calamine::Range<DataType>) -> Result<Vec<HistoryDay>> {
    let headers = HeaderMap::new(range, HISTORY_SHEET);
    let state_col = headers.require("state")?;
    let date_col = headers.require("date")?;
    let positive_col = headers.require("positive")?;
    let negative_col = headers.require("negative")?;
    let death_col = headers.require("death")?;
    let hospitalized_col = headers.find("hospitalized");
    let total_col = headers.require("total")?;

    let mut rows = Vec::new();
    for row in range.rows().skip(1) {
        let state = cell_to_string(row.get(state_col));
        if state.trim().is_empty() {
            continue;
        }

        rows.push(HistoryDay {
            state: state.trim().to_string(),
            date: cell_to_yyyymmdd(row.get(date_col))?,
            positive: cell_to_i64(row.get(positive_col), HISTORY_SHEET, "positive")?,
            negative: cell_to_i64(row.get(negative_col), HISTORY_SHEET, "negative")?,
            death: cell_to_i64(row.get(death_col), HISTORY_SHEET, "death")?,
            hospitalized: optional_i64(row, hospitalized_col, HISTORY_SHEET, "hospitalized")?,
            total: cell_to_i64(row.get(total_col), HISTORY_SHEET, "total")?,
        });
    }

    Ok(rows)
}

fn parse_county_rows(range: &calamine::Range<DataType>) -> Result<Vec<CountyDay>> {
    let headers = HeaderMap::new(range, COUNTY_SHEET);
    let state_col = headers.require("state")?;
    let county_col = headers.require("county")?;
    let positive_col = headers.require("positive")?;
    let death_col = headers.require("death")?;

    let mut rows = Vec::new();
    for row in range.rows().skip(1) {
        let state = cell_to_string(row.get(state_col));
        if state.trim().is_empty() {
            continue;
        }

        rows.push(CountyDay {
            state: state.trim().to_string(),
            county: cell_to_string(row.get(county_col)).trim().to_string(),
            positive: cell_to_i64(row.get(positive_col), COUNTY_SHEET, "positive")?,
            death: cell_to_i64(row.get(death_col), COUNTY_SHEET, "death")?,
        });
    }

    Ok(rows)
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn cell_is_blank(cell: Option<&DataType>) -> bool {
    cell_to_string(cell).trim().is_empty()
}

fn optional_string(row: &[DataType], col: Option<usize>) -> String {
    col.map(|index| cell_to_string(row.get(index)).trim().to_string())
        .unwrap_or_default()
}

fn optional_i64(row: &[DataType], col: Option<usize>, sheet: &str, column: &str) -> Result<i64> {
    match col {
        Some(index) => cell_to_i64(row.get(index), sheet, column),
        None => Ok(0),
    }
}

/// Blank cells count as zero; the worksheet leaves untracked metrics empty.
fn cell_to_i64(cell: Option<&DataType>, sheet: &str, column: &str) -> Result<i64> {
    match cell {
        Some(DataType::Int(value)) => Ok(*value),
        Some(DataType::Float(value)) => Ok(value.round() as i64),
        Some(DataType::Empty) | None => Ok(0),
        Some(DataType::String(value)) => {
            let cleaned = value.trim().replace(',', "");
            if cleaned.is_empty() {
                return Ok(0);
            }
            cleaned.parse().map_err(|_| ScanError::InvalidCell {
                sheet: sheet.to_string(),
                column: column.to_string(),
                value: value.clone(),
            })
        }
        Some(other) => Err(ScanError::InvalidCell {
            sheet: sheet.to_string(),
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Timestamps arrive either as Excel serials or as `m/d/yyyy hh:mm` strings,
/// both expressed in Eastern local time.
fn cell_to_eastern(
    cell: Option<&DataType>,
    sheet: &str,
    column: &str,
) -> Result<DateTime<FixedOffset>> {
    let naive = match cell {
        Some(DataType::DateTime(serial)) => {
            dates::excel_serial_to_datetime(*serial).ok_or_else(|| ScanError::InvalidCell {
                sheet: sheet.to_string(),
                column: column.to_string(),
                value: serial.to_string(),
            })?
        }
        Some(DataType::Float(serial)) => {
            dates::excel_serial_to_datetime(*serial).ok_or_else(|| ScanError::InvalidCell {
                sheet: sheet.to_string(),
                column: column.to_string(),
                value: serial.to_string(),
            })?
        }
        Some(DataType::String(value)) => dates::parse_worksheet_datetime(value)?,
        other => {
            return Err(ScanError::InvalidCell {
                sheet: sheet.to_string(),
                column: column.to_string(),
                value: cell_to_string(other),
            });
        }
    };
    dates::naive_as_eastern(naive)
}

fn cell_to_yyyymmdd(cell: Option<&DataType>) -> Result<u32> {
    match cell {
        Some(DataType::Int(value)) if *value > 0 => Ok(*value as u32),
        Some(DataType::Float(value)) if *value > 0.0 => Ok(value.round() as u32),
        Some(DataType::String(value)) => value
            .trim()
            .parse()
            .map_err(|_| ScanError::InvalidDate(format!("invalid history date '{value}'"))),
        other => Err(ScanError::InvalidDate(format!(
            "invalid history date '{}'",
            cell_to_string(other)
        ))),
    }
}
