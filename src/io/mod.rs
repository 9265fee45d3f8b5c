pub mod excel_read;
pub mod report;
