//! Core library for the qc-scanner command line application.
//!
//! The scanner runs quality checks against a human-curated, state-level
//! tracking dataset. The modules are structured to keep responsibilities
//! narrow and composable: worksheet and report IO live under [`io`], the row
//! types inside [`model`], the individual check routines in [`checks`], the
//! forecast fits in [`forecast`], dependency-manifest validation in
//! [`manifest`], and the scan orchestration under [`scan`].

pub mod checks;
pub mod config;
pub mod dates;
pub mod error;
pub mod forecast;
pub mod io;
pub mod manifest;
pub mod model;
pub mod result_log;
pub mod scan;

pub use config::ScanConfig;
pub use error::{Result, ScanError};
pub use result_log::ResultLog;
