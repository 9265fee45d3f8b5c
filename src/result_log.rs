use serde::Serialize;

/// Severity of a check finding. `Internal` marks scanner faults (a check
/// routine that could not run) rather than data problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Info,
    Internal,
}

impl Level {
    fn rank(self) -> u8 {
        match self {
            Level::Error => 0,
            Level::Warning => 1,
            Level::Info => 2,
            Level::Internal => 3,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Error => write!(f, "ERROR"),
            Level::Warning => write!(f, "WARNING"),
            Level::Info => write!(f, "INFO"),
            Level::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// A single finding: which state it concerns and what the check observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub level: Level,
    pub location: String,
    pub message: String,
}

/// Accumulates findings while the check routines run over a dataset.
///
/// Checks report through [`info`](ResultLog::info),
/// [`warning`](ResultLog::warning), and [`error`](ResultLog::error);
/// [`internal`](ResultLog::internal) records scanner faults. Call
/// [`consolidate`](ResultLog::consolidate) once at the end of a run before
/// rendering or saving.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultLog {
    entries: Vec<Entry>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, location: &str, message: impl Into<String>) {
        self.push(Level::Info, location, message.into());
    }

    pub fn warning(&mut self, location: &str, message: impl Into<String>) {
        self.push(Level::Warning, location, message.into());
    }

    pub fn error(&mut self, location: &str, message: impl Into<String>) {
        self.push(Level::Error, location, message.into());
    }

    pub fn internal(&mut self, location: &str, message: impl Into<String>) {
        self.push(Level::Internal, location, message.into());
    }

    fn push(&mut self, level: Level, location: &str, message: String) {
        self.entries.push(Entry {
            level,
            location: location.to_string(),
            message,
        });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.level == Level::Error)
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.level == level)
            .count()
    }

    /// Drops duplicate findings and orders the log by severity. Within one
    /// severity the original check order is preserved so that findings for a
    /// state stay together.
    pub fn consolidate(&mut self) {
        let mut seen: Vec<(Level, String, String)> = Vec::new();
        self.entries.retain(|entry| {
            let key = (entry.level, entry.location.clone(), entry.message.clone());
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
        self.entries.sort_by_key(|entry| entry.level.rank());
    }

    /// Plain-text rendering, one finding per line.
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| format!("{:8} {}: {}", entry.level.to_string(), entry.location, entry.message))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consolidate_dedupes_and_sorts_by_severity() {
        let mut log = ResultLog::new();
        log.info("NY", "processed");
        log.error("WA", "totals do not add up");
        log.warning("NY", "missing checker initials");
        log.error("WA", "totals do not add up");
        log.internal("GU", "forecast failed");

        log.consolidate();

        let levels: Vec<Level> = log.entries().iter().map(|entry| entry.level).collect();
        assert_eq!(
            levels,
            vec![Level::Error, Level::Warning, Level::Info, Level::Internal]
        );
        assert_eq!(log.count(Level::Error), 1);
        assert!(log.has_errors());
    }

    #[test]
    fn lines_include_level_and_location() {
        let mut log = ResultLog::new();
        log.error("CA", "More recovered than positive");
        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("ERROR"));
        assert!(lines[0].contains("CA:"));
    }
}
