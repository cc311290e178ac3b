//! Export execution status model.
//!
//! A flexible export is a point-in-time, backend-executed snapshot of a
//! report's parameters. Its status is driven entirely by the backend and
//! moves linearly: not started, in progress, then one of the terminal
//! states (finished or error). [`ExportMonitor`] enforces that linearity on
//! the client side when folding in polled statuses.

use crate::error::CoreError;

/// Backend status code of a flexible export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    NotStarted,
    InProgress,
    Finished,
    Error,
}

impl ExportStatus {
    /// Numeric code used on the wire.
    pub fn code(&self) -> u8 {
        match self {
            ExportStatus::NotStarted => 0,
            ExportStatus::InProgress => 1,
            ExportStatus::Finished => 2,
            ExportStatus::Error => 3,
        }
    }

    /// Parse a wire code. Unknown codes are a protocol drift and are
    /// rejected rather than mapped to a default.
    pub fn from_code(code: u8) -> Result<Self, CoreError> {
        match code {
            0 => Ok(ExportStatus::NotStarted),
            1 => Ok(ExportStatus::InProgress),
            2 => Ok(ExportStatus::Finished),
            3 => Ok(ExportStatus::Error),
            other => Err(CoreError::Validation(format!(
                "Unknown export status code: {other}"
            ))),
        }
    }

    /// Status name used in the UI layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::NotStarted => "not_started",
            ExportStatus::InProgress => "in_progress",
            ExportStatus::Finished => "finished",
            ExportStatus::Error => "error",
        }
    }

    /// Whether the status is final. A terminal export never leaves its
    /// state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Finished | ExportStatus::Error)
    }
}

/// Tracks the observed status of one export across polls.
///
/// Once a terminal status has been observed, later non-terminal
/// observations are ignored so that a lagging poll cannot make a finished
/// export look in-progress again.
#[derive(Debug, Clone)]
pub struct ExportMonitor {
    current: ExportStatus,
}

impl ExportMonitor {
    pub fn new(initial: ExportStatus) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> ExportStatus {
        self.current
    }

    /// Fold in a newly observed status and return the effective one.
    pub fn observe(&mut self, status: ExportStatus) -> ExportStatus {
        if !self.current.is_terminal() {
            self.current = status;
        }
        self.current
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn codes_roundtrip() {
        for status in [
            ExportStatus::NotStarted,
            ExportStatus::InProgress,
            ExportStatus::Finished,
            ExportStatus::Error,
        ] {
            assert_eq!(ExportStatus::from_code(status.code()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_matches!(ExportStatus::from_code(9), Err(CoreError::Validation(_)));
    }

    #[test]
    fn terminal_states() {
        assert!(ExportStatus::Finished.is_terminal());
        assert!(ExportStatus::Error.is_terminal());
        assert!(!ExportStatus::NotStarted.is_terminal());
        assert!(!ExportStatus::InProgress.is_terminal());
    }

    #[test]
    fn status_names() {
        assert_eq!(ExportStatus::NotStarted.as_str(), "not_started");
        assert_eq!(ExportStatus::InProgress.as_str(), "in_progress");
    }

    #[test]
    fn monitor_follows_progress() {
        let mut monitor = ExportMonitor::new(ExportStatus::NotStarted);
        assert_eq!(
            monitor.observe(ExportStatus::InProgress),
            ExportStatus::InProgress
        );
        assert_eq!(
            monitor.observe(ExportStatus::Finished),
            ExportStatus::Finished
        );
    }

    #[test]
    fn monitor_ignores_regression_after_terminal() {
        let mut monitor = ExportMonitor::new(ExportStatus::Finished);
        assert_eq!(
            monitor.observe(ExportStatus::InProgress),
            ExportStatus::Finished
        );
        assert_eq!(monitor.current(), ExportStatus::Finished);

        let mut monitor = ExportMonitor::new(ExportStatus::Error);
        assert_eq!(
            monitor.observe(ExportStatus::NotStarted),
            ExportStatus::Error
        );
    }
}
