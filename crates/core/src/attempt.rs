//! Classification of SUSHI harvesting attempts.
//!
//! An attempt is one backend record of a harvesting/import try for one
//! (credentials, period) pair. Classification is a strict first-match
//! priority chain over the record's status, import batch, and error code;
//! it is total and never fails.

use serde::Deserialize;
use serde_json::Value;

/// SUSHI error code reported when the provider has no data for the period.
pub const ERROR_CODE_NO_USAGE: &str = "3030";

/// SUSHI error code for "usage not yet ready, retry later".
pub const ERROR_CODE_NOT_READY: &str = "3031";

/// Classified state of a harvesting attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    NotMade,
    Success,
    Error,
    EmptyData,
    PartialData,
    ImportFailed,
    AwaitingImport,
    Canceled,
    Unknown,
}

impl AttemptState {
    /// Wire/state name used in the UI layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::NotMade => "missing",
            AttemptState::Success => "success",
            AttemptState::Error => "error",
            AttemptState::EmptyData => "empty_data",
            AttemptState::PartialData => "partial_data",
            AttemptState::ImportFailed => "import_failed",
            AttemptState::AwaitingImport => "awaiting_import",
            AttemptState::Canceled => "canceled",
            AttemptState::Unknown => "unknown",
        }
    }
}

/// A backend harvesting attempt record.
///
/// Only the fields the classifier looks at are typed; `import_batch` is an
/// opaque payload whose mere presence matters.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Attempt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub import_batch: Option<Value>,
    #[serde(default)]
    pub partial_data: bool,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl Attempt {
    fn status_is(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }
}

/// Classify an attempt record.
///
/// The branches form a priority chain; the first match wins:
/// untried, import_failed, import batch present (partial vs. full),
/// error code (3030 + no_data is empty data, anything else an error),
/// importing, no_data, canceled/unprocessed, and finally unknown.
pub fn classify_attempt(attempt: &Attempt) -> AttemptState {
    if attempt.status_is("untried") {
        // untried is a status only used by the monthly overview
        return AttemptState::NotMade;
    }
    if attempt.status_is("import_failed") {
        return AttemptState::ImportFailed;
    }
    if attempt.import_batch.is_some() {
        if attempt.partial_data {
            return AttemptState::PartialData;
        }
        return AttemptState::Success;
    }
    if let Some(code) = &attempt.error_code {
        if code == ERROR_CODE_NO_USAGE && attempt.status_is("no_data") {
            return AttemptState::EmptyData;
        }
        return AttemptState::Error;
    }
    if attempt.status_is("importing") {
        return AttemptState::AwaitingImport;
    }
    if attempt.status_is("no_data") {
        return AttemptState::EmptyData;
    }
    if attempt.status_is("canceled") || attempt.status_is("unprocessed") {
        return AttemptState::Canceled;
    }
    AttemptState::Unknown
}

/// Icon and color hint for rendering a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateIcon {
    pub icon: &'static str,
    pub color: &'static str,
}

/// Fallback icon for states without a dedicated entry.
pub const UNKNOWN_STATE_ICON: StateIcon = StateIcon {
    icon: "far fa-question-circle",
    color: "warning",
};

impl AttemptState {
    /// Display icon for this state.
    pub fn icon(&self) -> StateIcon {
        match self {
            AttemptState::NotMade => StateIcon {
                icon: "far fa-clock",
                color: "secondary",
            },
            AttemptState::Success => StateIcon {
                icon: "far fa-check-circle",
                color: "success",
            },
            AttemptState::EmptyData => StateIcon {
                icon: "far fa-circle",
                color: "success",
            },
            AttemptState::Error => StateIcon {
                icon: "fa-exclamation-circle",
                color: "red lighten-2",
            },
            AttemptState::AwaitingImport => StateIcon {
                icon: "fa-cog fa-spin",
                color: "blue",
            },
            AttemptState::ImportFailed => StateIcon {
                icon: "fa-cog",
                color: "error",
            },
            AttemptState::PartialData => StateIcon {
                icon: "fas fa-exclamation-triangle",
                color: "warning",
            },
            AttemptState::Canceled | AttemptState::Unknown => UNKNOWN_STATE_ICON,
        }
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
