//! Flexible exports: backend-executed snapshots of a report's parameters.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use flexistat_core::export::{ExportMonitor, ExportStatus};
use flexistat_core::report::{FlexiReport, ReportConfig};
use flexistat_core::report_type::ReportType;
use flexistat_core::types::DbId;

use crate::api::ReportingApi;
use crate::report::{read_config, ReportError};

/// A flexible-export row as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct FlexiExportRecord {
    pub pk: DbId,
    /// Numeric status code; see [`ExportStatus`].
    #[serde(default)]
    pub status: u8,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub file_format: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_info: Option<Value>,
    /// The report parameters this export was executed with.
    #[serde(default)]
    pub export_params: Option<ReportConfig>,
}

/// Failures while working with exports.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Core(#[from] flexistat_core::error::CoreError),
}

/// A point-in-time export of a flexible report, with its execution state.
///
/// The parameter set is materialized into a [`FlexiReport`] so that the
/// exported dimensions and filters render the same way a live report does.
#[derive(Debug)]
pub struct FlexiExport {
    pub pk: DbId,
    pub report: FlexiReport,
    pub output_file: Option<String>,
    pub file_format: Option<String>,
    pub file_size: Option<u64>,
    pub created: Option<DateTime<Utc>>,
    pub error_info: Option<Value>,
    monitor: ExportMonitor,
}

impl FlexiExport {
    /// Build from a backend row, resolving the report types its parameters
    /// refer to (from `all_report_types` where possible, fetching the rest).
    pub async fn from_api_object(
        record: &FlexiExportRecord,
        api: &ReportingApi,
        all_report_types: Option<&HashMap<DbId, ReportType>>,
    ) -> Result<Self, ExportError> {
        let status = ExportStatus::from_code(record.status)?;
        let mut report = FlexiReport::new();
        if let Some(params) = &record.export_params {
            read_config(&mut report, params, api, all_report_types).await?;
        }
        Ok(Self {
            pk: record.pk,
            report,
            output_file: record.output_file.clone(),
            file_format: record.file_format.clone(),
            file_size: record.file_size,
            created: record.created,
            error_info: record.error_info.clone(),
            monitor: ExportMonitor::new(status),
        })
    }

    /// Current execution status.
    pub fn status(&self) -> ExportStatus {
        self.monitor.current()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Poll the backend and fold the reported status into the monitor.
    ///
    /// A terminal status never regresses, even if a lagging poll reports
    /// an earlier one. Output-file fields are refreshed alongside.
    pub async fn refresh(&mut self, api: &ReportingApi) -> Result<ExportStatus, ExportError> {
        let record = api.get_export(self.pk).await.map_err(ReportError::from)?;
        let observed = ExportStatus::from_code(record.status)?;
        let effective = self.monitor.observe(observed);
        if observed != effective {
            tracing::warn!(
                pk = self.pk,
                observed = observed.as_str(),
                effective = effective.as_str(),
                "Ignoring export status regression after terminal state"
            );
        }
        self.output_file = record.output_file;
        self.file_format = record.file_format;
        self.file_size = record.file_size;
        self.error_info = record.error_info;
        Ok(effective)
    }
}
