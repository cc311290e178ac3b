//! Loading and persisting flexible reports against the backend.
//!
//! The pure model lives in `flexistat_core::report`; this module supplies
//! the async halves: resolving the report types a persisted config refers
//! to (all independent fetches are issued at once and joined), and the
//! create/update/rename/export calls.

use std::collections::HashMap;

use futures::future::try_join_all;
use serde_json::json;

use flexistat_core::report::{FlexiReport, ReportConfig};
use flexistat_core::report_type::ReportType;
use flexistat_core::types::DbId;

use crate::api::{ApiError, ReportRecord, ReportingApi};
use crate::export::FlexiExportRecord;

/// Failures while loading or persisting a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A config referenced a report type the supplied lookup map did not
    /// contain.
    #[error("Unknown report type: {id}")]
    UnknownReportType { id: DbId },
}

/// Resolve report-type ids to records, keeping the id order of the input.
///
/// With a pre-populated `known` map the lookup is local and a missing id
/// is an error. Without one, all ids are fetched from the backend at once
/// and joined; there is no ordering requirement between the fetches, and
/// any failed fetch propagates unchanged.
pub(crate) async fn resolve_report_types(
    api: &ReportingApi,
    ids: &[DbId],
    known: Option<&HashMap<DbId, ReportType>>,
) -> Result<Vec<ReportType>, ReportError> {
    match known {
        Some(map) => ids
            .iter()
            .map(|id| {
                map.get(id)
                    .cloned()
                    .ok_or(ReportError::UnknownReportType { id: *id })
            })
            .collect(),
        None => Ok(try_join_all(ids.iter().map(|id| api.get_report_type(*id))).await?),
    }
}

/// Build a report from a persisted config blob.
///
/// Resolves the report types named by the config's reserved filter first
/// (explicit dimension lookup depends on them), then applies the rest of
/// the config through the pure model.
pub async fn read_config(
    report: &mut FlexiReport,
    config: &ReportConfig,
    api: &ReportingApi,
    all_report_types: Option<&HashMap<DbId, ReportType>>,
) -> Result<(), ReportError> {
    let ids = config.report_type_ids();
    let report_types = resolve_report_types(api, &ids, all_report_types).await?;
    report.apply_config(config, report_types);
    Ok(())
}

/// Build a report from a backend row.
pub async fn from_api_object(
    record: &ReportRecord,
    api: &ReportingApi,
    all_report_types: Option<&HashMap<DbId, ReportType>>,
) -> Result<FlexiReport, ReportError> {
    let mut report = FlexiReport::new();
    report.pk = Some(record.pk);
    report.name = record.name.clone();
    report.owner = record.owner;
    report.owner_organization = record.owner_organization;
    read_config(&mut report, &record.config, api, all_report_types).await?;
    Ok(report)
}

/// Persist the report: create it when it has no id yet (capturing the
/// assigned id), otherwise patch the existing row.
pub async fn save(report: &mut FlexiReport, api: &ReportingApi) -> Result<(), ReportError> {
    let payload = json!({
        "name": report.name,
        "config": report.url_params(None),
        "owner": report.owner,
        "owner_organization": report.owner_organization,
    });
    match report.pk {
        Some(pk) => {
            api.update_report(pk, &payload).await?;
            tracing::debug!(pk, name = %report.name, "Updated flexible report");
        }
        None => {
            let saved = api.create_report(&payload).await?;
            report.pk = Some(saved.pk);
            tracing::debug!(pk = saved.pk, name = %report.name, "Created flexible report");
        }
    }
    Ok(())
}

/// Rename the report locally, patching only the name field when the
/// report is already persisted.
pub async fn rename(
    report: &mut FlexiReport,
    api: &ReportingApi,
    new_name: &str,
) -> Result<(), ReportError> {
    report.name = new_name.to_string();
    if let Some(pk) = report.pk {
        api.update_report(pk, &json!({"name": new_name})).await?;
    }
    Ok(())
}

/// Ask the backend to materialize the report in the given file format.
///
/// Returns the backend's export record; its execution status is tracked
/// separately via [`crate::export::FlexiExport::refresh`].
pub async fn start_export(
    report: &FlexiReport,
    api: &ReportingApi,
    format: &str,
) -> Result<FlexiExportRecord, ReportError> {
    let mut params = report.url_params(None);
    params.insert("name".to_string(), json!(report.name));
    params.insert("format".to_string(), json!(format));
    let record = api.create_export(&params).await?;
    tracing::debug!(pk = record.pk, format, "Started flexible export");
    Ok(record)
}
