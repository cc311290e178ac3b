//! REST client for the reporting backend.
//!
//! Wraps the backend HTTP API (report-type lookup, flexible-report
//! create/update, export creation and polling, id-to-label batch lookup,
//! task status) using [`reqwest`]. The wrappers return typed records and
//! surface non-2xx responses as [`ApiError::Api`] with the raw body kept
//! for diagnostics.

use serde::Deserialize;
use serde_json::{Map, Value};

use flexistat_core::report_type::ReportType;
use flexistat_core::types::DbId;

use crate::export::FlexiExportRecord;
use crate::task::TaskStatusRecord;

/// HTTP client for one reporting backend instance.
pub struct ReportingApi {
    client: reqwest::Client,
    base_url: String,
}

/// Response returned when a flexible report is created.
#[derive(Debug, Deserialize)]
pub struct SavedReport {
    /// Backend-assigned identifier of the new report.
    pub pk: DbId,
}

/// A persisted flexible-report row as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRecord {
    pub pk: DbId,
    pub name: String,
    #[serde(default)]
    pub owner: Option<DbId>,
    #[serde(default)]
    pub owner_organization: Option<DbId>,
    pub config: flexistat_core::report::ReportConfig,
}

/// Errors from the reporting REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Reporting API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ApiError {
    /// HTTP status of an [`ApiError::Api`] response, if that is what this
    /// error is.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Request(_) => None,
        }
    }
}

impl ReportingApi {
    /// Create a new API client.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `https://stats.example.org`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across several backends).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Base HTTP URL of the backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one report-type record by id.
    pub async fn get_report_type(&self, id: DbId) -> Result<ReportType, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/report-type/{}/", self.base_url, id))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Fetch one persisted flexible report by id.
    pub async fn get_report(&self, pk: DbId) -> Result<ReportRecord, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/flexible-report/{}/", self.base_url, pk))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Create a new flexible report. Returns the backend-assigned id.
    pub async fn create_report(&self, payload: &Value) -> Result<SavedReport, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/flexible-report/", self.base_url))
            .json(payload)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Partially update an existing flexible report.
    pub async fn update_report(&self, pk: DbId, payload: &Value) -> Result<(), ApiError> {
        let response = self
            .client
            .patch(format!("{}/api/flexible-report/{}/", self.base_url, pk))
            .json(payload)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Start a backend-executed export of the given query parameters.
    pub async fn create_export(
        &self,
        params: &Map<String, Value>,
    ) -> Result<FlexiExportRecord, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/export/flexible-export/", self.base_url))
            .json(params)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Fetch the current state of one export.
    pub async fn get_export(&self, pk: DbId) -> Result<FlexiExportRecord, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/export/flexible-export/{}/", self.base_url, pk))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Batch-fetch id-to-label records from a lookup endpoint.
    ///
    /// `path` is the endpoint path of the dimension's text source (it
    /// differs per mapped dimension). The backend may wrap the list in a
    /// paginated `{"results": [...]}` envelope; both shapes are accepted.
    pub async fn get_id_labels(&self, path: &str, pks: &[DbId]) -> Result<Vec<Value>, ApiError> {
        let pk_list = pks
            .iter()
            .map(|pk| pk.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&[("pks", pk_list)])
            .send()
            .await?;
        let data: Value = Self::parse_response(response).await?;
        let items = match data {
            Value::Object(mut map) => match map.remove("results") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        Ok(items)
    }

    /// Fetch the status of a background server task.
    pub async fn get_task_status(&self, task_id: &str) -> Result<TaskStatusRecord, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/task-status/{}/", self.base_url, task_id))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`] containing
    /// the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
