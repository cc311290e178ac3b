//! Shared helpers for the fake-backend integration tests.
//!
//! The client speaks real HTTP, so the tests run an in-process axum router
//! on an ephemeral port and point a [`ReportingApi`] at it.

use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use flexistat_client::api::ReportingApi;

/// Serve `app` on an ephemeral localhost port and return an API client
/// pointed at it.
pub async fn spawn_backend(app: Router) -> ReportingApi {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ReportingApi::new(format!("http://{addr}"))
}

/// A report-type payload with one mapped slot, distinguishable by id.
pub fn report_type_payload(id: i64) -> Value {
    json!({
        "pk": id,
        "short_name": format!("RT{id}"),
        "name": format!("Report type {id}"),
        "dimensions_sorted": [
            {"pk": id * 10, "short_name": "Access_Type", "type": 2, "name_en": "Access type"},
        ],
    })
}
