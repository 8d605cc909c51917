//! Response bodies of the HTTP API
//!
//! Successful transformations answer with raw file bytes, so the only JSON
//! documents are error objects and the health report.

use serde::Serialize;

use crate::observability::MetricsSnapshot;

/// `{"error": "..."}`, the JSON error shape shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ghostscript: GhostscriptStatus,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct GhostscriptStatus {
    pub available: bool,
    /// Resolved executable; absent when PDF compression uses the in-process fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
