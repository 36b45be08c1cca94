// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit log endpoints for management and administrators.
//!
//! The whole router is wrapped in the `AUDIT_READERS` role gate; handlers
//! only see users that already passed it.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::{
    auth::Auth,
    error::ApiError,
    state::AppState,
    storage::{AuditEntry, AuditPage, AuditQuery, AuditRepository},
};

/// Resource recorded for CSV exports.
pub const AUDIT_EXPORT_RESOURCE: &str = "hr_audit_export";

const CSV_HEADER: [&str; 6] = ["created_at", "user_email", "role", "action", "resource", "details"];

/// Query parameters for audit log queries.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    /// Case-insensitive substring of the acting user's email.
    pub user_email: Option<String>,
    /// Case-insensitive substring of the action.
    pub action: Option<String>,
    /// Case-insensitive substring of the resource.
    pub resource: Option<String>,
    /// Entries to skip (default 0).
    pub skip: Option<usize>,
    /// Page size (default 50, max 500).
    pub limit: Option<usize>,
}

impl From<AuditQueryParams> for AuditQuery {
    fn from(params: AuditQueryParams) -> Self {
        Self {
            user_email: params.user_email,
            action: params.action,
            resource: params.resource,
            skip: params.skip.unwrap_or(0),
            limit: params.limit,
        }
    }
}

/// Query audit logs.
///
/// Filtered, paginated listing, newest first.
#[utoipa::path(
    get,
    path = "/admin/audits",
    tag = "Admin",
    params(AuditQueryParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Audit entries", body = AuditPage),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (management or admin required)")
    )
)]
pub async fn list_audits(
    Auth(_user): Auth,
    Query(params): Query<AuditQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<AuditPage>, ApiError> {
    let page = AuditRepository::new(&state.db).query(&params.into())?;
    Ok(Json(page))
}

/// Export the full audit log as CSV.
///
/// The export itself is audited as `hr_export` on `hr_audit_export`.
#[utoipa::path(
    get,
    path = "/admin/audits/export",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (management or admin required)")
    )
)]
pub async fn export_audits(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let entries = AuditRepository::new(&state.db).all()?;
    let csv = render_csv(&entries)?;

    let uow = state.db.begin()?;
    state.audit.record(
        &uow,
        Some(&user),
        "hr_export",
        AUDIT_EXPORT_RESOURCE,
        json!({"format": "csv", "rows": entries.len()}),
    );
    uow.commit()?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=audit_logs.csv",
            ),
        ],
        csv,
    )
        .into_response())
}

fn render_csv(entries: &[AuditEntry]) -> Result<String, ApiError> {
    let csv_error = |e: csv::Error| ApiError::internal(format!("CSV export failed: {e}"));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for entry in entries {
        writer
            .write_record([
                entry.created_at.to_rfc3339().as_str(),
                entry.user_email.as_str(),
                entry.role.as_str(),
                entry.action.as_str(),
                entry.resource.as_str(),
                entry.details.as_deref().unwrap_or(""),
            ])
            .map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::internal(format!("CSV export failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ApiError::internal(format!("CSV export failed: {e}")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn audit_query_params_deserializes() {
        let params: AuditQueryParams = serde_json::from_str(
            r#"{
            "user_email": "anna@",
            "action": "upload",
            "limit": 20
        }"#,
        )
        .unwrap();

        let query: AuditQuery = params.into();
        assert_eq!(query.user_email.as_deref(), Some("anna@"));
        assert_eq!(query.action.as_deref(), Some("upload"));
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, Some(20));
    }

    #[test]
    fn csv_quotes_structured_details() {
        let entry = AuditEntry {
            id: Uuid::now_v7(),
            user_email: "anna@kit.test".to_string(),
            role: "hr".to_string(),
            action: "access_denied".to_string(),
            resource: "/admin/audits".to_string(),
            details: Some(r#"{"required":["management","admin"],"actual":"hr"}"#.to_string()),
            created_at: Utc::now(),
        };

        let csv = render_csv(&[entry]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("created_at,user_email,role,action,resource,details")
        );
        let row = lines.next().unwrap();
        assert!(row.contains(r#","{""required"":[""management"",""admin""],""actual"":""hr""}""#));
        assert!(row.contains("anna@kit.test,hr,access_denied,/admin/audits"));
    }

    #[test]
    fn csv_of_empty_log_has_only_header() {
        let csv = render_csv(&[]).unwrap();
        assert_eq!(csv, "created_at,user_email,role,action,resource,details\n");
    }
}
