// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Audit Recorder
//!
//! Builds normalized audit entries and appends them to the caller's unit of
//! work. The recorder never commits and never opens a transaction of its
//! own: an entry becomes durable exactly when the surrounding business
//! change does.
//!
//! ## Modes
//!
//! - [`AuditRecorder::record`]: best effort. Failures are logged and
//!   swallowed so that auditing can never break the action being audited.
//! - [`AuditRecorder::record_strict`]: failures are returned to the caller.
//!
//! ## Normalization
//!
//! | Field | Rule |
//! |-------|------|
//! | action | trimmed, lower-cased, max 200 chars |
//! | resource | trimmed, max 200 chars |
//! | user_email / role | actor or `system@workmate` / `system`; max 200 / 50 chars |
//! | details | JSON for structured payloads, capped at `max_details_len` chars |
//!
//! Unknown actions and unexpected resource prefixes are written anyway and
//! only produce a warning.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::storage::{AuditEntry, AuditSink, StorageError};

/// Default cap on serialized details, in characters.
pub const DEFAULT_MAX_DETAILS_LEN: usize = 4000;

/// Suffix of a truncated details payload.
pub const TRUNCATION_MARKER: &str = "...";

/// Actor recorded for background and startup actions.
pub const SYSTEM_EMAIL: &str = "system@workmate";
pub const SYSTEM_ROLE: &str = "system";

const EMAIL_WIDTH: usize = 200;
const ROLE_WIDTH: usize = 50;
const ACTION_WIDTH: usize = 200;
const RESOURCE_WIDTH: usize = 200;

/// Actions the HR domain is expected to log.
pub const KNOWN_ACTIONS: &[&str] = &[
    "create",
    "update",
    "delete",
    "approve",
    "reject",
    "upload",
    "download",
    "complete",
    "snooze",
    "hr_export",
    "hr_update",
    "hr_review",
    "hr_sync",
    "access_denied",
];

/// Expected resource prefixes. `/` covers request paths logged on denial.
pub const RESOURCE_PREFIXES: &[&str] = &[
    "document:",
    "employee:",
    "reminder:",
    "vacation:",
    "sick_leave:",
    "hr_",
    "/",
];

pub fn is_known_action(action: &str) -> bool {
    KNOWN_ACTIONS.contains(&action)
}

pub fn has_known_prefix(resource: &str) -> bool {
    RESOURCE_PREFIXES.iter().any(|p| resource.starts_with(p))
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit details could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("audit entry could not be stored: {0}")]
    Storage(#[from] StorageError),
}

/// Context attached to an audit entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditDetails {
    Text(String),
    Structured(Value),
}

impl AuditDetails {
    pub fn none() -> Self {
        AuditDetails::Text(String::new())
    }

    fn serialize(&self) -> Result<String, serde_json::Error> {
        match self {
            AuditDetails::Text(text) => Ok(text.clone()),
            AuditDetails::Structured(value) => serde_json::to_string(value),
        }
    }
}

impl From<&str> for AuditDetails {
    fn from(value: &str) -> Self {
        AuditDetails::Text(value.to_string())
    }
}

impl From<String> for AuditDetails {
    fn from(value: String) -> Self {
        AuditDetails::Text(value)
    }
}

impl From<Value> for AuditDetails {
    fn from(value: Value) -> Self {
        AuditDetails::Structured(value)
    }
}

/// Audit entry builder; cheap to clone into application state.
#[derive(Debug, Clone, Copy)]
pub struct AuditRecorder {
    max_details_len: usize,
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DETAILS_LEN)
    }
}

impl AuditRecorder {
    pub fn new(max_details_len: usize) -> Self {
        Self { max_details_len }
    }

    pub fn max_details_len(&self) -> usize {
        self.max_details_len
    }

    /// Append an entry, logging and swallowing any failure.
    pub fn record(
        &self,
        sink: &dyn AuditSink,
        actor: Option<&AuthenticatedUser>,
        action: &str,
        resource: &str,
        details: impl Into<AuditDetails>,
    ) -> Option<AuditEntry> {
        match self.record_strict(sink, actor, action, resource, details) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::error!(
                    action = %action,
                    resource = %resource,
                    error = %e,
                    "Audit log failed"
                );
                None
            }
        }
    }

    /// Append an entry, returning any failure to the caller.
    pub fn record_strict(
        &self,
        sink: &dyn AuditSink,
        actor: Option<&AuthenticatedUser>,
        action: &str,
        resource: &str,
        details: impl Into<AuditDetails>,
    ) -> Result<AuditEntry, AuditError> {
        let entry = self.build(actor, action, resource, details.into())?;
        sink.append_audit(&entry)?;
        tracing::info!(action = %entry.action, resource = %entry.resource, "Audit entry recorded");
        Ok(entry)
    }

    fn build(
        &self,
        actor: Option<&AuthenticatedUser>,
        action: &str,
        resource: &str,
        details: AuditDetails,
    ) -> Result<AuditEntry, AuditError> {
        let action = action.trim().to_lowercase();
        let resource = resource.trim().to_string();

        if !is_known_action(&action) {
            tracing::warn!(action = %action, "Audit action not in known set (continuing)");
        }
        if !has_known_prefix(&resource) {
            tracing::warn!(resource = %resource, "Audit resource has unexpected prefix (continuing)");
        }

        let (email, role) = match actor {
            Some(user) if user.email.is_empty() => (SYSTEM_EMAIL, user.role.as_str()),
            Some(user) => (user.email.as_str(), user.role.as_str()),
            None => (SYSTEM_EMAIL, SYSTEM_ROLE),
        };

        let serialized = details.serialize()?;
        let details = if serialized.is_empty() {
            None
        } else {
            Some(truncate_details(serialized, self.max_details_len))
        };

        Ok(AuditEntry {
            id: Uuid::now_v7(),
            user_email: clip(email, EMAIL_WIDTH, "user_email"),
            role: clip(role, ROLE_WIDTH, "role"),
            action: clip(&action, ACTION_WIDTH, "action"),
            resource: clip(&resource, RESOURCE_WIDTH, "resource"),
            details,
            created_at: Utc::now(),
        })
    }
}

/// Cut to exactly `max_len` characters, the last three being the marker.
fn truncate_details(details: String, max_len: usize) -> String {
    if details.chars().count() <= max_len {
        return details;
    }
    let keep = max_len.saturating_sub(TRUNCATION_MARKER.len());
    let mut truncated: String = details.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

fn clip(value: &str, width: usize, field: &str) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    tracing::warn!(field = %field, width, "Audit field exceeds column width, clipping");
    value.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{IdentitySource, Role};
    use crate::storage::{test_db, AuditRepository, StorageResult};
    use serde_json::json;

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn append_audit(&self, _entry: &AuditEntry) -> StorageResult<()> {
            Err(StorageError::NotFound("audit table".to_string()))
        }
    }

    fn hr_user() -> AuthenticatedUser {
        AuthenticatedUser {
            display_name: "Anna Berg".to_string(),
            email: "anna@kit.test".to_string(),
            employee_id: "KIT-0001".to_string(),
            department: "backoffice".to_string(),
            role: Role::Hr,
            source: IdentitySource::Token,
        }
    }

    #[test]
    fn record_normalizes_and_persists_on_commit() {
        let (db, _temp) = test_db::open();
        let recorder = AuditRecorder::default();
        let uow = db.begin().unwrap();
        let entry = recorder
            .record(&uow, Some(&hr_user()), "  UPLOAD ", " document:42 ", "scan.pdf")
            .unwrap();
        uow.commit().unwrap();

        assert_eq!(entry.action, "upload");
        assert_eq!(entry.resource, "document:42");
        assert_eq!(entry.user_email, "anna@kit.test");
        assert_eq!(entry.role, "hr");
        assert_eq!(AuditRepository::new(&db).get(entry.id).unwrap(), Some(entry));
    }

    #[test]
    fn rollback_discards_entry() {
        let (db, _temp) = test_db::open();
        let uow = db.begin().unwrap();
        AuditRecorder::default()
            .record(&uow, Some(&hr_user()), "update", "employee:1", "")
            .unwrap();
        uow.rollback().unwrap();

        assert_eq!(AuditRepository::new(&db).count().unwrap(), 0);
    }

    #[test]
    fn missing_actor_is_system() {
        let (db, _temp) = test_db::open();
        let uow = db.begin().unwrap();
        let entry = AuditRecorder::default()
            .record(&uow, None, "hr_sync", "hr_employees", AuditDetails::none())
            .unwrap();
        assert_eq!(entry.user_email, SYSTEM_EMAIL);
        assert_eq!(entry.role, SYSTEM_ROLE);
        assert_eq!(entry.details, None);
    }

    #[test]
    fn structured_details_are_json() {
        let (db, _temp) = test_db::open();
        let uow = db.begin().unwrap();
        let entry = AuditRecorder::default()
            .record(
                &uow,
                Some(&hr_user()),
                "approve",
                "vacation:7",
                json!({"days": 3, "note": "Grüße"}),
            )
            .unwrap();
        let parsed: Value = serde_json::from_str(entry.details.as_deref().unwrap()).unwrap();
        assert_eq!(parsed["days"], 3);
        assert_eq!(parsed["note"], "Grüße");
    }

    #[test]
    fn details_at_cap_round_trip_exactly() {
        let (db, _temp) = test_db::open();
        let uow = db.begin().unwrap();
        let details = "x".repeat(DEFAULT_MAX_DETAILS_LEN);
        let entry = AuditRecorder::default()
            .record(&uow, None, "update", "employee:1", details.clone())
            .unwrap();
        uow.commit().unwrap();

        let stored = AuditRepository::new(&db).get(entry.id).unwrap().unwrap();
        assert_eq!(stored.details.as_deref(), Some(details.as_str()));
    }

    #[test]
    fn oversized_details_are_truncated_to_cap() {
        let (db, _temp) = test_db::open();
        let uow = db.begin().unwrap();
        let recorder = AuditRecorder::new(10);
        let entry = recorder
            .record(&uow, None, "update", "employee:1", "äöü".repeat(10))
            .unwrap();
        uow.commit().unwrap();

        let stored = AuditRepository::new(&db).get(entry.id).unwrap().unwrap();
        let details = stored.details.unwrap();
        assert_eq!(details.chars().count(), recorder.max_details_len());
        assert!(details.ends_with(TRUNCATION_MARKER));
        assert!(details.starts_with("äöüäöüä"));
    }

    #[test]
    fn actor_without_email_keeps_role() {
        let (db, _temp) = test_db::open();
        let uow = db.begin().unwrap();
        let user = AuthenticatedUser {
            email: String::new(),
            ..hr_user()
        };
        let entry = AuditRecorder::default()
            .record(&uow, Some(&user), "access_denied", "/admin/audits", "")
            .unwrap();
        assert_eq!(entry.user_email, SYSTEM_EMAIL);
        assert_eq!(entry.role, "hr");
    }

    #[test]
    fn unknown_action_and_resource_are_still_written() {
        let (db, _temp) = test_db::open();
        let uow = db.begin().unwrap();
        let entry = AuditRecorder::default()
            .record(&uow, None, "Teleport", "moon", "")
            .unwrap();
        assert_eq!(entry.action, "teleport");
        assert_eq!(entry.resource, "moon");
    }

    #[test]
    fn long_fields_are_clipped() {
        let (db, _temp) = test_db::open();
        let uow = db.begin().unwrap();
        let resource = format!("document:{}", "a".repeat(300));
        let entry = AuditRecorder::default()
            .record(&uow, None, "upload", &resource, "")
            .unwrap();
        assert_eq!(entry.resource.chars().count(), RESOURCE_WIDTH);
    }

    #[test]
    fn best_effort_swallows_sink_failure() {
        let recorder = AuditRecorder::default();
        assert!(recorder
            .record(&FailingSink, Some(&hr_user()), "update", "employee:1", "")
            .is_none());
    }

    #[test]
    fn strict_mode_surfaces_sink_failure() {
        let err = AuditRecorder::default()
            .record_strict(&FailingSink, Some(&hr_user()), "update", "employee:1", "")
            .unwrap_err();
        assert!(matches!(err, AuditError::Storage(_)));
    }

    #[test]
    fn known_vocabulary() {
        assert!(is_known_action("access_denied"));
        assert!(!is_known_action("ACCESS_DENIED"));
        assert!(has_known_prefix("/admin/audits"));
        assert!(has_known_prefix("hr_audit_export"));
        assert!(!has_known_prefix("employees"));
    }
}
