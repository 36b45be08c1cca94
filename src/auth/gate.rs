// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role-based route protection.
//!
//! A [`RoleGate`] is attached to a router with
//! `route_layer(from_fn_with_state(GateState::new(state, policy::HR_STAFF), enforce_roles))`.
//! Every denial is audited before the 403 is returned.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::claims::AuthenticatedUser;
use super::error::AuthError;
use super::extractor::authenticate;
use super::roles::{AllowList, Role};
use crate::audit::AuditRecorder;
use crate::state::AppState;
use crate::storage::AuditSink;

/// Allow-lists for every protected route group.
pub mod policy {
    /// Employee administration.
    pub const HR_STAFF: &[&str] = &["management", "hr"];

    /// Audit log access and export.
    pub const AUDIT_READERS: &[&str] = &["management", "admin"];
}

/// Audit action written for every denial.
pub const ACCESS_DENIED_ACTION: &str = "access_denied";

#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: AllowList,
}

impl RoleGate {
    pub fn new(labels: &[&str]) -> Self {
        Self {
            allowed: AllowList::from_labels(labels),
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed.permits(role)
    }

    pub fn required(&self) -> Vec<Role> {
        self.allowed.roles()
    }

    fn denied(&self, user: &AuthenticatedUser) -> AuthError {
        AuthError::AccessDenied {
            required: self.required(),
            actual: user.role,
        }
    }

    /// Allow the user or record the denial in `sink` and refuse.
    ///
    /// The denial stands even if the audit entry cannot be written.
    pub fn check(
        &self,
        user: &AuthenticatedUser,
        resource: &str,
        recorder: &AuditRecorder,
        sink: &dyn AuditSink,
    ) -> Result<(), AuthError> {
        if self.permits(user.role) {
            return Ok(());
        }

        let required: Vec<_> = self.required().iter().map(Role::as_str).collect();
        recorder.record(
            sink,
            Some(user),
            ACCESS_DENIED_ACTION,
            resource,
            json!({
                "required": required,
                "actual": user.role.as_str(),
                "department": user.department,
            }),
        );
        tracing::warn!(
            email = %user.email,
            role = %user.role,
            resource = %resource,
            "Access denied"
        );
        Err(self.denied(user))
    }
}

/// Middleware state: the application plus the gate for one route group.
#[derive(Clone)]
pub struct GateState {
    pub app: AppState,
    pub gate: Arc<RoleGate>,
}

impl GateState {
    pub fn new(app: AppState, labels: &[&str]) -> Self {
        Self {
            app,
            gate: Arc::new(RoleGate::new(labels)),
        }
    }
}

/// Authenticate, enforce the gate, and hand the user to the handler via
/// request extensions.
pub async fn enforce_roles(State(state): State<GateState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let user = match authenticate(&parts, &state.app).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    if !state.gate.permits(user.role) {
        // Nested routers see a stripped URI; audit the full request path.
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.path().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        return record_denial(&state, &user, &path).into_response();
    }

    parts.extensions.insert(user);
    next.run(Request::from_parts(parts, body)).await
}

/// Audit a denial in its own unit of work and build the rejection.
fn record_denial(state: &GateState, user: &AuthenticatedUser, path: &str) -> AuthError {
    let uow = match state.app.db.begin() {
        Ok(uow) => uow,
        Err(e) => {
            tracing::error!(error = %e, "Could not open unit of work for denial audit");
            return state.gate.denied(user);
        }
    };

    let outcome = state.gate.check(user, path, &state.app.audit, &uow);
    if let Err(e) = uow.commit() {
        tracing::error!(error = %e, "Failed to commit denial audit");
    }
    outcome.err().unwrap_or_else(|| state.gate.denied(user))
}
