// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `X-Test-User` identity override.
//!
//! Lets end-to-end test suites act as any user without a real identity
//! provider. The override is only consulted when the server was started
//! with `WORKMATE_TEST_AUTH=true`; otherwise the header is ignored.
//!
//! ```text
//! X-Test-User: {"email":"a@x","role":"management","department":"management"}
//! ```

use axum::{
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use super::claims::{AuthenticatedUser, IdentitySource};
use super::error::AuthError;
use super::roles::Role;
use crate::state::AppState;

/// Header carrying the JSON test identity.
pub const TEST_USER_HEADER: &str = "x-test-user";

/// Payload of the `X-Test-User` header.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TestIdentity {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
}

impl TestIdentity {
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        serde_json::from_str(raw).map_err(|e| AuthError::InvalidTestIdentity(e.to_string()))
    }

    /// Role from the alias table, else from the department, else `employee`.
    pub fn role(&self) -> Role {
        self.role
            .as_deref()
            .and_then(Role::from_alias)
            .or_else(|| self.department.as_deref().map(Role::from_department))
            .unwrap_or_default()
    }

    pub fn into_user(self) -> AuthenticatedUser {
        let role = self.role();
        let department = self
            .department
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        AuthenticatedUser {
            display_name: self
                .preferred_username
                .unwrap_or_else(|| self.email.clone()),
            employee_id: self.employee_id.unwrap_or_default(),
            email: self.email,
            department,
            role,
            source: IdentitySource::TestOverride,
        }
    }
}

/// Read the override from extensions (set by [`capture_test_identity`])
/// or directly from the header.
///
/// Returns `Ok(None)` when no override is present.
pub fn from_parts(parts: &Parts) -> Result<Option<TestIdentity>, AuthError> {
    if let Some(identity) = parts.extensions.get::<TestIdentity>() {
        return Ok(Some(identity.clone()));
    }
    match parts.headers.get(TEST_USER_HEADER) {
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|e| AuthError::InvalidTestIdentity(e.to_string()))?;
            TestIdentity::parse(raw).map(Some)
        }
        None => Ok(None),
    }
}

/// Middleware: parse `X-Test-User` into request extensions.
///
/// Malformed payloads are left for the extractor to reject.
pub async fn capture_test_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.test_auth_enabled {
        let parsed = request
            .headers()
            .get(TEST_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| TestIdentity::parse(raw).ok());
        if let Some(identity) = parsed {
            request.extensions_mut().insert(identity);
        }
    }
    next.run(request).await
}
