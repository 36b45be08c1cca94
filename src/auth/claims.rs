// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the resolved user context.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::Employee;

/// Claims read from a verified identity-provider token.
///
/// Only the fields the resolver needs are decoded; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct IdentityClaims {
    /// Subject (provider user id)
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Login name; may be a display name or contain the business id
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    /// Expiration (validated by jsonwebtoken, kept for logging)
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
}

/// How the acting identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Verified bearer token resolved against the employee table
    Token,
    /// `X-Test-User` header (test-auth mode only)
    TestOverride,
}

/// The user making the current request.
///
/// Built once per request by the identity resolver (or the test override)
/// and passed explicitly to the role gate, handlers and the audit recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthenticatedUser {
    pub display_name: String,
    pub email: String,
    /// Business identifier of the matching employee
    pub employee_id: String,
    /// Lower-cased department
    pub department: String,
    pub role: Role,
    pub source: IdentitySource,
}

impl AuthenticatedUser {
    /// Build the context for an employee matched from token claims.
    pub fn from_employee(employee: &Employee) -> Self {
        let department = employee
            .department
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        Self {
            display_name: employee.name.clone(),
            email: employee.email.clone(),
            employee_id: employee.employee_id.clone(),
            role: Role::from_department(&department),
            department,
            source: IdentitySource::Token,
        }
    }
}
