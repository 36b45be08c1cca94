// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Maps verified token claims onto a local employee.

use super::claims::{AuthenticatedUser, IdentityClaims};
use super::error::AuthError;
use crate::storage::{Database, EmployeeRepository};

/// Resolves claims to an [`AuthenticatedUser`].
///
/// Lookup order: exact `email`, then `preferred_username` against the
/// employee name or business id. The role is always derived from the
/// matched employee's department, never from the token.
pub struct IdentityResolver<'a> {
    employees: EmployeeRepository<'a>,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            employees: EmployeeRepository::new(db),
        }
    }

    pub fn resolve(&self, claims: &IdentityClaims) -> Result<AuthenticatedUser, AuthError> {
        let storage = |e: crate::storage::StorageError| AuthError::Internal(e.to_string());

        if let Some(email) = claims.email.as_deref() {
            if let Some(employee) = self.employees.get_by_email(email).map_err(storage)? {
                return Ok(AuthenticatedUser::from_employee(&employee));
            }
        }

        if let Some(username) = claims.preferred_username.as_deref() {
            if let Some(employee) = self.employees.find_by_username(username).map_err(storage)? {
                tracing::debug!(
                    username = %username,
                    employee_id = %employee.employee_id,
                    "Resolved employee by username"
                );
                return Ok(AuthenticatedUser::from_employee(&employee));
            }
        }

        tracing::info!(
            email = ?claims.email,
            username = ?claims.preferred_username,
            "No employee matches token identity"
        );
        Err(AuthError::EmployeeNotFound)
    }
}
