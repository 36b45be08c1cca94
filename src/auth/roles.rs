// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.
//!
//! Two static tables feed the role model:
//!
//! - the **department table** derives a role from an employee's department
//!   (unknown departments fall back to `Employee`, never to anything higher);
//! - the **alias table** maps organizational labels onto canonical roles so
//!   that e.g. `backoffice` and `hr`, or `admin` and `management`, compare
//!   equal.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Canonical authorization roles.
///
/// There is no implicit hierarchy: `Management` does not satisfy an
/// `Hr`-only allow-list unless the allow-list names it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular staff (default for unknown departments)
    Employee,
    /// Human resources / back office
    Hr,
    /// Company management
    Management,
    /// IT support
    Support,
}

/// Raw label → canonical role. Every canonical name maps to itself.
const ROLE_ALIASES: &[(&str, Role)] = &[
    ("employee", Role::Employee),
    ("hr", Role::Hr),
    ("backoffice", Role::Hr),
    ("management", Role::Management),
    ("admin", Role::Management),
    ("support", Role::Support),
];

/// Lower-cased department → derived role.
const DEPARTMENT_ROLES: &[(&str, Role)] = &[
    ("backoffice", Role::Hr),
    ("hr", Role::Hr),
    ("management", Role::Management),
    ("support", Role::Support),
];

impl Role {
    pub const ALL: [Role; 4] = [Role::Employee, Role::Hr, Role::Management, Role::Support];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Hr => "hr",
            Role::Management => "management",
            Role::Support => "support",
        }
    }

    /// Normalize a role label through the alias table (case-insensitive).
    pub fn from_alias(label: &str) -> Option<Role> {
        let label = label.trim().to_lowercase();
        ROLE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == label)
            .map(|(_, role)| *role)
    }

    /// Derive the role of an employee from their department.
    pub fn from_department(department: &str) -> Role {
        let department = department.trim().to_lowercase();
        DEPARTMENT_ROLES
            .iter()
            .find(|(name, _)| *name == department)
            .map(|(_, role)| *role)
            .unwrap_or_default()
    }
}

impl Default for Role {
    /// Least privilege.
    fn default() -> Self {
        Role::Employee
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of canonical roles an operation accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    roles: BTreeSet<Role>,
}

impl AllowList {
    /// Build from role labels, normalizing each through the alias table.
    ///
    /// Labels without a canonical role are dropped with a warning; they could
    /// never match a resolved user.
    pub fn from_labels(labels: &[&str]) -> Self {
        let mut roles = BTreeSet::new();
        for label in labels {
            match Role::from_alias(label) {
                Some(role) => {
                    roles.insert(role);
                }
                None => tracing::warn!(label = %label, "Ignoring unknown role in allow-list"),
            }
        }
        Self { roles }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn roles(&self) -> Vec<Role> {
        self.roles.iter().copied().collect()
    }
}
