// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Startup provisioning of employees from a JSON file.
//!
//! ```json
//! [
//!   {"employee_id": "KIT-0001", "name": "Anna Berg", "email": "anna@kit.test", "department": "Backoffice"}
//! ]
//! ```

use std::path::Path;

use serde_json::json;

use crate::audit::AuditRecorder;
use crate::storage::{Database, NewEmployee, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid employee '{employee_id}': {reason}")]
    Invalid { employee_id: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

pub fn seed_employees_from_file(
    db: &Database,
    recorder: &AuditRecorder,
    path: &Path,
) -> Result<SeedReport, SeedError> {
    let content = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let employees: Vec<NewEmployee> = serde_json::from_str(&content)?;
    seed_employees(db, recorder, employees)
}

/// Insert all employees in one unit of work. Existing ones are skipped;
/// each created employee is audited as a system `create`.
pub fn seed_employees(
    db: &Database,
    recorder: &AuditRecorder,
    employees: Vec<NewEmployee>,
) -> Result<SeedReport, SeedError> {
    for new in &employees {
        new.validate().map_err(|reason| SeedError::Invalid {
            employee_id: new.employee_id.clone(),
            reason,
        })?;
    }

    let uow = db.begin()?;
    let mut report = SeedReport::default();
    for new in employees {
        match uow.insert_employee(new) {
            Ok(employee) => {
                recorder.record(
                    &uow,
                    None,
                    "create",
                    &format!("employee:{}", employee.employee_id),
                    json!({"source": "seed", "email": employee.email}),
                );
                report.created += 1;
            }
            Err(StorageError::AlreadyExists(what)) => {
                tracing::debug!(employee = %what, "Seed employee already present");
                report.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    uow.commit()?;

    tracing::info!(created = report.created, skipped = report.skipped, "Seeded employees");
    Ok(report)
}
