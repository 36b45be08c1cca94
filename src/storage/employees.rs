// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Employee records.
//!
//! The employee table is the join point between an external identity (token
//! email / username) and internal authorization: the `department` column is
//! the only input to role derivation.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Database, StorageError, StorageResult, UnitOfWork};

/// Primary table: internal id → serialized Employee (JSON bytes).
pub(super) const EMPLOYEES: TableDefinition<&str, &[u8]> = TableDefinition::new("employees");

/// Unique index: email (exact) → internal id.
pub(super) const EMPLOYEE_EMAILS: TableDefinition<&str, &str> =
    TableDefinition::new("employee_emails");

/// Unique index: lower-cased business id → internal id.
pub(super) const EMPLOYEE_CODES: TableDefinition<&str, &str> =
    TableDefinition::new("employee_codes");

/// Stored employee record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Employee {
    /// Internal storage key.
    pub id: Uuid,
    /// Human-readable business identifier (e.g. `KIT-0001`).
    pub employee_id: String,
    /// Display name.
    pub name: String,
    /// Unique email address.
    pub email: String,
    /// Organizational department; drives role derivation.
    pub department: Option<String>,
    /// Job title.
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provisioning payload for a new employee.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct NewEmployee {
    /// Business identifier (e.g. `KIT-0001`).
    pub employee_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

impl NewEmployee {
    /// Check the fields required for identity resolution.
    pub fn validate(&self) -> Result<(), String> {
        if self.employee_id.trim().is_empty() {
            return Err("employee_id must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err("email must be a valid address".to_string());
        }
        Ok(())
    }

    fn into_employee(self) -> Employee {
        let now = Utc::now();
        Employee {
            id: Uuid::new_v4(),
            employee_id: self.employee_id.trim().to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            department: self
                .department
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            position: self.position,
            created_at: now,
            updated_at: now,
        }
    }
}

impl UnitOfWork {
    /// Insert a new employee inside this unit of work.
    ///
    /// Fails with `AlreadyExists` if the email or business id is taken.
    pub fn insert_employee(&self, new: NewEmployee) -> StorageResult<Employee> {
        let employee = new.into_employee();
        let id = employee.id.to_string();
        let code = employee.employee_id.to_lowercase();
        let json = serde_json::to_vec(&employee)?;

        let mut emails = self.txn().open_table(EMPLOYEE_EMAILS)?;
        if emails.get(employee.email.as_str())?.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "Employee with email {}",
                employee.email
            )));
        }
        let mut codes = self.txn().open_table(EMPLOYEE_CODES)?;
        if codes.get(code.as_str())?.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "Employee {}",
                employee.employee_id
            )));
        }

        emails.insert(employee.email.as_str(), id.as_str())?;
        codes.insert(code.as_str(), id.as_str())?;
        let mut table = self.txn().open_table(EMPLOYEES)?;
        table.insert(id.as_str(), json.as_slice())?;

        Ok(employee)
    }
}

/// Read access to employee records.
pub struct EmployeeRepository<'a> {
    db: &'a Database,
}

impl<'a> EmployeeRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Look up an employee by exact email.
    pub fn get_by_email(&self, email: &str) -> StorageResult<Option<Employee>> {
        let read_txn = self.db.read()?;
        let emails = read_txn.open_table(EMPLOYEE_EMAILS)?;
        let id = match emails.get(email)? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };
        let table = read_txn.open_table(EMPLOYEES)?;
        match table.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up an employee by business id (case-insensitive).
    pub fn get_by_employee_id(&self, employee_id: &str) -> StorageResult<Option<Employee>> {
        let read_txn = self.db.read()?;
        let codes = read_txn.open_table(EMPLOYEE_CODES)?;
        let id = match codes.get(employee_id.to_lowercase().as_str())? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };
        let table = read_txn.open_table(EMPLOYEES)?;
        match table.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// First employee whose name equals `username` or whose business id
    /// contains it, both case-insensitively.
    pub fn find_by_username(&self, username: &str) -> StorageResult<Option<Employee>> {
        let needle = username.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(EMPLOYEES)?;
        for entry in table.iter()? {
            let (_, value) = entry?;
            let employee: Employee = serde_json::from_slice(value.value())?;
            if employee.name.to_lowercase() == needle
                || employee.employee_id.to_lowercase().contains(&needle)
            {
                return Ok(Some(employee));
            }
        }
        Ok(None)
    }

    /// All employees, ordered by business id.
    pub fn list(&self) -> StorageResult<Vec<Employee>> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(EMPLOYEES)?;
        let mut employees = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            employees.push(serde_json::from_slice::<Employee>(value.value())?);
        }
        employees.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
        Ok(employees)
    }
}

#[cfg(test)]
pub(crate) fn new_employee(employee_id: &str, name: &str, email: &str, department: &str) -> NewEmployee {
    NewEmployee {
        employee_id: employee_id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        department: Some(department.to_string()),
        position: None,
    }
}
