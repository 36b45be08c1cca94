// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single embedded **redb** database (pure Rust,
//! ACID). Handlers open a [`UnitOfWork`] (one redb write transaction), do
//! their business writes, let the audit recorder append to the same unit,
//! and commit once.
//!
//! ## Table Layout
//!
//! - `employees`: internal id → serialized [`Employee`]
//! - `employee_emails`: email → internal id (unique)
//! - `employee_codes`: lower-cased business id → internal id (unique)
//! - `audit_logs`: time-ordered UUIDv7 (u128) → serialized [`AuditEntry`]
//!
//! ## Important Notes
//!
//! - A unit of work must not be held across an `.await`; redb allows a
//!   single writer at a time.
//! - Dropping a unit of work without committing discards everything in it,
//!   audit entries included.

pub mod audit;
pub mod employees;

use std::path::Path;

use redb::{Database as RedbDatabase, ReadTransaction, ReadableDatabase, WriteTransaction};

pub use audit::{AuditEntry, AuditPage, AuditQuery, AuditRepository, AuditSink};
pub use employees::{Employee, EmployeeRepository, NewEmployee};

use audit::AUDIT_LOGS;
use employees::{EMPLOYEES, EMPLOYEE_CODES, EMPLOYEE_EMAILS};

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID database holding employees and the audit log.
pub struct Database {
    db: RedbDatabase,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = RedbDatabase::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EMPLOYEES)?;
            let _ = write_txn.open_table(EMPLOYEE_EMAILS)?;
            let _ = write_txn.open_table(EMPLOYEE_CODES)?;
            let _ = write_txn.open_table(AUDIT_LOGS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Start a unit of work (one write transaction).
    pub fn begin(&self) -> StorageResult<UnitOfWork> {
        Ok(UnitOfWork {
            txn: self.db.begin_write()?,
        })
    }

    pub(crate) fn read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Cheap liveness probe used by the health endpoint.
    pub fn ping(&self) -> StorageResult<()> {
        let read_txn = self.read()?;
        let _ = read_txn.open_table(AUDIT_LOGS)?;
        Ok(())
    }
}

/// A single atomic write scope.
///
/// Business writes and the audit entries describing them share the same
/// transaction: both become durable on [`UnitOfWork::commit`], both vanish
/// on [`UnitOfWork::rollback`] or drop.
pub struct UnitOfWork {
    txn: WriteTransaction,
}

impl UnitOfWork {
    pub(crate) fn txn(&self) -> &WriteTransaction {
        &self.txn
    }

    pub fn commit(self) -> StorageResult<()> {
        self.txn.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> StorageResult<()> {
        self.txn.abort()?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_db {
    use super::Database;
    use tempfile::TempDir;

    /// Open a fresh database in a temporary directory.
    pub fn open() -> (Database, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(&temp_dir.path().join("workmate.redb"))
            .expect("Failed to open database");
        (db, temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_directories() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("workmate.redb");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        db.ping().unwrap();
    }

    #[test]
    fn reopen_keeps_tables() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("workmate.redb");
        drop(Database::open(&path).unwrap());
        let db = Database::open(&path).unwrap();
        db.ping().unwrap();
    }
}
