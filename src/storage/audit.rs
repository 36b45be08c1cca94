// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit log persistence.
//!
//! Entries are append-only: there is no update or delete path. Keys are
//! UUIDv7 values, so iterating the table in key order is chronological.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Database, StorageResult, UnitOfWork};

/// Audit table: UUIDv7 as u128 → serialized AuditEntry (JSON bytes).
pub(super) const AUDIT_LOGS: TableDefinition<u128, &[u8]> = TableDefinition::new("audit_logs");

/// Hard upper bound on a single audit page.
pub const MAX_PAGE_SIZE: usize = 500;

/// Default audit page size.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// A persisted audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AuditEntry {
    /// Time-ordered entry id.
    pub id: Uuid,
    /// Acting user (`system@workmate` for background actions).
    pub user_email: String,
    /// Acting role at the time of the action.
    pub role: String,
    /// Normalized action name (e.g. `upload`, `access_denied`).
    pub action: String,
    /// Normalized resource (e.g. `document:<uuid>` or a request path).
    pub resource: String,
    /// Free-form, size-capped details.
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Destination for audit entries.
///
/// Implemented by [`UnitOfWork`]: an appended entry joins the caller's
/// transaction and shares its fate.
pub trait AuditSink {
    fn append_audit(&self, entry: &AuditEntry) -> StorageResult<()>;
}

impl AuditSink for UnitOfWork {
    fn append_audit(&self, entry: &AuditEntry) -> StorageResult<()> {
        let json = serde_json::to_vec(entry)?;
        let mut table = self.txn().open_table(AUDIT_LOGS)?;
        table.insert(entry.id.as_u128(), json.as_slice())?;
        Ok(())
    }
}

/// Filters for audit queries. String filters are case-insensitive
/// substring matches.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub user_email: Option<String>,
    pub action: Option<String>,
    pub resource: Option<String>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl AuditQuery {
    fn matches(&self, entry: &AuditEntry) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle.as_deref().map(str::trim) {
                Some(n) if !n.is_empty() => haystack.to_lowercase().contains(&n.to_lowercase()),
                _ => true,
            }
        }
        contains(&entry.user_email, &self.user_email)
            && contains(&entry.action, &self.action)
            && contains(&entry.resource, &self.resource)
    }

    fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }
}

/// One page of audit entries plus the unpaginated match count.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditPage {
    pub total: usize,
    pub items: Vec<AuditEntry>,
}

/// Read access to the audit log.
pub struct AuditRepository<'a> {
    db: &'a Database,
}

impl<'a> AuditRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get a single entry by id.
    pub fn get(&self, id: Uuid) -> StorageResult<Option<AuditEntry>> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(AUDIT_LOGS)?;
        match table.get(id.as_u128())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Filtered, paginated listing, newest first.
    pub fn query(&self, query: &AuditQuery) -> StorageResult<AuditPage> {
        let limit = query.effective_limit();
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(AUDIT_LOGS)?;

        let mut total = 0;
        let mut items = Vec::with_capacity(limit);
        for entry in table.iter()?.rev() {
            let (_, value) = entry?;
            let entry: AuditEntry = serde_json::from_slice(value.value())?;
            if !query.matches(&entry) {
                continue;
            }
            if total >= query.skip && items.len() < limit {
                items.push(entry);
            }
            total += 1;
        }

        Ok(AuditPage { total, items })
    }

    /// Every entry, newest first (used by the CSV export).
    pub fn all(&self) -> StorageResult<Vec<AuditEntry>> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(AUDIT_LOGS)?;
        let mut entries = Vec::new();
        for entry in table.iter()?.rev() {
            let (_, value) = entry?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    /// Number of stored entries.
    pub fn count(&self) -> StorageResult<u64> {
        let read_txn = self.db.read()?;
        let table = read_txn.open_table(AUDIT_LOGS)?;
        Ok(table.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_db;

    fn entry(user: &str, action: &str, resource: &str) -> AuditEntry {
        AuditEntry {
            id: Uuid::now_v7(),
            user_email: user.to_string(),
            role: "hr".to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
            details: None,
            created_at: Utc::now(),
        }
    }

    fn append_all(db: &Database, entries: &[AuditEntry]) {
        let uow = db.begin().unwrap();
        for e in entries {
            uow.append_audit(e).unwrap();
        }
        uow.commit().unwrap();
    }

    #[test]
    fn append_and_get_round_trip() {
        let (db, _temp) = test_db::open();
        let e = entry("anna@kit.test", "upload", "document:1");
        append_all(&db, std::slice::from_ref(&e));

        let repo = AuditRepository::new(&db);
        assert_eq!(repo.get(e.id).unwrap(), Some(e));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn uncommitted_entries_are_discarded() {
        let (db, _temp) = test_db::open();
        let uow = db.begin().unwrap();
        uow.append_audit(&entry("anna@kit.test", "upload", "document:1"))
            .unwrap();
        drop(uow);

        assert_eq!(AuditRepository::new(&db).count().unwrap(), 0);
    }

    #[test]
    fn query_filters_case_insensitively_newest_first() {
        let (db, _temp) = test_db::open();
        let first = entry("anna@kit.test", "upload", "document:1");
        let second = entry("ben@kit.test", "delete", "document:2");
        let third = entry("ANNA@kit.test", "download", "document:3");
        append_all(&db, &[first, second, third.clone()]);

        let repo = AuditRepository::new(&db);
        let page = repo
            .query(&AuditQuery {
                user_email: Some("anna@".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0], third);

        let page = repo
            .query(&AuditQuery {
                action: Some("DEL".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].resource, "document:2");
    }

    #[test]
    fn query_paginates_with_total() {
        let (db, _temp) = test_db::open();
        let entries: Vec<_> = (0..5)
            .map(|i| entry("anna@kit.test", "update", &format!("employee:{i}")))
            .collect();
        append_all(&db, &entries);

        let page = AuditRepository::new(&db)
            .query(&AuditQuery {
                skip: 1,
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 5);
        let resources: Vec<_> = page.items.iter().map(|e| e.resource.as_str()).collect();
        assert_eq!(resources, vec!["employee:3", "employee:2"]);
    }

    #[test]
    fn limit_is_capped() {
        let query = AuditQuery {
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(query.effective_limit(), MAX_PAGE_SIZE);
        assert_eq!(AuditQuery::default().effective_limit(), DEFAULT_PAGE_SIZE);
    }
}
