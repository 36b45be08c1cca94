// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::audit::AuditRecorder;
use crate::auth::TokenVerifier;
use crate::storage::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    /// `None` when no identity provider is configured; bearer tokens are
    /// then rejected with `jwks_unavailable`.
    pub verifier: Option<TokenVerifier>,
    pub audit: AuditRecorder,
    /// Honour `X-Test-User`. Fixed at startup.
    pub test_auth_enabled: bool,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            verifier: None,
            audit: AuditRecorder::default(),
            test_auth_enabled: false,
        }
    }

    pub fn with_verifier(mut self, verifier: TokenVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_audit(mut self, audit: AuditRecorder) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_test_auth(mut self, enabled: bool) -> Self {
        self.test_auth_enabled = enabled;
        self
    }
}
