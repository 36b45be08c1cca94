// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Workmate Server - HR Management API
//!
//! REST backend for the Workmate HR frontend. Every protected request runs
//! through one pipeline: token verification, identity resolution against
//! the employee table, a role gate, and an append-only audit log.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - OIDC token verification, identity resolution and role gating
//! - `audit` - Audit entry normalization and recording
//! - `storage` - Embedded ACID database (redb)
//! - `config` - Environment configuration

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod seed;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
