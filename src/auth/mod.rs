// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! OIDC authentication and role-based authorization for the Workmate API.
//!
//! ## Auth Flow
//!
//! 1. The frontend authenticates the user with the identity provider
//! 2. The frontend sends `Authorization: Bearer <JWT>`
//! 3. The server:
//!    - verifies the JWT against the provider's JWKS (signature, expiry,
//!      not-before, issuer)
//!    - resolves the claims to a local employee (email, then username)
//!    - derives the role from the employee's department
//!    - checks the role against the route group's allow-list, auditing
//!      every denial
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - Roles never come from the token; only the employee table grants them
//! - Token audience is not validated
//! - Clock skew tolerance defaults to 60 seconds
//! - `X-Test-User` is honoured only when started with `WORKMATE_TEST_AUTH=true`

pub mod claims;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod jwks;
pub mod resolver;
pub mod roles;
pub mod test_identity;
pub mod verifier;

pub use claims::{AuthenticatedUser, IdentityClaims, IdentitySource};
pub use error::AuthError;
pub use extractor::Auth;
pub use gate::{enforce_roles, policy, GateState, RoleGate};
pub use jwks::{HttpKeySource, JwksManager, KeySource, RefreshPolicy, StaticKeySource};
pub use resolver::IdentityResolver;
pub use roles::{AllowList, Role};
pub use test_identity::{TestIdentity, TEST_USER_HEADER};
pub use verifier::TokenVerifier;
