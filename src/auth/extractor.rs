// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! # Usage
//!
//! ```ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user.role was derived from the employee's department
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::claims::AuthenticatedUser;
use super::error::AuthError;
use super::resolver::IdentityResolver;
use super::test_identity::{self, TEST_USER_HEADER};
use crate::state::AppState;

/// Extractor for authenticated users.
///
/// Reuses the user placed in request extensions by the role gate; otherwise
/// runs the full pipeline itself.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let user = authenticate(parts, state).await?;
        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

/// Establish the acting user for a request.
///
/// Order: test override (only in test-auth mode), then bearer token
/// verification followed by employee resolution.
pub async fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthenticatedUser, AuthError> {
    if state.test_auth_enabled {
        if let Some(identity) = test_identity::from_parts(parts)? {
            tracing::debug!(email = %identity.email, "Using test identity override");
            return Ok(identity.into_user());
        }
    } else if parts.headers.contains_key(TEST_USER_HEADER) {
        tracing::warn!("Ignoring X-Test-User header: test authentication is disabled");
    }

    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)?;

    let verifier = state.verifier.as_ref().ok_or_else(|| {
        AuthError::KeySetUnavailable("no identity provider configured".to_string())
    })?;

    let claims = verifier.verify(token).await?;
    IdentityResolver::new(&state.db).resolve(&claims)
}
