// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::roles::Role;

/// Authentication error type.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingCredentials,

    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Unknown signing key in token header: {0}")]
    UnknownSigningKey(String),

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Token is not yet valid")]
    TokenNotYetValid,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token issuer does not match")]
    IssuerMismatch,

    #[error("No employee found for the authenticated user")]
    EmployeeNotFound,

    #[error("Invalid X-Test-User header: {0}")]
    InvalidTestIdentity(String),

    #[error("Access denied: required one of {}, got '{actual}'", format_roles(.required))]
    AccessDenied { required: Vec<Role>, actual: Role },

    #[error("Signing keys unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

fn format_roles(roles: &[Role]) -> String {
    let names: Vec<_> = roles.iter().map(Role::as_str).collect();
    format!("[{}]", names.join(", "))
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownSigningKey(_) => "unknown_signing_key",
            AuthError::ExpiredToken => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::EmployeeNotFound => "employee_not_found",
            AuthError::InvalidTestIdentity(_) => "invalid_test_identity",
            AuthError::AccessDenied { .. } => "access_denied",
            AuthError::KeySetUnavailable(_) => "jwks_unavailable",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::UnknownSigningKey(_)
            | AuthError::ExpiredToken
            | AuthError::TokenNotYetValid
            | AuthError::InvalidSignature
            | AuthError::IssuerMismatch => StatusCode::UNAUTHORIZED,
            AuthError::EmployeeNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidTestIdentity(_) => StatusCode::BAD_REQUEST,
            AuthError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            AuthError::KeySetUnavailable(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Authentication pipeline failure");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
