// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification against the identity provider's key set.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};

use super::claims::IdentityClaims;
use super::error::AuthError;
use super::jwks::JwksManager;

/// Default clock skew tolerance in seconds.
pub const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Verifies provider-issued JWTs.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: JwksManager,
    issuer: Option<String>,
    leeway: u64,
}

impl TokenVerifier {
    pub fn new(keys: JwksManager) -> Self {
        Self {
            keys,
            issuer: None,
            leeway: DEFAULT_LEEWAY_SECS,
        }
    }

    /// Require the `iss` claim to equal `issuer`.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway = leeway_secs;
        self
    }

    pub fn keys(&self) -> &JwksManager {
        &self.keys
    }

    /// Verify signature, `exp`, `nbf` and (if configured) issuer.
    ///
    /// The audience is deliberately not checked: the provider issues tokens
    /// for the frontend client, not for this API.
    pub async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::UnknownSigningKey("<none>".to_string()))?;

        let signing_key = self.keys.get_signing_key(&kid).await?;

        let mut validation = Validation::new(signing_key.algorithm);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        if let Some(ref issuer) = self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = decode::<IdentityClaims>(token, &signing_key.key, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignature
                }
                ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
                _ => AuthError::MalformedToken,
            },
        )?;

        tracing::debug!(
            kid = %kid,
            sub = ?data.claims.sub,
            exp = ?data.claims.exp,
            "Token verified"
        );
        Ok(data.claims)
    }
}
