// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests: RS256 signing keys, a JWKS document and
//! a local JWKS endpoint.

use std::net::SocketAddr;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// Key published by the fake identity provider.
pub const IDP_SIGNING_KEY_PEM: &str = include_str!("../tests/fixtures/idp_signing_key.pem");

/// Key nobody publishes.
pub const ROGUE_SIGNING_KEY_PEM: &str = include_str!("../tests/fixtures/rogue_signing_key.pem");

pub const IDP_KID: &str = "idp-key-1";

/// Modulus of [`IDP_SIGNING_KEY_PEM`], base64url.
pub const IDP_JWK_N: &str = "v1twFfyg-tkmjRucVSPOEm7juCLYgQLArqYnZdgJ3EIpKvZ7pGMxUKThTKxj1iKXM-gN6tY7RVrD7wLBSDY4jDeETd4KSuY8trZJSFXR-kZ92okMAGjVB_YV9Z2k0weNcP-7g3wfySTky2NZPyKYizouDCsRBCqT7jawSO43F92zWRo64Jnx7UD_5njlIxxV3HBUgkUp3CTM8vt3OUuNiiJPZC6CWTymypTVxC2EMb0tUUPAL9Lj9NwzsE01_tDamwGlpdq6RmBlb2ujwvSAAj5K2irqX67mBkqE77ttfOGVKWOi0yEqKOluMG46LyqypQgDmYsbIpTWU65V2cyT_w";

pub const ISSUER: &str = "https://login.kit.test/realms/workmate";

/// JWKS with the single provider key.
pub fn jwks_json() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "kid": IDP_KID,
            "alg": "RS256",
            "use": "sig",
            "n": IDP_JWK_N,
            "e": "AQAB"
        }]
    })
}

/// Claims valid for five minutes from now.
pub fn claims_for(email: &str) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "iss": ISSUER,
        "sub": "7d3c2e51",
        "aud": "workmate-frontend",
        "email": email,
        "iat": now,
        "exp": now + 300
    })
}

/// Sign `claims` with RS256 under the given key and `kid`.
pub fn sign(claims: &Value, private_pem: &str, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    jsonwebtoken::encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("key"),
    )
    .expect("token")
}

/// Serve `jwks` at `/certs` on an ephemeral local port.
pub async fn spawn_jwks_server(jwks: Value) -> (SocketAddr, JoinHandle<()>) {
    use axum::{routing::get, Json, Router};
    use tokio::net::TcpListener;

    let app = Router::new().route(
        "/certs",
        get(move || {
            let jwks = jwks.clone();
            async move { Json(jwks) }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, handle)
}

/// Verifier trusting the fixture provider key.
pub fn verifier() -> crate::auth::TokenVerifier {
    use crate::auth::{JwksManager, StaticKeySource};
    let source = StaticKeySource::new(serde_json::from_value(jwks_json()).expect("jwks"));
    crate::auth::TokenVerifier::new(JwksManager::new(std::sync::Arc::new(source)))
        .with_issuer(ISSUER)
}

/// Application state over a fresh database with two employees:
/// `anna@kit.test` (Backoffice) and `ben@kit.test` (Sales).
pub fn test_state(test_auth: bool) -> (crate::state::AppState, tempfile::TempDir) {
    use crate::storage::employees::new_employee;

    let (db, temp) = crate::storage::test_db::open();
    let uow = db.begin().expect("begin");
    uow.insert_employee(new_employee("KIT-0001", "Anna Berg", "anna@kit.test", "Backoffice"))
        .expect("insert");
    uow.insert_employee(new_employee("KIT-0002", "Ben Vogel", "ben@kit.test", "Sales"))
        .expect("insert");
    uow.commit().expect("commit");

    let state = crate::state::AppState::new(db)
        .with_verifier(verifier())
        .with_test_auth(test_auth);
    (state, temp)
}
