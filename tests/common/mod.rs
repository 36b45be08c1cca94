// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use workmate_server::{
    api::router,
    audit::AuditRecorder,
    auth::{JwksManager, StaticKeySource, TokenVerifier},
    seed::seed_employees,
    state::AppState,
    storage::{Database, NewEmployee},
};

pub const IDP_SIGNING_KEY_PEM: &str = include_str!("../fixtures/idp_signing_key.pem");
pub const ROGUE_SIGNING_KEY_PEM: &str = include_str!("../fixtures/rogue_signing_key.pem");
pub const IDP_KID: &str = "idp-key-1";
pub const IDP_JWK_N: &str = "v1twFfyg-tkmjRucVSPOEm7juCLYgQLArqYnZdgJ3EIpKvZ7pGMxUKThTKxj1iKXM-gN6tY7RVrD7wLBSDY4jDeETd4KSuY8trZJSFXR-kZ92okMAGjVB_YV9Z2k0weNcP-7g3wfySTky2NZPyKYizouDCsRBCqT7jawSO43F92zWRo64Jnx7UD_5njlIxxV3HBUgkUp3CTM8vt3OUuNiiJPZC6CWTymypTVxC2EMb0tUUPAL9Lj9NwzsE01_tDamwGlpdq6RmBlb2ujwvSAAj5K2irqX67mBkqE77ttfOGVKWOi0yEqKOluMG46LyqypQgDmYsbIpTWU65V2cyT_w";
pub const ISSUER: &str = "https://login.kit.test/realms/workmate";

/// A running router over a temporary database.
pub struct TestApp {
    pub app: Router,
    pub db: Arc<Database>,
    pub keys: Arc<StaticKeySource>,
    _temp: TempDir,
}

impl TestApp {
    /// Employees:
    /// - KIT-0001 Anna Berg, Backoffice (hr)
    /// - KIT-0002 Ben Vogel, Sales (employee)
    /// - KIT-0003 Carla Roth, Management (management)
    /// - KIT-0004 Dirk Hahn, Facility (employee)
    pub fn new(test_auth: bool) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let db = Database::open(&temp.path().join("workmate.redb")).expect("database");
        seed_employees(
            &db,
            &AuditRecorder::default(),
            vec![
                employee("KIT-0001", "Anna Berg", "anna@kit.test", "Backoffice"),
                employee("KIT-0002", "Ben Vogel", "ben@kit.test", "Sales"),
                employee("KIT-0003", "Carla Roth", "carla@kit.test", "Management"),
                employee("KIT-0004", "Dirk Hahn", "dirk@kit.test", "Facility"),
            ],
        )
        .expect("seed");

        let keys = Arc::new(StaticKeySource::new(
            serde_json::from_value(jwks_json()).expect("jwks"),
        ));
        let verifier = TokenVerifier::new(JwksManager::new(keys.clone())).with_issuer(ISSUER);
        let state = AppState::new(db)
            .with_verifier(verifier)
            .with_test_auth(test_auth);
        let db = state.db.clone();

        Self {
            app: router(state, &["http://localhost:5173".to_string()]),
            db,
            keys,
            _temp: temp,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.expect("response")
    }

    pub async fn get(&self, uri: &str, headers: &[(&str, String)]) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }
}

pub fn employee(employee_id: &str, name: &str, email: &str, department: &str) -> NewEmployee {
    NewEmployee {
        employee_id: employee_id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        department: Some(department.to_string()),
        position: None,
    }
}

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

pub fn token_for(email: &str) -> String {
    token_with(email, IDP_SIGNING_KEY_PEM, IDP_KID)
}

pub fn token_with(email: &str, private_pem: &str, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "iss": ISSUER,
        "sub": format!("sub-{email}"),
        "aud": "workmate-frontend",
        "email": email,
        "iat": now,
        "exp": now + 300
    });
    jsonwebtoken::encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("key"),
    )
    .expect("token")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("authorization", format!("Bearer {token}"))
}

pub fn test_user(json: Value) -> (&'static str, String) {
    ("x-test-user", json.to_string())
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn read_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}
