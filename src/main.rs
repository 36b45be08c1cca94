// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use workmate_server::{
    api::router,
    audit::AuditRecorder,
    auth::{HttpKeySource, JwksManager, KeySource, StaticKeySource, TokenVerifier},
    config::{Config, KeySetLocation, OidcConfig, TEST_AUTH_ENV},
    logging::init_tracing,
    seed::seed_employees_from_file,
    state::AppState,
    storage::Database,
};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    init_tracing(config.log_format);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(&config.database_path())?;
    tracing::info!(path = %config.database_path().display(), "Opened database");

    let recorder = AuditRecorder::new(config.audit_max_details_len);
    tracing::info!(max_details_len = recorder.max_details_len(), "Audit recorder ready");
    if let Some(path) = &config.seed_employees {
        seed_employees_from_file(&db, &recorder, path)?;
    }

    let mut state = AppState::new(db)
        .with_audit(recorder)
        .with_test_auth(config.test_auth);

    match &config.oidc {
        Some(oidc) => state = state.with_verifier(build_verifier(oidc)?),
        None => tracing::warn!("No identity provider configured; bearer tokens will be rejected"),
    }
    if config.test_auth {
        tracing::warn!(
            "{TEST_AUTH_ENV} is enabled: X-Test-User headers bypass token authentication"
        );
    }

    let app = router(state, &config.cors_origins);
    let addr = config.bind_addr;

    match &config.tls {
        Some(tls) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            let _ = rustls::crypto::ring::default_provider().install_default();
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

            tracing::info!(%addr, "Workmate server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!(%addr, "Workmate server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await?;
        }
    }
    Ok(())
}

fn build_verifier(oidc: &OidcConfig) -> Result<TokenVerifier, Box<dyn std::error::Error>> {
    let source: Arc<dyn KeySource> = match &oidc.keys {
        KeySetLocation::Url(url) => Arc::new(HttpKeySource::new(url.as_str(), oidc.fetch_timeout)?),
        KeySetLocation::File(path) => Arc::new(StaticKeySource::from_file(path)?),
    };
    tracing::info!(
        source = %source.describe(),
        ttl_secs = ?oidc.refresh.ttl.map(|t| t.as_secs()),
        refetch_on_miss = oidc.refresh.refetch_on_miss,
        "Configured identity provider keys"
    );

    let mut verifier =
        TokenVerifier::new(JwksManager::new(source).with_policy(oidc.refresh)).with_leeway(oidc.leeway_secs);
    if let Some(issuer) = &oidc.issuer {
        verifier = verifier.with_issuer(issuer);
    }
    Ok(verifier)
}
