// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{enforce_roles, policy, test_identity::capture_test_identity, GateState, IdentitySource, Role},
    state::AppState,
    storage::{AuditEntry, AuditPage, Employee, NewEmployee},
};

pub mod admin;
pub mod employees;
pub mod health;
pub mod users;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let hr_routes = Router::new()
        .route(
            "/employees",
            get(employees::list_employees).post(employees::create_employee),
        )
        .route("/employees/{employee_id}", get(employees::get_employee))
        .route_layer(from_fn_with_state(
            GateState::new(state.clone(), policy::HR_STAFF),
            enforce_roles,
        ));

    let admin_routes = Router::new()
        .route("/audits", get(admin::list_audits))
        .route("/audits/export", get(admin::export_audits))
        .route_layer(from_fn_with_state(
            GateState::new(state.clone(), policy::AUDIT_READERS),
            enforce_roles,
        ));

    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/me", get(users::get_current_user))
        .nest("/hr", hr_routes)
        .nest("/admin", admin_routes)
        .layer(from_fn_with_state(state.clone(), capture_test_identity))
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        });

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(trace_layer)
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors_layer(cors_origins))
}

/// CORS for the configured frontend origins (`*` allows any).
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-test-user"),
        ])
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        users::get_current_user,
        employees::list_employees,
        employees::create_employee,
        employees::get_employee,
        admin::list_audits,
        admin::export_audits
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            users::UserMeResponse,
            employees::EmployeeResponse,
            employees::EmployeeListResponse,
            Employee,
            NewEmployee,
            AuditEntry,
            AuditPage,
            Role,
            IdentitySource
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Users", description = "Current user context"),
        (name = "HR", description = "Employee provisioning"),
        (name = "Admin", description = "Audit log access and export")
    )
)]
struct ApiDoc;
