// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Employee provisioning endpoints (HR staff only).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{
    auth::{Auth, Role},
    error::ApiError,
    state::AppState,
    storage::{Employee, EmployeeRepository, NewEmployee},
};

/// Employee with the role its department grants.
#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeResponse {
    #[serde(flatten)]
    pub employee: Employee,
    /// Role derived from the department.
    pub role: Role,
}

impl From<Employee> for EmployeeResponse {
    fn from(employee: Employee) -> Self {
        let role = Role::from_department(employee.department.as_deref().unwrap_or_default());
        Self { employee, role }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub employees: Vec<EmployeeResponse>,
    pub total: usize,
}

/// List all employees.
#[utoipa::path(
    get,
    path = "/hr/employees",
    tag = "HR",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Employees ordered by business id", body = EmployeeListResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (management or hr required)")
    )
)]
pub async fn list_employees(
    Auth(_user): Auth,
    State(state): State<AppState>,
) -> Result<Json<EmployeeListResponse>, ApiError> {
    let employees: Vec<EmployeeResponse> = EmployeeRepository::new(&state.db)
        .list()?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = employees.len();
    Ok(Json(EmployeeListResponse { employees, total }))
}

/// Provision a new employee.
///
/// The record and its `create` audit entry are committed together.
#[utoipa::path(
    post,
    path = "/hr/employees",
    tag = "HR",
    request_body = NewEmployee,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Employee created", body = EmployeeResponse),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (management or hr required)"),
        (status = 409, description = "Email or employee id already taken")
    )
)]
pub async fn create_employee(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<NewEmployee>,
) -> Result<(StatusCode, Json<EmployeeResponse>), ApiError> {
    request.validate().map_err(ApiError::bad_request)?;

    let uow = state.db.begin()?;
    let employee = uow.insert_employee(request)?;
    state.audit.record(
        &uow,
        Some(&user),
        "create",
        &format!("employee:{}", employee.employee_id),
        json!({
            "email": employee.email,
            "department": employee.department,
        }),
    );
    uow.commit()?;

    tracing::info!(
        employee_id = %employee.employee_id,
        created_by = %user.email,
        "Employee provisioned"
    );
    Ok((StatusCode::CREATED, Json(employee.into())))
}

/// Look up an employee by business id.
#[utoipa::path(
    get,
    path = "/hr/employees/{employee_id}",
    tag = "HR",
    params(("employee_id" = String, Path, description = "Business identifier, case-insensitive")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Employee", body = EmployeeResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (management or hr required)"),
        (status = 404, description = "No such employee")
    )
)]
pub async fn get_employee(
    Auth(_user): Auth,
    Path(employee_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<EmployeeResponse>, ApiError> {
    EmployeeRepository::new(&state.db)
        .get_by_employee_id(&employee_id)?
        .map(|e| Json(e.into()))
        .ok_or_else(|| ApiError::not_found(format!("Employee {employee_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn response_carries_derived_role() {
        let response: EmployeeResponse = Employee {
            id: Uuid::new_v4(),
            employee_id: "KIT-0005".to_string(),
            name: "Dora Lenz".to_string(),
            email: "dora@kit.test".to_string(),
            department: Some("Security".to_string()),
            position: Some("Guard".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
        .into();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "employee");
        assert_eq!(json["employee_id"], "KIT-0005");
        assert_eq!(json["department"], "Security");
    }
}
