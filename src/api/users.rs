// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthenticatedUser, IdentitySource, Role};

/// Response for GET /me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    pub display_name: String,
    pub email: String,
    /// Business id of the matching employee
    #[serde(skip_serializing_if = "String::is_empty")]
    pub employee_id: String,
    pub department: String,
    /// Role derived from the department
    pub role: Role,
    /// How the identity was established
    pub source: IdentitySource,
}

impl From<AuthenticatedUser> for UserMeResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            display_name: user.display_name,
            email: user.email,
            employee_id: user.employee_id,
            department: user.department,
            role: user.role,
            source: user.source,
        }
    }
}

/// Get the current authenticated user's information.
#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "No employee matches the token identity"),
    )
)]
pub async fn get_current_user(Auth(user): Auth) -> Json<UserMeResponse> {
    Json(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_me_response_from_authenticated_user() {
        let user = AuthenticatedUser {
            display_name: "Anna Berg".to_string(),
            email: "anna@kit.test".to_string(),
            employee_id: "KIT-0001".to_string(),
            department: "backoffice".to_string(),
            role: Role::Hr,
            source: IdentitySource::Token,
        };

        let response: UserMeResponse = user.into();
        assert_eq!(response.employee_id, "KIT-0001");
        assert_eq!(response.role, Role::Hr);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "hr");
        assert_eq!(json["source"], "token");
    }
}
