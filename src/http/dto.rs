//! Request and response bodies.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::domain::{NewUser, User};

/// Body of `POST /api/v1/users`.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
}

/// Body of `PUT /api/v1/users/:id`. Both fields are replaced.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UpdateUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
        }
    }
}

impl From<UpdateUserRequest> for NewUser {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One line naming each violated constraint, fields in name order.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let violations: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect();

    format!("Invalid request: {}", violations.join("; "))
}
