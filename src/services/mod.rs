pub mod auth_service;
pub mod household_service;

use thiserror::Error;

use crate::auth::AuthError;
use crate::database::DatabaseError;

pub use auth_service::{AuthService, RegisteredUser, TokenResponse};
pub use household_service::{
    ApprovalResponse, EditMethod, HouseholdMembers, HouseholdService, MemberTasks, TaskDecision,
    TaskDecisionOutcome, TaskEdit,
};

/// Failures raised by the service layer, independent of HTTP
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Missing '{0}' in request body")]
    MissingField(&'static str),

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Unauthorized request")]
    Unauthorized,

    #[error("Principal lacks rights over the target")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}
