use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Movie not found")]
    MovieNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("User not created properly")]
    UserNotCreated,

    #[error("Review not created")]
    ReviewNotCreated,

    #[error("Username already taken")]
    DuplicateUsername,

    #[error("Review references a user or movie that does not exist")]
    InvalidReference,

    #[error("User is still referenced by reviews or watchlist entries")]
    UserInUse,

    #[error("{0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    JsonRejection(#[from] JsonRejection),

    #[error(transparent)]
    PathRejection(#[from] PathRejection),

    #[error(transparent)]
    Storage(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MovieNotFound | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::UserNotCreated | Self::ReviewNotCreated => StatusCode::BAD_REQUEST,
            Self::DuplicateUsername | Self::InvalidReference | Self::UserInUse => {
                StatusCode::CONFLICT
            }
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::JsonRejection(rejection) => rejection.status(),
            Self::PathRejection(PathRejection::FailedToDeserializePathParams(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::PathRejection(rejection) => rejection.status(),
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Storage and internal failures are logged in full but never echoed to clients.
        let detail = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
            match &self {
                Self::JsonRejection(rejection) => rejection.body_text(),
                Self::PathRejection(rejection) => rejection.body_text(),
                other => other.to_string(),
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
