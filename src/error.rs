use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::db::StoreError;
use crate::views::{with_status, ErrorPage, View};

pub const FORBIDDEN_MESSAGE: &str = "Access denied. Admin only.";

/// Failures that end a request with an error page.
///
/// Form validation problems are not represented here; handlers re-render the form instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("user not found")]
    NotFound,
    #[error("admin role required")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.into())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::NotFound => "User not found".to_string(),
            AppError::Forbidden => FORBIDDEN_MESSAGE.to_string(),
            AppError::Internal(e) => {
                error!(error = ?e, "request failed");
                "Something went wrong. Please try again.".to_string()
            }
        };
        with_status(
            status,
            View::Error(ErrorPage {
                status: status.as_u16(),
                message,
            }),
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
