use super::{components, components::Component, htmx};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Everything a controller can fail with. All of these end up as a blocking
/// alert in the browser; none of them are retried.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("you must be logged in to do that")]
    NotAuthenticated,
    #[error("{0}")]
    Validation(String),
    #[error("that record does not exist")]
    NotFound,
    #[error("remote operation failed: {0:#}")]
    Remote(anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Remote(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the user gets to read. Remote failures are logged in full but
    /// only summarized in the alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote(_) => "Something went wrong".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Remote(err) => tracing::error!(error = ?err, "request failed"),
            other => tracing::warn!(error = %other, "request rejected"),
        }
        let status = self.status();
        if let Self::NotAuthenticated = self {
            return (
                status,
                htmx::redirect("/authentication/login"),
                components::LoginRequired {}.render(),
            )
                .into_response();
        }
        (
            status,
            htmx::retarget_alert(),
            components::Alert {
                message: &self.user_message(),
            }
            .render(),
        )
            .into_response()
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>`
// to turn them into `Result<_, AppError>`. Typed `AppError`s that went
// through anyhow come back out as themselves.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app_err) => app_err,
            Err(err) => match err.downcast_ref::<sqlx::Error>() {
                Some(sqlx::Error::RowNotFound) => Self::NotFound,
                _ => Self::Remote(err),
            },
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Remote(other.into()),
        }
    }
}
