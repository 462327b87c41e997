//! Request-level error type and its HTTP mapping.
//!
//! Session failures are fatal to the request and surface as a bare 500;
//! provider failures surface as 502. Details go to the log, never the body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::oauth::AuthError;
use crate::services::session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(error = %self, %status, "request failed");
        let body = status.canonical_reason().unwrap_or("error");
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_are_internal() {
        let err = AppError::from(SessionError::Unavailable("down".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_errors_are_bad_gateway() {
        let err = AppError::from(AuthError::TokenExchange("timeout".into()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn response_body_hides_details() {
        let resp = AppError::from(SessionError::Corrupt { key: "next_url".into(), reason: "secret detail".into() })
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(body.as_ref(), b"Internal Server Error");
    }
}
