//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

/// An error returned by a guard or handler. Every variant renders as
/// `{"error": "..."}` with its status code.
#[derive(Debug, Error)]
pub enum ApiError {
  /// 401. `detail` says why a presented credential was refused.
  #[error("{message}")]
  Unauthenticated {
    message: &'static str,
    detail:  Option<String>,
  },

  #[error("Forbidden.")]
  Forbidden,

  #[error("{0}")]
  InvalidInput(String),

  /// 400 for a body or path axum could not extract. `detail` is axum's
  /// own explanation.
  #[error("{message}")]
  BadRequest {
    message: &'static str,
    detail:  String,
  },

  /// A backend refused the operation; its message is passed through.
  #[error("{0}")]
  Upstream(String),

  #[error("{0}")]
  NotFound(String),

  /// The sample moved on between reading and writing it.
  #[error("{0}")]
  Conflict(String),
}

impl ApiError {
  pub fn invalid_session(detail: impl Into<String>) -> Self {
    Self::Unauthenticated { message: "Invalid session.", detail: Some(detail.into()) }
  }

  /// Wrap any backend error, keeping its message.
  pub fn upstream(e: impl std::error::Error) -> Self { Self::Upstream(e.to_string()) }
}

impl From<labguard_core::Error> for ApiError {
  fn from(e: labguard_core::Error) -> Self {
    match e {
      labguard_core::Error::MissingField(what) => Self::InvalidInput(format!("Missing {what}.")),
      other => Self::InvalidInput(other.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden => StatusCode::FORBIDDEN,
      ApiError::InvalidInput(_) | ApiError::BadRequest { .. } | ApiError::Upstream(_) => {
        StatusCode::BAD_REQUEST
      }
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
    };

    let mut body = json!({ "error": self.to_string() });
    match self {
      ApiError::Unauthenticated { detail: Some(detail), .. } | ApiError::BadRequest { detail, .. } => {
        body["detail"] = Value::String(detail);
      }
      _ => {}
    }
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn body_of(err: ApiError) -> (StatusCode, Value) {
    let resp = err.into_response();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn unauthenticated_carries_detail() {
    let (status, body) = body_of(ApiError::invalid_session("Token issuer does not match.")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid session.");
    assert_eq!(body["detail"], "Token issuer does not match.");
  }

  #[tokio::test]
  async fn missing_fields_read_naturally() {
    let err = ApiError::from(labguard_core::Error::MissingField("required fields"));
    let (status, body) = body_of(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields.");
    assert!(body.get("detail").is_none());
  }

  #[tokio::test]
  async fn statuses() {
    assert_eq!(body_of(ApiError::Forbidden).await.0, StatusCode::FORBIDDEN);
    assert_eq!(body_of(ApiError::NotFound("x".into())).await.0, StatusCode::NOT_FOUND);
    assert_eq!(body_of(ApiError::Conflict("x".into())).await.0, StatusCode::CONFLICT);
    assert_eq!(body_of(ApiError::Upstream("x".into())).await.0, StatusCode::BAD_REQUEST);
  }
}
