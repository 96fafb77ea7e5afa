//! Request extractors whose rejections render as [`ApiError`].
//!
//! axum's own `Json` and `Path` reject with plain-text bodies; these wrappers
//! route the same failures through `{"error", "detail"}`.

use axum::{
  extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection},
  },
  response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ApiError;

/// A JSON request body, or a JSON response.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
  fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

/// Path parameters.
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    let message = match rejection {
      JsonRejection::MissingJsonContentType(_) => "Expected a JSON body.",
      JsonRejection::JsonSyntaxError(_) => "Malformed JSON body.",
      _ => "Invalid JSON body.",
    };
    Self::BadRequest { message, detail: rejection.body_text() }
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    Self::BadRequest { message: "Invalid id.", detail: rejection.body_text() }
  }
}
