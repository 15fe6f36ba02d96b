/* src/server/adapter/axum/src/error.rs */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use trellis_server::TrellisError;

/// A handler failure as the client sees it: the error's status code and a
/// `{"ok": false, "error": {"code", "message"}}` body.
pub(crate) struct AxumError(pub TrellisError);

impl IntoResponse for AxumError {
  fn into_response(self) -> Response {
    let AxumError(err) = self;
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    tracing::debug!(code = err.code(), %status, "request failed");
    let body = serde_json::json!({
      "ok": false,
      "error": { "code": err.code(), "message": err.message() },
    });
    (status, axum::Json(body)).into_response()
  }
}

impl From<TrellisError> for AxumError {
  fn from(err: TrellisError) -> Self {
    Self(err)
  }
}
