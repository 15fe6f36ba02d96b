/* src/server/adapter/axum/src/handler/api.rs */

use std::sync::Arc;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use trellis_server::{ApiProxyRoute, TrellisError};

use super::request_context;
use crate::error::AxumError;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub(super) async fn handle_api(route: Arc<ApiProxyRoute>, req: Request) -> Response {
  let (parts, body) = req.into_parts();
  let ctx = request_context(&parts);

  let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
    Ok(bytes) => bytes,
    Err(e) => return AxumError(TrellisError::bad_implementation(e.to_string())).into_response(),
  };

  match route.handle(&ctx, &body).await {
    Ok(batch) => axum::Json(batch).into_response(),
    Err(e) => AxumError::from(e).into_response(),
  }
}
