/* src/server/adapter/axum/src/handler/page.rs */

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::{CONTENT_LANGUAGE, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use trellis_server::{RenderOutcome, RenderRoute, TrellisError};

use super::request_context;
use crate::error::AxumError;

pub(super) async fn handle_page(route: Arc<RenderRoute>, req: Request) -> Response {
  let (parts, _body) = req.into_parts();
  let ctx = request_context(&parts);

  match route.handle(&ctx).await.and_then(page_response) {
    Ok(response) => response,
    Err(e) => AxumError::from(e).into_response(),
  }
}

/// The token cookies are written all together or not at all.
fn page_response(outcome: RenderOutcome) -> Result<Response, TrellisError> {
  let cookies = outcome
    .cookies
    .iter()
    .map(|cookie| {
      HeaderValue::from_str(&cookie.to_string()).map_err(|e| {
        tracing::warn!(cookie = %cookie.name, error = %e, "cookie is not a valid header value");
        TrellisError::bad_implementation(format!("cookie {} cannot be encoded: {e}", cookie.name))
      })
    })
    .collect::<Result<Vec<_>, _>>()?;

  let status = StatusCode::from_u16(outcome.status_code).unwrap_or(StatusCode::OK);
  let mut response = (status, Html(outcome.body)).into_response();
  let headers = response.headers_mut();
  if let Ok(lang) = HeaderValue::from_str(&outcome.locale) {
    headers.insert(CONTENT_LANGUAGE, lang);
  }
  for value in cookies {
    headers.append(SET_COOKIE, value);
  }
  Ok(response)
}
