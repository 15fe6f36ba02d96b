/* src/server/adapter/axum/src/handler/mod.rs */

mod api;
mod page;

use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::http::header::{ACCEPT_LANGUAGE, COOKIE, HeaderName};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::routing::{MethodFilter, on};
use trellis_server::{RequestContext, RouteDef, RouteHandler};

pub(crate) fn build_router(routes: Vec<RouteDef>) -> Router {
  let mut router = Router::new();

  for route in routes {
    let Some(filter) = method_filter(&route) else {
      tracing::warn!(path = route.path, "route has no routable methods, skipping");
      continue;
    };
    let catch_all = route.is_catch_all();
    let methods = route.methods.clone();
    let path = axum_path(route.path);

    match route.handler {
      RouteHandler::ApiProxy(handler) => {
        let handler = Arc::new(handler);
        router = router.route(
          &path,
          on(filter, move |req: Request| {
            let handler = handler.clone();
            async move { api::handle_api(handler, req).await }
          }),
        );
      }
      RouteHandler::Render(handler) if catch_all => {
        // axum's `{*rest}` does not match "/", so the page catch-all is the fallback
        let handler = Arc::new(handler);
        router = router.fallback(move |req: Request| {
          let handler = handler.clone();
          let allowed = methods.contains(req.method());
          async move {
            if !allowed {
              return StatusCode::NOT_FOUND.into_response();
            }
            page::handle_page(handler, req).await
          }
        });
      }
      RouteHandler::Render(handler) => {
        let handler = Arc::new(handler);
        router = router.route(
          &path,
          on(filter, move |req: Request| {
            let handler = handler.clone();
            async move { page::handle_page(handler, req).await }
          }),
        );
      }
    }
  }

  router
}

fn method_filter(route: &RouteDef) -> Option<MethodFilter> {
  route
    .methods
    .iter()
    .filter_map(|m| MethodFilter::try_from(m.clone()).ok())
    .reduce(MethodFilter::or)
}

/// Translate hapi path params (`{name}`, `{name*}`) into axum syntax (`{name}`, `{*name}`).
pub(crate) fn axum_path(path: &str) -> String {
  path
    .split('/')
    .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix("*}")) {
      Some(name) => format!("{{*{name}}}"),
      None => segment.to_string(),
    })
    .collect::<Vec<_>>()
    .join("/")
}

pub(crate) fn request_context(parts: &Parts) -> RequestContext {
  let header =
    |name: HeaderName| parts.headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);
  RequestContext {
    method: parts.method.clone(),
    path: parts.uri.path().to_string(),
    raw_query: parts.uri.query().map(String::from),
    cookie_header: header(COOKIE),
    accept_language: header(ACCEPT_LANGUAGE),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn axum_path_translation() {
    assert_eq!(axum_path("/api"), "/api");
    assert_eq!(axum_path("/{wild*}"), "/{*wild}");
    assert_eq!(axum_path("/groups/{id}/{rest*}"), "/groups/{id}/{*rest}");
  }

  #[test]
  fn request_context_from_parts() {
    let req = axum::http::Request::builder()
      .uri("/events/1?tab=rsvp")
      .header(COOKIE, "oauth_token=t")
      .header(ACCEPT_LANGUAGE, "fr-FR")
      .body(())
      .unwrap();
    let (parts, ()) = req.into_parts();
    let ctx = request_context(&parts);
    assert_eq!(ctx.path, "/events/1");
    assert_eq!(ctx.raw_query.as_deref(), Some("tab=rsvp"));
    assert_eq!(ctx.cookie("oauth_token").as_deref(), Some("t"));
    assert_eq!(ctx.accept_language.as_deref(), Some("fr-FR"));
  }
}
