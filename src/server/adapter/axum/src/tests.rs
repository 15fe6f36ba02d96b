/* src/server/adapter/axum/src/tests.rs */

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{ACCEPT_LANGUAGE, CONTENT_LANGUAGE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use futures_util::StreamExt;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use trellis_server::proxy::BatchStream;
use trellis_server::{
  ApiProxy, AppConfig, Authorizer, BoxFuture, Collaborators, ProxyRequest, QueryResponse,
  RenderFn, RenderMap, RenderResult, RequestAuth, RequestContext, TrellisError, get_routes,
};

use super::*;

struct EchoProxy;

impl ApiProxy for EchoProxy {
  fn proxy(&self, request: ProxyRequest) -> BatchStream {
    let batch = request
      .queries
      .into_iter()
      .map(|q| QueryResponse::value(q.reference, json!({ "endpoint": q.endpoint })))
      .collect();
    futures_util::stream::once(async move { Ok(batch) }).boxed()
  }
}

struct IssuingAuth;

impl Authorizer for IssuingAuth {
  fn authorize(&self, _ctx: &RequestContext) -> BoxFuture<Result<RequestAuth, TrellisError>> {
    Box::pin(async {
      Ok(RequestAuth {
        oauth_token: "fresh".into(),
        refresh_token: Some("again".into()),
        expires_in: Some(3600),
        anonymous: true,
        set_cookies: true,
      })
    })
  }
}

fn render_map(render: RenderFn) -> RenderMap {
  [("en-US".to_string(), render)].into()
}

fn html_render() -> RenderFn {
  Arc::new(|req| {
    Box::pin(async move {
      Ok(RenderResult::ok(format!("<html lang=\"{}\">{}</html>", req.locale, req.url)))
    })
  })
}

fn router(render: RenderFn) -> axum::Router {
  let collab = Collaborators { api_proxy: Arc::new(EchoProxy), authorizer: Arc::new(IssuingAuth) };
  get_routes(render_map(render), &AppConfig::new("http://api.test"), collab).into_axum_router()
}

async fn body_string(resp: axum::response::Response) -> String {
  let bytes = resp.into_body().collect().await.unwrap().to_bytes();
  String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn api_get_returns_batch_json() {
  let uri = "/api?queries=%5B%7B%22ref%22%3A%22a%22%2C%22endpoint%22%3A%22groups%22%7D%5D";
  let resp = router(html_render())
    .oneshot(Request::get(uri).body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
  assert_eq!(body, json!([{"ref": "a", "value": {"endpoint": "groups"}}]));
}

#[tokio::test]
async fn api_post_reads_json_body() {
  let body = r#"{"queries": [{"ref": "rsvp", "endpoint": "events/1/rsvps"}]}"#;
  let resp = router(html_render())
    .oneshot(Request::post("/api").body(Body::from(body)).unwrap())
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(body_string(resp).await.contains("events/1/rsvps"));
}

#[tokio::test]
async fn api_rejects_unlisted_method() {
  let resp = router(html_render())
    .oneshot(Request::put("/api").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn api_without_queries_is_server_error() {
  let resp = router(html_render())
    .oneshot(Request::get("/api").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
  assert_eq!(body["ok"], false);
  assert_eq!(body["error"]["code"], "BAD_IMPLEMENTATION");
}

#[tokio::test]
async fn wildcard_renders_and_sets_cookies() {
  let resp = router(html_render())
    .oneshot(
      Request::get("/groups/rust?page=2")
        .header(ACCEPT_LANGUAGE, "de-DE")
        .body(Body::empty())
        .unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[CONTENT_LANGUAGE], "en-US");

  let cookies: Vec<String> = resp
    .headers()
    .get_all(SET_COOKIE)
    .iter()
    .map(|v| v.to_str().unwrap().to_string())
    .collect();
  assert_eq!(cookies.len(), 3);
  assert!(cookies[0].starts_with("oauth_token=fresh; Max-Age=3600"));
  assert!(cookies[1].starts_with("refresh_token=again; Max-Age=1209600"));
  assert!(cookies[2].starts_with("anonymous=true; Max-Age=1209600"));

  assert_eq!(body_string(resp).await, "<html lang=\"en-US\">/groups/rust?page=2</html>");
}

#[tokio::test]
async fn wildcard_matches_root() {
  let resp =
    router(html_render()).oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn wildcard_ignores_non_get() {
  let resp = router(html_render())
    .oneshot(Request::post("/groups").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn render_status_code_is_forwarded() {
  let missing: RenderFn = Arc::new(|_req| {
    Box::pin(async { Ok(RenderResult { result: "not here".into(), status_code: 404 }) })
  });
  let resp = router(missing)
    .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(body_string(resp).await, "not here");
}

#[tokio::test]
async fn render_failure_carries_message() {
  let failing: RenderFn =
    Arc::new(|_req| Box::pin(async { Err(TrellisError::new("X", "boom", 500)) }));
  let resp = router(failing)
    .oneshot(Request::get("/").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
  assert_eq!(body["error"]["message"], "boom");
}
