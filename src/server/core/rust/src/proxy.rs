/* src/server/core/rust/src/proxy.rs */

use futures_util::StreamExt;
use futures_util::future::join_all;
use reqwest::Method;
use serde_json::Value;

use crate::errors::TrellisError;
use crate::query::{Query, QueryResponse};
use crate::request::BoxStream;

/// A parsed `/api` call ready to be forwarded upstream.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
  pub method: Method,
  pub queries: Vec<Query>,
  pub oauth_token: Option<String>,
}

pub type BatchStream = BoxStream<Result<Vec<QueryResponse>, TrellisError>>;

/// Forwards queries to the API server. Each emitted item is one batch of
/// responses; the `/api` route answers with the first one.
pub trait ApiProxy: Send + Sync {
  fn proxy(&self, request: ProxyRequest) -> BatchStream;
}

/// `ApiProxy` over plain HTTP to `API_SERVER_ROOT_URL`.
pub struct HttpApiProxy {
  client: reqwest::Client,
  api_root: String,
}

impl HttpApiProxy {
  pub fn new(api_root: impl Into<String>) -> Self {
    let api_root = api_root.into().trim_end_matches('/').to_string();
    Self { client: reqwest::Client::new(), api_root }
  }

  pub fn endpoint_url(&self, endpoint: &str) -> String {
    format!("{}/{}", self.api_root, endpoint.trim_start_matches('/'))
  }
}

/// Flatten params into string pairs for the upstream query string.
fn query_pairs(query: &Query) -> Vec<(String, String)> {
  query
    .params
    .iter()
    .map(|(k, v)| {
      let v = match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
      };
      (k.clone(), v)
    })
    .collect()
}

async fn send_query(
  client: reqwest::Client,
  url: String,
  method: Method,
  query: Query,
  oauth_token: Option<String>,
) -> QueryResponse {
  let mut builder = client.request(method.clone(), &url);
  builder = if method == Method::GET || method == Method::DELETE {
    builder.query(&query_pairs(&query))
  } else {
    builder.json(&query.params)
  };
  if let Some(token) = oauth_token {
    builder = builder.bearer_auth(token);
  }

  let result = async {
    let resp = builder.send().await?.error_for_status()?;
    let value: Value = resp.json().await?;
    Ok::<Value, reqwest::Error>(value)
  }
  .await;

  match result {
    Ok(value) => QueryResponse::value(query.reference, value),
    Err(e) => {
      tracing::warn!(query = %query.reference, %url, error = %e, "upstream query failed");
      QueryResponse::error(query.reference, e.to_string())
    }
  }
}

impl ApiProxy for HttpApiProxy {
  fn proxy(&self, request: ProxyRequest) -> BatchStream {
    let calls: Vec<_> = request
      .queries
      .into_iter()
      .map(|query| {
        let url = self.endpoint_url(&query.endpoint);
        send_query(
          self.client.clone(),
          url,
          request.method.clone(),
          query,
          request.oauth_token.clone(),
        )
      })
      .collect();

    tracing::debug!(count = calls.len(), method = %request.method, "proxying queries");
    futures_util::stream::once(async move { Ok(join_all(calls).await) }).boxed()
  }
}
