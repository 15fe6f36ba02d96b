/* src/server/core/rust/src/request.rs */

use std::future::Future;
use std::pin::Pin;

use futures_core::Stream;
use reqwest::Method;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Framework-agnostic view of an incoming request. Adapters build this from
/// their own request types before handing it to route handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
  pub method: Method,
  pub path: String,
  pub raw_query: Option<String>,
  pub cookie_header: Option<String>,
  pub accept_language: Option<String>,
}

impl RequestContext {
  pub fn get(path: impl Into<String>) -> Self {
    Self {
      method: Method::GET,
      path: path.into(),
      raw_query: None,
      cookie_header: None,
      accept_language: None,
    }
  }

  /// Path plus query string, as the browser requested it.
  pub fn url(&self) -> String {
    match self.raw_query {
      Some(ref q) if !q.is_empty() => format!("{}?{q}", self.path),
      _ => self.path.clone(),
    }
  }

  pub fn cookie(&self, name: &str) -> Option<String> {
    self.cookie_header.as_deref().and_then(|h| crate::cookies::parse_cookie(h, name))
  }
}
