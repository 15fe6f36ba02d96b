/* src/server/core/rust/src/render.rs */

use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::RequestAuth;
use crate::errors::TrellisError;
use crate::locale::DEFAULT_LOCALE;
use crate::request::BoxFuture;

/// Everything a render function needs to produce a page.
#[derive(Debug, Clone)]
pub struct RenderRequest {
  /// Path and query string of the requested page
  pub url: String,
  pub locale: String,
  pub auth: RequestAuth,
  pub api_root_url: String,
  pub photo_scaler_salt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
  pub result: String,
  pub status_code: u16,
}

impl RenderResult {
  pub fn ok(result: impl Into<String>) -> Self {
    Self { result: result.into(), status_code: 200 }
  }
}

pub type RenderFn =
  Arc<dyn Fn(RenderRequest) -> BoxFuture<Result<RenderResult, TrellisError>> + Send + Sync>;

/// Locale code -> render function.
pub type RenderMap = HashMap<String, RenderFn>;

/// Render function for `locale`, falling back to the default locale's.
pub fn select_render_fn<'a>(map: &'a RenderMap, locale: &str) -> Option<&'a RenderFn> {
  map.get(locale).or_else(|| map.get(DEFAULT_LOCALE))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fixed(body: &'static str) -> RenderFn {
    Arc::new(move |_req| Box::pin(async move { Ok(RenderResult::ok(body)) }))
  }

  fn request(locale: &str) -> RenderRequest {
    RenderRequest {
      url: "/".into(),
      locale: locale.into(),
      auth: RequestAuth::default(),
      api_root_url: "http://api".into(),
      photo_scaler_salt: String::new(),
    }
  }

  #[tokio::test]
  async fn exact_locale_is_selected() {
    let map: RenderMap =
      [("en-US".to_string(), fixed("en")), ("fr-FR".to_string(), fixed("fr"))].into();
    let render = select_render_fn(&map, "fr-FR").unwrap();
    assert_eq!(render(request("fr-FR")).await.unwrap().result, "fr");
  }

  #[tokio::test]
  async fn unknown_locale_uses_default() {
    let map: RenderMap = [("en-US".to_string(), fixed("en"))].into();
    let render = select_render_fn(&map, "ja-JP").unwrap();
    assert_eq!(render(request("ja-JP")).await.unwrap().result, "en");
  }

  #[test]
  fn no_default_yields_none() {
    let map: RenderMap = [("fr-FR".to_string(), fixed("fr"))].into();
    assert!(select_render_fn(&map, "ja-JP").is_none());
  }
}
