/* src/cli/core/src/render.rs */

// Template-backed render functions. Each page render runs a fresh store with
// the sync middleware, waits for the route's data, and embeds the state.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::Method;
use tokio::sync::broadcast::error::RecvError;
use trellis_server::{
  ApiProxy, DEFAULT_LOCALE, ProxyRequest, Query, RenderFn, RenderMap, RenderRequest, RenderResult,
  RequestAuth, TrellisError,
};
use trellis_sync::{
  Action, ApiFetcher, ClientRoute, FetchStream, Location, Middleware, Store, StoreState,
  SyncMiddleware, active_route_queries,
};

use crate::config::RenderSection;

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="{{locale}}">
<head><meta charset="utf-8"></head>
<body>
<div id="outlet" data-url="{{url}}"></div>
<script>window.__INITIAL_STATE__ = {{state}};</script>
</body>
</html>
"#;

/// Server-side fetcher: calls the API proxy in-process instead of looping
/// back through `/api` over HTTP.
struct ProxyFetcher {
  proxy: Arc<dyn ApiProxy>,
}

impl ApiFetcher for ProxyFetcher {
  fn fetch(&self, queries: Vec<Query>, auth: Option<RequestAuth>) -> FetchStream {
    self.proxy.proxy(ProxyRequest {
      method: Method::GET,
      queries,
      oauth_token: auth.map(|a| a.oauth_token).filter(|t| !t.is_empty()),
    })
  }
}

#[derive(Clone)]
struct PageRenderer {
  template: Arc<str>,
  routes: Arc<Vec<ClientRoute>>,
  proxy: Arc<dyn ApiProxy>,
  timeout: Duration,
}

impl PageRenderer {
  async fn render(&self, req: RenderRequest) -> Result<RenderResult, TrellisError> {
    let location = Location::parse(&req.url);
    let expects_data = !active_route_queries(&self.routes, &location).is_empty();

    let fetcher = Arc::new(ProxyFetcher { proxy: self.proxy.clone() });
    let middleware: Arc<dyn Middleware> =
      Arc::new(SyncMiddleware::new(self.routes.to_vec(), fetcher));
    let store = Store::new(StoreState::default(), vec![middleware]);
    let mut watch = store.watch();

    // meta marks the server-side configure so it doesn't trigger a resync
    store.dispatch(Action::ConfigureAuth {
      auth: req.auth.clone(),
      meta: Some(serde_json::json!({ "server": true })),
    });
    store.dispatch(Action::ServerRender(location));

    if expects_data {
      let done = async {
        loop {
          match watch.recv().await {
            Ok(Action::ApiComplete) | Err(RecvError::Closed) => break,
            Ok(_) | Err(RecvError::Lagged(_)) => {}
          }
        }
      };
      if tokio::time::timeout(self.timeout, done).await.is_err() {
        tracing::warn!(url = %req.url, "data fetch timed out, rendering partial state");
      }
    }

    let state = serde_json::to_string(&store.state())?;
    Ok(RenderResult::ok(fill_template(&self.template, &req.locale, &req.url, &state)))
  }
}

/// Substitute `{{locale}}`, `{{url}}` and `{{state}}`.
/// The state JSON is made safe to embed inside a `<script>` element.
pub fn fill_template(template: &str, locale: &str, url: &str, state_json: &str) -> String {
  template
    .replace("{{locale}}", &escape_html(locale))
    .replace("{{url}}", &escape_html(url))
    .replace("{{state}}", &state_json.replace("</", "<\\/"))
}

fn escape_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for c in raw.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

/// One render function per configured template; the built-in template
/// serves the default locale when none are configured.
pub fn template_render_map(
  section: &RenderSection,
  base_dir: &Path,
  routes: Vec<ClientRoute>,
  proxy: Arc<dyn ApiProxy>,
) -> Result<RenderMap> {
  let routes = Arc::new(routes);
  let timeout = Duration::from_millis(section.timeout_ms);
  let mut templates: Vec<(String, Arc<str>)> = Vec::new();
  for (locale, rel) in &section.templates {
    let path = base_dir.join(rel);
    let content = std::fs::read_to_string(&path)
      .with_context(|| format!("failed to read template for {locale} at {}", path.display()))?;
    templates.push((locale.clone(), Arc::from(content)));
  }
  if templates.is_empty() {
    templates.push((DEFAULT_LOCALE.to_string(), Arc::from(DEFAULT_TEMPLATE)));
  }

  let mut map = RenderMap::new();
  for (locale, template) in templates {
    let renderer =
      PageRenderer { template, routes: routes.clone(), proxy: proxy.clone(), timeout };
    let render: RenderFn = Arc::new(move |req| {
      let renderer = renderer.clone();
      Box::pin(async move { renderer.render(req).await })
    });
    map.insert(locale, render);
  }
  Ok(map)
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use futures_util::StreamExt;
  use serde_json::json;
  use trellis_server::QueryResponse;
  use trellis_server::proxy::BatchStream;

  use super::*;

  struct RecordingProxy {
    seen: Mutex<Vec<(Vec<String>, Option<String>)>>,
    hang: bool,
  }

  impl RecordingProxy {
    fn new(hang: bool) -> Arc<Self> {
      Arc::new(Self { seen: Mutex::new(Vec::new()), hang })
    }
  }

  impl ApiProxy for RecordingProxy {
    fn proxy(&self, request: ProxyRequest) -> BatchStream {
      let refs = request.queries.iter().map(|q| q.reference.clone()).collect();
      self.seen.lock().unwrap().push((refs, request.oauth_token));
      if self.hang {
        return futures_util::stream::pending().boxed();
      }
      let batch = request
        .queries
        .iter()
        .map(|q| QueryResponse::value(q.reference.clone(), json!({ "endpoint": q.endpoint })))
        .collect();
      futures_util::stream::once(async move { Ok(batch) }).boxed()
    }
  }

  fn request(url: &str) -> RenderRequest {
    RenderRequest {
      url: url.into(),
      locale: "en-US".into(),
      auth: RequestAuth { oauth_token: "tok".into(), ..Default::default() },
      api_root_url: "http://api".into(),
      photo_scaler_salt: String::new(),
    }
  }

  fn routes() -> Vec<ClientRoute> {
    vec![
      ClientRoute::new("/groups/:urlname")
        .query(|m| Some(Query::new("group", format!("groups/{}", m.params["urlname"])))),
      ClientRoute::new("/about"),
    ]
  }

  fn section(timeout_ms: u64) -> RenderSection {
    RenderSection { timeout_ms, ..Default::default() }
  }

  #[test]
  fn template_placeholders_are_escaped() {
    let html = fill_template(
      "<html lang=\"{{locale}}\" data-u=\"{{url}}\"><script>{{state}}</script>",
      "en-US",
      "/a?x=\"1\"&y=<2>",
      r#"{"s":"</script>"}"#,
    );
    assert!(html.contains("lang=\"en-US\""));
    assert!(html.contains("data-u=\"/a?x=&quot;1&quot;&amp;y=&lt;2&gt;\""));
    assert!(html.contains(r#"{"s":"<\/script>"}"#));
  }

  #[tokio::test]
  async fn render_embeds_fetched_route_data() {
    let proxy = RecordingProxy::new(false);
    let map =
      template_render_map(&section(1000), Path::new("."), routes(), proxy.clone()).unwrap();
    let render = &map[DEFAULT_LOCALE];

    let result = render(request("/groups/rustaceans")).await.unwrap();
    assert_eq!(result.status_code, 200);
    assert!(result.result.contains(r#""group":{"endpoint":"groups/rustaceans"}"#));
    assert!(result.result.contains("<html lang=\"en-US\">"));

    let seen = proxy.seen.lock().unwrap();
    assert_eq!(*seen, vec![(vec!["group".to_string()], Some("tok".to_string()))]);
  }

  #[tokio::test]
  async fn route_without_queries_renders_without_fetching() {
    let proxy = RecordingProxy::new(false);
    let map =
      template_render_map(&section(1000), Path::new("."), routes(), proxy.clone()).unwrap();

    let result = map[DEFAULT_LOCALE](request("/about")).await.unwrap();
    assert!(result.result.contains(r#""pathname":"/about""#));
    assert!(proxy.seen.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn slow_api_renders_partial_state_after_timeout() {
    let proxy = RecordingProxy::new(true);
    let map = template_render_map(&section(20), Path::new("."), routes(), proxy).unwrap();

    let result = map[DEFAULT_LOCALE](request("/groups/slow")).await.unwrap();
    assert!(result.result.contains(r#""in_flight":true"#));
  }

  #[test]
  fn configured_templates_are_loaded_per_locale() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("fr.html"), "<p>{{locale}}</p>").unwrap();
    let mut section = section(100);
    section.templates.insert("fr-FR".into(), "fr.html".into());

    let map = template_render_map(&section, tmp.path(), Vec::new(), RecordingProxy::new(false))
      .unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.contains_key("fr-FR"));
  }

  #[test]
  fn missing_template_file_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let mut section = section(100);
    section.templates.insert("en-US".into(), "nope.html".into());

    let err = template_render_map(&section, tmp.path(), Vec::new(), RecordingProxy::new(false))
      .err()
      .unwrap();
    assert!(format!("{err:#}").contains("en-US"));
  }
}
