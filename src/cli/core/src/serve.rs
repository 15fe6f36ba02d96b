/* src/cli/core/src/serve.rs */

// `trellis serve` command: route table + axum adapter + static files.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use trellis_server::{Collaborators, Query, get_routes};
use trellis_server_axum::{IntoAxumRouter, serve_router};
use trellis_sync::ClientRoute;

use crate::base_dir_of;
use crate::config::{RouteSection, TrellisConfig, resolve_server_config};
use crate::render::template_render_map;

pub async fn run_serve(loaded: Option<(PathBuf, TrellisConfig)>) -> Result<()> {
  let (base_dir, config) = match loaded {
    Some((path, config)) => (base_dir_of(&path), Some(config)),
    None => (PathBuf::from("."), None),
  };
  let server = resolve_server_config(config.as_ref(), |key| std::env::var(key).ok())?;
  let (render, routes) = match config {
    Some(c) => (c.render, c.routes),
    None => (Default::default(), Vec::new()),
  };

  let collaborators = Collaborators::from_config(&server);
  let render_map = template_render_map(
    &render,
    &base_dir,
    client_routes(&routes),
    collaborators.api_proxy.clone(),
  )?;
  for locale in &server.locale_codes {
    if !render_map.contains_key(locale) {
      tracing::warn!("no template for locale {locale}, falling back to the default locale");
    }
  }

  let mut router = get_routes(render_map, &server, collaborators).into_axum_router();
  if let Some(ref dir) = render.static_dir {
    router = router.nest_service("/static", ServeDir::new(base_dir.join(dir)));
  }
  let router = router.layer(TraceLayer::new_for_http());

  tracing::info!(
    api = %server.api_root(),
    locales = ?server.locale_codes,
    routes = routes.len(),
    "starting trellis server"
  );
  let addr = format!("0.0.0.0:{}", server.port);
  serve_router(router, &addr).await.map_err(|e| anyhow!("server failed: {e}"))
}

/// Client route table from `[[routes]]`.
pub fn client_routes(sections: &[RouteSection]) -> Vec<ClientRoute> {
  sections
    .iter()
    .map(|section| {
      let route = ClientRoute::new(section.path.clone());
      match (&section.reference, &section.endpoint) {
        (Some(reference), Some(endpoint)) => {
          let (reference, endpoint) = (reference.clone(), endpoint.clone());
          route.query(move |m| {
            Some(Query::new(reference.clone(), substitute_params(&endpoint, m.params)))
          })
        }
        _ => route,
      }
    })
    .collect()
}

/// Replace `:name` segments with matched route params; unknown names are kept.
fn substitute_params(endpoint: &str, params: &HashMap<String, String>) -> String {
  endpoint
    .split('/')
    .map(|segment| match segment.strip_prefix(':') {
      Some(name) => params.get(name).map_or(segment, String::as_str),
      None => segment,
    })
    .collect::<Vec<_>>()
    .join("/")
}
