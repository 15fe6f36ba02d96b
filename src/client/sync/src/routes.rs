/* src/client/sync/src/routes.rs */

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use trellis_server::Query;

use crate::actions::Location;

/// What a query function sees for the route it belongs to.
pub struct RouteMatch<'a> {
  pub location: &'a Location,
  pub params: &'a HashMap<String, String>,
}

pub type QueryFn = Arc<dyn Fn(&RouteMatch<'_>) -> Option<Query> + Send + Sync>;

/// Client route table entry. `path` is relative to the parent and may contain
/// `:param` segments or a trailing `*`.
#[derive(Clone)]
pub struct ClientRoute {
  pub path: String,
  pub query: Option<QueryFn>,
  pub children: Vec<ClientRoute>,
}

impl ClientRoute {
  pub fn new(path: impl Into<String>) -> Self {
    Self { path: path.into(), query: None, children: Vec::new() }
  }

  pub fn query(
    mut self,
    query: impl Fn(&RouteMatch<'_>) -> Option<Query> + Send + Sync + 'static,
  ) -> Self {
    self.query = Some(Arc::new(query));
    self
  }

  pub fn child(mut self, child: ClientRoute) -> Self {
    self.children.push(child);
    self
  }
}

fn join_path(prefix: &str, path: &str) -> String {
  if path.starts_with('/') {
    return path.to_string();
  }
  format!("{}/{}", prefix.trim_end_matches('/'), path)
}

fn normalize(pathname: &str) -> &str {
  match pathname.trim_end_matches('/') {
    "" => "/",
    trimmed => trimmed,
  }
}

fn compile(pattern: &str) -> Option<Regex> {
  let mut re = String::from("^");
  for segment in normalize(pattern).split('/').filter(|s| !s.is_empty()) {
    re.push('/');
    if let Some(name) = segment.strip_prefix(':') {
      if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        tracing::warn!(pattern, "invalid route param name");
        return None;
      }
      re.push_str(&format!("(?P<{name}>[^/]+)"));
    } else if segment == "*" {
      re.push_str(".*");
    } else {
      re.push_str(&regex::escape(segment));
    }
  }
  if re == "^" {
    re.push('/');
  }
  re.push('$');
  Regex::new(&re).ok()
}

fn match_pattern(pattern: &str, pathname: &str) -> Option<HashMap<String, String>> {
  let re = compile(pattern)?;
  let caps = re.captures(normalize(pathname))?;
  Some(
    re.capture_names()
      .flatten()
      .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
      .collect(),
  )
}

type Chain<'a> = (Vec<&'a ClientRoute>, HashMap<String, String>);

fn match_chain<'a>(routes: &'a [ClientRoute], prefix: &str, pathname: &str) -> Option<Chain<'a>> {
  for route in routes {
    let full = join_path(prefix, &route.path);
    if let Some((mut chain, params)) = match_chain(&route.children, &full, pathname) {
      chain.insert(0, route);
      return Some((chain, params));
    }
    if let Some(params) = match_pattern(&full, pathname) {
      return Some((vec![route], params));
    }
  }
  None
}

/// Queries required by the deepest matching route chain, outermost first.
pub fn active_route_queries(routes: &[ClientRoute], location: &Location) -> Vec<Query> {
  let Some((chain, params)) = match_chain(routes, "/", &location.pathname) else {
    return Vec::new();
  };
  let matched = RouteMatch { location, params: &params };
  chain.iter().filter_map(|route| route.query.as_ref().and_then(|q| q(&matched))).collect()
}
