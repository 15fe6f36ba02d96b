/* src/client/sync/src/actions.rs */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_server::{Query, QueryResponse, RequestAuth};

/// Browser location as the router reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
  pub pathname: String,
  #[serde(default)]
  pub search: String,
}

impl Location {
  pub fn new(pathname: impl Into<String>) -> Self {
    Self { pathname: pathname.into(), search: String::new() }
  }

  /// Split a `path?query` string.
  pub fn parse(url: &str) -> Self {
    match url.split_once('?') {
      Some((path, query)) => Self { pathname: path.to_string(), search: format!("?{query}") },
      None => Self::new(url),
    }
  }
}

/// Actions observed and produced by the sync middleware.
/// Wire shape: `{"type": "API_REQUEST", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Action {
  #[serde(rename = "LOCATION_CHANGE")]
  LocationChange(Location),
  #[serde(rename = "@@server/RENDER")]
  ServerRender(Location),
  #[serde(rename = "LOCATION_SYNC")]
  LocationSync(Location),
  #[serde(rename = "CONFIGURE_AUTH")]
  ConfigureAuth {
    auth: RequestAuth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
  },
  #[serde(rename = "API_REQUEST")]
  ApiRequest {
    queries: Vec<Query>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
  },
  #[serde(rename = "API_SUCCESS")]
  ApiSuccess { responses: Vec<QueryResponse> },
  #[serde(rename = "API_ERROR")]
  ApiError { message: String },
  #[serde(rename = "API_COMPLETE")]
  ApiComplete,
}

impl Action {
  pub fn kind(&self) -> &'static str {
    match self {
      Self::LocationChange(_) => "LOCATION_CHANGE",
      Self::ServerRender(_) => "@@server/RENDER",
      Self::LocationSync(_) => "LOCATION_SYNC",
      Self::ConfigureAuth { .. } => "CONFIGURE_AUTH",
      Self::ApiRequest { .. } => "API_REQUEST",
      Self::ApiSuccess { .. } => "API_SUCCESS",
      Self::ApiError { .. } => "API_ERROR",
      Self::ApiComplete => "API_COMPLETE",
    }
  }
}

// -- Action creators --

pub fn api_request(queries: Vec<Query>) -> Action {
  Action::ApiRequest { queries, meta: None }
}

pub fn api_success(responses: Vec<QueryResponse>) -> Action {
  Action::ApiSuccess { responses }
}

pub fn api_error(message: impl Into<String>) -> Action {
  Action::ApiError { message: message.into() }
}

pub fn api_complete() -> Action {
  Action::ApiComplete
}

pub fn location_sync(location: Location) -> Action {
  Action::LocationSync(location)
}

pub fn configure_auth(auth: RequestAuth) -> Action {
  Action::ConfigureAuth { auth, meta: None }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn wire_shape_uses_type_and_payload() {
    let action = api_request(vec![Query::new("self", "members/self")]);
    assert_eq!(
      serde_json::to_value(&action).unwrap(),
      json!({"type": "API_REQUEST", "payload": {"queries": [{"ref": "self", "endpoint": "members/self"}]}})
    );
  }

  #[test]
  fn server_render_type_string() {
    let action: Action = serde_json::from_value(json!({
      "type": "@@server/RENDER",
      "payload": {"pathname": "/groups"}
    }))
    .unwrap();
    assert_eq!(action, Action::ServerRender(Location::new("/groups")));
    assert_eq!(action.kind(), "@@server/RENDER");
  }

  #[test]
  fn configure_auth_meta_is_optional() {
    let action: Action = serde_json::from_value(json!({
      "type": "CONFIGURE_AUTH",
      "payload": {"auth": {"oauth_token": "t"}, "meta": {"logout": true}}
    }))
    .unwrap();
    assert!(matches!(action, Action::ConfigureAuth { meta: Some(_), .. }));
  }

  #[test]
  fn complete_has_no_payload() {
    assert_eq!(serde_json::to_value(api_complete()).unwrap(), json!({"type": "API_COMPLETE"}));
  }

  #[test]
  fn parse_location() {
    let loc = Location::parse("/find?keywords=rust");
    assert_eq!(loc.pathname, "/find");
    assert_eq!(loc.search, "?keywords=rust");
    assert_eq!(Location::parse("/").search, "");
  }
}
