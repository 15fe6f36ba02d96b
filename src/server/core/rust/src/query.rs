/* src/server/core/rust/src/query.rs */

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::TrellisError;

/// One API call a route needs. `ref` keys the result in the client store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
  #[serde(rename = "ref")]
  pub reference: String,
  pub endpoint: String,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub params: Map<String, Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub meta: Option<Value>,
}

impl Query {
  pub fn new(reference: impl Into<String>, endpoint: impl Into<String>) -> Self {
    Self { reference: reference.into(), endpoint: endpoint.into(), params: Map::new(), meta: None }
  }

  pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.params.insert(key.into(), value.into());
    self
  }
}

/// Result for one query. Exactly one of `value` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
  #[serde(rename = "ref")]
  pub reference: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl QueryResponse {
  pub fn value(reference: impl Into<String>, value: Value) -> Self {
    Self { reference: reference.into(), value: Some(value), error: None }
  }

  pub fn error(reference: impl Into<String>, error: impl Into<String>) -> Self {
    Self { reference: reference.into(), value: None, error: Some(error.into()) }
  }
}

#[derive(Deserialize)]
struct QueriesBody {
  queries: Vec<Query>,
}

fn queries_from_query_string(raw_query: &str) -> Result<Option<Vec<Query>>, TrellisError> {
  // Url does the percent-decoding; the host is a placeholder
  let url = Url::parse(&format!("http://localhost/?{raw_query}"))
    .map_err(|e| TrellisError::validation(e.to_string()))?;
  let raw = url.query_pairs().find(|(k, _)| k == "queries").map(|(_, v)| v.into_owned());
  match raw {
    Some(json) => Ok(Some(serde_json::from_str(&json)?)),
    None => Ok(None),
  }
}

/// Extract the query list from an `/api` request.
/// GET/DELETE carry `?queries=<json>`; POST/PATCH carry `{"queries": [...]}` in
/// the body and fall back to the query string when the body is empty.
pub fn parse_queries(
  method: &Method,
  raw_query: Option<&str>,
  body: &[u8],
) -> Result<Vec<Query>, TrellisError> {
  let has_body = !body.iter().all(u8::is_ascii_whitespace);
  let queries = if (*method == Method::POST || *method == Method::PATCH) && has_body {
    Some(serde_json::from_slice::<QueriesBody>(body)?.queries)
  } else {
    match raw_query {
      Some(q) => queries_from_query_string(q)?,
      None => None,
    }
  };

  match queries {
    Some(q) if !q.is_empty() => Ok(q),
    _ => Err(TrellisError::validation("Request must carry a non-empty 'queries' list")),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn query_serializes_ref_field() {
    let q = Query::new("group", "groups/rust-nyc").param("fields", "members");
    assert_eq!(
      serde_json::to_value(&q).unwrap(),
      json!({"ref": "group", "endpoint": "groups/rust-nyc", "params": {"fields": "members"}})
    );
  }

  #[test]
  fn get_reads_encoded_query_string() {
    let raw = "queries=%5B%7B%22ref%22%3A%22self%22%2C%22endpoint%22%3A%22members%2Fself%22%7D%5D";
    let queries = parse_queries(&Method::GET, Some(raw), b"").unwrap();
    assert_eq!(queries, vec![Query::new("self", "members/self")]);
  }

  #[test]
  fn post_reads_body() {
    let body = br#"{"queries": [{"ref": "rsvp", "endpoint": "events/1/rsvps", "params": {"response": "yes"}}]}"#;
    let queries = parse_queries(&Method::POST, None, body).unwrap();
    assert_eq!(queries[0].reference, "rsvp");
    assert_eq!(queries[0].params["response"], "yes");
  }

  #[test]
  fn post_with_empty_body_falls_back_to_query_string() {
    let raw = "queries=[{\"ref\":\"a\",\"endpoint\":\"b\"}]";
    let queries = parse_queries(&Method::POST, Some(raw), b"  ").unwrap();
    assert_eq!(queries.len(), 1);
  }

  #[test]
  fn missing_queries_is_validation_error() {
    let err = parse_queries(&Method::GET, Some("foo=bar"), b"").unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    let err = parse_queries(&Method::GET, Some("queries=[]"), b"").unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
  }

  #[test]
  fn malformed_json_is_validation_error() {
    let err = parse_queries(&Method::PATCH, None, b"{not json").unwrap_err();
    assert_eq!(err.status(), 400);
  }
}
