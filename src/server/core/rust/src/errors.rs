/* src/server/core/rust/src/errors.rs */

use std::fmt;

#[derive(Debug, Clone)]
pub struct TrellisError {
  code: String,
  message: String,
  status: u16,
}

fn default_status(code: &str) -> u16 {
  match code {
    "VALIDATION_ERROR" => 400,
    "UNAUTHORIZED" => 401,
    "NOT_FOUND" => 404,
    "UPSTREAM_ERROR" => 502,
    _ => 500,
  }
}

impl TrellisError {
  pub fn new(code: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
    Self { code: code.into(), message: message.into(), status }
  }

  pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
    let code = code.into();
    let status = default_status(&code);
    Self { code, message: message.into(), status }
  }

  pub fn validation(msg: impl Into<String>) -> Self {
    Self::with_code("VALIDATION_ERROR", msg)
  }

  pub fn unauthorized(msg: impl Into<String>) -> Self {
    Self::with_code("UNAUTHORIZED", msg)
  }

  pub fn not_found(msg: impl Into<String>) -> Self {
    Self::with_code("NOT_FOUND", msg)
  }

  pub fn upstream(msg: impl Into<String>) -> Self {
    Self::with_code("UPSTREAM_ERROR", msg)
  }

  /// Generic handler failure. Route handlers collapse every failure into this.
  pub fn bad_implementation(msg: impl Into<String>) -> Self {
    Self::with_code("BAD_IMPLEMENTATION", msg)
  }

  pub fn code(&self) -> &str {
    &self.code
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn status(&self) -> u16 {
    self.status
  }
}

impl fmt::Display for TrellisError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.code, self.message)
  }
}

impl std::error::Error for TrellisError {}

impl From<reqwest::Error> for TrellisError {
  fn from(err: reqwest::Error) -> Self {
    Self::upstream(err.to_string())
  }
}

impl From<serde_json::Error> for TrellisError {
  fn from(err: serde_json::Error) -> Self {
    Self::validation(err.to_string())
  }
}
