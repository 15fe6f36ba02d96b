/* src/server/core/rust/src/config.rs */

use serde::Deserialize;

use crate::errors::TrellisError;
use crate::locale::DEFAULT_LOCALE;

/// Runtime configuration for the route table and its collaborators.
/// Keys accept both the `trellis.toml` spelling and the environment spelling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
  /// May be left empty in a file when the environment supplies it.
  #[serde(alias = "API_SERVER_ROOT_URL", default)]
  pub api_server_root_url: String,
  #[serde(alias = "PHOTO_SCALER_SALT", default)]
  pub photo_scaler_salt: String,
  #[serde(alias = "localeCodes", default = "default_locale_codes")]
  pub locale_codes: Vec<String>,
  /// Endpoint issuing anonymous OAuth tokens; unset disables anonymous auth.
  #[serde(alias = "ANONYMOUS_AUTH_URL", default)]
  pub anonymous_auth_url: Option<String>,
  #[serde(alias = "COOKIE_SECURE", default)]
  pub cookie_secure: bool,
  #[serde(alias = "PORT", default = "default_port")]
  pub port: u16,
}

fn default_locale_codes() -> Vec<String> {
  vec![DEFAULT_LOCALE.to_string()]
}

fn default_port() -> u16 {
  8000
}

fn parse_list(raw: &str) -> Vec<String> {
  raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

fn parse_flag(raw: &str) -> bool {
  raw == "1" || raw.eq_ignore_ascii_case("true")
}

impl AppConfig {
  pub fn new(api_server_root_url: impl Into<String>) -> Self {
    Self {
      api_server_root_url: api_server_root_url.into(),
      photo_scaler_salt: String::new(),
      locale_codes: default_locale_codes(),
      anonymous_auth_url: None,
      cookie_secure: false,
      port: default_port(),
    }
  }

  /// Build from process environment variables.
  pub fn from_env() -> Result<Self, TrellisError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build from an arbitrary key lookup. `API_SERVER_ROOT_URL` is required.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TrellisError> {
    let root = lookup("API_SERVER_ROOT_URL").ok_or_else(|| {
      TrellisError::with_code("CONFIG_ERROR", "API_SERVER_ROOT_URL is not set")
    })?;
    let config = Self::new(root).with_overrides(lookup);
    config.validate()?;
    Ok(config)
  }

  /// Environment values override whatever was loaded from `trellis.toml`.
  pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
    if let Some(v) = lookup("API_SERVER_ROOT_URL") {
      self.api_server_root_url = v;
    }
    if let Some(v) = lookup("PHOTO_SCALER_SALT") {
      self.photo_scaler_salt = v;
    }
    if let Some(v) = lookup("LOCALE_CODES") {
      let codes = parse_list(&v);
      if !codes.is_empty() {
        self.locale_codes = codes;
      }
    }
    if let Some(v) = lookup("ANONYMOUS_AUTH_URL") {
      self.anonymous_auth_url = Some(v).filter(|s| !s.is_empty());
    }
    if let Some(v) = lookup("COOKIE_SECURE") {
      self.cookie_secure = parse_flag(&v);
    }
    if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
      self.port = port;
    }
    self
  }

  pub fn validate(&self) -> Result<(), TrellisError> {
    let root = self.api_server_root_url.trim();
    if !(root.starts_with("http://") || root.starts_with("https://")) {
      return Err(TrellisError::with_code(
        "CONFIG_ERROR",
        format!("API_SERVER_ROOT_URL must be an http(s) URL, got \"{root}\""),
      ));
    }
    if self.locale_codes.is_empty() {
      return Err(TrellisError::with_code("CONFIG_ERROR", "localeCodes must not be empty"));
    }
    Ok(())
  }

  /// Root URL without a trailing slash, ready for `format!("{root}/{endpoint}")`.
  pub fn api_root(&self) -> &str {
    self.api_server_root_url.trim_end_matches('/')
  }
}
