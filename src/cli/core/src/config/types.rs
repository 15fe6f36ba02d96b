/* src/cli/core/src/config/types.rs */

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::Deserialize;
use trellis_server::AppConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct TrellisConfig {
  #[serde(default)]
  pub server: Option<AppConfig>,
  #[serde(default)]
  pub render: RenderSection,
  #[serde(default)]
  pub routes: Vec<RouteSection>,
  #[serde(default)]
  pub bundle: BundleSection,
}

impl TrellisConfig {
  /// `[server]` is checked by `resolve_server_config`, once env overrides apply.
  pub fn validate(&self) -> Result<()> {
    for route in &self.routes {
      route.validate()?;
    }
    self.bundle.validate()
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderSection {
  /// Locale code -> HTML template path
  #[serde(default)]
  pub templates: BTreeMap<String, String>,
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  #[serde(default)]
  pub static_dir: Option<String>,
}

impl Default for RenderSection {
  fn default() -> Self {
    Self { templates: BTreeMap::new(), timeout_ms: default_timeout_ms(), static_dir: None }
  }
}

fn default_timeout_ms() -> u64 {
  5000
}

/// One client route and the query it needs.
/// `:param` segments of `path` are substituted into `endpoint`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSection {
  pub path: String,
  #[serde(rename = "ref")]
  pub reference: Option<String>,
  pub endpoint: Option<String>,
}

impl RouteSection {
  pub fn validate(&self) -> Result<()> {
    if !self.path.starts_with('/') {
      bail!("routes.path \"{}\" must start with '/'", self.path);
    }
    if self.reference.is_some() != self.endpoint.is_some() {
      bail!("route \"{}\" must set both ref and endpoint, or neither", self.path);
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleSection {
  #[serde(default = "default_target")]
  pub target: String,
  #[serde(default = "default_out_dir")]
  pub out_dir: String,
  #[serde(default = "default_source_root")]
  pub source_root: String,
  #[serde(default = "default_entries")]
  pub entries: Vec<String>,
  #[serde(default = "default_modules_dir")]
  pub modules_dir: String,
  /// Packages kept out of the bundle in addition to everything in `modules_dir`
  #[serde(default)]
  pub externals: Vec<String>,
}

impl Default for BundleSection {
  fn default() -> Self {
    Self {
      target: default_target(),
      out_dir: default_out_dir(),
      source_root: default_source_root(),
      entries: default_entries(),
      modules_dir: default_modules_dir(),
      externals: Vec::new(),
    }
  }
}

impl BundleSection {
  pub fn validate(&self) -> Result<()> {
    if self.entries.is_empty() {
      bail!("bundle.entries must not be empty");
    }
    Ok(())
  }
}

fn default_target() -> String {
  "node".to_string()
}

fn default_out_dir() -> String {
  "dist".to_string()
}

fn default_source_root() -> String {
  "src".to_string()
}

fn default_modules_dir() -> String {
  "node_modules".to_string()
}

fn default_entries() -> Vec<String> {
  [
    "src/server.js",
    "src/middleware/sync.js",
    "src/api-proxy.js",
    "src/actions/syncActionCreators.js",
  ]
  .iter()
  .map(|s| (*s).to_string())
  .collect()
}
