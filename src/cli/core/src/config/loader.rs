/* src/cli/core/src/config/loader.rs */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use trellis_server::AppConfig;

use super::TrellisConfig;

/// Walk upward from `start` to find `trellis.toml`, like Cargo.toml discovery
pub fn find_trellis_config(start: &Path) -> Result<PathBuf> {
  let mut dir =
    start.canonicalize().with_context(|| format!("failed to canonicalize {}", start.display()))?;
  loop {
    let candidate = dir.join("trellis.toml");
    if candidate.is_file() {
      return Ok(candidate);
    }
    if !dir.pop() {
      bail!("trellis.toml not found (searched upward from {})", start.display());
    }
  }
}

pub fn load_trellis_config(path: &Path) -> Result<TrellisConfig> {
  let content =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  let config: TrellisConfig =
    toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
  config.validate().with_context(|| format!("invalid {}", path.display()))?;
  Ok(config)
}

/// Server config from `[server]` with environment overrides, or from the
/// environment alone when the file has no `[server]` section.
pub fn resolve_server_config(
  config: Option<&TrellisConfig>,
  lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig> {
  let server = match config.and_then(|c| c.server.clone()) {
    Some(server) => {
      let server = server.with_overrides(lookup);
      server.validate()?;
      server
    }
    None => AppConfig::from_lookup(lookup)?,
  };
  Ok(server)
}
