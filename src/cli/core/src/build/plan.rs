/* src/cli/core/src/build/plan.rs */

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::config::BundleSection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleEntry {
  pub name: String,
  pub source: String,
  pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundlePlan {
  pub target: String,
  pub out_dir: String,
  pub entries: Vec<BundleEntry>,
  /// Sorted, deduplicated package names left to runtime `require`
  pub externals: Vec<String>,
}

impl BundlePlan {
  /// Whether a module request resolves to an external package.
  /// Relative and absolute requests are always bundled.
  pub fn is_external(&self, request: &str) -> bool {
    if request.is_empty() || request.starts_with('.') || request.starts_with('/') {
      return false;
    }
    let name = package_name(request);
    self.externals.binary_search_by(|e| e.as_str().cmp(name)).is_ok()
  }
}

/// `lodash/fp` -> `lodash`, `@scope/pkg/sub` -> `@scope/pkg`
fn package_name(request: &str) -> &str {
  let segments = if request.starts_with('@') { 2 } else { 1 };
  match request.match_indices('/').nth(segments - 1) {
    Some((idx, _)) => &request[..idx],
    None => request,
  }
}

/// Entry name for a source path: source root and extension stripped.
/// `src/middleware/sync.js` -> `middleware/sync`
pub fn entry_name(source: &str, source_root: &str) -> String {
  let source = source.trim_start_matches("./");
  let root = source_root.trim_start_matches("./").trim_end_matches('/');
  let rel = if root.is_empty() {
    source
  } else {
    source.strip_prefix(root).and_then(|r| r.strip_prefix('/')).unwrap_or(source)
  };
  match rel.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() && !stem.ends_with('/') && !ext.contains('/') => {
      stem.to_string()
    }
    _ => rel.to_string(),
  }
}

pub fn plan_bundle(section: &BundleSection, base_dir: &Path) -> Result<BundlePlan> {
  let out_dir = section.out_dir.trim_end_matches('/');
  let mut seen: BTreeMap<String, &str> = BTreeMap::new();
  let mut entries = Vec::with_capacity(section.entries.len());

  for source in &section.entries {
    let name = entry_name(source, &section.source_root);
    if let Some(prev) = seen.insert(name.clone(), source) {
      bail!("bundle entries \"{prev}\" and \"{source}\" both map to \"{name}\"");
    }
    if !base_dir.join(source).is_file() {
      tracing::warn!("bundle entry {source} does not exist under {}", base_dir.display());
    }
    entries.push(BundleEntry {
      output: format!("{out_dir}/{name}.js"),
      name,
      source: source.clone(),
    });
  }

  let mut externals: BTreeSet<String> =
    scan_modules_dir(&base_dir.join(&section.modules_dir))?.into_iter().collect();
  externals.extend(section.externals.iter().cloned());
  tracing::debug!(entries = entries.len(), externals = externals.len(), "bundle plan computed");

  Ok(BundlePlan {
    target: section.target.clone(),
    out_dir: out_dir.to_string(),
    entries,
    externals: externals.into_iter().collect(),
  })
}

/// Package directories under `dir`, including `@scope/pkg` pairs.
/// A missing directory yields nothing.
fn scan_modules_dir(dir: &Path) -> Result<Vec<String>> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }
  let mut packages = Vec::new();
  for name in child_dirs(dir)? {
    if name.starts_with('@') {
      for pkg in child_dirs(&dir.join(&name))? {
        packages.push(format!("{name}/{pkg}"));
      }
    } else {
      packages.push(name);
    }
  }
  Ok(packages)
}

fn child_dirs(dir: &Path) -> Result<Vec<String>> {
  let mut names = Vec::new();
  let read = std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
  for entry in read {
    let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
    let name = entry.file_name().to_string_lossy().into_owned();
    if name.starts_with('.') || !entry.path().is_dir() {
      continue;
    }
    names.push(name);
  }
  Ok(names)
}
