/* src/cli/core/src/main.rs */

mod build;
mod config;
mod render;
mod serve;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::{TrellisConfig, find_trellis_config, load_trellis_config};

#[derive(Parser)]
#[command(name = "trellis", about = "Trellis SSR server and bundle planner")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Compute the bundle plan (entries, outputs, externals) for the external bundler
  Bundle {
    /// Path to trellis.toml (auto-detected if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Write the plan to this file instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Print whether a module request stays external instead of the plan
    #[arg(long, value_name = "REQUEST")]
    check: Option<String>,
  },
  /// Start the SSR server (API proxy + localized page rendering)
  Serve {
    /// Path to trellis.toml (auto-detected if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
  },
}

/// Load trellis.toml from cwd upward; Ok(None) if there is none.
/// A config that exists but fails to parse is still an error.
fn try_load_config() -> Result<Option<(PathBuf, TrellisConfig)>> {
  let cwd = std::env::current_dir().context("failed to get cwd")?;
  let Ok(path) = find_trellis_config(&cwd) else {
    return Ok(None);
  };
  let config = load_trellis_config(&path)?;
  Ok(Some((path, config)))
}

/// Resolve config path (explicit or auto-detected) and parse it
fn resolve_config(explicit: Option<PathBuf>) -> Result<(PathBuf, TrellisConfig)> {
  let path = match explicit {
    Some(p) => p,
    None => {
      let cwd = std::env::current_dir().context("failed to get cwd")?;
      find_trellis_config(&cwd)?
    }
  };
  let config = load_trellis_config(&path)?;
  Ok((path, config))
}

fn base_dir_of(path: &Path) -> PathBuf {
  path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> Result<()> {
  init_tracing();
  let cli = Cli::parse();

  match cli.command {
    Command::Bundle { config, out, check } => {
      let (path, config) = resolve_config(config)?;
      let plan = build::plan_bundle(&config.bundle, &base_dir_of(&path))?;
      if let Some(request) = check {
        let verdict = if plan.is_external(&request) { "external" } else { "bundled" };
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{verdict}").context("failed to write to stdout")?;
        return Ok(());
      }
      let json = serde_json::to_string_pretty(&plan).context("failed to serialize bundle plan")?;
      match out {
        Some(out) => {
          std::fs::write(&out, format!("{json}\n"))
            .with_context(|| format!("failed to write {}", out.display()))?;
          tracing::info!(
            entries = plan.entries.len(),
            externals = plan.externals.len(),
            "wrote bundle plan to {}",
            out.display()
          );
        }
        None => {
          let mut stdout = std::io::stdout().lock();
          writeln!(stdout, "{json}").context("failed to write to stdout")?;
        }
      }
    }
    Command::Serve { config } => {
      let loaded = match config {
        Some(p) => Some(resolve_config(Some(p))?),
        None => try_load_config()?,
      };
      serve::run_serve(loaded).await?;
    }
  }

  Ok(())
}
