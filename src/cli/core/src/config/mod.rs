/* src/cli/core/src/config/mod.rs */

mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use loader::{find_trellis_config, load_trellis_config, resolve_server_config};
pub use types::{BundleSection, RenderSection, RouteSection, TrellisConfig};
