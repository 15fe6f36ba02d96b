/* src/cli/core/src/build/mod.rs */

// `trellis bundle`: plan handed to the external bundler.

mod plan;


pub use plan::plan_bundle;
