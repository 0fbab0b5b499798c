//! Adsight umbrella crate.
//!
//! Re-exports the Adsight components. The settings service client is on by
//! default; enable `cli` to pull in the command-line layer.

#![doc = include_str!("../README.md")]

pub use adsight_core as core;
pub use adsight_expr as expr;

#[cfg(feature = "client")]
pub use adsight_client as client;

#[cfg(feature = "cli")]
pub use adsight_cli as cli;
