//! Adsight Core: configuration tree addressing, typed settings, and the
//! account settings cache.
//!
//! This crate has no internal Adsight dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`path`]: Dot-path get/set over a JSON tree
//! - [`setting`]: Typed lenses bound to one path
//! - [`registry`]: Every known account setting
//! - [`cache`]: The account-bound settings cache

#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod path;
pub mod registry;
pub mod setting;

// Re-export key types at crate root for convenience
pub use cache::{CacheState, RollbackPolicy, SettingsCache, Ticket, UpdateFailure};
pub use error::{Error, Result};
pub use path::DotPath;
pub use registry::DerivedMetricDef;
pub use setting::Setting;

/// A fully resolved account configuration tree.
pub type ConfigTree = serde_json::Value;
