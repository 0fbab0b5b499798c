//! Adsight Client: keeps an account's settings cache in step with the
//! remote settings service.
//!
//! # Modules
//!
//! - [`api`]: The transport seam and its reqwest implementation
//! - [`config`]: Where the settings service lives
//! - [`error`]: Error types and Result alias
//! - [`sync`]: Fetch, optimistic update, reconciliation

#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod sync;

pub use api::{HttpSettingsApi, SettingsApi};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use sync::{PendingUpdate, SettingsSyncClient};
