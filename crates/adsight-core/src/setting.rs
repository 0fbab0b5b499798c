//! Typed lenses over the configuration tree.
//!
//! A [`Setting<T>`] pairs a statically known [`DotPath`] with the Rust type
//! stored there. Reading through a lens deserializes the JSON value; writing
//! serializes it and goes through [`path::set`].

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::path::{self, DotPath};

/// A typed accessor for one setting.
pub struct Setting<T> {
    path: DotPath,
    _type: PhantomData<fn() -> T>,
}

impl<T> Setting<T> {
    /// Declare a setting at a literal path.
    pub const fn new(path: &'static str) -> Self {
        Self {
            path: DotPath::from_static(path),
            _type: PhantomData,
        }
    }

    /// The setting's location in the tree.
    pub fn path(&self) -> &DotPath {
        &self.path
    }
}

impl<T: DeserializeOwned> Setting<T> {
    /// Read the setting, returning `default` when it is absent or malformed.
    pub fn get(&self, tree: &Value, default: T) -> T {
        match self.try_get(tree) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(
                    path = %self.path,
                    error = %e,
                    "setting has unexpected type, using default"
                );
                default
            }
        }
    }

    /// Read the setting strictly.
    ///
    /// `Ok(None)` means the path is absent.
    pub fn try_get(&self, tree: &Value) -> Result<Option<T>> {
        match path::get(tree, &self.path) {
            None => Ok(None),
            Some(raw) => T::deserialize(raw)
                .map(Some)
                .map_err(|e| Error::type_mismatch(self.path.as_str(), e.to_string())),
        }
    }
}

impl<T: Serialize> Setting<T> {
    /// Encode `value` as the JSON stored at this setting's path.
    pub fn encode(&self, value: &T) -> Result<Value> {
        Ok(serde_json::to_value(value)?)
    }

    /// Write the setting into `tree`.
    pub fn set(&self, tree: &mut Value, value: &T) -> Result<()> {
        let encoded = self.encode(value)?;
        path::set(tree, &self.path, encoded);
        Ok(())
    }

    /// The sparse override that changes only this setting.
    pub fn patch(&self, value: &T) -> Result<Value> {
        Ok(path::sparse_patch(&self.path, self.encode(value)?))
    }
}

impl<T> fmt::Debug for Setting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setting")
            .field("path", &self.path)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const CURRENCY: Setting<String> = Setting::new("display.currency");
    const PINNED: Setting<Vec<String>> = Setting::new("sections.overviews.google.pinnedMetrics");

    #[test]
    fn test_get_present() {
        let tree = json!({"display": {"currency": "EUR"}});
        assert_eq!(CURRENCY.get(&tree, "USD".into()), "EUR");
    }

    #[test]
    fn test_get_absent_uses_default() {
        assert_eq!(CURRENCY.get(&json!({}), "USD".into()), "USD");
    }

    #[test]
    fn test_get_wrong_type_uses_default() {
        let tree = json!({"display": {"currency": 42}});
        assert_eq!(CURRENCY.get(&tree, "USD".into()), "USD");
    }

    #[test]
    fn test_try_get_wrong_type_is_error() {
        let tree = json!({"display": {"currency": 42}});
        let err = CURRENCY.try_get(&tree).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref path, .. } if path == "display.currency"));
    }

    #[test]
    fn test_set_then_get() {
        let mut tree = json!({});
        let metrics = vec!["roas".to_string(), "ctr".to_string()];
        PINNED.set(&mut tree, &metrics).unwrap();
        assert_eq!(PINNED.get(&tree, vec![]), metrics);
    }

    #[test]
    fn test_patch_is_sparse() {
        let patch = CURRENCY.patch(&"JPY".to_string()).unwrap();
        assert_eq!(patch, json!({"display": {"currency": "JPY"}}));
    }

    #[test]
    fn test_debug_names_path() {
        let debug = format!("{CURRENCY:?}");
        assert!(debug.contains("display.currency"));
        assert!(debug.contains("String"));
    }
}
