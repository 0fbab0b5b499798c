//! Fetch, optimistic update, and reconciliation against the settings service.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use adsight_core::path::sparse_patch;
use adsight_core::{ConfigTree, DotPath, RollbackPolicy, Setting, SettingsCache, Ticket};

use crate::api::{HttpSettingsApi, SettingsApi};
use crate::config::ClientConfig;
use crate::error::Result;

/// An optimistic write that has been applied locally but not yet submitted.
///
/// Produced by [`SettingsSyncClient::stage_update`] and consumed by
/// [`SettingsSyncClient::submit`]. Dropping it unsubmitted, or cancelling the
/// submission, releases the path's saving mark and stops the optimistic
/// value from being layered over later server trees.
#[must_use = "a staged update stays marked as saving until it is submitted"]
pub struct PendingUpdate {
    cache: SettingsCache,
    account: String,
    path: DotPath,
    patch: Value,
    ticket: Ticket,
    settled: bool,
}

impl PendingUpdate {
    /// Account the update targets.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Path being written.
    pub fn path(&self) -> &DotPath {
        &self.path
    }

    /// The sparse override that will be sent.
    pub fn patch(&self) -> &Value {
        &self.patch
    }

    /// Sequence number assigned when the update was staged.
    pub fn seq(&self) -> u64 {
        self.ticket.seq()
    }
}

impl Drop for PendingUpdate {
    fn drop(&mut self) {
        if !self.settled {
            self.cache.abandon(self.ticket, &self.path);
        }
    }
}

impl fmt::Debug for PendingUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingUpdate")
            .field("account", &self.account)
            .field("path", &self.path)
            .field("patch", &self.patch)
            .field("seq", &self.ticket.seq())
            .finish_non_exhaustive()
    }
}

/// Keeps a [`SettingsCache`] in step with the remote settings service.
pub struct SettingsSyncClient<A = HttpSettingsApi> {
    api: A,
    cache: SettingsCache,
    rollback: RollbackPolicy,
}

impl SettingsSyncClient<HttpSettingsApi> {
    /// HTTP-backed client with a fresh cache.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(HttpSettingsApi::new(config)?, SettingsCache::new()))
    }
}

impl<A: SettingsApi> SettingsSyncClient<A> {
    /// Client over `api`, writing into `cache`.
    pub fn new(api: A, cache: SettingsCache) -> Self {
        Self {
            api,
            cache,
            rollback: RollbackPolicy::default(),
        }
    }

    /// Choose what happens to optimistic values when a submission fails.
    pub fn with_rollback(mut self, rollback: RollbackPolicy) -> Self {
        self.rollback = rollback;
        self
    }

    /// The cache this client writes into.
    pub fn cache(&self) -> &SettingsCache {
        &self.cache
    }

    /// The transport.
    pub fn api(&self) -> &A {
        &self.api
    }

    // ------------------------------------------------------------------------
    // Fetch
    // ------------------------------------------------------------------------

    /// Load the resolved tree for `account`, binding the cache to it.
    ///
    /// On failure the cache enters `Error` and the error is returned.
    pub async fn fetch_all(&self, account: &str) -> Result<ConfigTree> {
        self.cache.activate(account);
        let ticket = self.cache.begin_fetch(account)?;
        tracing::info!(account, "fetching settings");

        match self.api.fetch(account).await {
            Ok(tree) => {
                self.cache.finish_fetch(ticket, tree.clone());
                Ok(tree)
            }
            Err(e) => {
                tracing::warn!(account, error = %e, "settings fetch failed");
                self.cache.fail_fetch(ticket, e.to_string());
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------------

    /// Apply `value` at `path` locally and build the patch to send.
    ///
    /// Reads see the new value as soon as this returns.
    pub fn stage_update(
        &self,
        account: &str,
        path: &DotPath,
        value: Value,
    ) -> Result<PendingUpdate> {
        let patch = sparse_patch(path, value.clone());
        let ticket = self.cache.stage(account, path, value)?;
        Ok(PendingUpdate {
            cache: self.cache.clone(),
            account: account.to_string(),
            path: path.clone(),
            patch,
            ticket,
            settled: false,
        })
    }

    /// Send a staged update and reconcile with the server's answer.
    ///
    /// Returns the tree the server sent back. A response superseded by a
    /// newer one is returned but not applied. If this future is dropped
    /// before the server answers, the update is abandoned.
    pub async fn submit(&self, mut update: PendingUpdate) -> Result<ConfigTree> {
        let result = self.api.patch(&update.account, &update.patch).await;
        update.settled = true;

        let (account, path, ticket) = (update.account.as_str(), &update.path, update.ticket);
        match result {
            Ok(tree) => {
                let applied = self.cache.reconcile(ticket, path, tree.clone());
                tracing::debug!(
                    account,
                    %path,
                    seq = ticket.seq(),
                    applied,
                    "settings update reconciled"
                );
                Ok(tree)
            }
            Err(e) => {
                tracing::warn!(account, %path, error = %e, "settings update failed");
                self.cache
                    .fail_update(ticket, path, e.to_string(), self.rollback);
                Err(e)
            }
        }
    }

    /// Optimistically write `value` at `path`, then persist it.
    pub async fn update_path(
        &self,
        account: &str,
        path: &DotPath,
        value: Value,
    ) -> Result<ConfigTree> {
        let update = self.stage_update(account, path, value)?;
        self.submit(update).await
    }

    /// Typed [`update_path`](Self::update_path) through a registered lens.
    pub async fn update_setting<T: Serialize>(
        &self,
        account: &str,
        setting: &Setting<T>,
        value: &T,
    ) -> Result<ConfigTree> {
        let encoded = setting.encode(value)?;
        self.update_path(account, setting.path(), encoded).await
    }
}

impl<A> fmt::Debug for SettingsSyncClient<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsSyncClient")
            .field("cache", &self.cache)
            .field("rollback", &self.rollback)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::MockSettingsApi;
    use crate::error::Error;
    use adsight_core::CacheState;
    use adsight_core::registry::GOALS_ROAS_TARGET;
    use serde_json::json;

    const ACCOUNT: &str = "acct-1";

    fn currency() -> DotPath {
        DotPath::from_static("display.currency")
    }

    fn server_error() -> Error {
        Error::Status {
            status: 503,
            body: "unavailable".into(),
        }
    }

    async fn ready_client(
        mut api: MockSettingsApi,
        tree: Value,
    ) -> SettingsSyncClient<MockSettingsApi> {
        api.expect_fetch()
            .times(1)
            .returning(move |_| Ok(tree.clone()));
        let client = SettingsSyncClient::new(api, SettingsCache::new());
        client.fetch_all(ACCOUNT).await.unwrap();
        client
    }

    // ------------------------------------------------------------------------
    // fetch_all
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_fetch_all_ready() {
        let client = ready_client(
            MockSettingsApi::new(),
            json!({"display": {"currency": "EUR"}}),
        )
        .await;
        assert!(client.cache().state().is_ready());
        assert_eq!(client.cache().account().as_deref(), Some(ACCOUNT));
        assert_eq!(client.cache().get(&currency(), json!("USD")), json!("EUR"));
    }

    #[tokio::test]
    async fn test_fetch_all_failure_enters_error() {
        let mut api = MockSettingsApi::new();
        api.expect_fetch()
            .times(1)
            .returning(|_| Err(server_error()));
        let client = SettingsSyncClient::new(api, SettingsCache::new());

        let err = client.fetch_all(ACCOUNT).await.unwrap_err();
        assert!(matches!(err, Error::Status { status: 503, .. }));
        assert!(matches!(client.cache().state(), CacheState::Error(_)));
        assert_eq!(client.cache().get(&currency(), json!("USD")), json!("USD"));
    }

    // ------------------------------------------------------------------------
    // update_path
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_stage_update_builds_sparse_patch() {
        let client = ready_client(MockSettingsApi::new(), json!({})).await;
        let update = client
            .stage_update(ACCOUNT, &currency(), json!("GBP"))
            .unwrap();

        assert_eq!(update.patch(), &json!({"display": {"currency": "GBP"}}));
        assert_eq!(update.account(), ACCOUNT);
        assert_eq!(update.path(), &currency());
        assert_eq!(client.cache().get(&currency(), json!("USD")), json!("GBP"));
        assert!(client.cache().is_saving(&currency()));
    }

    #[tokio::test]
    async fn test_update_path_reconciles_with_server_tree() {
        let mut api = MockSettingsApi::new();
        api.expect_patch()
            .times(1)
            .returning(|_, _| Ok(json!({"display": {"currency": "GBP", "compactNumbers": true}})));
        let client = ready_client(api, json!({"display": {"currency": "USD"}})).await;

        let tree = client
            .update_path(ACCOUNT, &currency(), json!("GBP"))
            .await
            .unwrap();

        assert_eq!(tree["display"]["compactNumbers"], json!(true));
        assert_eq!(client.cache().snapshot(), Some(tree));
        assert!(!client.cache().is_saving(&currency()));
        assert!(client.cache().last_update_error().is_none());
    }

    #[tokio::test]
    async fn test_update_failure_keeps_optimistic_value() {
        let mut api = MockSettingsApi::new();
        api.expect_patch()
            .times(1)
            .returning(|_, _| Err(server_error()));
        let client = ready_client(api, json!({"display": {"currency": "USD"}})).await;

        assert!(
            client
                .update_path(ACCOUNT, &currency(), json!("GBP"))
                .await
                .is_err()
        );

        assert!(client.cache().state().is_ready());
        assert_eq!(client.cache().get(&currency(), json!("USD")), json!("GBP"));
        let failure = client.cache().last_update_error().unwrap();
        assert_eq!(failure.path, currency());
        assert!(failure.message.contains("503"));
    }

    #[tokio::test]
    async fn test_update_failure_reverts_when_configured() {
        let mut api = MockSettingsApi::new();
        api.expect_patch()
            .times(1)
            .returning(|_, _| Err(server_error()));
        let client = ready_client(api, json!({"display": {"currency": "USD"}}))
            .await
            .with_rollback(RollbackPolicy::Revert);

        assert!(
            client
                .update_path(ACCOUNT, &currency(), json!("GBP"))
                .await
                .is_err()
        );

        assert_eq!(client.cache().get(&currency(), json!("X")), json!("USD"));
        assert!(!client.cache().is_saving(&currency()));
    }

    #[tokio::test]
    async fn test_update_inactive_account_rejected() {
        let client = ready_client(MockSettingsApi::new(), json!({})).await;
        let err = client
            .update_path("acct-2", &currency(), json!("GBP"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Core(adsight_core::Error::InactiveAccount(ref a)) if a == "acct-2"
        ));
        assert_eq!(client.cache().account().as_deref(), Some(ACCOUNT));
    }

    #[tokio::test]
    async fn test_update_setting_encodes_value() {
        let mut api = MockSettingsApi::new();
        api.expect_patch()
            .times(1)
            .returning(|_, patch| Ok(patch.clone()));
        let client = ready_client(api, json!({})).await;

        let tree = client
            .update_setting(ACCOUNT, &GOALS_ROAS_TARGET, &4.0)
            .await
            .unwrap();
        assert_eq!(tree, json!({"goals": {"roasTarget": 4.0}}));
        assert_eq!(client.cache().get_setting(&GOALS_ROAS_TARGET, 0.0), 4.0);
    }

    #[tokio::test]
    async fn test_dropped_update_is_abandoned() {
        let mut api = MockSettingsApi::new();
        api.expect_fetch()
            .times(2)
            .returning(|_| Ok(json!({"display": {"currency": "USD"}})));
        let client = SettingsSyncClient::new(api, SettingsCache::new());
        client.fetch_all(ACCOUNT).await.unwrap();

        let update = client
            .stage_update(ACCOUNT, &currency(), json!("EUR"))
            .unwrap();
        assert!(client.cache().is_saving(&currency()));
        drop(update);
        assert!(!client.cache().is_saving(&currency()));

        client.fetch_all(ACCOUNT).await.unwrap();
        assert_eq!(client.cache().get(&currency(), json!(null)), json!("USD"));
    }

    #[tokio::test]
    async fn test_submitted_update_does_not_abandon_newer_write() {
        let mut api = MockSettingsApi::new();
        api.expect_patch()
            .times(1)
            .returning(|_, _| Ok(json!({"display": {"currency": "EUR"}})));
        let client = ready_client(api, json!({})).await;

        let first = client
            .stage_update(ACCOUNT, &currency(), json!("EUR"))
            .unwrap();
        let second = client
            .stage_update(ACCOUNT, &currency(), json!("GBP"))
            .unwrap();
        client.submit(first).await.unwrap();
        assert!(client.cache().is_saving(&currency()));
        assert_eq!(client.cache().get(&currency(), json!(null)), json!("GBP"));
        drop(second);
        assert!(client.cache().saving_paths().is_empty());
    }
}
