//! The settings cache: last-resolved configuration tree for the active account.
//!
//! [`SettingsCache`] is an explicitly constructed store. Clone it to share it;
//! all clones see the same tree and state. The lifecycle is
//!
//! ```text
//! Uninitialized ──fetch──▶ Loading ──ok──▶ Ready ◀──┐ optimistic write /
//!       ▲                     │                 │    │ reconciliation
//!       │                     └──err──▶ Error   └────┘
//!       └──────── account changed ────────────────────
//! ```
//!
//! Reads never block and never fail: outside `Ready` they return the caller's
//! default.
//!
//! Writers obtain a [`Ticket`] before talking to the server. A ticket carries
//! the account epoch (bumped on every account switch) and a sequence number.
//! Server trees arriving with a stale epoch, or older than a tree already
//! applied, are discarded. Optimistic values of updates still in flight are
//! re-applied over every tree that is accepted.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::path::{self, DotPath};
use crate::setting::Setting;

// ============================================================================
// CacheState
// ============================================================================

/// Lifecycle state of the cache.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheState {
    /// No fetch has been issued for the active account.
    Uninitialized,
    /// The first fetch is in progress.
    Loading,
    /// A resolved tree is held.
    Ready,
    /// The last fetch failed.
    Error(String),
}

impl CacheState {
    /// Returns `true` if reads are served from the tree.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns `true` while the first fetch is running.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The error message, if the last fetch failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}

// ============================================================================
// Tickets & failures
// ============================================================================

/// Proof of a request issued against a particular account epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    seq: u64,
}

impl Ticket {
    /// Monotonic sequence number of the request.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// The most recent failed patch submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateFailure {
    /// Path whose update failed.
    pub path: DotPath,
    /// Human-readable failure.
    pub message: String,
}

/// What to do with an optimistic value when its submission fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RollbackPolicy {
    /// Leave the optimistic value in place until the next reconciliation.
    #[default]
    Keep,
    /// Restore the value the path held before the update was staged.
    Revert,
}

// ============================================================================
// SettingsCache
// ============================================================================

/// Shared, account-bound settings store.
#[derive(Clone)]
pub struct SettingsCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    state: watch::Sender<CacheState>,
    data: RwLock<CacheData>,
}

#[derive(Default)]
struct CacheData {
    account: Option<String>,
    epoch: u64,
    tree: Option<Value>,
    next_seq: u64,
    applied_seq: u64,
    pending: BTreeMap<DotPath, PendingWrite>,
    in_flight: BTreeMap<DotPath, usize>,
    last_update_error: Option<UpdateFailure>,
}

struct PendingWrite {
    seq: u64,
    value: Value,
    previous: Option<Value>,
}

impl CacheData {
    fn ticket(&mut self) -> Ticket {
        self.next_seq += 1;
        Ticket {
            epoch: self.epoch,
            seq: self.next_seq,
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.epoch == self.epoch
    }

    fn finish_in_flight(&mut self, path: &DotPath) {
        if let Some(count) = self.in_flight.get_mut(path) {
            *count -= 1;
            if *count == 0 {
                self.in_flight.remove(path);
            }
        }
    }

    /// Take the pending write for `path` if it belongs to `seq`.
    fn take_pending(&mut self, path: &DotPath, seq: u64) -> Option<PendingWrite> {
        match self.pending.get(path) {
            Some(pending) if pending.seq == seq => self.pending.remove(path),
            _ => None,
        }
    }

    /// Accept a server tree if it is newer than anything applied so far.
    ///
    /// Pending writes are layered back on in staging order so that a write
    /// to an ancestor never hides a later write to one of its descendants.
    fn accept_tree(&mut self, ticket: Ticket, tree: Value) -> bool {
        if ticket.seq <= self.applied_seq {
            return false;
        }
        let mut tree = tree;
        let mut writes: Vec<_> = self.pending.iter().collect();
        writes.sort_by_key(|(_, pending)| pending.seq);
        for (path, pending) in writes {
            path::set(&mut tree, path, pending.value.clone());
        }
        self.applied_seq = ticket.seq;
        self.tree = Some(tree);
        true
    }
}

impl SettingsCache {
    /// Create an empty cache bound to no account.
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(CacheState::Uninitialized);
        Self {
            inner: Arc::new(CacheInner {
                state,
                data: RwLock::new(CacheData::default()),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheData> {
        self.inner.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheData> {
        self.inner.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: CacheState) {
        tracing::debug!(%state, "settings cache state");
        self.inner.state.send_replace(state);
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Current lifecycle state.
    pub fn state(&self) -> CacheState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<CacheState> {
        self.inner.state.subscribe()
    }

    /// The account the cache is bound to.
    pub fn account(&self) -> Option<String> {
        self.read().account.clone()
    }

    /// Bind the cache to `account`.
    ///
    /// Switching to a different account tears the tree down and returns the
    /// cache to `Uninitialized`. Re-activating the current account is a no-op.
    pub fn activate(&self, account: &str) {
        let mut data = self.write();
        if data.account.as_deref() == Some(account) {
            return;
        }
        tracing::info!(account, "activating settings account");
        let epoch = data.epoch + 1;
        *data = CacheData {
            account: Some(account.to_string()),
            epoch,
            ..CacheData::default()
        };
        self.set_state(CacheState::Uninitialized);
    }

    /// Drop the tree and unbind from any account.
    pub fn reset(&self) {
        let mut data = self.write();
        let epoch = data.epoch + 1;
        *data = CacheData {
            epoch,
            ..CacheData::default()
        };
        self.set_state(CacheState::Uninitialized);
    }

    /// Record the start of a fetch for `account`.
    ///
    /// Enters `Loading` unless a tree is already being served, in which case
    /// the cache stays `Ready` while the refetch runs.
    pub fn begin_fetch(&self, account: &str) -> Result<Ticket> {
        let mut data = self.write();
        if data.account.as_deref() != Some(account) {
            return Err(Error::InactiveAccount(account.to_string()));
        }
        let ticket = data.ticket();
        if !self.state().is_ready() {
            self.set_state(CacheState::Loading);
        }
        Ok(ticket)
    }

    /// Store the tree returned by a fetch.
    ///
    /// Returns `false` if the response was discarded as stale.
    pub fn finish_fetch(&self, ticket: Ticket, tree: Value) -> bool {
        let mut data = self.write();
        if !data.is_current(ticket) || !data.accept_tree(ticket, tree) {
            tracing::debug!(seq = ticket.seq, "discarding stale settings fetch");
            return false;
        }
        self.set_state(CacheState::Ready);
        true
    }

    /// Record a failed fetch. The tree is left as it was.
    pub fn fail_fetch(&self, ticket: Ticket, message: impl Into<String>) -> bool {
        let data = self.write();
        if !data.is_current(ticket) {
            return false;
        }
        self.set_state(CacheState::Error(message.into()));
        true
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Value at `path`, or `default` when not `Ready` or absent.
    pub fn get(&self, path: &DotPath, default: Value) -> Value {
        if !self.state().is_ready() {
            return default;
        }
        let data = self.read();
        data.tree
            .as_ref()
            .and_then(|tree| path::get(tree, path))
            .cloned()
            .unwrap_or(default)
    }

    /// Typed read through a registered lens.
    pub fn get_setting<T: DeserializeOwned>(&self, setting: &Setting<T>, default: T) -> T {
        if !self.state().is_ready() {
            return default;
        }
        let data = self.read();
        match data.tree.as_ref() {
            Some(tree) => setting.get(tree, default),
            None => default,
        }
    }

    /// A copy of the whole tree, regardless of state.
    pub fn snapshot(&self) -> Option<Value> {
        self.read().tree.clone()
    }

    // ------------------------------------------------------------------------
    // Optimistic updates
    // ------------------------------------------------------------------------

    /// Apply `value` at `path` immediately and mark the path as saving.
    ///
    /// The returned ticket must be passed to [`reconcile`](Self::reconcile)
    /// or [`fail_update`](Self::fail_update) once the server answers.
    pub fn stage(&self, account: &str, path: &DotPath, value: Value) -> Result<Ticket> {
        let mut data = self.write();
        if data.account.as_deref() != Some(account) {
            return Err(Error::InactiveAccount(account.to_string()));
        }
        let ticket = data.ticket();
        let tree = data.tree.get_or_insert_with(|| Value::Object(Map::new()));
        let previous = path::get(tree, path).cloned();
        path::set(tree, path, value.clone());
        data.pending.insert(
            path.clone(),
            PendingWrite {
                seq: ticket.seq,
                value,
                previous,
            },
        );
        *data.in_flight.entry(path.clone()).or_default() += 1;
        tracing::debug!(account, %path, seq = ticket.seq, "staged optimistic write");
        Ok(ticket)
    }

    /// Replace the tree with the server's canonical response to a patch.
    ///
    /// Returns `false` if the response was discarded as stale.
    pub fn reconcile(&self, ticket: Ticket, path: &DotPath, tree: Value) -> bool {
        let mut data = self.write();
        if !data.is_current(ticket) {
            return false;
        }
        data.finish_in_flight(path);
        data.take_pending(path, ticket.seq);
        if data
            .last_update_error
            .as_ref()
            .is_some_and(|failure| &failure.path == path)
        {
            data.last_update_error = None;
        }
        if !data.accept_tree(ticket, tree) {
            tracing::debug!(%path, seq = ticket.seq, "discarding superseded reconciliation");
            return false;
        }
        self.set_state(CacheState::Ready);
        true
    }

    /// Record a failed patch submission.
    ///
    /// With [`RollbackPolicy::Keep`] the optimistic value stays visible. With
    /// [`RollbackPolicy::Revert`] the previous value is restored, unless a
    /// newer update to the same path has been staged since.
    pub fn fail_update(
        &self,
        ticket: Ticket,
        path: &DotPath,
        message: impl Into<String>,
        policy: RollbackPolicy,
    ) {
        let mut data = self.write();
        if !data.is_current(ticket) {
            return;
        }
        data.finish_in_flight(path);
        let pending = data.take_pending(path, ticket.seq);
        if let (RollbackPolicy::Revert, Some(pending)) = (policy, pending) {
            if let Some(tree) = data.tree.as_mut() {
                match pending.previous {
                    Some(previous) => {
                        path::set(tree, path, previous);
                    }
                    None => {
                        path::remove(tree, path);
                    }
                }
            }
        }
        data.last_update_error = Some(UpdateFailure {
            path: path.clone(),
            message: message.into(),
        });
    }

    /// Forget an update that will never be submitted or answered.
    ///
    /// The optimistic value stays in the current tree but is no longer
    /// layered over later server trees, and the path stops counting as saving.
    pub fn abandon(&self, ticket: Ticket, path: &DotPath) {
        let mut data = self.write();
        if !data.is_current(ticket) {
            return;
        }
        data.finish_in_flight(path);
        data.take_pending(path, ticket.seq);
        tracing::debug!(%path, seq = ticket.seq, "abandoned optimistic write");
    }

    /// Whether an update to `path` is awaiting the server.
    pub fn is_saving(&self, path: &DotPath) -> bool {
        self.read().in_flight.contains_key(path)
    }

    /// All paths with updates awaiting the server.
    pub fn saving_paths(&self) -> Vec<DotPath> {
        self.read().in_flight.keys().cloned().collect()
    }

    /// The most recent failed update, cleared when that path reconciles.
    pub fn last_update_error(&self) -> Option<UpdateFailure> {
        self.read().last_update_error.clone()
    }
}

impl Default for SettingsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SettingsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read();
        f.debug_struct("SettingsCache")
            .field("account", &data.account)
            .field("state", &self.state())
            .field("in_flight", &data.in_flight.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
