//! Connectivity monitor.
//!
//! Holds the current online/offline flag and turns level changes into edge
//! events ([`ConnectivityEvent::WentOnline`] / [`ConnectivityEvent::WentOffline`]).
//! Setting the same state twice emits nothing.
//!
//! The periodic liveness probe ([`spawn_probe`]) optionally refreshes the flag
//! from a [`Reachability`] source, then, if online, asks for a drain on every
//! tick whether or not an edge fired. That covers platforms that drop edge
//! notifications.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::fs::BoxFuture;
use crate::remote::RemoteStore;

/// Edge transition of network reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityEvent {
    /// Offline -> online.
    WentOnline,
    /// Online -> offline.
    WentOffline,
}

/// A unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback invoked for each edge event.
pub type ConnectivityCallback = Arc<dyn Fn(ConnectivityEvent) + Send + Sync>;

/// Something that can tell whether the remote side is reachable right now.
pub trait Reachability: Send + Sync {
    /// Probe reachability.
    fn is_reachable(&self) -> BoxFuture<'_, bool>;
}

/// Uses the remote store's own availability check as the reachability signal.
pub struct RemoteReachability(pub Arc<dyn RemoteStore>);

impl Reachability for RemoteReachability {
    fn is_reachable(&self) -> BoxFuture<'_, bool> {
        self.0.is_available()
    }
}

/// Tracks the online flag and notifies subscribers on transitions.
pub struct ConnectivityMonitor {
    online: AtomicBool,
    callbacks: RwLock<HashMap<SubscriptionId, ConnectivityCallback>>,
    next_id: AtomicU64,
}

impl ConnectivityMonitor {
    /// Create a monitor with a known initial state. No event is emitted for it.
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: AtomicBool::new(initially_online),
            callbacks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Current connectivity.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Record the platform's connectivity state.
    ///
    /// Returns and broadcasts the edge event if the state changed.
    pub fn set_online(&self, online: bool) -> Option<ConnectivityEvent> {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return None;
        }
        let event = if online {
            ConnectivityEvent::WentOnline
        } else {
            ConnectivityEvent::WentOffline
        };
        log::info!("connectivity: {:?}", event);
        self.emit(event);
        Some(event)
    }

    /// Refresh the flag from a reachability source.
    pub async fn poll(&self, source: &dyn Reachability) -> Option<ConnectivityEvent> {
        let reachable = source.is_reachable().await;
        self.set_online(reachable)
    }

    /// Subscribe to edge events.
    pub fn subscribe(&self, callback: ConnectivityCallback) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, callback);
        id
    }

    /// Remove a subscription. Returns `true` if it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }

    fn emit(&self, event: ConnectivityEvent) {
        let callbacks: Vec<ConnectivityCallback> = self
            .callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("online", &self.is_online())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish()
    }
}

/// Run the periodic liveness probe on the current tokio runtime.
///
/// Every `period` (first tick one period after start) the probe refreshes the
/// monitor from `source` when one is given, then calls `request_drain` if the
/// monitor reports online. Abort the returned handle to stop it.
pub fn spawn_probe<F>(
    monitor: Arc<ConnectivityMonitor>,
    source: Option<Arc<dyn Reachability>>,
    period: Duration,
    request_drain: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(source) = &source {
                monitor.poll(source.as_ref()).await;
            }
            if monitor.is_online() {
                log::trace!("liveness probe: requesting drain");
                request_drain();
            }
        }
    })
}
