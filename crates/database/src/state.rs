use mongodb::event::sdam::SdamEvent;
use mongodb::ServerType;
use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Reachability of the document store.
///
/// The numeric codes follow the driver-level convention clients already
/// consume from `/health`: 0 disconnected, 1 connected, 2 connecting,
/// 3 disconnecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connected = 1,
    Connecting = 2,
    Disconnecting = 3,
}

impl ConnectionState {
    pub fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => ConnectionState::Connected,
            2 => ConnectionState::Connecting,
            3 => ConnectionState::Disconnecting,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl Serialize for ConnectionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Shared, lock-free cell holding the current `ConnectionState`.
///
/// Cloning is cheap and every clone observes the same state. Only the gateway
/// (and the driver callbacks it installs) writes; everything else reads.
#[derive(Debug, Clone)]
pub struct ConnectionMonitor {
    inner: Arc<MonitorInner>,
}

#[derive(Debug)]
struct MonitorInner {
    state: AtomicU8,
    /// Topology changes only move the state while armed, i.e. between a
    /// successful connect and the start of a disconnect.
    armed: AtomicBool,
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                state: AtomicU8::new(ConnectionState::Disconnected.code()),
                armed: AtomicBool::new(false),
            }),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_code(self.inner.state.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        let previous = self.inner.state.swap(state.code(), Ordering::AcqRel);
        if previous != state.code() {
            tracing::debug!(
                from = ?ConnectionState::from_code(previous),
                to = ?state,
                "Connection state changed."
            );
        }
    }

    pub(crate) fn arm(&self) {
        self.inner.armed.store(true, Ordering::Release);
    }

    pub(crate) fn disarm(&self) {
        self.inner.armed.store(false, Ordering::Release);
    }

    /// Applies a topology change: the store counts as reachable while the
    /// driver sees at least one server that accepts writes.
    ///
    /// Only flips between connected and disconnected; a connect or disconnect
    /// in progress owns the state until it finishes.
    pub fn on_topology_change(&self, writable: bool) {
        if !self.inner.armed.load(Ordering::Acquire) {
            return;
        }
        let (from, to) = if writable {
            (ConnectionState::Disconnected, ConnectionState::Connected)
        } else {
            (ConnectionState::Connected, ConnectionState::Disconnected)
        };
        let changed = self
            .inner
            .state
            .compare_exchange(from.code(), to.code(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if changed {
            if writable {
                tracing::info!("MongoDB writable server available again.");
            } else {
                tracing::warn!("No writable MongoDB server; marking store as disconnected.");
            }
        }
    }

    /// Driver topology callback. Per-server heartbeats are ignored: one
    /// unreachable replica set member says nothing about the primary.
    pub(crate) fn observe(&self, event: &SdamEvent) {
        if let SdamEvent::TopologyDescriptionChanged(change) = event {
            let servers = change.new_description.servers();
            self.on_topology_change(has_writable_server(
                servers.values().map(|server| server.server_type()),
            ));
        }
    }
}

/// Standalones, primaries, mongos routers and load balancers accept writes.
fn has_writable_server(server_types: impl IntoIterator<Item = ServerType>) -> bool {
    server_types.into_iter().any(|server_type| {
        matches!(
            server_type,
            ServerType::Standalone
                | ServerType::RsPrimary
                | ServerType::Mongos
                | ServerType::LoadBalancer
        )
    })
}
