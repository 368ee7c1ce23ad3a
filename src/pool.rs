//! Connection pool (`spec.md` §4.8): leases [`Client`]s keyed by
//! `"server|export|version"`, reusing idle connections that are still
//! connected and mounted, and evicting ones that have sat idle past
//! `PoolOptions::idle_timeout` on a periodic sweep.
//!
//! Grounded on the teacher's concurrency shape in
//! `protocol::rpc::transaction_tracker::TransactionTracker` (a plain
//! `Mutex<HashMap<_, _>>` with synchronous housekeeping) and the
//! `tokio::spawn` periodic-task pattern in `tcp.rs`; the per-key idle queue
//! uses `tokio::sync::Mutex` rather than `std::sync::Mutex` because leasing
//! and returning a connection both hold it across network `.await` points.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use crate::client::{Client, NfsVersion};
use crate::config::{ClientOptions, PoolOptions};
use crate::error::NfsError;

fn pool_key(server: IpAddr, export: &str, version: NfsVersion) -> String {
    let version_tag = match version {
        NfsVersion::V2 => "v2",
        NfsVersion::V3 => "v3",
        NfsVersion::V4_1 => "v4.1",
    };
    format!("{server}|{export}|{version_tag}")
}

struct IdleEntry {
    client: Client,
    last_used: Instant,
}

/// Per-key state: the idle queue and the atomic count of connections
/// currently either idle or leased out under this key.
struct KeyState {
    idle: tokio::sync::Mutex<VecDeque<IdleEntry>>,
    total: AtomicUsize,
}

impl KeyState {
    fn new() -> Self {
        Self { idle: tokio::sync::Mutex::new(VecDeque::new()), total: AtomicUsize::new(0) }
    }
}

struct PoolInner {
    options: PoolOptions,
    keys: std::sync::Mutex<HashMap<String, Arc<KeyState>>>,
    disposed: AtomicBool,
    maintenance: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl PoolInner {
    fn key_state(&self, key: &str) -> Arc<KeyState> {
        let mut keys = self.keys.lock().expect("pool key map lock poisoned");
        Arc::clone(keys.entry(key.to_string()).or_insert_with(|| Arc::new(KeyState::new())))
    }

    async fn return_conn(&self, key: &str, mut client: Client) {
        let state = self.key_state(key);
        let eligible = !self.disposed.load(Ordering::SeqCst) && client.is_connected() && client.is_mounted();
        if eligible {
            let mut idle = state.idle.lock().await;
            if idle.len() < self.options.max_pool_size {
                idle.push_back(IdleEntry { client, last_used: Instant::now() });
                return;
            }
        }
        let _ = client.disconnect().await;
        state.total.fetch_sub(1, Ordering::SeqCst);
    }

    async fn destroy(&self, key: &str, mut client: Client) {
        let _ = client.disconnect().await;
        self.key_state(key).total.fetch_sub(1, Ordering::SeqCst);
    }

    /// One maintenance pass: drains each per-key idle queue synchronously
    /// (never holding the lock across an `.await`), then disconnects the
    /// entries that aged out.
    async fn sweep_idle(&self) {
        let now = Instant::now();
        let snapshot: Vec<(String, Arc<KeyState>)> = {
            let keys = self.keys.lock().expect("pool key map lock poisoned");
            keys.iter().map(|(k, v)| (k.clone(), Arc::clone(v))).collect()
        };
        for (key, state) in snapshot {
            let expired: Vec<Client> = {
                let mut idle = state.idle.lock().await;
                let mut kept = VecDeque::with_capacity(idle.len());
                let mut expired = Vec::new();
                while let Some(entry) = idle.pop_front() {
                    if now.saturating_duration_since(entry.last_used) > self.options.idle_timeout {
                        expired.push(entry.client);
                    } else {
                        kept.push_back(entry);
                    }
                }
                *idle = kept;
                expired
            };
            if expired.is_empty() {
                continue;
            }
            state.total.fetch_sub(expired.len(), Ordering::SeqCst);
            trace!(key, removed = expired.len(), "pool maintenance evicted idle connections");
            for mut client in expired {
                let _ = client.disconnect().await;
            }
        }
    }
}

/// Snapshot of one pool key's occupancy, `∀` lease/return sequence satisfying
/// `available ≤ total ≤ max_pool_size`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolKeyStats {
    pub total: usize,
    pub available: usize,
}

/// `(server, export, version)`-keyed pool of [`Client`] connections.
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    pub fn new(options: PoolOptions) -> Self {
        let inner = Arc::new(PoolInner {
            options,
            keys: std::sync::Mutex::new(HashMap::new()),
            disposed: AtomicBool::new(false),
            maintenance: std::sync::Mutex::new(None),
        });
        if inner.options.enable_maintenance {
            let handle = spawn_maintenance(Arc::clone(&inner));
            *inner.maintenance.lock().expect("pool maintenance lock poisoned") = Some(handle);
        }
        Self { inner }
    }

    /// `Lease(server, export, version, options)`: reuses an idle, still
    /// connected-and-mounted entry if one exists; otherwise connects and
    /// mounts a fresh one, provided the key is under `max_pool_size`.
    pub async fn lease(
        &self,
        server: IpAddr,
        export: &str,
        version: NfsVersion,
        options: ClientOptions,
    ) -> Result<PooledConnection, NfsError> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(NfsError::Disposed);
        }
        let key = pool_key(server, export, version);
        let state = self.inner.key_state(&key);

        loop {
            let dequeued = {
                let mut idle = state.idle.lock().await;
                idle.pop_front()
            };
            let Some(entry) = dequeued else { break };
            if entry.client.is_connected() && entry.client.is_mounted() {
                return Ok(PooledConnection::new(entry.client, key, Arc::clone(&self.inner)));
            }
            state.total.fetch_sub(1, Ordering::SeqCst);
        }

        loop {
            let current = state.total.load(Ordering::SeqCst);
            if current >= self.inner.options.max_pool_size {
                return Err(NfsError::InvalidState(format!("pool at capacity for key {key:?}")));
            }
            if state.total.compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
                break;
            }
        }

        let mut client = Client::new(version);
        if let Err(err) = client.connect(server, options).await {
            state.total.fetch_sub(1, Ordering::SeqCst);
            return Err(err);
        }
        if let Err(err) = client.mount(export).await {
            let _ = client.disconnect().await;
            state.total.fetch_sub(1, Ordering::SeqCst);
            return Err(err);
        }
        Ok(PooledConnection::new(client, key, Arc::clone(&self.inner)))
    }

    /// Occupancy snapshot for one key, mainly useful for tests exercising
    /// idle eviction (`spec.md` §8 scenario 6).
    pub async fn stats_for(&self, server: IpAddr, export: &str, version: NfsVersion) -> PoolKeyStats {
        let key = pool_key(server, export, version);
        let state = self.inner.key_state(&key);
        let available = state.idle.lock().await.len();
        let total = state.total.load(Ordering::SeqCst);
        PoolKeyStats { total, available }
    }

    /// `Dispose`: destroys every enqueued connection; subsequent leases fail
    /// with [`NfsError::Disposed`].
    pub async fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.inner.maintenance.lock().expect("pool maintenance lock poisoned").take() {
            handle.abort();
        }
        let snapshot: Vec<Arc<KeyState>> = {
            let keys = self.inner.keys.lock().expect("pool key map lock poisoned");
            keys.values().cloned().collect()
        };
        for state in snapshot {
            let drained: Vec<Client> = {
                let mut idle = state.idle.lock().await;
                idle.drain(..).map(|entry| entry.client).collect()
            };
            for mut client in drained {
                let _ = client.disconnect().await;
                state.total.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

fn spawn_maintenance(inner: Arc<PoolInner>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(inner.options.maintenance_interval);
        loop {
            ticker.tick().await;
            inner.sweep_idle().await;
        }
    })
}

/// A leased [`Client`], returned to its pool on drop unless [`Self::fault`]
/// was called first. `Drop` cannot await, so the return/destroy work runs on
/// a spawned task; callers holding this across a runtime shutdown should
/// call [`Self::release`] explicitly instead of relying on `Drop`.
pub struct PooledConnection {
    client: Option<Client>,
    key: String,
    pool: Arc<PoolInner>,
    faulted: bool,
}

impl PooledConnection {
    fn new(client: Client, key: String, pool: Arc<PoolInner>) -> Self {
        Self { client: Some(client), key, pool, faulted: false }
    }

    /// Marks this connection faulted: `Drop` destroys it instead of
    /// returning it to the pool.
    pub fn fault(mut self) {
        self.faulted = true;
    }

    /// Explicitly returns (or, if faulted, destroys) the connection without
    /// waiting for `Drop` to spawn the work.
    pub async fn release(mut self) {
        if let Some(client) = self.client.take() {
            if self.faulted {
                self.pool.destroy(&self.key, client).await;
            } else {
                self.pool.return_conn(&self.key, client).await;
            }
        }
    }
}

impl std::ops::Deref for PooledConnection {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().expect("connection already released")
    }
}

impl std::ops::DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Client {
        self.client.as_mut().expect("connection already released")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else { return };
        let pool = Arc::clone(&self.pool);
        let key = std::mem::take(&mut self.key);
        let faulted = self.faulted;
        tokio::spawn(async move {
            if faulted {
                pool.destroy(&key, client).await;
            } else {
                pool.return_conn(&key, client).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_key_joins_server_export_version() {
        let key = pool_key("127.0.0.1".parse().unwrap(), "/export", NfsVersion::V3);
        assert_eq!(key, "127.0.0.1|/export|v3");
    }

    #[tokio::test]
    async fn dispose_is_idempotent_and_blocks_new_leases() {
        let pool = Pool::new(PoolOptions { enable_maintenance: false, ..PoolOptions::default() });
        pool.dispose().await;
        pool.dispose().await;
        let err = pool.lease("127.0.0.1".parse().unwrap(), "/export", NfsVersion::V3, ClientOptions::default()).await;
        assert!(matches!(err, Err(NfsError::Disposed)));
    }

    #[tokio::test]
    async fn stats_for_unused_key_is_empty() {
        let pool = Pool::new(PoolOptions { enable_maintenance: false, ..PoolOptions::default() });
        let stats = pool.stats_for("127.0.0.1".parse().unwrap(), "/export", NfsVersion::V3).await;
        assert_eq!(stats, PoolKeyStats { total: 0, available: 0 });
    }
}
