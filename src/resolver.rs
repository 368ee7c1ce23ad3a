//! Path-to-file-handle resolution and caching.
//!
//! The wire protocol never hands back a path, only a handle obtained by
//! walking LOOKUP one component at a time from a directory's handle. Doing
//! that walk on every call would mean a round trip per path component for
//! every read, so this module memoizes `path -> (handle, attributes)` with a
//! TTL and an invalidation discipline driven by the mutating operations
//! ([`PathResolver::invalidate`], [`PathResolver::invalidate_rename`],
//! [`PathResolver::mark_size_stale`]).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::engine::{Engine, FileAttributes, FileHandle};
use crate::error::NfsError;

/// Separator used by every canonical path this crate hands around. The wire
/// protocol never sees it; it only ever splits a cache key into LOOKUP
/// components.
pub const PATH_SEPARATOR: char = '\\';
/// Canonical spelling of the mounted root.
pub const ROOT_PATH: &str = ".";

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_SEPARATOR).filter(|c| !c.is_empty() && *c != ".")
}

#[derive(Clone, Debug)]
struct CacheEntry {
    handle: FileHandle,
    attributes: FileAttributes,
    last_touch: Instant,
    ttl: Duration,
    attrs_stale: bool,
}

impl CacheEntry {
    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_touch) > self.ttl
    }
}

/// Concurrent `path -> handle` cache with TTL expiry and prefix
/// invalidation, matching the teacher's
/// `protocol::rpc::context::Context::portmap_table` in shape: a plain
/// `RwLock<HashMap<_, _>>`, never held across an `.await`.
pub struct FileHandleCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl FileHandleCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), default_ttl }
    }

    fn get(&self, path: &str) -> Option<CacheEntry> {
        let now = Instant::now();
        let mut entries = self.entries.write().expect("file handle cache lock poisoned");
        match entries.get_mut(path) {
            Some(entry) if !entry.expired(now) => {
                entry.last_touch = now;
                Some(entry.clone())
            }
            Some(_) => {
                entries.remove(path);
                None
            }
            None => None,
        }
    }

    fn insert(&self, path: String, handle: FileHandle, attributes: FileAttributes) {
        let now = Instant::now();
        let entry = CacheEntry { handle, attributes, last_touch: now, ttl: self.default_ttl, attrs_stale: false };
        self.entries.write().expect("file handle cache lock poisoned").insert(path, entry);
    }

    /// Invalidates the single entry at `path`, leaving any nested entries
    /// alone (used for `SetAttr`, which changes nothing structural).
    fn invalidate(&self, path: &str) {
        self.entries.write().expect("file handle cache lock poisoned").remove(path);
    }

    /// Invalidates `path` and every entry nested under it (`path` followed
    /// by [`PATH_SEPARATOR`]).
    fn invalidate_prefix(&self, path: &str) {
        let prefix = format!("{path}{PATH_SEPARATOR}");
        let mut entries = self.entries.write().expect("file handle cache lock poisoned");
        entries.retain(|key, _| key != path && !key.starts_with(&prefix));
    }

    fn mark_attrs_stale(&self, path: &str) {
        if let Some(entry) = self.entries.write().expect("file handle cache lock poisoned").get_mut(path) {
            entry.attrs_stale = true;
        }
    }

    /// Drops every cached entry unconditionally, used when a connection is
    /// unmounted or torn down (every handle it holds is about to go invalid).
    pub fn clear(&self) {
        self.entries.write().expect("file handle cache lock poisoned").clear();
    }

    /// Removes every entry whose last touch is older than its TTL. Driven by
    /// [`PathResolver::spawn_sweeper`], but safe to call directly from tests.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().expect("file handle cache lock poisoned");
        let before = entries.len();
        entries.retain(|_, entry| !entry.expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            trace!(removed, "file handle cache sweep evicted entries");
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().expect("file handle cache lock poisoned").len()
    }
}

/// Resolves canonical paths to file handles against one connection's
/// [`Engine`], caching the result and retrying a `STALE` handle once.
pub struct PathResolver {
    cache: Arc<FileHandleCache>,
}

impl PathResolver {
    pub fn new(default_ttl: Duration) -> Self {
        Self { cache: Arc::new(FileHandleCache::new(default_ttl)) }
    }

    pub fn cache(&self) -> &Arc<FileHandleCache> {
        &self.cache
    }

    /// Resolves `path` to `(handle, attributes)`, consulting the cache
    /// before issuing any LOOKUP.
    pub async fn resolve(
        &self,
        engine: &mut dyn Engine,
        path: &str,
    ) -> Result<(FileHandle, FileAttributes), NfsError> {
        if let Some(entry) = self.cache.get(path) {
            if !entry.attrs_stale {
                return Ok((entry.handle, entry.attributes));
            }
            let attributes = engine.getattr(&entry.handle).await?;
            self.cache.insert(path.to_string(), entry.handle.clone(), attributes.clone());
            return Ok((entry.handle, attributes));
        }
        self.lookup_chain(engine, path).await
    }

    /// When `err` reports a cached handle at `path` went `STALE`, invalidates
    /// it and redoes the LOOKUP chain, handing back a fresh handle for the
    /// caller to retry its own operation with. Returns `None` for any other
    /// error, leaving the cache untouched.
    ///
    /// Callers drive their own retry with this rather than handing a closure
    /// to `PathResolver`: the operation needs a live `&mut dyn Engine`
    /// borrowed across an `.await`, and no single concrete future type can
    /// describe that for an arbitrary caller-supplied closure.
    pub async fn retry_stale(
        &self,
        engine: &mut dyn Engine,
        path: &str,
        err: &NfsError,
    ) -> Option<Result<FileHandle, NfsError>> {
        if !err.is_stale() {
            return None;
        }
        debug!(path, "cached handle went stale, invalidating and retrying once");
        self.cache.invalidate(path);
        Some(self.lookup_chain(engine, path).await.map(|(handle, _)| handle))
    }

    async fn lookup_chain(
        &self,
        engine: &mut dyn Engine,
        path: &str,
    ) -> Result<(FileHandle, FileAttributes), NfsError> {
        let root = engine.root_handle().cloned().ok_or_else(|| NfsError::InvalidState("not mounted".to_string()))?;
        let mut handle = root.clone();
        let mut attributes = None;
        for component in components(path) {
            let (next_handle, next_attrs) = engine.lookup(&handle, component).await?;
            handle = next_handle;
            attributes = Some(next_attrs);
        }
        let attributes = match attributes {
            Some(attrs) => attrs,
            None => engine.getattr(&handle).await?,
        };
        self.cache.insert(path.to_string(), handle.clone(), attributes.clone());
        Ok((handle, attributes))
    }

    /// `Remove`/`Rmdir`: invalidates `path` and everything nested under it.
    pub fn invalidate(&self, path: &str) {
        self.cache.invalidate_prefix(path);
    }

    /// `Rename`: invalidates both the source and destination, and anything
    /// nested under either.
    pub fn invalidate_rename(&self, from: &str, to: &str) {
        self.cache.invalidate_prefix(from);
        self.cache.invalidate_prefix(to);
    }

    /// `SetAttr`: invalidates the single entry; its children are untouched.
    pub fn invalidate_attrs(&self, path: &str) {
        self.cache.invalidate(path);
    }

    /// `Write`: keeps the cached handle but marks its attributes stale, so
    /// the next resolve re-fetches via GETATTR instead of replaying LOOKUP.
    pub fn mark_size_stale(&self, path: &str) {
        self.cache.mark_attrs_stale(path);
    }

    /// Spawns a background task that sweeps expired entries on `period`
    /// cadence until the returned handle is aborted or dropped.
    pub fn spawn_sweeper(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                cache.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::engine::DirEntry;

    /// Minimal in-memory [`Engine`] standing in for a server: `lookup`
    /// descends a fixed tree, `getattr` counts calls so tests can assert a
    /// stale-attribute refresh happened without replaying LOOKUP.
    struct MockEngine {
        root: FileHandle,
        getattr_calls: AtomicU32,
        next_handle: AtomicU32,
        fail_next_read: bool,
    }

    impl MockEngine {
        fn new() -> Self {
            Self {
                root: FileHandle(vec![0]),
                getattr_calls: AtomicU32::new(0),
                next_handle: AtomicU32::new(1),
                fail_next_read: false,
            }
        }
    }

    fn attrs() -> FileAttributes {
        FileAttributes::default()
    }

    #[async_trait]
    impl Engine for MockEngine {
        async fn list_exports(&mut self) -> Result<Vec<String>, NfsError> {
            Ok(vec!["/".to_string()])
        }
        async fn mount(&mut self, _export: &str) -> Result<FileHandle, NfsError> {
            Ok(self.root.clone())
        }
        async fn unmount(&mut self) -> Result<(), NfsError> {
            Ok(())
        }
        async fn lookup(&mut self, _dir: &FileHandle, _name: &str) -> Result<(FileHandle, FileAttributes), NfsError> {
            let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
            Ok((FileHandle(vec![id as u8]), attrs()))
        }
        async fn getattr(&mut self, _handle: &FileHandle) -> Result<FileAttributes, NfsError> {
            self.getattr_calls.fetch_add(1, Ordering::SeqCst);
            Ok(attrs())
        }
        async fn read_dir(&mut self, _dir: &FileHandle) -> Result<Vec<DirEntry>, NfsError> {
            Ok(vec![])
        }
        async fn read(&mut self, _handle: &FileHandle, _offset: u64, _count: u32) -> Result<crate::engine::ReadResult, NfsError> {
            if self.fail_next_read {
                return Err(NfsError::Status(crate::error::NfsStatusKind::Stale));
            }
            Ok(crate::engine::ReadResult { data: vec![], eof: true })
        }
        async fn write(&mut self, _handle: &FileHandle, _offset: u64, data: &[u8]) -> Result<u32, NfsError> {
            Ok(data.len() as u32)
        }
        async fn create(&mut self, _dir: &FileHandle, _name: &str, _mode: u32) -> Result<(FileHandle, FileAttributes), NfsError> {
            Ok((FileHandle(vec![255]), attrs()))
        }
        async fn mkdir(&mut self, _dir: &FileHandle, _name: &str, _mode: u32) -> Result<(FileHandle, FileAttributes), NfsError> {
            Ok((FileHandle(vec![254]), attrs()))
        }
        async fn remove(&mut self, _dir: &FileHandle, _name: &str) -> Result<(), NfsError> {
            Ok(())
        }
        async fn rmdir(&mut self, _dir: &FileHandle, _name: &str) -> Result<(), NfsError> {
            Ok(())
        }
        async fn rename(&mut self, _from_dir: &FileHandle, _from_name: &str, _to_dir: &FileHandle, _to_name: &str) -> Result<(), NfsError> {
            Ok(())
        }
        async fn set_size(&mut self, _handle: &FileHandle, _size: u64) -> Result<(), NfsError> {
            Ok(())
        }
        async fn symlink(&mut self, _dir: &FileHandle, _name: &str, _target: &str) -> Result<(FileHandle, FileAttributes), NfsError> {
            Ok((FileHandle(vec![253]), attrs()))
        }
        async fn readlink(&mut self, _handle: &FileHandle) -> Result<String, NfsError> {
            Ok(String::new())
        }
        async fn link(&mut self, _dir: &FileHandle, _name: &str, _target: &FileHandle) -> Result<(), NfsError> {
            Ok(())
        }
        async fn complete_io(&mut self, _handle: &FileHandle) -> Result<(), NfsError> {
            Ok(())
        }
        fn block_size(&self) -> u32 {
            65536
        }
        fn root_handle(&self) -> Option<&FileHandle> {
            Some(&self.root)
        }
    }

    #[tokio::test]
    async fn resolve_caches_after_first_lookup_chain() {
        let mut engine = MockEngine::new();
        let resolver = PathResolver::new(Duration::from_secs(60));

        let (h1, _) = resolver.resolve(&mut engine, "a\\b").await.unwrap();
        let (h2, _) = resolver.resolve(&mut engine, "a\\b").await.unwrap();
        assert_eq!(h1, h2);
        assert_eq!(resolver.cache.len(), 1);
    }

    #[tokio::test]
    async fn root_path_resolves_without_lookup() {
        let mut engine = MockEngine::new();
        let resolver = PathResolver::new(Duration::from_secs(60));

        let (handle, _) = resolver.resolve(&mut engine, ROOT_PATH).await.unwrap();
        assert_eq!(handle, engine.root);
    }

    #[tokio::test]
    async fn invalidate_prefix_drops_nested_entries_only() {
        let mut engine = MockEngine::new();
        let resolver = PathResolver::new(Duration::from_secs(60));

        resolver.resolve(&mut engine, "a").await.unwrap();
        resolver.resolve(&mut engine, "a\\b").await.unwrap();
        resolver.resolve(&mut engine, "ab").await.unwrap();

        resolver.invalidate("a");
        assert_eq!(resolver.cache.len(), 1);
        assert!(resolver.cache.get("ab").is_some());
    }

    #[tokio::test]
    async fn mark_size_stale_forces_getattr_not_lookup() {
        let mut engine = MockEngine::new();
        let resolver = PathResolver::new(Duration::from_secs(60));

        resolver.resolve(&mut engine, "a").await.unwrap();
        resolver.mark_size_stale("a");
        let before = engine.getattr_calls.load(Ordering::SeqCst);
        resolver.resolve(&mut engine, "a").await.unwrap();
        assert_eq!(engine.getattr_calls.load(Ordering::SeqCst), before + 1);
        assert_eq!(resolver.cache.len(), 1);
    }

    #[tokio::test]
    async fn ttl_expiry_forces_a_fresh_lookup_chain() {
        let mut engine = MockEngine::new();
        let resolver = PathResolver::new(Duration::from_millis(1));

        let (h1, _) = resolver.resolve(&mut engine, "a").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (h2, _) = resolver.resolve(&mut engine, "a").await.unwrap();
        assert_ne!(h1, h2);
    }

    #[tokio::test]
    async fn retry_stale_reissues_lookup_chain_and_returns_fresh_handle() {
        let mut engine = MockEngine::new();
        let resolver = PathResolver::new(Duration::from_secs(60));

        let (first, _) = resolver.resolve(&mut engine, "a").await.unwrap();
        let stale = NfsError::Status(crate::error::NfsStatusKind::Stale);
        let retried = resolver.retry_stale(&mut engine, "a", &stale).await;
        let fresh = retried.expect("STALE should trigger a retry").unwrap();
        assert_ne!(first, fresh);
    }

    #[tokio::test]
    async fn retry_stale_ignores_non_stale_errors() {
        let mut engine = MockEngine::new();
        let resolver = PathResolver::new(Duration::from_secs(60));

        resolver.resolve(&mut engine, "a").await.unwrap();
        let other = NfsError::Connection("down".to_string());
        assert!(resolver.retry_stale(&mut engine, "a", &other).await.is_none());
        assert_eq!(resolver.cache.len(), 1);
    }

    #[tokio::test]
    async fn read_reports_stale_and_a_caller_can_retry_through_it() {
        let mut engine = MockEngine::new();
        let resolver = PathResolver::new(Duration::from_secs(60));

        let (handle, _) = resolver.resolve(&mut engine, "a").await.unwrap();
        engine.fail_next_read = true;
        let err = engine.read(&handle, 0, 4096).await.unwrap_err();

        let fresh = resolver.retry_stale(&mut engine, "a", &err).await.unwrap().unwrap();
        engine.fail_next_read = false;
        let result = engine.read(&fresh, 0, 4096).await.unwrap();
        assert!(result.eof);
    }
}
