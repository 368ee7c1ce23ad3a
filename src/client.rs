//! The per-connection façade (`spec.md` §4.7): one version tag, one
//! [`NfsEngine`], one [`PathResolver`], composed into the state machine
//! `Disconnected -> Connected -> Mounted -> Connected -> Disconnected` and
//! the chunked, path-resolving operations callers actually want.
//!
//! "Mounted" is not tracked as a separate field: it is exactly
//! `engine.root_handle().is_some()`, the same fact the engine itself already
//! holds after a successful `mount`.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info_span, Instrument};

use crate::config::ClientOptions;
use crate::engine::v2::Engine2;
use crate::engine::v3::Engine3;
use crate::engine::v4::Engine4;
use crate::engine::{Engine, FileAttributes, FileType, NfsEngine};
use crate::error::{NfsError, NfsStatusKind};
use crate::portmap::PortmapClient;
use crate::protocol::rpc::Credentials;
use crate::protocol::xdr::{mount as mount_xdr, nfs2, nfs3, nfs4};
use crate::resolver::{PathResolver, PATH_SEPARATOR, ROOT_PATH};

/// Not specified by `spec.md` §4.6; chosen as a reasonable default for a
/// cache meant to survive a handful of calls on the same path without
/// growing stale for long (see `DESIGN.md`).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);
const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(30);

/// Cooperative cancellation signal for [`Client::read_stream`] and
/// [`Client::write_stream`] (`spec.md` §4.7, §5). Cloning shares the same
/// flag, so a caller can hold one clone and hand the other to the stream
/// call. `cancel()` only takes effect at the next chunk boundary: an RPC
/// already in flight when cancellation is requested is allowed to finish
/// (cancellation during an in-flight RPC is advisory).
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Rewrites `path` (accepting either `/` or `\` separators from a caller) to
/// the canonical form: a leading "." followed by one `PATH_SEPARATOR` per
/// component, e.g. `"/a/b"` and `"a\\b"` both become `".\\a\\b"`.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::from(ROOT_PATH);
    for component in path.split(['/', PATH_SEPARATOR]).filter(|c| !c.is_empty() && *c != ".") {
        out.push(PATH_SEPARATOR);
        out.push_str(component);
    }
    out
}

/// Appends `tail` (in either separator convention) onto canonical path `base`.
pub fn combine(base: &str, tail: &str) -> String {
    let mut out = base.to_string();
    for component in tail.split(['/', PATH_SEPARATOR]).filter(|c| !c.is_empty() && *c != ".") {
        out.push(PATH_SEPARATOR);
        out.push_str(component);
    }
    out
}

/// The last component of a canonical path; `"."` for the root itself.
pub fn file_name(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

/// The canonical path of `path`'s parent; `"."` if `path` is already the root.
pub fn directory_name(path: &str) -> &str {
    match path.rfind(PATH_SEPARATOR) {
        Some(idx) => &path[..idx],
        None => ROOT_PATH,
    }
}

/// Which NFS wire version a [`Client`] speaks. Fixed at construction: the
/// façade never renegotiates a version mid-connection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NfsVersion {
    V2,
    V3,
    /// RFC 5661 minor version 1; the only v4 minor version this crate speaks.
    V4_1,
}

/// A single NFS connection: transport, mount state and the path-to-handle
/// cache, all scoped to one wire version.
pub struct Client {
    version: NfsVersion,
    engine: Option<NfsEngine>,
    resolver: PathResolver,
    options: ClientOptions,
    last_write: Option<String>,
    sweeper: Option<tokio::task::JoinHandle<()>>,
}

impl Client {
    /// Constructs a `Client` bound to `version`, not yet connected.
    pub fn new(version: NfsVersion) -> Self {
        Self {
            version,
            engine: None,
            resolver: PathResolver::new(DEFAULT_CACHE_TTL),
            options: ClientOptions::default(),
            last_write: None,
            sweeper: None,
        }
    }

    pub fn version(&self) -> NfsVersion {
        self.version
    }

    pub fn is_connected(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_mounted(&self) -> bool {
        self.engine.as_ref().and_then(|e| e.root_handle()).is_some()
    }

    fn engine_mut(&mut self) -> Result<&mut NfsEngine, NfsError> {
        self.engine.as_mut().ok_or_else(|| NfsError::InvalidState("not connected".to_string()))
    }

    /// Disjoint borrow of the connected engine and the resolver: both are
    /// plain fields of `self`, so borrowing one mutably and the other
    /// immutably through direct field projection (rather than through two
    /// separate `&mut self` calls) is sound and the borrow checker accepts it.
    fn parts(&mut self) -> Result<(&mut dyn Engine, &PathResolver), NfsError> {
        let engine: &mut dyn Engine =
            self.engine.as_mut().ok_or_else(|| NfsError::InvalidState("not connected".to_string()))?;
        Ok((engine, &self.resolver))
    }

    fn parts_mounted(&mut self) -> Result<(&mut dyn Engine, &PathResolver), NfsError> {
        let (engine, resolver) = self.parts()?;
        if engine.root_handle().is_none() {
            return Err(NfsError::InvalidState("not mounted".to_string()));
        }
        Ok((engine, resolver))
    }

    fn block_size(&self) -> Result<u32, NfsError> {
        self.engine.as_ref().map(Engine::block_size).ok_or_else(|| NfsError::InvalidState("not connected".to_string()))
    }

    /// `Connect(address, options)`: resolves ports via the portmapper for any
    /// of `options.nfs_port`/`options.mount_port` left unset, opens the
    /// version-appropriate engine, and leaves the connection unmounted.
    pub async fn connect(&mut self, host: IpAddr, options: ClientOptions) -> Result<(), NfsError> {
        if self.engine.is_some() {
            return Err(NfsError::InvalidState("already connected".to_string()));
        }

        let credentials = Credentials::Unix {
            stamp: 0,
            machine_name: "nfs-client-mamont".to_string(),
            uid: options.user_id,
            gid: options.group_id,
            gids: Vec::new(),
        };
        let timeout = options.command_timeout;

        let (nfs_program, nfs_version, needs_mount, mount_version) = match self.version {
            NfsVersion::V2 => (nfs2::PROGRAM, nfs2::VERSION, true, mount_xdr::VERSION1),
            NfsVersion::V3 => (nfs3::PROGRAM, nfs3::VERSION, true, mount_xdr::VERSION),
            NfsVersion::V4_1 => (nfs4::PROGRAM, nfs4::VERSION, false, 0),
        };

        let nfs_port = match options.nfs_port {
            Some(port) => port,
            None => {
                let portmap = PortmapClient::connect_with(host, timeout, options.use_privileged_port).await?;
                portmap.get_port(nfs_program, nfs_version, true).await?
            }
        };
        let nfs_addr = SocketAddr::new(host, nfs_port);

        let mount_addr = if needs_mount {
            let mount_port = match options.mount_port {
                Some(port) => port,
                None => {
                    let portmap = PortmapClient::connect_with(host, timeout, options.use_privileged_port).await?;
                    portmap.get_port(mount_xdr::PROGRAM, mount_version, false).await?
                }
            };
            SocketAddr::new(host, mount_port)
        } else {
            // v4.1 has no MOUNT protocol; the engines ignore this address.
            nfs_addr
        };

        let span = info_span!("nfs_connection", %host, version = ?self.version);
        let version = self.version;
        let engine = async {
            match version {
                NfsVersion::V2 => {
                    Engine2::connect_with(nfs_addr, mount_addr, credentials, timeout, options.use_privileged_port)
                        .await
                        .map(NfsEngine::V2)
                }
                NfsVersion::V3 => {
                    Engine3::connect_with(nfs_addr, mount_addr, credentials, timeout, options.use_privileged_port)
                        .await
                        .map(NfsEngine::V3)
                }
                NfsVersion::V4_1 => {
                    Engine4::connect_with(nfs_addr, mount_addr, credentials, timeout, options.use_privileged_port)
                        .await
                        .map(NfsEngine::V4)
                }
            }
        }
        .instrument(span)
        .await?;

        let ttl = if options.use_handle_cache { DEFAULT_CACHE_TTL } else { Duration::ZERO };
        self.resolver = PathResolver::new(ttl);
        self.engine = Some(engine);
        self.options = options;
        Ok(())
    }

    /// `Disconnect`: the one graceful teardown path - unmounts if still
    /// mounted, closes connection-scoped server state (`DESTROY_SESSION` on
    /// v4.1) and drops the engine, its cache, and the background sweeper.
    /// Both failures are best-effort: a server that is already gone must not
    /// stop the client from reaching `Disconnected`. `Drop` is the fallback
    /// for a caller that never calls this.
    pub async fn disconnect(&mut self) -> Result<(), NfsError> {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
        if let Some(mut engine) = self.engine.take() {
            let _ = engine.unmount().await;
            let _ = engine.close().await;
        }
        self.resolver.cache().clear();
        self.last_write = None;
        Ok(())
    }

    /// `MountDevice(export)`: `Connected -> Mounted`.
    pub async fn mount(&mut self, export: &str) -> Result<(), NfsError> {
        let use_handle_cache = self.options.use_handle_cache;
        let engine = self.engine_mut()?;
        if engine.root_handle().is_some() {
            return Err(NfsError::InvalidState("already mounted".to_string()));
        }
        engine.mount(export).await?;
        self.resolver.cache().clear();
        if use_handle_cache && self.sweeper.is_none() {
            self.sweeper = Some(self.resolver.spawn_sweeper(DEFAULT_SWEEP_PERIOD));
        }
        Ok(())
    }

    /// `UnMountDevice`: `Mounted -> Connected`.
    pub async fn unmount(&mut self) -> Result<(), NfsError> {
        let engine = self.engine_mut()?;
        engine.unmount().await?;
        self.resolver.cache().clear();
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
        self.last_write = None;
        Ok(())
    }

    pub async fn list_exports(&mut self) -> Result<Vec<String>, NfsError> {
        self.engine_mut()?.list_exports().await
    }

    pub async fn list_dir(&mut self, path: &str, include_dots: bool) -> Result<Vec<String>, NfsError> {
        let canonical = normalize_path(path);
        let (engine, resolver) = self.parts_mounted()?;
        let (handle, _) = resolver.resolve(engine, &canonical).await?;
        let entries = engine.read_dir(&handle).await?;
        Ok(entries
            .into_iter()
            .map(|e| e.name)
            .filter(|name| include_dots || (name != "." && name != ".."))
            .collect())
    }

    /// `must_exist = false` turns a `NOENT` into `Ok(None)` instead of an
    /// error, matching the `FileAttributes | Missing` surface in `spec.md` §6.
    pub async fn get_attributes(&mut self, path: &str, must_exist: bool) -> Result<Option<FileAttributes>, NfsError> {
        let canonical = normalize_path(path);
        let (engine, resolver) = self.parts_mounted()?;
        match resolver.resolve(engine, &canonical).await {
            Ok((_, attrs)) => Ok(Some(attrs)),
            Err(NfsError::Status(NfsStatusKind::NoEnt)) if !must_exist => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn exists(&mut self, path: &str) -> Result<bool, NfsError> {
        Ok(self.get_attributes(path, false).await?.is_some())
    }

    pub async fn is_dir(&mut self, path: &str) -> Result<bool, NfsError> {
        let attrs = self.get_attributes(path, true).await?.expect("must_exist=true never yields None");
        Ok(attrs.file_type == FileType::Directory)
    }

    pub async fn create_file(&mut self, path: &str, mode: u32) -> Result<FileAttributes, NfsError> {
        let canonical = normalize_path(path);
        let parent = directory_name(&canonical).to_string();
        let name = file_name(&canonical).to_string();
        let (engine, resolver) = self.parts_mounted()?;
        let (dir_handle, _) = resolver.resolve(engine, &parent).await?;
        let (_, attrs) = engine.create(&dir_handle, &name, mode).await?;
        Ok(attrs)
    }

    pub async fn create_dir(&mut self, path: &str, mode: u32) -> Result<FileAttributes, NfsError> {
        let canonical = normalize_path(path);
        let parent = directory_name(&canonical).to_string();
        let name = file_name(&canonical).to_string();
        let (engine, resolver) = self.parts_mounted()?;
        let (dir_handle, _) = resolver.resolve(engine, &parent).await?;
        let (_, attrs) = engine.mkdir(&dir_handle, &name, mode).await?;
        Ok(attrs)
    }

    pub async fn delete_file(&mut self, path: &str) -> Result<(), NfsError> {
        let canonical = normalize_path(path);
        let parent = directory_name(&canonical).to_string();
        let name = file_name(&canonical).to_string();
        let (engine, resolver) = self.parts_mounted()?;
        let (dir_handle, _) = resolver.resolve(engine, &parent).await?;
        engine.remove(&dir_handle, &name).await?;
        resolver.invalidate(&canonical);
        Ok(())
    }

    pub async fn delete_dir(&mut self, path: &str, recursive: bool) -> Result<(), NfsError> {
        let canonical = normalize_path(path);
        if recursive {
            self.delete_dir_recursive(&canonical).await
        } else {
            let parent = directory_name(&canonical).to_string();
            let name = file_name(&canonical).to_string();
            let (engine, resolver) = self.parts_mounted()?;
            let (dir_handle, _) = resolver.resolve(engine, &parent).await?;
            engine.rmdir(&dir_handle, &name).await?;
            resolver.invalidate(&canonical);
            Ok(())
        }
    }

    /// Iterative (non-recursive-async) bottom-up delete: a directory is
    /// pushed onto `stack` when discovered and onto `dirs` (in discovery
    /// order) once its own children have been enumerated. Every ancestor is
    /// discovered, and so appended to `dirs`, strictly before any of its
    /// descendants; reversing `dirs` therefore always deletes a directory
    /// after everything nested under it.
    async fn delete_dir_recursive(&mut self, root: &str) -> Result<(), NfsError> {
        let mut stack = vec![root.to_string()];
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        while let Some(dir_path) = stack.pop() {
            let entries = {
                let (engine, resolver) = self.parts_mounted()?;
                let (dir_handle, _) = resolver.resolve(engine, &dir_path).await?;
                engine.read_dir(&dir_handle).await?
            };
            for entry in entries {
                if entry.name == "." || entry.name == ".." {
                    continue;
                }
                let child_path = format!("{dir_path}{PATH_SEPARATOR}{}", entry.name);
                let is_dir = {
                    let (engine, resolver) = self.parts_mounted()?;
                    let (_, attrs) = resolver.resolve(engine, &child_path).await?;
                    attrs.file_type == FileType::Directory
                };
                if is_dir {
                    stack.push(child_path);
                } else {
                    files.push(child_path);
                }
            }
            dirs.push(dir_path);
        }

        for file_path in &files {
            let parent = directory_name(file_path).to_string();
            let name = file_name(file_path).to_string();
            let (engine, resolver) = self.parts_mounted()?;
            let (dir_handle, _) = resolver.resolve(engine, &parent).await?;
            engine.remove(&dir_handle, &name).await?;
            resolver.invalidate(file_path);
        }

        for dir_path in dirs.into_iter().rev() {
            let parent = directory_name(&dir_path).to_string();
            let name = file_name(&dir_path).to_string();
            let (engine, resolver) = self.parts_mounted()?;
            let (dir_handle, _) = resolver.resolve(engine, &parent).await?;
            engine.rmdir(&dir_handle, &name).await?;
            resolver.invalidate(&dir_path);
        }

        Ok(())
    }

    pub async fn move_path(&mut self, src: &str, dst: &str) -> Result<(), NfsError> {
        let src_canonical = normalize_path(src);
        let dst_canonical = normalize_path(dst);
        let src_parent = directory_name(&src_canonical).to_string();
        let src_name = file_name(&src_canonical).to_string();
        let dst_parent = directory_name(&dst_canonical).to_string();
        let dst_name = file_name(&dst_canonical).to_string();
        let (engine, resolver) = self.parts_mounted()?;
        let (src_dir, _) = resolver.resolve(engine, &src_parent).await?;
        let (dst_dir, _) = resolver.resolve(engine, &dst_parent).await?;
        engine.rename(&src_dir, &src_name, &dst_dir, &dst_name).await?;
        resolver.invalidate_rename(&src_canonical, &dst_canonical);
        Ok(())
    }

    pub async fn set_size(&mut self, path: &str, size: u64) -> Result<(), NfsError> {
        let canonical = normalize_path(path);
        let (engine, resolver) = self.parts_mounted()?;
        let (handle, _) = resolver.resolve(engine, &canonical).await?;
        engine.set_size(&handle, size).await?;
        resolver.invalidate_attrs(&canonical);
        Ok(())
    }

    /// `Read(path, offset, length, buffer)`: loops at most `block_size` bytes
    /// per RPC until `length` bytes are filled or the server reports EOF.
    /// `buf` must be at least `length` bytes; this never allocates its own
    /// buffer (Design Note in `spec.md` §9).
    pub async fn read(&mut self, path: &str, offset: u64, length: u64, buf: &mut [u8]) -> Result<usize, NfsError> {
        self.read_with_progress(path, offset, length, buf, |_| {}).await
    }

    /// As [`Client::read`], invoking `on_chunk(bytes_in_chunk)` after every
    /// successful RPC - the streaming variants' building block.
    pub async fn read_with_progress(
        &mut self,
        path: &str,
        offset: u64,
        length: u64,
        buf: &mut [u8],
        mut on_chunk: impl FnMut(usize),
    ) -> Result<usize, NfsError> {
        if (length as usize) > buf.len() {
            return Err(NfsError::InvalidState("buffer shorter than the requested read length".to_string()));
        }
        let canonical = normalize_path(path);
        let block_size = self.block_size()? as u64;
        let mut total = 0u64;

        while total < length {
            let want = ((length - total).min(block_size)) as u32;
            let chunk_offset = offset + total;
            let result = {
                let (engine, resolver) = self.parts_mounted()?;
                let (handle, _) = resolver.resolve(engine, &canonical).await?;
                match engine.read(&handle, chunk_offset, want).await {
                    Ok(result) => result,
                    Err(err) => match resolver.retry_stale(engine, &canonical, &err).await {
                        Some(Ok(fresh)) => engine.read(&fresh, chunk_offset, want).await?,
                        Some(Err(retry_err)) => return Err(retry_err),
                        None => return Err(err),
                    },
                }
            };
            let n = result.data.len();
            buf[total as usize..total as usize + n].copy_from_slice(&result.data);
            total += n as u64;
            on_chunk(n);
            if result.eof || n == 0 {
                break;
            }
        }
        Ok(total as usize)
    }

    /// `Write(path, offset, data)`: loops at most `block_size` bytes per RPC,
    /// then finalizes with [`Engine::complete_io`] (COMMIT on v3, CLOSE of
    /// the tracked open on v4.1, a no-op on v2).
    pub async fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> Result<usize, NfsError> {
        self.write_with_progress(path, offset, data, |_| {}).await
    }

    pub async fn write_with_progress(
        &mut self,
        path: &str,
        offset: u64,
        data: &[u8],
        mut on_chunk: impl FnMut(usize),
    ) -> Result<usize, NfsError> {
        let canonical = normalize_path(path);
        let block_size = self.block_size()? as usize;
        let mut total = 0usize;

        while total < data.len() {
            let end = (total + block_size).min(data.len());
            let chunk = &data[total..end];
            let chunk_offset = offset + total as u64;
            let written = {
                let (engine, resolver) = self.parts_mounted()?;
                let (handle, _) = resolver.resolve(engine, &canonical).await?;
                let written = match engine.write(&handle, chunk_offset, chunk).await {
                    Ok(written) => written,
                    Err(err) => match resolver.retry_stale(engine, &canonical, &err).await {
                        Some(Ok(fresh)) => engine.write(&fresh, chunk_offset, chunk).await?,
                        Some(Err(retry_err)) => return Err(retry_err),
                        None => return Err(err),
                    },
                };
                resolver.mark_size_stale(&canonical);
                written
            };
            total += written as usize;
            on_chunk(written as usize);
            if written == 0 {
                break;
            }
        }

        self.last_write = Some(canonical.clone());
        self.complete_io_for(&canonical).await?;
        Ok(total)
    }

    /// Streaming counterpart of [`Client::read`]: each chunk is written
    /// straight to `writer` instead of into a caller-owned buffer, and
    /// `cancel` is checked between chunks. A cancellation observed there
    /// stops before the next RPC and returns [`NfsError::Cancelled`] without
    /// flushing any further chunks; whatever has already reached `writer`
    /// stays there.
    pub async fn read_stream(
        &mut self,
        path: &str,
        offset: u64,
        length: u64,
        writer: &mut (impl AsyncWrite + Unpin),
        cancel: &CancelHandle,
    ) -> Result<usize, NfsError> {
        let canonical = normalize_path(path);
        let block_size = self.block_size()? as u64;
        let mut total = 0u64;

        while total < length {
            if cancel.is_cancelled() {
                return Err(NfsError::Cancelled);
            }
            let want = ((length - total).min(block_size)) as u32;
            let chunk_offset = offset + total;
            let result = {
                let (engine, resolver) = self.parts_mounted()?;
                let (handle, _) = resolver.resolve(engine, &canonical).await?;
                match engine.read(&handle, chunk_offset, want).await {
                    Ok(result) => result,
                    Err(err) => match resolver.retry_stale(engine, &canonical, &err).await {
                        Some(Ok(fresh)) => engine.read(&fresh, chunk_offset, want).await?,
                        Some(Err(retry_err)) => return Err(retry_err),
                        None => return Err(err),
                    },
                }
            };
            // The RPC above may already have been in flight when `cancel`
            // was requested; that is advisory, so its result is still
            // written out before the next cancellation check.
            let n = result.data.len();
            writer.write_all(&result.data).await.map_err(|e| NfsError::from_anyhow(e.into()))?;
            total += n as u64;
            if result.eof || n == 0 {
                break;
            }
        }
        writer.flush().await.map_err(|e| NfsError::from_anyhow(e.into()))?;
        Ok(total as usize)
    }

    /// Streaming counterpart of [`Client::write`]: chunks are pulled from
    /// `reader` (EOF ends the loop) instead of from a caller-owned slice.
    /// `cancel` is checked between chunks; on cancellation, no further
    /// chunks are read or sent, [`Client::complete_io`] is *not* invoked,
    /// and [`NfsError::Cancelled`] is returned - the server-side file is
    /// left exactly as the last successful chunk left it. A normal
    /// (non-cancelled) completion finalizes the write the same way
    /// [`Client::write`] does.
    pub async fn write_stream(
        &mut self,
        path: &str,
        offset: u64,
        reader: &mut (impl AsyncRead + Unpin),
        cancel: &CancelHandle,
    ) -> Result<usize, NfsError> {
        let canonical = normalize_path(path);
        let block_size = self.block_size()? as usize;
        let mut chunk = vec![0u8; block_size];
        let mut total = 0u64;

        loop {
            if cancel.is_cancelled() {
                return Err(NfsError::Cancelled);
            }
            let n = reader.read(&mut chunk).await.map_err(|e| NfsError::from_anyhow(e.into()))?;
            if n == 0 {
                break;
            }
            let chunk_offset = offset + total;
            let written = {
                let (engine, resolver) = self.parts_mounted()?;
                let (handle, _) = resolver.resolve(engine, &canonical).await?;
                let written = match engine.write(&handle, chunk_offset, &chunk[..n]).await {
                    Ok(written) => written,
                    Err(err) => match resolver.retry_stale(engine, &canonical, &err).await {
                        Some(Ok(fresh)) => engine.write(&fresh, chunk_offset, &chunk[..n]).await?,
                        Some(Err(retry_err)) => return Err(retry_err),
                        None => return Err(err),
                    },
                };
                resolver.mark_size_stale(&canonical);
                written
            };
            total += written as u64;
            if written == 0 || written as usize != n {
                break;
            }
        }

        self.last_write = Some(canonical.clone());
        self.complete_io_for(&canonical).await?;
        Ok(total as usize)
    }

    /// `Client.complete_io()`: finalizes the most recent `write`. A no-op if
    /// nothing is outstanding (the chunked write loop already finalizes on
    /// its own completion; this exists for a caller that wants to force it
    /// explicitly, or after a cancelled streaming write).
    pub async fn complete_io(&mut self) -> Result<(), NfsError> {
        match self.last_write.take() {
            Some(path) => self.complete_io_for(&path).await,
            None => Ok(()),
        }
    }

    async fn complete_io_for(&mut self, canonical: &str) -> Result<(), NfsError> {
        let (engine, resolver) = self.parts_mounted()?;
        let (handle, _) = resolver.resolve(engine, canonical).await?;
        engine.complete_io(&handle).await
    }
}

impl Drop for Client {
    /// `JoinHandle::drop` detaches rather than cancels, so a `Client` dropped
    /// without an explicit `disconnect` would otherwise leave the background
    /// sweeper running against a cache nothing can reach anymore. `Drop`
    /// cannot await, so it cannot run `unmount`/`engine.close()`'s RPCs - a
    /// caller that wants the server side released gracefully still has to
    /// call `disconnect` itself; this is only the fallback that stops the
    /// sweeper leaking.
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_either_separator() {
        assert_eq!(normalize_path("/a/b"), ".\\a\\b");
        assert_eq!(normalize_path("a\\b"), ".\\a\\b");
        assert_eq!(normalize_path("/"), ".");
        assert_eq!(normalize_path("."), ".");
    }

    #[test]
    fn combine_appends_components() {
        assert_eq!(combine(".", "a/b"), ".\\a\\b");
        assert_eq!(combine(".\\a", "b"), ".\\a\\b");
    }

    #[test]
    fn file_name_and_directory_name_split_the_last_component() {
        assert_eq!(file_name(".\\a\\b"), "b");
        assert_eq!(directory_name(".\\a\\b"), ".\\a");
        assert_eq!(directory_name(".\\a"), ".");
        assert_eq!(file_name("."), ".");
    }

    #[test]
    fn new_client_starts_disconnected_and_unmounted() {
        let client = Client::new(NfsVersion::V3);
        assert!(!client.is_connected());
        assert!(!client.is_mounted());
    }
}
