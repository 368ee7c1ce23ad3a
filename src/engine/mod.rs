//! The per-version operation engines behind the façade.
//!
//! The teacher's server dispatches incoming calls to a per-program handler;
//! here the direction is reversed but the shape survives - one small trait
//! names the operations a connection needs (connect, mount, lookup, read,
//! write, ...) and three concrete engines implement it, one per wire version.
//! [`NfsEngine`] is the tagged union the façade actually holds: a `V2`/`V3`/`V4`
//! class hierarchy would share only the trait's signatures and none of the
//! state, so composition inside each engine replaces inheritance of it.

pub mod v2;
pub mod v3;
pub mod v4;

use async_trait::async_trait;

use crate::error::NfsError;

/// Server-opaque identifier for a file or directory. Durable across one
/// connection; invalidated by deletion or server restart (`STALE`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FileHandle(pub Vec<u8>);

/// File type, collapsed from the three wire versions' `ftype2`/`ftype3`/
/// `nfs_ftype4` enums into one version-independent set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FileType {
    #[default]
    Regular,
    Directory,
    Symlink,
    Block,
    Char,
    Socket,
    Fifo,
    /// NFSv2's `NFNON`: type unknown or not reported.
    None,
}

/// An immutable snapshot of an object's attributes, as produced by LOOKUP or
/// GETATTR, version-independent per the data model.
#[derive(Clone, Debug, Default)]
pub struct FileAttributes {
    pub file_type: FileType,
    pub mode: u32,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    /// Seconds since the Unix epoch
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
}

/// One entry from a directory listing: a name and the opaque cookie needed
/// to resume a READDIR after it.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: String,
    pub cookie: u64,
}

/// The outcome of one READ call.
#[derive(Clone, Debug)]
pub struct ReadResult {
    pub data: Vec<u8>,
    pub eof: bool,
}

/// The "things the engine must do" contract, implemented once per wire
/// version. Every method is a single RPC (v2/v3) or a short COMPOUND
/// sequence (v4.1); composing those into the chunked, path-resolving
/// operations callers actually want is the façade's job, not the engine's.
#[async_trait]
pub trait Engine: Send + Sync {
    /// `MOUNT.EXPORT`: lists the exports this server offers. v4.1 has no
    /// separate export list; it returns the single mounted pseudo-root.
    async fn list_exports(&mut self) -> Result<Vec<String>, NfsError>;

    /// Resolves `export` to a root file handle and stores it as current.
    async fn mount(&mut self, export: &str) -> Result<FileHandle, NfsError>;

    /// Releases the mount. v2/v3 call `MOUNT.UMNT`; v4.1 is a no-op (there is
    /// no mount state on the wire to release).
    async fn unmount(&mut self) -> Result<(), NfsError>;

    /// LOOKUP one path component within `dir`.
    async fn lookup(&mut self, dir: &FileHandle, name: &str) -> Result<(FileHandle, FileAttributes), NfsError>;

    /// GETATTR on `handle`.
    async fn getattr(&mut self, handle: &FileHandle) -> Result<FileAttributes, NfsError>;

    /// Reads one batch of directory entries, looping internally over cookie
    /// continuation until EOF.
    async fn read_dir(&mut self, dir: &FileHandle) -> Result<Vec<DirEntry>, NfsError>;

    /// One READ, at most `count` bytes.
    async fn read(&mut self, handle: &FileHandle, offset: u64, count: u32) -> Result<ReadResult, NfsError>;

    /// One WRITE (unstable on v2/v3; stateful on v4.1 - see [`Engine::complete_io`]).
    async fn write(&mut self, handle: &FileHandle, offset: u64, data: &[u8]) -> Result<u32, NfsError>;

    /// Creates a regular file, mode UNCHECKED (v3) / OPEN4_CREATE+UNCHECKED4 (v4.1).
    async fn create(&mut self, dir: &FileHandle, name: &str, mode: u32) -> Result<(FileHandle, FileAttributes), NfsError>;

    async fn mkdir(&mut self, dir: &FileHandle, name: &str, mode: u32) -> Result<(FileHandle, FileAttributes), NfsError>;

    async fn remove(&mut self, dir: &FileHandle, name: &str) -> Result<(), NfsError>;

    async fn rmdir(&mut self, dir: &FileHandle, name: &str) -> Result<(), NfsError>;

    async fn rename(
        &mut self,
        from_dir: &FileHandle,
        from_name: &str,
        to_dir: &FileHandle,
        to_name: &str,
    ) -> Result<(), NfsError>;

    /// SETATTR with only `size` dirty; every other field is left unset,
    /// using whichever "unset" encoding the wire version requires.
    async fn set_size(&mut self, handle: &FileHandle, size: u64) -> Result<(), NfsError>;

    async fn symlink(&mut self, dir: &FileHandle, name: &str, target: &str) -> Result<(FileHandle, FileAttributes), NfsError>;

    async fn readlink(&mut self, handle: &FileHandle) -> Result<String, NfsError>;

    async fn link(&mut self, dir: &FileHandle, name: &str, target: &FileHandle) -> Result<(), NfsError>;

    /// Finalizes outstanding writes: COMMIT on v3, CLOSE of the tracked open
    /// stateid on v4.1, a no-op on v2 (which has no deferred-commit concept).
    async fn complete_io(&mut self, handle: &FileHandle) -> Result<(), NfsError>;

    /// The negotiated maximum READ/WRITE payload size for this connection.
    fn block_size(&self) -> u32;

    /// The root handle obtained by the last successful `mount`, if any.
    fn root_handle(&self) -> Option<&FileHandle>;

    /// Best-effort teardown of connection-scoped server state beyond the
    /// mount itself: a no-op on v2/v3 (there is none), `DESTROY_SESSION` on
    /// v4.1. Called once by the façade on disconnect, never retried.
    async fn close(&mut self) -> Result<(), NfsError> {
        Ok(())
    }
}

/// The tagged-union engine REDESIGN FLAGS calls for in place of an
/// `INfsClient -> INFS -> NFSProtocolBase -> NFSvN` inheritance chain: the
/// façade holds one of these and forwards every [`Engine`] method through
/// whichever variant it is.
pub enum NfsEngine {
    V2(v2::Engine2),
    V3(v3::Engine3),
    V4(v4::Engine4),
}

#[async_trait]
impl Engine for NfsEngine {
    async fn list_exports(&mut self) -> Result<Vec<String>, NfsError> {
        match self {
            NfsEngine::V2(e) => e.list_exports().await,
            NfsEngine::V3(e) => e.list_exports().await,
            NfsEngine::V4(e) => e.list_exports().await,
        }
    }

    async fn mount(&mut self, export: &str) -> Result<FileHandle, NfsError> {
        match self {
            NfsEngine::V2(e) => e.mount(export).await,
            NfsEngine::V3(e) => e.mount(export).await,
            NfsEngine::V4(e) => e.mount(export).await,
        }
    }

    async fn unmount(&mut self) -> Result<(), NfsError> {
        match self {
            NfsEngine::V2(e) => e.unmount().await,
            NfsEngine::V3(e) => e.unmount().await,
            NfsEngine::V4(e) => e.unmount().await,
        }
    }

    async fn lookup(&mut self, dir: &FileHandle, name: &str) -> Result<(FileHandle, FileAttributes), NfsError> {
        match self {
            NfsEngine::V2(e) => e.lookup(dir, name).await,
            NfsEngine::V3(e) => e.lookup(dir, name).await,
            NfsEngine::V4(e) => e.lookup(dir, name).await,
        }
    }

    async fn getattr(&mut self, handle: &FileHandle) -> Result<FileAttributes, NfsError> {
        match self {
            NfsEngine::V2(e) => e.getattr(handle).await,
            NfsEngine::V3(e) => e.getattr(handle).await,
            NfsEngine::V4(e) => e.getattr(handle).await,
        }
    }

    async fn read_dir(&mut self, dir: &FileHandle) -> Result<Vec<DirEntry>, NfsError> {
        match self {
            NfsEngine::V2(e) => e.read_dir(dir).await,
            NfsEngine::V3(e) => e.read_dir(dir).await,
            NfsEngine::V4(e) => e.read_dir(dir).await,
        }
    }

    async fn read(&mut self, handle: &FileHandle, offset: u64, count: u32) -> Result<ReadResult, NfsError> {
        match self {
            NfsEngine::V2(e) => e.read(handle, offset, count).await,
            NfsEngine::V3(e) => e.read(handle, offset, count).await,
            NfsEngine::V4(e) => e.read(handle, offset, count).await,
        }
    }

    async fn write(&mut self, handle: &FileHandle, offset: u64, data: &[u8]) -> Result<u32, NfsError> {
        match self {
            NfsEngine::V2(e) => e.write(handle, offset, data).await,
            NfsEngine::V3(e) => e.write(handle, offset, data).await,
            NfsEngine::V4(e) => e.write(handle, offset, data).await,
        }
    }

    async fn create(&mut self, dir: &FileHandle, name: &str, mode: u32) -> Result<(FileHandle, FileAttributes), NfsError> {
        match self {
            NfsEngine::V2(e) => e.create(dir, name, mode).await,
            NfsEngine::V3(e) => e.create(dir, name, mode).await,
            NfsEngine::V4(e) => e.create(dir, name, mode).await,
        }
    }

    async fn mkdir(&mut self, dir: &FileHandle, name: &str, mode: u32) -> Result<(FileHandle, FileAttributes), NfsError> {
        match self {
            NfsEngine::V2(e) => e.mkdir(dir, name, mode).await,
            NfsEngine::V3(e) => e.mkdir(dir, name, mode).await,
            NfsEngine::V4(e) => e.mkdir(dir, name, mode).await,
        }
    }

    async fn remove(&mut self, dir: &FileHandle, name: &str) -> Result<(), NfsError> {
        match self {
            NfsEngine::V2(e) => e.remove(dir, name).await,
            NfsEngine::V3(e) => e.remove(dir, name).await,
            NfsEngine::V4(e) => e.remove(dir, name).await,
        }
    }

    async fn rmdir(&mut self, dir: &FileHandle, name: &str) -> Result<(), NfsError> {
        match self {
            NfsEngine::V2(e) => e.rmdir(dir, name).await,
            NfsEngine::V3(e) => e.rmdir(dir, name).await,
            NfsEngine::V4(e) => e.rmdir(dir, name).await,
        }
    }

    async fn rename(
        &mut self,
        from_dir: &FileHandle,
        from_name: &str,
        to_dir: &FileHandle,
        to_name: &str,
    ) -> Result<(), NfsError> {
        match self {
            NfsEngine::V2(e) => e.rename(from_dir, from_name, to_dir, to_name).await,
            NfsEngine::V3(e) => e.rename(from_dir, from_name, to_dir, to_name).await,
            NfsEngine::V4(e) => e.rename(from_dir, from_name, to_dir, to_name).await,
        }
    }

    async fn set_size(&mut self, handle: &FileHandle, size: u64) -> Result<(), NfsError> {
        match self {
            NfsEngine::V2(e) => e.set_size(handle, size).await,
            NfsEngine::V3(e) => e.set_size(handle, size).await,
            NfsEngine::V4(e) => e.set_size(handle, size).await,
        }
    }

    async fn symlink(&mut self, dir: &FileHandle, name: &str, target: &str) -> Result<(FileHandle, FileAttributes), NfsError> {
        match self {
            NfsEngine::V2(e) => e.symlink(dir, name, target).await,
            NfsEngine::V3(e) => e.symlink(dir, name, target).await,
            NfsEngine::V4(e) => e.symlink(dir, name, target).await,
        }
    }

    async fn readlink(&mut self, handle: &FileHandle) -> Result<String, NfsError> {
        match self {
            NfsEngine::V2(e) => e.readlink(handle).await,
            NfsEngine::V3(e) => e.readlink(handle).await,
            NfsEngine::V4(e) => e.readlink(handle).await,
        }
    }

    async fn link(&mut self, dir: &FileHandle, name: &str, target: &FileHandle) -> Result<(), NfsError> {
        match self {
            NfsEngine::V2(e) => e.link(dir, name, target).await,
            NfsEngine::V3(e) => e.link(dir, name, target).await,
            NfsEngine::V4(e) => e.link(dir, name, target).await,
        }
    }

    async fn complete_io(&mut self, handle: &FileHandle) -> Result<(), NfsError> {
        match self {
            NfsEngine::V2(e) => e.complete_io(handle).await,
            NfsEngine::V3(e) => e.complete_io(handle).await,
            NfsEngine::V4(e) => e.complete_io(handle).await,
        }
    }

    fn block_size(&self) -> u32 {
        match self {
            NfsEngine::V2(e) => e.block_size(),
            NfsEngine::V3(e) => e.block_size(),
            NfsEngine::V4(e) => e.block_size(),
        }
    }

    fn root_handle(&self) -> Option<&FileHandle> {
        match self {
            NfsEngine::V2(e) => e.root_handle(),
            NfsEngine::V3(e) => e.root_handle(),
            NfsEngine::V4(e) => e.root_handle(),
        }
    }

    async fn close(&mut self) -> Result<(), NfsError> {
        match self {
            NfsEngine::V2(e) => e.close().await,
            NfsEngine::V3(e) => e.close().await,
            NfsEngine::V4(e) => e.close().await,
        }
    }
}

/// v2's fixed block size (RFC 1094 places no FSINFO-equivalent negotiation).
pub const V2_BLOCK_SIZE: u32 = 8064;
/// Clamp bounds applied to v3's FSINFO-derived block size.
pub const V3_BLOCK_SIZE_MIN: u32 = 8000;
pub const V3_BLOCK_SIZE_MAX: u32 = 65336;

/// `min(rtpref, wtpref) - 200`, clamped to `[V3_BLOCK_SIZE_MIN, V3_BLOCK_SIZE_MAX]`.
pub fn negotiate_v3_block_size(rtpref: u32, wtpref: u32) -> u32 {
    let preferred = rtpref.min(wtpref).saturating_sub(200);
    preferred.clamp(V3_BLOCK_SIZE_MIN, V3_BLOCK_SIZE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v3_block_size_clamps_low() {
        assert_eq!(negotiate_v3_block_size(100, 100), V3_BLOCK_SIZE_MIN);
    }

    #[test]
    fn v3_block_size_clamps_high() {
        assert_eq!(negotiate_v3_block_size(1_000_000, 1_000_000), V3_BLOCK_SIZE_MAX);
    }

    #[test]
    fn v3_block_size_typical() {
        assert_eq!(negotiate_v3_block_size(65536, 65536), 65336);
    }
}
