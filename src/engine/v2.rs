//! NFSv2 operation engine (RFC 1094), paired with MOUNT protocol version 1.
//!
//! RFC 1094 predates weak cache consistency data, 64-bit sizes, and an
//! explicit EOF flag on READ; this engine fills those gaps the same way the
//! RFC's own implementations did - a short read implies EOF, and offsets
//! truncate to 32 bits, the hard ceiling this version's wire format allows.

use std::io::Cursor;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{DirEntry, Engine, FileAttributes, FileHandle, FileType, ReadResult, V2_BLOCK_SIZE};
use crate::error::NfsError;
use crate::mount::MountClient;
use crate::protocol::rpc::tcp::TcpTransport;
use crate::protocol::rpc::{Credentials, Transport};
use crate::protocol::xdr::nfs2::{
    self, attrstat_ok, diropargs2, diropres_ok, fattr2, ftype2, sattr2, timeval2, CREATE2args, GETATTR2args,
    LINK2args, LOOKUP2args, NFSProgram, READ2args, READ2resok, READDIR2args, READDIR2resok, READLINK2args,
    REMOVE2args, RENAME2args, SETATTR2args, SYMLINK2args, WRITE2args,
};
use crate::protocol::xdr::{decode, XDR};

/// NFSv2-unchanged sentinel for `sattr2` fields, RFC 1094 section 2.3.6.
const UNSET: u32 = u32::MAX;

fn attrs_from_fattr2(a: &fattr2) -> FileAttributes {
    let file_type = match a.ftype {
        ftype2::NFREG => FileType::Regular,
        ftype2::NFDIR => FileType::Directory,
        ftype2::NFBLK => FileType::Block,
        ftype2::NFCHR => FileType::Char,
        ftype2::NFLNK => FileType::Symlink,
        ftype2::NFNON => FileType::None,
    };
    FileAttributes {
        file_type,
        mode: a.mode,
        size: a.size as u64,
        uid: a.uid,
        gid: a.gid,
        atime: a.atime.seconds as u64,
        mtime: a.mtime.seconds as u64,
        ctime: a.ctime.seconds as u64,
    }
}

fn to_fh2(h: &FileHandle) -> Result<nfs2::fhandle2, NfsError> {
    h.0.clone()
        .try_into()
        .map_err(|_| NfsError::Protocol("file handle is not a valid 32-byte v2 handle".to_string()))
}

fn decode_status(cursor: &mut Cursor<Vec<u8>>) -> Result<(), NfsError> {
    let status: nfs2::nfsstat2 = decode(cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
    if status != nfs2::nfsstat2::NFS_OK {
        return Err(NfsError::from(status));
    }
    Ok(())
}

/// Binds an NFSv2 connection: an NFS TCP transport plus the paired MOUNT
/// (version 1) client used for `mount`/`unmount`/`list_exports`.
pub struct Engine2 {
    nfs: TcpTransport,
    mount: MountClient,
    credentials: Credentials,
    export: Option<String>,
    root: Option<FileHandle>,
}

impl Engine2 {
    /// Opens the NFS and MOUNT transports; does not mount an export yet.
    pub async fn connect(
        nfs_addr: SocketAddr,
        mount_addr: SocketAddr,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, NfsError> {
        Self::connect_with(nfs_addr, mount_addr, credentials, timeout, false).await
    }

    /// As [`Engine2::connect`], optionally binding a local port below 1024
    /// first on both the NFS and MOUNT transports.
    pub async fn connect_with(
        nfs_addr: SocketAddr,
        mount_addr: SocketAddr,
        credentials: Credentials,
        timeout: Duration,
        use_privileged_port: bool,
    ) -> Result<Self, NfsError> {
        let nfs = TcpTransport::connect_with(nfs_addr, timeout, use_privileged_port)
            .await
            .map_err(NfsError::from_anyhow)?;
        let mount = MountClient::connect_with(
            mount_addr,
            crate::protocol::xdr::mount::VERSION1,
            timeout,
            use_privileged_port,
        )
        .await?;
        Ok(Self { nfs, mount, credentials, export: None, root: None })
    }

    async fn rpc<Arg: XDR>(&self, proc: NFSProgram, arg: &Arg) -> Result<Vec<u8>, NfsError> {
        let mut args = Vec::new();
        arg.serialize(&mut args).map_err(|e| NfsError::Xdr(e.to_string()))?;
        self.nfs
            .call(nfs2::PROGRAM, nfs2::VERSION, proc as u32, &self.credentials, &args)
            .await
            .map_err(NfsError::from_anyhow)
    }

    async fn dirop(&self, proc: NFSProgram, dir: &FileHandle, name: &str) -> Result<(), NfsError> {
        let args = diropargs2 { dir: to_fh2(dir)?, name: name.as_bytes().to_vec() };
        let reply = self.rpc(proc, &REMOVE2args { what: args }).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)
    }

    async fn create_like(
        &self,
        proc: NFSProgram,
        dir: &FileHandle,
        name: &str,
        mode: u32,
    ) -> Result<(FileHandle, FileAttributes), NfsError> {
        let args = CREATE2args {
            where_: diropargs2 { dir: to_fh2(dir)?, name: name.as_bytes().to_vec() },
            attributes: sattr2 {
                mode,
                uid: UNSET,
                gid: UNSET,
                size: 0,
                atime: timeval2 { seconds: UNSET, useconds: UNSET },
                mtime: timeval2 { seconds: UNSET, useconds: UNSET },
            },
        };
        let reply = self.rpc(proc, &args).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)?;
        let ok: diropres_ok = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        Ok((FileHandle(ok.file.to_vec()), attrs_from_fattr2(&ok.attributes)))
    }
}

#[async_trait]
impl Engine for Engine2 {
    async fn list_exports(&mut self) -> Result<Vec<String>, NfsError> {
        self.mount.export().await
    }

    async fn mount(&mut self, export: &str) -> Result<FileHandle, NfsError> {
        let handle = self.mount.mnt(export).await?;
        self.export = Some(export.to_string());
        let handle = FileHandle(handle);
        self.root = Some(handle.clone());
        Ok(handle)
    }

    async fn unmount(&mut self) -> Result<(), NfsError> {
        if let Some(export) = self.export.take() {
            self.mount.umnt(&export).await?;
        }
        self.root = None;
        Ok(())
    }

    async fn lookup(&mut self, dir: &FileHandle, name: &str) -> Result<(FileHandle, FileAttributes), NfsError> {
        let args = LOOKUP2args { what: diropargs2 { dir: to_fh2(dir)?, name: name.as_bytes().to_vec() } };
        let reply = self.rpc(NFSProgram::NFSPROC_LOOKUP, &args).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)?;
        let ok: diropres_ok = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        Ok((FileHandle(ok.file.to_vec()), attrs_from_fattr2(&ok.attributes)))
    }

    async fn getattr(&mut self, handle: &FileHandle) -> Result<FileAttributes, NfsError> {
        let args = GETATTR2args { fhandle: to_fh2(handle)? };
        let reply = self.rpc(NFSProgram::NFSPROC_GETATTR, &args).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)?;
        let ok: attrstat_ok = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        Ok(attrs_from_fattr2(&ok.attributes))
    }

    async fn read_dir(&mut self, dir: &FileHandle) -> Result<Vec<DirEntry>, NfsError> {
        let mut entries = Vec::new();
        let mut cookie = 0u32;
        loop {
            let args = READDIR2args { dir: to_fh2(dir)?, cookie, count: nfs2::MAXDATA };
            let reply = self.rpc(NFSProgram::NFSPROC_READDIR, &args).await?;
            let mut cursor = Cursor::new(reply);
            decode_status(&mut cursor)?;
            let ok: READDIR2resok = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
            let eof = ok.eof;
            for e in &ok.entries {
                cookie = e.cookie;
                entries.push(DirEntry {
                    name: String::from_utf8_lossy(&e.name).into_owned(),
                    cookie: e.cookie as u64,
                });
            }
            if eof {
                break;
            }
        }
        Ok(entries)
    }

    async fn read(&mut self, handle: &FileHandle, offset: u64, count: u32) -> Result<ReadResult, NfsError> {
        let args = READ2args { file: to_fh2(handle)?, offset: offset as u32, count, total_count: count };
        let reply = self.rpc(NFSProgram::NFSPROC_READ, &args).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)?;
        let ok: READ2resok = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        // RFC 1094 READ carries no explicit EOF flag; a short read is the
        // only signal this version of the wire format gives.
        let eof = (ok.data.len() as u32) < count;
        Ok(ReadResult { data: ok.data, eof })
    }

    async fn write(&mut self, handle: &FileHandle, offset: u64, data: &[u8]) -> Result<u32, NfsError> {
        let args = WRITE2args {
            begin_offset: 0,
            file: to_fh2(handle)?,
            offset: offset as u32,
            total_count: data.len() as u32,
            data: data.to_vec(),
        };
        let reply = self.rpc(NFSProgram::NFSPROC_WRITE, &args).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)?;
        let _ok: attrstat_ok = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        Ok(data.len() as u32)
    }

    async fn create(&mut self, dir: &FileHandle, name: &str, mode: u32) -> Result<(FileHandle, FileAttributes), NfsError> {
        self.create_like(NFSProgram::NFSPROC_CREATE, dir, name, mode).await
    }

    async fn mkdir(&mut self, dir: &FileHandle, name: &str, mode: u32) -> Result<(FileHandle, FileAttributes), NfsError> {
        self.create_like(NFSProgram::NFSPROC_MKDIR, dir, name, mode).await
    }

    async fn remove(&mut self, dir: &FileHandle, name: &str) -> Result<(), NfsError> {
        self.dirop(NFSProgram::NFSPROC_REMOVE, dir, name).await
    }

    async fn rmdir(&mut self, dir: &FileHandle, name: &str) -> Result<(), NfsError> {
        self.dirop(NFSProgram::NFSPROC_RMDIR, dir, name).await
    }

    async fn rename(
        &mut self,
        from_dir: &FileHandle,
        from_name: &str,
        to_dir: &FileHandle,
        to_name: &str,
    ) -> Result<(), NfsError> {
        let args = RENAME2args {
            from: diropargs2 { dir: to_fh2(from_dir)?, name: from_name.as_bytes().to_vec() },
            to: diropargs2 { dir: to_fh2(to_dir)?, name: to_name.as_bytes().to_vec() },
        };
        let reply = self.rpc(NFSProgram::NFSPROC_RENAME, &args).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)
    }

    async fn set_size(&mut self, handle: &FileHandle, size: u64) -> Result<(), NfsError> {
        let args = SETATTR2args {
            fhandle: to_fh2(handle)?,
            attributes: sattr2 {
                mode: UNSET,
                uid: UNSET,
                gid: UNSET,
                size: size as u32,
                atime: timeval2 { seconds: UNSET, useconds: UNSET },
                mtime: timeval2 { seconds: UNSET, useconds: UNSET },
            },
        };
        let reply = self.rpc(NFSProgram::NFSPROC_SETATTR, &args).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)?;
        let _ok: attrstat_ok = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        Ok(())
    }

    async fn symlink(&mut self, dir: &FileHandle, name: &str, target: &str) -> Result<(FileHandle, FileAttributes), NfsError> {
        let args = SYMLINK2args {
            from: diropargs2 { dir: to_fh2(dir)?, name: name.as_bytes().to_vec() },
            to: target.as_bytes().to_vec(),
            attributes: sattr2::default(),
        };
        let reply = self.rpc(NFSProgram::NFSPROC_SYMLINK, &args).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)?;
        // RFC 1094 SYMLINK returns only a status; the new handle is fetched
        // with a follow-up LOOKUP, same as a caller would have to do.
        self.lookup(dir, name).await
    }

    async fn readlink(&mut self, handle: &FileHandle) -> Result<String, NfsError> {
        let args = READLINK2args { fhandle: to_fh2(handle)? };
        let reply = self.rpc(NFSProgram::NFSPROC_READLINK, &args).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)?;
        let path: Vec<u8> = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        Ok(String::from_utf8_lossy(&path).into_owned())
    }

    async fn link(&mut self, dir: &FileHandle, name: &str, target: &FileHandle) -> Result<(), NfsError> {
        let args = LINK2args {
            from: to_fh2(target)?,
            to: diropargs2 { dir: to_fh2(dir)?, name: name.as_bytes().to_vec() },
        };
        let reply = self.rpc(NFSProgram::NFSPROC_LINK, &args).await?;
        let mut cursor = Cursor::new(reply);
        decode_status(&mut cursor)
    }

    async fn complete_io(&mut self, _handle: &FileHandle) -> Result<(), NfsError> {
        // RFC 1094 has no deferred-commit concept; every WRITE is already durable.
        Ok(())
    }

    fn block_size(&self) -> u32 {
        V2_BLOCK_SIZE
    }

    fn root_handle(&self) -> Option<&FileHandle> {
        self.root.as_ref()
    }
}
