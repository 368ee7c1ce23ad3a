//! NFSv3 operation engine (RFC 1813), paired with MOUNT protocol version 3.
//!
//! Most NFSv3 replies share one shape - a status, then either an `ok` or a
//! `fail` body - captured once by [`Nfs3Result`] and reused here by type
//! alias instead of hand-rolled per-procedure unions.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{negotiate_v3_block_size, DirEntry, Engine, FileAttributes, FileHandle, FileType, ReadResult};
use crate::error::NfsError;
use crate::mount::MountClient;
use crate::protocol::rpc::tcp::TcpTransport;
use crate::protocol::rpc::{Credentials, Transport};
use crate::protocol::xdr::nfs3::dir::{
    MkdirLikeResfail, MkdirLikeResok, MKDIR3args, READDIR3args, READDIR3res, READDIR3resok, SYMLINK3args,
    SYMLINK3res,
};
use crate::protocol::xdr::nfs3::file::{
    stable_how, COMMIT3args, COMMIT3res, LINK3args, LINK3res, READ3args, READ3res, WRITE3args, WRITE3res,
};
use crate::protocol::xdr::nfs3::fs::{FsObjArgs, FSINFO3res};
use crate::protocol::xdr::nfs3::{
    self, createhow3, diropargs3, fattr3, ftype3, nfs_fh3, post_op_attr, sattr3, sattrguard3, set_mode3, set_size3,
    symlinkdata3, GETATTR3args, GETATTR3res, GETATTR3resok, LOOKUP3args, LOOKUP3res, Nfs3Result, READLINK3args,
    READLINK3res, REMOVE3args, REMOVE3res, RENAME3args, RENAME3res, RMDIR3args, RMDIR3res, SETATTR3args,
    SETATTR3resok,
};
use crate::protocol::xdr::XDR;

fn attrs_from_fattr3(a: &fattr3) -> FileAttributes {
    let file_type = match a.ftype {
        ftype3::NF3REG => FileType::Regular,
        ftype3::NF3DIR => FileType::Directory,
        ftype3::NF3BLK => FileType::Block,
        ftype3::NF3CHR => FileType::Char,
        ftype3::NF3LNK => FileType::Symlink,
        ftype3::NF3SOCK => FileType::Socket,
        ftype3::NF3FIFO => FileType::Fifo,
    };
    FileAttributes {
        file_type,
        mode: a.mode,
        size: a.size,
        uid: a.uid,
        gid: a.gid,
        atime: a.atime.seconds as u64,
        mtime: a.mtime.seconds as u64,
        ctime: a.ctime.seconds as u64,
    }
}

fn attrs_from_post_op(a: &post_op_attr) -> FileAttributes {
    a.attr().map(attrs_from_fattr3).unwrap_or_default()
}

fn to_fh3(h: &FileHandle) -> nfs_fh3 {
    nfs_fh3 { data: h.0.clone() }
}

fn from_fh3(fh: &nfs_fh3) -> FileHandle {
    FileHandle(fh.data.clone())
}

/// Binds an NFSv3 connection: an NFS TCP transport plus the paired MOUNT
/// (version 3) client, and the block size FSINFO negotiated at mount time.
pub struct Engine3 {
    nfs: TcpTransport,
    mount: MountClient,
    credentials: Credentials,
    export: Option<String>,
    root: Option<FileHandle>,
    block_size: u32,
}

impl Engine3 {
    /// Opens the NFS and MOUNT transports; does not mount an export yet.
    pub async fn connect(
        nfs_addr: SocketAddr,
        mount_addr: SocketAddr,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, NfsError> {
        Self::connect_with(nfs_addr, mount_addr, credentials, timeout, false).await
    }

    /// As [`Engine3::connect`], optionally binding a local port below 1024
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
            crate::protocol::xdr::mount::VERSION,
            timeout,
            use_privileged_port,
        )
        .await?;
        Ok(Self { nfs, mount, credentials, export: None, root: None, block_size: negotiate_v3_block_size(8192, 8192) })
    }

    async fn rpc<Arg: XDR, Res: XDR + Default>(&self, proc: nfs3::NFSProgram, arg: &Arg) -> Result<Res, NfsError> {
        let mut args = Vec::new();
        arg.serialize(&mut args).map_err(|e| NfsError::Xdr(e.to_string()))?;
        let reply = self
            .nfs
            .call(nfs3::PROGRAM, nfs3::VERSION, proc as u32, &self.credentials, &args)
            .await
            .map_err(NfsError::from_anyhow)?;
        let mut cursor = std::io::Cursor::new(reply);
        crate::protocol::xdr::decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))
    }

    async fn negotiate_block_size(&mut self) -> Result<(), NfsError> {
        let root = self.root.clone().ok_or_else(|| NfsError::InvalidState("not mounted".to_string()))?;
        let args = FsObjArgs { fsroot: to_fh3(&root) };
        let res: FSINFO3res = self.rpc(nfs3::NFSProgram::NFSPROC3_FSINFO, &args).await?;
        let info = res.into_result().map_err(NfsError::from)?;
        self.block_size = negotiate_v3_block_size(info.rtpref, info.wtpref);
        Ok(())
    }
}

#[async_trait]
impl Engine for Engine3 {
    async fn list_exports(&mut self) -> Result<Vec<String>, NfsError> {
        self.mount.export().await
    }

    async fn mount(&mut self, export: &str) -> Result<FileHandle, NfsError> {
        let handle = self.mount.mnt(export).await?;
        self.export = Some(export.to_string());
        let handle = FileHandle(handle);
        self.root = Some(handle.clone());
        self.negotiate_block_size().await?;
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
        let args = LOOKUP3args { what: diropargs3 { dir: to_fh3(dir), name: name.into() } };
        let res: LOOKUP3res = self.rpc(nfs3::NFSProgram::NFSPROC3_LOOKUP, &args).await?;
        let ok = res.into_result().map_err(NfsError::from)?;
        Ok((from_fh3(&ok.object), attrs_from_post_op(&ok.obj_attributes)))
    }

    async fn getattr(&mut self, handle: &FileHandle) -> Result<FileAttributes, NfsError> {
        let args = GETATTR3args { object: to_fh3(handle) };
        let res: GETATTR3res = self.rpc(nfs3::NFSProgram::NFSPROC3_GETATTR, &args).await?;
        let ok: GETATTR3resok = res.into_result().map_err(NfsError::from)?;
        Ok(attrs_from_fattr3(&ok.obj_attributes))
    }

    async fn read_dir(&mut self, dir: &FileHandle) -> Result<Vec<DirEntry>, NfsError> {
        let mut entries = Vec::new();
        let mut cookie = 0u64;
        let mut cookieverf = [0u8; nfs3::NFS3_COOKIEVERFSIZE as usize];
        loop {
            let args = READDIR3args { dir: to_fh3(dir), cookie, cookieverf, dircount: 8192 };
            let res: READDIR3res = self.rpc(nfs3::NFSProgram::NFSPROC3_READDIR, &args).await?;
            let ok: READDIR3resok = res.into_result().map_err(NfsError::from)?;
            cookieverf = ok.cookieverf;
            for e in &ok.reply.entries {
                cookie = e.cookie;
                entries.push(DirEntry { name: e.name.to_string(), cookie: e.cookie });
            }
            if ok.reply.eof {
                break;
            }
        }
        Ok(entries)
    }

    async fn read(&mut self, handle: &FileHandle, offset: u64, count: u32) -> Result<ReadResult, NfsError> {
        let args = READ3args { file: to_fh3(handle), offset, count };
        let res: READ3res = self.rpc(nfs3::NFSProgram::NFSPROC3_READ, &args).await?;
        let ok = res.into_result().map_err(NfsError::from)?;
        Ok(ReadResult { data: ok.data, eof: ok.eof })
    }

    async fn write(&mut self, handle: &FileHandle, offset: u64, data: &[u8]) -> Result<u32, NfsError> {
        let args = WRITE3args {
            file: to_fh3(handle),
            offset,
            count: data.len() as u32,
            stable: stable_how::UNSTABLE as u32,
            data: data.to_vec(),
        };
        let res: WRITE3res = self.rpc(nfs3::NFSProgram::NFSPROC3_WRITE, &args).await?;
        let ok = res.into_result().map_err(NfsError::from)?;
        Ok(ok.count)
    }

    async fn create(&mut self, dir: &FileHandle, name: &str, mode: u32) -> Result<(FileHandle, FileAttributes), NfsError> {
        let how = createhow3::UNCHECKED(sattr3 {
            mode: set_mode3::mode(mode),
            size: set_size3::size(0),
            ..sattr3::default()
        });
        let args = nfs3::CREATE3args { where_: diropargs3 { dir: to_fh3(dir), name: name.into() }, how };
        let res: nfs3::CREATE3res = self.rpc(nfs3::NFSProgram::NFSPROC3_CREATE, &args).await?;
        let ok = res.into_result().map_err(NfsError::from)?;
        match ok.obj {
            nfs3::post_op_fh3::handle(fh) => Ok((from_fh3(&fh), attrs_from_post_op(&ok.obj_attributes))),
            nfs3::post_op_fh3::Void => self.lookup(dir, name).await,
        }
    }

    async fn mkdir(&mut self, dir: &FileHandle, name: &str, mode: u32) -> Result<(FileHandle, FileAttributes), NfsError> {
        let args = MKDIR3args {
            dirops: diropargs3 { dir: to_fh3(dir), name: name.into() },
            attributes: sattr3 { mode: set_mode3::mode(mode), ..sattr3::default() },
        };
        let res: Nfs3Result<MkdirLikeResok, MkdirLikeResfail> = self.rpc(nfs3::NFSProgram::NFSPROC3_MKDIR, &args).await?;
        let ok = res.into_result().map_err(NfsError::from)?;
        match ok.obj {
            nfs3::post_op_fh3::handle(fh) => Ok((from_fh3(&fh), attrs_from_post_op(&ok.obj_attributes))),
            nfs3::post_op_fh3::Void => self.lookup(dir, name).await,
        }
    }

    async fn remove(&mut self, dir: &FileHandle, name: &str) -> Result<(), NfsError> {
        let args = REMOVE3args { object: diropargs3 { dir: to_fh3(dir), name: name.into() } };
        let res: REMOVE3res = self.rpc(nfs3::NFSProgram::NFSPROC3_REMOVE, &args).await?;
        res.into_result().map(|_| ()).map_err(NfsError::from)
    }

    async fn rmdir(&mut self, dir: &FileHandle, name: &str) -> Result<(), NfsError> {
        let args = RMDIR3args { object: diropargs3 { dir: to_fh3(dir), name: name.into() } };
        let res: RMDIR3res = self.rpc(nfs3::NFSProgram::NFSPROC3_RMDIR, &args).await?;
        res.into_result().map(|_| ()).map_err(NfsError::from)
    }

    async fn rename(
        &mut self,
        from_dir: &FileHandle,
        from_name: &str,
        to_dir: &FileHandle,
        to_name: &str,
    ) -> Result<(), NfsError> {
        let args = RENAME3args {
            from: diropargs3 { dir: to_fh3(from_dir), name: from_name.into() },
            to: diropargs3 { dir: to_fh3(to_dir), name: to_name.into() },
        };
        let res: RENAME3res = self.rpc(nfs3::NFSProgram::NFSPROC3_RENAME, &args).await?;
        res.into_result().map(|_| ()).map_err(NfsError::from)
    }

    async fn set_size(&mut self, handle: &FileHandle, size: u64) -> Result<(), NfsError> {
        let args = SETATTR3args {
            object: to_fh3(handle),
            new_attribute: sattr3 { size: set_size3::size(size), ..sattr3::default() },
            guard: sattrguard3::Void,
        };
        let res: Nfs3Result<SETATTR3resok, SETATTR3resok> = self.rpc(nfs3::NFSProgram::NFSPROC3_SETATTR, &args).await?;
        res.into_result().map(|_| ()).map_err(NfsError::from)
    }

    async fn symlink(&mut self, dir: &FileHandle, name: &str, target: &str) -> Result<(FileHandle, FileAttributes), NfsError> {
        let args = SYMLINK3args {
            dirops: diropargs3 { dir: to_fh3(dir), name: name.into() },
            symlink: symlinkdata3 { symlink_attributes: sattr3::default(), symlink_data: target.into() },
        };
        let res: SYMLINK3res = self.rpc(nfs3::NFSProgram::NFSPROC3_SYMLINK, &args).await?;
        let ok = res.into_result().map_err(NfsError::from)?;
        match ok.obj {
            nfs3::post_op_fh3::handle(fh) => Ok((from_fh3(&fh), attrs_from_post_op(&ok.obj_attributes))),
            nfs3::post_op_fh3::Void => self.lookup(dir, name).await,
        }
    }

    async fn readlink(&mut self, handle: &FileHandle) -> Result<String, NfsError> {
        let args = READLINK3args { symlink: to_fh3(handle) };
        let res: READLINK3res = self.rpc(nfs3::NFSProgram::NFSPROC3_READLINK, &args).await?;
        let ok = res.into_result().map_err(NfsError::from)?;
        Ok(ok.data.to_string())
    }

    async fn link(&mut self, dir: &FileHandle, name: &str, target: &FileHandle) -> Result<(), NfsError> {
        let args = LINK3args { file: to_fh3(target), link: diropargs3 { dir: to_fh3(dir), name: name.into() } };
        let res: LINK3res = self.rpc(nfs3::NFSProgram::NFSPROC3_LINK, &args).await?;
        res.into_result().map(|_| ()).map_err(NfsError::from)
    }

    async fn complete_io(&mut self, handle: &FileHandle) -> Result<(), NfsError> {
        let args = COMMIT3args { file: to_fh3(handle), offset: 0, count: 0 };
        let res: COMMIT3res = self.rpc(nfs3::NFSProgram::NFSPROC3_COMMIT, &args).await?;
        res.into_result().map(|_| ()).map_err(NfsError::from)
    }

    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn root_handle(&self) -> Option<&FileHandle> {
        self.root.as_ref()
    }
}
