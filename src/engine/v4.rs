//! NFSv4.1 operation engine (RFC 5661), a single `COMPOUND` procedure carrying
//! short sequences of operations instead of v2/v3's one-procedure-per-call
//! model. Session establishment (`EXCHANGE_ID`/`CREATE_SESSION`/
//! `RECLAIM_COMPLETE`) and the per-slot `SEQUENCE` that must lead every
//! subsequent `COMPOUND` are this engine's own bookkeeping; v2/v3 have
//! nothing analogous.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{DirEntry, Engine, FileAttributes, FileHandle, FileType, ReadResult};
use crate::error::NfsError;
use crate::protocol::rpc::tcp::TcpTransport;
use crate::protocol::rpc::{Credentials, Transport};
use crate::protocol::xdr::nfs4::{
    self, bitmap4, bitmap4_get, bitmap4_set, clientid4, createhow4, createmode4, createtype4, fattr4,
    nfs_ftype4, nfsstat4, opentype4, sequenceid4, sessionid4, stateid4, CLOSE4args, COMPOUND4args,
    COMPOUND4res, CREATE4args, CREATE_SESSION4args, CREATE_SESSION4resok,
    DESTROY_SESSION4args, EXCHANGE_ID4args, EXCHANGE_ID4resok, GETATTR4args, GETATTR4resok, GETFH4args,
    GETFH4resok, LINK4args, LOOKUP4args, OPEN4args, OPEN4resok, PUTFH4args, PUTROOTFH4args,
    RECLAIM_COMPLETE4args, READDIR4args, READDIR4resok, READLINK4args, READLINK4resok, REMOVE4args,
    RENAME4args, SAVEFH4args, SEQUENCE4args, SETATTR4args, STATEID_ANONYMOUS, FATTR4_MODE, FATTR4_OWNER,
    FATTR4_OWNER_GROUP, FATTR4_SIZE, FATTR4_TIME_ACCESS, FATTR4_TIME_METADATA, FATTR4_TIME_MODIFY,
    FATTR4_TYPE,
};
use crate::protocol::xdr::{decode, XDR};

const NFSPROC4_COMPOUND: u32 = 1;

/// Distinguishes a SEQUENCE-level failure (which may mean the session itself
/// needs re-creating) from any other failure in a COMPOUND, so [`Engine4::compound`]
/// knows which ones are worth retrying after re-establishing the session.
enum CompoundError {
    Sequence(nfsstat4),
    Other(NfsError),
}

impl CompoundError {
    fn into_nfs_error(self) -> NfsError {
        match self {
            CompoundError::Sequence(status) => NfsError::from(status),
            CompoundError::Other(e) => e,
        }
    }
}

fn decode_fattr4(attrs: &fattr4) -> FileAttributes {
    let mut cursor = std::io::Cursor::new(&attrs.attr_vals);
    let mut out = FileAttributes::default();
    let highest_bit = attrs.attrmask.0.len() as u32 * 32;
    for bit in 0..highest_bit {
        if !bitmap4_get(&attrs.attrmask, bit) {
            continue;
        }
        match bit {
            FATTR4_TYPE => {
                let t: nfs_ftype4 = match decode(&mut cursor) {
                    Ok(t) => t,
                    Err(_) => break,
                };
                out.file_type = match t {
                    nfs_ftype4::NF4REG => FileType::Regular,
                    nfs_ftype4::NF4DIR => FileType::Directory,
                    nfs_ftype4::NF4BLK => FileType::Block,
                    nfs_ftype4::NF4CHR => FileType::Char,
                    nfs_ftype4::NF4LNK => FileType::Symlink,
                    nfs_ftype4::NF4SOCK => FileType::Socket,
                    nfs_ftype4::NF4FIFO => FileType::Fifo,
                    nfs_ftype4::NF4ATTRDIR | nfs_ftype4::NF4NAMEDATTR => FileType::None,
                };
            }
            FATTR4_SIZE => out.size = decode(&mut cursor).unwrap_or(0),
            FATTR4_MODE => out.mode = decode(&mut cursor).unwrap_or(0),
            FATTR4_OWNER => {
                let owner: crate::protocol::xdr::XdrString = decode(&mut cursor).unwrap_or_default();
                out.uid = owner.0.parse().unwrap_or(0);
            }
            FATTR4_OWNER_GROUP => {
                let group: crate::protocol::xdr::XdrString = decode(&mut cursor).unwrap_or_default();
                out.gid = group.0.parse().unwrap_or(0);
            }
            FATTR4_TIME_ACCESS => {
                let seconds: i64 = decode(&mut cursor).unwrap_or(0);
                let _nseconds: u32 = decode(&mut cursor).unwrap_or(0);
                out.atime = seconds as u64;
            }
            FATTR4_TIME_METADATA => {
                let seconds: i64 = decode(&mut cursor).unwrap_or(0);
                let _nseconds: u32 = decode(&mut cursor).unwrap_or(0);
                out.ctime = seconds as u64;
            }
            FATTR4_TIME_MODIFY => {
                let seconds: i64 = decode(&mut cursor).unwrap_or(0);
                let _nseconds: u32 = decode(&mut cursor).unwrap_or(0);
                out.mtime = seconds as u64;
            }
            _ => {}
        }
    }
    out
}

/// Attributes requested on every GETATTR/LOOKUP/OPEN/CREATE call.
fn attr_request_bitmap() -> bitmap4 {
    let mut bm = bitmap4::default();
    for bit in [
        FATTR4_TYPE,
        FATTR4_SIZE,
        FATTR4_MODE,
        FATTR4_OWNER,
        FATTR4_OWNER_GROUP,
        FATTR4_TIME_ACCESS,
        FATTR4_TIME_METADATA,
        FATTR4_TIME_MODIFY,
    ] {
        bitmap4_set(&mut bm, bit);
    }
    bm
}

fn to_fh4(h: &FileHandle) -> nfs4::nfs_fh4 {
    h.0.clone()
}

fn from_fh4(fh: &nfs4::nfs_fh4) -> FileHandle {
    FileHandle(fh.clone())
}

/// Binds an NFSv4.1 connection: the NFS TCP transport, the session this
/// client negotiated at connect time, and the single "current open" stateid
/// this engine keeps alive between `read`/`write` calls.
///
/// Every `OPEN` this client issues is `CLAIM_NULL` against a `(directory,
/// name)` pair, never a bare file handle - so `read`/`write`, which only see
/// a handle, reuse the open cached by whichever `lookup`/`create` produced
/// that handle, and fall back to the anonymous stateid if none is cached.
pub struct Engine4 {
    nfs: TcpTransport,
    credentials: Credentials,
    clientid: clientid4,
    sessionid: sessionid4,
    seqid: sequenceid4,
    root: Option<FileHandle>,
    current_open: Option<(FileHandle, stateid4)>,
}

impl Engine4 {
    /// Opens the NFS transport and runs EXCHANGE_ID -> CREATE_SESSION ->
    /// RECLAIM_COMPLETE. Does not mount an export (v4.1 has no MOUNT
    /// protocol; `mount` resolves the export via PUTROOTFH + LOOKUP).
    pub async fn connect(
        nfs_addr: SocketAddr,
        _mount_addr: SocketAddr,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, NfsError> {
        Self::connect_with(nfs_addr, _mount_addr, credentials, timeout, false).await
    }

    /// As [`Engine4::connect`], optionally binding a local port below 1024
    /// first.
    pub async fn connect_with(
        nfs_addr: SocketAddr,
        _mount_addr: SocketAddr,
        credentials: Credentials,
        timeout: Duration,
        use_privileged_port: bool,
    ) -> Result<Self, NfsError> {
        let nfs = TcpTransport::connect_with(nfs_addr, timeout, use_privileged_port)
            .await
            .map_err(NfsError::from_anyhow)?;
        let mut engine = Engine4 {
            nfs,
            credentials,
            clientid: 0,
            sessionid: [0; nfs4::NFS4_SESSIONID_SIZE],
            seqid: 0,
            root: None,
            current_open: None,
        };
        engine.establish_session().await?;
        Ok(engine)
    }

    async fn raw_compound(&self, ops: Vec<nfs4::nfs_argop4>) -> Result<COMPOUND4res, NfsError> {
        let args = COMPOUND4args { tag: "nfs-client".into(), minorversion: nfs4::MINOR_VERSION, argarray: ops };
        let mut buf = Vec::new();
        args.serialize(&mut buf).map_err(|e| NfsError::Xdr(e.to_string()))?;
        let reply = self
            .nfs
            .call(nfs4::PROGRAM, nfs4::VERSION, NFSPROC4_COMPOUND, &self.credentials, &buf)
            .await
            .map_err(NfsError::from_anyhow)?;
        let mut cursor = std::io::Cursor::new(reply);
        decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))
    }

    /// Runs a session-bound COMPOUND: prepends SEQUENCE on slot 0, advances
    /// the slot's sequence id, and re-establishes the session once when
    /// SEQUENCE itself fails with a status [`nfsstat4::is_fatal_to_session`]
    /// before retrying exactly once.
    async fn compound(&mut self, ops: Vec<nfs4::nfs_argop4>) -> Result<Vec<nfs4::nfs_resop4>, NfsError> {
        match self.compound_once(ops.clone()).await {
            Ok(resarray) => Ok(resarray),
            Err(CompoundError::Sequence(status)) if status.is_fatal_to_session() => {
                self.establish_session().await?;
                match self.compound_once(ops).await {
                    Ok(resarray) => Ok(resarray),
                    Err(e) => Err(e.into_nfs_error()),
                }
            }
            Err(e) => Err(e.into_nfs_error()),
        }
    }

    async fn compound_once(&mut self, mut ops: Vec<nfs4::nfs_argop4>) -> Result<Vec<nfs4::nfs_resop4>, CompoundError> {
        let sequence_arg = SEQUENCE4args {
            sessionid: self.sessionid,
            sequenceid: self.seqid.wrapping_add(1),
            slotid: 0,
            highest_slotid: 0,
            cache_this: false,
        };
        ops.insert(0, nfs4::nfs_argop4::OP_SEQUENCE(sequence_arg));
        let res = self.raw_compound(ops).await.map_err(CompoundError::Other)?;
        self.seqid = self.seqid.wrapping_add(1);

        let mut resarray = res.resarray;
        if resarray.is_empty() {
            return Err(CompoundError::Other(NfsError::Protocol(
                "COMPOUND reply carried no results".to_string(),
            )));
        }
        let seq_result = resarray.remove(0);
        let seq_status = seq_result.status();
        if seq_status != nfsstat4::NFS4_OK {
            return Err(CompoundError::Sequence(seq_status));
        }

        for result in &resarray {
            let status = result.status();
            if status != nfsstat4::NFS4_OK {
                return Err(CompoundError::Other(NfsError::from(status)));
            }
        }
        Ok(resarray)
    }

    async fn establish_session(&mut self) -> Result<(), NfsError> {
        let exchange_args = EXCHANGE_ID4args {
            verifier: [0; nfs4::NFS4_VERIFIER_SIZE],
            owner_id: b"nfs-client".to_vec(),
            flags: 0,
            client_impl_id: None,
        };
        let res = self
            .raw_compound(vec![nfs4::nfs_argop4::OP_EXCHANGE_ID(exchange_args)])
            .await?;
        let exchange_ok = single_result_ok::<EXCHANGE_ID4resok>(res, |r| match r {
            nfs4::nfs_resop4::OP_EXCHANGE_ID(s, ok) => Some((*s, ok.clone())),
            _ => None,
        })?;
        self.clientid = exchange_ok.clientid;

        let create_session_args = CREATE_SESSION4args {
            clientid: exchange_ok.clientid,
            sequenceid: exchange_ok.sequenceid,
            flags: 0,
            fore_chan_attrs: nfs4::channel_attrs4::default(),
            back_chan_attrs: nfs4::channel_attrs4::default(),
            cb_program: 0,
        };
        let res = self
            .raw_compound(vec![nfs4::nfs_argop4::OP_CREATE_SESSION(create_session_args)])
            .await?;
        let session_ok = single_result_ok::<CREATE_SESSION4resok>(res, |r| match r {
            nfs4::nfs_resop4::OP_CREATE_SESSION(s, ok) => Some((*s, ok.clone())),
            _ => None,
        })?;
        self.sessionid = session_ok.sessionid;
        self.seqid = session_ok.sequenceid;

        // RECLAIM_COMPLETE must be session-bound (SEQUENCE-led); this client
        // never reclaims prior state, so it always applies to the whole server.
        self.compound_once(vec![nfs4::nfs_argop4::OP_RECLAIM_COMPLETE(RECLAIM_COMPLETE4args {
            one_fs: false,
        })])
        .await
        .map_err(CompoundError::into_nfs_error)?;
        Ok(())
    }

    /// Best-effort CLOSE of whatever open this engine is currently holding.
    async fn close_current_open(&mut self) -> Result<(), NfsError> {
        if let Some((_, stateid)) = self.current_open.take() {
            let close_args = CLOSE4args { seqid: 0, open_stateid: stateid };
            self.compound(vec![nfs4::nfs_argop4::OP_CLOSE(close_args)]).await?;
        }
        Ok(())
    }

    /// DESTROY_SESSION must not itself be preceded by a SEQUENCE op in the
    /// same COMPOUND (RFC 5661 §18.37.3), so this bypasses `compound` and
    /// goes straight through `raw_compound`.
    async fn destroy_session(&mut self) -> Result<(), NfsError> {
        let args = DESTROY_SESSION4args { sessionid: self.sessionid };
        let res = self.raw_compound(vec![nfs4::nfs_argop4::OP_DESTROY_SESSION(args)]).await?;
        if res.status != nfsstat4::NFS4_OK {
            return Err(NfsError::from(res.status));
        }
        Ok(())
    }

    fn stateid_for(&self, handle: &FileHandle) -> stateid4 {
        match &self.current_open {
            Some((h, stateid)) if h == handle => *stateid,
            _ => STATEID_ANONYMOUS,
        }
    }
}

/// Extracts the single operation result this call cares about, mapping a
/// non-OK per-operation status to [`NfsError`].
fn single_result_ok<T>(
    res: COMPOUND4res,
    extract: impl Fn(&nfs4::nfs_resop4) -> Option<(nfsstat4, Option<T>)>,
) -> Result<T, NfsError> {
    if res.status != nfsstat4::NFS4_OK {
        return Err(NfsError::from(res.status));
    }
    for result in &res.resarray {
        if let Some((status, ok)) = extract(result) {
            if status != nfsstat4::NFS4_OK {
                return Err(NfsError::from(status));
            }
            return ok.ok_or_else(|| NfsError::Protocol("NFS4_OK result carried no body".to_string()));
        }
    }
    Err(NfsError::Protocol("expected operation missing from COMPOUND reply".to_string()))
}

fn find_getfh(results: &[nfs4::nfs_resop4]) -> Result<FileHandle, NfsError> {
    for r in results {
        if let nfs4::nfs_resop4::OP_GETFH(_, Some(GETFH4resok { object })) = r {
            return Ok(from_fh4(object));
        }
    }
    Err(NfsError::Protocol("COMPOUND reply missing GETFH result".to_string()))
}

fn find_getattr(results: &[nfs4::nfs_resop4]) -> Result<FileAttributes, NfsError> {
    for r in results {
        if let nfs4::nfs_resop4::OP_GETATTR(_, Some(GETATTR4resok { obj_attributes })) = r {
            return Ok(decode_fattr4(obj_attributes));
        }
    }
    Err(NfsError::Protocol("COMPOUND reply missing GETATTR result".to_string()))
}

fn find_readdir(results: &[nfs4::nfs_resop4]) -> Result<READDIR4resok, NfsError> {
    for r in results {
        if let nfs4::nfs_resop4::OP_READDIR(_, Some(ok)) = r {
            return Ok(ok.clone());
        }
    }
    Err(NfsError::Protocol("COMPOUND reply missing READDIR result".to_string()))
}

#[async_trait]
impl Engine for Engine4 {
    async fn list_exports(&mut self) -> Result<Vec<String>, NfsError> {
        // v4.1 has no separate export list; the single pseudo-root stands in.
        Ok(vec!["/".to_string()])
    }

    async fn mount(&mut self, export: &str) -> Result<FileHandle, NfsError> {
        let mut ops = vec![nfs4::nfs_argop4::OP_PUTROOTFH(PUTROOTFH4args)];
        for component in export.split('/').filter(|c| !c.is_empty()) {
            ops.push(nfs4::nfs_argop4::OP_LOOKUP(LOOKUP4args { objname: component.into() }));
        }
        ops.push(nfs4::nfs_argop4::OP_GETFH(GETFH4args));
        ops.push(nfs4::nfs_argop4::OP_GETATTR(GETATTR4args { attr_request: attr_request_bitmap() }));
        let results = self.compound(ops).await?;
        let handle = find_getfh(&results)?;
        self.root = Some(handle.clone());
        Ok(handle)
    }

    async fn unmount(&mut self) -> Result<(), NfsError> {
        self.close_current_open().await?;
        self.root = None;
        Ok(())
    }

    async fn lookup(&mut self, dir: &FileHandle, name: &str) -> Result<(FileHandle, FileAttributes), NfsError> {
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(dir) }),
            nfs4::nfs_argop4::OP_LOOKUP(LOOKUP4args { objname: name.into() }),
            nfs4::nfs_argop4::OP_GETFH(GETFH4args),
            nfs4::nfs_argop4::OP_GETATTR(GETATTR4args { attr_request: attr_request_bitmap() }),
        ];
        let results = self.compound(ops).await?;
        Ok((find_getfh(&results)?, find_getattr(&results)?))
    }

    async fn getattr(&mut self, handle: &FileHandle) -> Result<FileAttributes, NfsError> {
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(handle) }),
            nfs4::nfs_argop4::OP_GETATTR(GETATTR4args { attr_request: attr_request_bitmap() }),
        ];
        let results = self.compound(ops).await?;
        find_getattr(&results)
    }

    async fn read_dir(&mut self, dir: &FileHandle) -> Result<Vec<DirEntry>, NfsError> {
        let mut entries = Vec::new();
        let mut cookie = 0u64;
        let mut cookieverf = [0u8; nfs4::NFS4_VERIFIER_SIZE];
        loop {
            let ops = vec![
                nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(dir) }),
                nfs4::nfs_argop4::OP_READDIR(READDIR4args {
                    cookie,
                    cookieverf,
                    dircount: 8192,
                    maxcount: 8192,
                    attr_request: bitmap4::default(),
                }),
            ];
            let results = self.compound(ops).await?;
            let ok = find_readdir(&results)?;
            cookieverf = ok.cookieverf;
            for entry in &ok.reply.entries {
                cookie = entry.cookie;
                entries.push(DirEntry { name: entry.name.to_string(), cookie: entry.cookie });
            }
            if ok.reply.eof {
                break;
            }
        }
        Ok(entries)
    }

    async fn read(&mut self, handle: &FileHandle, offset: u64, count: u32) -> Result<ReadResult, NfsError> {
        let stateid = self.stateid_for(handle);
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(handle) }),
            nfs4::nfs_argop4::OP_READ(nfs4::READ4args { stateid, offset, count }),
        ];
        let results = self.compound(ops).await?;
        for r in &results {
            if let nfs4::nfs_resop4::OP_READ(_, Some(ok)) = r {
                return Ok(ReadResult { data: ok.data.clone(), eof: ok.eof });
            }
        }
        Err(NfsError::Protocol("COMPOUND reply missing READ result".to_string()))
    }

    async fn write(&mut self, handle: &FileHandle, offset: u64, data: &[u8]) -> Result<u32, NfsError> {
        let stateid = self.stateid_for(handle);
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(handle) }),
            nfs4::nfs_argop4::OP_WRITE(nfs4::WRITE4args {
                stateid,
                offset,
                stable: nfs4::stable_how4::UNSTABLE4,
                data: data.to_vec(),
            }),
        ];
        let results = self.compound(ops).await?;
        for r in &results {
            if let nfs4::nfs_resop4::OP_WRITE(_, Some(ok)) = r {
                return Ok(ok.count);
            }
        }
        Err(NfsError::Protocol("COMPOUND reply missing WRITE result".to_string()))
    }

    async fn create(&mut self, dir: &FileHandle, name: &str, mode: u32) -> Result<(FileHandle, FileAttributes), NfsError> {
        self.close_current_open().await?;

        let mut attrmask = bitmap4::default();
        bitmap4_set(&mut attrmask, FATTR4_MODE);
        let mut attr_vals = Vec::new();
        mode.serialize(&mut attr_vals).map_err(|e| NfsError::Xdr(e.to_string()))?;
        let createattrs = fattr4 { attrmask, attr_vals };

        let open_args = OPEN4args {
            seqid: 0,
            share_access: nfs4::OPEN4_SHARE_ACCESS_BOTH,
            share_deny: 0,
            owner: self.clientid.to_be_bytes().to_vec(),
            openhow: opentype4::OPEN4_CREATE,
            createhow: Some(createhow4 { mode: createmode4::UNCHECKED4, createattrs, createverf: [0; 8] }),
            claim_name: name.into(),
        };
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(dir) }),
            nfs4::nfs_argop4::OP_OPEN(open_args),
            nfs4::nfs_argop4::OP_GETFH(GETFH4args),
            nfs4::nfs_argop4::OP_GETATTR(GETATTR4args { attr_request: attr_request_bitmap() }),
        ];
        let results = self.compound(ops).await?;
        let handle = find_getfh(&results)?;
        let attrs = find_getattr(&results)?;
        let stateid = results
            .iter()
            .find_map(|r| match r {
                nfs4::nfs_resop4::OP_OPEN(_, Some(OPEN4resok { stateid, .. })) => Some(*stateid),
                _ => None,
            })
            .ok_or_else(|| NfsError::Protocol("COMPOUND reply missing OPEN result".to_string()))?;
        self.current_open = Some((handle.clone(), stateid));
        Ok((handle, attrs))
    }

    async fn mkdir(&mut self, dir: &FileHandle, name: &str, mode: u32) -> Result<(FileHandle, FileAttributes), NfsError> {
        let mut attrmask = bitmap4::default();
        bitmap4_set(&mut attrmask, FATTR4_MODE);
        let mut attr_vals = Vec::new();
        mode.serialize(&mut attr_vals).map_err(|e| NfsError::Xdr(e.to_string()))?;
        let createattrs = fattr4 { attrmask, attr_vals };

        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(dir) }),
            nfs4::nfs_argop4::OP_CREATE(CREATE4args { objtype: createtype4::Dir, objname: name.into(), createattrs }),
            nfs4::nfs_argop4::OP_GETFH(GETFH4args),
            nfs4::nfs_argop4::OP_GETATTR(GETATTR4args { attr_request: attr_request_bitmap() }),
        ];
        let results = self.compound(ops).await?;
        Ok((find_getfh(&results)?, find_getattr(&results)?))
    }

    async fn remove(&mut self, dir: &FileHandle, name: &str) -> Result<(), NfsError> {
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(dir) }),
            nfs4::nfs_argop4::OP_REMOVE(REMOVE4args { target: name.into() }),
        ];
        self.compound(ops).await?;
        Ok(())
    }

    async fn rmdir(&mut self, dir: &FileHandle, name: &str) -> Result<(), NfsError> {
        self.remove(dir, name).await
    }

    async fn rename(
        &mut self,
        from_dir: &FileHandle,
        from_name: &str,
        to_dir: &FileHandle,
        to_name: &str,
    ) -> Result<(), NfsError> {
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(from_dir) }),
            nfs4::nfs_argop4::OP_SAVEFH(SAVEFH4args),
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(to_dir) }),
            nfs4::nfs_argop4::OP_RENAME(RENAME4args { oldname: from_name.into(), newname: to_name.into() }),
        ];
        self.compound(ops).await?;
        Ok(())
    }

    async fn set_size(&mut self, handle: &FileHandle, size: u64) -> Result<(), NfsError> {
        let mut attrmask = bitmap4::default();
        bitmap4_set(&mut attrmask, FATTR4_SIZE);
        let mut attr_vals = Vec::new();
        size.serialize(&mut attr_vals).map_err(|e| NfsError::Xdr(e.to_string()))?;
        let obj_attributes = fattr4 { attrmask, attr_vals };

        let stateid = self.stateid_for(handle);
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(handle) }),
            nfs4::nfs_argop4::OP_SETATTR(SETATTR4args { stateid, obj_attributes }),
        ];
        self.compound(ops).await?;
        Ok(())
    }

    async fn symlink(&mut self, dir: &FileHandle, name: &str, target: &str) -> Result<(FileHandle, FileAttributes), NfsError> {
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(dir) }),
            nfs4::nfs_argop4::OP_CREATE(CREATE4args {
                objtype: createtype4::Link(target.into()),
                objname: name.into(),
                createattrs: fattr4::default(),
            }),
            nfs4::nfs_argop4::OP_GETFH(GETFH4args),
            nfs4::nfs_argop4::OP_GETATTR(GETATTR4args { attr_request: attr_request_bitmap() }),
        ];
        let results = self.compound(ops).await?;
        Ok((find_getfh(&results)?, find_getattr(&results)?))
    }

    async fn readlink(&mut self, handle: &FileHandle) -> Result<String, NfsError> {
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(handle) }),
            nfs4::nfs_argop4::OP_READLINK(READLINK4args),
        ];
        let results = self.compound(ops).await?;
        for r in &results {
            if let nfs4::nfs_resop4::OP_READLINK(_, Some(READLINK4resok { link })) = r {
                return Ok(link.to_string());
            }
        }
        Err(NfsError::Protocol("COMPOUND reply missing READLINK result".to_string()))
    }

    async fn link(&mut self, dir: &FileHandle, name: &str, target: &FileHandle) -> Result<(), NfsError> {
        let ops = vec![
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(target) }),
            nfs4::nfs_argop4::OP_SAVEFH(SAVEFH4args),
            nfs4::nfs_argop4::OP_PUTFH(PUTFH4args { object: to_fh4(dir) }),
            nfs4::nfs_argop4::OP_LINK(LINK4args { newname: name.into() }),
        ];
        self.compound(ops).await?;
        Ok(())
    }

    async fn complete_io(&mut self, handle: &FileHandle) -> Result<(), NfsError> {
        if matches!(&self.current_open, Some((h, _)) if h == handle) {
            self.close_current_open().await?;
        }
        Ok(())
    }

    fn block_size(&self) -> u32 {
        // RFC 5661 leaves the preferred I/O size to fsinfo-equivalent
        // attributes this working subset doesn't query; fall back to a
        // conservative size within every server's maxrequestsize.
        65536
    }

    fn root_handle(&self) -> Option<&FileHandle> {
        self.root.as_ref()
    }

    async fn close(&mut self) -> Result<(), NfsError> {
        self.close_current_open().await?;
        self.destroy_session().await
    }
}
