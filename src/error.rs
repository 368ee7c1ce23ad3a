//! The public error taxonomy this crate returns, grounded on the kind-per-status
//! scheme of the NFS status enums in `protocol::xdr::{nfs2, nfs3, nfs4}`.
//!
//! The teacher folds everything through `anyhow::Error` because a server
//! dispatcher only ever needs to log-and-continue; a client library is a public
//! API that callers match on, so this crate adds a `thiserror`-derived enum at
//! the boundary. Internal transport/XDR plumbing may still bubble up through
//! `anyhow::Error` (see `protocol::rpc`) and gets folded into [`NfsError`] at
//! the engine/façade boundary via [`NfsError::from_anyhow`].

use std::fmt;

use crate::protocol::xdr::{nfs2, nfs3, nfs4};

/// The error type returned by every public operation on [`crate::Client`] and
/// [`crate::Pool`].
#[derive(Debug, thiserror::Error)]
pub enum NfsError {
    /// Transport unreachable, not connected, portmapper failure, or a
    /// privileged-port bind failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// Export not found, server refused, or a MOUNT-protocol communication
    /// failure.
    #[error("mount error: {0}")]
    Mount(String),

    /// The RPC layer returned `MSG_DENIED`/`AUTH_ERROR`.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Malformed reply, unexpected state transition, or an unknown
    /// program/procedure number.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// XDR encode/decode failure: overflow, underflow, invalid discriminant,
    /// or a malformed string.
    #[error("xdr error: {0}")]
    Xdr(String),

    /// A version-specific NFS status the server returned, normalized to a
    /// version-independent kind.
    #[error("nfs status error: {0:?}")]
    Status(NfsStatusKind),

    /// The server is in its post-restart grace period (v4.1 `NFS4ERR_GRACE`);
    /// surfaced unchanged rather than retried internally. Retrying is the
    /// caller's (or the pool's) decision.
    #[error("server is in its grace period, retry later")]
    Grace,

    /// A call did not complete within its deadline. On UDP the call's xid is
    /// freed for reuse.
    #[error("operation timed out")]
    Timeout,

    /// An in-flight streaming operation was cancelled by the caller.
    #[error("operation was cancelled")]
    Cancelled,

    /// The pool (or client) has been disposed; no further operations are
    /// possible.
    #[error("client or pool has been disposed")]
    Disposed,

    /// An operation was attempted in a state that forbids it (e.g. `read`
    /// before `mount`).
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Version-independent classification of a server-reported NFS status,
/// RFC 1094/1813/5661's overlapping error sets collapsed into one enum so
/// callers can match without caring which wire version produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NfsStatusKind {
    /// No such file or directory
    NoEnt,
    /// File already exists
    Exist,
    /// Permission denied
    Access,
    /// Not owner
    Perm,
    /// Is a directory
    IsDir,
    /// Not a directory
    NotDir,
    /// Directory not empty
    NotEmpty,
    /// Invalid argument
    Inval,
    /// I/O error
    Io,
    /// No space left on device
    NoSpc,
    /// File too large
    FBig,
    /// Invalid file handle - this entity's cached handle should be invalidated
    Stale,
    /// File handle has expired (v4.1)
    BadHandle,
    /// Name too long
    NameTooLong,
    /// Resource (quota) hard limit exceeded
    DQuot,
    /// Read-only file system
    Rofs,
    /// Operation not supported
    NotSupp,
    /// Resource temporarily unavailable; server asks the client to retry
    Jukebox,
    /// Undefined server error
    ServerFault,
    /// A v4.1 sequence id was reused or is out of order
    BadSeqid,
    /// A v4.1 slot id is outside the session's slot table
    BadSlot,
    /// A status this crate does not specifically classify
    Unknown(u32),
}

impl fmt::Display for NfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl NfsError {
    /// Folds an internal `anyhow::Error` raised by the transport/XDR layers
    /// into the public taxonomy. Used at the engine/façade boundary; internal
    /// plumbing (`protocol::rpc`) is free to keep using `anyhow::Error`
    /// until it crosses this line.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            if io_err.kind() == std::io::ErrorKind::TimedOut {
                return NfsError::Timeout;
            }
            if io_err.kind() == std::io::ErrorKind::InvalidData {
                return NfsError::Xdr(io_err.to_string());
            }
            return NfsError::Connection(io_err.to_string());
        }
        NfsError::Protocol(err.to_string())
    }

    /// True if this status should trigger the resolver's one-shot
    /// invalidate-and-retry policy for a cached file handle.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            NfsError::Status(NfsStatusKind::Stale) | NfsError::Status(NfsStatusKind::BadHandle)
        )
    }
}

impl From<nfs2::nfsstat2> for NfsError {
    fn from(stat: nfs2::nfsstat2) -> Self {
        use nfs2::nfsstat2::*;
        let kind = match stat {
            NFS_OK => unreachable!("NFS_OK is not an error"),
            NFSERR_PERM => NfsStatusKind::Perm,
            NFSERR_NOENT => NfsStatusKind::NoEnt,
            NFSERR_IO => NfsStatusKind::Io,
            NFSERR_NXIO => NfsStatusKind::Unknown(6),
            NFSERR_ACCES => NfsStatusKind::Access,
            NFSERR_EXIST => NfsStatusKind::Exist,
            NFSERR_NODEV => NfsStatusKind::Unknown(19),
            NFSERR_NOTDIR => NfsStatusKind::NotDir,
            NFSERR_ISDIR => NfsStatusKind::IsDir,
            NFSERR_FBIG => NfsStatusKind::FBig,
            NFSERR_NOSPC => NfsStatusKind::NoSpc,
            NFSERR_ROFS => NfsStatusKind::Rofs,
            NFSERR_NAMETOOLONG => NfsStatusKind::NameTooLong,
            NFSERR_NOTEMPTY => NfsStatusKind::NotEmpty,
            NFSERR_DQUOT => NfsStatusKind::DQuot,
            NFSERR_STALE => NfsStatusKind::Stale,
            NFSERR_WFLUSH => NfsStatusKind::Unknown(99),
        };
        NfsError::Status(kind)
    }
}

impl From<nfs3::nfsstat3> for NfsError {
    fn from(stat: nfs3::nfsstat3) -> Self {
        use nfs3::nfsstat3::*;
        let kind = match stat {
            NFS3_OK => unreachable!("NFS3_OK is not an error"),
            NFS3ERR_PERM => NfsStatusKind::Perm,
            NFS3ERR_NOENT => NfsStatusKind::NoEnt,
            NFS3ERR_IO => NfsStatusKind::Io,
            NFS3ERR_ACCES => NfsStatusKind::Access,
            NFS3ERR_EXIST => NfsStatusKind::Exist,
            NFS3ERR_NOTDIR => NfsStatusKind::NotDir,
            NFS3ERR_ISDIR => NfsStatusKind::IsDir,
            NFS3ERR_FBIG => NfsStatusKind::FBig,
            NFS3ERR_NOSPC => NfsStatusKind::NoSpc,
            NFS3ERR_ROFS => NfsStatusKind::Rofs,
            NFS3ERR_NAMETOOLONG => NfsStatusKind::NameTooLong,
            NFS3ERR_NOTEMPTY => NfsStatusKind::NotEmpty,
            NFS3ERR_DQUOT => NfsStatusKind::DQuot,
            NFS3ERR_STALE => NfsStatusKind::Stale,
            NFS3ERR_NOTSUPP => NfsStatusKind::NotSupp,
            NFS3ERR_SERVERFAULT => NfsStatusKind::ServerFault,
            NFS3ERR_JUKEBOX => NfsStatusKind::Jukebox,
            NFS3ERR_INVAL => NfsStatusKind::Inval,
            NFS3ERR_BADHANDLE => NfsStatusKind::BadHandle,
            other => NfsStatusKind::Unknown(other as u32),
        };
        NfsError::Status(kind)
    }
}

impl From<nfs4::nfsstat4> for NfsError {
    fn from(stat: nfs4::nfsstat4) -> Self {
        use nfs4::nfsstat4::*;
        if stat.is_grace() {
            return NfsError::Grace;
        }
        let kind = match stat {
            NFS4_OK => unreachable!("NFS4_OK is not an error"),
            NFS4ERR_PERM => NfsStatusKind::Perm,
            NFS4ERR_NOENT => NfsStatusKind::NoEnt,
            NFS4ERR_IO => NfsStatusKind::Io,
            NFS4ERR_ACCESS => NfsStatusKind::Access,
            NFS4ERR_EXIST => NfsStatusKind::Exist,
            NFS4ERR_NOTDIR => NfsStatusKind::NotDir,
            NFS4ERR_ISDIR => NfsStatusKind::IsDir,
            NFS4ERR_INVAL => NfsStatusKind::Inval,
            NFS4ERR_FBIG => NfsStatusKind::FBig,
            NFS4ERR_NOSPC => NfsStatusKind::NoSpc,
            NFS4ERR_ROFS => NfsStatusKind::Rofs,
            NFS4ERR_NAMETOOLONG => NfsStatusKind::NameTooLong,
            NFS4ERR_NOTEMPTY => NfsStatusKind::NotEmpty,
            NFS4ERR_DQUOT => NfsStatusKind::DQuot,
            NFS4ERR_STALE | NFS4ERR_FHEXPIRED => NfsStatusKind::Stale,
            NFS4ERR_NOTSUPP => NfsStatusKind::NotSupp,
            NFS4ERR_SERVERFAULT => NfsStatusKind::ServerFault,
            NFS4ERR_DELAY => NfsStatusKind::Jukebox,
            NFS4ERR_BAD_SEQID => NfsStatusKind::BadSeqid,
            NFS4ERR_BADSLOT => NfsStatusKind::BadSlot,
            other => NfsStatusKind::Unknown(other as u32),
        };
        NfsError::Status(kind)
    }
}
