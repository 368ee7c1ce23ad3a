//! Per-operation argument/result types and the `COMPOUND` envelope that
//! bundles them, RFC 5661 sections 1.2.1 and 18.
//!
//! Every v4.1 request this client issues is a [`COMPOUND4args`] built from a
//! small, ordered sequence of [`nfs_argop4`] variants (see the module-level
//! doc in `super` for the sequences the engine uses); every reply is a
//! [`COMPOUND4res`] carrying the matching [`nfs_resop4`] variants plus the
//! index of the last operation executed, per RFC 5661 section 15.2.

#![allow(dead_code)]
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use super::{
    bitmap4, clientid4, component4, fattr4, nfs_cookie4, nfs_fh4, nfs_ftype4, nfsstat4, sequenceid4,
    sessionid4, slotid4, stateid4, verifier4,
};
use crate::protocol::xdr::{decode, XdrString, XDR};
use crate::XDRStruct;

/// Operation numbers for the operations this client issues inside a
/// `COMPOUND`, RFC 5661 section 18.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum OpCode {
    /// ACCESS - check access permissions (op 3)
    ACCESS = 3,
    /// CLOSE - close an open file (op 4)
    CLOSE = 4,
    /// COMMIT - commit cached data to stable storage (op 5)
    COMMIT = 5,
    /// CREATE - create a non-regular file object (op 6)
    CREATE = 6,
    /// GETATTR - get attributes of the current file handle (op 9)
    GETATTR = 9,
    /// GETFH - get the current file handle (op 10)
    GETFH = 10,
    /// LINK - create a hard link to the saved file handle (op 11)
    LINK = 11,
    /// LOOKUP - look up a name in the current directory (op 15)
    LOOKUP = 15,
    /// OPEN - open or create a regular file (op 18)
    OPEN = 18,
    /// PUTFH - set the current file handle (op 22)
    PUTFH = 22,
    /// PUTROOTFH - set the current file handle to the server's root (op 24)
    PUTROOTFH = 24,
    /// READ - read data from a file (op 25)
    READ = 25,
    /// READDIR - read directory entries (op 26)
    READDIR = 26,
    /// READLINK - read a symbolic link's target (op 27)
    READLINK = 27,
    /// REMOVE - remove a file system object (op 28)
    REMOVE = 28,
    /// RENAME - rename a file system object (op 29)
    RENAME = 29,
    /// RESTOREFH - restore a saved file handle as current (op 31)
    RESTOREFH = 31,
    /// SAVEFH - save the current file handle (op 32)
    SAVEFH = 32,
    /// SECINFO - get security mechanisms for a name (op 33)
    SECINFO = 33,
    /// SETATTR - set attributes of the current file handle (op 34)
    SETATTR = 34,
    /// EXCHANGE_ID - establish a client id and owner (op 42)
    EXCHANGE_ID = 42,
    /// CREATE_SESSION - create a session bound to a client id (op 43)
    CREATE_SESSION = 43,
    /// DESTROY_SESSION - destroy a session (op 44)
    DESTROY_SESSION = 44,
    /// RECLAIM_COMPLETE - announce that state reclaim is finished (op 58)
    RECLAIM_COMPLETE = 58,
    /// SEQUENCE - the mandatory first operation in every session COMPOUND (op 53)
    SEQUENCE = 53,
}

/// Arguments for GETFH (no arguments; operates on the current file handle).
#[derive(Clone, Debug, Default)]
pub struct GETFH4args;
impl XDR for GETFH4args {
    fn serialize<W: Write>(&self, _dest: &mut W) -> std::io::Result<()> {
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, _src: &mut R) -> std::io::Result<()> {
        Ok(())
    }
}

/// Successful response for GETFH.
#[derive(Clone, Debug, Default)]
pub struct GETFH4resok {
    /// The current file handle
    pub object: nfs_fh4,
}
XDRStruct!(GETFH4resok, object);

/// Arguments for PUTFH: makes `object` the current file handle.
#[derive(Clone, Debug, Default)]
pub struct PUTFH4args {
    /// File handle to make current
    pub object: nfs_fh4,
}
XDRStruct!(PUTFH4args, object);

/// Arguments for PUTROOTFH (no arguments; sets current FH to the server root).
#[derive(Clone, Debug, Default)]
pub struct PUTROOTFH4args;
impl XDR for PUTROOTFH4args {
    fn serialize<W: Write>(&self, _dest: &mut W) -> std::io::Result<()> {
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, _src: &mut R) -> std::io::Result<()> {
        Ok(())
    }
}

/// Arguments for SAVEFH (no arguments; saves the current file handle).
#[derive(Clone, Debug, Default)]
pub struct SAVEFH4args;
impl XDR for SAVEFH4args {
    fn serialize<W: Write>(&self, _dest: &mut W) -> std::io::Result<()> {
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, _src: &mut R) -> std::io::Result<()> {
        Ok(())
    }
}

/// Arguments for GETATTR: requests the attributes named in `attr_request`.
#[derive(Clone, Debug, Default)]
pub struct GETATTR4args {
    /// Bitmap of attributes being requested
    pub attr_request: bitmap4,
}
XDRStruct!(GETATTR4args, attr_request);

/// Successful response for GETATTR.
#[derive(Clone, Debug, Default)]
pub struct GETATTR4resok {
    /// The requested attributes
    pub obj_attributes: fattr4,
}
XDRStruct!(GETATTR4resok, obj_attributes);

/// Arguments for SETATTR.
#[derive(Clone, Debug, Default)]
pub struct SETATTR4args {
    /// State id under which the attribute change is performed
    pub stateid: stateid4,
    /// Attributes to set
    pub obj_attributes: fattr4,
}
XDRStruct!(SETATTR4args, stateid, obj_attributes);

/// Successful response for SETATTR: which attributes were actually applied.
#[derive(Clone, Debug, Default)]
pub struct SETATTR4resok {
    /// Attributes the server actually changed
    pub attrsset: bitmap4,
}
XDRStruct!(SETATTR4resok, attrsset);

/// Arguments for LOOKUP.
#[derive(Clone, Debug, Default)]
pub struct LOOKUP4args {
    /// Name to resolve within the current directory
    pub objname: component4,
}
XDRStruct!(LOOKUP4args, objname);

/// Arguments for REMOVE.
#[derive(Clone, Debug, Default)]
pub struct REMOVE4args {
    /// Name to remove from the current directory
    pub target: component4,
}
XDRStruct!(REMOVE4args, target);

/// Successful response for REMOVE: change info for the parent directory.
#[derive(Clone, Debug, Default)]
pub struct REMOVE4resok {
    /// Before/after change identifiers for the directory
    pub cinfo: change_info4,
}
XDRStruct!(REMOVE4resok, cinfo);

/// Arguments for RENAME: source name resolved against the saved file handle,
/// target name resolved against the current file handle.
#[derive(Clone, Debug, Default)]
pub struct RENAME4args {
    /// Name of the object in the saved directory
    pub oldname: component4,
    /// New name in the current directory
    pub newname: component4,
}
XDRStruct!(RENAME4args, oldname, newname);

/// Successful response for RENAME.
#[derive(Clone, Debug, Default)]
pub struct RENAME4resok {
    /// Change info for the source directory
    pub source_cinfo: change_info4,
    /// Change info for the target directory
    pub target_cinfo: change_info4,
}
XDRStruct!(RENAME4resok, source_cinfo, target_cinfo);

/// Before/after change identifiers a directory-modifying operation returns,
/// RFC 5661 section 3.3.2, replacing v3's `wcc_data` concept for v4.
#[derive(Clone, Debug, Default)]
pub struct change_info4 {
    /// True if the change was applied atomically with the operation
    pub atomic: bool,
    /// Change id of the directory before the operation
    pub before: u64,
    /// Change id of the directory after the operation
    pub after: u64,
}
XDRStruct!(change_info4, atomic, before, after);

/// Opaque symlink target text, RFC 5661 section 4.1.1's `linktext4`.
pub type linktext4 = XdrString;

/// The type-specific payload of a CREATE, RFC 5661 section 18.4's
/// `createtype4`, trimmed to the two object types this client creates:
/// directories and symbolic links. NF4BLK/NF4CHR/NF4SOCK/NF4FIFO carry their
/// own payloads on the wire but this client never issues them.
#[derive(Clone, Debug)]
pub enum createtype4 {
    Dir,
    Link(linktext4),
}

impl Default for createtype4 {
    fn default() -> Self {
        createtype4::Dir
    }
}

impl createtype4 {
    fn ftype(&self) -> nfs_ftype4 {
        match self {
            createtype4::Dir => nfs_ftype4::NF4DIR,
            createtype4::Link(_) => nfs_ftype4::NF4LNK,
        }
    }
}

impl XDR for createtype4 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.ftype().serialize(dest)?;
        match self {
            createtype4::Dir => Ok(()),
            createtype4::Link(target) => target.serialize(dest),
        }
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let ftype: nfs_ftype4 = decode(src)?;
        *self = match ftype {
            nfs_ftype4::NF4DIR => createtype4::Dir,
            nfs_ftype4::NF4LNK => createtype4::Link(decode(src)?),
            other => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("unsupported createtype4 object type {other:?}"),
                ))
            }
        };
        Ok(())
    }
}

/// Arguments for CREATE: makes a non-regular file object (directory or
/// symlink) named `objname` in the current directory, RFC 5661 section 18.4.
#[derive(Clone, Debug, Default)]
pub struct CREATE4args {
    /// Which kind of object to create, and its type-specific payload
    pub objtype: createtype4,
    /// Name of the new object within the current directory
    pub objname: component4,
    /// Initial attributes for the new object
    pub createattrs: fattr4,
}
XDRStruct!(CREATE4args, objtype, objname, createattrs);

/// Successful response for CREATE.
#[derive(Clone, Debug, Default)]
pub struct CREATE4resok {
    /// Change info for the parent directory
    pub cinfo: change_info4,
    /// Subset of requested attributes the server actually set
    pub attrset: bitmap4,
}
XDRStruct!(CREATE4resok, cinfo, attrset);

/// Arguments for LINK: creates `newname` in the current file handle's
/// directory as a hard link to the saved file handle, RFC 5661 section 18.9.
#[derive(Clone, Debug, Default)]
pub struct LINK4args {
    /// Name of the new link within the current directory
    pub newname: component4,
}
XDRStruct!(LINK4args, newname);

/// Successful response for LINK.
#[derive(Clone, Debug, Default)]
pub struct LINK4resok {
    /// Change info for the directory the link was created in
    pub cinfo: change_info4,
}
XDRStruct!(LINK4resok, cinfo);

/// Arguments for READLINK (no arguments; operates on the current file handle).
#[derive(Clone, Debug, Default)]
pub struct READLINK4args;
impl XDR for READLINK4args {
    fn serialize<W: Write>(&self, _dest: &mut W) -> std::io::Result<()> {
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, _src: &mut R) -> std::io::Result<()> {
        Ok(())
    }
}

/// Successful response for READLINK.
#[derive(Clone, Debug, Default)]
pub struct READLINK4resok {
    /// The symlink's target text
    pub link: linktext4,
}
XDRStruct!(READLINK4resok, link);

/// One directory entry as read off the wire, RFC 5661 section 18.18's `entry4`.
#[derive(Clone, Debug, Default)]
pub struct entry4 {
    /// Cookie to resume a READDIR after this entry
    pub cookie: nfs_cookie4,
    /// Entry name
    pub name: component4,
    /// Requested attributes for this entry
    pub attrs: fattr4,
}

/// A READDIR reply's entry list, RFC 5661 section 18.18's `dirlist4`: a
/// cookie-linked list on the wire, flattened into a `Vec` the same way
/// `protocol::xdr::mount::ExportList` flattens MOUNT's export list.
#[derive(Clone, Debug, Default)]
pub struct dirlist4 {
    /// Entries returned by this call
    pub entries: Vec<entry4>,
    /// True if there are no more entries after this batch
    pub eof: bool,
}

impl XDR for dirlist4 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            true.serialize(dest)?;
            entry.cookie.serialize(dest)?;
            entry.name.serialize(dest)?;
            entry.attrs.serialize(dest)?;
        }
        false.serialize(dest)?;
        self.eof.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.entries.clear();
        loop {
            if !decode::<bool, R>(src)? {
                break;
            }
            let cookie = decode(src)?;
            let name = decode(src)?;
            let attrs = decode(src)?;
            self.entries.push(entry4 { cookie, name, attrs });
        }
        self.eof = decode(src)?;
        Ok(())
    }
}

/// Arguments for READDIR, RFC 5661 section 18.18.
#[derive(Clone, Debug, Default)]
pub struct READDIR4args {
    /// Cookie to resume from (0 to start from the beginning)
    pub cookie: nfs_cookie4,
    /// Cookie verifier echoed back from a previous call, or all-zero to start
    pub cookieverf: verifier4,
    /// Hint for how many bytes of cookie/name pairs to return
    pub dircount: u32,
    /// Hint for how many bytes of the whole reply to return
    pub maxcount: u32,
    /// Attributes requested for each entry
    pub attr_request: bitmap4,
}
XDRStruct!(READDIR4args, cookie, cookieverf, dircount, maxcount, attr_request);

/// Successful response for READDIR.
#[derive(Clone, Debug, Default)]
pub struct READDIR4resok {
    /// Cookie verifier to present on the next call to resume this listing
    pub cookieverf: verifier4,
    /// The entries and EOF marker
    pub reply: dirlist4,
}
XDRStruct!(READDIR4resok, cookieverf, reply);

/// Arguments for READ.
#[derive(Clone, Debug, Default)]
pub struct READ4args {
    /// State id under which the read is performed
    pub stateid: stateid4,
    /// Byte offset to read from
    pub offset: u64,
    /// Number of bytes requested
    pub count: u32,
}
XDRStruct!(READ4args, stateid, offset, count);

/// Successful response for READ.
#[derive(Clone, Debug, Default)]
pub struct READ4resok {
    /// True if the end of file was reached
    pub eof: bool,
    /// Data read from the file
    pub data: Vec<u8>,
}
XDRStruct!(READ4resok, eof, data);

/// How written data should be committed to stable storage, RFC 5661 section 18.32.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum stable_how4 {
    /// Data may be buffered before writing to stable storage
    #[default]
    UNSTABLE4 = 0,
    /// Only the data for this request must be committed
    DATA_SYNC4 = 1,
    /// All file data and metadata for this request must be committed
    FILE_SYNC4 = 2,
}
crate::XDREnumSerde!(stable_how4);

/// Arguments for WRITE.
#[derive(Clone, Debug, Default)]
pub struct WRITE4args {
    /// State id under which the write is performed
    pub stateid: stateid4,
    /// Byte offset to write at
    pub offset: u64,
    /// How the data should be committed
    pub stable: stable_how4,
    /// Data to write
    pub data: Vec<u8>,
}
XDRStruct!(WRITE4args, stateid, offset, stable, data);

/// Successful response for WRITE.
#[derive(Clone, Debug, Default)]
pub struct WRITE4resok {
    /// Number of bytes actually written
    pub count: u32,
    /// How the data was committed
    pub committed: stable_how4,
    /// Write verifier to detect server restarts
    pub writeverf: verifier4,
}
XDRStruct!(WRITE4resok, count, committed, writeverf);

/// How a file should be created by OPEN, RFC 5661 section 18.16 (`createmode4`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum createmode4 {
    /// Normal creation - doesn't error if the file exists
    #[default]
    UNCHECKED4 = 0,
    /// Return an error if the file exists
    GUARDED4 = 1,
    /// Exclusive create using a verifier (pre-4.1 semantics)
    EXCLUSIVE4 = 2,
    /// Exclusive create using a verifier carried as an attribute (4.1)
    EXCLUSIVE4_1 = 3,
}
crate::XDREnumSerde!(createmode4);

/// How OPEN should treat an existing file, RFC 5661 section 18.16 (`opentype4`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum opentype4 {
    /// Open an existing file
    #[default]
    OPEN4_NOCREATE = 0,
    /// Create the file if it does not exist
    OPEN4_CREATE = 1,
}
crate::XDREnumSerde!(opentype4);

/// Share access requested by OPEN - read, write, or both.
pub const OPEN4_SHARE_ACCESS_READ: u32 = 0x0001;
/// Share access requested by OPEN for writing.
pub const OPEN4_SHARE_ACCESS_WRITE: u32 = 0x0002;
/// Share access requested by OPEN for reading and writing.
pub const OPEN4_SHARE_ACCESS_BOTH: u32 = 0x0003;

/// How the new file's attributes (or creation verifier) are specified, the
/// payload half of [`opentype4::OPEN4_CREATE`].
#[derive(Clone, Debug, Default)]
pub struct createhow4 {
    /// Selects unchecked/guarded/exclusive creation semantics
    pub mode: createmode4,
    /// Initial attributes, used by UNCHECKED4/GUARDED4
    pub createattrs: fattr4,
    /// Creation verifier, used by EXCLUSIVE4/EXCLUSIVE4_1
    pub createverf: verifier4,
}

impl XDR for createhow4 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.mode.serialize(dest)?;
        match self.mode {
            createmode4::UNCHECKED4 | createmode4::GUARDED4 => {
                self.createattrs.serialize(dest)?;
            }
            createmode4::EXCLUSIVE4 | createmode4::EXCLUSIVE4_1 => {
                self.createverf.serialize(dest)?;
            }
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.mode.deserialize(src)?;
        match self.mode {
            createmode4::UNCHECKED4 | createmode4::GUARDED4 => {
                self.createattrs = decode(src)?;
            }
            createmode4::EXCLUSIVE4 | createmode4::EXCLUSIVE4_1 => {
                self.createverf = decode(src)?;
            }
        }
        Ok(())
    }
}

/// Arguments for OPEN, trimmed to the subset this client drives: opening an
/// existing file or creating one with UNCHECKED4 semantics. No share/open
/// owner reclaim path or delegation request is modeled, since this client
/// does not cache opens across process restarts.
#[derive(Clone, Debug)]
pub struct OPEN4args {
    /// Sequence id for the open-owner's state (legacy field, always 0 under a session)
    pub seqid: u32,
    /// Requested share access bits
    pub share_access: u32,
    /// Requested share deny bits (always 0: this client never denies other opens)
    pub share_deny: u32,
    /// Client-chosen opaque owner identifier, scoped to the clientid
    pub owner: Vec<u8>,
    /// Whether to open an existing file or create a new one
    pub openhow: opentype4,
    /// Attributes/verifier to use when `openhow == OPEN4_CREATE`
    pub createhow: Option<createhow4>,
    /// Name of the file within the current directory
    pub claim_name: component4,
}

impl Default for OPEN4args {
    fn default() -> Self {
        OPEN4args {
            seqid: 0,
            share_access: OPEN4_SHARE_ACCESS_BOTH,
            share_deny: 0,
            owner: Vec::new(),
            openhow: opentype4::OPEN4_NOCREATE,
            createhow: None,
            claim_name: component4::default(),
        }
    }
}

impl XDR for OPEN4args {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.seqid.serialize(dest)?;
        self.share_access.serialize(dest)?;
        self.share_deny.serialize(dest)?;
        self.owner.serialize(dest)?;
        self.openhow.serialize(dest)?;
        if let opentype4::OPEN4_CREATE = self.openhow {
            self.createhow
                .as_ref()
                .expect("OPEN4_CREATE missing createhow payload")
                .serialize(dest)?;
        }
        // CLAIM_NULL: the only claim type this client issues.
        0u32.serialize(dest)?;
        self.claim_name.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.seqid = decode(src)?;
        self.share_access = decode(src)?;
        self.share_deny = decode(src)?;
        self.owner = decode(src)?;
        self.openhow.deserialize(src)?;
        if let opentype4::OPEN4_CREATE = self.openhow {
            self.createhow = Some(decode(src)?);
        } else {
            self.createhow = None;
        }
        let _claim: u32 = decode(src)?;
        self.claim_name.deserialize(src)
    }
}

/// How the OPEN succeeded with respect to delegation, RFC 5661 section 18.16.
/// This client never requests a delegation, so the only result it expects
/// back is `OPEN_DELEGATE_NONE`; other variants are parsed structurally and
/// ignored.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum open_delegation_type4 {
    /// No delegation granted
    #[default]
    OPEN_DELEGATE_NONE = 0,
    /// Read delegation granted (unused by this client; parsed and discarded)
    OPEN_DELEGATE_READ = 1,
    /// Write delegation granted (unused by this client; parsed and discarded)
    OPEN_DELEGATE_WRITE = 2,
}
crate::XDREnumSerde!(open_delegation_type4);

/// Successful response for OPEN.
#[derive(Clone, Debug, Default)]
pub struct OPEN4resok {
    /// State id for the newly opened file
    pub stateid: stateid4,
    /// Change info for the directory the file lives in
    pub cinfo: change_info4,
    /// Subset of requested attributes the server actually set on create
    pub attrset: bitmap4,
    /// Delegation type granted, if any
    pub delegation: open_delegation_type4,
}

impl XDR for OPEN4resok {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.stateid.serialize(dest)?;
        self.cinfo.serialize(dest)?;
        // rflags: bitmap of OPEN4_RESULT_* hints, unused by this client.
        0u32.serialize(dest)?;
        self.attrset.serialize(dest)?;
        self.delegation.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.stateid.deserialize(src)?;
        self.cinfo.deserialize(src)?;
        let _rflags: u32 = decode(src)?;
        self.attrset.deserialize(src)?;
        self.delegation.deserialize(src)?;
        // A granted delegation carries further fields this client doesn't
        // request and therefore never needs to parse.
        if !matches!(self.delegation, open_delegation_type4::OPEN_DELEGATE_NONE) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "unexpected delegation in OPEN reply",
            ));
        }
        Ok(())
    }
}

/// Arguments for CLOSE.
#[derive(Clone, Debug, Default)]
pub struct CLOSE4args {
    /// Sequence id for the open-owner's state (legacy field, always 0 under a session)
    pub seqid: u32,
    /// State id of the file to close
    pub open_stateid: stateid4,
}
XDRStruct!(CLOSE4args, seqid, open_stateid);

/// Successful response for CLOSE: the now-invalid state id.
#[derive(Clone, Debug, Default)]
pub struct CLOSE4resok {
    /// State id that was just closed
    pub open_stateid: stateid4,
}
XDRStruct!(CLOSE4resok, open_stateid);

/// An implementation identifier sent with EXCHANGE_ID, RFC 5661 section 18.35.
#[derive(Clone, Debug, Default)]
pub struct nfs_impl_id4 {
    /// Domain name of the implementer
    pub domain: XdrString,
    /// Implementation name
    pub name: XdrString,
    /// Build/release timestamp, seconds and nanoseconds since the epoch
    pub date: (u64, u32),
}

impl XDR for nfs_impl_id4 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.domain.serialize(dest)?;
        self.name.serialize(dest)?;
        self.date.0.serialize(dest)?;
        self.date.1.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.domain.deserialize(src)?;
        self.name.deserialize(src)?;
        self.date.0 = decode(src)?;
        self.date.1 = decode(src)?;
        Ok(())
    }
}

/// Arguments for EXCHANGE_ID: establishes a client id for a client owner,
/// RFC 5661 section 18.35. This client always requests
/// `EXCHGID4_FLAG_USE_NON_PNFS` and no state-protection.
#[derive(Clone, Debug, Default)]
pub struct EXCHANGE_ID4args {
    /// Client-chosen verifier distinguishing incarnations of this owner
    pub verifier: verifier4,
    /// Opaque owner identifier, unique to this client instance
    pub owner_id: Vec<u8>,
    /// EXCHGID4_FLAG_* bits requested
    pub flags: u32,
    /// Optional implementation identity sent to the server
    pub client_impl_id: Option<nfs_impl_id4>,
}

impl XDR for EXCHANGE_ID4args {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.verifier.serialize(dest)?;
        self.owner_id.serialize(dest)?;
        self.flags.serialize(dest)?;
        // state_protect4_a: SP4_NONE, the only mode this client requests.
        0u32.serialize(dest)?;
        self.client_impl_id.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.verifier.deserialize(src)?;
        self.owner_id = decode(src)?;
        self.flags = decode(src)?;
        let _state_protect: u32 = decode(src)?;
        self.client_impl_id = decode(src)?;
        Ok(())
    }
}

/// Successful response for EXCHANGE_ID.
#[derive(Clone, Debug, Default)]
pub struct EXCHANGE_ID4resok {
    /// Server-assigned client id to present on CREATE_SESSION
    pub clientid: clientid4,
    /// Echoed back from the request, used to detect confirmation races
    pub sequenceid: sequenceid4,
    /// EXCHGID4_FLAG_* bits the server granted
    pub flags: u32,
    /// Server owner identifier, presented back on CREATE_SESSION
    pub server_owner_minor_id: u64,
    /// Opaque server owner name
    pub server_owner_major_id: Vec<u8>,
    /// Opaque server scope, used to detect server restarts
    pub server_scope: Vec<u8>,
    /// Optional implementation identity reported by the server
    pub server_impl_id: Option<nfs_impl_id4>,
}

impl XDR for EXCHANGE_ID4resok {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.clientid.serialize(dest)?;
        self.sequenceid.serialize(dest)?;
        self.flags.serialize(dest)?;
        // state_protect4_r: SP4_NONE.
        0u32.serialize(dest)?;
        self.server_owner_minor_id.serialize(dest)?;
        self.server_owner_major_id.serialize(dest)?;
        self.server_scope.serialize(dest)?;
        self.server_impl_id.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.clientid = decode(src)?;
        self.sequenceid = decode(src)?;
        self.flags = decode(src)?;
        let _state_protect: u32 = decode(src)?;
        self.server_owner_minor_id = decode(src)?;
        self.server_owner_major_id = decode(src)?;
        self.server_scope = decode(src)?;
        self.server_impl_id = decode(src)?;
        Ok(())
    }
}

/// Fore/back channel attributes negotiated at CREATE_SESSION, RFC 5661
/// section 18.36. Both directions use the same shape.
#[derive(Clone, Debug)]
pub struct channel_attrs4 {
    /// Maximum size in bytes of a request header
    pub headerpadsize: u32,
    /// Maximum size in bytes of a request
    pub maxrequestsize: u32,
    /// Maximum size in bytes of a response
    pub maxresponsesize: u32,
    /// Maximum size in bytes of a cached response
    pub maxresponsesize_cached: u32,
    /// Maximum number of operations in one COMPOUND
    pub maxoperations: u32,
    /// Maximum number of outstanding requests (slot table width)
    pub maxrequests: u32,
    /// Optional RDMA read-ahead hint; empty for non-RDMA transports
    pub rdma_ird: Vec<u32>,
}
XDRStruct!(
    channel_attrs4,
    headerpadsize,
    maxrequestsize,
    maxresponsesize,
    maxresponsesize_cached,
    maxoperations,
    maxrequests,
    rdma_ird
);

impl Default for channel_attrs4 {
    fn default() -> Self {
        channel_attrs4 {
            headerpadsize: 0,
            maxrequestsize: 1024 * 1024,
            maxresponsesize: 1024 * 1024,
            maxresponsesize_cached: 8192,
            maxoperations: 16,
            maxrequests: 8,
            rdma_ird: Vec::new(),
        }
    }
}

/// Arguments for CREATE_SESSION, RFC 5661 section 18.36.
#[derive(Clone, Debug, Default)]
pub struct CREATE_SESSION4args {
    /// Client id obtained from EXCHANGE_ID
    pub clientid: clientid4,
    /// Sequence id, echoing EXCHANGE_ID's result; confirms this exchange
    pub sequenceid: sequenceid4,
    /// CREATE_SESSION4_FLAG_* bits requested
    pub flags: u32,
    /// Requested fore-channel (client-to-server) attributes
    pub fore_chan_attrs: channel_attrs4,
    /// Requested back-channel (server-to-client) attributes
    pub back_chan_attrs: channel_attrs4,
    /// Callback program number (0: this client does not implement a callback service)
    pub cb_program: u32,
}

impl XDR for CREATE_SESSION4args {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.clientid.serialize(dest)?;
        self.sequenceid.serialize(dest)?;
        self.flags.serialize(dest)?;
        self.fore_chan_attrs.serialize(dest)?;
        self.back_chan_attrs.serialize(dest)?;
        self.cb_program.serialize(dest)?;
        // csa_sec_parms: a single SP4_NONE (AUTH_NONE on the callback channel).
        1u32.serialize(dest)?;
        0u32.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.clientid = decode(src)?;
        self.sequenceid = decode(src)?;
        self.flags = decode(src)?;
        self.fore_chan_attrs.deserialize(src)?;
        self.back_chan_attrs.deserialize(src)?;
        self.cb_program = decode(src)?;
        let n: u32 = decode(src)?;
        for _ in 0..n {
            let _flavor: u32 = decode(src)?;
        }
        Ok(())
    }
}

/// Successful response for CREATE_SESSION.
#[derive(Clone, Debug)]
pub struct CREATE_SESSION4resok {
    /// Newly created session id
    pub sessionid: sessionid4,
    /// Initial sequence id for slot 0
    pub sequenceid: sequenceid4,
    /// CREATE_SESSION4_FLAG_* bits the server granted
    pub flags: u32,
    /// Negotiated fore-channel attributes
    pub fore_chan_attrs: channel_attrs4,
    /// Negotiated back-channel attributes
    pub back_chan_attrs: channel_attrs4,
}

impl Default for CREATE_SESSION4resok {
    fn default() -> Self {
        CREATE_SESSION4resok {
            sessionid: [0; super::NFS4_SESSIONID_SIZE],
            sequenceid: 0,
            flags: 0,
            fore_chan_attrs: channel_attrs4::default(),
            back_chan_attrs: channel_attrs4::default(),
        }
    }
}

impl XDR for CREATE_SESSION4resok {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.sessionid.serialize(dest)?;
        self.sequenceid.serialize(dest)?;
        self.flags.serialize(dest)?;
        self.fore_chan_attrs.serialize(dest)?;
        self.back_chan_attrs.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.sessionid.deserialize(src)?;
        self.sequenceid.deserialize(src)?;
        self.flags.deserialize(src)?;
        self.fore_chan_attrs.deserialize(src)?;
        self.back_chan_attrs.deserialize(src)
    }
}

/// Arguments for RECLAIM_COMPLETE, RFC 5661 section 18.51. This client
/// never reclaims prior open state (it has none across restarts), so it
/// always sends `one_fs == false` immediately after CREATE_SESSION.
#[derive(Clone, Debug, Default)]
pub struct RECLAIM_COMPLETE4args {
    /// If true, the reclaim-complete applies to a single file system only
    pub one_fs: bool,
}
XDRStruct!(RECLAIM_COMPLETE4args, one_fs);

/// Arguments for DESTROY_SESSION.
#[derive(Clone, Debug, Default)]
pub struct DESTROY_SESSION4args {
    /// Session to destroy
    pub sessionid: sessionid4,
}
XDRStruct!(DESTROY_SESSION4args, sessionid);

/// Arguments for SEQUENCE, the mandatory first operation of every
/// session-bound COMPOUND, RFC 5661 section 18.46. Reserves and advances
/// one slot's sequence counter for the duration of this call.
#[derive(Clone, Debug, Default)]
pub struct SEQUENCE4args {
    /// Session this request belongs to
    pub sessionid: sessionid4,
    /// Sequence id for `slotid`, incremented by one from the last use
    pub sequenceid: sequenceid4,
    /// Slot reserved for this request
    pub slotid: slotid4,
    /// Highest slot id this client has in use, for server flow control
    pub highest_slotid: slotid4,
    /// If true, asks the server to replay its cached reply for this slot/seq
    /// instead of executing the COMPOUND again - used when this client
    /// retransmits after a timeout without knowing if the original arrived.
    pub cache_this: bool,
}
XDRStruct!(SEQUENCE4args, sessionid, sequenceid, slotid, highest_slotid, cache_this);

/// Successful response for SEQUENCE.
#[derive(Clone, Debug, Default)]
pub struct SEQUENCE4resok {
    /// Echoes the session id from the request
    pub sessionid: sessionid4,
    /// Sequence id that was just consumed
    pub sequenceid: sequenceid4,
    /// Slot that was reserved
    pub slotid: slotid4,
    /// Highest slot id the server has seen from this client
    pub highest_slotid: slotid4,
    /// Highest slot id the server is currently willing to accept
    pub target_highest_slotid: slotid4,
    /// SEQ4_STATUS_* bits describing session-wide conditions (e.g. expiring lease)
    pub status_flags: u32,
}
XDRStruct!(
    SEQUENCE4resok,
    sessionid,
    sequenceid,
    slotid,
    highest_slotid,
    target_highest_slotid,
    status_flags
);

/// One operation in a `COMPOUND` request: an operation number followed by
/// its type-specific arguments, RFC 5661 section 1.2.1's `nfs_argop4`.
///
/// This is a hand-grounded discriminated union rather than a macro-derived
/// one: the discriminant (`OpCode as u32`) and payload type differ per
/// variant in a way the `XDRBoolUnion!`/`XDREnumSerde!` shapes don't cover.
#[derive(Clone, Debug)]
pub enum nfs_argop4 {
    /// PUTROOTFH
    OP_PUTROOTFH(PUTROOTFH4args),
    /// PUTFH
    OP_PUTFH(PUTFH4args),
    /// GETFH
    OP_GETFH(GETFH4args),
    /// SAVEFH
    OP_SAVEFH(SAVEFH4args),
    /// GETATTR
    OP_GETATTR(GETATTR4args),
    /// SETATTR
    OP_SETATTR(SETATTR4args),
    /// LOOKUP
    OP_LOOKUP(LOOKUP4args),
    /// CREATE
    OP_CREATE(CREATE4args),
    /// LINK
    OP_LINK(LINK4args),
    /// READDIR
    OP_READDIR(READDIR4args),
    /// READLINK
    OP_READLINK(READLINK4args),
    /// REMOVE
    OP_REMOVE(REMOVE4args),
    /// RENAME
    OP_RENAME(RENAME4args),
    /// READ
    OP_READ(READ4args),
    /// WRITE
    OP_WRITE(WRITE4args),
    /// OPEN
    OP_OPEN(OPEN4args),
    /// CLOSE
    OP_CLOSE(CLOSE4args),
    /// EXCHANGE_ID
    OP_EXCHANGE_ID(EXCHANGE_ID4args),
    /// CREATE_SESSION
    OP_CREATE_SESSION(CREATE_SESSION4args),
    /// DESTROY_SESSION
    OP_DESTROY_SESSION(DESTROY_SESSION4args),
    /// RECLAIM_COMPLETE
    OP_RECLAIM_COMPLETE(RECLAIM_COMPLETE4args),
    /// SEQUENCE
    OP_SEQUENCE(SEQUENCE4args),
}

impl nfs_argop4 {
    fn opcode(&self) -> OpCode {
        match self {
            nfs_argop4::OP_PUTROOTFH(_) => OpCode::PUTROOTFH,
            nfs_argop4::OP_PUTFH(_) => OpCode::PUTFH,
            nfs_argop4::OP_GETFH(_) => OpCode::GETFH,
            nfs_argop4::OP_SAVEFH(_) => OpCode::SAVEFH,
            nfs_argop4::OP_GETATTR(_) => OpCode::GETATTR,
            nfs_argop4::OP_SETATTR(_) => OpCode::SETATTR,
            nfs_argop4::OP_LOOKUP(_) => OpCode::LOOKUP,
            nfs_argop4::OP_CREATE(_) => OpCode::CREATE,
            nfs_argop4::OP_LINK(_) => OpCode::LINK,
            nfs_argop4::OP_READDIR(_) => OpCode::READDIR,
            nfs_argop4::OP_READLINK(_) => OpCode::READLINK,
            nfs_argop4::OP_REMOVE(_) => OpCode::REMOVE,
            nfs_argop4::OP_RENAME(_) => OpCode::RENAME,
            nfs_argop4::OP_READ(_) => OpCode::READ,
            nfs_argop4::OP_WRITE(_) => OpCode::WRITE,
            nfs_argop4::OP_OPEN(_) => OpCode::OPEN,
            nfs_argop4::OP_CLOSE(_) => OpCode::CLOSE,
            nfs_argop4::OP_EXCHANGE_ID(_) => OpCode::EXCHANGE_ID,
            nfs_argop4::OP_CREATE_SESSION(_) => OpCode::CREATE_SESSION,
            nfs_argop4::OP_DESTROY_SESSION(_) => OpCode::DESTROY_SESSION,
            nfs_argop4::OP_RECLAIM_COMPLETE(_) => OpCode::RECLAIM_COMPLETE,
            nfs_argop4::OP_SEQUENCE(_) => OpCode::SEQUENCE,
        }
    }
}

impl XDR for nfs_argop4 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        (self.opcode() as u32).serialize(dest)?;
        match self {
            nfs_argop4::OP_PUTROOTFH(a) => a.serialize(dest),
            nfs_argop4::OP_PUTFH(a) => a.serialize(dest),
            nfs_argop4::OP_GETFH(a) => a.serialize(dest),
            nfs_argop4::OP_SAVEFH(a) => a.serialize(dest),
            nfs_argop4::OP_GETATTR(a) => a.serialize(dest),
            nfs_argop4::OP_SETATTR(a) => a.serialize(dest),
            nfs_argop4::OP_LOOKUP(a) => a.serialize(dest),
            nfs_argop4::OP_CREATE(a) => a.serialize(dest),
            nfs_argop4::OP_LINK(a) => a.serialize(dest),
            nfs_argop4::OP_READDIR(a) => a.serialize(dest),
            nfs_argop4::OP_READLINK(a) => a.serialize(dest),
            nfs_argop4::OP_REMOVE(a) => a.serialize(dest),
            nfs_argop4::OP_RENAME(a) => a.serialize(dest),
            nfs_argop4::OP_READ(a) => a.serialize(dest),
            nfs_argop4::OP_WRITE(a) => a.serialize(dest),
            nfs_argop4::OP_OPEN(a) => a.serialize(dest),
            nfs_argop4::OP_CLOSE(a) => a.serialize(dest),
            nfs_argop4::OP_EXCHANGE_ID(a) => a.serialize(dest),
            nfs_argop4::OP_CREATE_SESSION(a) => a.serialize(dest),
            nfs_argop4::OP_DESTROY_SESSION(a) => a.serialize(dest),
            nfs_argop4::OP_RECLAIM_COMPLETE(a) => a.serialize(dest),
            nfs_argop4::OP_SEQUENCE(a) => a.serialize(dest),
        }
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let op: u32 = decode(src)?;
        *self = match op {
            x if x == OpCode::PUTROOTFH as u32 => nfs_argop4::OP_PUTROOTFH(decode(src)?),
            x if x == OpCode::PUTFH as u32 => nfs_argop4::OP_PUTFH(decode(src)?),
            x if x == OpCode::GETFH as u32 => nfs_argop4::OP_GETFH(decode(src)?),
            x if x == OpCode::SAVEFH as u32 => nfs_argop4::OP_SAVEFH(decode(src)?),
            x if x == OpCode::GETATTR as u32 => nfs_argop4::OP_GETATTR(decode(src)?),
            x if x == OpCode::SETATTR as u32 => nfs_argop4::OP_SETATTR(decode(src)?),
            x if x == OpCode::LOOKUP as u32 => nfs_argop4::OP_LOOKUP(decode(src)?),
            x if x == OpCode::CREATE as u32 => nfs_argop4::OP_CREATE(decode(src)?),
            x if x == OpCode::LINK as u32 => nfs_argop4::OP_LINK(decode(src)?),
            x if x == OpCode::READDIR as u32 => nfs_argop4::OP_READDIR(decode(src)?),
            x if x == OpCode::READLINK as u32 => nfs_argop4::OP_READLINK(decode(src)?),
            x if x == OpCode::REMOVE as u32 => nfs_argop4::OP_REMOVE(decode(src)?),
            x if x == OpCode::RENAME as u32 => nfs_argop4::OP_RENAME(decode(src)?),
            x if x == OpCode::READ as u32 => nfs_argop4::OP_READ(decode(src)?),
            x if x == OpCode::WRITE as u32 => nfs_argop4::OP_WRITE(decode(src)?),
            x if x == OpCode::OPEN as u32 => nfs_argop4::OP_OPEN(decode(src)?),
            x if x == OpCode::CLOSE as u32 => nfs_argop4::OP_CLOSE(decode(src)?),
            x if x == OpCode::EXCHANGE_ID as u32 => nfs_argop4::OP_EXCHANGE_ID(decode(src)?),
            x if x == OpCode::CREATE_SESSION as u32 => {
                nfs_argop4::OP_CREATE_SESSION(decode(src)?)
            }
            x if x == OpCode::DESTROY_SESSION as u32 => {
                nfs_argop4::OP_DESTROY_SESSION(decode(src)?)
            }
            x if x == OpCode::RECLAIM_COMPLETE as u32 => {
                nfs_argop4::OP_RECLAIM_COMPLETE(decode(src)?)
            }
            x if x == OpCode::SEQUENCE as u32 => nfs_argop4::OP_SEQUENCE(decode(src)?),
            other => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("unsupported nfs_argop4 opcode {}", other),
                ))
            }
        };
        Ok(())
    }
}

impl Default for nfs_argop4 {
    fn default() -> Self {
        nfs_argop4::OP_PUTROOTFH(PUTROOTFH4args)
    }
}

/// One operation's result inside a `COMPOUND` reply: an operation number,
/// a per-operation status, and (on success) the type-specific result body,
/// RFC 5661 section 1.2.1's `nfs_resop4`.
#[derive(Clone, Debug)]
pub enum nfs_resop4 {
    /// PUTROOTFH
    OP_PUTROOTFH(nfsstat4),
    /// PUTFH
    OP_PUTFH(nfsstat4),
    /// GETFH
    OP_GETFH(nfsstat4, Option<GETFH4resok>),
    /// SAVEFH
    OP_SAVEFH(nfsstat4),
    /// GETATTR
    OP_GETATTR(nfsstat4, Option<GETATTR4resok>),
    /// SETATTR
    OP_SETATTR(nfsstat4, Option<SETATTR4resok>),
    /// LOOKUP
    OP_LOOKUP(nfsstat4),
    /// CREATE
    OP_CREATE(nfsstat4, Option<CREATE4resok>),
    /// LINK
    OP_LINK(nfsstat4, Option<LINK4resok>),
    /// READDIR
    OP_READDIR(nfsstat4, Option<READDIR4resok>),
    /// READLINK
    OP_READLINK(nfsstat4, Option<READLINK4resok>),
    /// REMOVE
    OP_REMOVE(nfsstat4, Option<REMOVE4resok>),
    /// RENAME
    OP_RENAME(nfsstat4, Option<RENAME4resok>),
    /// READ
    OP_READ(nfsstat4, Option<READ4resok>),
    /// WRITE
    OP_WRITE(nfsstat4, Option<WRITE4resok>),
    /// OPEN
    OP_OPEN(nfsstat4, Option<OPEN4resok>),
    /// CLOSE
    OP_CLOSE(nfsstat4, Option<CLOSE4resok>),
    /// EXCHANGE_ID
    OP_EXCHANGE_ID(nfsstat4, Option<EXCHANGE_ID4resok>),
    /// CREATE_SESSION
    OP_CREATE_SESSION(nfsstat4, Option<CREATE_SESSION4resok>),
    /// DESTROY_SESSION
    OP_DESTROY_SESSION(nfsstat4),
    /// RECLAIM_COMPLETE
    OP_RECLAIM_COMPLETE(nfsstat4),
    /// SEQUENCE
    OP_SEQUENCE(nfsstat4, Option<SEQUENCE4resok>),
    /// An operation number this client doesn't implement decoding for, kept
    /// around so a COMPOUND reply containing it doesn't become unparseable.
    OP_ILLEGAL(nfsstat4),
}

impl nfs_resop4 {
    /// The per-operation status this result carries.
    pub fn status(&self) -> nfsstat4 {
        match self {
            nfs_resop4::OP_PUTROOTFH(s)
            | nfs_resop4::OP_PUTFH(s)
            | nfs_resop4::OP_GETFH(s, _)
            | nfs_resop4::OP_SAVEFH(s)
            | nfs_resop4::OP_GETATTR(s, _)
            | nfs_resop4::OP_SETATTR(s, _)
            | nfs_resop4::OP_LOOKUP(s)
            | nfs_resop4::OP_CREATE(s, _)
            | nfs_resop4::OP_LINK(s, _)
            | nfs_resop4::OP_READDIR(s, _)
            | nfs_resop4::OP_READLINK(s, _)
            | nfs_resop4::OP_REMOVE(s, _)
            | nfs_resop4::OP_RENAME(s, _)
            | nfs_resop4::OP_READ(s, _)
            | nfs_resop4::OP_WRITE(s, _)
            | nfs_resop4::OP_OPEN(s, _)
            | nfs_resop4::OP_CLOSE(s, _)
            | nfs_resop4::OP_EXCHANGE_ID(s, _)
            | nfs_resop4::OP_CREATE_SESSION(s, _)
            | nfs_resop4::OP_DESTROY_SESSION(s)
            | nfs_resop4::OP_RECLAIM_COMPLETE(s)
            | nfs_resop4::OP_SEQUENCE(s, _)
            | nfs_resop4::OP_ILLEGAL(s) => *s,
        }
    }
}

macro_rules! decode_resop_with_body {
    ($src:expr, $status:expr, $variant:ident, $ok_ty:ty) => {
        if $status == nfsstat4::NFS4_OK {
            nfs_resop4::$variant($status, Some(decode::<$ok_ty, _>($src)?))
        } else {
            nfs_resop4::$variant($status, None)
        }
    };
}

impl XDR for nfs_resop4 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        macro_rules! write_opcode {
            ($code:expr) => {
                ($code as u32).serialize(dest)?
            };
        }
        match self {
            nfs_resop4::OP_PUTROOTFH(s) => {
                write_opcode!(OpCode::PUTROOTFH);
                s.serialize(dest)
            }
            nfs_resop4::OP_PUTFH(s) => {
                write_opcode!(OpCode::PUTFH);
                s.serialize(dest)
            }
            nfs_resop4::OP_GETFH(s, ok) => {
                write_opcode!(OpCode::GETFH);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_SAVEFH(s) => {
                write_opcode!(OpCode::SAVEFH);
                s.serialize(dest)
            }
            nfs_resop4::OP_GETATTR(s, ok) => {
                write_opcode!(OpCode::GETATTR);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_SETATTR(s, ok) => {
                write_opcode!(OpCode::SETATTR);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_LOOKUP(s) => {
                write_opcode!(OpCode::LOOKUP);
                s.serialize(dest)
            }
            nfs_resop4::OP_CREATE(s, ok) => {
                write_opcode!(OpCode::CREATE);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_LINK(s, ok) => {
                write_opcode!(OpCode::LINK);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_READDIR(s, ok) => {
                write_opcode!(OpCode::READDIR);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_READLINK(s, ok) => {
                write_opcode!(OpCode::READLINK);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_REMOVE(s, ok) => {
                write_opcode!(OpCode::REMOVE);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_RENAME(s, ok) => {
                write_opcode!(OpCode::RENAME);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_READ(s, ok) => {
                write_opcode!(OpCode::READ);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_WRITE(s, ok) => {
                write_opcode!(OpCode::WRITE);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_OPEN(s, ok) => {
                write_opcode!(OpCode::OPEN);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_CLOSE(s, ok) => {
                write_opcode!(OpCode::CLOSE);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_EXCHANGE_ID(s, ok) => {
                write_opcode!(OpCode::EXCHANGE_ID);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_CREATE_SESSION(s, ok) => {
                write_opcode!(OpCode::CREATE_SESSION);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_DESTROY_SESSION(s) => {
                write_opcode!(OpCode::DESTROY_SESSION);
                s.serialize(dest)
            }
            nfs_resop4::OP_RECLAIM_COMPLETE(s) => {
                write_opcode!(OpCode::RECLAIM_COMPLETE);
                s.serialize(dest)
            }
            nfs_resop4::OP_SEQUENCE(s, ok) => {
                write_opcode!(OpCode::SEQUENCE);
                s.serialize(dest)?;
                if *s == nfsstat4::NFS4_OK {
                    ok.as_ref().expect("OK result missing body").serialize(dest)?;
                }
                Ok(())
            }
            nfs_resop4::OP_ILLEGAL(s) => {
                10044u32.serialize(dest)?; // OP_ILLEGAL
                s.serialize(dest)
            }
        }
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let op: u32 = decode(src)?;
        let status: nfsstat4 = decode(src)?;
        *self = match op {
            x if x == OpCode::PUTROOTFH as u32 => nfs_resop4::OP_PUTROOTFH(status),
            x if x == OpCode::PUTFH as u32 => nfs_resop4::OP_PUTFH(status),
            x if x == OpCode::GETFH as u32 => {
                decode_resop_with_body!(src, status, OP_GETFH, GETFH4resok)
            }
            x if x == OpCode::SAVEFH as u32 => nfs_resop4::OP_SAVEFH(status),
            x if x == OpCode::GETATTR as u32 => {
                decode_resop_with_body!(src, status, OP_GETATTR, GETATTR4resok)
            }
            x if x == OpCode::SETATTR as u32 => {
                decode_resop_with_body!(src, status, OP_SETATTR, SETATTR4resok)
            }
            x if x == OpCode::LOOKUP as u32 => nfs_resop4::OP_LOOKUP(status),
            x if x == OpCode::CREATE as u32 => {
                decode_resop_with_body!(src, status, OP_CREATE, CREATE4resok)
            }
            x if x == OpCode::LINK as u32 => {
                decode_resop_with_body!(src, status, OP_LINK, LINK4resok)
            }
            x if x == OpCode::READDIR as u32 => {
                decode_resop_with_body!(src, status, OP_READDIR, READDIR4resok)
            }
            x if x == OpCode::READLINK as u32 => {
                decode_resop_with_body!(src, status, OP_READLINK, READLINK4resok)
            }
            x if x == OpCode::REMOVE as u32 => {
                decode_resop_with_body!(src, status, OP_REMOVE, REMOVE4resok)
            }
            x if x == OpCode::RENAME as u32 => {
                decode_resop_with_body!(src, status, OP_RENAME, RENAME4resok)
            }
            x if x == OpCode::READ as u32 => {
                decode_resop_with_body!(src, status, OP_READ, READ4resok)
            }
            x if x == OpCode::WRITE as u32 => {
                decode_resop_with_body!(src, status, OP_WRITE, WRITE4resok)
            }
            x if x == OpCode::OPEN as u32 => {
                decode_resop_with_body!(src, status, OP_OPEN, OPEN4resok)
            }
            x if x == OpCode::CLOSE as u32 => {
                decode_resop_with_body!(src, status, OP_CLOSE, CLOSE4resok)
            }
            x if x == OpCode::EXCHANGE_ID as u32 => {
                decode_resop_with_body!(src, status, OP_EXCHANGE_ID, EXCHANGE_ID4resok)
            }
            x if x == OpCode::CREATE_SESSION as u32 => {
                decode_resop_with_body!(src, status, OP_CREATE_SESSION, CREATE_SESSION4resok)
            }
            x if x == OpCode::DESTROY_SESSION as u32 => nfs_resop4::OP_DESTROY_SESSION(status),
            x if x == OpCode::RECLAIM_COMPLETE as u32 => {
                nfs_resop4::OP_RECLAIM_COMPLETE(status)
            }
            x if x == OpCode::SEQUENCE as u32 => {
                decode_resop_with_body!(src, status, OP_SEQUENCE, SEQUENCE4resok)
            }
            _ => nfs_resop4::OP_ILLEGAL(status),
        };
        Ok(())
    }
}

impl Default for nfs_resop4 {
    fn default() -> Self {
        nfs_resop4::OP_ILLEGAL(nfsstat4::NFS4_OK)
    }
}

/// The single RPC procedure NFSv4.1 uses for everything: a client-chosen
/// free-form tag plus the ordered operation sequence, RFC 5661 section 1.2.1.
#[derive(Clone, Debug, Default)]
pub struct COMPOUND4args {
    /// Free-form diagnostic tag, echoed back in the reply
    pub tag: XdrString,
    /// Minor version, always [`super::MINOR_VERSION`] for this client
    pub minorversion: u32,
    /// The operations to execute, in order
    pub argarray: Vec<nfs_argop4>,
}
XDRStruct!(COMPOUND4args, tag, minorversion, argarray);

/// Reply to a `COMPOUND` call.
///
/// Per RFC 5661 section 15.2, `status` is the status of the last operation
/// executed (or the first to fail), and `resarray` holds exactly the
/// results for the operations that were attempted - execution stops at the
/// first operation that returns anything other than `NFS4_OK`.
#[derive(Clone, Debug, Default)]
pub struct COMPOUND4res {
    /// Status of the last operation executed
    pub status: nfsstat4,
    /// Echoed diagnostic tag from the request
    pub tag: XdrString,
    /// Results for each operation attempted
    pub resarray: Vec<nfs_resop4>,
}
XDRStruct!(COMPOUND4res, status, tag, resarray);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::xdr::decode;

    #[test]
    fn compound_args_roundtrip_sequence_putfh_getattr() {
        let args = COMPOUND4args {
            tag: "lookup".into(),
            minorversion: 1,
            argarray: vec![
                nfs_argop4::OP_SEQUENCE(SEQUENCE4args {
                    sessionid: [1; 16],
                    sequenceid: 5,
                    slotid: 0,
                    highest_slotid: 0,
                    cache_this: false,
                }),
                nfs_argop4::OP_PUTFH(PUTFH4args { object: vec![1, 2, 3] }),
                nfs_argop4::OP_GETATTR(GETATTR4args {
                    attr_request: bitmap4(vec![1 << 1 | 1 << 4]),
                }),
            ],
        };
        let mut buf = Vec::new();
        args.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: COMPOUND4args = decode(&mut cursor).unwrap();
        assert_eq!(decoded.argarray.len(), 3);
        assert!(matches!(decoded.argarray[1], nfs_argop4::OP_PUTFH(_)));
    }

    #[test]
    fn compound_res_stops_at_first_failure() {
        let res = COMPOUND4res {
            status: nfsstat4::NFS4ERR_NOENT,
            tag: "lookup".into(),
            resarray: vec![
                nfs_resop4::OP_SEQUENCE(
                    nfsstat4::NFS4_OK,
                    Some(SEQUENCE4resok::default()),
                ),
                nfs_resop4::OP_PUTFH(nfsstat4::NFS4_OK),
                nfs_resop4::OP_LOOKUP(nfsstat4::NFS4ERR_NOENT),
            ],
        };
        let mut buf = Vec::new();
        res.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: COMPOUND4res = decode(&mut cursor).unwrap();
        assert_eq!(decoded.resarray.len(), 3);
        assert_eq!(decoded.resarray[2].status(), nfsstat4::NFS4ERR_NOENT);
    }

    #[test]
    fn open_create_unchecked_roundtrips() {
        let args = OPEN4args {
            seqid: 0,
            share_access: OPEN4_SHARE_ACCESS_BOTH,
            share_deny: 0,
            owner: vec![1, 2, 3, 4],
            openhow: opentype4::OPEN4_CREATE,
            createhow: Some(createhow4 {
                mode: createmode4::UNCHECKED4,
                createattrs: fattr4::default(),
                createverf: [0; 8],
            }),
            claim_name: "newfile.txt".into(),
        };
        let mut buf = Vec::new();
        args.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: OPEN4args = decode(&mut cursor).unwrap();
        assert_eq!(decoded.claim_name.to_string(), "newfile.txt");
        assert!(decoded.createhow.is_some());
    }
}
