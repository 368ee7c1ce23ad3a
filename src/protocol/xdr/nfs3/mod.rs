//! The module defines XDR data types and constants for Network File System (NFS)
//! version 3, as defined in RFC 1813.
//!
//! NFS version 3 is a stateless distributed file system protocol that provides
//! transparent remote access to shared file systems over a network. This
//! module provides the data structures this client uses to build NFSv3 calls
//! and parse their replies.
//!
//! This module defines the constants, basic data types, and complex structures
//! that form the foundation of the NFSv3 protocol as specified in RFC 1813.

// Allow unused code since we're implementing the full NFS3 protocol specification
#![allow(dead_code)]
// Preserve original RFC naming conventions for consistency with the specification
#![allow(non_camel_case_types)]

use std::fmt;
use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::XDR;
use crate::{XDRBoolUnion, XDREnumSerde, XDRStruct};

// Modules for different operation types
pub mod dir;
pub mod file;
pub mod fs;

// Section 2.2 Constants
/// The RPC program number for NFS version 3 service.
pub const PROGRAM: u32 = 100003;
/// The version number for NFS version 3 protocol.
pub const VERSION: u32 = 3;

// Section 2.4 Sizes
/// The maximum size in bytes of the opaque file handle.
pub const NFS3_FHSIZE: u32 = 64;

/// The size in bytes of the opaque cookie verifier passed by
/// READDIR and READDIRPLUS.
pub const NFS3_COOKIEVERFSIZE: u32 = 8;

/// The size in bytes of the opaque verifier used for
/// exclusive CREATE.
pub const NFS3_CREATEVERFSIZE: u32 = 8;

/// The size in bytes of the opaque verifier used for
/// asynchronous WRITE.
pub const NFS3_WRITEVERFSIZE: u32 = 8;

// Section 2.5 Basic Data Types
/// A string type used in NFS for filenames and paths.
///
/// This is essentially a vector of bytes, but with specific
/// formatting for NFS protocol requirements.
#[allow(non_camel_case_types)]
#[derive(Default, Clone, PartialEq, Eq)]
pub struct nfsstring(pub Vec<u8>);

impl nfsstring {
    /// Returns the length of the string in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the string is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for nfsstring {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for nfsstring {
    fn from(value: &[u8]) -> Self {
        Self(value.into())
    }
}

impl From<&str> for nfsstring {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for nfsstring {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl AsRef<[u8]> for nfsstring {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::Deref for nfsstring {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for nfsstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for nfsstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl XDR for nfsstring {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.0.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.0.deserialize(src)
    }
}

/// Procedure numbers for NFS version 3 protocol.
#[allow(non_camel_case_types)]
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum NFSProgram {
    /// Do nothing - used primarily for performance measurement
    NFSPROC3_NULL = 0,
    /// Get file attributes
    NFSPROC3_GETATTR = 1,
    /// Set file attributes
    NFSPROC3_SETATTR = 2,
    /// Look up filename
    NFSPROC3_LOOKUP = 3,
    /// Check file access permission
    NFSPROC3_ACCESS = 4,
    /// Read from symbolic link
    NFSPROC3_READLINK = 5,
    /// Read from file
    NFSPROC3_READ = 6,
    /// Write to file
    NFSPROC3_WRITE = 7,
    /// Create file
    NFSPROC3_CREATE = 8,
    /// Create directory
    NFSPROC3_MKDIR = 9,
    /// Create symbolic link
    NFSPROC3_SYMLINK = 10,
    /// Create special device
    NFSPROC3_MKNOD = 11,
    /// Remove file
    NFSPROC3_REMOVE = 12,
    /// Remove directory
    NFSPROC3_RMDIR = 13,
    /// Rename file or directory
    NFSPROC3_RENAME = 14,
    /// Create hard link
    NFSPROC3_LINK = 15,
    /// Read directory
    NFSPROC3_READDIR = 16,
    /// Extended read directory
    NFSPROC3_READDIRPLUS = 17,
    /// Get file system statistics
    NFSPROC3_FSSTAT = 18,
    /// Get file system information
    NFSPROC3_FSINFO = 19,
    /// Get path configuration
    NFSPROC3_PATHCONF = 20,
    /// Commit cached data
    NFSPROC3_COMMIT = 21,
}

/// Opaque byte type as defined in RFC 1813 section 2.5
pub type opaque = u8;
/// Filename type as defined in RFC 1813 section 2.5
pub type filename3 = nfsstring;
/// Path type as defined in RFC 1813 section 2.5
pub type nfspath3 = nfsstring;
/// File identifier as defined in RFC 1813 section 2.5
pub type fileid3 = u64;
/// Directory entry position cookie as defined in RFC 1813 section 2.5
pub type cookie3 = u64;
/// Cookie verifier for directory operations as defined in RFC 1813 section 2.5
pub type cookieverf3 = [opaque; NFS3_COOKIEVERFSIZE as usize];
/// Create verifier for exclusive file creation as defined in RFC 1813 section 2.5
pub type createverf3 = [opaque; NFS3_CREATEVERFSIZE as usize];
/// Write verifier for asynchronous writes as defined in RFC 1813 section 2.5
pub type writeverf3 = [opaque; NFS3_WRITEVERFSIZE as usize];
/// User ID as defined in RFC 1813 section 2.5
pub type uid3 = u32;
/// Group ID as defined in RFC 1813 section 2.5
pub type gid3 = u32;
/// File size in bytes as defined in RFC 1813 section 2.5
pub type size3 = u64;
/// File offset in bytes as defined in RFC 1813 section 2.5
pub type offset3 = u64;
/// File mode bits as defined in RFC 1813 section 2.5
pub type mode3 = u32;
/// Count of bytes or entries as defined in RFC 1813 section 2.5
pub type count3 = u32;

/// Status codes returned by NFS version 3 operations
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum nfsstat3 {
    /// Indicates the call completed successfully.
    #[default]
    NFS3_OK = 0,
    /// Not owner. The operation was not allowed because the caller is either
    /// not a privileged user (root) or not the owner of the target object.
    NFS3ERR_PERM = 1,
    /// No such file or directory.
    NFS3ERR_NOENT = 2,
    /// I/O error. A hard error occurred while processing the operation.
    NFS3ERR_IO = 5,
    /// I/O error. No such device or address.
    NFS3ERR_NXIO = 6,
    /// Permission denied.
    NFS3ERR_ACCES = 13,
    /// File exists.
    NFS3ERR_EXIST = 17,
    /// Attempt to do a cross-device hard link.
    NFS3ERR_XDEV = 18,
    /// No such device.
    NFS3ERR_NODEV = 19,
    /// Not a directory.
    NFS3ERR_NOTDIR = 20,
    /// Is a directory.
    NFS3ERR_ISDIR = 21,
    /// Invalid argument or unsupported argument for an operation.
    NFS3ERR_INVAL = 22,
    /// File too large.
    NFS3ERR_FBIG = 27,
    /// No space left on device.
    NFS3ERR_NOSPC = 28,
    /// Read-only file system.
    NFS3ERR_ROFS = 30,
    /// Too many hard links.
    NFS3ERR_MLINK = 31,
    /// The filename in an operation was too long.
    NFS3ERR_NAMETOOLONG = 63,
    /// An attempt was made to remove a non-empty directory.
    NFS3ERR_NOTEMPTY = 66,
    /// Resource (quota) hard limit exceeded.
    NFS3ERR_DQUOT = 69,
    /// Invalid file handle - this client retries the resolving LOOKUP once.
    NFS3ERR_STALE = 70,
    /// Too many levels of remote in path.
    NFS3ERR_REMOTE = 71,
    /// Illegal NFS file handle.
    NFS3ERR_BADHANDLE = 10001,
    /// Update synchronization mismatch detected during SETATTR.
    NFS3ERR_NOT_SYNC = 10002,
    /// READDIR or READDIRPLUS cookie is stale.
    NFS3ERR_BAD_COOKIE = 10003,
    /// Operation is not supported.
    NFS3ERR_NOTSUPP = 10004,
    /// Buffer or request is too small.
    NFS3ERR_TOOSMALL = 10005,
    /// Server error that doesn't map to any other NFSv3 status.
    NFS3ERR_SERVERFAULT = 10006,
    /// Attempt to create an object of a type the server doesn't support.
    NFS3ERR_BADTYPE = 10007,
    /// Server could not complete the request in time; retry with a new xid.
    NFS3ERR_JUKEBOX = 10008,
}
XDREnumSerde!(nfsstat3);

/// File type enumeration as defined in RFC 1813 section 2.3.5
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum ftype3 {
    /// Regular File
    #[default]
    NF3REG = 1,
    /// Directory
    NF3DIR = 2,
    /// Block Special Device
    NF3BLK = 3,
    /// Character Special Device
    NF3CHR = 4,
    /// Symbolic Link
    NF3LNK = 5,
    /// Socket
    NF3SOCK = 6,
    /// Named Pipe
    NF3FIFO = 7,
}
XDREnumSerde!(ftype3);

/// Special device information for character and block special devices
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default)]
pub struct specdata3 {
    /// Major device number
    pub specdata1: u32,
    /// Minor device number
    pub specdata2: u32,
}
XDRStruct!(specdata3, specdata1, specdata2);

/// The NFS version 3 file handle.
///
/// The server is responsible for the internal format and interpretation of
/// the bytes; this client treats it as an opaque token, obtained from MOUNT
/// or a directory operation and handed back verbatim on later calls.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct nfs_fh3 {
    /// Raw file handle data (up to NFS3_FHSIZE bytes)
    pub data: Vec<u8>,
}
XDRStruct!(nfs_fh3, data);

/// NFS version 3 time structure
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct nfstime3 {
    /// Seconds since Unix epoch (January 1, 1970)
    pub seconds: u32,
    /// Nanoseconds (0-999999999)
    pub nseconds: u32,
}
XDRStruct!(nfstime3, seconds, nseconds);

/// File attributes in NFS version 3 as defined in RFC 1813 section 2.3.5
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default)]
pub struct fattr3 {
    /// Type of file (regular, directory, symbolic link, etc.)
    pub ftype: ftype3,
    /// File access mode bits
    pub mode: mode3,
    /// Number of hard links to the file
    pub nlink: u32,
    /// User ID of the file owner
    pub uid: uid3,
    /// Group ID of the file's group
    pub gid: gid3,
    /// File size in bytes
    pub size: size3,
    /// Size in bytes actually allocated to the file on the server's disk
    pub used: size3,
    /// Device ID information for character or block special files
    pub rdev: specdata3,
    /// File system identifier
    pub fsid: u64,
    /// File identifier (inode number)
    pub fileid: fileid3,
    /// Time of last access to the file data
    pub atime: nfstime3,
    /// Time of last modification to the file data
    pub mtime: nfstime3,
    /// Time of last change to the file's attributes
    pub ctime: nfstime3,
}
XDRStruct!(fattr3, ftype, mode, nlink, uid, gid, size, used, rdev, fsid, fileid, atime, mtime, ctime);

/// Attributes used in weak cache consistency checking, RFC 1813 section 2.3.8
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default)]
pub struct wcc_attr {
    /// File size in bytes
    pub size: size3,
    /// Last modification time of the file
    pub mtime: nfstime3,
    /// Last status change time of the file
    pub ctime: nfstime3,
}
XDRStruct!(wcc_attr, size, mtime, ctime);

/// Pre-operation attributes for weak cache consistency, RFC 1813 section 2.3.8
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default)]
#[repr(u32)]
pub enum pre_op_attr {
    #[default]
    /// No attributes available
    Void,
    /// Attributes are available
    attributes(wcc_attr),
}
XDRBoolUnion!(pre_op_attr, attributes, wcc_attr);

/// Post-operation attributes, returned in almost all NFSv3 replies so the
/// client can refresh its cache without an extra GETATTR round trip.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default)]
#[repr(u32)]
pub enum post_op_attr {
    #[default]
    /// No attributes available
    Void,
    /// Attributes are available
    attributes(fattr3),
}
XDRBoolUnion!(post_op_attr, attributes, fattr3);

impl post_op_attr {
    /// Returns the attributes if present.
    pub fn attr(&self) -> Option<&fattr3> {
        match self {
            post_op_attr::Void => None,
            post_op_attr::attributes(a) => Some(a),
        }
    }
}

/// Weak cache consistency data: attributes before and after an operation.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default)]
pub struct wcc_data {
    /// File attributes before operation
    pub before: pre_op_attr,
    /// File attributes after operation
    pub after: post_op_attr,
}
XDRStruct!(wcc_data, before, after);

/// Optional file handle response
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
#[repr(u32)]
pub enum post_op_fh3 {
    #[default]
    /// No file handle
    Void,
    /// File handle is available
    handle(nfs_fh3),
}
XDRBoolUnion!(post_op_fh3, handle, nfs_fh3);

/// Optional file mode for SETATTR operations
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug)]
#[repr(u32)]
pub enum set_mode3 {
    /// Don't change mode
    Void,
    /// Set to specified mode
    mode(mode3),
}
XDRBoolUnion!(set_mode3, mode, mode3);

/// Optional user ID for SETATTR operations
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug)]
#[repr(u32)]
pub enum set_uid3 {
    /// Don't change user ID
    Void,
    /// Set to specified user ID
    uid(uid3),
}
XDRBoolUnion!(set_uid3, uid, uid3);

/// Optional group ID for SETATTR operations
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug)]
#[repr(u32)]
pub enum set_gid3 {
    /// Don't change group ID
    Void,
    /// Set to specified group ID
    gid(gid3),
}
XDRBoolUnion!(set_gid3, gid, gid3);

/// Optional file size for SETATTR operations
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug)]
#[repr(u32)]
pub enum set_size3 {
    /// Don't change file size
    Void,
    /// Set to specified size
    size(size3),
}
XDRBoolUnion!(set_size3, size, size3);

/// How to modify an access/modify timestamp during SETATTR: leave it alone,
/// set it to the server's clock, or set it to a client-supplied value.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug)]
#[repr(u32)]
pub enum set_atime {
    /// Don't modify the file's last access time
    DONT_CHANGE,
    /// Set the file's last access time to the server's current time
    SET_TO_SERVER_TIME,
    /// Set the file's last access time to the specified time value
    SET_TO_CLIENT_TIME(nfstime3),
}

impl Default for set_atime {
    fn default() -> Self {
        set_atime::DONT_CHANGE
    }
}

impl XDR for set_atime {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            set_atime::DONT_CHANGE => 0_u32.serialize(dest)?,
            set_atime::SET_TO_SERVER_TIME => 1_u32.serialize(dest)?,
            set_atime::SET_TO_CLIENT_TIME(v) => {
                2_u32.serialize(dest)?;
                v.serialize(dest)?;
            }
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match super::decode::<u32, R>(src)? {
            0 => *self = set_atime::DONT_CHANGE,
            1 => *self = set_atime::SET_TO_SERVER_TIME,
            2 => *self = set_atime::SET_TO_CLIENT_TIME(super::decode(src)?),
            c => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid set_atime value: {}", c),
                ))
            }
        }
        Ok(())
    }
}

/// Same three-way choice as [`set_atime`], for the modification timestamp.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug)]
#[repr(u32)]
pub enum set_mtime {
    /// Keep the current modification time unchanged
    DONT_CHANGE,
    /// Update the modification time to the server's current time
    SET_TO_SERVER_TIME,
    /// Set the modification time to a specific client-supplied timestamp
    SET_TO_CLIENT_TIME(nfstime3),
}

impl Default for set_mtime {
    fn default() -> Self {
        set_mtime::DONT_CHANGE
    }
}

impl XDR for set_mtime {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            set_mtime::DONT_CHANGE => 0_u32.serialize(dest)?,
            set_mtime::SET_TO_SERVER_TIME => 1_u32.serialize(dest)?,
            set_mtime::SET_TO_CLIENT_TIME(v) => {
                2_u32.serialize(dest)?;
                v.serialize(dest)?;
            }
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match super::decode::<u32, R>(src)? {
            0 => *self = set_mtime::DONT_CHANGE,
            1 => *self = set_mtime::SET_TO_SERVER_TIME,
            2 => *self = set_mtime::SET_TO_CLIENT_TIME(super::decode(src)?),
            c => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid set_mtime value: {}", c),
                ))
            }
        }
        Ok(())
    }
}

/// Set of file attributes to change in a SETATTR call.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug)]
pub struct sattr3 {
    /// File mode (permissions)
    pub mode: set_mode3,
    /// User ID of owner
    pub uid: set_uid3,
    /// Group ID of owner
    pub gid: set_gid3,
    /// File size
    pub size: set_size3,
    /// Last access time
    pub atime: set_atime,
    /// Last modification time
    pub mtime: set_mtime,
}
XDRStruct!(sattr3, mode, uid, gid, size, atime, mtime);

impl Default for sattr3 {
    fn default() -> sattr3 {
        sattr3 {
            mode: set_mode3::Void,
            uid: set_uid3::Void,
            gid: set_gid3::Void,
            size: set_size3::Void,
            atime: set_atime::DONT_CHANGE,
            mtime: set_mtime::DONT_CHANGE,
        }
    }
}

/// Arguments shared by every operation that names a directory entry by
/// (parent handle, name).
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct diropargs3 {
    /// Directory file handle
    pub dir: nfs_fh3,
    /// Name within the directory
    pub name: filename3,
}
XDRStruct!(diropargs3, dir, name);

/// Data for creating a symbolic link
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct symlinkdata3 {
    /// Attributes for the symbolic link
    pub symlink_attributes: sattr3,
    /// Target path for the symbolic link
    pub symlink_data: nfspath3,
}
XDRStruct!(symlinkdata3, symlink_attributes, symlink_data);

/// Access permission to read file data or read a directory, RFC 1813 §3.3.4
pub const ACCESS3_READ: u32 = 0x0001;
/// Access permission to look up names in a directory, RFC 1813 §3.3.4
pub const ACCESS3_LOOKUP: u32 = 0x0002;
/// Access permission to modify the contents of an existing file, RFC 1813 §3.3.4
pub const ACCESS3_MODIFY: u32 = 0x0004;
/// Access permission to grow a file or extend a directory, RFC 1813 §3.3.4
pub const ACCESS3_EXTEND: u32 = 0x0008;
/// Access permission to delete a file or directory entry, RFC 1813 §3.3.4
pub const ACCESS3_DELETE: u32 = 0x0010;
/// Access permission to execute a file or traverse a directory, RFC 1813 §3.3.4
pub const ACCESS3_EXECUTE: u32 = 0x0020;

/// File creation modes for CREATE operations
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum createmode3 {
    /// Normal file creation - doesn't error if file exists
    #[default]
    UNCHECKED = 0,
    /// Return error if file exists
    GUARDED = 1,
    /// Use exclusive create mechanism (with verifier)
    EXCLUSIVE = 2,
}
XDREnumSerde!(createmode3);

/// Guard condition for SETATTR operations based on ctime
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default)]
#[repr(u32)]
pub enum sattrguard3 {
    #[default]
    /// No guard - unconditional change
    Void,
    /// Only change if the file's ctime matches the provided value
    obj_ctime(nfstime3),
}
XDRBoolUnion!(sattrguard3, obj_ctime, nfstime3);

/// Arguments for SETATTR operations
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct SETATTR3args {
    /// File handle for target file
    pub object: nfs_fh3,
    /// New attributes to set
    pub new_attribute: sattr3,
    /// Guard condition for atomic change
    pub guard: sattrguard3,
}
XDRStruct!(SETATTR3args, object, new_attribute, guard);

/// Successful response for SETATTR
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct SETATTR3resok {
    /// Weak cache consistency data for the modified object
    pub obj_wcc: wcc_data,
}
XDRStruct!(SETATTR3resok, obj_wcc);

/// A discriminated NFSv3 result: `status` selects whether `ok` or `fail` is
/// populated, mirroring the union every NFSv3 procedure reply uses. Most
/// NFSv3 replies are exactly this shape with different `Ok`/`Fail` payloads,
/// so rather than hand-rolling the same union logic per operation this one
/// generic type (and its `XDR` impl) is reused via type aliases below.
#[derive(Clone, Debug, Default)]
pub struct Nfs3Result<Ok, Fail> {
    /// NFSv3 status code for this call
    pub status: nfsstat3,
    /// Present iff `status == NFS3_OK`
    pub ok: Option<Ok>,
    /// Present iff `status != NFS3_OK`
    pub fail: Option<Fail>,
}

impl<Ok, Fail> Nfs3Result<Ok, Fail> {
    /// Builds a successful result.
    pub fn ok(ok: Ok) -> Self {
        Self { status: nfsstat3::NFS3_OK, ok: Some(ok), fail: None }
    }

    /// Builds a failed result with the given status and failure payload.
    pub fn err(status: nfsstat3, fail: Fail) -> Self {
        assert_ne!(status, nfsstat3::NFS3_OK, "err() requires a non-OK status");
        Self { status, ok: None, fail: Some(fail) }
    }

    /// Converts into a plain `Result`, discarding the failure payload.
    pub fn into_result(self) -> Result<Ok, nfsstat3> {
        match self.ok {
            Some(v) => Ok(v),
            None => Err(self.status),
        }
    }
}

impl<Ok: XDR + Default, Fail: XDR + Default> XDR for Nfs3Result<Ok, Fail> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.status.serialize(dest)?;
        match self.status {
            nfsstat3::NFS3_OK => {
                self.ok.as_ref().expect("NFS3_OK result missing ok payload").serialize(dest)?;
            }
            _ => {
                self.fail.as_ref().expect("non-OK result missing fail payload").serialize(dest)?;
            }
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.status.deserialize(src)?;
        match self.status {
            nfsstat3::NFS3_OK => {
                self.ok = Some(super::decode(src)?);
                self.fail = None;
            }
            _ => {
                self.ok = None;
                self.fail = Some(super::decode(src)?);
            }
        }
        Ok(())
    }
}

/// Reply union for GETATTR (procedure 1)
pub type GETATTR3res = Nfs3Result<GETATTR3resok, ()>;

/// Arguments for GETATTR (procedure 1)
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct GETATTR3args {
    /// File handle to query
    pub object: nfs_fh3,
}
XDRStruct!(GETATTR3args, object);

/// Successful response for GETATTR
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct GETATTR3resok {
    /// Current attributes of the object
    pub obj_attributes: fattr3,
}
XDRStruct!(GETATTR3resok, obj_attributes);

/// Reply union for LOOKUP (procedure 3)
pub type LOOKUP3res = Nfs3Result<LOOKUP3resok, LOOKUP3resfail>;

/// Arguments for LOOKUP (procedure 3)
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct LOOKUP3args {
    /// Directory handle and name to resolve
    pub what: diropargs3,
}
XDRStruct!(LOOKUP3args, what);

/// Successful response for LOOKUP
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct LOOKUP3resok {
    /// File handle of the resolved object
    pub object: nfs_fh3,
    /// Attributes of the resolved object, if available
    pub obj_attributes: post_op_attr,
    /// Attributes of the containing directory, if available
    pub dir_attributes: post_op_attr,
}
XDRStruct!(LOOKUP3resok, object, obj_attributes, dir_attributes);

/// Failure response for LOOKUP
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct LOOKUP3resfail {
    /// Attributes of the containing directory, if available
    pub dir_attributes: post_op_attr,
}
XDRStruct!(LOOKUP3resfail, dir_attributes);

/// Reply union for ACCESS (procedure 4)
pub type ACCESS3res = Nfs3Result<ACCESS3resok, ACCESS3resfail>;

/// Arguments for ACCESS (procedure 4)
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct ACCESS3args {
    /// Object to check
    pub object: nfs_fh3,
    /// Bitmask of ACCESS3_* permissions to test
    pub access: u32,
}
XDRStruct!(ACCESS3args, object, access);

/// Successful response for ACCESS
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct ACCESS3resok {
    /// Attributes of the object, if available
    pub obj_attributes: post_op_attr,
    /// Subset of the requested bitmask the caller actually has
    pub access: u32,
}
XDRStruct!(ACCESS3resok, obj_attributes, access);

/// Failure response for ACCESS
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct ACCESS3resfail {
    /// Attributes of the object, if available
    pub obj_attributes: post_op_attr,
}
XDRStruct!(ACCESS3resfail, obj_attributes);

/// Reply union for READLINK (procedure 5)
pub type READLINK3res = Nfs3Result<READLINK3resok, READLINK3resfail>;

/// Arguments for READLINK (procedure 5)
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct READLINK3args {
    /// File handle of the symbolic link
    pub symlink: nfs_fh3,
}
XDRStruct!(READLINK3args, symlink);

/// Successful response for READLINK
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct READLINK3resok {
    /// Attributes of the symlink, if available
    pub symlink_attributes: post_op_attr,
    /// Target path stored in the symlink
    pub data: nfspath3,
}
XDRStruct!(READLINK3resok, symlink_attributes, data);

/// Failure response for READLINK
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct READLINK3resfail {
    /// Attributes of the symlink, if available
    pub symlink_attributes: post_op_attr,
}
XDRStruct!(READLINK3resfail, symlink_attributes);

/// Discriminated union selecting how CREATE should behave on a name
/// collision, RFC 1813 §3.3.8. The discriminant matches [`createmode3`].
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub enum createhow3 {
    /// Create unconditionally; existing file's attributes are not checked
    UNCHECKED(sattr3),
    /// Fail with NFS3ERR_EXIST if the file already exists
    GUARDED(sattr3),
    /// Create atomically using a verifier; used to recover from retransmits
    EXCLUSIVE(createverf3),
}

impl Default for createhow3 {
    fn default() -> Self {
        createhow3::UNCHECKED(sattr3::default())
    }
}

impl XDR for createhow3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            createhow3::UNCHECKED(a) => {
                (createmode3::UNCHECKED as u32).serialize(dest)?;
                a.serialize(dest)?;
            }
            createhow3::GUARDED(a) => {
                (createmode3::GUARDED as u32).serialize(dest)?;
                a.serialize(dest)?;
            }
            createhow3::EXCLUSIVE(v) => {
                (createmode3::EXCLUSIVE as u32).serialize(dest)?;
                v.serialize(dest)?;
            }
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match super::decode::<u32, R>(src)? {
            0 => *self = createhow3::UNCHECKED(super::decode(src)?),
            1 => *self = createhow3::GUARDED(super::decode(src)?),
            2 => *self = createhow3::EXCLUSIVE(super::decode(src)?),
            m => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid createmode3 value: {}", m),
                ))
            }
        }
        Ok(())
    }
}

/// Reply union for CREATE (procedure 8)
pub type CREATE3res = Nfs3Result<CREATE3resok, CREATE3resfail>;

/// Arguments for CREATE (procedure 8)
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct CREATE3args {
    /// Directory and name for the new file
    pub where_: diropargs3,
    /// Creation mode and its associated payload
    pub how: createhow3,
}
XDRStruct!(CREATE3args, where_, how);

/// Successful response for CREATE
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct CREATE3resok {
    /// File handle of the new file, if the server returns one
    pub obj: post_op_fh3,
    /// Attributes of the new file, if available
    pub obj_attributes: post_op_attr,
    /// Weak cache consistency data for the parent directory
    pub dir_wcc: wcc_data,
}
XDRStruct!(CREATE3resok, obj, obj_attributes, dir_wcc);

/// Failure response for CREATE
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct CREATE3resfail {
    /// Weak cache consistency data for the parent directory
    pub dir_wcc: wcc_data,
}
XDRStruct!(CREATE3resfail, dir_wcc);

/// Reply union for REMOVE (procedure 12) and RMDIR (procedure 13): both
/// only ever return directory weak-cache-consistency data.
pub type REMOVE3res = Nfs3Result<DirOpWcc, DirOpWcc>;
/// Reply union for RMDIR (procedure 13)
pub type RMDIR3res = Nfs3Result<DirOpWcc, DirOpWcc>;

/// Shared successful/failure body for REMOVE and RMDIR
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct DirOpWcc {
    /// Weak cache consistency data for the parent directory
    pub dir_wcc: wcc_data,
}
XDRStruct!(DirOpWcc, dir_wcc);

/// Arguments for REMOVE (procedure 12)
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct REMOVE3args {
    /// Directory and name of the file to remove
    pub object: diropargs3,
}
XDRStruct!(REMOVE3args, object);

/// Arguments for RMDIR (procedure 13)
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct RMDIR3args {
    /// Directory and name of the directory to remove
    pub object: diropargs3,
}
XDRStruct!(RMDIR3args, object);

/// Reply union for RENAME (procedure 14)
pub type RENAME3res = Nfs3Result<RENAME3resok, RENAME3resok>;

/// Arguments for RENAME (procedure 14)
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct RENAME3args {
    /// Source directory and name
    pub from: diropargs3,
    /// Destination directory and name
    pub to: diropargs3,
}
XDRStruct!(RENAME3args, from, to);

/// Shared successful/failure body for RENAME
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct RENAME3resok {
    /// Weak cache consistency data for the source directory
    pub fromdir_wcc: wcc_data,
    /// Weak cache consistency data for the destination directory
    pub todir_wcc: wcc_data,
}
XDRStruct!(RENAME3resok, fromdir_wcc, todir_wcc);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::xdr::decode;

    #[test]
    fn nfsstring_roundtrips() {
        let s = nfsstring::from("hello.txt");
        let mut buf = Vec::new();
        s.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: nfsstring = decode(&mut cursor).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn fattr3_roundtrips() {
        let attr = fattr3 {
            ftype: ftype3::NF3REG,
            mode: 0o644,
            nlink: 1,
            uid: 1000,
            gid: 1000,
            size: 4096,
            used: 4096,
            rdev: specdata3::default(),
            fsid: 1,
            fileid: 2,
            atime: nfstime3 { seconds: 1, nseconds: 0 },
            mtime: nfstime3 { seconds: 2, nseconds: 0 },
            ctime: nfstime3 { seconds: 3, nseconds: 0 },
        };
        let mut buf = Vec::new();
        attr.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: fattr3 = decode(&mut cursor).unwrap();
        assert_eq!(decoded.size, 4096);
        assert!(matches!(decoded.ftype, ftype3::NF3REG));
    }

    #[test]
    fn getattr_result_roundtrips_ok() {
        let res = GETATTR3res::ok(GETATTR3resok { obj_attributes: fattr3::default() });
        let mut buf = Vec::new();
        res.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: GETATTR3res = decode(&mut cursor).unwrap();
        assert!(matches!(decoded.status, nfsstat3::NFS3_OK));
        assert!(decoded.ok.is_some());
        assert!(decoded.fail.is_none());
    }

    #[test]
    fn lookup_result_roundtrips_err() {
        let res = LOOKUP3res::err(
            nfsstat3::NFS3ERR_NOENT,
            LOOKUP3resfail { dir_attributes: post_op_attr::Void },
        );
        let mut buf = Vec::new();
        res.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: LOOKUP3res = decode(&mut cursor).unwrap();
        assert!(matches!(decoded.status, nfsstat3::NFS3ERR_NOENT));
        assert!(decoded.ok.is_none());
        assert!(decoded.fail.is_some());
    }

    #[test]
    fn createhow3_exclusive_roundtrips() {
        let how = createhow3::EXCLUSIVE([7u8; NFS3_CREATEVERFSIZE as usize]);
        let mut buf = Vec::new();
        how.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: createhow3 = decode(&mut cursor).unwrap();
        match decoded {
            createhow3::EXCLUSIVE(v) => assert_eq!(v, [7u8; NFS3_CREATEVERFSIZE as usize]),
            _ => panic!("expected EXCLUSIVE"),
        }
    }

    #[test]
    fn set_atime_client_time_roundtrips() {
        let v = set_atime::SET_TO_CLIENT_TIME(nfstime3 { seconds: 42, nseconds: 0 });
        let mut buf = Vec::new();
        v.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: set_atime = decode(&mut cursor).unwrap();
        match decoded {
            set_atime::SET_TO_CLIENT_TIME(t) => assert_eq!(t.seconds, 42),
            _ => panic!("expected SET_TO_CLIENT_TIME"),
        }
    }
}
