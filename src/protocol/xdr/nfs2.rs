//! This module implements the data structures of the NFS version 2 protocol,
//! as defined in RFC 1094.
//!
//! NFSv2 predates weak cache consistency data and 64-bit sizes/offsets; its
//! file handle is a fixed 32-byte opaque blob (paired with MOUNT version 1,
//! see [`super::mount::VERSION1`]) rather than the variable-length handle
//! NFSv3 introduced.

#![allow(dead_code)]
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::mount::FHSIZE2;
use super::XDR;
use crate::{XDREnumSerde, XDRStruct};

/// The RPC program number for NFS version 2 service.
pub const PROGRAM: u32 = 100003;
/// The version number for the NFS version 2 protocol.
pub const VERSION: u32 = 2;

/// Maximum number of bytes of data in a READ or WRITE request.
pub const MAXDATA: u32 = 8192;
/// Maximum number of bytes in a path name.
pub const MAXPATHLEN: u32 = 1024;
/// Maximum number of bytes in a file name.
pub const MAXNAMLEN: u32 = 255;

/// Opaque, fixed-size file handle used by NFS version 2.
pub type fhandle2 = [u8; FHSIZE2];

/// Procedure numbers for the NFS version 2 protocol, RFC 1094 section 2.2.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum NFSProgram {
    /// Do nothing - used for server reachability checks
    NFSPROC_NULL = 0,
    /// Get file attributes
    NFSPROC_GETATTR = 1,
    /// Set file attributes
    NFSPROC_SETATTR = 2,
    /// Look up a file name
    NFSPROC_LOOKUP = 4,
    /// Read from a symbolic link
    NFSPROC_READLINK = 5,
    /// Read from a file
    NFSPROC_READ = 6,
    /// Write to a file
    NFSPROC_WRITE = 8,
    /// Create a file
    NFSPROC_CREATE = 9,
    /// Remove a file
    NFSPROC_REMOVE = 10,
    /// Rename a file or directory
    NFSPROC_RENAME = 11,
    /// Create a hard link
    NFSPROC_LINK = 12,
    /// Create a symbolic link
    NFSPROC_SYMLINK = 13,
    /// Create a directory
    NFSPROC_MKDIR = 14,
    /// Remove a directory
    NFSPROC_RMDIR = 15,
    /// Read entries from a directory
    NFSPROC_READDIR = 16,
    /// Get file system information
    NFSPROC_STATFS = 17,
}

/// Status codes returned by NFS version 2 operations, RFC 1094 section 2.3.1.
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum nfsstat2 {
    /// Call completed successfully
    #[default]
    NFS_OK = 0,
    /// Not owner
    NFSERR_PERM = 1,
    /// No such file or directory
    NFSERR_NOENT = 2,
    /// I/O error
    NFSERR_IO = 5,
    /// No such device or address
    NFSERR_NXIO = 6,
    /// Permission denied
    NFSERR_ACCES = 13,
    /// File already exists
    NFSERR_EXIST = 17,
    /// No such device
    NFSERR_NODEV = 19,
    /// Not a directory
    NFSERR_NOTDIR = 20,
    /// Is a directory
    NFSERR_ISDIR = 21,
    /// File too large
    NFSERR_FBIG = 27,
    /// No space left on device
    NFSERR_NOSPC = 28,
    /// Read-only file system
    NFSERR_ROFS = 30,
    /// File name too long
    NFSERR_NAMETOOLONG = 63,
    /// Directory not empty
    NFSERR_NOTEMPTY = 66,
    /// Disk quota exceeded
    NFSERR_DQUOT = 69,
    /// Invalid file handle - this client retries the resolving LOOKUP once.
    NFSERR_STALE = 70,
    /// Too many levels of remote in path
    NFSERR_WFLUSH = 99,
}
XDREnumSerde!(nfsstat2);

/// File type enumeration, RFC 1094 section 2.3.3.
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum ftype2 {
    /// Unknown file type
    #[default]
    NFNON = 0,
    /// Regular file
    NFREG = 1,
    /// Directory
    NFDIR = 2,
    /// Block special device
    NFBLK = 3,
    /// Character special device
    NFCHR = 4,
    /// Symbolic link
    NFLNK = 5,
}
XDREnumSerde!(ftype2);

/// A POSIX-style timestamp with microsecond resolution, RFC 1094 section 2.3.4.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct timeval2 {
    /// Seconds since the Unix epoch
    pub seconds: u32,
    /// Microseconds within the second
    pub useconds: u32,
}
XDRStruct!(timeval2, seconds, useconds);

/// File attributes as returned by GETATTR/SETATTR/LOOKUP, RFC 1094 section 2.3.5.
#[derive(Copy, Clone, Debug, Default)]
pub struct fattr2 {
    /// Type of file
    pub ftype: ftype2,
    /// Protection mode bits
    pub mode: u32,
    /// Number of hard links
    pub nlink: u32,
    /// Owner's user id
    pub uid: u32,
    /// Owner's group id
    pub gid: u32,
    /// File size in bytes
    pub size: u32,
    /// Preferred block size for I/O
    pub blocksize: u32,
    /// Device number for special files
    pub rdev: u32,
    /// Number of 512-byte blocks allocated
    pub blocks: u32,
    /// File system id
    pub fsid: u32,
    /// Inode number
    pub fileid: u32,
    /// Time of last access
    pub atime: timeval2,
    /// Time of last modification
    pub mtime: timeval2,
    /// Time of last attribute change
    pub ctime: timeval2,
}
XDRStruct!(fattr2, ftype, mode, nlink, uid, gid, size, blocksize, rdev, blocks, fsid, fileid, atime, mtime, ctime);

/// Attributes a SETATTR call may change. NFSv2 has no optional-field wrapper
/// like NFSv3's `sattr3` - a field value of `-1` (`u32::MAX`) tells the server
/// to leave that attribute unchanged, per RFC 1094 section 2.3.6.
#[derive(Copy, Clone, Debug)]
pub struct sattr2 {
    /// New mode, or u32::MAX to leave unchanged
    pub mode: u32,
    /// New owner uid, or u32::MAX to leave unchanged
    pub uid: u32,
    /// New owner gid, or u32::MAX to leave unchanged
    pub gid: u32,
    /// New size, or u32::MAX to leave unchanged
    pub size: u32,
    /// New access time, or (u32::MAX, u32::MAX) to leave unchanged
    pub atime: timeval2,
    /// New modification time, or (u32::MAX, u32::MAX) to leave unchanged
    pub mtime: timeval2,
}
XDRStruct!(sattr2, mode, uid, gid, size, atime, mtime);

impl Default for sattr2 {
    fn default() -> Self {
        sattr2 {
            mode: u32::MAX,
            uid: u32::MAX,
            gid: u32::MAX,
            size: u32::MAX,
            atime: timeval2 { seconds: u32::MAX, useconds: u32::MAX },
            mtime: timeval2 { seconds: u32::MAX, useconds: u32::MAX },
        }
    }
}

/// A directory handle and a name within it, the NFSv2 analogue of NFSv3's
/// `diropargs3`.
#[derive(Clone, Debug, Default)]
pub struct diropargs2 {
    /// Directory file handle
    pub dir: fhandle2,
    /// Name within the directory
    pub name: Vec<u8>,
}
XDRStruct!(diropargs2, dir, name);

/// Arguments for GETATTR (procedure 1)
#[derive(Clone, Debug, Default)]
pub struct GETATTR2args {
    /// File handle to query
    pub fhandle: fhandle2,
}
XDRStruct!(GETATTR2args, fhandle);

/// Successful response for GETATTR
#[derive(Copy, Clone, Debug, Default)]
pub struct attrstat_ok {
    /// Current attributes of the object
    pub attributes: fattr2,
}
XDRStruct!(attrstat_ok, attributes);

/// Arguments for SETATTR (procedure 2)
#[derive(Clone, Debug)]
pub struct SETATTR2args {
    /// File handle for target file
    pub fhandle: fhandle2,
    /// New attributes to set
    pub attributes: sattr2,
}
XDRStruct!(SETATTR2args, fhandle, attributes);

/// Arguments for LOOKUP (procedure 4)
#[derive(Clone, Debug, Default)]
pub struct LOOKUP2args {
    /// Directory and name to resolve
    pub what: diropargs2,
}
XDRStruct!(LOOKUP2args, what);

/// Successful response for LOOKUP
#[derive(Copy, Clone, Debug, Default)]
pub struct diropres_ok {
    /// File handle of the resolved object
    pub file: fhandle2,
    /// Attributes of the resolved object
    pub attributes: fattr2,
}
XDRStruct!(diropres_ok, file, attributes);

/// Arguments for READLINK (procedure 5)
#[derive(Clone, Debug, Default)]
pub struct READLINK2args {
    /// File handle of the symbolic link
    pub fhandle: fhandle2,
}
XDRStruct!(READLINK2args, fhandle);

/// Arguments for READ (procedure 6)
#[derive(Clone, Debug, Default)]
pub struct READ2args {
    /// File handle to read from
    pub file: fhandle2,
    /// Byte offset to begin reading at
    pub offset: u32,
    /// Number of bytes to read
    pub count: u32,
    /// Unused in NFSv2, retained for wire compatibility (RFC 1094 sec 2.2)
    pub total_count: u32,
}
XDRStruct!(READ2args, file, offset, count, total_count);

/// Successful response for READ
#[derive(Clone, Debug, Default)]
pub struct READ2resok {
    /// Attributes of the file after the read
    pub attributes: fattr2,
    /// Data read from the file
    pub data: Vec<u8>,
}
XDRStruct!(READ2resok, attributes, data);

/// Arguments for WRITE (procedure 8)
#[derive(Clone, Debug, Default)]
pub struct WRITE2args {
    /// Unused in NFSv2, retained for wire compatibility (RFC 1094 sec 2.2)
    pub begin_offset: u32,
    /// File handle to write to
    pub file: fhandle2,
    /// Byte offset to begin writing at
    pub offset: u32,
    /// Unused in NFSv2, retained for wire compatibility (RFC 1094 sec 2.2)
    pub total_count: u32,
    /// Data to write
    pub data: Vec<u8>,
}
XDRStruct!(WRITE2args, begin_offset, file, offset, total_count, data);

/// Arguments for CREATE (procedure 9) and MKDIR (procedure 14)
#[derive(Clone, Debug, Default)]
pub struct CREATE2args {
    /// Directory and name for the new object
    pub where_: diropargs2,
    /// Initial attributes for the new object
    pub attributes: sattr2,
}
XDRStruct!(CREATE2args, where_, attributes);

/// Arguments for REMOVE (procedure 10) and RMDIR (procedure 15)
#[derive(Clone, Debug, Default)]
pub struct REMOVE2args {
    /// Directory and name of the object to remove
    pub what: diropargs2,
}
XDRStruct!(REMOVE2args, what);

/// Arguments for RENAME (procedure 11)
#[derive(Clone, Debug, Default)]
pub struct RENAME2args {
    /// Source directory and name
    pub from: diropargs2,
    /// Destination directory and name
    pub to: diropargs2,
}
XDRStruct!(RENAME2args, from, to);

/// Arguments for LINK (procedure 12)
#[derive(Clone, Debug, Default)]
pub struct LINK2args {
    /// File handle of the target file
    pub from: fhandle2,
    /// Directory and name for the new link
    pub to: diropargs2,
}
XDRStruct!(LINK2args, from, to);

/// Arguments for SYMLINK (procedure 13)
#[derive(Clone, Debug, Default)]
pub struct SYMLINK2args {
    /// Directory and name for the new symbolic link
    pub from: diropargs2,
    /// Target path of the symbolic link
    pub to: Vec<u8>,
    /// Attributes for the new symbolic link
    pub attributes: sattr2,
}
XDRStruct!(SYMLINK2args, from, to, attributes);

/// Arguments for READDIR (procedure 16)
#[derive(Clone, Debug, Default)]
pub struct READDIR2args {
    /// Directory to read
    pub dir: fhandle2,
    /// Opaque cookie indicating where to resume reading, 0 to start at the beginning
    pub cookie: u32,
    /// Maximum number of bytes of directory information to return
    pub count: u32,
}
XDRStruct!(READDIR2args, dir, cookie, count);

/// A single directory entry as returned by READDIR, RFC 1094 section 2.3.9.
/// As with NFSv3's `entry3`, the wire format is a linked list; this client
/// flattens it into [`READDIR2resok::entries`] at decode time.
#[derive(Clone, Debug, Default)]
pub struct entry2 {
    /// Inode number of the file
    pub fileid: u32,
    /// Name of the directory entry
    pub name: Vec<u8>,
    /// Cookie to resume reading after this entry
    pub cookie: u32,
}
XDRStruct!(entry2, fileid, name, cookie);

/// Successful response for READDIR, with the linked list decoded into a `Vec`.
#[derive(Clone, Debug, Default)]
pub struct READDIR2resok {
    /// Directory entries returned by this call
    pub entries: Vec<entry2>,
    /// True if there are no more entries after this batch
    pub eof: bool,
}

impl XDR for READDIR2resok {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for e in &self.entries {
            true.serialize(dest)?;
            e.serialize(dest)?;
        }
        false.serialize(dest)?;
        self.eof.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.entries.clear();
        loop {
            if !crate::protocol::xdr::decode::<bool, R>(src)? {
                break;
            }
            self.entries.push(crate::protocol::xdr::decode(src)?);
        }
        self.eof = crate::protocol::xdr::decode(src)?;
        Ok(())
    }
}

/// Arguments for STATFS (procedure 17)
#[derive(Clone, Debug, Default)]
pub struct STATFS2args {
    /// File handle within the file system to query
    pub fhandle: fhandle2,
}
XDRStruct!(STATFS2args, fhandle);

/// Successful response for STATFS, RFC 1094 section 2.3.10.
#[derive(Copy, Clone, Debug, Default)]
pub struct STATFS2resok {
    /// Optimal transfer size
    pub tsize: u32,
    /// Block size
    pub bsize: u32,
    /// Total blocks in file system
    pub blocks: u32,
    /// Free blocks in file system
    pub bfree: u32,
    /// Free blocks available to non-privileged users
    pub bavail: u32,
}
XDRStruct!(STATFS2resok, tsize, bsize, blocks, bfree, bavail);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::xdr::decode;

    #[test]
    fn sattr2_default_is_all_unchanged() {
        let s = sattr2::default();
        assert_eq!(s.mode, u32::MAX);
        assert_eq!(s.atime.seconds, u32::MAX);
    }

    #[test]
    fn fattr2_roundtrips() {
        let attr = fattr2 {
            ftype: ftype2::NFREG,
            mode: 0o644,
            nlink: 1,
            uid: 0,
            gid: 0,
            size: 100,
            blocksize: 4096,
            rdev: 0,
            blocks: 1,
            fsid: 1,
            fileid: 2,
            atime: timeval2::default(),
            mtime: timeval2::default(),
            ctime: timeval2::default(),
        };
        let mut buf = Vec::new();
        attr.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: fattr2 = decode(&mut cursor).unwrap();
        assert_eq!(decoded.size, 100);
    }

    #[test]
    fn readdir_entries_roundtrip() {
        let res = READDIR2resok {
            entries: vec![entry2 { fileid: 1, name: b"a".to_vec(), cookie: 1 }],
            eof: true,
        };
        let mut buf = Vec::new();
        res.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: READDIR2resok = decode(&mut cursor).unwrap();
        assert_eq!(decoded.entries.len(), 1);
        assert!(decoded.eof);
    }
}
