//! Module contains XDR data structures related to directories for NFS version 3 protocol
//! as defined in RFC 1813.
//!
//! This module includes data structures for the following directory operations:
//! - MKDIR: Create a directory (procedure 9)
//! - SYMLINK: Create a symbolic link (procedure 10)
//! - READDIR: Read from a directory (procedure 16)
//! - READDIRPLUS: Extended read from a directory (procedure 17)
//! - MKNOD: Create a special device (procedure 11)
//!
//! These structures implement the XDR serialization/deserialization interfaces for
//! the request arguments and response data of directory-related operations.

// Allow unused code warnings since we implement the complete RFC 1813 specification,
// including procedures that may not be used by all clients
#![allow(dead_code)]
// Preserve original RFC naming conventions (e.g. READDIR3args, MKDIR3resok)
// for consistency with the NFS version 3 protocol specification
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;
use crate::XDREnumSerde;

/// Enumeration of device types for special files in NFS version 3
/// as defined in RFC 1813 section 3.3.11
/// Used to identify the type of device when creating special files
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum devicetype3 {
    /// Character special device
    #[default]
    NF3CHR = 0,
    /// Block special device
    NF3BLK = 1,
    /// Socket
    NF3SOCK = 2,
    /// FIFO pipe
    NF3FIFO = 3,
}
XDREnumSerde!(devicetype3);

/// Arguments for the MKDIR procedure (procedure 9)
/// as defined in RFC 1813 section 3.3.9
/// Used to create a new directory
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct MKDIR3args {
    /// Directory where new directory should be created and its name
    pub dirops: diropargs3,
    /// Initial attributes for the new directory
    pub attributes: sattr3,
}
XDRStruct!(MKDIR3args, dirops, attributes);

/// Reply union shared by MKDIR, SYMLINK, and MKNOD: all three create an
/// entry of a given type in a directory and return the same response shape.
pub type MKDIR3res = Nfs3Result<MkdirLikeResok, MkdirLikeResfail>;
/// Reply union for SYMLINK (procedure 10)
pub type SYMLINK3res = Nfs3Result<MkdirLikeResok, MkdirLikeResfail>;
/// Reply union for MKNOD (procedure 11)
pub type MKNOD3res = Nfs3Result<MkdirLikeResok, MkdirLikeResfail>;

/// Successful response shared by MKDIR, SYMLINK, and MKNOD
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct MkdirLikeResok {
    /// File handle of the newly created object, if the server returns one
    pub obj: post_op_fh3,
    /// Attributes of the newly created object, if available
    pub obj_attributes: post_op_attr,
    /// Weak cache consistency data for the parent directory
    pub dir_wcc: wcc_data,
}
XDRStruct!(MkdirLikeResok, obj, obj_attributes, dir_wcc);

/// Failure response shared by MKDIR, SYMLINK, and MKNOD
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct MkdirLikeResfail {
    /// Weak cache consistency data for the parent directory
    pub dir_wcc: wcc_data,
}
XDRStruct!(MkdirLikeResfail, dir_wcc);

/// Arguments for the SYMLINK procedure (procedure 10)
/// as defined in RFC 1813 section 3.3.10
/// Used to create a symbolic link
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct SYMLINK3args {
    /// Directory where symbolic link should be created and its name
    pub dirops: diropargs3,
    /// Target path and attributes for the symbolic link
    pub symlink: symlinkdata3,
}
XDRStruct!(SYMLINK3args, dirops, symlink);

/// Directory entry returned by READDIR operation
/// as defined in RFC 1813 section 3.3.16
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct entry3 {
    /// File identifier (inode number)
    pub fileid: fileid3,
    /// Name of the directory entry
    pub name: filename3,
    /// Cookie for the next READDIR operation
    pub cookie: cookie3,
}
XDRStruct!(entry3, fileid, name, cookie);

/// Arguments for the READDIR procedure (procedure 16)
/// as defined in RFC 1813 section 3.3.16
/// Used to read entries from a directory. The server returns a variable number of directory entries,
/// up to the specified count limit.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READDIR3args {
    /// File handle for the directory to be read
    pub dir: nfs_fh3,
    /// Cookie indicating where to start reading directory entries
    /// A cookie value of 0 means start at beginning of directory
    pub cookie: cookie3,
    /// Cookie verifier to detect whether directory has changed
    pub cookieverf: cookieverf3,
    /// Maximum number of bytes of directory information to return
    pub dircount: count3,
}
XDRStruct!(READDIR3args, dir, cookie, cookieverf, dircount);

/// The decoded `dirlist3`: RFC 1813 defines this as an `entry3` linked list
/// terminated by an optional's absent arm followed by an `eof` flag. This
/// client flattens the list into a `Vec` so callers never see the pointer
/// chain, matching the treatment already used for MOUNT EXPORT/DUMP replies.
#[derive(Debug, Default, Clone)]
pub struct dirlist3 {
    /// Directory entries returned by this call
    pub entries: Vec<entry3>,
    /// True if there are no more entries after this batch
    pub eof: bool,
}

impl XDR for dirlist3 {
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

/// Successful response for READDIR
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct READDIR3resok {
    /// Attributes of the directory, if available
    pub dir_attributes: post_op_attr,
    /// Verifier to present on a subsequent READDIR call to detect changes
    pub cookieverf: cookieverf3,
    /// Entries read from the directory
    pub reply: dirlist3,
}
XDRStruct!(READDIR3resok, dir_attributes, cookieverf, reply);

/// Failure response for READDIR
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct READDIR3resfail {
    /// Attributes of the directory, if available
    pub dir_attributes: post_op_attr,
}
XDRStruct!(READDIR3resfail, dir_attributes);

/// Reply union for READDIR (procedure 16)
pub type READDIR3res = Nfs3Result<READDIR3resok, READDIR3resfail>;

/// Directory entry with additional attributes for READDIRPLUS operation
/// as defined in RFC 1813 section 3.3.17
/// This structure represents a single directory entry with extended information
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct entryplus3 {
    /// File identifier (inode number) uniquely identifying the file within the filesystem
    pub fileid: fileid3,
    /// Name of the directory entry (filename)
    pub name: filename3,
    /// Cookie value that can be used in subsequent READDIRPLUS calls to resume listing
    pub cookie: cookie3,
    /// File attributes for this directory entry
    pub name_attributes: post_op_attr,
    /// File handle for this directory entry
    pub name_handle: post_op_fh3,
}
XDRStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);

/// Arguments for the READDIRPLUS procedure (procedure 17)
/// as defined in RFC 1813 section 3.3.17
/// READDIRPLUS returns directory entries along with their attributes and file handles.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READDIRPLUS3args {
    /// Directory file handle
    pub dir: nfs_fh3,
    /// Cookie from previous READDIRPLUS - where to start reading
    pub cookie: cookie3,
    /// Cookie verifier to detect changed directories
    pub cookieverf: cookieverf3,
    /// Maximum number of bytes of directory information to return
    pub dircount: count3,
    /// Maximum number of bytes of attribute information to return
    pub maxcount: count3,
}
XDRStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);

/// Same linked-list-to-`Vec` treatment as [`dirlist3`], for entries carrying
/// attributes and file handles.
#[derive(Debug, Default, Clone)]
pub struct dirlistplus3 {
    /// Directory entries returned by this call
    pub entries: Vec<entryplus3>,
    /// True if there are no more entries after this batch
    pub eof: bool,
}

impl XDR for dirlistplus3 {
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

/// Successful response for READDIRPLUS
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct READDIRPLUS3resok {
    /// Attributes of the directory, if available
    pub dir_attributes: post_op_attr,
    /// Verifier to present on a subsequent READDIRPLUS call to detect changes
    pub cookieverf: cookieverf3,
    /// Entries read from the directory, with attributes and handles
    pub reply: dirlistplus3,
}
XDRStruct!(READDIRPLUS3resok, dir_attributes, cookieverf, reply);

/// Failure response for READDIRPLUS
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct READDIRPLUS3resfail {
    /// Attributes of the directory, if available
    pub dir_attributes: post_op_attr,
}
XDRStruct!(READDIRPLUS3resfail, dir_attributes);

/// Reply union for READDIRPLUS (procedure 17)
pub type READDIRPLUS3res = Nfs3Result<READDIRPLUS3resok, READDIRPLUS3resfail>;

/// Arguments for the MKNOD procedure (procedure 11)
/// as defined in RFC 1813 section 3.3.11
/// Used to create a special device file, FIFO, or socket
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct MKNOD3args {
    /// Directory where the special file should be created and its name
    pub where_dir: diropargs3,
    /// Type and device information for the special file
    pub what: mknoddata3,
}
XDRStruct!(MKNOD3args, where_dir, what);

/// Device data for special files
/// as defined in RFC 1813 section 3.3.11
/// Contains the device type and device numbers
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct devicedata3 {
    /// Type of device (character, block, socket, or FIFO)
    pub dev_type: devicetype3,
    /// Major and minor device numbers for character and block devices
    pub device: specdata3,
}
XDRStruct!(devicedata3, dev_type, device);

/// Data structure for creating special files
/// as defined in RFC 1813 section 3.3.11
/// Contains the file type and device information
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct mknoddata3 {
    /// Type of file to create (regular, directory, special file etc)
    pub mknod_type: ftype3,
    /// Device information if creating a special file
    pub device: devicedata3,
}
XDRStruct!(mknoddata3, mknod_type, device);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::xdr::decode;

    #[test]
    fn dirlist3_roundtrips_with_multiple_entries() {
        let list = dirlist3 {
            entries: vec![
                entry3 { fileid: 1, name: "a".into(), cookie: 1 },
                entry3 { fileid: 2, name: "b".into(), cookie: 2 },
            ],
            eof: true,
        };
        let mut buf = Vec::new();
        list.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: dirlist3 = decode(&mut cursor).unwrap();
        assert_eq!(decoded.entries.len(), 2);
        assert!(decoded.eof);
    }

    #[test]
    fn empty_dirlist3_roundtrips() {
        let list = dirlist3 { entries: Vec::new(), eof: true };
        let mut buf = Vec::new();
        list.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: dirlist3 = decode(&mut cursor).unwrap();
        assert!(decoded.entries.is_empty());
        assert!(decoded.eof);
    }

    #[test]
    fn dirlistplus3_roundtrips() {
        let list = dirlistplus3 {
            entries: vec![entryplus3 {
                fileid: 7,
                name: "c".into(),
                cookie: 3,
                name_attributes: post_op_attr::Void,
                name_handle: post_op_fh3::Void,
            }],
            eof: false,
        };
        let mut buf = Vec::new();
        list.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: dirlistplus3 = decode(&mut cursor).unwrap();
        assert_eq!(decoded.entries.len(), 1);
        assert!(!decoded.eof);
    }

    #[test]
    fn readdir_result_roundtrips() {
        let res = READDIR3res::ok(READDIR3resok {
            dir_attributes: post_op_attr::Void,
            cookieverf: [0u8; 8],
            reply: dirlist3 { entries: Vec::new(), eof: true },
        });
        let mut buf = Vec::new();
        res.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: READDIR3res = decode(&mut cursor).unwrap();
        assert!(matches!(decoded.status, nfsstat3::NFS3_OK));
        assert!(decoded.ok.unwrap().reply.eof);
    }
}
