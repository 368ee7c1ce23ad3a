//! This module implements the `MOUNT` protocol (RFC 1813 Appendix I) data
//! structures for XDR serialization and deserialization.
//!
//! The `MOUNT` protocol is used to establish the initial connection between an
//! NFS client and server: it resolves an export path to the file handle that
//! becomes the root of the mounted file system, and lists the exports and
//! mounts a server currently knows about.

// Allow unused code since we implement the complete RFC specification
#![allow(dead_code)]
// Keep original RFC naming conventions for consistency with the specification
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::XDR;
use crate::{XDREnumSerde, XDRStruct};

/// MOUNT program number for RPC
pub const PROGRAM: u32 = 100005;
/// MOUNT protocol version 3 (paired with NFSv3)
pub const VERSION: u32 = 3;
/// MOUNT protocol version 1 (paired with NFSv2)
pub const VERSION1: u32 = 1;

/// Maximum bytes in a path name
pub const MNTPATHLEN: u32 = 1024;
/// Maximum bytes in a name
pub const MNTNAMLEN: u32 = 255;
/// Maximum bytes in a V3 file handle
pub const FHSIZE3: u32 = 64;
/// Fixed size of a V1/V2 file handle
pub const FHSIZE2: usize = 32;

/// File handle for NFS version 3
pub type fhandle3 = Vec<u8>;
/// Directory path on the server
pub type dirpath = Vec<u8>;
/// Name in the directory
pub type name = Vec<u8>;

/// Status codes returned by `MOUNT` protocol operations
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum mountstat3 {
    /// No error
    #[default]
    MNT3_OK = 0,
    /// Not owner
    MNT3ERR_PERM = 1,
    /// No such file or directory
    MNT3ERR_NOENT = 2,
    /// I/O error
    MNT3ERR_IO = 5,
    /// Permission denied
    MNT3ERR_ACCES = 13,
    /// Not a directory
    MNT3ERR_NOTDIR = 20,
    /// Invalid argument
    MNT3ERR_INVAL = 22,
    /// Filename too long
    MNT3ERR_NAMETOOLONG = 63,
    /// Operation not supported
    MNT3ERR_NOTSUPP = 10004,
    /// A failure on the server
    MNT3ERR_SERVERFAULT = 10006,
}
XDREnumSerde!(mountstat3);

/// Successful response to a mount request (`MOUNTPROC3_MNT`)
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct mountres3_ok {
    /// File handle for the mounted directory
    pub fhandle: fhandle3,
    /// Authentication flavors the server accepts for the mounted export
    pub auth_flavors: Vec<u32>,
}
XDRStruct!(mountres3_ok, fhandle, auth_flavors);

/// Full reply to a `MOUNTPROC3_MNT` call: a status, and the ok body if it
/// succeeded. Modeled directly rather than via a bool-union since the
/// discriminant here is an enum, not a plain boolean.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct mnt_reply {
    /// Mount status
    pub status: mountstat3,
    /// Present only when `status == MNT3_OK`
    pub mountinfo: Option<mountres3_ok>,
}

impl XDR for mnt_reply {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.status.serialize(dest)?;
        if let mountstat3::MNT3_OK = self.status {
            self.mountinfo.as_ref().expect("MNT3_OK reply missing mountinfo").serialize(dest)?;
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.status.deserialize(src)?;
        if let mountstat3::MNT3_OK = self.status {
            self.mountinfo = Some(super::decode(src)?);
        } else {
            self.mountinfo = None;
        }
        Ok(())
    }
}

/// A single entry in the server's export list (`MOUNTPROC3_EXPORT` reply).
///
/// RFC 1813 defines `exportnode`/`groupnode` as a recursive linked list on the
/// wire (`ex_next`/`gr_next` optionals); this client decodes that list into a
/// flat `Vec<ExportEntry>` so callers never touch the pointer chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportEntry {
    /// Exported directory path
    pub dir: String,
    /// Client groups permitted to mount this export ("*" if unrestricted)
    pub groups: Vec<String>,
}

/// The decoded `MOUNTPROC3_EXPORT` reply: one entry per exported directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportList(pub Vec<ExportEntry>);

impl XDR for ExportList {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for entry in &self.0 {
            true.serialize(dest)?;
            entry.dir.clone().into_bytes().serialize(dest)?;
            for group in &entry.groups {
                true.serialize(dest)?;
                group.clone().into_bytes().serialize(dest)?;
            }
            false.serialize(dest)?;
        }
        false.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.0.clear();
        loop {
            if !super::decode::<bool, R>(src)? {
                break;
            }
            let dir_bytes: Vec<u8> = super::decode(src)?;
            let dir = String::from_utf8(dir_bytes)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            let mut groups = Vec::new();
            loop {
                if !super::decode::<bool, R>(src)? {
                    break;
                }
                let group_bytes: Vec<u8> = super::decode(src)?;
                groups.push(
                    String::from_utf8(group_bytes)
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
                );
            }
            self.0.push(ExportEntry { dir, groups });
        }
        Ok(())
    }
}

/// A single mounted-client entry in the `MOUNTPROC3_DUMP` reply, same
/// linked-list-to-`Vec` treatment as `ExportList`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MountEntry {
    /// Client host name
    pub hostname: String,
    /// Directory the client has mounted
    pub directory: String,
}

/// The decoded `MOUNTPROC3_DUMP` reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MountList(pub Vec<MountEntry>);

impl XDR for MountList {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for entry in &self.0 {
            true.serialize(dest)?;
            entry.hostname.clone().into_bytes().serialize(dest)?;
            entry.directory.clone().into_bytes().serialize(dest)?;
        }
        false.serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.0.clear();
        loop {
            if !super::decode::<bool, R>(src)? {
                break;
            }
            let hostname_bytes: Vec<u8> = super::decode(src)?;
            let directory_bytes: Vec<u8> = super::decode(src)?;
            self.0.push(MountEntry {
                hostname: String::from_utf8(hostname_bytes)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
                directory: String::from_utf8(directory_bytes)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
            });
        }
        Ok(())
    }
}

/// Procedure numbers for the `MOUNT` version 3 protocol
#[allow(non_camel_case_types)]
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum MountProgram {
    /// Null procedure for service availability testing
    MOUNTPROC3_NULL = 0,
    /// Mount a file system
    MOUNTPROC3_MNT = 1,
    /// Get list of mounted file systems
    MOUNTPROC3_DUMP = 2,
    /// Unmount a file system
    MOUNTPROC3_UMNT = 3,
    /// Unmount all file systems
    MOUNTPROC3_UMNTALL = 4,
    /// Get list of exported file systems
    MOUNTPROC3_EXPORT = 5,
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::xdr::decode;

    #[test]
    fn mnt_reply_ok_roundtrips() {
        let reply = mnt_reply {
            status: mountstat3::MNT3_OK,
            mountinfo: Some(mountres3_ok { fhandle: vec![1, 2, 3, 4], auth_flavors: vec![0] }),
        };
        let mut buf = Vec::new();
        reply.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: mnt_reply = decode(&mut cursor).unwrap();
        assert!(matches!(decoded.status, mountstat3::MNT3_OK));
        assert_eq!(decoded.mountinfo.unwrap().fhandle, vec![1, 2, 3, 4]);
    }

    #[test]
    fn mnt_reply_error_has_no_body() {
        let reply = mnt_reply { status: mountstat3::MNT3ERR_NOENT, mountinfo: None };
        let mut buf = Vec::new();
        reply.serialize(&mut buf).unwrap();
        assert_eq!(buf.len(), 4);
        let mut cursor = Cursor::new(buf);
        let decoded: mnt_reply = decode(&mut cursor).unwrap();
        assert!(decoded.mountinfo.is_none());
    }

    #[test]
    fn export_list_roundtrips_multiple_entries_and_groups() {
        let list = ExportList(vec![
            ExportEntry { dir: "/export/a".into(), groups: vec!["admins".into()] },
            ExportEntry { dir: "/export/b".into(), groups: vec![] },
        ]);
        let mut buf = Vec::new();
        list.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: ExportList = decode(&mut cursor).unwrap();
        assert_eq!(decoded.0.len(), 2);
        assert_eq!(decoded.0[0].dir, "/export/a");
        assert_eq!(decoded.0[0].groups, vec!["admins".to_string()]);
        assert!(decoded.0[1].groups.is_empty());
    }

    #[test]
    fn empty_export_list_roundtrips() {
        let list = ExportList(Vec::new());
        let mut buf = Vec::new();
        list.serialize(&mut buf).unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0]);
    }

    #[test]
    fn mount_list_roundtrips() {
        let list = MountList(vec![MountEntry {
            hostname: "client1".into(),
            directory: "/export/a".into(),
        }]);
        let mut buf = Vec::new();
        list.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: MountList = decode(&mut cursor).unwrap();
        assert_eq!(decoded.0[0].hostname, "client1");
    }
}
