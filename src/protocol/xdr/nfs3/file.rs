//! Module contains XDR data structures related to file operations for NFS version 3 protocol
//! as defined in RFC 1813.
//!
//! This module includes data structures for the following operations:
//! - READ: Read data from a file (procedure 6)
//! - WRITE: Write data to a file (procedure 7)
//! - COMMIT: Commit asynchronously written data to stable storage (procedure 21)
//! - LINK: Create a hard link (procedure 15)
//!
//! The structures implement the XDR serialization/deserialization interfaces for
//! the request arguments and response data of these operations.

// Allow unused code warnings since we implement the complete RFC 1813 specification,
// including procedures that may not be used by all clients
#![allow(dead_code)]
// Preserve original RFC naming conventions (e.g. READ3args, COMMIT3resok)
// for consistency with the NFS version 3 protocol specification
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;
use crate::XDREnumSerde;

/// Arguments for the READ procedure (procedure 6) as defined in RFC 1813 section 3.3.6
/// Used to read data from a regular file
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READ3args {
    /// File handle for the file to be read
    pub file: nfs_fh3,
    /// Position within the file to begin reading
    pub offset: offset3,
    /// Number of bytes of data to read
    pub count: count3,
}
XDRStruct!(READ3args, file, offset, count);

/// Successful response for the READ procedure as defined in RFC 1813 section 3.3.6
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct READ3resok {
    /// File attributes after the operation
    pub file_attributes: post_op_attr,
    /// Number of bytes actually read
    pub count: count3,
    /// True if the end of file was reached
    pub eof: bool,
    /// The data read from the file
    pub data: Vec<u8>,
}
XDRStruct!(READ3resok, file_attributes, count, eof, data);

/// Failure response for the READ procedure
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct READ3resfail {
    /// File attributes after the operation, if available
    pub file_attributes: post_op_attr,
}
XDRStruct!(READ3resfail, file_attributes);

/// Reply union for READ (procedure 6)
pub type READ3res = Nfs3Result<READ3resok, READ3resfail>;

/// Arguments for the COMMIT procedure (procedure 21) as defined in RFC 1813 section 3.3.21
/// Used to commit pending writes to stable storage
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct COMMIT3args {
    /// File handle for the file to commit
    pub file: nfs_fh3,
    /// Position within the file to start committing
    pub offset: offset3,
    /// Number of bytes to commit
    pub count: count3,
}
XDRStruct!(COMMIT3args, file, offset, count);

/// Successful response for the COMMIT procedure as defined in RFC 1813 section 3.3.21
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct COMMIT3resok {
    /// File attributes before and after the operation
    pub file_wcc: wcc_data,
    /// Write verifier to detect server restarts
    pub verf: writeverf3,
}
XDRStruct!(COMMIT3resok, file_wcc, verf);

/// Failure response for the COMMIT procedure
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct COMMIT3resfail {
    /// File attributes before and after the operation, if available
    pub file_wcc: wcc_data,
}
XDRStruct!(COMMIT3resfail, file_wcc);

/// Reply union for COMMIT (procedure 21)
pub type COMMIT3res = Nfs3Result<COMMIT3resok, COMMIT3resfail>;

/// Arguments for the LINK procedure (procedure 15) as defined in RFC 1813 section 3.3.15
/// Used to create a hard link to a file
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct LINK3args {
    /// File handle for the target file
    pub file: nfs_fh3,
    /// Directory and name for the new link
    pub link: diropargs3,
}
XDRStruct!(LINK3args, file, link);

/// Successful response for the LINK procedure
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct LINK3resok {
    /// Attributes of the linked file, if available
    pub file_attributes: post_op_attr,
    /// Weak cache consistency data for the directory the link was added to
    pub linkdir_wcc: wcc_data,
}
XDRStruct!(LINK3resok, file_attributes, linkdir_wcc);

/// Failure response for the LINK procedure
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct LINK3resfail {
    /// Attributes of the target file, if available
    pub file_attributes: post_op_attr,
    /// Weak cache consistency data for the directory the link was attempted in
    pub linkdir_wcc: wcc_data,
}
XDRStruct!(LINK3resfail, file_attributes, linkdir_wcc);

/// Reply union for LINK (procedure 15)
pub type LINK3res = Nfs3Result<LINK3resok, LINK3resfail>;

/// Enumeration specifying how data should be written to storage
/// as defined in RFC 1813 section 3.3.7
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum stable_how {
    /// Data may be buffered before writing to stable storage
    /// The server may return before the data is committed to stable storage
    #[default]
    UNSTABLE = 0,
    /// Data must be committed to stable storage before returning
    /// Only the data for this request is guaranteed to be committed
    DATA_SYNC = 1,
    /// All file system data must be committed to stable storage before returning
    /// This includes the data and all metadata for this request
    FILE_SYNC = 2,
}
XDREnumSerde!(stable_how);

/// Arguments for the WRITE procedure (procedure 7) as defined in RFC 1813 section 3.3.7
/// Used to write data to a regular file
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct WRITE3args {
    /// File handle for the file to write
    pub file: nfs_fh3,
    /// Position within the file to begin writing
    pub offset: offset3,
    /// Number of bytes of data to write
    pub count: count3,
    /// How to commit the data to storage
    pub stable: u32,
    /// The data to be written
    pub data: Vec<u8>,
}
XDRStruct!(WRITE3args, file, offset, count, stable, data);

/// Successful response for the WRITE procedure as defined in RFC 1813 section 3.3.7
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct WRITE3resok {
    /// File attributes before and after the operation
    pub file_wcc: wcc_data,
    /// Number of bytes actually written
    pub count: count3,
    /// How the data was committed to stable storage
    pub committed: stable_how,
    /// Write verifier to detect server restarts
    pub verf: writeverf3,
}
XDRStruct!(WRITE3resok, file_wcc, count, committed, verf);

/// Failure response for the WRITE procedure
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone)]
pub struct WRITE3resfail {
    /// File attributes before and after the operation, if available
    pub file_wcc: wcc_data,
}
XDRStruct!(WRITE3resfail, file_wcc);

/// Reply union for WRITE (procedure 7)
pub type WRITE3res = Nfs3Result<WRITE3resok, WRITE3resfail>;

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::xdr::decode;

    #[test]
    fn read_result_roundtrips() {
        let res = READ3res::ok(READ3resok {
            file_attributes: post_op_attr::Void,
            count: 4,
            eof: true,
            data: vec![1, 2, 3, 4],
        });
        let mut buf = Vec::new();
        res.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: READ3res = decode(&mut cursor).unwrap();
        let ok = decoded.ok.unwrap();
        assert_eq!(ok.data, vec![1, 2, 3, 4]);
        assert!(ok.eof);
    }

    #[test]
    fn write_result_roundtrips_failure() {
        let res = WRITE3res::err(
            nfsstat3::NFS3ERR_NOSPC,
            WRITE3resfail { file_wcc: wcc_data::default() },
        );
        let mut buf = Vec::new();
        res.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: WRITE3res = decode(&mut cursor).unwrap();
        assert!(matches!(decoded.status, nfsstat3::NFS3ERR_NOSPC));
        assert!(decoded.ok.is_none());
    }
}
