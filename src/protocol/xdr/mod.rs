//! The XDR (External Data Representation) module defines data structures and methods
//! for serializing/deserializing data according to the RFC 1832 standard.
//!
//! XDR provides a machine-independent data representation format, which is critical
//! for network protocols like NFS and the ONC-RPC substrate it rides on. Every value
//! that crosses the wire between this client and a remote server - RPC envelopes,
//! MOUNT/PORTMAP arguments, NFSv2/v3 attributes and operation arguments, NFSv4.1
//! COMPOUND operations - implements the `XDR` trait defined here.
//!
//! All reads/writes below either produce a multiple of 4 bytes directly or pad
//! explicitly, so nothing downstream needs to track alignment itself.

use std::io::{Read, Write};

use byteorder::BigEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};

pub mod mount;
pub mod nfs2;
pub mod nfs3;
pub mod nfs4;
pub mod portmap;
pub mod rpc;

/// Type alias for the standard endianness used in XDR serialization (Big Endian).
pub type XDREndian = BigEndian;

/// The XDR trait defines methods for serializing and deserializing data structures
/// according to the External Data Representation (XDR) standard defined in RFC 1832.
///
/// All data structures that need to be serialized to or deserialized from the
/// network must implement this trait. A server only ever decodes calls and
/// encodes replies; this crate runs the traffic the other way, but the trait
/// itself stays direction-agnostic.
#[allow(clippy::upper_case_acronyms)]
pub trait XDR {
    /// Serializes the implementing type to the provided writer.
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()>;

    /// Deserializes data from the provided reader into the implementing type.
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()>;
}

/// Decodes a value of type `T` from a reader, seeding it with `T::default()`.
///
/// Convenience for call sites that want an expression instead of a
/// `let mut v = T::default(); v.deserialize(src)?;` pair.
pub fn decode<T: XDR + Default, R: Read>(src: &mut R) -> std::io::Result<T> {
    let mut v = T::default();
    v.deserialize(src)?;
    Ok(v)
}

/// Macro for implementing XDR serialization and deserialization for enumerations
/// whose wire representation is a plain `uint32` discriminant.
#[allow(non_camel_case_types)]
#[macro_export]
macro_rules! XDREnumSerde {
    ($t:ident) => {
        impl $crate::protocol::xdr::XDR for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                use byteorder::WriteBytesExt;
                dest.write_u32::<$crate::protocol::xdr::XDREndian>(*self as u32)
            }

            fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                use byteorder::ReadBytesExt;
                use num_traits::cast::FromPrimitive;
                let r: u32 = src.read_u32::<$crate::protocol::xdr::XDREndian>()?;
                if let Some(p) = FromPrimitive::from_u32(r) {
                    *self = p;
                } else {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("invalid discriminant {} for {}", r, stringify!($t)),
                    ));
                }
                Ok(())
            }
        }
    };
}

/// Macro for implementing XDR serialization and deserialization for structs by
/// walking their fields in declaration order - the RFC field order is the wire
/// order, so there's no reason to reach for reflection here.
#[allow(non_camel_case_types)]
#[macro_export]
macro_rules! XDRStruct {
    ($t:ident, $($element:ident),* $(,)?) => {
        impl $crate::protocol::xdr::XDR for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                $($crate::protocol::xdr::XDR::serialize(&self.$element, dest)?;)*
                Ok(())
            }

            fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                $($crate::protocol::xdr::XDR::deserialize(&mut self.$element, src)?;)*
                Ok(())
            }
        }
    };
}

/// Macro for implementing XDR serialization and deserialization for boolean unions.
///
/// This is specialized for XDR unions where a boolean discriminant selects between
/// a void (empty) case and a case carrying a value of some type - `pre_op_attr`,
/// `post_op_attr`, `post_op_fh3` and friends in RFC 1813 are all this shape.
///
/// # Example
/// ```ignore
/// enum pre_op_attr {
///     Void,
///     attributes(wcc_attr),
/// }
/// XDRBoolUnion!(pre_op_attr, attributes, wcc_attr);
/// ```
#[allow(non_camel_case_types)]
#[macro_export]
macro_rules! XDRBoolUnion {
    ($t:ident, $enumcase:ident, $enumtype:ty) => {
        impl $crate::protocol::xdr::XDR for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                match self {
                    $t::Void => {
                        $crate::protocol::xdr::XDR::serialize(&false, dest)?;
                    }
                    $t::$enumcase(v) => {
                        $crate::protocol::xdr::XDR::serialize(&true, dest)?;
                        $crate::protocol::xdr::XDR::serialize(v, dest)?;
                    }
                }
                Ok(())
            }

            fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                let mut present: bool = false;
                $crate::protocol::xdr::XDR::deserialize(&mut present, src)?;
                if present {
                    let mut v = <$enumtype>::default();
                    $crate::protocol::xdr::XDR::deserialize(&mut v, src)?;
                    *self = $t::$enumcase(v);
                } else {
                    *self = $t::Void;
                }
                Ok(())
            }
        }
    };
}

// Re-export macros for use from sibling modules.
pub use crate::XDRBoolUnion;
pub use crate::XDREnumSerde;
pub use crate::XDRStruct;

impl XDR for bool {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<XDREndian>(u32::from(*self))
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u32::<XDREndian>()? != 0;
        Ok(())
    }
}

impl XDR for i32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i32::<XDREndian>(*self)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_i32::<XDREndian>()?;
        Ok(())
    }
}

impl XDR for i64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i64::<XDREndian>(*self)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_i64::<XDREndian>()?;
        Ok(())
    }
}

impl XDR for u32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<XDREndian>(*self)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u32::<XDREndian>()?;
        Ok(())
    }
}

impl XDR for u64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u64::<XDREndian>(*self)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u64::<XDREndian>()?;
        Ok(())
    }
}

/// `void`: the empty type carries nothing on the wire. Used as the `Fail`
/// parameter of [`nfs3::Nfs3Result`](nfs3::Nfs3Result) for operations whose
/// RFC-defined failure arm has no attached data.
impl XDR for () {
    fn serialize<W: Write>(&self, _dest: &mut W) -> std::io::Result<()> {
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, _src: &mut R) -> std::io::Result<()> {
        Ok(())
    }
}

impl XDR for f32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_f32::<XDREndian>(*self)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_f32::<XDREndian>()?;
        Ok(())
    }
}

impl XDR for f64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_f64::<XDREndian>(*self)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_f64::<XDREndian>()?;
        Ok(())
    }
}

/// Fixed-size opaque arrays (`opaque-fixed(n)`): raw bytes, zero-padded to the
/// next 4-byte boundary. There's no length prefix, the length is the type `N`.
impl<const N: usize> XDR for [u8; N] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_all(self)?;
        write_padding(N, dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        src.read_exact(self)?;
        read_padding(N, src)
    }
}

/// Variable-length opaque data (`opaque-variable`): a `uint32` length prefix,
/// the raw bytes, then zero padding to a 4-byte boundary.
impl XDR for Vec<u8> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        assert!(self.len() < u32::MAX as usize, "opaque-variable length overflows u32");
        (self.len() as u32).serialize(dest)?;
        dest.write_all(self)?;
        write_padding(self.len(), dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let len = decode::<u32, R>(src)? as usize;
        self.resize(len, 0);
        src.read_exact(self)?;
        read_padding(len, src)
    }
}

/// `array<T>`: a `uint32` count followed by that many `T` values, applies to
/// every typed array in the protocol (`Vec<u32>`, `Vec<nfstime3>`, ...).
impl<T: XDR + Default + Clone> XDR for Vec<T> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        assert!(self.len() < u32::MAX as usize, "array length overflows u32");
        (self.len() as u32).serialize(dest)?;
        for item in self {
            item.serialize(dest)?;
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let len = decode::<u32, R>(src)? as usize;
        self.clear();
        self.reserve(len);
        for _ in 0..len {
            self.push(decode::<T, R>(src)?);
        }
        Ok(())
    }
}

/// `optional<T>`: a `bool` presence flag followed (if true) by a `T`. Used for
/// the recursive MOUNT `EXPORT`/`groups` linked lists, decoded iteratively here
/// rather than left as a hand-walked list of optionals at call sites.
impl<T: XDR + Default> XDR for Option<T> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            None => false.serialize(dest),
            Some(v) => {
                true.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        if decode::<bool, R>(src)? {
            *self = Some(decode::<T, R>(src)?);
        } else {
            *self = None;
        }
        Ok(())
    }
}

const ALIGNMENT: usize = 4;

fn write_padding<W: Write>(len: usize, dest: &mut W) -> std::io::Result<()> {
    let pad = (ALIGNMENT - (len % ALIGNMENT)) % ALIGNMENT;
    if pad > 0 {
        dest.write_all(&[0_u8; ALIGNMENT][..pad])?;
    }
    Ok(())
}

fn read_padding<R: Read>(len: usize, src: &mut R) -> std::io::Result<()> {
    let pad = (ALIGNMENT - (len % ALIGNMENT)) % ALIGNMENT;
    if pad > 0 {
        let mut buf = [0_u8; ALIGNMENT];
        src.read_exact(&mut buf[..pad])?;
    }
    Ok(())
}

/// UTF-8 string: encoded identically to `opaque-variable`, validated on decode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XdrString(pub String);

impl XDR for XdrString {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.0.clone().into_bytes().serialize(dest)
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let bytes: Vec<u8> = decode(src)?;
        self.0 = String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(())
    }
}

impl From<&str> for XdrString {
    fn from(s: &str) -> Self {
        XdrString(s.to_owned())
    }
}

impl From<String> for XdrString {
    fn from(s: String) -> Self {
        XdrString(s)
    }
}

impl std::fmt::Display for XdrString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn roundtrip<T: XDR + Default + PartialEq + std::fmt::Debug>(v: T) {
        let mut buf = Vec::new();
        v.serialize(&mut buf).unwrap();
        assert_eq!(buf.len() % 4, 0, "encoded length must be 4-byte aligned");
        let mut cursor = Cursor::new(buf);
        let decoded: T = decode(&mut cursor).unwrap();
        assert_eq!(v, decoded);
    }

    #[test]
    fn primitives_roundtrip() {
        roundtrip(0_u32);
        roundtrip(u32::MAX);
        roundtrip(-1_i32);
        roundtrip(0_u64);
        roundtrip(u64::MAX);
        roundtrip(true);
        roundtrip(false);
    }

    #[test]
    fn opaque_variable_pads_to_four_bytes() {
        let data = vec![1_u8, 2, 3];
        let mut buf = Vec::new();
        data.serialize(&mut buf).unwrap();
        assert_eq!(buf.len(), 4 + 4); // len prefix + 3 bytes + 1 pad byte
        assert_eq!(&buf[4..7], &[1, 2, 3]);
        assert_eq!(buf[7], 0);
    }

    #[test]
    fn opaque_variable_exact_multiple_has_no_padding() {
        let data = vec![1_u8, 2, 3, 4];
        let mut buf = Vec::new();
        data.serialize(&mut buf).unwrap();
        assert_eq!(buf.len(), 4 + 4);
    }

    #[test]
    fn vec_of_u32_roundtrips() {
        roundtrip(vec![1_u32, 2, 3, 4, 5]);
        roundtrip(Vec::<u32>::new());
    }

    #[test]
    fn option_roundtrips() {
        roundtrip(Some(42_u32));
        roundtrip(None::<u32>);
    }

    #[test]
    fn string_roundtrips_and_rejects_invalid_utf8() {
        roundtrip(XdrString::from("hello, nfs"));
        let mut buf = Vec::new();
        vec![0xFF_u8, 0xFE].serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let res: std::io::Result<XdrString> = decode(&mut cursor);
        assert!(res.is_err());
    }

    #[test]
    fn decode_past_end_fails() {
        let buf: Vec<u8> = vec![0, 0, 0, 1]; // claims a 1-byte opaque, but no data follows
        let mut cursor = Cursor::new(buf);
        let res: std::io::Result<Vec<u8>> = decode(&mut cursor);
        assert!(res.is_err());
    }
}
