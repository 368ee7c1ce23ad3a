//! This module provides data structures for the Remote Procedure Call (RPC) protocol
//! as defined in RFC 5531 (previously RFC 1057). These structures handle serialization
//! and deserialization of RPC messages exchanged with a remote server.

// Allow unused code since we implement the complete RFC specification
#![allow(dead_code)]
// Keep original RFC naming conventions for consistency with the specification
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::XDR;
use crate::{XDREnumSerde, XDRStruct};

/// Authentication status codes indicating why authentication failed
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum auth_stat {
    /// Invalid credentials provided by client (checksum/signature verification failed)
    #[default]
    AUTH_BADCRED = 1,
    /// Credentials rejected - server wants a new session established
    AUTH_REJECTEDCRED = 2,
    /// Invalid verifier provided by client (checksum/signature verification failed)
    AUTH_BADVERF = 3,
    /// Verifier rejected due to expiration or replay attempt
    AUTH_REJECTEDVERF = 4,
    /// Authentication mechanism too weak for requested operation
    AUTH_TOOWEAK = 5,
}
XDREnumSerde!(auth_stat);

/// Authentication flavor (mechanism) identifiers for RPC
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum auth_flavor {
    /// No authentication
    #[default]
    AUTH_NULL = 0,
    /// UNIX-style authentication (uid/gid)
    AUTH_UNIX = 1,
    /// Short-form authentication
    AUTH_SHORT = 2,
    /// DES authentication
    AUTH_DES = 3,
    /* RPCSEC_GSS and friends are out of scope */
}
XDREnumSerde!(auth_flavor);

/// UNIX-style credentials presented with every call this client makes.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct auth_unix {
    /// Timestamp to help the server spot replays
    pub stamp: u32,
    /// The name of the client machine
    pub machinename: Vec<u8>,
    /// The effective user ID of the caller
    pub uid: u32,
    /// The effective group ID of the caller
    pub gid: u32,
    /// A list of additional group IDs for the caller
    pub gids: Vec<u32>,
}
XDRStruct!(auth_unix, stamp, machinename, uid, gid, gids);

/// Opaque authentication data carried in both calls and replies (RFC 5531 §8.2).
///
/// A call carries two of these (credentials and verifier); a reply carries one
/// (the server's response verifier). The byte payload is interpreted according
/// to `flavor` - this crate only ever populates `AUTH_NULL` or `AUTH_UNIX`.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub struct opaque_auth {
    /// The authentication mechanism being used
    pub flavor: auth_flavor,
    /// The opaque authentication data associated with that mechanism
    pub body: Vec<u8>,
}
XDRStruct!(opaque_auth, flavor, body);

impl Default for opaque_auth {
    fn default() -> opaque_auth {
        opaque_auth { flavor: auth_flavor::AUTH_NULL, body: Vec::new() }
    }
}

impl opaque_auth {
    /// The verifier/credential used for AUTH_NONE: no flavor data at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds an `AUTH_UNIX` credential from already-encoded `auth_unix` bytes.
    pub fn unix(body: Vec<u8>) -> Self {
        opaque_auth { flavor: auth_flavor::AUTH_UNIX, body }
    }
}

/// RPC message structure as defined in RFC 5531 (previously RFC 1057).
///
/// Each RPC message begins with a transaction identifier (xid) followed by a
/// discriminated union containing either a CALL or REPLY message body. This
/// client allocates the xid for every call and matches replies against it;
/// the xid is never treated as a sequence number.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct rpc_msg {
    /// Transaction identifier used to match calls and replies
    pub xid: u32,
    /// The body of the RPC message (call or reply)
    pub body: rpc_body,
}
XDRStruct!(rpc_msg, xid, body);

/// The body of an RPC message, which can be either a call or a reply
#[allow(non_camel_case_types)]
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug)]
#[repr(u32)]
pub enum rpc_body {
    /// A call to a remote procedure
    CALL(call_body),
    /// A reply from a remote procedure
    REPLY(reply_body),
}

impl Default for rpc_body {
    fn default() -> rpc_body {
        rpc_body::CALL(call_body::default())
    }
}

impl XDR for rpc_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            rpc_body::CALL(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)?;
            }
            rpc_body::REPLY(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)?;
            }
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match super::decode::<u32, R>(src)? {
            0 => *self = rpc_body::CALL(super::decode(src)?),
            1 => *self = rpc_body::REPLY(super::decode(src)?),
            msg_type => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid message type in rpc_body: {msg_type}"),
                ))
            }
        }
        Ok(())
    }
}

/// The body of an RPC call, containing everything the server needs to route
/// and authenticate the call. Procedure-specific arguments follow on the wire
/// immediately after `verf` and are handled outside this struct.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct call_body {
    /// RPC version, always 2
    pub rpcvers: u32,
    /// The program to call
    pub prog: u32,
    /// The version of the program
    pub vers: u32,
    /// The procedure within the program to call
    pub proc: u32,
    /// Authentication credentials for the caller
    pub cred: opaque_auth,
    /// Authentication verifier for the caller
    pub verf: opaque_auth,
}
XDRStruct!(call_body, rpcvers, prog, vers, proc, cred, verf);

/// RPC version this crate speaks; every `call_body` is stamped with it.
pub const RPC_VERSION: u32 = 2;

/// The body of an RPC reply, indicating whether the call was accepted or denied
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub enum reply_body {
    /// The call was accepted
    MSG_ACCEPTED(accepted_reply),
    /// The call was denied
    MSG_DENIED(rejected_reply),
}

impl Default for reply_body {
    fn default() -> reply_body {
        reply_body::MSG_ACCEPTED(accepted_reply::default())
    }
}

impl XDR for reply_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            reply_body::MSG_ACCEPTED(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)?;
            }
            reply_body::MSG_DENIED(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)?;
            }
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match super::decode::<u32, R>(src)? {
            0 => *self = reply_body::MSG_ACCEPTED(super::decode(src)?),
            1 => *self = reply_body::MSG_DENIED(super::decode(src)?),
            reply_status => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid reply status in reply_body: {reply_status}"),
                ))
            }
        }
        Ok(())
    }
}

/// Information about program version mismatch
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct mismatch_info {
    /// Lowest version supported
    pub low: u32,
    /// Highest version supported
    pub high: u32,
}
XDRStruct!(mismatch_info, low, high);

/// Reply to an RPC call that was accepted by the server.
///
/// Even though the call was accepted, there could still be an error processing
/// it - see `accept_body` for the possible outcomes.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, Default)]
pub struct accepted_reply {
    /// Authentication verifier from server
    pub verf: opaque_auth,
    /// Reply data union discriminated by accept_stat
    pub reply_data: accept_body,
}
XDRStruct!(accepted_reply, verf, reply_data);

/// Response data for an accepted RPC call, discriminated by accept_stat.
#[allow(non_camel_case_types)]
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, Default)]
#[repr(u32)]
pub enum accept_body {
    /// Call completed successfully; protocol-specific reply body follows
    #[default]
    SUCCESS,
    /// The requested program is not available on this server
    PROG_UNAVAIL,
    /// Program version mismatch; includes supported version range
    PROG_MISMATCH(mismatch_info),
    /// The requested procedure is not available in this program
    PROC_UNAVAIL,
    /// The server could not decode the call arguments
    GARBAGE_ARGS,
    /// The server encountered a system error (e.g. out of memory)
    SYSTEM_ERR,
}

impl XDR for accept_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            accept_body::SUCCESS => 0_u32.serialize(dest)?,
            accept_body::PROG_UNAVAIL => 1_u32.serialize(dest)?,
            accept_body::PROG_MISMATCH(v) => {
                2_u32.serialize(dest)?;
                v.serialize(dest)?;
            }
            accept_body::PROC_UNAVAIL => 3_u32.serialize(dest)?,
            accept_body::GARBAGE_ARGS => 4_u32.serialize(dest)?,
            accept_body::SYSTEM_ERR => 5_u32.serialize(dest)?,
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match super::decode::<u32, R>(src)? {
            0 => *self = accept_body::SUCCESS,
            1 => *self = accept_body::PROG_UNAVAIL,
            2 => *self = accept_body::PROG_MISMATCH(super::decode(src)?),
            3 => *self = accept_body::PROC_UNAVAIL,
            4 => *self = accept_body::GARBAGE_ARGS,
            5 => *self = accept_body::SYSTEM_ERR,
            accept_stat => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid accept stat in accept_body: {accept_stat}"),
                ));
            }
        }
        Ok(())
    }
}

/// Reply sent when an RPC call is rejected outright (never reaches the program).
///
/// Rejection happens for two reasons: an RPC version the server doesn't speak
/// (`RPC_MISMATCH`), or an authentication failure (`AUTH_ERROR`).
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub enum rejected_reply {
    /// RPC version mismatch - includes the server's supported version range
    RPC_MISMATCH(mismatch_info),
    /// Authentication failed - includes the specific error code
    AUTH_ERROR(auth_stat),
}

impl Default for rejected_reply {
    fn default() -> rejected_reply {
        rejected_reply::AUTH_ERROR(auth_stat::default())
    }
}

impl XDR for rejected_reply {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            rejected_reply::RPC_MISMATCH(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)?;
            }
            rejected_reply::AUTH_ERROR(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)?;
            }
        }
        Ok(())
    }

    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match super::decode::<u32, R>(src)? {
            0 => *self = rejected_reply::RPC_MISMATCH(super::decode(src)?),
            1 => *self = rejected_reply::AUTH_ERROR(super::decode(src)?),
            stat => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid reject stat in rejected_reply: {stat}"),
                ))
            }
        }
        Ok(())
    }
}

/// Builds the CALL envelope this client sends for every outgoing request.
///
/// `cred`/`verf` are `opaque_auth::none()` for AUTH_NONE connections, or an
/// `opaque_auth::unix(..)` built from a pre-serialized `auth_unix` for AUTH_SYS.
pub fn call_message(
    xid: u32,
    prog: u32,
    vers: u32,
    proc: u32,
    cred: opaque_auth,
    verf: opaque_auth,
) -> rpc_msg {
    rpc_msg {
        xid,
        body: rpc_body::CALL(call_body { rpcvers: RPC_VERSION, prog, vers, proc, cred, verf }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::xdr::decode;

    #[test]
    fn call_message_roundtrips() {
        let msg = call_message(
            42,
            portmap_program(),
            2,
            3,
            opaque_auth::none(),
            opaque_auth::none(),
        );
        let mut buf = Vec::new();
        msg.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: rpc_msg = decode(&mut cursor).unwrap();
        assert_eq!(decoded.xid, 42);
        match decoded.body {
            rpc_body::CALL(c) => {
                assert_eq!(c.vers, 2);
                assert_eq!(c.proc, 3);
            }
            _ => panic!("expected CALL"),
        }
    }

    fn portmap_program() -> u32 {
        super::super::portmap::PROGRAM
    }

    #[test]
    fn accepted_success_reply_roundtrips() {
        let reply = reply_body::MSG_ACCEPTED(accepted_reply {
            verf: opaque_auth::none(),
            reply_data: accept_body::SUCCESS,
        });
        let mut buf = Vec::new();
        reply.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: reply_body = decode(&mut cursor).unwrap();
        match decoded {
            reply_body::MSG_ACCEPTED(a) => assert!(matches!(a.reply_data, accept_body::SUCCESS)),
            _ => panic!("expected MSG_ACCEPTED"),
        }
    }

    #[test]
    fn denied_auth_error_reply_roundtrips() {
        let reply = reply_body::MSG_DENIED(rejected_reply::AUTH_ERROR(auth_stat::AUTH_REJECTEDCRED));
        let mut buf = Vec::new();
        reply.serialize(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: reply_body = decode(&mut cursor).unwrap();
        match decoded {
            reply_body::MSG_DENIED(rejected_reply::AUTH_ERROR(s)) => {
                assert!(matches!(s, auth_stat::AUTH_REJECTEDCRED))
            }
            _ => panic!("expected MSG_DENIED/AUTH_ERROR"),
        }
    }
}
