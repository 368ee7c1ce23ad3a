//! RPC (Remote Procedure Call) client transport as specified in RFC 5531
//! (previously RFC 1057).
//!
//! The teacher's `protocol::rpc` is a server-side dispatcher: it reads a call
//! off the wire, routes it to a handler, and writes a reply. This client runs
//! the same envelope the other direction - it builds a call, writes it,
//! and reads back the matching reply - so the framing (`framing`) and message
//! shapes (`xdr::rpc`) are shared, but transaction tracking and dispatch are
//! replaced by xid allocation and call/reply correlation.
//!
//! Two transports are provided: [`udp::UdpTransport`] (one datagram per
//! message, used for portmapper/mount lookups) and [`tcp::TcpTransport`]
//! (record-marked, used for NFS traffic). Both implement [`Transport`].

pub mod framing;
pub mod tcp;
pub mod udp;

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::protocol::xdr::rpc::{
    accept_body, auth_unix, call_message, opaque_auth, rejected_reply, reply_body, rpc_body,
    rpc_msg,
};
use crate::protocol::xdr::{decode, XDR};

/// Default per-call deadline when `ClientOptions::command_timeout_ms` is unset.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);
/// Default number of retransmissions a UDP call attempts before giving up.
pub const DEFAULT_UDP_RETRIES: u32 = 3;

/// The reserved-port range a privileged client traditionally binds from
/// (`rresvport(3)`'s range), tried highest-first so the common case costs one
/// bind attempt.
const PRIVILEGED_PORT_RANGE: std::ops::RangeInclusive<u16> = 600..=1023;

fn privileged_local_addr(remote: std::net::SocketAddr, port: u16) -> std::net::SocketAddr {
    if remote.is_ipv4() {
        std::net::SocketAddr::from(([0, 0, 0, 0], port))
    } else {
        std::net::SocketAddr::from(([0u16; 8], port))
    }
}

/// Binds a TCP socket to the first available port in
/// [`PRIVILEGED_PORT_RANGE`]. Binding below 1024 requires privilege the
/// process may not have; per `spec.md` §4.2 that failure is surfaced to the
/// caller, never silently retried on an unprivileged port.
pub(crate) fn bind_privileged_tcp(remote: std::net::SocketAddr) -> anyhow::Result<tokio::net::TcpSocket> {
    let mut last_err = None;
    for port in PRIVILEGED_PORT_RANGE.rev() {
        let socket = if remote.is_ipv4() { tokio::net::TcpSocket::new_v4() } else { tokio::net::TcpSocket::new_v6() }?;
        match socket.bind(privileged_local_addr(remote, port)) {
            Ok(()) => return Ok(socket),
            Err(e) => last_err = Some(e),
        }
    }
    Err(anyhow!(last_err.unwrap()).context("no privileged TCP port available in 600..=1023"))
}

/// As [`bind_privileged_tcp`], for UDP.
pub(crate) async fn bind_privileged_udp(remote: std::net::SocketAddr) -> anyhow::Result<tokio::net::UdpSocket> {
    let mut last_err = None;
    for port in PRIVILEGED_PORT_RANGE.rev() {
        match tokio::net::UdpSocket::bind(privileged_local_addr(remote, port)).await {
            Ok(socket) => return Ok(socket),
            Err(e) => last_err = Some(e),
        }
    }
    Err(anyhow!(last_err.unwrap()).context("no privileged UDP port available in 600..=1023"))
}

/// Generates unique transaction ids for the calls one client issues.
///
/// A server disambiguates retransmissions by tracking xids it has already
/// seen (`TransactionTracker`); a client instead only needs xids unique
/// enough to correlate its own in-flight calls, so a monotonic counter is
/// sufficient - RFC 5531 places no constraint on xid allocation beyond "the
/// client considers it unique".
#[derive(Debug, Default)]
pub struct XidGenerator(AtomicU32);

impl XidGenerator {
    /// Creates a generator starting from an arbitrary non-zero value.
    pub fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    /// Returns the next xid to stamp on an outgoing call.
    pub fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// The credential this client presents on every call.
#[derive(Clone, Debug)]
pub enum Credentials {
    /// AUTH_NONE (flavor 0): no identity asserted.
    None,
    /// AUTH_SYS (flavor 1, historically `AUTH_UNIX`): RFC 5531 section 8.2.
    Unix {
        /// Arbitrary value helping the server detect replays
        stamp: u32,
        /// Name of the calling machine
        machine_name: String,
        /// Effective uid of the caller
        uid: u32,
        /// Effective gid of the caller
        gid: u32,
        /// Supplementary group ids, RFC 5531 caps this list at 16 entries
        gids: Vec<u32>,
    },
}

impl Credentials {
    fn to_opaque_auth(&self) -> anyhow::Result<opaque_auth> {
        match self {
            Credentials::None => Ok(opaque_auth::none()),
            Credentials::Unix { stamp, machine_name, uid, gid, gids } => {
                if gids.len() > 16 {
                    return Err(anyhow!("AUTH_SYS gid list exceeds 16 entries"));
                }
                let body = auth_unix {
                    stamp: *stamp,
                    machinename: machine_name.clone().into_bytes(),
                    uid: *uid,
                    gid: *gid,
                    gids: gids.clone(),
                };
                let mut buf = Vec::new();
                body.serialize(&mut buf)?;
                Ok(opaque_auth::unix(buf))
            }
        }
    }
}

/// Transport-agnostic contract: marshal a call envelope around `args` (the
/// already-XDR-encoded procedure arguments), send it, and return the raw
/// bytes of the successful reply's procedure-specific result - the envelope
/// itself (xid, accept/reject status, authentication) has already been
/// validated and stripped by the time this returns.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues one RPC call and returns the decoded result bytes, or an error
    /// if the transport failed, the call timed out, or the server rejected
    /// or denied the call.
    async fn call(
        &self,
        prog: u32,
        vers: u32,
        proc: u32,
        cred: &Credentials,
        args: &[u8],
    ) -> anyhow::Result<Vec<u8>>;
}

/// Builds the full serialized `CALL` message (envelope + arguments) this
/// client sends for one RPC.
fn build_call(xid: u32, prog: u32, vers: u32, proc: u32, cred: &Credentials, args: &[u8]) -> anyhow::Result<Vec<u8>> {
    let msg = call_message(xid, prog, vers, proc, cred.to_opaque_auth()?, opaque_auth::none());
    let mut buf = Vec::new();
    msg.serialize(&mut buf)?;
    buf.extend_from_slice(args);
    Ok(buf)
}

/// Parses a reply envelope from `buf`, validating that it's accepted and
/// matches `expected_xid`, and returns the remaining procedure-specific
/// result bytes.
fn parse_reply(buf: &[u8], expected_xid: u32) -> anyhow::Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(buf);
    let msg: rpc_msg = decode(&mut cursor)?;
    if msg.xid != expected_xid {
        return Err(anyhow!("xid mismatch: expected {expected_xid}, got {}", msg.xid));
    }
    let reply = match msg.body {
        rpc_body::REPLY(reply) => reply,
        rpc_body::CALL(_) => return Err(anyhow!("expected REPLY, got CALL")),
    };
    match reply {
        reply_body::MSG_DENIED(rejected_reply::RPC_MISMATCH(info)) => {
            Err(anyhow!("RPC version mismatch: server supports {}..={}", info.low, info.high))
        }
        reply_body::MSG_DENIED(rejected_reply::AUTH_ERROR(stat)) => {
            Err(anyhow!("RPC call denied: authentication error {stat:?}"))
        }
        reply_body::MSG_ACCEPTED(accepted) => match accepted.reply_data {
            accept_body::SUCCESS => {
                let pos = cursor.position() as usize;
                Ok(buf[pos..].to_vec())
            }
            accept_body::PROG_UNAVAIL => Err(anyhow!("remote program unavailable")),
            accept_body::PROG_MISMATCH(info) => {
                Err(anyhow!("program version mismatch: server supports {}..={}", info.low, info.high))
            }
            accept_body::PROC_UNAVAIL => Err(anyhow!("procedure unavailable")),
            accept_body::GARBAGE_ARGS => Err(anyhow!("server could not decode call arguments")),
            accept_body::SYSTEM_ERR => Err(anyhow!("remote system error")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::xdr::rpc::{accepted_reply, rpc_body};

    #[test]
    fn build_call_then_parse_accepted_reply() {
        let xid = 7;
        let call = build_call(xid, 100003, 3, 1, &Credentials::None, &[9, 9, 9, 9]).unwrap();
        assert!(call.len() > 4);

        let reply_msg = rpc_msg {
            xid,
            body: rpc_body::REPLY(reply_body::MSG_ACCEPTED(accepted_reply {
                verf: opaque_auth::none(),
                reply_data: accept_body::SUCCESS,
            })),
        };
        let mut buf = Vec::new();
        reply_msg.serialize(&mut buf).unwrap();
        buf.extend_from_slice(&[42, 42]);

        let result = parse_reply(&buf, xid).unwrap();
        assert_eq!(result, vec![42, 42]);
    }

    #[test]
    fn parse_reply_rejects_xid_mismatch() {
        let reply_msg = rpc_msg {
            xid: 1,
            body: rpc_body::REPLY(reply_body::MSG_ACCEPTED(accepted_reply {
                verf: opaque_auth::none(),
                reply_data: accept_body::SUCCESS,
            })),
        };
        let mut buf = Vec::new();
        reply_msg.serialize(&mut buf).unwrap();
        assert!(parse_reply(&buf, 2).is_err());
    }

    #[test]
    fn auth_sys_rejects_oversized_gid_list() {
        let creds = Credentials::Unix {
            stamp: 0,
            machine_name: "host".into(),
            uid: 0,
            gid: 0,
            gids: vec![0; 17],
        };
        assert!(creds.to_opaque_auth().is_err());
    }
}
