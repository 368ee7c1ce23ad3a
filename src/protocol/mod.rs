//! Protocol module implements the client side of the ONC-RPC/NFS stack for
//! versions 2, 3, and 4.1 (RFC 1094, RFC 1813, RFC 5661).
//!
//! This module contains two main components:
//!
//! - `xdr`: External Data Representation (RFC 1832) types for the RPC
//!   envelope, the PORTMAP and MOUNT protocols, and the NFSv2/v3/v4.1 wire
//!   structures themselves.
//!
//! - `rpc`: the transport layer that turns an `xdr` request into bytes on a
//!   socket and an `xdr` reply back out of one - UDP and TCP framing, xid
//!   allocation and call/reply correlation, and retransmission.

pub mod rpc;
pub mod xdr;
