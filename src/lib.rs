//! nfs-client-mamont - a Rust NFS client library over ONC-RPC
//!
//! This library speaks the client side of the Network File System protocol
//! family, against real NFS servers:
//!
//! - NFSv2 (RFC 1094), paired with MOUNT protocol version 1.
//! - NFSv3 (RFC 1813), paired with MOUNT protocol version 3.
//! - NFSv4.1 (RFC 5661), which folds mounting into its own COMPOUND sessions.
//!
//! ## Main components
//!
//! - `client`: [`Client`], the per-connection façade most callers start from
//!   - construct with a wire version, `connect`, `mount`, then read/write/list
//!   paths.
//! - `pool`: [`Pool`], a `(server, export, version)`-keyed connection pool for
//!   callers that want to lease rather than own a `Client`.
//! - `engine`: the per-version operation engines ([`engine::v2`],
//!   [`engine::v3`], [`engine::v4`]) behind one [`engine::Engine`] trait.
//! - `resolver`: the path-to-file-handle cache the façade consults before
//!   issuing a LOOKUP chain.
//! - `protocol`: the ONC-RPC transport and XDR wire types underneath all of
//!   the above.
//! - `health`: a connection health probe callers can poll or heartbeat.
//! - `config`: `serde`/`toml`-backed option structs for `Client`, `Pool` and
//!   `HealthProbe`.
//!
//! ## Standards compliance
//!
//! - RFC 1094: NFS Version 2 Protocol Specification
//! - RFC 1813: NFS Version 3 Protocol Specification
//! - RFC 5661: NFS Version 4 Minor Version 1 Protocol (this crate speaks only
//!   minor version 1, never 4.0 or 4.2)
//! - RFC 5531: RPC: Remote Procedure Call Protocol Specification Version 2
//! - RFC 1832: XDR: External Data Representation Standard

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod mount;
pub mod pool;
pub mod portmap;
pub mod protocol;
pub mod resolver;

pub use client::{Client, NfsVersion};
pub use config::{ClientOptions, Config, HealthOptions, PoolOptions};
pub use error::{NfsError, NfsStatusKind};
pub use health::{HealthCheckResult, HealthProbe, HealthStatus};
pub use pool::{Pool, PooledConnection};
