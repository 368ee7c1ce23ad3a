//! TCP transport: record-marked (RFC 5531 section 11), used for NFS traffic
//! proper where replies (READ/READDIR results) routinely exceed one UDP
//! datagram.
//!
//! Unlike UDP, TCP's own retransmission means a single write/read pair is
//! enough per call - framing keeps the client from reading a reply whose
//! final fragment hasn't arrived yet, and the timeout only has to catch a
//! stalled connection, not a lost packet.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::framing::{read_record, write_record};
use super::{build_call, parse_reply, Credentials, Transport, XidGenerator};

/// One TCP connection to a single remote RPC endpoint.
///
/// NFS over TCP is a stream of independent call/reply records sharing one
/// connection; since a client here issues calls sequentially against a given
/// connection (concurrency comes from the connection pool, not from
/// pipelining within one connection), the stream is guarded by a single
/// `Mutex` rather than split into separate read/write halves.
pub struct TcpTransport {
    stream: Mutex<TcpStream>,
    xids: XidGenerator,
    timeout: Duration,
}

impl TcpTransport {
    /// Connects to `addr` over TCP.
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> anyhow::Result<Self> {
        Self::connect_with(addr, timeout, false).await
    }

    /// As [`TcpTransport::connect`], optionally binding a local port below
    /// 1024 first (`use_privileged_port`; see `super::bind_privileged_tcp`).
    pub async fn connect_with(addr: SocketAddr, timeout: Duration, use_privileged_port: bool) -> anyhow::Result<Self> {
        let stream = if use_privileged_port {
            let socket = super::bind_privileged_tcp(addr)?;
            socket.connect(addr).await.with_context(|| format!("connecting TCP socket to {addr}"))?
        } else {
            TcpStream::connect(addr).await.with_context(|| format!("connecting TCP socket to {addr}"))?
        };
        stream.set_nodelay(true).context("setting TCP_NODELAY")?;
        Ok(Self {
            stream: Mutex::new(stream),
            xids: XidGenerator::new(),
            timeout,
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn call(
        &self,
        prog: u32,
        vers: u32,
        proc: u32,
        cred: &Credentials,
        args: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        let xid = self.xids.next();
        let record = build_call(xid, prog, vers, proc, cred, args)?;

        let mut stream = self.stream.lock().await;
        tokio::time::timeout(self.timeout, write_record(&mut *stream, &record))
            .await
            .map_err(|_| anyhow!(std::io::Error::from(std::io::ErrorKind::TimedOut)))?
            .context("writing RPC record")?;

        let reply = tokio::time::timeout(self.timeout, read_record(&mut *stream))
            .await
            .map_err(|_| anyhow!(std::io::Error::from(std::io::ErrorKind::TimedOut)))?
            .context("reading RPC record")?;

        parse_reply(&reply, xid)
    }
}
