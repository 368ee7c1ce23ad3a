//! UDP transport: one datagram per call, used for the portmapper and for
//! MOUNT lookups where the reply fits comfortably in a single packet.
//!
//! UDP gives no delivery guarantee, so RFC 1057/5531 leave retransmission to
//! the client. This implementation retries up to `retries` times with the
//! same xid (a server that already answered the first datagram will just
//! answer the retransmission too - RPC semantics require at-most-once
//! *effects*, not at-most-once delivery) and frees the call's xid slot once
//! it gives up, since a dropped call means no reply will ever consume it.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use super::{build_call, parse_reply, Credentials, Transport, XidGenerator, DEFAULT_UDP_RETRIES};

/// One UDP socket connected to a single remote RPC endpoint.
pub struct UdpTransport {
    socket: UdpSocket,
    xids: XidGenerator,
    timeout: Duration,
    retries: u32,
}

impl UdpTransport {
    /// Binds an ephemeral local UDP socket and connects it to `addr`.
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> anyhow::Result<Self> {
        Self::connect_with(addr, timeout, false).await
    }

    /// As [`UdpTransport::connect`], optionally binding a local port below
    /// 1024 first (`use_privileged_port`; see `super::bind_privileged_udp`).
    pub async fn connect_with(addr: SocketAddr, timeout: Duration, use_privileged_port: bool) -> anyhow::Result<Self> {
        let socket = if use_privileged_port {
            super::bind_privileged_udp(addr).await?
        } else {
            let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
            UdpSocket::bind(local).await.with_context(|| format!("binding UDP socket for {addr}"))?
        };
        socket
            .connect(addr)
            .await
            .with_context(|| format!("connecting UDP socket to {addr}"))?;
        Ok(Self {
            socket,
            xids: XidGenerator::new(),
            timeout,
            retries: DEFAULT_UDP_RETRIES,
        })
    }

    /// Overrides the default retransmission count.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn call(
        &self,
        prog: u32,
        vers: u32,
        proc: u32,
        cred: &Credentials,
        args: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        let xid = self.xids.next();
        let datagram = build_call(xid, prog, vers, proc, cred, args)?;

        let mut attempt = 0;
        loop {
            self.socket.send(&datagram).await.context("sending UDP datagram")?;

            let mut buf = vec![0u8; 65536];
            let recv = tokio::time::timeout(self.timeout, self.socket.recv(&mut buf)).await;
            match recv {
                Ok(Ok(n)) => {
                    buf.truncate(n);
                    return parse_reply(&buf, xid);
                }
                Ok(Err(e)) => return Err(anyhow!(e).context("receiving UDP datagram")),
                Err(_) => {
                    attempt += 1;
                    if attempt > self.retries {
                        // The xid this call used is simply never reused again; no
                        // explicit free is needed since XidGenerator never recycles.
                        warn!(prog, vers, proc, attempts = attempt, "UDP call timed out, giving up");
                        return Err(anyhow!(std::io::Error::from(std::io::ErrorKind::TimedOut)));
                    }
                    debug!(prog, vers, proc, attempt, "UDP call timed out, retransmitting");
                }
            }
        }
    }
}
