//! Portmapper client: resolves `(program, version, protocol)` to the port a
//! service is actually listening on.
//!
//! Grounded on `protocol::xdr::portmap`'s wire types; this module is the
//! client-side consumer of them, issued over a one-shot [`UdpTransport`]
//! against the well-known portmapper port 111.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tracing::debug;

use crate::error::NfsError;
use crate::protocol::rpc::udp::UdpTransport;
use crate::protocol::rpc::{Credentials, Transport};
use crate::protocol::xdr::portmap::{mapping, PortmapProgram, IPPROTO_TCP, IPPROTO_UDP, PROGRAM, VERSION};
use crate::protocol::xdr::{decode, XDR};

/// The well-known port the portmapper itself listens on.
pub const PORTMAPPER_PORT: u16 = 111;

/// Resolves RPC service ports via the portmapper (RPC program 100000).
pub struct PortmapClient {
    transport: UdpTransport,
}

impl PortmapClient {
    /// Connects to the portmapper running on `host`.
    pub async fn connect(host: IpAddr, timeout: Duration) -> Result<Self, NfsError> {
        Self::connect_with(host, timeout, false).await
    }

    /// As [`PortmapClient::connect`], optionally binding a local port below
    /// 1024 first.
    pub async fn connect_with(host: IpAddr, timeout: Duration, use_privileged_port: bool) -> Result<Self, NfsError> {
        let addr = SocketAddr::new(host, PORTMAPPER_PORT);
        let transport = UdpTransport::connect_with(addr, timeout, use_privileged_port)
            .await
            .map_err(NfsError::from_anyhow)?;
        Ok(Self { transport })
    }

    /// Resolves the port a `(program, version)` service listens on over `tcp`
    /// (or UDP if false).
    pub async fn get_port(&self, program: u32, version: u32, tcp: bool) -> Result<u16, NfsError> {
        let request = mapping {
            prog: program,
            vers: version,
            prot: if tcp { IPPROTO_TCP } else { IPPROTO_UDP },
            port: 0,
        };
        let mut args = Vec::new();
        request.serialize(&mut args).map_err(|e| NfsError::Xdr(e.to_string()))?;

        let reply = self
            .transport
            .call(PROGRAM, VERSION, PortmapProgram::PMAPPROC_GETPORT as u32, &Credentials::None, &args)
            .await
            .map_err(NfsError::from_anyhow)?;

        let mut cursor = std::io::Cursor::new(reply);
        let port: u32 = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        if port == 0 {
            return Err(NfsError::Connection(format!(
                "portmapper has no mapping for program {program} version {version}"
            )));
        }
        debug!(program, version, tcp, port, "resolved port via portmapper");
        Ok(port as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portmapper_port_is_well_known() {
        assert_eq!(PORTMAPPER_PORT, 111);
    }
}
