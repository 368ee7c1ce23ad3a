//! MOUNT protocol client (RFC 1813 Appendix I; program 100005), the v2/v3
//! handshake that resolves an export path to a root file handle.
//!
//! v4.1 has no separate mount protocol - PUTROOTFH plus LOOKUP replace it -
//! so this client is only ever constructed by [`crate::engine::v2`] and
//! [`crate::engine::v3`].

use std::net::SocketAddr;
use std::time::Duration;

use tracing::debug;

use crate::error::NfsError;
use crate::protocol::rpc::udp::UdpTransport;
use crate::protocol::rpc::{Credentials, Transport};
use crate::protocol::xdr::mount::{
    dirpath, mnt_reply, mountstat3, ExportList, MountList, MountProgram, PROGRAM, VERSION, VERSION1,
};
use crate::protocol::xdr::{decode, XDR};

/// A MOUNT-protocol client bound to one server, at either version 1 (paired
/// with NFSv2) or version 3 (paired with NFSv3).
pub struct MountClient {
    transport: UdpTransport,
    version: u32,
}

impl MountClient {
    /// Connects to the MOUNT service at `addr`, speaking the given `version`
    /// (1 or 3; see [`VERSION1`]/[`VERSION`]).
    pub async fn connect(addr: SocketAddr, version: u32, timeout: Duration) -> Result<Self, NfsError> {
        Self::connect_with(addr, version, timeout, false).await
    }

    /// As [`MountClient::connect`], optionally binding a local port below
    /// 1024 first.
    pub async fn connect_with(
        addr: SocketAddr,
        version: u32,
        timeout: Duration,
        use_privileged_port: bool,
    ) -> Result<Self, NfsError> {
        let transport =
            UdpTransport::connect_with(addr, timeout, use_privileged_port).await.map_err(NfsError::from_anyhow)?;
        Ok(Self { transport, version })
    }

    async fn call(&self, proc: MountProgram, args: &[u8]) -> Result<Vec<u8>, NfsError> {
        self.transport
            .call(PROGRAM, self.version, proc as u32, &Credentials::None, args)
            .await
            .map_err(NfsError::from_anyhow)
    }

    /// `MOUNTPROC_MNT`: mounts `export` and returns its root file handle.
    pub async fn mnt(&self, export: &str) -> Result<Vec<u8>, NfsError> {
        let path: dirpath = export.as_bytes().to_vec();
        let mut args = Vec::new();
        path.serialize(&mut args).map_err(|e| NfsError::Xdr(e.to_string()))?;

        let reply = self.call(MountProgram::MOUNTPROC3_MNT, &args).await?;
        let mut cursor = std::io::Cursor::new(reply);
        let reply: mnt_reply = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        match reply.status {
            mountstat3::MNT3_OK => {
                let info = reply.mountinfo.ok_or_else(|| {
                    NfsError::Protocol("MNT3_OK reply carried no mount info".to_string())
                })?;
                debug!(export, handle_len = info.fhandle.len(), "mounted export");
                Ok(info.fhandle)
            }
            other => Err(NfsError::Mount(format!("mount of {export:?} failed: {other:?}"))),
        }
    }

    /// `MOUNTPROC_UMNT`: unmounts a previously mounted export.
    pub async fn umnt(&self, export: &str) -> Result<(), NfsError> {
        let path: dirpath = export.as_bytes().to_vec();
        let mut args = Vec::new();
        path.serialize(&mut args).map_err(|e| NfsError::Xdr(e.to_string()))?;
        self.call(MountProgram::MOUNTPROC3_UMNT, &args).await?;
        Ok(())
    }

    /// `MOUNTPROC_EXPORT`: lists the exports this server offers.
    pub async fn export(&self) -> Result<Vec<String>, NfsError> {
        let reply = self.call(MountProgram::MOUNTPROC3_EXPORT, &[]).await?;
        let mut cursor = std::io::Cursor::new(reply);
        let list: ExportList = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        Ok(list.0.into_iter().map(|e| e.dir).collect())
    }

    /// `MOUNTPROC_DUMP`: lists clients currently mounted on this server.
    pub async fn dump(&self) -> Result<Vec<(String, String)>, NfsError> {
        let reply = self.call(MountProgram::MOUNTPROC3_DUMP, &[]).await?;
        let mut cursor = std::io::Cursor::new(reply);
        let list: MountList = decode(&mut cursor).map_err(|e| NfsError::Xdr(e.to_string()))?;
        Ok(list.0.into_iter().map(|e| (e.hostname, e.directory)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_constants_pair_with_nfs_versions() {
        assert_eq!(VERSION1, 1);
        assert_eq!(VERSION, 3);
    }
}
