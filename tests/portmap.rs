//! Integration tests for `PortmapClient` against a fake portmapper over a
//! real loopback UDP socket (see `support::fake_udp_responder*`).

mod support;

use std::time::Duration;

use nfs_client_mamont::protocol::xdr::portmap::{mapping, IPPROTO_TCP, IPPROTO_UDP};
use nfs_client_mamont::protocol::xdr::XDR;

fn encode_port(port: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    port.serialize(&mut buf).unwrap();
    buf
}

#[tokio::test]
async fn get_port_resolves_a_tcp_mapping() {
    let (addr, handle) = support::fake_udp_responder(encode_port(2049)).await;

    let client = nfs_client_mamont::portmap::PortmapClient::connect(addr.ip(), Duration::from_secs(1))
        .await
        .expect("connecting to fake portmapper");
    let port = client.get_port(100003, 3, true).await.expect("resolving NFS port");
    assert_eq!(port, 2049);

    let call = handle.await.expect("fake portmapper task panicked");
    assert_eq!(call.prog, nfs_client_mamont::protocol::xdr::portmap::PROGRAM);
    let decoded: mapping = nfs_client_mamont::protocol::xdr::decode(&mut std::io::Cursor::new(call.args)).unwrap();
    assert_eq!(decoded.prog, 100003);
    assert_eq!(decoded.vers, 3);
    assert_eq!(decoded.prot, IPPROTO_TCP);
}

#[tokio::test]
async fn get_port_resolves_a_udp_mapping() {
    let (addr, handle) = support::fake_udp_responder(encode_port(635)).await;

    let client = nfs_client_mamont::portmap::PortmapClient::connect(addr.ip(), Duration::from_secs(1))
        .await
        .expect("connecting to fake portmapper");
    let port = client.get_port(100005, 3, false).await.expect("resolving MOUNT port");
    assert_eq!(port, 635);

    let call = handle.await.expect("fake portmapper task panicked");
    let decoded: mapping = nfs_client_mamont::protocol::xdr::decode(&mut std::io::Cursor::new(call.args)).unwrap();
    assert_eq!(decoded.prot, IPPROTO_UDP);
}

#[tokio::test]
async fn get_port_zero_is_no_mapping() {
    let (addr, _handle) = support::fake_udp_responder(encode_port(0)).await;

    let client = nfs_client_mamont::portmap::PortmapClient::connect(addr.ip(), Duration::from_secs(1))
        .await
        .expect("connecting to fake portmapper");
    let err = client.get_port(100003, 3, true).await.unwrap_err();
    assert!(matches!(err, nfs_client_mamont::NfsError::Connection(_)));
}
