//! Integration tests for `MountClient` against a fake MOUNT service over a
//! real loopback UDP socket.

mod support;

use std::time::Duration;

use nfs_client_mamont::mount::MountClient;
use nfs_client_mamont::protocol::xdr::mount::{mnt_reply, mountres3_ok, mountstat3, VERSION};
use nfs_client_mamont::protocol::xdr::XDR;

fn encode<T: XDR>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.serialize(&mut buf).unwrap();
    buf
}

#[tokio::test]
async fn mnt_ok_returns_the_root_handle() {
    let reply = mnt_reply {
        status: mountstat3::MNT3_OK,
        mountinfo: Some(mountres3_ok { fhandle: vec![7, 7, 7, 7], auth_flavors: vec![0] }),
    };
    let (addr, handle) = support::fake_udp_responder(encode(&reply)).await;

    let client =
        MountClient::connect(addr, VERSION, Duration::from_secs(1)).await.expect("connecting to fake MOUNT service");
    let fh = client.mnt("/export/data").await.expect("mounting export");
    assert_eq!(fh, vec![7, 7, 7, 7]);

    let call = handle.await.expect("fake MOUNT task panicked");
    assert_eq!(call.prog, nfs_client_mamont::protocol::xdr::mount::PROGRAM);
    assert_eq!(call.vers, VERSION);
}

#[tokio::test]
async fn mnt_error_status_is_a_mount_error() {
    let reply = mnt_reply { status: mountstat3::MNT3ERR_ACCES, mountinfo: None };
    let (addr, _handle) = support::fake_udp_responder(encode(&reply)).await;

    let client =
        MountClient::connect(addr, VERSION, Duration::from_secs(1)).await.expect("connecting to fake MOUNT service");
    let err = client.mnt("/export/data").await.unwrap_err();
    assert!(matches!(err, nfs_client_mamont::NfsError::Mount(_)));
}

#[tokio::test]
async fn export_decodes_the_linked_list_into_a_flat_vec() {
    use nfs_client_mamont::protocol::xdr::mount::ExportList;

    let list = ExportList(vec![
        nfs_client_mamont::protocol::xdr::mount::ExportEntry {
            dir: "/export/a".to_string(),
            groups: vec!["*".to_string()],
        },
        nfs_client_mamont::protocol::xdr::mount::ExportEntry { dir: "/export/b".to_string(), groups: vec![] },
    ]);
    let (addr, _handle) = support::fake_udp_responder(encode(&list)).await;

    let client =
        MountClient::connect(addr, VERSION, Duration::from_secs(1)).await.expect("connecting to fake MOUNT service");
    let exports = client.export().await.expect("listing exports");
    assert_eq!(exports, vec!["/export/a".to_string(), "/export/b".to_string()]);
}
