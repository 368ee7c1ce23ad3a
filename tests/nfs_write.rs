//! End-to-end `Client` scenarios against `support::spawn_fake_nfs3_server`:
//! a real loopback NFSv3 connection, mount, and a handful of read/write/
//! rename exchanges against the fake server's in-memory tree.

mod support;

use std::net::IpAddr;
use std::time::Duration;

use nfs_client_mamont::client::{Client, NfsVersion};
use nfs_client_mamont::config::ClientOptions;

async fn connected_client() -> Client {
    let server = support::spawn_fake_nfs3_server().await;
    let mut client = Client::new(NfsVersion::V3);
    let options = ClientOptions {
        nfs_port: Some(server.nfs_addr.port()),
        mount_port: Some(server.mount_addr.port()),
        command_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    client.connect("127.0.0.1".parse::<IpAddr>().unwrap(), options).await.expect("connecting to fake NFS server");
    client.mount("/export").await.expect("mounting fake export");
    client
}

#[tokio::test]
async fn small_round_trip_reads_back_exactly_what_was_written() {
    let mut client = connected_client().await;
    let message = b"Hello, NFS World! This is a small test message.";

    client.create_file("/hello.txt", 0o644).await.expect("creating file");
    let written = client.write("/hello.txt", 0, message).await.expect("writing file");
    assert_eq!(written, message.len());

    let mut buf = vec![0u8; message.len()];
    let read = client.read("/hello.txt", 0, message.len() as u64, &mut buf).await.expect("reading file");
    assert_eq!(read, message.len());
    assert_eq!(&buf, message);
}

#[tokio::test]
async fn patterned_100kib_round_trips_across_many_chunks() {
    let mut client = connected_client().await;
    let data: Vec<u8> = (0..102_400usize).map(|i| (i % 256) as u8).collect();

    client.create_file("/pattern.bin", 0o644).await.expect("creating file");
    let written = client.write("/pattern.bin", 0, &data).await.expect("writing file");
    assert_eq!(written, data.len());

    let mut buf = vec![0u8; data.len()];
    let read = client.read("/pattern.bin", 0, data.len() as u64, &mut buf).await.expect("reading file");
    assert_eq!(read, data.len());
    assert_eq!(buf, data);
}

#[tokio::test]
async fn partial_read_returns_only_the_requested_slice() {
    let mut client = connected_client().await;
    let data: Vec<u8> = (0..4096usize).map(|i| (i % 256) as u8).collect();

    client.create_file("/slice.bin", 0o644).await.expect("creating file");
    client.write("/slice.bin", 0, &data).await.expect("writing file");

    let mut buf = vec![0u8; 512];
    let read = client.read("/slice.bin", 1024, 512, &mut buf).await.expect("reading a partial slice");
    assert_eq!(read, 512);
    assert_eq!(buf, data[1024..1536]);
}

#[tokio::test]
async fn rename_preserves_content() {
    let mut client = connected_client().await;
    let bytes = [1u8, 2, 3, 4, 5];

    client.create_file("/a.bin", 0o644).await.expect("creating a.bin");
    client.write("/a.bin", 0, &bytes).await.expect("writing a.bin");
    client.move_path("/a.bin", "/b.bin").await.expect("renaming a.bin to b.bin");

    assert!(!client.exists("/a.bin").await.expect("checking a.bin no longer exists"));
    let mut buf = vec![0u8; bytes.len()];
    let read = client.read("/b.bin", 0, bytes.len() as u64, &mut buf).await.expect("reading b.bin");
    assert_eq!(read, bytes.len());
    assert_eq!(buf, bytes);
}

#[tokio::test]
async fn set_size_truncates_and_extends() {
    let mut client = connected_client().await;
    client.create_file("/sized.bin", 0o644).await.expect("creating file");
    client.write("/sized.bin", 0, &[1, 2, 3, 4, 5, 6, 7, 8]).await.expect("writing file");

    client.set_size("/sized.bin", 4).await.expect("truncating file");
    let attrs = client.get_attributes("/sized.bin", true).await.expect("getting attrs").expect("file exists");
    assert_eq!(attrs.size, 4);

    client.set_size("/sized.bin", 10).await.expect("extending file");
    let attrs = client.get_attributes("/sized.bin", true).await.expect("getting attrs").expect("file exists");
    assert_eq!(attrs.size, 10);
}
