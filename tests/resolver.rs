//! Comprehensive 100-file drill through the real `Client` and path resolver,
//! against `support::spawn_fake_nfs3_server`: create a handful of nested
//! directories, scatter files across them, and confirm listings, attribute
//! lookups and deletes all go through the handle cache correctly.

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
async fn hundred_file_drill_across_nested_directories() {
    let mut client = connected_client().await;

    client.create_dir("/d1", 0o755).await.expect("creating d1");
    client.create_dir("/d2", 0o755).await.expect("creating d2");
    client.create_dir("/d1/d3", 0o755).await.expect("creating d1/d3");

    for i in 0..60 {
        let path = format!("/d1/file{i}.txt");
        client.create_file(&path, 0o644).await.unwrap_or_else(|e| panic!("creating {path}: {e:?}"));
        client.write(&path, 0, format!("d1-{i}").as_bytes()).await.unwrap_or_else(|e| panic!("writing {path}: {e:?}"));
    }
    for i in 0..15 {
        let path = format!("/d2/file{i}.txt");
        client.create_file(&path, 0o644).await.unwrap_or_else(|e| panic!("creating {path}: {e:?}"));
        client.write(&path, 0, format!("d2-{i}").as_bytes()).await.unwrap_or_else(|e| panic!("writing {path}: {e:?}"));
    }
    for i in 0..15 {
        let path = format!("/d1/d3/file{i}.txt");
        client.create_file(&path, 0o644).await.unwrap_or_else(|e| panic!("creating {path}: {e:?}"));
    }
    for i in 0..10 {
        let path = format!("/file{i}.txt");
        client.create_file(&path, 0o644).await.unwrap_or_else(|e| panic!("creating {path}: {e:?}"));
    }

    let d1_entries = client.list_dir("/d1", false).await.expect("listing d1");
    assert_eq!(d1_entries.len(), 61); // 60 files + d3
    let d2_entries = client.list_dir("/d2", false).await.expect("listing d2");
    assert_eq!(d2_entries.len(), 15);
    let d3_entries = client.list_dir("/d1/d3", false).await.expect("listing d1/d3");
    assert_eq!(d3_entries.len(), 15);
    let root_entries = client.list_dir("/", false).await.expect("listing root");
    assert_eq!(root_entries.len(), 12); // 10 files + d1 + d2

    for i in 0..60 {
        let path = format!("/d1/file{i}.txt");
        let mut buf = vec![0u8; 16];
        let expected = format!("d1-{i}");
        let n = client.read(&path, 0, expected.len() as u64, &mut buf).await.unwrap_or_else(|e| panic!("{path}: {e:?}"));
        assert_eq!(&buf[..n], expected.as_bytes());
    }

    // Re-resolving the same paths a second time exercises the resolver's
    // warm-cache path instead of a fresh LOOKUP chain for every one.
    for i in 0..15 {
        let path = format!("/d2/file{i}.txt");
        assert!(client.exists(&path).await.expect("checking existence"));
    }

    client.delete_file("/d1/file0.txt").await.expect("deleting d1/file0.txt");
    assert!(!client.exists("/d1/file0.txt").await.expect("checking deleted file"));
    let d1_entries = client.list_dir("/d1", false).await.expect("listing d1 after delete");
    assert_eq!(d1_entries.len(), 60);
}
