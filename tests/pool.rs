//! Integration tests for `Pool` against `support::spawn_fake_nfs3_server`:
//! leasing a real connected-and-mounted `Client`, returning it to the idle
//! queue, and letting the maintenance sweep evict it past its idle timeout.

mod support;

use std::time::Duration;

use nfs_client_mamont::client::NfsVersion;
use nfs_client_mamont::config::{ClientOptions, PoolOptions};
use nfs_client_mamont::pool::Pool;

fn client_options(nfs_port: u16, mount_port: u16) -> ClientOptions {
    ClientOptions {
        nfs_port: Some(nfs_port),
        mount_port: Some(mount_port),
        command_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn lease_reuses_a_returned_connection() {
    let server = support::spawn_fake_nfs3_server().await;
    let options = client_options(server.nfs_addr.port(), server.mount_addr.port());
    let pool = Pool::new(PoolOptions {
        max_pool_size: 2,
        idle_timeout: Duration::from_secs(60),
        enable_maintenance: false,
        maintenance_interval: Duration::from_secs(60),
    });

    let conn =
        pool.lease(server.nfs_addr.ip(), "/export", NfsVersion::V3, options.clone()).await.expect("leasing first");
    conn.release().await;

    let stats = pool.stats_for(server.nfs_addr.ip(), "/export", NfsVersion::V3).await;
    assert_eq!(stats.total, 1);
    assert_eq!(stats.available, 1);

    let conn = pool.lease(server.nfs_addr.ip(), "/export", NfsVersion::V3, options).await.expect("leasing second");
    let stats = pool.stats_for(server.nfs_addr.ip(), "/export", NfsVersion::V3).await;
    assert_eq!(stats.total, 1);
    assert_eq!(stats.available, 0);
    conn.release().await;
}

#[tokio::test]
async fn idle_connections_are_evicted_past_their_timeout() {
    let server = support::spawn_fake_nfs3_server().await;
    let options = client_options(server.nfs_addr.port(), server.mount_addr.port());
    let pool = Pool::new(PoolOptions {
        max_pool_size: 2,
        idle_timeout: Duration::from_millis(50),
        enable_maintenance: true,
        maintenance_interval: Duration::from_millis(20),
    });

    let conn = pool.lease(server.nfs_addr.ip(), "/export", NfsVersion::V3, options.clone()).await.expect("leasing");
    conn.release().await;

    let stats = pool.stats_for(server.nfs_addr.ip(), "/export", NfsVersion::V3).await;
    assert_eq!(stats.total, 1);
    assert_eq!(stats.available, 1);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let stats = pool.stats_for(server.nfs_addr.ip(), "/export", NfsVersion::V3).await;
    assert_eq!(stats.total, 0);
    assert_eq!(stats.available, 0);

    let conn = pool.lease(server.nfs_addr.ip(), "/export", NfsVersion::V3, options).await.expect("leasing fresh");
    let stats = pool.stats_for(server.nfs_addr.ip(), "/export", NfsVersion::V3).await;
    assert_eq!(stats.total, 1);
    conn.release().await;
}

#[tokio::test]
async fn lease_past_capacity_is_an_error() {
    let server = support::spawn_fake_nfs3_server().await;
    let options = client_options(server.nfs_addr.port(), server.mount_addr.port());
    let pool = Pool::new(PoolOptions {
        max_pool_size: 1,
        idle_timeout: Duration::from_secs(60),
        enable_maintenance: false,
        maintenance_interval: Duration::from_secs(60),
    });

    let first =
        pool.lease(server.nfs_addr.ip(), "/export", NfsVersion::V3, options.clone()).await.expect("leasing first");
    let err = pool.lease(server.nfs_addr.ip(), "/export", NfsVersion::V3, options).await.unwrap_err();
    assert!(matches!(err, nfs_client_mamont::NfsError::InvalidState(_)));
    first.release().await;
}

#[tokio::test]
async fn dispose_blocks_further_leases() {
    let server = support::spawn_fake_nfs3_server().await;
    let options = client_options(server.nfs_addr.port(), server.mount_addr.port());
    let pool = Pool::new(PoolOptions {
        max_pool_size: 2,
        idle_timeout: Duration::from_secs(60),
        enable_maintenance: false,
        maintenance_interval: Duration::from_secs(60),
    });

    let conn = pool.lease(server.nfs_addr.ip(), "/export", NfsVersion::V3, options.clone()).await.expect("leasing");
    conn.release().await;

    pool.dispose().await;

    let err = pool.lease(server.nfs_addr.ip(), "/export", NfsVersion::V3, options).await.unwrap_err();
    assert!(matches!(err, nfs_client_mamont::NfsError::Disposed));
}
