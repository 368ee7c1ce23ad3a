//! Integration tests for the `protocol::rpc` transports: a real multi-call
//! TCP round trip over loopback, and UDP retransmission against a responder
//! that stays silent for the first few attempts.

mod support;

use std::net::SocketAddr;
use std::time::Duration;

use nfs_client_mamont::protocol::rpc::tcp::TcpTransport;
use nfs_client_mamont::protocol::rpc::udp::UdpTransport;
use nfs_client_mamont::protocol::rpc::{Credentials, Transport};
use nfs_client_mamont::protocol::xdr::rpc::{accept_body, accepted_reply, opaque_auth, reply_body, rpc_body, rpc_msg};
use nfs_client_mamont::protocol::xdr::{decode, XDR};

#[tokio::test]
async fn tcp_transport_completes_several_calls_on_one_connection() {
    let (addr, handle) = support::fake_tcp_responder(vec![vec![1, 2, 3], vec![4, 5, 6, 7], vec![]]).await;

    let transport =
        TcpTransport::connect(addr, Duration::from_secs(1)).await.expect("connecting fake TCP responder");

    let first = transport.call(100003, 3, 1, &Credentials::None, &[9, 9]).await.expect("first call");
    assert_eq!(first, vec![1, 2, 3]);

    let second = transport.call(100003, 3, 2, &Credentials::None, &[]).await.expect("second call");
    assert_eq!(second, vec![4, 5, 6, 7]);

    let third = transport.call(100003, 3, 3, &Credentials::None, &[]).await.expect("third call");
    assert_eq!(third, Vec::<u8>::new());

    let calls = handle.await.expect("fake TCP responder task panicked");
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].proc, 1);
    assert_eq!(calls[0].args, vec![9, 9]);
    assert_eq!(calls[1].proc, 2);
    assert_eq!(calls[2].proc, 3);
    // Every call shares one connection but allocates its own xid.
    assert_ne!(calls[0].xid, calls[1].xid);
    assert_ne!(calls[1].xid, calls[2].xid);
}

#[tokio::test]
async fn udp_transport_retransmits_until_the_server_answers() {
    // Bind a socket the client will send to, but don't read from it until
    // after the client's first couple of attempts have already timed out -
    // this exercises `UdpTransport::with_retries` rather than a single
    // best-case request/response.
    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.expect("binding slow responder");
    let addr: SocketAddr = socket.local_addr().expect("responder local addr");

    let transport = UdpTransport::connect(addr, Duration::from_millis(50))
        .await
        .expect("connecting UDP transport")
        .with_retries(5);

    let server = tokio::spawn(async move {
        // Let the first two attempts time out before answering.
        tokio::time::sleep(Duration::from_millis(150)).await;
        let mut buf = vec![0u8; 65536];
        let (n, peer) = socket.recv_from(&mut buf).await.expect("receiving a retried datagram");
        buf.truncate(n);
        let call: rpc_msg = decode(&mut std::io::Cursor::new(&buf)).expect("decoding retried call");
        let reply = rpc_msg {
            xid: call.xid,
            body: rpc_body::REPLY(reply_body::MSG_ACCEPTED(accepted_reply {
                verf: opaque_auth::none(),
                reply_data: accept_body::SUCCESS,
            })),
        };
        let mut out = Vec::new();
        reply.serialize(&mut out).expect("serializing reply");
        out.extend_from_slice(&[7, 7]);
        socket.send_to(&out, peer).await.expect("sending delayed reply");
    });

    let result = transport.call(100003, 3, 1, &Credentials::None, &[]).await.expect("call surviving retransmits");
    assert_eq!(result, vec![7, 7]);
    server.await.expect("slow responder task panicked");
}

#[tokio::test]
async fn udp_transport_gives_up_after_exhausting_retries() {
    // Bind a socket but never answer at all - the client must give up once
    // its retry budget is spent rather than hang forever.
    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.expect("binding silent responder");
    let addr: SocketAddr = socket.local_addr().expect("responder local addr");
    // Keep the socket alive for the duration of the test without answering.
    let _keep_alive = socket;

    let transport = UdpTransport::connect(addr, Duration::from_millis(20))
        .await
        .expect("connecting UDP transport")
        .with_retries(2);

    let err = transport.call(100003, 3, 1, &Credentials::None, &[]).await.unwrap_err();
    assert!(err.to_string().contains("timed out") || err.downcast_ref::<std::io::Error>().is_some());
}
