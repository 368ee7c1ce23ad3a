//! Shared fake-server harness for the integration tests in this directory.
//!
//! The teacher's own `tests/support.rs` fakes a filesystem behind its
//! server-side `NFSFileSystem` trait and drives it through a `DuplexStream`
//! wrapped by `SocketMessageHandler`. There is no analogous server-side trait
//! to fake here - this crate only ever dials out - so this plays the
//! opposite role: a real loopback RPC responder a test scripts in advance,
//! bound to an ephemeral port instead of a real NFS server. `PortmapClient`
//! and `MountClient` both speak UDP (`protocol::rpc::udp::UdpTransport`), so
//! every responder below is UDP; a TCP counterpart for NFS-proper traffic
//! would be built the same way over `protocol::rpc::framing`.
//!
//! [`spawn_fake_nfs3_server`] goes one step further than the fixed-script
//! responders: it runs a real in-memory directory tree behind a real TCP NFS
//! listener and UDP MOUNT responder, so the end-to-end scenarios in
//! `nfs_write.rs`, `pool.rs`, and `resolver.rs` can drive a full
//! `Client`/`Pool` against actual mutable server-side state instead of a
//! canned reply sequence.

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::{TcpListener, TcpStream, UdpSocket};

use nfs_client_mamont::protocol::rpc::framing::{read_record, write_record};
use nfs_client_mamont::protocol::xdr::mount::{mnt_reply, mountstat3, mountres3_ok, ExportList, MountProgram};
use nfs_client_mamont::protocol::xdr::nfs3::dir::{
    entry3, dirlist3, MkdirLikeResok, MKDIR3args, MKDIR3res, READDIR3args, READDIR3res, READDIR3resfail,
    READDIR3resok,
};
use nfs_client_mamont::protocol::xdr::nfs3::file::{
    stable_how, COMMIT3args, COMMIT3res, COMMIT3resok, READ3args, READ3res, READ3resfail, READ3resok, WRITE3args,
    WRITE3res, WRITE3resfail, WRITE3resok,
};
use nfs_client_mamont::protocol::xdr::nfs3::fs::{fsinfo3, FsObjArgs, FSINFO3res};
use nfs_client_mamont::protocol::xdr::nfs3::{
    createhow3, fattr3, ftype3, nfs_fh3, nfsstat3, nfstime3, post_op_attr, post_op_fh3, set_mode3, set_size3,
    specdata3, wcc_data, CREATE3args, CREATE3res, CREATE3resok, DirOpWcc, GETATTR3args, GETATTR3res, GETATTR3resok,
    LOOKUP3args, LOOKUP3res, LOOKUP3resfail, LOOKUP3resok, Nfs3Result, REMOVE3args, REMOVE3res, RENAME3args,
    RENAME3res, RENAME3resok, RMDIR3args, RMDIR3res, SETATTR3args, SETATTR3resok,
};
use nfs_client_mamont::protocol::xdr::rpc::{accept_body, accepted_reply, opaque_auth, reply_body, rpc_body, rpc_msg};
use nfs_client_mamont::protocol::xdr::{decode, XDR};

/// One decoded incoming call, envelope stripped down to the raw argument
/// bytes - the same slice a server-side dispatcher would hand its handler.
pub struct FakeCall {
    pub xid: u32,
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub args: Vec<u8>,
}

fn decode_call(buf: &[u8]) -> FakeCall {
    let mut cursor = Cursor::new(buf);
    let msg: rpc_msg = decode(&mut cursor).expect("decoding fake incoming call");
    let call = match msg.body {
        rpc_body::CALL(call) => call,
        rpc_body::REPLY(_) => panic!("fake responder received a REPLY, expected a CALL"),
    };
    let pos = cursor.position() as usize;
    FakeCall { xid: msg.xid, prog: call.prog, vers: call.vers, proc: call.proc, args: buf[pos..].to_vec() }
}

/// Encodes a `MSG_ACCEPTED`/`SUCCESS` reply carrying already-encoded
/// `result` bytes as its procedure-specific payload.
fn encode_success_reply(xid: u32, result: &[u8]) -> Vec<u8> {
    let msg = rpc_msg {
        xid,
        body: rpc_body::REPLY(reply_body::MSG_ACCEPTED(accepted_reply {
            verf: opaque_auth::none(),
            reply_data: accept_body::SUCCESS,
        })),
    };
    let mut buf = Vec::new();
    msg.serialize(&mut buf).expect("encoding fake reply envelope");
    buf.extend_from_slice(result);
    buf
}

/// Binds an ephemeral loopback UDP socket and answers exactly one call with
/// `result`. Returns the address to dial and a handle the test can await to
/// know the exchange completed.
pub async fn fake_udp_responder(result: Vec<u8>) -> (SocketAddr, tokio::task::JoinHandle<FakeCall>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("binding fake UDP responder");
    let addr = socket.local_addr().expect("fake UDP responder local addr");
    let handle = tokio::spawn(async move {
        let mut buf = vec![0u8; 65536];
        let (n, peer) = socket.recv_from(&mut buf).await.expect("receiving fake UDP call");
        let call = decode_call(&buf[..n]);
        let reply = encode_success_reply(call.xid, &result);
        socket.send_to(&reply, peer).await.expect("sending fake UDP reply");
        call
    });
    (addr, handle)
}

/// As [`fake_udp_responder`], but answers every datagram received with the
/// matching entry of `results` in order, for a test that drives more than
/// one call against the same fake endpoint.
pub async fn fake_udp_responder_sequence(results: Vec<Vec<u8>>) -> (SocketAddr, tokio::task::JoinHandle<Vec<FakeCall>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("binding fake UDP responder");
    let addr = socket.local_addr().expect("fake UDP responder local addr");
    let handle = tokio::spawn(async move {
        let mut buf = vec![0u8; 65536];
        let mut calls = Vec::with_capacity(results.len());
        for result in results {
            let (n, peer) = socket.recv_from(&mut buf).await.expect("receiving fake UDP call");
            let call = decode_call(&buf[..n]);
            let reply = encode_success_reply(call.xid, &result);
            socket.send_to(&reply, peer).await.expect("sending fake UDP reply");
            calls.push(call);
        }
        calls
    });
    (addr, handle)
}

/// Binds an ephemeral loopback TCP listener and answers a sequence of calls
/// on a single accepted connection, one `result` per record read - the same
/// one-connection-many-calls shape `TcpTransport` uses.
pub async fn fake_tcp_responder(results: Vec<Vec<u8>>) -> (SocketAddr, tokio::task::JoinHandle<Vec<FakeCall>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("binding fake TCP responder");
    let addr = listener.local_addr().expect("fake TCP responder local addr");
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accepting fake TCP connection");
        let mut calls = Vec::with_capacity(results.len());
        for result in results {
            let record = read_record(&mut stream).await.expect("reading fake TCP call");
            let call = decode_call(&record);
            let reply = encode_success_reply(call.xid, &result);
            write_record(&mut stream, &reply).await.expect("writing fake TCP reply");
            calls.push(call);
        }
        calls
    });
    (addr, handle)
}

/// One node of the fake server's in-memory tree. Directories hold their
/// children by name; regular files hold their bytes directly.
enum NodeKind {
    File(Vec<u8>),
    Dir(BTreeMap<String, u64>),
}

struct Node {
    kind: NodeKind,
    mode: u32,
}

struct Fs {
    nodes: HashMap<u64, Node>,
    next_id: u64,
}

fn fh_bytes(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

fn fh_id(fh: &nfs_fh3) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&fh.data[..8]);
    u64::from_be_bytes(raw)
}

fn attr_for(id: u64, node: &Node) -> fattr3 {
    let (ftype, size) = match &node.kind {
        NodeKind::File(data) => (ftype3::NF3REG, data.len() as u64),
        NodeKind::Dir(_) => (ftype3::NF3DIR, 0),
    };
    fattr3 {
        ftype,
        mode: node.mode,
        nlink: 1,
        uid: 0,
        gid: 0,
        size,
        used: size,
        rdev: specdata3::default(),
        fsid: 1,
        fileid: id,
        atime: nfstime3::default(),
        mtime: nfstime3::default(),
        ctime: nfstime3::default(),
    }
}

fn decode_args<T: XDR + Default>(bytes: &[u8]) -> T {
    let mut value = T::default();
    let mut cursor = Cursor::new(bytes);
    value.deserialize(&mut cursor).expect("decoding fake NFS call args");
    value
}

fn encode_reply<T: XDR>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.serialize(&mut buf).expect("encoding fake NFS reply");
    buf
}

fn dispatch_mount(proc: u32) -> Vec<u8> {
    if proc == MountProgram::MOUNTPROC3_MNT as u32 {
        let reply = mnt_reply {
            status: mountstat3::MNT3_OK,
            mountinfo: Some(mountres3_ok { fhandle: fh_bytes(0), auth_flavors: vec![0] }),
        };
        encode_reply(&reply)
    } else if proc == MountProgram::MOUNTPROC3_UMNT as u32 {
        Vec::new()
    } else if proc == MountProgram::MOUNTPROC3_EXPORT as u32 {
        encode_reply(&ExportList(Vec::new()))
    } else {
        panic!("fake MOUNT responder received unhandled procedure {proc}")
    }
}

/// Executes one decoded NFSv3 call against `fs` and returns the encoded
/// procedure-specific reply body (the `SUCCESS` case only - this fake never
/// models a garbled call or an RPC-level rejection).
fn dispatch_nfs3(fs: &Mutex<Fs>, proc: u32, args: &[u8]) -> Vec<u8> {
    use nfs_client_mamont::protocol::xdr::nfs3::NFSProgram::*;

    let mut state = fs.lock().expect("fake filesystem lock poisoned");

    if proc == NFSPROC3_GETATTR as u32 {
        let args: GETATTR3args = decode_args(args);
        let id = fh_id(&args.object);
        return match state.nodes.get(&id) {
            Some(node) => encode_reply(&GETATTR3res::ok(GETATTR3resok { obj_attributes: attr_for(id, node) })),
            None => encode_reply(&GETATTR3res::err(nfsstat3::NFS3ERR_STALE, ())),
        };
    }

    if proc == NFSPROC3_LOOKUP as u32 {
        let args: LOOKUP3args = decode_args(args);
        let dir_id = fh_id(&args.what.dir);
        let name = args.what.name.to_string();
        let found = match state.nodes.get(&dir_id).map(|n| &n.kind) {
            Some(NodeKind::Dir(children)) => children.get(&name).copied(),
            _ => None,
        };
        return match found {
            Some(id) => {
                let attrs = attr_for(id, state.nodes.get(&id).expect("looked-up child vanished"));
                encode_reply(&LOOKUP3res::ok(LOOKUP3resok {
                    object: nfs_fh3 { data: fh_bytes(id) },
                    obj_attributes: post_op_attr::attributes(attrs),
                    dir_attributes: post_op_attr::Void,
                }))
            }
            None => encode_reply(&LOOKUP3res::err(
                nfsstat3::NFS3ERR_NOENT,
                LOOKUP3resfail { dir_attributes: post_op_attr::Void },
            )),
        };
    }

    if proc == NFSPROC3_READ as u32 {
        let args: READ3args = decode_args(args);
        let id = fh_id(&args.file);
        return match state.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::File(data)) => {
                let start = (args.offset as usize).min(data.len());
                let end = start.saturating_add(args.count as usize).min(data.len());
                let chunk = data[start..end].to_vec();
                let eof = end >= data.len();
                encode_reply(&READ3res::ok(READ3resok {
                    file_attributes: post_op_attr::Void,
                    count: chunk.len() as u32,
                    eof,
                    data: chunk,
                }))
            }
            _ => encode_reply(&READ3res::err(
                nfsstat3::NFS3ERR_NOENT,
                READ3resfail { file_attributes: post_op_attr::Void },
            )),
        };
    }

    if proc == NFSPROC3_WRITE as u32 {
        let args: WRITE3args = decode_args(args);
        let id = fh_id(&args.file);
        return match state.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::File(data)) => {
                let start = args.offset as usize;
                let end = start + args.data.len();
                if data.len() < end {
                    data.resize(end, 0);
                }
                data[start..end].copy_from_slice(&args.data);
                encode_reply(&WRITE3res::ok(WRITE3resok {
                    file_wcc: wcc_data::default(),
                    count: args.data.len() as u32,
                    committed: stable_how::FILE_SYNC,
                    verf: [0u8; 8],
                }))
            }
            _ => encode_reply(&WRITE3res::err(
                nfsstat3::NFS3ERR_NOENT,
                WRITE3resfail { file_wcc: wcc_data::default() },
            )),
        };
    }

    if proc == NFSPROC3_CREATE as u32 {
        let args: CREATE3args = decode_args(args);
        let dir_id = fh_id(&args.where_.dir);
        let name = args.where_.name.to_string();
        let mode = match &args.how {
            createhow3::UNCHECKED(attrs) | createhow3::GUARDED(attrs) => match attrs.mode {
                set_mode3::mode(m) => m,
                set_mode3::Void => 0o644,
            },
            createhow3::EXCLUSIVE(_) => 0o644,
        };
        let new_id = state.next_id;
        state.next_id += 1;
        state.nodes.insert(new_id, Node { kind: NodeKind::File(Vec::new()), mode });
        if let Some(Node { kind: NodeKind::Dir(children), .. }) = state.nodes.get_mut(&dir_id) {
            children.insert(name, new_id);
        }
        let attrs = attr_for(new_id, state.nodes.get(&new_id).expect("just-inserted file vanished"));
        return encode_reply(&CREATE3res::ok(CREATE3resok {
            obj: post_op_fh3::handle(nfs_fh3 { data: fh_bytes(new_id) }),
            obj_attributes: post_op_attr::attributes(attrs),
            dir_wcc: wcc_data::default(),
        }));
    }

    if proc == NFSPROC3_MKDIR as u32 {
        let args: MKDIR3args = decode_args(args);
        let dir_id = fh_id(&args.dirops.dir);
        let name = args.dirops.name.to_string();
        let mode = match args.attributes.mode {
            set_mode3::mode(m) => m,
            set_mode3::Void => 0o755,
        };
        let new_id = state.next_id;
        state.next_id += 1;
        state.nodes.insert(new_id, Node { kind: NodeKind::Dir(BTreeMap::new()), mode });
        if let Some(Node { kind: NodeKind::Dir(children), .. }) = state.nodes.get_mut(&dir_id) {
            children.insert(name, new_id);
        }
        let attrs = attr_for(new_id, state.nodes.get(&new_id).expect("just-inserted directory vanished"));
        return encode_reply(&MKDIR3res::ok(MkdirLikeResok {
            obj: post_op_fh3::handle(nfs_fh3 { data: fh_bytes(new_id) }),
            obj_attributes: post_op_attr::attributes(attrs),
            dir_wcc: wcc_data::default(),
        }));
    }

    if proc == NFSPROC3_REMOVE as u32 {
        let args: REMOVE3args = decode_args(args);
        let dir_id = fh_id(&args.object.dir);
        let name = args.object.name.to_string();
        let removed = match state.nodes.get_mut(&dir_id).map(|n| &mut n.kind) {
            Some(NodeKind::Dir(children)) => children.remove(&name),
            _ => None,
        };
        return match removed {
            Some(id) => {
                state.nodes.remove(&id);
                encode_reply(&REMOVE3res::ok(DirOpWcc { dir_wcc: wcc_data::default() }))
            }
            None => {
                encode_reply(&REMOVE3res::err(nfsstat3::NFS3ERR_NOENT, DirOpWcc { dir_wcc: wcc_data::default() }))
            }
        };
    }

    if proc == NFSPROC3_RMDIR as u32 {
        let args: RMDIR3args = decode_args(args);
        let dir_id = fh_id(&args.object.dir);
        let name = args.object.name.to_string();
        let target = match state.nodes.get(&dir_id).map(|n| &n.kind) {
            Some(NodeKind::Dir(children)) => children.get(&name).copied(),
            _ => None,
        };
        let Some(target_id) = target else {
            return encode_reply(&RMDIR3res::err(
                nfsstat3::NFS3ERR_NOENT,
                DirOpWcc { dir_wcc: wcc_data::default() },
            ));
        };
        let empty = matches!(state.nodes.get(&target_id).map(|n| &n.kind), Some(NodeKind::Dir(c)) if c.is_empty());
        if !empty {
            return encode_reply(&RMDIR3res::err(
                nfsstat3::NFS3ERR_NOTEMPTY,
                DirOpWcc { dir_wcc: wcc_data::default() },
            ));
        }
        if let Some(Node { kind: NodeKind::Dir(children), .. }) = state.nodes.get_mut(&dir_id) {
            children.remove(&name);
        }
        state.nodes.remove(&target_id);
        return encode_reply(&RMDIR3res::ok(DirOpWcc { dir_wcc: wcc_data::default() }));
    }

    if proc == NFSPROC3_RENAME as u32 {
        let args: RENAME3args = decode_args(args);
        let from_dir = fh_id(&args.from.dir);
        let from_name = args.from.name.to_string();
        let to_dir = fh_id(&args.to.dir);
        let to_name = args.to.name.to_string();
        let moved = match state.nodes.get_mut(&from_dir).map(|n| &mut n.kind) {
            Some(NodeKind::Dir(children)) => children.remove(&from_name),
            _ => None,
        };
        let empty_wcc = || RENAME3resok { fromdir_wcc: wcc_data::default(), todir_wcc: wcc_data::default() };
        return match moved {
            Some(id) => {
                if let Some(Node { kind: NodeKind::Dir(children), .. }) = state.nodes.get_mut(&to_dir) {
                    children.insert(to_name, id);
                }
                encode_reply(&RENAME3res::ok(empty_wcc()))
            }
            None => encode_reply(&RENAME3res::err(nfsstat3::NFS3ERR_NOENT, empty_wcc())),
        };
    }

    if proc == NFSPROC3_READDIR as u32 {
        let args: READDIR3args = decode_args(args);
        let dir_id = fh_id(&args.dir);
        return match state.nodes.get(&dir_id).map(|n| &n.kind) {
            Some(NodeKind::Dir(children)) => {
                let entries = children
                    .iter()
                    .enumerate()
                    .map(|(i, (name, id))| entry3 { fileid: *id, name: name.as_str().into(), cookie: (i + 1) as u64 })
                    .collect();
                encode_reply(&READDIR3res::ok(READDIR3resok {
                    dir_attributes: post_op_attr::Void,
                    cookieverf: [0u8; 8],
                    reply: dirlist3 { entries, eof: true },
                }))
            }
            _ => encode_reply(&READDIR3res::err(
                nfsstat3::NFS3ERR_NOTDIR,
                READDIR3resfail { dir_attributes: post_op_attr::Void },
            )),
        };
    }

    if proc == NFSPROC3_FSINFO as u32 {
        let _args: FsObjArgs = decode_args(args);
        return encode_reply(&FSINFO3res::ok(fsinfo3 {
            obj_attributes: post_op_attr::Void,
            rtmax: 8192,
            rtpref: 8192,
            rtmult: 4096,
            wtmax: 8192,
            wtpref: 8192,
            wtmult: 4096,
            dtpref: 8192,
            maxfilesize: u64::MAX,
            time_delta: nfstime3 { seconds: 1, nseconds: 0 },
            properties: 0,
        }));
    }

    if proc == NFSPROC3_COMMIT as u32 {
        let _args: COMMIT3args = decode_args(args);
        return encode_reply(&COMMIT3res::ok(COMMIT3resok { file_wcc: wcc_data::default(), verf: [0u8; 8] }));
    }

    if proc == NFSPROC3_SETATTR as u32 {
        let args: SETATTR3args = decode_args(args);
        let id = fh_id(&args.object);
        if let set_size3::size(new_size) = args.new_attribute.size {
            if let Some(Node { kind: NodeKind::File(data), .. }) = state.nodes.get_mut(&id) {
                data.resize(new_size as usize, 0);
            }
        }
        return encode_reply(&Nfs3Result::<SETATTR3resok, SETATTR3resok>::ok(SETATTR3resok {
            obj_wcc: wcc_data::default(),
        }));
    }

    panic!("fake NFSv3 server received unhandled procedure {proc}")
}

async fn serve_nfs3_connection(mut stream: TcpStream, fs: Arc<Mutex<Fs>>) {
    loop {
        let record = match read_record(&mut stream).await {
            Ok(record) => record,
            Err(_) => return,
        };
        let call = decode_call(&record);
        let result = dispatch_nfs3(&fs, call.proc, &call.args);
        let reply = encode_success_reply(call.xid, &result);
        if write_record(&mut stream, &reply).await.is_err() {
            return;
        }
    }
}

async fn serve_mount(socket: UdpSocket) {
    let mut buf = vec![0u8; 65536];
    loop {
        let (n, peer) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(_) => return,
        };
        let call = decode_call(&buf[..n]);
        let result = dispatch_mount(call.proc);
        let reply = encode_success_reply(call.xid, &result);
        if socket.send_to(&reply, peer).await.is_err() {
            return;
        }
    }
}

/// A real TCP NFSv3 listener plus a real UDP MOUNT responder, serving a
/// single in-memory directory tree rooted at file handle `0`. Point
/// `ClientOptions::nfs_port`/`mount_port` at `nfs_addr.port()` /
/// `mount_addr.port()` to dial it directly, bypassing the portmapper.
pub struct FakeNfs3Server {
    pub nfs_addr: SocketAddr,
    pub mount_addr: SocketAddr,
}

pub async fn spawn_fake_nfs3_server() -> FakeNfs3Server {
    let mut nodes = HashMap::new();
    nodes.insert(0, Node { kind: NodeKind::Dir(BTreeMap::new()), mode: 0o755 });
    let fs = Arc::new(Mutex::new(Fs { nodes, next_id: 1 }));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("binding fake NFS TCP listener");
    let nfs_addr = listener.local_addr().expect("fake NFS listener local addr");
    let nfs_fs = Arc::clone(&fs);
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => return,
            };
            tokio::spawn(serve_nfs3_connection(stream, Arc::clone(&nfs_fs)));
        }
    });

    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("binding fake MOUNT UDP responder");
    let mount_addr = socket.local_addr().expect("fake MOUNT responder local addr");
    tokio::spawn(serve_mount(socket));

    FakeNfs3Server { nfs_addr, mount_addr }
}
