//! Integration-level XDR coverage: wire types composed together the way a
//! real call/reply actually nests them, rather than each type in isolation
//! (the per-type round trips already live next to their definitions).

use nfs_client_mamont::protocol::xdr::mount::{ExportEntry, ExportList};
use nfs_client_mamont::protocol::xdr::nfs3::dir::{dirlist3, entry3, READDIR3res, READDIR3resok};
use nfs_client_mamont::protocol::xdr::nfs3::file::{stable_how, WRITE3args, WRITE3res, WRITE3resfail};
use nfs_client_mamont::protocol::xdr::nfs3::{nfs_fh3, nfsstat3, post_op_attr, wcc_data};
use nfs_client_mamont::protocol::xdr::rpc::{
    accept_body, accepted_reply, auth_unix, call_body, call_message, opaque_auth, reply_body, rpc_body, rpc_msg,
};
use nfs_client_mamont::protocol::xdr::{decode, XDR};

fn roundtrip<T: XDR + Default>(value: &T) -> T {
    let mut buf = Vec::new();
    value.serialize(&mut buf).expect("serializing");
    decode(&mut std::io::Cursor::new(buf)).expect("deserializing")
}

#[test]
fn call_message_wraps_write_args_with_odd_length_opaque_data() {
    let args = WRITE3args {
        file: nfs_fh3 { data: vec![1, 2, 3, 4, 5] },
        offset: 0,
        count: 5,
        stable: stable_how::FILE_SYNC as u32,
        data: vec![9, 9, 9, 9, 9],
    };
    let cred = opaque_auth::none();
    let msg = call_message(42, 100003, 3, 7, cred, opaque_auth::none());

    let mut buf = Vec::new();
    msg.serialize(&mut buf).expect("serializing envelope");
    args.serialize(&mut buf).expect("serializing args");

    // Both the five-byte file handle and the five-byte write payload round
    // up to eight bytes on the wire (one word of zero padding each); total
    // length is therefore exactly predictable instead of just "some bytes".
    let mut cursor = std::io::Cursor::new(&buf);
    let decoded_msg: rpc_msg = decode(&mut cursor).expect("decoding envelope");
    assert_eq!(decoded_msg.xid, 42);
    let call = match decoded_msg.body {
        rpc_body::CALL(call) => call,
        rpc_body::REPLY(_) => panic!("expected a CALL"),
    };
    assert_eq!(call.prog, 100003);
    assert_eq!(call.proc, 7);

    let decoded_args: WRITE3args = decode(&mut cursor).expect("decoding args");
    assert_eq!(decoded_args.file.data, vec![1, 2, 3, 4, 5]);
    assert_eq!(decoded_args.data, vec![9, 9, 9, 9, 9]);
    assert_eq!(cursor.position() as usize, buf.len());
}

#[test]
fn accepted_reply_carries_a_write_failure_without_touching_the_ok_payload() {
    let result = WRITE3res::err(nfsstat3::NFS3ERR_NOSPC, WRITE3resfail { file_wcc: wcc_data::default() });
    let reply = rpc_msg {
        xid: 7,
        body: rpc_body::REPLY(reply_body::MSG_ACCEPTED(accepted_reply {
            verf: opaque_auth::none(),
            reply_data: accept_body::SUCCESS,
        })),
    };

    let mut buf = Vec::new();
    reply.serialize(&mut buf).expect("serializing reply envelope");
    result.serialize(&mut buf).expect("serializing result");

    let mut cursor = std::io::Cursor::new(&buf);
    let _decoded_reply: rpc_msg = decode(&mut cursor).expect("decoding reply envelope");
    let decoded_result: WRITE3res = decode(&mut cursor).expect("decoding result");
    assert_eq!(decoded_result.status, nfsstat3::NFS3ERR_NOSPC);
    assert!(decoded_result.ok.is_none());
    assert!(decoded_result.fail.is_some());
}

#[test]
fn readdir_result_with_many_entries_roundtrips_embedded_in_a_reply() {
    let entries: Vec<entry3> = (0..37)
        .map(|i| entry3 { fileid: i, name: format!("entry-{i}").as_str().into(), cookie: i + 1 })
        .collect();
    let result = READDIR3res::ok(READDIR3resok {
        dir_attributes: post_op_attr::Void,
        cookieverf: [1, 2, 3, 4, 5, 6, 7, 8],
        reply: dirlist3 { entries: entries.clone(), eof: true },
    });

    let decoded: READDIR3res = roundtrip(&result);
    let ok = decoded.ok.expect("ok payload");
    assert_eq!(ok.reply.entries.len(), entries.len());
    assert!(ok.reply.eof);
    assert_eq!(ok.reply.entries[0].name.to_string(), "entry-0");
    assert_eq!(ok.reply.entries[36].name.to_string(), "entry-36");
    assert_eq!(ok.cookieverf, [1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn export_list_with_many_groups_roundtrips() {
    let list = ExportList(vec![
        ExportEntry { dir: "/export/a".to_string(), groups: vec!["host1".to_string(), "host2".to_string()] },
        ExportEntry { dir: "/export/b".to_string(), groups: vec![] },
        ExportEntry { dir: "/export/c".to_string(), groups: vec!["*".to_string()] },
    ]);

    let decoded: ExportList = roundtrip(&list);
    assert_eq!(decoded.0.len(), 3);
    assert_eq!(decoded.0[0].groups, vec!["host1".to_string(), "host2".to_string()]);
    assert!(decoded.0[1].groups.is_empty());
}

#[test]
fn auth_unix_credential_roundtrips_through_a_call_body() {
    let creds =
        auth_unix { stamp: 1, machinename: b"test-host".to_vec(), uid: 501, gid: 20, gids: vec![20, 30] };
    let mut creds_bytes = Vec::new();
    creds.serialize(&mut creds_bytes).expect("serializing auth_unix body");
    let cred = opaque_auth::unix(creds_bytes);
    let call = call_body { rpcvers: 2, prog: 100003, vers: 3, proc: 1, cred, verf: opaque_auth::none() };

    let mut buf = Vec::new();
    call.serialize(&mut buf).expect("serializing call");
    let decoded: call_body = decode(&mut std::io::Cursor::new(buf)).expect("decoding call");
    assert_eq!(decoded.prog, 100003);

    let decoded_creds: auth_unix = decode(&mut std::io::Cursor::new(decoded.cred.body)).expect("decoding creds");
    assert_eq!(decoded_creds.machinename, b"test-host");
    assert_eq!(decoded_creds.gids, vec![20, 30]);
}
