//! Tests for the client state machine.
//!
//! The client writes into an in-memory [`Outbox`]; replies are fed back
//! through `on_readable` exactly as the socket driver would.

use std::io;

use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use etherpipe_core::config::ClientConfig;
use etherpipe_core::AccountInfo;
use etherpipe_ipc::envelope::CallEnvelope;
use etherpipe_ipc::transport::{Outbox, Transport};
use etherpipe_ipc::{
    CallType, Client, ClientError, ClientEvent, ConnectionQuality, ConnectionState,
};

const SOCKET: &str = "/tmp/etherpipe-test.ipc";

fn new_client<T: Transport>(transport: T) -> (Client<T>, UnboundedReceiver<ClientEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Client::new(transport, &ClientConfig::default(), tx), rx)
}

/// A connected client whose pending-transaction filter has been answered.
fn connected_client() -> (Client<Outbox>, UnboundedReceiver<ClientEvent>) {
    let (mut client, mut events) = new_client(Outbox::new());
    client.connect(SOCKET).unwrap();
    client.on_connected();
    let request = answer(&mut client, json!("0x1"));
    assert_eq!(request["method"], "eth_newPendingTransactionFilter");
    drain(&mut events);
    (client, events)
}

fn drain(events: &mut UnboundedReceiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn written(client: &mut Client<Outbox>) -> Vec<Value> {
    client
        .transport_mut()
        .drain()
        .iter()
        .map(|frame| serde_json::from_slice(frame).unwrap())
        .collect()
}

fn reply(id: &Value, result: Value) -> String {
    format!("{}\n", json!({"jsonrpc": "2.0", "id": id, "result": result}))
}

/// Answer the single call in flight and return its request.
fn answer(client: &mut Client<Outbox>, result: Value) -> Value {
    let mut requests = written(client);
    assert_eq!(requests.len(), 1, "exactly one call in flight");
    let request = requests.remove(0);
    client.on_readable(reply(&request["id"], result).as_bytes());
    request
}

fn errors(events: &[ClientEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::Error { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_connect_installs_pending_transaction_filter() {
    let (mut client, mut events) = new_client(Outbox::new());
    client.connect(SOCKET).unwrap();
    assert!(client.transport().is_empty());

    client.on_connected();
    let events_after_connect = drain(&mut events);
    assert!(events_after_connect.contains(&ClientEvent::Connected));
    assert!(events_after_connect
        .contains(&ClientEvent::ConnectionStateChanged(ConnectionQuality::Poor)));

    let request = answer(&mut client, json!("0x3d2ec1bba5a4dc07fd5bc8d8e5c8e93a"));
    assert_eq!(request["jsonrpc"], "2.0");
    assert_eq!(request["method"], "eth_newPendingTransactionFilter");
    assert_eq!(request["params"], json!([]));
    assert_eq!(
        client.pending_transaction_filter().unwrap().to_hex_string(),
        "0x3d2ec1bba5a4dc07fd5bc8d8e5c8e93a"
    );
    assert!(!client.is_busy());
    assert_eq!(drain(&mut events), vec![ClientEvent::BusyChanged(false)]);
}

#[test]
fn test_calls_are_written_one_at_a_time() {
    let (mut client, mut events) = connected_client();
    client.get_block_number().unwrap();
    client.get_peer_count().unwrap();
    client.get_gas_price().unwrap();
    assert_eq!(client.queue().pending_len(), 2);

    let first = answer(&mut client, json!("0x4b7"));
    let second = answer(&mut client, json!("0x2"));
    let third = answer(&mut client, json!("0x4a817c800"));

    assert_eq!(first["method"], "eth_blockNumber");
    assert_eq!(second["method"], "net_peerCount");
    assert_eq!(third["method"], "eth_gasPrice");
    let ids: Vec<u64> = [&first, &second, &third]
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let events = drain(&mut events);
    assert!(events.contains(&ClientEvent::BlockNumberDone(1207)));
    assert!(events.contains(&ClientEvent::PeerCountChanged(2)));
    assert!(events.contains(&ClientEvent::GasPriceDone("0.000000020000000000".into())));
    assert!(client.queue().is_idle());
}

#[test]
fn test_calls_queued_during_connect_go_first() {
    let (mut client, _events) = new_client(Outbox::new());
    client.connect(SOCKET).unwrap();
    client.get_block_number().unwrap();
    assert!(client.transport().is_empty());

    client.on_connected();
    let first = answer(&mut client, json!("0x1"));
    let second = answer(&mut client, json!("0x2"));
    assert_eq!(first["method"], "eth_blockNumber");
    assert_eq!(second["method"], "eth_newPendingTransactionFilter");
}

#[test]
fn test_account_cascade() {
    let (mut client, mut events) = connected_client();
    client.get_accounts().unwrap();

    let list = answer(&mut client, json!(["0xA", "0xB"]));
    assert_eq!(list["method"], "personal_listAccounts");
    assert_eq!(client.accounts().len(), 2);

    let mut follow_ups = Vec::new();
    follow_ups.push(answer(&mut client, json!("0xde0b6b3a7640000")));
    follow_ups.push(answer(&mut client, json!("0x1")));
    follow_ups.push(answer(&mut client, json!("0x0")));
    assert!(drain(&mut events)
        .iter()
        .all(|e| !matches!(e, ClientEvent::AccountsReady(_))));
    follow_ups.push(answer(&mut client, json!("0x2a")));
    assert!(written(&mut client).is_empty());

    let calls: Vec<(&str, &Value)> = follow_ups
        .iter()
        .map(|r| (r["method"].as_str().unwrap(), &r["params"]))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("eth_getBalance", &json!(["0xA", "latest"])),
            ("eth_getTransactionCount", &json!(["0xA", "latest"])),
            ("eth_getBalance", &json!(["0xB", "latest"])),
            ("eth_getTransactionCount", &json!(["0xB", "latest"])),
        ]
    );

    let mut a = AccountInfo::new("0xA");
    a.set_balance("1.000000000000000000");
    a.set_transaction_count(1);
    let mut b = AccountInfo::new("0xB");
    b.set_balance("0.000000000000000000");
    b.set_transaction_count(42);

    let ready: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, ClientEvent::AccountsReady(_)))
        .collect();
    assert_eq!(ready, vec![ClientEvent::AccountsReady(vec![a, b])]);
    assert!(client.accounts().iter().all(AccountInfo::is_complete));
}

#[test]
fn test_empty_account_list_is_ready_immediately() {
    let (mut client, mut events) = connected_client();
    client.get_accounts().unwrap();
    answer(&mut client, json!([]));

    assert!(drain(&mut events).contains(&ClientEvent::AccountsReady(vec![])));
    assert!(written(&mut client).is_empty());
    assert!(!client.is_busy());
}

#[test]
fn test_call_number_mismatch_fails_without_side_effects() {
    let (mut client, mut events) = connected_client();
    client.get_accounts().unwrap();
    answer(&mut client, json!(["0xA"]));

    let balance = written(&mut client).remove(0);
    let wrong_id = json!(balance["id"].as_u64().unwrap() + 100);
    client.on_readable(reply(&wrong_id, json!("0xde0b6b3a7640000")).as_bytes());

    let errors = errors(&drain(&mut events));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("call number mismatch"));
    assert_eq!(client.accounts()[0].balance, None);
    assert!(!client.is_busy());
    assert!(client.queue().is_idle());
    assert!(written(&mut client).is_empty());
    assert_eq!(client.connection_state(), ConnectionState::Connected);
}

#[test]
fn test_fail_drops_pending_calls() {
    let (mut client, mut events) = connected_client();
    client.get_block_number().unwrap();
    client.get_peer_count().unwrap();
    client.get_gas_price().unwrap();
    let request = written(&mut client).remove(0);

    client.on_readable(
        format!(
            "{}\n",
            json!({"jsonrpc": "2.0", "id": request["id"], "error": {"code": -32601, "message": "method not found"}})
        )
        .as_bytes(),
    );

    let events = drain(&mut events);
    assert!(events.contains(&ClientEvent::Error {
        message: "method not found".into(),
        code: -32601,
    }));
    assert!(events.contains(&ClientEvent::BusyChanged(false)));
    assert_eq!(client.last_error(), Some("method not found"));
    assert_eq!(client.last_error_code(), -32601);
    assert!(client.queue().is_idle());
    assert!(written(&mut client).is_empty());
    assert_eq!(client.connection_state(), ConnectionState::Connected);
}

#[test]
fn test_last_error_cleared_by_next_success() {
    let (mut client, _events) = connected_client();
    client.get_block_number().unwrap();
    answer(&mut client, json!(12));
    assert!(client.last_error().unwrap().starts_with("unexpected result"));

    client.get_block_number().unwrap();
    answer(&mut client, json!("0xc"));
    assert_eq!(client.last_error(), None);
    assert_eq!(client.last_error_code(), 0);
}

#[test]
fn test_connect_while_connected_is_rejected() {
    let (mut client, mut events) = connected_client();
    let err = client.connect(SOCKET).unwrap_err();
    assert_eq!(err, ClientError::Lifecycle("already connected".into()));
    assert!(written(&mut client).is_empty());
    assert_eq!(errors(&drain(&mut events)), vec!["already connected"]);
    assert_eq!(client.connection_state(), ConnectionState::Connected);
}

#[test]
fn test_send_transaction_rejects_bad_value() {
    let (mut client, mut events) = connected_client();
    let err = client.send_transaction("0xA", "0xB", -1.0).unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(written(&mut client).is_empty());
    assert_eq!(
        errors(&drain(&mut events)),
        vec!["invalid transaction value"]
    );

    assert!(client.send_transaction("0xA", "0xB", 0.0).is_err());
    assert!(written(&mut client).is_empty());
}

#[test]
fn test_send_transaction_encodes_wei() {
    let (mut client, mut events) = connected_client();
    client.send_transaction("0xA", "0xB", 1.5).unwrap();
    let request = answer(&mut client, json!("0xfeed"));

    assert_eq!(request["method"], "eth_sendTransaction");
    assert_eq!(
        request["params"],
        json!([{"from": "0xA", "to": "0xB", "value": "0x14d1120d7b160000"}])
    );
    assert!(drain(&mut events).contains(&ClientEvent::SendTransactionDone {
        hash: "0xfeed".into()
    }));
}

#[test]
fn test_account_management_echoes_index() {
    let (mut client, mut events) = connected_client();

    client.unlock_account("0xA", "pw", 300, 2).unwrap();
    let unlock = answer(&mut client, json!(true));
    assert_eq!(unlock["method"], "personal_unlockAccount");
    assert_eq!(unlock["params"], json!(["0xA", "pw", "0x12c"]));

    client.new_account("secret", 4).unwrap();
    let created = answer(&mut client, json!("0xC"));
    assert_eq!(created["params"], json!(["secret"]));

    client.delete_account("0xC", "secret", 4).unwrap();
    let deleted = answer(&mut client, json!(false));
    assert_eq!(deleted["method"], "personal_deleteAccount");
    assert_eq!(deleted["params"], json!(["0xC", "secret"]));

    let events = drain(&mut events);
    assert!(events.contains(&ClientEvent::UnlockAccountDone {
        result: true,
        index: Some(2)
    }));
    assert!(events.contains(&ClientEvent::NewAccountDone {
        address: "0xC".into(),
        index: Some(4)
    }));
    assert!(events.contains(&ClientEvent::DeleteAccountDone {
        result: false,
        index: Some(4)
    }));
}

#[test]
fn test_peer_count_changes_quality() {
    let (mut client, mut events) = connected_client();
    client.get_peer_count().unwrap();
    answer(&mut client, json!("0x9"));

    let events = drain(&mut events);
    assert!(events.contains(&ClientEvent::PeerCountChanged(9)));
    assert!(events.contains(&ClientEvent::ConnectionStateChanged(ConnectionQuality::Good)));
    assert_eq!(client.quality(), ConnectionQuality::Good);
    assert_eq!(client.peer_count(), 9);
}

#[test]
fn test_reply_split_across_reads() {
    let (mut client, mut events) = connected_client();
    client.get_block_number().unwrap();
    let request = written(&mut client).remove(0);
    let wire = reply(&request["id"], json!("0x10"));
    let (head, tail) = wire.as_bytes().split_at(wire.len() / 2);

    client.on_readable(head);
    assert!(client.is_busy());
    client.on_readable(tail);
    assert!(!client.is_busy());
    assert!(drain(&mut events).contains(&ClientEvent::BlockNumberDone(16)));
}

#[test]
fn test_reply_without_call_is_discarded() {
    let (mut client, mut events) = connected_client();
    client.on_readable(reply(&json!(99), json!("0x1")).as_bytes());
    assert!(drain(&mut events).is_empty());
    assert_eq!(client.last_error(), None);
}

#[test]
fn test_connect_timeout() {
    let (mut client, mut events) = new_client(Outbox::new());
    client.connect(SOCKET).unwrap();
    client.on_connect_timeout();

    assert_eq!(client.connection_state(), ConnectionState::Faulted);
    assert!(!client.is_busy());
    let errors = errors(&drain(&mut events));
    assert_eq!(errors, vec![format!("connection to {SOCKET} timed out")]);

    // a faulted client may reconnect
    client.connect(SOCKET).unwrap();
    assert_eq!(client.connection_state(), ConnectionState::Connecting);
}

#[test]
fn test_connect_timeout_after_connected_is_ignored() {
    let (mut client, mut events) = connected_client();
    client.on_connect_timeout();
    assert_eq!(client.connection_state(), ConnectionState::Connected);
    assert!(drain(&mut events).is_empty());
}

#[test]
fn test_daemon_hangup_faults_connection() {
    let (mut client, mut events) = connected_client();
    client.get_block_number().unwrap();
    client.get_gas_price().unwrap();
    client.on_readable(&[]);

    assert_eq!(client.connection_state(), ConnectionState::Faulted);
    assert_eq!(client.quality(), ConnectionQuality::Disconnected);
    assert!(client.queue().is_idle());
    let events = drain(&mut events);
    assert!(errors(&events)[0].starts_with("error on socket read"));
    assert!(events.contains(&ClientEvent::ConnectionStateChanged(
        ConnectionQuality::Disconnected
    )));
}

#[test]
fn test_close_abandons_outstanding_calls() {
    let (mut client, mut events) = connected_client();
    client.get_block_number().unwrap();
    client.close();

    assert_eq!(client.connection_state(), ConnectionState::Unconnected);
    assert!(!client.is_busy());
    assert!(client.transport().is_empty());
    assert_eq!(errors(&drain(&mut events)), vec!["connection closed"]);
}

#[test]
fn test_call_before_connect_is_not_writeable() {
    let (mut client, mut events) = new_client(Outbox::new());
    let err = client.get_gas_price().unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.to_string(), "socket not writeable");
    assert_eq!(errors(&drain(&mut events)), vec!["socket not writeable"]);
}

struct BrokenPipe;

impl Transport for BrokenPipe {
    fn write_frame(&mut self, _frame: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }
}

struct Stalled;

impl Transport for Stalled {
    fn write_frame(&mut self, _frame: &[u8]) -> io::Result<usize> {
        Ok(0)
    }
}

#[test]
fn test_write_failure_is_reported() {
    let (mut client, mut events) = new_client(BrokenPipe);
    client.connect(SOCKET).unwrap();
    client.on_connected();

    let errors = errors(&drain(&mut events));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("error on socket write"));
    assert!(!client.is_busy());
}

#[test]
fn test_zero_byte_write_is_a_failure() {
    let (mut client, mut events) = new_client(Stalled);
    client.connect(SOCKET).unwrap();
    client.on_connected();

    assert!(errors(&drain(&mut events))[0].starts_with("error on socket write"));
    assert!(client.last_error().is_some());
}

#[test]
fn test_connect_does_not_toggle_busy() {
    let (mut client, mut events) = new_client(Outbox::new());
    client.connect(SOCKET).unwrap();
    assert_eq!(drain(&mut events), vec![ClientEvent::BusyChanged(true)]);

    client.on_connected();
    let events = drain(&mut events);
    assert!(events
        .iter()
        .all(|e| !matches!(e, ClientEvent::BusyChanged(_))));
    assert!(client.is_busy());
    assert_eq!(written(&mut client).len(), 1);
}

#[test]
fn test_enqueue_call_write_failure_leaves_queue_idle() {
    let (mut client, mut events) = new_client(Outbox::new());
    let envelope = CallEnvelope::new(1, CallType::GetBlockNumber, vec![], None);

    let err = client.enqueue_call(envelope).unwrap_err();
    assert_eq!(err.to_string(), "socket not writeable");
    assert!(!client.is_busy());
    assert!(client.queue().active_call().is_none());
    assert!(client.queue().is_idle());
    assert_eq!(errors(&drain(&mut events)), vec!["socket not writeable"]);
}

#[test]
fn test_reconnect_clears_previous_connection_state() {
    let (mut client, mut events) = connected_client();
    assert!(client.pending_transaction_filter().is_some());
    client.get_peer_count().unwrap();
    answer(&mut client, json!("0x9"));
    assert_eq!(client.peer_count(), 9);

    client.on_readable(&[]);
    drain(&mut events);
    client.connect(SOCKET).unwrap();
    assert_eq!(client.peer_count(), 0);
    assert!(client.pending_transaction_filter().is_none());

    client.on_connected();
    assert_eq!(client.quality(), ConnectionQuality::Poor);
}

#[test]
fn test_array_reply_is_rejected() {
    let (mut client, mut events) = connected_client();
    client.get_block_number().unwrap();
    let request = written(&mut client).remove(0);
    client.on_readable(format!("{}\n", json!([request["id"], "0x10"])).as_bytes());

    let events = drain(&mut events);
    assert!(events
        .iter()
        .all(|e| !matches!(e, ClientEvent::BlockNumberDone(_))));
    assert!(errors(&events)[0].starts_with("response parse error"));
    assert!(client.queue().is_idle());
}
