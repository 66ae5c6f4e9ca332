//! Engine behaviour over in-memory transports.
//!
//! Some tests drive one side of the connection by hand through a raw
//! `MemoryTransport`, so that wire-level ordering can be asserted exactly.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use mcplink_core::error::{
    DUPLICATE_REQUEST_ID, INTERNAL_ERROR, INVALID_PARAMS, McpError, METHOD_NOT_FOUND,
    TransportErrorKind,
};
use mcplink_core::protocol::{Message, Notification, Request, RequestId, Response};
use mcplink_engine::prelude::*;
use mcplink_engine::CANCELLED_NOTIFICATION;
use mcplink_transport::{MemoryTransport, Transport};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Two engines wired back to back: `(client, server)`.
fn engine_pair(
    server_config: EngineConfig,
) -> (Engine<MemoryTransport>, Engine<MemoryTransport>) {
    let (left, right) = MemoryTransport::pair();
    let client = Engine::new(EngineConfig::default());
    let server = Engine::new(server_config);
    client.connect(left).unwrap();
    server.connect(right).unwrap();
    (client, server)
}

/// An engine plus the raw transport of its peer.
fn engine_with_raw_peer(config: EngineConfig) -> (Engine<MemoryTransport>, MemoryTransport) {
    let (local, remote) = MemoryTransport::pair();
    let engine = Engine::new(config);
    engine.connect(local).unwrap();
    (engine, remote)
}

async fn next(peer: &MemoryTransport) -> Message {
    tokio::time::timeout(Duration::from_secs(2), peer.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("recv failed")
        .expect("transport closed")
}

async fn next_response(peer: &MemoryTransport) -> Response {
    match next(peer).await {
        Message::Response(response) => response,
        other => panic!("expected a response, got {other:?}"),
    }
}

async fn next_request(peer: &MemoryTransport) -> Request {
    match next(peer).await {
        Message::Request(request) => request,
        other => panic!("expected a request, got {other:?}"),
    }
}

// =============================================================================
// Correlation
// =============================================================================

#[tokio::test]
async fn test_concurrent_requests_correlate() {
    init_tracing();
    let (client, server) = engine_pair(EngineConfig::default().with_max_concurrent_requests(8));

    #[derive(serde::Deserialize)]
    struct Add {
        a: i64,
        b: i64,
    }
    server.on_request(
        "add",
        typed(|args: Add, _ctx| async move {
            // Finish out of order so correlation is by id, not position.
            tokio::time::sleep(Duration::from_millis((10 - args.a as u64) * 3)).await;
            Ok::<_, McpError>(args.a + args.b)
        }),
    );

    let calls = (0..10).map(|i| {
        let client = client.clone();
        async move {
            client
                .request("add", Some(json!({ "a": i, "b": 100 })), RequestOptions::new())
                .await
        }
    });
    let results = join_all(calls).await;

    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), json!(i as i64 + 100));
    }
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn test_builtin_ping() {
    let (client, _server) = engine_pair(EngineConfig::default());
    let pong = client.request("ping", None, RequestOptions::new()).await.unwrap();
    assert_eq!(pong, json!({}));
}

#[tokio::test]
async fn test_handler_can_call_back_into_peer() {
    init_tracing();
    let (client, server) = engine_pair(EngineConfig::default());
    client.on_request("client/echo", |params: Option<Value>, _ctx: RequestContext| async move {
        Ok::<_, McpError>(params.unwrap_or_default())
    });

    server.on_request("relay", |params: Option<Value>, ctx: RequestContext| async move {
        ctx.peer().request("client/echo".to_string(), params).await
    });

    let out = client
        .request("relay", Some(json!({ "hop": 2 })), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(out, json!({ "hop": 2 }));
}

#[tokio::test]
async fn test_unmatched_response_is_discarded() {
    init_tracing();
    let (engine, peer) = engine_with_raw_peer(EngineConfig::default());

    peer.send(Response::success(RequestId::Number(999), json!("stray")).into())
        .await
        .unwrap();

    let pending = tokio::spawn({
        let engine = engine.clone();
        async move { engine.request("work", None, RequestOptions::new()).await }
    });

    let request = next_request(&peer).await;
    assert_eq!(request.method(), "work");
    peer.send(Response::success(request.id, json!("done")).into())
        .await
        .unwrap();

    assert_eq!(pending.await.unwrap().unwrap(), json!("done"));
    assert!(engine.is_connected());
}

// =============================================================================
// Timeouts and cancellation
// =============================================================================

#[tokio::test]
async fn test_concurrent_timeouts_leave_no_pending_entries() {
    init_tracing();
    let (engine, peer) = engine_with_raw_peer(EngineConfig::default());

    let calls = (0..5).map(|_| {
        engine.request(
            "slow",
            None,
            RequestOptions::new().timeout(Duration::from_millis(30)),
        )
    });
    let results = join_all(calls).await;

    for result in results {
        assert!(matches!(result, Err(McpError::Timeout { .. })));
    }
    assert_eq!(engine.pending_requests(), 0);

    // Five requests went out, then one cancellation for each.
    let mut requests = Vec::new();
    let mut cancelled = Vec::new();
    for _ in 0..10 {
        match next(&peer).await {
            Message::Request(r) => requests.push(r.id),
            Message::Notification(n) => {
                assert_eq!(n.method(), CANCELLED_NOTIFICATION);
                let params = n.params.unwrap();
                assert_eq!(params["reason"], "timeout");
                let id: RequestId = serde_json::from_value(params["requestId"].clone()).unwrap();
                cancelled.push(id);
            }
            Message::Response(r) => panic!("unexpected response {r:?}"),
        }
    }
    requests.sort_by_key(ToString::to_string);
    cancelled.sort_by_key(ToString::to_string);
    assert_eq!(requests, cancelled);
}

#[tokio::test]
async fn test_default_timeout_from_config() {
    let config = EngineConfig::default().with_default_timeout(Duration::from_millis(20));
    let (engine, _peer) = engine_with_raw_peer(config);

    let err = engine.request("slow", None, RequestOptions::new()).await.unwrap_err();
    match err {
        McpError::Timeout { operation, duration } => {
            assert_eq!(operation, "slow");
            assert_eq!(duration, Duration::from_millis(20));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_caller_cancellation_notifies_peer() {
    init_tracing();
    let (engine, peer) = engine_with_raw_peer(EngineConfig::default());
    let token = CancellationToken::new();

    let call = tokio::spawn({
        let engine = engine.clone();
        let token = token.clone();
        async move {
            engine
                .request("long", None, RequestOptions::new().cancel_on(token))
                .await
        }
    });

    let request = next_request(&peer).await;
    token.cancel();

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, McpError::Cancelled { .. }));
    assert_eq!(engine.pending_requests(), 0);

    let Message::Notification(notification) = next(&peer).await else {
        panic!("expected a cancellation notification");
    };
    assert_eq!(notification.method(), CANCELLED_NOTIFICATION);
    assert_eq!(
        notification.params.unwrap()["requestId"],
        serde_json::to_value(&request.id).unwrap()
    );

    // A late response for the abandoned id is dropped.
    peer.send(Response::success(request.id, json!("late")).into())
        .await
        .unwrap();
    let pong = tokio::spawn({
        let engine = engine.clone();
        async move { engine.request("ping", None, RequestOptions::new()).await }
    });
    let ping = next_request(&peer).await;
    peer.send(Response::success(ping.id, json!({})).into())
        .await
        .unwrap();
    assert_eq!(pong.await.unwrap().unwrap(), json!({}));
}

#[tokio::test]
async fn test_inbound_cancellation_reaches_handler() {
    init_tracing();
    let (engine, peer) = engine_with_raw_peer(EngineConfig::default());
    let started = Arc::new(Notify::new());
    let observed = Arc::new(Notify::new());

    engine.on_request("wait", {
        let started = Arc::clone(&started);
        let observed = Arc::clone(&observed);
        move |_params: Option<Value>, ctx: RequestContext| {
            let started = Arc::clone(&started);
            let observed = Arc::clone(&observed);
            async move {
                started.notify_one();
                ctx.cancelled().await;
                observed.notify_one();
                Ok::<_, McpError>(json!("should not be sent"))
            }
        }
    });

    peer.send(Request::new("wait", RequestId::Number(1)).into())
        .await
        .unwrap();
    started.notified().await;

    peer.send(
        Notification::with_params(CANCELLED_NOTIFICATION, json!({ "requestId": 1 })).into(),
    )
    .await
    .unwrap();
    tokio::time::timeout(Duration::from_secs(2), observed.notified())
        .await
        .unwrap();

    // The cancelled request is never answered; the next reply is the ping's.
    peer.send(Request::new("ping", RequestId::Number(2)).into())
        .await
        .unwrap();
    let response = next_response(&peer).await;
    assert_eq!(response.id, RequestId::Number(2));
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn test_unknown_method_is_method_not_found() {
    let (client, _server) = engine_pair(EngineConfig::default());
    let err = client
        .request("does/not/exist", None, RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, McpError::Rpc(_)));
    assert_eq!(err.code(), METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_handler_error_codes_reach_caller() {
    let (client, server) = engine_pair(EngineConfig::default());

    #[derive(serde::Deserialize)]
    struct Named {
        #[allow(dead_code)]
        name: String,
    }
    server.on_request("strict", typed(|_args: Named, _ctx| async { Ok::<_, McpError>(()) }));
    server.on_request("quota", |_params: Option<Value>, _ctx: RequestContext| async {
        Err::<Value, _>(McpError::application(-31000, "quota exceeded"))
    });

    let err = client
        .request("strict", Some(json!({ "name": 3 })), RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), INVALID_PARAMS);

    let err = client.request("quota", None, RequestOptions::new()).await.unwrap_err();
    let McpError::Rpc(wire) = err else {
        panic!("expected an rpc error");
    };
    assert_eq!(wire.code, -31000);
    assert_eq!(wire.message, "quota exceeded");
}

#[tokio::test]
async fn test_handler_panic_becomes_internal_error() {
    init_tracing();
    let (client, server) = engine_pair(EngineConfig::default());
    server.on_request("explode", |_params: Option<Value>, _ctx: RequestContext| async {
        if true {
            panic!("kaboom");
        }
        Ok::<Value, McpError>(Value::Null)
    });

    let err = client
        .request("explode", None, RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), INTERNAL_ERROR);
    assert!(err.to_string().contains("kaboom"));

    // The connection survives.
    assert!(server.is_connected());
    let pong = client.request("ping", None, RequestOptions::new()).await.unwrap();
    assert_eq!(pong, json!({}));
}

#[tokio::test]
async fn test_unknown_notification_is_ignored() {
    let (engine, peer) = engine_with_raw_peer(EngineConfig::default());

    peer.send(Notification::new("x/unknown").into()).await.unwrap();
    peer.send(Request::new("ping", RequestId::string("p")).into())
        .await
        .unwrap();

    let response = next_response(&peer).await;
    assert_eq!(response.id, RequestId::string("p"));
    assert_eq!(response.into_result().unwrap(), json!({}));
    assert!(engine.is_connected());
}

#[tokio::test]
async fn test_notification_listener_runs() {
    let (client, server) = engine_pair(EngineConfig::default());
    let seen = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(Notify::new());

    server.on_notification("note", {
        let seen = Arc::clone(&seen);
        let done = Arc::clone(&done);
        move |params: Option<Value>| {
            let seen = Arc::clone(&seen);
            let done = Arc::clone(&done);
            async move {
                if let Some(n) = params.and_then(|p| p["n"].as_u64()) {
                    seen.fetch_add(n as usize, Ordering::SeqCst);
                }
                done.notify_one();
            }
        }
    });

    client.notify("note", Some(json!({ "n": 3 }))).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), done.notified())
        .await
        .unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_replacing_a_handler() {
    let (client, server) = engine_pair(EngineConfig::default());
    server.on_request("v", |_p: Option<Value>, _c: RequestContext| async {
        Ok::<_, McpError>(json!(1))
    });
    server.on_request("v", |_p: Option<Value>, _c: RequestContext| async {
        Ok::<_, McpError>(json!(2))
    });

    let out = client.request("v", None, RequestOptions::new()).await.unwrap();
    assert_eq!(out, json!(2));
}

/// Register a "hold" handler that parks until `release` fires, counting calls.
fn hold_handler(engine: &Engine<MemoryTransport>, release: &Arc<Notify>) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    engine.on_request("hold", {
        let release = Arc::clone(release);
        let calls = Arc::clone(&calls);
        move |_params: Option<Value>, _ctx: RequestContext| {
            let release = Arc::clone(&release);
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                release.notified().await;
                Ok::<_, McpError>(json!("first"))
            }
        }
    });
    calls
}

async fn assert_duplicate_rejected(config: EngineConfig) {
    let (engine, peer) = engine_with_raw_peer(config);
    let release = Arc::new(Notify::new());
    let calls = hold_handler(&engine, &release);

    peer.send(Request::new("hold", RequestId::Number(7)).into())
        .await
        .unwrap();
    peer.send(Request::new("hold", RequestId::Number(7)).into())
        .await
        .unwrap();

    let rejected = next_response(&peer).await;
    assert_eq!(rejected.id, RequestId::Number(7));
    assert_eq!(rejected.into_result().unwrap_err().code, DUPLICATE_REQUEST_ID);

    release.notify_one();
    let answered = next_response(&peer).await;
    assert_eq!(answered.into_result().unwrap(), json!("first"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_duplicate_inflight_id_is_rejected() {
    init_tracing();
    assert_duplicate_rejected(EngineConfig::default().with_max_concurrent_requests(4)).await;
}

#[tokio::test]
async fn test_duplicate_inflight_id_is_rejected_when_serialized() {
    init_tracing();
    // One request at a time: the second copy waits behind the first.
    assert_duplicate_rejected(EngineConfig::default()).await;
}

#[tokio::test]
async fn test_full_inbound_queue_rejects_without_blocking_responses() {
    init_tracing();
    let (engine, peer) = engine_with_raw_peer(EngineConfig::default().with_inbound_buffer(1));
    let release = Arc::new(Notify::new());
    let _calls = hold_handler(&engine, &release);

    for i in 1..=6 {
        peer.send(Request::new("hold", RequestId::Number(i)).into())
            .await
            .unwrap();
    }

    // At most one running, one waiting for a slot and one queued.
    let rejected = next_response(&peer).await;
    let err = rejected.into_result().unwrap_err();
    assert_eq!(err.code, INTERNAL_ERROR);
    assert!(err.message.contains("overloaded"), "{}", err.message);

    // The backlog is still standing; responses to our own requests get through.
    let outbound = tokio::spawn({
        let engine = engine.clone();
        async move { engine.request("lookup", None, RequestOptions::new()).await }
    });
    let request = loop {
        match next(&peer).await {
            Message::Request(request) => break request,
            Message::Response(response) => {
                assert_eq!(response.into_result().unwrap_err().code, INTERNAL_ERROR);
            }
            Message::Notification(other) => panic!("unexpected notification {other:?}"),
        }
    };
    assert_eq!(request.method, "lookup");
    peer.send(Response::success(request.id, json!("found")).into())
        .await
        .unwrap();

    let answer = tokio::time::timeout(Duration::from_secs(2), outbound)
        .await
        .expect("response was held up behind the inbound backlog")
        .unwrap()
        .unwrap();
    assert_eq!(answer, json!("found"));
    assert_eq!(engine.pending_requests(), 0);
}

#[tokio::test]
async fn test_caller_assigned_id_must_be_unique() {
    let (engine, peer) = engine_with_raw_peer(EngineConfig::default());

    let first = tokio::spawn({
        let engine = engine.clone();
        async move {
            engine
                .request("a", None, RequestOptions::new().id("fixed"))
                .await
        }
    });
    let request = next_request(&peer).await;
    assert_eq!(request.id, RequestId::string("fixed"));

    let err = engine
        .request("b", None, RequestOptions::new().id("fixed"))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::DuplicateRequestId { .. }));

    peer.send(Response::success(request.id, json!(null)).into())
        .await
        .unwrap();
    assert_eq!(first.await.unwrap().unwrap(), Value::Null);
}

// =============================================================================
// Connection lifecycle
// =============================================================================

#[tokio::test]
async fn test_stateless_transport_refuses_unsolicited_messages() {
    let (client_side, server_side) = MemoryTransport::stateless_pair();
    let server = Engine::new(EngineConfig::default());
    server.connect(server_side).unwrap();

    let err = server.notify("notifications/tools/list_changed", None).await.unwrap_err();
    let McpError::Transport(details) = err else {
        panic!("expected a transport error");
    };
    assert_eq!(details.kind, TransportErrorKind::Unsupported);

    let err = server
        .request("ping", None, RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::Transport(_)));

    // Replies still flow.
    client_side
        .send(Request::new("ping", RequestId::Number(1)).into())
        .await
        .unwrap();
    let response = next_response(&client_side).await;
    assert_eq!(response.into_result().unwrap(), json!({}));
}

#[tokio::test]
async fn test_disconnect_fails_pending_requests() {
    init_tracing();
    let (local, peer) = MemoryTransport::pair();
    let engine = Engine::new(EngineConfig::default());
    let mut events = engine.subscribe_events();
    engine.connect(local).unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        ConnectionEvent::Connected {
            transport_type: "memory".to_string()
        }
    );

    let call = tokio::spawn({
        let engine = engine.clone();
        async move { engine.request("never", None, RequestOptions::new()).await }
    });
    next_request(&peer).await;
    peer.close().await.unwrap();

    let err = call.await.unwrap().unwrap_err();
    let McpError::Transport(details) = err else {
        panic!("expected a transport error");
    };
    assert_eq!(details.kind, TransportErrorKind::ConnectionClosed);
    assert_eq!(engine.pending_requests(), 0);

    assert_eq!(
        events.recv().await.unwrap(),
        ConnectionEvent::Disconnected { error: None }
    );
    tokio::time::timeout(Duration::from_secs(1), engine.closed())
        .await
        .unwrap();
    assert!(!engine.is_connected());

    // An engine never rebinds.
    let (fresh, _other) = MemoryTransport::pair();
    let err = engine.connect(fresh).unwrap_err();
    assert!(matches!(err, McpError::Connection { .. }));
}

#[tokio::test]
async fn test_close_is_observed_by_both_sides() {
    let (client, server) = engine_pair(EngineConfig::default());

    client.close().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), server.closed())
        .await
        .unwrap();

    let err = client.notify("x", None).await.unwrap_err();
    assert!(matches!(err, McpError::Transport(_)));
}
