//! Client and server talking over in-memory transports.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use mcplink::error::{INVALID_PARAMS, NOT_FOUND};
use mcplink::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::Notify;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn connect(server: &Server) -> (Client<MemoryTransport>, Session<MemoryTransport>) {
    let (near, far) = MemoryTransport::pair();
    let session = server.serve(far).unwrap();
    let client = Client::connect(near, ClientInfo::new("e2e", "0.0.0"))
        .await
        .unwrap();
    (client, session)
}

fn echo() -> impl RequestHandler {
    |params: Option<Value>, _ctx: RequestContext| async move {
        Ok::<_, McpError>(params.unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn test_handshake_reports_server_identity() {
    init_tracing();
    let server = Server::new(ServerConfig::new("notes", "2.0.0").with_instructions("read first"));
    let (client, session) = connect(&server).await;

    assert_eq!(client.server_info().name, "notes");
    assert_eq!(client.server_info().version, "2.0.0");
    assert_eq!(client.protocol_version(), PROTOCOL_VERSION);
    assert_eq!(client.instructions(), Some("read first"));
    assert!(client.server_capabilities().emits_list_changed(CapabilityKind::Tool));
    assert!(session.id().is_some());

    client.ping().await.unwrap();
}

#[tokio::test]
async fn test_list_all_walks_every_page() {
    let config = ServerConfig::default().with_page_limit(NonZeroUsize::new(2).unwrap());
    let server = Server::new(config);
    for name in ["alpha", "beta", "gamma", "delta", "epsilon"] {
        server.registry().register_tool(Tool::new(name), echo());
    }
    let (client, _session) = connect(&server).await;

    let first = client.list_tools(None).await.unwrap();
    assert_eq!(first.tools.len(), 2);
    assert!(first.next_cursor.is_some());

    let names: Vec<String> = client
        .list_all_tools()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma", "delta", "epsilon"]);
}

#[tokio::test]
async fn test_stale_cursor_is_rejected_after_removal() {
    let config = ServerConfig::default().with_page_limit(NonZeroUsize::new(2).unwrap());
    let server = Server::new(config);
    for name in ["a", "b", "c", "d"] {
        server.registry().register_prompt(Prompt::new(name), echo());
    }
    let (client, _session) = connect(&server).await;

    let first = client.list_prompts(None).await.unwrap();
    let cursor = first.next_cursor.unwrap();

    server.registry().deregister(CapabilityKind::Prompt, "c").unwrap();

    let err = client.list_prompts(Some(&cursor)).await.unwrap_err();
    assert_eq!(err.code(), INVALID_PARAMS);

    // Starting over works.
    let names: Vec<String> = client
        .list_all_prompts()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["a", "b", "d"]);
}

#[tokio::test]
async fn test_invocations_round_trip() {
    #[derive(serde::Deserialize)]
    struct Greeting {
        name: String,
    }

    let server = Server::default();
    let registry = server.registry();
    registry
        .register_tool(
            Tool::new("add"),
            typed(|args: (i64, i64), _ctx: RequestContext| async move {
                Ok::<_, McpError>(args.0 + args.1)
            }),
        );
    registry
        .register_prompt(
            Prompt::new("greet").required_arg("name", "Who to greet"),
            typed(|args: Greeting, _ctx: RequestContext| async move {
                Ok::<_, McpError>(json!({ "messages": [format!("Hello, {}!", args.name)] }))
            }),
        );
    registry
        .register_resource(
            Resource::new("memo://inbox", "inbox").unwrap(),
            |params: Option<Value>, _ctx: RequestContext| async move {
                let uri = params
                    .as_ref()
                    .and_then(|p| p["uri"].as_str())
                    .unwrap_or_default()
                    .to_string();
                Ok::<_, McpError>(json!({ "uri": uri, "text": "empty" }))
            },
        );
    let (client, _session) = connect(&server).await;

    assert_eq!(client.call_tool("add", Some(json!([40, 2]))).await.unwrap(), json!(42));

    let mut args = serde_json::Map::new();
    args.insert("name".into(), json!("Ada"));
    let prompt = client.get_prompt("greet", Some(args)).await.unwrap();
    assert_eq!(prompt["messages"][0], "Hello, Ada!");

    let read = client.read_resource("memo://inbox").await.unwrap();
    assert_eq!(read, json!({ "uri": "memo://inbox", "text": "empty" }));

    let err = client.call_tool("missing", None).await.unwrap_err();
    assert_eq!(err.code(), NOT_FOUND);
    let err = client.read_resource("memo://elsewhere").await.unwrap_err();
    assert_eq!(err.code(), NOT_FOUND);
    let err = client.call_tool("add", Some(json!("nope"))).await.unwrap_err();
    assert_eq!(err.code(), INVALID_PARAMS);
}

#[tokio::test]
async fn test_list_changed_triggers_client_refresh() {
    init_tracing();
    let server = Server::default();
    let (client, _session) = connect(&server).await;

    let changed = Arc::new(Notify::new());
    let signal = Arc::clone(&changed);
    client.on_list_changed(CapabilityKind::Resource, move || {
        let signal = Arc::clone(&signal);
        async move { signal.notify_one() }
    });

    server.registry().register_resource(Resource::new("file:///tmp/log", "log").unwrap(), echo());

    tokio::time::timeout(Duration::from_secs(2), changed.notified())
        .await
        .expect("list_changed never arrived");

    let listing = client.list_resources(None).await.unwrap();
    assert_eq!(listing.resources.len(), 1);
    assert_eq!(listing.resources[0].name, "log");
}

#[tokio::test]
async fn test_slow_tool_times_out_and_is_cancelled() {
    let server = Server::default();
    let saw_cancel = Arc::new(Notify::new());
    let flag = Arc::clone(&saw_cancel);
    server
        .registry()
        .register_tool(
            Tool::new("slow"),
            move |_params: Option<Value>, ctx: RequestContext| {
                let flag = Arc::clone(&flag);
                async move {
                    tokio::select! {
                        () = ctx.cancelled() => flag.notify_one(),
                        () = tokio::time::sleep(Duration::from_secs(30)) => {}
                    }
                    Ok::<_, McpError>(Value::Null)
                }
            },
        );
    let (client, _session) = connect(&server).await;

    let err = client
        .engine()
        .request(
            "tools/call",
            Some(json!({ "name": "slow" })),
            RequestOptions::new().timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::Timeout { .. }));
    assert_eq!(client.engine().pending_requests(), 0);

    tokio::time::timeout(Duration::from_secs(2), saw_cancel.notified())
        .await
        .expect("server handler was not cancelled");

    // The connection is still usable.
    client.ping().await.unwrap();
}

#[tokio::test]
async fn test_one_registry_many_clients() {
    let server = Server::default();
    let (first, _s1) = connect(&server).await;
    let (second, s2) = connect(&server).await;
    assert_eq!(server.registry().session_count(), 2);

    server.registry().register_tool(Tool::new("shared"), echo());
    assert_eq!(first.list_all_tools().await.unwrap().len(), 1);
    assert_eq!(second.list_all_tools().await.unwrap().len(), 1);

    second.close().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), s2.closed())
        .await
        .unwrap();
    for _ in 0..50 {
        if server.registry().session_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(server.registry().session_count(), 1);

    // The surviving client is unaffected.
    first.ping().await.unwrap();
    assert!(matches!(
        second.ping().await.unwrap_err(),
        McpError::Connection { .. } | McpError::Transport(_) | McpError::NotConnected
    ));
}

#[tokio::test]
async fn test_stateless_client_gets_answers_but_no_pushes() {
    let server = Server::default();
    let (near, far) = MemoryTransport::stateless_pair();
    let session = server.serve(far).unwrap();
    assert!(session.id().is_none());

    // The client end of a stateless pair still sends requests.
    let client = Client::connect(near, ClientInfo::new("poller", "0.0.0"))
        .await
        .unwrap();
    server.registry().register_tool(Tool::new("t"), echo());
    assert_eq!(client.list_all_tools().await.unwrap().len(), 1);
}
