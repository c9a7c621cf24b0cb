//! Shared mock servers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use shield_relay::config::schema::DEFAULT_TRUSTED_PROXY;
use shield_relay::relay::RawLogBatch;

pub const PROGRAM_ID: &str = "BKGhwbiTHdUxcuWzZtDWyioRBieDEXTtgEk8u1zskZnk";

/// Log lines of a successful shield transaction carrying `payload_line`.
pub fn shield_lines(payload_line: &str) -> Vec<String> {
    vec![
        format!("Program {} invoke [1]", PROGRAM_ID),
        "Program log: Instruction: Shield".to_string(),
        "Program log: Calling the token program to transfer token from user account to vault"
            .to_string(),
        "Program TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA invoke [2]".to_string(),
        "Program log: Instruction: Transfer".to_string(),
        "Program TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA success".to_string(),
        payload_line.to_string(),
        format!("Program {} success", PROGRAM_ID),
    ]
}

pub fn shield_batch(signature: &str, proxy: &str, destination: &str, amount: u64) -> RawLogBatch {
    RawLogBatch {
        transaction_id: signature.to_string(),
        slot: 100,
        failed: false,
        error: None,
        lines: shield_lines(&format!(
            "Program log: Shield:INC:{},{},So11111111111111111111111111111111111111112,{}",
            proxy, destination, amount
        )),
    }
}

pub fn trusted_batch(signature: &str, destination: &str) -> RawLogBatch {
    shield_batch(signature, DEFAULT_TRUSTED_PROXY, destination, 100_000)
}

/// A `logsNotification` message as the cluster sends it. `batch.error`
/// must hold a JSON-encoded `TransactionError` when set.
pub fn notification_json(subscription_id: u64, batch: &RawLogBatch) -> String {
    let err = match &batch.error {
        Some(e) => serde_json::from_str::<Value>(e).unwrap(),
        None => Value::Null,
    };
    json!({
        "jsonrpc": "2.0",
        "method": "logsNotification",
        "params": {
            "result": {
                "context": { "slot": batch.slot },
                "value": {
                    "signature": batch.transaction_id,
                    "err": err,
                    "logs": batch.lines,
                }
            },
            "subscription": subscription_id
        }
    })
    .to_string()
}

/// What one accepted WebSocket connection does.
#[derive(Debug, Clone, Default)]
pub struct FeedScript {
    pub batches: Vec<RawLogBatch>,
    /// Drop the connection after the batches instead of idling.
    pub then_drop: bool,
}

impl FeedScript {
    pub fn idle(batches: Vec<RawLogBatch>) -> Self {
        Self {
            batches,
            then_drop: false,
        }
    }

    pub fn dropping(batches: Vec<RawLogBatch>) -> Self {
        Self {
            batches,
            then_drop: true,
        }
    }
}

/// Counters observed by the mock log feed.
#[derive(Debug, Default)]
pub struct FeedStats {
    pub subscribes: AtomicU32,
    pub unsubscribes: AtomicU32,
}

/// Start a mock `logsSubscribe` endpoint. Connection N follows `scripts[N]`;
/// connections past the end idle with no notifications.
pub async fn start_log_feed(scripts: Vec<FeedScript>) -> (String, Arc<FeedStats>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stats = Arc::new(FeedStats::default());
    let mut scripts = scripts.into_iter();

    let feed_stats = stats.clone();
    tokio::spawn(async move {
        let mut next_id = 100u64;
        while let Ok((socket, _)) = listener.accept().await {
            let script = scripts.next().unwrap_or_default();
            next_id += 1;
            tokio::spawn(serve_feed(socket, script, next_id, feed_stats.clone()));
        }
    });

    (format!("ws://{}", addr), stats)
}

async fn serve_feed(socket: TcpStream, script: FeedScript, sub_id: u64, stats: Arc<FeedStats>) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
        return;
    };

    // logsSubscribe request
    let Some(Ok(Message::Text(text))) = ws.next().await else {
        return;
    };
    let request: Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(request["method"], "logsSubscribe");
    assert_eq!(request["params"][0]["mentions"][0], PROGRAM_ID);
    assert_eq!(request["params"][1]["commitment"], "finalized");
    stats.subscribes.fetch_add(1, Ordering::SeqCst);

    let reply = json!({"jsonrpc": "2.0", "result": sub_id, "id": request["id"]});
    if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
        return;
    }

    for batch in &script.batches {
        let note = notification_json(sub_id, batch);
        if ws.send(Message::Text(note.into())).await.is_err() {
            return;
        }
    }

    if script.then_drop {
        // Abrupt drop, no close handshake.
        drop(ws);
        return;
    }

    while let Some(Ok(msg)) = ws.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let Ok(req) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        if req["method"] == "logsUnsubscribe" && req["params"][0] == sub_id {
            stats.unsubscribes.fetch_add(1, Ordering::SeqCst);
            let ack = json!({"jsonrpc": "2.0", "result": true, "id": req["id"]});
            if ws.send(Message::Text(ack.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}

/// Start a JSON-RPC backend over raw TCP. `handler` maps (method, params) to
/// the full JSON-RPC reply. Every request body is recorded.
pub async fn start_rpc_backend<F>(handler: F) -> (SocketAddr, Arc<Mutex<Vec<Value>>>)
where
    F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let recorded = requests.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let handler = handler.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let Some(body) = read_http_body(&mut socket).await else {
                    return;
                };
                let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                let method = request["method"].as_str().unwrap_or_default().to_string();
                let reply = handler(&method, &request["params"]);
                recorded.lock().unwrap().push(request);

                let body = reply.to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    (addr, requests)
}

/// Start a JSON-RPC backend that records each request and never answers.
pub async fn start_silent_backend() -> (SocketAddr, Arc<Mutex<Vec<Value>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = requests.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let recorded = recorded.clone();
            tokio::spawn(async move {
                if let Some(body) = read_http_body(&mut socket).await {
                    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                    recorded.lock().unwrap().push(request);
                }
                // Hold the socket open so the caller sees a timeout, not a reset.
                std::future::pending::<()>().await;
                drop(socket);
            });
        }
    });

    (addr, requests)
}

async fn read_http_body(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length: usize = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Some(buf[header_end..header_end + content_length].to_vec())
}

pub fn rpc_result(result: Value) -> Value {
    json!({"jsonrpc": "2.0", "result": result, "id": 1})
}

/// `getVersion` reply; the SDK client asks before picking a wire encoding.
pub fn node_version() -> Value {
    rpc_result(json!({"solana-core": "2.1.0", "feature-set": 0}))
}

/// Methods recorded by a mock backend, in arrival order.
pub fn methods(requests: &Mutex<Vec<Value>>) -> Vec<String> {
    requests
        .lock()
        .unwrap()
        .iter()
        .filter_map(|r| r["method"].as_str().map(str::to_string))
        .collect()
}

pub fn rpc_error(code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "error": {"code": code, "message": message}, "id": 1})
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
