//! End-to-end session tests against an in-process WebSocket server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use cielo_auth::{Session, StaticKey};
use cielo_core::{CieloConfig, Device, InboundEvent};
use cielo_session::{CieloClient, ConnectionState, EventListener};

const WAIT: Duration = Duration::from_secs(5);

/// Config pointing at a local server, with compressed timings.
fn fast_config(ws_url: &str) -> CieloConfig {
    CieloConfig {
        // Dead local endpoints: REST must never be hit unless a test mocks it.
        api_base_url: "http://127.0.0.1:9".to_string(),
        home_url: "http://127.0.0.1:9".to_string(),
        wss_base_url: ws_url.to_string(),
        reconnect_delay: Duration::from_millis(50),
        recv_timeout: Duration::from_millis(10),
        loop_idle: Duration::from_millis(10),
        stop_grace: Duration::from_millis(100),
        resync_on_reconnect: false,
        ..CieloConfig::default()
    }
}

fn seeded_client(config: CieloConfig) -> CieloClient {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("cielo_session=debug")
        .try_init();
    let client = CieloClient::with_discovery(config, Arc::new(StaticKey("key".to_string())));
    client.session().apply_login(Session {
        access_token: "tok".to_string(),
        refresh_token: "rt".to_string(),
        session_id: "sid".to_string(),
        user_id: "uid".to_string(),
        api_key: "key".to_string(),
        last_refresh_ts: cielo_core::unix_now(),
    });
    client
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

/// Poll until `predicate` holds or the deadline passes.
async fn wait_for(what: &str, predicate: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !predicate() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[derive(Default)]
struct Recorder {
    mac: String,
    updates: AtomicUsize,
    lost: AtomicUsize,
}

impl Recorder {
    fn new(mac: &str) -> Arc<Self> {
        Arc::new(Self {
            mac: mac.to_string(),
            ..Self::default()
        })
    }
    fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
    fn lost(&self) -> usize {
        self.lost.load(Ordering::SeqCst)
    }
}

impl EventListener for Recorder {
    fn mac_address(&self) -> &str {
        &self.mac
    }
    fn on_state_update(&self, event: &InboundEvent) {
        assert_eq!(event.message_type, "StateUpdate");
        let _ = self.updates.fetch_add(1, Ordering::SeqCst);
    }
    fn on_connection_lost(&self) {
        let _ = self.lost.fetch_add(1, Ordering::SeqCst);
    }
    fn on_device_snapshot(&self, _device: &Device) {}
}

#[tokio::test]
async fn state_updates_reach_listeners_and_noise_is_filtered() {
    let (listener, url) = bind().await;

    // One connection: push a few frames, then hold the socket open.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(
            json!({"message_type": "Ping"}).to_string().into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text("not json at all".into())).await.unwrap();
        ws.send(Message::Text(
            json!({"message_type": "StateUpdate", "macAddress": "aa", "temp": 72})
                .to_string()
                .into(),
        ))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let client = seeded_client(fast_config(&url));
    let recorder = Recorder::new("aa");
    client.add_listener(Arc::clone(&recorder) as Arc<dyn EventListener>);
    client.start();

    wait_for("state update", || recorder.updates() == 1).await;
    // The Ping frame and the malformed frame were dropped, not dispatched.
    assert_eq!(recorder.updates(), 1);
    assert_eq!(recorder.lost(), 0);
    assert_eq!(client.state(), ConnectionState::Connected);

    client.stop().await;
    server.abort();
}

#[tokio::test]
async fn commands_arrive_stamped_and_in_order() {
    let (listener, url) = bind().await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Value>();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                tx.send(serde_json::from_str(text.as_str()).unwrap()).unwrap();
            }
        }
    });

    let client = seeded_client(fast_config(&url));
    for n in 1..=3 {
        let command = json!({"action": "actionControl", "n": n})
            .as_object()
            .unwrap()
            .clone();
        client.send_action(command);
    }
    client.start();

    let mut frames = Vec::new();
    for _ in 0..3 {
        let frame = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        frames.push(frame);
    }

    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame["n"], i as i64 + 1, "FIFO order violated");
        assert_eq!(frame["token"], "tok");
        assert_eq!(frame["mid"], "sid");
    }
    let ts: Vec<i64> = frames.iter().map(|f| f["ts"].as_i64().unwrap()).collect();
    assert!(ts[0] < ts[1] && ts[1] < ts[2], "ts not strictly increasing: {ts:?}");

    client.stop().await;
    server.abort();
}

#[tokio::test]
async fn graceful_stop_does_not_reconnect() {
    let (listener, url) = bind().await;

    let accepts = Arc::new(AtomicUsize::new(0));
    let server = tokio::spawn({
        let accepts = Arc::clone(&accepts);
        async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let _ = accepts.fetch_add(1, Ordering::SeqCst);
                let mut ws = accept_async(stream).await.unwrap();
                while let Some(Ok(_)) = ws.next().await {}
            }
        }
    });

    let client = seeded_client(fast_config(&url));
    client.start();
    wait_for("connect", || client.state() == ConnectionState::Connected).await;

    client.stop().await;
    assert_eq!(client.state(), ConnectionState::Closed);

    // Long enough for several reconnect windows.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
    assert_eq!(client.state(), ConnectionState::Closed);
    server.abort();
}

#[tokio::test]
async fn stop_performs_close_handshake() {
    let (listener, url) = bind().await;

    let close_frames = Arc::new(AtomicUsize::new(0));
    let server = tokio::spawn({
        let close_frames = Arc::clone(&close_frames);
        async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if matches!(msg, Message::Close(_)) {
                    let _ = close_frames.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    });

    let client = seeded_client(fast_config(&url));
    client.start();
    wait_for("connect", || client.state() == ConnectionState::Connected).await;

    client.stop().await;

    // The peer saw a proper close frame, not just a dropped TCP stream.
    wait_for("close frame", || close_frames.load(Ordering::SeqCst) == 1).await;
    server.abort();
}

#[tokio::test]
async fn fast_reconnect_suppresses_connection_lost() {
    let (listener, url) = bind().await;

    let accepts = Arc::new(AtomicUsize::new(0));
    let server = tokio::spawn({
        let accepts = Arc::clone(&accepts);
        async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let n = accepts.fetch_add(1, Ordering::SeqCst) + 1;
                let mut ws = accept_async(stream).await.unwrap();
                if n == 1 {
                    // Drop the first connection immediately.
                    let _ = ws.close(None).await;
                } else {
                    while let Some(Ok(_)) = ws.next().await {}
                }
            }
        }
    });

    // Reconnect (50ms) lands well inside the 10s watchdog window.
    let client = seeded_client(fast_config(&url));
    let recorder = Recorder::new("aa");
    client.add_listener(Arc::clone(&recorder) as Arc<dyn EventListener>);
    client.start();

    wait_for("second connection", || {
        accepts.load(Ordering::SeqCst) >= 2 && client.state() == ConnectionState::Connected
    })
    .await;

    // The blip stayed invisible to listeners.
    assert_eq!(recorder.lost(), 0);

    client.stop().await;
    server.abort();
}

#[tokio::test]
async fn sustained_outage_fires_connection_lost_once() {
    let (listener, url) = bind().await;

    // Accept one connection, close it, then stop listening entirely.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let _ = ws.close(None).await;
        drop(listener);
        // Keep the task alive so the port stays closed, not re-bound.
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let mut config = fast_config(&url);
    config.connection_lost_grace = Duration::from_millis(150);
    let client = seeded_client(config);
    let recorder = Recorder::new("aa");
    client.add_listener(Arc::clone(&recorder) as Arc<dyn EventListener>);
    client.start();

    wait_for("connection lost notification", || recorder.lost() == 1).await;

    // Repeated failing reconnect attempts must not notify again.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(recorder.lost(), 1);

    client.stop().await;
    server.abort();
}
