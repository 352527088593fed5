// End-to-end session tests against an in-process event channel server.
#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use picsort_api::CatalogResponse;
use picsort_core::{
    CatalogSource, DebugMirror, LinkState, ReconnectConfig, Session, SessionConfig, SettingValue,
};

const WAIT: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

/// Serves a growing catalog: the n-th fetch returns n + 1 items.
#[derive(Default)]
struct CountingSource {
    calls: Mutex<Vec<bool>>,
}

impl CatalogSource for CountingSource {
    fn fetch(&self, is_random: bool) -> BoxFuture<'_, Result<CatalogResponse, picsort_api::Error>> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(is_random);
            calls.len()
        };
        let images: Vec<_> = (0..n)
            .map(|i| json!({"path": format!("p{i}"), "link": format!("/pics/p{i}")}))
            .collect();
        let resp = serde_json::from_value(json!({"images": images, "settings": {}})).unwrap();
        async move { Ok(resp) }.boxed()
    }
}

/// Accepts any number of connections. Every inbound frame is forwarded to
/// the returned receiver; a `rate` frame is answered with `rate_success`.
async fn spawn_server() -> (SocketAddr, Arc<AtomicUsize>, mpsc::UnboundedReceiver<serde_json::Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::unbounded_channel();

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                ws.send(Message::text(r#"{"type":"echo"}"#.to_owned()))
                    .await
                    .unwrap();
                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else { continue };
                    let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                    if value["event"] == "rate" {
                        let reply = json!({"event": "rate_success", "is_random": value["is_random"]});
                        ws.send(Message::text(reply.to_string())).await.unwrap();
                    }
                    let _ = tx.send(value);
                }
            });
        }
    });

    (addr, accepted, rx)
}

/// Always serves the same three-item catalog.
struct FixedSource;

impl CatalogSource for FixedSource {
    fn fetch(&self, _is_random: bool) -> BoxFuture<'_, Result<CatalogResponse, picsort_api::Error>> {
        let resp = serde_json::from_value(json!({
            "images": [
                {"path": "a", "link": "/pics/a"},
                {"path": "b", "link": "/pics/b"},
                {"path": "c", "link": "/pics/c"}
            ],
            "settings": {}
        }))
        .unwrap();
        async move { Ok(resp) }.boxed()
    }
}

fn session(addr: SocketAddr, source: Arc<dyn CatalogSource>, mirror: &DebugMirror) -> Session {
    let mut config = SessionConfig::for_server(Url::parse(&format!("http://{addr}/")).unwrap());
    config.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
        max_retries: None,
    };
    Session::with_collaborators(config, source, Some(Arc::new(mirror.clone()))).unwrap()
}

async fn wait_connected(session: &Session) {
    let mut state = session.link_state().unwrap();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == LinkState::Connected))
        .await
        .unwrap()
        .unwrap();
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_connects_open_a_single_channel() {
    let (addr, accepted, _rx) = spawn_server().await;
    let source = Arc::new(CountingSource::default());
    let s = session(addr, source, &DebugMirror::new());

    let (a, b) = tokio::join!(s.connect(), s.connect());
    a.unwrap();
    b.unwrap();
    wait_connected(&s).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    s.disconnect().await;
}

#[tokio::test]
async fn vote_round_trip_refreshes_the_catalog() {
    let (addr, _, mut rx) = spawn_server().await;
    let source = Arc::new(CountingSource::default());
    let mirror = DebugMirror::new();
    let s = session(addr, source.clone(), &mirror);

    s.connect().await.unwrap();
    assert_eq!(s.catalog().len(), 1);
    wait_connected(&s).await;

    let mut catalog = s.catalog_stream();
    s.vote("p0", true);

    let sent = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        sent,
        json!({"event": "rate", "winner": "p0", "losers": [], "is_random": true})
    );

    let refreshed = tokio::time::timeout(WAIT, catalog.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.len(), 2);
    assert_eq!(*source.calls.lock().unwrap(), vec![false, true]);

    let events: Vec<_> = mirror.snapshot().iter().map(|e| e.event.clone()).collect();
    assert_eq!(events, vec!["rate_success".to_owned(), String::new()]);

    s.disconnect().await;
}

#[tokio::test]
async fn vote_sends_every_other_item_as_a_loser() {
    let (addr, _, mut rx) = spawn_server().await;
    let s = session(addr, Arc::new(FixedSource), &DebugMirror::new());
    s.connect().await.unwrap();
    wait_connected(&s).await;

    s.vote("b", false);

    let sent = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        sent,
        json!({"event": "rate", "winner": "b", "losers": ["a", "c"], "is_random": false})
    );
    s.disconnect().await;
}

#[tokio::test]
async fn toggle_is_forwarded_without_local_change() {
    let (addr, _, mut rx) = spawn_server().await;
    let s = session(addr, Arc::new(CountingSource::default()), &DebugMirror::new());
    s.connect().await.unwrap();
    wait_connected(&s).await;
    s.settings_store()
        .set([("same_orientation".to_owned(), SettingValue::Bool(false))].into_iter().collect());

    s.toggle_setting("same_orientation");

    let sent = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(sent, json!({"event": "toggle_setting", "name": "same_orientation"}));
    assert_eq!(
        s.settings()["same_orientation"],
        SettingValue::Bool(false)
    );
    s.disconnect().await;
}
