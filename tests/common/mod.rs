//! Shared helpers for integration tests.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use chat_relay::app::build_app;
use chat_relay::app_state::AppState;
use chat_relay::broker::{Broker, InMemoryBroker};
use chat_relay::domain::Channel;
use chat_relay::ws::Supervisor;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A relay server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub broker: Arc<InMemoryBroker>,
    pub supervisor: Arc<Supervisor>,
}

impl TestServer {
    pub fn ws_url(&self, username: Option<&str>) -> String {
        match username {
            Some(name) => format!("ws://{}/ws?username={name}", self.addr),
            None => format!("ws://{}/ws", self.addr),
        }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Waits until exactly `n` broker subscriptions are open.
    pub async fn wait_for_subscriptions(&self, n: usize) {
        let waited = timeout(TIMEOUT, async {
            while self.broker.active_subscriptions() != n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        if waited.is_err() {
            panic!(
                "expected {n} subscriptions, found {}",
                self.broker.active_subscriptions()
            );
        }
    }
}

/// Boots the full application router against a fresh in-memory broker.
pub async fn boot_server() -> TestServer {
    let broker = Arc::new(InMemoryBroker::new(64));
    let Ok(()) = broker.connect().await else {
        panic!("broker connect failed");
    };
    let supervisor = Arc::new(
        Supervisor::new(Arc::clone(&broker) as Arc<dyn Broker>, Channel::default())
            .with_close_timeout(Duration::from_millis(200)),
    );
    let app = build_app(AppState::new(Arc::clone(&supervisor)));

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    drop(tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    }));

    TestServer {
        addr,
        broker,
        supervisor,
    }
}

pub async fn connect(url: &str) -> WsStream {
    let Ok((ws, _)) = connect_async(url).await else {
        panic!("websocket connect to {url} failed");
    };
    ws
}

/// Attempts an upgrade that the server must refuse; returns the HTTP status.
pub async fn connect_refused(url: &str) -> u16 {
    match connect_async(url).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => response.status().as_u16(),
        Err(err) => panic!("unexpected handshake error: {err}"),
        Ok(_) => panic!("upgrade to {url} was accepted"),
    }
}

pub async fn send_text(ws: &mut WsStream, text: &str) {
    let Ok(()) = ws.send(Message::text(text)).await else {
        panic!("websocket send failed");
    };
}

/// Reads the next text frame and parses it as JSON.
pub async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let Ok(next) = timeout(TIMEOUT, ws.next()).await else {
            panic!("timeout waiting for message");
        };
        let Some(Ok(msg)) = next else {
            panic!("connection ended while waiting for message");
        };
        if let Message::Text(text) = msg {
            let Ok(value) = serde_json::from_str(text.as_str()) else {
                panic!("payload is not JSON: {}", text.as_str());
            };
            return value;
        }
    }
}

/// Waits for the server to close the connection.
pub async fn expect_closed(ws: &mut WsStream) {
    let waited = timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    if waited.is_err() {
        panic!("server did not close the connection");
    }
}

pub fn field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}
