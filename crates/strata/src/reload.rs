//! Development live-reload channel
//!
//! Browsers open a WebSocket to [`RELOAD_PATH`]; every watched change is
//! pushed to them as the text message `reload`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::engine::Engine;
use crate::runtime::ReloadCallback;

/// Fixed path of the reload socket
pub const RELOAD_PATH: &str = "/__strata_reload";

/// Message pushed to connected clients
pub const RELOAD_MESSAGE: &str = "reload";

const BODY_CLOSE: &str = "</body>";

const RELOAD_SCRIPT: &str = r#"<script>(function(){var p=location.protocol==="https:"?"wss://":"ws://";var s=new WebSocket(p+location.host+"/__strata_reload");s.onmessage=function(e){if(e.data==="reload"){location.reload();}};})();</script>"#;

/// Inserts the reload client right before the first `</body>`
///
/// Documents without a closing body tag are returned unchanged.
pub fn inject_reload_script(html: &str) -> Cow<'_, str> {
    match html.find(BODY_CLOSE) {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + RELOAD_SCRIPT.len());
            out.push_str(&html[..at]);
            out.push_str(RELOAD_SCRIPT);
            out.push_str(&html[at..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(html),
    }
}

/// Fan-out of reload signals to every connected browser
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<()>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Signals every subscriber; returns how many were listening
    pub fn notify(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Callback suitable for [`RuntimeContext::with_reload`](crate::RuntimeContext::with_reload)
    pub fn callback(&self) -> ReloadCallback {
        let hub = self.clone();
        Arc::new(move || {
            let clients = hub.notify();
            debug!(clients, "reload signal sent");
        })
    }
}

/// `GET /__strata_reload`
pub async fn reload_socket(ws: WebSocketUpgrade, State(engine): State<Arc<Engine>>) -> Response {
    let Some(hub) = engine.reload_hub() else {
        return axum::http::StatusCode::NOT_FOUND.into_response();
    };

    let rx = hub.subscribe();
    ws.on_upgrade(move |socket| push_reloads(socket, rx))
}

async fn push_reloads(mut socket: WebSocket, mut rx: broadcast::Receiver<()>) {
    loop {
        match rx.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {
                if socket.send(Message::Text(RELOAD_MESSAGE.to_string())).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}
