//! WebSocket messages and broadcast hubs for live frames.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages pushed from the server to a frame page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameMessage {
    /// Connection established
    Connected,

    /// New print pane HTML
    Print {
        html: String,
    },

    /// New HTML for the whole frame
    Update {
        html: String,
    },

    /// An example changed on disk; reload the frame
    Reload,

    /// The frame could not handle a client request
    Error {
        message: String,
    },
}

/// Messages sent from a frame page to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A DOM event fired on an element with a `data-on-*` handler
    Event {
        handler: usize,
        #[serde(default)]
        value: Option<String>,
    },
}

/// Broadcasts frame messages to every subscriber.
#[derive(Debug, Clone)]
pub struct FrameHub {
    sender: broadcast::Sender<FrameMessage>,
}

impl FrameHub {
    /// Create a new hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all subscribers.
    pub fn send(&self, msg: FrameMessage) {
        // No subscribers is fine
        let _ = self.sender.send(msg);
    }

    /// Subscribe to messages.
    pub fn subscribe(&self) -> broadcast::Receiver<FrameMessage> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Client script loaded by every frame page.
///
/// Connects to the frame's session socket, forwards DOM events for elements
/// carrying `data-on-*` handler ids and applies print, update and reload
/// messages.
pub fn frame_client_script(ws_path: &str) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const root = document.getElementById('docframe-root');
  if (!root || !root.dataset.session) return;

  const scheme = location.protocol === 'https:' ? 'wss:' : 'ws:';
  const ws = new WebSocket(scheme + '//' + location.host + '{}?session=' + root.dataset.session);

  ['click', 'input', 'change', 'submit'].forEach(function(type) {{
    root.addEventListener(type, function(event) {{
      const target = event.target.closest('[data-on-' + type + ']');
      if (!target || ws.readyState !== WebSocket.OPEN) return;
      if (type === 'submit') event.preventDefault();
      const handler = parseInt(target.getAttribute('data-on-' + type), 10);
      const value = 'value' in target ? String(target.value) : null;
      ws.send(JSON.stringify({{ type: 'event', handler: handler, value: value }}));
    }});
  }});

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'print': {{
        const pane = root.querySelector('[data-printout]');
        if (pane) pane.outerHTML = msg.html;
        break;
      }}

      case 'update':
        root.innerHTML = msg.html;
        break;

      case 'reload':
        location.reload();
        break;

      case 'error':
        console.error('[docframe]', msg.message);
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[docframe] Disconnected');
  }};
}})();
"#,
        ws_path
    )
}
