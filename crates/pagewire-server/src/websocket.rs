//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// The site was rebuilt; reload the page
    Reload,

    /// The rebuild failed; the previous output is still served
    BuildFailed {
        /// Error reported by the builder
        message: String,
    },
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    /// Create a new reload hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers is fine
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate the client-side reload script.
///
/// Only injected into pages built by the dev server.
pub fn reload_client_script(ws_path: &str) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const url = (location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '{}';
  const ws = new WebSocket(url);

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'build_failed':
        console.error('[pagewire] build failed:\n' + msg.message);
        break;

      case 'connected':
        console.log('[pagewire] live reload connected');
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[pagewire] disconnected, retrying...');
    setTimeout(function() {{ location.reload(); }}, 1000);
  }};
}})();
"#,
        ws_path
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::Reload);

        match rx.try_recv() {
            Ok(ReloadMessage::Reload) => {}
            _ => panic!("Expected Reload message"),
        }
    }

    #[test]
    fn counts_connected_subscribers() {
        let hub = ReloadHub::new();
        assert_eq!(hub.subscriber_count(), 0);

        let rx = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);

        drop(rx);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn serializes_messages() {
        let msg = ReloadMessage::BuildFailed {
            message: "index.html: unknown partial".to_string(),
        };

        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains("\"type\":\"build_failed\""));
        assert!(json.contains("unknown partial"));
    }

    #[test]
    fn client_script_targets_path() {
        let script = reload_client_script("/__reload");

        assert!(script.contains("'/__reload'"));
        assert!(script.contains("location.reload()"));
    }
}
