//! WebSocket-based live reload.

use kiln_pipeline::{BuildEvents, Category, Notification};
use serde::Serialize;
use tokio::sync::broadcast;

/// Path of the live reload WebSocket endpoint.
pub const WS_PATH: &str = "/__kiln/ws";

/// Path the client script is served from.
pub const CLIENT_PATH: &str = "/__kiln/client.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload
    Reload {
        /// Task whose output changed
        task: String,
    },

    /// A file failed to build; shown in the browser console
    Notify {
        title: String,
        message: String,
    },

    /// Connection established
    Connected,
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
        // Ignore send errors (no receivers)
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Get the number of connected clients.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildEvents for ReloadHub {
    fn reload(&self, category: Category) {
        tracing::debug!(
            task = %category,
            clients = self.subscriber_count(),
            "Reloading browsers"
        );
        self.send(ReloadMessage::Reload {
            task: category.to_string(),
        });
    }

    fn notify(&self, notification: &Notification) {
        tracing::error!("{}: {}", notification.title, notification.message);
        self.send(ReloadMessage::Notify {
            title: notification.title.clone(),
            message: notification.message.clone(),
        });
    }
}

/// Insert the client script tag before `</body>`, or append it when the
/// document has no body close tag.
pub fn inject_client_script(html: &str) -> String {
    let tag = format!(r#"<script src="{}"></script>"#, CLIENT_PATH);

    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{}{}", html, tag),
    }
}

/// Generate the client-side live reload script.
pub fn client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  let reconnectAttempts = 0;
  const maxReconnectAttempts = 10;

  function connect() {{
    const protocol = location.protocol === 'https:' ? 'wss:' : 'ws:';
    const ws = new WebSocket(protocol + '//' + location.host + '{}');

    ws.onopen = function() {{
      if (reconnectAttempts > 0) {{
        location.reload();
        return;
      }}
      console.log('[kiln] Connected');
    }};

    ws.onmessage = function(event) {{
      const msg = JSON.parse(event.data);

      switch (msg.type) {{
        case 'reload':
          console.log('[kiln] ' + msg.task + ' changed, reloading');
          location.reload();
          break;

        case 'notify':
          console.error('[kiln] ' + msg.title + ': ' + msg.message);
          break;

        case 'connected':
          console.log('[kiln] Server acknowledged connection');
          break;
      }}
    }};

    ws.onclose = function() {{
      console.log('[kiln] Disconnected');
      if (reconnectAttempts < maxReconnectAttempts) {{
        reconnectAttempts++;
        setTimeout(connect, 1000 * reconnectAttempts);
      }}
    }};
  }}

  connect();
}})();
"#,
        WS_PATH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.reload(Category::Css);

        match rx.try_recv() {
            Ok(ReloadMessage::Reload { task }) => assert_eq!(task, "css"),
            other => panic!("Expected Reload message, got {:?}", other),
        }
    }

    #[test]
    fn hub_forwards_notifications() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.notify(&Notification::new("SCSS Error", "expected \"}\""));

        assert_eq!(
            rx.try_recv().unwrap(),
            ReloadMessage::Notify {
                title: "SCSS Error".to_string(),
                message: "expected \"}\"".to_string(),
            }
        );
    }

    #[test]
    fn sending_without_clients_is_fine() {
        let hub = ReloadHub::new();
        hub.reload(Category::Html);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn serializes_messages() {
        let msg = ReloadMessage::Reload {
            task: "js".to_string(),
        };

        let json = serde_json::to_string(&msg).unwrap();

        assert_eq!(json, r#"{"type":"reload","task":"js"}"#);
    }

    #[test]
    fn injects_before_body_close() {
        let html = "<html><BODY><p>x</p></BODY></html>";

        let injected = inject_client_script(html);

        assert_eq!(
            injected,
            r#"<html><BODY><p>x</p><script src="/__kiln/client.js"></script></BODY></html>"#
        );
    }

    #[test]
    fn appends_when_no_body() {
        let injected = inject_client_script("<p>fragment</p>");
        assert!(injected.ends_with(r#"<script src="/__kiln/client.js"></script>"#));
    }

    #[test]
    fn client_script_targets_ws_endpoint() {
        assert!(client_script().contains(WS_PATH));
    }
}
