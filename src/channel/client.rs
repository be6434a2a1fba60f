//! Realtime channel client
//!
//! Owns at most one live websocket connection to the chat backend. Incoming
//! frames are parsed into [`ChannelEvent`]s and fanned out to every current
//! subscriber in wire arrival order; outbound messages are accepted only
//! while the connection is open.
//!
//! Supersession is generation-counted: each `connect` bumps an atomic
//! generation and spawns a fresh connection task. Tasks from older
//! generations notice the stale counter and exit without dispatching,
//! reconnecting, or touching shared state, so two `connect` calls in a row
//! never produce double delivery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::reconnect::ConnectionState;
use super::types::{ChannelEvent, OutboundFrame};
use crate::config::ClientConfig;

type Handler = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

struct Subscriber {
    id: u64,
    handler: Handler,
}

struct Inner {
    config: ClientConfig,
    /// Bumped on every `connect`/`disconnect`; connection tasks carry the
    /// value they were spawned with and stand down once it goes stale.
    generation: AtomicU64,
    next_subscriber_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
    /// Writer handle of the current connection, tagged with its generation
    outbound: Mutex<Option<(u64, mpsc::UnboundedSender<OutboundFrame>)>>,
    state_tx: watch::Sender<ConnectionState>,
}

/// Client for the realtime chat channel
///
/// Cheap to clone; clones share the same connection and subscriber list.
/// Methods must be called within a tokio runtime.
#[derive(Clone)]
pub struct ChannelClient {
    inner: Arc<Inner>,
}

/// Handle for one registered event handler.
///
/// `unsubscribe` removes exactly that handler. Dropping the handle without
/// calling it leaves the handler registered for the client's lifetime.
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    /// Remove the handler this subscription was created for
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.lock().retain(|s| s.id != self.id);
        }
    }
}

impl ChannelClient {
    pub fn new(config: ClientConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                generation: AtomicU64::new(0),
                next_subscriber_id: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
                outbound: Mutex::new(None),
                state_tx,
            }),
        }
    }

    /// Open (or replace) the connection, authenticating with `token`.
    ///
    /// Any previous connection is superseded: its socket closes and its
    /// handlers never fire again. Calling repeatedly does not leak
    /// connections. The token is kept for reconnection attempts.
    pub fn connect(&self, token: impl Into<String>) {
        let token = token.into();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        // Drop the old writer handle so the superseded socket closes
        self.inner.outbound.lock().take();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run(generation, token).await;
        });
    }

    /// Close the active connection, if any. Safe to call repeatedly.
    pub fn disconnect(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.outbound.lock().take();
        self.inner
            .state_tx
            .send_replace(ConnectionState::Disconnected);
        info!("Chat channel disconnected");
    }

    /// Register a handler invoked once per inbound event, in arrival order.
    ///
    /// Safe to call (and to unsubscribe) from inside a handler.
    pub fn subscribe(
        &self,
        handler: impl Fn(&ChannelEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push(Subscriber {
            id,
            handler: Arc::new(handler),
        });
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Send a chat message to `recipient`.
    ///
    /// Silently dropped (logged at debug) unless the connection is open;
    /// there is no retry queue.
    pub fn send_message(&self, recipient: impl Into<String>, text: impl Into<String>) {
        if self.state() != ConnectionState::Open {
            debug!("Chat channel not open, dropping outbound message");
            return;
        }
        let guard = self.inner.outbound.lock();
        match guard.as_ref() {
            Some((_, tx)) => {
                let _ = tx.send(OutboundFrame {
                    recipient: recipient.into(),
                    message: text.into(),
                });
            }
            None => debug!("Chat channel has no writer, dropping outbound message"),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Watch connection state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_state(&self, generation: u64, state: ConnectionState) {
        if self.is_current(generation) {
            self.state_tx.send_replace(state);
        }
    }

    /// Connection task body: connect, drive, back off, repeat.
    async fn run(self: Arc<Self>, generation: u64, token: String) {
        let mut attempt: u32 = 0;
        loop {
            if !self.is_current(generation) {
                return;
            }
            self.set_state(
                generation,
                if attempt == 0 {
                    ConnectionState::Connecting
                } else {
                    ConnectionState::Reconnecting
                },
            );

            let url = self.config.ws_url(&token);
            match connect_async(&url).await {
                Ok((stream, _)) => {
                    if !self.is_current(generation) {
                        return;
                    }
                    attempt = 0;
                    info!("Chat channel connected");
                    self.set_state(generation, ConnectionState::Open);
                    self.drive(generation, stream).await;
                    if !self.is_current(generation) {
                        return;
                    }
                    self.clear_outbound(generation);
                }
                Err(e) => {
                    // Transport errors are logged, never surfaced; they do
                    // not stop the reconnect schedule.
                    warn!("Chat channel connect failed: {}", e);
                }
            }

            if !self.is_current(generation) {
                return;
            }
            attempt += 1;
            let policy = &self.config.reconnect;
            if !policy.enabled || attempt > policy.max_attempts {
                warn!(
                    "Chat channel giving up after {} failed attempt(s)",
                    attempt.saturating_sub(1).max(1)
                );
                self.set_state(generation, ConnectionState::Failed);
                return;
            }
            let delay = policy.delay_for_attempt(attempt);
            debug!(
                "Chat channel retrying in {:?} (attempt {}/{})",
                delay, attempt, policy.max_attempts
            );
            self.set_state(generation, ConnectionState::Reconnecting);
            tokio::time::sleep(delay).await;
        }
    }

    /// Pump one live connection until it closes, errors, or is superseded.
    async fn drive(&self, generation: u64, stream: WebSocketStream<MaybeTlsStream<TcpStream>>) {
        let (mut sink, mut source) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<OutboundFrame>();
        {
            let mut outbound = self.outbound.lock();
            if !self.is_current(generation) {
                return;
            }
            *outbound = Some((generation, tx));
        }

        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(frame) => {
                        let raw = match serde_json::to_string(&frame) {
                            Ok(raw) => raw,
                            Err(e) => {
                                warn!("Failed to serialize outbound frame: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(WsMessage::Text(raw)).await {
                            warn!("Chat channel send failed: {}", e);
                            return;
                        }
                    }
                    // Writer handle dropped: superseded or disconnected
                    None => return,
                },
                msg = source.next() => match msg {
                    Some(Ok(WsMessage::Text(raw))) => {
                        if !self.is_current(generation) {
                            return;
                        }
                        match serde_json::from_str::<ChannelEvent>(&raw) {
                            Ok(event) => self.dispatch(&event),
                            Err(e) => warn!("Dropping unparseable chat frame: {}", e),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("Chat channel closed by server");
                        return;
                    }
                    Some(Ok(_)) => {} // ping/pong/binary: nothing to dispatch
                    Some(Err(e)) => {
                        warn!("Chat channel transport error: {}", e);
                        return;
                    }
                },
            }
        }
    }

    /// Invoke every current handler, outside the lock.
    ///
    /// The snapshot means a handler may subscribe or unsubscribe mid-dispatch
    /// without deadlock; a handler removed during dispatch can still see the
    /// in-flight event.
    fn dispatch(&self, event: &ChannelEvent) {
        let handlers: Vec<Handler> = self
            .subscribers
            .lock()
            .iter()
            .map(|s| Arc::clone(&s.handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    /// Remove the writer handle, but only if it still belongs to `generation`
    fn clear_outbound(&self, generation: u64) {
        let mut outbound = self.outbound.lock();
        if matches!(*outbound, Some((g, _)) if g == generation) {
            *outbound = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::time::timeout;

    fn test_config(port: u16) -> ClientConfig {
        ClientConfig {
            ws_base: format!("ws://127.0.0.1:{}", port),
            reconnect: crate::channel::ReconnectConfig {
                initial_delay_ms: 50,
                max_delay_ms: 200,
                jitter: 0.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn wait_for_state(client: &ChannelClient, want: ConnectionState) {
        timeout(Duration::from_secs(5), async {
            let mut rx = client.watch_state();
            loop {
                if *rx.borrow() == want {
                    return;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}", want));
    }

    fn message_json(sender: &str, recipient: &str, text: &str) -> String {
        format!(
            r#"{{"type":"message","sender":"{}","recipient":"{}","message":"{}"}}"#,
            sender, recipient, text
        )
    }

    #[tokio::test]
    async fn test_events_reach_subscribers_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            for text in ["one", "two", "three"] {
                ws.send(WsMessage::Text(message_json("ann", "bob", text)))
                    .await
                    .unwrap();
            }
            // Keep the socket open so the client does not reconnect
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        let client = ChannelClient::new(test_config(port));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = client.subscribe(move |event| {
            if let ChannelEvent::Message { message, .. } = event {
                sink.lock().push(message.clone());
            }
        });

        client.connect("tok");
        wait_for_state(&client, ConnectionState::Open).await;
        timeout(Duration::from_secs(5), async {
            while seen.lock().len() < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(*seen.lock(), vec!["one", "two", "three"]);
        client.disconnect();
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(WsMessage::Text(message_json("ann", "bob", "hi")))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        let client = ChannelClient::new(test_config(port));
        let removed_count = Arc::new(AtomicU64::new(0));
        let kept = Arc::new(Mutex::new(Vec::new()));

        let counter = Arc::clone(&removed_count);
        let sub = client.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();

        let sink = Arc::clone(&kept);
        let _kept_sub = client.subscribe(move |event| {
            if let ChannelEvent::Message { message, .. } = event {
                sink.lock().push(message.clone());
            }
        });

        client.connect("tok");
        timeout(Duration::from_secs(5), async {
            while kept.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        // The surviving handler saw the event; the removed one never fired
        assert_eq!(removed_count.load(Ordering::SeqCst), 0);
        client.disconnect();
    }

    #[tokio::test]
    async fn test_second_connect_supersedes_first() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            // First connection: wait for the client to drop it, send into
            // the void afterwards (delivery must not happen)
            let (tcp, _) = listener.accept().await.unwrap();
            let mut first = tokio_tungstenite::accept_async(tcp).await.unwrap();

            let (tcp, _) = listener.accept().await.unwrap();
            let mut second = tokio_tungstenite::accept_async(tcp).await.unwrap();

            let _ = first
                .send(WsMessage::Text(message_json("ann", "bob", "stale")))
                .await;
            second
                .send(WsMessage::Text(message_json("ann", "bob", "live")))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        let client = ChannelClient::new(test_config(port));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = client.subscribe(move |event| {
            if let ChannelEvent::Message { message, .. } = event {
                sink.lock().push(message.clone());
            }
        });

        client.connect("tok");
        wait_for_state(&client, ConnectionState::Open).await;
        client.connect("tok");
        wait_for_state(&client, ConnectionState::Open).await;

        timeout(Duration::from_secs(5), async {
            while seen.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        // Allow any stale delivery to surface before asserting
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(*seen.lock(), vec!["live"]);
        client.disconnect();
    }

    #[tokio::test]
    async fn test_reconnects_after_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(WsMessage::Text(message_json("ann", "bob", "before")))
                .await
                .unwrap();
            ws.close(None).await.unwrap();

            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(WsMessage::Text(message_json("ann", "bob", "after")))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        let client = ChannelClient::new(test_config(port));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = client.subscribe(move |event| {
            if let ChannelEvent::Message { message, .. } = event {
                sink.lock().push(message.clone());
            }
        });

        client.connect("tok");
        timeout(Duration::from_secs(5), async {
            while seen.lock().len() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(*seen.lock(), vec!["before", "after"]);
        client.disconnect();
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        // Reserve a port with no listener behind it
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = test_config(port);
        config.reconnect.max_attempts = 2;
        config.reconnect.initial_delay_ms = 10;

        let client = ChannelClient::new(config);
        client.connect("tok");
        wait_for_state(&client, ConnectionState::Failed).await;
    }

    #[tokio::test]
    async fn test_send_message_reaches_server_and_is_noop_when_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (got_tx, got_rx) = tokio::sync::oneshot::channel::<String>();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if let WsMessage::Text(raw) = msg {
                    let _ = got_tx.send(raw);
                    break;
                }
            }
        });

        let client = ChannelClient::new(test_config(port));

        // Not connected yet: a silent no-op
        client.send_message("bob", "dropped");

        client.connect("tok");
        wait_for_state(&client, ConnectionState::Open).await;
        client.send_message("bob", "hello there");

        let raw = timeout(Duration::from_secs(5), got_rx).await.unwrap().unwrap();
        let frame: OutboundFrame = serde_json::from_str(&raw).unwrap();
        assert_eq!(frame.recipient, "bob");
        assert_eq!(frame.message, "hello there");
        client.disconnect();
    }

    #[tokio::test]
    async fn test_unsubscribe_from_inside_handler() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            for text in ["one", "two"] {
                ws.send(WsMessage::Text(message_json("ann", "bob", text)))
                    .await
                    .unwrap();
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        let client = ChannelClient::new(test_config(port));
        let fired = Arc::new(AtomicU64::new(0));
        let seen_by_stable = Arc::new(Mutex::new(Vec::new()));

        // First handler removes itself on its first event
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let counter = Arc::clone(&fired);
        let slot_in_handler = Arc::clone(&slot);
        let sub = client.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = slot_in_handler.lock().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock() = Some(sub);

        let sink = Arc::clone(&seen_by_stable);
        let _stable = client.subscribe(move |event| {
            if let ChannelEvent::Message { message, .. } = event {
                sink.lock().push(message.clone());
            }
        });

        client.connect("tok");
        timeout(Duration::from_secs(5), async {
            while seen_by_stable.lock().len() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        // Self-removing handler fired exactly once; the stable one saw both
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(*seen_by_stable.lock(), vec!["one", "two"]);
        client.disconnect();
    }
}
