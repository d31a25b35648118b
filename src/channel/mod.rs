//! Push channel manager.
//!
//! Owns at most one streaming session with the catalog service. Catalog
//! snapshots and connection changes are reported to a [`ChannelObserver`].
//! When a session ends for any reason other than [`PushChannel::disconnect`],
//! a reconnection is scheduled after a fixed delay, up to a bounded number
//! of consecutive attempts. A successful open resets the attempt counter.

mod message;
mod transport;


pub use message::{ClientMessage, ServerMessage};
pub use transport::{Connector, Transport, WsConnector};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::ModelCatalog;
use crate::config::Config;
use crate::error::ChannelError;

/// Connectivity as seen by observers. Only the channel writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub connected: bool,
    pub reconnect_attempts: u32,
}

/// Receives what the push channel learns.
///
/// Called from the channel's tasks; implementations must not block.
pub trait ChannelObserver: Send + Sync + 'static {
    fn on_snapshot(&self, catalog: ModelCatalog);
    fn on_connection(&self, state: ConnectionState);
}

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub url: String,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl ChannelSettings {
    pub fn from_config(config: &Config) -> Result<Self, ChannelError> {
        Ok(Self {
            url: config.ws_url()?,
            reconnect_delay: config.reconnect_delay(),
            max_reconnect_attempts: config.max_reconnect_attempts(),
        })
    }
}

enum Outbound {
    Text(String),
    Close,
}

struct Session {
    id: u64,
    open: bool,
    outbound: mpsc::UnboundedSender<Outbound>,
    task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct ChannelState {
    connection: ConnectionState,
    session: Option<Session>,
    next_session_id: u64,
    reconnect_timer: Option<JoinHandle<()>>,
}

struct Inner {
    settings: ChannelSettings,
    connector: Arc<dyn Connector>,
    observer: Arc<dyn ChannelObserver>,
    state: Mutex<ChannelState>,
}

/// Handle to the push channel. Clones share the same session.
#[derive(Clone)]
pub struct PushChannel {
    inner: Arc<Inner>,
}

enum SessionEvent {
    Incoming(Option<Result<String, ChannelError>>),
    Outbound(Option<Outbound>),
}

impl PushChannel {
    pub fn new(
        settings: ChannelSettings,
        connector: Arc<dyn Connector>,
        observer: Arc<dyn ChannelObserver>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                connector,
                observer,
                state: Mutex::new(ChannelState::default()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().connection
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Starts a session unless one is already open or opening.
    ///
    /// A pending automatic reconnection is cancelled in favour of this call.
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut state = self.lock();
        if state.session.is_some() {
            debug!("push channel already open; connect ignored");
            return;
        }
        if let Some(timer) = state.reconnect_timer.take() {
            timer.abort();
        }
        state.next_session_id += 1;
        let id = state.next_session_id;
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = self.clone();
        let task = tokio::spawn(async move { channel.run_session(id, rx).await });
        state.session = Some(Session {
            id,
            open: false,
            outbound: tx,
            task: Some(task),
        });
        debug!(
            session = id,
            url = %self.inner.settings.url,
            "opening push channel"
        );
    }

    /// Same as [`PushChannel::connect`]; available after retries ran out.
    pub fn reconnect(&self) {
        self.connect();
    }

    /// Cancels any scheduled reconnection and closes the session.
    ///
    /// Not counted as a failure: no reconnection follows.
    pub fn disconnect(&self) {
        let state = {
            let mut state = self.lock();
            if let Some(timer) = state.reconnect_timer.take() {
                timer.abort();
            }
            if let Some(mut session) = state.session.take() {
                if session.open {
                    let _ = session.outbound.send(Outbound::Close);
                } else if let Some(task) = session.task.take() {
                    task.abort();
                }
            }
            state.connection.connected = false;
            state.connection
        };
        info!("push channel disconnected");
        self.inner.observer.on_connection(state);
    }

    /// Fire-and-forget send; silently dropped unless the channel is open.
    pub fn send_message(&self, message: &ClientMessage) {
        let state = self.lock();
        let Some(session) = state.session.as_ref().filter(|s| s.open) else {
            debug!("push channel closed; message dropped");
            return;
        };
        match serde_json::to_string(message) {
            Ok(text) => {
                let _ = session.outbound.send(Outbound::Text(text));
            }
            Err(e) => warn!(error = %e, "failed to encode push message"),
        }
    }

    async fn run_session(self, id: u64, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
        let url = &self.inner.settings.url;
        let mut transport = match self.inner.connector.connect(url).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!(session = id, error = %e, "push channel failed to open");
                self.on_closed(id);
                return;
            }
        };
        if !self.on_open(id) {
            transport.close().await;
            return;
        }

        loop {
            let event = tokio::select! {
                incoming = transport.recv() => SessionEvent::Incoming(incoming),
                cmd = outbound.recv() => SessionEvent::Outbound(cmd),
            };
            match event {
                SessionEvent::Incoming(Some(Ok(text))) => self.dispatch(&text),
                SessionEvent::Incoming(Some(Err(e))) => {
                    warn!(session = id, error = %e, "push channel failed");
                    break;
                }
                SessionEvent::Incoming(None) => {
                    info!(session = id, "push channel closed by server");
                    break;
                }
                SessionEvent::Outbound(Some(Outbound::Text(text))) => {
                    if let Err(e) = transport.send(text).await {
                        warn!(session = id, error = %e, "push channel send failed");
                        break;
                    }
                }
                SessionEvent::Outbound(Some(Outbound::Close)) | SessionEvent::Outbound(None) => {
                    transport.close().await;
                    return;
                }
            }
        }
        self.on_closed(id);
    }

    /// Marks session `id` open. Returns `false` if it was superseded while
    /// the connection was being established.
    fn on_open(&self, id: u64) -> bool {
        let state = {
            let mut state = self.lock();
            match state.session.as_mut() {
                Some(session) if session.id == id => session.open = true,
                _ => return false,
            }
            state.connection = ConnectionState {
                connected: true,
                reconnect_attempts: 0,
            };
            state.connection
        };
        info!(session = id, "push channel connected");
        self.inner.observer.on_connection(state);
        true
    }

    /// Session `id` ended on its own. Schedules a retry while attempts remain.
    fn on_closed(&self, id: u64) {
        let state = {
            let mut state = self.lock();
            if state.session.as_ref().map(|s| s.id) != Some(id) {
                return;
            }
            state.session = None;
            state.connection.connected = false;

            let max = self.inner.settings.max_reconnect_attempts;
            if state.connection.reconnect_attempts < max {
                state.connection.reconnect_attempts += 1;
                let attempt = state.connection.reconnect_attempts;
                let delay = self.inner.settings.reconnect_delay;
                info!(
                    attempt,
                    max,
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnect"
                );
                let channel = self.clone();
                state.reconnect_timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    channel.lock().reconnect_timer = None;
                    channel.connect();
                }));
            } else {
                warn!(attempts = max, "push channel reconnect attempts exhausted");
            }
            state.connection
        };
        self.inner.observer.on_connection(state);
    }

    fn dispatch(&self, text: &str) {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(ServerMessage::Init { data }) | Ok(ServerMessage::ModelAdded { data }) => {
                debug!(version = data.version, "catalog snapshot received");
                self.inner.observer.on_snapshot(data);
            }
            Ok(ServerMessage::Error { error }) => {
                warn!(error = %error, "catalog service reported an error");
            }
            Ok(ServerMessage::Unknown) => {
                debug!("ignoring push message of unknown type");
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed push message");
            }
        }
    }
}
