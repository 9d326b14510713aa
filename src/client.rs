//! Async client for the Mini Games Hub session protocol.
//!
//! [`HubClient`] is a thin handle that communicates with a background
//! transport loop task via an unbounded MPSC channel. Push events are
//! emitted on a bounded channel ([`tokio::sync::mpsc::Receiver<HubEvent>`])
//! returned from [`HubClient::start`], and the mirrored session state can be
//! read at any time via [`HubClient::session`].
//!
//! # Example
//!
//! ```rust,ignore
//! let connector = WebSocketConnector::new("wss://hub.example.com/ws");
//! let (client, mut events) = HubClient::start(connector, HubConfig::default());
//!
//! let room = client.create_room("Fun", "Ann", GameType::Hangman).await?;
//! println!("room code: {}", room.id);
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         HubEvent::GameStarted(_) => { /* re-render from client.session() */ }
//!         HubEvent::ReconnectFailed { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, error, warn};

use crate::error::{HubError, Result};
use crate::event::HubEvent;
use crate::protocol::{
    AckPayload, ClientMessage, DrawPoint, GameType, PlayerId, Room, ServerMessage,
};
use crate::state::SessionState;
use crate::transport::{Connector, Transport};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of connection attempts before giving up.
const DEFAULT_RECONNECT_ATTEMPTS: u32 = 10;

/// Default fixed delay between connection attempts.
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`HubClient`] connection.
///
/// All fields have sensible defaults; the reconnect policy defaults to the
/// hub's standard 10 attempts spaced 1 second apart.
///
/// # Example
///
/// ```
/// use mini_games_client::client::HubConfig;
/// use std::time::Duration;
///
/// let config = HubConfig::default()
///     .with_reconnect_attempts(3)
///     .with_reconnect_delay(Duration::from_millis(500));
/// assert_eq!(config.reconnect_attempts, 3);
/// ```
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of connection attempts (initial connect and every
    /// reconnect sequence alike) before reporting a connection failure.
    pub reconnect_attempts: u32,
    /// Fixed delay between connection attempts. Not exponential; the hub
    /// server expects quick, evenly spaced retries.
    pub reconnect_delay: Duration,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up with incoming server pushes, events
    /// are dropped (with a warning logged) to avoid blocking the transport
    /// loop. `Disconnected` is always delivered regardless of capacity, and
    /// the session state stays consistent because state transitions are
    /// applied before event delivery.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Timeout for the graceful shutdown.
    ///
    /// When [`HubClient::shutdown`] is called, the background transport
    /// loop is given this much time to close the transport and emit a final
    /// `Disconnected` event. If the timeout expires the task is aborted.
    pub shutdown_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl HubConfig {
    /// Set the maximum number of connection attempts per connect sequence.
    #[must_use]
    pub fn with_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts.max(1);
        self
    }

    /// Set the fixed delay between connection attempts.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the capacity of the bounded event channel.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// Internal shared state between the client handle and the transport loop.
struct ClientShared {
    connected: AtomicBool,
    state: RwLock<SessionState>,
}

impl ClientShared {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            state: RwLock::new(SessionState::default()),
        }
    }
}

/// Commands sent from the handle to the transport loop.
enum Command {
    /// Fire-and-forget message; no reply expected.
    Fire(ClientMessage),
    /// Request expecting exactly one `ack`. Replies are correlated FIFO:
    /// the loop resolves the oldest outstanding slot per `ack` received.
    Request {
        msg: ClientMessage,
        reply: oneshot::Sender<AckPayload>,
    },
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client handle for the Mini Games Hub session protocol.
///
/// Created via [`HubClient::start`], which spawns a background transport
/// loop and returns this handle together with an event receiver.
///
/// Command methods either queue a fire-and-forget message or await the
/// single acknowledgement the server sends for the request. While the
/// client is disconnected every command fails fast with
/// [`HubError::NotConnected`] instead of queueing silently.
pub struct HubClient {
    /// Sender half of the command channel to the transport loop.
    cmd_tx: mpsc::UnboundedSender<Command>,
    /// Shared connectivity flag and session state, updated by the loop.
    shared: Arc<ClientShared>,
    /// Handle to the background transport loop task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Oneshot sender to signal the transport loop to shut down gracefully.
    shutdown_tx: Option<oneshot::Sender<()>>,
    /// Timeout for the graceful shutdown.
    shutdown_timeout: Duration,
}

impl HubClient {
    /// Start the client transport loop and return a handle plus event
    /// receiver.
    ///
    /// The loop dials the [`Connector`] immediately and supervises the
    /// connection from then on: transport failures trigger automatic
    /// reconnection under the configured bounded-retry policy, with a fresh
    /// identity token assigned by the server on every successful connect.
    ///
    /// # Returns
    ///
    /// A tuple of `(client_handle, event_receiver)`. The event receiver
    /// yields [`HubEvent`]s until reconnection is exhausted or the client
    /// shuts down.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        connector: impl Connector,
        config: HubConfig,
    ) -> (Self, mpsc::Receiver<HubEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<HubEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let shared = Arc::new(ClientShared::new());
        let loop_shared = Arc::clone(&shared);

        let task = tokio::spawn(transport_loop(
            connector,
            cmd_rx,
            event_tx,
            loop_shared,
            shutdown_rx,
            config.reconnect_attempts.max(1),
            config.reconnect_delay,
        ));

        let client = Self {
            cmd_tx,
            shared,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Room operations ─────────────────────────────────────────────

    /// Create a room and become its host.
    ///
    /// On success the returned room seeds the local session state and the
    /// server-assigned player id becomes the local identity.
    ///
    /// # Errors
    ///
    /// [`HubError::NotConnected`] while disconnected, or
    /// [`HubError::Rejected`] carrying the server's message verbatim.
    pub async fn create_room(
        &self,
        room_name: impl Into<String>,
        player_name: impl Into<String>,
        game_type: GameType,
    ) -> Result<Room> {
        let epoch = self.shared.state.read().await.epoch;
        let ack = self
            .request(ClientMessage::CreateRoom {
                room_name: room_name.into(),
                player_name: player_name.into(),
                game_type,
            })
            .await?;
        self.commit_room_ack(ack, epoch, "failed to create room")
            .await
    }

    /// Join an existing room by its code.
    ///
    /// Host status is derived by comparing the returned room's host id to
    /// the local identity, never assumed.
    ///
    /// # Errors
    ///
    /// [`HubError::NotConnected`] while disconnected, or
    /// [`HubError::Rejected`] carrying the server's message verbatim.
    pub async fn join_room(
        &self,
        room_id: impl Into<String>,
        player_name: impl Into<String>,
    ) -> Result<Room> {
        let epoch = self.shared.state.read().await.epoch;
        let ack = self
            .request(ClientMessage::JoinRoom {
                room_id: room_id.into(),
                player_name: player_name.into(),
            })
            .await?;
        self.commit_room_ack(ack, epoch, "failed to join room").await
    }

    /// Leave the current room.
    ///
    /// Fire-and-forget: the server is notified best-effort, and all local
    /// room state is reset unconditionally. This is the only full-reset
    /// path besides shutdown. Any reply still in flight for the old room is
    /// discarded rather than applied.
    pub async fn leave_room(&self) {
        if let Err(e) = self.fire(ClientMessage::LeaveRoom) {
            debug!("leave-room notification not sent: {e}");
        }
        self.shared.state.write().await.reset();
    }

    /// Ask the server to start the game (host only).
    ///
    /// No optimistic local change: the started state is applied only when
    /// the `game-started` push arrives.
    ///
    /// # Errors
    ///
    /// [`HubError::NotInRoom`], [`HubError::NotConnected`], or
    /// [`HubError::Rejected`] with the server's message.
    pub async fn start_game(&self) -> Result<()> {
        let room_id = self.require_room_id().await?;
        let ack = self.request(ClientMessage::StartGame { room_id }).await?;
        if ack.success {
            Ok(())
        } else {
            Err(rejection(ack.error, "failed to start game"))
        }
    }

    // ── Game operations ─────────────────────────────────────────────

    /// Guess a letter in Hangman.
    ///
    /// Guarded locally before anything hits the wire: a letter already
    /// guessed, a lost round, or a game that has not started produce an
    /// error without network traffic. The acknowledgement is informational
    /// only; the resulting state arrives via `hangman-update`.
    ///
    /// # Errors
    ///
    /// [`HubError::AlreadyGuessed`], [`HubError::RoundOver`],
    /// [`HubError::GameNotStarted`], [`HubError::NotInRoom`],
    /// [`HubError::NotConnected`], or [`HubError::Rejected`].
    pub async fn send_hangman_guess(&self, letter: char) -> Result<()> {
        if !self.is_connected() {
            return Err(HubError::NotConnected);
        }
        let letter = letter.to_ascii_uppercase();
        let room_id = {
            let state = self.shared.state.read().await;
            let id = state
                .room_id()
                .cloned()
                .ok_or(HubError::NotInRoom)?;
            state.check_hangman_guess(letter)?;
            id
        };
        let ack = self
            .request(ClientMessage::HangmanGuess { room_id, letter })
            .await?;
        if ack.success {
            Ok(())
        } else {
            Err(rejection(ack.error, "failed to submit guess"))
        }
    }

    /// Forward one stroke point to the other players. No reply expected.
    ///
    /// Only meaningful while the game is started and the local player holds
    /// the drawer role; both are checked locally.
    ///
    /// # Errors
    ///
    /// [`HubError::GameNotStarted`], [`HubError::NotDrawer`],
    /// [`HubError::NotInRoom`], or [`HubError::NotConnected`].
    pub async fn send_draw(&self, point: DrawPoint) -> Result<()> {
        if !self.is_connected() {
            return Err(HubError::NotConnected);
        }
        let room_id = {
            let state = self.shared.state.read().await;
            state.check_draw()?;
            state.room_id().cloned().ok_or(HubError::NotInRoom)?
        };
        self.fire(ClientMessage::Draw { room_id, point })
    }

    /// Guess the word in Scribble.
    ///
    /// # Errors
    ///
    /// [`HubError::NotInRoom`], [`HubError::NotConnected`], or
    /// [`HubError::Rejected`].
    pub async fn send_guess(&self, guess: impl Into<String>) -> Result<()> {
        let room_id = self.require_room_id().await?;
        let ack = self
            .request(ClientMessage::Guess {
                room_id,
                guess: guess.into(),
            })
            .await?;
        if ack.success {
            Ok(())
        } else {
            Err(rejection(ack.error, "failed to submit guess"))
        }
    }

    /// Post a plain chat message to the room feed. No reply expected.
    ///
    /// # Errors
    ///
    /// [`HubError::NotInRoom`] or [`HubError::NotConnected`].
    pub async fn send_chat_message(&self, message: impl Into<String>) -> Result<()> {
        let room_id = self.require_room_id().await?;
        self.fire(ClientMessage::ChatMessage {
            room_id,
            message: message.into(),
        })
    }

    /// Clear the local stroke buffer and notify the server so the other
    /// clients converge on an empty canvas.
    ///
    /// The local buffer is truncated even if the notification cannot be
    /// sent.
    ///
    /// # Errors
    ///
    /// [`HubError::NotInRoom`] or [`HubError::NotConnected`].
    pub async fn clear_draw_buffer(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(HubError::NotConnected);
        }
        let room_id = {
            let mut state = self.shared.state.write().await;
            let id = state
                .room_id()
                .cloned()
                .ok_or(HubError::NotInRoom)?;
            state.clear_strokes();
            id
        };
        self.fire(ClientMessage::ClearCanvas { room_id })
    }

    /// Shut down the client, closing the transport and stopping the
    /// background task.
    ///
    /// After calling this method, the event receiver will yield `None` once
    /// the transport loop exits.
    pub async fn shutdown(&mut self) {
        debug!("HubClient: shutdown requested");

        // Signal the transport loop to shut down gracefully.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Await the transport loop with a timeout. If it doesn't exit in
        // time, abort it so the task cannot detach and run indefinitely.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("transport loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("transport loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("transport loop aborted: {join_err}");
                    }
                }
            }
        }

        self.shared.connected.store(false, Ordering::Release);
    }

    // ── Read model ──────────────────────────────────────────────────

    /// Returns `true` if the transport is believed to be connected.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Snapshot of the mirrored session state (room, players, feed, game
    /// views). Cheap enough for per-render use.
    pub async fn session(&self) -> SessionState {
        self.shared.state.read().await.clone()
    }

    /// The identity token currently assigned by the server, if any.
    pub async fn local_player_id(&self) -> Option<PlayerId> {
        self.shared.state.read().await.local_id.clone()
    }

    /// The active room, if any.
    pub async fn current_room(&self) -> Option<Room> {
        self.shared.state.read().await.room.clone()
    }

    /// Whether the local player hosts the active room. Derived from the
    /// current identity token on every call.
    pub async fn is_host(&self) -> bool {
        self.shared.state.read().await.is_host()
    }

    /// Whether the local player is the current drawer. Derived from the
    /// current identity token on every call.
    pub async fn is_drawer(&self) -> bool {
        self.shared.state.read().await.is_drawer()
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Queue a fire-and-forget message to the transport loop.
    fn fire(&self, msg: ClientMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(HubError::NotConnected);
        }
        self.cmd_tx
            .send(Command::Fire(msg))
            .map_err(|_| HubError::NotConnected)
    }

    /// Queue a request and await its single acknowledgement.
    ///
    /// The reply waits indefinitely unless the connection drops, in which
    /// case the pending slot is abandoned and this resolves to
    /// [`HubError::NotConnected`].
    async fn request(&self, msg: ClientMessage) -> Result<AckPayload> {
        if !self.is_connected() {
            return Err(HubError::NotConnected);
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Request {
                msg,
                reply: reply_tx,
            })
            .map_err(|_| HubError::NotConnected)?;
        reply_rx.await.map_err(|_| HubError::NotConnected)
    }

    /// Commit a create/join acknowledgement against the epoch captured at
    /// issue time. A reset in between (leave, teardown) discards the reply
    /// instead of resurrecting the old room.
    async fn commit_room_ack(
        &self,
        ack: AckPayload,
        epoch: u64,
        fallback: &str,
    ) -> Result<Room> {
        if !ack.success {
            return Err(rejection(ack.error, fallback));
        }
        let room = ack
            .room
            .ok_or_else(|| rejection(None, "acknowledgement carried no room"))?;

        let mut state = self.shared.state.write().await;
        if state.epoch == epoch {
            state.seed_room(room.clone(), ack.player_id);
        } else {
            debug!(room = %room.id, "discarding stale room acknowledgement");
        }
        Ok(room)
    }

    /// The active room's id. Connectivity is checked first so a command
    /// issued while disconnected fails with [`HubError::NotConnected`]
    /// rather than [`HubError::NotInRoom`].
    async fn require_room_id(&self) -> Result<String> {
        if !self.is_connected() {
            return Err(HubError::NotConnected);
        }
        self.shared
            .state
            .read()
            .await
            .room_id()
            .cloned()
            .ok_or(HubError::NotInRoom)
    }
}

/// Wrap a server rejection, falling back to a generic message when the
/// server supplied none.
fn rejection(error: Option<String>, fallback: &str) -> HubError {
    HubError::Rejected {
        message: error.unwrap_or_else(|| fallback.to_string()),
    }
}

impl std::fmt::Debug for HubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for HubClient {
    fn drop(&mut self) {
        // `Drop` is synchronous so we cannot await a graceful shutdown.
        // The only safe action is to abort the spawned task, which causes
        // the transport loop future to be dropped immediately. The
        // `shutdown_tx` oneshot is intentionally *not* sent here: sending
        // it would trigger a graceful path that calls async
        // `transport.close()`, but there is no executor context to drive
        // it inside `Drop`.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Why one connected session ended.
enum SessionEnd {
    /// Graceful shutdown was requested.
    Shutdown,
    /// The client handle (and command channel) was dropped.
    CommandChannelClosed,
    /// The transport failed or was closed by the server.
    TransportLost(Option<String>),
}

/// How a dial sequence resolved.
enum DialOutcome<T> {
    Transport(T),
    GaveUp(u32),
    ShutDown,
}

/// Background supervisor: dials the connector, runs the session loop, and
/// reconnects with the bounded fixed-delay policy when the transport drops.
///
/// Exits when:
/// - Graceful shutdown is requested or the client handle is dropped
/// - The configured reconnect attempts for a connect sequence are exhausted
#[allow(clippy::too_many_arguments)]
async fn transport_loop(
    mut connector: impl Connector,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::Sender<HubEvent>,
    shared: Arc<ClientShared>,
    mut shutdown_rx: oneshot::Receiver<()>,
    max_attempts: u32,
    delay: Duration,
) {
    debug!("transport loop started");

    // Outstanding acknowledgement slots, oldest first. Replies are
    // correlated purely by order; the protocol guarantees one reply per
    // request, issued in request order.
    let mut pending: VecDeque<oneshot::Sender<AckPayload>> = VecDeque::new();
    let mut reconnecting = false;

    loop {
        let mut transport = match dial_with_retry(
            &mut connector,
            &mut shutdown_rx,
            &event_tx,
            max_attempts,
            delay,
            reconnecting,
        )
        .await
        {
            DialOutcome::Transport(t) => t,
            DialOutcome::ShutDown => {
                debug!("shutdown requested while connecting");
                return;
            }
            DialOutcome::GaveUp(attempts) => {
                error!("giving up after {attempts} connection attempts");
                // Terminal like Disconnected: delivered via blocking send
                // so the consumer always learns the session is dead.
                if event_tx
                    .send(HubEvent::ReconnectFailed { attempts })
                    .await
                    .is_err()
                {
                    debug!("event channel closed, receiver dropped");
                }
                return;
            }
        };

        shared.connected.store(true, Ordering::Release);
        emit_event(&event_tx, HubEvent::Connected).await;

        let end = run_session(
            &mut transport,
            &mut cmd_rx,
            &event_tx,
            &shared,
            &mut shutdown_rx,
            &mut pending,
        )
        .await;

        match end {
            SessionEnd::Shutdown | SessionEnd::CommandChannelClosed => {
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &shared, Some("client shut down".into())).await;
                pending.clear();
                debug!("transport loop exited");
                return;
            }
            SessionEnd::TransportLost(reason) => {
                emit_disconnected(&event_tx, &shared, reason).await;
                // Abandon in-flight acknowledgement waiters; their oneshot
                // senders drop here and the callers observe NotConnected.
                pending.clear();
                reconnecting = true;
            }
        }
    }
}

/// Dial the connector under the bounded fixed-delay retry policy.
///
/// The very first attempt of the initial connect happens immediately; every
/// other attempt (including the first of a reconnect sequence) waits out
/// the fixed delay first.
async fn dial_with_retry<C: Connector>(
    connector: &mut C,
    shutdown_rx: &mut oneshot::Receiver<()>,
    event_tx: &mpsc::Sender<HubEvent>,
    max_attempts: u32,
    delay: Duration,
    reconnecting: bool,
) -> DialOutcome<C::Transport> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if reconnecting || attempt > 1 {
            tokio::select! {
                _ = &mut *shutdown_rx => return DialOutcome::ShutDown,
                () = tokio::time::sleep(delay) => {}
            }
        }
        if reconnecting {
            emit_event(event_tx, HubEvent::Reconnecting { attempt }).await;
        }
        tokio::select! {
            _ = &mut *shutdown_rx => return DialOutcome::ShutDown,
            result = connector.connect() => match result {
                Ok(transport) => return DialOutcome::Transport(transport),
                Err(e) => {
                    warn!(attempt, max_attempts, "connection attempt failed: {e}");
                    if attempt >= max_attempts {
                        return DialOutcome::GaveUp(attempt);
                    }
                }
            }
        }
    }
}

/// Run one connected session until shutdown, handle drop, or transport
/// loss. Multiplexes outgoing commands and incoming server messages via
/// `tokio::select!`.
async fn run_session(
    transport: &mut impl Transport,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    event_tx: &mpsc::Sender<HubEvent>,
    shared: &ClientShared,
    shutdown_rx: &mut oneshot::Receiver<()>,
    pending: &mut VecDeque<oneshot::Sender<AckPayload>>,
) -> SessionEnd {
    loop {
        tokio::select! {
            // Branch 1: outgoing command from the client handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Fire(msg)) => {
                        if let Err(reason) = send_message(transport, &msg).await {
                            return SessionEnd::TransportLost(reason);
                        }
                    }
                    Some(Command::Request { msg, reply }) => {
                        match send_message(transport, &msg).await {
                            // The slot joins the queue only once the request
                            // is actually on the wire.
                            Ok(true) => pending.push_back(reply),
                            // Serialization failure: the reply sender drops
                            // and the caller observes NotConnected.
                            Ok(false) => {}
                            Err(reason) => return SessionEnd::TransportLost(reason),
                        }
                    }
                    // Command channel closed, client handle dropped.
                    None => {
                        debug!("command channel closed, shutting down transport loop");
                        return SessionEnd::CommandChannelClosed;
                    }
                }
            }

            // Branch 2: shutdown signal
            _ = &mut *shutdown_rx => {
                debug!("shutdown signal received");
                return SessionEnd::Shutdown;
            }

            // Branch 3: incoming message from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        handle_server_text(&text, event_tx, shared, pending).await;
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        return SessionEnd::TransportLost(
                            Some(format!("transport receive error: {e}")),
                        );
                    }
                    // Transport closed by the server.
                    None => {
                        debug!("transport closed by server");
                        return SessionEnd::TransportLost(None);
                    }
                }
            }
        }
    }
}

/// Serialize and send one client message.
///
/// Returns `Ok(true)` when the message went out, `Ok(false)` for a
/// serialization failure (a programming bug; logged, loop survives), and
/// `Err(reason)` when the transport itself failed.
async fn send_message(
    transport: &mut impl Transport,
    msg: &ClientMessage,
) -> std::result::Result<bool, Option<String>> {
    debug!("sending client message: {:?}", std::mem::discriminant(msg));
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("failed to serialize ClientMessage: {e}");
            return Ok(false);
        }
    };
    match transport.send(json).await {
        Ok(()) => Ok(true),
        Err(e) => {
            error!("transport send error: {e}");
            Err(Some(format!("transport send error: {e}")))
        }
    }
}

/// Parse one server message, apply it to the session state, resolve
/// acknowledgement slots, and forward push events to the event channel.
///
/// The state write lock is held across the whole application of one event,
/// so events are committed strictly in arrival order with no interleaving.
async fn handle_server_text(
    text: &str,
    event_tx: &mpsc::Sender<HubEvent>,
    shared: &ClientShared,
    pending: &mut VecDeque<oneshot::Sender<AckPayload>>,
) {
    let msg = match serde_json::from_str::<ServerMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("failed to deserialize server message: {e} (raw: {text})");
            return;
        }
    };

    match msg {
        ServerMessage::Ack(ack) => {
            match pending.pop_front() {
                // The waiter may have given up (e.g. leave_room since); a
                // failed send is fine then.
                Some(reply) => {
                    let _ = reply.send(ack);
                }
                None => warn!("received acknowledgement with no outstanding request"),
            }
        }
        msg => {
            {
                let mut state = shared.state.write().await;
                state.apply(&msg);
            }
            if let Some(event) = HubEvent::from_push(msg) {
                emit_event(event_tx, event).await;
            }
        }
    }
}

/// Emit an event to the event channel. If the channel is full, log a
/// warning and drop the event to avoid blocking the transport loop.
async fn emit_event(event_tx: &mpsc::Sender<HubEvent>, event: HubEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit a [`Disconnected`](HubEvent::Disconnected) event and update state.
///
/// Uses `send().await` (blocking) instead of `try_send` because
/// `Disconnected` must never be silently dropped, even under backpressure.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<HubEvent>,
    shared: &ClientShared,
    reason: Option<String>,
) {
    shared.connected.store(false, Ordering::Release);
    let event = HubEvent::Disconnected { reason };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::Player;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    type Scripted = Option<std::result::Result<String, HubError>>;

    // ── Mock transport / connector ──────────────────────────────────

    /// A mock transport that records sent messages, replays scripted
    /// responses, and then serves messages fed live through a channel.
    struct MockTransport {
        /// Messages that `recv()` yields first, in order. An explicit
        /// `None` entry signals a clean transport close.
        scripted: VecDeque<Scripted>,
        /// Live feed consumed after the script is exhausted.
        live: mpsc::UnboundedReceiver<Scripted>,
        /// Recorded outgoing messages.
        sent: Arc<StdMutex<Vec<String>>>,
        /// Whether `close()` was called.
        closed: Arc<AtomicBool>,
    }

    struct MockHandles {
        feed: mpsc::UnboundedSender<Scripted>,
        sent: Arc<StdMutex<Vec<String>>>,
        #[allow(dead_code)]
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(scripted: Vec<Scripted>) -> (Self, MockHandles) {
            let (feed_tx, feed_rx) = mpsc::unbounded_channel();
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                scripted: VecDeque::from(scripted),
                live: feed_rx,
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (
                transport,
                MockHandles {
                    feed: feed_tx,
                    sent,
                    closed,
                },
            )
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), HubError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Scripted {
            if let Some(item) = self.scripted.pop_front() {
                return item;
            }
            match self.live.recv().await {
                Some(item) => item,
                // Feed dropped without a scripted close: hang forever so
                // the loop stays alive until shutdown.
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> std::result::Result<(), HubError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    /// Connector handing out pre-built transports, one per attempt.
    struct MockConnector {
        transports: VecDeque<MockTransport>,
    }

    impl MockConnector {
        fn new(transports: Vec<MockTransport>) -> Self {
            Self {
                transports: VecDeque::from(transports),
            }
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Transport = MockTransport;

        async fn connect(&mut self) -> std::result::Result<MockTransport, HubError> {
            self.transports.pop_front().ok_or_else(|| {
                HubError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "no more scripted transports",
                ))
            })
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn welcome_json(player_id: &str) -> String {
        serde_json::to_string(&ServerMessage::Welcome {
            player_id: player_id.into(),
        })
        .unwrap()
    }

    fn ack_json(ack: &AckPayload) -> String {
        serde_json::to_string(&ServerMessage::Ack(ack.clone())).unwrap()
    }

    fn test_room(id: &str, host: &str) -> Room {
        Room {
            id: id.into(),
            name: "Fun".into(),
            host_id: host.into(),
            game_type: GameType::Hangman,
            players: vec![Player {
                id: host.into(),
                name: "Ann".into(),
                score: 0,
            }],
            game_started: false,
            current_word: None,
            drawer_id: None,
            round: 0,
            total_rounds: 3,
            time_left: 0,
        }
    }

    fn fast_config() -> HubConfig {
        HubConfig::default()
            .with_reconnect_attempts(3)
            .with_reconnect_delay(Duration::from_millis(5))
    }

    /// Start a client over a single mock transport scripted with `welcome`
    /// plus the given extra messages.
    fn start_single(extra: Vec<Scripted>) -> (HubClient, mpsc::Receiver<HubEvent>, MockHandles) {
        let mut scripted = vec![Some(Ok(welcome_json("p1")))];
        scripted.extend(extra);
        let (transport, handles) = MockTransport::new(scripted);
        let connector = MockConnector::new(vec![transport]);
        let (client, events) = HubClient::start(connector, fast_config());
        (client, events, handles)
    }

    /// Consume events up to and including the `Welcome` handshake.
    async fn drain_until_welcome(rx: &mut mpsc::Receiver<HubEvent>) {
        let ev = rx.recv().await.expect("expected Connected event");
        assert!(matches!(ev, HubEvent::Connected), "got {ev:?}");
        let ev = rx.recv().await.expect("expected Welcome event");
        assert!(matches!(ev, HubEvent::Welcome { .. }), "got {ev:?}");
    }

    /// Poll until at least `count` messages were sent, or panic.
    async fn wait_for_sent(sent: &Arc<StdMutex<Vec<String>>>, count: usize) {
        for _ in 0..200 {
            if sent.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {count} sent messages");
    }

    // ── Config ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn config_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.reconnect_attempts, 10);
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn config_builder_methods() {
        let config = HubConfig::default()
            .with_reconnect_attempts(4)
            .with_reconnect_delay(Duration::from_millis(250))
            .with_event_channel_capacity(512)
            .with_shutdown_timeout(Duration::from_secs(5));
        assert_eq!(config.reconnect_attempts, 4);
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.event_channel_capacity, 512);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn event_channel_capacity_is_clamped_to_one() {
        let config = HubConfig::default().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    // ── Handshake / identity ────────────────────────────────────────

    #[tokio::test]
    async fn welcome_assigns_identity() {
        let (mut client, mut events, _handles) = start_single(vec![]);

        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, HubEvent::Connected));
        let ev = events.recv().await.unwrap();
        if let HubEvent::Welcome { player_id } = ev {
            assert_eq!(player_id, "p1");
        } else {
            panic!("expected Welcome, got {ev:?}");
        }

        assert!(client.is_connected());
        assert_eq!(client.local_player_id().await.as_deref(), Some("p1"));

        client.shutdown().await;
    }

    // ── Request/acknowledgement flow ────────────────────────────────

    #[tokio::test]
    async fn create_room_seeds_state() {
        let (mut client, mut events, handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        // Resolve the ack only after the request actually went out.
        let sent = Arc::clone(&handles.sent);
        let feed = handles.feed.clone();
        tokio::spawn(async move {
            wait_for_sent(&sent, 1).await;
            let ack = AckPayload {
                success: true,
                room: Some(test_room("ABC123", "p1")),
                player_id: Some("p1".into()),
                error: None,
            };
            feed.send(Some(Ok(ack_json(&ack)))).unwrap();
        });

        let room = client
            .create_room("Fun", "Ann", GameType::Hangman)
            .await
            .unwrap();
        assert_eq!(room.id, "ABC123");

        let session = client.session().await;
        assert_eq!(session.room_id().map(String::as_str), Some("ABC123"));
        assert!(session.is_host());
        assert_eq!(session.players.len(), 1);
        assert!(session.messages.is_empty());

        // The request on the wire was a create-room message.
        let first: ClientMessage =
            serde_json::from_str(&handles.sent.lock().unwrap()[0]).unwrap();
        assert!(matches!(first, ClientMessage::CreateRoom { .. }));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn rejected_request_surfaces_server_error_verbatim() {
        let (mut client, mut events, handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        let sent = Arc::clone(&handles.sent);
        let feed = handles.feed.clone();
        tokio::spawn(async move {
            wait_for_sent(&sent, 1).await;
            let ack = AckPayload {
                success: false,
                room: None,
                player_id: None,
                error: Some("Room is full".into()),
            };
            feed.send(Some(Ok(ack_json(&ack)))).unwrap();
        });

        let err = client.join_room("ABC123", "Bob").await.unwrap_err();
        match err {
            HubError::Rejected { message } => assert_eq!(message, "Room is full"),
            other => panic!("expected Rejected, got {other:?}"),
        }
        // State untouched by the failure.
        assert!(client.session().await.room.is_none());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn acks_resolve_in_fifo_order() {
        let (mut client, mut events, handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        // Seed a room so start_game and send_guess have a target.
        let room_updated = serde_json::to_string(&ServerMessage::RoomUpdated(test_room(
            "ABC123", "p1",
        )))
        .unwrap();
        handles.feed.send(Some(Ok(room_updated))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Issue two requests, then answer them in order: reject the first,
        // accept the second.
        let sent = Arc::clone(&handles.sent);
        let feed = handles.feed.clone();
        tokio::spawn(async move {
            wait_for_sent(&sent, 2).await;
            feed.send(Some(Ok(ack_json(&AckPayload {
                success: false,
                room: None,
                player_id: None,
                error: Some("not the host".into()),
            }))))
            .unwrap();
            feed.send(Some(Ok(ack_json(&AckPayload {
                success: true,
                room: None,
                player_id: None,
                error: None,
            }))))
            .unwrap();
        });

        let (first, second) = tokio::join!(client.start_game(), client.send_guess("crane"));
        assert!(matches!(first, Err(HubError::Rejected { .. })));
        assert!(second.is_ok());

        client.shutdown().await;
    }

    // ── leave_room / stale acks ─────────────────────────────────────

    #[tokio::test]
    async fn leave_room_resets_everything_and_notifies() {
        let (mut client, mut events, handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        let room_updated = serde_json::to_string(&ServerMessage::RoomUpdated(test_room(
            "ABC123", "p1",
        )))
        .unwrap();
        handles.feed.send(Some(Ok(room_updated))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.current_room().await.is_some());

        client.leave_room().await;

        let session = client.session().await;
        assert!(session.room.is_none());
        assert!(session.players.is_empty());
        assert!(session.messages.is_empty());
        assert!(!session.is_host());
        assert!(!session.is_drawer());

        wait_for_sent(&handles.sent, 1).await;
        let last: ClientMessage =
            serde_json::from_str(handles.sent.lock().unwrap().last().unwrap()).unwrap();
        assert!(matches!(last, ClientMessage::LeaveRoom));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn late_ack_after_leave_is_discarded() {
        let (client, mut events, handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        let client = Arc::new(client);
        let create_client = Arc::clone(&client);
        let create = tokio::spawn(async move {
            create_client
                .create_room("Fun", "Ann", GameType::Hangman)
                .await
        });

        // Let the request hit the wire, then leave before the ack arrives.
        wait_for_sent(&handles.sent, 1).await;
        client.leave_room().await;

        let ack = AckPayload {
            success: true,
            room: Some(test_room("OLD999", "p1")),
            player_id: Some("p1".into()),
            error: None,
        };
        handles.feed.send(Some(Ok(ack_json(&ack)))).unwrap();

        // The caller still sees its room, but the stale reply must not
        // resurrect the session state the leave already cleared.
        let room = create.await.unwrap().unwrap();
        assert_eq!(room.id, "OLD999");
        let session = client.session().await;
        assert!(session.room.is_none());
        assert!(session.players.is_empty());

        let mut client = match Arc::try_unwrap(client) {
            Ok(client) => client,
            Err(_) => panic!("client still shared"),
        };
        client.shutdown().await;
    }

    // ── Disconnect / fail-fast ──────────────────────────────────────

    #[tokio::test]
    async fn not_connected_error_after_shutdown() {
        let (mut client, mut events, _handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        client.shutdown().await;

        let result = client.send_chat_message("hello");
        assert!(matches!(result.await, Err(HubError::NotConnected)));
    }

    #[tokio::test]
    async fn disconnected_commands_report_connectivity_not_room_absence() {
        let (mut client, mut events, _handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        // No room was ever joined; after shutdown the connectivity error
        // must win over the missing-room one.
        client.shutdown().await;

        let err = client.start_game().await;
        assert!(matches!(err, Err(HubError::NotConnected)));
        let err = client.send_hangman_guess('a').await;
        assert!(matches!(err, Err(HubError::NotConnected)));
        let err = client
            .send_draw(DrawPoint {
                x: 1.0,
                y: 2.0,
                color: "#000000".to_string(),
                width: 3.0,
            })
            .await;
        assert!(matches!(err, Err(HubError::NotConnected)));
        let err = client.send_guess("crane").await;
        assert!(matches!(err, Err(HubError::NotConnected)));
        let err = client.clear_draw_buffer().await;
        assert!(matches!(err, Err(HubError::NotConnected)));
    }

    #[tokio::test]
    async fn transport_error_fails_pending_request() {
        let (mut client, mut events, handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        let sent = Arc::clone(&handles.sent);
        let feed = handles.feed.clone();
        tokio::spawn(async move {
            wait_for_sent(&sent, 1).await;
            feed.send(Some(Err(HubError::TransportReceive("boom".into()))))
                .unwrap();
        });

        // The ack never arrives; the transport drops instead.
        let err = client
            .create_room("Fun", "Ann", GameType::Hangman)
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::NotConnected));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn reconnect_assigns_fresh_identity() {
        let (transport_a, _handles_a) = MockTransport::new(vec![
            Some(Ok(welcome_json("old-id"))),
            Some(Err(HubError::TransportReceive("boom".into()))),
        ]);
        let (transport_b, _handles_b) = MockTransport::new(vec![Some(Ok(welcome_json("new-id")))]);
        let connector = MockConnector::new(vec![transport_a, transport_b]);
        let (mut client, mut events) = HubClient::start(connector, fast_config());

        drain_until_welcome(&mut events).await; // Connected + Welcome(old-id)

        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, HubEvent::Disconnected { .. }), "got {ev:?}");
        let ev = events.recv().await.unwrap();
        assert!(
            matches!(ev, HubEvent::Reconnecting { attempt: 1 }),
            "got {ev:?}"
        );
        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, HubEvent::Connected), "got {ev:?}");
        let ev = events.recv().await.unwrap();
        if let HubEvent::Welcome { player_id } = ev {
            assert_eq!(player_id, "new-id");
        } else {
            panic!("expected Welcome, got {ev:?}");
        }

        assert_eq!(client.local_player_id().await.as_deref(), Some("new-id"));
        assert!(client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn reconnect_exhaustion_reports_failure() {
        let connector = MockConnector::new(vec![]);
        let config = HubConfig::default()
            .with_reconnect_attempts(2)
            .with_reconnect_delay(Duration::from_millis(5));
        let (mut client, mut events) = HubClient::start(connector, config);

        let ev = events.recv().await.unwrap();
        if let HubEvent::ReconnectFailed { attempts } = ev {
            assert_eq!(attempts, 2);
        } else {
            panic!("expected ReconnectFailed, got {ev:?}");
        }
        // Loop exited; channel closes.
        assert!(events.recv().await.is_none());
        assert!(!client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn stale_room_state_survives_disconnect() {
        let (transport_a, handles_a) = MockTransport::new(vec![Some(Ok(welcome_json("p1")))]);
        let (transport_b, _handles_b) = MockTransport::new(vec![Some(Ok(welcome_json("p2")))]);
        let connector = MockConnector::new(vec![transport_a, transport_b]);
        let (mut client, mut events) = HubClient::start(connector, fast_config());
        drain_until_welcome(&mut events).await;

        let room_updated = serde_json::to_string(&ServerMessage::RoomUpdated(test_room(
            "ABC123", "p1",
        )))
        .unwrap();
        handles_a.feed.send(Some(Ok(room_updated))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Kill the first transport: room state must be preserved as stale.
        handles_a
            .feed
            .send(Some(Err(HubError::TransportReceive("gone".into()))))
            .unwrap();
        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, HubEvent::RoomUpdated { .. }), "got {ev:?}");
        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, HubEvent::Disconnected { .. }), "got {ev:?}");

        assert!(client.current_room().await.is_some());

        client.shutdown().await;
    }

    // ── Local guards ────────────────────────────────────────────────

    #[tokio::test]
    async fn hangman_guess_guarded_before_game_start() {
        let (mut client, mut events, handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        // No room at all.
        let err = client.send_hangman_guess('A').await.unwrap_err();
        assert!(matches!(err, HubError::NotInRoom));

        // Room present but game not started.
        let room_updated = serde_json::to_string(&ServerMessage::RoomUpdated(test_room(
            "ABC123", "p1",
        )))
        .unwrap();
        handles.feed.send(Some(Ok(room_updated))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = client.send_hangman_guess('A').await.unwrap_err();
        assert!(matches!(err, HubError::GameNotStarted));
        // Nothing went over the wire for either guard.
        assert!(handles.sent.lock().unwrap().is_empty());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn draw_requires_drawer_role() {
        let (mut client, mut events, handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        let mut room = test_room("ABC123", "p1");
        room.game_started = true;
        room.game_type = GameType::Scribble;
        room.drawer_id = Some("someone-else".into());
        let room_updated = serde_json::to_string(&ServerMessage::RoomUpdated(room)).unwrap();
        handles.feed.send(Some(Ok(room_updated))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let point = DrawPoint {
            x: 1.0,
            y: 2.0,
            color: "#000".into(),
            width: 2.0,
        };
        let err = client.send_draw(point).await.unwrap_err();
        assert!(matches!(err, HubError::NotDrawer));
        assert!(handles.sent.lock().unwrap().is_empty());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn clear_draw_buffer_truncates_and_notifies() {
        let (mut client, mut events, handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        let mut room = test_room("ABC123", "p1");
        room.game_started = true;
        room.game_type = GameType::Scribble;
        room.drawer_id = Some("p1".into());
        let room_updated = serde_json::to_string(&ServerMessage::RoomUpdated(room)).unwrap();
        handles.feed.send(Some(Ok(room_updated))).unwrap();
        let draw = serde_json::to_string(&ServerMessage::Draw(DrawPoint {
            x: 3.0,
            y: 4.0,
            color: "#f00".into(),
            width: 1.0,
        }))
        .unwrap();
        handles.feed.send(Some(Ok(draw))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(client.session().await.scribble.strokes.len(), 1);

        client.clear_draw_buffer().await.unwrap();
        assert!(client.session().await.scribble.strokes.is_empty());

        wait_for_sent(&handles.sent, 1).await;
        let last: ClientMessage =
            serde_json::from_str(handles.sent.lock().unwrap().last().unwrap()).unwrap();
        assert!(matches!(last, ClientMessage::ClearCanvas { .. }));

        client.shutdown().await;
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    #[tokio::test]
    async fn shutdown_emits_disconnected() {
        let (mut client, mut events, handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        client.shutdown().await;

        let event = events.recv().await.unwrap();
        assert!(matches!(event, HubEvent::Disconnected { .. }));
        if let HubEvent::Disconnected { reason } = event {
            assert_eq!(reason.as_deref(), Some("client shut down"));
        }
        assert!(handles.closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let (mut client, mut events, _handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        client.shutdown().await;
        client.shutdown().await; // should not panic
    }

    #[tokio::test]
    async fn drop_without_explicit_shutdown() {
        let (client, mut events, _handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        drop(client);

        // The transport loop is aborted; the event channel closes. Drain
        // whatever remains and verify we neither hang nor panic.
        while let Some(_event) = events.recv().await {}
    }

    #[tokio::test]
    async fn event_channel_backpressure_does_not_block() {
        let mut scripted: Vec<Scripted> = vec![Some(Ok(welcome_json("p1")))];
        let tick = serde_json::to_string(&ServerMessage::TimerUpdate {
            time_left: Some(30),
        })
        .unwrap();
        for _ in 0..20 {
            scripted.push(Some(Ok(tick.clone())));
        }
        scripted.push(None);
        let (transport, _handles) = MockTransport::new(scripted);
        let connector = MockConnector::new(vec![transport]);
        let config = fast_config()
            .with_reconnect_attempts(1)
            .with_event_channel_capacity(1);
        let (mut client, mut events) = HubClient::start(connector, config);

        // Let the single-slot channel fill and overflow.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut count = 0;
        while let Some(_event) = events.recv().await {
            count += 1;
        }
        // Some events were dropped, but the terminal ones still arrived.
        assert!(count >= 2, "expected at least 2 events, got {count}");
        assert!(
            count < 23,
            "expected backpressure to drop some events, but got all {count}"
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let (mut client, mut events, _handles) = start_single(vec![]);
        drain_until_welcome(&mut events).await;

        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("HubClient"));
        assert!(debug_str.contains("connected"));

        client.shutdown().await;
    }
}
