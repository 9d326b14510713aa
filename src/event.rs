//! Typed events delivered to the presentation layer.
//!
//! [`HubEvent`] is what the event receiver returned by
//! [`HubClient::start`](crate::HubClient::start) yields: every server push,
//! plus synthetic connection-lifecycle events the transport itself cannot
//! express. Events arrive strictly in the order the server sent them; the
//! matching state transition has already been applied to the shared
//! [`SessionState`](crate::SessionState) by the time an event is delivered,
//! so a renderer may either consume the payload directly or just re-read
//! the snapshot.

use crate::protocol::{
    ChatMessage, DrawPoint, GameStartedPayload, Player, PlayerId, Room, ServerMessage,
};

/// Events emitted by the client's background transport loop.
#[derive(Debug, Clone)]
pub enum HubEvent {
    /// The physical connection was established (synthetic; emitted before
    /// any server message, including after a successful reconnect).
    Connected,
    /// The server assigned this connection's identity token. Role checks
    /// must re-derive from this token, never from a cached one.
    Welcome {
        player_id: PlayerId,
    },
    /// The connection dropped or was shut down. Always delivered, even
    /// under event-channel backpressure.
    Disconnected {
        reason: Option<String>,
    },
    /// An automatic reconnection attempt is about to be made.
    Reconnecting {
        attempt: u32,
    },
    /// Automatic reconnection gave up after the configured attempts.
    /// Not fatal: the session stays visibly disconnected.
    ReconnectFailed {
        attempts: u32,
    },

    // ── Server pushes ───────────────────────────────────────────────
    PlayerJoined {
        players: Vec<Player>,
        player_name: Option<String>,
    },
    PlayerLeft {
        players: Vec<Player>,
        player_name: Option<String>,
    },
    NewHost {
        host_id: PlayerId,
    },
    /// The game started (boxed to reduce enum size).
    GameStarted(Box<GameStartedPayload>),
    TimerUpdate {
        time_left: Option<u32>,
    },
    Draw {
        point: DrawPoint,
    },
    NewMessage {
        message: ChatMessage,
    },
    CorrectGuess {
        player_name: String,
        score: u32,
    },
    HangmanUpdate {
        guessed_letters: Vec<char>,
        is_correct: bool,
    },
    HangmanRoundOver {
        word: String,
        winner: Option<Player>,
    },
    NextRound {
        round: u32,
    },
    GameOver {
        winner: Option<Player>,
    },
    RoomUpdated {
        room: Room,
    },
}

impl HubEvent {
    /// Convert a server push into its presentation event.
    ///
    /// Returns `None` for `ack` messages, which are consumed by the
    /// request path and never surface as events.
    pub(crate) fn from_push(msg: ServerMessage) -> Option<Self> {
        let event = match msg {
            ServerMessage::Ack(_) => return None,
            ServerMessage::Welcome { player_id } => Self::Welcome { player_id },
            ServerMessage::PlayerJoined {
                players,
                player_name,
                ..
            } => Self::PlayerJoined {
                players,
                player_name,
            },
            ServerMessage::PlayerLeft {
                players,
                player_name,
                ..
            } => Self::PlayerLeft {
                players,
                player_name,
            },
            ServerMessage::NewHost { host_id } => Self::NewHost { host_id },
            ServerMessage::GameStarted(payload) => Self::GameStarted(payload),
            ServerMessage::TimerUpdate { time_left } => Self::TimerUpdate { time_left },
            ServerMessage::Draw(point) => Self::Draw { point },
            ServerMessage::NewMessage(message) => Self::NewMessage { message },
            ServerMessage::CorrectGuess {
                player_name, score, ..
            } => Self::CorrectGuess { player_name, score },
            ServerMessage::HangmanUpdate {
                guessed_letters,
                is_correct,
                ..
            } => Self::HangmanUpdate {
                guessed_letters,
                is_correct,
            },
            ServerMessage::HangmanRoundOver { word, winner, .. } => {
                Self::HangmanRoundOver { word, winner }
            }
            ServerMessage::NextRound { round, .. } => Self::NextRound { round },
            ServerMessage::GameOver { winner, .. } => Self::GameOver { winner },
            ServerMessage::RoomUpdated(room) => Self::RoomUpdated { room },
        };
        Some(event)
    }
}
