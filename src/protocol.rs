//! Wire types for the Mini Games Hub realtime session protocol.
//!
//! Every message is an internally tagged JSON object, `{"type": "...",
//! "data": ...}`, with kebab-case message names and camelCase field names to
//! match the server exactly. Requests are answered by at most one `ack`
//! message each; everything else the server sends is an unsolicited push
//! event reflecting authoritative state.

use serde::{Deserialize, Serialize};

// ── Type aliases ────────────────────────────────────────────────────

/// Server-assigned identifier for a connection/player (opaque string).
pub type PlayerId = String;

/// Short room code identifying a game session.
pub type RoomId = String;

// ── Enums ───────────────────────────────────────────────────────────

/// Which of the two hub games a room is running.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    /// Turn-free letter guessing against a hidden word.
    Hangman,
    /// One player draws, the others guess the word.
    Scribble,
}

// ── Structs ─────────────────────────────────────────────────────────

/// A participant in the current room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub score: u32,
}

/// A chat or guess-feed entry. Append-only; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub player_id: PlayerId,
    pub player_name: String,
    pub message: String,
    /// Set on synthesized correct-guess entries in the Scribble feed.
    #[serde(default)]
    pub is_correct: bool,
}

/// One stroke point received from (or sent by) the drawer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DrawPoint {
    pub x: f32,
    pub y: f32,
    pub color: String,
    pub width: f32,
}

/// Authoritative snapshot of a game session.
///
/// Rooms are replaced wholesale by `game-started` / `room-updated` pushes;
/// the client never merges partial room state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub host_id: PlayerId,
    pub game_type: GameType,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub game_started: bool,
    #[serde(default)]
    pub current_word: Option<String>,
    /// Player id of the current drawer (Scribble only). The wire name is
    /// `isDrawer` for compatibility with the existing server.
    #[serde(default, rename = "isDrawer")]
    pub drawer_id: Option<PlayerId>,
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub total_rounds: u32,
    #[serde(default)]
    pub time_left: u32,
}

// ── Payload structs ─────────────────────────────────────────────────

/// Reply to a client request. Correlated to its request by arrival order:
/// the server answers requests strictly in the order they were issued, with
/// exactly one `ack` per request that expects one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload for the `game-started` push.
/// Boxed in [`ServerMessage`] to reduce enum size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartedPayload {
    pub room: Room,
    pub word: String,
    pub round: u32,
    #[serde(default)]
    pub time_left: u32,
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Create a new room and become its host. Answered by one ack.
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        room_name: String,
        player_name: String,
        game_type: GameType,
    },
    /// Join an existing room by its code. Answered by one ack.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        player_name: String,
    },
    /// Leave the current room. No reply expected.
    LeaveRoom,
    /// Host-only request to start the game. Answered by one ack; the actual
    /// transition arrives as a `game-started` push.
    #[serde(rename_all = "camelCase")]
    StartGame { room_id: RoomId },
    /// Guess a letter in Hangman. The ack is informational only; resulting
    /// state arrives via `hangman-update`.
    #[serde(rename_all = "camelCase")]
    HangmanGuess { room_id: RoomId, letter: char },
    /// Forward one stroke point to the other clients. No reply expected.
    #[serde(rename_all = "camelCase")]
    Draw { room_id: RoomId, point: DrawPoint },
    /// Guess the word in Scribble. Answered by one ack.
    #[serde(rename_all = "camelCase")]
    Guess { room_id: RoomId, guess: String },
    /// Post a plain chat message to the room feed. No reply expected.
    #[serde(rename_all = "camelCase")]
    ChatMessage { room_id: RoomId, message: String },
    /// Wipe the shared canvas so all clients converge on an empty stroke
    /// buffer. No reply expected.
    #[serde(rename_all = "camelCase")]
    ClearCanvas { room_id: RoomId },
}

/// Message types sent from server to client.
///
/// Driftable fields carry `#[serde(default)]` so a payload missing an
/// expected field produces a safe partial update instead of a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Reply to the oldest outstanding request.
    Ack(AckPayload),
    /// Handshake: the server's identity assignment for this connection.
    /// Sent once after every successful (re)connect; the token is not
    /// stable across reconnects.
    #[serde(rename_all = "camelCase")]
    Welcome { player_id: PlayerId },
    /// A player joined; `players` is the authoritative new list.
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        players: Vec<Player>,
        #[serde(default)]
        player_id: Option<PlayerId>,
        #[serde(default)]
        player_name: Option<String>,
    },
    /// A player left; `players` is the authoritative new list.
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        players: Vec<Player>,
        #[serde(default)]
        player_id: Option<PlayerId>,
        #[serde(default)]
        player_name: Option<String>,
    },
    /// Host migrated after the previous host left.
    #[serde(rename_all = "camelCase")]
    NewHost { host_id: PlayerId },
    /// The game started (boxed to reduce enum size).
    GameStarted(Box<GameStartedPayload>),
    /// Server-driven countdown tick.
    #[serde(rename_all = "camelCase")]
    TimerUpdate {
        #[serde(default)]
        time_left: Option<u32>,
    },
    /// One stroke point from the current drawer.
    Draw(DrawPoint),
    /// A chat or guess-feed entry from another player.
    NewMessage(ChatMessage),
    /// A player guessed the Scribble word; carries the awarded score.
    #[serde(rename_all = "camelCase")]
    CorrectGuess {
        player_id: PlayerId,
        player_name: String,
        score: u32,
        #[serde(default)]
        word: Option<String>,
    },
    /// Result of a Hangman letter guess, for all players in the room.
    #[serde(rename_all = "camelCase")]
    HangmanUpdate {
        guessed_letters: Vec<char>,
        /// Server-side count; mirrored for debugging but the client keeps
        /// its own counter driven by `is_correct` (see the reducer).
        #[serde(default)]
        wrong_guesses: u32,
        #[serde(default)]
        player_id: Option<PlayerId>,
        #[serde(default)]
        player_name: Option<String>,
        #[serde(default)]
        letter: Option<char>,
        is_correct: bool,
    },
    /// A Hangman round ended, revealing the word.
    #[serde(rename_all = "camelCase")]
    HangmanRoundOver {
        word: String,
        #[serde(default)]
        winner: Option<Player>,
        #[serde(default)]
        round: u32,
        #[serde(default)]
        total_rounds: u32,
    },
    /// Round transition: new word, cleared per-round state.
    #[serde(rename_all = "camelCase")]
    NextRound {
        round: u32,
        word: String,
        #[serde(default)]
        time_left: Option<u32>,
    },
    /// The game ended; `scores` is the final player list.
    #[serde(rename_all = "camelCase")]
    GameOver {
        #[serde(default)]
        winner: Option<Player>,
        #[serde(default)]
        scores: Vec<Player>,
    },
    /// Catch-all resync: replace the room and player list wholesale.
    RoomUpdated(Room),
}

impl ServerMessage {
    /// Returns `true` for unsolicited push events (everything except `ack`).
    pub fn is_push(&self) -> bool {
        !matches!(self, Self::Ack(_))
    }
}
