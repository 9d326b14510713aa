#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for Mini Games Client integration tests.
//!
//! Provides a channel-based [`MockTransport`], a [`MockConnector`] that
//! hands out one transport per connection attempt, and helper functions for
//! constructing common server message JSON strings.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use mini_games_client::protocol::{AckPayload, GameStartedPayload, ServerMessage};
use mini_games_client::{
    ChatMessage, Connector, DrawPoint, GameType, HubError, Player, Room, Transport,
};

pub type Scripted = Option<Result<String, HubError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// A mock transport for integration testing.
///
/// Scripted server responses are consumed in order by `recv()`; once the
/// script is exhausted, messages fed live through the [`MockHandles::feed`]
/// channel are served. All messages sent by the client are recorded.
pub struct MockTransport {
    /// Scripted server responses (consumed in order by `recv`). An explicit
    /// `None` entry signals a clean transport close.
    scripted: VecDeque<Scripted>,
    /// Live feed consumed after the script is exhausted.
    live: mpsc::UnboundedReceiver<Scripted>,
    /// Recorded outgoing messages from the client.
    sent: Arc<StdMutex<Vec<String>>>,
    /// Whether `close()` has been called.
    closed: Arc<AtomicBool>,
}

/// Inspection and live-feed handles for a [`MockTransport`].
pub struct MockHandles {
    /// Feed messages to `recv()` after the script is exhausted.
    pub feed: mpsc::UnboundedSender<Scripted>,
    /// Recorded outgoing messages.
    pub sent: Arc<StdMutex<Vec<String>>>,
    /// Whether `close()` has been called.
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a new mock transport with the given scripted incoming
    /// messages, plus handles for feeding and inspecting it.
    pub fn new(scripted: Vec<Scripted>) -> (Self, MockHandles) {
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
    async fn send(&mut self, message: String) -> Result<(), HubError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Scripted {
        if let Some(item) = self.scripted.pop_front() {
            return item;
        }
        match self.live.recv().await {
            Some(item) => item,
            // Feed dropped without a scripted close: hang forever so the
            // transport loop stays alive until shutdown is called.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), HubError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// A connector handing out pre-built transports, one per connection
/// attempt. Once the queue is empty, every attempt fails.
pub struct MockConnector {
    transports: VecDeque<MockTransport>,
}

impl MockConnector {
    pub fn new(transports: Vec<MockTransport>) -> Self {
        Self {
            transports: VecDeque::from(transports),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&mut self) -> Result<MockTransport, HubError> {
        self.transports.pop_front().ok_or_else(|| {
            HubError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no more scripted transports",
            ))
        })
    }
}

// ── Fixture builders ────────────────────────────────────────────────

/// A player with the given id and name and zero score.
pub fn player(id: &str, name: &str) -> Player {
    Player {
        id: id.into(),
        name: name.into(),
        score: 0,
    }
}

/// A waiting Hangman room hosted by `host` with that single player inside.
pub fn hangman_room(id: &str, host: &str) -> Room {
    Room {
        id: id.into(),
        name: "Fun".into(),
        host_id: host.into(),
        game_type: GameType::Hangman,
        players: vec![player(host, "Ann")],
        game_started: false,
        current_word: None,
        drawer_id: None,
        round: 0,
        total_rounds: 3,
        time_left: 0,
    }
}

/// A waiting Scribble room hosted by `host`, with `drawer` as the current
/// drawer.
pub fn scribble_room(id: &str, host: &str, drawer: &str) -> Room {
    Room {
        id: id.into(),
        name: "Doodles".into(),
        host_id: host.into(),
        game_type: GameType::Scribble,
        players: vec![player(host, "Ann"), player("p2", "Bob")],
        game_started: false,
        current_word: None,
        drawer_id: Some(drawer.into()),
        round: 0,
        total_rounds: 3,
        time_left: 0,
    }
}

pub fn draw_point(x: f32, y: f32) -> DrawPoint {
    DrawPoint {
        x,
        y,
        color: "#000000".into(),
        width: 3.0,
    }
}

// ── JSON helper functions ───────────────────────────────────────────

fn to_json(msg: &ServerMessage) -> String {
    serde_json::to_string(msg).expect("server message serialization")
}

/// Returns the JSON string for a `welcome` handshake message.
pub fn welcome_json(player_id: &str) -> String {
    to_json(&ServerMessage::Welcome {
        player_id: player_id.into(),
    })
}

/// Returns the JSON string for a successful `ack` carrying a room.
pub fn ack_room_json(room: Room, player_id: &str) -> String {
    to_json(&ServerMessage::Ack(AckPayload {
        success: true,
        room: Some(room),
        player_id: Some(player_id.into()),
        error: None,
    }))
}

/// Returns the JSON string for a successful `ack` with no payload.
pub fn ack_ok_json() -> String {
    to_json(&ServerMessage::Ack(AckPayload {
        success: true,
        room: None,
        player_id: None,
        error: None,
    }))
}

/// Returns the JSON string for a rejected `ack` with the given reason.
pub fn ack_error_json(error: &str) -> String {
    to_json(&ServerMessage::Ack(AckPayload {
        success: false,
        room: None,
        player_id: None,
        error: Some(error.into()),
    }))
}

/// Returns the JSON string for a `room-updated` push.
pub fn room_updated_json(room: Room) -> String {
    to_json(&ServerMessage::RoomUpdated(room))
}

/// Returns the JSON string for a `game-started` push.
pub fn game_started_json(mut room: Room, word: &str, round: u32, time_left: u32) -> String {
    room.game_started = true;
    room.round = round;
    to_json(&ServerMessage::GameStarted(Box::new(GameStartedPayload {
        room,
        word: word.into(),
        round,
        time_left,
    })))
}

/// Returns the JSON string for a `player-joined` push with the
/// authoritative new player list.
pub fn player_joined_json(players: Vec<Player>, joined: &Player) -> String {
    to_json(&ServerMessage::PlayerJoined {
        players,
        player_id: Some(joined.id.clone()),
        player_name: Some(joined.name.clone()),
    })
}

/// Returns the JSON string for a `player-left` push with the authoritative
/// new player list.
pub fn player_left_json(players: Vec<Player>, left: &Player) -> String {
    to_json(&ServerMessage::PlayerLeft {
        players,
        player_id: Some(left.id.clone()),
        player_name: Some(left.name.clone()),
    })
}

/// Returns the JSON string for a `hangman-update` push.
pub fn hangman_update_json(
    guessed: &[char],
    letter: char,
    is_correct: bool,
    by: &Player,
) -> String {
    to_json(&ServerMessage::HangmanUpdate {
        guessed_letters: guessed.to_vec(),
        wrong_guesses: 0,
        player_id: Some(by.id.clone()),
        player_name: Some(by.name.clone()),
        letter: Some(letter),
        is_correct,
    })
}

/// Returns the JSON string for a `timer-update` push.
pub fn timer_update_json(time_left: Option<u32>) -> String {
    to_json(&ServerMessage::TimerUpdate { time_left })
}

/// Returns the JSON string for a `draw` push.
pub fn draw_json(point: DrawPoint) -> String {
    to_json(&ServerMessage::Draw(point))
}

/// Returns the JSON string for a `new-message` push.
pub fn new_message_json(id: &str, from: &Player, text: &str) -> String {
    to_json(&ServerMessage::NewMessage(ChatMessage {
        id: id.into(),
        player_id: from.id.clone(),
        player_name: from.name.clone(),
        message: text.into(),
        is_correct: false,
    }))
}

/// Returns the JSON string for a `correct-guess` push.
pub fn correct_guess_json(by: &Player, score: u32, word: Option<&str>) -> String {
    to_json(&ServerMessage::CorrectGuess {
        player_id: by.id.clone(),
        player_name: by.name.clone(),
        score,
        word: word.map(Into::into),
    })
}

/// Returns the JSON string for a `next-round` push.
pub fn next_round_json(round: u32, word: &str, time_left: Option<u32>) -> String {
    to_json(&ServerMessage::NextRound {
        round,
        word: word.into(),
        time_left,
    })
}

/// Returns the JSON string for a `hangman-round-over` push.
pub fn hangman_round_over_json(word: &str, winner: Option<Player>, round: u32) -> String {
    to_json(&ServerMessage::HangmanRoundOver {
        word: word.into(),
        winner,
        round,
        total_rounds: 3,
    })
}

/// Returns the JSON string for a `game-over` push.
pub fn game_over_json(winner: Player, scores: Vec<Player>) -> String {
    to_json(&ServerMessage::GameOver {
        winner: Some(winner),
        scores,
    })
}

// ── Timing helpers ──────────────────────────────────────────────────

/// Poll until at least `count` messages were sent, or panic after ~1s.
pub async fn wait_for_sent(sent: &Arc<StdMutex<Vec<String>>>, count: usize) {
    for _ in 0..200 {
        if sent.lock().unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {count} sent messages");
}

/// Give the transport loop a moment to apply already-fed pushes.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
