//! Mirrored session state and the event reducer.
//!
//! [`SessionState`] is the local projection of the authoritative server
//! state: the current room, its players, the chat/guess feed, and the two
//! per-game views. All server pushes funnel through [`SessionState::apply`],
//! a synchronous `(state, event)` transition that needs no live connection,
//! so every state rule in this module is unit-testable in isolation.
//!
//! Role flags are intentionally not stored. "Am I the host/drawer?" is
//! always recomputed from the current identity token and the latest room
//! snapshot, because the token changes across reconnects.

use std::collections::BTreeSet;

use crate::error::{HubError, Result};
use crate::protocol::{ChatMessage, DrawPoint, Player, PlayerId, Room, RoomId, ServerMessage};

/// Wrong guesses after which a Hangman round counts as lost.
pub const MAX_WRONG_GUESSES: u32 = 6;

// ── Game projections ────────────────────────────────────────────────

/// Derived Hangman state: the letters tried so far, the wrong-guess count
/// and the current word. Reset on `game-started` and `next-round`.
#[derive(Debug, Clone, Default)]
pub struct HangmanView {
    /// Uppercased letters guessed this round (replaced wholesale by
    /// `hangman-update`, never merged).
    pub guessed_letters: BTreeSet<char>,
    /// Incremented by exactly one per incorrect guess. Monotonic within a
    /// round; reset only on round/game transitions.
    pub wrong_guesses: u32,
    /// The word for this round. Revealed to all Hangman players; masked
    /// rendering is up to [`HangmanView::masked_word`].
    pub word: Option<String>,
}

impl HangmanView {
    fn reset_for_round(&mut self, word: &str) {
        self.guessed_letters.clear();
        self.wrong_guesses = 0;
        self.word = Some(word.to_string());
    }

    /// Whether `letter` has already been guessed (case-insensitive).
    pub fn has_guessed(&self, letter: char) -> bool {
        self.guessed_letters.contains(&letter.to_ascii_uppercase())
    }

    /// Whether the round is lost under the six-strikes rule.
    pub fn is_lost(&self) -> bool {
        self.wrong_guesses >= MAX_WRONG_GUESSES
    }

    /// The current word with unguessed letters replaced by underscores,
    /// space-separated for display. `None` when no round is active.
    pub fn masked_word(&self) -> Option<String> {
        let word = self.word.as_deref()?;
        let rendered: Vec<String> = word
            .chars()
            .map(|c| {
                if !c.is_alphabetic() || self.has_guessed(c) {
                    c.to_string()
                } else {
                    "_".to_string()
                }
            })
            .collect();
        Some(rendered.join(" "))
    }
}

/// Derived Scribble state: the round counter and the received stroke
/// buffer. The buffer is append-only between clears.
#[derive(Debug, Clone, Default)]
pub struct ScribbleView {
    pub round: u32,
    pub strokes: Vec<DrawPoint>,
}

/// Guesser hint as a pure function of the word and the remaining time:
/// word length while more than 60 seconds remain, the first letter while
/// more than 40, the last letter while more than 20 (multi-letter words
/// only), nothing in the final stretch. Never sent over the wire.
pub fn word_hint(word: &str, time_left: u32) -> Option<String> {
    let chars: Vec<char> = word.chars().collect();
    let len = chars.len();
    if len == 0 {
        return None;
    }
    if time_left > 60 {
        return Some(format!("{len} letters"));
    }
    if time_left > 40 {
        return chars.first().map(|c| format!("Starts with \"{c}\""));
    }
    if time_left > 20 && len > 1 {
        return chars.last().map(|c| format!("Ends with \"{c}\""));
    }
    None
}

// ── Session state ───────────────────────────────────────────────────

/// The complete local read model: connection identity, mirrored room state
/// and the per-game projections.
///
/// Exactly one room is active at a time; no room exists before a successful
/// create/join, and [`SessionState::reset`] is the only full-reset path.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Identity token assigned by the server's `welcome` handshake.
    /// Connection-scoped: survives `leave_room`, replaced on reconnect.
    pub local_id: Option<PlayerId>,
    /// The active room, if any. Replaced wholesale by pushes.
    pub room: Option<Room>,
    /// Player list, replaced wholesale by the most recent roster-carrying
    /// event.
    pub players: Vec<Player>,
    /// Chat/guess feed. Append-only; cleared when a room is (re)entered.
    pub messages: Vec<ChatMessage>,
    pub hangman: HangmanView,
    pub scribble: ScribbleView,
    /// Reset generation. Bumped by every full reset; acknowledgements
    /// captured under an older epoch are discarded instead of applied.
    pub(crate) epoch: u64,
}

impl SessionState {
    // ── Derived accessors ───────────────────────────────────────────

    /// The active room's id, if any.
    pub fn room_id(&self) -> Option<&RoomId> {
        self.room.as_ref().map(|r| &r.id)
    }

    /// Whether the active room's game has started.
    pub fn game_started(&self) -> bool {
        self.room.as_ref().is_some_and(|r| r.game_started)
    }

    /// Whether the local player hosts the active room. Recomputed from the
    /// current identity token on every call.
    pub fn is_host(&self) -> bool {
        match (&self.local_id, &self.room) {
            (Some(id), Some(room)) => *id == room.host_id,
            _ => false,
        }
    }

    /// Whether the local player is the current drawer. Recomputed from the
    /// current identity token on every call.
    pub fn is_drawer(&self) -> bool {
        match (&self.local_id, &self.room) {
            (Some(id), Some(room)) => room.drawer_id.as_ref() == Some(id),
            _ => false,
        }
    }

    /// The local player's roster entry, if present.
    pub fn local_player(&self) -> Option<&Player> {
        let id = self.local_id.as_ref()?;
        self.players.iter().find(|p| p.id == *id)
    }

    /// Remaining round time as last reported by the server.
    pub fn time_left(&self) -> u32 {
        self.room.as_ref().map_or(0, |r| r.time_left)
    }

    /// The Scribble hint for the local guesser, or `None` for the drawer
    /// and outside the hint windows.
    pub fn scribble_hint(&self) -> Option<String> {
        if self.is_drawer() {
            return None;
        }
        let room = self.room.as_ref()?;
        let word = room.current_word.as_deref()?;
        word_hint(word, room.time_left)
    }

    // ── Local guards ────────────────────────────────────────────────

    /// Local pre-send check for a Hangman guess: redundant or impossible
    /// guesses are rejected here instead of hitting the wire. The server
    /// remains the source of truth for the resulting state.
    pub fn check_hangman_guess(&self, letter: char) -> Result<()> {
        if !self.game_started() {
            return Err(HubError::GameNotStarted);
        }
        if self.hangman.is_lost() {
            return Err(HubError::RoundOver);
        }
        if self.hangman.has_guessed(letter) {
            return Err(HubError::AlreadyGuessed);
        }
        Ok(())
    }

    /// Local pre-send check for a stroke point: drawing is only meaningful
    /// while the game is started and the local player holds the drawer role.
    pub fn check_draw(&self) -> Result<()> {
        if !self.game_started() {
            return Err(HubError::GameNotStarted);
        }
        if !self.is_drawer() {
            return Err(HubError::NotDrawer);
        }
        Ok(())
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Full reset of all room-scoped state. The identity token is
    /// connection-scoped and survives. Bumps the epoch so in-flight
    /// acknowledgements against the old room are discarded.
    pub(crate) fn reset(&mut self) {
        self.room = None;
        self.players.clear();
        self.messages.clear();
        self.hangman = HangmanView::default();
        self.scribble = ScribbleView::default();
        self.epoch += 1;
    }

    /// Seed state from a successful create/join acknowledgement.
    ///
    /// A push event that already established the room logically supersedes
    /// the acknowledgement, so an existing room is never overwritten here;
    /// only the identity token and the cleared chat are committed then.
    pub(crate) fn seed_room(&mut self, room: Room, player_id: Option<PlayerId>) {
        if let Some(id) = player_id {
            self.local_id = Some(id);
        }
        self.messages.clear();
        if self.room.is_none() {
            self.players = room.players.clone();
            self.room = Some(room);
        }
    }

    /// Truncate the local stroke buffer. The only operation besides
    /// round/game transitions that empties it.
    pub(crate) fn clear_strokes(&mut self) {
        self.scribble.strokes.clear();
    }

    /// Apply one server push event, in arrival order.
    ///
    /// Each arm fully replaces the relevant slice of state; the only
    /// partial updates are the ones the protocol defines as such (missing
    /// `timeLeft` means "unchanged"). `ack` messages are resolved by the
    /// request path and are a no-op here.
    pub(crate) fn apply(&mut self, event: &ServerMessage) {
        match event {
            ServerMessage::Ack(_) => {}

            ServerMessage::Welcome { player_id } => {
                self.local_id = Some(player_id.clone());
            }

            ServerMessage::PlayerJoined { players, .. }
            | ServerMessage::PlayerLeft { players, .. } => {
                self.players = players.clone();
            }

            ServerMessage::NewHost { host_id } => {
                if let Some(room) = &mut self.room {
                    room.host_id = host_id.clone();
                }
            }

            ServerMessage::GameStarted(payload) => {
                let mut room = payload.room.clone();
                room.game_started = true;
                room.current_word = Some(payload.word.clone());
                room.round = payload.round;
                room.time_left = payload.time_left;
                self.players = room.players.clone();
                self.hangman.reset_for_round(&payload.word);
                self.scribble.strokes.clear();
                self.scribble.round = payload.round;
                self.messages.clear();
                self.room = Some(room);
            }

            ServerMessage::TimerUpdate { time_left } => {
                if let (Some(room), Some(t)) = (&mut self.room, time_left) {
                    room.time_left = *t;
                }
            }

            ServerMessage::Draw(point) => {
                self.scribble.strokes.push(point.clone());
            }

            ServerMessage::NewMessage(msg) => {
                self.messages.push(msg.clone());
            }

            ServerMessage::CorrectGuess {
                player_id,
                player_name,
                score,
                ..
            } => {
                self.messages.push(ChatMessage {
                    id: uuid::Uuid::new_v4().to_string(),
                    player_id: player_id.clone(),
                    player_name: player_name.clone(),
                    message: format!("Guessed correctly! (+{score} pts)"),
                    is_correct: true,
                });
            }

            ServerMessage::HangmanUpdate {
                guessed_letters,
                is_correct,
                ..
            } => {
                self.hangman.guessed_letters = guessed_letters
                    .iter()
                    .map(|c| c.to_ascii_uppercase())
                    .collect();
                if !is_correct {
                    self.hangman.wrong_guesses += 1;
                }
            }

            ServerMessage::HangmanRoundOver { word, winner, .. } => {
                let text = match winner {
                    Some(w) => format!("{} guessed it! Word: {word}", w.name),
                    None => format!("Time's up! Word was: {word}"),
                };
                self.messages.push(system_message(text));
            }

            ServerMessage::NextRound {
                round,
                word,
                time_left,
            } => {
                if let Some(room) = &mut self.room {
                    room.round = *round;
                    room.current_word = Some(word.clone());
                    if let Some(t) = time_left {
                        room.time_left = *t;
                    }
                }
                self.hangman.reset_for_round(word);
                self.scribble.strokes.clear();
                self.scribble.round = *round;
            }

            ServerMessage::GameOver { winner, scores } => {
                if let Some(room) = &mut self.room {
                    room.game_started = false;
                }
                self.players = scores.clone();
                // A drifted payload may omit the winner; the score
                // replacement above still applies.
                if let Some(winner) = winner {
                    self.messages.push(system_message(format!(
                        "Game Over! {} wins with {} points!",
                        winner.name, winner.score
                    )));
                }
            }

            ServerMessage::RoomUpdated(room) => {
                self.players = room.players.clone();
                self.room = Some(room.clone());
            }
        }
    }
}

/// Build a synthesized feed entry attributed to the system.
fn system_message(text: String) -> ChatMessage {
    ChatMessage {
        id: uuid::Uuid::new_v4().to_string(),
        player_id: "system".to_string(),
        player_name: "System".to_string(),
        message: text,
        is_correct: false,
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
    use crate::protocol::{GameStartedPayload, GameType};

    fn player(id: &str, name: &str, score: u32) -> Player {
        Player {
            id: id.into(),
            name: name.into(),
            score,
        }
    }

    fn room(id: &str, host: &str, game_type: GameType) -> Room {
        Room {
            id: id.into(),
            name: "Fun".into(),
            host_id: host.into(),
            game_type,
            players: vec![player(host, "Ann", 0)],
            game_started: false,
            current_word: None,
            drawer_id: None,
            round: 0,
            total_rounds: 3,
            time_left: 0,
        }
    }

    fn game_started(room: Room, word: &str, round: u32, time_left: u32) -> ServerMessage {
        ServerMessage::GameStarted(Box::new(GameStartedPayload {
            room,
            word: word.into(),
            round,
            time_left,
        }))
    }

    fn started_state(game_type: GameType) -> SessionState {
        let mut state = SessionState::default();
        state.apply(&ServerMessage::Welcome {
            player_id: "p1".into(),
        });
        state.apply(&game_started(room("ABC123", "p1", game_type), "CRANE", 1, 90));
        state
    }

    fn point(x: f32, y: f32) -> DrawPoint {
        DrawPoint {
            x,
            y,
            color: "#000".into(),
            width: 2.0,
        }
    }

    // ── Roster mirroring ────────────────────────────────────────────

    #[test]
    fn player_list_equals_most_recent_roster_event() {
        let mut state = SessionState::default();

        state.apply(&ServerMessage::PlayerJoined {
            players: vec![player("p1", "Ann", 0), player("p2", "Bob", 0)],
            player_id: Some("p2".into()),
            player_name: Some("Bob".into()),
        });
        assert_eq!(state.players.len(), 2);

        // Replayed roster must not accumulate duplicates.
        state.apply(&ServerMessage::PlayerJoined {
            players: vec![player("p1", "Ann", 0), player("p2", "Bob", 0)],
            player_id: Some("p2".into()),
            player_name: Some("Bob".into()),
        });
        assert_eq!(state.players.len(), 2);

        state.apply(&ServerMessage::PlayerLeft {
            players: vec![player("p1", "Ann", 0)],
            player_id: Some("p2".into()),
            player_name: Some("Bob".into()),
        });
        assert_eq!(state.players, vec![player("p1", "Ann", 0)]);
    }

    #[test]
    fn new_host_updates_room_and_derived_flag() {
        let mut state = started_state(GameType::Hangman);
        assert!(state.is_host());

        state.apply(&ServerMessage::NewHost {
            host_id: "p2".into(),
        });
        assert_eq!(state.room.as_ref().unwrap().host_id, "p2");
        assert!(!state.is_host());
    }

    // ── Full reset ──────────────────────────────────────────────────

    #[test]
    fn reset_clears_everything_but_identity() {
        let mut state = started_state(GameType::Scribble);
        state.apply(&ServerMessage::Draw(point(1.0, 2.0)));
        state.apply(&ServerMessage::NewMessage(ChatMessage {
            id: "m1".into(),
            player_id: "p1".into(),
            player_name: "Ann".into(),
            message: "hi".into(),
            is_correct: false,
        }));
        let epoch_before = state.epoch;

        state.reset();

        assert!(state.room.is_none());
        assert!(state.players.is_empty());
        assert!(state.messages.is_empty());
        assert!(!state.game_started());
        assert!(!state.is_host());
        assert!(!state.is_drawer());
        assert!(state.hangman.guessed_letters.is_empty());
        assert_eq!(state.hangman.wrong_guesses, 0);
        assert!(state.scribble.strokes.is_empty());
        assert_eq!(state.local_id.as_deref(), Some("p1"));
        assert_eq!(state.epoch, epoch_before + 1);
    }

    // ── game-started ────────────────────────────────────────────────

    #[test]
    fn game_started_replaces_and_clears_round_state() {
        let mut state = SessionState::default();
        state.apply(&ServerMessage::Welcome {
            player_id: "p2".into(),
        });
        // Pre-game leftovers that the transition must wipe.
        state.messages.push(system_message("old".into()));
        state.scribble.strokes.push(point(0.0, 0.0));
        state.hangman.wrong_guesses = 4;

        let mut r = room("ABC123", "p1", GameType::Scribble);
        r.players.push(player("p2", "Bob", 0));
        r.drawer_id = Some("p2".into());
        state.apply(&game_started(r, "HOUSE", 1, 80));

        assert!(state.game_started());
        assert_eq!(state.players.len(), 2);
        assert_eq!(
            state.room.as_ref().unwrap().current_word.as_deref(),
            Some("HOUSE")
        );
        assert_eq!(state.time_left(), 80);
        assert!(state.messages.is_empty());
        assert!(state.scribble.strokes.is_empty());
        assert_eq!(state.hangman.wrong_guesses, 0);
        // Drawer derived from the identity token, not assumed.
        assert!(state.is_drawer());
        assert!(!state.is_host());
    }

    #[test]
    fn identity_refresh_rederives_roles() {
        let mut state = SessionState::default();
        state.apply(&ServerMessage::Welcome {
            player_id: "old-id".into(),
        });
        let mut r = room("ABC123", "host", GameType::Scribble);
        r.drawer_id = Some("old-id".into());
        state.apply(&game_started(r, "HOUSE", 1, 80));
        assert!(state.is_drawer());

        // Reconnect assigns a fresh token; a later push names the new token
        // as drawer. Both flags must follow the new token immediately.
        state.apply(&ServerMessage::Welcome {
            player_id: "new-id".into(),
        });
        assert!(!state.is_drawer());

        let mut r2 = room("ABC123", "new-id", GameType::Scribble);
        r2.drawer_id = Some("new-id".into());
        state.apply(&game_started(r2, "PLANE", 2, 80));
        assert!(state.is_drawer());
        assert!(state.is_host());
    }

    // ── Timer ───────────────────────────────────────────────────────

    #[test]
    fn timer_update_overwrites_and_tolerates_missing_field() {
        let mut state = started_state(GameType::Hangman);
        state.apply(&ServerMessage::TimerUpdate {
            time_left: Some(42),
        });
        assert_eq!(state.time_left(), 42);

        // Protocol drift: a tick without the field leaves the value alone.
        state.apply(&ServerMessage::TimerUpdate { time_left: None });
        assert_eq!(state.time_left(), 42);
    }

    // ── Scribble ────────────────────────────────────────────────────

    #[test]
    fn stroke_buffer_appends_in_order() {
        let mut state = started_state(GameType::Scribble);
        state.apply(&ServerMessage::Draw(point(1.0, 1.0)));
        state.apply(&ServerMessage::Draw(point(2.0, 2.0)));
        assert_eq!(state.scribble.strokes.len(), 2);
        assert_eq!(state.scribble.strokes[0].x, 1.0);
        assert_eq!(state.scribble.strokes[1].x, 2.0);
    }

    #[test]
    fn next_round_clears_strokes_and_advances_round() {
        let mut state = started_state(GameType::Scribble);
        for i in 0..5 {
            state.apply(&ServerMessage::Draw(point(i as f32, 0.0)));
        }

        state.apply(&ServerMessage::NextRound {
            round: 2,
            word: "PLANE".into(),
            time_left: Some(90),
        });

        assert!(state.scribble.strokes.is_empty());
        assert_eq!(state.scribble.round, 2);
        assert_eq!(state.room.as_ref().unwrap().round, 2);
        assert_eq!(state.time_left(), 90);
        assert_eq!(
            state.room.as_ref().unwrap().current_word.as_deref(),
            Some("PLANE")
        );
    }

    #[test]
    fn next_round_without_time_keeps_previous_timer() {
        let mut state = started_state(GameType::Hangman);
        state.apply(&ServerMessage::TimerUpdate {
            time_left: Some(55),
        });
        state.apply(&ServerMessage::NextRound {
            round: 2,
            word: "PLANE".into(),
            time_left: None,
        });
        assert_eq!(state.time_left(), 55);
    }

    #[test]
    fn correct_guess_synthesizes_scored_message() {
        let mut state = started_state(GameType::Scribble);
        state.apply(&ServerMessage::CorrectGuess {
            player_id: "p2".into(),
            player_name: "Bob".into(),
            score: 150,
            word: Some("CRANE".into()),
        });

        let msg = state.messages.last().unwrap();
        assert!(msg.is_correct);
        assert_eq!(msg.player_name, "Bob");
        assert_eq!(msg.message, "Guessed correctly! (+150 pts)");
    }

    // ── Hangman ─────────────────────────────────────────────────────

    fn hangman_update(letters: &[char], is_correct: bool) -> ServerMessage {
        ServerMessage::HangmanUpdate {
            guessed_letters: letters.to_vec(),
            wrong_guesses: 0,
            player_id: Some("p1".into()),
            player_name: Some("Ann".into()),
            letter: letters.last().copied(),
            is_correct,
        }
    }

    #[test]
    fn wrong_guess_count_increments_only_on_incorrect() {
        let mut state = started_state(GameType::Hangman);

        state.apply(&hangman_update(&['A'], true));
        assert_eq!(state.hangman.wrong_guesses, 0);

        state.apply(&hangman_update(&['A', 'Z'], false));
        assert_eq!(state.hangman.wrong_guesses, 1);

        state.apply(&hangman_update(&['A', 'Z', 'E'], true));
        assert_eq!(state.hangman.wrong_guesses, 1);
    }

    #[test]
    fn repeated_incorrect_update_counts_twice_but_replaces_letters() {
        let mut state = started_state(GameType::Hangman);
        let update = hangman_update(&['A', 'E'], false);

        state.apply(&update);
        state.apply(&update);

        assert_eq!(state.hangman.wrong_guesses, 2);
        assert_eq!(
            state.hangman.guessed_letters,
            ['A', 'E'].into_iter().collect::<BTreeSet<char>>()
        );
    }

    #[test]
    fn six_wrong_guesses_lose_the_round() {
        let mut state = started_state(GameType::Hangman);
        for _ in 0..6 {
            state.apply(&hangman_update(&['Z'], false));
        }
        assert!(state.hangman.is_lost());
        assert!(state.check_hangman_guess('Q').is_err());
    }

    #[test]
    fn round_over_message_names_winner_or_reveals_word() {
        let mut state = started_state(GameType::Hangman);

        state.apply(&ServerMessage::HangmanRoundOver {
            word: "CRANE".into(),
            winner: Some(player("p2", "Bob", 10)),
            round: 1,
            total_rounds: 3,
        });
        assert_eq!(
            state.messages.last().unwrap().message,
            "Bob guessed it! Word: CRANE"
        );

        state.apply(&ServerMessage::HangmanRoundOver {
            word: "CRANE".into(),
            winner: None,
            round: 1,
            total_rounds: 3,
        });
        assert_eq!(
            state.messages.last().unwrap().message,
            "Time's up! Word was: CRANE"
        );
    }

    #[test]
    fn masked_word_hides_unguessed_letters() {
        let mut state = started_state(GameType::Hangman);
        state.apply(&hangman_update(&['A', 'E'], true));
        assert_eq!(state.hangman.masked_word().as_deref(), Some("_ _ A _ E"));
    }

    #[test]
    fn guess_guard_rejects_redundant_and_impossible_guesses() {
        let mut state = SessionState::default();
        assert!(matches!(
            state.check_hangman_guess('A'),
            Err(HubError::GameNotStarted)
        ));

        state = started_state(GameType::Hangman);
        state.apply(&hangman_update(&['A'], true));
        assert!(matches!(
            state.check_hangman_guess('a'),
            Err(HubError::AlreadyGuessed)
        ));
        assert!(state.check_hangman_guess('B').is_ok());
    }

    // ── game-over / room-updated ────────────────────────────────────

    #[test]
    fn game_over_ends_game_and_posts_final_scores() {
        let mut state = started_state(GameType::Hangman);
        state.apply(&ServerMessage::GameOver {
            winner: Some(player("p1", "Ann", 300)),
            scores: vec![player("p1", "Ann", 300), player("p2", "Bob", 120)],
        });

        assert!(!state.game_started());
        assert_eq!(state.players.len(), 2);
        assert_eq!(
            state.messages.last().unwrap().message,
            "Game Over! Ann wins with 300 points!"
        );
    }

    #[test]
    fn game_over_without_winner_still_replaces_scores() {
        let mut state = started_state(GameType::Hangman);
        let feed_len = state.messages.len();
        state.apply(&ServerMessage::GameOver {
            winner: None,
            scores: vec![player("p2", "Bob", 120)],
        });

        assert!(!state.game_started());
        assert_eq!(state.players, vec![player("p2", "Bob", 120)]);
        assert_eq!(state.messages.len(), feed_len);
    }

    #[test]
    fn room_updated_resyncs_wholesale() {
        let mut state = started_state(GameType::Hangman);
        let mut resync = room("ABC123", "p9", GameType::Hangman);
        resync.players = vec![player("p9", "Zoe", 7)];
        state.apply(&ServerMessage::RoomUpdated(resync));

        assert_eq!(state.room.as_ref().unwrap().host_id, "p9");
        assert_eq!(state.players, vec![player("p9", "Zoe", 7)]);
    }

    // ── Ack seeding ─────────────────────────────────────────────────

    #[test]
    fn seed_room_does_not_clobber_push_established_room() {
        let mut state = started_state(GameType::Hangman);
        let push_round = state.room.as_ref().unwrap().round;

        // A stale-looking ack for the same room arrives after the push.
        let mut ack_room = room("ABC123", "p1", GameType::Hangman);
        ack_room.round = 0;
        state.seed_room(ack_room, Some("p1".into()));

        assert_eq!(state.room.as_ref().unwrap().round, push_round);
    }

    // ── Hints ───────────────────────────────────────────────────────

    #[test]
    fn hint_tiers_follow_remaining_time() {
        assert_eq!(word_hint("HOUSE", 61).as_deref(), Some("5 letters"));
        assert_eq!(word_hint("HOUSE", 60).as_deref(), Some("Starts with \"H\""));
        assert_eq!(word_hint("HOUSE", 41).as_deref(), Some("Starts with \"H\""));
        assert_eq!(word_hint("HOUSE", 40).as_deref(), Some("Ends with \"E\""));
        assert_eq!(word_hint("HOUSE", 21).as_deref(), Some("Ends with \"E\""));
        assert_eq!(word_hint("HOUSE", 20), None);
        assert_eq!(word_hint("HOUSE", 0), None);
        // Single-letter words never reveal their only letter as "ends with".
        assert_eq!(word_hint("A", 30), None);
        assert_eq!(word_hint("", 90), None);
    }

    #[test]
    fn drawer_gets_no_hint() {
        let mut state = SessionState::default();
        state.apply(&ServerMessage::Welcome {
            player_id: "p1".into(),
        });
        let mut r = room("ABC123", "p1", GameType::Scribble);
        r.drawer_id = Some("p1".into());
        state.apply(&game_started(r, "HOUSE", 1, 90));

        assert!(state.scribble_hint().is_none());

        // Hand the drawer role to someone else; the hint reappears.
        if let Some(room) = &mut state.room {
            room.drawer_id = Some("p2".into());
        }
        assert_eq!(state.scribble_hint().as_deref(), Some("5 letters"));
    }
}
