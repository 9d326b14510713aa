//! # Mini Games Client
//!
//! Transport-agnostic Rust client for the Mini Games Hub realtime session
//! protocol (Hangman and Scribble rooms).
//!
//! This crate provides a high-level async client that talks to a hub server
//! using JSON text messages over any bidirectional transport. It owns the
//! connection lifecycle (including bounded automatic reconnection), mirrors
//! the authoritative room state pushed by the server, and exposes per-game
//! read models for rendering.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement the [`Transport`] trait for any backend
//! - **Supervised connection**: automatic reconnection via a [`Connector`],
//!   with a fresh server-assigned identity per connection
//! - **WebSocket built-in**: default `transport-websocket` feature provides
//!   `WebSocketTransport` and `WebSocketConnector`
//! - **Event-driven**: receive typed [`HubEvent`]s via a channel, or read
//!   the mirrored [`SessionState`] snapshot at any time
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mini_games_client::{GameType, HubClient, HubConfig, HubEvent, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new("wss://hub.example.com/ws");
//! let (client, mut events) = HubClient::start(connector, HubConfig::default());
//!
//! let room = client.create_room("Fun", "Ann", GameType::Hangman).await?;
//! println!("share this code: {}", room.id);
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         HubEvent::HangmanUpdate { .. } => {
//!             let session = client.session().await;
//!             println!("{}", session.hangman.masked_word());
//!         }
//!         HubEvent::ReconnectFailed { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

pub mod client;
pub mod error;
pub mod event;
pub mod protocol;
pub mod state;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{HubClient, HubConfig};
pub use error::HubError;
pub use event::HubEvent;
pub use protocol::{
    ChatMessage, ClientMessage, DrawPoint, GameType, Player, Room, ServerMessage,
};
pub use state::{HangmanView, ScribbleView, SessionState, MAX_WRONG_GUESSES};
pub use transport::{Connector, Transport};

#[cfg(feature = "transport-websocket")]
pub use transports::websocket::{WebSocketConnector, WebSocketTransport};
