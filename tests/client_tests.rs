#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration-style client tests for the Mini Games Client.
//!
//! Uses the shared `MockTransport` from `tests/common` to script server
//! messages and verify that `HubClient` processes them correctly: the
//! request/acknowledgement flow, state mirroring, game projections, and
//! connection supervision.

mod common;

use std::sync::Arc;
use std::time::Duration;

use mini_games_client::protocol::ClientMessage;
use mini_games_client::{
    GameType, HubClient, HubConfig, HubError, HubEvent, MAX_WRONG_GUESSES,
};

use common::{
    ack_error_json, ack_ok_json, ack_room_json, correct_guess_json, draw_json, draw_point,
    game_over_json, game_started_json, hangman_room, hangman_round_over_json,
    hangman_update_json, new_message_json, next_round_json, player, player_joined_json,
    player_left_json, room_updated_json, scribble_room, settle, timer_update_json, wait_for_sent,
    welcome_json,
    MockConnector, MockHandles, MockTransport, Scripted,
};

// ════════════════════════════════════════════════════════════════════
// Helper: start a mock client with scripted responses
// ════════════════════════════════════════════════════════════════════

fn fast_config() -> HubConfig {
    HubConfig::default()
        .with_reconnect_attempts(3)
        .with_reconnect_delay(Duration::from_millis(5))
}

/// Start a client over a single mock transport. The script begins with the
/// `welcome` handshake for player `p1`; further messages are fed live.
fn start_client(
    extra: Vec<Scripted>,
) -> (
    HubClient,
    tokio::sync::mpsc::Receiver<HubEvent>,
    MockHandles,
) {
    let mut scripted = vec![Some(Ok(welcome_json("p1")))];
    scripted.extend(extra);
    let (transport, handles) = MockTransport::new(scripted);
    let connector = MockConnector::new(vec![transport]);
    let (client, events) = HubClient::start(connector, fast_config());
    (client, events, handles)
}

/// Consume events up to and including the `Welcome` handshake.
async fn drain_until_welcome(rx: &mut tokio::sync::mpsc::Receiver<HubEvent>) {
    let ev = rx.recv().await.expect("expected Connected event");
    assert!(
        matches!(ev, HubEvent::Connected),
        "first event should be Connected, got {ev:?}"
    );
    let ev = rx.recv().await.expect("expected Welcome event");
    assert!(
        matches!(ev, HubEvent::Welcome { .. }),
        "second event should be Welcome, got {ev:?}"
    );
}

/// Run `request` while feeding `reply` once the client's `expected_sends`th
/// message hits the wire.
async fn with_reply<T>(
    request: impl std::future::Future<Output = T>,
    handles: &MockHandles,
    expected_sends: usize,
    reply: String,
) -> T {
    let (result, ()) = tokio::join!(request, async {
        wait_for_sent(&handles.sent, expected_sends).await;
        handles.feed.send(Some(Ok(reply))).unwrap();
    });
    result
}

// ════════════════════════════════════════════════════════════════════
// Room lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn create_room_then_second_player_joins() {
    let (mut client, mut events, handles) = start_client(vec![]);
    drain_until_welcome(&mut events).await;

    let room = with_reply(
        client.create_room("Fun", "Ann", GameType::Hangman),
        &handles,
        1,
        ack_room_json(hangman_room("ABC123", "p1"), "p1"),
    )
    .await
    .expect("create_room");

    assert_eq!(room.id, "ABC123");
    assert!(client.is_host().await);
    assert_eq!(client.local_player_id().await.as_deref(), Some("p1"));

    // The create-room request carried the given names.
    let first: ClientMessage =
        serde_json::from_str(&handles.sent.lock().unwrap()[0]).expect("parse request");
    if let ClientMessage::CreateRoom {
        room_name,
        player_name,
        game_type,
    } = first
    {
        assert_eq!(room_name, "Fun");
        assert_eq!(player_name, "Ann");
        assert_eq!(game_type, GameType::Hangman);
    } else {
        panic!("expected CreateRoom, got {first:?}");
    }

    // A second player joins; the push replaces the roster wholesale.
    let bob = player("p2", "Bob");
    handles
        .feed
        .send(Some(Ok(player_joined_json(
            vec![player("p1", "Ann"), bob.clone()],
            &bob,
        ))))
        .unwrap();

    let ev = events.recv().await.expect("event");
    if let HubEvent::PlayerJoined {
        players,
        player_name,
    } = ev
    {
        assert_eq!(players.len(), 2);
        assert_eq!(player_name.as_deref(), Some("Bob"));
    } else {
        panic!("expected PlayerJoined, got {ev:?}");
    }
    assert_eq!(client.session().await.players.len(), 2);

    // Bob leaves again; the roster shrinks back wholesale.
    handles
        .feed
        .send(Some(Ok(player_left_json(vec![player("p1", "Ann")], &bob))))
        .unwrap();
    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, HubEvent::PlayerLeft { .. }), "got {ev:?}");
    assert_eq!(client.session().await.players.len(), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn join_room_derives_non_host_role() {
    let (mut client, mut events, handles) = start_client(vec![]);
    drain_until_welcome(&mut events).await;

    let mut room = hangman_room("ABC123", "p9");
    room.players.push(player("p1", "Bob"));
    let room = with_reply(
        client.join_room("ABC123", "Bob"),
        &handles,
        1,
        ack_room_json(room, "p1"),
    )
    .await
    .expect("join_room");

    assert_eq!(room.host_id, "p9");
    assert!(!client.is_host().await);
    assert_eq!(
        client.session().await.local_player().map(|p| p.name.clone()),
        Some("Bob".into())
    );

    client.shutdown().await;
}

#[tokio::test]
async fn join_rejection_carries_server_reason() {
    let (mut client, mut events, handles) = start_client(vec![]);
    drain_until_welcome(&mut events).await;

    let err = with_reply(
        client.join_room("NOPE42", "Bob"),
        &handles,
        1,
        ack_error_json("Room not found"),
    )
    .await
    .expect_err("join must fail");

    match err {
        HubError::Rejected { message } => assert_eq!(message, "Room not found"),
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert!(client.current_room().await.is_none());

    client.shutdown().await;
}

#[tokio::test]
async fn leave_then_join_another_room() {
    let (mut client, mut events, handles) = start_client(vec![]);
    drain_until_welcome(&mut events).await;

    with_reply(
        client.create_room("Fun", "Ann", GameType::Hangman),
        &handles,
        1,
        ack_room_json(hangman_room("ABC123", "p1"), "p1"),
    )
    .await
    .expect("create_room");

    client.leave_room().await;
    assert!(client.current_room().await.is_none());

    // leave-room went over the wire before the next join.
    wait_for_sent(&handles.sent, 2).await;
    let second: ClientMessage =
        serde_json::from_str(&handles.sent.lock().unwrap()[1]).expect("parse request");
    assert!(matches!(second, ClientMessage::LeaveRoom));

    let room = with_reply(
        client.join_room("XYZ789", "Ann"),
        &handles,
        3,
        ack_room_json(hangman_room("XYZ789", "p9"), "p1"),
    )
    .await
    .expect("join_room");
    assert_eq!(room.id, "XYZ789");
    assert_eq!(
        client.session().await.room_id().map(String::as_str),
        Some("XYZ789")
    );

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Hangman game flow
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn hangman_round_from_start_to_loss() {
    let (mut client, mut events, handles) = start_client(vec![]);
    drain_until_welcome(&mut events).await;

    with_reply(
        client.create_room("Fun", "Ann", GameType::Hangman),
        &handles,
        1,
        ack_room_json(hangman_room("ABC123", "p1"), "p1"),
    )
    .await
    .expect("create_room");

    with_reply(client.start_game(), &handles, 2, ack_ok_json())
        .await
        .expect("start_game");

    // The transition arrives as a push, not from the ack.
    handles
        .feed
        .send(Some(Ok(game_started_json(
            hangman_room("ABC123", "p1"),
            "CRANE",
            1,
            90,
        ))))
        .unwrap();
    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, HubEvent::GameStarted(_)), "got {ev:?}");
    assert!(client.session().await.game_started());

    // Correct guess: letters update, strike count untouched.
    let ann = player("p1", "Ann");
    with_reply(client.send_hangman_guess('a'), &handles, 3, ack_ok_json())
        .await
        .expect("guess A");
    handles
        .feed
        .send(Some(Ok(hangman_update_json(&['A'], 'A', true, &ann))))
        .unwrap();
    settle().await;
    let session = client.session().await;
    assert_eq!(session.hangman.wrong_guesses, 0);
    assert_eq!(session.hangman.masked_word().as_deref(), Some("_ _ A _ _"));

    // Re-guessing the same letter never reaches the wire.
    let err = client.send_hangman_guess('A').await.expect_err("duplicate");
    assert!(matches!(err, HubError::AlreadyGuessed));

    // Six wrong guesses lose the round.
    let mut guessed = vec!['A'];
    for (i, letter) in ['B', 'D', 'F', 'G', 'H', 'J'].into_iter().enumerate() {
        guessed.push(letter);
        with_reply(
            client.send_hangman_guess(letter),
            &handles,
            4 + i,
            ack_ok_json(),
        )
        .await
        .expect("wrong guess");
        handles
            .feed
            .send(Some(Ok(hangman_update_json(&guessed, letter, false, &ann))))
            .unwrap();
    }
    settle().await;
    let session = client.session().await;
    assert_eq!(session.hangman.wrong_guesses, MAX_WRONG_GUESSES);
    assert!(session.hangman.is_lost());

    // Further guesses are locally rejected until the next round.
    let err = client.send_hangman_guess('K').await.expect_err("lost round");
    assert!(matches!(err, HubError::RoundOver));

    // Round over reveals the word in the feed; next round resets the view.
    handles
        .feed
        .send(Some(Ok(hangman_round_over_json("CRANE", None, 1))))
        .unwrap();
    handles
        .feed
        .send(Some(Ok(next_round_json(2, "PLANE", Some(90)))))
        .unwrap();
    settle().await;
    let session = client.session().await;
    assert_eq!(
        session.messages.last().unwrap().message,
        "Time's up! Word was: CRANE"
    );
    assert_eq!(session.hangman.wrong_guesses, 0);
    assert!(session.hangman.guessed_letters.is_empty());

    client.shutdown().await;
}

#[tokio::test]
async fn game_over_ends_game_and_updates_scores() {
    let (mut client, mut events, handles) = start_client(vec![]);
    drain_until_welcome(&mut events).await;

    handles
        .feed
        .send(Some(Ok(game_started_json(
            hangman_room("ABC123", "p1"),
            "CRANE",
            3,
            90,
        ))))
        .unwrap();
    settle().await;

    let mut ann = player("p1", "Ann");
    ann.score = 300;
    handles
        .feed
        .send(Some(Ok(game_over_json(
            ann.clone(),
            vec![ann, player("p2", "Bob")],
        ))))
        .unwrap();

    // Skip the GameStarted event, then expect GameOver.
    let _ = events.recv().await;
    let ev = events.recv().await.expect("event");
    if let HubEvent::GameOver { winner } = ev {
        let winner = winner.expect("winner");
        assert_eq!(winner.name, "Ann");
        assert_eq!(winner.score, 300);
    } else {
        panic!("expected GameOver, got {ev:?}");
    }

    let session = client.session().await;
    assert!(!session.game_started());
    assert_eq!(session.players.len(), 2);
    assert_eq!(
        session.messages.last().unwrap().message,
        "Game Over! Ann wins with 300 points!"
    );

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Scribble game flow
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn drawer_draws_and_clears_canvas() {
    let (mut client, mut events, handles) = start_client(vec![]);
    drain_until_welcome(&mut events).await;

    // p1 is the drawer this round.
    handles
        .feed
        .send(Some(Ok(game_started_json(
            scribble_room("DOODLE", "p1", "p1"),
            "HOUSE",
            1,
            90,
        ))))
        .unwrap();
    settle().await;
    assert!(client.is_drawer().await);
    // The drawer never sees a hint for their own word.
    assert!(client.session().await.scribble_hint().is_none());

    client.send_draw(draw_point(10.0, 20.0)).await.expect("draw");
    wait_for_sent(&handles.sent, 1).await;
    let msg: ClientMessage =
        serde_json::from_str(&handles.sent.lock().unwrap()[0]).expect("parse request");
    if let ClientMessage::Draw { room_id, point } = msg {
        assert_eq!(room_id, "DOODLE");
        assert_eq!(point.x, 10.0);
    } else {
        panic!("expected Draw, got {msg:?}");
    }

    // Echoed strokes land in the buffer; clearing truncates and notifies.
    handles
        .feed
        .send(Some(Ok(draw_json(draw_point(10.0, 20.0)))))
        .unwrap();
    settle().await;
    assert_eq!(client.session().await.scribble.strokes.len(), 1);

    client.clear_draw_buffer().await.expect("clear");
    assert!(client.session().await.scribble.strokes.is_empty());
    wait_for_sent(&handles.sent, 2).await;
    let msg: ClientMessage =
        serde_json::from_str(&handles.sent.lock().unwrap()[1]).expect("parse request");
    assert!(matches!(msg, ClientMessage::ClearCanvas { .. }));

    client.shutdown().await;
}

#[tokio::test]
async fn guesser_sees_time_tiered_hints_and_feed() {
    let (mut client, mut events, handles) = start_client(vec![]);
    drain_until_welcome(&mut events).await;

    // p2 draws; the local player guesses.
    handles
        .feed
        .send(Some(Ok(game_started_json(
            scribble_room("DOODLE", "p1", "p2"),
            "HOUSE",
            1,
            90,
        ))))
        .unwrap();
    settle().await;
    assert!(!client.is_drawer().await);
    assert_eq!(
        client.session().await.scribble_hint().as_deref(),
        Some("5 letters")
    );

    // Drawing is locally rejected for guessers.
    let err = client.send_draw(draw_point(0.0, 0.0)).await.expect_err("no");
    assert!(matches!(err, HubError::NotDrawer));

    // The hint narrows as the clock runs down.
    handles
        .feed
        .send(Some(Ok(timer_update_json(Some(50)))))
        .unwrap();
    settle().await;
    assert_eq!(
        client.session().await.scribble_hint().as_deref(),
        Some("Starts with \"H\"")
    );
    handles
        .feed
        .send(Some(Ok(timer_update_json(Some(10)))))
        .unwrap();
    settle().await;
    assert!(client.session().await.scribble_hint().is_none());

    // A wrong guess lands in the feed as a normal message.
    with_reply(client.send_guess("BARN"), &handles, 1, ack_ok_json())
        .await
        .expect("send_guess");
    handles
        .feed
        .send(Some(Ok(new_message_json(
            "m1",
            &player("p1", "Ann"),
            "BARN",
        ))))
        .unwrap();
    settle().await;
    assert_eq!(client.session().await.messages.last().unwrap().message, "BARN");

    // A correct guess becomes a scored feed entry.
    handles
        .feed
        .send(Some(Ok(correct_guess_json(
            &player("p1", "Ann"),
            150,
            Some("HOUSE"),
        ))))
        .unwrap();
    settle().await;
    let session = client.session().await;
    let last = session.messages.last().unwrap();
    assert!(last.is_correct);
    assert_eq!(last.message, "Guessed correctly! (+150 pts)");

    client.shutdown().await;
}

#[tokio::test]
async fn chat_messages_are_fire_and_forget() {
    let (mut client, mut events, handles) = start_client(vec![]);
    drain_until_welcome(&mut events).await;

    handles
        .feed
        .send(Some(Ok(room_updated_json(hangman_room("ABC123", "p1")))))
        .unwrap();
    settle().await;

    client.send_chat_message("hello all").await.expect("chat");
    wait_for_sent(&handles.sent, 1).await;
    let msg: ClientMessage =
        serde_json::from_str(&handles.sent.lock().unwrap()[0]).expect("parse request");
    if let ClientMessage::ChatMessage { room_id, message } = msg {
        assert_eq!(room_id, "ABC123");
        assert_eq!(message, "hello all");
    } else {
        panic!("expected ChatMessage, got {msg:?}");
    }

    client.shutdown().await;
    assert!(handles.closed.load(std::sync::atomic::Ordering::Relaxed));
}

// ════════════════════════════════════════════════════════════════════
// Connection supervision
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn reconnect_resyncs_after_fresh_welcome() {
    let (transport_a, handles_a) = MockTransport::new(vec![Some(Ok(welcome_json("old-id")))]);
    let (transport_b, handles_b) = MockTransport::new(vec![Some(Ok(welcome_json("new-id")))]);
    let connector = MockConnector::new(vec![transport_a, transport_b]);
    let (mut client, mut events) = HubClient::start(connector, fast_config());
    drain_until_welcome(&mut events).await;

    // Establish a room, then lose the transport.
    handles_a
        .feed
        .send(Some(Ok(room_updated_json(hangman_room("ABC123", "old-id")))))
        .unwrap();
    settle().await;
    assert!(client.is_host().await);

    handles_a
        .feed
        .send(Some(Err(HubError::TransportReceive("wifi died".into()))))
        .unwrap();

    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, HubEvent::RoomUpdated { .. }), "got {ev:?}");
    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, HubEvent::Disconnected { .. }), "got {ev:?}");
    let ev = events.recv().await.expect("event");
    assert!(
        matches!(ev, HubEvent::Reconnecting { attempt: 1 }),
        "got {ev:?}"
    );
    drain_until_welcome(&mut events).await;

    // Stale room survives the gap, but the old token no longer matches it.
    assert!(client.current_room().await.is_some());
    assert!(!client.is_host().await);

    // The server resyncs the room against the fresh identity.
    let mut resync = hangman_room("ABC123", "new-id");
    resync.players = vec![player("new-id", "Ann")];
    handles_b
        .feed
        .send(Some(Ok(room_updated_json(resync))))
        .unwrap();
    settle().await;
    assert!(client.is_host().await);

    client.shutdown().await;
}

#[tokio::test]
async fn exhausted_reconnect_closes_the_event_stream() {
    let (transport, handles) = MockTransport::new(vec![Some(Ok(welcome_json("p1")))]);
    let connector = MockConnector::new(vec![transport]);
    let config = HubConfig::default()
        .with_reconnect_attempts(2)
        .with_reconnect_delay(Duration::from_millis(5));
    let (client, mut events) = HubClient::start(connector, config);
    drain_until_welcome(&mut events).await;

    handles.feed.send(None).unwrap(); // server closes cleanly

    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, HubEvent::Disconnected { .. }), "got {ev:?}");
    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, HubEvent::Reconnecting { .. }), "got {ev:?}");
    let ev = events.recv().await.expect("event");
    assert!(matches!(ev, HubEvent::Reconnecting { .. }), "got {ev:?}");
    let ev = events.recv().await.expect("event");
    if let HubEvent::ReconnectFailed { attempts } = ev {
        assert_eq!(attempts, 2);
    } else {
        panic!("expected ReconnectFailed, got {ev:?}");
    }
    assert!(events.recv().await.is_none());
    assert!(!client.is_connected());

    // Commands fail fast once supervision has given up.
    let err = client.send_chat_message("anyone?").await.expect_err("dead");
    assert!(matches!(err, HubError::NotConnected));
}

#[tokio::test]
async fn concurrent_requests_resolve_in_issue_order() {
    let (client, mut events, handles) = start_client(vec![]);
    drain_until_welcome(&mut events).await;

    handles
        .feed
        .send(Some(Ok(room_updated_json(hangman_room("ABC123", "p1")))))
        .unwrap();
    settle().await;

    let client = Arc::new(client);
    let c1 = Arc::clone(&client);
    let c2 = Arc::clone(&client);
    let first = tokio::spawn(async move { c1.start_game().await });
    let second = tokio::spawn(async move { c2.send_guess("CRANE").await });

    wait_for_sent(&handles.sent, 2).await;
    // Determine which request went out first; replies resolve in that order.
    let first_is_start = {
        let sent = handles.sent.lock().unwrap();
        let msg: ClientMessage = serde_json::from_str(&sent[0]).unwrap();
        matches!(msg, ClientMessage::StartGame { .. })
    };
    handles
        .feed
        .send(Some(Ok(ack_error_json("not now"))))
        .unwrap();
    handles.feed.send(Some(Ok(ack_ok_json()))).unwrap();

    let start_result = first.await.unwrap();
    let guess_result = second.await.unwrap();
    if first_is_start {
        assert!(matches!(start_result, Err(HubError::Rejected { .. })));
        assert!(guess_result.is_ok());
    } else {
        assert!(matches!(guess_result, Err(HubError::Rejected { .. })));
        assert!(start_result.is_ok());
    }

    let mut client = match Arc::try_unwrap(client) {
        Ok(client) => client,
        Err(_) => panic!("client still shared"),
    };
    client.shutdown().await;
}
