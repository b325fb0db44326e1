//! Integration tests for the Game Night server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gamenight::prelude::*;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server with Fishbowl on a random port.
async fn start_server() -> (String, Hub) {
    let server = GameNightServer::builder()
        .bind("127.0.0.1:0")
        .game(gamenight_fishbowl::GAME_TYPE, gamenight_fishbowl::new_session)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let hub = server.hub().clone();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, hub)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, action: &str, body: Value) {
    let text = json!({ "action": action, "body": body }).to_string();
    ws.send(Message::text(text)).await.expect("send");
}

async fn recv(ws: &mut ClientWs) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("recv");
    serde_json::from_slice(&msg.into_data()).expect("decode")
}

/// Polls `check` until it holds or a second passes.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held");
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_create_game_over_websocket() {
    let (addr, _hub) = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, "create-game", json!({ "gameType": "fishbowl", "name": "alice" })).await;

    let created = recv(&mut ws).await;
    assert_eq!(created["event"], "created-game");
    assert_eq!(created["body"]["gameType"], "fishbowl");
    assert_eq!(created["body"]["roomCode"].as_str().unwrap().len(), 4);
}

#[tokio::test]
async fn test_two_players_play_over_websocket() {
    let (addr, hub) = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;

    send(&mut alice, "create-game", json!({ "gameType": "fishbowl", "name": "alice" })).await;
    let code = recv(&mut alice).await["body"]["roomCode"]
        .as_str()
        .unwrap()
        .to_owned();

    send(&mut bob, "join-game", json!({ "roomCode": code, "name": "bob" })).await;
    assert_eq!(recv(&mut alice).await["event"], "updated-room");
    assert_eq!(recv(&mut bob).await["event"], "updated-room");

    send(&mut alice, "start-game", json!({})).await;
    assert_eq!(recv(&mut alice).await["body"]["state"], "turn-start");
    assert_eq!(recv(&mut bob).await["body"]["state"], "turn-start");

    send(&mut alice, "start-game", json!({})).await;
    let err = recv(&mut alice).await;
    assert_eq!(err["event"], "error");
    assert_eq!(err["error"], "You cannot perform that action at this time.");

    assert_eq!(
        hub.room_state(&RoomCode::new(code)).await,
        Some(GameState::TurnStart)
    );
}

#[tokio::test]
async fn test_binary_frames_accepted() {
    let (addr, _hub) = start_server().await;
    let mut ws = connect(&addr).await;

    let body = json!({ "action": "create-game", "body": { "gameType": "fishbowl", "name": "alice" } });
    ws.send(Message::binary(serde_json::to_vec(&body).unwrap()))
        .await
        .expect("send");

    assert_eq!(recv(&mut ws).await["event"], "created-game");
}

#[tokio::test]
async fn test_invalid_message_ignored() {
    let (addr, _hub) = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("not json".to_owned())).await.expect("send");
    send(&mut ws, "join-game", json!({ "roomCode": "0000", "name": "bob" })).await;

    let err = recv(&mut ws).await;
    assert_eq!(err["error"], "This room code does not exist.");
    assert_eq!(err["errorIsFatal"], true);
}

#[tokio::test]
async fn test_close_unregisters_connection() {
    let (addr, hub) = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, "create-game", json!({ "gameType": "fishbowl", "name": "alice" })).await;
    recv(&mut ws).await;
    assert_eq!(hub.connection_count().await, 1);

    ws.close(None).await.expect("close");

    eventually(|| {
        let hub = hub.clone();
        async move { hub.connection_count().await == 0 }
    })
    .await;
    assert_eq!(hub.player_count().await, 1);
    assert_eq!(hub.room_count().await, 1);
}

#[tokio::test]
async fn test_rejoin_closes_old_socket() {
    let (addr, _hub) = start_server().await;
    let mut alice = connect(&addr).await;
    send(&mut alice, "create-game", json!({ "gameType": "fishbowl", "name": "alice" })).await;
    let code = recv(&mut alice).await["body"]["roomCode"]
        .as_str()
        .unwrap()
        .to_owned();

    let mut alice_again = connect(&addr).await;
    send(&mut alice_again, "join-game", json!({ "roomCode": code, "name": "alice" })).await;
    assert_eq!(recv(&mut alice_again).await["event"], "updated-room");

    let result = tokio::time::timeout(Duration::from_secs(2), alice.next()).await;
    match result {
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {} // expected
        Ok(Some(Err(_))) => {}                           // also fine
        other => panic!("expected close, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reconnect_with_room_and_name_in_query_resumes_player() {
    let (addr, hub) = start_server().await;
    let mut alice = connect(&addr).await;
    send(&mut alice, "create-game", json!({ "gameType": "fishbowl", "name": "alice smith" })).await;
    let code = recv(&mut alice).await["body"]["roomCode"]
        .as_str()
        .unwrap()
        .to_owned();

    let url = format!("ws://{addr}/ws?roomCode={code}&name=alice%20smith");
    let (mut resumed, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("should connect");

    // The snapshot arrives without a join-game.
    let snapshot = recv(&mut resumed).await;
    assert_eq!(snapshot["event"], "updated-room");
    assert_eq!(snapshot["body"]["teams"][0][0]["name"], "alice smith");
    assert_eq!(hub.player_count().await, 1);
    assert_eq!(hub.roster(&RoomCode::new(code)).await.unwrap(), vec!["alice smith"]);
}

#[tokio::test]
async fn test_reconnect_with_unknown_name_in_query_connects_blank() {
    let (addr, hub) = start_server().await;
    let mut alice = connect(&addr).await;
    send(&mut alice, "create-game", json!({ "gameType": "fishbowl", "name": "alice" })).await;
    let code = recv(&mut alice).await["body"]["roomCode"]
        .as_str()
        .unwrap()
        .to_owned();

    let url = format!("ws://{addr}/ws?roomCode={code}&name=mallory");
    let (mut stranger, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("should connect");

    let nothing = tokio::time::timeout(Duration::from_millis(100), stranger.next()).await;
    assert!(nothing.is_err(), "a stranger gets no snapshot");
    eventually(|| {
        let hub = hub.clone();
        async move { hub.connection_count().await == 2 }
    })
    .await;
    assert_eq!(hub.roster(&RoomCode::new(code)).await.unwrap(), vec!["alice"]);
}

#[tokio::test]
async fn test_multiple_rooms_independent() {
    let (addr, hub) = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    send(&mut ws1, "create-game", json!({ "gameType": "fishbowl", "name": "one" })).await;
    send(&mut ws2, "create-game", json!({ "gameType": "fishbowl", "name": "two" })).await;
    let code1 = recv(&mut ws1).await["body"]["roomCode"].clone();
    let code2 = recv(&mut ws2).await["body"]["roomCode"].clone();
    assert_ne!(code1, code2);

    send(&mut ws1, "add-team", json!({})).await;
    assert_eq!(recv(&mut ws1).await["event"], "updated-room");
    let nothing = tokio::time::timeout(Duration::from_millis(100), ws2.next()).await;
    assert!(nothing.is_err(), "second room should hear nothing");
    assert_eq!(hub.room_count().await, 2);
}
