//! Integration tests for the WebSocket transport.
//!
//! These tests spin up a real WebSocket listener and a `tokio-tungstenite`
//! client and check that frames flow both ways.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use gamenight_transport::{
        Connection, Transport, WebSocketConnection, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on an OS-assigned port, connects one client, and returns
    /// both ends.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        connected_pair_at("/").await
    }

    /// Like [`connected_pair`], but the client asks for `path` (which may
    /// carry a query string).
    async fn connected_pair_at(path: &str) -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (client_ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
                .await
                .expect("client should connect");
        let server_conn = server_handle.await.expect("task should complete");
        (server_conn, client_ws)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (server_conn, mut client_ws) = connected_pair().await;

        assert!(server_conn.id().into_inner() > 0);
        let peer = server_conn.peer_addr().expect("peer addr is known");
        assert!(peer.ip().is_loopback());

        // JSON goes out as a text frame.
        server_conn
            .send(br#"{"event":"updated-room"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"event":"updated-room"}"#);

        client_ws
            .send(Message::text(r#"{"action":"start-game"}"#))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"action":"start-game"}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_handshake_query_is_kept() {
        let (server_conn, _client_ws) =
            connected_pair_at("/ws?roomCode=4821&name=bob%20smith").await;

        assert_eq!(server_conn.query(), Some("roomCode=4821&name=bob%20smith"));
        assert_eq!(server_conn.query_param("roomCode").as_deref(), Some("4821"));
        assert_eq!(server_conn.query_param("name").as_deref(), Some("bob smith"));
        assert_eq!(server_conn.query_param("missing"), None);
    }

    #[tokio::test]
    async fn test_websocket_without_query_has_none() {
        let (server_conn, _client_ws) = connected_pair().await;

        assert_eq!(server_conn.query(), None);
        assert_eq!(server_conn.query_param("roomCode"), None);
    }

    #[tokio::test]
    async fn test_websocket_binary_frames_are_accepted() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws
            .send(Message::binary(b"raw bytes".to_vec()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, b"raw bytes");

        // Non-UTF-8 payloads fall back to binary frames.
        server_conn.send(&[0xff, 0xfe]).await.unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending_does_not_block() {
        let (server_conn, mut client_ws) = connected_pair().await;
        let server_conn = Arc::new(server_conn);

        // Park a reader in `recv` first, the way the connection handler does.
        let reader = {
            let conn = Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        tokio::time::timeout(Duration::from_secs(1), server_conn.send(b"ping"))
            .await
            .expect("send must not wait for the reader")
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"ping");

        client_ws.send(Message::text("pong")).await.unwrap();
        let received = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(received, b"pong");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }
}
