//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a `tokio-tungstenite` client to check
//! that text frames, request paths and close codes survive the network.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;

    use igvroom_transport::{
        Connection, Transport, Upgrade, WebSocketConnection, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on an OS-assigned port and returns the transport and address.
    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    async fn accept(transport: &mut WebSocketTransport) -> WebSocketConnection {
        let upgrade = transport.accept().await.expect("should accept");
        upgrade.upgrade().await.expect("should upgrade")
    }

    async fn connect_client(addr: &str, path: &str) -> ClientWs {
        let url = format!("ws://{addr}{path}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            accept(&mut transport).await
        });
        let mut client_ws = connect_client(&addr, "/api/rooms/doc1/websocket").await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);
        assert_eq!(server_conn.request_path(), "/api/rooms/doc1/websocket");

        // Server sends, client receives a text frame.
        server_conn
            .send(r#"{"ready":true}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"ready":true}"#);

        // Client sends, server receives.
        client_ws
            .send(Message::Text(r#"{"name":"Alice"}"#.to_owned().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"name":"Alice"}"#);
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            accept(&mut transport).await
        });

        let mut client_ws = connect_client(&addr, "/").await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_close_carries_code_and_reason() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            accept(&mut transport).await
        });

        let mut client_ws = connect_client(&addr, "/").await;
        let server_conn = server_handle.await.unwrap();

        server_conn
            .close(1009, "Name too long.")
            .await
            .expect("close should succeed");

        match client_ws.next().await {
            Some(Ok(Message::Close(Some(frame)))) => {
                assert_eq!(u16::from(frame.code), 1009);
                assert_eq!(frame.reason.as_str(), "Name too long.");
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_without_blocking_accept() {
        let (transport, addr) = bind().await;
        let mut transport = transport.with_handshake_timeout(Duration::from_millis(200));

        // Connects but never sends the HTTP upgrade request.
        let _silent = tokio::net::TcpStream::connect(&addr).await.unwrap();
        let stalled = transport.accept().await.expect("should accept");
        let stalled = tokio::spawn(stalled.upgrade());

        let server_handle = tokio::spawn(async move { accept(&mut transport).await });
        let _client_ws = connect_client(&addr, "/rooms/next").await;
        let server_conn = tokio::time::timeout(Duration::from_secs(2), server_handle)
            .await
            .expect("second peer should not wait on the first")
            .unwrap();
        assert_eq!(server_conn.request_path(), "/rooms/next");

        let result = tokio::time::timeout(Duration::from_secs(2), stalled)
            .await
            .expect("handshake should time out")
            .unwrap();
        assert!(result.is_err());
    }
}
