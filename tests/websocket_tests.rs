// End-to-end tests for the WebSocket transport against a local server
//
// The server announces a session, then answers every binary frame with a
// transcription naming the frame's position and size.

use futures::{SinkExt, StreamExt};
use live_transcribe::{SessionCoordinator, SessionError};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

async fn spawn_transcription_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

                let init = json!({ "type": "session_init", "session_id": "srv-1" });
                ws.send(Message::Text(init.to_string())).await.unwrap();

                let mut count = 0;
                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Binary(data) => {
                            count += 1;
                            let reply = json!({
                                "type": "transcription",
                                "text": format!("chunk{}-{}b", count, data.len()),
                                "timestamp": 1700000000.5,
                                "audio_file": format!("/tmp/chunk_{}.wav", count),
                            });
                            if ws.send(Message::Text(reply.to_string())).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });
        }
    });

    addr
}

#[tokio::test]
async fn test_stream_chunks_over_websocket() {
    let addr = spawn_transcription_server().await;
    let session = SessionCoordinator::websocket();

    session
        .connect_with_deadline(&format!("ws://{}/ws/transcribe", addr), Duration::from_secs(5))
        .await
        .unwrap();
    assert!(session.is_connected());

    for chunk in [&b"abc"[..], &b"abcd"[..], &b"abcde"[..]] {
        session.send_chunk(chunk.to_vec()).unwrap();
    }

    session
        .finalize_with_deadline(Duration::from_secs(5))
        .await
        .unwrap();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.transcription, "chunk1-3b chunk2-4b chunk3-5b ");
    assert_eq!(snapshot.session_id.as_deref(), Some("srv-1"));
    assert_eq!(snapshot.sent_count, 3);
    assert_eq!(snapshot.received_count, 3);
    assert!(!snapshot.connected);

    let transcript = session.transcript();
    assert_eq!(transcript[2].timestamp, Some(1700000000.5));
    assert_eq!(transcript[2].audio_file.as_deref(), Some("/tmp/chunk_3.wav"));

    session.cleanup();
    assert!(!session.has_worker());
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = SessionCoordinator::websocket();
    let err = session
        .connect_with_deadline(&format!("ws://{}/ws/transcribe", addr), Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        SessionError::Connect(message) => assert!(message.starts_with("Failed to connect to")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!session.is_connected());
    assert!(session.last_error().is_some());
}
