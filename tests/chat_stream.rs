use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use survey_chat::client::{ChatBackend, ChatClient, ChatSession, Outcome};
use survey_chat::core::transcript::Role;
use survey_chat::core::{ClientError, Config, FramingMode};

fn test_config(base: &str, framing: FramingMode) -> Config {
    Config {
        api_base_url: base.to_string(),
        chat_path: "/api/v1/chat/".to_string(),
        survey_path: "/api/v1/survey-flow".to_string(),
        framing,
        raw_marker: None,
        cache_key: "chat-messages".to_string(),
        deadline_secs: None,
    }
}

/// Serves one connection with a canned HTTP response, then exits.
async fn serve_once(response: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        socket.shutdown().await.ok();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_non_success_status_fails_before_any_event() {
    let base = serve_once(
        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 4\r\nconnection: close\r\n\r\noops"
            .to_string(),
    )
    .await;
    let client = ChatClient::new(test_config(&base, FramingMode::Sse));

    let result = client.stream_reply("hi", CancellationToken::new()).await;
    match result {
        Err(ClientError::Transport(message)) => {
            assert!(
                message.contains("500"),
                "Expected status in message, got: {message}"
            );
        }
        Err(other) => panic!("Expected transport failure, got: {other}"),
        Ok(_) => panic!("Expected transport failure, got a stream"),
    }
}

#[tokio::test]
async fn test_streamed_reply_lands_in_transcript() {
    let body = "event: message\ndata: Hello\n\nevent: message\ndata: there\n\nevent: done\ndata: done\n\n";
    let base = serve_once(format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n{body}"
    ))
    .await;

    let client = Box::new(ChatClient::new(test_config(&base, FramingMode::Sse)));
    let mut session = ChatSession::new(client, None).expect("session");
    let mut out = Vec::new();

    let outcome = session.send("hi", &mut out).await.expect("send");
    assert_eq!(outcome, Outcome::Completed);

    let entries = session.transcript().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, Role::User);
    assert_eq!(entries[1].role, Role::Assistant);
    assert_eq!(entries[1].content, "Hellothere");
    assert_eq!(String::from_utf8(out).expect("utf8"), "Hellothere");
}

#[tokio::test]
async fn test_raw_framing_reply_over_http() {
    let body = "data: Hello from\ndata:  raw mode";
    let base = serve_once(format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\nconnection: close\r\n\r\n{body}"
    ))
    .await;

    let client = Box::new(ChatClient::new(test_config(&base, FramingMode::Raw)));
    let mut session = ChatSession::new(client, None).expect("session");
    let mut out = Vec::new();

    session.send("hi", &mut out).await.expect("send");
    assert_eq!(
        session.transcript().entries()[1].content,
        "Hello from raw mode"
    );
}
