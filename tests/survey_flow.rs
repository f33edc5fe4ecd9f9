use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use survey_chat::client::{AnswerValue, QuestionKind, SurveyClient};
use survey_chat::core::{Config, FramingMode};

fn test_config(base: &str) -> Config {
    Config {
        api_base_url: base.to_string(),
        chat_path: "/api/v1/chat/".to_string(),
        survey_path: "/api/v1/survey-flow".to_string(),
        framing: FramingMode::Sse,
        raw_marker: None,
        cache_key: "chat-messages".to_string(),
        deadline_secs: None,
    }
}

fn http_json(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {len}\r\nconnection: close\r\n\r\n{body}",
        len = body.len()
    )
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = socket.read(&mut tmp).await.expect("read request");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(end) = find_subslice(&buf, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Serves one canned response per connection, in order, forwarding each
/// received request to the returned channel.
async fn serve_script(responses: Vec<String>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = mpsc::channel(responses.len());
    tokio::spawn(async move {
        for response in responses {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;
            tx.send(request).await.expect("forward request");
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            socket.shutdown().await.ok();
        }
    });
    (format!("http://{addr}"), rx)
}

#[tokio::test]
async fn test_survey_runs_start_answer_done() {
    let start_body =
        r#"{"response_id":"r-1","question":{"id":"q1","text":"How are you?","type":"text"}}"#;
    let next_body = r#"{"done":true}"#;
    let (base, mut requests) =
        serve_script(vec![http_json(start_body), http_json(next_body)]).await;
    let client = SurveyClient::new(test_config(&base));

    let step = client.start("inst-1").await.expect("start");
    assert_eq!(step.response_id.as_deref(), Some("r-1"));
    let question = step.question.expect("first question");
    assert_eq!(question.kind, QuestionKind::Text);
    assert_eq!(question.text, "How are you?");

    let start_request = requests.recv().await.expect("start request");
    assert!(
        start_request.starts_with("POST /api/v1/survey-flow/instance/inst-1/start"),
        "unexpected request line: {start_request}"
    );

    let answer = AnswerValue::Text("fine".to_string());
    let next = client
        .answer("r-1", "q1", Some(&answer), false)
        .await
        .expect("answer");
    assert!(next.done);
    assert!(next.question.is_none());

    let answer_request = requests.recv().await.expect("answer request");
    assert!(answer_request.starts_with("POST /api/v1/survey-flow/responses/r-1/answer"));
    assert!(answer_request.contains(r#""question_id":"q1""#));
    assert!(answer_request.contains(r#""answer":{"value":"fine"}"#));
    assert!(answer_request.contains(r#""skipped":false"#));
}

#[tokio::test]
async fn test_skipped_answer_sends_null_value() {
    let next_body = r#"{"question":{"id":"q2","text":"Rate us","type":"rating","min":1,"max":5}}"#;
    let (base, mut requests) = serve_script(vec![http_json(next_body)]).await;
    let client = SurveyClient::new(test_config(&base));

    let next = client.answer("r-1", "q1", None, true).await.expect("skip");
    assert!(!next.done);
    let question = next.question.expect("next question");
    assert_eq!(question.kind, QuestionKind::Rating);
    assert_eq!(question.min, Some(1));

    let request = requests.recv().await.expect("request");
    assert!(request.contains(r#""answer":null"#));
    assert!(request.contains(r#""skipped":true"#));
}

#[tokio::test]
async fn test_multi_choice_answer_sends_selection_array() {
    let next_body = r#"{"done":true}"#;
    let (base, mut requests) = serve_script(vec![http_json(next_body)]).await;
    let client = SurveyClient::new(test_config(&base));

    let answer = AnswerValue::Selection(vec!["a".to_string(), "c".to_string()]);
    client
        .answer("r-9", "q7", Some(&answer), false)
        .await
        .expect("answer");

    let request = requests.recv().await.expect("request");
    assert!(request.contains(r#""answer":{"value":["a","c"]}"#));
}
