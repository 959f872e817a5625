use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use muxpick::picker;

/// Minimal HTTP endpoint standing in for a listening fzf. Records each
/// request body; responds 500 to bodies starting with `fail_on`.
async fn spawn_stub(fail_on: Option<&'static str>) -> (u16, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&bodies);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stream);
                let mut content_length = 0usize;
                let mut line = String::new();
                loop {
                    line.clear();
                    if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                        return;
                    }
                    let header = line.trim().to_ascii_lowercase();
                    if header.is_empty() {
                        break;
                    }
                    if let Some(value) = header.strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }

                let mut body = vec![0u8; content_length];
                if reader.read_exact(&mut body).await.is_err() {
                    return;
                }
                let body = String::from_utf8_lossy(&body).into_owned();
                let fail = fail_on.is_some_and(|needle| body.starts_with(needle));
                recorded.lock().unwrap().push(body);

                let response = if fail {
                    "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                } else {
                    "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                };
                let _ = reader.get_mut().write_all(response.as_bytes()).await;
            });
        }
    });

    (port, bodies)
}

#[tokio::test]
async fn refresh_sends_header_content_and_cursor_commands() {
    let (port, bodies) = spawn_stub(None).await;

    picker::refresh(port, "the header", "session  api  ~/api  |api|session|$1\n")
        .await
        .unwrap();

    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies.len(), 3);
    assert!(bodies.iter().any(|b| b == "change-header(the header)"));
    assert!(bodies.iter().any(|b| b.starts_with("reload-sync(cat ")));
    assert!(bodies.iter().any(|b| b == "first"));
}

#[tokio::test]
async fn one_failing_command_still_lets_the_others_through() {
    let (port, bodies) = spawn_stub(Some("first")).await;

    let err = picker::refresh(port, "h", "content\n").await.unwrap_err();
    assert!(err.to_string().contains("picker refresh failed"));

    // The failure never short-circuits the other two commands.
    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies.len(), 3);
    assert!(bodies.iter().any(|b| b.starts_with("change-header(")));
    assert!(bodies.iter().any(|b| b.starts_with("reload-sync(")));
}

#[tokio::test]
async fn refresh_against_absent_picker_fails() {
    // Grab a free port, then close it before refreshing.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = picker::refresh(port, "h", "content\n").await.unwrap_err();
    assert!(err.to_string().contains("picker refresh failed"));
}
