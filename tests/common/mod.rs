//! Shared utilities for integration testing against a local HTTP backend.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http::Uri;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the mock backend does with one request.
#[allow(dead_code)]
pub enum Reply {
    /// Waits `delay`, then answers `200 OK` with `body`.
    Ok { body: &'static str, delay: Duration },
    /// Closes the connection without answering.
    Drop,
    /// Holds the connection open and never answers.
    Hang,
}

impl Reply {
    #[allow(dead_code)]
    pub fn ok(body: &'static str) -> Self {
        Reply::Ok {
            body,
            delay: Duration::ZERO,
        }
    }

    #[allow(dead_code)]
    pub fn ok_after(delay: Duration) -> Self {
        Reply::Ok { body: "", delay }
    }
}

pub struct MockBackend {
    uri: Uri,
    hits: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn uri(&self) -> Uri {
        self.uri.clone()
    }

    /// Number of requests the backend has received so far.
    #[allow(dead_code)]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a backend on an ephemeral port. `f` receives the 1-based number of
/// each request in arrival order and decides how to answer it.
pub async fn start_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let f = Arc::new(f);

    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let f = Arc::clone(&f);
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                if !read_request_head(&mut socket).await {
                    return;
                }
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                match f(n).await {
                    Reply::Ok { body, delay } => {
                        tokio::time::sleep(delay).await;
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    Reply::Drop => drop(socket),
                    Reply::Hang => {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        drop(socket);
                    }
                }
            });
        }
    });

    MockBackend {
        uri: format!("http://{addr}/").parse().unwrap(),
        hits,
    }
}

async fn read_request_head(socket: &mut TcpStream) -> bool {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    return true;
                }
            }
        }
    }
}
