#![allow(dead_code)]

use std::io::{self, Read};
use std::net::TcpListener;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Response, Server};

/// A request as seen by the mock time-series endpoint
#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

/// Mock write endpoint answering a fixed number of requests
pub struct MockEndpoint {
    pub url: String,
    received: mpsc::Receiver<Received>,
    handle: JoinHandle<()>,
}

impl MockEndpoint {
    /// Serve `statuses.len()` requests, answering each with the next status
    pub fn start(statuses: Vec<u16>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let (tx, received) = mpsc::channel();

        let handle = thread::spawn(move || {
            for status in statuses {
                let mut request = match server.recv_timeout(Duration::from_secs(10)) {
                    Ok(Some(request)) => request,
                    _ => return,
                };

                let header = |name: &'static str| {
                    request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv(name))
                        .map(|h| h.value.as_str().to_string())
                };
                let authorization = header("Authorization");
                let content_type = header("Content-Type");

                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);

                let _ = tx.send(Received {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    authorization,
                    content_type,
                    body,
                });

                let response = if status == 204 {
                    Response::from_string("").with_status_code(204)
                } else {
                    Response::from_string("write rejected").with_status_code(status)
                };
                let _ = request.respond(response);
            }
        });

        Self {
            url: format!("http://127.0.0.1:{port}/write?db=hosts"),
            received,
            handle,
        }
    }

    /// Requests seen so far, after the server thread has finished
    pub fn finish(self) -> Vec<Received> {
        let _ = self.handle.join();
        self.received.try_iter().collect()
    }
}

/// URL of a local port nothing listens on
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/write")
}

#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a scoped subscriber and return what it logged at INFO and above
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    (result, logs)
}
