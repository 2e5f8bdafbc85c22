//! Minimal HTTP/1.1 server for integration tests.
//!
//! Each path has a script of replies consumed in order; the last reply
//! repeats. `Reply::File` honours `Range: bytes=X-` with 206 (or 416 past the
//! end). Every request is logged with its target and range so tests can check
//! what the client asked for. One request per connection (`Connection: close`).

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with `body`, or a Range slice of it.
    File {
        body: Vec<u8>,
        headers: Vec<(String, String)>,
        /// Pause between headers and body.
        delay: Option<Duration>,
    },
    /// Fixed status and body; Range is ignored.
    Status {
        code: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    },
}

impl Reply {
    pub fn file(body: impl Into<Vec<u8>>) -> Self {
        Reply::File {
            body: body.into(),
            headers: Vec::new(),
            delay: None,
        }
    }

    pub fn slow_file(body: impl Into<Vec<u8>>, delay: Duration) -> Self {
        Reply::File {
            body: body.into(),
            headers: Vec::new(),
            delay: Some(delay),
        }
    }

    pub fn status(code: u16) -> Self {
        Reply::Status {
            code,
            headers: Vec::new(),
            body: format!("status {}\n", code).into_bytes(),
        }
    }

    /// 200 with a text body (API answers).
    pub fn text(body: &str) -> Self {
        Reply::Status {
            code: 200,
            headers: vec![("Content-Type".into(), "text/plain".into())],
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn throttled(retry_after_secs: u64) -> Self {
        Reply::status(503).with_header("Retry-After", &retry_after_secs.to_string())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match &mut self {
            Reply::File { headers, .. } | Reply::Status { headers, .. } => {
                headers.push((name.to_string(), value.to_string()))
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Request target including the query string.
    pub target: String,
    /// `(start, end_inclusive)` of a `Range: bytes=` header.
    pub range: Option<(u64, u64)>,
    pub user_agent: Option<String>,
}

impl Request {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or(&self.target)
    }

    pub fn query(&self) -> HashMap<String, String> {
        let url = url::Url::parse(&format!("http://h{}", self.target)).expect("target");
        url.query_pairs().into_owned().collect()
    }
}

type Routes = Arc<Mutex<HashMap<String, VecDeque<Reply>>>>;

pub struct TestServer {
    base: String,
    routes: Routes,
    log: Arc<Mutex<Vec<Request>>>,
}

impl TestServer {
    /// Binds 127.0.0.1 on a free port and serves until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes: Routes = Arc::default();
        let log: Arc<Mutex<Vec<Request>>> = Arc::default();
        {
            let routes = Arc::clone(&routes);
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for stream in listener.incoming().flatten() {
                    let routes = Arc::clone(&routes);
                    let log = Arc::clone(&log);
                    thread::spawn(move || handle(stream, &routes, &log));
                }
            });
        }
        TestServer {
            base: format!("http://127.0.0.1:{}", port),
            routes,
            log,
        }
    }

    /// Base URL without trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Scripts replies for `path` (without query). Replaces earlier scripts.
    pub fn route(&self, path: &str, replies: Vec<Reply>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), replies.into());
    }

    pub fn requests(&self) -> Vec<Request> {
        self.log.lock().unwrap().clone()
    }

    pub fn requests_for(&self, path: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.path() == path)
            .collect()
    }
}

fn next_reply(routes: &Routes, path: &str) -> Option<Reply> {
    let mut routes = routes.lock().unwrap();
    let script = routes.get_mut(path)?;
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

fn handle(mut stream: TcpStream, routes: &Routes, log: &Mutex<Vec<Request>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let reply = next_reply(routes, request.path());
    let range = request.range;
    log.lock().unwrap().push(request);

    let Some(reply) = reply else {
        write_response(&mut stream, "404 Not Found", &[], b"no route\n", None);
        return;
    };
    match reply {
        Reply::Status {
            code,
            headers,
            body,
        } => {
            let status = format!("{} {}", code, reason(code));
            write_response(&mut stream, &status, &headers, &body, None);
        }
        Reply::File {
            body,
            mut headers,
            delay,
        } => {
            let total = body.len() as u64;
            let Some((start, end_incl)) = range else {
                write_response(&mut stream, "200 OK", &headers, &body, delay);
                return;
            };
            if start >= total {
                headers.push(("Content-Range".into(), format!("bytes */{}", total)));
                write_response(&mut stream, "416 Range Not Satisfiable", &headers, b"", None);
                return;
            }
            let end_excl = end_incl.saturating_add(1).min(total);
            headers.push((
                "Content-Range".into(),
                format!("bytes {}-{}/{}", start, end_excl - 1, total),
            ));
            let slice = &body[start as usize..end_excl as usize];
            write_response(&mut stream, "206 Partial Content", &headers, slice, delay);
        }
    }
}

fn write_response(
    stream: &mut TcpStream,
    status: &str,
    headers: &[(String, String)],
    body: &[u8],
    delay: Option<Duration>,
) {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    if let Some(d) = delay {
        let _ = stream.flush();
        thread::sleep(d);
    }
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let text = String::from_utf8_lossy(&buf);
    let mut lines = text.split("\r\n");
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let target = first.next()?.to_string();

    let mut range = None;
    let mut user_agent = None;
    for line in lines.take_while(|l| !l.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.trim().eq_ignore_ascii_case("range") {
            range = parse_range(value);
        } else if name.trim().eq_ignore_ascii_case("user-agent") {
            user_agent = Some(value.to_string());
        }
    }
    Some(Request {
        method,
        target,
        range,
        user_agent,
    })
}

/// `bytes=X-` or `bytes=X-Y`.
fn parse_range(value: &str) -> Option<(u64, u64)> {
    let spec = value.strip_prefix("bytes=")?;
    let (a, b) = spec.split_once('-')?;
    let start = a.trim().parse().ok()?;
    let end = if b.trim().is_empty() {
        u64::MAX
    } else {
        b.trim().parse().ok()?
    };
    Some((start, end))
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        404 => "Not Found",
        403 => "Forbidden",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
