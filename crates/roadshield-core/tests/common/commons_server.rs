//! Minimal HTTP/1.1 server imitating the Commons API for integration tests.
//!
//! `GET /w/api.php?...titles=File%3A<name>...` answers with an `imageinfo`
//! payload whose thumbnail points back at this server; `GET /thumb/<name>.png`
//! serves a fixed PNG. File names starting with `Missing` get a "missing" page.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
pub struct CommonsOptions {
    /// Content type sent with metadata responses.
    pub metadata_content_type: &'static str,
    /// Body served for every thumbnail request.
    pub thumbnail_png: Vec<u8>,
    /// Size reported in `thumbwidth`/`thumbheight`.
    pub thumbnail_size: (u32, u32),
}

pub struct CommonsServer {
    /// Base URL with trailing slash, e.g. "http://127.0.0.1:12345/".
    pub base: String,
    pub metadata_hits: Arc<AtomicUsize>,
    pub thumbnail_hits: Arc<AtomicUsize>,
}

impl CommonsServer {
    pub fn api_endpoint(&self) -> String {
        format!("{}w/api.php", self.base)
    }

    pub fn metadata_hits(&self) -> usize {
        self.metadata_hits.load(Ordering::SeqCst)
    }

    pub fn thumbnail_hits(&self) -> usize {
        self.thumbnail_hits.load(Ordering::SeqCst)
    }
}

/// Starts the server in a background thread. It runs until the process exits.
pub fn start(opts: CommonsOptions) -> CommonsServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}/", port);
    let metadata_hits = Arc::new(AtomicUsize::new(0));
    let thumbnail_hits = Arc::new(AtomicUsize::new(0));
    let opts = Arc::new(opts);
    {
        let base = base.clone();
        let metadata_hits = Arc::clone(&metadata_hits);
        let thumbnail_hits = Arc::clone(&thumbnail_hits);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let opts = Arc::clone(&opts);
                let base = base.clone();
                let metadata_hits = Arc::clone(&metadata_hits);
                let thumbnail_hits = Arc::clone(&thumbnail_hits);
                thread::spawn(move || {
                    handle(stream, &base, &opts, &metadata_hits, &thumbnail_hits)
                });
            }
        });
    }
    CommonsServer {
        base,
        metadata_hits,
        thumbnail_hits,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    base: &str,
    opts: &CommonsOptions,
    metadata_hits: &AtomicUsize,
    thumbnail_hits: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("");

    if target.starts_with("/w/api.php?") {
        metadata_hits.fetch_add(1, Ordering::SeqCst);
        let file = target
            .split("titles=File%3A")
            .nth(1)
            .and_then(|rest| rest.split('&').next())
            .unwrap_or("");
        let body = if file.starts_with("Missing") {
            format!(
                r#"{{"query":{{"pages":{{"-1":{{"ns":6,"title":"File:{file}","missing":""}}}}}}}}"#
            )
        } else {
            let (w, h) = opts.thumbnail_size;
            format!(
                r#"{{"batchcomplete":"","query":{{"pages":{{"4711":{{"title":"File:{file}","imageinfo":[{{"thumburl":"{base}thumb/{file}.png","thumbwidth":{w},"thumbheight":{h}}}]}}}}}}}}"#
            )
        };
        respond(&mut stream, "200 OK", opts.metadata_content_type, body.as_bytes());
        return;
    }
    if target.starts_with("/thumb/") {
        thumbnail_hits.fetch_add(1, Ordering::SeqCst);
        respond(&mut stream, "200 OK", "image/png", &opts.thumbnail_png);
        return;
    }
    respond(&mut stream, "404 Not Found", "text/plain", b"not found");
}

fn respond(stream: &mut std::net::TcpStream, status: &str, content_type: &str, body: &[u8]) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}
