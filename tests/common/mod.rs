//! Shared fixtures: a tiny local HTTP tile server and a recording tile source.

#![allow(dead_code)]

use slippy_view::{Tile, TileCoord, TileSource};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// One request seen by [`TileServer`].
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub user_agent: Option<String>,
}

/// Serves `tile:<path>` for every GET, and 404 for paths containing
/// `missing`.
pub struct TileServer {
    port: u16,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl TileServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let port = listener.local_addr().unwrap().port();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let log = Arc::clone(&log);
                thread::spawn(move || handle(stream, &log));
            }
        });
        Self { port, seen }
    }

    pub fn url(&self, template: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, template)
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

fn handle(stream: TcpStream, log: &Mutex<Vec<SeenRequest>>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    let mut user_agent = None;
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header == "\r\n" => break,
            Ok(_) => {
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("user-agent") {
                        user_agent = Some(value.trim().to_string());
                    }
                }
            }
        }
    }

    log.lock().unwrap().push(SeenRequest {
        path: path.clone(),
        user_agent,
    });

    let (status, body) = if path.contains("missing") {
        ("404 Not Found", "no such tile".to_string())
    } else {
        ("200 OK", format!("tile:{path}"))
    };
    let mut stream = stream;
    let _ = write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.flush();
}

/// Records every fill and optionally resolves tiles immediately.
pub struct RecordingSource {
    pub filled: Mutex<Vec<TileCoord>>,
    pub immediate: bool,
    pub max_zoom: u8,
}

impl RecordingSource {
    pub fn new(immediate: bool) -> Self {
        Self {
            filled: Mutex::new(Vec::new()),
            immediate,
            max_zoom: 19,
        }
    }

    pub fn fills(&self) -> Vec<TileCoord> {
        self.filled.lock().unwrap().clone()
    }

    pub fn fill_count(&self) -> usize {
        self.filled.lock().unwrap().len()
    }
}

impl TileSource for RecordingSource {
    fn min_zoom(&self) -> u8 {
        0
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    fn tile_size(&self) -> u32 {
        256
    }

    fn fill_tile(&self, tile: &mut Tile) {
        self.filled.lock().unwrap().push(tile.coord());
        if self.immediate {
            tile.set_source(format!("{}_{}_{}.png", tile.zoom(), tile.coord().x, tile.coord().y));
        }
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}
