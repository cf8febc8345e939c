//! HTTP surface for the two feeds and camera control.
//!
//! A small hand-rolled HTTP/1.1 server over `TcpListener`:
//! - `GET /raw_feed` streams the unprocessed camera feed
//! - `GET /video_feed` streams the detection-annotated feed
//! - `POST /select_camera` switches the active device index
//! - `GET /health` liveness probe
//!
//! Feed connections are long lived, so every accepted connection gets its
//! own thread; the accept loop stays non-blocking so shutdown is observed
//! within one poll interval.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::camera::SharedCamera;
use crate::pipeline::DetectionPipeline;
use crate::stream::{AnnotatedStream, RawStream, MULTIPART_MIME};

const MAX_REQUEST_BYTES: usize = 8192;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop accepting connections and join the accept thread. Feed threads
    /// notice the flag at their next frame write.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("stream server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct StreamServer {
    cfg: ServerConfig,
    camera: SharedCamera,
    pipeline: Arc<Mutex<DetectionPipeline>>,
}

impl StreamServer {
    pub fn new(
        cfg: ServerConfig,
        camera: SharedCamera,
        pipeline: Arc<Mutex<DetectionPipeline>>,
    ) -> Self {
        Self {
            cfg,
            camera,
            pipeline,
        }
    }

    pub fn spawn(self) -> Result<ServerHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        log::info!("server: listening on http://{}", addr);

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let camera = self.camera;
        let pipeline = self.pipeline;
        let join = std::thread::spawn(move || {
            if let Err(err) = accept_loop(listener, camera, pipeline, shutdown_thread) {
                log::error!("stream server stopped: {}", err);
            }
        });

        Ok(ServerHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn accept_loop(
    listener: TcpListener,
    camera: SharedCamera,
    pipeline: Arc<Mutex<DetectionPipeline>>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                let camera = Arc::clone(&camera);
                let pipeline = Arc::clone(&pipeline);
                let shutdown = Arc::clone(&shutdown);
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, camera, pipeline, shutdown) {
                        log::warn!("server: request failed: {:#}", err);
                    }
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(
    mut stream: TcpStream,
    camera: SharedCamera,
    pipeline: Arc<Mutex<DetectionPipeline>>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let request = read_request(&mut stream)?;
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => write_json_response(&mut stream, 200, r#"{"status":"ok"}"#),
        ("GET", "/raw_feed") => stream_feed(stream, RawStream::new(camera), shutdown),
        ("GET", "/video_feed") => {
            stream_feed(stream, AnnotatedStream::new(camera, pipeline), shutdown)
        }
        ("POST", "/select_camera") => select_camera(&mut stream, &request, &camera),
        ("POST", _) | ("GET", _) => {
            write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#)
        }
        _ => write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#),
    }
}

/// Write the multipart header, then wire frames until the stream ends, the
/// client hangs up, or the server shuts down.
fn stream_feed<S>(mut stream: TcpStream, parts: S, shutdown: Arc<AtomicBool>) -> Result<()>
where
    S: Iterator<Item = Vec<u8>>,
{
    // Streams never carry a Content-Length; the connection closes instead.
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        MULTIPART_MIME
    );
    stream.write_all(header.as_bytes())?;

    for part in parts {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        if stream.write_all(&part).is_err() {
            // Viewer disconnected.
            break;
        }
    }
    Ok(())
}

fn select_camera(stream: &mut TcpStream, request: &HttpRequest, camera: &SharedCamera) -> Result<()> {
    let index = match parse_camera_form(&request.body) {
        Some(index) => index,
        None => {
            return write_json_response(
                stream,
                400,
                r#"{"error":"expected form field camera=<index>"}"#,
            );
        }
    };

    let selected = camera
        .lock()
        .map_err(|_| anyhow!("camera lock poisoned"))
        .and_then(|mut camera| camera.select(index));
    match selected {
        Ok(()) => {
            let body = format!(r#"{{"status":"ok","camera":{}}}"#, index);
            write_json_response(stream, 200, &body)
        }
        Err(err) => {
            log::warn!("server: camera select failed: {:#}", err);
            let body = format!(r#"{{"error":"{}"}}"#, "camera_unavailable");
            write_json_response(stream, 400, &body)
        }
    }
}

/// Extract the device index from a urlencoded `camera=<index>` form body.
fn parse_camera_form(body: &str) -> Option<u32> {
    for pair in body.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == "camera" {
                return value.parse().ok();
            }
        }
    }
    None
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    let header_end = loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break data.len();
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    // Read the remainder of the body if Content-Length says there is one.
    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if header_end + content_length > MAX_REQUEST_BYTES {
        return Err(anyhow!("request too large"));
    }
    while data.len() < header_end + content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("request body truncated"));
        }
        data.extend_from_slice(&buf[..n]);
    }
    let body = String::from_utf8_lossy(&data[header_end..header_end + content_length]).into_owned();

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        body,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: String,
}
