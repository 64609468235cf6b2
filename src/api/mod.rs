//! HTTP transport for the leaf-health pipeline.
//!
//! - `GET /health` answers `{"status":"ok"}`.
//! - `POST /predict` takes a `multipart/form-data` upload (field `file`, or
//!   `image`) or a raw `image/*` body and answers a `PredictResponse`.
//!
//! One accept thread hands each connection to a worker thread and closes it
//! after a single response. At most `max_in_flight` workers run at once;
//! further connections wait in the listen backlog until a worker finishes.
//! `ApiHandle::stop` lets in-flight requests finish before returning.

pub mod multipart;

use crate::error::PipelineError;
use crate::frame::decode_image;
use crate::pipeline::{LeafHealthPipeline, PredictResponse};
use anyhow::{anyhow, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const MAX_HEADER_BYTES: usize = 8192;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_MAX_IN_FLIGHT: usize = 4;
const UPLOAD_FIELDS: &[&str] = &["file", "image"];

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
    pub max_upload_bytes: usize,
    /// Upper bound on concurrently served connections.
    pub max_in_flight: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    pipeline: Arc<LeafHealthPipeline>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, pipeline: LeafHealthPipeline) -> Self {
        Self {
            cfg,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        if self.cfg.max_in_flight == 0 {
            return Err(anyhow!("max_in_flight must be greater than zero"));
        }
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let cfg = self.cfg.clone();
        let pipeline = self.pipeline.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, cfg, pipeline, shutdown_thread) {
                log::error!("predict api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    cfg: ApiConfig,
    pipeline: Arc<LeafHealthPipeline>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let mut workers: Vec<JoinHandle<()>> = Vec::new();
    let result = loop {
        if shutdown.load(Ordering::SeqCst) {
            break Ok(());
        }
        reap_finished(&mut workers);
        if workers.len() >= cfg.max_in_flight {
            std::thread::sleep(Duration::from_millis(10));
            continue;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                let cfg = cfg.clone();
                let pipeline = pipeline.clone();
                workers.push(std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &cfg, &pipeline) {
                        log::warn!("predict api request from {} rejected: {}", peer, err);
                    }
                }));
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => break Err(err.into()),
        }
    };

    if !workers.is_empty() {
        log::info!("waiting for {} in-flight request(s)", workers.len());
    }
    for worker in workers {
        if worker.join().is_err() {
            log::error!("predict api worker panicked");
        }
    }
    result
}

fn reap_finished(workers: &mut Vec<JoinHandle<()>>) {
    let (done, running): (Vec<_>, Vec<_>) =
        std::mem::take(workers).into_iter().partition(|w| w.is_finished());
    for worker in done {
        if worker.join().is_err() {
            log::error!("predict api worker panicked");
        }
    }
    *workers = running;
}

fn handle_connection(
    mut stream: TcpStream,
    cfg: &ApiConfig,
    pipeline: &LeafHealthPipeline,
) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;

    let mut request = read_head(&mut stream)?;
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => {
            return write_json_response(&mut stream, 200, r#"{"status":"ok"}"#);
        }
        ("POST", "/predict") => {}
        (_, "/health") | (_, "/predict") => {
            return write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#);
        }
        _ => return write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#),
    }

    let Some(content_length) = request.content_length() else {
        return write_json_response(&mut stream, 411, r#"{"error":"length_required"}"#);
    };
    if content_length > cfg.max_upload_bytes {
        return write_json_response(&mut stream, 413, r#"{"error":"upload_too_large"}"#);
    }
    if request
        .header("expect")
        .is_some_and(|v| v.eq_ignore_ascii_case("100-continue"))
    {
        stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n")?;
    }
    read_body(&mut stream, &mut request.body, content_length)?;

    let image_bytes = match extract_image(request) {
        Ok(bytes) => bytes,
        Err(reject) => return write_json_response(&mut stream, reject.status, &reject.body()),
    };

    let start = Instant::now();
    let result = decode_image(&image_bytes).and_then(|image| {
        let outcome = pipeline.evaluate(&image)?;
        Ok((image.digest_hex(), outcome))
    });
    match result {
        Ok((digest, outcome)) => {
            let response = PredictResponse::from(&outcome);
            log::info!(
                "predict image={} status={} healthy={} diseased={} uncertain={} filtered={} in {:.1}ms",
                &digest[..12],
                response.status,
                response.summary.healthy,
                response.summary.diseased,
                response.summary.uncertain,
                response.summary.filtered,
                start.elapsed().as_secs_f64() * 1000.0
            );
            let payload = serde_json::to_vec(&response)?;
            write_response(&mut stream, 200, "application/json", &payload)
        }
        Err(err) => {
            match &err {
                PipelineError::MalformedImage(_) => log::warn!("predict rejected: {}", err),
                _ => log::error!("predict failed: {}", err),
            }
            let payload = serde_json::to_vec(&serde_json::json!({
                "error": err.to_string(),
                "code": err.code(),
            }))?;
            write_response(&mut stream, err.http_status(), "application/json", &payload)
        }
    }
}

/// Client error detected before the pipeline runs.
struct Reject {
    status: u16,
    error: &'static str,
}

impl Reject {
    fn body(&self) -> String {
        format!(r#"{{"error":"{}"}}"#, self.error)
    }
}

fn extract_image(request: HttpRequest) -> std::result::Result<Bytes, Reject> {
    let content_type = request.header("content-type").unwrap_or("").to_string();
    if let Some(boundary) = multipart::boundary(&content_type) {
        let parts = multipart::parse(request.body, &boundary).map_err(|err| {
            log::warn!("predict upload rejected: {:#}", err);
            Reject {
                status: 400,
                error: "malformed_multipart",
            }
        })?;
        return multipart::find_field(&parts, UPLOAD_FIELDS)
            .map(|part| part.data.clone())
            .ok_or(Reject {
                status: 400,
                error: "missing_file",
            });
    }
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    if mime.starts_with("image/") || mime == "application/octet-stream" {
        if request.body.is_empty() {
            return Err(Reject {
                status: 400,
                error: "missing_file",
            });
        }
        return Ok(Bytes::from(request.body));
    }
    Err(Reject {
        status: 415,
        error: "unsupported_content_type",
    })
}

fn read_head(stream: &mut TcpStream) -> Result<HttpRequest> {
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let head_end = loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before request head"));
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(anyhow!("request head too large"));
        }
    };

    let text = String::from_utf8_lossy(&data[..head_end]).into_owned();
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }
    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_uppercase(),
        path,
        headers,
        body: data[head_end + 4..].to_vec(),
    })
}

fn read_body(stream: &mut TcpStream, body: &mut Vec<u8>, content_length: usize) -> Result<()> {
    if body.len() > content_length {
        body.truncate(content_length);
        return Ok(());
    }
    let remaining = content_length - body.len();
    body.reserve(remaining);
    stream.take(remaining as u64).read_to_end(body)?;
    if body.len() != content_length {
        return Err(anyhow!(
            "request body truncated: expected {} bytes, got {}",
            content_length,
            body.len()
        ));
    }
    Ok(())
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
        411 => "HTTP/1.1 411 Length Required",
        413 => "HTTP/1.1 413 Payload Too Large",
        415 => "HTTP/1.1 415 Unsupported Media Type",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl HttpRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn content_length(&self) -> Option<usize> {
        self.header("content-length")?.parse().ok()
    }
}
