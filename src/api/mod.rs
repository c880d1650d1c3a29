use crate::analysis::{AnalysisRequest, Analyzer};
use crate::error::AnalysisError;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const MAX_HEADER_BYTES: usize = 8192;
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(10);

pub const ANALYZE_PATHS: &[&str] = &["/analyze-video", "/functions/v1/analyze-video"];

pub const CORS_HEADERS: &[(&str, &str)] = &[
    ("Access-Control-Allow-Origin", "*"),
    (
        "Access-Control-Allow-Headers",
        "authorization, x-client-info, apikey, content-type",
    ),
];

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8787".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
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
    /// Stop accepting connections. Requests already being served run to completion.
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
    analyzer: Arc<Analyzer>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, analyzer: Arc<Analyzer>) -> Self {
        Self { cfg, analyzer }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let cfg = self.cfg;
        let analyzer = self.analyzer;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, cfg, analyzer, shutdown_thread) {
                log::error!("analysis api stopped: {}", err);
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
    analyzer: Arc<Analyzer>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                // One thread per request; the analyzer holds no per-request state.
                let analyzer = analyzer.clone();
                let max_body_bytes = cfg.max_body_bytes;
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &analyzer, max_body_bytes) {
                        log::warn!("analysis api connection failed: {}", err);
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
    analyzer: &Analyzer,
    max_body_bytes: usize,
) -> Result<()> {
    stream.set_nonblocking(false)?;
    let request = match read_request(&mut stream, max_body_bytes) {
        Ok(request) => request,
        Err(err) => {
            log::warn!("analysis api request rejected: {}", err);
            return write_error(&mut stream, &err);
        }
    };

    if request.method == "OPTIONS" {
        return write_response(&mut stream, 200, None, &[]);
    }

    match request.path.as_str() {
        "/health" => {
            if request.method != "GET" {
                return write_error(&mut stream, &AnalysisError::MethodNotAllowed);
            }
            let options = analyzer.options();
            let body = serde_json::json!({
                "status": "ok",
                "backend": analyzer.detector().name(),
                "modelVersion": analyzer.detector().model_version(),
                "simulatedDelayMs": options.simulated_delay.as_millis() as u64,
                "strictDetections": options.strict_detections,
            });
            write_json_response(&mut stream, 200, &body)
        }
        path if ANALYZE_PATHS.contains(&path) => {
            if request.method != "POST" {
                return write_error(&mut stream, &AnalysisError::MethodNotAllowed);
            }
            match analyze_body(analyzer, &request.body) {
                Ok(body) => write_json_response(&mut stream, 200, &body),
                Err(err) => {
                    if err.status() >= 500 {
                        log::error!("analysis error: {}", err);
                    }
                    write_error(&mut stream, &err)
                }
            }
        }
        _ => write_error(&mut stream, &AnalysisError::NotFound),
    }
}

fn analyze_body(analyzer: &Analyzer, body: &[u8]) -> Result<serde_json::Value, AnalysisError> {
    let request: AnalysisRequest = serde_json::from_slice(body)?;
    let response = analyzer.analyze(request)?;
    Ok(serde_json::to_value(&response)?)
}

fn read_request(stream: &mut TcpStream, max_body_bytes: usize) -> Result<HttpRequest, AnalysisError> {
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(AnalysisError::internal)?;
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let header_end = loop {
        let n = stream.read(&mut buf).map_err(AnalysisError::internal)?;
        if n == 0 {
            return Err(AnalysisError::Internal("connection closed mid-request".into()));
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(AnalysisError::PayloadTooLarge);
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| AnalysisError::Internal("empty request".into()))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| AnalysisError::Internal("missing method".into()))?;
    let raw_path = parts
        .next()
        .ok_or_else(|| AnalysisError::Internal("missing path".into()))?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| AnalysisError::Internal(format!("invalid content-length '{value}'")))?,
        None => 0,
    };
    if content_length > max_body_bytes {
        return Err(AnalysisError::PayloadTooLarge);
    }

    let mut body = data.split_off(header_end + 4);
    while body.len() < content_length {
        let n = stream.read(&mut buf).map_err(AnalysisError::internal)?;
        if n == 0 {
            return Err(AnalysisError::Internal("request body truncated".into()));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_ascii_uppercase(),
        path,
        body,
    })
}

fn write_error(stream: &mut TcpStream, err: &AnalysisError) -> Result<()> {
    write_json_response(stream, err.status(), &err.to_json())
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &serde_json::Value) -> Result<()> {
    let payload = serde_json::to_vec(body)?;
    write_response(stream, status, Some("application/json"), &payload)
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        413 => "HTTP/1.1 413 Payload Too Large",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let mut header = format!("{status_line}\r\n");
    for (name, value) in CORS_HEADERS {
        header.push_str(&format!("{name}: {value}\r\n"));
    }
    if let Some(content_type) = content_type {
        header.push_str(&format!("Content-Type: {content_type}\r\n"));
    }
    header.push_str(&format!(
        "Content-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}
