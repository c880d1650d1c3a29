use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::STUB_MODEL_VERSION;

const DEFAULT_API_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
const DEFAULT_SIMULATED_DELAY_MS: u64 = 1500;
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_INPUT_WIDTH: u32 = 640;
const DEFAULT_INPUT_HEIGHT: u32 = 640;
const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.25;
const KNOWN_BACKENDS: &[&str] = &["stub", "tract"];

#[derive(Debug, Deserialize, Default)]
struct AnalysisServiceConfigFile {
    api: Option<ApiConfigFile>,
    analysis: Option<AnalysisConfigFile>,
    backend: Option<BackendConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
    max_body_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct AnalysisConfigFile {
    simulated_delay_ms: Option<u64>,
    strict_detections: Option<bool>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct BackendConfigFile {
    name: Option<String>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    confidence_threshold: Option<f64>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct AnalysisServiceConfig {
    pub api_addr: String,
    pub max_body_bytes: usize,
    pub simulated_delay: Duration,
    pub strict_detections: bool,
    pub model_version: String,
    pub backend: BackendSettings,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub name: String,
    pub model_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f64,
    pub labels: Vec<String>,
}

impl Default for AnalysisServiceConfig {
    fn default() -> Self {
        // Infallible: every field falls back to a constant.
        Self::from_file(AnalysisServiceConfigFile::default())
    }
}

impl AnalysisServiceConfig {
    /// Load from `$VIGIL_CONFIG` (JSON, or TOML for `.toml` paths), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("VIGIL_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AnalysisServiceConfigFile) -> Self {
        let api = file.api.unwrap_or_default();
        let analysis = file.analysis.unwrap_or_default();
        let backend = file.backend.unwrap_or_default();
        Self {
            api_addr: api.addr.unwrap_or_else(|| DEFAULT_API_ADDR.to_string()),
            max_body_bytes: api.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
            simulated_delay: Duration::from_millis(
                analysis
                    .simulated_delay_ms
                    .unwrap_or(DEFAULT_SIMULATED_DELAY_MS),
            ),
            strict_detections: analysis.strict_detections.unwrap_or(false),
            model_version: analysis
                .model_version
                .unwrap_or_else(|| STUB_MODEL_VERSION.to_string()),
            backend: BackendSettings {
                name: backend
                    .name
                    .as_deref()
                    .map(normalize_backend_name)
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                model_path: backend.model_path,
                input_width: backend.input_width.unwrap_or(DEFAULT_INPUT_WIDTH),
                input_height: backend.input_height.unwrap_or(DEFAULT_INPUT_HEIGHT),
                confidence_threshold: backend
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                labels: backend.labels.unwrap_or_default(),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("VIGIL_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr;
            }
        }
        if let Ok(delay) = std::env::var("VIGIL_SIMULATED_DELAY_MS") {
            let millis: u64 = delay.trim().parse().map_err(|_| {
                anyhow!("VIGIL_SIMULATED_DELAY_MS must be an integer number of milliseconds")
            })?;
            self.simulated_delay = Duration::from_millis(millis);
        }
        if let Ok(strict) = std::env::var("VIGIL_STRICT_DETECTIONS") {
            self.strict_detections = parse_bool("VIGIL_STRICT_DETECTIONS", &strict)?;
        }
        if let Ok(version) = std::env::var("VIGIL_MODEL_VERSION") {
            if !version.trim().is_empty() {
                self.model_version = version;
            }
        }
        if let Ok(backend) = std::env::var("VIGIL_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend.name = normalize_backend_name(&backend);
            }
        }
        if let Ok(path) = std::env::var("VIGIL_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.backend.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(limit) = std::env::var("VIGIL_MAX_BODY_BYTES") {
            self.max_body_bytes = limit
                .trim()
                .parse()
                .map_err(|_| anyhow!("VIGIL_MAX_BODY_BYTES must be an integer byte count"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.api_addr
            .parse::<SocketAddr>()
            .map_err(|e| anyhow!("invalid api addr '{}': {}", self.api_addr, e))?;
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than zero"));
        }
        if !KNOWN_BACKENDS.contains(&self.backend.name.as_str()) {
            return Err(anyhow!(
                "unknown backend '{}' (expected one of {:?})",
                self.backend.name,
                KNOWN_BACKENDS
            ));
        }
        if !(0.0..=1.0).contains(&self.backend.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be within [0, 1]"));
        }
        if self.backend.name == "tract" && self.backend.model_path.is_none() {
            return Err(anyhow!("backend 'tract' requires a model_path"));
        }
        if self.backend.input_width == 0 || self.backend.input_height == 0 {
            return Err(anyhow!("model input dimensions must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AnalysisServiceConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn normalize_backend_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("{} must be a boolean, got '{}'", name, other)),
    }
}
