//! Vigil surveillance dashboard
//!
//! This crate implements the backend pieces of the dashboard:
//!
//! - `analysis` / `api`: the analyze-video endpoint. Accepts an image payload and an
//!   opaque video id, runs a [`Detector`] and answers with detections plus a summary.
//! - `detect`: the detector capability, a stub backend with fixed output, and an
//!   optional ONNX backend (`backend-tract`).
//! - `settings`: the settings form controller over an in-memory preference record.
//!
//! # Contract
//!
//! 1. `summary.totalObjects` always equals the number of detections.
//! 2. `summary.uniqueObjects` is the distinct label set of the detections.
//! 3. Missing or empty `imageData` is a 400; every other fault is a 500 envelope.
//! 4. Every HTTP response carries the permissive CORS headers.

use chrono::{SecondsFormat, Utc};

pub mod analysis;
pub mod api;
pub mod config;
pub mod detect;
pub mod error;
pub mod payload;
pub mod settings;

pub use analysis::{AnalysisRequest, AnalysisResponse, Analyzer, AnalyzerOptions, Summary};
pub use detect::{BoundingBox, Detection, Detector, DetectorRegistry, StubDetector};
pub use error::AnalysisError;
pub use payload::ImagePayload;
pub use settings::{
    AlertThreshold, InMemoryThemeProvider, Language, LogNotifier, Notification, Notifier,
    PreferenceChange, PreferenceSet, RecordingNotifier, SettingsForm, ThemeMode, ThemeProvider,
};

/// Current UTC time as ISO-8601 with millisecond precision, e.g.
/// `2024-05-01T12:00:00.000Z`.
pub fn iso8601_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the detector registry described by a service configuration and return
/// the configured backend.
pub fn detector_from_config(
    cfg: &config::AnalysisServiceConfig,
) -> anyhow::Result<std::sync::Arc<dyn Detector>> {
    let mut registry = DetectorRegistry::new();
    registry.register(StubDetector::with_model_version(cfg.model_version.clone()));

    #[cfg(feature = "backend-tract")]
    {
        if let Some(model_path) = &cfg.backend.model_path {
            registry.register(detect::TractDetector::new(detect::TractConfig {
                model_path: model_path.clone(),
                model_version: cfg.model_version.clone(),
                input_width: cfg.backend.input_width,
                input_height: cfg.backend.input_height,
                confidence_threshold: cfg.backend.confidence_threshold,
                labels: cfg.backend.labels.clone(),
            })?);
        }
    }

    registry.set_default(&cfg.backend.name).map_err(|err| {
        anyhow::anyhow!(
            "{} (available: {:?}; the tract backend needs the backend-tract feature)",
            err,
            registry.list()
        )
    })?;
    let detector = registry
        .default_backend()
        .ok_or_else(|| anyhow::anyhow!("no detector backend registered"))?;
    detector.warm_up()?;
    Ok(detector)
}
