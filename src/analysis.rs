//! The analyze-video request/response contract and the pipeline that fills it.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::detect::{Detection, Detector};
use crate::error::AnalysisError;
use crate::payload::ImagePayload;

pub const DEFAULT_SIMULATED_DELAY: Duration = Duration::from_millis(1500);

/// Body of a `POST /analyze-video` request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Usually a data URL or base64 string. `null`, `false`, `0` and `""` count
    /// as missing; any other value is passed on as its JSON text.
    #[serde(default)]
    pub image_data: Option<Value>,
    /// Opaque caller identifier, echoed back untouched.
    #[serde(default)]
    pub video_id: Option<Value>,
}

impl AnalysisRequest {
    pub fn new(image_data: impl Into<String>, video_id: Option<&str>) -> Self {
        Self {
            image_data: Some(Value::String(image_data.into())),
            video_id: video_id.map(|id| Value::String(id.to_string())),
        }
    }
}

/// Aggregate view over a detection sequence.
///
/// Only constructible from detections, so the counts always agree with them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    total_objects: usize,
    /// `None` (JSON `null`) when there are no detections.
    avg_confidence: Option<f64>,
    unique_objects: Vec<String>,
}

impl Summary {
    pub fn from_detections(detections: &[Detection]) -> Self {
        let avg_confidence = if detections.is_empty() {
            None
        } else {
            let sum: f64 = detections.iter().map(|d| d.confidence).sum();
            Some(sum / detections.len() as f64)
        };

        let mut seen = HashSet::new();
        let unique_objects = detections
            .iter()
            .filter(|d| seen.insert(d.object.as_str()))
            .map(|d| d.object.clone())
            .collect();

        Self {
            total_objects: detections.len(),
            avg_confidence,
            unique_objects,
        }
    }

    pub fn total_objects(&self) -> usize {
        self.total_objects
    }

    pub fn avg_confidence(&self) -> Option<f64> {
        self.avg_confidence
    }

    /// Distinct labels in first-seen order.
    pub fn unique_objects(&self) -> &[String] {
        &self.unique_objects
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub video_id: Option<Value>,
    pub detections: Vec<Detection>,
    #[serde(rename = "processingTime")]
    pub processing_time_ms: u64,
    pub model_version: String,
    pub timestamp: String,
    pub summary: Summary,
}

#[derive(Clone, Copy, Debug)]
pub struct AnalyzerOptions {
    /// Artificial latency added after detection; zero disables it.
    pub simulated_delay: Duration,
    /// Reject detections with out-of-range confidence or inverted boxes.
    pub strict_detections: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            simulated_delay: DEFAULT_SIMULATED_DELAY,
            strict_detections: false,
        }
    }
}

/// Stateless analysis pipeline shared by all request threads.
pub struct Analyzer {
    detector: Arc<dyn Detector>,
    options: AnalyzerOptions,
}

impl Analyzer {
    pub fn new(detector: Arc<dyn Detector>, options: AnalyzerOptions) -> Self {
        Self { detector, options }
    }

    pub fn detector(&self) -> &dyn Detector {
        self.detector.as_ref()
    }

    pub fn options(&self) -> AnalyzerOptions {
        self.options
    }

    pub fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        let image_data = request
            .image_data
            .as_ref()
            .and_then(image_text)
            .ok_or_else(AnalysisError::missing_image)?;
        let payload = ImagePayload::new(&image_data);
        let video_id = request.video_id;
        log::info!(
            "starting analysis for video {} ({}) with backend {}",
            display_video_id(video_id.as_ref()),
            payload.mime_type().unwrap_or("untyped payload"),
            self.detector.name()
        );
        let start = Instant::now();

        let image = payload.to_bytes();
        let detections = self.detector.detect(&image)?;

        if !self.options.simulated_delay.is_zero() {
            std::thread::sleep(self.options.simulated_delay);
        }
        let processing_time_ms = start.elapsed().as_millis() as u64;

        if self.options.strict_detections {
            for detection in &detections {
                detection.validate()?;
            }
        }

        let summary = Summary::from_detections(&detections);
        log::info!(
            "analysis complete: {} objects, avg confidence {}, labels {:?} ({} ms)",
            summary.total_objects(),
            summary
                .avg_confidence()
                .map(|c| format!("{c:.3}"))
                .unwrap_or_else(|| "n/a".to_string()),
            summary.unique_objects(),
            processing_time_ms
        );

        Ok(AnalysisResponse {
            video_id,
            detections,
            processing_time_ms,
            model_version: self.detector.model_version().to_string(),
            timestamp: crate::iso8601_now(),
            summary,
        })
    }
}

/// Text of a present `imageData` value, or `None` when the value is falsy.
fn image_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

fn display_video_id(video_id: Option<&Value>) -> String {
    match video_id {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => "<unspecified>".to_string(),
    }
}
