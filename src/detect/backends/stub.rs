use anyhow::Result;

use crate::detect::backend::Detector;
use crate::detect::result::{BoundingBox, Detection};

pub const STUB_MODEL_VERSION: &str = "YOLOv8n";

const FIXED_DETECTIONS: [(&str, f64, BoundingBox); 3] = [
    ("person", 0.95, BoundingBox::new(100, 150, 300, 450)),
    ("car", 0.87, BoundingBox::new(400, 200, 700, 500)),
    ("backpack", 0.82, BoundingBox::new(250, 300, 350, 420)),
];

/// Stub backend. Ignores the image and returns a fixed detection set stamped
/// with the current time.
pub struct StubDetector {
    model_version: String,
}

impl StubDetector {
    pub fn new() -> Self {
        Self::with_model_version(STUB_MODEL_VERSION)
    }

    pub fn with_model_version(model_version: impl Into<String>) -> Self {
        Self {
            model_version: model_version.into(),
        }
    }
}

impl Default for StubDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }

    fn detect(&self, _image: &[u8]) -> Result<Vec<Detection>> {
        Ok(FIXED_DETECTIONS
            .iter()
            .map(|(label, confidence, bbox)| Detection::new(*label, *confidence, *bbox))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_returns_fixed_detections() {
        let backend = StubDetector::new();
        let detections = backend.detect(b"anything").unwrap();

        let labels: Vec<&str> = detections.iter().map(|d| d.object.as_str()).collect();
        assert_eq!(labels, vec!["person", "car", "backpack"]);
        assert_eq!(detections[0].confidence, 0.95);
        assert_eq!(detections[1].confidence, 0.87);
        assert_eq!(detections[2].confidence, 0.82);
        assert_eq!(detections[1].bbox, BoundingBox::new(400, 200, 700, 500));
        assert!(detections.iter().all(|d| d.validate().is_ok()));
        assert!(detections.iter().all(|d| d.timestamp.ends_with('Z')));
    }

    #[test]
    fn stub_ignores_image_content() {
        let backend = StubDetector::new();
        let a = backend.detect(b"frame1").unwrap();
        let b = backend.detect(b"").unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(backend.model_version(), "YOLOv8n");
    }
}
