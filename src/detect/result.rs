use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel space, serialized as `[x1, y1, x2, y2]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// True when the corners are strictly ordered (`x1 < x2`, `y1 < y2`).
    pub fn is_well_formed(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    pub fn area(&self) -> i64 {
        if !self.is_well_formed() {
            return 0;
        }
        self.width() as i64 * self.height() as i64
    }

    /// Intersection over union; zero for malformed or disjoint boxes.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = BoundingBox::new(ix1, iy1, ix2, iy2).area();
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }
        inter as f64 / union as f64
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// A single labeled box produced by a detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label, e.g. `"person"`.
    pub object: String,
    /// Score in `[0, 1]`.
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// ISO-8601 capture time.
    pub timestamp: String,
}

impl Detection {
    pub fn new(object: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            object: object.into(),
            confidence,
            bbox,
            timestamp: crate::iso8601_now(),
        }
    }

    /// Checks the confidence range and box ordering.
    ///
    /// Backends are not required to call this; the analyzer does when strict
    /// ingestion is enabled.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(anyhow!(
                "detection '{}' has confidence {} outside [0, 1]",
                self.object,
                self.confidence
            ));
        }
        if !self.bbox.is_well_formed() {
            return Err(anyhow!(
                "detection '{}' has malformed bbox {:?}",
                self.object,
                <[i32; 4]>::from(self.bbox)
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_serializes_as_array() {
        let det = Detection {
            object: "car".to_string(),
            confidence: 0.5,
            bbox: BoundingBox::new(1, 2, 3, 4),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
        };
        let value = serde_json::to_value(&det).unwrap();
        assert_eq!(value["bbox"], serde_json::json!([1, 2, 3, 4]));
        assert_eq!(value["object"], "car");
    }

    #[test]
    fn validate_rejects_out_of_range_confidence() {
        let det = Detection::new("person", 1.2, BoundingBox::new(0, 0, 10, 10));
        assert!(det.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_box() {
        let det = Detection::new("person", 0.9, BoundingBox::new(10, 0, 5, 10));
        assert!(det.validate().is_err());
        let det = Detection::new("person", 0.9, BoundingBox::new(0, 0, 5, 10));
        assert!(det.validate().is_ok());
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BoundingBox::new(0, 0, 10, 10);
        assert!((a.iou(&a) - 1.0).abs() < f64::EPSILON);
        let b = BoundingBox::new(20, 20, 30, 30);
        assert_eq!(a.iou(&b), 0.0);
    }
}
