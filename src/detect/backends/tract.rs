#![cfg(feature = "backend-tract")]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use tract_onnx::prelude::*;

use crate::detect::backend::Detector;
use crate::detect::result::{BoundingBox, Detection};

const DEFAULT_IOU_THRESHOLD: f64 = 0.45;

/// Settings for loading a YOLO-style ONNX model.
#[derive(Clone, Debug)]
pub struct TractConfig {
    pub model_path: PathBuf,
    pub model_version: String,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f64,
    pub labels: Vec<String>,
}

/// Tract-based backend for ONNX inference.
///
/// Decodes the image, letterbox-free resizes it to the model input and decodes a
/// `[1, 4 + classes, anchors]` output (cx, cy, w, h followed by class scores).
/// Boxes are scaled back to the source image's pixel space.
pub struct TractDetector {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    cfg: TractConfig,
}

impl TractDetector {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new(cfg: TractConfig) -> Result<Self> {
        let model = load_model(&cfg.model_path, cfg.input_width, cfg.input_height)?;
        Ok(Self { model, cfg })
    }

    fn build_input(&self, image: &[u8]) -> Result<(Tensor, u32, u32)> {
        let decoded = image::load_from_memory(image).context("failed to decode image")?;
        let (src_w, src_h) = (decoded.width(), decoded.height());
        let resized = decoded
            .resize_exact(self.cfg.input_width, self.cfg.input_height, FilterType::Triangle)
            .to_rgb8();

        let width = self.cfg.input_width as usize;
        let height = self.cfg.input_height as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, height, width), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok((input.into_tensor(), src_w, src_h))
    }
}

impl Detector for TractDetector {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn model_version(&self) -> &str {
        &self.cfg.model_version
    }

    fn detect(&self, image: &[u8]) -> Result<Vec<Detection>> {
        let (input, src_w, src_h) = self.build_input(image)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        decode_detections(view, &self.cfg, src_w, src_h)
    }
}

/// Decode a `[1, 4 + classes, anchors]` YOLO head into detections in source
/// image pixels, dropping anchors below the confidence threshold.
fn decode_detections(
    view: tract_ndarray::ArrayViewD<f32>,
    cfg: &TractConfig,
    src_w: u32,
    src_h: u32,
) -> Result<Vec<Detection>> {
    let shape = view.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
        return Err(anyhow!("unexpected model output shape {:?}", shape));
    }
    let classes = shape[1] - 4;
    let anchors = shape[2];
    let sx = src_w as f64 / cfg.input_width as f64;
    let sy = src_h as f64 / cfg.input_height as f64;

    let mut candidates = Vec::new();
    for a in 0..anchors {
        let (class_id, score) = (0..classes)
            .map(|c| (c, view[[0, 4 + c, a]] as f64))
            .fold((0, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
        if !score.is_finite() || score < cfg.confidence_threshold {
            continue;
        }
        let cx = view[[0, 0, a]] as f64;
        let cy = view[[0, 1, a]] as f64;
        let w = view[[0, 2, a]] as f64;
        let h = view[[0, 3, a]] as f64;
        let bbox = BoundingBox::new(
            ((cx - w / 2.0) * sx).round().max(0.0) as i32,
            ((cy - h / 2.0) * sy).round().max(0.0) as i32,
            ((cx + w / 2.0) * sx).round().min(src_w as f64) as i32,
            ((cy + h / 2.0) * sy).round().min(src_h as f64) as i32,
        );
        if !bbox.is_well_formed() {
            continue;
        }
        let label = cfg
            .labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"));
        candidates.push(Detection::new(label, score.min(1.0), bbox));
    }

    Ok(non_max_suppression(candidates, DEFAULT_IOU_THRESHOLD))
}

fn load_model(
    model_path: &Path,
    width: u32,
    height: u32,
) -> Result<SimplePlan<TypedFact, Box<dyn TypedOp>>> {
    tract_onnx::onnx()
        .model_for_path(model_path)
        .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, height as usize, width as usize)),
        )
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")
}

/// Greedy per-class suppression, highest confidence first.
fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f64) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::new();
    for cand in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.object == cand.object && k.bbox.iou(&cand.bbox) > iou_threshold);
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}
