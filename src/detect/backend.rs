use anyhow::Result;

use crate::detect::result::Detection;

/// Object detector capability.
///
/// Takes the decoded image bytes of a single frame and returns the detections
/// found in it. Implementations take `&self` and must not keep per-request
/// state, so one instance can serve concurrent requests.
pub trait Detector: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Model version reported in analysis responses.
    fn model_version(&self) -> &str;

    /// Run detection on one image.
    fn detect(&self, image: &[u8]) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}
