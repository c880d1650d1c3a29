mod backend;
mod backends;
mod registry;
mod result;

pub use backend::Detector;
pub use backends::{StubDetector, STUB_MODEL_VERSION};
#[cfg(feature = "backend-tract")]
pub use backends::{TractConfig, TractDetector};
pub use registry::DetectorRegistry;
pub use result::{BoundingBox, Detection};
