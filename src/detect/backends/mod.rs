pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::{StubDetector, STUB_MODEL_VERSION};

#[cfg(feature = "backend-tract")]
pub use tract::{TractConfig, TractDetector};
