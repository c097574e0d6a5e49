pub mod config;
pub mod driver;
pub mod error;
pub mod kernel;

pub use config::ReactorConfig;
pub use kernel::quality::{FreezeDetector, InterframeDelayEstimator};
pub use kernel::reactor::Reactor;
pub use kernel::visibility::VisibilityGate;
