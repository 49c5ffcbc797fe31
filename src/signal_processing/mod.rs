pub mod detector;
pub mod fallback;
pub mod filters;
pub mod math;

pub use detector::{Peak, QrsDetector};
pub use fallback::AmplitudePeakFinder;
pub use filters::{Biquad, QrsBandpass, StageFilters};
pub use math::MovingAverage;
