pub mod features;
pub mod hrv;
pub mod intervals;
pub mod rate;
pub mod segmenter;
pub mod state;

pub use features::{FEATURE_COUNT, feature_vector};
pub use hrv::{HrvAssessment, HrvEngine, HrvSnapshot, Readiness};
pub use intervals::{IntervalCalculator, IntervalMeasure, IntervalSet, IntervalStatus};
pub use rate::{BpmEstimate, RateCalculator};
pub use segmenter::{BeatLandmarks, WaveKind, WaveLandmark, WaveSegmenter};
pub use state::{PhysiologicalState, StateClassifier, StateEstimate, StateInputs};
