//! Synthetic ECG generation for tests and tooling.
//!
//! Gated behind the `simulation` feature so the library itself carries no
//! RNG dependencies.

mod noise;
mod signal;

pub use noise::{
    AwgnConfig, BaselineWanderConfig, MainsHumConfig, NoiseConfig, apply_noise,
};
pub use signal::{BeatMorphology, Wave, generate_ecg, generate_ecg_with};
