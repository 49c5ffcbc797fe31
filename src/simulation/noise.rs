use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::f32::consts::PI;

/// Noise model for synthetic recordings. Every component is optional; the
/// seed makes a run reproducible.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct NoiseConfig {
    pub seed: Option<u64>,
    pub awgn: Option<AwgnConfig>,
    pub baseline: Option<BaselineWanderConfig>,
    pub mains: Option<MainsHumConfig>,
}

impl NoiseConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_awgn(mut self, sigma: f32) -> Self {
        self.awgn = Some(AwgnConfig { sigma });
        self
    }

    pub fn with_baseline_wander(mut self, amplitude: f32, frequency_hz: f32) -> Self {
        self.baseline = Some(BaselineWanderConfig {
            amplitude,
            frequency_hz,
        });
        self
    }

    pub fn with_mains_hum(mut self, amplitude: f32, frequency_hz: f32) -> Self {
        self.mains = Some(MainsHumConfig {
            amplitude,
            frequency_hz,
        });
        self
    }
}

/// Additive white Gaussian noise.
#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct AwgnConfig {
    pub sigma: f32,
}

/// Slow sinusoidal baseline drift from respiration and electrode motion.
#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct BaselineWanderConfig {
    pub amplitude: f32,
    pub frequency_hz: f32,
}

/// Power-line interference tone.
#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct MainsHumConfig {
    pub amplitude: f32,
    pub frequency_hz: f32,
}

/// Apply the configured noise components to a signal in place.
pub fn apply_noise(signal: &mut [f32], sample_rate: f32, config: &NoiseConfig) {
    if let Some(awgn) = &config.awgn {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed.unwrap_or(0));
        let normal = Normal::new(0.0f32, awgn.sigma).expect("sigma is finite");
        for sample in signal.iter_mut() {
            *sample += normal.sample(&mut rng);
        }
    }

    if let Some(baseline) = &config.baseline {
        for (i, sample) in signal.iter_mut().enumerate() {
            let t = i as f32 / sample_rate;
            *sample += baseline.amplitude * (2.0 * PI * baseline.frequency_hz * t).sin();
        }
    }

    if let Some(mains) = &config.mains {
        for (i, sample) in signal.iter_mut().enumerate() {
            let t = i as f32 / sample_rate;
            *sample += mains.amplitude * (2.0 * PI * mains.frequency_hz * t).sin();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_reproducible() {
        let config = NoiseConfig::default().with_seed(42).with_awgn(0.05);
        let mut a = vec![0.0f32; 1000];
        let mut b = vec![0.0f32; 1000];
        apply_noise(&mut a, 250.0, &config);
        apply_noise(&mut b, 250.0, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_awgn_changes_signal() {
        let config = NoiseConfig::default().with_seed(7).with_awgn(0.05);
        let mut signal = vec![0.0f32; 1000];
        apply_noise(&mut signal, 250.0, &config);
        assert!(signal.iter().any(|&s| s.abs() > 1e-4));
    }

    #[test]
    fn test_mains_hum_periodicity() {
        let config = NoiseConfig::default().with_mains_hum(0.1, 50.0);
        let mut signal = vec![0.0f32; 500];
        apply_noise(&mut signal, 250.0, &config);
        // 50 Hz at 250 Hz sampling repeats every 5 samples
        for i in 0..495 {
            assert!((signal[i] - signal[i + 5]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_empty_config_is_identity() {
        let mut signal = vec![0.25f32; 100];
        apply_noise(&mut signal, 250.0, &NoiseConfig::default());
        assert!(signal.iter().all(|&s| (s - 0.25).abs() < f32::EPSILON));
    }
}
