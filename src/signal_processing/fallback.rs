use crate::config::FallbackConfig;
use crate::signal_processing::detector::Peak;
use crate::signal_processing::math::top_fraction_mean;

/// Amplitude-threshold peak finder used when the adaptive detector yields
/// nothing (weak or atypical signals).
///
/// Stateless: every call derives its threshold from the window itself, so
/// repeated calls on the same window return the same peaks.
pub struct AmplitudePeakFinder {
    top_fraction: f32,
    threshold_scale: f32,
    threshold_floor: f32,
    min_distance_samples: usize,
    max_candidates: usize,
    refractory_samples: usize,
}

impl AmplitudePeakFinder {
    pub fn new(config: &FallbackConfig, sample_rate: f32) -> Self {
        Self {
            top_fraction: config.top_fraction,
            threshold_scale: config.threshold_scale,
            threshold_floor: config.threshold_floor,
            min_distance_samples: ((config.min_distance_ms / 1000.0 * sample_rate) as usize)
                .max(1),
            max_candidates: config.max_candidates,
            refractory_samples: ((config.refractory_period_ms / 1000.0 * sample_rate) as usize)
                .max(1),
        }
    }

    /// Find peaks above a dynamic amplitude threshold.
    ///
    /// The threshold is the mean of the top 5% of sample magnitudes, scaled
    /// down and floored so noise-only windows yield nothing.
    pub fn find_peaks(&self, buffer: &[f32]) -> Vec<Peak> {
        if buffer.len() < 3 {
            return Vec::new();
        }

        let magnitudes: Vec<f32> = buffer.iter().map(|s| s.abs()).collect();
        let threshold = (top_fraction_mean(&magnitudes, self.top_fraction)
            * self.threshold_scale)
            .max(self.threshold_floor);

        let mut candidates: Vec<Peak> = Vec::new();
        for i in 1..buffer.len() - 1 {
            let value = buffer[i];
            if value <= threshold || value < buffer[i - 1] || value < buffer[i + 1] {
                continue;
            }
            if candidates
                .last()
                .is_some_and(|last| i - last.index < self.min_distance_samples)
            {
                continue;
            }
            candidates.push(Peak {
                index: i,
                amplitude: value,
            });
        }

        if candidates.len() > self.max_candidates {
            candidates.sort_by(|a, b| b.amplitude.total_cmp(&a.amplitude));
            candidates.truncate(self.max_candidates);
            candidates.sort_by_key(|p| p.index);
        }

        self.apply_refractory(candidates)
    }

    fn apply_refractory(&self, candidates: Vec<Peak>) -> Vec<Peak> {
        let mut peaks: Vec<Peak> = Vec::with_capacity(candidates.len());
        for peak in candidates {
            if peaks
                .last()
                .is_some_and(|last| peak.index - last.index < self.refractory_samples)
            {
                continue;
            }
            peaks.push(peak);
        }
        peaks
    }
}
