use std::collections::VecDeque;

use crate::config::DetectorConfig;
use crate::constants::MIN_ENERGY_THRESHOLD;
use crate::error::Result;
use crate::signal_processing::filters::QrsBandpass;
use crate::signal_processing::math::{
    derivative_five_point, local_maxima, mean, moving_window_mean, percentile,
};

/// A detected heartbeat: index into the analysis window plus the filtered
/// signal amplitude at that index.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Peak {
    pub index: usize,
    pub amplitude: f32,
}

/// Adaptive QRS detector (derivative/square/integrate pipeline).
///
/// A detection pass transforms the window through a 5–15 Hz band-pass, a
/// 5-point derivative, point-wise squaring and a 150 ms moving-window mean,
/// then classifies local maxima of the resulting energy signal against two
/// adaptive thresholds. Accepted energy peaks are refined back to the true
/// local maximum of the filtered signal, since integration shifts the peak
/// location.
///
/// The pass itself is a pure function of the window; only the thresholds and
/// their peak histories persist between passes. An empty result is a valid
/// steady state, never an error.
pub struct QrsDetector {
    bandpass: QrsBandpass,
    integration_window: usize,
    min_window_samples: usize,
    refractory_samples: usize,
    refine_window: usize,
    seed_percentile: f32,
    signal_learning_rate: f32,
    noise_learning_rate: f32,
    signal_fraction: f32,
    noise_fraction: f32,
    peak_history: usize,
    signal_threshold: Option<f32>,
    noise_threshold: Option<f32>,
    recent_signal: VecDeque<f32>,
    recent_noise: VecDeque<f32>,
}

impl QrsDetector {
    pub fn new(config: &DetectorConfig, sample_rate: f32) -> Result<Self> {
        Ok(Self {
            bandpass: QrsBandpass::new(
                config.qrs_band_low_hz,
                config.qrs_band_high_hz,
                sample_rate,
                config.qrs_filter_order,
            )?,
            integration_window: ((config.integration_window_ms / 1000.0 * sample_rate) as usize)
                .max(1),
            min_window_samples: ((config.min_window_ms / 1000.0 * sample_rate) as usize).max(5),
            refractory_samples: ((config.refractory_period_ms / 1000.0 * sample_rate) as usize)
                .max(1),
            refine_window: config.refine_window,
            seed_percentile: config.seed_percentile,
            signal_learning_rate: config.signal_learning_rate,
            noise_learning_rate: config.noise_learning_rate,
            signal_fraction: config.signal_fraction,
            noise_fraction: config.noise_fraction,
            peak_history: config.peak_history,
            signal_threshold: None,
            noise_threshold: None,
            recent_signal: VecDeque::new(),
            recent_noise: VecDeque::new(),
        })
    }

    /// Run one detection pass over a filtered window.
    ///
    /// Returns refined peaks in ascending index order. An all-zero or
    /// too-short window yields an empty list.
    pub fn detect(&mut self, filtered: &[f32]) -> Vec<Peak> {
        let energy = self.energy_signal(filtered);
        let maxima = local_maxima(&energy);
        if maxima.is_empty() {
            return Vec::new();
        }

        self.seed_thresholds(&energy);
        // Seeding fails only when the window is essentially silent
        let (Some(signal_threshold), Some(noise_threshold)) =
            (self.signal_threshold, self.noise_threshold)
        else {
            return Vec::new();
        };

        let mut accepted = Vec::new();
        let mut last_accepted: Option<usize> = None;
        for &idx in &maxima {
            let value = energy[idx];
            if value <= noise_threshold.max(MIN_ENERGY_THRESHOLD) {
                continue;
            }
            if value > signal_threshold {
                let in_refractory = last_accepted
                    .is_some_and(|last| idx - last < self.refractory_samples);
                if in_refractory {
                    continue;
                }
                accepted.push(idx);
                last_accepted = Some(idx);
                self.adapt_signal_threshold(value);
            } else {
                self.adapt_noise_threshold(value);
            }
        }

        self.refine_peaks(filtered, &accepted)
    }

    /// Compute the integrated energy signal for a window.
    fn energy_signal(&self, filtered: &[f32]) -> Vec<f32> {
        if filtered.len() < self.min_window_samples.max(self.integration_window) {
            return Vec::new();
        }
        let band = self.bandpass.filtered(filtered);
        let derivative = derivative_five_point(&band);
        let squared: Vec<f32> = derivative.iter().map(|d| d * d).collect();
        moving_window_mean(&squared, self.integration_window)
    }

    /// Seed both thresholds from the energy distribution on first use.
    fn seed_thresholds(&mut self, energy: &[f32]) {
        if self.signal_threshold.is_some() {
            return;
        }
        let seed = percentile(energy, self.seed_percentile) * self.signal_fraction;
        if seed > MIN_ENERGY_THRESHOLD {
            self.signal_threshold = Some(seed);
            self.noise_threshold = Some(seed * 0.5);
        }
    }

    fn adapt_signal_threshold(&mut self, peak_energy: f32) {
        self.recent_signal.push_back(peak_energy);
        while self.recent_signal.len() > self.peak_history {
            self.recent_signal.pop_front();
        }
        let target =
            self.signal_fraction * mean(self.recent_signal.make_contiguous());
        if let Some(threshold) = self.signal_threshold.as_mut() {
            *threshold += self.signal_learning_rate * (target - *threshold);
        }
    }

    fn adapt_noise_threshold(&mut self, peak_energy: f32) {
        self.recent_noise.push_back(peak_energy);
        while self.recent_noise.len() > self.peak_history {
            self.recent_noise.pop_front();
        }
        let target = self.noise_fraction * mean(self.recent_noise.make_contiguous());
        if let Some(threshold) = self.noise_threshold.as_mut() {
            *threshold += self.noise_learning_rate * (target - *threshold);
        }
    }

    /// Map accepted energy-domain peaks back to the filtered signal's local
    /// maxima within ±`refine_window` samples.
    ///
    /// The trailing integration window delays an energy peak by roughly half
    /// its width, so that delay is removed before the local search.
    fn refine_peaks(&self, filtered: &[f32], accepted: &[usize]) -> Vec<Peak> {
        let mut peaks: Vec<Peak> = Vec::with_capacity(accepted.len());
        for &idx in accepted {
            let center = idx.saturating_sub(self.integration_window / 2);
            let start = center.saturating_sub(self.refine_window);
            let end = (center + self.refine_window + 1).min(filtered.len());
            if start >= end {
                continue;
            }
            let (best, amplitude) = filtered[start..end]
                .iter()
                .enumerate()
                .max_by(|&(_, a), &(_, b)| a.total_cmp(b))
                .map(|(offset, &value)| (start + offset, value))
                .expect("refinement window is nonempty");

            // Two energy peaks can refine into the same filtered maximum
            if peaks.last().is_some_and(|p: &Peak| p.index >= best) {
                continue;
            }
            peaks.push(Peak {
                index: best,
                amplitude,
            });
        }
        peaks
    }

    /// Current (signal, noise) thresholds; `None` until first seeded.
    pub fn thresholds(&self) -> (Option<f32>, Option<f32>) {
        (self.signal_threshold, self.noise_threshold)
    }

    /// Restore all adaptive state to its initial, unseeded values.
    pub fn reset(&mut self) {
        self.signal_threshold = None;
        self.noise_threshold = None;
        self.recent_signal.clear();
        self.recent_noise.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 250.0;

    fn detector() -> QrsDetector {
        QrsDetector::new(&DetectorConfig::default(), SAMPLE_RATE).unwrap()
    }

    /// Train of sharp spikes with smooth flanks, spaced `spacing` samples.
    fn spike_train(len: usize, spacing: usize, amplitude: f32) -> Vec<f32> {
        let mut signal = vec![0.0; len];
        let mut center = spacing / 2;
        while center + 4 < len {
            for (offset, scale) in [(0usize, 1.0f32), (1, 0.6), (2, 0.25), (3, 0.1)] {
                signal[center + offset] += amplitude * scale;
                if center >= offset {
                    signal[center - offset] = signal[center - offset].max(amplitude * scale);
                }
            }
            center += spacing;
        }
        signal
    }

    #[test]
    fn test_all_zero_buffer_yields_no_peaks() {
        let mut det = detector();
        assert!(det.detect(&vec![0.0; 1200]).is_empty());
    }

    #[test]
    fn test_short_buffer_yields_no_peaks() {
        let mut det = detector();
        assert!(det.detect(&[0.1, 0.5, 0.2]).is_empty());
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let mut det = detector();
        let signal = spike_train(1200, 200, 1.0);
        det.detect(&signal);
        assert!(det.thresholds().0.is_some());

        det.reset();
        let fresh = detector();
        assert_eq!(det.thresholds(), fresh.thresholds());
    }

    #[test]
    fn test_detects_regular_spike_train() {
        let mut det = detector();
        // 200-sample spacing at 250 Hz = 800 ms beats
        let signal = spike_train(1200, 200, 1.0);
        let peaks = det.detect(&signal);

        assert!(
            peaks.len() >= 4,
            "expected at least 4 beats, got {}",
            peaks.len()
        );
        for pair in peaks.windows(2) {
            let spacing = pair[1].index - pair[0].index;
            assert!(
                (150..=250).contains(&spacing),
                "irregular spacing {spacing}"
            );
        }
    }

    #[test]
    fn test_peaks_ascending_and_refractory_spaced() {
        let mut det = detector();
        let signal = spike_train(1200, 150, 0.8);
        let peaks = det.detect(&signal);

        let refractory = (0.25 * SAMPLE_RATE) as usize;
        for pair in peaks.windows(2) {
            assert!(pair[1].index > pair[0].index);
            assert!(pair[1].index - pair[0].index + det.refine_window * 2 >= refractory);
        }
    }

    #[test]
    fn test_same_window_detects_same_peaks_twice() {
        let mut det = detector();
        let signal = spike_train(1200, 200, 1.0);
        let first = det.detect(&signal);
        let second = det.detect(&signal);
        assert_eq!(first, second);
    }
}
