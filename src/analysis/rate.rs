use serde::Serialize;

use crate::config::RateConfig;
use crate::constants::DIVISION_EPSILON;
use crate::signal_processing::Peak;
use crate::signal_processing::math::MovingAverage;

/// Instantaneous and smoothed heart rate.
///
/// `raw` is the unsmoothed estimate from the latest window (None when the
/// spacing was implausible or there were too few peaks); `smoothed` carries
/// across updates through the sliding window and slew limiter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BpmEstimate {
    pub raw: Option<f32>,
    pub smoothed: Option<f32>,
}

/// Converts peak spacing into a smoothed beats-per-minute value.
///
/// Raw BPM comes from the mean spacing of the ordered peak list. Accepted
/// values pass through a sliding-window average and then a per-update slew
/// cap so the displayed rate never jumps.
pub struct RateCalculator {
    min_bpm: f32,
    max_bpm: f32,
    max_step_bpm: f32,
    sample_rate: f32,
    window: MovingAverage,
    smoothed: Option<f32>,
    last_raw: Option<f32>,
}

impl RateCalculator {
    pub fn new(config: &RateConfig, sample_rate: f32) -> Self {
        Self {
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            max_step_bpm: config.max_step_bpm,
            sample_rate,
            window: MovingAverage::new(config.smoothing_window),
            smoothed: None,
            last_raw: None,
        }
    }

    /// Update from the current ordered peak list and return the estimate.
    pub fn update(&mut self, peaks: &[Peak]) -> BpmEstimate {
        let raw = self.raw_bpm(peaks);
        self.last_raw = raw;

        if let Some(bpm) = raw {
            let average = self.window.add(bpm);
            self.smoothed = Some(match self.smoothed {
                // First accepted value seeds the smoother directly
                None => average,
                Some(current) => {
                    current + (average - current).clamp(-self.max_step_bpm, self.max_step_bpm)
                }
            });
        }

        self.current()
    }

    /// Latest estimate without recomputing.
    pub fn current(&self) -> BpmEstimate {
        BpmEstimate {
            raw: self.last_raw,
            smoothed: self.smoothed,
        }
    }

    fn raw_bpm(&self, peaks: &[Peak]) -> Option<f32> {
        if peaks.len() < 2 {
            return None;
        }
        let spacing_sum: usize = peaks
            .windows(2)
            .map(|pair| pair[1].index - pair[0].index)
            .sum();
        let mean_spacing = spacing_sum as f32 / (peaks.len() - 1) as f32;
        if mean_spacing < DIVISION_EPSILON {
            return None;
        }
        let bpm = 60.0 * self.sample_rate / mean_spacing;
        (self.min_bpm..=self.max_bpm).contains(&bpm).then_some(bpm)
    }

    /// Clear the window and smoothed state.
    pub fn reset(&mut self) {
        self.window.reset();
        self.smoothed = None;
        self.last_raw = None;
    }
}
