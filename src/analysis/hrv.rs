use std::collections::VecDeque;

use serde::Serialize;

use crate::analysis::state::{StateClassifier, StateEstimate, StateInputs};
use crate::config::{HrvConfig, StateConfig};

/// Qualitative RMSSD banding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HrvAssessment {
    /// Below the low cut point: reduced autonomic function
    Low,
    Normal,
    /// Above the high cut point: elevated autonomic function
    High,
}

/// Reporting readiness of the HRV engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Readiness {
    /// No accumulated intervals
    Cold,
    /// Accumulating; the state estimate reports Analyzing
    Warming,
    /// Enough intervals for a full snapshot
    Ready,
}

/// Time-domain and approximate frequency-domain HRV statistics, a pure
/// function of the current RR history.
///
/// `spectral` is a capability flag and is always `false`: the LF/HF figures
/// are stride-subsampling proxies over the successive-difference series,
/// not an FFT power-spectral-density split, and are not comparable with
/// spectral implementations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HrvSnapshot {
    /// Root mean square of successive differences, ms
    pub rmssd: f32,
    /// Population standard deviation of the intervals, ms
    pub sdnn: f32,
    /// Percentage of successive differences exceeding the pNN threshold
    pub pnn50: f32,
    /// Interval count over the modal histogram bin count
    pub triangular_index: f32,
    /// Low-frequency proxy (non-spectral)
    pub lf: f32,
    /// High-frequency proxy (non-spectral)
    pub hf: f32,
    /// LF/HF balance proxy; 0 when HF is 0
    pub lf_hf_ratio: f32,
    pub sample_count: usize,
    /// False: LF/HF is a stride proxy, not a spectral estimate
    pub spectral: bool,
    pub assessment: HrvAssessment,
    pub state: StateEstimate,
}

/// Accumulates validated RR intervals and derives variability statistics
/// plus a physiological state estimate.
///
/// The engine exclusively owns its bounded history; admission discards
/// implausible intervals rather than erroring.
pub struct HrvEngine {
    config: HrvConfig,
    classifier: StateClassifier,
    history: VecDeque<f32>,
}

impl HrvEngine {
    pub fn new(config: &HrvConfig, state_config: &StateConfig) -> Self {
        Self {
            config: config.clone(),
            classifier: StateClassifier::new(state_config),
            history: VecDeque::with_capacity(config.history_capacity),
        }
    }

    /// Offer an RR interval in milliseconds.
    ///
    /// Returns whether it passed the admission bounds; rejected intervals
    /// are discarded, not stored. The oldest interval is evicted once the
    /// history is full.
    pub fn record(&mut self, rr_ms: f32) -> bool {
        if !rr_ms.is_finite()
            || rr_ms < self.config.rr_min_ms
            || rr_ms > self.config.rr_max_ms
        {
            return false;
        }
        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(rr_ms);
        true
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn readiness(&self) -> Readiness {
        match self.history.len() {
            0 => Readiness::Cold,
            n if n < self.config.ready_min_samples => Readiness::Warming,
            _ => Readiness::Ready,
        }
    }

    /// Compute the current statistics snapshot.
    pub fn snapshot(&self) -> HrvSnapshot {
        let intervals: Vec<f32> = self.history.iter().copied().collect();
        let n = intervals.len();
        let diffs: Vec<f32> = intervals.windows(2).map(|w| w[1] - w[0]).collect();

        let rmssd = if diffs.is_empty() {
            0.0
        } else {
            (diffs.iter().map(|d| d * d).sum::<f32>() / diffs.len() as f32).sqrt()
        };

        let sdnn = if n == 0 {
            0.0
        } else {
            let mean = intervals.iter().sum::<f32>() / n as f32;
            (intervals.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / n as f32).sqrt()
        };

        let pnn50 = if diffs.is_empty() {
            0.0
        } else {
            let over = diffs
                .iter()
                .filter(|d| d.abs() > self.config.pnn_threshold_ms)
                .count();
            100.0 * over as f32 / diffs.len() as f32
        };

        let triangular_index = self.triangular_index(&intervals);
        let (lf, hf, lf_hf_ratio) = self.frequency_proxy(&diffs, n);

        let assessment = if rmssd < self.config.rmssd_low_ms {
            HrvAssessment::Low
        } else if rmssd > self.config.rmssd_high_ms {
            HrvAssessment::High
        } else {
            HrvAssessment::Normal
        };

        let state = if n < self.config.ready_min_samples {
            StateEstimate::analyzing()
        } else {
            let mean_rr = intervals.iter().sum::<f32>() / n as f32;
            self.classifier.classify(&StateInputs {
                rmssd,
                sdnn,
                pnn50,
                lf_hf_ratio,
                entropy: (1.0 + triangular_index).ln(),
                bpm: 60_000.0 / mean_rr,
            })
        };

        HrvSnapshot {
            rmssd,
            sdnn,
            pnn50,
            triangular_index,
            lf,
            hf,
            lf_hf_ratio,
            sample_count: n,
            spectral: false,
            assessment,
            state,
        }
    }

    /// Histogram-based triangular index: interval count over the modal bin
    /// count, with fixed-width bins spanning [min, max].
    fn triangular_index(&self, intervals: &[f32]) -> f32 {
        let n = intervals.len();
        if n < self.config.triangular_min_samples {
            return 0.0;
        }
        let min = intervals.iter().copied().fold(f32::INFINITY, f32::min);
        let max = intervals.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let width = self.config.bin_width_ms;
        let bin_count = ((max - min) / width) as usize + 1;

        let mut bins = vec![0usize; bin_count];
        for &value in intervals {
            let idx = (((value - min) / width) as usize).min(bin_count - 1);
            bins[idx] += 1;
        }
        let modal = bins.iter().copied().max().unwrap_or(0);
        if modal == 0 {
            return 0.0;
        }
        n as f32 / modal as f32
    }

    /// Non-spectral LF/HF proxy: mean absolute value of every 4th (LF) and
    /// every 2nd (HF) successive difference.
    fn frequency_proxy(&self, diffs: &[f32], n: usize) -> (f32, f32, f32) {
        if n < self.config.frequency_min_samples {
            return (0.0, 0.0, 0.0);
        }
        let stride_mean = |stride: usize| {
            let values: Vec<f32> = diffs.iter().step_by(stride).map(|d| d.abs()).collect();
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f32>() / values.len() as f32
            }
        };
        let lf = stride_mean(4);
        let hf = stride_mean(2);
        let ratio = if hf > 0.0 { lf / hf } else { 0.0 };
        (lf, hf, ratio)
    }

    /// Return to Cold: discard all accumulated intervals.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::state::PhysiologicalState;

    fn engine() -> HrvEngine {
        HrvEngine::new(&HrvConfig::default(), &StateConfig::default())
    }

    fn fill(engine: &mut HrvEngine, intervals: &[f32]) {
        for &rr in intervals {
            engine.record(rr);
        }
    }

    #[test]
    fn test_admission_bounds() {
        let mut hrv = engine();
        assert!(!hrv.record(299.9));
        assert!(!hrv.record(2000.1));
        assert!(!hrv.record(f32::NAN));
        assert!(hrv.record(300.0));
        assert!(hrv.record(2000.0));
        assert_eq!(hrv.len(), 2);
    }

    #[test]
    fn test_history_eviction() {
        let mut hrv = engine();
        for i in 0..350 {
            hrv.record(700.0 + (i % 3) as f32);
        }
        assert_eq!(hrv.len(), HrvConfig::default().history_capacity);
    }

    #[test]
    fn test_constant_series_has_zero_variability() {
        let mut hrv = engine();
        fill(&mut hrv, &[800.0; 4]);
        let snapshot = hrv.snapshot();
        assert_eq!(snapshot.rmssd, 0.0);
        assert_eq!(snapshot.sdnn, 0.0);
        assert_eq!(snapshot.pnn50, 0.0);
    }

    #[test]
    fn test_alternating_series_rmssd_exact() {
        let mut hrv = engine();
        fill(&mut hrv, &[700.0, 900.0, 700.0, 900.0]);
        let snapshot = hrv.snapshot();
        // Successive diffs are ±200, so RMSSD is exactly 200.
        assert!((snapshot.rmssd - 200.0).abs() < 1e-3);
        assert_eq!(snapshot.pnn50, 100.0);
    }

    #[test]
    fn test_pnn50_zero_when_no_large_diffs() {
        let mut hrv = engine();
        fill(&mut hrv, &[800.0, 810.0, 820.0, 800.0, 790.0]);
        assert_eq!(hrv.snapshot().pnn50, 0.0);
    }

    #[test]
    fn test_triangular_index_gated_below_twenty() {
        let mut hrv = engine();
        fill(&mut hrv, &vec![800.0; 19]);
        assert_eq!(hrv.snapshot().triangular_index, 0.0);

        hrv.record(800.0);
        // All values land in one bin: modal = n, index = 1
        assert!((hrv.snapshot().triangular_index - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangular_index_bounded_by_sample_count() {
        let mut hrv = engine();
        // Spread uniformly so every bin holds few samples
        let intervals: Vec<f32> = (0..40).map(|i| 500.0 + i as f32 * 30.0).collect();
        fill(&mut hrv, &intervals);
        let snapshot = hrv.snapshot();
        assert!(snapshot.triangular_index <= snapshot.sample_count as f32);
        assert!(snapshot.triangular_index > 0.0);
    }

    #[test]
    fn test_frequency_proxy_gated_below_thirty() {
        let mut hrv = engine();
        let intervals: Vec<f32> = (0..29).map(|i| 700.0 + (i % 5) as f32 * 40.0).collect();
        fill(&mut hrv, &intervals);
        let snapshot = hrv.snapshot();
        assert_eq!((snapshot.lf, snapshot.hf, snapshot.lf_hf_ratio), (0.0, 0.0, 0.0));
        assert!(!snapshot.spectral);
    }

    #[test]
    fn test_readiness_transitions_at_thirty() {
        let mut hrv = engine();
        assert_eq!(hrv.readiness(), Readiness::Cold);

        for i in 0..29 {
            hrv.record(700.0 + (i % 7) as f32 * 25.0);
        }
        assert_eq!(hrv.readiness(), Readiness::Warming);
        let snapshot = hrv.snapshot();
        assert_eq!(snapshot.state.state, PhysiologicalState::Analyzing);
        assert_eq!(snapshot.state.confidence, 0.0);

        hrv.record(750.0);
        assert_eq!(hrv.readiness(), Readiness::Ready);
        let snapshot = hrv.snapshot();
        assert_ne!(snapshot.state.state, PhysiologicalState::Analyzing);
        assert!((0.6..=0.95).contains(&snapshot.state.confidence));
    }

    #[test]
    fn test_reset_returns_to_cold() {
        let mut hrv = engine();
        fill(&mut hrv, &vec![800.0; 40]);
        assert_eq!(hrv.readiness(), Readiness::Ready);
        hrv.reset();
        assert_eq!(hrv.readiness(), Readiness::Cold);
        assert_eq!(hrv.snapshot().sample_count, 0);
    }

    #[test]
    fn test_assessment_bands() {
        let mut hrv = engine();
        fill(&mut hrv, &[800.0; 5]);
        assert_eq!(hrv.snapshot().assessment, HrvAssessment::Low);

        let mut hrv = engine();
        fill(&mut hrv, &[700.0, 730.0, 700.0, 730.0, 700.0]);
        assert_eq!(hrv.snapshot().assessment, HrvAssessment::Normal);

        let mut hrv = engine();
        fill(&mut hrv, &[700.0, 900.0, 700.0, 900.0]);
        assert_eq!(hrv.snapshot().assessment, HrvAssessment::High);
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let mut hrv = engine();
        let intervals: Vec<f32> = (0..45).map(|i| 650.0 + (i % 9) as f32 * 35.0).collect();
        fill(&mut hrv, &intervals);
        assert_eq!(hrv.snapshot(), hrv.snapshot());
    }
}
