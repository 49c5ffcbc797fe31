use serde::Serialize;

use crate::config::SegmenterConfig;
use crate::signal_processing::Peak;
use crate::signal_processing::math::population_variance;

/// Which wave of the cardiac cycle a landmark belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WaveKind {
    P,
    Q,
    R,
    S,
    T,
}

/// One located wave landmark within the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaveLandmark {
    pub index: usize,
    pub amplitude: f32,
    pub kind: WaveKind,
}

/// The landmark cluster for one accepted beat.
///
/// R is always present; the other waves are absent when their search window
/// falls outside the buffer. `rr_samples` is the clamped local RR interval
/// the search windows were scaled by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeatLandmarks {
    pub p: Option<WaveLandmark>,
    pub q: Option<WaveLandmark>,
    pub r: WaveLandmark,
    pub s: Option<WaveLandmark>,
    pub t: Option<WaveLandmark>,
    pub rr_samples: f32,
}

impl BeatLandmarks {
    /// All present landmarks in P,Q,R,S,T order.
    pub fn landmarks(&self) -> Vec<WaveLandmark> {
        [self.p, self.q, Some(self.r), self.s, self.t]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Locates P, Q, S and T landmarks around accepted R-peaks using search
/// windows scaled to the local RR interval.
///
/// Stateless: segmentation is a pure function of the window and peak list.
pub struct WaveSegmenter {
    config: SegmenterConfig,
    sample_rate: f32,
}

impl WaveSegmenter {
    pub fn new(config: &SegmenterConfig, sample_rate: f32) -> Self {
        Self {
            config: config.clone(),
            sample_rate,
        }
    }

    /// Segment the most recent beats.
    ///
    /// Returns one validated cluster per accepted R-peak, ascending by R
    /// index. A flat or too-weak window yields no clusters; when `peaks` is
    /// empty, R candidates are re-derived directly from raw amplitude.
    pub fn segment(&self, buffer: &[f32], peaks: &[Peak]) -> Vec<BeatLandmarks> {
        if buffer.is_empty() || self.too_weak(buffer) {
            return Vec::new();
        }

        if peaks.is_empty() {
            let direct = self.direct_r_candidates(buffer);
            if direct.is_empty() {
                return Vec::new();
            }
            return self.segment_peaks(buffer, &direct);
        }

        self.segment_peaks(buffer, peaks)
    }

    fn too_weak(&self, buffer: &[f32]) -> bool {
        let max_amplitude = buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        max_amplitude < self.config.min_amplitude
            || population_variance(buffer) < self.config.min_variance
    }

    fn segment_peaks(&self, buffer: &[f32], peaks: &[Peak]) -> Vec<BeatLandmarks> {
        let start = peaks.len().saturating_sub(self.config.max_beats);
        let mut beats = Vec::new();
        for (offset, peak) in peaks[start..].iter().enumerate() {
            let i = start + offset;
            let rr = self.local_rr(peaks, i);
            if let Some(beat) = self.segment_beat(buffer, peak, rr) {
                beats.push(beat);
            }
        }
        beats
    }

    /// Local RR interval in samples: distance to the previous accepted peak,
    /// falling back to the next peak, then to a one-second default; clamped
    /// to reject implausible spacing.
    fn local_rr(&self, peaks: &[Peak], i: usize) -> f32 {
        let rr = if i > 0 {
            (peaks[i].index - peaks[i - 1].index) as f32
        } else if peaks.len() > 1 {
            (peaks[i + 1].index - peaks[i].index) as f32
        } else {
            self.config.default_rr_seconds * self.sample_rate
        };
        rr.clamp(
            self.config.rr_clamp_min * self.sample_rate,
            self.config.rr_clamp_max * self.sample_rate,
        )
    }

    fn segment_beat(&self, buffer: &[f32], peak: &Peak, rr: f32) -> Option<BeatLandmarks> {
        let r_index = peak.index;
        if r_index >= buffer.len() {
            return None;
        }
        if !self.valid_qrs(buffer, r_index) {
            return None;
        }

        let window = |fraction: f32| ((fraction * rr) as usize).max(1);
        let q_len = window(self.config.q_window_fraction);
        let p_len = window(self.config.p_window_fraction);
        let s_len = window(self.config.s_window_fraction);
        let t_len = window(self.config.t_window_fraction);
        let gap = window(self.config.gap_fraction);

        let q = self.window_min(buffer, r_index.saturating_sub(q_len), r_index, WaveKind::Q);
        let p = q.and_then(|q| {
            let end = q.index.saturating_sub(gap);
            self.window_max(buffer, end.saturating_sub(p_len), end, WaveKind::P)
        });
        let s = self.window_min(buffer, r_index + 1, (r_index + 1 + s_len).min(buffer.len()), WaveKind::S);
        let t = s.and_then(|s| {
            let start = s.index + gap;
            self.window_max(buffer, start, (start + t_len).min(buffer.len()), WaveKind::T)
        });

        Some(BeatLandmarks {
            p,
            q,
            r: WaveLandmark {
                index: r_index,
                amplitude: buffer[r_index],
                kind: WaveKind::R,
            },
            s,
            t,
            rr_samples: rr,
        })
    }

    /// A cluster is a true QRS complex when a negative deflection flanks R on
    /// both sides, or the R amplitude alone clears the absolute floor.
    fn valid_qrs(&self, buffer: &[f32], r_index: usize) -> bool {
        let r_amplitude = buffer[r_index];
        if r_amplitude > self.config.r_amplitude_floor {
            return true;
        }

        let w = self.config.validation_window;
        let before = &buffer[r_index.saturating_sub(w)..r_index];
        let after = &buffer[(r_index + 1).min(buffer.len())..(r_index + 1 + w).min(buffer.len())];
        let dips_before = before.iter().any(|&s| s < 0.0);
        let dips_after = after.iter().any(|&s| s < 0.0);
        dips_before && dips_after
    }

    fn window_min(
        &self,
        buffer: &[f32],
        start: usize,
        end: usize,
        kind: WaveKind,
    ) -> Option<WaveLandmark> {
        self.window_extremum(buffer, start, end, kind, false)
    }

    fn window_max(
        &self,
        buffer: &[f32],
        start: usize,
        end: usize,
        kind: WaveKind,
    ) -> Option<WaveLandmark> {
        self.window_extremum(buffer, start, end, kind, true)
    }

    fn window_extremum(
        &self,
        buffer: &[f32],
        start: usize,
        end: usize,
        kind: WaveKind,
        maximum: bool,
    ) -> Option<WaveLandmark> {
        let end = end.min(buffer.len());
        if start >= end {
            return None;
        }
        let slice = buffer[start..end].iter().enumerate();
        let found = if maximum {
            slice.max_by(|&(_, a), &(_, b)| a.total_cmp(b))
        } else {
            slice.min_by(|&(_, a), &(_, b)| a.total_cmp(b))
        };
        found.map(|(offset, &amplitude)| WaveLandmark {
            index: start + offset,
            amplitude,
            kind,
        })
    }

    /// Direct R detection from raw amplitude, for windows where both
    /// detectors came up empty: threshold at a fraction of the maximum,
    /// minimum separation between candidates.
    fn direct_r_candidates(&self, buffer: &[f32]) -> Vec<Peak> {
        let max_amplitude = buffer.iter().fold(0.0f32, |acc, s| acc.max(*s));
        if max_amplitude <= 0.0 {
            return Vec::new();
        }
        let threshold = max_amplitude * self.config.direct_threshold_fraction;

        let mut candidates: Vec<Peak> = Vec::new();
        for i in 1..buffer.len() - 1 {
            let value = buffer[i];
            if value < threshold || value < buffer[i - 1] || value < buffer[i + 1] {
                continue;
            }
            if candidates
                .last()
                .is_some_and(|last| i - last.index < self.config.direct_min_separation)
            {
                continue;
            }
            candidates.push(Peak {
                index: i,
                amplitude: value,
            });
        }
        candidates
    }
}
