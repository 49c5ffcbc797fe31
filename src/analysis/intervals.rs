use serde::Serialize;

use crate::analysis::segmenter::BeatLandmarks;
use crate::config::{IntervalConfig, Sex};
use crate::signal_processing::math::mean;

/// Classification of a measured interval against its clinical band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalStatus {
    Normal,
    Short,
    Prolonged,
    Wide,
    Elevated,
    Depressed,
    Unknown,
}

/// One measured interval: value in milliseconds (millimeters for ST
/// deviation) plus its classification. Missing landmarks leave the value
/// `None` with an `Unknown` status, never a numeric default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntervalMeasure {
    pub value: Option<f32>,
    pub status: IntervalStatus,
}

impl IntervalMeasure {
    fn unknown() -> Self {
        Self {
            value: None,
            status: IntervalStatus::Unknown,
        }
    }
}

/// The clinical interval measurements for the most recent validated beat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntervalSet {
    pub pr: IntervalMeasure,
    pub qrs: IntervalMeasure,
    pub qt: IntervalMeasure,
    pub qtc: IntervalMeasure,
    pub st_deviation: IntervalMeasure,
}

impl Default for IntervalSet {
    fn default() -> Self {
        Self {
            pr: IntervalMeasure::unknown(),
            qrs: IntervalMeasure::unknown(),
            qt: IntervalMeasure::unknown(),
            qtc: IntervalMeasure::unknown(),
            st_deviation: IntervalMeasure::unknown(),
        }
    }
}

/// Converts landmark clusters into clinical intervals.
///
/// Recomputes whenever a fresh cluster arrives and otherwise holds the last
/// computed set. The ST baseline is the PR-segment mean (P through Q), and
/// ST deviation is measured `st_offset_ms` after the J-point (taken as S).
pub struct IntervalCalculator {
    config: IntervalConfig,
    sample_rate: f32,
    current: IntervalSet,
}

impl IntervalCalculator {
    pub fn new(config: &IntervalConfig, sample_rate: f32) -> Self {
        Self {
            config: config.clone(),
            sample_rate,
            current: IntervalSet::default(),
        }
    }

    /// Recompute the interval set from a fresh beat cluster.
    pub fn update(&mut self, buffer: &[f32], beat: &BeatLandmarks) -> IntervalSet {
        let ms_per_sample = 1000.0 / self.sample_rate;
        let span_ms = |from: usize, to: usize| (to as f32 - from as f32) * ms_per_sample;

        let pr = beat
            .p
            .map(|p| self.classify_pr(span_ms(p.index, beat.r.index)));
        let qrs = match (beat.q, beat.s) {
            (Some(q), Some(s)) => Some(self.classify_qrs(span_ms(q.index, s.index))),
            _ => None,
        };
        let qt = match (beat.q, beat.t) {
            (Some(q), Some(t)) => Some(self.classify_qt(span_ms(q.index, t.index))),
            _ => None,
        };
        let qtc = qt.and_then(|qt| {
            let rr_seconds = beat.rr_samples / self.sample_rate;
            (rr_seconds > 0.0)
                .then(|| self.classify_qtc(qt.value.unwrap_or(0.0) / rr_seconds.sqrt()))
        });
        let st_deviation = self.st_deviation(buffer, beat);

        self.current = IntervalSet {
            pr: pr.unwrap_or_else(IntervalMeasure::unknown),
            qrs: qrs.unwrap_or_else(IntervalMeasure::unknown),
            qt: qt.unwrap_or_else(IntervalMeasure::unknown),
            qtc: qtc.unwrap_or_else(IntervalMeasure::unknown),
            st_deviation: st_deviation.unwrap_or_else(IntervalMeasure::unknown),
        };
        self.current
    }

    /// The last computed set; all-unknown before the first cluster.
    pub fn current(&self) -> IntervalSet {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = IntervalSet::default();
    }

    fn classify_pr(&self, value: f32) -> IntervalMeasure {
        let status = if value < self.config.pr_short_ms {
            IntervalStatus::Short
        } else if value > self.config.pr_prolonged_ms {
            IntervalStatus::Prolonged
        } else {
            IntervalStatus::Normal
        };
        IntervalMeasure {
            value: Some(value),
            status,
        }
    }

    fn classify_qrs(&self, value: f32) -> IntervalMeasure {
        let status = if value > self.config.qrs_wide_ms {
            IntervalStatus::Wide
        } else {
            IntervalStatus::Normal
        };
        IntervalMeasure {
            value: Some(value),
            status,
        }
    }

    fn classify_qt(&self, value: f32) -> IntervalMeasure {
        // QT is banded through its rate-corrected form; report the raw
        // measurement as normal unless degenerate.
        let status = if value > 0.0 {
            IntervalStatus::Normal
        } else {
            IntervalStatus::Unknown
        };
        IntervalMeasure {
            value: Some(value),
            status,
        }
    }

    fn classify_qtc(&self, value: f32) -> IntervalMeasure {
        let prolonged_bound = match self.config.sex {
            Sex::Male => self.config.qtc_prolonged_ms,
            Sex::Female => self.config.qtc_prolonged_female_ms,
        };
        let status = if value > prolonged_bound {
            IntervalStatus::Prolonged
        } else if value < self.config.qtc_short_ms {
            IntervalStatus::Short
        } else {
            IntervalStatus::Normal
        };
        IntervalMeasure {
            value: Some(value),
            status,
        }
    }

    fn st_deviation(&self, buffer: &[f32], beat: &BeatLandmarks) -> Option<IntervalMeasure> {
        let p = beat.p?;
        let q = beat.q?;
        let s = beat.s?;
        if p.index >= q.index {
            return None;
        }

        // Isoelectric baseline from the PR segment
        let baseline = mean(&buffer[p.index..=q.index]);

        let offset = (self.config.st_offset_ms / 1000.0 * self.sample_rate) as usize;
        let measure_index = s.index + offset;
        if measure_index >= buffer.len() {
            return None;
        }

        let deviation_mm = (buffer[measure_index] - baseline) * self.config.mm_per_unit;
        let status = if deviation_mm > self.config.st_deviation_mm {
            IntervalStatus::Elevated
        } else if deviation_mm < -self.config.st_deviation_mm {
            IntervalStatus::Depressed
        } else {
            IntervalStatus::Normal
        };
        Some(IntervalMeasure {
            value: Some(deviation_mm),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::segmenter::{WaveKind, WaveLandmark};

    const SAMPLE_RATE: f32 = 250.0;

    fn landmark(index: usize, amplitude: f32, kind: WaveKind) -> WaveLandmark {
        WaveLandmark {
            index,
            amplitude,
            kind,
        }
    }

    /// Beat with PR 160 ms, QRS 80 ms, QT 360 ms at 250 Hz (4 ms/sample).
    fn normal_beat() -> BeatLandmarks {
        BeatLandmarks {
            p: Some(landmark(460, 0.15, WaveKind::P)),
            q: Some(landmark(495, -0.1, WaveKind::Q)),
            r: landmark(500, 1.0, WaveKind::R),
            s: Some(landmark(515, -0.2, WaveKind::S)),
            t: Some(landmark(585, 0.3, WaveKind::T)),
            rr_samples: 200.0,
        }
    }

    fn flat_buffer() -> Vec<f32> {
        vec![0.0; 1200]
    }

    #[test]
    fn test_normal_beat_intervals() {
        let mut calc = IntervalCalculator::new(&IntervalConfig::default(), SAMPLE_RATE);
        let set = calc.update(&flat_buffer(), &normal_beat());

        assert_eq!(set.pr.status, IntervalStatus::Normal);
        assert!((set.pr.value.unwrap() - 160.0).abs() < 1e-3);

        assert_eq!(set.qrs.status, IntervalStatus::Normal);
        assert!((set.qrs.value.unwrap() - 80.0).abs() < 1e-3);

        assert!((set.qt.value.unwrap() - 360.0).abs() < 1e-3);

        // RR = 800 ms → QTc = 360 / sqrt(0.8) ≈ 402.5 ms
        assert_eq!(set.qtc.status, IntervalStatus::Normal);
        assert!((set.qtc.value.unwrap() - 402.49).abs() < 0.1);
    }

    #[test]
    fn test_missing_p_yields_unknown_pr() {
        let mut calc = IntervalCalculator::new(&IntervalConfig::default(), SAMPLE_RATE);
        let mut beat = normal_beat();
        beat.p = None;
        let set = calc.update(&flat_buffer(), &beat);

        assert_eq!(set.pr.status, IntervalStatus::Unknown);
        assert!(set.pr.value.is_none());
        // ST needs the PR segment baseline, so it degrades too
        assert_eq!(set.st_deviation.status, IntervalStatus::Unknown);
        // The rest still measure
        assert_eq!(set.qrs.status, IntervalStatus::Normal);
    }

    #[test]
    fn test_short_and_prolonged_pr() {
        let mut calc = IntervalCalculator::new(&IntervalConfig::default(), SAMPLE_RATE);

        let mut beat = normal_beat();
        beat.p = Some(landmark(475, 0.15, WaveKind::P)); // 100 ms before R
        assert_eq!(
            calc.update(&flat_buffer(), &beat).pr.status,
            IntervalStatus::Short
        );

        beat.p = Some(landmark(440, 0.15, WaveKind::P)); // 240 ms before R
        assert_eq!(
            calc.update(&flat_buffer(), &beat).pr.status,
            IntervalStatus::Prolonged
        );
    }

    #[test]
    fn test_wide_qrs() {
        let mut calc = IntervalCalculator::new(&IntervalConfig::default(), SAMPLE_RATE);
        let mut beat = normal_beat();
        beat.s = Some(landmark(530, -0.2, WaveKind::S)); // 140 ms after Q
        assert_eq!(
            calc.update(&flat_buffer(), &beat).qrs.status,
            IntervalStatus::Wide
        );
    }

    #[test]
    fn test_qtc_sex_banding() {
        // QT 360 ms at RR 600 ms → QTc ≈ 464.8 ms: prolonged for a male
        // subject, normal for a female subject.
        let mut beat = normal_beat();
        beat.rr_samples = 150.0;

        let mut male = IntervalCalculator::new(&IntervalConfig::default(), SAMPLE_RATE);
        assert_eq!(
            male.update(&flat_buffer(), &beat).qtc.status,
            IntervalStatus::Prolonged
        );

        let config = IntervalConfig {
            sex: Sex::Female,
            ..IntervalConfig::default()
        };
        let mut female = IntervalCalculator::new(&config, SAMPLE_RATE);
        assert_eq!(
            female.update(&flat_buffer(), &beat).qtc.status,
            IntervalStatus::Normal
        );
    }

    #[test]
    fn test_st_elevation() {
        let mut calc = IntervalCalculator::new(&IntervalConfig::default(), SAMPLE_RATE);
        let beat = normal_beat();

        // Baseline (PR segment) at zero; raise the trace 60 ms after S by
        // 0.08 units = 0.8 mm at 10 mm/unit.
        let mut buffer = flat_buffer();
        let measure_index = 515 + 15;
        buffer[measure_index] = 0.08;

        let set = calc.update(&buffer, &beat);
        assert_eq!(set.st_deviation.status, IntervalStatus::Elevated);
        assert!((set.st_deviation.value.unwrap() - 0.8).abs() < 1e-3);
    }

    #[test]
    fn test_holds_last_set_between_updates() {
        let mut calc = IntervalCalculator::new(&IntervalConfig::default(), SAMPLE_RATE);
        assert_eq!(calc.current().pr.status, IntervalStatus::Unknown);

        calc.update(&flat_buffer(), &normal_beat());
        assert_eq!(calc.current().pr.status, IntervalStatus::Normal);

        calc.reset();
        assert_eq!(calc.current().pr.status, IntervalStatus::Unknown);
    }
}
