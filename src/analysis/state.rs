use serde::Serialize;

use crate::config::StateConfig;

/// Rule-based physiological state estimate derived from HRV statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhysiologicalState {
    /// Not enough accumulated RR intervals to classify
    Analyzing,
    HighStress,
    Relaxed,
    Focused,
    Fatigue,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateEstimate {
    pub state: PhysiologicalState,
    /// In [confidence_floor, confidence_ceiling] once classified; 0 while
    /// still analyzing.
    pub confidence: f32,
}

impl StateEstimate {
    pub fn analyzing() -> Self {
        Self {
            state: PhysiologicalState::Analyzing,
            confidence: 0.0,
        }
    }
}

/// The feature values a classification decision is made from.
#[derive(Debug, Clone, Copy)]
pub struct StateInputs {
    pub rmssd: f32,
    pub sdnn: f32,
    pub pnn50: f32,
    pub lf_hf_ratio: f32,
    /// Entropy proxy: ln(1 + triangular index)
    pub entropy: f32,
    pub bpm: f32,
}

/// Fixed-rule classifier over HRV statistics.
///
/// Each state is a conjunction of banded conditions; a state matches when
/// every condition clears its threshold. Confidence scales with the
/// normalized distance to the nearest threshold: barely-cleared rules
/// report near the floor, comfortably-cleared rules near the ceiling. When
/// nothing matches, Neutral's confidence grows with how far the inputs sit
/// from tripping any other state.
pub struct StateClassifier {
    config: StateConfig,
}

impl StateClassifier {
    pub fn new(config: &StateConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn classify(&self, inputs: &StateInputs) -> StateEstimate {
        let c = &self.config;

        let candidates = [
            (
                PhysiologicalState::HighStress,
                min_margin(&[
                    below(inputs.rmssd, c.stress_rmssd_max_ms),
                    above(inputs.lf_hf_ratio, c.stress_ratio_min),
                    above(inputs.bpm, c.stress_bpm_min),
                ]),
            ),
            (
                PhysiologicalState::Relaxed,
                min_margin(&[
                    above(inputs.rmssd, c.relax_rmssd_min_ms),
                    below(inputs.lf_hf_ratio, c.relax_ratio_max),
                    below(inputs.bpm, c.relax_bpm_max),
                ]),
            ),
            (
                PhysiologicalState::Fatigue,
                min_margin(&[
                    below(inputs.sdnn, c.fatigue_sdnn_max_ms),
                    below(inputs.pnn50, c.fatigue_pnn50_max),
                    below(inputs.bpm, c.fatigue_bpm_max),
                ]),
            ),
            (
                PhysiologicalState::Focused,
                min_margin(&[
                    above(inputs.bpm, c.focus_bpm_min),
                    below(inputs.bpm, c.focus_bpm_max),
                    above(inputs.entropy, c.focus_entropy_min),
                    below(inputs.entropy, c.focus_entropy_max),
                ]),
            ),
        ];

        for &(state, margin) in &candidates {
            if margin > 0.0 {
                return StateEstimate {
                    state,
                    confidence: self.confidence(margin),
                };
            }
        }

        // Neutral: confident when nothing else came close to matching
        let nearest = candidates
            .iter()
            .map(|(_, margin)| *margin)
            .fold(f32::NEG_INFINITY, f32::max);
        StateEstimate {
            state: PhysiologicalState::Neutral,
            confidence: self.confidence(-nearest),
        }
    }

    fn confidence(&self, margin: f32) -> f32 {
        let c = &self.config;
        c.confidence_floor + (c.confidence_ceiling - c.confidence_floor) * margin.clamp(0.0, 1.0)
    }
}

/// Normalized margin by which `value` clears an upper bound.
fn below(value: f32, bound: f32) -> f32 {
    if bound.abs() < f32::EPSILON {
        return -1.0;
    }
    (bound - value) / bound.abs()
}

/// Normalized margin by which `value` clears a lower bound.
fn above(value: f32, bound: f32) -> f32 {
    if bound.abs() < f32::EPSILON {
        return value.signum();
    }
    (value - bound) / bound.abs()
}

fn min_margin(margins: &[f32]) -> f32 {
    margins.iter().copied().fold(f32::INFINITY, f32::min)
}
