use std::f32::consts::PI;

/// Gaussian description of one wave: center offset from R in seconds,
/// width (standard deviation) in seconds, and peak amplitude.
#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct Wave {
    pub offset_s: f32,
    pub width_s: f32,
    pub amplitude: f32,
}

/// Idealized single-beat morphology as a sum of Gaussian bumps.
#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct BeatMorphology {
    pub p: Wave,
    pub q: Wave,
    pub r: Wave,
    pub s: Wave,
    pub t: Wave,
}

impl Default for BeatMorphology {
    fn default() -> Self {
        Self {
            p: Wave {
                offset_s: -0.16,
                width_s: 0.02,
                amplitude: 0.15,
            },
            q: Wave {
                offset_s: -0.028,
                width_s: 0.008,
                amplitude: -0.12,
            },
            r: Wave {
                offset_s: 0.0,
                width_s: 0.01,
                amplitude: 1.0,
            },
            s: Wave {
                offset_s: 0.032,
                width_s: 0.008,
                amplitude: -0.25,
            },
            t: Wave {
                offset_s: 0.22,
                width_s: 0.05,
                amplitude: 0.3,
            },
        }
    }
}

impl BeatMorphology {
    fn waves(&self) -> [Wave; 5] {
        [self.p, self.q, self.r, self.s, self.t]
    }
}

/// Generate a clean synthetic ECG at a constant heart rate.
pub fn generate_ecg(duration_secs: f32, sample_rate: f32, bpm: f32) -> Vec<f32> {
    generate_ecg_with(
        duration_secs,
        sample_rate,
        bpm,
        &BeatMorphology::default(),
        0.0,
    )
}

/// Generate a synthetic ECG with explicit morphology and optional
/// sinusoidal RR modulation (`rr_modulation` as a fraction of the beat
/// period, cycling at the respiratory rate of ~0.25 Hz).
pub fn generate_ecg_with(
    duration_secs: f32,
    sample_rate: f32,
    bpm: f32,
    morphology: &BeatMorphology,
    rr_modulation: f32,
) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate) as usize;
    let mut signal = vec![0.0f32; num_samples];
    let nominal_rr = 60.0 / bpm;

    // Lay beats down one R at a time, perturbing each period
    let mut r_time = nominal_rr * 0.5;
    let mut beat_index = 0usize;
    while r_time < duration_secs + nominal_rr {
        for wave in morphology.waves() {
            add_gaussian(
                &mut signal,
                sample_rate,
                r_time + wave.offset_s,
                wave.width_s,
                wave.amplitude,
            );
        }
        let modulation =
            1.0 + rr_modulation * (2.0 * PI * 0.25 * beat_index as f32 * nominal_rr).sin();
        r_time += nominal_rr * modulation;
        beat_index += 1;
    }
    signal
}

fn add_gaussian(signal: &mut [f32], sample_rate: f32, center_s: f32, width_s: f32, amplitude: f32) {
    let center = center_s * sample_rate;
    let width = width_s * sample_rate;
    // A Gaussian is negligible past four standard deviations
    let reach = (4.0 * width) as isize;
    let center_idx = center as isize;
    for idx in (center_idx - reach)..=(center_idx + reach) {
        if idx < 0 || idx as usize >= signal.len() {
            continue;
        }
        let x = (idx as f32 - center) / width;
        signal[idx as usize] += amplitude * (-0.5 * x * x).exp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_beat_count() {
        let signal = generate_ecg(10.0, 250.0, 60.0);
        // Count samples above 80% of max: one run per R wave
        let max = signal.iter().cloned().fold(0.0f32, f32::max);
        let mut beats = 0;
        let mut above = false;
        for &s in &signal {
            if s > 0.8 * max && !above {
                beats += 1;
            }
            above = s > 0.8 * max;
        }
        assert!((9..=11).contains(&beats), "expected ~10 beats, got {beats}");
    }

    #[test]
    fn test_amplitude_normalized() {
        let signal = generate_ecg(5.0, 250.0, 75.0);
        let max = signal.iter().cloned().fold(0.0f32, f32::max);
        assert!(max > 0.8 && max < 1.2, "R amplitude {max} off nominal");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(generate_ecg(2.0, 250.0, 75.0), generate_ecg(2.0, 250.0, 75.0));
    }
}
