use std::f32::consts::PI;

use iir_filters::filter::{DirectForm2Transposed, Filter};
use iir_filters::filter_design::{FilterType, butter};
use iir_filters::sos::{Sos, zpk2sos};

use crate::config::FilterConfig;
use crate::error::{EcgError, Result};

/// Fixed-coefficient second-order IIR section (Direct Form II transposed).
///
/// Coefficients are computed once at construction from the RBJ cookbook;
/// the two-element delay state is owned by the instance, so one filter
/// serves exactly one sample stream. `reset()` zeroes the state without
/// touching the coefficients.
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Design a notch rejecting a narrow band around `freq_hz`.
    pub fn notch(sample_rate: f32, freq_hz: f32, q: f32) -> Result<Self> {
        Self::check_frequency(sample_rate, freq_hz)?;
        let w0 = 2.0 * PI * freq_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let a0 = 1.0 + alpha;
        Ok(Self::normalized(
            1.0,
            -2.0 * cos_w0,
            1.0,
            a0,
            -2.0 * cos_w0,
            1.0 - alpha,
        ))
    }

    /// Design a band-pass with 0 dB peak gain between `low_hz` and `high_hz`.
    pub fn bandpass(sample_rate: f32, low_hz: f32, high_hz: f32) -> Result<Self> {
        if low_hz <= 0.0 || low_hz >= high_hz {
            return Err(EcgError::FilterDesign(format!(
                "band edges {low_hz}-{high_hz} Hz inverted"
            )));
        }
        Self::check_frequency(sample_rate, high_hz)?;
        let center = (low_hz * high_hz).sqrt();
        let q = center / (high_hz - low_hz);
        let w0 = 2.0 * PI * center / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let a0 = 1.0 + alpha;
        Ok(Self::normalized(
            alpha,
            0.0,
            -alpha,
            a0,
            -2.0 * cos_w0,
            1.0 - alpha,
        ))
    }

    fn check_frequency(sample_rate: f32, freq_hz: f32) -> Result<()> {
        if sample_rate <= 0.0 {
            return Err(EcgError::FilterDesign(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if freq_hz <= 0.0 || freq_hz >= sample_rate / 2.0 {
            return Err(EcgError::FilterDesign(format!(
                "{freq_hz} Hz outside (0, Nyquist) for {sample_rate} Hz sampling"
            )));
        }
        Ok(())
    }

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Filter a single sample.
    pub fn process(&mut self, sample: f32) -> f32 {
        let y = self.b0 * sample + self.z1;
        self.z1 = self.b1 * sample - self.a1 * y + self.z2;
        self.z2 = self.b2 * sample - self.a2 * y;
        y
    }

    /// Filter an entire buffer in place.
    pub fn process_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Clear the delay state.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// The two cascaded conditioning stages applied to every incoming sample:
/// power-line notch, then the ECG band-pass that suppresses baseline wander
/// and emphasizes the QRS band.
///
/// Exactly one instance drives one input channel; callers must drop
/// non-finite samples before this point.
pub struct StageFilters {
    notch: Biquad,
    bandpass: Biquad,
}

impl StageFilters {
    pub fn new(config: &FilterConfig, sample_rate: f32) -> Result<Self> {
        Ok(Self {
            notch: Biquad::notch(sample_rate, config.notch_hz, config.notch_q)?,
            bandpass: Biquad::bandpass(
                sample_rate,
                config.bandpass_low_hz,
                config.bandpass_high_hz,
            )?,
        })
    }

    /// Run one sample through both stages.
    pub fn process(&mut self, sample: f32) -> f32 {
        self.bandpass.process(self.notch.process(sample))
    }

    /// Filter an entire buffer in place.
    pub fn process_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Clear both stages' delay state.
    pub fn reset(&mut self) {
        self.notch.reset();
        self.bandpass.reset();
    }
}

/// Butterworth band-pass isolating the QRS energy band (nominally 5–15 Hz)
/// for the adaptive beat detector.
///
/// The second-order-section design is computed once; each `filtered()` call
/// runs a fresh filter state over the buffer, so a detection pass is a pure
/// function of its input window.
pub struct QrsBandpass {
    sos: Sos,
}

impl QrsBandpass {
    pub fn new(low_hz: f32, high_hz: f32, sample_rate: f32, order: usize) -> Result<Self> {
        let zpk = butter(
            order as u32,
            FilterType::BandPass(low_hz as f64, high_hz as f64),
            sample_rate as f64,
        )
        .map_err(|e| EcgError::FilterDesign(format!("{:?}", e)))?;

        let sos = zpk2sos(&zpk, None).map_err(|e| EcgError::FilterDesign(format!("{:?}", e)))?;

        Ok(Self { sos })
    }

    /// Filter a buffer into a new vector, starting from zeroed filter state.
    pub fn filtered(&self, buffer: &[f32]) -> Vec<f32> {
        let mut filter = DirectForm2Transposed::new(&self.sos);
        buffer
            .iter()
            .map(|&sample| filter.filter(sample as f64) as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq_hz: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
        (0..num_samples)
            .map(|i| (2.0 * PI * freq_hz * i as f32 / sample_rate).sin())
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_notch_design() {
        assert!(Biquad::notch(250.0, 50.0, 30.0).is_ok());
    }

    #[test]
    fn test_notch_rejects_nyquist_violation() {
        assert!(Biquad::notch(80.0, 50.0, 30.0).is_err());
        assert!(Biquad::notch(0.0, 50.0, 30.0).is_err());
    }

    #[test]
    fn test_notch_attenuates_center_frequency() {
        let mut filter = Biquad::notch(250.0, 50.0, 30.0).unwrap();
        let mut signal = tone(50.0, 250.0, 2500);
        filter.process_buffer(&mut signal);

        // Skip the transient, then the mains tone should be well suppressed.
        let settled = rms(&signal[1250..]);
        assert!(settled < 0.1, "50 Hz tone not attenuated: rms {settled}");
    }

    #[test]
    fn test_bandpass_passes_qrs_band() {
        let mut filter = Biquad::bandpass(250.0, 0.5, 40.0).unwrap();
        let input = tone(10.0, 250.0, 2500);
        let mut output = input.clone();
        filter.process_buffer(&mut output);

        let attenuation_db = 20.0 * (rms(&output[1250..]) / rms(&input[1250..])).log10();
        assert!(
            attenuation_db > -3.0,
            "10 Hz tone too attenuated: {attenuation_db} dB"
        );
    }

    #[test]
    fn test_biquad_reset_restores_initial_response() {
        let mut filter = Biquad::bandpass(250.0, 0.5, 40.0).unwrap();
        let signal = tone(10.0, 250.0, 100);

        let first: Vec<f32> = signal.iter().map(|&s| filter.process(s)).collect();
        filter.reset();
        let second: Vec<f32> = signal.iter().map(|&s| filter.process(s)).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_stage_filters_suppress_baseline_wander() {
        let config = FilterConfig::default();
        let mut stages = StageFilters::new(&config, 250.0).unwrap();

        // 0.2 Hz drift is below the band-pass corner and should shrink.
        let mut drift = tone(0.2, 250.0, 5000);
        stages.process_buffer(&mut drift);
        assert!(rms(&drift[2500..]) < 0.5);
    }

    #[test]
    fn test_qrs_bandpass_is_pure_per_pass() {
        let bandpass = QrsBandpass::new(5.0, 15.0, 250.0, 2).unwrap();
        let signal = tone(10.0, 250.0, 500);

        let first = bandpass.filtered(&signal);
        let second = bandpass.filtered(&signal);
        assert_eq!(first, second);
    }
}
