//! Configuration for the ECG processing pipeline.
//!
//! All tuning values (refractory periods, learning rates, clinical bands,
//! HRV gates) live here as named fields with defaults, never as inline
//! literals in the algorithms. Every struct derives `serde::Deserialize`
//! with `#[serde(default)]`, so a partial TOML file can override any subset:
//!
//! ```ignore
//! [detector]
//! refractory_period_ms = 300.0
//!
//! [intervals]
//! sex = "female"
//! ```

use serde::Deserialize;

use crate::error::{EcgError, Result};

/// Subject sex, used for QTc classification banding.
///
/// Standard clinical convention tolerates a longer QTc upper bound for
/// female subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    Male,
    Female,
}

/// System-wide pipeline configuration
///
/// Contains all configuration parameters for the streaming ECG pipeline.
/// Use `EcgConfig::default()` for sensible defaults at the reference
/// 250 Hz sample rate.
///
/// # Example
/// ```
/// use sinusoid::config::EcgConfig;
///
/// let mut config = EcgConfig::default();
/// config.rate.smoothing_window = 8;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EcgConfig {
    /// Sample acquisition configuration
    pub acquisition: AcquisitionConfig,
    /// Stage filter (notch + band-pass) configuration
    pub filter: FilterConfig,
    /// Adaptive QRS detector configuration
    pub detector: DetectorConfig,
    /// Amplitude-threshold fallback peak finder configuration
    pub fallback: FallbackConfig,
    /// Wave segmentation configuration
    pub segmenter: SegmenterConfig,
    /// Clinical interval measurement configuration
    pub intervals: IntervalConfig,
    /// Heart rate smoothing configuration
    pub rate: RateConfig,
    /// HRV statistics configuration
    pub hrv: HrvConfig,
    /// Physiological state classification thresholds
    pub state: StateConfig,
}

/// Sample acquisition configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Sample rate in Hz (reference rate 250)
    pub sample_rate: f32,
    /// Rolling window capacity in samples (1200 ≈ 4.8 s at 250 Hz)
    pub buffer_capacity: usize,
    /// Number of input channels (this pipeline processes one)
    pub channels: u16,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 250.0,
            buffer_capacity: 1200,
            channels: 1,
        }
    }
}

/// Stage filter configuration
///
/// Two cascaded biquad stages: a power-line notch followed by a band-pass
/// that suppresses baseline wander and emphasizes the QRS band.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Power-line notch center frequency in Hz (50 or 60 by region)
    pub notch_hz: f32,
    /// Notch quality factor (higher = narrower rejection band)
    pub notch_q: f32,
    /// Band-pass lower cutoff in Hz
    pub bandpass_low_hz: f32,
    /// Band-pass upper cutoff in Hz
    pub bandpass_high_hz: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            notch_hz: 50.0,
            notch_q: 30.0,
            bandpass_low_hz: 0.5,
            bandpass_high_hz: 40.0,
        }
    }
}

/// Adaptive QRS detector configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// QRS energy band-pass lower cutoff in Hz
    pub qrs_band_low_hz: f32,
    /// QRS energy band-pass upper cutoff in Hz
    pub qrs_band_high_hz: f32,
    /// Butterworth order for the QRS energy band-pass
    pub qrs_filter_order: usize,
    /// Moving-window integration width in milliseconds
    pub integration_window_ms: f32,
    /// Window length required before adaptive detection runs; guarantees the
    /// threshold seed sees full beats, not an isolated P or T wave
    pub min_window_ms: f32,
    /// Minimum spacing between accepted beats in milliseconds
    pub refractory_period_ms: f32,
    /// Half-width in samples of the peak refinement search on the filtered signal
    pub refine_window: usize,
    /// Percentile of the energy signal used to seed the signal threshold
    pub seed_percentile: f32,
    /// Learning rate pulling the signal threshold toward recent beat energy
    pub signal_learning_rate: f32,
    /// Learning rate pulling the noise threshold toward recent noise energy
    pub noise_learning_rate: f32,
    /// Fraction of the recent accepted-peak average the signal threshold tracks
    pub signal_fraction: f32,
    /// Fraction of the recent noise-peak average the noise threshold tracks
    pub noise_fraction: f32,
    /// Number of recent peaks retained for threshold adaptation
    pub peak_history: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            qrs_band_low_hz: 5.0,
            qrs_band_high_hz: 15.0,
            qrs_filter_order: 2,
            integration_window_ms: 150.0,
            min_window_ms: 2000.0,
            refractory_period_ms: 250.0,
            refine_window: 10,
            seed_percentile: 0.95,
            signal_learning_rate: 0.15,
            noise_learning_rate: 0.075,
            signal_fraction: 0.5,
            noise_fraction: 0.5,
            peak_history: 8,
        }
    }
}

/// Amplitude-threshold fallback peak finder configuration
///
/// Used only when the adaptive detector yields no beats.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Fraction of the largest sample magnitudes averaged for the threshold
    pub top_fraction: f32,
    /// Scale applied to the top-magnitude mean
    pub threshold_scale: f32,
    /// Absolute floor for the dynamic threshold
    pub threshold_floor: f32,
    /// Minimum spacing between candidate maxima in milliseconds
    pub min_distance_ms: f32,
    /// Maximum candidates kept (largest amplitudes win)
    pub max_candidates: usize,
    /// Final refractory filter in milliseconds
    pub refractory_period_ms: f32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            top_fraction: 0.05,
            threshold_scale: 0.5,
            threshold_floor: 0.1,
            min_distance_ms: 80.0,
            max_candidates: 20,
            refractory_period_ms: 200.0,
        }
    }
}

/// Wave segmentation configuration
///
/// Search windows are expressed as fractions of the local RR interval so
/// they scale with the instantaneous heart rate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Number of most recent beats to segment
    pub max_beats: usize,
    /// RR interval assumed when a peak has no neighbor, in seconds
    pub default_rr_seconds: f32,
    /// Lower RR clamp as a fraction of one second of samples
    pub rr_clamp_min: f32,
    /// Upper RR clamp as a fraction of one second of samples
    pub rr_clamp_max: f32,
    /// Q search window before R as a fraction of RR
    pub q_window_fraction: f32,
    /// P search window before Q as a fraction of RR
    pub p_window_fraction: f32,
    /// S search window after R as a fraction of RR
    pub s_window_fraction: f32,
    /// T search window after S as a fraction of RR
    pub t_window_fraction: f32,
    /// Gap between adjacent search windows as a fraction of RR
    pub gap_fraction: f32,
    /// Half-width in samples of the QRS validation window around R
    pub validation_window: usize,
    /// R amplitude above which a cluster is accepted without deflection checks
    pub r_amplitude_floor: f32,
    /// Peak signal magnitude below which segmentation is skipped entirely
    pub min_amplitude: f32,
    /// Signal variance below which segmentation is skipped entirely
    pub min_variance: f32,
    /// Direct-detection threshold as a fraction of the maximum amplitude
    pub direct_threshold_fraction: f32,
    /// Direct-detection minimum peak separation in samples
    pub direct_min_separation: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_beats: 5,
            default_rr_seconds: 1.0,
            rr_clamp_min: 0.3,
            rr_clamp_max: 1.5,
            q_window_fraction: 0.10,
            p_window_fraction: 0.25,
            s_window_fraction: 0.10,
            t_window_fraction: 0.40,
            gap_fraction: 0.02,
            validation_window: 20,
            r_amplitude_floor: 0.5,
            min_amplitude: 0.2,
            min_variance: 1e-4,
            direct_threshold_fraction: 0.6,
            direct_min_separation: 60,
        }
    }
}

/// Clinical interval measurement configuration
///
/// Classification bands in milliseconds (millimeters for ST deviation).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Subject sex for QTc banding
    pub sex: Sex,
    /// PR below this is classified short
    pub pr_short_ms: f32,
    /// PR above this is classified prolonged
    pub pr_prolonged_ms: f32,
    /// QRS above this is classified wide
    pub qrs_wide_ms: f32,
    /// QTc above this is classified prolonged (male)
    pub qtc_prolonged_ms: f32,
    /// QTc above this is classified prolonged (female)
    pub qtc_prolonged_female_ms: f32,
    /// QTc below this is classified short
    pub qtc_short_ms: f32,
    /// |ST deviation| above this (mm) is classified elevated/depressed
    pub st_deviation_mm: f32,
    /// ST measurement point offset after the J-point, in milliseconds
    pub st_offset_ms: f32,
    /// Calibration: millimeters of trace per normalized amplitude unit
    pub mm_per_unit: f32,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            sex: Sex::Male,
            pr_short_ms: 120.0,
            pr_prolonged_ms: 200.0,
            qrs_wide_ms: 120.0,
            qtc_prolonged_ms: 450.0,
            qtc_prolonged_female_ms: 470.0,
            qtc_short_ms: 350.0,
            st_deviation_mm: 0.5,
            st_offset_ms: 60.0,
            mm_per_unit: 10.0,
        }
    }
}

/// Heart rate smoothing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Raw BPM values below this are rejected
    pub min_bpm: f32,
    /// Raw BPM values above this are rejected
    pub max_bpm: f32,
    /// Sliding window size for BPM averaging
    pub smoothing_window: usize,
    /// Maximum smoothed BPM change per update
    pub max_step_bpm: f32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            min_bpm: 40.0,
            max_bpm: 200.0,
            smoothing_window: 5,
            max_step_bpm: 2.0,
        }
    }
}

/// HRV statistics configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HrvConfig {
    /// RR intervals below this (ms) are discarded
    pub rr_min_ms: f32,
    /// RR intervals above this (ms) are discarded
    pub rr_max_ms: f32,
    /// Bounded RR history capacity (≈5 minutes at 60 bpm)
    pub history_capacity: usize,
    /// Histogram bin width for the triangular index, in milliseconds
    pub bin_width_ms: f32,
    /// Minimum samples before the triangular index is reported
    pub triangular_min_samples: usize,
    /// Minimum samples before the LF/HF proxy is reported
    pub frequency_min_samples: usize,
    /// Minimum samples before a physiological state is reported
    pub ready_min_samples: usize,
    /// Successive-difference threshold for pNN50, in milliseconds
    pub pnn_threshold_ms: f32,
    /// RMSSD below this (ms) is assessed as low autonomic function
    pub rmssd_low_ms: f32,
    /// RMSSD above this (ms) is assessed as high autonomic function
    pub rmssd_high_ms: f32,
}

impl Default for HrvConfig {
    fn default() -> Self {
        Self {
            rr_min_ms: 300.0,
            rr_max_ms: 2000.0,
            history_capacity: 300,
            bin_width_ms: 7.8125,
            triangular_min_samples: 20,
            frequency_min_samples: 30,
            ready_min_samples: 30,
            pnn_threshold_ms: 50.0,
            rmssd_low_ms: 20.0,
            rmssd_high_ms: 50.0,
        }
    }
}

/// Physiological state classification thresholds
///
/// Each state is a conjunction of banded conditions over the HRV snapshot;
/// the classifier reports its confidence from how far inside (or outside)
/// the bands the measured values sit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// High stress: RMSSD below this (ms)
    pub stress_rmssd_max_ms: f32,
    /// High stress: LF/HF ratio above this
    pub stress_ratio_min: f32,
    /// High stress: BPM above this
    pub stress_bpm_min: f32,
    /// Relaxed: RMSSD above this (ms)
    pub relax_rmssd_min_ms: f32,
    /// Relaxed: LF/HF ratio below this
    pub relax_ratio_max: f32,
    /// Relaxed: BPM below this
    pub relax_bpm_max: f32,
    /// Fatigue: SDNN below this (ms)
    pub fatigue_sdnn_max_ms: f32,
    /// Fatigue: pNN50 below this (percent)
    pub fatigue_pnn50_max: f32,
    /// Fatigue: BPM below this
    pub fatigue_bpm_max: f32,
    /// Focused: BPM lower bound
    pub focus_bpm_min: f32,
    /// Focused: BPM upper bound
    pub focus_bpm_max: f32,
    /// Focused: entropy proxy lower bound
    pub focus_entropy_min: f32,
    /// Focused: entropy proxy upper bound
    pub focus_entropy_max: f32,
    /// Reported confidence lower bound
    pub confidence_floor: f32,
    /// Reported confidence upper bound
    pub confidence_ceiling: f32,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            stress_rmssd_max_ms: 25.0,
            stress_ratio_min: 2.0,
            stress_bpm_min: 85.0,
            relax_rmssd_min_ms: 45.0,
            relax_ratio_max: 1.5,
            relax_bpm_max: 70.0,
            fatigue_sdnn_max_ms: 25.0,
            fatigue_pnn50_max: 10.0,
            fatigue_bpm_max: 60.0,
            focus_bpm_min: 65.0,
            focus_bpm_max: 85.0,
            focus_entropy_min: 1.5,
            focus_entropy_max: 3.5,
            confidence_floor: 0.6,
            confidence_ceiling: 0.95,
        }
    }
}

impl EcgConfig {
    /// Load configuration overrides from a TOML string.
    ///
    /// Absent keys keep their defaults, so a file may override a single
    /// field.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| EcgError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Rejects values that would make a divisor zero or a search window
    /// empty. Called once at pipeline construction; per-sample processing
    /// never re-checks these.
    pub fn validate(&self) -> Result<()> {
        let fs = self.acquisition.sample_rate;
        if !fs.is_finite() || fs <= 0.0 {
            return Err(EcgError::Config(format!("sample rate must be positive, got {fs}")));
        }
        if self.acquisition.buffer_capacity == 0 {
            return Err(EcgError::Config("buffer capacity must be nonzero".into()));
        }
        if self.acquisition.channels != 1 {
            return Err(EcgError::Config(format!(
                "this pipeline processes one channel, got {}",
                self.acquisition.channels
            )));
        }

        let nyquist = fs / 2.0;
        if self.filter.notch_hz <= 0.0 || self.filter.notch_hz >= nyquist {
            return Err(EcgError::Config(format!(
                "notch frequency {} Hz outside (0, {nyquist}) Hz",
                self.filter.notch_hz
            )));
        }
        if self.filter.notch_q <= 0.0 {
            return Err(EcgError::Config("notch Q must be positive".into()));
        }
        if self.filter.bandpass_low_hz <= 0.0
            || self.filter.bandpass_low_hz >= self.filter.bandpass_high_hz
            || self.filter.bandpass_high_hz >= nyquist
        {
            return Err(EcgError::Config(format!(
                "band-pass {}-{} Hz invalid for {} Hz sampling",
                self.filter.bandpass_low_hz, self.filter.bandpass_high_hz, fs
            )));
        }
        if self.detector.qrs_band_low_hz <= 0.0
            || self.detector.qrs_band_low_hz >= self.detector.qrs_band_high_hz
            || self.detector.qrs_band_high_hz >= nyquist
        {
            return Err(EcgError::Config(format!(
                "QRS band {}-{} Hz invalid for {} Hz sampling",
                self.detector.qrs_band_low_hz, self.detector.qrs_band_high_hz, fs
            )));
        }
        if (self.detector.integration_window_ms / 1000.0 * fs) < 1.0 {
            return Err(EcgError::Config("integration window under one sample".into()));
        }
        if self.detector.peak_history == 0 {
            return Err(EcgError::Config("peak history must be nonzero".into()));
        }
        if !(0.0..1.0).contains(&self.detector.seed_percentile) {
            return Err(EcgError::Config("seed percentile must be in [0, 1)".into()));
        }

        if self.segmenter.max_beats == 0 {
            return Err(EcgError::Config("max beats must be nonzero".into()));
        }
        if self.segmenter.rr_clamp_min <= 0.0
            || self.segmenter.rr_clamp_min >= self.segmenter.rr_clamp_max
        {
            return Err(EcgError::Config("RR clamp bounds inverted".into()));
        }

        if self.rate.min_bpm <= 0.0 || self.rate.min_bpm >= self.rate.max_bpm {
            return Err(EcgError::Config(format!(
                "BPM bounds {}-{} invalid",
                self.rate.min_bpm, self.rate.max_bpm
            )));
        }
        if self.rate.smoothing_window == 0 {
            return Err(EcgError::Config("smoothing window must be nonzero".into()));
        }

        if self.hrv.rr_min_ms <= 0.0 || self.hrv.rr_min_ms >= self.hrv.rr_max_ms {
            return Err(EcgError::Config(format!(
                "RR admission bounds {}-{} ms invalid",
                self.hrv.rr_min_ms, self.hrv.rr_max_ms
            )));
        }
        if self.hrv.history_capacity == 0 {
            return Err(EcgError::Config("RR history capacity must be nonzero".into()));
        }
        if self.hrv.bin_width_ms <= 0.0 {
            return Err(EcgError::Config("histogram bin width must be positive".into()));
        }

        if self.state.confidence_floor >= self.state.confidence_ceiling {
            return Err(EcgError::Config("confidence bounds inverted".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(EcgConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let mut config = EcgConfig::default();
        config.acquisition.sample_rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_bpm_bounds_rejected() {
        let mut config = EcgConfig::default();
        config.rate.min_bpm = 250.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_notch_above_nyquist_rejected() {
        let mut config = EcgConfig::default();
        config.acquisition.sample_rate = 80.0;
        config.filter.notch_hz = 50.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_override() {
        let config = EcgConfig::from_toml_str(
            r#"
            [detector]
            refractory_period_ms = 300.0

            [intervals]
            sex = "female"
            "#,
        )
        .unwrap();

        assert!((config.detector.refractory_period_ms - 300.0).abs() < f32::EPSILON);
        assert_eq!(config.intervals.sex, Sex::Female);
        // Untouched sections keep their defaults
        assert_eq!(config.rate.smoothing_window, 5);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(EcgConfig::from_toml_str("[detector]\nrefractory_period_ms = \"fast\"").is_err());
    }
}
