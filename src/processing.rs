use serde::Serialize;

use crate::analysis::{
    BeatLandmarks, BpmEstimate, FEATURE_COUNT, HrvEngine, HrvSnapshot, IntervalCalculator,
    IntervalSet, RateCalculator, WaveSegmenter, feature_vector,
};
use crate::config::EcgConfig;
use crate::error::Result;
use crate::ingest::SampleRingBuffer;
use crate::signal_processing::{AmplitudePeakFinder, Peak, QrsDetector, StageFilters};

/// Which detector produced the current peak list.
///
/// Exposed so detector degradation (the adaptive pipeline yielding nothing
/// and the amplitude fallback taking over) is observable downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorSource {
    Adaptive,
    AmplitudeFallback,
    None,
}

/// Read-only view of the pipeline's current state, for the reporting
/// collaborator. Pull-based: ask for it, nothing is pushed.
#[derive(Debug, Clone, Serialize)]
pub struct EcgSnapshot {
    /// Filtered waveform copy, oldest to newest
    pub waveform: Vec<f32>,
    pub peaks: Vec<Peak>,
    pub beats: Vec<BeatLandmarks>,
    pub intervals: IntervalSet,
    pub bpm: BpmEstimate,
    pub hrv: HrvSnapshot,
    pub detector_source: DetectorSource,
    /// Non-finite samples dropped at the ingestion boundary so far
    pub dropped_samples: u64,
}

/// The streaming ECG pipeline driver.
///
/// Owns every stage (conditioning filters, rolling window, detectors,
/// segmenter and calculators) as explicit injectable components with a
/// shared `reset()`. Exactly one writer calls `process_batch`; readers take
/// `snapshot()` copies, so ingestion and reporting can be serialized by a
/// single event loop without locking.
pub struct EcgProcessor {
    config: EcgConfig,
    filters: StageFilters,
    buffer: SampleRingBuffer,
    detector: QrsDetector,
    fallback: AmplitudePeakFinder,
    segmenter: WaveSegmenter,
    intervals: IntervalCalculator,
    rate: RateCalculator,
    hrv: HrvEngine,
    peaks: Vec<Peak>,
    beats: Vec<BeatLandmarks>,
    detector_source: DetectorSource,
    total_ingested: u64,
    dropped_samples: u64,
    /// Absolute position of the newest peak already admitted to the HRV
    /// history; prevents double-counting beats re-detected in overlapping
    /// windows.
    last_admitted_peak: Option<u64>,
}

impl EcgProcessor {
    pub fn new(config: EcgConfig) -> Result<Self> {
        config.validate()?;
        let sample_rate = config.acquisition.sample_rate;

        Ok(Self {
            filters: StageFilters::new(&config.filter, sample_rate)?,
            buffer: SampleRingBuffer::new(config.acquisition.buffer_capacity),
            detector: QrsDetector::new(&config.detector, sample_rate)?,
            fallback: AmplitudePeakFinder::new(&config.fallback, sample_rate),
            segmenter: WaveSegmenter::new(&config.segmenter, sample_rate),
            intervals: IntervalCalculator::new(&config.intervals, sample_rate),
            rate: RateCalculator::new(&config.rate, sample_rate),
            hrv: HrvEngine::new(&config.hrv, &config.state),
            peaks: Vec::new(),
            beats: Vec::new(),
            detector_source: DetectorSource::None,
            total_ingested: 0,
            dropped_samples: 0,
            last_admitted_peak: None,
            config,
        })
    }

    /// Ingest a batch of raw samples and run one analysis pass.
    ///
    /// Non-finite samples are dropped before the filters. An empty batch is
    /// valid and simply re-runs the analysis pass over the current window;
    /// with no new samples the derived outputs are unchanged.
    pub fn process_batch(&mut self, samples: &[f32]) {
        let mut filtered = Vec::with_capacity(samples.len());
        let mut dropped = 0u64;
        for &sample in samples {
            if !sample.is_finite() {
                dropped += 1;
                continue;
            }
            filtered.push(self.filters.process(sample));
        }
        if dropped > 0 {
            self.dropped_samples += dropped;
            log::warn!("dropped {dropped} non-finite samples at ingestion");
        }
        self.total_ingested += filtered.len() as u64;
        self.buffer.push(&filtered);

        self.run_analysis_pass();
    }

    fn run_analysis_pass(&mut self) {
        let window = self.buffer.snapshot();

        self.peaks = self.detector.detect(&window);
        self.detector_source = if self.peaks.is_empty() {
            self.peaks = self.fallback.find_peaks(&window);
            if self.peaks.is_empty() {
                DetectorSource::None
            } else {
                log::debug!("adaptive detector empty, fallback found {} peaks", self.peaks.len());
                DetectorSource::AmplitudeFallback
            }
        } else {
            DetectorSource::Adaptive
        };

        self.beats = self.segmenter.segment(&window, &self.peaks);
        if let Some(beat) = self.beats.last() {
            self.intervals.update(&window, beat);
        }

        self.rate.update(&self.peaks);
        self.admit_rr_intervals(window.len());
    }

    /// Feed newly-seen RR intervals to the HRV engine.
    ///
    /// Peaks are keyed by absolute ingest position; only intervals ending
    /// strictly after the last admitted peak (beyond detection jitter) are
    /// recorded, so overlapping windows never double-count a beat.
    fn admit_rr_intervals(&mut self, window_len: usize) {
        let sample_rate = self.config.acquisition.sample_rate;
        let jitter_guard = (self.config.detector.refractory_period_ms / 1000.0 * sample_rate) as u64;
        let window_base = self.total_ingested - window_len as u64;

        for pair in self.peaks.windows(2) {
            let absolute_end = window_base + pair[1].index as u64;
            let fresh = self
                .last_admitted_peak
                .is_none_or(|last| absolute_end >= last + jitter_guard);
            if !fresh {
                continue;
            }
            let rr_ms = (pair[1].index - pair[0].index) as f32 / sample_rate * 1000.0;
            self.hrv.record(rr_ms);
            self.last_admitted_peak = Some(absolute_end);
        }
    }

    /// Current state for the reporting collaborator.
    pub fn snapshot(&self) -> EcgSnapshot {
        EcgSnapshot {
            waveform: self.buffer.snapshot(),
            peaks: self.peaks.clone(),
            beats: self.beats.clone(),
            intervals: self.intervals.current(),
            bpm: self.rate.current(),
            hrv: self.hrv.snapshot(),
            detector_source: self.detector_source,
            dropped_samples: self.dropped_samples,
        }
    }

    /// The classification collaborator's feature vector.
    pub fn feature_vector(&self) -> [f32; FEATURE_COUNT] {
        feature_vector(
            &self.intervals.current(),
            &self.rate.current(),
            &self.hrv.snapshot(),
        )
    }

    /// Restore every component to its freshly-constructed state, e.g. on
    /// device reconnect.
    pub fn reset(&mut self) {
        self.filters.reset();
        self.buffer.clear();
        self.detector.reset();
        self.intervals.reset();
        self.rate.reset();
        self.hrv.reset();
        self.peaks.clear();
        self.beats.clear();
        self.detector_source = DetectorSource::None;
        self.total_ingested = 0;
        self.dropped_samples = 0;
        self.last_admitted_peak = None;
    }

    pub fn config(&self) -> &EcgConfig {
        &self.config
    }
}
