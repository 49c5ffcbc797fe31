mod csv;
mod json;
mod text;

use chrono::Utc;
use serde::Serialize;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

use crate::analysis::{HrvAssessment, IntervalSet, PhysiologicalState};
use crate::processing::{DetectorSource, EcgSnapshot};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Compact per-tick report assembled from a pipeline snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub bpm: Option<f32>,
    pub raw_bpm: Option<f32>,
    pub intervals: IntervalSet,
    pub rmssd: f32,
    pub sdnn: f32,
    pub pnn50: f32,
    pub lf_hf_ratio: f32,
    pub assessment: HrvAssessment,
    pub state: PhysiologicalState,
    pub confidence: f32,
    pub rr_count: usize,
    pub beat_count: usize,
    pub detector: DetectorSource,
}

impl From<&EcgSnapshot> for MonitorReport {
    fn from(snapshot: &EcgSnapshot) -> Self {
        Self {
            bpm: snapshot.bpm.smoothed,
            raw_bpm: snapshot.bpm.raw,
            intervals: snapshot.intervals,
            rmssd: snapshot.hrv.rmssd,
            sdnn: snapshot.hrv.sdnn,
            pnn50: snapshot.hrv.pnn50,
            lf_hf_ratio: snapshot.hrv.lf_hf_ratio,
            assessment: snapshot.hrv.assessment,
            state: snapshot.hrv.state.state,
            confidence: snapshot.hrv.state.confidence,
            rr_count: snapshot.hrv.sample_count,
            beat_count: snapshot.peaks.len(),
            detector: snapshot.detector_source,
        }
    }
}

pub trait Formatter: Send {
    fn format(&self, report: &MonitorReport) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
