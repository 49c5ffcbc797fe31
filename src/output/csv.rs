use super::{Formatter, MonitorReport, iso8601_timestamp};

pub struct CsvFormatter;

fn field(value: Option<f32>) -> String {
    value.map_or(String::new(), |v| format!("{:.1}", v))
}

impl Formatter for CsvFormatter {
    fn format(&self, report: &MonitorReport) -> String {
        format!(
            "{},{},{},{},{},{},{},{:.1},{:.1},{:.0},{:.2},{:?},{:.2},{},{:?}",
            iso8601_timestamp(),
            field(report.bpm),
            field(report.raw_bpm),
            field(report.intervals.pr.value),
            field(report.intervals.qrs.value),
            field(report.intervals.qtc.value),
            field(report.intervals.st_deviation.value),
            report.rmssd,
            report.sdnn,
            report.pnn50,
            report.lf_hf_ratio,
            report.state,
            report.confidence,
            report.rr_count,
            report.detector,
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,bpm,raw_bpm,pr_ms,qrs_ms,qtc_ms,st_mm,rmssd,sdnn,pnn50,lf_hf,state,confidence,rr_count,detector")
    }
}
