use super::{Formatter, MonitorReport};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

fn fmt_bpm(bpm: Option<f32>) -> String {
    bpm.map_or("  -  ".to_string(), |b| format!("{:>5.1}", b))
}

fn fmt_ms(value: Option<f32>) -> String {
    value.map_or("-".to_string(), |v| format!("{:.0}", v))
}

impl Formatter for TextFormatter {
    fn format(&self, report: &MonitorReport) -> String {
        if self.verbose {
            format!(
                "HR: {} bpm (raw: {}) | PR {} QRS {} QTc {} ms ST {} | RMSSD {:.1} SDNN {:.1} pNN50 {:.0}% LF/HF {:.2} | {:?} ({:.2}) [{} RR, {:?}]",
                fmt_bpm(report.bpm),
                fmt_bpm(report.raw_bpm),
                fmt_ms(report.intervals.pr.value),
                fmt_ms(report.intervals.qrs.value),
                fmt_ms(report.intervals.qtc.value),
                report
                    .intervals
                    .st_deviation
                    .value
                    .map_or("-".to_string(), |v| format!("{:+.1}mm", v)),
                report.rmssd,
                report.sdnn,
                report.pnn50,
                report.lf_hf_ratio,
                report.state,
                report.confidence,
                report.rr_count,
                report.detector,
            )
        } else {
            format!(
                "HR: {} bpm | RMSSD {:.1} ms | {:?} ({:.2})",
                fmt_bpm(report.bpm),
                report.rmssd,
                report.state,
                report.confidence,
            )
        }
    }
}
