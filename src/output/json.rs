use super::{Formatter, MonitorReport, iso8601_timestamp};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, report: &MonitorReport) -> String {
        let mut value = serde_json::to_value(report).expect("report serializes");
        value["ts"] = serde_json::Value::String(iso8601_timestamp());
        value.to_string()
    }
}
