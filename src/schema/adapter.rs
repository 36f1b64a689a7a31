//! Parsing and validation of health.sample.v1 input

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{HealthError, ValidationError};
use crate::schema::record::SampleRecord;
use crate::types::Sample;

/// Container format of a sample file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

impl RecordFormat {
    /// Guess from the file extension; `.json` is an array, anything else NDJSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => RecordFormat::Json,
            _ => RecordFormat::Ndjson,
        }
    }
}

/// Adapter for converting sample records into samples
pub struct RecordAdapter;

impl RecordAdapter {
    /// Parse input in the given format
    pub fn parse(input: &str, format: RecordFormat) -> Result<Vec<SampleRecord>, HealthError> {
        match format {
            RecordFormat::Ndjson => Self::parse_ndjson(input),
            RecordFormat::Json => Self::parse_array(input),
        }
    }

    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<SampleRecord>, HealthError> {
        let records: Vec<SampleRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SampleRecord>, HealthError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SampleRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(HealthError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Convert records to samples (no filtering; see [`SampleRecord::to_sample`])
    pub fn to_samples(records: &[SampleRecord]) -> Vec<Sample> {
        records.iter().map(SampleRecord::to_sample).collect()
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[SampleRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                record.validate().err().map(|error| ValidationResult {
                    index: idx,
                    record_id: record.id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub record_id: Option<String>,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    const NDJSON: &str = r#"
{"id":"a","category":"in_bed","start":"2023-05-01T22:30:00Z","end":"2023-05-02T06:30:00Z"}

{"id":"b","category":"asleep","start":"2023-05-01T23:00:00Z","end":"2023-05-02T01:00:00Z"}
{"id":"c","category":"step_count","start":"2023-05-02T09:00:00Z","end":"2023-05-02T10:00:00Z","value":1500}
"#;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let records = RecordAdapter::parse_ndjson(NDJSON).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[2].category, Category::StepCount);
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let input = "{\"category\":\"awake\",\"start\":\"2023-05-01T00:00:00Z\",\"end\":\"2023-05-01T00:10:00Z\"}\nnot json\n";
        let result = RecordAdapter::parse_ndjson(input);

        match result {
            Err(HealthError::ParseError(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_array() {
        let json = r#"[
            {"category":"awake","start":"2023-05-01T03:00:00Z","end":"2023-05-01T03:10:00Z"},
            {"category":"asleep_rem","start":"2023-05-01T03:10:00Z","end":"2023-05-01T03:40:00Z"}
        ]"#;

        let records = RecordAdapter::parse(json, RecordFormat::Json).unwrap();
        let samples = RecordAdapter::to_samples(&records);

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].category, Category::AsleepRem);
    }

    #[test]
    fn test_unknown_category_is_parse_error() {
        let json = r#"[{"category":"heart_rate","start":"2023-05-01T03:00:00Z","end":"2023-05-01T03:10:00Z"}]"#;
        assert!(RecordAdapter::parse_array(json).is_err());
    }

    #[test]
    fn test_validate_records() {
        let input = r#"
{"id":"ok","category":"in_bed","start":"2023-05-01T22:30:00Z","end":"2023-05-02T06:30:00Z"}
{"id":"bad","category":"asleep","start":"2023-05-02T01:00:00Z","end":"2023-05-01T23:00:00Z"}
"#;
        let records = RecordAdapter::parse_ndjson(input).unwrap();
        let failures = RecordAdapter::validate_records(&records);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].record_id.as_deref(), Some("bad"));
        assert!(matches!(failures[0].error, ValidationError::InvertedInterval { .. }));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(RecordFormat::from_path(Path::new("night.json")), RecordFormat::Json);
        assert_eq!(RecordFormat::from_path(Path::new("night.ndjson")), RecordFormat::Ndjson);
        assert_eq!(RecordFormat::from_path(Path::new("night")), RecordFormat::Ndjson);
    }
}
