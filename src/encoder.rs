//! Daily report encoding
//!
//! This module encodes an aggregation into a health.daily.v1 report: per-day
//! category totals, metric values under the consumer's [`MetricMap`], and
//! producer/provenance metadata.

use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::HealthError;
use crate::metrics::{minutes, MetricMap, SleepDay};
use crate::types::{
    Aggregation, DailyReport, DaySummary, ReportDay, ReportProducer, ReportProvenance,
};
use crate::{PRODUCER_NAME, VERSION};

/// Current report schema version
pub const REPORT_VERSION: &str = "health.daily.v1";

/// Encoder for daily reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode an aggregation into a report
    pub fn encode(
        &self,
        aggregation: &Aggregation,
        map: &MetricMap,
        source: &str,
        calendar: &str,
    ) -> DailyReport {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = ReportProvenance {
            source: source.to_string(),
            calendar: calendar.to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
        };

        let days = aggregation
            .summaries
            .iter()
            .map(|summary| Self::encode_day(summary, map))
            .collect();

        DailyReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            anomalies: aggregation.anomalies,
            days,
        }
    }

    /// Encode to pretty-printed JSON
    pub fn encode_to_json(
        &self,
        aggregation: &Aggregation,
        map: &MetricMap,
        source: &str,
        calendar: &str,
    ) -> Result<String, HealthError> {
        let report = self.encode(aggregation, map, source, calendar);
        serde_json::to_string_pretty(&report).map_err(|e| HealthError::EncodingError(e.to_string()))
    }

    /// Encode a single day
    pub fn encode_day(summary: &DaySummary, map: &MetricMap) -> ReportDay {
        let totals_minutes = summary
            .totals()
            .iter()
            .map(|(category, duration)| (*category, minutes(*duration)))
            .collect();

        let metrics: BTreeMap<String, f64> = map
            .metrics()
            .into_iter()
            .filter_map(|metric| {
                map.value_of(summary, metric)
                    .map(|value| (metric.to_string(), value))
            })
            .collect();

        let sleep_efficiency_pct =
            SleepDay::from_summary(summary, map).and_then(|row| row.efficiency_pct);

        ReportDay {
            date: summary.day().format("%Y-%m-%d").to_string(),
            sample_count: summary.sample_count(),
            totals_minutes,
            quantities: summary.quantities().clone(),
            metrics,
            sleep_efficiency_pct,
        }
    }
}
