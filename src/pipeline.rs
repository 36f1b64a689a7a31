//! Pipeline orchestration
//!
//! This module provides the public API for health-days. It wires a sample
//! source, a day calendar and a metric map together:
//! fetch → aggregate → publish → derive list rows / chart series / reports.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::aggregator::IntervalAggregator;
use crate::calendar::{DayCalendar, ZonedCalendar};
use crate::encoder::ReportEncoder;
use crate::error::HealthError;
use crate::metrics::{MetricMap, SleepDay, StepDay};
use crate::schema::{RecordAdapter, RecordFormat};
use crate::series::Series;
use crate::source::{SampleQuery, SampleSource};
use crate::state::{Snapshot, SummaryCell};
use crate::types::DailyReport;

/// Convert exported sample records straight into a daily report JSON.
///
/// # Arguments
/// * `raw` - health.sample.v1 records (NDJSON or JSON array)
/// * `format` - container format of `raw`
/// * `timezone` - IANA zone used for day boundaries (e.g., "America/New_York")
///
/// # Example
/// ```ignore
/// let report = samples_to_daily_report(export, RecordFormat::Ndjson, "Europe/Berlin".to_string())?;
/// ```
pub fn samples_to_daily_report(
    raw: String,
    format: RecordFormat,
    timezone: String,
) -> Result<String, HealthError> {
    let calendar = ZonedCalendar::from_name(&timezone)?;
    let records = RecordAdapter::parse(&raw, format)?;
    let samples = RecordAdapter::to_samples(&records);

    let aggregation = IntervalAggregator::aggregate(&samples, &calendar);

    ReportEncoder::new().encode_to_json(
        &aggregation,
        &MetricMap::standard(),
        "records",
        &calendar.name(),
    )
}

/// Stateful pipeline feeding a presentation layer.
///
/// Each [`refresh`](HealthPipeline::refresh) fetches, aggregates and publishes
/// into the pipeline's [`SummaryCell`]. Overlapping refreshes are not
/// cancelled; whichever completes last is what subscribers see.
pub struct HealthPipeline {
    source: Arc<dyn SampleSource>,
    calendar: Arc<dyn DayCalendar>,
    metrics: MetricMap,
    cell: SummaryCell,
    encoder: ReportEncoder,
}

impl HealthPipeline {
    /// Create a pipeline with the standard metric map
    pub fn new(source: Arc<dyn SampleSource>, calendar: Arc<dyn DayCalendar>) -> Self {
        Self {
            source,
            calendar,
            metrics: MetricMap::standard(),
            cell: SummaryCell::new(),
            encoder: ReportEncoder::new(),
        }
    }

    /// Use consumer-specific metric bindings
    pub fn with_metrics(mut self, metrics: MetricMap) -> Self {
        let unbound = metrics.unbound_list_metrics();
        if !unbound.is_empty() {
            warn!(metrics = ?unbound, "metric map leaves list metrics unbound");
        }
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &MetricMap {
        &self.metrics
    }

    /// Fetch, aggregate and publish.
    ///
    /// On fetch failure the previously published snapshot stays in place.
    pub async fn refresh(&self, query: &SampleQuery) -> Result<Snapshot, HealthError> {
        let samples = self.source.fetch(query).await.map_err(|e| {
            warn!(source = self.source.name(), error = %e, "sample fetch failed");
            e
        })?;

        let aggregation = IntervalAggregator::aggregate(&samples, self.calendar.as_ref());
        let snapshot = self.cell.publish(aggregation);

        debug!(
            source = self.source.name(),
            generation = snapshot.generation,
            days = snapshot.aggregation.summaries.len(),
            "published aggregation"
        );

        Ok(snapshot)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.cell.current()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.cell.subscribe()
    }

    /// Sleep list rows from the latest snapshot, most recent first
    pub fn sleep_days(&self) -> Vec<SleepDay> {
        SleepDay::collect(&self.snapshot().aggregation.summaries, &self.metrics)
    }

    /// Step list rows from the latest snapshot, most recent first
    pub fn step_days(&self) -> Vec<StepDay> {
        StepDay::collect(&self.snapshot().aggregation.summaries, &self.metrics)
    }

    /// Chart series for `metric` from the latest snapshot
    pub fn chart(&self, metric: &str) -> Result<Series, HealthError> {
        Series::for_metric(&self.snapshot().aggregation.summaries, &self.metrics, metric)
    }

    /// Daily report for the latest snapshot
    pub fn report(&self) -> DailyReport {
        self.encoder.encode(
            &self.snapshot().aggregation,
            &self.metrics,
            self.source.name(),
            &self.calendar.name(),
        )
    }
}
