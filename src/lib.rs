//! health-days - Day-bucketed aggregation of sleep and step samples
//!
//! Samples from a device health store (sleep analysis intervals, step counts)
//! are grouped by the calendar day of their start and reduced to per-category
//! totals: source → aggregator → metric map → list rows / chart series / report.
//!
//! ## Modules
//!
//! - **Core**: [`aggregator`], [`calendar`], [`types`]
//! - **Consumers**: [`metrics`] (sleep and step rows), [`series`] (charts), [`encoder`] (reports)
//! - **Orchestration**: [`source`], [`state`], [`pipeline`]

pub mod aggregator;
pub mod calendar;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod series;
pub mod source;
pub mod state;
pub mod types;

pub use aggregator::IntervalAggregator;
pub use calendar::{DayCalendar, FixedOffsetCalendar, ZonedCalendar};
pub use error::{HealthError, ValidationError};
pub use metrics::{MetricMap, SleepDay, StepDay};
pub use pipeline::{samples_to_daily_report, HealthPipeline};
pub use source::{FileSource, InMemorySource, SampleQuery, SampleSource};
pub use types::{Aggregation, Category, DaySummary, Sample};

// Schema exports
pub use schema::{RecordAdapter, RecordFormat, SampleRecord, SCHEMA_VERSION};

/// Crate version embedded in all reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "health-days";
