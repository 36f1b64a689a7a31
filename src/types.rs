//! Core types for health-days
//!
//! Samples flow in from a [`SampleSource`](crate::source::SampleSource), are
//! bucketed per calendar day by the aggregator, and come out as read-only
//! [`DaySummary`] values.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::HealthError;

/// Health sample category (sleep analysis stages and step counts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    InBed,
    Asleep,
    AsleepCore,
    AsleepDeep,
    AsleepRem,
    Awake,
    StepCount,
}

impl Category {
    /// Every known category, in declaration order
    pub const ALL: [Category; 7] = [
        Category::InBed,
        Category::Asleep,
        Category::AsleepCore,
        Category::AsleepDeep,
        Category::AsleepRem,
        Category::Awake,
        Category::StepCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::InBed => "in_bed",
            Category::Asleep => "asleep",
            Category::AsleepCore => "asleep_core",
            Category::AsleepDeep => "asleep_deep",
            Category::AsleepRem => "asleep_rem",
            Category::Awake => "awake",
            Category::StepCount => "step_count",
        }
    }

    /// Sleep analysis categories are pure intervals
    pub fn is_sleep(&self) -> bool {
        !self.is_quantity()
    }

    /// Quantity categories carry a numeric value alongside their interval
    pub fn is_quantity(&self) -> bool {
        matches!(self, Category::StepCount)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| HealthError::UnknownCategory(s.to_string()))
    }
}

/// A single recorded interval of a health category.
///
/// Produced by a sample source and never mutated afterwards. `end >= start` is
/// expected but not enforced here: the aggregator clamps and counts violations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub category: Category,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Numeric payload for quantity categories (step count)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
}

impl Sample {
    pub fn new(category: Category, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            category,
            start,
            end,
            quantity: None,
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// True when the interval ends before it starts
    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    /// Interval length, clamped to zero for inverted intervals
    pub fn duration(&self) -> Duration {
        if self.is_inverted() {
            Duration::zero()
        } else {
            self.end - self.start
        }
    }
}

/// Per-day reduction of all samples whose start falls on `day`.
///
/// A category is present in [`totals`](DaySummary::totals) iff at least one
/// sample of that category landed in the day, even when the summed duration
/// is zero. Quantities follow the same rule but only count valid values.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    day: NaiveDate,
    totals: BTreeMap<Category, Duration>,
    quantities: BTreeMap<Category, f64>,
    sample_count: usize,
}

impl DaySummary {
    pub(crate) fn new(
        day: NaiveDate,
        totals: BTreeMap<Category, Duration>,
        quantities: BTreeMap<Category, f64>,
        sample_count: usize,
    ) -> Self {
        Self {
            day,
            totals,
            quantities,
            sample_count,
        }
    }

    /// Calendar day this summary covers
    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// Accumulated duration per category
    pub fn totals(&self) -> &BTreeMap<Category, Duration> {
        &self.totals
    }

    /// Accumulated quantity per category
    pub fn quantities(&self) -> &BTreeMap<Category, f64> {
        &self.quantities
    }

    pub fn total(&self, category: Category) -> Option<Duration> {
        self.totals.get(&category).copied()
    }

    pub fn quantity(&self, category: Category) -> Option<f64> {
        self.quantities.get(&category).copied()
    }

    /// Number of samples bucketed into this day
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }
}

/// Counts of records the aggregator had to repair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomalies {
    /// Samples with `end < start`, counted with zero duration
    pub inverted_intervals: usize,
    /// Negative or non-finite quantities, left out of quantity totals
    pub invalid_quantities: usize,
}

impl Anomalies {
    pub fn total(&self) -> usize {
        self.inverted_intervals + self.invalid_quantities
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

/// Output of one aggregation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// One summary per distinct start day, most recent first
    pub summaries: Vec<DaySummary>,
    pub anomalies: Anomalies,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// Summary for a specific day, if any sample started on it
    pub fn day(&self, day: NaiveDate) -> Option<&DaySummary> {
        self.summaries.iter().find(|s| s.day == day)
    }
}

/// Report producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Where the report's numbers came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    /// Sample source name
    pub source: String,
    /// Day-boundary policy used for bucketing
    pub calendar: String,
    pub computed_at_utc: String,
}

/// One day of a daily report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDay {
    /// YYYY-MM-DD
    pub date: String,
    pub sample_count: usize,
    /// Accumulated duration per category (minutes)
    pub totals_minutes: BTreeMap<Category, f64>,
    /// Accumulated quantity per category
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub quantities: BTreeMap<Category, f64>,
    /// Metric values keyed by metric name: minutes or raw sums
    pub metrics: BTreeMap<String, f64>,
    /// Asleep / in bed, as a percentage; absent when undefined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_efficiency_pct: Option<f64>,
}

/// Complete health.daily.v1 report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub anomalies: Anomalies,
    /// Most recent day first
    pub days: Vec<ReportDay>,
}
