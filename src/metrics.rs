//! Metric mapping and derived per-day metrics
//!
//! A [`MetricMap`] binds categories to metric names so consumers decide which
//! categories feed "time asleep", "time in bed" or "steps" instead of the
//! aggregator hardcoding it. The sleep and step list rows are derived from
//! summaries through such a map.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::HealthError;
use crate::types::{Category, DaySummary};

/// Metric name for total time asleep
pub const TIME_ASLEEP: &str = "time_asleep";
/// Metric name for total time in bed
pub const TIME_IN_BED: &str = "time_in_bed";
/// Metric name for total time awake during the night
pub const TIME_AWAKE: &str = "time_awake";
/// Metric name for step totals
pub const STEPS: &str = "steps";

/// Category → metric name bindings, configurable per consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricMap {
    bindings: BTreeMap<Category, String>,
}

impl Default for MetricMap {
    fn default() -> Self {
        Self::standard()
    }
}

impl MetricMap {
    /// A map with no bindings
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Standard bindings: every asleep stage feeds `time_asleep`
    pub fn standard() -> Self {
        Self::empty()
            .bind(Category::InBed, TIME_IN_BED)
            .bind(Category::Asleep, TIME_ASLEEP)
            .bind(Category::AsleepCore, TIME_ASLEEP)
            .bind(Category::AsleepDeep, TIME_ASLEEP)
            .bind(Category::AsleepRem, TIME_ASLEEP)
            .bind(Category::Awake, TIME_AWAKE)
            .bind(Category::StepCount, STEPS)
    }

    /// Bind `category` to `metric`, replacing any earlier binding
    pub fn bind(mut self, category: Category, metric: impl Into<String>) -> Self {
        self.bindings.insert(category, metric.into());
        self
    }

    /// Load bindings from a JSON document
    pub fn from_json(json: &str) -> Result<Self, HealthError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, HealthError> {
        serde_json::to_string_pretty(self).map_err(|e| HealthError::EncodingError(e.to_string()))
    }

    /// Load bindings from a JSON file
    pub fn load(path: &Path) -> Result<Self, HealthError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn metric_for(&self, category: Category) -> Option<&str> {
        self.bindings.get(&category).map(String::as_str)
    }

    /// Categories that feed `metric`
    pub fn categories_for<'a>(&'a self, metric: &'a str) -> impl Iterator<Item = Category> + 'a {
        self.bindings
            .iter()
            .filter(move |(_, m)| m.as_str() == metric)
            .map(|(c, _)| *c)
    }

    /// Distinct metric names, sorted
    pub fn metrics(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.values().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn contains_metric(&self, metric: &str) -> bool {
        self.bindings.values().any(|m| m == metric)
    }

    /// A metric is a quantity metric when every category feeding it carries
    /// quantities; otherwise it is measured as a duration.
    pub fn is_quantity_metric(&self, metric: &str) -> bool {
        let mut categories = self.categories_for(metric).peekable();
        categories.peek().is_some() && categories.all(|c| c.is_quantity())
    }

    /// Summed duration of all categories bound to `metric`.
    ///
    /// `None` when no bound category is present on that day.
    pub fn duration_of(&self, summary: &DaySummary, metric: &str) -> Option<Duration> {
        self.categories_for(metric)
            .filter_map(|c| summary.total(c))
            .reduce(saturating_add)
    }

    /// Summed quantity of all categories bound to `metric`
    pub fn quantity_of(&self, summary: &DaySummary, metric: &str) -> Option<f64> {
        self.categories_for(metric)
            .filter_map(|c| summary.quantity(c))
            .reduce(|a, b| a + b)
    }

    /// Metric names the sleep and step lists read that nothing is bound to
    pub fn unbound_list_metrics(&self) -> Vec<&'static str> {
        [TIME_IN_BED, TIME_ASLEEP, STEPS]
            .into_iter()
            .filter(|metric| !self.contains_metric(metric))
            .collect()
    }

    /// Numeric value of `metric` for charting and reports: minutes for
    /// duration metrics, the raw sum for quantity metrics.
    pub fn value_of(&self, summary: &DaySummary, metric: &str) -> Option<f64> {
        if self.is_quantity_metric(metric) {
            self.quantity_of(summary, metric)
        } else {
            self.duration_of(summary, metric).map(minutes)
        }
    }
}

/// Sum of two durations, saturating at the largest representable duration
pub fn saturating_add(a: Duration, b: Duration) -> Duration {
    a.checked_add(&b).unwrap_or_else(Duration::max_value)
}

/// Duration in fractional minutes
pub fn minutes(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 60_000.0
}

/// Duration in fractional hours
pub fn hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 3_600_000.0
}

/// Sleep efficiency as a percentage of time in bed.
///
/// Undefined (`None`) when nothing was recorded in bed.
pub fn sleep_efficiency_pct(time_asleep: Duration, time_in_bed: Duration) -> Option<f64> {
    if time_in_bed <= Duration::zero() {
        return None;
    }
    Some(time_asleep.num_milliseconds() as f64 / time_in_bed.num_milliseconds() as f64 * 100.0)
}

/// One row of the sleep list
#[derive(Debug, Clone, PartialEq)]
pub struct SleepDay {
    pub day: NaiveDate,
    pub time_in_bed: Duration,
    pub time_asleep: Duration,
    pub efficiency_pct: Option<f64>,
}

impl SleepDay {
    /// Derive the sleep row for a day; `None` when the day has no sleep data
    pub fn from_summary(summary: &DaySummary, map: &MetricMap) -> Option<Self> {
        let in_bed = map.duration_of(summary, TIME_IN_BED);
        let asleep = map.duration_of(summary, TIME_ASLEEP);

        if in_bed.is_none() && asleep.is_none() {
            return None;
        }

        let time_in_bed = in_bed.unwrap_or_else(Duration::zero);
        let time_asleep = asleep.unwrap_or_else(Duration::zero);

        Some(Self {
            day: summary.day(),
            time_in_bed,
            time_asleep,
            efficiency_pct: sleep_efficiency_pct(time_asleep, time_in_bed),
        })
    }

    /// Sleep rows for every day with sleep data, preserving summary order
    pub fn collect(summaries: &[DaySummary], map: &MetricMap) -> Vec<Self> {
        summaries
            .iter()
            .filter_map(|s| Self::from_summary(s, map))
            .collect()
    }
}

/// One row of the step count list
#[derive(Debug, Clone, PartialEq)]
pub struct StepDay {
    pub day: NaiveDate,
    pub steps: f64,
}

impl StepDay {
    pub fn from_summary(summary: &DaySummary, map: &MetricMap) -> Option<Self> {
        map.quantity_of(summary, STEPS).map(|steps| Self {
            day: summary.day(),
            steps,
        })
    }

    pub fn collect(summaries: &[DaySummary], map: &MetricMap) -> Vec<Self> {
        summaries
            .iter()
            .filter_map(|s| Self::from_summary(s, map))
            .collect()
    }
}
