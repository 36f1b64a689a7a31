//! Sample sources
//!
//! A [`SampleSource`] stands in for the device health store. It owns query
//! semantics (category filter, date range, ordering, limit); the aggregator
//! only ever sees the samples it returns.

mod file;
mod memory;

pub use file::FileSource;
pub use memory::InMemorySource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HealthError;
use crate::types::{Category, Sample};

/// Result ordering by sample start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Filter, order and limit for a fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleQuery {
    /// Categories to include; empty means all
    pub categories: Vec<Category>,
    /// Inclusive lower bound on sample start
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on sample start
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of samples, applied after ordering
    pub limit: Option<usize>,
    pub order: SortOrder,
}

impl SampleQuery {
    /// Every sample, oldest first
    pub fn all() -> Self {
        Self::default()
    }

    /// Sleep analysis samples only
    pub fn sleep() -> Self {
        Self::all().with_categories(Category::ALL.into_iter().filter(|c| c.is_sleep()))
    }

    /// Step count samples only
    pub fn steps() -> Self {
        Self::all().with_categories([Category::StepCount])
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    /// Restrict to samples starting in `[from, until)`
    pub fn between(mut self, from: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.until = until;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Whether a single sample passes the category and date filters
    pub fn matches(&self, sample: &Sample) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&sample.category) {
            return false;
        }
        if let Some(from) = self.from {
            if sample.start < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if sample.start >= until {
                return false;
            }
        }
        true
    }

    /// Filter, order and truncate `samples` according to this query
    pub fn apply(&self, samples: impl IntoIterator<Item = Sample>) -> Vec<Sample> {
        let mut selected: Vec<Sample> = samples.into_iter().filter(|s| self.matches(s)).collect();

        selected.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.end.cmp(&b.end))
                .then_with(|| a.category.cmp(&b.category))
        });
        if self.order == SortOrder::Descending {
            selected.reverse();
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Trait for health sample providers
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &str;

    /// Fetch the samples matching `query`
    async fn fetch(&self, query: &SampleQuery) -> Result<Vec<Sample>, HealthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, d, h, 0, 0).unwrap()
    }

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new(Category::InBed, at(3, 22), at(4, 6)),
            Sample::new(Category::StepCount, at(2, 9), at(2, 10)).with_quantity(500.0),
            Sample::new(Category::Asleep, at(1, 23), at(2, 6)),
            Sample::new(Category::Awake, at(2, 3), at(2, 4)),
        ]
    }

    #[test]
    fn test_default_query_orders_oldest_first() {
        let result = SampleQuery::all().apply(samples());
        let starts: Vec<_> = result.iter().map(|s| s.start).collect();

        assert_eq!(starts, vec![at(1, 23), at(2, 3), at(2, 9), at(3, 22)]);
    }

    #[test]
    fn test_category_filters() {
        let sleep = SampleQuery::sleep().apply(samples());
        assert_eq!(sleep.len(), 3);
        assert!(sleep.iter().all(|s| s.category.is_sleep()));

        let steps = SampleQuery::steps().apply(samples());
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].quantity, Some(500.0));
    }

    #[test]
    fn test_date_range_is_half_open() {
        let query = SampleQuery::all().between(Some(at(2, 3)), Some(at(3, 22)));
        let result = query.apply(samples());

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].start, at(2, 3));
        assert_eq!(result[1].start, at(2, 9));
    }

    #[test]
    fn test_descending_with_limit() {
        let query = SampleQuery::all()
            .with_order(SortOrder::Descending)
            .with_limit(2);
        let result = query.apply(samples());

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].category, Category::InBed);
        assert_eq!(result[1].category, Category::StepCount);
    }
}
