//! In-memory sample source

use async_trait::async_trait;

use super::{SampleQuery, SampleSource};
use crate::error::HealthError;
use crate::schema::{RecordAdapter, SampleRecord};
use crate::types::Sample;

/// Source backed by a fixed set of samples
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    samples: Vec<Sample>,
}

impl InMemorySource {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn from_records(records: &[SampleRecord]) -> Self {
        Self::new(RecordAdapter::to_samples(records))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[async_trait]
impl SampleSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, query: &SampleQuery) -> Result<Vec<Sample>, HealthError> {
        Ok(query.apply(self.samples.iter().cloned()))
    }
}
