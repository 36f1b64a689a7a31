//! health.sample.v1 record definition
//!
//! One record per sample:
//!
//! ```json
//! {"schema_version": "health.sample.v1", "id": "…", "category": "asleep",
//!  "start": "2023-05-01T23:00:00Z", "end": "2023-05-02T01:00:00Z",
//!  "value": null, "source": "Watch"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Category, Sample};

/// Current schema version
pub const SCHEMA_VERSION: &str = "health.sample.v1";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// A single exported health sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Schema version identifier (defaults to the current version when omitted)
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Unique record identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub category: Category,
    /// Interval start (UTC)
    pub start: DateTime<Utc>,
    /// Interval end (UTC)
    pub end: DateTime<Utc>,
    /// Quantity for quantity categories (step count)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Device or app that recorded the sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl SampleRecord {
    /// Wrap a sample in a record with a fresh identifier
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            id: Some(uuid::Uuid::new_v4().to_string()),
            category: sample.category,
            start: sample.start,
            end: sample.end,
            value: sample.quantity,
            source: None,
        }
    }

    /// Attach the recording device/app name
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Strict record validation.
    ///
    /// Aggregation tolerates inverted intervals and bad quantities; this is
    /// for reporting them before they get that far.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if self.end < self.start {
            return Err(ValidationError::InvertedInterval {
                start: self.start.to_rfc3339(),
                end: self.end.to_rfc3339(),
            });
        }

        match self.value {
            Some(_) if !self.category.is_quantity() => Err(ValidationError::UnexpectedQuantity(
                self.category.to_string(),
            )),
            Some(v) if !v.is_finite() || v < 0.0 => Err(ValidationError::InvalidQuantity {
                category: self.category.to_string(),
                value: v,
            }),
            _ => Ok(()),
        }
    }

    /// Convert to a sample. Never rejects: inverted intervals and bad
    /// quantities pass through for the aggregator to count.
    pub fn to_sample(&self) -> Sample {
        Sample {
            category: self.category,
            start: self.start,
            end: self.end,
            quantity: self.value,
        }
    }
}
