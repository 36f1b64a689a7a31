//! Observable aggregation state
//!
//! [`SummaryCell`] holds the latest aggregation for presentation consumers.
//! One writer publishes, any number of readers watch; the most recent publish
//! wins and readers only ever see whole snapshots.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

use crate::types::Aggregation;

/// One published aggregation
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// 0 before the first publish, then increments by one per publish
    pub generation: u64,
    pub aggregation: Arc<Aggregation>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// True until something has been published
    pub fn is_initial(&self) -> bool {
        self.generation == 0
    }
}

/// Single-writer, last-write-wins cell
pub struct SummaryCell {
    tx: watch::Sender<Snapshot>,
}

impl Default for SummaryCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        Self { tx }
    }

    /// Replace the current snapshot; succeeds with or without subscribers
    pub fn publish(&self, aggregation: Aggregation) -> Snapshot {
        let aggregation = Arc::new(aggregation);
        let published_at = Utc::now();

        let mut published = Snapshot::default();
        self.tx.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.aggregation = aggregation;
            snapshot.published_at = Some(published_at);
            published = snapshot.clone();
        });

        published
    }

    /// Latest snapshot
    pub fn current(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Anomalies;

    fn aggregation_with_anomalies(n: usize) -> Aggregation {
        Aggregation {
            summaries: Vec::new(),
            anomalies: Anomalies {
                inverted_intervals: n,
                invalid_quantities: 0,
            },
        }
    }

    #[test]
    fn test_initial_snapshot() {
        let cell = SummaryCell::new();
        let snapshot = cell.current();

        assert!(snapshot.is_initial());
        assert!(snapshot.aggregation.is_empty());
        assert!(snapshot.published_at.is_none());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let cell = SummaryCell::new();
        let snapshot = cell.publish(aggregation_with_anomalies(1));

        assert_eq!(snapshot.generation, 1);
        assert_eq!(cell.current().aggregation.anomalies.inverted_intervals, 1);
    }

    #[test]
    fn test_last_write_wins() {
        let cell = SummaryCell::new();
        cell.publish(aggregation_with_anomalies(1));
        cell.publish(aggregation_with_anomalies(2));
        let last = cell.publish(aggregation_with_anomalies(3));

        assert_eq!(last.generation, 3);
        assert_eq!(cell.current().aggregation.anomalies.inverted_intervals, 3);
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest() {
        let cell = SummaryCell::new();
        let mut rx = cell.subscribe();

        cell.publish(aggregation_with_anomalies(5));
        rx.changed().await.unwrap();

        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.generation, 1);
        assert_eq!(seen.aggregation.anomalies.inverted_intervals, 5);
    }
}
