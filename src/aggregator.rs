//! Day-bucketed interval aggregation
//!
//! Groups samples by the calendar day of their start instant and reduces each
//! day to per-category duration and quantity totals. Samples that cross
//! midnight are attributed wholly to their start day.

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::calendar::DayCalendar;
use crate::metrics::saturating_add;
use crate::types::{Aggregation, Anomalies, Category, DaySummary, Sample};

/// Stateless aggregator over interval samples
pub struct IntervalAggregator;

impl IntervalAggregator {
    /// Aggregate `samples` into one summary per start day, most recent first.
    ///
    /// Never fails. Inverted intervals count with zero duration and invalid
    /// quantities are left out of quantity totals; both are tallied in
    /// [`Aggregation::anomalies`].
    pub fn aggregate(samples: &[Sample], calendar: &dyn DayCalendar) -> Aggregation {
        let mut buckets: HashMap<NaiveDate, DayBucket> = HashMap::new();
        let mut anomalies = Anomalies::default();

        for sample in samples {
            if sample.is_inverted() {
                anomalies.inverted_intervals += 1;
                warn!(
                    category = %sample.category,
                    start = %sample.start,
                    end = %sample.end,
                    "sample ends before it starts; counting zero duration"
                );
            }

            let quantity = match sample.quantity {
                Some(q) if !sample.category.is_quantity() => {
                    anomalies.invalid_quantities += 1;
                    warn!(
                        category = %sample.category,
                        quantity = q,
                        "dropping quantity on an interval-only category"
                    );
                    None
                }
                Some(q) if q.is_finite() && q >= 0.0 => Some(q),
                Some(q) => {
                    anomalies.invalid_quantities += 1;
                    warn!(
                        category = %sample.category,
                        quantity = q,
                        "dropping invalid sample quantity"
                    );
                    None
                }
                None => None,
            };

            let day = calendar.day_of(sample.start);
            buckets
                .entry(day)
                .or_insert_with(|| DayBucket::new(day))
                .segments
                .push(Segment {
                    category: sample.category,
                    duration: sample.duration(),
                    quantity,
                });
        }

        let mut summaries: Vec<DaySummary> = buckets.into_values().map(DayBucket::reduce).collect();
        summaries.sort_by(|a, b| b.day().cmp(&a.day()));

        debug!(
            samples = samples.len(),
            days = summaries.len(),
            anomalies = anomalies.total(),
            calendar = %calendar.name(),
            "aggregated samples by day"
        );

        Aggregation {
            summaries,
            anomalies,
        }
    }
}

/// A sample re-expressed for reduction
struct Segment {
    category: Category,
    duration: Duration,
    quantity: Option<f64>,
}

/// All segments whose start falls on one calendar day
struct DayBucket {
    day: NaiveDate,
    segments: Vec<Segment>,
}

impl DayBucket {
    fn new(day: NaiveDate) -> Self {
        Self {
            day,
            segments: Vec::new(),
        }
    }

    fn reduce(mut self) -> DaySummary {
        // Canonical order keeps float quantity sums independent of input order
        self.segments.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.duration.cmp(&b.duration))
                .then_with(|| {
                    a.quantity
                        .unwrap_or(0.0)
                        .total_cmp(&b.quantity.unwrap_or(0.0))
                })
        });

        let mut totals: BTreeMap<Category, Duration> = BTreeMap::new();
        let mut quantities: BTreeMap<Category, f64> = BTreeMap::new();

        for segment in &self.segments {
            let total = totals.entry(segment.category).or_insert_with(Duration::zero);
            *total = saturating_add(*total, segment.duration);

            if let Some(q) = segment.quantity {
                *quantities.entry(segment.category).or_insert(0.0) += q;
            }
        }

        DaySummary::new(self.day, totals, quantities, self.segments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{FixedOffsetCalendar, ZonedCalendar};
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn day(y: i32, mo: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap()
    }

    fn week_of_samples() -> Vec<Sample> {
        vec![
            Sample::new(Category::InBed, at(2023, 5, 1, 22, 30), at(2023, 5, 2, 6, 30)),
            Sample::new(Category::Asleep, at(2023, 5, 1, 23, 0), at(2023, 5, 2, 1, 0)),
            Sample::new(Category::AsleepDeep, at(2023, 5, 2, 1, 0), at(2023, 5, 2, 2, 15)),
            Sample::new(Category::StepCount, at(2023, 5, 2, 9, 0), at(2023, 5, 2, 10, 0))
                .with_quantity(1520.0),
            Sample::new(Category::StepCount, at(2023, 5, 2, 12, 0), at(2023, 5, 2, 12, 30))
                .with_quantity(830.5),
            Sample::new(Category::InBed, at(2023, 5, 3, 23, 0), at(2023, 5, 4, 7, 0)),
            Sample::new(Category::Awake, at(2023, 5, 4, 3, 0), at(2023, 5, 4, 3, 20)),
        ]
    }

    #[test]
    fn test_cross_midnight_example() {
        let samples = vec![
            Sample::new(Category::Asleep, at(2023, 5, 1, 23, 0), at(2023, 5, 2, 1, 0)),
            Sample::new(Category::InBed, at(2023, 5, 1, 22, 30), at(2023, 5, 2, 6, 30)),
        ];

        let result = IntervalAggregator::aggregate(&samples, &ZonedCalendar::utc());

        assert_eq!(result.summaries.len(), 1);
        let summary = &result.summaries[0];
        assert_eq!(summary.day(), day(2023, 5, 1));
        assert_eq!(summary.total(Category::Asleep), Some(Duration::hours(2)));
        assert_eq!(summary.total(Category::InBed), Some(Duration::hours(8)));
        assert_eq!(summary.sample_count(), 2);
        assert!(result.anomalies.is_clean());
    }

    #[test]
    fn test_empty_input() {
        let result = IntervalAggregator::aggregate(&[], &ZonedCalendar::utc());

        assert!(result.is_empty());
        assert_eq!(result.anomalies, Anomalies::default());
    }

    #[test]
    fn test_inverted_interval_is_clamped_and_counted() {
        let samples = vec![
            Sample::new(Category::Asleep, at(2023, 5, 1, 23, 0), at(2023, 5, 1, 22, 0)),
            Sample::new(Category::InBed, at(2023, 5, 1, 22, 0), at(2023, 5, 1, 23, 0)),
        ];

        let result = IntervalAggregator::aggregate(&samples, &ZonedCalendar::utc());

        assert_eq!(result.anomalies.inverted_intervals, 1);
        let summary = &result.summaries[0];
        // Present with zero duration rather than omitted
        assert_eq!(summary.total(Category::Asleep), Some(Duration::zero()));
        assert_eq!(summary.total(Category::InBed), Some(Duration::hours(1)));
    }

    #[test]
    fn test_absent_category_is_not_zero_filled() {
        let samples = vec![Sample::new(
            Category::InBed,
            at(2023, 5, 1, 22, 0),
            at(2023, 5, 2, 6, 0),
        )];

        let result = IntervalAggregator::aggregate(&samples, &ZonedCalendar::utc());
        let summary = &result.summaries[0];

        assert_eq!(summary.total(Category::Asleep), None);
        assert_eq!(summary.totals().len(), 1);
    }

    #[test]
    fn test_invalid_quantities_are_dropped() {
        let samples = vec![
            Sample::new(Category::StepCount, at(2023, 5, 2, 9, 0), at(2023, 5, 2, 9, 5))
                .with_quantity(100.0),
            Sample::new(Category::StepCount, at(2023, 5, 2, 9, 5), at(2023, 5, 2, 9, 10))
                .with_quantity(-40.0),
            Sample::new(Category::StepCount, at(2023, 5, 2, 9, 10), at(2023, 5, 2, 9, 15))
                .with_quantity(f64::NAN),
        ];

        let result = IntervalAggregator::aggregate(&samples, &ZonedCalendar::utc());
        let summary = &result.summaries[0];

        assert_eq!(result.anomalies.invalid_quantities, 2);
        assert_eq!(summary.quantity(Category::StepCount), Some(100.0));
        assert_eq!(summary.total(Category::StepCount), Some(Duration::minutes(15)));
    }

    #[test]
    fn test_quantity_on_sleep_category_is_dropped() {
        let samples = vec![
            Sample::new(Category::Asleep, at(2023, 5, 1, 23, 0), at(2023, 5, 2, 1, 0))
                .with_quantity(3.0),
        ];

        let result = IntervalAggregator::aggregate(&samples, &ZonedCalendar::utc());
        let summary = &result.summaries[0];

        assert_eq!(result.anomalies.invalid_quantities, 1);
        assert!(summary.quantities().is_empty());
        assert_eq!(summary.total(Category::Asleep), Some(Duration::hours(2)));
    }

    #[test]
    fn test_huge_totals_saturate_instead_of_panicking() {
        // Each interval spans roughly ten millennia; together they exceed Duration's range
        let start = at(0, 1, 1, 0, 0);
        let end = at(9999, 12, 31, 0, 0);
        let samples = vec![Sample::new(Category::InBed, start, end); 30_000];

        let result = IntervalAggregator::aggregate(&samples, &ZonedCalendar::utc());

        assert_eq!(result.summaries.len(), 1);
        assert_eq!(
            result.summaries[0].total(Category::InBed),
            Some(Duration::max_value())
        );
        assert_eq!(result.summaries[0].sample_count(), 30_000);
        assert!(result.anomalies.is_clean());
    }

    #[test]
    fn test_summaries_are_most_recent_first() {
        let result = IntervalAggregator::aggregate(&week_of_samples(), &ZonedCalendar::utc());
        let days: Vec<NaiveDate> = result.summaries.iter().map(|s| s.day()).collect();

        assert_eq!(days, vec![day(2023, 5, 4), day(2023, 5, 3), day(2023, 5, 2), day(2023, 5, 1)]);
    }

    #[test]
    fn test_summary_count_matches_distinct_start_days() {
        let samples = week_of_samples();
        let calendar = ZonedCalendar::utc();
        let distinct: HashSet<NaiveDate> = samples.iter().map(|s| calendar.day_of(s.start)).collect();

        let result = IntervalAggregator::aggregate(&samples, &calendar);

        assert_eq!(result.summaries.len(), distinct.len());
        let total_samples: usize = result.summaries.iter().map(|s| s.sample_count()).sum();
        assert_eq!(total_samples, samples.len());
    }

    #[test]
    fn test_durations_never_negative() {
        let mut samples = week_of_samples();
        samples.push(Sample::new(Category::Awake, at(2023, 5, 4, 5, 0), at(2023, 5, 3, 5, 0)));

        let result = IntervalAggregator::aggregate(&samples, &ZonedCalendar::utc());

        for summary in &result.summaries {
            for duration in summary.totals().values() {
                assert!(*duration >= Duration::zero());
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let samples = week_of_samples();
        let calendar = ZonedCalendar::utc();

        let first = IntervalAggregator::aggregate(&samples, &calendar);
        let second = IntervalAggregator::aggregate(&samples, &calendar);

        assert_eq!(first, second);
    }

    #[test]
    fn test_order_invariant() {
        let samples = week_of_samples();
        let calendar = ZonedCalendar::utc();
        let baseline = IntervalAggregator::aggregate(&samples, &calendar);

        let mut reversed = samples.clone();
        reversed.reverse();
        assert_eq!(IntervalAggregator::aggregate(&reversed, &calendar), baseline);

        let mut rotated = samples;
        rotated.rotate_left(3);
        assert_eq!(IntervalAggregator::aggregate(&rotated, &calendar), baseline);
    }

    #[test]
    fn test_step_quantities_summed_per_day() {
        let result = IntervalAggregator::aggregate(&week_of_samples(), &ZonedCalendar::utc());
        let summary = result.day(day(2023, 5, 2)).unwrap();

        assert_eq!(summary.quantity(Category::StepCount), Some(2350.5));
        assert_eq!(summary.total(Category::AsleepDeep), Some(Duration::minutes(75)));
    }

    #[test]
    fn test_calendar_decides_the_bucket() {
        // 23:00 UTC on May 1 is already May 2 in Tokyo
        let samples = vec![Sample::new(
            Category::Asleep,
            at(2023, 5, 1, 23, 0),
            at(2023, 5, 2, 1, 0),
        )];

        let tokyo = FixedOffsetCalendar::parse("+09:00").unwrap();
        let result = IntervalAggregator::aggregate(&samples, &tokyo);

        assert_eq!(result.summaries[0].day(), day(2023, 5, 2));
    }
}
