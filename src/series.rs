//! Chart series
//!
//! Turns day summaries into `(day, value)` points for chart consumers.
//! Points are chronological (oldest first), the natural x-axis order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::HealthError;
use crate::metrics::{hours, MetricMap};
use crate::types::{Category, DaySummary};

/// Unit of the values in a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesUnit {
    Hours,
    Count,
}

/// One chart point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub day: NaiveDate,
    pub value: f64,
}

/// A named chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub unit: SeriesUnit,
    pub points: Vec<ChartPoint>,
}

impl Series {
    /// Series for a single category; days without that category are skipped
    pub fn for_category(summaries: &[DaySummary], category: Category) -> Self {
        let (unit, points) = if category.is_quantity() {
            let points = chronological(summaries, |s| s.quantity(category));
            (SeriesUnit::Count, points)
        } else {
            let points = chronological(summaries, |s| s.total(category).map(hours));
            (SeriesUnit::Hours, points)
        };

        Self {
            name: category.as_str().to_string(),
            unit,
            points,
        }
    }

    /// Series for a metric of `map`; fails when nothing is bound to `metric`
    pub fn for_metric(
        summaries: &[DaySummary],
        map: &MetricMap,
        metric: &str,
    ) -> Result<Self, HealthError> {
        if !map.contains_metric(metric) {
            return Err(HealthError::UnknownMetric(metric.to_string()));
        }

        let (unit, points) = if map.is_quantity_metric(metric) {
            let points = chronological(summaries, |s| map.quantity_of(s, metric));
            (SeriesUnit::Count, points)
        } else {
            let points = chronological(summaries, |s| map.duration_of(s, metric).map(hours));
            (SeriesUnit::Hours, points)
        };

        Ok(Self {
            name: metric.to_string(),
            unit,
            points,
        })
    }

    /// Render as `date,value` lines with a header
    pub fn to_csv(&self) -> String {
        let mut out = format!("date,{}\n", csv_field(&self.name));
        for point in &self.points {
            out.push_str(&format!("{},{}\n", point.day.format("%Y-%m-%d"), point.value));
        }
        out
    }

    pub fn max_value(&self) -> Option<f64> {
        self.points.iter().map(|p| p.value).reduce(f64::max)
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break
fn csv_field(field: &str) -> String {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn chronological<F>(summaries: &[DaySummary], value: F) -> Vec<ChartPoint>
where
    F: Fn(&DaySummary) -> Option<f64>,
{
    let mut points: Vec<ChartPoint> = summaries
        .iter()
        .filter_map(|s| value(s).map(|v| ChartPoint { day: s.day(), value: v }))
        .collect();
    points.sort_by_key(|p| p.day);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::IntervalAggregator;
    use crate::calendar::ZonedCalendar;
    use crate::metrics::{STEPS, TIME_ASLEEP};
    use crate::types::Sample;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, d, h, mi, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 5, d).unwrap()
    }

    fn sample_summaries() -> Vec<DaySummary> {
        let samples = vec![
            Sample::new(Category::Asleep, at(1, 23, 0), at(2, 6, 30)),
            Sample::new(Category::AsleepDeep, at(3, 0, 0), at(3, 1, 30)),
            Sample::new(Category::Asleep, at(3, 1, 30), at(3, 6, 0)),
            Sample::new(Category::StepCount, at(2, 9, 0), at(2, 10, 0)).with_quantity(3000.0),
        ];
        IntervalAggregator::aggregate(&samples, &ZonedCalendar::utc()).summaries
    }

    #[test]
    fn test_metric_series_is_chronological() {
        let series =
            Series::for_metric(&sample_summaries(), &MetricMap::standard(), TIME_ASLEEP).unwrap();

        assert_eq!(series.unit, SeriesUnit::Hours);
        assert_eq!(
            series.points,
            vec![
                ChartPoint { day: day(1), value: 7.5 },
                ChartPoint { day: day(3), value: 6.0 },
            ]
        );
        assert_eq!(series.max_value(), Some(7.5));
    }

    #[test]
    fn test_category_series() {
        let summaries = sample_summaries();

        let deep = Series::for_category(&summaries, Category::AsleepDeep);
        assert_eq!(deep.points, vec![ChartPoint { day: day(3), value: 1.5 }]);

        let steps = Series::for_category(&summaries, Category::StepCount);
        assert_eq!(steps.unit, SeriesUnit::Count);
        assert_eq!(steps.points, vec![ChartPoint { day: day(2), value: 3000.0 }]);
    }

    #[test]
    fn test_unknown_metric() {
        let result = Series::for_metric(&sample_summaries(), &MetricMap::standard(), "heart_rate");
        assert!(matches!(result, Err(HealthError::UnknownMetric(_))));
    }

    #[test]
    fn test_csv_output() {
        let series =
            Series::for_metric(&sample_summaries(), &MetricMap::standard(), STEPS).unwrap();

        assert_eq!(series.to_csv(), "date,steps\n2023-05-02,3000\n");
    }

    #[test]
    fn test_csv_header_quotes_metric_names() {
        let map = MetricMap::empty().bind(Category::StepCount, r#"steps, "walked""#);
        let series = Series::for_metric(&sample_summaries(), &map, r#"steps, "walked""#).unwrap();

        assert_eq!(
            series.to_csv(),
            "date,\"steps, \"\"walked\"\"\"\n2023-05-02,3000\n"
        );
    }

    #[test]
    fn test_empty_series() {
        let series = Series::for_category(&[], Category::InBed);
        assert!(series.points.is_empty());
        assert_eq!(series.max_value(), None);
    }
}
