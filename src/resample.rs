use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Metric;
use crate::dataset::{self, DATE_COLUMN, DatasetError};
use crate::features::to_f64_vec;
use crate::logging::log_event;

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("custom aggregation needs a positive number of years, got {0}")]
    InvalidParameter(i32),
    #[error("unsupported aggregation format: {0}")]
    UnsupportedAggregation(String),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

pub type ResampleResult<T> = Result<T, ResampleError>;

/// Calendar periods a series can be resampled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarPeriod {
    /// ISO weeks, starting Monday.
    Week,
    Month,
    Quarter,
    Year,
}

impl CalendarPeriod {
    /// First day of the period containing `date`.
    pub fn start_of(&self, date: NaiveDate) -> NaiveDate {
        match self {
            CalendarPeriod::Week => {
                let offset = u64::from(date.weekday().num_days_from_monday());
                date.checked_sub_days(Days::new(offset)).unwrap_or(date)
            }
            CalendarPeriod::Month => date.with_day(1).unwrap_or(date),
            CalendarPeriod::Quarter => {
                let month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
            }
            CalendarPeriod::Year => date.with_ordinal(1).unwrap_or(date),
        }
    }
}

/// How a filtered series is reduced before charting.
///
/// Every bucketed mode keeps the last observation of each bucket (a point-in-time
/// snapshot), never a mean or a sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Aggregation {
    #[default]
    None,
    Period(CalendarPeriod),
    /// Buckets of `years` calendar years, aligned on multiples of `years`.
    Custom { years: i32 },
}

impl Aggregation {
    pub fn custom(years: i32) -> ResampleResult<Self> {
        if years <= 0 {
            return Err(ResampleError::InvalidParameter(years));
        }
        Ok(Aggregation::Custom { years })
    }

    fn bucket_start(&self, date: NaiveDate) -> ResampleResult<NaiveDate> {
        match *self {
            Aggregation::None => Ok(date),
            Aggregation::Period(period) => Ok(period.start_of(date)),
            Aggregation::Custom { years } => {
                let year = date.year().div_euclid(years) * years;
                NaiveDate::from_ymd_opt(year, 1, 1).ok_or(ResampleError::InvalidParameter(years))
            }
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::None => write!(f, "none"),
            Aggregation::Period(CalendarPeriod::Week) => write!(f, "weekly"),
            Aggregation::Period(CalendarPeriod::Month) => write!(f, "monthly"),
            Aggregation::Period(CalendarPeriod::Quarter) => write!(f, "quarterly"),
            Aggregation::Period(CalendarPeriod::Year) => write!(f, "yearly"),
            Aggregation::Custom { years } => write!(f, "{years}y"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = ResampleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        let period = match trimmed.as_str() {
            "" | "none" => return Ok(Aggregation::None),
            "weekly" | "week" | "w" => Some(CalendarPeriod::Week),
            "monthly" | "month" | "mon" | "m" => Some(CalendarPeriod::Month),
            "quarterly" | "quarter" | "q" => Some(CalendarPeriod::Quarter),
            "yearly" | "annual" | "year" | "y" => Some(CalendarPeriod::Year),
            _ => None,
        };
        if let Some(period) = period {
            return Ok(Aggregation::Period(period));
        }

        let count_len = trimmed
            .char_indices()
            .take_while(|(idx, c)| c.is_ascii_digit() || (*idx == 0 && *c == '-'))
            .count();
        let (count_str, suffix) = trimmed.split_at(count_len);
        if count_str.is_empty() || !matches!(suffix, "y" | "year" | "years") {
            return Err(ResampleError::UnsupportedAggregation(trimmed));
        }

        let years: i32 = count_str
            .parse()
            .map_err(|_| ResampleError::UnsupportedAggregation(trimmed.clone()))?;
        Aggregation::custom(years)
    }
}

impl TryFrom<String> for Aggregation {
    type Error = ResampleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<Aggregation> for String {
    fn from(value: Aggregation) -> Self {
        value.to_string()
    }
}

/// A single metric over time: a `date` column plus the metric's own column.
#[derive(Debug, Clone)]
pub struct MetricSeries {
    metric: Metric,
    frame: DataFrame,
}

impl MetricSeries {
    pub fn from_parts(
        metric: Metric,
        dates: Vec<Option<NaiveDate>>,
        values: Vec<f64>,
    ) -> PolarsResult<Self> {
        let frame = DataFrame::new(vec![
            DateChunked::from_naive_date_options(DATE_COLUMN, dates).into_series(),
            Series::new(metric.column(), values),
        ])?;
        Ok(Self { metric, frame })
    }

    /// Extract `metric` and the dates from a wider frame, row for row.
    pub fn from_frame(frame: &DataFrame, metric: Metric) -> ResampleResult<Self> {
        let dates = dataset::date_values(frame)?;
        let column = frame
            .column(metric.column())
            .map_err(|_| DatasetError::MissingColumn(metric.column().to_string()))?;
        let values = to_f64_vec(column)?;
        Ok(Self::from_parts(metric, dates, values)?)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn dates(&self) -> PolarsResult<Vec<Option<NaiveDate>>> {
        Ok(self.frame.column(DATE_COLUMN)?.date()?.as_date_iter().collect())
    }

    pub fn values(&self) -> PolarsResult<Vec<f64>> {
        to_f64_vec(self.frame.column(self.metric.column())?)
    }

    pub(crate) fn with_values(&self, values: Vec<f64>) -> PolarsResult<Self> {
        let mut frame = self.frame.clone();
        frame.with_column(Series::new(self.metric.column(), values))?;
        Ok(Self {
            metric: self.metric,
            frame,
        })
    }
}

/// Reduce `frame` to the single `metric` column at the requested granularity.
///
/// Bucketed output is labelled with each bucket's first day and sorted by that label;
/// buckets without rows are not emitted. Rows without a date are dropped by bucketing.
pub fn aggregate(
    frame: &DataFrame,
    metric: Metric,
    aggregation: Aggregation,
) -> ResampleResult<MetricSeries> {
    if let Aggregation::Custom { years } = aggregation
        && years <= 0
    {
        log_event(
            file!(),
            "Resampler",
            "aggregate",
            "resample.validate",
            line!(),
            "Rejected custom bucket size",
            Some(&format!("years={years}")),
        );
        return Err(ResampleError::InvalidParameter(years));
    }

    let series = MetricSeries::from_frame(frame, metric)?;
    if aggregation == Aggregation::None {
        return Ok(series);
    }

    let dates = series.dates()?;
    let values = series.values()?;

    // bucket label -> (date of the retained row, its value)
    let mut buckets: BTreeMap<NaiveDate, (NaiveDate, f64)> = BTreeMap::new();
    for (date, value) in dates.into_iter().zip(values) {
        let Some(date) = date else { continue };
        let label = aggregation.bucket_start(date)?;
        buckets
            .entry(label)
            .and_modify(|slot| {
                if date >= slot.0 {
                    *slot = (date, value);
                }
            })
            .or_insert((date, value));
    }

    let (labels, retained): (Vec<Option<NaiveDate>>, Vec<f64>) = buckets
        .into_iter()
        .map(|(label, (_, value))| (Some(label), value))
        .unzip();

    let aggregated = MetricSeries::from_parts(metric, labels, retained)?;

    log_event(
        file!(),
        "Resampler",
        "aggregate",
        "resample.aggregate",
        line!(),
        &format!(
            "Aggregated {} rows of {} into {} {aggregation} buckets",
            series.len(),
            metric.column(),
            aggregated.len()
        ),
        None,
    );

    Ok(aggregated)
}
