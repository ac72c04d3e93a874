use polars::prelude::*;
use rayon::prelude::*;
use thiserror::Error;

use crate::logging::log_event;
use crate::resample::MetricSeries;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("summary statistics need at least one finite value in `{0}`")]
    InsufficientData(String),
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Descriptive statistics for the stats card next to a chart.
///
/// NaN gaps in the series are ignored. `std_dev` is the sample standard deviation
/// (n - 1 denominator) and is `None` with fewer than two values. `percent_change` is
/// `None` when the first value is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub count: usize,
    pub std_dev: Option<f64>,
    pub sum: f64,
    pub median: f64,
    pub mean: f64,
    pub percent_change: Option<f64>,
}

impl SummaryStats {
    pub fn evaluate(values: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (&first, &last) = (finite.first()?, finite.last()?);

        let count = finite.len();
        let sum = finite.iter().sum::<f64>();
        let mean = sum / count as f64;
        let std_dev = sample_variance(&finite, mean).map(f64::sqrt);

        let percent_change = if count == 1 {
            Some(0.0)
        } else if first == 0.0 {
            None
        } else {
            Some((last - first) / first * 100.0)
        };

        Some(Self {
            count,
            std_dev,
            sum,
            median: median(finite),
            mean,
            percent_change,
        })
    }

    /// Two-column `statistic`/`value` frame; undefined statistics are null.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let statistics = Series::new(
            "statistic",
            &["count", "std_dev", "sum", "median", "mean", "percent_change"],
        );
        let values = Series::new(
            "value",
            &[
                Some(self.count as f64),
                self.std_dev,
                Some(self.sum),
                Some(self.median),
                Some(self.mean),
                self.percent_change,
            ],
        );
        DataFrame::new(vec![statistics, values])
    }
}

/// Summarize the metric column of `series`.
pub fn summarize(series: &MetricSeries) -> MetricsResult<SummaryStats> {
    let metric = series.metric();
    let Some(stats) = SummaryStats::evaluate(&series.values()?) else {
        let error = MetricsError::InsufficientData(metric.column().to_string());
        log_event(
            file!(),
            "SummaryStats",
            "summarize",
            "metrics.summary",
            line!(),
            &format!("No finite values among {} rows", series.len()),
            Some(&error.to_string()),
        );
        return Err(error);
    };

    log_event(
        file!(),
        "SummaryStats",
        "summarize",
        "metrics.summary",
        line!(),
        &format!(
            "Summarized {} values of {}{}",
            stats.count,
            metric,
            if stats.percent_change.is_none() {
                " (zero baseline, percent change undefined)"
            } else {
                ""
            }
        ),
        None,
    );

    Ok(stats)
}

fn sample_variance(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let sum_squares = values
        .par_iter()
        .map(|value| {
            let diff = value - mean;
            diff * diff
        })
        .sum::<f64>();
    Some(sum_squares / (values.len() as f64 - 1.0))
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
