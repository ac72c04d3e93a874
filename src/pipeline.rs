//! Request-scoped chart pipeline.
//!
//! The derived table is computed once per load; each [`ChartRequest`] then runs
//! filter -> aggregate -> scale -> summarize against it without touching shared state:
//!
//! ```no_run
//! use fiscal_metrics::{ChartRequest, Metric, MetricPipeline};
//!
//! let pipeline = MetricPipeline::from_csv("data/CombinedData.csv")?;
//! let chart = pipeline.render(&ChartRequest::new(Metric::DebtPercentOfGdp))?;
//! println!("{} points", chart.series.len());
//! # Ok::<(), fiscal_metrics::PipelineError>(())
//! ```

use std::path::Path;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::config::ChartRequest;
use crate::dataset::{DatasetError, EconomicData};
use crate::features::{self, DerivedSeries};
use crate::logging::log_event;
use crate::metrics::{self, MetricsError, MetricsResult, SummaryStats};
use crate::resample::{self, MetricSeries, ResampleError};
use crate::units;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Resample(#[from] ResampleError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Everything a renderer needs for one chart and its stats card.
#[derive(Debug)]
pub struct ChartData {
    pub series: MetricSeries,
    /// Kept separate so an empty range still yields a (blank) chart.
    pub summary: MetricsResult<SummaryStats>,
}

#[derive(Clone)]
pub struct MetricPipeline {
    derived: DerivedSeries,
}

impl MetricPipeline {
    pub fn new(raw: &EconomicData) -> PipelineResult<Self> {
        let derived = features::derive(raw)?;
        Ok(Self { derived })
    }

    pub fn from_csv<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let raw = EconomicData::from_csv(path)?;
        Self::new(&raw)
    }

    pub fn derived(&self) -> &DerivedSeries {
        &self.derived
    }

    pub fn render(&self, request: &ChartRequest) -> PipelineResult<ChartData> {
        let frame = self.derived.frame();
        let bounds = self.derived.date_bounds()?;

        let filtered = match (bounds, request.start, request.end) {
            (_, Some(start), Some(end)) => self.derived.filter_range(start, end)?,
            // A single bound outside the table inverts against the defaulted one; that
            // range simply holds no rows.
            (Some((lo, hi)), start, end) => {
                let (start, end) = (start.unwrap_or(lo), end.unwrap_or(hi));
                if start > end {
                    frame.head(Some(0))
                } else {
                    self.derived.filter_range(start, end)?
                }
            }
            // An empty table has no bounds to default to; every range is empty.
            (None, _, _) => frame.head(Some(0)),
        };

        let aggregated = resample::aggregate(&filtered, request.metric, request.aggregation)?;
        let series = if request.metric.is_currency() {
            units::scale(&aggregated, request.scale.multiplier())?
        } else {
            aggregated
        };
        let summary = metrics::summarize(&series);

        log_event(
            file!(),
            "MetricPipeline",
            "render",
            "pipeline.render",
            line!(),
            &format!(
                "Rendered {} with {} points ({} aggregation, {} scale)",
                request.metric,
                series.len(),
                request.aggregation,
                request.scale
            ),
            summary.as_ref().err().map(ToString::to_string).as_deref(),
        );

        Ok(ChartData { series, summary })
    }
}
