//! fiscal-metrics turns US government finance time series (GDP, receipts, expenditure,
//! debt, interest, federal funds rate) into chart-ready series: derived fiscal ratios,
//! inclusive date-range filtering, last-observation calendar aggregation, unit scaling
//! and summary statistics.

pub mod config;
pub mod dataset;
pub mod features;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod resample;
pub mod units;

pub use config::{ChartRequest, ConfigError, Metric};
pub use dataset::{DatasetError, EconomicData, Observation};
pub use features::{DerivedSeries, derive};
pub use metrics::{MetricsError, MetricsResult, SummaryStats, summarize};
pub use pipeline::{ChartData, MetricPipeline, PipelineError, PipelineResult};
pub use resample::{Aggregation, CalendarPeriod, MetricSeries, ResampleError, aggregate};
pub use units::{ScaleFactor, scale};

pub type Result<T> = anyhow::Result<T>;
