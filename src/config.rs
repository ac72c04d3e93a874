use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset;
use crate::features;
use crate::resample::Aggregation;
use crate::units::ScaleFactor;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("unsupported scale: {0}")]
    UnsupportedScale(String),
    #[error("invalid chart request: {0}")]
    InvalidRequest(#[from] serde_json::Error),
}

/// Every column a chart can plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    Gdp,
    Receipts,
    Expenditure,
    InterestExpenditure,
    GovtDebt,
    FedFundsRate,
    NetIncome,
    DeficitSpending,
    InterestPercentOfGdp,
    DebtPercentOfGdp,
    InterestPercentOfExpenditure,
    ProjectedInterestPayments,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::Gdp,
        Metric::Receipts,
        Metric::Expenditure,
        Metric::InterestExpenditure,
        Metric::GovtDebt,
        Metric::FedFundsRate,
        Metric::NetIncome,
        Metric::DeficitSpending,
        Metric::InterestPercentOfGdp,
        Metric::DebtPercentOfGdp,
        Metric::InterestPercentOfExpenditure,
        Metric::ProjectedInterestPayments,
    ];

    /// The dashboard's chart pages, in sidebar order.
    pub const DASHBOARD_PAGES: [Metric; 5] = [
        Metric::Gdp,
        Metric::DeficitSpending,
        Metric::InterestPercentOfGdp,
        Metric::DebtPercentOfGdp,
        Metric::InterestPercentOfExpenditure,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Metric::Gdp => dataset::GDP,
            Metric::Receipts => dataset::RECEIPTS,
            Metric::Expenditure => dataset::EXPENDITURE,
            Metric::InterestExpenditure => dataset::INTEREST_EXPENDITURE,
            Metric::GovtDebt => dataset::GOVT_DEBT,
            Metric::FedFundsRate => dataset::FED_FUNDS_RATE,
            Metric::NetIncome => features::NET_INCOME,
            Metric::DeficitSpending => features::DEFICIT_SPENDING,
            Metric::InterestPercentOfGdp => features::INTEREST_PERCENT_OF_GDP,
            Metric::DebtPercentOfGdp => features::DEBT_PERCENT_OF_GDP,
            Metric::InterestPercentOfExpenditure => features::INTEREST_PERCENT_OF_EXPENDITURE,
            Metric::ProjectedInterestPayments => features::PROJECTED_INTEREST_PAYMENTS,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::Gdp => "Gross Domestic Product",
            Metric::Receipts => "Receipts",
            Metric::Expenditure => "Expenditure",
            Metric::InterestExpenditure => "Interest Expenditure",
            Metric::GovtDebt => "Government Debt",
            Metric::FedFundsRate => "Federal Funds Rate",
            Metric::NetIncome => "Net Income",
            Metric::DeficitSpending => "Deficit Spending",
            Metric::InterestPercentOfGdp => "Interest Percent of GDP",
            Metric::DebtPercentOfGdp => "Debt Percent of GDP",
            Metric::InterestPercentOfExpenditure => "Interest Percent of Expenditure",
            Metric::ProjectedInterestPayments => "Projected Interest Payments",
        }
    }

    /// Whether the metric is a currency magnitude that unit scaling applies to.
    ///
    /// `govt_debt` is excluded: it is stored in different units than the other
    /// currency columns.
    pub fn is_currency(&self) -> bool {
        matches!(
            self,
            Metric::Gdp
                | Metric::Receipts
                | Metric::Expenditure
                | Metric::InterestExpenditure
                | Metric::NetIncome
                | Metric::DeficitSpending
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    /// Accepts either the column name or the display name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Metric::ALL
            .into_iter()
            .find(|metric| {
                metric.column().eq_ignore_ascii_case(wanted)
                    || metric.display_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ConfigError::UnknownMetric(wanted.to_string()))
    }
}

impl TryFrom<String> for Metric {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<Metric> for String {
    fn from(value: Metric) -> Self {
        value.column().to_string()
    }
}

/// Parameters for one chart render. Replaces the dashboard's widget state; nothing here
/// outlives the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub metric: Metric,
    /// Inclusive; defaults to the first date in the table.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Inclusive; defaults to the last date in the table.
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub scale: ScaleFactor,
}

impl ChartRequest {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            start: None,
            end: None,
            aggregation: Aggregation::None,
            scale: ScaleFactor::Billions,
        }
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_scale(mut self, scale: ScaleFactor) -> Self {
        self.scale = scale;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
