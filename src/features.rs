use chrono::NaiveDate;
use polars::prelude::*;

use crate::dataset::{
    self, DatasetError, DatasetResult, EXPENDITURE, EconomicData, FED_FUNDS_RATE, GDP, GOVT_DEBT,
    INTEREST_EXPENDITURE, RAW_COLUMNS, RECEIPTS,
};
use crate::logging::log_event;

pub const NET_INCOME: &str = "net_income";
pub const DEFICIT_SPENDING: &str = "deficit_spending";
pub const INTEREST_PERCENT_OF_GDP: &str = "interest_percent_of_gdp";
pub const DEBT_PERCENT_OF_GDP: &str = "debt_percent_of_gdp";
pub const INTEREST_PERCENT_OF_EXPENDITURE: &str = "interest_percent_of_expenditure";
pub const PROJECTED_INTEREST_PAYMENTS: &str = "projected_interest_payments";

pub const DERIVED_COLUMNS: [&str; 6] = [
    NET_INCOME,
    DEFICIT_SPENDING,
    INTEREST_PERCENT_OF_GDP,
    DEBT_PERCENT_OF_GDP,
    INTEREST_PERCENT_OF_EXPENDITURE,
    PROJECTED_INTEREST_PAYMENTS,
];

/// Debt is reported in millions while the other currency columns are in billions.
const DEBT_UNIT_DIVISOR: f64 = 1000.0;

/// Read a numeric column as `f64`, with nulls becoming NaN.
pub(crate) fn to_f64_vec(series: &Series) -> PolarsResult<Vec<f64>> {
    let float_series = if series.dtype() != &DataType::Float64 {
        series.cast(&DataType::Float64)?
    } else {
        series.clone()
    };

    let chunked = float_series.f64()?;
    Ok(chunked
        .into_iter()
        .map(|opt| opt.unwrap_or(f64::NAN))
        .collect())
}

/// `numerator / denominator * 100`, NaN when the denominator is zero.
fn percent_of(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator * 100.0
    }
}

/// The raw table extended with the computed fiscal ratio columns. Never mutated after
/// construction; filtering returns a new frame.
#[derive(Clone)]
pub struct DerivedSeries {
    frame: DataFrame,
}

impl DerivedSeries {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn date_bounds(&self) -> DatasetResult<Option<(NaiveDate, NaiveDate)>> {
        dataset::date_bounds(&self.frame)
    }

    pub fn filter_range(&self, start: NaiveDate, end: NaiveDate) -> DatasetResult<DataFrame> {
        dataset::filter_date_range(&self.frame, start, end)
    }
}

fn require_column(frame: &DataFrame, name: &str) -> DatasetResult<Vec<f64>> {
    let series = frame.column(name).map_err(|_| {
        log_event(
            file!(),
            "FeatureEngineering",
            "derive",
            "features.schema",
            line!(),
            &format!("Raw table is missing `{name}`"),
            Some(name),
        );
        DatasetError::MissingColumn(name.to_string())
    })?;
    Ok(to_f64_vec(series)?)
}

/// Append the derived fiscal columns to the raw table.
///
/// Every derived value depends only on its own row. Ratios whose denominator is zero are
/// NaN rather than an error, so a single bad row never fails the whole table.
pub fn derive(raw: &EconomicData) -> DatasetResult<DerivedSeries> {
    let frame = raw.frame();
    let receipts = require_column(frame, RECEIPTS)?;
    let expenditure = require_column(frame, EXPENDITURE)?;
    let interest = require_column(frame, INTEREST_EXPENDITURE)?;
    let gdp = require_column(frame, GDP)?;
    let debt = require_column(frame, GOVT_DEBT)?;
    let fed_funds = require_column(frame, FED_FUNDS_RATE)?;

    let rows = frame.height();
    let mut net_income = Vec::with_capacity(rows);
    let mut deficit_spending = Vec::with_capacity(rows);
    let mut interest_of_gdp = Vec::with_capacity(rows);
    let mut debt_of_gdp = Vec::with_capacity(rows);
    let mut interest_of_expenditure = Vec::with_capacity(rows);
    let mut projected_interest = Vec::with_capacity(rows);

    for idx in 0..rows {
        let net = receipts[idx] - expenditure[idx];
        let debt_scaled = debt[idx] / DEBT_UNIT_DIVISOR;

        net_income.push(net);
        deficit_spending.push(-net);
        interest_of_gdp.push(percent_of(interest[idx], gdp[idx]));
        debt_of_gdp.push(percent_of(debt_scaled, gdp[idx]));
        interest_of_expenditure.push(percent_of(interest[idx], expenditure[idx]));
        projected_interest.push(percent_of(fed_funds[idx] / 100.0 * debt_scaled, gdp[idx]));
    }

    let mut enriched = frame.clone();
    for name in RAW_COLUMNS {
        let column = enriched.column(name)?;
        if column.dtype() != &DataType::Float64 {
            let casted = column.cast(&DataType::Float64)?;
            enriched.with_column(casted)?;
        }
    }
    enriched.with_column(Series::new(NET_INCOME, net_income))?;
    enriched.with_column(Series::new(DEFICIT_SPENDING, deficit_spending))?;
    enriched.with_column(Series::new(INTEREST_PERCENT_OF_GDP, interest_of_gdp))?;
    enriched.with_column(Series::new(DEBT_PERCENT_OF_GDP, debt_of_gdp))?;
    enriched.with_column(Series::new(
        INTEREST_PERCENT_OF_EXPENDITURE,
        interest_of_expenditure,
    ))?;
    enriched.with_column(Series::new(PROJECTED_INTEREST_PAYMENTS, projected_interest))?;

    log_event(
        file!(),
        "FeatureEngineering",
        "derive",
        "features.derive",
        line!(),
        &format!("Derived {} fiscal columns for {rows} rows", DERIVED_COLUMNS.len()),
        None,
    );

    Ok(DerivedSeries { frame: enriched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Observation;

    fn observation(gdp: f64, expenditure: f64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            receipts: 50.0,
            expenditure,
            interest_expenditure: 5.0,
            gdp,
            govt_debt: 20_000.0,
            fed_funds_rate: 2.0,
        }
    }

    fn column(series: &DerivedSeries, name: &str) -> Vec<f64> {
        to_f64_vec(series.frame().column(name).unwrap()).unwrap()
    }

    #[test]
    fn projected_interest_uses_debt_in_gdp_units() {
        let raw = EconomicData::from_observations(&[observation(100.0, 60.0)]).unwrap();
        let derived = derive(&raw).unwrap();
        // 2% of 20 (debt / 1000) is 0.4, which is 0.4% of a GDP of 100.
        assert!((column(&derived, PROJECTED_INTEREST_PAYMENTS)[0] - 0.4).abs() < 1e-12);
        assert!((column(&derived, INTEREST_PERCENT_OF_EXPENDITURE)[0] - 5.0 / 60.0 * 100.0).abs() < 1e-12);
    }

    #[test]
    fn zero_expenditure_only_affects_expenditure_ratio() {
        let raw = EconomicData::from_observations(&[observation(100.0, 0.0)]).unwrap();
        let derived = derive(&raw).unwrap();
        assert!(column(&derived, INTEREST_PERCENT_OF_EXPENDITURE)[0].is_nan());
        assert!(column(&derived, INTEREST_PERCENT_OF_GDP)[0].is_finite());
        assert_eq!(column(&derived, NET_INCOME)[0], 50.0);
    }

    #[test]
    fn integer_columns_are_widened_to_floats() {
        let frame = df! {
            "date" => &["2020-01-01"],
            "receipts" => &[50i64],
            "expenditure" => &[60i64],
            "interest_expenditure" => &[5i64],
            "gdp" => &[100i64],
            "govt_debt" => &[20_000i64],
            "fed_funds_rate" => &[2.0],
        }
        .unwrap();

        let raw = EconomicData::from_frame(frame).unwrap();
        let derived = derive(&raw).unwrap();
        assert_eq!(derived.frame().column(GDP).unwrap().dtype(), &DataType::Float64);
        assert_eq!(column(&derived, DEFICIT_SPENDING), vec![10.0]);
    }
}
