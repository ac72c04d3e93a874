use std::path::Path;

use chrono::NaiveDate;
use polars::lazy::dsl::{col, lit};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::log_event;

pub const DATE_COLUMN: &str = "date";
/// Date column name used by the FRED-style `CombinedData.csv` export.
pub const SOURCE_DATE_COLUMN: &str = "observation_date";

pub const RECEIPTS: &str = "receipts";
pub const EXPENDITURE: &str = "expenditure";
pub const INTEREST_EXPENDITURE: &str = "interest_expenditure";
pub const GDP: &str = "gdp";
pub const GOVT_DEBT: &str = "govt_debt";
pub const FED_FUNDS_RATE: &str = "fed_funds_rate";

pub const RAW_COLUMNS: [&str; 6] = [
    RECEIPTS,
    EXPENDITURE,
    INTEREST_EXPENDITURE,
    GDP,
    GOVT_DEBT,
    FED_FUNDS_RATE,
];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to load economic data: {source}")]
    Load { source: PolarsError },
    #[error("failed to transform economic data: {source}")]
    Transform { source: PolarsError },
    #[error("required column `{0}` is missing")]
    MissingColumn(String),
    #[error("column `{column}` holds unparseable date `{value}`")]
    InvalidDate { column: String, value: String },
    #[error("range start {start} is after range end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

pub type DatasetResult<T> = Result<T, DatasetError>;

impl From<PolarsError> for DatasetError {
    fn from(source: PolarsError) -> Self {
        DatasetError::Transform { source }
    }
}

/// One dated row of raw economic data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub receipts: f64,
    pub expenditure: f64,
    pub interest_expenditure: f64,
    pub gdp: f64,
    /// Stored 1000x larger than the other currency columns.
    pub govt_debt: f64,
    pub fed_funds_rate: f64,
}

/// The raw observation table, with its date column normalized to a calendar date.
#[derive(Clone)]
pub struct EconomicData {
    frame: DataFrame,
}

impl EconomicData {
    pub fn from_csv<P: AsRef<Path>>(path: P) -> DatasetResult<Self> {
        let path_ref = path.as_ref();
        let loaded = LazyCsvReader::new(path_ref)
            .has_header(true)
            .with_try_parse_dates(true)
            .with_infer_schema_length(Some(2048))
            .finish()
            .and_then(|lazy| lazy.collect());

        let frame = loaded.map_err(|source| {
            log_event(
                file!(),
                "EconomicData",
                "from_csv",
                "dataset.load",
                line!(),
                &format!("Failed to load {}", path_ref.display()),
                Some(&source.to_string()),
            );
            DatasetError::Load { source }
        })?;

        let data = Self::from_frame(frame)?;

        log_event(
            file!(),
            "EconomicData",
            "from_csv",
            "dataset.load",
            line!(),
            &format!(
                "Loaded {} observations from {}",
                data.frame.height(),
                path_ref.display()
            ),
            None,
        );

        Ok(data)
    }

    /// Adopt an already-loaded frame. `observation_date` is renamed to `date` and the date
    /// column is coerced to a calendar date; numeric columns are checked later by `derive`.
    pub fn from_frame(mut frame: DataFrame) -> DatasetResult<Self> {
        let rename_source_date = {
            let names = frame.get_column_names();
            !names.contains(&DATE_COLUMN) && names.contains(&SOURCE_DATE_COLUMN)
        };
        if rename_source_date {
            frame.rename(SOURCE_DATE_COLUMN, DATE_COLUMN)?;
        }

        let dates = frame.column(DATE_COLUMN).map_err(|_| {
            log_event(
                file!(),
                "EconomicData",
                "from_frame",
                "dataset.schema",
                line!(),
                "Raw table has no date column",
                Some(DATE_COLUMN),
            );
            DatasetError::MissingColumn(DATE_COLUMN.to_string())
        })?;

        let normalized = normalize_dates(dates)?;
        frame.with_column(normalized)?;

        Ok(Self { frame })
    }

    pub fn from_observations(observations: &[Observation]) -> DatasetResult<Self> {
        let dates: Vec<NaiveDate> = observations.iter().map(|row| row.date).collect();
        let column = |name: &str, pick: fn(&Observation) -> f64| {
            Series::new(name, observations.iter().map(pick).collect::<Vec<f64>>())
        };

        let frame = DataFrame::new(vec![
            DateChunked::from_naive_date(DATE_COLUMN, dates).into_series(),
            column(RECEIPTS, |row| row.receipts),
            column(EXPENDITURE, |row| row.expenditure),
            column(INTEREST_EXPENDITURE, |row| row.interest_expenditure),
            column(GDP, |row| row.gdp),
            column(GOVT_DEBT, |row| row.govt_debt),
            column(FED_FUNDS_RATE, |row| row.fed_funds_rate),
        ])?;

        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

fn normalize_dates(series: &Series) -> DatasetResult<Series> {
    match series.dtype() {
        DataType::Date => Ok(series.clone()),
        DataType::Datetime(_, _) => Ok(series.cast(&DataType::Date)?),
        DataType::Utf8 => {
            let mut parsed = Vec::with_capacity(series.len());
            for value in series.utf8()?.into_iter() {
                let Some(raw) = value else {
                    parsed.push(None);
                    continue;
                };
                let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                    DatasetError::InvalidDate {
                        column: series.name().to_string(),
                        value: raw.to_string(),
                    }
                })?;
                parsed.push(Some(date));
            }
            Ok(DateChunked::from_naive_date_options(series.name(), parsed).into_series())
        }
        other => Err(DatasetError::Transform {
            source: PolarsError::SchemaMismatch(
                format!("date column has unsupported dtype {other}").into(),
            ),
        }),
    }
}

/// Keep rows with `start <= date <= end`, preserving order. Null dates never match.
pub fn filter_date_range(
    frame: &DataFrame,
    start: NaiveDate,
    end: NaiveDate,
) -> DatasetResult<DataFrame> {
    if start > end {
        let error = DatasetError::InvalidRange { start, end };
        log_event(
            file!(),
            "EconomicData",
            "filter_date_range",
            "dataset.filter",
            line!(),
            "Rejected inverted date range",
            Some(&error.to_string()),
        );
        return Err(error);
    }

    let filter_expr = col(DATE_COLUMN)
        .is_not_null()
        .and(col(DATE_COLUMN).gt_eq(lit(start)))
        .and(col(DATE_COLUMN).lt_eq(lit(end)));

    let filtered = frame.clone().lazy().filter(filter_expr).collect()?;

    log_event(
        file!(),
        "EconomicData",
        "filter_date_range",
        "dataset.filter",
        line!(),
        &format!(
            "Kept {} of {} rows between {start} and {end}",
            filtered.height(),
            frame.height()
        ),
        None,
    );

    Ok(filtered)
}

/// Dates of a frame's `date` column, in row order.
pub fn date_values(frame: &DataFrame) -> DatasetResult<Vec<Option<NaiveDate>>> {
    let dates = frame
        .column(DATE_COLUMN)
        .map_err(|_| DatasetError::MissingColumn(DATE_COLUMN.to_string()))?;
    Ok(dates.date()?.as_date_iter().collect())
}

/// Earliest and latest non-null date, or `None` for an empty table.
pub fn date_bounds(frame: &DataFrame) -> DatasetResult<Option<(NaiveDate, NaiveDate)>> {
    let bounds = date_values(frame)?
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<(NaiveDate, NaiveDate)>, date| match acc {
            None => Some((date, date)),
            Some((lo, hi)) => Some((lo.min(date), hi.max(date))),
        });
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn source_date_column_is_renamed_and_parsed() {
        let frame = df! {
            "observation_date" => &["2020-01-01", "2020-04-01"],
            "gdp" => &[100.0, 101.0],
        }
        .unwrap();

        let data = EconomicData::from_frame(frame).unwrap();
        assert_eq!(data.frame().column(DATE_COLUMN).unwrap().dtype(), &DataType::Date);
        assert_eq!(
            date_values(data.frame()).unwrap(),
            vec![Some(day(2020, 1, 1)), Some(day(2020, 4, 1))]
        );
    }

    #[test]
    fn unparseable_date_is_rejected() {
        let frame = df! {
            "date" => &["2020-01-01", "not a date"],
            "gdp" => &[100.0, 101.0],
        }
        .unwrap();

        let error = EconomicData::from_frame(frame).err().unwrap();
        assert!(matches!(error, DatasetError::InvalidDate { value, .. } if value == "not a date"));
    }

    #[test]
    fn missing_date_column_is_a_schema_error() {
        let frame = df! { "gdp" => &[100.0] }.unwrap();
        let error = EconomicData::from_frame(frame).err().unwrap();
        assert!(matches!(error, DatasetError::MissingColumn(name) if name == DATE_COLUMN));
    }

    #[test]
    fn bounds_of_empty_table_are_none() {
        let data = EconomicData::from_observations(&[]).unwrap();
        assert_eq!(date_bounds(data.frame()).unwrap(), None);
    }
}
