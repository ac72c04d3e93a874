use std::fmt;
use std::str::FromStr;

use polars::prelude::PolarsResult;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::logging::log_event;
use crate::resample::MetricSeries;

/// Display unit for currency metrics, whose source unit is billions of dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScaleFactor {
    Millions,
    #[default]
    Billions,
    Trillions,
}

impl ScaleFactor {
    pub fn multiplier(&self) -> f64 {
        match self {
            ScaleFactor::Millions => 1000.0,
            ScaleFactor::Billions => 1.0,
            ScaleFactor::Trillions => 0.001,
        }
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScaleFactor::Millions => "millions",
            ScaleFactor::Billions => "billions",
            ScaleFactor::Trillions => "trillions",
        };
        f.write_str(name)
    }
}

impl FromStr for ScaleFactor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "millions" | "million" | "m" => Ok(ScaleFactor::Millions),
            "billions" | "billion" | "b" => Ok(ScaleFactor::Billions),
            "trillions" | "trillion" | "t" => Ok(ScaleFactor::Trillions),
            other => Err(ConfigError::UnsupportedScale(other.to_string())),
        }
    }
}

impl TryFrom<String> for ScaleFactor {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<ScaleFactor> for String {
    fn from(value: ScaleFactor) -> Self {
        value.to_string()
    }
}

/// Multiply the series' metric column by `factor`. NaN gaps stay NaN.
///
/// Applies to any metric; restricting it to currency metrics is up to the caller.
pub fn scale(series: &MetricSeries, factor: f64) -> PolarsResult<MetricSeries> {
    let scaled: Vec<f64> = series.values()?.into_iter().map(|v| v * factor).collect();
    let result = series.with_values(scaled)?;

    log_event(
        file!(),
        "UnitScaler",
        "scale",
        "units.scale",
        line!(),
        &format!("Scaled {} by {factor}", series.metric()),
        None,
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scale_names() {
        assert_eq!("Millions".parse::<ScaleFactor>().unwrap(), ScaleFactor::Millions);
        assert_eq!("t".parse::<ScaleFactor>().unwrap(), ScaleFactor::Trillions);
        assert!(matches!(
            "thousands".parse::<ScaleFactor>(),
            Err(ConfigError::UnsupportedScale(_))
        ));
    }

    #[test]
    fn billions_is_the_identity_default() {
        assert_eq!(ScaleFactor::default(), ScaleFactor::Billions);
        assert_eq!(ScaleFactor::default().multiplier(), 1.0);
        let round_trip = ScaleFactor::Millions.multiplier() * ScaleFactor::Trillions.multiplier();
        assert!((round_trip - 1.0).abs() < 1e-12);
    }
}
