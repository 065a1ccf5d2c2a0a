//! Statistics window periods
//!
//! Windows are measured in 5-minute intervals. Both `24h` and `1d`
//! map to 288 intervals; the duplicate spelling is part of the public
//! query surface and must stay.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds covered by one statistics interval.
pub const INTERVAL_SECONDS: i64 = 5 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid period: {0}")]
pub struct InvalidPeriod(pub String);

/// A ranking/statistics lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    FifteenMinutes,
    OneHour,
    SixHours,
    OneDay,
    TwentyFourHours,
    SevenDays,
    ThirtyDays,
}

impl Period {
    /// Number of 5-minute intervals in the window.
    pub fn epochs(self) -> i64 {
        match self {
            Period::FifteenMinutes => 3,
            Period::OneHour => 12,
            Period::SixHours => 72,
            Period::OneDay => 288,
            Period::TwentyFourHours => 288,
            Period::SevenDays => 2016,
            Period::ThirtyDays => 8640,
        }
    }

    /// Window length in seconds.
    pub fn seconds(self) -> i64 {
        self.epochs() * INTERVAL_SECONDS
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::FifteenMinutes => "15m",
            Period::OneHour => "1h",
            Period::SixHours => "6h",
            Period::OneDay => "1d",
            Period::TwentyFourHours => "24h",
            Period::SevenDays => "7d",
            Period::ThirtyDays => "30d",
        }
    }

    pub fn parse(name: &str) -> Result<Self, InvalidPeriod> {
        match name {
            "15m" => Ok(Period::FifteenMinutes),
            "1h" => Ok(Period::OneHour),
            "6h" => Ok(Period::SixHours),
            "1d" => Ok(Period::OneDay),
            "24h" => Ok(Period::TwentyFourHours),
            "7d" => Ok(Period::SevenDays),
            "30d" => Ok(Period::ThirtyDays),
            other => Err(InvalidPeriod(other.to_string())),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = InvalidPeriod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Period::parse(&value)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.as_str().to_string()
    }
}
