use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// The two sentinel ids reserved for tests; they bypass calendar validation
/// entirely (`spec.md` §3).
const SENTINELS: [&str; 2] = ["9999-99-99-99-99-99", "8888-88-88-88-88-88"];

/// A `cr_id` string: either a real `YYYY-MM-DD-HH-MM-SS` timestamp or one of
/// the two test sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeStamp(String);

#[derive(Debug, thiserror::Error)]
pub enum TimeStampError {
    #[error("'{0}' is not a valid cr_id timestamp (expected YYYY-MM-DD-HH-MM-SS or a test sentinel)")]
    InvalidFormat(String),
}

impl TimeStamp {
    pub fn parse(s: &str) -> Result<Self, TimeStampError> {
        if SENTINELS.contains(&s) {
            return Ok(Self(s.to_string()));
        }
        NaiveDateTime::parse_from_str(s, FORMAT)
            .map_err(|_| TimeStampError::InvalidFormat(s.to_string()))?;
        Ok(Self(s.to_string()))
    }

    pub fn is_sentinel(&self) -> bool {
        SENTINELS.contains(&self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `cr_id` for the current instant, suitable as a fresh change-request id.
    pub fn now(now: NaiveDateTime) -> Self {
        Self(now.format(FORMAT).to_string())
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TimeStamp {
    type Err = TimeStampError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeStamp {
    type Error = TimeStampError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeStamp> for String {
    fn from(value: TimeStamp) -> Self {
        value.0
    }
}
