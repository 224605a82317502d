//! Timecode parsing and formatting.
//!
//! Plot outlines use `HH:MM:SS` timestamps with unbounded hours; `MM:SS`
//! is accepted on input. All arithmetic is in whole seconds.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors from parsing a timecode string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimecodeError {
    #[error("timecode is empty")]
    Empty,
    #[error("timecode '{0}' must have 2 or 3 colon-separated fields")]
    FieldCount(String),
    #[error("timecode '{0}' has a non-numeric field")]
    NonNumeric(String),
    #[error("timecode '{0}' has minutes or seconds >= 60")]
    FieldRange(String),
}

/// A point in time within a video, stored as whole seconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(transparent)]
pub struct Timecode(pub u64);

impl Timecode {
    /// Construct from a raw second count.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Total seconds.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds between two timecodes (saturating).
    pub fn duration_until(&self, later: Timecode) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

impl FromStr for Timecode {
    type Err = TimecodeError;

    /// Parse `MM:SS` or `HH:MM:SS`. Hours are unbounded; minutes and
    /// seconds must be below 60.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TimecodeError::Empty);
        }

        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != 2 && fields.len() != 3 {
            return Err(TimecodeError::FieldCount(s.to_string()));
        }

        let mut parsed = Vec::with_capacity(3);
        for field in &fields {
            let n: u64 = field
                .trim()
                .parse()
                .map_err(|_| TimecodeError::NonNumeric(s.to_string()))?;
            parsed.push(n);
        }

        let (hours, minutes, seconds) = match parsed.as_slice() {
            [m, sec] => (0, *m, *sec),
            [h, m, sec] => (*h, *m, *sec),
            _ => unreachable!(),
        };

        if minutes >= 60 || seconds >= 60 {
            return Err(TimecodeError::FieldRange(s.to_string()));
        }

        Ok(Self(hours * 3600 + minutes * 60 + seconds))
    }
}

impl fmt::Display for Timecode {
    /// Always renders as `HH:MM:SS`; hours widen past two digits as needed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3600;
        let minutes = (self.0 % 3600) / 60;
        let seconds = self.0 % 60;
        write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}
