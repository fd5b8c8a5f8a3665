//! Identifier newtypes.
//!
//! Slack identifiers are opaque strings; [`WeekId`] is structured so it can be
//! derived from a local date and still round-trip through the store as text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier as received from the platform.
            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

platform_id!(
    /// Chat channel identifier (e.g. `C07KE8YLERZ`).
    ChannelId
);
platform_id!(
    /// Chat user identifier (e.g. `U07GELRJTNY`).
    UserId
);
platform_id!(
    /// Slack message timestamp, which doubles as the message id within a channel.
    MessageTs
);

impl MessageTs {
    /// Whole seconds since the Unix epoch encoded in the timestamp.
    ///
    /// Slack timestamps look like `1712345678.123456`.
    pub fn seconds(&self) -> Option<i64> {
        self.0.split('.').next()?.parse().ok()
    }
}

/// One challenge cycle: an ISO week-year plus ISO week number in the target zone.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeekId {
    year: i32,
    week: u32,
}

/// A string that is not a valid `YYYY-Www` week identifier.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid week id: {0}")]
pub struct InvalidWeekId(String);

impl WeekId {
    /// Build from an ISO week-year and week number (1..=53).
    pub fn new(year: i32, week: u32) -> Result<Self, InvalidWeekId> {
        if (1..=53).contains(&week) {
            Ok(Self { year, week })
        } else {
            Err(InvalidWeekId(format!("{year}-W{week}")))
        }
    }

    /// Week containing an ISO calendar week. Always valid.
    pub fn from_iso(iso: chrono::IsoWeek) -> Self {
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// ISO week-year.
    pub fn year(self) -> i32 {
        self.year
    }

    /// ISO week number.
    pub fn week(self) -> u32 {
        self.week
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekId {
    type Err = InvalidWeekId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidWeekId(s.to_string());
        let (year, week) = s.split_once("-W").ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let week: u32 = week.parse().map_err(|_| invalid())?;
        Self::new(year, week).map_err(|_| invalid())
    }
}

impl TryFrom<String> for WeekId {
    type Error = InvalidWeekId;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WeekId> for String {
    fn from(id: WeekId) -> Self {
        id.to_string()
    }
}
