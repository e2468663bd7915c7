//! Cache naming policies
//!
//! The cache name identifies the bucket for the current deployment. Any
//! bucket with a different name is stale and is purged on activation.

use crate::error::{OffcacheError, OffcacheResult};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format of a build stamp: `YYYYMMDD.HHMMSS`
const BUILD_STAMP_FORMAT: &str = "%Y%m%d.%H%M%S";

/// Source of the current date
pub trait Clock: Send + Sync {
    /// Today's date in the local calendar
    fn today(&self) -> NaiveDate;
}

/// Clock reading the system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Timestamp baked into the cache name at site generation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStamp(String);

impl BuildStamp {
    /// Generate a stamp for the given instant
    pub fn generate<Tz: TimeZone>(now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(now.format(BUILD_STAMP_FORMAT).to_string())
    }

    /// Generate a stamp for the current local time
    pub fn now() -> Self {
        Self::generate(&Local::now())
    }

    /// Validate a configured stamp
    pub fn parse(stamp: &str) -> OffcacheResult<Self> {
        NaiveDateTime::parse_from_str(stamp, BUILD_STAMP_FORMAT)
            .map(|_| Self(stamp.to_string()))
            .map_err(|_| OffcacheError::InvalidBuildStamp {
                stamp: stamp.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Policy kind as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// `{month}-{day}` from the local date
    #[default]
    Date,
    /// `<prefix>-<build stamp>` fixed at generation time
    Build,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date => write!(f, "date"),
            Self::Build => write!(f, "build"),
        }
    }
}

/// How the current cache name is computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheNamingPolicy {
    /// Changes every calendar day, whether or not content changed
    Date,
    /// Changes once per publish
    Build { prefix: String, stamp: BuildStamp },
}

impl CacheNamingPolicy {
    /// Build a policy from its configured parts
    pub fn from_parts(
        kind: PolicyKind,
        prefix: &str,
        stamp: Option<&str>,
    ) -> OffcacheResult<Self> {
        match kind {
            PolicyKind::Date => Ok(Self::Date),
            PolicyKind::Build => {
                let stamp = stamp.ok_or(OffcacheError::MissingBuildStamp)?;
                Ok(Self::Build {
                    prefix: prefix.to_string(),
                    stamp: BuildStamp::parse(stamp)?,
                })
            }
        }
    }

    /// Compute the cache name for the given clock
    pub fn cache_name(&self, clock: &dyn Clock) -> String {
        match self {
            Self::Date => Self::date_name(clock.today()),
            Self::Build { prefix, stamp } => format!("{}-{}", prefix, stamp),
        }
    }

    /// `{month}-{day}`, 1-indexed month, no zero padding
    fn date_name(date: NaiveDate) -> String {
        format!("{}-{}", date.month(), date.day())
    }
}
