//! Branch-local time and fiscal periods
//!
//! Branches trade in their own timezone: "today" for a daily discount limit
//! is the branch's calendar day, not the UTC one. Fiscal periods tag journal
//! entries for period-close reporting.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

use crate::identifiers::{BranchId, FiscalPeriodId};

/// Timezone wrapper for branch locations
///
/// Wraps chrono_tz::Tz with string serialization ("Asia/Riyadh").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timezone::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// The branch-local calendar date of an instant
    pub fn local_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.0).date_naive()
    }

    /// UTC bounds `[start, end)` of a branch-local calendar day
    ///
    /// On DST transitions the earliest valid local midnight is used.
    pub fn day_bounds(&self, date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), TemporalError> {
        let next = date
            .succ_opt()
            .ok_or(TemporalError::DateOutOfRange(date))?;
        Ok((self.local_midnight(date)?, self.local_midnight(next)?))
    }

    fn local_midnight(&self, date: NaiveDate) -> Result<DateTime<Utc>, TemporalError> {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or(TemporalError::DateOutOfRange(date))?;
        naive
            .and_local_timezone(self.0)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or(TemporalError::DateOutOfRange(date))
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Date out of range: {0}")]
    DateOutOfRange(NaiveDate),
}

/// A branch-scoped accounting sub-period (usually a month)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub id: FiscalPeriodId,
    pub branch_id: BranchId,
    pub fiscal_year: i32,
    pub period: u32,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub is_closed: bool,
}

impl FiscalPeriod {
    pub fn new(
        id: FiscalPeriodId,
        branch_id: BranchId,
        fiscal_year: i32,
        period: u32,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> Result<Self, TemporalError> {
        if starts_on > ends_on {
            return Err(TemporalError::InvalidPeriod {
                start: starts_on,
                end: ends_on,
            });
        }
        Ok(Self {
            id,
            branch_id,
            fiscal_year,
            period,
            starts_on,
            ends_on,
            is_closed: false,
        })
    }

    /// Inclusive on both ends
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.starts_on && date <= self.ends_on
    }
}
