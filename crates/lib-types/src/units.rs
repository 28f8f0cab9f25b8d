//! Physical units with type safety.
//!
//! These newtypes keep stage positions, calibrations and timestamps from
//! being mixed up (a z step in micrometers is not a time interval).

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Julian day of the Unix epoch (1970-01-01T00:00:00Z).
pub const UNIX_EPOCH_JDN: f64 = 2_440_587.5;

/// Seconds per day.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Length in micrometers.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Micrometers(pub f64);

impl Micrometers {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_nm(nm: f64) -> Self {
        Self(nm * 1e-3)
    }

    #[inline]
    pub fn as_nm(&self) -> f64 {
        self.0 * 1e3
    }
}

impl Add for Micrometers {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Micrometers {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Micrometers {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

/// Time span in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Milliseconds(pub f64);

impl Milliseconds {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_secs(secs: f64) -> Self {
        Self(secs * 1e3)
    }

    #[inline]
    pub fn as_secs(&self) -> f64 {
        self.0 * 1e-3
    }
}

impl Add for Milliseconds {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Milliseconds {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

/// Absolute time as a Julian Day Number (fractional days).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct JulianDay(pub f64);

impl JulianDay {
    /// Seconds since the Unix epoch: `(jdn - 2440587.5) * 86400`.
    #[inline]
    pub fn unix_seconds(&self) -> f64 {
        (self.0 - UNIX_EPOCH_JDN) * SECONDS_PER_DAY
    }

    /// Build from seconds since the Unix epoch.
    #[inline]
    pub fn from_unix_seconds(secs: f64) -> Self {
        Self(secs / SECONDS_PER_DAY + UNIX_EPOCH_JDN)
    }

    /// UTC calendar time, or `None` when outside the representable range.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.unix_seconds();
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::<Utc>::from_timestamp(whole as i64, nanos)
    }

    /// Local calendar time, or `None` when outside the representable range.
    pub fn to_local(&self) -> Option<DateTime<Local>> {
        self.to_utc().map(|t| t.with_timezone(&Local))
    }
}
