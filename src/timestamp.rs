//! Entry timestamps.
//!
//! TAR headers store times as whole seconds since the Unix epoch; pax
//! extended records may add a fractional part. [`Timestamp`] keeps both so a
//! pax `mtime=1700000000.25` survives a read/append cycle.
//!
//! # Example
//!
//! ```rust
//! use tarsmith::Timestamp;
//!
//! let ts = Timestamp::from_unix_secs(1_700_000_000);
//! assert_eq!(ts.as_unix_secs(), 1_700_000_000);
//!
//! let pax = Timestamp::parse_pax("1700000000.5").unwrap();
//! assert_eq!(pax.as_unix_secs(), 1_700_000_000);
//! assert_eq!(pax.sub_second_nanos(), 500_000_000);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// A point in time, UTC, relative to the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    /// Creates a timestamp from whole Unix seconds.
    #[inline]
    pub const fn from_unix_secs(secs: i64) -> Self {
        Self { secs, nanos: 0 }
    }

    /// Creates a timestamp from Unix seconds and a sub-second part.
    ///
    /// Returns `None` if `nanos` is not below one second.
    pub fn from_unix_secs_nanos(secs: i64, nanos: u32) -> Option<Self> {
        (nanos < NANOS_PER_SECOND).then_some(Self { secs, nanos })
    }

    /// Creates a timestamp from a `SystemTime`.
    ///
    /// Times before the epoch are floored to the enclosing whole second.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self {
                secs: d.as_secs() as i64,
                nanos: d.subsec_nanos(),
            },
            Err(e) => {
                let d = e.duration();
                let mut secs = -(d.as_secs() as i64);
                let mut nanos = 0;
                if d.subsec_nanos() > 0 {
                    secs -= 1;
                    nanos = NANOS_PER_SECOND - d.subsec_nanos();
                }
                Self { secs, nanos }
            }
        }
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Parses a pax time value such as `1700000000` or `-12.000000001`.
    pub fn parse_pax(value: &str) -> Option<Self> {
        let value = value.trim();
        let (int_part, frac_part) = match value.split_once('.') {
            Some((i, f)) => (i, f),
            None => (value, ""),
        };
        let negative = int_part.starts_with('-');
        let secs: i64 = int_part.parse().ok()?;

        let mut nanos: u32 = 0;
        let mut scale = NANOS_PER_SECOND / 10;
        for c in frac_part.chars().take(9) {
            nanos += c.to_digit(10)? * scale;
            scale /= 10;
        }

        if negative && nanos > 0 {
            Some(Self {
                secs: secs - 1,
                nanos: NANOS_PER_SECOND - nanos,
            })
        } else {
            Some(Self { secs, nanos })
        }
    }

    /// Formats the timestamp as a pax time value.
    pub fn to_pax(&self) -> String {
        if self.nanos == 0 {
            return self.secs.to_string();
        }
        let (secs, nanos) = if self.secs < 0 {
            (self.secs + 1, NANOS_PER_SECOND - self.nanos)
        } else {
            (self.secs, self.nanos)
        };
        let sign = if self.secs < 0 && secs == 0 { "-" } else { "" };
        let frac = format!("{:09}", nanos);
        format!("{}{}.{}", sign, secs, frac.trim_end_matches('0'))
    }

    /// Whole seconds since the Unix epoch, floored.
    #[inline]
    pub const fn as_unix_secs(&self) -> i64 {
        self.secs
    }

    /// Sub-second part in nanoseconds.
    #[inline]
    pub const fn sub_second_nanos(&self) -> u32 {
        self.nanos
    }

    /// Converts to a `SystemTime`.
    pub fn as_system_time(&self) -> SystemTime {
        if self.secs >= 0 {
            UNIX_EPOCH + Duration::new(self.secs as u64, self.nanos)
        } else {
            UNIX_EPOCH - Duration::from_secs(self.secs.unsigned_abs())
                + Duration::from_nanos(self.nanos as u64)
        }
    }

    /// Converts to the representation used when restoring file times.
    pub fn as_file_time(&self) -> filetime::FileTime {
        filetime::FileTime::from_unix_time(self.secs, self.nanos)
    }

    /// Seconds clamped into the range a ustar header field can hold.
    pub(crate) fn header_secs(&self) -> u64 {
        self.secs.max(0) as u64
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> SystemTime {
        ts.as_system_time()
    }
}
