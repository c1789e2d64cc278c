//! UTC datetime utilities without timezone dependencies.
//!
//! Used for `Date` payloads (`toISOString` form) and build metadata
//! timestamps.
//!
//! ```ignore
//! let dt = DateTimeUtc::from_millis(1_700_000_000_000).unwrap();
//! assert_eq!(dt.to_iso_string(), "2023-11-14T22:13:20.000Z");
//! ```

/// Largest magnitude a JS `Date` accepts, in milliseconds.
const MAX_DATE_MS: f64 = 8.64e15;

/// UTC datetime with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeUtc {
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millis: u16,
}

impl DateTimeUtc {
    /// Convert epoch milliseconds; `None` for values JS treats as invalid dates.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_millis(ms: f64) -> Option<Self> {
        if !ms.is_finite() || ms.abs() > MAX_DATE_MS {
            return None;
        }
        let ms = ms.trunc() as i64;
        let days = ms.div_euclid(86_400_000);
        let rem = ms.rem_euclid(86_400_000);
        let (year, month, day) = civil_from_days(days);

        Some(Self {
            year,
            month,
            day,
            hour: (rem / 3_600_000) as u8,
            minute: (rem / 60_000 % 60) as u8,
            second: (rem / 1000 % 60) as u8,
            millis: (rem % 1000) as u16,
        })
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        let ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let ms = ms as f64;
        Self::from_millis(ms).unwrap_or(Self {
            year: 1970,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            millis: 0,
        })
    }

    /// `YYYY-MM-DDTHH:MM:SS.sssZ`, with expanded years outside 0..=9999.
    pub fn to_iso_string(self) -> String {
        let year = if (0..=9999).contains(&self.year) {
            format!("{:04}", self.year)
        } else if self.year < 0 {
            format!("-{:06}", -self.year)
        } else {
            format!("+{:06}", self.year)
        };
        format!(
            "{year}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
            self.month, self.day, self.hour, self.minute, self.second, self.millis
        )
    }
}

/// Days since 1970-01-01 to (year, month, day) in the proleptic Gregorian calendar.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
