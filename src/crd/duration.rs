//! Go-style duration strings
//!
//! Backup TTLs travel as Go `time.Duration` strings (`"720h"`, `"15m30s"`)
//! and are stored back in canonical form (`"720h0m0s"`).

use crate::error::{Error, Result};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const NANOSECOND: u128 = 1;
const MICROSECOND: u128 = 1_000 * NANOSECOND;
const MILLISECOND: u128 = 1_000 * MICROSECOND;
const SECOND: u128 = 1_000 * MILLISECOND;
const MINUTE: u128 = 60 * SECOND;
const HOUR: u128 = 60 * MINUTE;

/// Largest duration representable by Go's int64 nanoseconds
const MAX_NANOS: u128 = i64::MAX as u128;

/// A non-negative duration with Go `time.Duration` text encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GoDuration(Duration);

impl GoDuration {
    pub const fn from_hours(hours: u64) -> Self {
        Self(Duration::from_secs(hours * 3600))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for GoDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(NANOSECOND),
        "us" | "µs" | "μs" => Some(MICROSECOND),
        "ms" => Some(MILLISECOND),
        "s" => Some(SECOND),
        "m" => Some(MINUTE),
        "h" => Some(HOUR),
        _ => None,
    }
}

impl FromStr for GoDuration {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = || Error::DurationParse(format!("time: invalid duration \"{}\"", input));

        let mut rest = input;
        if let Some(stripped) = rest.strip_prefix('+') {
            rest = stripped;
        } else if rest.starts_with('-') {
            return Err(Error::DurationParse(format!(
                "duration \"{}\" must not be negative",
                input
            )));
        }

        if rest == "0" {
            return Ok(Self::default());
        }
        if rest.is_empty() {
            return Err(invalid());
        }

        let mut total: u128 = 0;
        while !rest.is_empty() {
            let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            let (int_part, after_int) = rest.split_at(int_len);

            let (frac_part, after_num) = match after_int.strip_prefix('.') {
                Some(after_dot) => {
                    let frac_len = after_dot
                        .find(|c: char| !c.is_ascii_digit())
                        .unwrap_or(after_dot.len());
                    after_dot.split_at(frac_len)
                }
                None => ("", after_int),
            };
            if int_part.is_empty() && frac_part.is_empty() {
                return Err(invalid());
            }

            let unit_len = after_num
                .find(|c: char| c == '.' || c.is_ascii_digit())
                .unwrap_or(after_num.len());
            let (unit, next) = after_num.split_at(unit_len);
            if unit.is_empty() {
                return Err(Error::DurationParse(format!(
                    "time: missing unit in duration \"{}\"",
                    input
                )));
            }
            let scale = unit_nanos(unit).ok_or_else(|| {
                Error::DurationParse(format!(
                    "time: unknown unit \"{}\" in duration \"{}\"",
                    unit, input
                ))
            })?;

            let whole: u128 = if int_part.is_empty() {
                0
            } else {
                int_part.parse().map_err(|_| invalid())?
            };
            let mut value = whole.checked_mul(scale).ok_or_else(invalid)?;

            // Digits beyond nanosecond precision are dropped, as Go does.
            let mut place = scale;
            for digit in frac_part.bytes() {
                place /= 10;
                if place == 0 {
                    break;
                }
                value += u128::from(digit - b'0') * place;
            }

            total = total.checked_add(value).ok_or_else(invalid)?;
            if total > MAX_NANOS {
                return Err(invalid());
            }
            rest = next;
        }

        let secs = (total / SECOND) as u64;
        let nanos = (total % SECOND) as u32;
        Ok(Self(Duration::new(secs, nanos)))
    }
}

/// Render `value / unit` with a trimmed decimal fraction
fn write_fraction(f: &mut fmt::Formatter<'_>, value: u128, unit: u128) -> fmt::Result {
    let whole = value / unit;
    let mut frac = value % unit;
    write!(f, "{}", whole)?;
    if frac == 0 {
        return Ok(());
    }
    let mut width = unit.to_string().len() - 1;
    while frac % 10 == 0 {
        frac /= 10;
        width -= 1;
    }
    write!(f, ".{:0width$}", frac, width = width)
}

impl fmt::Display for GoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0.as_nanos();
        if n == 0 {
            return write!(f, "0s");
        }
        if n < SECOND {
            return if n < MICROSECOND {
                write!(f, "{}ns", n)
            } else if n < MILLISECOND {
                write_fraction(f, n, MICROSECOND)?;
                write!(f, "µs")
            } else {
                write_fraction(f, n, MILLISECOND)?;
                write!(f, "ms")
            };
        }

        let hours = n / HOUR;
        let minutes = (n % HOUR) / MINUTE;
        let seconds = n % MINUTE;
        if hours > 0 {
            write!(f, "{}h{}m", hours, minutes)?;
        } else if minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        write_fraction(f, seconds, SECOND)?;
        write!(f, "s")
    }
}

impl Serialize for GoDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GoDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for GoDuration {
    fn schema_name() -> String {
        "GoDuration".to_owned()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }

    fn is_referenceable() -> bool {
        false
    }
}
