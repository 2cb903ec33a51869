use bytes::{Buf, BufMut};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{self, Result};
use crate::wire;

/// A validity interval in seconds since the unix epoch.
///
/// The interval is closed on both ends; whether the upper end participates in
/// temporal containment checks is decided by the caller via [`TemporalBound`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub t1: f64,
    pub t2: f64,
}

impl TimeInterval {
    pub fn new(t1: f64, t2: f64) -> Result<Self> {
        ensure!(t1 <= t2, error::InvalidTimeInterval { t1, t2 });
        Ok(Self { t1, t2 })
    }

    /// An interval that is valid for a single instant only
    pub fn instant(t: f64) -> Self {
        Self { t1: t, t2: t }
    }

    pub fn contains(&self, instant: f64, upper: TemporalBound) -> bool {
        match upper {
            TemporalBound::Closed => instant >= self.t1 && instant <= self.t2,
            TemporalBound::HalfOpen => instant >= self.t1 && instant < self.t2,
        }
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_f64_le(self.t1);
        buf.put_f64_le(self.t2);
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let t1 = wire::get_f64(buf)?;
        let t2 = wire::get_f64(buf)?;
        Self::new(t1, t2)
    }
}

/// Whether the upper end of an interval counts as inside
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemporalBound {
    Closed,
    HalfOpen,
}

impl Default for TemporalBound {
    fn default() -> Self {
        TemporalBound::Closed
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        fn iso(t: f64) -> String {
            match Utc.timestamp_opt(t as i64, 0).single() {
                Some(dt) => dt.to_rfc3339(),
                None => t.to_string(),
            }
        }
        write!(f, "[{}, {}]", iso(self.t1), iso(self.t2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_interval() {
        assert!(TimeInterval::new(2.0, 1.0).is_err());
    }

    #[test]
    fn upper_bound_modes() {
        let interval = TimeInterval::new(0.0, 10.0).unwrap();

        assert!(interval.contains(10.0, TemporalBound::Closed));
        assert!(!interval.contains(10.0, TemporalBound::HalfOpen));
        assert!(interval.contains(0.0, TemporalBound::HalfOpen));
        assert!(!interval.contains(10.1, TemporalBound::Closed));
    }
}
