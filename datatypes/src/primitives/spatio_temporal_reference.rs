use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::{self, Result};
use crate::wire;

use super::{CrsId, QueryRectangle, TimeInterval};

/// The convention a result's time interval is encoded in.
///
/// Only [`TimeType::Unix`] results are admissible to the cache; the other
/// conventions exist for producers that work on cyclic or reference-year data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeType {
    Unix,
    Calendar,
    ReferenceYear,
}

impl TimeType {
    pub fn wire_tag(self) -> u16 {
        match self {
            TimeType::Unix => 0,
            TimeType::Calendar => 1,
            TimeType::ReferenceYear => 2,
        }
    }

    pub fn from_wire_tag(tag: u16) -> Result<Self> {
        match tag {
            0 => Ok(TimeType::Unix),
            1 => Ok(TimeType::Calendar),
            2 => Ok(TimeType::ReferenceYear),
            _ => Err(error::Error::UnknownTimeType { tag }),
        }
    }
}

/// The metadata stamped on every produced result: what region and interval it
/// is valid for.
///
/// The spatial bounds may be larger than the query that produced the result
/// because producers round outward to whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatioTemporalReference {
    pub crs: CrsId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub time: TimeInterval,
    pub time_type: TimeType,
}

impl SpatioTemporalReference {
    pub fn new(
        crs: CrsId,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        time: TimeInterval,
        time_type: TimeType,
    ) -> Self {
        Self {
            crs,
            x1,
            y1,
            x2,
            y2,
            time,
            time_type,
        }
    }

    /// Stamps a result with exactly the query's bounds, valid for the given
    /// interval. This is what a producer without pixel rounding uses.
    pub fn from_query(query: &QueryRectangle, time: TimeInterval) -> Self {
        Self {
            crs: query.crs,
            x1: query.x1,
            y1: query.y1,
            x2: query.x2,
            y2: query.y2,
            time,
            time_type: TimeType::Unix,
        }
    }

    pub fn span_x(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn span_y(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16_le(self.crs.0);
        buf.put_f64_le(self.x1);
        buf.put_f64_le(self.y1);
        buf.put_f64_le(self.x2);
        buf.put_f64_le(self.y2);
        self.time.encode(buf);
        buf.put_u16_le(self.time_type.wire_tag());
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let crs = CrsId(wire::get_u16(buf)?);
        let x1 = wire::get_f64(buf)?;
        let y1 = wire::get_f64(buf)?;
        let x2 = wire::get_f64(buf)?;
        let y2 = wire::get_f64(buf)?;
        let time = TimeInterval::decode(buf)?;
        let time_type = TimeType::from_wire_tag(wire::get_u16(buf)?)?;
        Ok(Self {
            crs,
            x1,
            y1,
            x2,
            y2,
            time,
            time_type,
        })
    }
}

impl std::fmt::Display for SpatioTemporalReference {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "SpatioTemporalReference[ crs: {}, time: {}, x: [{}, {}], y: [{}, {}] ]",
            self.crs, self.time, self.x1, self.x2, self.y1, self.y2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_query_copies_bounds() {
        let query =
            QueryRectangle::new(CrsId::WGS84, -10.0, 40.0, 30.0, 60.0, 100.0, 256, 128).unwrap();
        let stref = SpatioTemporalReference::from_query(&query, TimeInterval::instant(100.0));

        assert_eq!(stref.crs, CrsId::WGS84);
        assert_eq!(stref.x1, -10.0);
        assert_eq!(stref.y2, 60.0);
        assert_eq!(stref.time_type, TimeType::Unix);
    }

    #[test]
    fn encode_decode_round_trip() {
        let stref = SpatioTemporalReference::new(
            CrsId::WEB_MERCATOR,
            0.0,
            0.0,
            100.0,
            200.0,
            TimeInterval::new(10.0, 20.0).unwrap(),
            TimeType::Calendar,
        );

        let mut buf = Vec::new();
        stref.encode(&mut buf);
        let mut slice: &[u8] = &buf;
        assert_eq!(SpatioTemporalReference::decode(&mut slice).unwrap(), stref);
    }

    #[test]
    fn rejects_unknown_time_type_tag() {
        assert!(TimeType::from_wire_tag(7).is_err());
    }
}
