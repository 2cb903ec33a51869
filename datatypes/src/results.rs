//! The common capability surface of everything a producer can yield and the
//! cache can carry: byte size for eviction accounting, deep copy (`Clone`,
//! since every container owns its buffers), framed wire encoding and the
//! stamped [`SpatioTemporalReference`].

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::collections::{LineCollection, PointCollection, PolygonCollection};
use crate::error::{self, Result};
use crate::plots::Plot;
use crate::primitives::SpatioTemporalReference;
use crate::raster::GenericRaster;
use crate::wire;

/// The result kinds the system carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultKind {
    Raster,
    Points,
    Lines,
    Polygons,
    Plot,
}

impl ResultKind {
    pub fn wire_tag(self) -> u8 {
        match self {
            ResultKind::Raster => 0,
            ResultKind::Points => 1,
            ResultKind::Lines => 2,
            ResultKind::Polygons => 3,
            ResultKind::Plot => 4,
        }
    }

    pub fn from_wire_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(ResultKind::Raster),
            1 => Ok(ResultKind::Points),
            2 => Ok(ResultKind::Lines),
            3 => Ok(ResultKind::Polygons),
            4 => Ok(ResultKind::Plot),
            _ => Err(error::Error::UnknownResultKind { tag }),
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ResultKind::Raster => "raster",
            ResultKind::Points => "points",
            ResultKind::Lines => "lines",
            ResultKind::Polygons => "polygons",
            ResultKind::Plot => "plot",
        };
        f.write_str(name)
    }
}

/// Implemented by every result container
pub trait QueryResult: Clone + Send + Sync + Sized + 'static {
    const KIND: ResultKind;

    fn stref(&self) -> &SpatioTemporalReference;

    /// `(width, height)` for gridded results, `None` otherwise
    fn grid_shape(&self) -> Option<(u32, u32)>;

    /// A stable lower bound of heap occupancy; drives cache eviction
    fn byte_size(&self) -> usize;

    fn encode<B: BufMut>(&self, buf: &mut B);
    fn decode<B: Buf>(buf: &mut B) -> Result<Self>;
}

impl QueryResult for GenericRaster {
    const KIND: ResultKind = ResultKind::Raster;

    fn stref(&self) -> &SpatioTemporalReference {
        self.stref()
    }

    fn grid_shape(&self) -> Option<(u32, u32)> {
        Some((self.width(), self.height()))
    }

    fn byte_size(&self) -> usize {
        self.byte_size()
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.encode(buf);
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        GenericRaster::decode(buf)
    }
}

macro_rules! impl_query_result {
    ($t:ty, $kind:ident) => {
        impl QueryResult for $t {
            const KIND: ResultKind = ResultKind::$kind;

            fn stref(&self) -> &SpatioTemporalReference {
                &self.stref
            }

            fn grid_shape(&self) -> Option<(u32, u32)> {
                None
            }

            fn byte_size(&self) -> usize {
                self.byte_size()
            }

            fn encode<B: BufMut>(&self, buf: &mut B) {
                self.encode(buf);
            }

            fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
                <$t>::decode(buf)
            }
        }
    };
}

impl_query_result!(PointCollection, Points);
impl_query_result!(LineCollection, Lines);
impl_query_result!(PolygonCollection, Polygons);
impl_query_result!(Plot, Plot);

/// A result with its kind erased, as carried over the wire
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "camelCase")]
pub enum TypedQueryResult {
    Raster(GenericRaster),
    Points(PointCollection),
    Lines(LineCollection),
    Polygons(PolygonCollection),
    Plot(Plot),
}

impl TypedQueryResult {
    pub fn kind(&self) -> ResultKind {
        match self {
            TypedQueryResult::Raster(_) => ResultKind::Raster,
            TypedQueryResult::Points(_) => ResultKind::Points,
            TypedQueryResult::Lines(_) => ResultKind::Lines,
            TypedQueryResult::Polygons(_) => ResultKind::Polygons,
            TypedQueryResult::Plot(_) => ResultKind::Plot,
        }
    }

    pub fn byte_size(&self) -> usize {
        match self {
            TypedQueryResult::Raster(r) => r.byte_size(),
            TypedQueryResult::Points(p) => p.byte_size(),
            TypedQueryResult::Lines(l) => l.byte_size(),
            TypedQueryResult::Polygons(p) => p.byte_size(),
            TypedQueryResult::Plot(p) => p.byte_size(),
        }
    }

    /// Wire layout: the kind tag followed by the container's own framing
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.kind().wire_tag());
        match self {
            TypedQueryResult::Raster(r) => QueryResult::encode(r, buf),
            TypedQueryResult::Points(p) => QueryResult::encode(p, buf),
            TypedQueryResult::Lines(l) => QueryResult::encode(l, buf),
            TypedQueryResult::Polygons(p) => QueryResult::encode(p, buf),
            TypedQueryResult::Plot(p) => QueryResult::encode(p, buf),
        }
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let kind = ResultKind::from_wire_tag(wire::get_u8(buf)?)?;
        Ok(match kind {
            ResultKind::Raster => TypedQueryResult::Raster(GenericRaster::decode(buf)?),
            ResultKind::Points => TypedQueryResult::Points(PointCollection::decode(buf)?),
            ResultKind::Lines => TypedQueryResult::Lines(LineCollection::decode(buf)?),
            ResultKind::Polygons => TypedQueryResult::Polygons(PolygonCollection::decode(buf)?),
            ResultKind::Plot => TypedQueryResult::Plot(Plot::decode(buf)?),
        })
    }
}

impl From<GenericRaster> for TypedQueryResult {
    fn from(raster: GenericRaster) -> Self {
        TypedQueryResult::Raster(raster)
    }
}

impl From<PointCollection> for TypedQueryResult {
    fn from(points: PointCollection) -> Self {
        TypedQueryResult::Points(points)
    }
}

impl From<LineCollection> for TypedQueryResult {
    fn from(lines: LineCollection) -> Self {
        TypedQueryResult::Lines(lines)
    }
}

impl From<PolygonCollection> for TypedQueryResult {
    fn from(polygons: PolygonCollection) -> Self {
        TypedQueryResult::Polygons(polygons)
    }
}

impl From<Plot> for TypedQueryResult {
    fn from(plot: Plot) -> Self {
        TypedQueryResult::Plot(plot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{CrsId, TimeInterval, TimeType};
    use crate::raster::{Grid, Raster};

    #[test]
    fn typed_round_trip() {
        let stref = SpatioTemporalReference::new(
            CrsId::WGS84,
            0.0,
            0.0,
            4.0,
            4.0,
            TimeInterval::instant(0.0),
            TimeType::Unix,
        );
        let result: TypedQueryResult =
            GenericRaster::U8(Raster::new(stref, Grid::filled(4, 4, 9_u8, None))).into();

        let mut buf = Vec::new();
        result.encode(&mut buf);
        let mut slice: &[u8] = &buf;
        assert_eq!(TypedQueryResult::decode(&mut slice).unwrap(), result);
    }

    #[test]
    fn unknown_kind_tag_is_rejected() {
        let mut slice: &[u8] = &[42_u8];
        assert!(TypedQueryResult::decode(&mut slice).is_err());
    }
}
