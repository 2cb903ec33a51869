use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::primitives::{Coordinate2D, SpatioTemporalReference, TimeInterval};
use crate::wire;

use super::feature_data::{
    attributes_byte_size, decode_attributes, decode_offsets, decode_time, encode_attributes,
    encode_offsets, encode_time, validate_attributes, validate_offsets, validate_time,
    AttributeMap,
};

/// A set of polygon features with two offset levels: `polygon_offsets`
/// partitions `ring_offsets` into polygons, `ring_offsets` partitions the
/// coordinate buffer into rings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolygonCollection {
    pub stref: SpatioTemporalReference,
    pub coordinates: Vec<Coordinate2D>,
    pub ring_offsets: Vec<u32>,
    pub polygon_offsets: Vec<u32>,
    pub time: Vec<TimeInterval>,
    pub attributes: AttributeMap,
}

impl PolygonCollection {
    pub fn new(
        stref: SpatioTemporalReference,
        coordinates: Vec<Coordinate2D>,
        ring_offsets: Vec<u32>,
        polygon_offsets: Vec<u32>,
        time: Vec<TimeInterval>,
        attributes: AttributeMap,
    ) -> Result<Self> {
        validate_offsets(&ring_offsets, coordinates.len())?;
        validate_offsets(&polygon_offsets, ring_offsets.len() - 1)?;
        let features = polygon_offsets.len() - 1;
        validate_time(&time, features)?;
        validate_attributes(&attributes, features)?;
        Ok(Self {
            stref,
            coordinates,
            ring_offsets,
            polygon_offsets,
            time,
            attributes,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.polygon_offsets.len().saturating_sub(1)
    }

    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.coordinates.len() * std::mem::size_of::<Coordinate2D>()
            + (self.ring_offsets.len() + self.polygon_offsets.len()) * std::mem::size_of::<u32>()
            + self.time.len() * std::mem::size_of::<TimeInterval>()
            + attributes_byte_size(&self.attributes)
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        self.stref.encode(buf);
        buf.put_u32_le(self.coordinates.len() as u32);
        for coordinate in &self.coordinates {
            coordinate.encode(buf);
        }
        encode_offsets(&self.ring_offsets, buf);
        encode_offsets(&self.polygon_offsets, buf);
        encode_time(&self.time, buf);
        encode_attributes(&self.attributes, buf);
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let stref = SpatioTemporalReference::decode(buf)?;
        let count = wire::get_u32(buf)? as usize;
        let mut coordinates = Vec::with_capacity(count);
        for _ in 0..count {
            coordinates.push(Coordinate2D::decode(buf)?);
        }
        let ring_offsets = decode_offsets(buf)?;
        let polygon_offsets = decode_offsets(buf)?;
        let time = decode_time(buf)?;
        let attributes = decode_attributes(buf)?;
        Self::new(
            stref,
            coordinates,
            ring_offsets,
            polygon_offsets,
            time,
            attributes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{CrsId, TimeType};

    fn stref() -> SpatioTemporalReference {
        SpatioTemporalReference::new(
            CrsId::WGS84,
            0.0,
            0.0,
            1.0,
            1.0,
            TimeInterval::instant(0.0),
            TimeType::Unix,
        )
    }

    #[test]
    fn encode_decode_round_trip() {
        // one triangle (closed ring of 4 coordinates)
        let collection = PolygonCollection::new(
            stref(),
            vec![
                (0.0, 0.0).into(),
                (1.0, 0.0).into(),
                (0.5, 1.0).into(),
                (0.0, 0.0).into(),
            ],
            vec![0, 4],
            vec![0, 1],
            vec![],
            AttributeMap::new(),
        )
        .unwrap();

        assert_eq!(collection.feature_count(), 1);

        let mut buf = Vec::new();
        collection.encode(&mut buf);
        let mut slice: &[u8] = &buf;
        assert_eq!(PolygonCollection::decode(&mut slice).unwrap(), collection);
    }

    #[test]
    fn rejects_ring_offsets_out_of_range() {
        assert!(PolygonCollection::new(
            stref(),
            vec![(0.0, 0.0).into()],
            vec![0, 2],
            vec![0, 1],
            vec![],
            AttributeMap::new(),
        )
        .is_err());
    }
}
