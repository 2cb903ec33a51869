use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::primitives::{Coordinate2D, SpatioTemporalReference, TimeInterval};
use crate::wire;

use super::feature_data::{
    attributes_byte_size, decode_attributes, decode_time, encode_attributes, encode_time,
    validate_attributes, validate_time, AttributeMap,
};

/// A set of point features with optional per-feature time and attributes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointCollection {
    pub stref: SpatioTemporalReference,
    pub coordinates: Vec<Coordinate2D>,
    /// one interval per feature, or empty when the stref interval applies
    pub time: Vec<TimeInterval>,
    pub attributes: AttributeMap,
}

impl PointCollection {
    pub fn new(
        stref: SpatioTemporalReference,
        coordinates: Vec<Coordinate2D>,
        time: Vec<TimeInterval>,
        attributes: AttributeMap,
    ) -> Result<Self> {
        validate_time(&time, coordinates.len())?;
        validate_attributes(&attributes, coordinates.len())?;
        Ok(Self {
            stref,
            coordinates,
            time,
            attributes,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.coordinates.len()
    }

    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.coordinates.len() * std::mem::size_of::<Coordinate2D>()
            + self.time.len() * std::mem::size_of::<TimeInterval>()
            + attributes_byte_size(&self.attributes)
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        self.stref.encode(buf);
        buf.put_u32_le(self.coordinates.len() as u32);
        for coordinate in &self.coordinates {
            coordinate.encode(buf);
        }
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
        let time = decode_time(buf)?;
        let attributes = decode_attributes(buf)?;
        Self::new(stref, coordinates, time, attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::FeatureData;
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
    fn rejects_attribute_length_mismatch() {
        let mut attributes = AttributeMap::new();
        attributes.insert("population".into(), FeatureData::Number(vec![1.0, 2.0]));

        assert!(PointCollection::new(
            stref(),
            vec![(0.1, 0.2).into()],
            vec![],
            attributes
        )
        .is_err());
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut attributes = AttributeMap::new();
        attributes.insert("name".into(), FeatureData::Text(vec!["a".into(), "b".into()]));
        attributes.insert("value".into(), FeatureData::Number(vec![1.5, -2.5]));

        let collection = PointCollection::new(
            stref(),
            vec![(0.1, 0.2).into(), (0.3, 0.4).into()],
            vec![TimeInterval::instant(1.0), TimeInterval::instant(2.0)],
            attributes,
        )
        .unwrap();

        let mut buf = Vec::new();
        collection.encode(&mut buf);
        let mut slice: &[u8] = &buf;
        assert_eq!(PointCollection::decode(&mut slice).unwrap(), collection);
    }
}
