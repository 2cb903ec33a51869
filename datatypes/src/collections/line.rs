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

/// A set of line-string features. `line_offsets` partitions the coordinate
/// buffer; feature `i` spans `coordinates[line_offsets[i]..line_offsets[i+1]]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineCollection {
    pub stref: SpatioTemporalReference,
    pub coordinates: Vec<Coordinate2D>,
    pub line_offsets: Vec<u32>,
    pub time: Vec<TimeInterval>,
    pub attributes: AttributeMap,
}

impl LineCollection {
    pub fn new(
        stref: SpatioTemporalReference,
        coordinates: Vec<Coordinate2D>,
        line_offsets: Vec<u32>,
        time: Vec<TimeInterval>,
        attributes: AttributeMap,
    ) -> Result<Self> {
        validate_offsets(&line_offsets, coordinates.len())?;
        let features = line_offsets.len() - 1;
        validate_time(&time, features)?;
        validate_attributes(&attributes, features)?;
        Ok(Self {
            stref,
            coordinates,
            line_offsets,
            time,
            attributes,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.line_offsets.len().saturating_sub(1)
    }

    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.coordinates.len() * std::mem::size_of::<Coordinate2D>()
            + self.line_offsets.len() * std::mem::size_of::<u32>()
            + self.time.len() * std::mem::size_of::<TimeInterval>()
            + attributes_byte_size(&self.attributes)
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        self.stref.encode(buf);
        buf.put_u32_le(self.coordinates.len() as u32);
        for coordinate in &self.coordinates {
            coordinate.encode(buf);
        }
        encode_offsets(&self.line_offsets, buf);
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
        let line_offsets = decode_offsets(buf)?;
        let time = decode_time(buf)?;
        let attributes = decode_attributes(buf)?;
        Self::new(stref, coordinates, line_offsets, time, attributes)
    }
}
