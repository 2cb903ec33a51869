use std::collections::BTreeMap;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{self, Result};
use crate::primitives::TimeInterval;
use crate::wire;

/// One attribute column of a feature collection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureData {
    Number(Vec<f64>),
    Text(Vec<String>),
}

impl FeatureData {
    pub fn len(&self) -> usize {
        match self {
            FeatureData::Number(values) => values.len(),
            FeatureData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_size(&self) -> usize {
        match self {
            FeatureData::Number(values) => values.len() * std::mem::size_of::<f64>(),
            FeatureData::Text(values) => values
                .iter()
                .map(|s| std::mem::size_of::<String>() + s.len())
                .sum(),
        }
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        match self {
            FeatureData::Number(values) => {
                buf.put_u8(0);
                buf.put_u32_le(values.len() as u32);
                for &v in values {
                    buf.put_f64_le(v);
                }
            }
            FeatureData::Text(values) => {
                buf.put_u8(1);
                buf.put_u32_le(values.len() as u32);
                for v in values {
                    wire::put_string(buf, v);
                }
            }
        }
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let tag = wire::get_u8(buf)?;
        let len = wire::get_u32(buf)? as usize;
        match tag {
            0 => {
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(wire::get_f64(buf)?);
                }
                Ok(FeatureData::Number(values))
            }
            1 => {
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(wire::get_string(buf)?);
                }
                Ok(FeatureData::Text(values))
            }
            _ => Err(error::Error::UnknownAttributeTag { tag }),
        }
    }
}

/// `BTreeMap` keeps the encode order deterministic
pub type AttributeMap = BTreeMap<String, FeatureData>;

pub(super) fn validate_attributes(attributes: &AttributeMap, features: usize) -> Result<()> {
    for (column, data) in attributes {
        ensure!(
            data.len() == features,
            error::AttributeLengthMismatch {
                column: column.clone(),
                values: data.len(),
                features,
            }
        );
    }
    Ok(())
}

pub(super) fn validate_time(time: &[TimeInterval], features: usize) -> Result<()> {
    ensure!(
        time.is_empty() || time.len() == features,
        error::TimeLengthMismatch {
            entries: time.len(),
            features,
        }
    );
    Ok(())
}

/// Offsets partition a buffer into features: they start at 0, never decrease
/// and end at the buffer length.
pub(super) fn validate_offsets(offsets: &[u32], buffer_len: usize) -> Result<()> {
    let valid = offsets.first() == Some(&0)
        && offsets.windows(2).all(|w| w[0] <= w[1])
        && offsets.last() == Some(&(buffer_len as u32));
    ensure!(valid, error::InvalidFeatureOffsets);
    Ok(())
}

pub(super) fn attributes_byte_size(attributes: &AttributeMap) -> usize {
    attributes
        .iter()
        .map(|(name, data)| name.len() + data.byte_size())
        .sum()
}

pub(super) fn encode_attributes<B: BufMut>(attributes: &AttributeMap, buf: &mut B) {
    buf.put_u32_le(attributes.len() as u32);
    for (name, data) in attributes {
        wire::put_string(buf, name);
        data.encode(buf);
    }
}

pub(super) fn decode_attributes<B: Buf>(buf: &mut B) -> Result<AttributeMap> {
    let count = wire::get_u32(buf)? as usize;
    let mut attributes = AttributeMap::new();
    for _ in 0..count {
        let name = wire::get_string(buf)?;
        attributes.insert(name, FeatureData::decode(buf)?);
    }
    Ok(attributes)
}

pub(super) fn encode_time<B: BufMut>(time: &[TimeInterval], buf: &mut B) {
    buf.put_u32_le(time.len() as u32);
    for interval in time {
        interval.encode(buf);
    }
}

pub(super) fn decode_time<B: Buf>(buf: &mut B) -> Result<Vec<TimeInterval>> {
    let count = wire::get_u32(buf)? as usize;
    let mut time = Vec::with_capacity(count);
    for _ in 0..count {
        time.push(TimeInterval::decode(buf)?);
    }
    Ok(time)
}

pub(super) fn encode_offsets<B: BufMut>(offsets: &[u32], buf: &mut B) {
    buf.put_u32_le(offsets.len() as u32);
    for &offset in offsets {
        buf.put_u32_le(offset);
    }
}

pub(super) fn decode_offsets<B: Buf>(buf: &mut B) -> Result<Vec<u32>> {
    let count = wire::get_u32(buf)? as usize;
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        offsets.push(wire::get_u32(buf)?);
    }
    Ok(offsets)
}
