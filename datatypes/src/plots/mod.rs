use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::primitives::SpatioTemporalReference;
use crate::wire;

/// A plot result: serialized chart data (JSON) stamped with the region and
/// interval it was computed for
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub stref: SpatioTemporalReference,
    pub payload: String,
}

impl Plot {
    pub fn new(stref: SpatioTemporalReference, payload: String) -> Self {
        Self { stref, payload }
    }

    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.payload.len()
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        self.stref.encode(buf);
        wire::put_string(buf, &self.payload);
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let stref = SpatioTemporalReference::decode(buf)?;
        let payload = wire::get_string(buf)?;
        Ok(Self { stref, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{CrsId, TimeInterval, TimeType};

    #[test]
    fn encode_decode_round_trip() {
        let plot = Plot::new(
            SpatioTemporalReference::new(
                CrsId::WGS84,
                0.0,
                0.0,
                1.0,
                1.0,
                TimeInterval::instant(0.0),
                TimeType::Unix,
            ),
            r#"{"buckets":[1,2,3]}"#.to_string(),
        );

        let mut buf = Vec::new();
        plot.encode(&mut buf);
        let mut slice: &[u8] = &buf;
        assert_eq!(Plot::decode(&mut slice).unwrap(), plot);
    }
}
