use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::wire;

/// A coordinate in the projection given by the surrounding container's CRS
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate2D {
    pub x: f64,
    pub y: f64,
}

impl Coordinate2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_f64_le(self.x);
        buf.put_f64_le(self.y);
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        Ok(Self {
            x: wire::get_f64(buf)?,
            y: wire::get_f64(buf)?,
        })
    }
}

impl From<(f64, f64)> for Coordinate2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Coordinate2D {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
