mod data_type;
mod grid;

pub use data_type::{Pixel, RasterDataType};
pub use grid::Grid;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::primitives::SpatioTemporalReference;
use crate::wire;

/// A produced raster: a typed grid stamped with the region and interval it is
/// valid for
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Raster<T>
where
    T: Pixel,
{
    pub stref: SpatioTemporalReference,
    pub grid: Grid<T>,
}

impl<T> Raster<T>
where
    T: Pixel,
{
    pub fn new(stref: SpatioTemporalReference, grid: Grid<T>) -> Self {
        Self { stref, grid }
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(T::DATA_TYPE.wire_tag());
        self.stref.encode(buf);
        buf.put_u32_le(self.grid.width());
        buf.put_u32_le(self.grid.height());
        match self.grid.no_data() {
            Some(no_data) => {
                buf.put_u8(1);
                no_data.write_le(buf);
            }
            None => buf.put_u8(0),
        }
        for &pixel in self.grid.data() {
            pixel.write_le(buf);
        }
    }

    /// Decodes the part after the data type tag
    fn decode_body<B: Buf>(buf: &mut B) -> Result<Self> {
        let stref = SpatioTemporalReference::decode(buf)?;
        let width = wire::get_u32(buf)?;
        let height = wire::get_u32(buf)?;
        let no_data = match wire::get_u8(buf)? {
            0 => None,
            _ => {
                wire::ensure_remaining(buf, T::DATA_TYPE.bytes_per_pixel())?;
                Some(T::read_le(buf))
            }
        };

        let pixel_count = width as usize * height as usize;
        wire::ensure_remaining(buf, pixel_count * T::DATA_TYPE.bytes_per_pixel())?;
        let mut data = Vec::with_capacity(pixel_count);
        for _ in 0..pixel_count {
            data.push(T::read_le(buf));
        }

        Ok(Self {
            stref,
            grid: Grid::new(width, height, data, no_data)?,
        })
    }
}

/// A raster with its pixel type erased, as carried over the wire and through
/// the cache
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dataType", content = "raster")]
pub enum GenericRaster {
    U8(Raster<u8>),
    U16(Raster<u16>),
    U32(Raster<u32>),
    I16(Raster<i16>),
    I32(Raster<i32>),
    F32(Raster<f32>),
    F64(Raster<f64>),
}

/// Calls an expression on the inner `Raster<T>` of a [`GenericRaster`],
/// regardless of its pixel type
#[macro_export]
macro_rules! call_on_generic_raster {
    ($generic:expr, $raster:ident => $body:expr) => {
        match $generic {
            $crate::raster::GenericRaster::U8($raster) => $body,
            $crate::raster::GenericRaster::U16($raster) => $body,
            $crate::raster::GenericRaster::U32($raster) => $body,
            $crate::raster::GenericRaster::I16($raster) => $body,
            $crate::raster::GenericRaster::I32($raster) => $body,
            $crate::raster::GenericRaster::F32($raster) => $body,
            $crate::raster::GenericRaster::F64($raster) => $body,
        }
    };
}

macro_rules! impl_from_raster {
    ($t:ty, $variant:ident) => {
        impl From<Raster<$t>> for GenericRaster {
            fn from(raster: Raster<$t>) -> Self {
                GenericRaster::$variant(raster)
            }
        }
    };
}

impl_from_raster!(u8, U8);
impl_from_raster!(u16, U16);
impl_from_raster!(u32, U32);
impl_from_raster!(i16, I16);
impl_from_raster!(i32, I32);
impl_from_raster!(f32, F32);
impl_from_raster!(f64, F64);

impl GenericRaster {
    pub fn data_type(&self) -> RasterDataType {
        match self {
            GenericRaster::U8(_) => RasterDataType::U8,
            GenericRaster::U16(_) => RasterDataType::U16,
            GenericRaster::U32(_) => RasterDataType::U32,
            GenericRaster::I16(_) => RasterDataType::I16,
            GenericRaster::I32(_) => RasterDataType::I32,
            GenericRaster::F32(_) => RasterDataType::F32,
            GenericRaster::F64(_) => RasterDataType::F64,
        }
    }

    pub fn stref(&self) -> &SpatioTemporalReference {
        call_on_generic_raster!(self, raster => &raster.stref)
    }

    pub fn width(&self) -> u32 {
        call_on_generic_raster!(self, raster => raster.grid.width())
    }

    pub fn height(&self) -> u32 {
        call_on_generic_raster!(self, raster => raster.grid.height())
    }

    /// A stable lower bound of this raster's heap occupancy, used for cache
    /// accounting
    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.width() as usize * self.height() as usize * self.data_type().bytes_per_pixel()
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        call_on_generic_raster!(self, raster => raster.encode(buf));
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let data_type = RasterDataType::from_wire_tag(wire::get_u8(buf)?)?;
        Ok(match data_type {
            RasterDataType::U8 => GenericRaster::U8(Raster::decode_body(buf)?),
            RasterDataType::U16 => GenericRaster::U16(Raster::decode_body(buf)?),
            RasterDataType::U32 => GenericRaster::U32(Raster::decode_body(buf)?),
            RasterDataType::I16 => GenericRaster::I16(Raster::decode_body(buf)?),
            RasterDataType::I32 => GenericRaster::I32(Raster::decode_body(buf)?),
            RasterDataType::F32 => GenericRaster::F32(Raster::decode_body(buf)?),
            RasterDataType::F64 => GenericRaster::F64(Raster::decode_body(buf)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{CrsId, TimeInterval, TimeType};

    fn stref() -> SpatioTemporalReference {
        SpatioTemporalReference::new(
            CrsId::WGS84,
            0.0,
            0.0,
            10.0,
            10.0,
            TimeInterval::new(0.0, 100.0).unwrap(),
            TimeType::Unix,
        )
    }

    #[test]
    fn byte_size_counts_pixels() {
        let raster = GenericRaster::U16(Raster::new(
            stref(),
            Grid::filled(100, 50, 7_u16, None),
        ));

        assert_eq!(
            raster.byte_size(),
            std::mem::size_of::<GenericRaster>() + 100 * 50 * 2
        );
    }

    #[test]
    fn encode_decode_round_trip() {
        let raster = GenericRaster::I32(Raster::new(
            stref(),
            Grid::new(2, 2, vec![-1, 2, -3, 4], Some(-999)).unwrap(),
        ));

        let mut buf = Vec::new();
        raster.encode(&mut buf);
        let mut slice: &[u8] = &buf;
        assert_eq!(GenericRaster::decode(&mut slice).unwrap(), raster);
        assert!(slice.is_empty());
    }

    #[test]
    fn decode_fails_on_truncated_pixels() {
        let raster = GenericRaster::U8(Raster::new(
            stref(),
            Grid::filled(4, 4, 1_u8, None),
        ));

        let mut buf = Vec::new();
        raster.encode(&mut buf);
        buf.truncate(buf.len() - 3);

        let mut slice: &[u8] = &buf;
        assert!(GenericRaster::decode(&mut slice).is_err());
    }
}
