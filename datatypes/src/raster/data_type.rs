use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::{self, Result};

/// The pixel types a raster can carry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterDataType {
    U8,
    U16,
    U32,
    I16,
    I32,
    F32,
    F64,
}

impl RasterDataType {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            RasterDataType::U8 => 1,
            RasterDataType::U16 | RasterDataType::I16 => 2,
            RasterDataType::U32 | RasterDataType::I32 | RasterDataType::F32 => 4,
            RasterDataType::F64 => 8,
        }
    }

    pub fn wire_tag(self) -> u8 {
        match self {
            RasterDataType::U8 => 0,
            RasterDataType::U16 => 1,
            RasterDataType::U32 => 2,
            RasterDataType::I16 => 3,
            RasterDataType::I32 => 4,
            RasterDataType::F32 => 5,
            RasterDataType::F64 => 6,
        }
    }

    pub fn from_wire_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(RasterDataType::U8),
            1 => Ok(RasterDataType::U16),
            2 => Ok(RasterDataType::U32),
            3 => Ok(RasterDataType::I16),
            4 => Ok(RasterDataType::I32),
            5 => Ok(RasterDataType::F32),
            6 => Ok(RasterDataType::F64),
            _ => Err(error::Error::UnknownRasterDataType { tag }),
        }
    }
}

impl std::fmt::Display for RasterDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Everything a grid cell type must provide: numeric behavior plus its own
/// little-endian wire encoding.
pub trait Pixel:
    'static
    + Copy
    + std::fmt::Debug
    + PartialEq
    + PartialOrd
    + Send
    + Sync
    + num_traits::Num
    + num_traits::NumCast
{
    const DATA_TYPE: RasterDataType;

    fn write_le<B: BufMut>(self, buf: &mut B);
    fn read_le<B: Buf>(buf: &mut B) -> Self;
}

macro_rules! impl_pixel {
    ($t:ty, $variant:ident, $put:ident, $get:ident) => {
        impl Pixel for $t {
            const DATA_TYPE: RasterDataType = RasterDataType::$variant;

            fn write_le<B: BufMut>(self, buf: &mut B) {
                buf.$put(self);
            }

            fn read_le<B: Buf>(buf: &mut B) -> Self {
                buf.$get()
            }
        }
    };
}

impl Pixel for u8 {
    const DATA_TYPE: RasterDataType = RasterDataType::U8;

    fn write_le<B: BufMut>(self, buf: &mut B) {
        buf.put_u8(self);
    }

    fn read_le<B: Buf>(buf: &mut B) -> Self {
        buf.get_u8()
    }
}

impl_pixel!(u16, U16, put_u16_le, get_u16_le);
impl_pixel!(u32, U32, put_u32_le, get_u32_le);
impl_pixel!(i16, I16, put_i16_le, get_i16_le);
impl_pixel!(i32, I32, put_i32_le, get_i32_le);
impl_pixel!(f32, F32, put_f32_le, get_f32_le);
impl_pixel!(f64, F64, put_f64_le, get_f64_le);
