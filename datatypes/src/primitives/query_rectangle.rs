use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{self, Result};
use crate::wire;

/// A numeric EPSG-style coordinate reference system code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrsId(pub u16);

impl CrsId {
    pub const WGS84: CrsId = CrsId(4326);
    pub const WEB_MERCATOR: CrsId = CrsId(3857);
}

impl std::fmt::Display for CrsId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// The scope of one query: coordinate system, spatial bounds, a single time
/// instant and the requested output resolution in pixels.
///
/// Immutable once constructed; [`QueryRectangle::enlarge`] returns a new
/// rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryRectangle {
    pub crs: CrsId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    /// seconds since the unix epoch
    pub timestamp: f64,
    pub xres: u32,
    pub yres: u32,
}

impl QueryRectangle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        crs: CrsId,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        timestamp: f64,
        xres: u32,
        yres: u32,
    ) -> Result<Self> {
        ensure!(xres >= 1 && yres >= 1, error::InvalidResolution { xres, yres });
        Ok(Self {
            crs,
            x1,
            y1,
            x2,
            y2,
            timestamp,
            xres,
            yres,
        })
    }

    // Accessors tolerant to rectangles given with inverted axis sign

    pub fn minx(&self) -> f64 {
        self.x1.min(self.x2)
    }

    pub fn maxx(&self) -> f64 {
        self.x1.max(self.x2)
    }

    pub fn miny(&self) -> f64 {
        self.y1.min(self.y2)
    }

    pub fn maxy(&self) -> f64 {
        self.y1.max(self.y2)
    }

    /// Grows the bounding box by `pixels` on every side, preserving the
    /// pixel-to-world scale. The resolution grows by `2 * pixels` per axis.
    ///
    /// Operators that need a border (convolutions, rasterization) query their
    /// sources with an enlarged rectangle and crop afterwards.
    pub fn enlarge(&self, pixels: i32) -> QueryRectangle {
        let pixel_size_x = (self.x2 - self.x1).abs() / f64::from(self.xres);
        let pixel_size_y = (self.y2 - self.y1).abs() / f64::from(self.yres);

        let grow = f64::from(pixels);

        QueryRectangle {
            crs: self.crs,
            x1: self.x1 - grow * pixel_size_x,
            x2: self.x2 + grow * pixel_size_x,
            y1: self.y1 - grow * pixel_size_y,
            y2: self.y2 + grow * pixel_size_y,
            timestamp: self.timestamp,
            xres: (i64::from(self.xres) + 2 * i64::from(pixels)).max(1) as u32,
            yres: (i64::from(self.yres) + 2 * i64::from(pixels)).max(1) as u32,
        }
    }

    /// Wire layout: `timestamp, x1, y1, x2, y2` as little-endian `f64`,
    /// `xres, yres` as `u32`, the CRS code as `u16`.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_f64_le(self.timestamp);
        buf.put_f64_le(self.x1);
        buf.put_f64_le(self.y1);
        buf.put_f64_le(self.x2);
        buf.put_f64_le(self.y2);
        buf.put_u32_le(self.xres);
        buf.put_u32_le(self.yres);
        buf.put_u16_le(self.crs.0);
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let timestamp = wire::get_f64(buf)?;
        let x1 = wire::get_f64(buf)?;
        let y1 = wire::get_f64(buf)?;
        let x2 = wire::get_f64(buf)?;
        let y2 = wire::get_f64(buf)?;
        let xres = wire::get_u32(buf)?;
        let yres = wire::get_u32(buf)?;
        let crs = CrsId(wire::get_u16(buf)?);
        Self::new(crs, x1, y1, x2, y2, timestamp, xres, yres)
    }

    pub const ENCODED_LEN: usize = 5 * 8 + 2 * 4 + 2;
}

impl std::fmt::Display for QueryRectangle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "QueryRectangle[ crs: {}, timestamp: {}, x: [{}, {}], y: [{}, {}], res: {}x{} ]",
            self.crs, self.timestamp, self.x1, self.x2, self.y1, self.y2, self.xres, self.yres
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn rect() -> QueryRectangle {
        QueryRectangle::new(CrsId::WGS84, -180.0, -90.0, 180.0, 90.0, 42.0, 360, 180).unwrap()
    }

    #[test]
    fn rejects_zero_resolution() {
        assert!(QueryRectangle::new(CrsId::WGS84, 0.0, 0.0, 1.0, 1.0, 0.0, 0, 10).is_err());
    }

    #[test]
    fn encode_decode_round_trip() {
        let rect = rect();

        let mut buf = Vec::new();
        rect.encode(&mut buf);
        assert_eq!(buf.len(), QueryRectangle::ENCODED_LEN);

        let mut slice: &[u8] = &buf;
        assert_eq!(QueryRectangle::decode(&mut slice).unwrap(), rect);
    }

    #[test]
    fn decode_fails_on_short_read() {
        let mut buf = Vec::new();
        rect().encode(&mut buf);
        buf.truncate(buf.len() - 1);

        let mut slice: &[u8] = &buf;
        assert!(QueryRectangle::decode(&mut slice).is_err());
    }

    #[test]
    fn enlarge_preserves_pixel_scale() {
        let rect = rect();
        let enlarged = rect.enlarge(8);

        assert_eq!(enlarged.xres, 376);
        assert_eq!(enlarged.yres, 196);

        let scale_before = (rect.x2 - rect.x1) / f64::from(rect.xres);
        let scale_after = (enlarged.x2 - enlarged.x1) / f64::from(enlarged.xres);
        assert!(approx_eq!(f64, scale_before, scale_after, ulps = 4));
    }

    #[test]
    fn enlarge_then_shrink_restores_bounds() {
        let rect = rect();
        let restored = rect.enlarge(16).enlarge(-16);

        // bounds return to the original rectangle (up to float rounding); the
        // resolution only survives because no clamping kicked in
        assert!(approx_eq!(f64, rect.x1, restored.x1, ulps = 4));
        assert!(approx_eq!(f64, rect.x2, restored.x2, ulps = 4));
        assert!(approx_eq!(f64, rect.y1, restored.y1, ulps = 4));
        assert!(approx_eq!(f64, rect.y2, restored.y2, ulps = 4));
        assert_eq!(rect.xres, restored.xres);
        assert_eq!(rect.yres, restored.yres);
    }

    #[test]
    fn shrinking_clamps_resolution_at_one() {
        let rect = QueryRectangle::new(CrsId::WGS84, 0.0, 0.0, 8.0, 8.0, 0.0, 8, 8).unwrap();

        let shrunk = rect.enlarge(-8);
        assert_eq!(shrunk.xres, 1);

        // the clamp breaks the round trip on resolution
        assert_eq!(shrunk.enlarge(8).xres, 17);
    }

    #[test]
    fn accessors_tolerate_inverted_axes() {
        let rect =
            QueryRectangle::new(CrsId::WGS84, 10.0, 20.0, -10.0, -20.0, 0.0, 16, 16).unwrap();

        assert_eq!(rect.minx(), -10.0);
        assert_eq!(rect.maxx(), 10.0);
        assert_eq!(rect.miny(), -20.0);
        assert_eq!(rect.maxy(), 20.0);
    }
}
