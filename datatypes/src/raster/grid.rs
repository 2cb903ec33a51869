use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{self, Result};

use super::Pixel;

/// A dense row-major 2D pixel buffer with an optional no-data value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid<T>
where
    T: Pixel,
{
    width: u32,
    height: u32,
    no_data: Option<T>,
    data: Vec<T>,
}

impl<T> Grid<T>
where
    T: Pixel,
{
    pub fn new(width: u32, height: u32, data: Vec<T>, no_data: Option<T>) -> Result<Self> {
        ensure!(
            data.len() == width as usize * height as usize,
            error::GridDimensionMismatch {
                width,
                height,
                len: data.len(),
            }
        );
        Ok(Self {
            width,
            height,
            no_data,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, value: T, no_data: Option<T>) -> Self {
        Self {
            width,
            height,
            no_data,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn no_data(&self) -> Option<T> {
        self.no_data
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn value_at(&self, x: u32, y: u32) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y as usize * self.width as usize + x as usize])
    }

    /// Applies `f` to every pixel, leaving no-data pixels untouched
    pub fn map_pixels<F>(&self, f: F) -> Grid<T>
    where
        F: Fn(T) -> T,
    {
        let data = self
            .data
            .iter()
            .map(|&v| match self.no_data {
                Some(no_data) if v == no_data => v,
                _ => f(v),
            })
            .collect();

        Grid {
            width: self.width,
            height: self.height,
            no_data: self.no_data,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(Grid::new(3, 2, vec![0_u8; 5], None).is_err());
        assert!(Grid::new(3, 2, vec![0_u8; 6], None).is_ok());
    }

    #[test]
    fn value_access() {
        let grid = Grid::new(2, 2, vec![1_u8, 2, 3, 4], None).unwrap();

        assert_eq!(grid.value_at(0, 0), Some(1));
        assert_eq!(grid.value_at(1, 1), Some(4));
        assert_eq!(grid.value_at(2, 0), None);
    }

    #[test]
    fn map_pixels_skips_no_data() {
        let grid = Grid::new(2, 1, vec![1_u8, 255], Some(255)).unwrap();
        let doubled = grid.map_pixels(|v| v * 2);

        assert_eq!(doubled.data(), &[2, 255]);
    }
}
