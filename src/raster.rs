use std::ops::Index;

use crate::{Color, Colorspace, Header};

/// A decoded image: `width * height` colors stored row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    colorspace: Colorspace,
    pixels: Vec<Color>,
}

impl Image {
    pub(crate) fn new(header: Header, pixels: Vec<Color>) -> Self {
        debug_assert_eq!(Some(pixels.len()), header.n_pixels());
        Self {
            width: header.width,
            height: header.height,
            colorspace: header.colorspace,
            pixels,
        }
    }

    /// Builds an image from pixels in raster order.
    ///
    /// Returns `None` when `pixels.len()` is not `width * height`.
    pub fn from_pixels(
        width: u32,
        height: u32,
        colorspace: Colorspace,
        pixels: Vec<Color>,
    ) -> Option<Self> {
        let expected = (width as usize).checked_mul(height as usize)?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            colorspace,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color space declared in the header. It plays no part in decoding.
    pub fn colorspace(&self) -> Colorspace {
        self.colorspace
    }

    /// All pixels in raster order.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<Color> {
        self.pixels
    }

    /// Iterates over the rows, top to bottom.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[Color]> {
        // `chunks_exact` panics on a zero chunk size.
        let width = (self.width as usize).max(1);
        let rows = if self.width == 0 { 0 } else { self.height as usize };
        self.pixels.chunks_exact(width).take(rows)
    }

    /// Color at `(x, y)`, or `None` outside the image.
    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        (x < self.width && y < self.height)
            .then(|| self.pixels[self.offset(x, y)])
    }

    /// Color at `(x, y)`.
    ///
    /// # Panics
    ///
    /// If the coordinate lies outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self[(x, y)]
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl Index<(u32, u32)> for Image {
    type Output = Color;

    fn index(&self, (x, y): (u32, u32)) -> &Color {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for a {}x{} image",
            self.width,
            self.height
        );
        &self.pixels[self.offset(x, y)]
    }
}
