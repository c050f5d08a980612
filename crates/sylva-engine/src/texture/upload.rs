use crate::coords::Rect;
use crate::paint::Rgba8;

use super::TextureError;

/// Row-major RGBA8 pixels plus the rectangle they are written to.
///
/// `bounds` defaults to the full image extent at the origin. When uploading
/// into a [`TextureRegion`](super::TextureRegion) the bounds are relative to
/// the region; an empty rectangle means "the whole region".
#[derive(Debug, Clone, PartialEq)]
pub struct TextureUpload {
    pub bounds: Rect,
    width: u32,
    height: u32,
    data: Vec<Rgba8>,
}

impl TextureUpload {
    /// Wraps `data` as a `width × height` image.
    pub fn new(width: u32, height: u32, data: Vec<Rgba8>) -> Result<Self, TextureError> {
        let bounds = Rect::from_size(width as i32, height as i32);
        if data.len() != bounds.area() {
            return Err(TextureError::DataLength {
                bounds,
                expected: bounds.area(),
                actual: data.len(),
            });
        }

        Ok(Self { bounds, width, height, data })
    }

    /// Wraps tightly packed RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, TextureError> {
        let data = bytes
            .chunks_exact(4)
            .map(|px| Rgba8::new(px[0], px[1], px[2], px[3]))
            .collect();
        Self::new(width, height, data)
    }

    /// Decodes an encoded image (PNG) into RGBA8.
    pub fn decode(encoded: &[u8]) -> Result<Self, TextureError> {
        let image = image::load_from_memory(encoded)?.to_rgba8();
        let (width, height) = image.dimensions();
        Self::from_rgba8(width, height, image.as_raw())
    }

    /// A `width × height` image filled with one colour.
    pub fn solid(width: u32, height: u32, colour: Rgba8) -> Self {
        Self {
            bounds: Rect::from_size(width as i32, height as i32),
            width,
            height,
            data: vec![colour; width as usize * height as usize],
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[Rgba8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get((y * self.width + x) as usize).copied()
    }
}
