use parking_lot::Mutex;

use crate::coords::Rect;
use crate::paint::Rgba8;

use super::{TextureDevice, TextureError};

/// Texture device backed by host memory.
///
/// Used for headless tooling and tests; every write is recorded so callers can
/// inspect what reached the surface and in which order.
#[derive(Debug, Default)]
pub struct CpuTextureDevice;

/// Host-memory surface created by [`CpuTextureDevice`].
#[derive(Debug)]
pub struct CpuSurface {
    width: u32,
    height: u32,
    state: Mutex<CpuSurfaceState>,
}

#[derive(Debug)]
struct CpuSurfaceState {
    pixels: Vec<Rgba8>,
    writes: Vec<Rect>,
}

impl CpuSurface {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reads one texel. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        assert!(x < self.width && y < self.height, "({x}, {y}) outside surface");
        self.state.lock().pixels[(y * self.width + x) as usize]
    }

    /// Rectangles written so far, in order.
    pub fn writes(&self) -> Vec<Rect> {
        self.state.lock().writes.clone()
    }

    pub fn snapshot(&self) -> Vec<Rgba8> {
        self.state.lock().pixels.clone()
    }
}

impl TextureDevice for CpuTextureDevice {
    type Native = CpuSurface;

    fn create_texture(
        &self,
        _label: &str,
        width: u32,
        height: u32,
        fill: Rgba8,
    ) -> Result<CpuSurface, TextureError> {
        Ok(CpuSurface {
            width,
            height,
            state: Mutex::new(CpuSurfaceState {
                pixels: vec![fill; width as usize * height as usize],
                writes: Vec::new(),
            }),
        })
    }

    fn write_texture(
        &self,
        native: &CpuSurface,
        bounds: Rect,
        pixels: &[Rgba8],
    ) -> Result<(), TextureError> {
        let surface = Rect::from_size(native.width as i32, native.height as i32);
        if !surface.contains_rect(bounds) {
            return Err(TextureError::OutOfSurface {
                bounds,
                width: native.width,
                height: native.height,
            });
        }
        if pixels.len() != bounds.area() {
            return Err(TextureError::DataLength {
                bounds,
                expected: bounds.area(),
                actual: pixels.len(),
            });
        }

        let mut state = native.state.lock();
        let stride = native.width as usize;
        let row_len = bounds.width.max(0) as usize;

        for (row, src) in pixels.chunks_exact(row_len.max(1)).enumerate().take(bounds.height.max(0) as usize) {
            let start = (bounds.y as usize + row) * stride + bounds.x as usize;
            state.pixels[start..start + row_len].copy_from_slice(&src[..row_len]);
        }

        state.writes.push(bounds);
        Ok(())
    }
}
