use winit::window::{Window, WindowId};

use crate::coords::Viewport;
use crate::gfx::WgpuBackend;
use crate::render::DrawPipeline;
use crate::texture::TextureStore;
use crate::window::RuntimeCtx;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Returns the logical window size as `(width, height)` in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let phys = self.window.inner_size();
        let scale = self.window.scale_factor();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(scale);
        (logi.width as f32, logi.height as f32)
    }

    pub fn viewport(&self) -> Viewport {
        let (w, h) = self.logical_size();
        Viewport::new(w, h)
    }
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// The projection uniform for `viewport` is already queued when the app sees
/// the pipeline; the runtime ends and flushes the frame after the callback.
pub struct FrameCtx<'a> {
    pub window: WindowCtx<'a>,
    pub draw: &'a mut DrawPipeline<WgpuBackend>,
    pub backend: &'a WgpuBackend,
    pub textures: &'a TextureStore<WgpuBackend>,
    pub viewport: Viewport,
    pub runtime: &'a mut RuntimeCtx,
}
