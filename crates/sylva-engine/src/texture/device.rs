use std::sync::atomic::{AtomicU64, Ordering};

use crate::coords::Rect;
use crate::paint::Rgba8;

use super::TextureError;

/// Primitive surface operations a texture implementation needs.
///
/// `write_texture` is a plain replace of `bounds`; padding and region offsets
/// are applied before it is reached.
pub trait TextureDevice: Send + Sync + 'static {
    type Native: Send + Sync + 'static;

    /// Creates a `width × height` surface with every texel set to `fill`.
    fn create_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        fill: Rgba8,
    ) -> Result<Self::Native, TextureError>;

    /// Replaces the texels covered by `bounds` with `pixels` (row-major, `bounds.width` wide).
    fn write_texture(
        &self,
        native: &Self::Native,
        bounds: Rect,
        pixels: &[Rgba8],
    ) -> Result<(), TextureError>;
}

/// Process-unique texture identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}
