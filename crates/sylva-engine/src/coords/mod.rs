//! Geometry types shared by the texture layer and the renderer.
//!
//! Canonical spaces:
//! - texture space: integer texels, origin top-left, +Y down
//! - draw space: logical pixels, origin top-left, +Y down
//!
//! The projection uniform maps draw space to NDC.

mod rect;
mod viewport;

pub use rect::Rect;
pub use viewport::Viewport;
