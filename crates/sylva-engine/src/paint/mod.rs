//! Colour and pixel types.
//!
//! - [`Color`] is the float colour used for clears and vertex tints.
//! - [`Rgba8`] is the texel format exchanged with textures.

pub mod color;
pub mod pixel;

pub use color::Color;
pub use pixel::Rgba8;
