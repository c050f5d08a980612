//! Sylva engine crate.
//!
//! Texture atlasing with bleed-free padded uploads, a deferred draw command
//! stream replayed against a graphics backend, and the window/GPU runtime that
//! drives both once per frame.

pub mod device;
pub mod window;
pub mod core;

pub mod logging;
pub mod coords;
pub mod paint;
pub mod texture;
pub mod gfx;
pub mod shaders;
pub mod render;
