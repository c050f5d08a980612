//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and windows, and wires each window to a GPU
//! context, a draw pipeline and a texture store.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
