//! Deferred draw command stream.
//!
//! Scene code records into a [`DrawPipeline`] during the frame; the queued
//! [`DrawCommand`]s are replayed in FIFO order against one backend recorder
//! at flush.

mod command;
mod matrix;
mod pipeline;
mod stack;
mod stats;
mod uniforms;

pub use command::{DebugDraw, DrawCommand};
pub use matrix::MatrixStack;
pub use pipeline::{DrawConfig, DrawPipeline};
pub use stack::DrawStack;
pub use stats::FrameStatistics;
pub use uniforms::{GlobalProperty, GlobalUniforms, GLOBALS_SIZE, GLOBALS_WGSL};
