//! Core engine-facing contracts.
//!
//! The interface between the runtime (platform loop) and application code:
//! an [`App`] receives a [`FrameCtx`] each redraw and records into its draw
//! pipeline.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
