use anyhow::Result;

use crate::paint::Color;

use super::descriptor::{
    BindableResource, BufferUsage, PipelineDescription, ResourceDescription, ShaderDescription,
};

/// Native graphics API seen by the draw pipeline.
///
/// Handles are cheap clones of reference-counted native objects, so a queued
/// draw command keeps everything it references alive until it has executed.
pub trait GraphicsBackend: Clone + 'static {
    type Buffer: Clone + 'static;
    type ShaderModule: Clone + 'static;
    type Pipeline: Clone + 'static;
    type ResourceLayout: Clone + 'static;
    type ResourceSet: Clone + 'static;
    type TextureView: Clone + 'static;
    type Sampler: Clone + 'static;
    /// What a frame is recorded into (a swapchain image for wgpu).
    type Target: 'static;
    type Recorder: CommandRecorder<Self> + 'static;

    fn compile_shader(&self, desc: &ShaderDescription) -> Result<Self::ShaderModule>;

    fn create_buffer(&self, label: &str, contents: &[u8], usage: BufferUsage) -> Self::Buffer;

    fn create_resource_layout(&self, label: &str, resources: &[ResourceDescription]) -> Self::ResourceLayout;

    fn create_resource_set(
        &self,
        layout: &Self::ResourceLayout,
        resources: &[BindableResource<Self>],
    ) -> Result<Self::ResourceSet>;

    fn create_pipeline(&self, desc: &PipelineDescription<Self>) -> Result<Self::Pipeline>;

    /// Layout of the global uniform block bound at slot 0.
    fn global_layout(&self) -> Self::ResourceLayout;

    /// Resource set holding the global uniform block.
    fn global_set(&self) -> Self::ResourceSet;

    fn default_sampler(&self) -> Self::Sampler;

    fn begin_recording(&self, target: Self::Target) -> Self::Recorder;

    /// Finishes `recorder`, submits it and presents the target.
    fn submit(&self, recorder: Self::Recorder) -> Result<()>;
}

/// One frame's worth of native command recording.
///
/// Calls arrive in the exact order draw commands were queued.
pub trait CommandRecorder<B: GraphicsBackend> {
    /// Starts recording into the target, clearing it to `clear`.
    fn begin(&mut self, clear: Color);

    fn set_pipeline(&mut self, pipeline: &B::Pipeline);

    fn bind_resource_set(&mut self, slot: u32, set: &B::ResourceSet);

    fn set_vertex_buffer(&mut self, buffer: &B::Buffer);

    /// Binds 16-bit indices.
    fn set_index_buffer(&mut self, buffer: &B::Buffer);

    fn draw_indexed(&mut self, index_count: u32);

    /// Writes `bytes` at `offset` into the global uniform block. Draws
    /// recorded afterwards observe the new value; earlier draws do not.
    fn update_uniform(&mut self, offset: u64, bytes: &[u8]);

    fn end(&mut self);
}
