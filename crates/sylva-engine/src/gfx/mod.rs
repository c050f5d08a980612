//! Graphics backend abstraction.
//!
//! The draw pipeline only talks to [`GraphicsBackend`] and
//! [`CommandRecorder`]; [`WgpuBackend`] is the production implementation.

mod backend;
mod descriptor;
mod globals;
mod wgpu_backend;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{CommandRecorder, GraphicsBackend};
pub use descriptor::{
    BindableResource, BufferUsage, PipelineDescription, PipelineDescriptionBuilder,
    ResourceDescription, ResourceKind, ShaderDescription, ShaderStage, VertexLayout,
};
pub use wgpu_backend::{
    WgpuBackend, WgpuRecorder, WgpuResourceLayout, WgpuResourceSet, WgpuShaderModule, WgpuTexture,
};
