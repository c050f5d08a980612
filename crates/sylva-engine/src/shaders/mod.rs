//! Shader sets, vertex formats and vertex buffers.

mod basic;
mod buffer;
mod vertex;

use std::cell::OnceCell;

use anyhow::{Context, Result};

use crate::gfx::{
    BindableResource, GraphicsBackend, ResourceDescription, ShaderDescription, ShaderStage,
    VertexLayout,
};

pub use basic::{
    BasicFragmentShader, BasicVertexShader, TexturedFragmentShader, TexturedVertexShader,
};
pub use buffer::{IndexLayout, VertexBuffer, MAX_VERTICES};
pub use vertex::{Vertex, VertexPositionColour, VertexUvColour};

/// One programmable stage plus the resources it binds.
pub trait Shader<B: GraphicsBackend> {
    fn description(&self) -> ShaderDescription;

    fn resource_descriptions(&self) -> Vec<ResourceDescription> {
        Vec::new()
    }

    /// Resources matching [`resource_descriptions`](Self::resource_descriptions), in order.
    fn bindable_resources(&self) -> Vec<BindableResource<B>> {
        Vec::new()
    }
}

pub trait VertexShader<B: GraphicsBackend>: Shader<B> {
    fn vertex_layout(&self) -> VertexLayout;
}

/// Compiled modules of a [`ShaderSet`].
pub struct CompiledShaderSet<B: GraphicsBackend> {
    pub vertex: B::ShaderModule,
    pub fragment: B::ShaderModule,
}

impl<B: GraphicsBackend> Clone for CompiledShaderSet<B> {
    fn clone(&self) -> Self {
        Self {
            vertex: self.vertex.clone(),
            fragment: self.fragment.clone(),
        }
    }
}

/// Resources one stage contributes to a pipeline.
pub struct StageResources<B: GraphicsBackend> {
    pub stage: ShaderStage,
    pub descriptions: Vec<ResourceDescription>,
    pub resources: Vec<BindableResource<B>>,
}

/// A vertex and fragment shader drawn together.
///
/// Compiled modules are cached for the lifetime of the set.
pub struct ShaderSet<B: GraphicsBackend> {
    vertex: Box<dyn VertexShader<B>>,
    fragment: Box<dyn Shader<B>>,
    compiled: OnceCell<CompiledShaderSet<B>>,
}

impl<B: GraphicsBackend> ShaderSet<B> {
    pub fn new(vertex: impl VertexShader<B> + 'static, fragment: impl Shader<B> + 'static) -> Self {
        Self {
            vertex: Box::new(vertex),
            fragment: Box::new(fragment),
            compiled: OnceCell::new(),
        }
    }

    /// Position + colour, no resources beyond the globals.
    pub fn basic() -> Self {
        Self::new(BasicVertexShader, BasicFragmentShader)
    }

    /// Position + uv + colour, sampling `texture` at slot 1.
    pub fn textured(texture: B::TextureView, sampler: B::Sampler) -> Self {
        Self::new(TexturedVertexShader, TexturedFragmentShader::<B> { texture, sampler })
    }

    pub fn vertex_layout(&self) -> VertexLayout {
        self.vertex.vertex_layout()
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Compiles both stages on first use.
    pub fn compile(&self, backend: &B) -> Result<&CompiledShaderSet<B>> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled);
        }

        let vertex_desc = self.vertex.description();
        let fragment_desc = self.fragment.description();
        let vertex = backend
            .compile_shader(&vertex_desc)
            .with_context(|| format!("failed to compile '{}'", vertex_desc.label))?;
        let fragment = backend
            .compile_shader(&fragment_desc)
            .with_context(|| format!("failed to compile '{}'", fragment_desc.label))?;

        Ok(self.compiled.get_or_init(|| CompiledShaderSet { vertex, fragment }))
    }

    /// Per-stage resources, vertex first.
    pub fn stage_resources(&self) -> [StageResources<B>; 2] {
        [
            StageResources {
                stage: ShaderStage::Vertex,
                descriptions: self.vertex.resource_descriptions(),
                resources: self.vertex.bindable_resources(),
            },
            StageResources {
                stage: ShaderStage::Fragment,
                descriptions: self.fragment.resource_descriptions(),
                resources: self.fragment.bindable_resources(),
            },
        ]
    }
}
