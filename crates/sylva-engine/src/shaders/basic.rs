use crate::gfx::{
    BindableResource, GraphicsBackend, ResourceDescription, ResourceKind, ShaderDescription,
    ShaderStage, VertexLayout,
};

use super::{Shader, Vertex, VertexPositionColour, VertexShader, VertexUvColour};

// ── untextured ────────────────────────────────────────────────────────────

/// Transforms [`VertexPositionColour`] by the global projection and model.
pub struct BasicVertexShader;

impl<B: GraphicsBackend> Shader<B> for BasicVertexShader {
    fn description(&self) -> ShaderDescription {
        ShaderDescription::wgsl(
            "basic vertex",
            ShaderStage::Vertex,
            include_str!("wgsl/basic_vs.wgsl"),
            "vs_main",
        )
    }
}

impl<B: GraphicsBackend> VertexShader<B> for BasicVertexShader {
    fn vertex_layout(&self) -> VertexLayout {
        VertexPositionColour::layout()
    }
}

/// Outputs the interpolated vertex colour.
pub struct BasicFragmentShader;

impl<B: GraphicsBackend> Shader<B> for BasicFragmentShader {
    fn description(&self) -> ShaderDescription {
        ShaderDescription::wgsl(
            "basic fragment",
            ShaderStage::Fragment,
            include_str!("wgsl/basic_fs.wgsl"),
            "fs_main",
        )
    }
}

// ── textured ──────────────────────────────────────────────────────────────

pub struct TexturedVertexShader;

impl<B: GraphicsBackend> Shader<B> for TexturedVertexShader {
    fn description(&self) -> ShaderDescription {
        ShaderDescription::wgsl(
            "textured vertex",
            ShaderStage::Vertex,
            include_str!("wgsl/textured_vs.wgsl"),
            "vs_main",
        )
    }
}

impl<B: GraphicsBackend> VertexShader<B> for TexturedVertexShader {
    fn vertex_layout(&self) -> VertexLayout {
        VertexUvColour::layout()
    }
}

/// Samples one texture and tints it with the vertex colour.
pub struct TexturedFragmentShader<B: GraphicsBackend> {
    pub texture: B::TextureView,
    pub sampler: B::Sampler,
}

impl<B: GraphicsBackend> Shader<B> for TexturedFragmentShader<B> {
    fn description(&self) -> ShaderDescription {
        ShaderDescription::wgsl(
            "textured fragment",
            ShaderStage::Fragment,
            include_str!("wgsl/textured_fs.wgsl"),
            "fs_main",
        )
    }

    fn resource_descriptions(&self) -> Vec<ResourceDescription> {
        vec![
            ResourceDescription::new("surface", ResourceKind::Texture, ShaderStage::Fragment),
            ResourceDescription::new("surface_sampler", ResourceKind::Sampler, ShaderStage::Fragment),
        ]
    }

    fn bindable_resources(&self) -> Vec<BindableResource<B>> {
        vec![
            BindableResource::Texture(self.texture.clone()),
            BindableResource::Sampler(self.sampler.clone()),
        ]
    }
}
