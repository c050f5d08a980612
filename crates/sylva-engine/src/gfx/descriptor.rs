use crate::render::GLOBALS_WGSL;

use super::GraphicsBackend;

/// Programmable stage a shader or resource belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_wgpu(self) -> wgpu::ShaderStages {
        match self {
            ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
            ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
        }
    }
}

/// WGSL source for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDescription {
    pub label: String,
    pub stage: ShaderStage,
    pub source: String,
    pub entry_point: String,
}

impl ShaderDescription {
    /// Builds a description whose source is `body` preceded by the global
    /// uniform block declaration.
    pub fn wgsl(label: &str, stage: ShaderStage, body: &str, entry_point: &str) -> Self {
        Self {
            label: label.to_string(),
            stage,
            source: format!("{GLOBALS_WGSL}\n{body}"),
            entry_point: entry_point.to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    UniformBuffer,
    Texture,
    Sampler,
}

/// One binding a shader stage declares. Binding indices follow declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescription {
    pub name: String,
    pub kind: ResourceKind,
    pub stage: ShaderStage,
}

impl ResourceDescription {
    pub fn new(name: &str, kind: ResourceKind, stage: ShaderStage) -> Self {
        Self {
            name: name.to_string(),
            kind,
            stage,
        }
    }
}

/// A concrete resource filling one [`ResourceDescription`].
pub enum BindableResource<B: GraphicsBackend> {
    UniformBuffer(B::Buffer),
    Texture(B::TextureView),
    Sampler(B::Sampler),
}

impl<B: GraphicsBackend> BindableResource<B> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            BindableResource::UniformBuffer(_) => ResourceKind::UniformBuffer,
            BindableResource::Texture(_) => ResourceKind::Texture,
            BindableResource::Sampler(_) => ResourceKind::Sampler,
        }
    }
}

impl<B: GraphicsBackend> Clone for BindableResource<B> {
    fn clone(&self) -> Self {
        match self {
            BindableResource::UniformBuffer(b) => BindableResource::UniformBuffer(b.clone()),
            BindableResource::Texture(t) => BindableResource::Texture(t.clone()),
            BindableResource::Sampler(s) => BindableResource::Sampler(s.clone()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

/// Per-vertex attribute layout of a vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

/// Everything needed to build a pipeline-state object.
pub struct PipelineDescription<B: GraphicsBackend> {
    pub label: String,
    pub vertex: B::ShaderModule,
    pub fragment: B::ShaderModule,
    pub vertex_layout: VertexLayout,
    /// Indexed by binding slot; slot 0 is the global uniform layout.
    pub resource_layouts: Vec<B::ResourceLayout>,
    pub blend: wgpu::BlendState,
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_test: bool,
}

impl<B: GraphicsBackend> PipelineDescription<B> {
    /// Starts from the default state: straight alpha blending, triangle list,
    /// no culling, no depth test, global layout at slot 0.
    pub fn builder(
        backend: &B,
        label: &str,
        vertex: B::ShaderModule,
        fragment: B::ShaderModule,
        vertex_layout: VertexLayout,
    ) -> PipelineDescriptionBuilder<B> {
        PipelineDescriptionBuilder {
            desc: PipelineDescription {
                label: label.to_string(),
                vertex,
                fragment,
                vertex_layout,
                resource_layouts: vec![backend.global_layout()],
                blend: wgpu::BlendState::ALPHA_BLENDING,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                depth_test: false,
            },
        }
    }
}

pub struct PipelineDescriptionBuilder<B: GraphicsBackend> {
    desc: PipelineDescription<B>,
}

impl<B: GraphicsBackend> PipelineDescriptionBuilder<B> {
    /// Appends a layout at the next binding slot.
    pub fn push_resource_layout(mut self, layout: B::ResourceLayout) -> Self {
        self.desc.resource_layouts.push(layout);
        self
    }

    pub fn push_resource_layouts(mut self, layouts: impl IntoIterator<Item = B::ResourceLayout>) -> Self {
        self.desc.resource_layouts.extend(layouts);
        self
    }

    pub fn blend(mut self, blend: wgpu::BlendState) -> Self {
        self.desc.blend = blend;
        self
    }

    pub fn topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.desc.topology = topology;
        self
    }

    pub fn cull_mode(mut self, cull_mode: Option<wgpu::Face>) -> Self {
        self.desc.cull_mode = cull_mode;
        self
    }

    pub fn depth_test(mut self, enabled: bool) -> Self {
        self.desc.depth_test = enabled;
        self
    }

    pub fn build(self) -> PipelineDescription<B> {
        self.desc
    }
}
