use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};
use parking_lot::Mutex;
use wgpu::util::DeviceExt;

use crate::coords::Rect;
use crate::device::{Gpu, GpuFrame};
use crate::paint::{Color, Rgba8};
use crate::render::{GlobalUniforms, GLOBALS_SIZE};
use crate::texture::{TextureDevice, TextureError};

use super::descriptor::{
    BindableResource, BufferUsage, PipelineDescription, ResourceDescription, ResourceKind,
    ShaderDescription,
};
use super::globals::{dynamic_offset, GlobalTimeline};
use super::{CommandRecorder, GraphicsBackend};

/// Ring slots allocated up front for global uniform snapshots.
const INITIAL_GLOBAL_SLOTS: usize = 64;

/// [`GraphicsBackend`] on top of wgpu.
///
/// Global uniform updates are recorded as snapshots in a ring buffer bound
/// with a dynamic offset, so every draw sees the values current at the point
/// it was queued even though all writes land before the pass executes.
#[derive(Clone)]
pub struct WgpuBackend {
    shared: Arc<Shared>,
}

struct Shared {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    surface_format: wgpu::TextureFormat,
    global_layout: WgpuResourceLayout,
    sampler: Arc<wgpu::Sampler>,
    globals: Mutex<GlobalRing>,
}

struct GlobalRing {
    buffer: wgpu::Buffer,
    bind_group: Arc<wgpu::BindGroup>,
    slot_size: u64,
    capacity: usize,
    /// Values carried over from the previous frame.
    current: GlobalUniforms,
}

#[derive(Clone, Debug)]
pub struct WgpuShaderModule {
    module: Arc<wgpu::ShaderModule>,
    entry_point: String,
}

#[derive(Clone, Debug)]
pub struct WgpuResourceLayout {
    layout: Arc<wgpu::BindGroupLayout>,
    kinds: Vec<ResourceKind>,
}

#[derive(Clone, Debug)]
pub enum WgpuResourceSet {
    /// The global uniform ring; the offset is chosen at record time.
    Globals,
    Group(Arc<wgpu::BindGroup>),
}

/// A wgpu texture plus the view shaders sample it through.
#[derive(Debug)]
pub struct WgpuTexture {
    pub texture: wgpu::Texture,
    pub view: Arc<wgpu::TextureView>,
}

impl WgpuBackend {
    pub fn new(gpu: &Gpu<'_>) -> Self {
        Self::from_parts(
            Arc::clone(gpu.device()),
            Arc::clone(gpu.queue()),
            gpu.surface_format(),
        )
    }

    pub fn from_parts(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sylva globals bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(GLOBALS_SIZE),
                },
                count: None,
            }],
        });
        let global_layout = WgpuResourceLayout {
            layout: Arc::new(global_layout),
            kinds: vec![ResourceKind::UniformBuffer],
        };

        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let slot_size = GLOBALS_SIZE.div_ceil(align) * align;
        let (buffer, bind_group) =
            create_global_ring(&device, &global_layout.layout, slot_size, INITIAL_GLOBAL_SLOTS);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sylva default sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            shared: Arc::new(Shared {
                device,
                queue,
                surface_format,
                global_layout,
                sampler: Arc::new(sampler),
                globals: Mutex::new(GlobalRing {
                    buffer,
                    bind_group: Arc::new(bind_group),
                    slot_size,
                    capacity: INITIAL_GLOBAL_SLOTS,
                    current: GlobalUniforms::default(),
                }),
            }),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.shared.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.shared.surface_format
    }
}

fn create_global_ring(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slot_size: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("sylva globals ring"),
        size: slot_size * capacity as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("sylva globals bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(GLOBALS_SIZE),
            }),
        }],
    });

    (buffer, bind_group)
}

fn binding_type(kind: ResourceKind) -> wgpu::BindingType {
    match kind {
        ResourceKind::UniformBuffer => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        ResourceKind::Texture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        ResourceKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
    }
}

impl GraphicsBackend for WgpuBackend {
    type Buffer = Arc<wgpu::Buffer>;
    type ShaderModule = WgpuShaderModule;
    type Pipeline = Arc<wgpu::RenderPipeline>;
    type ResourceLayout = WgpuResourceLayout;
    type ResourceSet = WgpuResourceSet;
    type TextureView = Arc<wgpu::TextureView>;
    type Sampler = Arc<wgpu::Sampler>;
    type Target = GpuFrame;
    type Recorder = WgpuRecorder;

    fn compile_shader(&self, desc: &ShaderDescription) -> Result<WgpuShaderModule> {
        ensure!(
            desc.source.contains(&format!("fn {}", desc.entry_point)),
            "shader '{}' has no entry point '{}'",
            desc.label,
            desc.entry_point
        );

        let module = self.shared.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.as_str().into()),
        });
        log::debug!("compiled {:?} shader '{}'", desc.stage, desc.label);

        Ok(WgpuShaderModule {
            module: Arc::new(module),
            entry_point: desc.entry_point.clone(),
        })
    }

    fn create_buffer(&self, label: &str, contents: &[u8], usage: BufferUsage) -> Arc<wgpu::Buffer> {
        let usage = match usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        };
        Arc::new(self.shared.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        }))
    }

    fn create_resource_layout(&self, label: &str, resources: &[ResourceDescription]) -> WgpuResourceLayout {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = resources
            .iter()
            .enumerate()
            .map(|(i, r)| wgpu::BindGroupLayoutEntry {
                binding: i as u32,
                visibility: r.stage.to_wgpu(),
                ty: binding_type(r.kind),
                count: None,
            })
            .collect();

        let layout = self.shared.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        });

        WgpuResourceLayout {
            layout: Arc::new(layout),
            kinds: resources.iter().map(|r| r.kind).collect(),
        }
    }

    fn create_resource_set(
        &self,
        layout: &WgpuResourceLayout,
        resources: &[BindableResource<Self>],
    ) -> Result<WgpuResourceSet> {
        ensure!(
            resources.len() == layout.kinds.len(),
            "resource set has {} entries but the layout declares {}",
            resources.len(),
            layout.kinds.len()
        );
        for (i, (res, kind)) in resources.iter().zip(&layout.kinds).enumerate() {
            ensure!(res.kind() == *kind, "binding {i}: expected {kind:?}, got {:?}", res.kind());
        }

        let entries: Vec<wgpu::BindGroupEntry<'_>> = resources
            .iter()
            .enumerate()
            .map(|(i, res)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: match res {
                    BindableResource::UniformBuffer(b) => b.as_entire_binding(),
                    BindableResource::Texture(v) => wgpu::BindingResource::TextureView(v),
                    BindableResource::Sampler(s) => wgpu::BindingResource::Sampler(s),
                },
            })
            .collect();

        let group = self.shared.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sylva resource set"),
            layout: &layout.layout,
            entries: &entries,
        });

        Ok(WgpuResourceSet::Group(Arc::new(group)))
    }

    fn create_pipeline(&self, desc: &PipelineDescription<Self>) -> Result<Arc<wgpu::RenderPipeline>> {
        if desc.depth_test {
            bail!("pipeline '{}': depth testing is not supported", desc.label);
        }

        let device = &self.shared.device;
        let layouts: Vec<&wgpu::BindGroupLayout> =
            desc.resource_layouts.iter().map(|l| l.layout.as_ref()).collect();

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&desc.label),
            bind_group_layouts: &layouts,
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&desc.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &desc.vertex.module,
                entry_point: Some(&desc.vertex.entry_point),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: desc.vertex_layout.stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &desc.vertex_layout.attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &desc.fragment.module,
                entry_point: Some(&desc.fragment.entry_point),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.shared.surface_format,
                    blend: Some(desc.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: desc.topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: desc.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("created pipeline '{}'", desc.label);
        Ok(Arc::new(pipeline))
    }

    fn global_layout(&self) -> WgpuResourceLayout {
        self.shared.global_layout.clone()
    }

    fn global_set(&self) -> WgpuResourceSet {
        WgpuResourceSet::Globals
    }

    fn default_sampler(&self) -> Arc<wgpu::Sampler> {
        Arc::clone(&self.shared.sampler)
    }

    fn begin_recording(&self, target: GpuFrame) -> WgpuRecorder {
        let current = self.shared.globals.lock().current;
        WgpuRecorder {
            shared: Arc::clone(&self.shared),
            frame: Some(target),
            clear: None,
            ops: Vec::new(),
            globals: GlobalTimeline::new(current),
            ended: false,
        }
    }

    fn submit(&self, mut recorder: WgpuRecorder) -> Result<()> {
        recorder.end();
        let frame = recorder.frame.take().context("recorder was already submitted")?;

        self.shared.queue.submit(Some(frame.encoder.finish()));
        frame.surface_texture.present();
        Ok(())
    }
}

// ── recorder ──────────────────────────────────────────────────────────────

enum PassOp {
    SetPipeline(Arc<wgpu::RenderPipeline>),
    BindGroup { slot: u32, group: Arc<wgpu::BindGroup> },
    BindGlobals { slot: u32, snapshot: usize },
    SetVertexBuffer(Arc<wgpu::Buffer>),
    SetIndexBuffer(Arc<wgpu::Buffer>),
    DrawIndexed(u32),
}

/// Records one frame into a single render pass.
///
/// Operations are buffered until [`end`](CommandRecorder::end) so that all
/// global uniform snapshots can be written before the pass is encoded.
pub struct WgpuRecorder {
    shared: Arc<Shared>,
    frame: Option<GpuFrame>,
    clear: Option<Color>,
    ops: Vec<PassOp>,
    globals: GlobalTimeline,
    ended: bool,
}

impl WgpuRecorder {
    /// Grows the ring when needed and uploads every snapshot.
    fn upload_snapshots(&self) -> (Arc<wgpu::BindGroup>, u64) {
        let mut ring = self.shared.globals.lock();

        let count = self.globals.snapshots().len();
        if count > ring.capacity {
            let capacity = count.next_power_of_two();
            let (buffer, bind_group) = create_global_ring(
                &self.shared.device,
                &self.shared.global_layout.layout,
                ring.slot_size,
                capacity,
            );
            log::debug!("grew global uniform ring to {capacity} slots");
            ring.buffer = buffer;
            ring.bind_group = Arc::new(bind_group);
            ring.capacity = capacity;
        }

        self.shared.queue.write_buffer(&ring.buffer, 0, &self.globals.pack(ring.slot_size));
        ring.current = self.globals.latest();
        (Arc::clone(&ring.bind_group), ring.slot_size)
    }
}

impl CommandRecorder<WgpuBackend> for WgpuRecorder {
    fn begin(&mut self, clear: Color) {
        self.clear = Some(clear);
    }

    fn set_pipeline(&mut self, pipeline: &Arc<wgpu::RenderPipeline>) {
        self.ops.push(PassOp::SetPipeline(Arc::clone(pipeline)));
    }

    fn bind_resource_set(&mut self, slot: u32, set: &WgpuResourceSet) {
        match set {
            WgpuResourceSet::Globals => {
                let bind = self.globals.bind(slot);
                self.ops.push(PassOp::BindGlobals {
                    slot: bind.slot,
                    snapshot: bind.snapshot,
                });
            }
            WgpuResourceSet::Group(group) => {
                self.globals.displace(slot);
                self.ops.push(PassOp::BindGroup {
                    slot,
                    group: Arc::clone(group),
                });
            }
        }
    }

    fn set_vertex_buffer(&mut self, buffer: &Arc<wgpu::Buffer>) {
        self.ops.push(PassOp::SetVertexBuffer(Arc::clone(buffer)));
    }

    fn set_index_buffer(&mut self, buffer: &Arc<wgpu::Buffer>) {
        self.ops.push(PassOp::SetIndexBuffer(Arc::clone(buffer)));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.ops.push(PassOp::DrawIndexed(index_count));
    }

    fn update_uniform(&mut self, offset: u64, bytes: &[u8]) {
        match self.globals.update(offset, bytes) {
            Ok(Some(bind)) => self.ops.push(PassOp::BindGlobals {
                slot: bind.slot,
                snapshot: bind.snapshot,
            }),
            Ok(None) => {}
            Err(e) => log::warn!("{e}"),
        }
    }

    fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let (globals, slot_size) = self.upload_snapshots();
        let load = match self.clear {
            Some(c) => wgpu::LoadOp::Clear(c.to_wgpu()),
            None => wgpu::LoadOp::Load,
        };

        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sylva draw pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for op in &self.ops {
            match op {
                PassOp::SetPipeline(p) => pass.set_pipeline(p),
                PassOp::BindGroup { slot, group } => pass.set_bind_group(*slot, group.as_ref(), &[]),
                PassOp::BindGlobals { slot, snapshot } => {
                    pass.set_bind_group(*slot, globals.as_ref(), &[dynamic_offset(*snapshot, slot_size)]);
                }
                PassOp::SetVertexBuffer(b) => pass.set_vertex_buffer(0, b.slice(..)),
                PassOp::SetIndexBuffer(b) => pass.set_index_buffer(b.slice(..), wgpu::IndexFormat::Uint16),
                PassOp::DrawIndexed(count) => pass.draw_indexed(0..*count, 0, 0..1),
            }
        }
    }
}

// ── textures ──────────────────────────────────────────────────────────────

impl TextureDevice for WgpuBackend {
    type Native = WgpuTexture;

    fn create_texture(&self, label: &str, width: u32, height: u32, fill: Rgba8) -> Result<WgpuTexture, TextureError> {
        let max = self.shared.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(TextureError::Device(format!(
                "cannot create a {width}x{height} texture (limit {max})"
            )));
        }

        let texture = self.shared.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let native = WgpuTexture {
            texture,
            view: Arc::new(view),
        };

        let texels = vec![fill; width as usize * height as usize];
        self.write_texture(&native, Rect::from_size(width as i32, height as i32), &texels)?;
        Ok(native)
    }

    fn write_texture(&self, native: &WgpuTexture, bounds: Rect, pixels: &[Rgba8]) -> Result<(), TextureError> {
        let width = native.texture.width();
        let height = native.texture.height();
        if !Rect::from_size(width as i32, height as i32).contains_rect(bounds) {
            return Err(TextureError::OutOfSurface { bounds, width, height });
        }
        if pixels.len() != bounds.area() {
            return Err(TextureError::DataLength {
                bounds,
                expected: bounds.area(),
                actual: pixels.len(),
            });
        }
        if bounds.is_empty() {
            return Ok(());
        }

        self.shared.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &native.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: bounds.x as u32,
                    y: bounds.y as u32,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(pixels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * bounds.width as u32),
                rows_per_image: Some(bounds.height as u32),
            },
            wgpu::Extent3d {
                width: bounds.width as u32,
                height: bounds.height as u32,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}
