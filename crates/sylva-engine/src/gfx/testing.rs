//! In-memory backend that records every native call.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, ensure, Result};
use parking_lot::Mutex;

use crate::paint::Color;

use super::{
    BindableResource, BufferUsage, CommandRecorder, GraphicsBackend, PipelineDescription,
    ResourceDescription, ResourceKind, ShaderDescription,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Begin(Color),
    SetPipeline(u32),
    BindResourceSet { slot: u32, set: u32 },
    SetVertexBuffer(u32),
    SetIndexBuffer(u32),
    DrawIndexed(u32),
    UpdateUniform { offset: u64, bytes: Vec<u8> },
    End,
    Submit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockPipeline {
    pub id: u32,
    pub label: String,
    pub resource_layouts: Vec<u32>,
    pub vertex_stride: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockBuffer {
    pub id: u32,
    pub usage: BufferUsage,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockLayout {
    pub id: u32,
    pub kinds: Vec<ResourceKind>,
}

#[derive(Default)]
struct Log {
    next_id: u32,
    calls: Vec<Call>,
    compiled: HashMap<String, usize>,
    pipelines: Vec<MockPipeline>,
    resource_sets: usize,
    fail_entry_point: Option<String>,
}

impl Log {
    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Backend stand-in; clones share one call log.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    log: Arc<Mutex<Log>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().calls.clone()
    }

    /// Times a shader with this label went through `compile_shader`.
    pub fn compile_count(&self, label: &str) -> usize {
        self.log.lock().compiled.get(label).copied().unwrap_or(0)
    }

    pub fn pipelines(&self) -> Vec<MockPipeline> {
        self.log.lock().pipelines.clone()
    }

    pub fn resource_set_count(&self) -> usize {
        self.log.lock().resource_sets
    }

    /// Makes `compile_shader` fail for shaders with this entry point.
    pub fn fail_entry_point(&self, entry: &str) {
        self.log.lock().fail_entry_point = Some(entry.to_string());
    }
}

/// Global resource layout and set share id 0.
pub const GLOBALS_ID: u32 = 0;

impl GraphicsBackend for RecordingBackend {
    type Buffer = MockBuffer;
    type ShaderModule = u32;
    type Pipeline = MockPipeline;
    type ResourceLayout = MockLayout;
    type ResourceSet = u32;
    type TextureView = u32;
    type Sampler = u32;
    type Target = ();
    type Recorder = Recorder;

    fn compile_shader(&self, desc: &ShaderDescription) -> Result<u32> {
        let mut log = self.log.lock();
        if log.fail_entry_point.as_deref() == Some(desc.entry_point.as_str()) {
            bail!("shader '{}' failed to compile", desc.label);
        }
        *log.compiled.entry(desc.label.clone()).or_default() += 1;
        Ok(log.id())
    }

    fn create_buffer(&self, _label: &str, contents: &[u8], usage: BufferUsage) -> MockBuffer {
        let id = self.log.lock().id();
        MockBuffer {
            id,
            usage,
            bytes: contents.to_vec(),
        }
    }

    fn create_resource_layout(&self, _label: &str, resources: &[ResourceDescription]) -> MockLayout {
        MockLayout {
            id: self.log.lock().id(),
            kinds: resources.iter().map(|r| r.kind).collect(),
        }
    }

    fn create_resource_set(&self, layout: &MockLayout, resources: &[BindableResource<Self>]) -> Result<u32> {
        ensure!(resources.len() == layout.kinds.len(), "resource count mismatch");
        for (res, kind) in resources.iter().zip(&layout.kinds) {
            ensure!(res.kind() == *kind, "resource kind mismatch");
        }
        let mut log = self.log.lock();
        log.resource_sets += 1;
        Ok(log.id())
    }

    fn create_pipeline(&self, desc: &PipelineDescription<Self>) -> Result<MockPipeline> {
        ensure!(!desc.depth_test, "depth testing is not supported");
        let mut log = self.log.lock();
        let pipeline = MockPipeline {
            id: log.id(),
            label: desc.label.clone(),
            resource_layouts: desc.resource_layouts.iter().map(|l| l.id).collect(),
            vertex_stride: desc.vertex_layout.stride,
        };
        log.pipelines.push(pipeline.clone());
        Ok(pipeline)
    }

    fn global_layout(&self) -> MockLayout {
        MockLayout {
            id: GLOBALS_ID,
            kinds: vec![ResourceKind::UniformBuffer],
        }
    }

    fn global_set(&self) -> u32 {
        GLOBALS_ID
    }

    fn default_sampler(&self) -> u32 {
        0
    }

    fn begin_recording(&self, _target: ()) -> Recorder {
        Recorder {
            log: Arc::clone(&self.log),
        }
    }

    fn submit(&self, _recorder: Recorder) -> Result<()> {
        self.log.lock().calls.push(Call::Submit);
        Ok(())
    }
}

pub struct Recorder {
    log: Arc<Mutex<Log>>,
}

impl Recorder {
    fn push(&self, call: Call) {
        self.log.lock().calls.push(call);
    }
}

impl CommandRecorder<RecordingBackend> for Recorder {
    fn begin(&mut self, clear: Color) {
        self.push(Call::Begin(clear));
    }

    fn set_pipeline(&mut self, pipeline: &MockPipeline) {
        self.push(Call::SetPipeline(pipeline.id));
    }

    fn bind_resource_set(&mut self, slot: u32, set: &u32) {
        self.push(Call::BindResourceSet { slot, set: *set });
    }

    fn set_vertex_buffer(&mut self, buffer: &MockBuffer) {
        self.push(Call::SetVertexBuffer(buffer.id));
    }

    fn set_index_buffer(&mut self, buffer: &MockBuffer) {
        self.push(Call::SetIndexBuffer(buffer.id));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.push(Call::DrawIndexed(index_count));
    }

    fn update_uniform(&mut self, offset: u64, bytes: &[u8]) {
        self.push(Call::UpdateUniform {
            offset,
            bytes: bytes.to_vec(),
        });
    }

    fn end(&mut self) {
        self.push(Call::End);
    }
}
