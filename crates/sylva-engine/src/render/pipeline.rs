use anyhow::{Context, Result};
use glam::Mat4;

use crate::gfx::{GraphicsBackend, PipelineDescription};
use crate::paint::Color;
use crate::shaders::{ShaderSet, Vertex, VertexBuffer};

use super::{DebugDraw, DrawCommand, DrawStack, FrameStatistics, GlobalProperty, MatrixStack};

/// Draw pipeline configuration.
#[derive(Debug, Clone)]
pub struct DrawConfig {
    /// Colour the target is cleared to at `start`.
    pub clear_colour: Color,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            clear_colour: Color::BLACK,
        }
    }
}

/// Deferred draw recorder.
///
/// Scene code queues work between [`start`](Self::start) and
/// [`end`](Self::end); [`flush`](Self::flush) replays the queue in order
/// against one backend recorder, then submits and presents.
///
/// Draw, bind and matrix calls are only meaningful between `start` and `end`.
/// This is not checked.
pub struct DrawPipeline<B: GraphicsBackend> {
    backend: B,
    config: DrawConfig,
    stack: DrawStack<B>,
    matrices: MatrixStack,
    default_shaders: ShaderSet<B>,
    default_pipeline: B::Pipeline,
    current: Option<B::Pipeline>,
    debug_queue: Vec<DebugDraw<B>>,
    stats: FrameStatistics,
}

impl<B: GraphicsBackend> DrawPipeline<B> {
    pub fn new(backend: B, config: DrawConfig) -> Result<Self> {
        let default_shaders = ShaderSet::basic();
        let default_pipeline = build_pipeline(&backend, "sylva default pipeline", &default_shaders, Vec::new())
            .context("failed to build the default pipeline")?;

        Ok(Self {
            backend,
            config,
            stack: DrawStack::new(),
            matrices: MatrixStack::new(),
            default_shaders,
            default_pipeline,
            current: None,
            debug_queue: Vec::new(),
            stats: FrameStatistics::default(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &DrawConfig {
        &self.config
    }

    pub fn set_clear_colour(&mut self, colour: Color) {
        self.config.clear_colour = colour;
    }

    pub fn default_shaders(&self) -> &ShaderSet<B> {
        &self.default_shaders
    }

    /// Pipeline built by the last `bind_shader`, if still bound.
    pub fn current_pipeline(&self) -> Option<&B::Pipeline> {
        self.current.as_ref()
    }

    /// Commands waiting for the next flush.
    pub fn queued(&self) -> usize {
        self.stack.len()
    }

    pub fn matrix_depth(&self) -> usize {
        self.matrices.depth()
    }

    /// Begins a frame: clear, default pipeline, globals at slot 0.
    pub fn start(&mut self) {
        self.current = None;
        self.matrices.clear();
        self.stack.push(DrawCommand::Start {
            clear: self.config.clear_colour,
            pipeline: self.default_pipeline.clone(),
            globals: self.backend.global_set(),
        });
    }

    /// Switches to `shaders`.
    ///
    /// Compiled modules are reused across calls with the same set, but the
    /// pipeline and resource sets are rebuilt every time. Stages that declare
    /// resources are bound at slots 1, 2, … in stage order.
    pub fn bind_shader(&mut self, shaders: &ShaderSet<B>) -> Result<()> {
        let mut layouts = Vec::new();
        let mut sets = Vec::new();

        for (i, stage) in shaders
            .stage_resources()
            .into_iter()
            .filter(|s| !s.descriptions.is_empty())
            .enumerate()
        {
            let label = format!("{:?} resources", stage.stage);
            let layout = self.backend.create_resource_layout(&label, &stage.descriptions);
            let set = self
                .backend
                .create_resource_set(&layout, &stage.resources)
                .with_context(|| format!("failed to bind {label}"))?;
            layouts.push(layout);
            sets.push((i as u32 + 1, set));
        }

        let pipeline = build_pipeline(&self.backend, "sylva shader pipeline", shaders, layouts)?;

        self.current = Some(pipeline.clone());
        self.stack.push(DrawCommand::SetPipeline(pipeline));
        for (slot, set) in sets {
            self.stack.push(DrawCommand::BindResourceSet { slot, set });
        }
        self.stats.shader_binds += 1;
        Ok(())
    }

    /// Reverts to the default pipeline.
    pub fn unbind_shader(&mut self) {
        self.current = None;
        self.stack.push(DrawCommand::SetPipeline(self.default_pipeline.clone()));
    }

    pub fn set_global_uniform(&mut self, property: GlobalProperty, value: Mat4) {
        self.stack.push(DrawCommand::UpdateUniform { property, value });
    }

    /// Queues a draw of `buffer`'s current contents. Empty buffers are skipped.
    pub fn draw_vertex_buffer<T: Vertex>(&mut self, buffer: &mut VertexBuffer<B, T>) {
        let Some((vertices, indices, index_count)) = buffer.gpu_buffers() else {
            return;
        };
        self.stack.push(DrawCommand::DrawVertexBuffer {
            vertices,
            indices,
            index_count,
        });
    }

    /// Composes `m` onto the model matrix for subsequent draws.
    pub fn push_matrix(&mut self, m: Mat4) {
        let value = self.matrices.push(m);
        self.set_global_uniform(GlobalProperty::Model, value);
    }

    /// Restores the model matrix in effect before the matching `push_matrix`.
    pub fn pop_matrix(&mut self) {
        let value = self.matrices.pop();
        self.set_global_uniform(GlobalProperty::Model, value);
    }

    /// Queues `draw` to run just before the frame ends, whenever it was requested.
    pub fn queue_for_debug(&mut self, draw: impl FnOnce(&mut B::Recorder) + 'static) {
        self.debug_queue.push(Box::new(draw));
    }

    /// Ends the frame: debug draws, then end of recording.
    pub fn end(&mut self) {
        if !self.matrices.is_balanced() {
            log::warn!("frame ended with {} unpopped matrices", self.matrices.depth());
        }
        self.stack.push(DrawCommand::DrawDebug);
        self.stack.push(DrawCommand::End);
    }

    /// Replays every queued command into `target`, then submits and presents.
    pub fn flush(&mut self, target: B::Target) -> Result<FrameStatistics> {
        let mut recorder = self.backend.begin_recording(target);

        while let Some(command) = self.stack.pop() {
            self.stats.commands += 1;
            match &command {
                DrawCommand::DrawVertexBuffer { .. } => self.stats.draw_calls += 1,
                DrawCommand::UpdateUniform { .. } => self.stats.uniform_updates += 1,
                _ => {}
            }
            command.execute(&mut recorder, &mut self.debug_queue);
        }

        self.backend.submit(recorder).context("failed to submit frame")?;

        let stats = self.stats;
        log::trace!(
            "flushed {} commands: {} draws, {} uniform updates, {} shader binds",
            stats.commands,
            stats.draw_calls,
            stats.uniform_updates,
            stats.shader_binds
        );
        self.stats.reset();
        Ok(stats)
    }

    /// Drops the queued frame without touching the backend.
    pub fn discard(&mut self) {
        self.stack.clear();
        self.debug_queue.clear();
        self.matrices.clear();
        self.current = None;
        self.stats.reset();
    }
}

fn build_pipeline<B: GraphicsBackend>(
    backend: &B,
    label: &str,
    shaders: &ShaderSet<B>,
    layouts: Vec<B::ResourceLayout>,
) -> Result<B::Pipeline> {
    let compiled = shaders.compile(backend)?.clone();
    let desc = PipelineDescription::builder(
        backend,
        label,
        compiled.vertex,
        compiled.fragment,
        shaders.vertex_layout(),
    )
    .push_resource_layouts(layouts)
    .build();

    backend
        .create_pipeline(&desc)
        .with_context(|| format!("failed to create pipeline '{label}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::testing::{Call, RecordingBackend, GLOBALS_ID};
    use crate::gfx::CommandRecorder;
    use crate::paint::Color;
    use crate::shaders::{IndexLayout, VertexPositionColour};
    use glam::Vec3;

    fn pipeline() -> (RecordingBackend, DrawPipeline<RecordingBackend>) {
        let backend = RecordingBackend::new();
        let draw = DrawPipeline::new(backend.clone(), DrawConfig::default()).unwrap();
        (backend, draw)
    }

    fn triangle(backend: &RecordingBackend) -> VertexBuffer<RecordingBackend, VertexPositionColour> {
        let mut buf = VertexBuffer::new(backend, "tri", IndexLayout::Linear, 3);
        buf.extend(&[
            VertexPositionColour::new(0.0, 0.0, Color::WHITE),
            VertexPositionColour::new(1.0, 0.0, Color::WHITE),
            VertexPositionColour::new(0.0, 1.0, Color::WHITE),
        ])
        .unwrap();
        buf
    }

    fn uniform_values(calls: &[Call]) -> Vec<Mat4> {
        calls
            .iter()
            .filter_map(|c| match c {
                Call::UpdateUniform { offset, bytes } => {
                    assert_eq!(*offset, GlobalProperty::Model.offset());
                    let cols: Vec<f32> = bytes
                        .chunks_exact(4)
                        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                        .collect();
                    Some(Mat4::from_cols_slice(&cols))
                }
                _ => None,
            })
            .collect()
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn flush_replays_commands_in_enqueue_order() {
        let (backend, mut draw) = pipeline();
        let default_id = backend.pipelines()[0].id;
        assert_eq!(backend.pipelines()[0].label, "sylva default pipeline");
        let mut tri = triangle(&backend);

        draw.start();
        draw.draw_vertex_buffer(&mut tri);
        draw.end();
        assert_eq!(draw.queued(), 4);

        let (vid, iid) = {
            let (v, i, _) = tri.gpu_buffers().unwrap();
            (v.id, i.id)
        };
        let stats = draw.flush(()).unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                Call::Begin(Color::BLACK),
                Call::SetPipeline(default_id),
                Call::BindResourceSet { slot: 0, set: GLOBALS_ID },
                Call::SetVertexBuffer(vid),
                Call::SetIndexBuffer(iid),
                Call::DrawIndexed(3),
                Call::End,
                Call::Submit,
            ]
        );
        assert_eq!(stats.commands, 4);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(draw.queued(), 0);
    }

    #[test]
    fn empty_vertex_buffer_is_not_drawn() {
        let (backend, mut draw) = pipeline();
        let mut empty: VertexBuffer<_, VertexPositionColour> =
            VertexBuffer::new(&backend, "empty", IndexLayout::Quad, 8);

        draw.start();
        draw.draw_vertex_buffer(&mut empty);
        draw.end();
        draw.flush(()).unwrap();

        assert!(!backend.calls().iter().any(|c| matches!(c, Call::DrawIndexed(_))));
    }

    #[test]
    fn debug_draws_run_just_before_end() {
        let (backend, mut draw) = pipeline();
        let mut tri = triangle(&backend);

        draw.start();
        draw.queue_for_debug(|rec| rec.draw_indexed(99));
        draw.draw_vertex_buffer(&mut tri);
        draw.end();
        draw.flush(()).unwrap();

        let calls = backend.calls();
        let n = calls.len();
        assert_eq!(calls[n - 3..], [Call::DrawIndexed(99), Call::End, Call::Submit]);
        assert_eq!(calls[n - 4], Call::DrawIndexed(3));
    }

    #[test]
    fn discard_drops_the_frame() {
        let (backend, mut draw) = pipeline();
        draw.start();
        draw.push_matrix(Mat4::IDENTITY);
        draw.queue_for_debug(|rec| rec.draw_indexed(1));
        draw.discard();

        assert_eq!(draw.queued(), 0);
        assert_eq!(draw.matrix_depth(), 0);
        draw.flush(()).unwrap();
        assert_eq!(backend.calls(), vec![Call::Submit]);
    }

    // ── matrices ──────────────────────────────────────────────────────────

    #[test]
    fn balanced_push_pop_emits_composed_models() {
        let (backend, mut draw) = pipeline();
        let m1 = Mat4::from_translation(Vec3::new(5.0, 7.0, 0.0));
        let m2 = Mat4::from_scale(Vec3::new(2.0, 3.0, 1.0));

        draw.start();
        draw.push_matrix(m1);
        draw.push_matrix(m2);
        draw.pop_matrix();
        draw.pop_matrix();
        draw.end();
        let stats = draw.flush(()).unwrap();

        assert_eq!(uniform_values(&backend.calls()), vec![m1, m2 * m1, m1, Mat4::IDENTITY]);
        assert_eq!(stats.uniform_updates, 4);
    }

    #[test]
    fn projection_update_targets_projection_offset() {
        let (backend, mut draw) = pipeline();
        draw.start();
        draw.set_global_uniform(GlobalProperty::Projection, Mat4::IDENTITY);
        draw.end();
        draw.flush(()).unwrap();

        assert!(backend
            .calls()
            .iter()
            .any(|c| matches!(c, Call::UpdateUniform { offset: 0, .. })));
    }

    // ── shaders ───────────────────────────────────────────────────────────

    #[test]
    fn textured_shader_binds_fragment_resources_at_slot_one() {
        let (backend, mut draw) = pipeline();
        let set = ShaderSet::textured(11, 12);

        draw.start();
        draw.bind_shader(&set).unwrap();
        draw.end();

        let bound = draw.current_pipeline().unwrap().clone();
        assert_eq!(bound.resource_layouts.len(), 2);
        assert_eq!(bound.resource_layouts[0], GLOBALS_ID);
        assert_eq!(bound.vertex_stride, 32);

        draw.flush(()).unwrap();
        let calls = backend.calls();
        assert_eq!(calls[3], Call::SetPipeline(bound.id));
        assert!(matches!(calls[4], Call::BindResourceSet { slot: 1, .. }));
    }

    #[test]
    fn rebinding_reuses_compiled_modules_but_rebuilds_pipeline() {
        let (backend, mut draw) = pipeline();
        let set = ShaderSet::textured(1, 2);

        draw.start();
        draw.bind_shader(&set).unwrap();
        let first = draw.current_pipeline().unwrap().id;
        draw.bind_shader(&set).unwrap();
        let second = draw.current_pipeline().unwrap().id;
        draw.end();

        assert_eq!(backend.compile_count("textured vertex"), 1);
        assert_eq!(backend.compile_count("textured fragment"), 1);
        assert_ne!(first, second);
        assert_eq!(backend.pipelines().len(), 3);
        assert_eq!(backend.resource_set_count(), 2);

        // slots restart at 1 for every bind
        draw.flush(()).unwrap();
        let slots: Vec<u32> = backend
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::BindResourceSet { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(slots, vec![0, 1, 1]);
    }

    #[test]
    fn basic_shader_binds_no_resource_sets() {
        let (backend, mut draw) = pipeline();
        let set = ShaderSet::basic();

        draw.start();
        draw.bind_shader(&set).unwrap();
        draw.unbind_shader();
        assert!(draw.current_pipeline().is_none());
        draw.end();
        draw.flush(()).unwrap();

        let default_id = backend.pipelines()[0].id;
        let calls = backend.calls();
        assert_eq!(calls.iter().filter(|c| matches!(c, Call::BindResourceSet { .. })).count(), 1);
        assert_eq!(calls[4], Call::SetPipeline(default_id));
    }

    #[test]
    fn failed_bind_queues_nothing() {
        let (backend, mut draw) = pipeline();
        backend.fail_entry_point("vs_main");
        let set = ShaderSet::textured(1, 2);

        draw.start();
        assert!(draw.bind_shader(&set).is_err());
        assert_eq!(draw.queued(), 1);
    }

    #[test]
    fn custom_clear_colour_reaches_begin() {
        let (backend, mut draw) = pipeline();
        let teal = Color::new(0.0, 0.5, 0.5, 1.0);
        draw.set_clear_colour(teal);

        draw.start();
        draw.end();
        draw.flush(()).unwrap();
        assert_eq!(backend.calls()[0], Call::Begin(teal));
    }
}
