use glam::Mat4;

use crate::gfx::{CommandRecorder, GraphicsBackend};
use crate::paint::Color;

use super::GlobalProperty;

/// Deferred draw work replayed at [`DrawCommand::DrawDebug`].
pub type DebugDraw<B> = Box<dyn FnOnce(&mut <B as GraphicsBackend>::Recorder)>;

/// One deferred backend operation.
///
/// Every variant owns (clones of) the handles it needs, so resources stay
/// alive until the command has executed.
pub enum DrawCommand<B: GraphicsBackend> {
    /// Clears the target, binds the default pipeline and the global set at slot 0.
    Start {
        clear: Color,
        pipeline: B::Pipeline,
        globals: B::ResourceSet,
    },
    SetPipeline(B::Pipeline),
    BindResourceSet {
        slot: u32,
        set: B::ResourceSet,
    },
    DrawVertexBuffer {
        vertices: B::Buffer,
        indices: B::Buffer,
        index_count: u32,
    },
    UpdateUniform {
        property: GlobalProperty,
        value: Mat4,
    },
    /// Runs every debug draw queued during the frame.
    DrawDebug,
    End,
}

impl<B: GraphicsBackend> DrawCommand<B> {
    pub fn execute(self, recorder: &mut B::Recorder, debug: &mut Vec<DebugDraw<B>>) {
        match self {
            DrawCommand::Start { clear, pipeline, globals } => {
                recorder.begin(clear);
                recorder.set_pipeline(&pipeline);
                recorder.bind_resource_set(0, &globals);
            }
            DrawCommand::SetPipeline(pipeline) => recorder.set_pipeline(&pipeline),
            DrawCommand::BindResourceSet { slot, set } => recorder.bind_resource_set(slot, &set),
            DrawCommand::DrawVertexBuffer {
                vertices,
                indices,
                index_count,
            } => {
                recorder.set_vertex_buffer(&vertices);
                recorder.set_index_buffer(&indices);
                recorder.draw_indexed(index_count);
            }
            DrawCommand::UpdateUniform { property, value } => {
                let cols = value.to_cols_array();
                recorder.update_uniform(property.offset(), bytemuck::cast_slice(&cols));
            }
            DrawCommand::DrawDebug => {
                for draw in debug.drain(..) {
                    draw(recorder);
                }
            }
            DrawCommand::End => recorder.end(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DrawCommand::Start { .. } => "start",
            DrawCommand::SetPipeline(_) => "set_pipeline",
            DrawCommand::BindResourceSet { .. } => "bind_resource_set",
            DrawCommand::DrawVertexBuffer { .. } => "draw_vertex_buffer",
            DrawCommand::UpdateUniform { .. } => "update_uniform",
            DrawCommand::DrawDebug => "draw_debug",
            DrawCommand::End => "end",
        }
    }
}

impl<B: GraphicsBackend> std::fmt::Debug for DrawCommand<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::testing::{Call, RecordingBackend};
    use crate::gfx::BufferUsage;

    fn run(backend: &RecordingBackend, cmds: Vec<DrawCommand<RecordingBackend>>, debug: &mut Vec<DebugDraw<RecordingBackend>>) {
        let mut rec = backend.begin_recording(());
        for c in cmds {
            c.execute(&mut rec, debug);
        }
    }

    #[test]
    fn draw_binds_buffers_then_draws() {
        let b = RecordingBackend::new();
        let v = b.create_buffer("v", &[0; 16], BufferUsage::Vertex);
        let i = b.create_buffer("i", &[0; 12], BufferUsage::Index);
        let (vid, iid) = (v.id, i.id);

        run(
            &b,
            vec![DrawCommand::DrawVertexBuffer {
                vertices: v,
                indices: i,
                index_count: 6,
            }],
            &mut Vec::new(),
        );

        assert_eq!(
            b.calls(),
            vec![Call::SetVertexBuffer(vid), Call::SetIndexBuffer(iid), Call::DrawIndexed(6)]
        );
    }

    #[test]
    fn uniform_update_writes_matrix_bytes_at_property_offset() {
        let b = RecordingBackend::new();
        let m = Mat4::from_scale(glam::Vec3::splat(3.0));
        run(
            &b,
            vec![DrawCommand::UpdateUniform {
                property: GlobalProperty::Model,
                value: m,
            }],
            &mut Vec::new(),
        );

        let expected: Vec<u8> = bytemuck::cast_slice(&m.to_cols_array()).to_vec();
        assert_eq!(
            b.calls(),
            vec![Call::UpdateUniform {
                offset: 64,
                bytes: expected
            }]
        );
    }

    #[test]
    fn draw_debug_drains_queue() {
        let b = RecordingBackend::new();
        let mut debug: Vec<DebugDraw<RecordingBackend>> = vec![
            Box::new(|r| r.draw_indexed(3)),
            Box::new(|r| r.draw_indexed(6)),
        ];

        run(&b, vec![DrawCommand::DrawDebug, DrawCommand::End], &mut debug);

        assert!(debug.is_empty());
        assert_eq!(b.calls(), vec![Call::DrawIndexed(3), Call::DrawIndexed(6), Call::End]);
    }
}
