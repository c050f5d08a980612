use std::collections::VecDeque;

use crate::gfx::GraphicsBackend;

use super::DrawCommand;

/// FIFO of queued draw commands, drained on every flush.
pub struct DrawStack<B: GraphicsBackend> {
    queue: VecDeque<DrawCommand<B>>,
}

impl<B: GraphicsBackend> Default for DrawStack<B> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<B: GraphicsBackend> DrawStack<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DrawCommand<B>) {
        self.queue.push_back(command);
    }

    /// Removes the oldest command.
    pub fn pop(&mut self) -> Option<DrawCommand<B>> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::testing::RecordingBackend;
    use crate::render::GlobalProperty;
    use glam::Mat4;

    #[test]
    fn pops_in_push_order() {
        let mut s: DrawStack<RecordingBackend> = DrawStack::new();
        s.push(DrawCommand::End);
        s.push(DrawCommand::DrawDebug);
        s.push(DrawCommand::UpdateUniform {
            property: GlobalProperty::Model,
            value: Mat4::IDENTITY,
        });
        assert_eq!(s.len(), 3);

        assert!(matches!(s.pop(), Some(DrawCommand::End)));
        assert!(matches!(s.pop(), Some(DrawCommand::DrawDebug)));
        assert!(matches!(s.pop(), Some(DrawCommand::UpdateUniform { .. })));
        assert!(s.pop().is_none());
    }
}
