/// Counters for one flushed frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStatistics {
    pub commands: usize,
    pub draw_calls: usize,
    pub uniform_updates: usize,
    pub shader_binds: usize,
}

impl FrameStatistics {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
