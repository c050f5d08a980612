use glam::Mat4;

/// LIFO of composed model matrices.
///
/// Each entry is the full product of everything pushed before it, so the top
/// is always ready to upload.
#[derive(Debug, Clone, Default)]
pub struct MatrixStack {
    stack: Vec<Mat4>,
}

impl MatrixStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `m * top` and returns it.
    pub fn push(&mut self, m: Mat4) -> Mat4 {
        let composed = m * self.top();
        self.stack.push(composed);
        composed
    }

    /// Drops the top entry and returns the one now exposed.
    ///
    /// Popping an empty stack is a no-op that yields identity.
    pub fn pop(&mut self) -> Mat4 {
        self.stack.pop();
        self.top()
    }

    /// Current composed matrix; identity when empty.
    pub fn top(&self) -> Mat4 {
        self.stack.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_balanced(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn push_composes_with_top() {
        let m1 = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let m2 = Mat4::from_scale(Vec3::splat(2.0));

        let mut s = MatrixStack::new();
        assert_eq!(s.push(m1), m1);
        assert_eq!(s.push(m2), m2 * m1);
        assert_eq!(s.depth(), 2);

        assert_eq!(s.pop(), m1);
        assert_eq!(s.pop(), Mat4::IDENTITY);
        assert!(s.is_balanced());
    }

    #[test]
    fn pop_on_empty_yields_identity() {
        let mut s = MatrixStack::new();
        assert_eq!(s.pop(), Mat4::IDENTITY);
        assert_eq!(s.depth(), 0);
    }
}
