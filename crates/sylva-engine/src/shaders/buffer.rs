use anyhow::{ensure, Result};

use crate::gfx::{BufferUsage, GraphicsBackend};

use super::Vertex;

/// How indices are generated from the vertex list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IndexLayout {
    /// One index per vertex, in order.
    Linear,
    /// Every four vertices form a quad drawn as two triangles (`0 1 2 2 3 0`).
    /// Trailing vertices that do not complete a quad are not drawn.
    Quad,
}

impl IndexLayout {
    pub fn indices(self, vertex_count: usize) -> Vec<u16> {
        match self {
            IndexLayout::Linear => (0..vertex_count as u16).collect(),
            IndexLayout::Quad => (0..(vertex_count / 4) as u16)
                .flat_map(|q| {
                    let b = q * 4;
                    [b, b + 1, b + 2, b + 2, b + 3, b]
                })
                .collect(),
        }
    }
}

/// Largest vertex count addressable with 16-bit indices.
pub const MAX_VERTICES: usize = u16::MAX as usize;

/// CPU-side vertices with lazily built backend buffers.
///
/// Any mutation marks the buffer dirty; the next draw re-uploads both the
/// vertex and index buffers.
pub struct VertexBuffer<B: GraphicsBackend, T: Vertex> {
    backend: B,
    label: String,
    index_layout: IndexLayout,
    capacity: usize,
    vertices: Vec<T>,
    uploaded: Option<Uploaded<B>>,
}

struct Uploaded<B: GraphicsBackend> {
    vertices: B::Buffer,
    indices: B::Buffer,
    index_count: u32,
}

impl<B: GraphicsBackend, T: Vertex> VertexBuffer<B, T> {
    pub fn new(backend: &B, label: &str, index_layout: IndexLayout, capacity: usize) -> Self {
        Self {
            backend: backend.clone(),
            label: label.to_string(),
            index_layout,
            capacity: capacity.min(MAX_VERTICES),
            vertices: Vec::new(),
            uploaded: None,
        }
    }

    pub fn index_layout(&self) -> IndexLayout {
        self.index_layout
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn vertices(&self) -> &[T] {
        &self.vertices
    }

    /// Number of indices a draw of this buffer issues.
    pub fn len(&self) -> usize {
        match self.index_layout {
            IndexLayout::Linear => self.vertices.len(),
            IndexLayout::Quad => self.vertices.len() / 4 * 6,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, vertex: T) -> Result<()> {
        self.extend(std::slice::from_ref(&vertex))
    }

    pub fn extend(&mut self, vertices: &[T]) -> Result<()> {
        ensure!(
            self.vertices.len() + vertices.len() <= self.capacity,
            "vertex buffer '{}' is full ({} vertices)",
            self.label,
            self.capacity
        );
        self.vertices.extend_from_slice(vertices);
        self.uploaded = None;
        Ok(())
    }

    /// Replaces the vertex at `index`; out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, vertex: T) {
        if let Some(slot) = self.vertices.get_mut(index) {
            *slot = vertex;
            self.uploaded = None;
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.uploaded = None;
    }

    /// Backend buffers for the current contents, uploading when dirty.
    ///
    /// Returns `None` when there is nothing to draw.
    pub fn gpu_buffers(&mut self) -> Option<(B::Buffer, B::Buffer, u32)> {
        if self.is_empty() {
            return None;
        }

        if self.uploaded.is_none() {
            let indices = self.index_layout.indices(self.vertices.len());
            let vertices = self.backend.create_buffer(
                &format!("{} vertices", self.label),
                bytemuck::cast_slice(&self.vertices),
                BufferUsage::Vertex,
            );
            let index_buffer = self.backend.create_buffer(
                &format!("{} indices", self.label),
                bytemuck::cast_slice(&indices),
                BufferUsage::Index,
            );
            self.uploaded = Some(Uploaded {
                vertices,
                indices: index_buffer,
                index_count: indices.len() as u32,
            });
        }

        self.uploaded
            .as_ref()
            .map(|u| (u.vertices.clone(), u.indices.clone(), u.index_count))
    }
}
