use bytemuck::{Pod, Zeroable};

use crate::gfx::VertexLayout;
use crate::paint::Color;

/// Plain-old-data vertex with a fixed attribute table.
pub trait Vertex: Pod {
    fn layout() -> VertexLayout;
}

/// Untextured vertex: logical-pixel position plus straight-alpha colour.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct VertexPositionColour {
    pub position: [f32; 2],
    pub colour: [f32; 4],
}

impl VertexPositionColour {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];

    pub fn new(x: f32, y: f32, colour: Color) -> Self {
        Self {
            position: [x, y],
            colour: colour.to_array(),
        }
    }
}

impl Vertex for VertexPositionColour {
    fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: Self::ATTRS.to_vec(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct VertexUvColour {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub colour: [f32; 4],
}

impl VertexUvColour {
    const ATTRS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    pub fn new(x: f32, y: f32, u: f32, v: f32, colour: Color) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
            colour: colour.to_array(),
        }
    }
}

impl Vertex for VertexUvColour {
    fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: Self::ATTRS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_cover_all_attributes() {
        assert_eq!(VertexPositionColour::layout().stride, 24);
        assert_eq!(VertexUvColour::layout().stride, 32);

        let attrs = VertexUvColour::layout().attributes;
        assert_eq!(attrs[1].offset, 8);
        assert_eq!(attrs[2].offset, 16);
        assert_eq!(attrs[2].shader_location, 2);
    }
}
