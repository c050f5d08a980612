use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// WGSL declaration of the global uniform block, prepended to every shader.
pub const GLOBALS_WGSL: &str = "\
struct Globals {
    projection: mat4x4<f32>,
    model: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;
";

/// CPU mirror of the `Globals` block bound at slot 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GlobalUniforms {
    pub projection: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
}

pub const GLOBALS_SIZE: u64 = size_of::<GlobalUniforms>() as u64;

impl Default for GlobalUniforms {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

/// A named matrix inside the global uniform block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GlobalProperty {
    Projection,
    Model,
}

impl GlobalProperty {
    /// Byte offset inside [`GlobalUniforms`].
    pub const fn offset(self) -> u64 {
        match self {
            GlobalProperty::Projection => offset_of!(GlobalUniforms, projection) as u64,
            GlobalProperty::Model => offset_of!(GlobalUniforms, model) as u64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            GlobalProperty::Projection => "projection",
            GlobalProperty::Model => "model",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_match_wgsl_layout() {
        assert_eq!(GlobalProperty::Projection.offset(), 0);
        assert_eq!(GlobalProperty::Model.offset(), 64);
        assert_eq!(GLOBALS_SIZE, 128);
    }

    #[test]
    fn defaults_are_identity() {
        let g = GlobalUniforms::default();
        assert_eq!(Mat4::from_cols_array_2d(&g.projection), Mat4::IDENTITY);
        assert_eq!(Mat4::from_cols_array_2d(&g.model), Mat4::IDENTITY);
    }
}
