use thiserror::Error;

use crate::coords::Rect;

/// Failures surfaced by the texture layer.
#[derive(Debug, Error)]
pub enum TextureError {
    /// An upload does not fit inside the region it targets.
    #[error(
        "texture region is too small for the upload: region is {region_width}x{region_height}, \
         upload covers {upload:?}"
    )]
    UploadOutOfRange {
        region_width: i32,
        region_height: i32,
        upload: Rect,
    },

    /// Pixel data length disagrees with the rectangle it is written to.
    #[error("pixel data has {actual} texels but {bounds:?} needs {expected}")]
    DataLength {
        bounds: Rect,
        expected: usize,
        actual: usize,
    },

    /// A write rectangle falls outside the surface.
    #[error("write {bounds:?} lies outside the {width}x{height} surface")]
    OutOfSurface { bounds: Rect, width: u32, height: u32 },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The texture device refused to create a surface.
    #[error("texture device error: {0}")]
    Device(String),
}
