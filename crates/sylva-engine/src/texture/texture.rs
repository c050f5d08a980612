use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::coords::Rect;
use crate::paint::Rgba8;

use super::{TextureDevice, TextureError, TextureId, TextureUpload, UploadPolicy};

/// A device surface plus the policy its uploads go through.
///
/// Cheap to clone; clones share the surface. The surface lives until the last
/// clone (including every [`TextureRegion`] cut from it) is dropped.
pub struct Texture<D: TextureDevice> {
    inner: Arc<TextureInner<D>>,
}

struct TextureInner<D: TextureDevice> {
    id: TextureId,
    label: String,
    device: Arc<D>,
    native: D::Native,
    width: u32,
    height: u32,
    policy: UploadPolicy,
    /// Serializes multi-write uploads so borders and body land together.
    uploads: Mutex<()>,
}

impl<D: TextureDevice> Texture<D> {
    pub fn new(
        device: &Arc<D>,
        label: &str,
        width: u32,
        height: u32,
        policy: UploadPolicy,
        fill: Rgba8,
    ) -> Result<Self, TextureError> {
        let native = device.create_texture(label, width, height, fill)?;
        log::debug!("created texture '{label}' ({width}x{height}, {policy:?})");

        Ok(Self {
            inner: Arc::new(TextureInner {
                id: TextureId::next(),
                label: label.to_string(),
                device: Arc::clone(device),
                native,
                width,
                height,
                policy,
                uploads: Mutex::new(()),
            }),
        })
    }

    pub fn id(&self) -> TextureId {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.inner.width as i32, self.inner.height as i32)
    }

    pub fn policy(&self) -> UploadPolicy {
        self.inner.policy
    }

    pub fn native(&self) -> &D::Native {
        &self.inner.native
    }

    /// Region covering the whole surface.
    pub fn whole(&self) -> TextureRegion<D> {
        TextureRegion::new(self.clone(), self.bounds())
    }

    /// Applies `upload` through this texture's upload policy.
    ///
    /// `upload.bounds` is in surface coordinates. Empty bounds replace the
    /// whole surface.
    pub fn set_data(&self, upload: &TextureUpload) -> Result<(), TextureError> {
        self.write(upload.bounds, upload.data())
    }

    pub(crate) fn write(&self, bounds: Rect, data: &[Rgba8]) -> Result<(), TextureError> {
        let inner = &*self.inner;
        let surface = self.bounds();
        let writes = inner.policy.plan(surface, bounds, data);

        let _guard = inner.uploads.lock();
        for write in writes {
            if !surface.contains_rect(write.bounds) {
                return Err(TextureError::OutOfSurface {
                    bounds: write.bounds,
                    width: inner.width,
                    height: inner.height,
                });
            }
            if write.pixels.len() != write.bounds.area() {
                return Err(TextureError::DataLength {
                    bounds: write.bounds,
                    expected: write.bounds.area(),
                    actual: write.pixels.len(),
                });
            }
            inner.device.write_texture(&inner.native, write.bounds, &write.pixels)?;
        }

        Ok(())
    }
}

impl<D: TextureDevice> Clone for Texture<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: TextureDevice> PartialEq for Texture<D> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<D: TextureDevice> fmt::Debug for Texture<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("size", &(self.inner.width, self.inner.height))
            .finish()
    }
}

/// A rectangle of a parent [`Texture`].
///
/// Holds the parent alive, so regions handed out by an atlas stay drawable
/// after the atlas has moved on to a new backing texture.
pub struct TextureRegion<D: TextureDevice> {
    texture: Texture<D>,
    bounds: Rect,
}

impl<D: TextureDevice> TextureRegion<D> {
    pub fn new(texture: Texture<D>, bounds: Rect) -> Self {
        Self { texture, bounds }
    }

    pub fn texture(&self) -> &Texture<D> {
        &self.texture
    }

    /// Bounds inside the parent surface.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn width(&self) -> u32 {
        self.bounds.width.max(0) as u32
    }

    pub fn height(&self) -> u32 {
        self.bounds.height.max(0) as u32
    }

    /// Uploads into this region.
    ///
    /// `upload.bounds` is region-relative; empty bounds target the whole
    /// region. Uploads reaching past the region, or whose texel count does
    /// not match the rectangle they target, are rejected before anything is
    /// written, so a region never touches its neighbours.
    pub fn set_data(&self, upload: &TextureUpload) -> Result<(), TextureError> {
        let local = upload.bounds;
        let extent = Rect::from_size(self.bounds.width, self.bounds.height);
        if local.width > self.bounds.width
            || local.height > self.bounds.height
            || (!local.is_empty() && !extent.contains_rect(local))
        {
            return Err(TextureError::UploadOutOfRange {
                region_width: self.bounds.width,
                region_height: self.bounds.height,
                upload: local,
            });
        }

        let local = if local.is_empty() { extent } else { local };
        if upload.data().len() != local.area() {
            return Err(TextureError::DataLength {
                bounds: local,
                expected: local.area(),
                actual: upload.data().len(),
            });
        }

        self.texture.write(local.offset(self.bounds.x, self.bounds.y), upload.data())
    }

    /// Normalized `[u0, v0, u1, v1]` of this region in the parent surface.
    pub fn uv_rect(&self) -> [f32; 4] {
        let w = self.texture.width().max(1) as f32;
        let h = self.texture.height().max(1) as f32;
        [
            self.bounds.x as f32 / w,
            self.bounds.y as f32 / h,
            self.bounds.right() as f32 / w,
            self.bounds.bottom() as f32 / h,
        ]
    }
}

impl<D: TextureDevice> Clone for TextureRegion<D> {
    fn clone(&self) -> Self {
        Self {
            texture: self.texture.clone(),
            bounds: self.bounds,
        }
    }
}

impl<D: TextureDevice> fmt::Debug for TextureRegion<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureRegion")
            .field("texture", &self.texture.id())
            .field("bounds", &self.bounds)
            .finish()
    }
}
