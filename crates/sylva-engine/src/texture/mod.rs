//! Texture surfaces, atlasing and stores.
//!
//! Layering, leaf first:
//! - [`TextureDevice`] creates surfaces and replaces rectangles of texels
//! - [`Texture`] applies an [`UploadPolicy`] (plain or padded) on top
//! - [`TextureRegion`] offsets and bounds-checks uploads into a parent texture
//! - [`TextureAtlas`] shelf-packs regions into padded backing textures
//! - [`TextureStore`] / [`LargeTextureStore`] cache named images

mod atlas;
mod cpu;
mod device;
mod error;
mod padding;
mod refcount;
mod store;
#[allow(clippy::module_inception)]
mod texture;
mod upload;

pub use atlas::{AtlasConfig, TextureAtlas, ATLAS_FILL, WHITE_PIXEL_SIZE};
pub use cpu::{CpuSurface, CpuTextureDevice};
pub use device::{TextureDevice, TextureId};
pub use error::TextureError;
pub use padding::UploadPolicy;
pub use refcount::{RefCountArena, RefKey};
pub use store::{LargeTextureStore, TextureLease, TextureStore};
pub use texture::{Texture, TextureRegion};
pub use upload::TextureUpload;
