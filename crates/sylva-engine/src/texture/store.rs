use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::paint::Rgba8;

use super::refcount::{RefCountArena, RefKey};
use super::{
    AtlasConfig, Texture, TextureAtlas, TextureDevice, TextureError, TextureRegion, TextureUpload,
    UploadPolicy,
};

/// Named texture cache that packs images into an atlas when it can.
///
/// Images too large for the atlas (or every image, when the store has no
/// atlas) get a dedicated texture. Safe to share with loader threads.
pub struct TextureStore<D: TextureDevice> {
    device: Arc<D>,
    atlas: Option<TextureAtlas<D>>,
    cache: Mutex<HashMap<String, TextureRegion<D>>>,
    /// Held across allocate + upload so a name claims atlas space once.
    loading: Mutex<()>,
}

impl<D: TextureDevice> TextureStore<D> {
    pub fn new(device: Arc<D>, atlas: Option<AtlasConfig>) -> Self {
        let atlas = atlas.map(|config| TextureAtlas::new(Arc::clone(&device), config));
        Self {
            device,
            atlas,
            cache: Mutex::new(HashMap::new()),
            loading: Mutex::new(()),
        }
    }

    pub fn atlas(&self) -> Option<&TextureAtlas<D>> {
        self.atlas.as_ref()
    }

    /// Returns the cached texture for `name`, uploading `upload` on first use.
    pub fn get_or_upload(&self, name: &str, upload: &TextureUpload) -> Result<TextureRegion<D>, TextureError> {
        if let Some(region) = self.get(name) {
            return Ok(region);
        }

        let _loading = self.loading.lock();
        if let Some(region) = self.get(name) {
            return Ok(region);
        }

        let region = self.allocate(name, upload.width(), upload.height())?;
        region.set_data(upload)?;

        self.cache.lock().insert(name.to_string(), region.clone());
        Ok(region)
    }

    /// Decodes `encoded` (PNG) and caches it under `name`.
    pub fn load_encoded(&self, name: &str, encoded: &[u8]) -> Result<TextureRegion<D>, TextureError> {
        if let Some(region) = self.get(name) {
            return Ok(region);
        }
        self.get_or_upload(name, &TextureUpload::decode(encoded)?)
    }

    pub fn get(&self, name: &str) -> Option<TextureRegion<D>> {
        self.cache.lock().get(name).cloned()
    }

    /// Forgets `name`. Outstanding regions keep their texture alive.
    pub fn purge(&self, name: &str) -> Option<TextureRegion<D>> {
        self.cache.lock().remove(name)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Opaque white texel for untextured draws sharing the textured pipeline.
    pub fn white_pixel(&self) -> Result<TextureRegion<D>, TextureError> {
        match &self.atlas {
            Some(atlas) => atlas.white_pixel(),
            None => {
                let texture = Texture::new(&self.device, "white pixel", 1, 1, UploadPolicy::Direct, Rgba8::WHITE)?;
                Ok(texture.whole())
            }
        }
    }

    fn allocate(&self, name: &str, width: u32, height: u32) -> Result<TextureRegion<D>, TextureError> {
        if let Some(atlas) = &self.atlas {
            if let Some(region) = atlas.add(width, height)? {
                return Ok(region);
            }
            log::info!("texture '{name}' ({width}x{height}) does not fit the atlas; using a dedicated texture");
        }

        let texture = Texture::new(&self.device, name, width, height, UploadPolicy::Direct, Rgba8::TRANSPARENT)?;
        Ok(texture.whole())
    }
}

/// Store for large, short-lived textures that bypass the atlas.
///
/// Each name maps to one dedicated texture shared through [`TextureLease`]s.
/// The texture is released as soon as the last lease is dropped.
pub struct LargeTextureStore<D: TextureDevice> {
    device: Arc<D>,
    inner: Arc<Mutex<LargeInner<D>>>,
}

struct LargeInner<D: TextureDevice> {
    names: HashMap<String, RefKey>,
    arena: RefCountArena<NamedTexture<D>>,
}

struct NamedTexture<D: TextureDevice> {
    name: String,
    texture: Texture<D>,
}

impl<D: TextureDevice> LargeTextureStore<D> {
    pub fn new(device: Arc<D>) -> Self {
        let arena = RefCountArena::new(|_, entry: NamedTexture<D>| {
            log::debug!(
                "releasing texture '{}' ({}x{})",
                entry.name,
                entry.texture.width(),
                entry.texture.height()
            );
        });

        Self {
            device,
            inner: Arc::new(Mutex::new(LargeInner {
                names: HashMap::new(),
                arena,
            })),
        }
    }

    /// Leases the texture for `name`, uploading `upload` when nobody holds it.
    pub fn lease(&self, name: &str, upload: &TextureUpload) -> Result<TextureLease<D>, TextureError> {
        let mut inner = self.inner.lock();

        if let Some(&key) = inner.names.get(name) {
            if let Some(entry) = inner.arena.acquire(key) {
                let texture = entry.texture.clone();
                return Ok(TextureLease {
                    key,
                    texture,
                    store: Arc::clone(&self.inner),
                });
            }
        }

        let texture = Texture::new(
            &self.device,
            name,
            upload.width(),
            upload.height(),
            UploadPolicy::Direct,
            Rgba8::TRANSPARENT,
        )?;
        texture.set_data(upload)?;

        let key = inner.arena.insert(NamedTexture {
            name: name.to_string(),
            texture: texture.clone(),
        });
        inner.names.insert(name.to_string(), key);

        Ok(TextureLease {
            key,
            texture,
            store: Arc::clone(&self.inner),
        })
    }

    /// Number of live textures.
    pub fn len(&self) -> usize {
        self.inner.lock().arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ref_count(&self, name: &str) -> usize {
        let inner = self.inner.lock();
        inner.names.get(name).map_or(0, |&key| inner.arena.count(key))
    }
}

/// Shared handle to a [`LargeTextureStore`] texture.
pub struct TextureLease<D: TextureDevice> {
    key: RefKey,
    texture: Texture<D>,
    store: Arc<Mutex<LargeInner<D>>>,
}

impl<D: TextureDevice> TextureLease<D> {
    pub fn texture(&self) -> &Texture<D> {
        &self.texture
    }

    pub fn region(&self) -> TextureRegion<D> {
        self.texture.whole()
    }
}

impl<D: TextureDevice> Clone for TextureLease<D> {
    fn clone(&self) -> Self {
        self.store.lock().arena.acquire(self.key);
        Self {
            key: self.key,
            texture: self.texture.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<D: TextureDevice> Drop for TextureLease<D> {
    fn drop(&mut self) {
        let mut inner = self.store.lock();
        if inner.arena.release(self.key) {
            let key = self.key;
            inner.names.retain(|_, k| *k != key);
        }
    }
}
