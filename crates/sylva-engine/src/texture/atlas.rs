use std::sync::Arc;

use parking_lot::Mutex;

use crate::coords::Rect;
use crate::paint::Rgba8;

use super::{Texture, TextureDevice, TextureError, TextureRegion, TextureUpload, UploadPolicy};

/// Side length of the opaque white region reserved at the origin of every
/// backing texture.
pub const WHITE_PIXEL_SIZE: i32 = 1;

/// Colour new backing textures are filled with. Border strips sampling only
/// this colour are never uploaded.
pub const ATLAS_FILL: Rgba8 = Rgba8::TRANSPARENT_WHITE;

/// Atlas dimensions and spacing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AtlasConfig {
    pub width: u32,
    pub height: u32,
    /// Gap between neighbouring regions and around the surface edge. Half of
    /// it is filled with duplicated edge texels on each side.
    pub padding: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            padding: 24,
        }
    }
}

impl AtlasConfig {
    pub fn max_fittable_width(&self) -> u32 {
        self.width.saturating_sub(self.padding * 2)
    }

    pub fn max_fittable_height(&self) -> u32 {
        self.height.saturating_sub(self.padding * 2)
    }

    /// Whether a `width × height` request can be placed in an empty atlas.
    ///
    /// The second check rejects requests that would only fit if the white
    /// pixel were not there.
    pub fn can_fit(&self, width: u32, height: u32) -> bool {
        let (max_w, max_h) = (self.max_fittable_width(), self.max_fittable_height());
        let white = WHITE_PIXEL_SIZE as u32;

        if width > max_w || height > max_h {
            return false;
        }

        !(width + white > max_w && height + white > max_h)
    }
}

/// Shelf packer handing out regions of a shared backing texture.
///
/// Regions are placed left to right along the cursor row. A request that runs
/// past the right edge starts a new row below the lowest region of the current
/// one. A request that runs past the bottom abandons the backing texture and
/// starts a new generation; regions from older generations keep their texture
/// alive and stay valid for drawing.
///
/// All state sits behind one lock, so loader threads may call [`add`](Self::add)
/// concurrently.
pub struct TextureAtlas<D: TextureDevice> {
    device: Arc<D>,
    config: AtlasConfig,
    state: Mutex<AtlasState<D>>,
}

struct AtlasState<D: TextureDevice> {
    backing: Option<Texture<D>>,
    /// Regions placed in the current row; the first row also holds the white pixel.
    claimed: Vec<Rect>,
    cursor: (i32, i32),
    generation: u64,
    exceed_count: u32,
}

impl<D: TextureDevice> TextureAtlas<D> {
    pub fn new(device: Arc<D>, config: AtlasConfig) -> Self {
        Self {
            device,
            config,
            state: Mutex::new(AtlasState {
                backing: None,
                claimed: Vec::new(),
                cursor: (0, 0),
                generation: 0,
                exceed_count: 0,
            }),
        }
    }

    pub fn config(&self) -> AtlasConfig {
        self.config
    }

    /// Starts a new generation with a fresh backing texture.
    pub fn reset(&self) -> Result<(), TextureError> {
        let mut state = self.state.lock();
        self.reset_locked(&mut state)
    }

    /// Claims a `width × height` region.
    ///
    /// Returns `Ok(None)` when the request cannot fit even an empty atlas;
    /// callers should fall back to a dedicated texture. The atlas is left
    /// untouched in that case.
    pub fn add(&self, width: u32, height: u32) -> Result<Option<TextureRegion<D>>, TextureError> {
        if !self.config.can_fit(width, height) {
            log::info!(
                "texture atlas: {width}x{height} does not fit a {}x{} atlas with padding {}",
                self.config.width,
                self.config.height,
                self.config.padding,
            );
            return Ok(None);
        }

        // can_fit bounds both sides by the atlas size.
        let (w, h) = (width as i32, height as i32);

        let mut state = self.state.lock();
        let (x, y) = self.find_position(&mut state, w, h)?;

        let bounds = Rect::new(x, y, w, h);
        state.claimed.push(bounds);

        let Some(backing) = state.backing.as_ref() else {
            return Err(TextureError::Device("atlas has no backing texture".into()));
        };
        Ok(Some(TextureRegion::new(backing.clone(), bounds)))
    }

    /// The reserved opaque white region of the current generation.
    pub fn white_pixel(&self) -> Result<TextureRegion<D>, TextureError> {
        let mut state = self.state.lock();
        if state.backing.is_none() {
            self.reset_locked(&mut state)?;
        }

        let Some(backing) = state.backing.as_ref() else {
            return Err(TextureError::Device("atlas has no backing texture".into()));
        };
        Ok(TextureRegion::new(
            backing.clone(),
            Rect::new(0, 0, WHITE_PIXEL_SIZE, WHITE_PIXEL_SIZE),
        ))
    }

    /// Current backing texture, if one has been created.
    pub fn current_texture(&self) -> Option<Texture<D>> {
        self.state.lock().backing.clone()
    }

    /// Next allocation position.
    pub fn cursor(&self) -> (i32, i32) {
        self.state.lock().cursor
    }

    pub fn claimed_regions(&self) -> Vec<Rect> {
        self.state.lock().claimed.clone()
    }

    /// Number of backing textures created so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Number of times the atlas ran out of vertical space.
    pub fn exceed_count(&self) -> u32 {
        self.state.lock().exceed_count
    }

    fn reset_locked(&self, state: &mut AtlasState<D>) -> Result<(), TextureError> {
        let policy = UploadPolicy::Padded {
            padding: self.config.padding as i32,
            sentinel: ATLAS_FILL,
        };
        let texture = Texture::new(
            &self.device,
            "sylva atlas",
            self.config.width,
            self.config.height,
            policy,
            ATLAS_FILL,
        )?;

        let white = Rect::new(0, 0, WHITE_PIXEL_SIZE, WHITE_PIXEL_SIZE);
        TextureRegion::new(texture.clone(), white).set_data(&TextureUpload::solid(
            WHITE_PIXEL_SIZE as u32,
            WHITE_PIXEL_SIZE as u32,
            Rgba8::WHITE,
        ))?;

        let p = self.config.padding as i32;
        state.claimed.clear();
        state.claimed.push(white);
        state.cursor = (p + WHITE_PIXEL_SIZE, p);
        state.backing = Some(texture);
        state.generation += 1;

        log::debug!("texture atlas generation {} started", state.generation);
        Ok(())
    }

    fn find_position(&self, state: &mut AtlasState<D>, w: i32, h: i32) -> Result<(i32, i32), TextureError> {
        let (atlas_w, atlas_h) = (self.config.width as i32, self.config.height as i32);
        let p = self.config.padding as i32;

        // Terminates: after a reset or a wrap the request fits the row, as
        // guaranteed by `can_fit`.
        loop {
            if state.backing.is_none() {
                log::info!("texture atlas initialised ({atlas_w}x{atlas_h})");
                self.reset_locked(state)?;
            }

            let (x, y) = state.cursor;

            if y + h + p > atlas_h {
                state.exceed_count += 1;
                log::info!(
                    "texture atlas size exceeded {} time(s); generating new texture ({atlas_w}x{atlas_h})",
                    state.exceed_count,
                );
                self.reset_locked(state)?;
                continue;
            }

            if x + w + p > atlas_w {
                let row_y = state.claimed.iter().map(|b| b.bottom() + p).max().unwrap_or(0);
                state.claimed.clear();
                state.cursor = (p, row_y);
                continue;
            }

            state.cursor.0 += w + p;
            return Ok((x, y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::CpuTextureDevice;

    fn atlas(size: u32, padding: u32) -> TextureAtlas<CpuTextureDevice> {
        TextureAtlas::new(
            Arc::new(CpuTextureDevice),
            AtlasConfig { width: size, height: size, padding },
        )
    }

    fn add(a: &TextureAtlas<CpuTextureDevice>, w: u32, h: u32) -> TextureRegion<CpuTextureDevice> {
        a.add(w, h).unwrap().expect("request should fit")
    }

    // ── reset ─────────────────────────────────────────────────────────────

    #[test]
    fn reset_reserves_white_pixel() {
        let a = atlas(64, 8);
        a.reset().unwrap();

        assert_eq!(a.claimed_regions(), vec![Rect::new(0, 0, 1, 1)]);
        assert_eq!(a.cursor(), (9, 8));

        let tex = a.current_texture().unwrap();
        assert_eq!(tex.native().pixel(0, 0), Rgba8::WHITE);
        assert_eq!(tex.native().pixel(1, 0), ATLAS_FILL);
    }

    #[test]
    fn white_pixel_creates_backing_lazily() {
        let a = atlas(64, 8);
        assert!(a.current_texture().is_none());
        let white = a.white_pixel().unwrap();
        assert_eq!(white.bounds(), Rect::new(0, 0, 1, 1));
        assert_eq!(a.generation(), 1);
    }

    // ── placement ─────────────────────────────────────────────────────────

    #[test]
    fn placement_scenario_64_padding_8() {
        let a = atlas(64, 8);

        let first = add(&a, 20, 20);
        assert_eq!(first.bounds(), Rect::new(9, 8, 20, 20));
        assert_eq!(a.cursor(), (37, 8));

        // 37 + 20 + 8 > 64: wraps below the tallest region of the first row.
        let second = add(&a, 20, 20);
        assert_eq!(second.bounds(), Rect::new(8, 36, 20, 20));

        let third = add(&a, 20, 20);
        assert_eq!(third.bounds(), Rect::new(36, 36, 20, 20));

        assert_eq!(first.texture(), second.texture());
        assert_eq!(second.texture(), third.texture());

        // Next row would start at y = 64; the generation is exhausted.
        let fourth = add(&a, 20, 20);
        assert_eq!(fourth.bounds(), Rect::new(9, 8, 20, 20));
        assert_ne!(fourth.texture().id(), first.texture().id());
        assert_eq!(a.exceed_count(), 1);
        assert_eq!(a.generation(), 2);
    }

    #[test]
    fn row_wrap_uses_max_bottom_plus_padding() {
        let a = atlas(128, 4);

        add(&a, 30, 10);
        add(&a, 30, 25);
        add(&a, 30, 5);
        // cursor.x = 5 + 3 * 34 = 107; 107 + 30 + 4 > 128 wraps
        let next = add(&a, 30, 10);

        // tallest region in the row: y = 4, height 25
        assert_eq!(next.bounds(), Rect::new(4, 4 + 25 + 4, 30, 10));
        assert_eq!(a.claimed_regions(), vec![next.bounds()]);
    }

    #[test]
    fn regions_stay_inside_and_never_overlap() {
        let a = atlas(256, 6);
        let sizes = [(17, 9), (40, 33), (5, 60), (90, 12), (64, 64), (1, 1), (120, 20), (33, 47), (8, 8)];

        let mut by_texture: Vec<TextureRegion<CpuTextureDevice>> = Vec::new();
        for round in 0..6 {
            for &(w, h) in &sizes {
                let region = add(&a, w + round, h);
                let b = region.bounds();
                assert!(Rect::from_size(256, 256).contains_rect(b), "{b:?} escapes the atlas");

                for other in by_texture.iter().filter(|o| o.texture() == region.texture()) {
                    assert!(
                        !other.bounds().intersects(b),
                        "{:?} overlaps {:?}",
                        other.bounds(),
                        b
                    );
                }
                by_texture.push(region);
            }
        }
        assert!(a.generation() > 1);
    }

    #[test]
    fn height_overflow_starts_new_backing_texture() {
        let a = atlas(64, 8);
        let tall = add(&a, 10, 40);
        assert_eq!(tall.bounds(), Rect::new(9, 8, 10, 40));

        // Wrapping puts the next row at y = 56; 56 + 10 + 8 > 64.
        let next = add(&a, 40, 10);
        assert_eq!(next.bounds(), Rect::new(9, 8, 40, 10));
        assert_ne!(next.texture().id(), tall.texture().id());
        assert_eq!(a.exceed_count(), 1);

        // The old texture is still intact for drawing.
        assert_eq!(tall.texture().native().pixel(0, 0), Rgba8::WHITE);
    }

    // ── rejection ─────────────────────────────────────────────────────────

    #[test]
    fn oversized_requests_leave_atlas_untouched() {
        let a = atlas(64, 8);
        add(&a, 10, 10);
        let cursor = a.cursor();
        let claimed = a.claimed_regions();
        let generation = a.generation();

        assert!(a.add(65, 1).unwrap().is_none());
        assert!(a.add(1, 65).unwrap().is_none());
        assert!(a.add(49, 1).unwrap().is_none());

        assert_eq!(a.cursor(), cursor);
        assert_eq!(a.claimed_regions(), claimed);
        assert_eq!(a.generation(), generation);
    }

    #[test]
    fn full_size_on_both_axes_is_rejected() {
        let config = AtlasConfig { width: 64, height: 64, padding: 8 };
        assert!(config.can_fit(48, 47));
        assert!(config.can_fit(47, 48));
        assert!(!config.can_fit(48, 48));
    }

    #[test]
    fn max_width_request_wraps_below_white_pixel() {
        let a = atlas(64, 8);
        let wide = add(&a, 48, 10);
        assert_eq!(wide.bounds(), Rect::new(8, 9, 48, 10));
    }

    // ── padding ───────────────────────────────────────────────────────────

    #[test]
    fn region_upload_is_padded_in_backing_texture() {
        let a = atlas(64, 8);
        let region = add(&a, 4, 4);
        let red = Rgba8::new(255, 0, 0, 255);
        region.set_data(&TextureUpload::solid(4, 4, red)).unwrap();

        let s = region.texture().native();
        assert_eq!(s.pixel(9, 8), red);
        // four texels of border (padding / 2) on each side
        assert_eq!(s.pixel(5, 8), red.with_alpha(0));
        assert_eq!(s.pixel(4, 8), ATLAS_FILL);
        assert_eq!(s.pixel(9, 4), red.with_alpha(0));
        assert_eq!(s.pixel(16, 15), red.with_alpha(0));
    }

    #[test]
    fn concurrent_adds_do_not_overlap() {
        let a = Arc::new(atlas(512, 4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let a = Arc::clone(&a);
                std::thread::spawn(move || (0..20).map(|_| add(&a, 12, 12).bounds()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<Rect> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_by_key(|r| (r.y, r.x));
        all.dedup();
        assert_eq!(all.len(), 80);
        assert_eq!(a.generation(), 1);
    }
}
