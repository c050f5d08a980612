use std::borrow::Cow;

use crate::coords::Rect;
use crate::paint::Rgba8;

/// How a texture turns one upload into surface writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UploadPolicy {
    /// Write the upload as-is.
    Direct,
    /// Surround every upload with a border of duplicated edge texels, `padding / 2`
    /// deep, so filtering at region edges never samples a neighbour.
    ///
    /// Border texels keep the RGB of the nearest edge texel and have alpha 0.
    /// Border strips whose source texels all match `sentinel` (RGB only) are
    /// skipped, since the surface was created filled with it.
    Padded { padding: i32, sentinel: Rgba8 },
}

/// One plain replace of `bounds` on the surface.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SurfaceWrite<'a> {
    pub bounds: Rect,
    pub pixels: Cow<'a, [Rgba8]>,
}

impl UploadPolicy {
    /// Writes for uploading `data` to `bounds` on a surface covering `surface`.
    ///
    /// Border strips come first (top, bottom, left, right, then the four
    /// corners); the upload itself is always the last write.
    pub(crate) fn plan<'a>(&self, surface: Rect, bounds: Rect, data: &'a [Rgba8]) -> Vec<SurfaceWrite<'a>> {
        let whole = |bounds: Rect| SurfaceWrite {
            bounds,
            pixels: Cow::Borrowed(data),
        };

        match *self {
            UploadPolicy::Direct if bounds.is_empty() => vec![whole(surface)],
            UploadPolicy::Direct => vec![whole(bounds)],
            UploadPolicy::Padded { .. } if bounds.is_empty() => vec![whole(surface)],
            // Too few texels to sample a border from: plain replace.
            UploadPolicy::Padded { .. } if data.len() < bounds.area() => vec![whole(bounds)],
            UploadPolicy::Padded { padding, sentinel } => {
                // Trailing texels past `bounds` are ignored.
                let body = &data[..bounds.area()];
                let mut writes = border_writes(surface, padding / 2, sentinel, bounds, body);
                writes.push(SurfaceWrite {
                    bounds,
                    pixels: Cow::Borrowed(body),
                });
                writes
            }
        }
    }
}

fn border_writes(
    surface: Rect,
    depth: i32,
    sentinel: Rgba8,
    b: Rect,
    data: &[Rgba8],
) -> Vec<SurfaceWrite<'static>> {
    if depth <= 0 {
        return Vec::new();
    }

    let strips = [
        Rect::new(b.x, b.y - depth, b.width, depth),
        Rect::new(b.x, b.bottom(), b.width, depth),
        Rect::new(b.x - depth, b.y, depth, b.height),
        Rect::new(b.right(), b.y, depth, b.height),
        Rect::new(b.x - depth, b.y - depth, depth, depth),
        Rect::new(b.right(), b.y - depth, depth, depth),
        Rect::new(b.x - depth, b.bottom(), depth, depth),
        Rect::new(b.right(), b.bottom(), depth, depth),
    ];

    strips
        .into_iter()
        .filter_map(|strip| {
            let clipped = strip.intersect(surface);
            if clipped.is_empty() {
                return None;
            }

            let mut blank = true;
            let mut pixels = Vec::with_capacity(clipped.area());

            // Clamping into `b` picks the nearest edge row/column, or the
            // corner texel for diagonal strips.
            for y in clipped.y..clipped.bottom() {
                let sy = (y - b.y).clamp(0, b.height - 1);
                for x in clipped.x..clipped.right() {
                    let sx = (x - b.x).clamp(0, b.width - 1);
                    let src = data[(sy * b.width + sx) as usize];
                    blank &= src.rgb_eq(sentinel);
                    pixels.push(src.with_alpha(0));
                }
            }

            (!blank).then(|| SurfaceWrite {
                bounds: clipped,
                pixels: Cow::Owned(pixels),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: Rect = Rect::from_size(32, 32);

    fn padded(padding: i32) -> UploadPolicy {
        UploadPolicy::Padded {
            padding,
            sentinel: Rgba8::TRANSPARENT_WHITE,
        }
    }

    /// Opaque gradient so every source texel is distinguishable.
    fn gradient(w: i32, h: i32) -> Vec<Rgba8> {
        (0..h)
            .flat_map(|y| (0..w).map(move |x| Rgba8::new((10 * x) as u8, (10 * y) as u8, 100, 255)))
            .collect()
    }

    // ── direct ────────────────────────────────────────────────────────────

    #[test]
    fn direct_writes_bounds_only() {
        let data = gradient(2, 2);
        let writes = UploadPolicy::Direct.plan(SURFACE, Rect::new(4, 4, 2, 2), &data);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].bounds, Rect::new(4, 4, 2, 2));
    }

    #[test]
    fn direct_empty_bounds_replaces_surface() {
        let data = vec![Rgba8::WHITE; 32 * 32];
        let writes = UploadPolicy::Direct.plan(SURFACE, Rect::EMPTY, &data);
        assert_eq!(writes[0].bounds, SURFACE);
    }

    // ── padded layout ─────────────────────────────────────────────────────

    #[test]
    fn padded_emits_eight_strips_then_upload() {
        let data = gradient(4, 4);
        let b = Rect::new(8, 8, 4, 4);
        let writes = padded(4).plan(SURFACE, b, &data);

        let bounds: Vec<Rect> = writes.iter().map(|w| w.bounds).collect();
        assert_eq!(
            bounds,
            vec![
                Rect::new(8, 6, 4, 2),
                Rect::new(8, 12, 4, 2),
                Rect::new(6, 8, 2, 4),
                Rect::new(12, 8, 2, 4),
                Rect::new(6, 6, 2, 2),
                Rect::new(12, 6, 2, 2),
                Rect::new(6, 12, 2, 2),
                Rect::new(12, 12, 2, 2),
                b,
            ]
        );
        assert_eq!(writes.last().unwrap().pixels.as_ref(), data.as_slice());
    }

    #[test]
    fn border_copies_nearest_edge_rgb_with_zero_alpha() {
        let data = gradient(4, 4);
        let writes = padded(4).plan(SURFACE, Rect::new(8, 8, 4, 4), &data);

        // top strip: every row repeats source row 0
        let top = &writes[0];
        for row in 0..2 {
            for x in 0..4 {
                let px = top.pixels[row * 4 + x];
                assert_eq!(px, data[x].with_alpha(0));
            }
        }

        // right strip: every column repeats source column 3
        let right = &writes[3];
        for y in 0..4 {
            for col in 0..2 {
                let px = right.pixels[y * 2 + col];
                assert_eq!(px, data[y * 4 + 3].with_alpha(0));
            }
        }

        // bottom-left corner: source texel (0, 3)
        let corner = &writes[6];
        assert!(corner.pixels.iter().all(|&px| px == data[12].with_alpha(0)));

        for w in &writes[..8] {
            assert!(w.pixels.iter().all(|px| px.a == 0));
        }
    }

    #[test]
    fn border_clipped_to_surface() {
        let data = gradient(4, 4);
        let writes = padded(4).plan(SURFACE, Rect::new(0, 0, 4, 4), &data);

        // top, left and the three corners touching them fall outside
        let bounds: Vec<Rect> = writes.iter().map(|w| w.bounds).collect();
        assert_eq!(
            bounds,
            vec![
                Rect::new(0, 4, 4, 2),
                Rect::new(4, 0, 2, 4),
                Rect::new(4, 4, 2, 2),
                Rect::new(0, 0, 4, 4),
            ]
        );
    }

    #[test]
    fn partially_clipped_corner_keeps_inside_part() {
        let data = gradient(4, 4);
        let writes = padded(4).plan(SURFACE, Rect::new(1, 8, 4, 4), &data);
        assert!(writes.iter().any(|w| w.bounds == Rect::new(0, 6, 1, 2)));
    }

    // ── sentinel / fallback ───────────────────────────────────────────────

    #[test]
    fn sentinel_coloured_edges_are_skipped() {
        // Alpha differs from the sentinel; only RGB is compared.
        let data = vec![Rgba8::WHITE; 16];
        let writes = padded(4).plan(SURFACE, Rect::new(8, 8, 4, 4), &data);
        assert_eq!(writes.len(), 1);
    }

    #[test]
    fn one_coloured_edge_only_uploads_that_edge() {
        let mut data = vec![Rgba8::WHITE; 16];
        // left column red
        for y in 0..4 {
            data[y * 4] = Rgba8::new(255, 0, 0, 255);
        }
        let writes = padded(4).plan(SURFACE, Rect::new(8, 8, 4, 4), &data);
        let bounds: Vec<Rect> = writes.iter().map(|w| w.bounds).collect();

        // top and bottom include the red texel at column 0; the left strip and
        // both left corners sample only red.
        assert!(bounds.contains(&Rect::new(8, 6, 4, 2)));
        assert!(bounds.contains(&Rect::new(8, 12, 4, 2)));
        assert!(bounds.contains(&Rect::new(6, 8, 2, 4)));
        assert!(bounds.contains(&Rect::new(6, 6, 2, 2)));
        assert!(bounds.contains(&Rect::new(6, 12, 2, 2)));
        assert!(!bounds.contains(&Rect::new(12, 8, 2, 4)));
        assert!(!bounds.contains(&Rect::new(12, 6, 2, 2)));
    }

    #[test]
    fn short_data_is_a_plain_replace_at_bounds() {
        let data = gradient(3, 3);
        let writes = padded(4).plan(SURFACE, Rect::new(8, 8, 4, 4), &data);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].bounds, Rect::new(8, 8, 4, 4));
        assert_eq!(writes[0].pixels.len(), 9);
    }

    #[test]
    fn empty_bounds_replace_the_surface() {
        let data = gradient(32, 32);
        let writes = padded(4).plan(SURFACE, Rect::EMPTY, &data);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].bounds, SURFACE);
    }

    #[test]
    fn long_data_is_padded_from_leading_texels() {
        let mut data = gradient(4, 4);
        data.extend(vec![Rgba8::new(1, 1, 1, 255); 8]);
        let writes = padded(4).plan(SURFACE, Rect::new(8, 8, 4, 4), &data);

        assert_eq!(writes.len(), 9);
        let body = writes.last().unwrap();
        assert_eq!(body.bounds, Rect::new(8, 8, 4, 4));
        assert_eq!(&body.pixels[..], &gradient(4, 4)[..]);
    }

    #[test]
    fn zero_padding_has_no_border() {
        let data = gradient(4, 4);
        let writes = padded(1).plan(SURFACE, Rect::new(8, 8, 4, 4), &data);
        assert_eq!(writes.len(), 1);
    }
}
