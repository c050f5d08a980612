use std::time::Instant;

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};

use sylva_engine::core::{App, AppControl, FrameCtx};
use sylva_engine::device::GpuInit;
use sylva_engine::gfx::{GraphicsBackend, WgpuBackend};
use sylva_engine::logging::{init_logging, LoggingConfig};
use sylva_engine::paint::{Color, Rgba8};
use sylva_engine::render::DrawConfig;
use sylva_engine::shaders::{IndexLayout, ShaderSet, VertexBuffer, VertexPositionColour, VertexUvColour};
use sylva_engine::texture::{TextureRegion, TextureUpload};
use sylva_engine::window::{Runtime, RuntimeConfig};

const SPRITE: f32 = 96.0;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "sylva demo".to_string(),
        draw: DrawConfig {
            clear_colour: Color::from_srgb_u8(24, 28, 36, 255),
        },
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::default(), Demo::default())
}

#[derive(Default)]
struct Demo {
    started: Option<Instant>,
    scene: Option<Scene>,
}

/// GPU-side objects, built on the first frame once the window renderer exists.
struct Scene {
    textured: ShaderSet<WgpuBackend>,
    sprites: VertexBuffer<WgpuBackend, VertexUvColour>,
    backdrop: VertexBuffer<WgpuBackend, VertexPositionColour>,
}

impl Scene {
    fn new(ctx: &FrameCtx<'_>) -> Result<Self> {
        let checker = ctx
            .textures
            .get_or_upload("checker", &checker(32, 8))
            .context("failed to upload checker")?;
        let dot = ctx
            .textures
            .get_or_upload("dot", &dot(24))
            .context("failed to upload dot")?;

        // Both images land in the same atlas page while it has room.
        let view = checker.texture().native().view.clone();
        let textured = ShaderSet::textured(view, ctx.backend.default_sampler());

        let mut sprites = VertexBuffer::new(ctx.backend, "sprites", IndexLayout::Quad, 64);
        sprites.extend(&quad(-SPRITE * 0.5, -SPRITE * 0.5, SPRITE, &checker))?;
        if dot.texture() == checker.texture() {
            sprites.extend(&quad(SPRITE * 0.75, -SPRITE * 0.25, SPRITE * 0.5, &dot))?;
        }

        let mut backdrop = VertexBuffer::new(ctx.backend, "backdrop", IndexLayout::Quad, 4);
        let shade = Color::from_srgb_u8(52, 60, 78, 255);
        backdrop.extend(&[
            VertexPositionColour::new(0.0, 0.0, shade),
            VertexPositionColour::new(1.0, 0.0, shade),
            VertexPositionColour::new(1.0, 1.0, Color::BLACK),
            VertexPositionColour::new(0.0, 1.0, Color::BLACK),
        ])?;

        Ok(Self {
            textured,
            sprites,
            backdrop,
        })
    }
}

impl App for Demo {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        if self.scene.is_none() {
            match Scene::new(ctx) {
                Ok(scene) => self.scene = Some(scene),
                Err(e) => {
                    log::error!("failed to build scene: {e:#}");
                    return AppControl::Exit;
                }
            }
        }
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Exit;
        };

        let t = self.started.get_or_insert_with(Instant::now).elapsed().as_secs_f32();
        let (w, h) = (ctx.viewport.width, ctx.viewport.height);

        // Backdrop: unit quad scaled to the lower half of the window.
        ctx.draw.push_matrix(
            Mat4::from_translation(Vec3::new(0.0, h * 0.5, 0.0)) * Mat4::from_scale(Vec3::new(w, h * 0.5, 1.0)),
        );
        ctx.draw.draw_vertex_buffer(&mut scene.backdrop);
        ctx.draw.pop_matrix();

        if let Err(e) = ctx.draw.bind_shader(&scene.textured) {
            log::error!("failed to bind textured shader: {e:#}");
            return AppControl::Exit;
        }

        // Spin around the window centre.
        ctx.draw.push_matrix(Mat4::from_translation(Vec3::new(w * 0.5, h * 0.5, 0.0)));
        ctx.draw.push_matrix(Mat4::from_rotation_z(t * 0.8));
        ctx.draw.draw_vertex_buffer(&mut scene.sprites);
        ctx.draw.pop_matrix();
        ctx.draw.pop_matrix();

        ctx.draw.unbind_shader();
        AppControl::Continue
    }
}

fn quad(x: f32, y: f32, size: f32, region: &TextureRegion<WgpuBackend>) -> [VertexUvColour; 4] {
    let [u0, v0, u1, v1] = region.uv_rect();
    [
        VertexUvColour::new(x, y, u0, v0, Color::WHITE),
        VertexUvColour::new(x + size, y, u1, v0, Color::WHITE),
        VertexUvColour::new(x + size, y + size, u1, v1, Color::WHITE),
        VertexUvColour::new(x, y + size, u0, v1, Color::WHITE),
    ]
}

fn checker(size: u32, cell: u32) -> TextureUpload {
    let a = Rgba8::new(236, 204, 104, 255);
    let b = Rgba8::new(64, 120, 200, 255);
    let data = (0..size * size)
        .map(|i| {
            let (x, y) = (i % size, i / size);
            if (x / cell + y / cell) % 2 == 0 { a } else { b }
        })
        .collect();
    // length matches by construction
    TextureUpload::new(size, size, data).unwrap_or_else(|_| TextureUpload::solid(size, size, a))
}

/// Soft-edged disc; the transparent rim is where atlas padding matters.
fn dot(size: u32) -> TextureUpload {
    let r = size as f32 * 0.5;
    let data = (0..size * size)
        .map(|i| {
            let (x, y) = ((i % size) as f32 + 0.5 - r, (i / size) as f32 + 0.5 - r);
            let d = (x * x + y * y).sqrt();
            let alpha = ((r - d) * 2.0).clamp(0.0, 1.0);
            Rgba8::new(240, 96, 120, (alpha * 255.0) as u8)
        })
        .collect();
    TextureUpload::new(size, size, data).unwrap_or_else(|_| TextureUpload::solid(size, size, Rgba8::WHITE))
}
