use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::gfx::WgpuBackend;
use crate::render::{DrawConfig, DrawPipeline, GlobalProperty};
use crate::texture::{AtlasConfig, TextureStore};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Atlas used by the window's texture store; `None` gives every image its own texture.
    pub atlas: Option<AtlasConfig>,
    pub draw: DrawConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "sylva".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            atlas: Some(AtlasConfig::default()),
            draw: DrawConfig::default(),
        }
    }
}

/// Runtime context passed to the application.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn create_window(&mut self, config: RuntimeConfig) {
        self.commands.push(Command::CreateWindow(config));
    }

    pub fn close_window(&mut self, id: WindowId) {
        self.commands.push(Command::CloseWindow(id));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

enum Command {
    CreateWindow(RuntimeConfig),
    CloseWindow(WindowId),
    Exit,
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(initial, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

/// Everything a window renders with, built once its GPU context exists.
struct WindowRenderer {
    backend: WgpuBackend,
    draw: DrawPipeline<WgpuBackend>,
    textures: TextureStore<WgpuBackend>,
}

impl WindowRenderer {
    fn new(gpu: &Gpu<'_>, config: &RuntimeConfig) -> Result<Self> {
        let backend = WgpuBackend::new(gpu);
        let draw = DrawPipeline::new(backend.clone(), config.draw.clone())?;
        let textures = TextureStore::new(Arc::new(backend.clone()), config.atlas);

        Ok(Self {
            backend,
            draw,
            textures,
        })
    }
}

#[self_referencing]
struct WindowEntry {
    renderer: Option<WindowRenderer>,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    initial: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    windows: HashMap<WindowId, WindowEntry>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            initial,
            gpu_init,
            app,
            windows: HashMap::new(),
            exit_requested: false,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn create_window_entry(
        &mut self,
        event_loop: &ActiveEventLoop,
        config: RuntimeConfig,
    ) -> Result<WindowId> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let id = window.id();
        let mut gpu_init = self.gpu_init.clone();
        if let Some(atlas) = config.atlas {
            gpu_init = gpu_init.with_texture_size(atlas.width, atlas.height);
        }

        let mut entry = WindowEntryTryBuilder {
            renderer: None,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        let renderer = entry
            .with_gpu(|gpu| WindowRenderer::new(gpu, &config))
            .context("failed to create window renderer")?;
        entry.with_renderer_mut(|r| *r = Some(renderer));

        log::info!("window '{}' ready", config.title);
        self.windows.insert(id, entry);
        Ok(id)
    }

    fn destroy_window_entry(&mut self, id: WindowId) {
        self.windows.remove(&id);
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop, mut ctx: RuntimeCtx) {
        for cmd in ctx.commands.drain(..) {
            match cmd {
                Command::CreateWindow(cfg) => {
                    if let Err(e) = self.create_window_entry(event_loop, cfg) {
                        log::error!("failed to create window: {e:#}");
                        self.request_exit();
                    }
                }
                Command::CloseWindow(id) => self.destroy_window_entry(id),
                Command::Exit => self.request_exit(),
            }
        }

        if self.windows.is_empty() {
            self.request_exit();
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    /// Records, flushes and presents one frame.
    ///
    /// The flag is `false` after a fatal surface error.
    fn redraw(&mut self, window_id: WindowId, runtime_ctx: &mut RuntimeCtx) -> (AppControl, bool) {
        let (app, windows) = (&mut self.app, &mut self.windows);
        let Some(entry) = windows.get_mut(&window_id) else {
            return (AppControl::Continue, true);
        };

        entry.with_mut(|fields| {
            let Some(renderer) = fields.renderer.as_mut() else {
                return (AppControl::Continue, true);
            };

            let window = WindowCtx {
                id: window_id,
                window: fields.window,
            };
            let viewport = window.viewport();

            renderer.draw.start();
            renderer
                .draw
                .set_global_uniform(GlobalProperty::Projection, viewport.projection());

            let control = {
                let mut ctx = FrameCtx {
                    window,
                    draw: &mut renderer.draw,
                    backend: &renderer.backend,
                    textures: &renderer.textures,
                    viewport,
                    runtime: runtime_ctx,
                };
                app.on_frame(&mut ctx)
            };

            renderer.draw.end();

            match fields.gpu.begin_frame() {
                Ok(frame) => {
                    fields.window.pre_present_notify();
                    if let Err(e) = renderer.draw.flush(frame) {
                        log::error!("frame flush failed: {e:#}");
                    }
                    (control, true)
                }
                Err(err) => {
                    renderer.draw.discard();
                    log::debug!("surface error: {err:?}");
                    let action = fields.gpu.handle_surface_error(err);
                    (control, action != SurfaceErrorAction::Fatal)
                }
            }
        })
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.windows.is_empty() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop, self.initial.clone()) {
            log::error!("failed to create initial window: {e:#}");
            self.request_exit();
            event_loop.exit();
            return;
        }

        for entry in self.windows.values() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        for entry in self.windows.values() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if !self.windows.contains_key(&window_id) {
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.request_exit();
            event_loop.exit();
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.destroy_window_entry(window_id);
                if self.windows.is_empty() {
                    self.request_exit();
                    event_loop.exit();
                }
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.windows.get_mut(&window_id) {
                    entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.windows.get_mut(&window_id) {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => {
                let mut runtime_ctx = RuntimeCtx::default();
                let (control, alive) = self.redraw(window_id, &mut runtime_ctx);

                if control == AppControl::Exit || !alive {
                    if !alive {
                        log::error!("fatal surface error; exiting");
                    }
                    runtime_ctx.exit();
                }

                self.apply_commands(event_loop, runtime_ctx);
            }

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}
