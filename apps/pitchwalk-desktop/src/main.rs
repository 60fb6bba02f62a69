mod keymap;
mod state;

use anyhow::{Context as _, Result};
use clap::Parser;
use egui::Context as EguiContext;
use pitchwalk_assets::{ImageRgba8, load_normal_map};
use pitchwalk_config::DemoConfig;
use pitchwalk_render::Viewport;
use pitchwalk_render_wgpu::{CameraMatrices, GpuContext, WgpuRenderer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::state::DemoState;

#[derive(Parser)]
#[command(name = "pitchwalk-desktop", about = "Walk the pitch scene in first person")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// glTF/GLB model to load instead of the configured one
    #[arg(long)]
    model: Option<PathBuf>,

    /// Water normal map to use instead of the configured one
    #[arg(long)]
    normal_map: Option<PathBuf>,
}

/// Window, GPU and overlay resources, created once the event loop resumes.
struct Graphics {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    state: DemoState,
    normal_map: ImageRgba8,
    viewport: Viewport,
    started: Instant,
    graphics: Option<Graphics>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new(state: DemoState, normal_map: ImageRgba8) -> Self {
        Self {
            state,
            normal_map,
            viewport: Viewport::default(),
            started: Instant::now(),
            graphics: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<Graphics> {
        let attrs = Window::default_attributes()
            .with_title("Pitch Walk")
            .with_inner_size(LogicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        self.update_viewport(&window);
        let (width, height) = self.viewport.drawing_buffer_size();
        let gpu = GpuContext::new(window.clone(), width, height)?;

        let renderer = WgpuRenderer::new(
            &gpu.device,
            &gpu.queue,
            gpu.format(),
            width,
            height,
            &self.state.scene,
            &self.normal_map,
        );

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(self.viewport.pixel_ratio),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&gpu.device, gpu.format(), None, 1, false);

        Ok(Graphics {
            window,
            gpu,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    /// Recompute the logical size and pixel ratio from the window.
    fn update_viewport(&mut self, window: &Window) {
        let size = window.inner_size();
        let scale = window.scale_factor();
        let (width, height) = Viewport::logical_from_physical(size.width, size.height, scale);
        self.viewport.resize(
            width,
            height,
            scale as f32,
            self.state.config.camera.max_pixel_ratio,
        );
    }

    fn resize_surface(&mut self) {
        let Some(gfx) = self.graphics.as_mut() else {
            return;
        };
        let (width, height) = self.viewport.drawing_buffer_size();
        gfx.gpu.resize(width, height);
        gfx.renderer.resize(&gfx.gpu.device, width, height);
    }

    fn capture_pointer(&mut self) {
        let Some(gfx) = &self.graphics else {
            return;
        };
        let grabbed = gfx
            .window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| gfx.window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(e) = grabbed {
            tracing::warn!("pointer capture unavailable: {e}");
            return;
        }
        gfx.window.set_cursor_visible(false);
        self.state.input.surface_clicked();
    }

    fn release_pointer(&mut self) {
        if let Some(gfx) = &self.graphics {
            let _ = gfx.window.set_cursor_grab(CursorGrabMode::None);
            gfx.window.set_cursor_visible(true);
        }
    }

    fn handle_key(&mut self, code: KeyCode, pressed: bool) {
        if self.state.input.key_event(keymap::tracked_key(code), pressed) || !pressed {
            return;
        }
        match code {
            KeyCode::Escape => {
                self.release_pointer();
                self.state.input.pointer.release();
            }
            KeyCode::F1 => {
                self.state.show_overlay = !self.state.show_overlay;
            }
            _ => {}
        }
    }

    fn redraw(&mut self) {
        let elapsed = self.started.elapsed().as_secs_f32();
        self.state.update(elapsed);

        let Some(gfx) = self.graphics.as_mut() else {
            return;
        };

        let output = match gfx.gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gfx.gpu.reconfigure();
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let camera = CameraMatrices::from_view(&self.state.render_view(), self.viewport.aspect());
        gfx.renderer.render(
            &gfx.gpu.device,
            &gfx.gpu.queue,
            &view,
            &camera,
            &self.state.scene,
        );

        let raw_input = gfx.egui_winit.take_egui_input(&gfx.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_ui(ctx);
        });
        gfx.egui_winit
            .handle_platform_output(&gfx.window, full_output.platform_output);

        let pixels_per_point = self.viewport.pixel_ratio;
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gfx.gpu.config.width, gfx.gpu.config.height],
            pixels_per_point,
        };

        let device = &gfx.gpu.device;
        let queue = &gfx.gpu.queue;
        for (id, image_delta) in &full_output.textures_delta.set {
            gfx.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        gfx.egui_renderer.update_buffers(
            device,
            queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gfx.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gfx.egui_renderer.free_texture(id);
        }

        output.present();
        gfx.window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }
        match self.init_graphics(event_loop) {
            Ok(gfx) => {
                gfx.window.request_redraw();
                self.graphics = Some(gfx);
            }
            Err(e) => {
                tracing::error!("failed to initialise graphics: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gfx) = self.graphics.as_mut() {
            if !self.state.input.pointer.is_active() {
                let response = gfx.egui_winit.on_window_event(&gfx.window, &event);
                if response.consumed {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = self.graphics.as_ref().map(|g| g.window.clone()) {
                    self.update_viewport(&window);
                    self.resize_surface();
                }
            }
            WindowEvent::Focused(false) => {
                self.release_pointer();
                self.state.input.focus_lost();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.handle_key(code, key_state == ElementState::Pressed);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: ElementState::Pressed,
                ..
            } => {
                if !self.state.input.pointer.is_active() {
                    self.capture_pointer();
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.state
                .input
                .mouse_motion(delta.0 as f32, delta.1 as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gfx) = &self.graphics {
            gfx.window.request_redraw();
        }
    }
}

fn load_config(cli: &Cli) -> Result<DemoConfig> {
    let mut config = DemoConfig::load_or_default(cli.config.as_deref())?;
    config.apply_env_overrides();
    if let Some(model) = &cli.model {
        config.assets.model = model.clone();
    }
    if let Some(normal_map) = &cli.normal_map {
        config.water.normal_map = normal_map.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    tracing::info!("pitchwalk-desktop starting");

    let config = load_config(&cli)?;
    let normal_map = load_normal_map(&config.water.normal_map).unwrap_or_else(|e| {
        tracing::warn!(
            path = %config.water.normal_map.display(),
            "normal map unavailable, water will be flat: {e}"
        );
        ImageRgba8::flat_normal()
    });

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(DemoState::new(config), normal_map);
    event_loop.run_app(&mut app)?;

    Ok(())
}
