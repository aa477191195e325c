mod clipboard;
mod config;
mod entity;
mod filter;
mod host;
mod map_data;
mod marker;
mod memory;
mod offsets;
mod overlay;
mod projection;
#[cfg(test)]
mod testing;
mod ui;

use std::io;
use std::num::NonZeroU32;

use config::{Command, RadarConfig};
use entity::GameObject;
use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::prelude::GlSurface;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use host::{HostState, ProcessMapAgent};
use imgui_glow_renderer::AutoRenderer;
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use log::{error, info, warn};
use overlay::{OverlayController, TickReport};
use raw_window_handle::HasWindowHandle;
use sysinfo::System;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowAttributes};

// ─── App State ───────────────────────────────────────────────────────

struct AppState {
    process_dropdown_open: bool,

    // Persisted config
    config: RadarConfig,

    // Runtime state
    status_text: String,
    attached_pid: Option<u32>,
    memory: Box<dyn memory::ProcessMemory>,
    overlay: OverlayController,

    // Client snapshot (read from memory each frame)
    host: Option<HostState>,
    objects: Vec<Option<GameObject>>,
    last_report: TickReport,

    ui: ui::RadarUiState,
    clipboard: Option<clipboard::ClipboardHelper>,
}

impl AppState {
    fn new() -> Self {
        let config = RadarConfig::load();
        let default_counts = map_data::MapMarkerData::load().default_counts();
        info!("Default marker counts known for {} maps", default_counts.len());

        Self {
            process_dropdown_open: false,
            config,
            status_text: String::from("Not attached"),
            attached_pid: None,
            memory: memory::create_memory(),
            overlay: OverlayController::new(default_counts),
            host: None,
            objects: Vec::new(),
            last_report: TickReport::default(),
            ui: ui::RadarUiState::default(),
            clipboard: clipboard::ClipboardHelper::new(),
        }
    }

    fn attach(&mut self) {
        let mut sys = System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        let found = sys
            .processes()
            .values()
            .find(|p| p.name().to_string_lossy() == self.config.process_name.as_str());
        let Some(process) = found else {
            warn!("Process '{}' not found", self.config.process_name);
            self.status_text = format!("Process '{}' not found", self.config.process_name);
            return;
        };

        let pid = process.pid().as_u32();
        info!("Found process '{}' with PID={}", self.config.process_name, pid);
        match self.memory.attach(pid) {
            Ok(()) => {
                self.attached_pid = Some(pid);
                self.status_text = format!("Attached to {} (PID: {})", self.config.process_name, pid);
                info!("Successfully attached to PID={}", pid);
            }
            Err(e) => {
                error!("Failed to attach to PID={}: {}", pid, e);
                self.status_text = format!("Failed to attach: {}", e);
            }
        }
    }

    fn detach(&mut self, status: String) {
        if self.config.draw_on_map {
            self.reset_markers();
        }
        if let Err(e) = self.memory.detach() {
            error!("Detach error: {}", e);
        }
        self.attached_pid = None;
        self.host = None;
        self.objects.clear();
        self.last_report = TickReport::default();
        self.status_text = status;
    }

    /// Read the client and, when enabled, push markers into its map agent.
    fn tick(&mut self) {
        if self.attached_pid.is_none() {
            return;
        }

        let snapshot = host::read_host_state(&*self.memory).and_then(|host| {
            // No local player: nothing to scan this tick.
            let objects = match host.local_player {
                Some(_) => entity::scan_object_table(&*self.memory)?,
                None => Vec::new(),
            };
            Ok::<_, io::Error>((host, objects))
        });

        match snapshot {
            Ok((host, objects)) => {
                self.host = Some(host);
                self.objects = objects;
            }
            Err(e) => {
                error!("Client read failed, auto-detaching: {}", e);
                self.detach(format!("Read error (detached): {}", e));
                return;
            }
        }

        self.last_report = TickReport::default();
        if !self.config.draw_on_map {
            return;
        }
        let Some(host) = self.host.as_ref() else {
            return;
        };
        let Some(agent_address) = host.agent_address else {
            return;
        };
        let mut agent = ProcessMapAgent::new(&*self.memory, agent_address);
        self.last_report = self.overlay.tick(host, &self.objects, &self.config, &mut agent);
    }

    fn reset_markers(&mut self) {
        let Some(host) = self.host.as_ref() else {
            return;
        };
        let Some(agent_address) = host.agent_address else {
            return;
        };
        let mut agent = ProcessMapAgent::new(&*self.memory, agent_address);
        self.overlay.reset(host, &mut agent);
        self.last_report = TickReport::default();
    }

    fn marker_summary(&self) -> String {
        let fmt = |count: Option<usize>| count.map_or_else(|| "-".to_string(), |c| c.to_string());
        format!(
            "Map {}  Minimap {}",
            fmt(self.last_report.full_map),
            fmt(self.last_report.mini_map)
        )
    }
}

// ─── App (owns GL + imgui state) ─────────────────────────────────────

struct App {
    window: Option<Window>,
    gl_context: Option<PossiblyCurrentContext>,
    gl_surface: Option<Surface<WindowSurface>>,
    glow_context: Option<glow::Context>,
    imgui: Option<imgui::Context>,
    platform: Option<WinitPlatform>,
    renderer: Option<AutoRenderer>,
    state: AppState,
}

impl App {
    fn new() -> Self {
        Self {
            window: None,
            gl_context: None,
            gl_surface: None,
            glow_context: None,
            imgui: None,
            platform: None,
            renderer: None,
            state: AppState::new(),
        }
    }

    fn shutdown(&mut self) {
        if self.state.attached_pid.is_some() {
            self.state.detach(String::from("Detached"));
        }
        self.state.config.save();
        info!("NamazuRadar shutting down");
    }
}

// ─── UI ──────────────────────────────────────────────────────────────

fn draw_app_bar(ui: &imgui::Ui, state: &mut AppState) {
    let display_size = ui.io().display_size;
    let is_attached = state.attached_pid.is_some();
    let mut appbar_height = 35.0_f32;

    ui.window("##appbar")
        .position([0.0, 0.0], imgui::Condition::Always)
        .size([display_size[0], 0.0], imgui::Condition::Always)
        .flags(
            imgui::WindowFlags::NO_TITLE_BAR
                | imgui::WindowFlags::NO_RESIZE
                | imgui::WindowFlags::NO_MOVE
                | imgui::WindowFlags::NO_SCROLLBAR
                | imgui::WindowFlags::NO_COLLAPSE
                | imgui::WindowFlags::NO_SAVED_SETTINGS
                | imgui::WindowFlags::ALWAYS_AUTO_RESIZE,
        )
        .build(|| {
            if ui.button("Process") {
                state.process_dropdown_open = !state.process_dropdown_open;
            }
            ui.same_line();
            if ui.button("Radar") {
                state.config.handle_command(Command::ToggleWindow);
            }
            ui.same_line();
            if ui.button("Settings") {
                state.config.handle_command(Command::OpenSettings);
            }

            let mut right = state.status_text.clone();
            if is_attached && state.config.draw_on_map {
                right = format!("{}   {}", state.marker_summary(), right);
            }
            let nearest = state
                .host
                .as_ref()
                .and_then(|h| h.local_player)
                .and_then(|p| ui::nearest_distance(&state.objects, &state.config, p));
            if let Some(d) = nearest {
                right = format!("Nearest {:.1}   {}", d, right);
            }
            let width = ui.calc_text_size(&right)[0] + 24.0;
            ui.same_line_with_pos(display_size[0] - width);
            ui.text_colored([0.7, 0.7, 0.3, 1.0], &right);

            appbar_height = ui.window_size()[1];
        });

    if !state.process_dropdown_open {
        return;
    }
    ui.window("##dropdown_process")
        .position([10.0, appbar_height], imgui::Condition::Always)
        .size([400.0, 0.0], imgui::Condition::Always)
        .flags(
            imgui::WindowFlags::NO_TITLE_BAR
                | imgui::WindowFlags::NO_RESIZE
                | imgui::WindowFlags::NO_MOVE
                | imgui::WindowFlags::NO_COLLAPSE
                | imgui::WindowFlags::NO_SAVED_SETTINGS
                | imgui::WindowFlags::ALWAYS_AUTO_RESIZE,
        )
        .build(|| {
            ui.input_text("Process Name", &mut state.config.process_name)
                .build();

            ui.disabled(is_attached, || {
                if ui.button("Attach") {
                    state.attach();
                }
            });
            ui.same_line();
            ui.disabled(!is_attached, || {
                if ui.button("Detach") {
                    info!("User requested detach");
                    state.detach(String::from("Detached"));
                }
            });
        });
}

fn draw_frame(ui: &imgui::Ui, state: &mut AppState) {
    if ui.is_key_pressed(imgui::Key::F9) {
        state.config.handle_command(Command::ToggleWindow);
    }

    draw_app_bar(ui, state);

    let draw_toggled = ui::draw_radar_window(
        ui,
        &mut state.config,
        &mut state.ui,
        state.host.as_ref(),
        &state.objects,
        &mut state.clipboard,
    );
    if draw_toggled {
        info!("Draw on map {}", if state.config.draw_on_map { "enabled" } else { "disabled" });
        state.reset_markers();
    }

    let target = state.host.as_ref().and_then(|h| h.target_model_id);
    ui::draw_allow_list_editor(ui, &mut state.config, &mut state.ui, target);
}

// ─── ApplicationHandler ──────────────────────────────────────────────

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title("NamazuRadar")
            .with_inner_size(winit::dpi::LogicalSize::new(720.0f32, 480.0));

        let config_template = ConfigTemplateBuilder::new();
        let display_builder = DisplayBuilder::new().with_window_attributes(Some(window_attrs));

        let (window, gl_config) = display_builder
            .build(event_loop, config_template, |mut configs| {
                configs.next().expect("No GL config available")
            })
            .expect("Failed to build display");

        let window = window.expect("Failed to create window");
        let gl_display = gl_config.display();
        let window_handle = window
            .window_handle()
            .expect("Failed to get window handle")
            .as_raw();
        let context_attrs = ContextAttributesBuilder::new().build(Some(window_handle));

        let gl_context = unsafe {
            gl_display
                .create_context(&gl_config, &context_attrs)
                .expect("Failed to create GL context")
        };

        let size = window.inner_size();
        let surface_attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            window_handle,
            NonZeroU32::new(size.width.max(1)).expect("non-zero width"),
            NonZeroU32::new(size.height.max(1)).expect("non-zero height"),
        );

        let gl_surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &surface_attrs)
                .expect("Failed to create GL surface")
        };

        let gl_context = gl_context
            .make_current(&gl_surface)
            .expect("Failed to make GL context current");

        let _ = gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN));

        let mut imgui = imgui::Context::create();
        if let Some(backend) = clipboard::ImguiClipboardBackend::new() {
            imgui.set_clipboard_backend(backend);
        }
        // Persist window positions and sizes between runs.
        imgui.set_ini_filename(Some(config::config_dir().join("imgui_layout.ini")));
        imgui.style_mut().use_dark_colors();

        let mut platform = WinitPlatform::new(&mut imgui);
        platform.attach_window(imgui.io_mut(), &window, HiDpiMode::Default);

        let renderer_context = unsafe {
            glow::Context::from_loader_function_cstr(|name| gl_display.get_proc_address(name))
        };
        let renderer =
            AutoRenderer::new(renderer_context, &mut imgui).expect("Failed to create renderer");

        let glow_context = unsafe {
            glow::Context::from_loader_function_cstr(|name| gl_display.get_proc_address(name))
        };

        self.window = Some(window);
        self.gl_context = Some(gl_context);
        self.gl_surface = Some(gl_surface);
        self.glow_context = Some(glow_context);
        self.imgui = Some(imgui);
        self.platform = Some(platform);
        self.renderer = Some(renderer);
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if let (Some(window), Some(imgui), Some(platform)) = (
            self.window.as_ref(),
            self.imgui.as_mut(),
            self.platform.as_mut(),
        ) {
            platform.handle_event::<()>(
                imgui.io_mut(),
                window,
                &winit::event::Event::WindowEvent {
                    window_id,
                    event: event.clone(),
                },
            );
        }

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(gl_surface), Some(gl_context)) =
                    (self.gl_surface.as_ref(), self.gl_context.as_ref())
                {
                    gl_surface.resize(
                        gl_context,
                        NonZeroU32::new(new_size.width.max(1)).expect("non-zero width"),
                        NonZeroU32::new(new_size.height.max(1)).expect("non-zero height"),
                    );
                }
                if let Some(w) = self.window.as_ref() {
                    w.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                self.state.tick();

                let (
                    Some(window),
                    Some(imgui),
                    Some(platform),
                    Some(renderer),
                    Some(gl_context),
                    Some(gl_surface),
                    Some(glow_ctx),
                ) = (
                    self.window.as_ref(),
                    self.imgui.as_mut(),
                    self.platform.as_mut(),
                    self.renderer.as_mut(),
                    self.gl_context.as_ref(),
                    self.gl_surface.as_ref(),
                    self.glow_context.as_ref(),
                )
                else {
                    return;
                };

                if let Err(e) = platform.prepare_frame(imgui.io_mut(), window) {
                    error!("Failed to prepare frame: {}", e);
                    return;
                }
                let ui = imgui.frame();
                draw_frame(ui, &mut self.state);
                let draw_data = imgui.render();

                unsafe {
                    glow_ctx.clear_color(0.1, 0.1, 0.1, 1.0);
                    glow_ctx.clear(glow::COLOR_BUFFER_BIT);
                }

                if let Err(e) = renderer.render(draw_data) {
                    error!("Render failed: {}", e);
                }
                if let Err(e) = gl_surface.swap_buffers(gl_context) {
                    error!("Failed to swap buffers: {}", e);
                }

                window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

// ─── Logging ─────────────────────────────────────────────────────────

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

fn rotate_file(path: &std::path::Path) {
    if let Ok(meta) = std::fs::metadata(path) {
        if meta.len() >= MAX_LOG_SIZE {
            let old = path.with_extension("old");
            let _ = std::fs::rename(path, old);
        }
    }
}

fn setup_logging() {
    let log_path = config::config_dir().join("namazu_radar.log");
    rotate_file(&log_path);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path);

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_millis(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stderr());

    if let Ok(file) = log_file {
        dispatch = dispatch.chain(file);
    } else {
        eprintln!("Warning: could not open log file {}", log_path.display());
    }

    dispatch.apply().expect("Failed to initialize logger");
}

// ─── Main ────────────────────────────────────────────────────────────

fn main() {
    setup_logging();

    info!("NamazuRadar starting");
    info!(
        "Object table: rva=0x{:X} slots={}  AgentMap: ptr rva=0x{:X}",
        offsets::OBJECT_TABLE,
        offsets::OBJECT_TABLE_SIZE,
        offsets::AGENT_MAP_PTR,
    );

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}
