use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use gallery::{Camera, GalleryState, ScrollState};
use gallery::scroll::PIXELS_PER_LINE;
use galleryconfig::GalleryConfig;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use tracing::{error, info, warn};

use crate::gpu::GpuState;
use crate::types::RendererConfig;

/// Longest frame step fed to the simulation; a stalled window resumes
/// smoothly instead of jumping the rotation.
const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Hotkeys understood by the gallery window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    ExportAtlas,
    CycleDebug,
    CyclePreset,
    Quit,
}

fn key_action(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::Escape) => Some(KeyAction::Quit),
        Key::Character(value) => match value.as_str() {
            "e" | "E" => Some(KeyAction::ExportAtlas),
            "d" | "D" => Some(KeyAction::CycleDebug),
            "p" | "P" => Some(KeyAction::CyclePreset),
            "q" | "Q" => Some(KeyAction::Quit),
            _ => None,
        },
        _ => None,
    }
}

/// Wheel travel in pixels, positive when scrolling down the page.
fn wheel_pixels(delta: MouseScrollDelta) -> f64 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -f64::from(y) * PIXELS_PER_LINE,
        MouseScrollDelta::PixelDelta(position) => -position.y,
    }
}

/// Follows one finger at a time and turns its vertical motion into scroll
/// impulses.
#[derive(Debug, Default)]
struct TouchTracker {
    active: Option<(u64, f64)>,
}

impl TouchTracker {
    fn handle(&mut self, scroll: &mut ScrollState, id: u64, phase: TouchPhase, y: f64) {
        match phase {
            TouchPhase::Started => {
                scroll.begin_touch();
                self.active = Some((id, y));
            }
            TouchPhase::Moved => {
                if let Some((active_id, last_y)) = self.active {
                    if active_id == id {
                        scroll.add_touch_drag(last_y, y);
                        self.active = Some((id, y));
                    }
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                if matches!(self.active, Some((active_id, _)) if active_id == id) {
                    self.active = None;
                }
            }
        }
    }
}

/// Wall-clock frame timing: elapsed seconds since start plus the clamped
/// step since the previous frame.
#[derive(Debug)]
struct FrameClock {
    start: Instant,
    last: Instant,
}

impl FrameClock {
    fn new(now: Instant) -> Self {
        Self { start: now, last: now }
    }

    fn tick(&mut self, now: Instant) -> (f32, f32) {
        let delta = now.saturating_duration_since(self.last).min(MAX_FRAME_DELTA);
        self.last = now;
        (
            delta.as_secs_f32(),
            now.saturating_duration_since(self.start).as_secs_f32(),
        )
    }
}

/// Everything the gallery window owns between events.
pub(crate) struct WindowState {
    // declared before the window so the surface drops first
    gpu: GpuState,
    window: Arc<Window>,
    gallery: GalleryState,
    config: GalleryConfig,
    touch: TouchTracker,
    clock: FrameClock,
    export_dir: PathBuf,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let mut gallery = GalleryState::new(&config.gallery, config.image_source.clone());
        if !config.images.is_empty() {
            gallery
                .load_images(config.images.clone())
                .map_err(|err| anyhow!("failed to start atlas build: {err}"))?;
        } else {
            warn!("no images given; the gallery shows empty cards");
        }

        let gpu = GpuState::new(
            window.as_ref(),
            window.inner_size(),
            config.antialiasing,
            Camera::from_params(&config.gallery.camera),
            &gallery,
        )?;
        if gpu.adapter_profile().is_software() {
            warn!(
                adapter = %gpu.adapter_profile().name,
                "software rasterizer detected; expect a low frame rate"
            );
        }

        Ok(Self {
            gpu,
            window,
            gallery,
            config: config.gallery.clone(),
            touch: TouchTracker::default(),
            clock: FrameClock::new(Instant::now()),
            export_dir: config.export_dir.clone(),
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.gpu.size()
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    fn handle_wheel(&mut self, delta: MouseScrollDelta) {
        self.gallery
            .scroll_mut()
            .add_wheel_pixels(wheel_pixels(delta));
    }

    fn handle_touch(&mut self, id: u64, phase: TouchPhase, y: f64) {
        self.touch.handle(self.gallery.scroll_mut(), id, phase, y);
    }

    fn export_atlas(&self) {
        let path = self
            .export_dir
            .join(format!("atlas-{}.png", self.gallery.atlas_generation()));
        match self.gallery.export_atlas(&path) {
            Ok(Some(path)) => info!(path = %path.display(), "atlas exported"),
            Ok(None) => info!("atlas not built yet; nothing to export"),
            Err(err) => error!(error = %err, "atlas export failed"),
        }
    }

    fn cycle_debug(&mut self) {
        self.config.debug = self.config.debug.next();
        info!(mode = %self.config.debug, "debug view");
    }

    fn cycle_preset(&mut self) {
        let names = self.config.preset_names();
        let next = match &self.config.preset {
            Some(current) => names
                .iter()
                .position(|name| name == current)
                .map(|index| (index + 1) % names.len())
                .unwrap_or(0),
            None => 0,
        };
        let Some(name) = names.get(next).cloned() else {
            return;
        };
        match self.config.apply_preset(&name) {
            Ok(()) => info!(preset = %name, "preset applied"),
            Err(err) => warn!(preset = %name, error = %err, "failed to apply preset"),
        }
    }

    pub(crate) fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let (dt, time) = self.clock.tick(Instant::now());
        let frame = self.gallery.tick(dt, time, &self.config);
        self.gpu.render(&frame, &mut self.gallery)
    }
}

/// Opens the gallery window and runs the event loop on the calling thread
/// until the window closes.
pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::new()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create gallery window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config)
        .map_err(|err| anyhow!("failed to initialise gallery renderer: {err}"))?;
    info!(
        images = config.images.len(),
        slots = config.gallery.gallery.instances,
        "gallery window open (wheel/touch to scroll, E export atlas, D debug view, P preset)"
    );
    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state != ElementState::Pressed || event.repeat {
                        return;
                    }
                    match key_action(&event.logical_key) {
                        Some(KeyAction::ExportAtlas) => state.export_atlas(),
                        Some(KeyAction::CycleDebug) => state.cycle_debug(),
                        Some(KeyAction::CyclePreset) => state.cycle_preset(),
                        Some(KeyAction::Quit) => elwt.exit(),
                        None => {}
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    state.handle_wheel(delta);
                }
                WindowEvent::Touch(touch) => {
                    state.handle_touch(touch.id, touch.phase, touch.location.y);
                }
                WindowEvent::Resized(new_size) => {
                    state.resize(new_size);
                }
                WindowEvent::RedrawRequested => match state.render_frame() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.size();
                        state.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("surface out of memory; closing gallery");
                        elwt.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        warn!("surface timeout; retrying next frame");
                    }
                    Err(other) => {
                        warn!("surface error: {other:?}; retrying next frame");
                    }
                },
                _ => {}
            }
        }
        Event::AboutToWait => {
            state.window().request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalPosition;

    use super::*;

    #[test]
    fn line_deltas_scale_to_pixels() {
        assert_eq!(wheel_pixels(MouseScrollDelta::LineDelta(0.0, -1.0)), 100.0);
        assert_eq!(wheel_pixels(MouseScrollDelta::LineDelta(0.0, 2.0)), -200.0);
        assert_eq!(
            wheel_pixels(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -35.0))),
            35.0
        );
    }

    #[test]
    fn touch_drag_follows_first_finger() {
        let mut scroll = ScrollState::default();
        let mut touch = TouchTracker::default();
        touch.handle(&mut scroll, 7, TouchPhase::Started, 300.0);
        touch.handle(&mut scroll, 7, TouchPhase::Moved, 250.0);
        // a second finger is ignored while the first is down
        touch.handle(&mut scroll, 8, TouchPhase::Moved, 900.0);
        assert!((scroll.pending_impulse() - 0.5).abs() < 1e-9);

        touch.handle(&mut scroll, 7, TouchPhase::Ended, 250.0);
        touch.handle(&mut scroll, 7, TouchPhase::Moved, 100.0);
        assert!((scroll.pending_impulse() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn touch_start_stops_coasting() {
        let mut scroll = ScrollState::default();
        scroll.add_impulse(1.0);
        scroll.advance();
        assert!(scroll.velocity() > 0.0);
        TouchTracker::default().handle(&mut scroll, 1, TouchPhase::Started, 10.0);
        assert_eq!(scroll.velocity(), 0.0);
    }

    #[test]
    fn frame_clock_clamps_long_stalls() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start);
        let (dt, time) = clock.tick(start + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-6);
        assert!((time - 0.016).abs() < 1e-6);
        let (dt, time) = clock.tick(start + Duration::from_secs(5));
        assert!((dt - 0.1).abs() < 1e-6);
        assert!((time - 5.0).abs() < 1e-5);
    }

    #[test]
    fn hotkeys_map_to_actions() {
        assert_eq!(key_action(&Key::Character("e".into())), Some(KeyAction::ExportAtlas));
        assert_eq!(key_action(&Key::Character("D".into())), Some(KeyAction::CycleDebug));
        assert_eq!(key_action(&Key::Character("p".into())), Some(KeyAction::CyclePreset));
        assert_eq!(key_action(&Key::Named(NamedKey::Escape)), Some(KeyAction::Quit));
        assert_eq!(key_action(&Key::Character("x".into())), None);
    }
}
