use crate::config::DisplaySettings;
use anyhow::{anyhow, Result};
use cuex_core::{ActionKind, InputAction, Screen};
use cuex_experiment::{Gate, InputSource, Presenter};
use cuex_render::{FontVec, FrameStats, Palette, SkiaRenderer};
use cuex_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowId},
};

const WAIT_SLICE: Duration = Duration::from_millis(5);

/// Window, surface and keyboard of a live run. The session loop stays in charge: winit
/// events are pumped from `poll` and `wait_for_begin` rather than from `run_app`.
pub struct WindowFrontend {
    event_loop: EventLoop<()>,
    state: WindowState,
}

struct WindowState {
    timer: HighPrecisionTimer,
    display: DisplaySettings,
    font: Option<FontVec>,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    total_epochs: usize,
    current: Screen,
    pending: VecDeque<InputAction>,
    closed: bool,
    failure: Option<anyhow::Error>,
}

impl WindowFrontend {
    /// Opens the window. `timer` must be a clone of the session timer so key presses are
    /// stamped on the same clock as cue onsets.
    pub fn new(
        timer: HighPrecisionTimer,
        display: DisplaySettings,
        font: Option<FontVec>,
        total_epochs: usize,
    ) -> Result<Self> {
        let event_loop = EventLoop::new()?;
        let mut frontend = Self {
            event_loop,
            state: WindowState {
                timer,
                display,
                font,
                window: None,
                pixels: None,
                renderer: None,
                total_epochs,
                current: Screen::Neutral,
                pending: VecDeque::new(),
                closed: false,
                failure: None,
            },
        };

        while frontend.state.renderer.is_none() {
            frontend.pump(Some(WAIT_SLICE))?;
            if frontend.state.closed {
                return Err(anyhow!("window closed during startup"));
            }
        }
        Ok(frontend)
    }

    fn pump(&mut self, timeout: Option<Duration>) -> Result<()> {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.state)
        {
            debug!(code, "event loop exited");
            self.state.closed = true;
        }
        match self.state.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Keeps the current screen up for `hold`, or until the window is closed
    pub fn linger(&mut self, hold: Duration) -> Result<()> {
        let start = self.state.timer.now();
        while !self.state.closed && self.state.timer.elapsed(start) < hold {
            self.pump(Some(WAIT_SLICE))?;
        }
        Ok(())
    }
}

impl InputSource for WindowFrontend {
    fn wait_for_begin(&mut self, epoch: usize) -> Result<Gate> {
        debug!(epoch, "waiting for begin");
        loop {
            self.pump(Some(WAIT_SLICE))?;
            while let Some(action) = self.state.pending.pop_front() {
                match action.kind {
                    ActionKind::Begin => return Ok(Gate::Begin { at_ns: action.at_ns }),
                    ActionKind::Abort => return Ok(Gate::Closed),
                    ActionKind::Acknowledge => {}
                }
            }
            if self.state.closed {
                return Ok(Gate::Closed);
            }
        }
    }

    fn poll(&mut self, _now_ns: u64, out: &mut Vec<InputAction>) -> Result<()> {
        self.pump(Some(Duration::ZERO))?;
        out.extend(self.state.pending.drain(..));
        if self.state.closed && !out.iter().any(|a| a.kind == ActionKind::Abort) {
            out.push(InputAction::abort(self.state.timer.now()));
        }
        Ok(())
    }
}

impl Presenter for WindowFrontend {
    fn present(&mut self, screen: &Screen) -> Result<()> {
        self.state.current = *screen;
        self.state.draw()
    }
}

impl Drop for WindowFrontend {
    fn drop(&mut self) {
        if let Some(window) = &self.state.window {
            window.set_cursor_visible(true);
        }
    }
}

impl WindowState {
    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());

        let mut attributes = Window::default_attributes().with_title("cuex");
        if self.display.fullscreen {
            attributes = attributes
                .with_fullscreen(Some(Fullscreen::Borderless(monitor.clone())))
                .with_resizable(false);
        } else {
            attributes = attributes.with_inner_size(PhysicalSize::new(
                self.display.width,
                self.display.height,
            ));
        }

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale = window.scale_factor(),
            refresh_hz = monitor
                .and_then(|m| m.refresh_rate_millihertz())
                .map(|mhz| f64::from(mhz) / 1000.0),
            "display ready"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        let mut renderer =
            SkiaRenderer::new(size.width, size.height, self.font.take(), Palette::default())?;
        renderer.prepare_prompts(self.total_epochs);
        self.renderer = Some(renderer);

        window.set_cursor_visible(false);
        self.window = Some(window);
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut())
        else {
            return Ok(());
        };
        let stats: FrameStats =
            renderer.render_frame(&self.current, pixels.frame_mut(), &mut self.timer)?;
        if stats.skipped {
            return Ok(());
        }
        pixels.render()?;
        debug!(
            screen = ?self.current,
            fill_us = stats.fill.as_micros() as u64,
            text_us = stats.text.as_micros() as u64,
            copy_us = stats.copy.as_micros() as u64,
            "presented"
        );
        Ok(())
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        if let Some(pixels) = &mut self.pixels {
            pixels.resize_surface(size.width, size.height)?;
            pixels.resize_buffer(size.width, size.height)?;
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(size.width, size.height)?;
        }
        debug!(width = size.width, height = size.height, "display resized");
        self.draw()
    }

    fn handle_key(&mut self, key: PhysicalKey) {
        let kind = match key {
            PhysicalKey::Code(KeyCode::Enter | KeyCode::NumpadEnter) => ActionKind::Begin,
            PhysicalKey::Code(KeyCode::Space) => ActionKind::Acknowledge,
            PhysicalKey::Code(KeyCode::Escape) => ActionKind::Abort,
            _ => return,
        };
        self.pending
            .push_back(InputAction::new(kind, self.timer.now()));
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        self.failure.get_or_insert(error);
        self.closed = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.fail(event_loop, e.context("creating window and surface"));
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                warn!("window closed");
                self.pending
                    .push_back(InputAction::abort(self.timer.now()));
                self.closed = true;
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && !event.repeat =>
            {
                self.handle_key(event.physical_key);
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = self.handle_resize(size) {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    if let Err(e) = self.handle_resize(size) {
                        self.fail(event_loop, e);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.invalidate();
                }
                if let Err(e) = self.draw() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }
}
