use crate::text::TextCache;
use ab_glyph::FontVec;
use anyhow::{bail, Context, Result};
use cuex_cache::{intern_text, text_count};
use cuex_core::Screen;
use cuex_timing::{CalibrationStats, HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{Color, Pixmap};
use tracing::debug;

const PROMPT_PX: f32 = 36.0;
const PROGRESS_PX: f32 = 24.0;
const PROGRESS_OFFSET_Y: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub cue: Color,
    pub text: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            cue: Color::from_rgba8(0, 255, 0, 255),
            text: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub fill: Duration,
    pub text: Duration,
    pub copy: Duration,
    pub total: Duration,
    /// The screen was already on display; nothing was drawn
    pub skipped: bool,
}

/// Intern ids of the texts one screen shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenLabels {
    pub prompt: Option<usize>,
    pub progress: Option<usize>,
}

impl ScreenLabels {
    pub fn intern(screen: &Screen) -> Self {
        Self {
            prompt: screen.prompt_text().map(|t| intern_text(&t)),
            progress: screen.progress_text().map(|t| intern_text(&t)),
        }
    }
}

/// Draws [`Screen`]s into an RGBA8 frame buffer
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    palette: Palette,
    canvas: Pixmap,
    prompt_text: Option<TextCache>,
    progress_text: Option<TextCache>,
    /// `[epoch - 1]` for a run of `prepared_total` epochs
    begin_labels: Vec<ScreenLabels>,
    prepared_total: usize,
    complete_labels: ScreenLabels,
    shown: Option<Screen>,
    component_timers: HashMap<&'static str, HighPrecisionTimer>,
}

impl SkiaRenderer {
    /// Without a font, prompts are drawn as plain background
    pub fn new(width: u32, height: u32, font: Option<FontVec>, palette: Palette) -> Result<Self> {
        let canvas = new_canvas(width, height)?;
        let font = font.map(Arc::new);
        let prompt_text = font
            .clone()
            .map(|f| TextCache::new(f, PROMPT_PX, palette.text));
        let progress_text = font.map(|f| TextCache::new(f, PROGRESS_PX, palette.text));

        Ok(Self {
            width: canvas.width(),
            height: canvas.height(),
            palette,
            canvas,
            prompt_text,
            progress_text,
            begin_labels: Vec::new(),
            prepared_total: 0,
            complete_labels: ScreenLabels::intern(&Screen::Complete),
            shown: None,
            component_timers: ["fill", "text", "copy"]
                .into_iter()
                .map(|k| (k, HighPrecisionTimer::new()))
                .collect(),
        })
    }

    /// Interns every label a run of `total` epochs will show and rasterizes them up front,
    /// so no text is laid out while an epoch is running
    pub fn prepare_prompts(&mut self, total: usize) {
        self.begin_labels = (1..=total)
            .map(|epoch| ScreenLabels::intern(&Screen::BeginPrompt { epoch, total }))
            .collect();
        self.prepared_total = total;

        let labels = self.begin_labels.iter().chain([&self.complete_labels]);
        for l in labels {
            if let (Some(id), Some(cache)) = (l.prompt, self.prompt_text.as_mut()) {
                cache.get_or_render(id);
            }
            if let (Some(id), Some(cache)) = (l.progress, self.progress_text.as_mut()) {
                cache.get_or_render(id);
            }
        }
        debug!(
            total,
            rasterized = self.prompt_text.as_ref().map_or(0, TextCache::len)
                + self.progress_text.as_ref().map_or(0, TextCache::len),
            interned = text_count(),
            "prompts prepared"
        );
    }

    /// Intern ids for `screen`; prepared screens are looked up, others interned on demand
    pub fn labels(&self, screen: &Screen) -> ScreenLabels {
        match *screen {
            Screen::BeginPrompt { epoch, total } if total == self.prepared_total => self
                .begin_labels
                .get(epoch.wrapping_sub(1))
                .copied()
                .unwrap_or_else(|| ScreenLabels::intern(screen)),
            Screen::Complete => self.complete_labels,
            Screen::Neutral | Screen::Cue => ScreenLabels::default(),
            Screen::BeginPrompt { .. } => ScreenLabels::intern(screen),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_text(&self) -> bool {
        self.prompt_text.is_some()
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.canvas = new_canvas(width, height)?;
        self.width = self.canvas.width();
        self.height = self.canvas.height();
        self.invalidate();
        Ok(())
    }

    /// Forces the next frame to be drawn even if the screen has not changed
    pub fn invalidate(&mut self) {
        self.shown = None;
    }

    pub fn component_stats(&self, name: &str) -> Option<CalibrationStats> {
        self.component_timers
            .get(name)
            .map(HighPrecisionTimer::calibration_stats)
    }

    pub fn render_frame<T: Timer>(
        &mut self,
        screen: &Screen,
        frame: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats> {
        if frame.len() != self.canvas.data().len() {
            bail!(
                "frame buffer holds {} bytes, canvas {}x{} needs {}",
                frame.len(),
                self.width,
                self.height,
                self.canvas.data().len()
            );
        }
        if self.shown == Some(*screen) {
            return Ok(FrameStats {
                skipped: true,
                ..FrameStats::default()
            });
        }

        let t = timer.now();
        let background = if screen.is_cue() {
            self.palette.cue
        } else {
            self.palette.background
        };
        self.canvas.fill(background);
        let fill = timer.elapsed(t);

        let t = timer.now();
        self.draw_text(screen);
        let text = timer.elapsed(t);

        let t = timer.now();
        frame.copy_from_slice(self.canvas.data());
        let copy = timer.elapsed(t);

        let total = fill + text + copy;
        for (name, d) in [("fill", fill), ("text", text), ("copy", copy)] {
            if let Some(component) = self.component_timers.get_mut(name) {
                component.record_frame(d);
            }
        }
        timer.record_frame(total);
        self.shown = Some(*screen);
        debug!(?screen, total_us = total.as_micros() as u64, "frame rendered");

        Ok(FrameStats {
            fill,
            text,
            copy,
            total,
            skipped: false,
        })
    }

    fn draw_text(&mut self, screen: &Screen) {
        let labels = self.labels(screen);
        let center = (self.width as f32 * 0.5, self.height as f32 * 0.5);
        self.blit_text_by_intern_id(labels.prompt, TextRole::Prompt, center);
        self.blit_text_by_intern_id(
            labels.progress,
            TextRole::Progress,
            (center.0, center.1 + PROGRESS_OFFSET_Y),
        );
    }

    fn blit_text_by_intern_id(&mut self, id: Option<usize>, role: TextRole, pos: (f32, f32)) {
        let cache = match role {
            TextRole::Prompt => self.prompt_text.as_mut(),
            TextRole::Progress => self.progress_text.as_mut(),
        };
        if let Some(pixmap) = id.zip(cache).and_then(|(id, c)| c.get_or_render(id)) {
            blit_centered(&mut self.canvas, &pixmap, pos);
        }
    }
}

#[derive(Clone, Copy)]
enum TextRole {
    Prompt,
    Progress,
}

fn new_canvas(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width.max(1), height.max(1))
        .with_context(|| format!("allocating {width}x{height} canvas"))
}

/// Blends premultiplied `src` over `canvas`, centred on `center` and clipped to the canvas
fn blit_centered(canvas: &mut Pixmap, src: &Pixmap, center: (f32, f32)) {
    let (cw, ch) = (i64::from(canvas.width()), i64::from(canvas.height()));
    let (sw, sh) = (i64::from(src.width()), i64::from(src.height()));
    let x0 = (center.0 - sw as f32 * 0.5).floor() as i64;
    let y0 = (center.1 - sh as f32 * 0.5).floor() as i64;
    let (dx0, dy0) = (x0.max(0), y0.max(0));
    let (dx1, dy1) = ((x0 + sw).min(cw), (y0 + sh).min(ch));
    if dx1 <= dx0 || dy1 <= dy0 {
        return;
    }

    let src_px: &[[u8; 4]] = bytemuck::cast_slice(src.data());
    let dst_px: &mut [[u8; 4]] = bytemuck::cast_slice_mut(canvas.data_mut());
    for y in dy0..dy1 {
        let src_row = ((y - y0) * sw) as usize;
        let dst_row = (y * cw) as usize;
        for x in dx0..dx1 {
            let s = src_px[src_row + (x - x0) as usize];
            match s[3] {
                0 => continue,
                255 => dst_px[dst_row + x as usize] = s,
                sa => {
                    let d = &mut dst_px[dst_row + x as usize];
                    let inv = 255 - u32::from(sa);
                    for (dc, sc) in d.iter_mut().zip(s) {
                        *dc = (u32::from(sc) + (u32::from(*dc) * inv + 127) / 255).min(255) as u8;
                    }
                }
            }
        }
    }
}
