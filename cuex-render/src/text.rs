use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use anyhow::{anyhow, Context, Result};
use cuex_cache::get_text;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{Color, Pixmap};
use tracing::{debug, warn};

/// Fonts tried, in order, when none is configured
pub const FONT_CANDIDATES: &[&str] = &[
    "assets/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads the configured font, or the first usable candidate when none is configured.
/// A configured font that cannot be read is an error; a missing candidate is not.
pub fn load_font(configured: Option<&Path>) -> Result<Option<FontVec>> {
    if let Some(path) = configured {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow!("parsing font {}: {e}", path.display()))?;
        return Ok(Some(font));
    }

    for candidate in FONT_CANDIDATES {
        let Ok(bytes) = std::fs::read(candidate) else {
            continue;
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                debug!(path = candidate, "font loaded");
                return Ok(Some(font));
            }
            Err(e) => debug!(path = candidate, error = %e, "skipping unusable font"),
        }
    }
    warn!("no font found; prompts will be drawn without text");
    Ok(None)
}

/// Rasterizes `text` on a single line into a tightly cropped, premultiplied pixmap.
/// Returns `None` when nothing in the text has an outline.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let scaled = font.as_scaled(scale);

    let mut caret = 0.0f32;
    let mut glyphs: Vec<Glyph> = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            caret += scaled.kern(prev.id, id);
        }
        glyphs.push(id.with_scale_and_position(scale, point(caret, scaled.ascent())));
        caret += scaled.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    if outlines.is_empty() {
        return None;
    }
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for b in outlines.iter().map(|o| o.px_bounds()) {
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let width = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let height = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pixmap = Pixmap::new(width, height)?;
    let stride = width as usize;
    let rgba = color.to_color_u8();
    let src = [rgba.red(), rgba.green(), rgba.blue(), rgba.alpha()];
    let data: &mut [[u8; 4]] = bytemuck::cast_slice_mut(pixmap.data_mut());

    for outline in &outlines {
        let bounds = outline.px_bounds();
        let ox = bounds.min.x - min_x.floor();
        let oy = bounds.min.y - min_y.floor();
        outline.draw(|x, y, coverage| {
            let px = (x as f32 + ox) as usize;
            let py = (y as f32 + oy) as usize;
            if px >= stride || py >= height as usize {
                return;
            }
            let alpha = coverage.clamp(0.0, 1.0) * f32::from(src[3]) / 255.0;
            if alpha <= f32::EPSILON {
                return;
            }
            let dst = &mut data[py * stride + px];
            let inv = 1.0 - alpha;
            // premultiplied source over premultiplied destination
            for c in 0..3 {
                let s = f32::from(src[c]) * alpha;
                dst[c] = (s + f32::from(dst[c]) * inv).round().min(255.0) as u8;
            }
            dst[3] = (alpha * 255.0 + f32::from(dst[3]) * inv).round().min(255.0) as u8;
        });
    }

    Some(pixmap)
}

/// Rendered text at one size and colour, indexed by intern id
pub struct TextCache {
    font: Arc<FontVec>,
    size_px: f32,
    color: Color,
    // outer None: not rasterized yet; inner None: nothing to draw
    slots: Vec<Option<Option<Arc<Pixmap>>>>,
}

impl TextCache {
    pub fn new(font: Arc<FontVec>, size_px: f32, color: Color) -> Self {
        Self {
            font,
            size_px,
            color,
            slots: Vec::new(),
        }
    }

    /// Pixmap for the interned text `id`, rasterized on first use. Unknown ids yield `None`.
    pub fn get_or_render(&mut self, id: usize) -> Option<Arc<Pixmap>> {
        if let Some(Some(hit)) = self.slots.get(id) {
            return hit.clone();
        }
        let text = get_text(id)?;
        let rendered =
            render_text_pixmap(&text, self.size_px, &*self.font, self.color).map(Arc::new);
        if self.slots.len() <= id {
            self.slots.resize(id + 1, None);
        }
        self.slots[id] = Some(rendered.clone());
        rendered
    }

    /// Number of texts rasterized so far
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
