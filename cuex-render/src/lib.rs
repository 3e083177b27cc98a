mod render;
mod text;

pub use ab_glyph::FontVec;
pub use render::{FrameStats, Palette, ScreenLabels, SkiaRenderer};
pub use text::{load_font, render_text_pixmap, TextCache, FONT_CANDIDATES};
