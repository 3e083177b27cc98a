mod cache;

pub use cache::{get_text, intern_text, text_count, Atom};
