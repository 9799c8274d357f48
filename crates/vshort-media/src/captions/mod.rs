//! Word-burst captions: word timing, chunking and overlay rendering.

mod chunker;
mod renderer;
mod word_timer;

pub use chunker::chunk_words;
pub use renderer::{
    escape_filter_value, render_all, CaptionOverlay, CaptionRenderer, DrawtextRenderer,
};
pub use word_timer::expand_words;
