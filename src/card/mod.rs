mod builtin;
mod canvas;
mod font;
mod layout;
mod render;

pub use canvas::Rgb;
pub use font::{CardFont, CardFonts, FontSource, TextBox};
pub use layout::{WrapLines, wrap, wrap_lines};
pub use render::{
    BACKGROUND, BODY_COLOR, CANVAS_HEIGHT, CANVAS_WIDTH, CLIP_Y, CONTENT_WIDTH, CardPlan,
    CardRenderer, HEADING_COLOR, PlacedText, TextRole,
};
