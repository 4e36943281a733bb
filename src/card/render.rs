use anyhow::Result;
use std::sync::Arc;

use super::canvas::{Canvas, Rgb};
use super::font::CardFonts;
use super::layout::wrap_lines;

pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 600;
pub const BACKGROUND: Rgb = Rgb(15, 23, 42);
pub const HEADING_COLOR: Rgb = Rgb(248, 250, 252);
pub const BODY_COLOR: Rgb = Rgb(148, 163, 184);

pub const MARGIN_X: f32 = 40.0;
pub const MARGIN_TOP: f32 = 40.0;
pub const MARGIN_BOTTOM: f32 = 40.0;
pub const HEADING_GAP: f32 = 24.0;
pub const PARAGRAPH_GAP: f32 = 12.0;
pub const LINE_GAP: f32 = 6.0;
// Used when a line produces no ink to measure.
pub const FALLBACK_HEADING_HEIGHT: f32 = 40.0;
pub const FALLBACK_LINE_HEIGHT: f32 = 24.0;

pub const CONTENT_WIDTH: f32 = CANVAS_WIDTH as f32 - 2.0 * MARGIN_X;
pub const CLIP_Y: f32 = CANVAS_HEIGHT as f32 - MARGIN_BOTTOM;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Heading,
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub role: TextRole,
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Positions of everything drawn on a card, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct CardPlan {
    pub items: Vec<PlacedText>,
    /// Vertical cursor after the last placed item.
    pub cursor: f32,
    /// Set when body text was dropped because the canvas ran out of room.
    pub clipped: bool,
}

impl CardPlan {
    pub fn body_lines(&self) -> impl Iterator<Item = &PlacedText> {
        self.items.iter().filter(|item| item.role == TextRole::Body)
    }
}

#[derive(Clone)]
pub struct CardRenderer {
    fonts: Arc<CardFonts>,
}

impl CardRenderer {
    pub fn new(fonts: Arc<CardFonts>) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &CardFonts {
        &self.fonts
    }

    pub fn plan(&self, heading: &str, body: &str) -> CardPlan {
        let heading_font = self.fonts.heading();
        let body_font = self.fonts.body();
        let mut items = Vec::new();
        let mut cursor = MARGIN_TOP;

        items.push(PlacedText {
            role: TextRole::Heading,
            text: heading.to_string(),
            x: MARGIN_X,
            y: cursor,
        });
        let heading_height = heading_font
            .bounding_box(heading)
            .map(|bounds| bounds.height())
            .unwrap_or(FALLBACK_HEADING_HEIGHT);
        cursor += heading_height + HEADING_GAP;

        let raw_lines = split_raw_lines(body);
        let mut clipped = false;
        'raw: for (raw_idx, raw_line) in raw_lines.iter().enumerate() {
            if cursor > CLIP_Y {
                clipped = raw_lines[raw_idx..]
                    .iter()
                    .any(|rest| !rest.trim().is_empty());
                break;
            }
            let text_line = raw_line.trim();
            if text_line.is_empty() {
                cursor += PARAGRAPH_GAP;
                continue;
            }
            let mut lines = wrap_lines(text_line, CONTENT_WIDTH, |candidate| {
                body_font.measure_width(candidate)
            })
            .peekable();
            while let Some(line) = lines.next() {
                let line_height = body_font
                    .bounding_box(&line)
                    .map(|bounds| bounds.height())
                    .unwrap_or(FALLBACK_LINE_HEIGHT);
                items.push(PlacedText {
                    role: TextRole::Body,
                    text: line,
                    x: MARGIN_X,
                    y: cursor,
                });
                cursor += line_height + LINE_GAP;
                if cursor > CLIP_Y {
                    clipped = lines.peek().is_some()
                        || raw_lines[raw_idx + 1..]
                            .iter()
                            .any(|rest| !rest.trim().is_empty());
                    break 'raw;
                }
            }
        }

        CardPlan {
            items,
            cursor,
            clipped,
        }
    }

    /// Renders the card and returns PNG bytes.
    pub fn render(&self, heading: &str, body: &str) -> Result<Vec<u8>> {
        let plan = self.plan(heading, body);
        if plan.clipped {
            tracing::debug!(
                "body clipped after {} lines at y={}",
                plan.body_lines().count(),
                plan.cursor
            );
        }
        let mut canvas = Canvas::new(CANVAS_WIDTH, CANVAS_HEIGHT, BACKGROUND)?;
        for item in &plan.items {
            let (font, color) = match item.role {
                TextRole::Heading => (self.fonts.heading(), HEADING_COLOR),
                TextRole::Body => (self.fonts.body(), BODY_COLOR),
            };
            canvas.draw_text(font, item.x, item.y, &item.text, color);
        }
        canvas.encode_png()
    }
}

fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}'
            | '\u{2029}'
    )
}

/// Splits on line breaks, treating `\r\n` as one break. A trailing break does
/// not produce an extra empty line.
fn split_raw_lines(body: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = body.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if !is_line_break(ch) {
            continue;
        }
        lines.push(&body[start..idx]);
        let mut end = idx + ch.len_utf8();
        if ch == '\r' {
            if let Some(&(next, '\n')) = chars.peek() {
                chars.next();
                end = next + 1;
            }
        }
        start = end;
    }
    if start < body.len() {
        lines.push(&body[start..]);
    }
    lines
}
