use anyhow::{Context, Result, anyhow};
use std::io::Cursor;
use tiny_skia::{Color, Paint, Pixmap};

use super::font::CardFont;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn paint(self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(self.0, self.1, self.2, 255);
        paint.anti_alias = true;
        paint
    }
}

pub(crate) struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    pub(crate) fn new(width: u32, height: u32, background: Rgb) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("invalid canvas size {}x{}", width, height))?;
        pixmap.fill(Color::from_rgba8(background.0, background.1, background.2, 255));
        Ok(Self { pixmap })
    }

    pub(crate) fn draw_text(&mut self, font: &CardFont, x: f32, y: f32, text: &str, color: Rgb) {
        if text.is_empty() {
            return;
        }
        let paint = color.paint();
        font.draw(&mut self.pixmap, x, y, text, &paint);
    }

    /// Encodes the canvas as an 8-bit RGB PNG.
    pub(crate) fn encode_png(&self) -> Result<Vec<u8>> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        // The background is opaque, so premultiplied and straight RGBA agree.
        let rgba = image::RgbaImage::from_raw(width, height, self.pixmap.data().to_vec())
            .ok_or_else(|| anyhow!("failed to build image buffer from canvas"))?;
        let rgb = image::DynamicImage::ImageRgba8(rgba).into_rgb8();
        let mut bytes = Vec::new();
        let mut cursor = Cursor::new(&mut bytes);
        image::DynamicImage::ImageRgb8(rgb)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .with_context(|| "failed to encode canvas as PNG")?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardFonts;

    #[test]
    fn blank_canvas_encodes_background_color() {
        let canvas = Canvas::new(16, 8, Rgb(15, 23, 42)).expect("canvas");
        let png = canvas.encode_png().expect("png");
        let decoded = image::load_from_memory(&png).expect("decode").to_rgb8();
        assert_eq!(decoded.dimensions(), (16, 8));
        assert!(decoded.pixels().all(|pixel| pixel.0 == [15, 23, 42]));
    }

    #[test]
    fn drawing_text_changes_pixels() {
        let fonts = CardFonts::builtin(36.0, 24.0);
        let mut canvas = Canvas::new(200, 60, Rgb(0, 0, 0)).expect("canvas");
        canvas.draw_text(fonts.body(), 4.0, 4.0, "Hi", Rgb(255, 255, 255));
        let png = canvas.encode_png().expect("png");
        let decoded = image::load_from_memory(&png).expect("decode").to_rgb8();
        assert!(decoded.pixels().any(|pixel| pixel.0 == [255, 255, 255]));
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        assert!(Canvas::new(0, 10, Rgb(0, 0, 0)).is_err());
    }
}
