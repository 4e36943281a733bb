use anyhow::{Context, Result, anyhow};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use ttf_parser::{Face, GlyphId, OutlineBuilder, name_id};
use usvg::fontdb;

use super::builtin::BuiltinFont;
use crate::settings::FontSettings;

/// Ink bounds of a run of text, in pixels relative to the point it is drawn at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TextBox {
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub(crate) fn union(&self, other: &TextBox) -> TextBox {
        TextBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    File { path: PathBuf },
    System { family: String },
    Builtin,
}

impl fmt::Display for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::File { path } => write!(f, "file {}", path.display()),
            FontSource::System { family } => write!(f, "system font '{}'", family),
            FontSource::Builtin => write!(f, "built-in bitmap font"),
        }
    }
}

struct FaceData {
    data: Vec<u8>,
    face_index: u32,
    units_per_em: u16,
    family: Option<String>,
}

impl FaceData {
    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.face_index).ok()
    }
}

#[derive(Clone)]
enum Glyphs {
    Vector(Arc<FaceData>),
    Builtin(BuiltinFont),
}

/// A face at one pixel size, able to measure and draw single lines of text.
#[derive(Clone)]
pub struct CardFont {
    size: f32,
    glyphs: Glyphs,
}

impl CardFont {
    fn vector(face: Arc<FaceData>, size: f32) -> Self {
        Self {
            size,
            glyphs: Glyphs::Vector(face),
        }
    }

    fn builtin(size: f32) -> Self {
        Self {
            size,
            glyphs: Glyphs::Builtin(BuiltinFont::for_pixel_size(size)),
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn family(&self) -> Option<&str> {
        match &self.glyphs {
            Glyphs::Vector(face) => face.family.as_deref(),
            Glyphs::Builtin(_) => None,
        }
    }

    /// Returns `None` when the text has no ink, e.g. empty or blank strings.
    pub fn bounding_box(&self, text: &str) -> Option<TextBox> {
        match &self.glyphs {
            Glyphs::Builtin(font) => font.bounding_box(text),
            Glyphs::Vector(data) => {
                let face = data.face()?;
                let scale = self.size / data.units_per_em.max(1) as f32;
                let ascent = face.ascender() as f32 * scale;
                let mut pen = 0.0;
                let mut ink: Option<TextBox> = None;
                for ch in text.chars() {
                    let glyph = face.glyph_index(ch).unwrap_or(GlyphId(0));
                    if let Some(rect) = face.glyph_bounding_box(glyph) {
                        let glyph_box = TextBox {
                            left: pen + rect.x_min as f32 * scale,
                            top: ascent - rect.y_max as f32 * scale,
                            right: pen + rect.x_max as f32 * scale,
                            bottom: ascent - rect.y_min as f32 * scale,
                        };
                        ink = Some(match ink {
                            Some(current) => current.union(&glyph_box),
                            None => glyph_box,
                        });
                    }
                    pen += glyph_advance(&face, glyph, data.units_per_em) * scale;
                }
                ink
            }
        }
    }

    /// Right edge of the text's ink, the width used when wrapping.
    pub fn measure_width(&self, text: &str) -> f32 {
        self.bounding_box(text)
            .map(|bounds| bounds.right)
            .unwrap_or(0.0)
    }

    /// Draws `text` with its line box anchored at `(x, y)`.
    pub(crate) fn draw(&self, pixmap: &mut Pixmap, x: f32, y: f32, text: &str, paint: &Paint) {
        match &self.glyphs {
            Glyphs::Builtin(font) => font.draw(pixmap, x, y, text, paint),
            Glyphs::Vector(data) => {
                let Some(face) = data.face() else {
                    return;
                };
                let scale = self.size / data.units_per_em.max(1) as f32;
                let baseline = y + face.ascender() as f32 * scale;
                let mut pen = x;
                let right_edge = pixmap.width() as f32 + self.size;
                for ch in text.chars() {
                    if pen > right_edge {
                        break;
                    }
                    let glyph = face.glyph_index(ch).unwrap_or(GlyphId(0));
                    let mut outline = GlyphOutline {
                        builder: PathBuilder::new(),
                        x: pen,
                        baseline,
                        scale,
                    };
                    if face.outline_glyph(glyph, &mut outline).is_some() {
                        if let Some(path) = outline.builder.finish() {
                            pixmap.fill_path(
                                &path,
                                paint,
                                FillRule::Winding,
                                Transform::identity(),
                                None,
                            );
                        }
                    }
                    pen += glyph_advance(&face, glyph, data.units_per_em) * scale;
                }
            }
        }
    }
}

fn glyph_advance(face: &Face<'_>, glyph: GlyphId, units_per_em: u16) -> f32 {
    face.glyph_hor_advance(glyph).unwrap_or(units_per_em / 2) as f32
}

struct GlyphOutline {
    builder: PathBuilder,
    x: f32,
    baseline: f32,
    scale: f32,
}

impl GlyphOutline {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Heading and body fonts resolved from a single source.
#[derive(Clone)]
pub struct CardFonts {
    heading: CardFont,
    body: CardFont,
    source: FontSource,
}

impl CardFonts {
    /// Loads the configured font, substituting the built-in bitmap font when
    /// it cannot be found or parsed. Never fails.
    pub fn resolve(settings: &FontSettings) -> Self {
        match load_face(settings) {
            Ok((face, source)) => {
                let face = Arc::new(face);
                Self {
                    heading: CardFont::vector(face.clone(), settings.heading_size),
                    body: CardFont::vector(face, settings.body_size),
                    source,
                }
            }
            Err(err) => {
                tracing::warn!("using built-in font: {:#}", err);
                Self::builtin(settings.heading_size, settings.body_size)
            }
        }
    }

    pub fn builtin(heading_size: f32, body_size: f32) -> Self {
        Self {
            heading: CardFont::builtin(heading_size),
            body: CardFont::builtin(body_size),
            source: FontSource::Builtin,
        }
    }

    pub fn heading(&self) -> &CardFont {
        &self.heading
    }

    pub fn body(&self) -> &CardFont {
        &self.body
    }

    pub fn source(&self) -> &FontSource {
        &self.source
    }
}

fn load_face(settings: &FontSettings) -> Result<(FaceData, FontSource)> {
    if let Some(path) = settings.path.as_deref() {
        let path = Path::new(path);
        let face = load_face_from_file(path, Some(settings.family.as_str()))?;
        return Ok((
            face,
            FontSource::File {
                path: path.to_path_buf(),
            },
        ));
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    let candidates = std::iter::once(settings.family.as_str())
        .chain(settings.fallback_families.iter().map(String::as_str));
    let mut tried = Vec::new();
    for family in candidates {
        match load_face_from_family(&db, family) {
            Ok(face) => {
                let resolved = face.family.clone().unwrap_or_else(|| family.to_string());
                return Ok((face, FontSource::System { family: resolved }));
            }
            Err(err) => {
                tracing::debug!("font family '{}' unavailable: {:#}", family, err);
                tried.push(family.to_string());
            }
        }
    }
    Err(anyhow!("no system font found for {}", tried.join(", ")))
}

fn load_face_from_file(path: &Path, preferred_family: Option<&str>) -> Result<FaceData> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_face_from_data(data, preferred_family)
        .with_context(|| format!("failed to parse font: {}", path.display()))
}

fn load_face_from_family(db: &fontdb::Database, family: &str) -> Result<FaceData> {
    let is_sans = family.eq_ignore_ascii_case("sans-serif");
    let families = if is_sans {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    parse_face(data, face_index)
}

// Picks the face matching `preferred_family` inside a collection, otherwise
// the first face that parses.
fn load_face_from_data(data: Vec<u8>, preferred_family: Option<&str>) -> Result<FaceData> {
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    let mut first = None;
    for index in 0..count {
        let Ok(face) = Face::parse(&data, index) else {
            continue;
        };
        let family = extract_family_name(&face);
        if let (Some(preferred), Some(found)) = (preferred_family, family.as_deref()) {
            if found.eq_ignore_ascii_case(preferred) {
                return parse_face(data, index);
            }
        }
        if first.is_none() {
            first = Some(index);
        }
    }
    let index = first.ok_or_else(|| anyhow!("no usable face in font data"))?;
    parse_face(data, index)
}

fn parse_face(data: Vec<u8>, face_index: u32) -> Result<FaceData> {
    let (units_per_em, family) = {
        let face = Face::parse(&data, face_index)
            .map_err(|err| anyhow!("failed to parse font face {}: {}", face_index, err))?;
        (face.units_per_em(), extract_family_name(&face))
    };
    if units_per_em == 0 {
        return Err(anyhow!("font face {} has no units per em", face_index));
    }
    Ok(FaceData {
        data,
        face_index,
        units_per_em,
        family,
    })
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

/// Resolves an installed vector font, preferring DejaVu Sans and falling back
/// to the first family the system reports. `None` when the machine has none.
#[cfg(test)]
pub(crate) fn installed_system_fonts() -> Option<CardFonts> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let mut fallback_families = vec!["Liberation Sans".to_string(), "sans-serif".to_string()];
    fallback_families.extend(
        db.faces()
            .find_map(|face| face.families.first().map(|(name, _)| name.clone())),
    );
    let settings = FontSettings {
        family: "DejaVu Sans".to_string(),
        fallback_families,
        path: None,
        heading_size: 36.0,
        body_size: 24.0,
    };
    let fonts = CardFonts::resolve(&settings);
    matches!(fonts.source(), FontSource::System { .. }).then_some(fonts)
}
