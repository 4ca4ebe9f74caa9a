//! # Font Catalog
//!
//! Resolves `(family, bold, italic)` requests to concrete faces and measures shaped runs of text.
//!
//! A catalog is an explicit value: scenes carry one to measure text hit rectangles, and the
//! renderer uses the same one to outline glyphs, so both agree on which face a string uses.
//! Nothing here is process-global.
//!
//! Resolution never fails outright. An unknown family falls back to the catalog's default family,
//! then to any face at all. A catalog with no faces (e.g. a headless test machine) measures with
//! nominal metrics and the renderer draws no glyphs.

use crate::geom::RectMm;
use crate::units::MM_PER_PT;
use rustybuzz::ttf_parser;

/// Which face a run of text asks for, and how large.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size_pt: f32,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub bold: bool,
}
impl FontSpec {
    #[must_use]
    pub fn new(family: impl Into<String>, size_pt: f32) -> Self {
        Self {
            family: family.into(),
            size_pt,
            italic: false,
            bold: false,
        }
    }
    #[must_use]
    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }
    #[must_use]
    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }
    /// Em size in millimeters.
    #[must_use]
    pub fn size_mm(&self) -> f32 {
        self.size_pt * MM_PER_PT
    }
}

/// Family names with a generic meaning rather than naming an installed family.
fn generic_family(name: &str) -> Option<fontdb::Family<'_>> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => Some(fontdb::Family::Serif),
        "sans-serif" | "sans" => Some(fontdb::Family::SansSerif),
        "monospace" => Some(fontdb::Family::Monospace),
        "cursive" => Some(fontdb::Family::Cursive),
        "fantasy" => Some(fontdb::Family::Fantasy),
        _ => None,
    }
}

#[derive(Clone, Hash, PartialEq, Eq)]
struct FaceKey {
    family: String,
    bold: bool,
    italic: bool,
}

/// One positioned glyph of a shaped run, relative to the run's baseline origin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapedGlyph {
    pub glyph: u16,
    pub x_mm: f32,
    /// Down is positive, as in page space.
    pub y_mm: f32,
}

/// A shaped string, ready to be outlined.
#[derive(Clone, Debug)]
pub struct ShapedRun {
    pub face: fontdb::ID,
    pub glyphs: Vec<ShapedGlyph>,
    /// Font units to millimeters.
    pub mm_per_unit: f32,
    pub advance_mm: f32,
    /// Ink and line box union, relative to the baseline origin.
    pub bounds: RectMm,
}

/// Extents of a string relative to its baseline origin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TextMetrics {
    /// Union of the glyph ink boxes, the advance, and the line's ascender/descender.
    pub bounds: RectMm,
    pub advance_mm: f32,
    /// False if no face was available and nominal metrics were used.
    pub measured: bool,
}
impl TextMetrics {
    /// Place the extents at a baseline position on the page.
    #[must_use]
    pub fn at_baseline(&self, x_mm: f32, y_mm: f32) -> RectMm {
        RectMm::from_xywh(
            self.bounds.x + x_mm,
            self.bounds.y + y_mm,
            self.bounds.w,
            self.bounds.h,
        )
    }
}

pub struct FontCatalog {
    db: fontdb::Database,
    default_family: String,
    /// Lazily filled as faces are requested. `None` if nothing at all resolved.
    resolved: parking_lot::Mutex<hashbrown::HashMap<FaceKey, Option<fontdb::ID>>>,
}
impl std::fmt::Debug for FontCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontCatalog")
            .field("faces", &self.db.len())
            .field("default_family", &self.default_family)
            .finish_non_exhaustive()
    }
}
impl FontCatalog {
    pub const DEFAULT_FAMILY: &'static str = "sans-serif";
    /// Catalog over the system's installed fonts.
    #[must_use]
    pub fn new_system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("Loaded {} system font faces", db.len());
        Self::from_database(db)
    }
    /// Catalog without any faces. Text is measured with nominal metrics and never drawn.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_database(fontdb::Database::new())
    }
    #[must_use]
    pub fn from_database(db: fontdb::Database) -> Self {
        Self {
            db,
            default_family: Self::DEFAULT_FAMILY.to_owned(),
            resolved: parking_lot::Mutex::default(),
        }
    }
    /// Family substituted when a requested family cannot be found.
    #[must_use]
    pub fn with_default_family(mut self, family: impl Into<String>) -> Self {
        self.default_family = family.into();
        self.resolved.get_mut().clear();
        self
    }
    /// Add a font file's faces, e.g. a bundled notation font.
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
        self.resolved.get_mut().clear();
    }
    #[must_use]
    pub fn default_family(&self) -> &str {
        &self.default_family
    }
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.db.len()
    }
    fn query_family(&self, family: &str, spec: &FontSpec) -> Option<fontdb::ID> {
        let family = generic_family(family).unwrap_or(fontdb::Family::Name(family));
        let families = [family];
        self.db.query(&fontdb::Query {
            families: &families,
            weight: if spec.bold {
                fontdb::Weight::BOLD
            } else {
                fontdb::Weight::NORMAL
            },
            stretch: fontdb::Stretch::Normal,
            style: if spec.italic {
                fontdb::Style::Italic
            } else {
                fontdb::Style::Normal
            },
        })
    }
    /// Find the face for this spec, substituting the default family (with a warning) if needed.
    #[must_use]
    pub fn resolve(&self, spec: &FontSpec) -> Option<fontdb::ID> {
        let key = FaceKey {
            family: spec.family.clone(),
            bold: spec.bold,
            italic: spec.italic,
        };
        if let Some(cached) = self.resolved.lock().get(&key) {
            return *cached;
        }

        let found = self.query_family(&spec.family, spec).or_else(|| {
            let substitute = self
                .query_family(&self.default_family, spec)
                .or_else(|| self.db.faces().next().map(|face| face.id));
            // Only reached once per key, so this warns once per family and style.
            if substitute.is_some() {
                log::warn!(
                    "Font family {:?} unavailable, substituting {:?}",
                    spec.family,
                    self.default_family
                );
            } else {
                log::debug!("No font faces available for {:?}", spec.family);
            }
            substitute
        });

        self.resolved.lock().insert(key, found);
        found
    }
    /// Parse a resolved face and hand it to `f`. `None` if the face data is unreadable.
    pub fn with_face<R>(
        &self,
        id: fontdb::ID,
        f: impl FnOnce(&rustybuzz::Face<'_>) -> R,
    ) -> Option<R> {
        self.db
            .with_face_data(id, |data, index| {
                let face = rustybuzz::Face::from_slice(data, index)?;
                Some(f(&face))
            })
            .flatten()
    }
    /// Shape `text` in the face resolved for `spec`.
    #[must_use]
    pub fn shape(&self, text: &str, spec: &FontSpec) -> Option<ShapedRun> {
        let id = self.resolve(spec)?;
        let run = self.with_face(id, |face| shape_run(face, id, text, spec));
        if run.is_none() {
            log::warn!("Font face {id:?} for {:?} failed to parse", spec.family);
        }
        run
    }
    /// Measure `text` as drawn with `spec`, in millimeters relative to the baseline origin.
    #[must_use]
    pub fn measure(&self, text: &str, spec: &FontSpec) -> TextMetrics {
        match self.shape(text, spec) {
            Some(run) => TextMetrics {
                bounds: run.bounds,
                advance_mm: run.advance_mm,
                measured: true,
            },
            None => nominal_metrics(text, spec),
        }
    }
}

/// Metrics used when no face is available: half-em advance per character, 0.8em ascent,
/// 0.2em descent.
fn nominal_metrics(text: &str, spec: &FontSpec) -> TextMetrics {
    let em = spec.size_mm();
    let chars = text.chars().count();
    #[allow(clippy::cast_precision_loss)]
    let advance_mm = em * 0.5 * chars as f32;
    TextMetrics {
        bounds: RectMm::from_xywh(0.0, -0.8 * em, advance_mm, em),
        advance_mm,
        measured: false,
    }
}

fn shape_run(face: &rustybuzz::Face<'_>, id: fontdb::ID, text: &str, spec: &FontSpec) -> ShapedRun {
    let ttf: &ttf_parser::Face<'_> = face;
    let units_per_em = f32::from(ttf.units_per_em().max(1));
    let mm_per_unit = spec.size_mm() / units_per_em;

    let mut buffer = rustybuzz::UnicodeBuffer::new();
    buffer.push_str(text);
    let shaped = rustybuzz::shape(face, &[], buffer);

    // Line box first, so that empty and whitespace strings still have a height.
    let ascender = f32::from(ttf.ascender()) * mm_per_unit;
    let descender = f32::from(ttf.descender()) * mm_per_unit;
    let mut bounds = ([0.0f32, -ascender], [0.0f32, -descender]);

    let mut glyphs = Vec::with_capacity(shaped.len());
    let mut cursor = [0i32; 2];
    for (info, pos) in shaped.glyph_infos().iter().zip(shaped.glyph_positions()) {
        // rustybuzz stores u16 glyph ids in a u32.
        let glyph = u16::try_from(info.glyph_id).unwrap_or(0);
        let origin = [
            cursor[0].saturating_add(pos.x_offset),
            cursor[1].saturating_add(pos.y_offset),
        ];
        #[allow(clippy::cast_precision_loss)]
        let (x_mm, y_mm) = (
            origin[0] as f32 * mm_per_unit,
            // Font space is y-up.
            -(origin[1] as f32) * mm_per_unit,
        );
        if let Some(ink) = ttf.glyph_bounding_box(ttf_parser::GlyphId(glyph)) {
            bounds.0[0] = bounds.0[0].min(x_mm + f32::from(ink.x_min) * mm_per_unit);
            bounds.1[0] = bounds.1[0].max(x_mm + f32::from(ink.x_max) * mm_per_unit);
            bounds.0[1] = bounds.0[1].min(y_mm - f32::from(ink.y_max) * mm_per_unit);
            bounds.1[1] = bounds.1[1].max(y_mm - f32::from(ink.y_min) * mm_per_unit);
        }
        glyphs.push(ShapedGlyph { glyph, x_mm, y_mm });
        cursor = [
            cursor[0].saturating_add(pos.x_advance),
            cursor[1].saturating_add(pos.y_advance),
        ];
    }
    #[allow(clippy::cast_precision_loss)]
    let advance_mm = cursor[0] as f32 * mm_per_unit;
    bounds.0[0] = bounds.0[0].min(advance_mm);
    bounds.1[0] = bounds.1[0].max(advance_mm);

    ShapedRun {
        face: id,
        glyphs,
        mm_per_unit,
        advance_mm,
        bounds: RectMm::from_ltrb(bounds.0[0], bounds.0[1], bounds.1[0], bounds.1[1]),
    }
}
