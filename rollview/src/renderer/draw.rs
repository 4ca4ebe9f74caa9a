//! Drawing of single display list items onto a viewport raster.
//!
//! In [`ClipMode::PixelTrim`] items become outlines in device pixels, cut to the raster on the
//! page's pixel grid before they reach tiny-skia (see [`super::outline`]). Strokes are outlined
//! here too. Segments and dashes further out than half the stroke plus a bleed margin are trimmed
//! away first. In [`ClipMode::Scaled`] items are drawn in millimeters through a scale transform
//! and a mask does the clipping.

use rollview_core::{
    color::Color,
    fonts::{FontCatalog, FontSpec},
    geom::{PointMm, RectMm},
    scene::{DrawItem, Fill, Shape, Stroke},
};
use tiny_skia::{FillRule, Mask, Paint, PathBuilder, Pixmap, Transform};

use super::outline::{self, Dash, Grid, Outline, Pen};
use super::{ClipMode, Region};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub(super) enum DrawError {
    #[error("path has no extent")]
    DegeneratePath,
    #[error("unusable dash pattern {0:?}")]
    InvalidDash(Vec<f32>),
    #[error("no usable face for font family {0:?}")]
    MissingFace(String),
}
impl DrawError {
    fn invalid_dash(stroke: &Stroke) -> Self {
        Self::InvalidDash(stroke.dash_pattern_mm.as_deref().unwrap_or_default().to_vec())
    }
}

fn paint(color: Color) -> Paint<'static> {
    let [r, g, b, a] = color.to_rgba8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

pub(super) struct Canvas {
    pixmap: Pixmap,
    mode: ClipMode,
    px_per_mm: f32,
    grid: Grid,
    /// The viewport in page space.
    clip_mm: RectMm,
    transform: Transform,
    mask: Option<Mask>,
    min_stroke_px: f32,
    bleed_px: f32,
}
impl Canvas {
    pub(super) fn new(
        pixmap: Pixmap,
        region: &Region,
        mode: ClipMode,
        min_stroke_px: f32,
        bleed_px: f32,
    ) -> Self {
        let scale = f64::from(region.px_per_mm);
        #[allow(clippy::cast_possible_truncation)]
        let clip_mm = RectMm::from_xywh(
            (region.origin_px[0] / scale) as f32,
            (region.origin_px[1] / scale) as f32,
            (f64::from(region.size[0]) / scale) as f32,
            (f64::from(region.size[1]) / scale) as f32,
        );
        let (transform, mask) = match mode {
            ClipMode::PixelTrim => (Transform::identity(), None),
            ClipMode::Scaled => {
                #[allow(clippy::cast_possible_truncation)]
                let transform = Transform::from_scale(region.px_per_mm, region.px_per_mm)
                    .post_translate(-region.origin_px[0] as f32, -region.origin_px[1] as f32);
                (transform, viewport_mask(region.size))
            }
        };
        Self {
            pixmap,
            mode,
            px_per_mm: region.px_per_mm,
            grid: Grid::new(region.origin_px, region.size),
            clip_mm,
            transform,
            mask,
            min_stroke_px,
            bleed_px: bleed_px.max(0.0),
        }
    }
    pub(super) fn clip_mm(&self) -> &RectMm {
        &self.clip_mm
    }
    pub(super) fn finish(self) -> Pixmap {
        self.pixmap
    }
    /// Page length into drawing space.
    fn length(&self, mm: f32) -> f32 {
        match self.mode {
            ClipMode::PixelTrim => mm * self.px_per_mm,
            ClipMode::Scaled => mm,
        }
    }
    /// Smallest stroke or dash that stays visible, in drawing space.
    fn min_length(&self) -> f32 {
        match self.mode {
            ClipMode::PixelTrim => self.min_stroke_px,
            ClipMode::Scaled => self.min_stroke_px / self.px_per_mm,
        }
    }
    /// Dash lengths in drawing space, widened to stay visible. An odd pattern repeats to become
    /// even, as SVG does.
    fn dash_intervals(&self, stroke: &Stroke) -> Result<Option<Vec<f32>>, DrawError> {
        let Some(pattern) = &stroke.dash_pattern_mm else {
            return Ok(None);
        };
        if pattern.is_empty() || pattern.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(DrawError::invalid_dash(stroke));
        }
        let min = self.min_length();
        let mut intervals: Vec<f32> = pattern.iter().map(|&d| self.length(d).max(min)).collect();
        if intervals.len() % 2 == 1 {
            intervals.extend_from_within(..);
        }
        Ok(Some(intervals))
    }
    fn skia_stroke(&self, stroke: &Stroke) -> Result<tiny_skia::Stroke, DrawError> {
        let mut skia = tiny_skia::Stroke {
            width: self.length(stroke.width_mm).max(self.min_length()),
            line_cap: tiny_skia::LineCap::Butt,
            line_join: tiny_skia::LineJoin::Bevel,
            ..tiny_skia::Stroke::default()
        };
        if let Some(intervals) = self.dash_intervals(stroke)? {
            let offset = self.length(stroke.dash_offset_mm);
            skia.dash = Some(
                tiny_skia::StrokeDash::new(intervals, offset)
                    .ok_or_else(|| DrawError::invalid_dash(stroke))?,
            );
        }
        Ok(skia)
    }
    fn pen(&self, stroke: &Stroke) -> Result<Pen, DrawError> {
        let dash = match self.dash_intervals(stroke)? {
            Some(intervals) => Some(
                Dash::new(
                    intervals.into_iter().map(f64::from).collect(),
                    f64::from(self.length(stroke.dash_offset_mm)),
                )
                .ok_or_else(|| DrawError::invalid_dash(stroke))?,
            ),
            None => None,
        };
        Ok(Pen {
            half_width: f64::from(self.length(stroke.width_mm).max(self.min_length())) / 2.0,
            dash,
        })
    }
    /// The viewport grown by how far `pen` paints past a centre line plus the bleed. Anything
    /// farther out leaves no pixel in the raster.
    fn trim_rect(&self, pen: &Pen) -> RectMm {
        #[allow(clippy::cast_possible_truncation)]
        let reach_px = pen.half_width as f32;
        // Never tighter than a quarter pixel, or snapping could reach past it.
        let margin_px = reach_px + self.bleed_px.max(0.25);
        self.clip_mm.inflate(margin_px / self.px_per_mm)
    }
    fn outline(&self) -> Outline {
        Outline::new(self.grid)
    }
    fn fill_outline(&mut self, outline: Outline, color: Color) {
        // Nothing of it inside the raster.
        let Some(path) = outline.finish() else {
            return;
        };
        self.pixmap.fill_path(
            &path,
            &paint(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
    fn contour_px<'p>(&self, points: &'p [PointMm]) -> impl Iterator<Item = [f64; 2]> + 'p {
        let scale = self.px_per_mm;
        points.iter().map(move |&p| outline::page_px(p, scale))
    }
    /// A polyline in page millimeters, for the scaled transform.
    fn scaled_path(points: &[PointMm], closed: bool) -> Result<tiny_skia::Path, DrawError> {
        let mut builder = PathBuilder::new();
        let Some((first, rest)) = points.split_first() else {
            return Err(DrawError::DegeneratePath);
        };
        builder.move_to(first.x, first.y);
        for p in rest {
            builder.line_to(p.x, p.y);
        }
        if closed && points.len() > 2 {
            builder.close();
        }
        builder.finish().ok_or(DrawError::DegeneratePath)
    }
    fn stroke_polyline(
        &mut self,
        points: &[PointMm],
        closed: bool,
        stroke: &Stroke,
    ) -> Result<(), DrawError> {
        if stroke.color.is_transparent() {
            return Ok(());
        }
        match self.mode {
            ClipMode::PixelTrim => {
                let pen = self.pen(stroke)?;
                let mut outline = self.outline();
                outline::stroke(
                    &mut outline,
                    points,
                    closed,
                    &pen,
                    self.px_per_mm,
                    &self.trim_rect(&pen),
                );
                self.fill_outline(outline, stroke.color);
            }
            ClipMode::Scaled => {
                let skia = self.skia_stroke(stroke)?;
                let path = Self::scaled_path(points, closed)?;
                self.pixmap.stroke_path(
                    &path,
                    &paint(stroke.color),
                    &skia,
                    self.transform,
                    self.mask.as_ref(),
                );
            }
        }
        Ok(())
    }
    fn fill_rect(&mut self, rect: &RectMm, fill: &Fill) -> Result<(), DrawError> {
        if fill.color.is_transparent() {
            return Ok(());
        }
        // Nothing of it inside the viewport.
        let Some(visible) = rect
            .intersection(&self.clip_mm)
            .filter(|r| r.w > 0.0 && r.h > 0.0)
        else {
            return Ok(());
        };
        match self.mode {
            ClipMode::PixelTrim => {
                // The whole rect, the raster cuts it on the pixel grid.
                let corners = [
                    PointMm::new(rect.left(), rect.top()),
                    PointMm::new(rect.right(), rect.top()),
                    PointMm::new(rect.right(), rect.bottom()),
                    PointMm::new(rect.left(), rect.bottom()),
                ];
                let mut outline = self.outline();
                outline.contour(self.contour_px(&corners));
                self.fill_outline(outline, fill.color);
            }
            ClipMode::Scaled => {
                let Some(visible) = tiny_skia::Rect::from_ltrb(
                    visible.left(),
                    visible.top(),
                    visible.right(),
                    visible.bottom(),
                ) else {
                    return Ok(());
                };
                self.pixmap.fill_rect(
                    visible,
                    &paint(fill.color),
                    self.transform,
                    self.mask.as_ref(),
                );
            }
        }
        Ok(())
    }
    fn oval(
        &mut self,
        rect: &RectMm,
        fill: Option<&Fill>,
        outline: Option<&Stroke>,
    ) -> Result<(), DrawError> {
        if rect.w <= 0.0 || rect.h <= 0.0 {
            return Err(DrawError::DegeneratePath);
        }
        let fill = fill.filter(|f| !f.color.is_transparent());
        let outline = outline.filter(|s| !s.color.is_transparent());
        match self.mode {
            ClipMode::PixelTrim => {
                let pen = outline.map(|stroke| self.pen(stroke)).transpose()?;
                let trim = pen.as_ref().map_or_else(
                    || self.clip_mm.inflate(self.bleed_px / self.px_per_mm),
                    |pen| self.trim_rect(pen),
                );
                if !rect.intersects(&trim) {
                    return Ok(());
                }
                let points = outline::oval_points(rect, self.px_per_mm);
                if let Some(fill) = fill {
                    let mut shape = self.outline();
                    shape.contour(self.contour_px(&points));
                    self.fill_outline(shape, fill.color);
                }
                if let (Some(stroke), Some(pen)) = (outline, pen) {
                    let mut shape = self.outline();
                    outline::stroke(&mut shape, &points, true, &pen, self.px_per_mm, &trim);
                    self.fill_outline(shape, stroke.color);
                }
            }
            ClipMode::Scaled => {
                let reach = outline.map_or(0.0, Stroke::reach_mm);
                if !rect.inflate(reach).intersects(&self.clip_mm) {
                    return Ok(());
                }
                // Drawn whole, the mask clips it.
                let bounds =
                    tiny_skia::Rect::from_ltrb(rect.left(), rect.top(), rect.right(), rect.bottom());
                let path = bounds
                    .and_then(PathBuilder::from_oval)
                    .ok_or(DrawError::DegeneratePath)?;
                if let Some(fill) = fill {
                    self.pixmap.fill_path(
                        &path,
                        &paint(fill.color),
                        FillRule::Winding,
                        self.transform,
                        self.mask.as_ref(),
                    );
                }
                if let Some(stroke) = outline {
                    let skia = self.skia_stroke(stroke)?;
                    self.pixmap.stroke_path(
                        &path,
                        &paint(stroke.color),
                        &skia,
                        self.transform,
                        self.mask.as_ref(),
                    );
                }
            }
        }
        Ok(())
    }
    fn fill_polygon(&mut self, points: &[PointMm], fill: &Fill) -> Result<(), DrawError> {
        if fill.color.is_transparent() || points.len() < 3 {
            return Ok(());
        }
        match self.mode {
            ClipMode::PixelTrim => {
                let mut outline = self.outline();
                outline.contour(self.contour_px(points));
                self.fill_outline(outline, fill.color);
            }
            ClipMode::Scaled => {
                let path = Self::scaled_path(points, true)?;
                self.pixmap.fill_path(
                    &path,
                    &paint(fill.color),
                    FillRule::Winding,
                    self.transform,
                    self.mask.as_ref(),
                );
            }
        }
        Ok(())
    }
    fn text(
        &mut self,
        fonts: &FontCatalog,
        baseline: PointMm,
        text: &str,
        font: &FontSpec,
        color: Color,
    ) -> Result<(), DrawError> {
        if color.is_transparent() || text.is_empty() {
            return Ok(());
        }
        let Some(run) = fonts.shape(text, font) else {
            log::trace!("no face to draw {text:?} with");
            return Ok(());
        };
        // Glyphs are placed in page pixels and cut to the raster like any other outline.
        let (origin, scale) = match self.mode {
            ClipMode::PixelTrim => {
                let [x, y] = outline::page_px(baseline, self.px_per_mm);
                #[allow(clippy::cast_possible_truncation)]
                let origin = [x as f32, y as f32];
                (origin, self.px_per_mm)
            }
            ClipMode::Scaled => ([baseline.x, baseline.y], 1.0),
        };
        let mut builder = PathBuilder::new();
        fonts
            .with_face(run.face, |face| {
                super::text::outline_run(face, &run, origin, scale, &mut builder);
            })
            .ok_or_else(|| DrawError::MissingFace(font.family.clone()))?;
        // Whitespace has no outlines.
        let Some(path) = builder.finish() else {
            return Ok(());
        };
        match self.mode {
            ClipMode::PixelTrim => {
                let mut outline = self.outline();
                for contour in outline::flatten(&path) {
                    outline.contour(contour);
                }
                self.fill_outline(outline, color);
            }
            ClipMode::Scaled => self.pixmap.fill_path(
                &path,
                &paint(color),
                FillRule::Winding,
                self.transform,
                self.mask.as_ref(),
            ),
        }
        Ok(())
    }
    pub(super) fn draw(&mut self, item: &DrawItem, fonts: &FontCatalog) -> Result<(), DrawError> {
        match &item.shape {
            Shape::Line { from, to, stroke } => self.stroke_polyline(&[*from, *to], false, stroke),
            Shape::Rect {
                rect,
                fill,
                outline,
            } => {
                if let Some(fill) = fill {
                    self.fill_rect(rect, fill)?;
                }
                if let Some(outline) = outline {
                    let corners = [
                        PointMm::new(rect.left(), rect.top()),
                        PointMm::new(rect.right(), rect.top()),
                        PointMm::new(rect.right(), rect.bottom()),
                        PointMm::new(rect.left(), rect.bottom()),
                    ];
                    self.stroke_polyline(&corners, true, outline)?;
                }
                Ok(())
            }
            Shape::Oval {
                rect,
                fill,
                outline,
            } => self.oval(rect, fill.as_ref(), outline.as_ref()),
            Shape::Polyline {
                points,
                closed,
                stroke,
                fill,
            } => {
                if let (true, Some(fill)) = (*closed, fill) {
                    self.fill_polygon(points, fill)?;
                }
                if points.len() < 2 {
                    return Ok(());
                }
                self.stroke_polyline(points, *closed, stroke)
            }
            Shape::Text {
                x_mm,
                y_mm,
                text,
                font,
                color,
            } => self.text(fonts, PointMm::new(*x_mm, *y_mm), text, font, *color),
        }
    }
}

/// A mask admitting exactly the raster, the viewport in scaled mode.
fn viewport_mask(size: [u32; 2]) -> Option<Mask> {
    let mut mask = Mask::new(size[0], size[1])?;
    #[allow(clippy::cast_precision_loss)]
    let bounds = tiny_skia::Rect::from_xywh(0.0, 0.0, size[0] as f32, size[1] as f32)?;
    mask.fill_path(
        &PathBuilder::from_rect(bounds),
        FillRule::Winding,
        false,
        Transform::identity(),
    );
    Some(mask)
}
