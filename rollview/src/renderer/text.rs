use rustybuzz::ttf_parser;

/// Collects a glyph's outline into a tiny-skia path, placed and scaled into the target space.
pub(super) struct GlyphPathBuilder<'a> {
    path: &'a mut tiny_skia::PathBuilder,
    x: f32,
    y: f32,
    scale: f32,
}
impl<'a> GlyphPathBuilder<'a> {
    /// `x, y` is the glyph origin on the baseline, `scale` converts font units.
    pub(super) fn new(path: &'a mut tiny_skia::PathBuilder, x: f32, y: f32, scale: f32) -> Self {
        Self { path, x, y, scale }
    }
    fn tx(&self, gx: f32) -> f32 {
        self.x + gx * self.scale
    }
    fn ty(&self, gy: f32) -> f32 {
        // Font space is y-up.
        self.y - gy * self.scale
    }
}
impl ttf_parser::OutlineBuilder for GlyphPathBuilder<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(self.tx(x), self.ty(y));
    }
    fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to(self.tx(x), self.ty(y));
    }
    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.path
            .quad_to(self.tx(x1), self.ty(y1), self.tx(x), self.ty(y));
    }
    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.path.cubic_to(
            self.tx(x1),
            self.ty(y1),
            self.tx(x2),
            self.ty(y2),
            self.tx(x),
            self.ty(y),
        );
    }
    fn close(&mut self) {
        self.path.close();
    }
}

/// Append every glyph of `run`, with its baseline origin at `origin`, to `path`.
/// `scale` converts millimeters into the target space.
pub(super) fn outline_run(
    face: &rustybuzz::Face<'_>,
    run: &rollview_core::fonts::ShapedRun,
    origin: [f32; 2],
    scale: f32,
    path: &mut tiny_skia::PathBuilder,
) {
    let units = run.mm_per_unit * scale;
    for glyph in &run.glyphs {
        let mut builder = GlyphPathBuilder::new(
            path,
            origin[0] + glyph.x_mm * scale,
            origin[1] + glyph.y_mm * scale,
            units,
        );
        // Outline-less glyphs (spaces) report `None`, nothing to do.
        let _ = face.outline_glyph(ttf_parser::GlyphId(glyph.glyph), &mut builder);
    }
}
