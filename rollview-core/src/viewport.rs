use crate::geom::{PointMm, RectMm};
use crate::units::Resolution;

/// Zoom is clamped to this range. Outside of it the mm <-> px mapping loses too much precision
/// to be useful.
pub const MIN_ZOOM: f32 = 1.0 / 64.0;
pub const MAX_ZOOM: f32 = 256.0;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum ViewportError {
    /// The mapping cannot be inverted anymore, and has become useless.
    /// Occurs if zoom, resolution, or pixel ratio are zero, negative, or not finite.
    #[error("uninvertable")]
    Uninvertable,
}

/// Where a host widget looks onto a page.
///
/// Widget sizes and scroll offsets are in logical pixels, as the host's layout reports them.
/// Scroll is the page position, in logical pixels at the current zoom, of the widget's top-left.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportGeometry {
    pub widget_size_px: [f32; 2],
    pub device_pixel_ratio: f32,
    pub scroll_px: [f32; 2],
    zoom: f32,
    /// Logical resolution at zoom 1.
    base: Resolution,
}
impl ViewportGeometry {
    /// 96 logical pixels per inch at zoom 1, the usual desktop convention.
    pub const DEFAULT_BASE: Resolution = Resolution::Dpi(96.0);

    pub fn new(
        widget_size_px: [f32; 2],
        device_pixel_ratio: f32,
        base: Resolution,
    ) -> Result<Self, ViewportError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if !valid(device_pixel_ratio) || !valid(base.px_per_mm()) {
            return Err(ViewportError::Uninvertable);
        }
        Ok(Self {
            widget_size_px,
            device_pixel_ratio,
            scroll_px: [0.0; 2],
            zoom: 1.0,
            base,
        })
    }
    #[must_use]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }
    pub fn set_zoom(&mut self, zoom: f32) -> Result<(), ViewportError> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(ViewportError::Uninvertable);
        }
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        Ok(())
    }
    /// Logical pixels per millimeter.
    #[must_use]
    pub fn logical_px_per_mm(&self) -> f32 {
        self.base.px_per_mm() * self.zoom
    }
    /// Device pixels per millimeter, the scale the renderer wants.
    #[must_use]
    pub fn px_per_mm(&self) -> f32 {
        self.logical_px_per_mm() * self.device_pixel_ratio
    }
    /// The part of the page visible in the widget. May extend past the page.
    #[must_use]
    pub fn clip_rect_mm(&self) -> RectMm {
        let scale = self.logical_px_per_mm();
        RectMm::from_xywh(
            self.scroll_px[0] / scale,
            self.scroll_px[1] / scale,
            self.widget_size_px[0] / scale,
            self.widget_size_px[1] / scale,
        )
    }
    /// Convert a point in widget space (logical px from the widget's top-left) to page space.
    #[must_use]
    pub fn widget_to_mm(&self, point_px: [f32; 2]) -> PointMm {
        let scale = self.logical_px_per_mm();
        PointMm::new(
            (self.scroll_px[0] + point_px[0]) / scale,
            (self.scroll_px[1] + point_px[1]) / scale,
        )
    }
    /// Convert a page point to widget space.
    #[must_use]
    pub fn mm_to_widget(&self, point: PointMm) -> [f32; 2] {
        let scale = self.logical_px_per_mm();
        [
            point.x * scale - self.scroll_px[0],
            point.y * scale - self.scroll_px[1],
        ]
    }
    /// Pan by this displacement in widget space.
    pub fn pan(&mut self, delta_px: [f32; 2]) {
        self.scroll_px[0] += delta_px[0];
        self.scroll_px[1] += delta_px[1];
    }
    /// Scale about this widget point such that the page point under it stays put.
    pub fn zoom_about(&mut self, center_px: [f32; 2], scale_by: f32) -> Result<(), ViewportError> {
        let anchor = self.widget_to_mm(center_px);
        self.set_zoom(self.zoom * scale_by)?;
        let scale = self.logical_px_per_mm();
        self.scroll_px = [
            anchor.x * scale - center_px[0],
            anchor.y * scale - center_px[1],
        ];
        Ok(())
    }
    /// Round scroll to whole device pixels, so consecutive frames and neighbouring tiles share a
    /// pixel grid.
    pub fn snap_to_device(&mut self) {
        let dpr = self.device_pixel_ratio;
        for s in &mut self.scroll_px {
            *s = (*s * dpr).round() / dpr;
        }
    }
}
