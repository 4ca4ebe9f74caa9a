//! # Viewport renderer
//!
//! Rasterizes the visible part of one page of a [`SceneDocument`] with tiny-skia. Work is
//! proportional to what the viewport shows: items whose hit rectangle misses the viewport are
//! never touched. In the default [`ClipMode::PixelTrim`] everything is cut to the raster on the
//! page's pixel grid, so a viewport renders the same pixels whether it is drawn whole or in tiles.

mod draw;
mod outline;
mod raster;
mod text;

pub use raster::RasterImage;

use rayon::prelude::*;
use rollview_core::{
    color::Color,
    geom::RectMm,
    scene::{Page, SceneDocument},
    viewport::ViewportGeometry,
};

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ClipMode {
    /// Draw in millimeters under a scale transform, clip with a mask. Simple, but every item
    /// is handed to the rasterizer at full size.
    Scaled,
    /// Convert to pixels up front and cut outlines to the raster before rasterizing.
    #[default]
    PixelTrim,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("page {index} out of range, document has {count}")]
    PageOutOfRange { index: usize, count: usize },
    #[error("failed to allocate a {width}x{height} raster")]
    Allocation { width: u32, height: u32 },
    /// The render panicked on a worker. Only produced by the scheduler.
    #[error("render worker panicked")]
    WorkerPanicked,
}

/// What to render: a page, a scale, and the part of the page to show.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderParams {
    pub page_index: usize,
    /// Device pixels per millimeter.
    pub px_per_mm: f32,
    pub clip_rect_mm: RectMm,
    /// Only tags the output, scale is entirely in `px_per_mm`.
    pub device_pixel_ratio: f32,
}
impl RenderParams {
    #[must_use]
    pub fn new(page_index: usize, px_per_mm: f32, clip_rect_mm: RectMm) -> Self {
        Self {
            page_index,
            px_per_mm,
            clip_rect_mm,
            device_pixel_ratio: 1.0,
        }
    }
    #[must_use]
    pub fn with_device_pixel_ratio(mut self, device_pixel_ratio: f32) -> Self {
        self.device_pixel_ratio = device_pixel_ratio;
        self
    }
    /// What a widget currently shows of a page.
    #[must_use]
    pub fn from_viewport(page_index: usize, viewport: &ViewportGeometry) -> Self {
        Self {
            page_index,
            px_per_mm: viewport.px_per_mm(),
            clip_rect_mm: viewport.clip_rect_mm(),
            device_pixel_ratio: viewport.device_pixel_ratio,
        }
    }
}

/// A viewport resolved to the device pixel grid.
pub(crate) struct Region {
    px_per_mm: f32,
    /// Device pixel position of the raster's top-left, relative to the page origin. Always on
    /// the subpixel grid, so whole pixel offsets from it are too.
    origin_px: [f64; 2],
    size: [u32; 2],
}
impl Region {
    /// `None` if the viewport covers no pixels.
    fn of(params: &RenderParams) -> Option<Self> {
        let RenderParams {
            px_per_mm,
            clip_rect_mm: clip,
            ..
        } = *params;
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(px_per_mm) || !positive(clip.w) || !positive(clip.h) {
            return None;
        }
        if !clip.x.is_finite() || !clip.y.is_finite() {
            return None;
        }
        let scale = f64::from(px_per_mm);
        let size = [
            az::saturating_cast::<f64, u32>((f64::from(clip.w) * scale).round()),
            az::saturating_cast::<f64, u32>((f64::from(clip.h) * scale).round()),
        ];
        if size.contains(&0) {
            return None;
        }
        Some(Self {
            px_per_mm,
            origin_px: [
                outline::on_grid(f64::from(clip.x) * scale),
                outline::on_grid(f64::from(clip.y) * scale),
            ],
            size,
        })
    }
}

/// Rasterizer settings. Cheap to copy, shared by every render and every tile.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Renderer {
    pub clip_mode: ClipMode,
    /// Strokes and dashes thinner than this are widened to it.
    pub min_stroke_px: f32,
    /// How far past the viewport, beyond half the stroke width, segments and dashes are still
    /// drawn.
    pub bleed_px: f32,
    /// Painted under everything, including parts of the viewport past the page.
    pub background: Color,
}
impl Default for Renderer {
    fn default() -> Self {
        Self {
            clip_mode: ClipMode::default(),
            min_stroke_px: 0.5,
            bleed_px: 2.0,
            background: Color::WHITE,
        }
    }
}
impl Renderer {
    #[must_use]
    pub fn from_settings(settings: &crate::settings::RenderSettings) -> Self {
        Self {
            clip_mode: settings.clip_mode,
            min_stroke_px: settings.min_stroke_px,
            bleed_px: settings.bleed_px,
            background: settings.background,
        }
    }
    #[must_use]
    pub fn with_clip_mode(mut self, clip_mode: ClipMode) -> Self {
        self.clip_mode = clip_mode;
        self
    }
    fn page<'d>(document: &'d SceneDocument, index: usize) -> Result<&'d Page, RenderError> {
        document.page(index).ok_or(RenderError::PageOutOfRange {
            index,
            count: document.page_count(),
        })
    }
    /// Render the viewport described by `params`.
    ///
    /// A viewport covering no pixels renders to [`RasterImage::empty`]. Items that fail to draw
    /// are logged and skipped.
    pub fn render(
        &self,
        document: &SceneDocument,
        params: &RenderParams,
    ) -> Result<RasterImage, RenderError> {
        let page = Self::page(document, params.page_index)?;
        let Some(region) = Region::of(params) else {
            log::debug!("Empty viewport {:?}, nothing to render", params.clip_rect_mm);
            return Ok(RasterImage::empty(params.device_pixel_ratio));
        };
        self.render_region(document, page, &region, params.device_pixel_ratio)
    }
    /// Render the same viewport as [`Self::render`], split into square tiles of `tile_px`
    /// device pixels rendered in parallel.
    pub fn render_tiled(
        &self,
        document: &SceneDocument,
        params: &RenderParams,
        tile_px: u32,
    ) -> Result<RasterImage, RenderError> {
        let page = Self::page(document, params.page_index)?;
        let dpr = params.device_pixel_ratio;
        let Some(region) = Region::of(params) else {
            return Ok(RasterImage::empty(dpr));
        };
        let tile_px = tile_px.max(1);
        let step = usize::try_from(tile_px).unwrap_or(usize::MAX);
        let [width, height] = region.size;

        let tiles: Vec<[u32; 2]> = (0..height)
            .step_by(step)
            .flat_map(|y| (0..width).step_by(step).map(move |x| [x, y]))
            .collect();
        log::debug!(
            "Rendering {width}x{height} as {} tiles of {tile_px}px",
            tiles.len()
        );
        let rendered = tiles
            .into_par_iter()
            .map(|[x, y]| {
                let tile = Region {
                    px_per_mm: region.px_per_mm,
                    // Whole pixel offsets, so tiles share the full render's pixel grid.
                    origin_px: [
                        region.origin_px[0] + f64::from(x),
                        region.origin_px[1] + f64::from(y),
                    ],
                    size: [tile_px.min(width - x), tile_px.min(height - y)],
                };
                self.render_region(document, page, &tile, dpr)
                    .map(|image| ([x, y], image))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut image =
            RasterImage::transparent(width, height, dpr).ok_or(RenderError::Allocation {
                width,
                height,
            })?;
        for (at, tile) in &rendered {
            image.blit(tile, *at);
        }
        Ok(image)
    }
    fn render_region(
        &self,
        document: &SceneDocument,
        page: &Page,
        region: &Region,
        device_pixel_ratio: f32,
    ) -> Result<RasterImage, RenderError> {
        let [width, height] = region.size;
        let mut pixmap =
            tiny_skia::Pixmap::new(width, height).ok_or(RenderError::Allocation { width, height })?;
        let [r, g, b, a] = self.background.to_rgba8();
        pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, a));

        let mut canvas = draw::Canvas::new(
            pixmap,
            region,
            self.clip_mode,
            self.min_stroke_px,
            self.bleed_px,
        );
        let fonts = document.fonts();
        let (mut drawn, mut culled, mut failed) = (0usize, 0usize, 0usize);
        // Strokes widened to the minimum can reach past their hit rectangle.
        let reach_mm = (self.min_stroke_px / 2.0 + self.bleed_px.max(0.0)) / region.px_per_mm;
        let visible = canvas.clip_mm().inflate(reach_mm);
        for (index, item) in page.items().iter().enumerate() {
            if !item.hit_rect.intersects(&visible) {
                culled += 1;
                continue;
            }
            match canvas.draw(item, fonts) {
                Ok(()) => drawn += 1,
                Err(draw::DrawError::DegeneratePath) => {
                    log::trace!("Item {index} ({}) has no extent", item.shape.kind());
                }
                Err(err) => {
                    failed += 1;
                    log::warn!("Skipping item {index} ({}): {err}", item.shape.kind());
                }
            }
        }
        log::debug!(
            "Rendered {width}x{height} ({}): {drawn} drawn, {culled} culled, {failed} failed",
            self.clip_mode
        );
        Ok(RasterImage::from_pixmap(canvas.finish(), device_pixel_ratio))
    }
}
