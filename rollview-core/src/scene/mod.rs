//! # Scene Document
//!
//! The per-frame display list. Drawers append primitives in page millimeters; the renderer and the
//! picker read them back in declaration order.
//!
//! A document is built on one thread, then frozen with [`SceneDocument::into_shared`]. Behind the
//! `Arc` there is no way back to `&mut`, which is what lets render workers read it without locks.
//! The next frame builds a new document rather than editing this one.

mod item;
pub use item::{DrawItem, Fill, ItemId, ItemOptions, Shape, Stroke, Tags};

use crate::color::Color;
use crate::fonts::{FontCatalog, FontSpec};
use crate::geom::{PointMm, RectMm};
use std::sync::Arc;

pub struct SceneMarker;
pub type SceneID = crate::RollID<SceneMarker>;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    #[error("no current page, create one with `new_page` first")]
    NoCurrentPage,
    #[error("page {index} out of range, document has {count}")]
    PageOutOfRange { index: usize, count: usize },
}

/// One page: a size and an append-only list of items.
#[derive(Clone, Debug)]
pub struct Page {
    width_mm: f32,
    height_mm: f32,
    items: Vec<DrawItem>,
}
impl Page {
    #[must_use]
    pub fn size(&self) -> (f32, f32) {
        (self.width_mm, self.height_mm)
    }
    /// The whole page as a rectangle at the origin.
    #[must_use]
    pub fn bounds(&self) -> RectMm {
        RectMm::from_xywh(0.0, 0.0, self.width_mm, self.height_mm)
    }
    /// Items in declaration (paint) order.
    #[must_use]
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }
    /// Items carrying `tag`, with their indices, in declaration order.
    pub fn items_with_tag<'a>(
        &'a self,
        tag: &'a str,
    ) -> impl Iterator<Item = (usize, &'a DrawItem)> + 'a {
        self.items
            .iter()
            .enumerate()
            .filter(move |(_, item)| item.tags.contains(tag))
    }
}

pub struct SceneDocument {
    id: SceneID,
    pages: Vec<Page>,
    current: Option<usize>,
    fonts: Arc<FontCatalog>,
}
impl std::fmt::Debug for SceneDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneDocument")
            .field("id", &self.id)
            .field("pages", &self.pages.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
impl SceneDocument {
    /// An empty document measuring text with `fonts`.
    #[must_use]
    pub fn new(fonts: Arc<FontCatalog>) -> Self {
        Self {
            id: SceneID::next(),
            pages: Vec::new(),
            current: None,
            fonts,
        }
    }
    #[must_use]
    pub fn id(&self) -> SceneID {
        self.id
    }
    #[must_use]
    pub fn fonts(&self) -> &Arc<FontCatalog> {
        &self.fonts
    }
    /// Freeze the document for handoff to renderers.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
    /// Append a page and make it current. Returns its index.
    pub fn new_page(&mut self, width_mm: f32, height_mm: f32) -> usize {
        self.pages.push(Page {
            width_mm,
            height_mm,
            items: Vec::new(),
        });
        let index = self.pages.len() - 1;
        self.current = Some(index);
        index
    }
    pub fn set_current_page(&mut self, index: usize) -> Result<(), SceneError> {
        if index >= self.pages.len() {
            return Err(SceneError::PageOutOfRange {
                index,
                count: self.pages.len(),
            });
        }
        self.current = Some(index);
        Ok(())
    }
    #[must_use]
    pub fn current_page_index(&self) -> Option<usize> {
        self.current
    }
    pub fn current_page_size(&self) -> Result<(f32, f32), SceneError> {
        self.current
            .map(|index| self.pages[index].size())
            .ok_or(SceneError::NoCurrentPage)
    }
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
    #[must_use]
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }
    pub fn pages(&self) -> impl ExactSizeIterator<Item = &Page> {
        self.pages.iter()
    }

    fn push(&mut self, shape: Shape, options: ItemOptions) -> Result<usize, SceneError> {
        let index = self.current.ok_or(SceneError::NoCurrentPage)?;
        let hit_rect = match options.hit_rect {
            Some(rect) => rect,
            None => match &shape {
                Shape::Text {
                    x_mm,
                    y_mm,
                    text,
                    font,
                    ..
                } => self.fonts.measure(text, font).at_baseline(*x_mm, *y_mm),
                // Empty polylines paint nothing and get a zero box at the origin.
                other => other.geometric_bounds().unwrap_or_default(),
            },
        };
        let page = &mut self.pages[index];
        page.items.push(DrawItem {
            id: options.id,
            tags: options.tags,
            hit_rect,
            shape,
        });
        Ok(page.items.len() - 1)
    }
    /// Append a straight stroked line. Returns the item's index on the current page.
    pub fn add_line(
        &mut self,
        from: PointMm,
        to: PointMm,
        stroke: Stroke,
        options: ItemOptions,
    ) -> Result<usize, SceneError> {
        self.push(Shape::Line { from, to, stroke }, options)
    }
    pub fn add_rect(
        &mut self,
        rect: RectMm,
        fill: Option<Fill>,
        outline: Option<Stroke>,
        options: ItemOptions,
    ) -> Result<usize, SceneError> {
        self.push(
            Shape::Rect {
                rect,
                fill,
                outline,
            },
            options,
        )
    }
    /// Append the ellipse inscribed in `rect`.
    pub fn add_oval(
        &mut self,
        rect: RectMm,
        fill: Option<Fill>,
        outline: Option<Stroke>,
        options: ItemOptions,
    ) -> Result<usize, SceneError> {
        self.push(
            Shape::Oval {
                rect,
                fill,
                outline,
            },
            options,
        )
    }
    /// Append a connected run of segments. `fill` is only painted when `closed`.
    pub fn add_polyline(
        &mut self,
        points: Vec<PointMm>,
        closed: bool,
        stroke: Stroke,
        fill: Option<Fill>,
        options: ItemOptions,
    ) -> Result<usize, SceneError> {
        self.push(
            Shape::Polyline {
                points,
                closed,
                stroke,
                fill,
            },
            options,
        )
    }
    /// Append a single line of text with its baseline origin at `(x_mm, y_mm)`.
    ///
    /// The default hit rectangle comes from shaping the text with this document's fonts.
    pub fn add_text(
        &mut self,
        x_mm: f32,
        y_mm: f32,
        text: impl Into<String>,
        font: FontSpec,
        color: Color,
        options: ItemOptions,
    ) -> Result<usize, SceneError> {
        self.push(
            Shape::Text {
                x_mm,
                y_mm,
                text: text.into(),
                font,
                color,
            },
            options,
        )
    }

    /// Most specific pickable item under the point. See [`crate::picker`].
    #[must_use]
    pub fn hit_test_point(&self, page: usize, point: PointMm) -> Option<crate::picker::ItemRef<'_>> {
        crate::picker::hit_test_point(self.page(page)?, point)
    }
    /// Every pickable item under the point, most specific first.
    #[must_use]
    pub fn hit_test_all(&self, page: usize, point: PointMm) -> Vec<crate::picker::ItemRef<'_>> {
        self.page(page)
            .map(|page| crate::picker::hit_test_all(page, point))
            .unwrap_or_default()
    }
    /// Pickable items touching `rect`, in declaration order.
    #[must_use]
    pub fn hit_test_rect(&self, page: usize, rect: &RectMm) -> Vec<crate::picker::ItemRef<'_>> {
        self.page(page)
            .map(|page| crate::picker::hit_test_rect(page, rect))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn document() -> SceneDocument {
        SceneDocument::new(Arc::new(FontCatalog::empty()))
    }
    fn black(width: f32) -> Stroke {
        Stroke::solid(Color::BLACK, width)
    }

    #[test]
    fn requires_page() {
        let mut doc = document();
        assert_eq!(doc.current_page_size(), Err(SceneError::NoCurrentPage));
        let added = doc.add_line(
            PointMm::new(0.0, 0.0),
            PointMm::new(1.0, 1.0),
            black(0.1),
            ItemOptions::new(),
        );
        assert_eq!(added, Err(SceneError::NoCurrentPage));
    }
    #[test]
    fn pages_and_current() {
        let mut doc = document();
        assert_eq!(doc.new_page(210.0, 297.0), 0);
        assert_eq!(doc.new_page(297.0, 210.0), 1);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.current_page_size(), Ok((297.0, 210.0)));
        doc.set_current_page(0).unwrap();
        assert_eq!(doc.current_page_size(), Ok((210.0, 297.0)));
        assert_eq!(
            doc.set_current_page(2),
            Err(SceneError::PageOutOfRange { index: 2, count: 2 })
        );
        // Failed switch leaves the current page alone.
        assert_eq!(doc.current_page_index(), Some(0));

        doc.add_rect(
            RectMm::from_xywh(1.0, 1.0, 2.0, 2.0),
            Some(Color::BLACK.into()),
            None,
            ItemOptions::new(),
        )
        .unwrap();
        assert_eq!(doc.page(0).unwrap().items().len(), 1);
        assert!(doc.page(1).unwrap().items().is_empty());
    }
    #[test]
    fn default_hit_rects_enclose_strokes() {
        let mut doc = document();
        doc.new_page(100.0, 100.0);
        let line = doc
            .add_line(
                PointMm::new(10.0, 10.0),
                PointMm::new(50.0, 10.0),
                black(2.0),
                ItemOptions::new(),
            )
            .unwrap();
        let rect = doc
            .add_rect(
                RectMm::from_xywh(20.0, 20.0, 10.0, 5.0),
                None,
                None,
                ItemOptions::new(),
            )
            .unwrap();
        let poly = doc
            .add_polyline(
                vec![
                    PointMm::new(0.0, 5.0),
                    PointMm::new(8.0, 1.0),
                    PointMm::new(4.0, 9.0),
                ],
                true,
                black(0.0),
                None,
                ItemOptions::new(),
            )
            .unwrap();
        let items = doc.page(0).unwrap().items();
        assert_eq!(items[line].hit_rect, RectMm::from_xywh(9.0, 9.0, 42.0, 2.0));
        assert_eq!(items[rect].hit_rect, RectMm::from_xywh(20.0, 20.0, 10.0, 5.0));
        assert_eq!(items[poly].hit_rect, RectMm::from_xywh(0.0, 1.0, 8.0, 8.0));
    }
    #[test]
    fn degenerate_accepted() {
        let mut doc = document();
        doc.new_page(10.0, 10.0);
        assert!(doc
            .add_polyline(Vec::new(), false, black(0.3), None, ItemOptions::new())
            .is_ok());
        assert!(doc
            .add_oval(RectMm::default(), None, None, ItemOptions::new())
            .is_ok());
    }
    #[test]
    fn explicit_hit_rect_wins() {
        let mut doc = document();
        doc.new_page(10.0, 10.0);
        let explicit = RectMm::from_xywh(0.0, 0.0, 10.0, 10.0);
        let index = doc
            .add_text(
                2.0,
                5.0,
                "ff",
                FontSpec::new("serif", 10.0),
                Color::BLACK,
                ItemOptions::pickable(7).hit_rect(explicit),
            )
            .unwrap();
        assert_eq!(doc.page(0).unwrap().items()[index].hit_rect, explicit);
    }
    #[test]
    fn text_hit_rect_from_metrics() {
        let mut doc = document();
        doc.new_page(100.0, 100.0);
        let index = doc
            .add_text(
                10.0,
                50.0,
                "mf",
                FontSpec::new("serif", 72.0),
                Color::BLACK,
                ItemOptions::new(),
            )
            .unwrap();
        let rect = doc.page(0).unwrap().items()[index].hit_rect;
        // Nominal metrics with no faces: half an inch per character, baseline inside.
        assert!((rect.w - 25.4).abs() < 1e-3);
        assert!(rect.contains(PointMm::new(10.0, 50.0)));
    }
    #[test]
    fn tags_filter() {
        let mut doc = document();
        doc.new_page(10.0, 10.0);
        let rect = RectMm::from_xywh(0.0, 0.0, 1.0, 1.0);
        doc.add_rect(rect, None, None, ItemOptions::new().tagged("note"))
            .unwrap();
        doc.add_rect(rect, None, None, ItemOptions::new().tagged("grid"))
            .unwrap();
        doc.add_rect(
            rect,
            None,
            None,
            ItemOptions::new().tagged("note").tagged("selected"),
        )
        .unwrap();
        let notes: Vec<usize> = doc
            .page(0)
            .unwrap()
            .items_with_tag("note")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(notes, vec![0, 2]);
    }
    #[test]
    fn shared_documents_are_sendable() {
        fn assert_send_sync<T: Send + Sync>(_: &T) {}
        let doc = document().into_shared();
        assert_send_sync(&doc);
    }
}
