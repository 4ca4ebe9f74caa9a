//! # Picker
//!
//! Answers "what is under the pointer" against a page's hit rectangles. Small things win over big
//! things, so a resize handle drawn over a note body is found before the body, and the body before
//! the background lane behind it.

use crate::geom::{PointMm, RectMm};
use crate::scene::{DrawItem, ItemId, Page};

/// A picked item and where it sits in its page's list.
#[derive(Copy, Clone, Debug)]
pub struct ItemRef<'a> {
    pub index: usize,
    pub item: &'a DrawItem,
}
impl ItemRef<'_> {
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.item.id
    }
}
impl PartialEq for ItemRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && std::ptr::eq(self.item, other.item)
    }
}

fn candidates(page: &Page, point: PointMm) -> impl Iterator<Item = ItemRef<'_>> {
    page.items()
        .iter()
        .enumerate()
        .filter(move |(_, item)| item.is_pickable() && item.hit_rect.contains(point))
        .map(|(index, item)| ItemRef { index, item })
}

/// The pickable item with the smallest hit rectangle containing `point`.
/// Equal areas go to the item declared first.
#[must_use]
pub fn hit_test_point(page: &Page, point: PointMm) -> Option<ItemRef<'_>> {
    // `min_by` keeps the first of equal elements.
    candidates(page, point).min_by(|a, b| a.item.hit_rect.area().total_cmp(&b.item.hit_rect.area()))
}

/// Every pickable item containing `point`, by ascending hit rectangle area, ties in declaration
/// order.
#[must_use]
pub fn hit_test_all(page: &Page, point: PointMm) -> Vec<ItemRef<'_>> {
    let mut hits: Vec<_> = candidates(page, point).collect();
    // Stable, so declaration order survives among equal areas.
    hits.sort_by(|a, b| a.item.hit_rect.area().total_cmp(&b.item.hit_rect.area()));
    hits
}

/// Pickable items whose hit rectangle touches `rect`, in declaration order. For rubber-band
/// selection.
#[must_use]
pub fn hit_test_rect<'a>(page: &'a Page, rect: &RectMm) -> Vec<ItemRef<'a>> {
    page.items()
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_pickable() && item.hit_rect.intersects(rect))
        .map(|(index, item)| ItemRef { index, item })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::Color;
    use crate::fonts::FontCatalog;
    use crate::scene::{ItemOptions, SceneDocument};

    fn doc_with(rects: &[(u64, RectMm)]) -> SceneDocument {
        let mut doc = SceneDocument::new(std::sync::Arc::new(FontCatalog::empty()));
        doc.new_page(200.0, 200.0);
        for (id, rect) in rects {
            doc.add_rect(
                *rect,
                Some(Color::WHITE.into()),
                None,
                ItemOptions::pickable(*id),
            )
            .unwrap();
        }
        doc
    }

    #[test]
    fn inner_wins() {
        let doc = doc_with(&[
            (1, RectMm::from_xywh(0.0, 0.0, 100.0, 100.0)),
            (2, RectMm::from_xywh(40.0, 40.0, 20.0, 20.0)),
        ]);
        let picked = doc.hit_test_point(0, PointMm::new(50.0, 50.0)).unwrap();
        assert_eq!(picked.id(), ItemId(2));
        // Outside the inner one, the outer is all that's left.
        let picked = doc.hit_test_point(0, PointMm::new(10.0, 10.0)).unwrap();
        assert_eq!(picked.id(), ItemId(1));
        assert!(doc.hit_test_point(0, PointMm::new(150.0, 150.0)).is_none());
    }
    #[test]
    fn unpickable_never_returned() {
        let doc = doc_with(&[
            (0, RectMm::from_xywh(40.0, 40.0, 1.0, 1.0)),
            (3, RectMm::from_xywh(0.0, 0.0, 100.0, 100.0)),
            (0, RectMm::from_xywh(0.0, 0.0, 200.0, 200.0)),
        ]);
        for point in [
            PointMm::new(40.5, 40.5),
            PointMm::new(0.0, 0.0),
            PointMm::new(150.0, 150.0),
        ] {
            assert!(doc
                .hit_test_all(0, point)
                .iter()
                .all(|hit| hit.item.is_pickable()));
        }
        assert_eq!(
            doc.hit_test_point(0, PointMm::new(40.5, 40.5)).map(|h| h.id()),
            Some(ItemId(3))
        );
        assert!(doc.hit_test_point(0, PointMm::new(150.0, 150.0)).is_none());
    }
    #[test]
    fn ties_go_to_first_declared() {
        let same = RectMm::from_xywh(10.0, 10.0, 5.0, 5.0);
        let doc = doc_with(&[(5, same), (6, same), (7, RectMm::from_xywh(0.0, 0.0, 50.0, 50.0))]);
        let all: Vec<u64> = doc
            .hit_test_all(0, PointMm::new(12.0, 12.0))
            .iter()
            .map(|hit| hit.id().0)
            .collect();
        assert_eq!(all, vec![5, 6, 7]);
        assert_eq!(
            doc.hit_test_point(0, PointMm::new(12.0, 12.0)).map(|h| h.index),
            Some(0)
        );
    }
    #[test]
    fn edges_inclusive() {
        let doc = doc_with(&[(1, RectMm::from_xywh(10.0, 10.0, 5.0, 5.0))]);
        for corner in [
            PointMm::new(10.0, 10.0),
            PointMm::new(15.0, 10.0),
            PointMm::new(10.0, 15.0),
            PointMm::new(15.0, 15.0),
        ] {
            assert!(doc.hit_test_point(0, corner).is_some(), "{corner:?}");
        }
    }
    #[test]
    fn rubber_band() {
        let doc = doc_with(&[
            (1, RectMm::from_xywh(0.0, 0.0, 10.0, 10.0)),
            (0, RectMm::from_xywh(20.0, 0.0, 10.0, 10.0)),
            (2, RectMm::from_xywh(40.0, 0.0, 10.0, 10.0)),
        ]);
        let page = doc.page(0).unwrap();
        let ids: Vec<u64> = hit_test_rect(page, &RectMm::from_xywh(5.0, 5.0, 40.0, 1.0))
            .iter()
            .map(|hit| hit.id().0)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }
    #[test]
    fn rubber_band_outlives_rect() {
        let doc = doc_with(&[
            (1, RectMm::from_xywh(0.0, 0.0, 10.0, 10.0)),
            (2, RectMm::from_xywh(40.0, 0.0, 10.0, 10.0)),
        ]);
        // The hits borrow the page only, the band can be a temporary.
        let hits = doc.hit_test_rect(0, &RectMm::from_xywh(8.0, 8.0, 4.0, 4.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), ItemId(1));
        assert_eq!(hits[0].index, 0);
        assert!(doc
            .hit_test_rect(0, &RectMm::from_xywh(15.0, 0.0, 20.0, 10.0))
            .is_empty());
        assert!(doc.hit_test_rect(3, &RectMm::from_xywh(0.0, 0.0, 50.0, 50.0)).is_empty());
    }
    #[test]
    fn missing_page() {
        let doc = doc_with(&[]);
        assert!(doc.hit_test_point(3, PointMm::new(0.0, 0.0)).is_none());
        assert!(doc.hit_test_all(3, PointMm::new(0.0, 0.0)).is_empty());
    }
}
