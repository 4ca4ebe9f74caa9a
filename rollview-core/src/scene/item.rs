use crate::color::Color;
use crate::fonts::FontSpec;
use crate::geom::{PointMm, RectMm};

/// Pickable identity of an item. Zero means "not pickable".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ItemId(pub u64);
impl ItemId {
    pub const NONE: Self = Self(0);
    #[must_use]
    pub fn is_pickable(self) -> bool {
        self.0 != 0
    }
}
impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Free-form labels. The core stores them and filters by them, nothing more.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(smallvec::SmallVec<[Box<str>; 2]>);
impl Tags {
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| &**t == tag)
    }
    pub fn insert(&mut self, tag: &str) {
        if !self.contains(tag) {
            self.0.push(tag.into());
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|t| &**t)
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl<'a> FromIterator<&'a str> for Tags {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut tags = Self::default();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width_mm: f32,
    /// Alternating on/off lengths. `None` for a solid stroke.
    pub dash_pattern_mm: Option<smallvec::SmallVec<[f32; 4]>>,
    pub dash_offset_mm: f32,
}
impl Stroke {
    #[must_use]
    pub fn solid(color: Color, width_mm: f32) -> Self {
        Self {
            color,
            width_mm,
            dash_pattern_mm: None,
            dash_offset_mm: 0.0,
        }
    }
    #[must_use]
    pub fn dashed(mut self, pattern_mm: &[f32], offset_mm: f32) -> Self {
        self.dash_pattern_mm = Some(pattern_mm.into());
        self.dash_offset_mm = offset_mm;
        self
    }
    /// How far painted pixels reach past the centre line. Caps are butt and joins bevel,
    /// so this holds at every point of the path.
    #[must_use]
    pub fn reach_mm(&self) -> f32 {
        self.width_mm.max(0.0) / 2.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fill {
    pub color: Color,
}
impl From<Color> for Fill {
    fn from(color: Color) -> Self {
        Self { color }
    }
}

/// Geometry and style of one drawing instruction.
#[derive(Clone, Debug, PartialEq, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Shape {
    Line {
        from: PointMm,
        to: PointMm,
        stroke: Stroke,
    },
    Rect {
        rect: RectMm,
        fill: Option<Fill>,
        outline: Option<Stroke>,
    },
    Oval {
        /// Bounding box of the ellipse.
        rect: RectMm,
        fill: Option<Fill>,
        outline: Option<Stroke>,
    },
    Polyline {
        points: Vec<PointMm>,
        closed: bool,
        stroke: Stroke,
        /// Only meaningful when `closed`.
        fill: Option<Fill>,
    },
    Text {
        /// Baseline origin.
        x_mm: f32,
        y_mm: f32,
        text: String,
        font: FontSpec,
        color: Color,
    },
}
impl Shape {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }
    /// Default hit rectangle for everything but text, which needs font metrics.
    ///
    /// Encloses the painted geometry: point bounds or the shape's own box, grown by half of any
    /// stroke width. `None` for a polyline without points.
    pub(crate) fn geometric_bounds(&self) -> Option<RectMm> {
        match self {
            Self::Line { from, to, stroke } => {
                RectMm::bounding(&[*from, *to]).map(|r| r.inflate(stroke.reach_mm()))
            }
            Self::Rect { rect, outline, .. } | Self::Oval { rect, outline, .. } => {
                Some(rect.inflate(outline.as_ref().map_or(0.0, Stroke::reach_mm)))
            }
            Self::Polyline { points, stroke, .. } => {
                RectMm::bounding(points).map(|r| r.inflate(stroke.reach_mm()))
            }
            Self::Text { .. } => None,
        }
    }
}

/// One entry of a page's display list.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawItem {
    pub id: ItemId,
    pub tags: Tags,
    /// Encloses everything this item paints. Used for culling and picking.
    pub hit_rect: RectMm,
    pub shape: Shape,
}
impl DrawItem {
    #[must_use]
    pub fn is_pickable(&self) -> bool {
        self.id.is_pickable()
    }
}

/// Identity, labels and an optional explicit hit rectangle for an item being added.
#[derive(Clone, Debug, Default)]
pub struct ItemOptions {
    pub id: ItemId,
    pub tags: Tags,
    pub hit_rect: Option<RectMm>,
}
impl ItemOptions {
    /// Not pickable, untagged, default hit rectangle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn pickable(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
    #[must_use]
    pub fn tagged(mut self, tag: &str) -> Self {
        self.tags.insert(tag);
        self
    }
    /// Override the computed hit rectangle. The caller is then responsible for it enclosing the
    /// painted geometry.
    #[must_use]
    pub fn hit_rect(mut self, rect: RectMm) -> Self {
        self.hit_rect = Some(rect);
        self
    }
}
