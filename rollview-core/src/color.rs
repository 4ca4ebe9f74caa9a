use crate::util::{FiniteF32, FiniteF32Error};

/// A straight-alpha sRGB color, each channel in `[0, 1]`.
///
/// Drawers think in unpremultiplied colors. Premultiplication happens only when pixels are
/// written, so all fully transparent colors are normalized to transparent black here to keep
/// equality meaningful.
#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    bytemuck::Zeroable,
    Debug,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(try_from = "[f32; 4]", into = "[f32; 4]")]
pub struct Color([FiniteF32; 4]);
impl Color {
    pub const TRANSPARENT: Self = Self([FiniteF32::ZERO; 4]);
    pub const WHITE: Self = Self([FiniteF32::ONE; 4]);
    pub const BLACK: Self = Self([
        FiniteF32::ZERO,
        FiniteF32::ZERO,
        FiniteF32::ZERO,
        FiniteF32::ONE,
    ]);
    /// Create a color from straight channels. Channels are clamped into `[0, 1]`.
    ///
    /// Fails only if a channel is NaN or infinite.
    pub fn new_lossy(r: f32, g: f32, b: f32, a: f32) -> Result<Self, FiniteF32Error> {
        let clamp = |c: f32| -> Result<FiniteF32, FiniteF32Error> {
            Ok(FiniteF32::new_clamped(FiniteF32::new(c)?.get(), 0.0, 1.0))
        };
        let raw = Self([clamp(r)?, clamp(g)?, clamp(b)?, clamp(a)?]);
        if raw.0[3].get() == 0.0 {
            Ok(Self::TRANSPARENT)
        } else {
            Ok(raw)
        }
    }
    pub fn from_array_lossy([r, g, b, a]: [f32; 4]) -> Result<Self, FiniteF32Error> {
        Self::new_lossy(r, g, b, a)
    }
    /// Create a color from 8-bit straight channels. Infallible.
    #[must_use]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        let channel = |c: u8| FiniteF32::new_clamped(f32::from(c) / 255.0, 0.0, 1.0);
        if a == 0 {
            return Self::TRANSPARENT;
        }
        Self([channel(r), channel(g), channel(b), channel(a)])
    }
    #[must_use]
    pub fn as_array(&self) -> [f32; 4] {
        [
            self.0[0].get(),
            self.0[1].get(),
            self.0[2].get(),
            self.0[3].get(),
        ]
    }
    /// Quantize to 8-bit straight channels.
    #[must_use]
    pub fn to_rgba8(&self) -> [u8; 4] {
        self.as_array()
            .map(|c| az::saturating_cast::<f32, u8>((c * 255.0).round()))
    }
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.0[3].get()
    }
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.alpha() == 0.0
    }
}
impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}
impl TryFrom<[f32; 4]> for Color {
    type Error = FiniteF32Error;
    fn try_from(value: [f32; 4]) -> Result<Self, Self::Error> {
        Self::from_array_lossy(value)
    }
}
impl From<Color> for [f32; 4] {
    fn from(value: Color) -> Self {
        value.as_array()
    }
}
