//! Utility types, used throughout the crate.

/// A float which is neither NaN nor infinite.
// Because of the preconditions invalidating many bitpatterns, this is not Pod.
#[derive(Copy, Clone, PartialEq, PartialOrd, bytemuck::NoUninit, bytemuck::Zeroable, Debug)]
#[repr(transparent)]
pub struct FiniteF32(f32);
impl FiniteF32 {
    pub const ZERO: Self = Self(0.0);
    pub const ONE: Self = Self(1.0);
    pub fn new(val: f32) -> Result<Self, FiniteF32Error> {
        if val.is_finite() {
            Ok(Self(val))
        } else {
            Err(FiniteF32Error::NotFinite)
        }
    }
    /// Wrap a value, clamping it into `[min, max]`. Non-finite values collapse to `min`.
    #[must_use]
    pub fn new_clamped(val: f32, min: f32, max: f32) -> Self {
        if val.is_nan() {
            Self(min)
        } else {
            Self(val.clamp(min, max))
        }
    }
    #[must_use]
    pub const fn get(self) -> f32 {
        self.0
    }
}

impl Default for FiniteF32 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<f32> for FiniteF32 {
    type Error = FiniteF32Error;
    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
impl From<FiniteF32> for f32 {
    fn from(value: FiniteF32) -> Self {
        value.get()
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiniteF32Error {
    #[error("not finite")]
    NotFinite,
}

// Never NaN, so PartialEq can act like Eq.
impl Eq for FiniteF32 {}
#[allow(clippy::derive_ord_xor_partial_ord)]
impl Ord for FiniteF32 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Both sides are finite, `partial_cmp` always answers.
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}
impl std::hash::Hash for FiniteF32 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // +0.0 and -0.0 compare equal, so they must hash equal too.
        let bits = if self.0 == 0.0 { 0 } else { self.0.to_bits() };
        state.write_u32(bits);
    }
}

#[cfg(test)]
mod test {
    use super::FiniteF32;
    #[test]
    fn rejects_non_finite() {
        assert!(FiniteF32::new(f32::NAN).is_err());
        assert!(FiniteF32::new(f32::INFINITY).is_err());
        assert_eq!(FiniteF32::new(1.5).map(FiniteF32::get), Ok(1.5));
    }
    #[test]
    fn clamped() {
        assert_eq!(FiniteF32::new_clamped(f32::NAN, 0.0, 1.0).get(), 0.0);
        assert_eq!(FiniteF32::new_clamped(f32::INFINITY, 0.0, 1.0).get(), 1.0);
        assert_eq!(FiniteF32::new_clamped(-3.0, 0.0, 1.0).get(), 0.0);
    }
}
