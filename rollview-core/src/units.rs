pub const MM_PER_IN: f32 = 25.4;
pub const IN_PER_MM: f32 = 1.0 / MM_PER_IN;
/// Constant varies by who you ask - but this is the one defined by W3C.
pub const PT_PER_IN: f32 = 72.0;
pub const IN_PER_PT: f32 = 1.0 / PT_PER_IN;
/// Typographic points to millimeters.
pub const MM_PER_PT: f32 = MM_PER_IN * IN_PER_PT;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UnitParseError {
    #[error(transparent)]
    Value(#[from] std::num::ParseFloatError),
    #[error("unknown unit")]
    UnrecognizedUnit,
}

/// A physical length. Scene geometry is always millimeters, font sizes arrive in points,
/// and the rasterizer speaks device pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Length {
    Millimeter(f32),
    /// Typographic points, as defined by W3C.
    Point(f32),
    Inch(f32),
    /// Device pixels. These are [`Resolution`] dependent.
    Device(f32),
}
impl Length {
    /// Access the numeric component of the length.
    #[must_use]
    pub fn value(self) -> f32 {
        match self {
            Self::Millimeter(x) | Self::Point(x) | Self::Inch(x) | Self::Device(x) => x,
        }
    }
    /// Fetch the name of the unit.
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::Millimeter(_) => "mm",
            Self::Point(_) => "pt",
            Self::Inch(_) => "in",
            Self::Device(_) => "px",
        }
    }
    /// Convert into millimeters, under the given resolution.
    #[must_use]
    pub fn into_mm(self, resolution: Resolution) -> f32 {
        match self {
            Self::Millimeter(mm) => mm,
            Self::Point(pt) => pt * MM_PER_PT,
            Self::Inch(i) => i * MM_PER_IN,
            Self::Device(px) => px / resolution.px_per_mm(),
        }
    }
    /// Convert into device pixels, under the given resolution.
    #[must_use]
    pub fn into_device(self, resolution: Resolution) -> f32 {
        match self {
            Self::Device(px) => px,
            other => other.into_mm(resolution) * resolution.px_per_mm(),
        }
    }
    /// Convert into points, under the given resolution.
    #[must_use]
    pub fn into_points(self, resolution: Resolution) -> f32 {
        match self {
            Self::Point(pt) => pt,
            other => other.into_mm(resolution) / MM_PER_PT,
        }
    }
}
impl std::fmt::Display for Length {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value(), self.unit())
    }
}

impl std::str::FromStr for Length {
    type Err = UnitParseError;
    fn from_str(mut s: &str) -> Result<Self, Self::Err> {
        // Only ascii suffixes are recognized, but unicode input must not panic.
        s = s.trim_ascii_end();
        if s.len() < 2 || !s.is_char_boundary(s.len() - 2) {
            return Err(UnitParseError::UnrecognizedUnit);
        }
        let (value, unit) = s.split_at(s.len() - 2);
        let make: fn(f32) -> Self = match unit {
            "mm" => Self::Millimeter,
            "pt" => Self::Point,
            "in" => Self::Inch,
            "px" => Self::Device,
            _ => return Err(UnitParseError::UnrecognizedUnit),
        };
        Ok(make(value.trim_ascii().parse()?))
    }
}

/// Relationship between device pixels and millimeters for one render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
    /// Device pixels per millimeter. This is the renderer's native unit.
    PxPerMm(f32),
    /// Device pixels per inch.
    Dpi(f32),
}
impl Resolution {
    #[must_use]
    pub fn px_per_mm(self) -> f32 {
        match self {
            Self::PxPerMm(s) => s,
            Self::Dpi(dpi) => dpi * IN_PER_MM,
        }
    }
    #[must_use]
    pub fn dpi(self) -> f32 {
        match self {
            Self::PxPerMm(s) => s * MM_PER_IN,
            Self::Dpi(dpi) => dpi,
        }
    }
}
impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PxPerMm(s) => write!(f, "{s}px/mm"),
            Self::Dpi(d) => write!(f, "{d}dpi"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn parse() {
        assert_eq!("12.5mm".parse::<Length>(), Ok(Length::Millimeter(12.5)));
        assert_eq!(" 3 pt".parse::<Length>(), Ok(Length::Point(3.0)));
        assert_eq!("1x".parse::<Length>(), Err(UnitParseError::UnrecognizedUnit));
        // Multibyte input near the suffix must not panic.
        assert!("5é".parse::<Length>().is_err());
    }
    #[test]
    fn conversions() {
        let res = Resolution::PxPerMm(4.0);
        assert!((Length::Inch(1.0).into_mm(res) - 25.4).abs() < 1e-5);
        assert!((Length::Point(72.0).into_mm(res) - 25.4).abs() < 1e-4);
        assert_eq!(Length::Millimeter(2.5).into_device(res), 10.0);
        assert_eq!(Length::Device(10.0).into_mm(res), 2.5);
        assert!((Resolution::Dpi(254.0).px_per_mm() - 10.0).abs() < 1e-5);
    }
}
