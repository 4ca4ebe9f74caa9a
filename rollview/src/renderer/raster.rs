/// A rendered viewport. Premultiplied RGBA8, rows top to bottom, no padding.
///
/// Sized in device pixels. Hosts composite it at [`RasterImage::logical_size`].
#[derive(Clone, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    device_pixel_ratio: f32,
    data: Vec<u8>,
}
impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("device_pixel_ratio", &self.device_pixel_ratio)
            .finish_non_exhaustive()
    }
}
impl RasterImage {
    /// Zero by zero. What an empty viewport renders to.
    #[must_use]
    pub fn empty(device_pixel_ratio: f32) -> Self {
        Self {
            width: 0,
            height: 0,
            device_pixel_ratio,
            data: Vec::new(),
        }
    }
    /// A transparent image. `None` if the byte size overflows.
    #[must_use]
    pub fn transparent(width: u32, height: u32, device_pixel_ratio: f32) -> Option<Self> {
        let len = usize::try_from(width)
            .ok()?
            .checked_mul(usize::try_from(height).ok()?)?
            .checked_mul(4)?;
        Some(Self {
            width,
            height,
            device_pixel_ratio,
            data: vec![0; len],
        })
    }
    pub(super) fn from_pixmap(pixmap: tiny_skia::Pixmap, device_pixel_ratio: f32) -> Self {
        Self {
            width: pixmap.width(),
            height: pixmap.height(),
            device_pixel_ratio,
            data: pixmap.take(),
        }
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[must_use]
    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }
    /// Size in the host's logical pixels.
    #[must_use]
    pub fn logical_size(&self) -> [f32; 2] {
        #[allow(clippy::cast_precision_loss)]
        [
            self.width as f32 / self.device_pixel_ratio,
            self.height as f32 / self.device_pixel_ratio,
        ]
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = usize::try_from(y).ok()? * usize::try_from(self.width).ok()?;
        Some((row + usize::try_from(x).ok()?) * 4)
    }
    /// Premultiplied RGBA of one pixel, `None` outside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let at = self.offset(x, y)?;
        let mut px = [0; 4];
        px.copy_from_slice(&self.data[at..at + 4]);
        Some(px)
    }
    /// Copy `src` over this image with its top-left at `at`. Parts falling outside are dropped.
    /// This is a plain copy, not a blend.
    pub fn blit(&mut self, src: &Self, at: [u32; 2]) {
        let [x, y] = at;
        if x >= self.width || y >= self.height {
            return;
        }
        let cols = src.width.min(self.width - x);
        let rows = src.height.min(self.height - y);
        let Ok(row_bytes) = usize::try_from(cols).map(|c| c * 4) else {
            return;
        };
        for row in 0..rows {
            let (Some(from), Some(to)) = (src.offset(0, row), self.offset(x, y + row)) else {
                continue;
            };
            self.data[to..to + row_bytes].copy_from_slice(&src.data[from..from + row_bytes]);
        }
    }
}
