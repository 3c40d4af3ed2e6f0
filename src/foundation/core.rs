use crate::foundation::error::{GlazeError, GlazeResult};

pub use kurbo::{Point, Vec2};

/// Logical surface size in pixels, fixed for the lifetime of the shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// Create a validated extent; zero-sized surfaces are rejected.
    pub fn new(width: u32, height: u32) -> GlazeResult<Self> {
        if width == 0 || height == 0 {
            return Err(GlazeError::validation("Extent dimensions must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels covered.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte length of one tightly packed 4-byte-per-pixel frame.
    pub fn byte_len(self) -> usize {
        self.pixel_count() * 4
    }
}

/// Sub-rectangle of a delivered pixel update (a dirty region), in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering `extent` entirely.
    pub fn of(extent: Extent) -> Self {
        Self::new(0, 0, extent.width, extent.height)
    }

    /// Return `true` when the rectangle has no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte length of a tightly packed 4-byte-per-pixel buffer covering
    /// exactly this rectangle.
    pub fn byte_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Return `true` when the rectangle lies fully inside `extent`.
    pub fn fits_within(self, extent: Extent) -> bool {
        let right = match self.x.checked_add(self.width) {
            Some(v) => v,
            None => return false,
        };
        let bottom = match self.y.checked_add(self.height) {
            Some(v) => v,
            None => return false,
        };
        right <= extent.width && bottom <= extent.height
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Premultiplied RGBA8 bytes of this color.
    pub fn premultiplied(self) -> [u8; 4] {
        let af = u16::from(self.a) + 1;
        let premul = |c: u8| -> u8 { ((u16::from(c) * af) >> 8) as u8 };
        [premul(self.r), premul(self.g), premul(self.b), self.a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_rejects_zero_dimensions() {
        assert!(Extent::new(0, 480).is_err());
        assert!(Extent::new(640, 0).is_err());
        assert!(Extent::new(640, 480).is_ok());
    }

    #[test]
    fn extent_byte_len_is_four_per_pixel() {
        let e = Extent::new(640, 480).unwrap();
        assert_eq!(e.pixel_count(), 640 * 480);
        assert_eq!(e.byte_len(), 640 * 480 * 4);
    }

    #[test]
    fn rect_fits_within_checks_both_edges() {
        let e = Extent::new(100, 50).unwrap();
        assert!(PixelRect::new(0, 0, 100, 50).fits_within(e));
        assert!(PixelRect::new(90, 40, 10, 10).fits_within(e));
        assert!(!PixelRect::new(91, 0, 10, 10).fits_within(e));
        assert!(!PixelRect::new(0, 41, 10, 10).fits_within(e));
        assert!(!PixelRect::new(u32::MAX, 0, 2, 2).fits_within(e));
    }

    #[test]
    fn full_frame_rect_covers_extent() {
        let e = Extent::new(64, 32).unwrap();
        let r = PixelRect::of(e);
        assert_eq!(r.byte_len(), e.byte_len());
        assert!(r.fits_within(e));
        assert!(!r.is_empty());
        assert!(PixelRect::new(5, 5, 0, 3).is_empty());
    }

    #[test]
    fn premultiply_known_values() {
        assert_eq!(Rgba8::opaque(255, 0, 0).premultiplied(), [255, 0, 0, 255]);
        assert_eq!(Rgba8::TRANSPARENT.premultiplied(), [0, 0, 0, 0]);
        // half alpha scales channels by (a + 1) / 256
        let half = Rgba8::new(200, 100, 0, 128).premultiplied();
        assert_eq!(half, [100, 50, 0, 128]);
    }
}
