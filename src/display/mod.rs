//! Software presentation layer: a fixed-size drawable with an off-screen
//! back buffer and a double-buffered present path.

pub mod events;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::foundation::core::{Extent, Rgba8};
use crate::foundation::error::{GlazeError, GlazeResult};
use crate::scene::Painter;

struct FrontBuffer {
    pixels: Mutex<Vec<u8>>,
    presented: AtomicU64,
}

/// The drawable surface the compositor clears, draws, and flips.
///
/// All drawing targets the back buffer (a premultiplied RGBA8 pixmap);
/// [`present`](Self::present) publishes it to the shared front buffer that
/// [`FrameViewer`] handles read.
pub struct Surface {
    extent: Extent,
    back: vello_cpu::Pixmap,
    front: Arc<FrontBuffer>,
}

impl Surface {
    pub fn new(extent: Extent) -> GlazeResult<Self> {
        let width: u16 = extent
            .width
            .try_into()
            .map_err(|_| GlazeError::surface("surface width exceeds u16"))?;
        let height: u16 = extent
            .height
            .try_into()
            .map_err(|_| GlazeError::surface("surface height exceeds u16"))?;
        Ok(Self {
            extent,
            back: vello_cpu::Pixmap::new(width, height),
            front: Arc::new(FrontBuffer {
                pixels: Mutex::new(vec![0u8; extent.byte_len()]),
                presented: AtomicU64::new(0),
            }),
        })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Clear the back buffer to `color`.
    pub fn clear(&mut self, color: Rgba8) {
        let px = color.premultiplied();
        for chunk in self.back.data_as_u8_slice_mut().chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Rasterize a recorded scene onto the back buffer.
    pub fn draw_scene(&mut self, painter: Painter) {
        painter.render_onto(&mut self.back);
    }

    /// Overwrite the back buffer with `pixels` (premultiplied RGBA8, full
    /// frame).
    pub fn blit_rgba(&mut self, pixels: &[u8]) -> GlazeResult<()> {
        let dst = self.back.data_as_u8_slice_mut();
        if pixels.len() != dst.len() {
            return Err(GlazeError::surface(format!(
                "blit buffer holds {} bytes, surface needs {}",
                pixels.len(),
                dst.len()
            )));
        }
        dst.copy_from_slice(pixels);
        Ok(())
    }

    /// Source-over blend `pixels` (premultiplied RGBA8, full frame) onto
    /// the back buffer.
    pub fn blend_rgba(&mut self, pixels: &[u8]) -> GlazeResult<()> {
        let dst = self.back.data_as_u8_slice_mut();
        if pixels.len() != dst.len() {
            return Err(GlazeError::surface(format!(
                "blend buffer holds {} bytes, surface needs {}",
                pixels.len(),
                dst.len()
            )));
        }
        for (d, s) in dst.chunks_exact_mut(4).zip(pixels.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&out);
        }
        Ok(())
    }

    /// Publish the back buffer as the presented frame.
    pub fn present(&mut self) {
        let mut front = self
            .front
            .pixels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        front.copy_from_slice(self.back.data_as_u8_slice());
        drop(front);
        self.front.presented.fetch_add(1, Ordering::AcqRel);
    }

    /// Cheap cloneable read handle onto the presented frame.
    pub fn viewer(&self) -> FrameViewer {
        FrameViewer {
            extent: self.extent,
            front: Arc::clone(&self.front),
        }
    }
}

/// Read access to the latest presented frame, from any thread.
#[derive(Clone)]
pub struct FrameViewer {
    extent: Extent,
    front: Arc<FrontBuffer>,
}

impl FrameViewer {
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Number of frames presented so far.
    pub fn presented_frames(&self) -> u64 {
        self.front.presented.load(Ordering::Acquire)
    }

    /// Full copy of the presented frame (premultiplied RGBA8).
    pub fn snapshot(&self) -> Vec<u8> {
        self.front
            .pixels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// One presented pixel, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.extent.width || y >= self.extent.height {
            return None;
        }
        let off = (y as usize * self.extent.width as usize + x as usize) * 4;
        let pixels = self
            .front
            .pixels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Some([
            pixels[off],
            pixels[off + 1],
            pixels[off + 2],
            pixels[off + 3],
        ])
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    if src[3] == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(src[3]);

    let mut out = [0u8; 4];
    out[3] = src[3].saturating_add(mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        let src = [255, 255, 255, 0];
        assert_eq!(over(dst, src), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn over_dst_transparent_returns_src() {
        let dst = [0, 0, 0, 0];
        let src = [100, 110, 120, 200];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn present_publishes_back_buffer_and_counts() {
        let extent = Extent::new(2, 2).unwrap();
        let mut surface = Surface::new(extent).unwrap();
        let viewer = surface.viewer();
        assert_eq!(viewer.presented_frames(), 0);

        surface.clear(Rgba8::opaque(1, 2, 3));
        surface.present();
        assert_eq!(viewer.presented_frames(), 1);
        assert_eq!(viewer.pixel(0, 0), Some([1, 2, 3, 255]));
        assert_eq!(viewer.pixel(2, 0), None);
    }

    #[test]
    fn clear_covers_every_pixel() {
        let extent = Extent::new(3, 3).unwrap();
        let mut surface = Surface::new(extent).unwrap();
        surface.clear(Rgba8::opaque(9, 8, 7));
        surface.present();
        let snap = surface.viewer().snapshot();
        for chunk in snap.chunks_exact(4) {
            assert_eq!(chunk, [9, 8, 7, 255]);
        }
    }

    #[test]
    fn blit_rejects_mismatched_length() {
        let mut surface = Surface::new(Extent::new(2, 2).unwrap()).unwrap();
        assert!(surface.blit_rgba(&[0u8; 4]).is_err());
        assert!(surface.blend_rgba(&[0u8; 4]).is_err());
    }
}
