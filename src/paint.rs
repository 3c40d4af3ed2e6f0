//! Engine paint delivery: the view the engine paints into.

use std::sync::Arc;

use tracing::debug;

use crate::foundation::core::{Extent, PixelRect};
use crate::foundation::error::{GlazeError, GlazeResult};
use crate::pixel;
use crate::surface::SurfaceBuffer;

/// Receives paint callbacks from the embedded engine, on whatever thread
/// the engine delivers them, and routes the converted pixels into the
/// shared [`SurfaceBuffer`].
pub struct BrowserView {
    buffer: Arc<SurfaceBuffer>,
}

impl BrowserView {
    pub fn new(buffer: Arc<SurfaceBuffer>) -> Self {
        Self { buffer }
    }

    pub fn extent(&self) -> Extent {
        self.buffer.extent()
    }

    /// Geometry query answered back to the engine.
    pub fn view_rect(&self) -> PixelRect {
        PixelRect::of(self.buffer.extent())
    }

    /// Accept one paint update from the engine.
    ///
    /// Contract: `buffer` always covers the full `width x height` frame in
    /// engine (BGRA) channel order; `dirty` only annotates which areas
    /// changed. The whole frame is re-copied on every update regardless of
    /// the dirty list; callers wanting partial merges go through
    /// [`SurfaceBuffer::write_region`] directly.
    pub fn on_paint(
        &self,
        dirty: &[PixelRect],
        buffer: &[u8],
        width: u32,
        height: u32,
    ) -> GlazeResult<()> {
        let extent = self.buffer.extent();
        if width != extent.width || height != extent.height {
            return Err(GlazeError::paint(format!(
                "paint geometry {width}x{height} does not match view {}x{}",
                extent.width, extent.height
            )));
        }
        if buffer.len() != extent.byte_len() {
            return Err(GlazeError::paint(format!(
                "paint buffer holds {} bytes, expected {}",
                buffer.len(),
                extent.byte_len()
            )));
        }
        if dirty.len() != 1 {
            debug!(
                rects = dirty.len(),
                "coalescing paint update into a full-frame copy"
            );
        }

        let converted = pixel::bgra_to_rgba(buffer, extent.pixel_count());
        self.buffer.write_full(&converted)
    }
}
