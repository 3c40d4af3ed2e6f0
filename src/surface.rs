//! The authoritative off-screen browser frame.
//!
//! [`SurfaceBuffer`] is the single resource shared between the engine's
//! asynchronous paint thread and the compositor loop. Writers take the lock
//! per region; the compositor reads through a non-blocking attempt and
//! keeps the previous frame on contention rather than stalling its pacing.

use std::sync::{Mutex, MutexGuard, TryLockError};

use crate::display::Surface;
use crate::foundation::core::{Extent, PixelRect};
use crate::foundation::error::{GlazeError, GlazeResult};

/// How the browser layer lands on the presentation surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeMode {
    /// Replace destination pixels outright.
    Overwrite,
    /// Premultiplied source-over blend.
    AlphaOver,
}

/// Latest composited browser frame, RGBA8 row-major, dimensions fixed at
/// construction.
///
/// Every write is bounds-checked and atomic with respect to readers: a
/// reader never observes a torn state spanning more than one
/// [`write_region`](Self::write_region) call.
pub struct SurfaceBuffer {
    extent: Extent,
    pixels: Mutex<Vec<u8>>,
}

impl SurfaceBuffer {
    pub fn new(extent: Extent) -> GlazeResult<Self> {
        Extent::new(extent.width, extent.height)?;
        Ok(Self {
            extent,
            pixels: Mutex::new(vec![0u8; extent.byte_len()]),
        })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Copy `pixels` (already in presentation channel order, row-major for
    /// the region alone) into `region`.
    ///
    /// Holds the lock for one region copy only; a batch of regions may
    /// interleave with reads between calls, never within one.
    pub fn write_region(&self, region: PixelRect, pixels: &[u8]) -> GlazeResult<()> {
        if !region.fits_within(self.extent) {
            return Err(GlazeError::paint(format!(
                "region {}x{}+{}+{} exceeds surface extent {}x{}",
                region.width, region.height, region.x, region.y, self.extent.width, self.extent.height
            )));
        }
        if pixels.len() != region.byte_len() {
            return Err(GlazeError::paint(format!(
                "region pixel buffer holds {} bytes, expected {}",
                pixels.len(),
                region.byte_len()
            )));
        }

        let mut guard = lock_unpoisoned(&self.pixels);
        let stride = self.extent.width as usize * 4;
        let row_len = region.width as usize * 4;
        for row in 0..region.height as usize {
            let dst = (region.y as usize + row) * stride + region.x as usize * 4;
            let src = row * row_len;
            guard[dst..dst + row_len].copy_from_slice(&pixels[src..src + row_len]);
        }
        Ok(())
    }

    /// Replace the whole frame in one locked write.
    pub fn write_full(&self, pixels: &[u8]) -> GlazeResult<()> {
        self.write_region(PixelRect::of(self.extent), pixels)
    }

    /// Non-blocking composite of the full buffer onto `surface`.
    ///
    /// Returns `Ok(false)` immediately when a writer holds the lock; the
    /// caller keeps the previously composited frame. Extent mismatch with
    /// the destination surface is an error.
    pub fn try_composite_onto(
        &self,
        surface: &mut Surface,
        mode: CompositeMode,
    ) -> GlazeResult<bool> {
        let guard = match self.pixels.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Ok(false),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        match mode {
            CompositeMode::Overwrite => surface.blit_rgba(&guard)?,
            CompositeMode::AlphaOver => surface.blend_rgba(&guard)?,
        }
        Ok(true)
    }

    /// Locked full copy of the current frame.
    pub fn snapshot(&self) -> Vec<u8> {
        lock_unpoisoned(&self.pixels).clone()
    }
}

// A poisoned lock only means a writer panicked mid-copy; the buffer is
// still structurally valid and at worst stale within one region.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
