//! Boundary to the embedded browser engine.
//!
//! The engine itself (process model, DOM, script execution, network) is an
//! external collaborator. `glaze` drives this trait and consumes the paint
//! callbacks the engine delivers into [`BrowserView`](crate::paint::BrowserView).

use crate::foundation::error::GlazeResult;
use crate::input::PointerButton;

/// Input-acceptance and scheduling endpoint of the embedded engine.
pub trait WebEngine: Send + Sync {
    /// Load `location` (a local file path or URL) as the current content.
    fn load(&self, location: &str) -> GlazeResult<()>;

    fn send_pointer_move(&self, x: i32, y: i32);

    fn send_pointer_button(&self, button: PointerButton, x: i32, y: i32, pressed: bool);

    fn send_key(&self, code: u32, pressed: bool);

    /// Give the engine one slice of cooperative scheduling time.
    ///
    /// The compositor calls this once per loop iteration whether or not a
    /// redraw happened; implementations must not block.
    fn pump_work(&self);

    /// Tear the engine session down. Called once during shell shutdown.
    fn close(&self);
}
