//! `glaze` embeds a browser-style rendering engine into an application
//! shell, compositing the engine's off-screen pixel output with locally
//! rendered layers into a single presented frame, while routing device
//! input back to the engine.
//!
//! The crate is organized around four cooperating pieces:
//!
//! - [`pixel`]: engine-order to presentation-order channel permutation
//! - [`surface`]: the lock-guarded persistent browser frame
//! - [`compositor`]: the fixed-rate render loop and layer list
//! - [`input`]: the device polling thread and its blocking waiters
//!
//! [`shell`] wires everything into one owning context; the engine itself
//! stays an external collaborator behind the [`engine::WebEngine`] trait
//! and the [`paint::BrowserView`] paint sink.
#![forbid(unsafe_code)]

mod foundation;

pub mod compositor;
pub mod display;
pub mod engine;
pub mod input;
pub mod paint;
pub mod pixel;
pub mod scene;
pub mod shell;
pub mod surface;

pub use crate::compositor::{CloseHandle, Compositor, CompositorOpts, CompositorState};
pub use crate::display::{FrameViewer, Surface};
pub use crate::engine::WebEngine;
pub use crate::foundation::core::{Extent, PixelRect, Point, Rgba8, Vec2};
pub use crate::foundation::error::{GlazeError, GlazeResult};
pub use crate::input::{
    DeviceHandles, InputBridge, InputBridgeOpts, InputEvent, KEY_ESCAPE, PointerButton,
    RawKeyEvent, RawPointerEvent,
};
pub use crate::paint::BrowserView;
pub use crate::scene::{Ball, Painter, Renderable};
pub use crate::shell::{Shell, ShellOpts};
pub use crate::surface::{CompositeMode, SurfaceBuffer};
