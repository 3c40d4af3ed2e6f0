//! Application wiring: one owning context for the engine session, the
//! input bridge, and the compositor, torn down explicitly before exit.
//!
//! Nothing here is process-global; every consumer gets a handle passed in.

use std::sync::Arc;
use std::thread::Builder;

use tracing::info;

use crate::compositor::{CloseHandle, Compositor, CompositorOpts};
use crate::display::FrameViewer;
use crate::engine::WebEngine;
use crate::foundation::core::{Extent, Rgba8};
use crate::foundation::error::{GlazeError, GlazeResult};
use crate::input::{DeviceHandles, InputBridge, InputBridgeOpts, KEY_ESCAPE};
use crate::paint::BrowserView;
use crate::scene::Ball;
use crate::surface::SurfaceBuffer;

/// Shell configuration; serializable so a JSON config file can carry it.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ShellOpts {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub background: Rgba8,
    pub transparent: bool,
    /// Number of stock bouncing-ball layers below the browser buffer.
    pub balls: u32,
    /// Forward key transitions to the engine.
    pub forward_keys: bool,
}

impl Default for ShellOpts {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 60,
            background: Rgba8::opaque(255, 0, 0),
            transparent: false,
            balls: 3,
            forward_keys: false,
        }
    }
}

/// The assembled application: compositor, input bridge, and engine
/// session under one owner.
pub struct Shell {
    compositor: Compositor,
    input: Arc<InputBridge>,
    engine: Arc<dyn WebEngine>,
    devices: DeviceHandles,
}

impl Shell {
    /// Wire the full stack. `make_engine` receives the paint sink the
    /// engine must deliver frames into and returns the engine session.
    pub fn new<F>(opts: &ShellOpts, make_engine: F) -> GlazeResult<Self>
    where
        F: FnOnce(Arc<BrowserView>) -> GlazeResult<Arc<dyn WebEngine>>,
    {
        let extent = Extent::new(opts.width, opts.height)?;
        let buffer = Arc::new(SurfaceBuffer::new(extent)?);
        let view = Arc::new(BrowserView::new(Arc::clone(&buffer)));
        let engine = make_engine(view)?;

        let (input, devices) = InputBridge::new(
            Arc::clone(&engine),
            InputBridgeOpts {
                forward_keys: opts.forward_keys,
            },
        )?;

        let compositor_opts = CompositorOpts {
            fps: opts.fps,
            background: opts.background,
            transparent: opts.transparent,
            ..CompositorOpts::default()
        };
        let mut compositor = Compositor::new(extent, compositor_opts, buffer, Arc::clone(&engine))?;
        for i in 0..opts.balls {
            let ball = Ball::seeded(
                f64::from(opts.width) / 2.0,
                f64::from(opts.height) / 2.0,
                u64::from(i) + 1,
            );
            compositor.add_layer(Box::new(ball));
        }

        Ok(Self {
            compositor,
            input,
            engine,
            devices,
        })
    }

    /// Device-side senders for the platform input layer (or tests).
    pub fn devices(&self) -> DeviceHandles {
        self.devices.clone()
    }

    /// Read handle onto presented frames.
    pub fn viewer(&self) -> FrameViewer {
        self.compositor.viewer()
    }

    pub fn input(&self) -> Arc<InputBridge> {
        Arc::clone(&self.input)
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.compositor.close_handle()
    }

    /// Load the initial content, arm the escape-key watcher, and run the
    /// compositor until close. Tears the whole stack down before
    /// returning.
    pub fn run(self, start_location: &str) -> GlazeResult<()> {
        let Self {
            compositor,
            input,
            engine,
            devices,
        } = self;

        engine.load(start_location)?;

        let watcher_input = Arc::clone(&input);
        let close = compositor.close_handle();
        let watcher = Builder::new()
            .name("glaze-escape".into())
            .spawn(move || {
                if watcher_input.wait_for_key(KEY_ESCAPE) {
                    info!("escape pressed, closing");
                    close.close();
                }
            })
            .map_err(|e| GlazeError::input(format!("failed to spawn escape watcher: {e}")))?;

        let result = compositor.run();

        input.shutdown();
        let _ = watcher.join();
        engine.close();
        drop(devices);
        result
    }
}
