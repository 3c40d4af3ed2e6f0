//! Input capture and routing.
//!
//! [`InputBridge`] owns a dedicated polling thread that drains the pointer
//! and keyboard device channels, normalizes raw events, forwards them to
//! the embedded engine's input endpoint, and republishes button and key
//! transitions to per-waiter subscription queues for blocking waits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{Builder, JoinHandle};

use crossbeam_channel::{Receiver, Sender, select};
use tracing::{debug, info};

use crate::engine::WebEngine;
use crate::foundation::error::{GlazeError, GlazeResult};

/// Escape key code in the normalized keyboard space.
pub const KEY_ESCAPE: u32 = 27;

/// Pointer buttons, usable as a wait mask via [`PointerButton::mask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

impl PointerButton {
    pub const fn mask(self) -> u8 {
        match self {
            Self::Left => 1,
            Self::Right => 2,
            Self::Middle => 4,
        }
    }
}

/// Raw pointer device events, as delivered by the device channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawPointerEvent {
    Moved { x: i32, y: i32 },
    Button {
        button: PointerButton,
        pressed: bool,
        x: i32,
        y: i32,
    },
    /// Pointer crossed into the surface.
    Entered,
    /// Pointer left the surface.
    Left,
}

/// Raw keyboard device events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawKeyEvent {
    Down { code: u32 },
    Up { code: u32 },
    /// Character/repeat event; carries no transition.
    Char { code: u32 },
}

/// Normalized input events, the vocabulary shared by the
/// engine-forwarding path and blocking waiters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    PointerMove { x: i32, y: i32 },
    PointerButton {
        button: PointerButton,
        pressed: bool,
        x: i32,
        y: i32,
    },
    Key { code: u32, pressed: bool },
    /// Synthetic shutdown wake for the poll loop and blocked waiters.
    Wake,
    /// Device event with no normalized meaning.
    Ignored,
}

/// Bridge configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputBridgeOpts {
    /// Forward key transitions to the engine endpoint in addition to
    /// republishing them locally. Off by default: the shell owns keyboard
    /// handling until a page opts in.
    pub forward_keys: bool,
}

/// Device-side senders feeding the bridge; the platform layer (or a test)
/// pushes raw events through these.
#[derive(Clone)]
pub struct DeviceHandles {
    pub pointer: Sender<RawPointerEvent>,
    pub keyboard: Sender<RawKeyEvent>,
}

/// One input bridge per shell, owned explicitly and shared via `Arc`.
pub struct InputBridge {
    running: Arc<AtomicBool>,
    pointer_pos: Arc<Mutex<(i32, i32)>>,
    subscribers: Arc<Mutex<Vec<Sender<InputEvent>>>>,
    wake_tx: Sender<()>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl InputBridge {
    /// Spawn the polling thread against fresh device channels, returning
    /// the bridge and the device-side senders.
    pub fn new(
        engine: Arc<dyn WebEngine>,
        opts: InputBridgeOpts,
    ) -> GlazeResult<(Arc<Self>, DeviceHandles)> {
        let (pointer_tx, pointer_rx) = crossbeam_channel::unbounded();
        let (keyboard_tx, keyboard_rx) = crossbeam_channel::unbounded();
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);

        let running = Arc::new(AtomicBool::new(true));
        let pointer_pos = Arc::new(Mutex::new((0, 0)));
        let subscribers = Arc::new(Mutex::new(Vec::new()));

        let poll = PollLoop {
            running: Arc::clone(&running),
            pointer_pos: Arc::clone(&pointer_pos),
            subscribers: Arc::clone(&subscribers),
            engine,
            opts,
            pointer_rx,
            keyboard_rx,
            wake_rx,
        };
        let thread = Builder::new()
            .name("glaze-input".into())
            .spawn(move || poll.run())
            .map_err(|e| GlazeError::input(format!("failed to spawn input thread: {e}")))?;

        let bridge = Arc::new(Self {
            running,
            pointer_pos,
            subscribers,
            wake_tx,
            thread: Mutex::new(Some(thread)),
        });
        let devices = DeviceHandles {
            pointer: pointer_tx,
            keyboard: keyboard_tx,
        };
        Ok((bridge, devices))
    }

    /// Most recent known pointer position; never blocks on input arrival.
    pub fn pointer_position(&self) -> (i32, i32) {
        *lock_unpoisoned(&self.pointer_pos)
    }

    /// Block until a key-down for `code` arrives (true) or the bridge
    /// shuts down (false).
    pub fn wait_for_key(&self, code: u32) -> bool {
        let rx = self.subscribe();
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        for event in rx.iter() {
            match event {
                InputEvent::Key {
                    code: seen,
                    pressed: true,
                } if seen == code => return true,
                InputEvent::Wake => return false,
                _ => {}
            }
        }
        false
    }

    /// Block until a button-down whose mask intersects `mask` arrives,
    /// returning the trigger position; `None` once shut down.
    pub fn wait_for_pointer_button(&self, mask: u8) -> Option<(i32, i32)> {
        let rx = self.subscribe();
        if !self.running.load(Ordering::Acquire) {
            return None;
        }
        for event in rx.iter() {
            match event {
                InputEvent::PointerButton {
                    button,
                    pressed: true,
                    x,
                    y,
                } if button.mask() & mask != 0 => return Some((x, y)),
                InputEvent::Wake => return None,
                _ => {}
            }
        }
        None
    }

    /// Idempotent shutdown: the first call flips the running flag, wakes
    /// the poll loop and every blocked waiter, and joins the polling
    /// thread; later calls are no-ops.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("input bridge shutting down");
            let _ = self.wake_tx.try_send(());
        }
        if let Some(thread) = lock_unpoisoned(&self.thread).take() {
            let _ = thread.join();
        }
    }

    fn subscribe(&self) -> Receiver<InputEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        lock_unpoisoned(&self.subscribers).push(tx);
        rx
    }
}

struct PollLoop {
    running: Arc<AtomicBool>,
    pointer_pos: Arc<Mutex<(i32, i32)>>,
    subscribers: Arc<Mutex<Vec<Sender<InputEvent>>>>,
    engine: Arc<dyn WebEngine>,
    opts: InputBridgeOpts,
    pointer_rx: Receiver<RawPointerEvent>,
    keyboard_rx: Receiver<RawKeyEvent>,
    wake_rx: Receiver<()>,
}

impl PollLoop {
    fn run(self) {
        loop {
            let event = select! {
                recv(self.pointer_rx) -> raw => match raw {
                    Ok(raw) => normalize_pointer(raw),
                    Err(_) => InputEvent::Wake,
                },
                recv(self.keyboard_rx) -> raw => match raw {
                    Ok(raw) => normalize_key(raw),
                    Err(_) => InputEvent::Wake,
                },
                recv(self.wake_rx) -> _msg => InputEvent::Wake,
            };

            if event == InputEvent::Wake || !self.running.load(Ordering::Acquire) {
                self.running.store(false, Ordering::Release);
                self.republish(InputEvent::Wake);
                break;
            }
            self.dispatch(event);
        }
        info!("input bridge exited");
    }

    fn dispatch(&self, event: InputEvent) {
        match event {
            InputEvent::PointerMove { x, y } => {
                *lock_unpoisoned(&self.pointer_pos) = (x, y);
                self.engine.send_pointer_move(x, y);
                // moves are not republished; waiters care about transitions
            }
            InputEvent::PointerButton {
                button,
                pressed,
                x,
                y,
            } => {
                debug!(?button, pressed, x, y, "pointer button");
                self.engine.send_pointer_button(button, x, y, pressed);
                self.republish(event);
            }
            InputEvent::Key { code, pressed } => {
                debug!(code, pressed, "key event");
                if self.opts.forward_keys {
                    self.engine.send_key(code, pressed);
                }
                self.republish(event);
            }
            InputEvent::Wake | InputEvent::Ignored => {}
        }
    }

    fn republish(&self, event: InputEvent) {
        lock_unpoisoned(&self.subscribers).retain(|tx| tx.send(event).is_ok());
    }
}

fn normalize_pointer(raw: RawPointerEvent) -> InputEvent {
    match raw {
        RawPointerEvent::Moved { x, y } => InputEvent::PointerMove { x, y },
        RawPointerEvent::Button {
            button,
            pressed,
            x,
            y,
        } => InputEvent::PointerButton {
            button,
            pressed,
            x,
            y,
        },
        // enter/leave carry no position the engine wants
        RawPointerEvent::Entered | RawPointerEvent::Left => InputEvent::Ignored,
    }
}

fn normalize_key(raw: RawKeyEvent) -> InputEvent {
    match raw {
        RawKeyEvent::Down { code } => InputEvent::Key {
            code,
            pressed: true,
        },
        RawKeyEvent::Up { code } => InputEvent::Key {
            code,
            pressed: false,
        },
        RawKeyEvent::Char { .. } => InputEvent::Ignored,
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_normalization() {
        assert_eq!(
            normalize_pointer(RawPointerEvent::Moved { x: 3, y: 4 }),
            InputEvent::PointerMove { x: 3, y: 4 }
        );
        assert_eq!(normalize_pointer(RawPointerEvent::Entered), InputEvent::Ignored);
        assert_eq!(normalize_pointer(RawPointerEvent::Left), InputEvent::Ignored);
    }

    #[test]
    fn key_normalization() {
        assert_eq!(
            normalize_key(RawKeyEvent::Down { code: 9 }),
            InputEvent::Key {
                code: 9,
                pressed: true
            }
        );
        assert_eq!(
            normalize_key(RawKeyEvent::Up { code: 9 }),
            InputEvent::Key {
                code: 9,
                pressed: false
            }
        );
        assert_eq!(
            normalize_key(RawKeyEvent::Char { code: 9 }),
            InputEvent::Ignored
        );
    }

    #[test]
    fn button_masks_are_distinct_bits() {
        let all = PointerButton::Left.mask()
            | PointerButton::Right.mask()
            | PointerButton::Middle.mask();
        assert_eq!(all, 0b111);
    }
}
