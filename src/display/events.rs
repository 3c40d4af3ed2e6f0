//! Display event plumbing: the combined event queue the compositor drains
//! and the repeating frame timer that feeds it.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// Events observed by the compositor loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    /// The frame timer fired; a redraw is due.
    Tick,
    /// The surface was asked to close.
    CloseRequested,
    /// The surface gained or lost focus.
    Focus(bool),
    /// A region of the surface was exposed.
    Expose,
}

/// Combined event source supporting bounded-timeout waits.
///
/// Sources register by cloning the queue's sender; the timer, the close
/// handle, and anything else all feed the same receiver.
pub struct EventQueue {
    tx: Sender<DisplayEvent>,
    rx: Receiver<DisplayEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Handle for registering a new event source onto this queue.
    pub fn sender(&self) -> Sender<DisplayEvent> {
        self.tx.clone()
    }

    /// Wait up to `timeout` for the next event.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<DisplayEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// True when no further events are queued right now.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Repeating tick source armed at a fixed frame interval.
///
/// Runs on its own thread; [`stop`](Self::stop) (or drop) wakes and joins
/// it promptly even mid-interval.
pub struct FrameTimer {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FrameTimer {
    pub fn start(interval: Duration, events: Sender<DisplayEvent>) -> Self {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let thread = std::thread::spawn(move || {
            let mut next = Instant::now() + interval;
            loop {
                let wait = next.saturating_duration_since(Instant::now());
                match stop_rx.recv_timeout(wait) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
                next += interval;
                // don't bank ticks across a long consumer stall
                let now = Instant::now();
                if next + interval < now {
                    next = now + interval;
                }
                if events.send(DisplayEvent::Tick).is_err() {
                    break;
                }
            }
        });
        Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }
    }

    /// Stop ticking and join the timer thread. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for FrameTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
