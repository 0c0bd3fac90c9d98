//! Events delivered to the session's event pump.
//!
//! The pump runs on the session thread. Everything that needs that thread
//! (rendering, teardown, input relay) reaches it through one of these.

use crossbeam_channel::{Receiver, Sender};

use crate::video::backend::OverlayKind;

/// Sender half handed to windows and the frame pipeline.
pub type EventSender = Sender<SessionEvent>;
pub type EventReceiver = Receiver<SessionEvent>;

/// Create the session event queue.
pub fn channel() -> (EventSender, EventReceiver) {
    crossbeam_channel::unbounded()
}

// ── SessionEvent ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A decoded frame is waiting in the frame slot.
    FrameReady,
    /// The user closed the window or asked to quit.
    Quit,
    /// The engine lost the connection with this error code.
    ConnectionTerminated(i64),
    /// Local input to relay to the host.
    Input(InputEvent),
    /// An on-screen overlay changed.
    Overlay(OverlayKind),
}

// ── InputEvent ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    X1,
    X2,
}

/// Input relayed from the window to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key {
        /// Windows virtual-key code, which is what hosts expect.
        virtual_key: u16,
        action: KeyAction,
        modifiers: u8,
    },
    MouseMove {
        dx: i16,
        dy: i16,
    },
    MouseButton {
        button: MouseButton,
        action: KeyAction,
    },
    Scroll {
        amount: i16,
    },
    Controller {
        index: u8,
        buttons: u32,
        left_trigger: u8,
        right_trigger: u8,
        left_stick: (i16, i16),
        right_stick: (i16, i16),
    },
    /// A controller was plugged in or removed; `mask` is the new set.
    ControllerArrival {
        mask: u16,
    },
}
