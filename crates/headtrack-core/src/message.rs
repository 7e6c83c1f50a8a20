//! Fixed-shape lifecycle message: tag, wait mode and eight 64-bit parameter slots.
//!
//! Slots carry no runtime type information. Whoever writes a slot and whoever
//! reads it must agree on its interpretation for a given tag:
//!
//! | Tag                | Slots                                             |
//! |--------------------|---------------------------------------------------|
//! | `SurfaceCreated`   | 0: window handle (pointer), 1: width, 2: height   |
//! | `KeyEvent`         | 0: key code (int), 1: action (int)                |
//! | `TouchEvent`       | 0: action (int), 1: x (float), 2: y (float)       |

use headtrack_hal::NativeWindow;

/// Number of parameter slots per message.
pub const MAX_MESSAGE_PARMS: usize = 8;

/// What a message asks the worker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTag {
    Start,
    Resume,
    Pause,
    Stop,
    SurfaceCreated,
    SurfaceDestroyed,
    KeyEvent,
    TouchEvent,
}

/// How long [`MessageQueue::post`](crate::queue::MessageQueue::post) blocks the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitMode {
    /// Return as soon as the message is queued.
    #[default]
    None,
    /// Return once the consumer has dequeued the message.
    WaitReceived,
    /// Return once the consumer has finished processing the message.
    WaitProcessed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub tag: MessageTag,
    pub wait: WaitMode,
    params: [u64; MAX_MESSAGE_PARMS],
}

impl Message {
    /// Create a message with all slots zeroed.
    pub fn new(tag: MessageTag, wait: WaitMode) -> Self {
        Self {
            tag,
            wait,
            params: [0; MAX_MESSAGE_PARMS],
        }
    }

    /// `SurfaceCreated` carrying `window` in slots 0..=2.
    pub fn surface_created(window: &NativeWindow, wait: WaitMode) -> Self {
        let mut message = Self::new(MessageTag::SurfaceCreated, wait);
        message.set_pointer_parm(0, window.handle);
        message.set_int_parm(1, window.width);
        message.set_int_parm(2, window.height);
        message
    }

    /// Reads back the window written by [`surface_created`](Self::surface_created).
    pub fn window(&self) -> NativeWindow {
        NativeWindow::new(self.pointer_parm(0), self.int_parm(1), self.int_parm(2))
    }

    pub fn key_event(key_code: i32, action: i32) -> Self {
        let mut message = Self::new(MessageTag::KeyEvent, WaitMode::None);
        message.set_int_parm(0, key_code);
        message.set_int_parm(1, action);
        message
    }

    pub fn touch_event(action: i32, x: f32, y: f32) -> Self {
        let mut message = Self::new(MessageTag::TouchEvent, WaitMode::None);
        message.set_int_parm(0, action);
        message.set_float_parm(1, x);
        message.set_float_parm(2, y);
        message
    }

    /// Store a pointer-sized value in slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_MESSAGE_PARMS`.
    pub fn set_pointer_parm(&mut self, index: usize, value: usize) {
        self.params[index] = value as u64;
    }

    /// Read slot `index` as a pointer-sized value.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_MESSAGE_PARMS`.
    pub fn pointer_parm(&self, index: usize) -> usize {
        self.params[index] as usize
    }

    /// Store a sign-extended 32-bit integer in slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_MESSAGE_PARMS`.
    pub fn set_int_parm(&mut self, index: usize, value: i32) {
        self.params[index] = value as i64 as u64;
    }

    /// Read the low 32 bits of slot `index` as an integer.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_MESSAGE_PARMS`.
    pub fn int_parm(&self, index: usize) -> i32 {
        self.params[index] as i32
    }

    /// Store the bit pattern of `value` in slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_MESSAGE_PARMS`.
    pub fn set_float_parm(&mut self, index: usize, value: f32) {
        self.params[index] = u64::from(value.to_bits());
    }

    /// Read the low 32 bits of slot `index` as a float.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_MESSAGE_PARMS`.
    pub fn float_parm(&self, index: usize) -> f32 {
        f32::from_bits(self.params[index] as u32)
    }

    /// Raw slot contents.
    pub fn params(&self) -> &[u64; MAX_MESSAGE_PARMS] {
        &self.params
    }
}
