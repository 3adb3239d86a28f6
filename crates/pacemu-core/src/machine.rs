use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

/// Joypad register value with every button released.
pub const PAD_RELEASED: u8 = 0xFF;

/// The inputs an emulation core accepts from the UI thread.
///
/// Implementors use interior mutability: the UI thread writes through a
/// shared reference while the emulation thread keeps running the core.
pub trait ControlPort {
    /// New active-low joypad state.
    fn update_pad(&self, state: u8);

    /// Move the selected savestate slot by `delta`. The core decides which
    /// slots exist.
    fn shift_savestate(&self, delta: i32);

    /// Ask the core to load the selected slot before its next frame.
    fn request_load_state(&self);

    /// Ask the core to save into the selected slot before its next frame.
    fn request_save_state(&self);
}

/// Control block shared between a core and the threads around it.
///
/// Every field is a single atomic; nothing here needs a lock.
#[derive(Debug)]
pub struct CoreLink {
    pad: AtomicU8,
    savestate: AtomicI32,
    savestate_slots: i32,
    load_state: AtomicBool,
    save_state: AtomicBool,
}

impl CoreLink {
    /// A link whose savestate selector ranges over `0..savestate_slots`.
    pub fn new(savestate_slots: u8) -> Self {
        Self {
            pad: AtomicU8::new(PAD_RELEASED),
            savestate: AtomicI32::new(0),
            savestate_slots: i32::from(savestate_slots.max(1)),
            load_state: AtomicBool::new(false),
            save_state: AtomicBool::new(false),
        }
    }

    pub fn pad(&self) -> u8 {
        self.pad.load(Ordering::Acquire)
    }

    /// Selected slot. Read by the render loop for the status label; a stale
    /// value there is harmless.
    pub fn selected_savestate(&self) -> i32 {
        self.savestate.load(Ordering::Relaxed)
    }

    /// Consume a pending load request. Returns true at most once per request.
    pub fn take_load_request(&self) -> bool {
        self.load_state.swap(false, Ordering::AcqRel)
    }

    /// Consume a pending save request. Returns true at most once per request.
    pub fn take_save_request(&self) -> bool {
        self.save_state.swap(false, Ordering::AcqRel)
    }

    pub fn load_requested(&self) -> bool {
        self.load_state.load(Ordering::Acquire)
    }

    pub fn save_requested(&self) -> bool {
        self.save_state.load(Ordering::Acquire)
    }
}

impl Default for CoreLink {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ControlPort for CoreLink {
    fn update_pad(&self, state: u8) {
        self.pad.store(state, Ordering::Release);
    }

    fn shift_savestate(&self, delta: i32) {
        let max = self.savestate_slots - 1;
        let _ = self
            .savestate
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |slot| {
                Some(slot.saturating_add(delta).clamp(0, max))
            });
    }

    fn request_load_state(&self) {
        self.load_state.store(true, Ordering::Release);
    }

    fn request_save_state(&self) {
        self.save_state.store(true, Ordering::Release);
    }
}

/// A frame-stepped emulator as seen by the emulation loop.
///
/// The core is moved onto the emulation thread for the duration of a session
/// and handed back when the session stops.
pub trait EmulationCore: Send + 'static {
    /// Framebuffer dimensions in pixels.
    fn frame_size(&self) -> (usize, usize);

    /// Advance by exactly one video frame.
    fn run_frame(&mut self);

    /// Pixels (0x00RRGGBB) of the frame produced by the last `run_frame`.
    fn framebuffer(&self) -> &[u32];

    /// Interleaved stereo samples produced by the last `run_frame`.
    fn audio_samples(&self) -> &[i16];

    /// Control block for joypad input and savestate requests.
    fn link(&self) -> Arc<CoreLink>;

    /// Name of the loaded program, for the window title.
    fn title(&self) -> &str {
        ""
    }

    /// Flush battery-backed RAM. Called when the core is replaced or the
    /// frontend shuts down.
    fn write_save(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savestate_selector_clamps_to_core_slots() {
        let link = CoreLink::new(3);
        link.shift_savestate(-1);
        assert_eq!(link.selected_savestate(), 0);
        link.shift_savestate(1);
        link.shift_savestate(1);
        link.shift_savestate(1);
        assert_eq!(link.selected_savestate(), 2);
    }

    #[test]
    fn requests_are_consumed_once() {
        let link = CoreLink::default();
        link.request_save_state();
        link.request_save_state();
        assert!(link.take_save_request());
        assert!(!link.take_save_request());
        assert!(!link.take_load_request());
    }
}
