use crate::clock::MICROS_PER_SECOND;

/// Frame tally over one-second windows.
///
/// Owned by a single loop; nothing else reads or resets it.
#[derive(Debug, Clone, Copy)]
pub struct FpsCounter {
    frames: u32,
    window_start: u64,
}

impl FpsCounter {
    pub fn new(now_micros: u64) -> Self {
        Self {
            frames: 0,
            window_start: now_micros,
        }
    }

    #[inline]
    pub fn record(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// True once a full second has passed since the window opened; the next
    /// window starts at `now_micros`.
    pub fn window_elapsed(&mut self, now_micros: u64) -> bool {
        if now_micros.saturating_sub(self.window_start) < MICROS_PER_SECOND {
            return false;
        }
        self.window_start = now_micros;
        true
    }

    /// The tally of the window that just closed, resetting it, or `None`
    /// while the window is still open.
    pub fn sample(&mut self, now_micros: u64) -> Option<u32> {
        if !self.window_elapsed(now_micros) {
            return None;
        }
        Some(std::mem::take(&mut self.frames))
    }
}
