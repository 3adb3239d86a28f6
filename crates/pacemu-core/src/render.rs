use crate::clock::Clock;
use crate::dispatch::{UiEvent, UiScheduler};
use crate::fps::FpsCounter;
use crate::frame_store::FrameStore;
use crate::machine::CoreLink;
use crate::run::RunFlag;
use log::{debug, trace};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Render cadence: 60 Hz.
pub const RENDER_INTERVAL_MICROS: u64 = 16_667;

/// Where finished frames end up, on the UI thread.
pub trait DisplaySink {
    /// Show `frame`. The sink owns the copy and may keep it. Implementations
    /// bump their [`BlitCounter`] once the frame is on screen.
    fn present(&mut self, frame: Vec<u32>);
}

/// Completed blits, bumped by the display and drained by the render loop.
#[derive(Debug, Default)]
pub struct BlitCounter(AtomicU32);

impl BlitCounter {
    #[inline]
    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Read and reset.
    pub fn take(&self) -> u32 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// Samples the frame store at a fixed cadence and posts copies to the UI.
///
/// Independent of the emulation rate: a slow producer gets its last frame
/// shown again, a fast one has frames skipped. Nothing is queued.
pub struct RenderLoop<U> {
    frames: Arc<FrameStore>,
    link: Arc<CoreLink>,
    blits: Arc<BlitCounter>,
    run: RunFlag,
    clock: Arc<dyn Clock>,
    ui: U,
    last_tick: u64,
    fps: FpsCounter,
    presented: u64,
}

impl<U: UiScheduler> RenderLoop<U> {
    pub fn new(
        frames: Arc<FrameStore>,
        link: Arc<CoreLink>,
        blits: Arc<BlitCounter>,
        run: RunFlag,
        clock: Arc<dyn Clock>,
        ui: U,
    ) -> Self {
        let now = clock.now_micros();
        Self {
            frames,
            link,
            blits,
            run,
            clock,
            ui,
            last_tick: now,
            fps: FpsCounter::new(now),
            presented: 0,
        }
    }

    /// One iteration. Returns false once the run flag has been cleared.
    pub fn tick(&mut self) -> bool {
        if !self.run.is_set() {
            return false;
        }

        let now = self.clock.now_micros();
        if now.saturating_sub(self.last_tick) >= RENDER_INTERVAL_MICROS {
            self.last_tick = now;
            let pixels = self.frames.snapshot();
            self.ui.post(UiEvent::Frame {
                pixels,
                savestate: self.link.selected_savestate(),
            });
            self.presented += 1;
        }

        if self.fps.window_elapsed(now) {
            let blits = self.blits.take();
            trace!("render fps {blits}");
            self.ui.post(UiEvent::RenderFps(blits));
        }

        true
    }

    /// Frames posted to the UI so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn run(mut self) {
        debug!("render loop started");
        while self.tick() {
            std::hint::spin_loop();
        }
        debug!("render loop stopped after {} frames", self.presented);
    }
}
