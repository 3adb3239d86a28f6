use crate::audio::AudioOutput;
use crate::clock::Clock;
use crate::dispatch::{UiEvent, UiScheduler};
use crate::fps::FpsCounter;
use crate::frame_store::FrameStore;
use crate::input::FrameLimit;
use crate::machine::EmulationCore;
use crate::run::RunFlag;
use log::{debug, trace};
use std::sync::Arc;

/// Produces frames as fast as the audio device consumes them.
///
/// With the frame limit on, the loop spins while more than two frames of
/// audio are queued, so the audio device sets the pace, not the wall clock.
pub struct EmulationLoop<C, A, U> {
    core: C,
    audio: Arc<A>,
    frames: Arc<FrameStore>,
    run: RunFlag,
    frame_limit: FrameLimit,
    clock: Arc<dyn Clock>,
    ui: U,
    fps: FpsCounter,
    produced: u64,
}

impl<C, A, U> EmulationLoop<C, A, U>
where
    C: EmulationCore,
    A: AudioOutput,
    U: UiScheduler,
{
    pub fn new(
        core: C,
        audio: Arc<A>,
        frames: Arc<FrameStore>,
        run: RunFlag,
        frame_limit: FrameLimit,
        clock: Arc<dyn Clock>,
        ui: U,
    ) -> Self {
        let fps = FpsCounter::new(clock.now_micros());
        Self {
            core,
            audio,
            frames,
            run,
            frame_limit,
            clock,
            ui,
            fps,
            produced: 0,
        }
    }

    /// One iteration: wait for audio room, run a frame, hand off its output.
    /// Returns false once the run flag has been cleared.
    pub fn step(&mut self) -> bool {
        if !self.run.is_set() {
            return false;
        }

        if self.frame_limit.is_enabled() {
            self.wait_for_audio();
            if !self.run.is_set() {
                return false;
            }
        }

        self.core.run_frame();
        self.audio.push_samples(self.core.audio_samples());
        self.frames.publish(self.core.framebuffer());
        self.produced += 1;
        self.fps.record();

        if let Some(fps) = self.fps.sample(self.clock.now_micros()) {
            trace!("emulated fps {fps}");
            self.ui.post(UiEvent::EmulatedFps(fps));
        }

        true
    }

    fn wait_for_audio(&self) {
        let threshold = self.audio.frame_samples().saturating_mul(2);
        while self.audio.queued_frames() > threshold && self.run.is_set() {
            std::hint::spin_loop();
        }
    }

    /// Frames produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    /// Step until stopped, then give the core back.
    pub fn run(mut self) -> C {
        debug!("emulation loop started");
        while self.step() {}
        debug!("emulation loop stopped after {} frames", self.produced);
        self.core
    }
}
