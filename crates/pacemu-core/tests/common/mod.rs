#![allow(dead_code)]

use pacemu_core::audio::AudioOutput;
use pacemu_core::machine::{CoreLink, EmulationCore};
use pacemu_core::render::{BlitCounter, DisplaySink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters a [`RecordingCore`] shares with the test after it has been moved
/// onto the emulation thread.
#[derive(Debug, Default)]
pub struct CoreCounters {
    pub frames: AtomicU64,
    pub saves: AtomicU32,
}

/// Core whose frame `n` is filled with the value `n` and which emits
/// `frame_samples` stereo frames of audio per frame.
pub struct RecordingCore {
    width: usize,
    height: usize,
    frame: Vec<u32>,
    samples: Vec<i16>,
    frame_samples: usize,
    link: Arc<CoreLink>,
    pub counters: Arc<CoreCounters>,
    panic_at: Option<u64>,
}

impl RecordingCore {
    pub fn new(width: usize, height: usize, frame_samples: usize) -> Self {
        Self {
            width,
            height,
            frame: vec![0; width * height],
            samples: Vec::new(),
            frame_samples,
            link: Arc::new(CoreLink::new(4)),
            counters: Arc::new(CoreCounters::default()),
            panic_at: None,
        }
    }

    /// Panic while running frame `frame` (1-based).
    pub fn panicking_at(mut self, frame: u64) -> Self {
        self.panic_at = Some(frame);
        self
    }

    pub fn counters(&self) -> Arc<CoreCounters> {
        Arc::clone(&self.counters)
    }
}

impl EmulationCore for RecordingCore {
    fn frame_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn run_frame(&mut self) {
        let n = self.counters.frames.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_at == Some(n) {
            panic!("core fault at frame {n}");
        }
        self.frame.fill(n as u32);
        self.samples.clear();
        self.samples.resize(self.frame_samples * 2, n as i16);
    }

    fn framebuffer(&self) -> &[u32] {
        &self.frame
    }

    fn audio_samples(&self) -> &[i16] {
        &self.samples
    }

    fn link(&self) -> Arc<CoreLink> {
        Arc::clone(&self.link)
    }

    fn title(&self) -> &str {
        "recording"
    }

    fn write_save(&mut self) {
        self.counters.saves.fetch_add(1, Ordering::SeqCst);
    }
}

/// Audio output whose queue depth is set by the test.
#[derive(Debug, Default)]
pub struct StubAudio {
    pub queued: AtomicUsize,
    pub frame_samples: usize,
    pub pushes: AtomicU64,
    pub pushed_frames: AtomicU64,
    pub playing: AtomicBool,
    pub starts: AtomicU32,
    pub stops: AtomicU32,
}

impl StubAudio {
    pub fn new(frame_samples: usize) -> Self {
        Self {
            frame_samples,
            ..Self::default()
        }
    }

    pub fn set_queued(&self, frames: usize) {
        self.queued.store(frames, Ordering::SeqCst);
    }

    pub fn pushes(&self) -> u64 {
        self.pushes.load(Ordering::SeqCst)
    }
}

impl AudioOutput for StubAudio {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }

    fn push_samples(&self, samples: &[i16]) {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.pushed_frames
            .fetch_add((samples.len() / 2) as u64, Ordering::SeqCst);
    }

    fn queued_frames(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    fn frame_samples(&self) -> usize {
        self.frame_samples
    }
}

/// Display that keeps every frame it is given.
pub struct RecordingSink {
    pub frames: Vec<Vec<u32>>,
    pub blits: Arc<BlitCounter>,
}

impl RecordingSink {
    pub fn new(blits: Arc<BlitCounter>) -> Self {
        Self {
            frames: Vec::new(),
            blits,
        }
    }
}

impl DisplaySink for RecordingSink {
    fn present(&mut self, frame: Vec<u32>) {
        self.frames.push(frame);
        self.blits.record();
    }
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
