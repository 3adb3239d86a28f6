use crate::audio_queue::{AudioConsumer, AudioProducer, QueueLevel, audio_queue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Frame rate of the emulated machine, used to size one frame of audio.
pub const FRAME_RATE: f64 = 59.7275;

/// Smallest queue, in emulated frames of audio, that [`queued_audio`] will
/// build. Must stay above the two-frame backpressure threshold or the
/// emulation loop never waits on the device.
pub const MIN_QUEUE_FRAMES: usize = 4;

/// Sink for the samples produced by the emulation loop.
///
/// Every method takes `&self`: the run controller starts and stops the output
/// from the UI thread while the emulation thread pushes and polls it.
pub trait AudioOutput: Send + Sync + 'static {
    /// Begin playback. Calling it while already playing does nothing.
    fn start(&self);

    /// Pause playback. Calling it while stopped does nothing.
    fn stop(&self);

    /// Accept interleaved stereo samples.
    fn push_samples(&self, samples: &[i16]);

    /// Stereo frames waiting to be played. Polled from a spin loop, so it
    /// must not block.
    fn queued_frames(&self) -> usize;

    /// Stereo frames produced by one emulated frame.
    fn frame_samples(&self) -> usize;
}

/// Stereo frames in one emulated frame at `sample_rate`.
pub fn frame_samples_for(sample_rate: u32) -> usize {
    (sample_rate as f64 / FRAME_RATE).ceil() as usize
}

/// [`AudioOutput`] backed by an [`audio_queue`]; the device callback pulls
/// from the matching [`AudioTap`].
pub struct QueuedAudio {
    producer: Mutex<AudioProducer>,
    level: QueueLevel,
    playing: Arc<AtomicBool>,
    frame_samples: usize,
}

/// Device side of a [`QueuedAudio`].
pub struct AudioTap {
    consumer: Mutex<AudioConsumer>,
    playing: Arc<AtomicBool>,
}

/// Create an output/tap pair for a device running at `sample_rate` with room
/// for `capacity_frames` stereo frames, raised to [`MIN_QUEUE_FRAMES`] worth
/// of emulated frames if smaller.
pub fn queued_audio(sample_rate: u32, capacity_frames: usize) -> (QueuedAudio, AudioTap) {
    let frame_samples = frame_samples_for(sample_rate);
    let floor = MIN_QUEUE_FRAMES * frame_samples;
    if capacity_frames < floor {
        log::warn!(
            "Audio queue of {capacity_frames} frames is too short at {sample_rate} Hz; using {floor}"
        );
    }

    let (producer, consumer) = audio_queue(capacity_frames.max(floor));
    let playing = Arc::new(AtomicBool::new(false));
    (
        QueuedAudio {
            level: producer.level(),
            producer: Mutex::new(producer),
            playing: Arc::clone(&playing),
            frame_samples,
        },
        AudioTap {
            consumer: Mutex::new(consumer),
            playing,
        },
    )
}

// Both ends only move counters after a slot access completes, so a panic
// while holding either lock leaves the queue consistent.
fn lock<T>(end: &Mutex<T>) -> MutexGuard<'_, T> {
    end.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AudioOutput for QueuedAudio {
    fn start(&self) {
        self.playing.store(true, Ordering::Release);
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::Release);
    }

    fn push_samples(&self, samples: &[i16]) {
        let offered = samples.len() / 2;
        let pushed = lock(&self.producer).push(samples);
        if pushed < offered {
            log::trace!("audio queue full; dropped {} frames", offered - pushed);
        }
    }

    fn queued_frames(&self) -> usize {
        self.level.len()
    }

    fn frame_samples(&self) -> usize {
        self.frame_samples
    }
}

impl AudioTap {
    /// Fill a device buffer of `channels`-wide frames, converting each sample
    /// with `convert`. Mono devices get the left channel, channels past the
    /// second get silence.
    ///
    /// Plays silence while stopped or starved. Anything still queued while
    /// stopped is discarded so a restart does not replay stale audio.
    pub fn fill<T: Copy>(&self, data: &mut [T], channels: usize, convert: impl Fn(i16) -> T) {
        let silence = convert(0);
        let mut consumer = lock(&self.consumer);
        if !self.playing.load(Ordering::Acquire) {
            let dropped = consumer.clear();
            if dropped > 0 {
                log::trace!("audio stopped; flushed {dropped} frames");
            }
            data.fill(silence);
            return;
        }

        for frame in data.chunks_mut(channels.max(1)) {
            let [left, right] = consumer.pop().unwrap_or([0, 0]);
            frame.fill(silence);
            frame[0] = convert(left);
            if let Some(slot) = frame.get_mut(1) {
                *slot = convert(right);
            }
        }
    }
}
