use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Storage shared by one producer and one consumer.
///
/// `written` and `read` count stereo frames since creation; frame `n` lives
/// in slot `n % capacity`. The producer owns the slots outside
/// `read..written`, the consumer owns the ones inside.
struct Ring {
    slots: Box<[UnsafeCell<[i16; 2]>]>,
    written: AtomicUsize,
    read: AtomicUsize,
}

// SAFETY: a ring is only reachable through one `AudioProducer`, one
// `AudioConsumer` and any number of `QueueLevel`s. The first two are not
// `Clone` and touch slots only through `&mut self`, each on its own side of
// the `read..written` window, and publish their counter with `Release` after
// the slot access. `QueueLevel` reads the counters only.
unsafe impl Sync for Ring {}

impl Ring {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, frame: usize) -> *mut [i16; 2] {
        self.slots[frame % self.capacity()].get()
    }

    /// Frames queued as seen from a third thread. `read` is loaded first so
    /// the difference never underflows.
    fn len(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        let written = self.written.load(Ordering::Acquire);
        written.wrapping_sub(read).min(self.capacity())
    }
}

/// Create a lossy single-producer/single-consumer queue of stereo `i16`
/// frames holding up to `capacity_frames` (at least one).
///
/// The emulation thread pushes interleaved samples, the audio device pops
/// frames. Pushing into a full queue drops the newest samples.
pub fn audio_queue(capacity_frames: usize) -> (AudioProducer, AudioConsumer) {
    let slots = (0..capacity_frames.max(1))
        .map(|_| UnsafeCell::new([0; 2]))
        .collect();
    let ring = Arc::new(Ring {
        slots,
        written: AtomicUsize::new(0),
        read: AtomicUsize::new(0),
    });
    (
        AudioProducer {
            ring: Arc::clone(&ring),
        },
        AudioConsumer { ring },
    )
}

/// Writing end of an [`audio_queue`].
pub struct AudioProducer {
    ring: Arc<Ring>,
}

impl AudioProducer {
    /// Append interleaved `[l, r, l, r, ...]` samples, keeping as many whole
    /// frames as fit. A trailing odd sample is ignored. Returns the number of
    /// stereo frames accepted.
    pub fn push(&mut self, samples: &[i16]) -> usize {
        let ring = &*self.ring;
        let written = ring.written.load(Ordering::Relaxed);
        let read = ring.read.load(Ordering::Acquire);
        let room = ring.capacity() - written.wrapping_sub(read);
        let accepted = (samples.len() / 2).min(room);

        for (i, pair) in samples.chunks_exact(2).take(accepted).enumerate() {
            // SAFETY: frames `written..written + room` are outside the
            // consumer's window.
            unsafe { *ring.slot(written.wrapping_add(i)) = [pair[0], pair[1]] };
        }
        ring.written.store(written.wrapping_add(accepted), Ordering::Release);
        accepted
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only view of the queue depth that any thread may poll.
    pub fn level(&self) -> QueueLevel {
        QueueLevel {
            ring: Arc::clone(&self.ring),
        }
    }
}

/// Reading end of an [`audio_queue`].
pub struct AudioConsumer {
    ring: Arc<Ring>,
}

impl AudioConsumer {
    pub fn pop(&mut self) -> Option<[i16; 2]> {
        let ring = &*self.ring;
        let read = ring.read.load(Ordering::Relaxed);
        let written = ring.written.load(Ordering::Acquire);
        if read == written {
            return None;
        }
        // SAFETY: `read < written`, so the producer has finished this slot
        // and will not reuse it until `read` moves past it.
        let frame = unsafe { *ring.slot(read) };
        ring.read.store(read.wrapping_add(1), Ordering::Release);
        Some(frame)
    }

    /// Discard everything queued right now. Returns the frames dropped;
    /// frames pushed concurrently are kept.
    pub fn clear(&mut self) -> usize {
        let ring = &*self.ring;
        let read = ring.read.load(Ordering::Relaxed);
        let written = ring.written.load(Ordering::Acquire);
        ring.read.store(written, Ordering::Release);
        written.wrapping_sub(read)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Queue depth probe. Cheap enough for a spin-wait.
#[derive(Clone)]
pub struct QueueLevel {
    ring: Arc<Ring>,
}

impl QueueLevel {
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
