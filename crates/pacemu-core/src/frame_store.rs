use std::sync::{Mutex, MutexGuard, PoisonError};

/// Holder of the most recently completed frame.
///
/// The emulation loop publishes into it and the render loop copies out of it.
/// The lock covers only the copy in either direction, so a slow consumer never
/// holds up the producer for longer than one memcpy.
#[derive(Debug)]
pub struct FrameStore {
    width: usize,
    height: usize,
    frame: Mutex<Vec<u32>>,
}

impl FrameStore {
    /// A black `width` x `height` frame.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            frame: Mutex::new(vec![0; width * height]),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Replace the stored frame with a copy of `pixels`.
    pub fn publish(&self, pixels: &[u32]) {
        let mut frame = self.lock();
        if frame.len() == pixels.len() {
            frame.copy_from_slice(pixels);
        } else {
            frame.clear();
            frame.extend_from_slice(pixels);
        }
    }

    /// An independent copy of the latest published frame.
    pub fn snapshot(&self) -> Vec<u32> {
        self.lock().clone()
    }

    // Frames are only ever copied whole under the guard, so a poisoned lock
    // still holds a complete frame.
    fn lock(&self) -> MutexGuard<'_, Vec<u32>> {
        self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
