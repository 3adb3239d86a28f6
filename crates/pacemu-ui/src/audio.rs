use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info, warn};
use pacemu_core::audio::AudioTap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// The default output device and the configuration it will be opened with.
pub struct OutputDevice {
    device: cpal::Device,
    config: cpal::StreamConfig,
    format: cpal::SampleFormat,
}

/// Look up the host's default output device.
pub fn default_output() -> Option<OutputDevice> {
    let host = cpal::default_host();
    let Some(device) = host.default_output_device() else {
        warn!("No audio output device available");
        return None;
    };
    let supported = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            warn!("No supported output config: {e}");
            return None;
        }
    };
    let format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    Some(OutputDevice {
        device,
        config,
        format,
    })
}

impl OutputDevice {
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Start playback pulling stereo frames from `tap`.
    ///
    /// Returns the active [`cpal::Stream`] if successful. The stream must be
    /// kept alive for as long as audio should play.
    pub fn start_stream(self, tap: Arc<AudioTap>) -> Option<cpal::Stream> {
        let built = match self.format {
            cpal::SampleFormat::I16 => self.build::<i16>(tap, |s| s),
            cpal::SampleFormat::U16 => self.build::<u16>(tap, |s| (s as i32 + 32768) as u16),
            cpal::SampleFormat::F32 => self.build::<f32>(tap, |s| s as f32 / 32768.0),
            other => {
                warn!("Unsupported sample format {other:?}");
                return None;
            }
        };

        let stream = match built {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to build output stream: {e}");
                return None;
            }
        };
        if let Err(e) = stream.play() {
            warn!("Failed to start output stream: {e}");
            return None;
        }
        info!(
            "Audio output at {} Hz, {} channel(s), {:?}",
            self.config.sample_rate.0, self.config.channels, self.format
        );
        Some(stream)
    }

    fn build<T: cpal::SizedSample + 'static>(
        &self,
        tap: Arc<AudioTap>,
        convert: fn(i16) -> T,
    ) -> Result<cpal::Stream, cpal::BuildStreamError> {
        let channels = self.config.channels as usize;
        self.device.build_output_stream(
            &self.config,
            move |data: &mut [T], _| tap.fill(data, channels, convert),
            |err| error!("cpal stream error: {err}"),
            None,
        )
    }
}

/// Stand-in for a sound card: drains `tap` at `sample_rate` on its own
/// thread so frame limiting still paces emulation without audio hardware.
pub struct VirtualDevice {
    quit: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

const VIRTUAL_PERIOD: Duration = Duration::from_millis(5);

pub fn spawn_virtual_device(
    tap: Arc<AudioTap>,
    sample_rate: u32,
) -> std::io::Result<VirtualDevice> {
    let quit = Arc::new(AtomicBool::new(false));
    let quit_thread = Arc::clone(&quit);
    let rate = sample_rate.max(1) as u64;

    let handle = thread::Builder::new()
        .name("virtual-audio".into())
        .spawn(move || {
            debug!("Virtual audio device draining at {rate} Hz");
            let origin = Instant::now();
            let mut consumed = 0u64;
            let mut scratch = Vec::new();
            while !quit_thread.load(Ordering::Relaxed) {
                thread::sleep(VIRTUAL_PERIOD);
                let due = origin.elapsed().as_micros() as u64 * rate / 1_000_000;
                scratch.resize(2 * due.saturating_sub(consumed) as usize, 0i16);
                tap.fill(&mut scratch, 2, |s| s);
                consumed = due;
            }
        })?;

    Ok(VirtualDevice {
        quit,
        handle: Some(handle),
    })
}

impl VirtualDevice {
    pub fn stop(&mut self) {
        self.quit.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        self.stop();
    }
}
