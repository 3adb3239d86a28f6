use crate::audio::AudioOutput;
use crate::clock::{Clock, SystemClock};
use crate::dispatch::UiScheduler;
use crate::emulation::EmulationLoop;
use crate::frame_store::FrameStore;
use crate::input::FrameLimit;
use crate::machine::{CoreLink, EmulationCore};
use crate::render::{BlitCounter, RenderLoop};
use log::{debug, error, info};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Loop continuation flag, polled by both loops every iteration.
#[derive(Clone, Debug, Default)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("no emulation core is loaded")]
    NoCore,
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Starts and stops the emulation and render threads.
///
/// The core is moved onto the emulation thread while a session runs and
/// comes back when [`stop`](Self::stop) joins it. A panic inside the core
/// ends its thread and the core with it; the next `start` then fails with
/// [`RunError::NoCore`] until a new core is installed.
pub struct RunController<C, A, U>
where
    C: EmulationCore,
    A: AudioOutput,
    U: UiScheduler,
{
    core: Option<C>,
    link: Option<Arc<CoreLink>>,
    audio: Arc<A>,
    ui: U,
    clock: Arc<dyn Clock>,
    blits: Arc<BlitCounter>,
    run: RunFlag,
    frame_limit: FrameLimit,
    frames: Option<Arc<FrameStore>>,
    emulation: Option<JoinHandle<C>>,
    render: Option<JoinHandle<()>>,
}

impl<C, A, U> RunController<C, A, U>
where
    C: EmulationCore,
    A: AudioOutput,
    U: UiScheduler,
{
    pub fn new(audio: Arc<A>, ui: U, blits: Arc<BlitCounter>) -> Self {
        Self {
            core: None,
            link: None,
            audio,
            ui,
            clock: Arc::new(SystemClock::new()),
            blits,
            run: RunFlag::new(),
            frame_limit: FrameLimit::default(),
            frames: None,
            emulation: None,
            render: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_frame_limit(mut self, frame_limit: FrameLimit) -> Self {
        self.frame_limit = frame_limit;
        self
    }

    /// Stop any running session, flush the old core's save and install
    /// `core`. Returns the previous core, if it survived.
    pub fn replace_core(&mut self, core: C) -> Option<C> {
        self.stop();
        let mut previous = self.core.take();
        if let Some(old) = previous.as_mut() {
            old.write_save();
        }
        info!("Loaded {}", core.title());
        self.link = Some(core.link());
        self.core = Some(core);
        previous
    }

    /// Begin a session. Does nothing if the loop threads are still alive.
    pub fn start(&mut self) -> Result<(), RunError> {
        self.run.set();
        self.audio.start();
        if self.is_alive() {
            debug!("start ignored: loop threads still alive");
            return Ok(());
        }
        // Collect threads that ended on their own, e.g. a panicking core.
        self.join_all();

        let Some(core) = self.core.take() else {
            self.run.clear();
            self.audio.stop();
            return Err(RunError::NoCore);
        };

        let (width, height) = core.frame_size();
        let frames = Arc::new(FrameStore::new(width, height));
        let link = core.link();
        self.link = Some(Arc::clone(&link));
        self.frames = Some(Arc::clone(&frames));

        let emulation = EmulationLoop::new(
            core,
            Arc::clone(&self.audio),
            Arc::clone(&frames),
            self.run.clone(),
            self.frame_limit.clone(),
            Arc::clone(&self.clock),
            self.ui.clone(),
        );
        match thread::Builder::new()
            .name("emulation".to_string())
            .spawn(move || emulation.run())
        {
            Ok(handle) => self.emulation = Some(handle),
            Err(source) => {
                self.run.clear();
                self.audio.stop();
                return Err(RunError::Spawn {
                    name: "emulation",
                    source,
                });
            }
        }

        let render = RenderLoop::new(
            frames,
            link,
            Arc::clone(&self.blits),
            self.run.clone(),
            Arc::clone(&self.clock),
            self.ui.clone(),
        );
        match thread::Builder::new()
            .name("render".to_string())
            .spawn(move || render.run())
        {
            Ok(handle) => self.render = Some(handle),
            Err(source) => {
                self.stop();
                return Err(RunError::Spawn {
                    name: "render",
                    source,
                });
            }
        }

        info!("Emulation started");
        Ok(())
    }

    /// End the session and wait for both loop threads to exit. No frame is
    /// produced after this returns.
    pub fn stop(&mut self) {
        self.run.clear();
        self.audio.stop();
        if self.emulation.is_some() || self.render.is_some() {
            self.join_all();
            info!("Emulation stopped");
        }
    }

    /// Stop and flush the core's save, as when the frontend closes.
    pub fn shutdown(&mut self) {
        self.stop();
        if let Some(core) = self.core.as_mut() {
            core.write_save();
        }
    }

    fn join_all(&mut self) {
        if let Some(handle) = self.emulation.take() {
            match handle.join() {
                Ok(core) => self.core = Some(core),
                Err(_) => error!("emulation thread panicked; core lost"),
            }
        }
        if let Some(handle) = self.render.take()
            && handle.join().is_err()
        {
            error!("render thread panicked");
        }
    }

    /// Whether either loop thread is still running.
    pub fn is_alive(&self) -> bool {
        self.live_threads() > 0
    }

    pub fn live_threads(&self) -> usize {
        let emulation = self.emulation.as_ref().is_some_and(|h| !h.is_finished());
        let render = self.render.as_ref().is_some_and(|h| !h.is_finished());
        usize::from(emulation) + usize::from(render)
    }

    pub fn is_running(&self) -> bool {
        self.run.is_set()
    }

    /// True when there is a core to start, either idle or on a thread.
    pub fn has_core(&self) -> bool {
        self.core.is_some() || self.emulation.is_some()
    }

    /// The idle core. `None` while a session holds it.
    pub fn core(&self) -> Option<&C> {
        self.core.as_ref()
    }

    /// Control block of the installed core, for the input mux.
    pub fn link(&self) -> Option<Arc<CoreLink>> {
        self.link.clone()
    }

    pub fn frame_limit(&self) -> &FrameLimit {
        &self.frame_limit
    }

    /// Copy of the latest frame of the current or last session.
    pub fn last_frame(&self) -> Option<Vec<u32>> {
        self.frames.as_ref().map(|f| f.snapshot())
    }

    pub fn frame_size(&self) -> Option<(usize, usize)> {
        self.frames.as_ref().map(|f| (f.width(), f.height()))
    }
}

impl<C, A, U> Drop for RunController<C, A, U>
where
    C: EmulationCore,
    A: AudioOutput,
    U: UiScheduler,
{
    fn drop(&mut self) {
        self.stop();
    }
}
