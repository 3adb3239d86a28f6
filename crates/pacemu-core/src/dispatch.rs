use crate::render::DisplaySink;
use crossbeam_channel as cb;
use log::trace;
use std::fmt;

/// Work posted by the loops for the UI thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    /// A frame copy for the display and the savestate slot to show with it.
    Frame { pixels: Vec<u32>, savestate: i32 },
    /// Frames produced by the emulation loop during the last second.
    EmulatedFps(u32),
    /// Frames blitted by the display during the last second.
    RenderFps(u32),
}

/// The UI thread's serial scheduling context.
///
/// Events posted from one thread are handled in the order they were posted;
/// nothing is promised about when.
pub trait UiScheduler: Clone + Send + 'static {
    fn post(&self, event: UiEvent);
}

impl UiScheduler for cb::Sender<UiEvent> {
    fn post(&self, event: UiEvent) {
        if self.send(event).is_err() {
            trace!("UI context closed; dropping event");
        }
    }
}

/// Text shown around the game screen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusLabels {
    pub title: String,
    pub emulated_fps: Option<u32>,
    pub render_fps: Option<u32>,
    pub savestate: Option<i32>,
}

impl StatusLabels {
    pub fn title_text(&self) -> String {
        if self.title.is_empty() {
            "No Rom Loaded".to_string()
        } else {
            self.title.clone()
        }
    }

    pub fn emulated_text(&self) -> String {
        match self.emulated_fps {
            Some(fps) => format!("Emulated FPS: {fps}"),
            None => "Emulator FPS:".to_string(),
        }
    }

    pub fn render_text(&self) -> String {
        match self.render_fps {
            Some(fps) => format!("Blit FPS: {fps}"),
            None => "Blit FPS:".to_string(),
        }
    }

    pub fn savestate_text(&self) -> String {
        match self.savestate {
            Some(slot) => format!("Selected State : {slot}"),
            None => "Selected State : null".to_string(),
        }
    }
}

impl fmt::Display for StatusLabels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.title_text(),
            self.emulated_text(),
            self.render_text(),
            self.savestate_text()
        )
    }
}

/// Runs posted events on the UI thread: frames go to the display sink,
/// statistics go to the status labels.
pub struct UiDispatcher<S> {
    events: cb::Receiver<UiEvent>,
    sink: S,
    labels: StatusLabels,
}

impl<S: DisplaySink> UiDispatcher<S> {
    pub fn new(events: cb::Receiver<UiEvent>, sink: S) -> Self {
        Self {
            events,
            sink,
            labels: StatusLabels::default(),
        }
    }

    /// A scheduler/dispatcher pair connected by an unbounded channel.
    pub fn channel(sink: S) -> (cb::Sender<UiEvent>, Self) {
        let (tx, rx) = cb::unbounded();
        (tx, Self::new(rx, sink))
    }

    pub fn receiver(&self) -> &cb::Receiver<UiEvent> {
        &self.events
    }

    pub fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::Frame { pixels, savestate } => {
                self.sink.present(pixels);
                self.labels.savestate = Some(savestate);
            }
            UiEvent::EmulatedFps(fps) => self.labels.emulated_fps = Some(fps),
            UiEvent::RenderFps(fps) => self.labels.render_fps = Some(fps),
        }
    }

    /// Handle everything already queued. Returns how many events ran.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.labels.title = title.into();
    }

    pub fn labels(&self) -> &StatusLabels {
        &self.labels
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
