//! Session lifecycle: start/stop, duplicate starts, faults and core hand-back.

mod common;

use common::{RecordingCore, RecordingSink, StubAudio, wait_until};
use crossbeam_channel as cb;
use pacemu_core::dispatch::{UiDispatcher, UiEvent};
use pacemu_core::input::{FrameLimit, InputMux, Key, KeyMap};
use pacemu_core::render::BlitCounter;
use pacemu_core::run::{RunController, RunError};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

type Controller = RunController<RecordingCore, StubAudio, cb::Sender<UiEvent>>;

const FRAME_SAMPLES: usize = 16;

fn controller() -> (Controller, Arc<StubAudio>, cb::Receiver<UiEvent>) {
    let audio = Arc::new(StubAudio::new(FRAME_SAMPLES));
    let (tx, rx) = cb::unbounded();
    let controller = RunController::new(Arc::clone(&audio), tx, Arc::new(BlitCounter::default()));
    (controller, audio, rx)
}

#[test]
fn stop_before_start_is_a_no_op() {
    let (mut controller, audio, _rx) = controller();
    controller.stop();
    controller.stop();
    assert!(!controller.is_alive());
    assert!(!controller.is_running());
    assert!(!audio.playing.load(Ordering::SeqCst));
}

#[test]
fn start_without_a_core_fails_cleanly() {
    let (mut controller, audio, _rx) = controller();
    assert!(matches!(controller.start(), Err(RunError::NoCore)));
    assert!(!controller.is_running());
    assert!(!controller.is_alive());
    assert!(!audio.playing.load(Ordering::SeqCst));
}

#[test]
fn start_spawns_both_loops_once() {
    let (mut controller, audio, _rx) = controller();
    controller.replace_core(RecordingCore::new(2, 2, FRAME_SAMPLES));

    controller.start().expect("start");
    assert_eq!(controller.live_threads(), 2);
    assert!(audio.playing.load(Ordering::SeqCst));

    controller.start().expect("second start");
    controller.start().expect("third start");
    assert_eq!(controller.live_threads(), 2);
    assert!(controller.core().is_none());

    controller.stop();
    assert_eq!(controller.live_threads(), 0);
    assert!(!audio.playing.load(Ordering::SeqCst));
}

#[test]
fn nothing_is_produced_after_stop_returns() {
    let (mut controller, audio, _rx) = controller();
    let core = RecordingCore::new(2, 2, FRAME_SAMPLES);
    let counters = core.counters();
    controller.replace_core(core);

    controller.start().expect("start");
    assert!(wait_until(Duration::from_secs(2), || {
        counters.frames.load(Ordering::SeqCst) >= 5
    }));
    controller.stop();

    let frames = counters.frames.load(Ordering::SeqCst);
    let pushes = audio.pushes();
    let last = controller.last_frame().expect("frame store");
    thread::sleep(Duration::from_millis(30));

    assert_eq!(counters.frames.load(Ordering::SeqCst), frames);
    assert_eq!(audio.pushes(), pushes);
    assert_eq!(pushes, frames);
    assert_eq!(last, vec![frames as u32; 4]);
    assert_eq!(controller.last_frame(), Some(last));
}

#[test]
fn core_comes_back_and_can_be_restarted() {
    let (mut controller, _audio, _rx) = controller();
    let core = RecordingCore::new(2, 2, FRAME_SAMPLES);
    let counters = core.counters();
    controller.replace_core(core);

    controller.start().expect("start");
    assert!(wait_until(Duration::from_secs(2), || {
        counters.frames.load(Ordering::SeqCst) > 0
    }));
    controller.stop();
    assert!(controller.core().is_some());
    let after_first = counters.frames.load(Ordering::SeqCst);

    controller.start().expect("restart");
    assert!(wait_until(Duration::from_secs(2), || {
        counters.frames.load(Ordering::SeqCst) > after_first
    }));
    controller.stop();
}

#[test]
fn replacing_the_core_flushes_the_old_save() {
    let (mut controller, _audio, _rx) = controller();
    let first = RecordingCore::new(2, 2, FRAME_SAMPLES);
    let first_counters = first.counters();
    controller.replace_core(first);
    controller.start().expect("start");

    let old = controller.replace_core(RecordingCore::new(3, 3, FRAME_SAMPLES));
    assert!(old.is_some());
    assert_eq!(first_counters.saves.load(Ordering::SeqCst), 1);
    assert!(!controller.is_alive());

    controller.start().expect("start new core");
    assert_eq!(controller.frame_size(), Some((3, 3)));
    controller.shutdown();
    assert_eq!(first_counters.saves.load(Ordering::SeqCst), 1);
}

#[test]
fn shutdown_flushes_the_save() {
    let (mut controller, _audio, _rx) = controller();
    let core = RecordingCore::new(2, 2, FRAME_SAMPLES);
    let counters = core.counters();
    controller.replace_core(core);
    controller.start().expect("start");
    controller.shutdown();
    assert_eq!(counters.saves.load(Ordering::SeqCst), 1);
    assert!(!controller.is_running());
}

#[test]
fn faulted_core_blocks_the_next_start() {
    let (mut controller, _audio, _rx) = controller();
    controller.replace_core(RecordingCore::new(2, 2, FRAME_SAMPLES).panicking_at(3));

    controller.start().expect("start");
    assert!(wait_until(Duration::from_secs(2), || controller.live_threads() == 1));

    // The render thread is still alive, so this is the duplicate-start no-op.
    controller.start().expect("start while render alive");
    assert_eq!(controller.live_threads(), 1);

    controller.stop();
    assert!(!controller.has_core());
    assert!(matches!(controller.start(), Err(RunError::NoCore)));
}

#[test]
fn frames_reach_the_display_sink() {
    let blits = Arc::new(BlitCounter::default());
    let audio = Arc::new(StubAudio::new(FRAME_SAMPLES));
    let (tx, mut ui) = UiDispatcher::channel(RecordingSink::new(Arc::clone(&blits)));
    let mut controller = RunController::new(audio, tx, Arc::clone(&blits));
    let core = RecordingCore::new(2, 2, FRAME_SAMPLES);
    let counters = core.counters();
    controller.replace_core(core);

    controller.start().expect("start");
    assert!(wait_until(Duration::from_secs(2), || {
        ui.pump();
        ui.sink().frames.len() >= 3
    }));
    controller.stop();
    ui.pump();

    let produced = counters.frames.load(Ordering::SeqCst) as u32;
    for frame in &ui.sink().frames {
        assert_eq!(frame.len(), 4);
        assert!(frame.iter().all(|&px| px == frame[0]));
        assert!(frame[0] <= produced);
    }
    assert_eq!(ui.labels().savestate, Some(0));
}

#[test]
fn input_mux_shares_the_frame_limit_switch() {
    let (mut controller, audio, _rx) = controller();
    let core = RecordingCore::new(2, 2, FRAME_SAMPLES);
    let counters = core.counters();
    controller.replace_core(core);
    let link = controller.link().expect("link");
    let mut mux = InputMux::new(KeyMap::defaults(), controller.frame_limit().clone());

    // Audio reports a full queue, so only an unlimited session makes progress.
    audio.set_queued(usize::MAX);
    controller.start().expect("start");
    thread::sleep(Duration::from_millis(20));
    assert_eq!(counters.frames.load(Ordering::SeqCst), 0);

    mux.on_key(&*link, Key::Char('C'), true);
    assert!(!controller.frame_limit().is_enabled());
    assert!(wait_until(Duration::from_secs(2), || {
        counters.frames.load(Ordering::SeqCst) > 0
    }));
    controller.stop();
}

#[test]
fn custom_frame_limit_is_used() {
    let audio = Arc::new(StubAudio::new(FRAME_SAMPLES));
    let (tx, _rx) = cb::unbounded::<UiEvent>();
    let limit = FrameLimit::new(false);
    let controller: Controller = RunController::new(audio, tx, Arc::new(BlitCounter::default()))
        .with_frame_limit(limit.clone());
    limit.set(true);
    assert!(controller.frame_limit().is_enabled());
}
