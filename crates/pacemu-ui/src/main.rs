mod audio;
mod display;
mod keybinds;
mod keys;
mod ui_config;

use clap::Parser;
use crossbeam_channel as cb;
use display::HeadlessDisplay;
use keys::KeyInput;
use log::{error, info, warn};
use pacemu_core::audio::queued_audio;
use pacemu_core::dispatch::{UiDispatcher, UiEvent};
use pacemu_core::input::{FrameLimit, InputMux};
use pacemu_core::machine::{ControlPort, EmulationCore};
use pacemu_core::pattern::PatternCore;
use pacemu_core::render::BlitCounter;
use pacemu_core::run::RunController;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(version, about = "Frame pacing harness for an emulator core")]
struct Args {
    /// Path to the UI config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the keybinds file
    #[arg(long)]
    keybinds: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<u64>,

    /// Start with frame limiting disabled
    #[arg(long)]
    unlimited: bool,

    /// Drain audio with a virtual device instead of the sound card
    #[arg(long)]
    no_audio: bool,

    /// Write the last displayed frame to this PNG file on exit
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Number of savestate slots
    #[arg(long)]
    slots: Option<u8>,

    /// Write the effective config and keybinds back to disk
    #[arg(long)]
    save_config: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(ui_config::default_ui_config_path);
    let mut cfg = ui_config::load_from_file(&config_path);
    if args.unlimited {
        cfg.frame_limit = false;
    }
    if args.no_audio {
        cfg.audio = false;
    }
    if let Some(slots) = args.slots {
        cfg.savestate_slots = slots;
    }

    let keybinds_path = args
        .keybinds
        .clone()
        .or_else(|| cfg.keybinds_path.clone())
        .unwrap_or_else(keybinds::default_keybinds_path);
    let keymap = keybinds::load_from_file(&keybinds_path);

    if args.save_config {
        if let Err(e) = ui_config::save_to_file(&config_path, &cfg) {
            warn!("Failed to save UI config {}: {e}", config_path.display());
        }
        if let Err(e) = keybinds::save_to_file(&keymap, &keybinds_path) {
            warn!("Failed to save keybinds {}: {e}", keybinds_path.display());
        }
    }

    let device = if cfg.audio {
        audio::default_output()
    } else {
        None
    };
    let sample_rate = device
        .as_ref()
        .map(audio::OutputDevice::sample_rate)
        .unwrap_or(cfg.sample_rate);
    let (output, tap) = queued_audio(sample_rate, cfg.audio_queue_frames(sample_rate));
    let tap = Arc::new(tap);

    let stream = device.and_then(|d| d.start_stream(Arc::clone(&tap)));
    let mut virtual_device = None;
    if stream.is_none() {
        match audio::spawn_virtual_device(tap, sample_rate) {
            Ok(v) => virtual_device = Some(v),
            Err(e) => {
                warn!("Failed to start virtual audio device: {e}; disabling frame limit");
                cfg.frame_limit = false;
            }
        }
    }

    let core = PatternCore::new(sample_rate, cfg.savestate_slots);
    let (width, height) = core.frame_size();
    let title = core.title().to_string();

    let blits = Arc::new(BlitCounter::default());
    let frame_limit = FrameLimit::new(cfg.frame_limit);
    let (events_tx, mut ui) =
        UiDispatcher::channel(HeadlessDisplay::new(width, height, Arc::clone(&blits)));
    ui.set_title(title);

    let mut controller = RunController::new(Arc::new(output), events_tx, blits)
        .with_frame_limit(frame_limit.clone());
    controller.replace_core(core);
    let Some(link) = controller.link() else {
        error!("No core loaded");
        return;
    };
    let mut mux = InputMux::new(keymap, frame_limit);

    if let Err(e) = controller.start() {
        error!("Failed to start emulation: {e}");
        return;
    }
    info!("Running {}", ui.labels().title_text());

    let (key_tx, key_rx) = cb::unbounded();
    let mut keys_open = match keys::spawn_stdin_reader(key_tx) {
        Ok(_) => true,
        Err(e) => {
            warn!("Failed to start key reader: {e}");
            false
        }
    };

    let events = ui.receiver().clone();
    let deadline = match args.seconds {
        Some(secs) => cb::after(Duration::from_secs(secs)),
        None => cb::never(),
    };

    loop {
        let keys = if keys_open {
            key_rx.clone()
        } else {
            cb::never()
        };

        cb::select! {
            recv(events) -> event => match event {
                Ok(event) => {
                    let report = matches!(event, UiEvent::RenderFps(_));
                    ui.handle(event);
                    if report {
                        info!("{}", ui.labels());
                    }
                }
                Err(_) => break,
            },
            recv(keys) -> input => match input {
                Ok(KeyInput::Quit) => break,
                Ok(input) => handle_key(&mut mux, &*link, input),
                Err(_) => keys_open = false,
            },
            recv(deadline) -> _ => break,
        }
    }

    mux.release_all(&*link);
    controller.shutdown();
    ui.pump();
    drop(stream);
    if let Some(mut device) = virtual_device {
        device.stop();
    }

    if let Some(path) = &args.screenshot {
        match ui.sink().save_png(path) {
            Ok(true) => {}
            Ok(false) => warn!("No frame was displayed; skipping screenshot"),
            Err(e) => error!("Failed to write screenshot {}: {e}", path.display()),
        }
    }
    info!("{}", ui.labels());
}

fn handle_key(mux: &mut InputMux, port: &dyn ControlPort, input: KeyInput) {
    match input {
        KeyInput::Press(key) => {
            mux.on_key(port, key, true);
        }
        KeyInput::Release(key) => {
            mux.on_key(port, key, false);
        }
        KeyInput::Tap(key) => {
            mux.on_key(port, key, true);
            mux.on_key(port, key, false);
        }
        KeyInput::Quit => {}
    }
}
