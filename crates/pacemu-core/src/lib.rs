//! Frame pacing and synchronization harness for frame-based emulators.
//!
//! This crate owns the threading around an emulation core: it paces frame
//! production against an audio device, turns key transitions into a joypad
//! register, and hands finished frames to a display without tearing.
//! The core itself, the audio driver and the window live behind the traits in
//! [`machine`], [`audio`] and [`render`]; frontends drive everything through
//! [`run::RunController`] and [`input::InputMux`].

/// Audio output contract and the queue-backed implementation.
pub mod audio;

/// Lock-free audio ring buffer shared with the device callback.
pub mod audio_queue;

/// Monotonic microsecond clocks (real and simulated).
pub mod clock;

/// UI scheduling context: events posted by the loops and their dispatcher.
pub mod dispatch;

/// Frame production loop paced by audio backpressure.
pub mod emulation;

/// Once-per-second frame tallies.
pub mod fps;

/// Latest-frame holder shared by the producer and the renderer.
pub mod frame_store;

/// Key bindings, joypad register and one-shot commands.
pub mod input;

/// Emulation core contract and its shared control block.
pub mod machine;

/// Built-in test-pattern core.
pub mod pattern;

/// Fixed-cadence render loop and display sink contract.
pub mod render;

/// Run/stop lifecycle and loop threads.
pub mod run;
