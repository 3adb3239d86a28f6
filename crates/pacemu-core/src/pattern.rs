use crate::audio::FRAME_RATE;
use crate::machine::{CoreLink, EmulationCore};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

const BAR_WIDTH: usize = 20;
const BARS: [u32; 8] = [
    0x00C0C0C0, 0x00C0C000, 0x0000C0C0, 0x0000C000, 0x00C000C0, 0x00C00000, 0x000000C0,
    0x00202020,
];
const PRESSED: u32 = 0x00FFFFFF;
const AMPLITUDE: i16 = 1500;
const BASE_TONE_HZ: u32 = 220;

/// Stand-in core that draws scrolling colour bars and plays a square wave.
///
/// Each horizontal band lights up while its joypad bit is held and every held
/// button raises the tone, which makes input and pacing visible without a
/// real emulator. Savestates live in memory only.
pub struct PatternCore {
    frame: Vec<u32>,
    samples: Vec<i16>,
    link: Arc<CoreLink>,
    sample_rate: u32,
    sample_debt: f64,
    phase: u32,
    frame_count: u64,
    states: HashMap<i32, u64>,
}

impl PatternCore {
    pub fn new(sample_rate: u32, savestate_slots: u8) -> Self {
        Self {
            frame: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            samples: Vec::new(),
            link: Arc::new(CoreLink::new(savestate_slots)),
            sample_rate: sample_rate.max(1),
            sample_debt: 0.0,
            phase: 0,
            frame_count: 0,
            states: HashMap::new(),
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Slots holding a savestate, ascending.
    pub fn saved_slots(&self) -> Vec<i32> {
        let mut slots: Vec<i32> = self.states.keys().copied().collect();
        slots.sort_unstable();
        slots
    }

    fn service_requests(&mut self) {
        let slot = self.link.selected_savestate();
        if self.link.take_save_request() {
            self.states.insert(slot, self.frame_count);
            info!("Saved state {slot}");
        }
        if self.link.take_load_request() {
            match self.states.get(&slot) {
                Some(&frame_count) => {
                    self.frame_count = frame_count;
                    info!("Loaded state {slot}");
                }
                None => warn!("Savestate slot {slot} is empty"),
            }
        }
    }

    fn draw(&mut self, pad: u8) {
        let offset = (self.frame_count % SCREEN_WIDTH as u64) as usize;
        for (y, row) in self.frame.chunks_exact_mut(SCREEN_WIDTH).enumerate() {
            let band = y * 8 / SCREEN_HEIGHT;
            let held = pad & (1 << band) == 0;
            for (x, px) in row.iter_mut().enumerate() {
                *px = if held {
                    PRESSED
                } else {
                    BARS[((x + offset) / BAR_WIDTH) % BARS.len()]
                };
            }
        }
    }

    fn synthesize(&mut self, pad: u8) {
        self.sample_debt += self.sample_rate as f64 / FRAME_RATE;
        let count = self.sample_debt as usize;
        self.sample_debt -= count as f64;

        let held = (!pad).count_ones();
        let tone = BASE_TONE_HZ + held * BASE_TONE_HZ / 2;
        let period = (self.sample_rate / tone).max(2);

        self.samples.clear();
        for _ in 0..count {
            let level = if self.phase < period / 2 {
                AMPLITUDE
            } else {
                -AMPLITUDE
            };
            self.samples.push(level);
            self.samples.push(level);
            self.phase = (self.phase + 1) % period;
        }
    }
}

impl EmulationCore for PatternCore {
    fn frame_size(&self) -> (usize, usize) {
        (SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    fn run_frame(&mut self) {
        self.service_requests();
        let pad = self.link.pad();
        self.draw(pad);
        self.synthesize(pad);
        self.frame_count += 1;
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
        "Test Pattern"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::ControlPort;

    #[test]
    fn audio_averages_to_sample_rate() {
        let mut core = PatternCore::new(48_000, 4);
        let mut total = 0;
        for _ in 0..600 {
            core.run_frame();
            assert_eq!(core.audio_samples().len() % 2, 0);
            total += core.audio_samples().len() / 2;
        }
        let expected = 48_000.0 * 600.0 / FRAME_RATE;
        assert!((total as f64 - expected).abs() < 2.0, "{total} vs {expected}");
    }

    #[test]
    fn held_button_lights_its_band() {
        let mut core = PatternCore::new(48_000, 4);
        // Up is bit 6: rows 6/8 of the screen.
        core.link().update_pad(0xFF & !0x40);
        core.run_frame();
        let row = SCREEN_HEIGHT * 6 / 8 + 1;
        assert_eq!(core.framebuffer()[row * SCREEN_WIDTH], PRESSED);
        assert_ne!(core.framebuffer()[0], PRESSED);
    }

    #[test]
    fn savestates_round_trip_through_requests() {
        let mut core = PatternCore::new(48_000, 4);
        let link = core.link();
        for _ in 0..5 {
            core.run_frame();
        }
        link.shift_savestate(2);
        link.request_save_state();
        core.run_frame();
        assert_eq!(core.saved_slots(), vec![2]);

        for _ in 0..10 {
            core.run_frame();
        }
        link.request_load_state();
        core.run_frame();
        // Restored to frame 5, then the requesting frame ran.
        assert_eq!(core.frame_count(), 6);
        assert!(!link.load_requested());
    }
}
