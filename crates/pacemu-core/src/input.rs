use crate::machine::{ControlPort, PAD_RELEASED};
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Keyboard keys a frontend can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Enter,
    Escape,
    Space,
    Tab,
    Backspace,
    /// A letter or digit key, always stored uppercase.
    Char(char),
}

const NAMED: [(Key, &str); 9] = [
    (Key::ArrowUp, "Up"),
    (Key::ArrowDown, "Down"),
    (Key::ArrowLeft, "Left"),
    (Key::ArrowRight, "Right"),
    (Key::Enter, "Enter"),
    (Key::Escape, "Escape"),
    (Key::Space, "Space"),
    (Key::Tab, "Tab"),
    (Key::Backspace, "Backspace"),
];

impl Key {
    /// Parse a key name as written in keybind files ("Up", "ArrowUp", "x", "7").
    pub fn parse(raw: &str) -> Option<Key> {
        let s = raw.trim();
        let s = s
            .strip_prefix("Arrow")
            .filter(|dir| ["Up", "Down", "Left", "Right"].contains(dir))
            .unwrap_or(s);
        if let Some(&(key, _)) = NAMED.iter().find(|(_, name)| *name == s) {
            return Some(key);
        }

        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => {
                Some(Key::Char(c.to_ascii_uppercase()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            named => {
                let name = NAMED
                    .iter()
                    .find(|(key, _)| key == named)
                    .map_or("?", |(_, name)| name);
                f.write_str(name)
            }
        }
    }
}

/// Joypad buttons and their bit in the active-low register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::B,
        Button::Start,
        Button::Select,
    ];

    pub fn mask(self) -> u8 {
        match self {
            Button::A => 0x01,
            Button::B => 0x02,
            Button::Select => 0x04,
            Button::Start => 0x08,
            Button::Right => 0x10,
            Button::Left => 0x20,
            Button::Up => 0x40,
            Button::Down => 0x80,
        }
    }

    /// Name used in keybind files.
    pub fn name(self) -> &'static str {
        match self {
            Button::A => "a",
            Button::B => "b",
            Button::Select => "select",
            Button::Start => "start",
            Button::Right => "right",
            Button::Left => "left",
            Button::Up => "up",
            Button::Down => "down",
        }
    }

    pub fn from_name(name: &str) -> Option<Button> {
        Button::ALL.into_iter().find(|b| b.name() == name)
    }
}

/// Edge-triggered frontend commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    ToggleFrameLimit,
    PrevSlot,
    NextSlot,
    LoadState,
    SaveState,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::ToggleFrameLimit,
        Command::PrevSlot,
        Command::NextSlot,
        Command::LoadState,
        Command::SaveState,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Command::ToggleFrameLimit => "frame_limit",
            Command::PrevSlot => "slot_down",
            Command::NextSlot => "slot_up",
            Command::LoadState => "load_state",
            Command::SaveState => "save_state",
        }
    }

    pub fn from_name(name: &str) -> Option<Command> {
        Command::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// Key → button and key → command tables. One key per button/command.
#[derive(Clone, Debug)]
pub struct KeyMap {
    buttons: HashMap<Key, Button>,
    commands: HashMap<Key, Command>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::defaults()
    }
}

impl KeyMap {
    pub fn defaults() -> Self {
        let mut buttons = HashMap::new();
        buttons.insert(Key::ArrowRight, Button::Right);
        buttons.insert(Key::ArrowLeft, Button::Left);
        buttons.insert(Key::ArrowUp, Button::Up);
        buttons.insert(Key::ArrowDown, Button::Down);
        buttons.insert(Key::Char('S'), Button::Start);
        buttons.insert(Key::Char('A'), Button::Select);
        buttons.insert(Key::Char('X'), Button::A);
        buttons.insert(Key::Char('Z'), Button::B);

        let mut commands = HashMap::new();
        commands.insert(Key::Char('C'), Command::ToggleFrameLimit);
        commands.insert(Key::Char('Q'), Command::PrevSlot);
        commands.insert(Key::Char('W'), Command::NextSlot);
        commands.insert(Key::Char('R'), Command::LoadState);
        commands.insert(Key::Char('E'), Command::SaveState);

        Self { buttons, commands }
    }

    pub fn button_for(&self, key: Key) -> Option<Button> {
        self.buttons.get(&key).copied()
    }

    pub fn command_for(&self, key: Key) -> Option<Command> {
        self.commands.get(&key).copied()
    }

    pub fn key_for_button(&self, button: Button) -> Option<Key> {
        self.buttons
            .iter()
            .find(|&(_, &b)| b == button)
            .map(|(k, _)| *k)
    }

    pub fn key_for_command(&self, command: Command) -> Option<Key> {
        self.commands
            .iter()
            .find(|&(_, &c)| c == command)
            .map(|(k, _)| *k)
    }

    pub fn bind_button(&mut self, button: Button, key: Key) {
        self.buttons.retain(|_, b| *b != button);
        self.buttons.insert(key, button);
    }

    pub fn bind_command(&mut self, command: Command, key: Key) {
        self.commands.retain(|_, c| *c != command);
        self.commands.insert(key, command);
    }
}

/// Shared "pace emulation to audio" switch.
#[derive(Clone, Debug)]
pub struct FrameLimit(Arc<AtomicBool>);

impl FrameLimit {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }

    /// Flip the switch and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::Relaxed)
    }
}

impl Default for FrameLimit {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Turns key transitions into joypad register updates and commands.
///
/// Lives on the UI thread. The core is reached only through the
/// [`ControlPort`] passed to each call.
#[derive(Debug)]
pub struct InputMux {
    keymap: KeyMap,
    state: u8,
    frame_limit: FrameLimit,
    held_commands: HashSet<Key>,
}

impl InputMux {
    pub fn new(keymap: KeyMap, frame_limit: FrameLimit) -> Self {
        Self {
            keymap,
            state: PAD_RELEASED,
            frame_limit,
            held_commands: HashSet::new(),
        }
    }

    /// Current active-low register.
    pub fn state(&self) -> u8 {
        self.state
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn frame_limit(&self) -> &FrameLimit {
        &self.frame_limit
    }

    /// Handle one key transition. Returns whether the key is bound to
    /// anything.
    pub fn on_key(&mut self, port: &dyn ControlPort, key: Key, pressed: bool) -> bool {
        let mut handled = false;

        if let Some(button) = self.keymap.button_for(key) {
            let state = if pressed {
                self.state & !button.mask()
            } else {
                self.state | button.mask()
            };
            self.set_state(port, state);
            handled = true;
        }

        if let Some(command) = self.keymap.command_for(key) {
            if !pressed {
                self.held_commands.remove(&key);
            } else if self.held_commands.insert(key) {
                self.run_command(port, command);
            }
            handled = true;
        }

        handled
    }

    /// Release every button, e.g. when the window loses focus.
    pub fn release_all(&mut self, port: &dyn ControlPort) {
        self.held_commands.clear();
        self.set_state(port, PAD_RELEASED);
    }

    fn set_state(&mut self, port: &dyn ControlPort, state: u8) {
        if state == self.state {
            return;
        }
        self.state = state;
        port.update_pad(state);
    }

    fn run_command(&mut self, port: &dyn ControlPort, command: Command) {
        debug!("input command {command:?}");
        match command {
            Command::ToggleFrameLimit => {
                let enabled = self.frame_limit.toggle();
                info!("Frame limit {}", if enabled { "on" } else { "off" });
            }
            Command::PrevSlot => port.shift_savestate(-1),
            Command::NextSlot => port.shift_savestate(1),
            Command::LoadState => port.request_load_state(),
            Command::SaveState => port.request_save_state(),
        }
    }
}
