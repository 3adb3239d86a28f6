use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Pace emulation to the audio queue at startup.
    pub frame_limit: bool,
    /// Use the system audio device. When false a virtual device drains audio
    /// at the configured rate.
    pub audio: bool,
    /// Preferred sample rate for the virtual device and the test pattern.
    pub sample_rate: u32,
    /// Size of the audio ring in milliseconds.
    pub audio_queue_ms: u32,
    pub savestate_slots: u8,
    pub keybinds_path: Option<PathBuf>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            frame_limit: true,
            audio: true,
            sample_rate: 48_000,
            audio_queue_ms: 200,
            savestate_slots: 10,
            keybinds_path: None,
        }
    }
}

impl UiConfig {
    /// Ring capacity in stereo frames at `sample_rate`.
    pub fn audio_queue_frames(&self, sample_rate: u32) -> usize {
        (sample_rate as u64 * self.audio_queue_ms.max(1) as u64 / 1000) as usize
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("pacemu");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("pacemu");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".config").join("pacemu");
    }

    PathBuf::new()
}

pub fn default_ui_config_path() -> PathBuf {
    config_dir().join("ui.toml")
}

pub fn load_from_file(path: &Path) -> UiConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return UiConfig::default(),
    };

    match toml::from_str::<UiConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse UI config {}: {e}; using defaults",
                path.display()
            );
            UiConfig::default()
        }
    }
}

pub fn save_to_file(path: &Path, cfg: &UiConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let text = toml::to_string_pretty(cfg).map_err(std::io::Error::other)?;
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_from_file(&dir.path().join("nope.toml"));
        assert_eq!(cfg, UiConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ui.toml");
        std::fs::write(&path, "frame_limit = false\nsavestate_slots = 4\n").expect("write");

        let cfg = load_from_file(&path);
        assert!(!cfg.frame_limit);
        assert_eq!(cfg.savestate_slots, 4);
        assert_eq!(cfg.sample_rate, 48_000);
        assert!(cfg.audio);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ui.toml");
        std::fs::write(&path, "frame_limit = \"sometimes\"").expect("write");
        assert_eq!(load_from_file(&path), UiConfig::default());
    }

    #[test]
    fn save_creates_parent_and_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("ui.toml");
        let cfg = UiConfig {
            audio: false,
            audio_queue_ms: 80,
            keybinds_path: Some(PathBuf::from("/tmp/keys.toml")),
            ..UiConfig::default()
        };
        save_to_file(&path, &cfg).expect("save");
        assert_eq!(load_from_file(&path), cfg);
    }

    #[test]
    fn queue_size_follows_rate() {
        let cfg = UiConfig::default();
        assert_eq!(cfg.audio_queue_frames(48_000), 9_600);
    }
}
