use crate::ui_config::config_dir;
use log::{info, warn};
use pacemu_core::input::{Button, Command, Key, KeyMap};
use std::path::{Path, PathBuf};

pub fn default_keybinds_path() -> PathBuf {
    config_dir().join("keybinds.toml")
}

/// Read a `name = Key` keybinds file on top of the default bindings.
///
/// Unreadable files and bad lines are reported and skipped.
pub fn load_from_file(path: &Path) -> KeyMap {
    let Ok(text) = std::fs::read_to_string(path) else {
        warn!(
            "Failed to read keybinds file {}; using defaults",
            path.display()
        );
        return KeyMap::defaults();
    };
    parse(&text, path)
}

fn parse(text: &str, path: &Path) -> KeyMap {
    let mut bindings = KeyMap::defaults();

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((name, value)) = line.split_once('=') else {
            warn!(
                "Ignoring invalid keybinds line {}:{} (expected name = value)",
                path.display(),
                line_no + 1
            );
            continue;
        };

        let name = name.trim();
        let value = value.trim().trim_matches('"');
        let Some(key) = Key::parse(value) else {
            warn!(
                "Ignoring keybinds line {}:{} (unknown Key '{value}')",
                path.display(),
                line_no + 1
            );
            continue;
        };

        if let Some(button) = Button::from_name(name) {
            bindings.bind_button(button, key);
        } else if let Some(command) = Command::from_name(name) {
            bindings.bind_command(command, key);
        } else {
            warn!(
                "Ignoring unknown keybind name '{name}' in {}:{}",
                path.display(),
                line_no + 1
            );
        }
    }

    bindings
}

pub fn save_to_file(bindings: &KeyMap, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut lines = Vec::new();
    lines.push("# pacemu keybinds configuration".to_string());
    lines.push(String::new());

    for button in Button::ALL {
        if let Some(key) = bindings.key_for_button(button) {
            lines.push(format!("{} = {}", button.name(), key));
        }
    }

    lines.push(String::new());
    for command in Command::ALL {
        if let Some(key) = bindings.key_for_command(command) {
            lines.push(format!("{} = {}", command.name(), key));
        }
    }

    let content = lines.join("\n");
    std::fs::write(path, content)?;
    info!("Saved keybinds to {}", path.display());
    Ok(())
}
