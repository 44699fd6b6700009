use std::fs;
use std::path::{Path, PathBuf};

use crate::ui::settings::AppSettings;

const APP_DIR: &str = "claydungeon";

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    let mut path = base.unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

pub fn settings_path() -> PathBuf {
    app_dir(dirs::config_dir()).join("settings.json")
}

pub fn history_path() -> PathBuf {
    app_dir(dirs::data_dir()).join("history.json")
}

pub fn load_settings() -> AppSettings {
    load_settings_from(&settings_path())
}

pub fn save_settings(settings: &AppSettings) {
    let path = settings_path();
    if let Err(e) = save_settings_to(&path, settings) {
        log::warn!("could not save settings to {}: {e:#}", path.display());
    }
}

/// Missing or malformed files give the defaults.
pub fn load_settings_from(path: &Path) -> AppSettings {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}
