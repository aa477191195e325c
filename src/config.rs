use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: u32 = 1;
const CONFIG_FILE: &str = "namazu_radar.toml";

// ─── Allow-list ──────────────────────────────────────────────────────

/// Model ids that count as radar targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList(BTreeSet<i32>);

impl AllowList {
    pub fn contains(&self, id: i32) -> bool {
        self.0.contains(&id)
    }

    /// Returns false if the id was already present.
    pub fn add(&mut self, id: i32) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: i32) -> bool {
        self.0.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self([1793, 2226, 1830].into_iter().collect())
    }
}

impl FromIterator<i32> for AllowList {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ─── Persisted config ────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RadarConfig {
    pub version: u32,
    pub process_name: String,
    pub window_visible: bool,
    pub hide_invisible: bool,
    pub sort_by_distance: bool,
    pub include_nameless: bool,
    pub draw_on_map: bool,
    pub map_icon_id: i32,
    pub map_icon_scale: i32,
    pub map_icon_text: bool,
    pub filter_string: String,
    pub allow_list: AllowList,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            process_name: "ffxiv_dx11.exe".into(),
            window_visible: true,
            hide_invisible: true,
            sort_by_distance: true,
            include_nameless: true,
            draw_on_map: false,
            map_icon_id: 60421,
            map_icon_scale: 0,
            map_icon_text: true,
            filter_string: String::new(),
            allow_list: AllowList::default(),
        }
    }
}

/// User commands routed from the app bar and hotkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleWindow,
    OpenSettings,
}

pub fn config_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl RadarConfig {
    pub fn load() -> Self {
        Self::load_from(&config_dir().join(CONFIG_FILE))
    }

    pub fn save(&self) {
        self.save_to(&config_dir().join(CONFIG_FILE));
    }

    /// Falls back to defaults when the file is missing, unparsable or was
    /// written by a different config version.
    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                info!("No config file at {}, using defaults", path.display());
                return Self::default();
            }
        };
        match toml::from_str::<RadarConfig>(&content) {
            Ok(config) if config.version == CONFIG_VERSION => {
                info!(
                    "Loaded config from {} ({} allow-listed ids)",
                    path.display(),
                    config.allow_list.len()
                );
                config
            }
            Ok(config) => {
                warn!(
                    "Config version {} does not match {}, using defaults",
                    config.version, CONFIG_VERSION
                );
                Self::default()
            }
            Err(e) => {
                warn!("Failed to parse config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) {
        match toml::to_string_pretty(self) {
            Ok(content) => match std::fs::write(path, content) {
                Ok(()) => info!("Saved config to {}", path.display()),
                Err(e) => error!("Failed to save config: {}", e),
            },
            Err(e) => error!("Failed to serialize config: {}", e),
        }
    }

    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::ToggleWindow | Command::OpenSettings => {
                self.window_visible = !self.window_visible;
            }
        }
    }

    /// Subtext orientation for map markers: 3 places the name beside the
    /// icon, 0 hides it.
    pub fn text_position(&self) -> u8 {
        if self.map_icon_text {
            3
        } else {
            0
        }
    }

    pub fn icon_id(&self) -> u32 {
        u32::try_from(self.map_icon_id).unwrap_or(0)
    }
}
