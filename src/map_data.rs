use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::config;

// ─── Data structures ────────────────────────────────────────────────

/// A row of the client's Map sheet. Other sheet columns in the file
/// (name, ...) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRow {
    pub id: u32,
    pub marker_range: u32,
}

/// A row of the client's MapMarker sheet. Every row sharing a `range`
/// belongs to the maps pointing at that range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapMarkerRow {
    pub range: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapMarkerData {
    pub maps: Vec<MapRow>,
    pub markers: Vec<MapMarkerRow>,
}

// ─── Implementation ─────────────────────────────────────────────────

impl MapMarkerData {
    /// Load `map_markers.json` from the config dir, falling back to the
    /// bundled table.
    pub fn load() -> Self {
        Self::load_from(&config::config_dir().join("map_markers.json"))
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<MapMarkerData>(&content) {
                Ok(data) => {
                    info!(
                        "Loaded map marker data from {} ({} maps, {} markers)",
                        path.display(),
                        data.maps.len(),
                        data.markers.len()
                    );
                    data
                }
                Err(e) => {
                    error!("Failed to parse {}: {}", path.display(), e);
                    load_bundled()
                }
            },
            Err(_) => {
                info!("No map marker data at {}, using bundled table", path.display());
                load_bundled()
            }
        }
    }

    /// Number of the client's own markers on each map, i.e. the first slot
    /// our markers may use.
    pub fn default_counts(&self) -> HashMap<u32, u8> {
        let mut per_range: HashMap<u32, usize> = HashMap::new();
        for marker in &self.markers {
            *per_range.entry(marker.range).or_default() += 1;
        }

        self.maps
            .iter()
            .map(|map| {
                let count = per_range.get(&map.marker_range).copied().unwrap_or(0);
                let count = u8::try_from(count).unwrap_or_else(|_| {
                    warn!("map {} has {} default markers, clamping to 255", map.id, count);
                    u8::MAX
                });
                (map.id, count)
            })
            .collect()
    }
}

const BUNDLED_MAP_MARKERS: &str = include_str!("../assets/map_markers.json");

fn load_bundled() -> MapMarkerData {
    match serde_json::from_str::<MapMarkerData>(BUNDLED_MAP_MARKERS) {
        Ok(data) => {
            info!("Loaded bundled map marker data ({} maps)", data.maps.len());
            data
        }
        Err(e) => {
            error!("Failed to parse bundled map marker data: {}", e);
            MapMarkerData::default()
        }
    }
}
