use glam::Vec3;

use crate::config::{AllowList, RadarConfig};
use crate::entity::GameObject;

/// Snapshot of the settings that decide which objects are radar targets.
pub struct TargetFilter<'a> {
    pub allow_list: &'a AllowList,
    pub hide_invisible: bool,
    pub include_nameless: bool,
    filter_lower: String,
}

impl<'a> TargetFilter<'a> {
    pub fn new(
        allow_list: &'a AllowList,
        hide_invisible: bool,
        include_nameless: bool,
        filter_string: &str,
    ) -> Self {
        Self {
            allow_list,
            hide_invisible,
            include_nameless,
            filter_lower: filter_string.to_lowercase(),
        }
    }

    pub fn from_config(config: &'a RadarConfig) -> Self {
        Self::new(
            &config.allow_list,
            config.hide_invisible,
            config.include_nameless,
            &config.filter_string,
        )
    }

    pub fn is_target(&self, obj: &GameObject) -> bool {
        obj.is_character() && self.allow_list.contains(obj.type_discriminant())
    }

    pub fn matches_text(&self, obj: &GameObject) -> bool {
        if obj.is_nameless() {
            return self.include_nameless;
        }
        obj.name.to_lowercase().contains(&self.filter_lower)
    }

    /// Allow-list, visibility, then name filter; each stage short-circuits.
    pub fn matches(&self, obj: &GameObject) -> bool {
        self.is_target(obj)
            && (!self.hide_invisible || obj.is_visible())
            && self.matches_text(obj)
    }

    /// Matching objects in table scan order. Empty slots are skipped.
    pub fn apply<'o>(&self, slots: &'o [Option<GameObject>]) -> Vec<&'o GameObject> {
        slots
            .iter()
            .flatten()
            .filter(|obj| self.matches(obj))
            .collect()
    }
}

/// Stable ascending sort by distance from `reference`.
pub fn sort_by_distance(objects: &mut [&GameObject], reference: Vec3) {
    objects.sort_by(|a, b| a.distance_to(reference).total_cmp(&b.distance_to(reference)));
}

/// The radar table: filtered targets, nearest first when the config asks
/// for it.
pub fn radar_entries<'o>(
    slots: &'o [Option<GameObject>],
    config: &RadarConfig,
    reference: Vec3,
) -> Vec<&'o GameObject> {
    let mut entries = TargetFilter::from_config(config).apply(slots);
    if config.sort_by_distance {
        sort_by_distance(&mut entries, reference);
    }
    entries
}
