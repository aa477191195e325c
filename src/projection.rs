use glam::{Vec2, Vec3};

/// Zoom and offset of the map view the client is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapProjection {
    pub size_factor: i16,
    pub offset_x: i16,
    pub offset_y: i16,
}

impl MapProjection {
    /// Map display coordinates of a world position, as shown in the client's
    /// own map coordinate readout. `size_factor` must not be zero.
    pub fn project(&self, pos: Vec3, round: bool) -> Vec2 {
        world_to_map_display(
            pos.x,
            pos.z,
            self.size_factor,
            self.offset_x,
            self.offset_y,
            round,
        )
    }
}

/// Convert world X/Z into map display space.
///
/// The arithmetic order mirrors the client's renderer so values line up with
/// the in-game coordinate display. With `round`, each axis is cut to one
/// decimal digit toward zero (1.27 -> 1.2, -1.27 -> -1.2).
pub fn world_to_map_display(
    world_x: f32,
    world_z: f32,
    size_factor: i16,
    offset_x: i16,
    offset_y: i16,
    round: bool,
) -> Vec2 {
    let scale = size_factor as f32 / 100.0;
    let mut x = (10.0 - ((world_x + offset_x as f32) * scale + 1024.0) * -0.2 / scale) / 10.0;
    let mut y = (10.0 - ((world_z + offset_y as f32) * scale + 1024.0) * -0.2 / scale) / 10.0;
    if round {
        x = truncate_to_tenths(x);
        y = truncate_to_tenths(y);
    }
    Vec2::new(x, y)
}

fn truncate_to_tenths(value: f32) -> f32 {
    (value * 10.0).trunc() / 10.0
}
