use glam::Vec2;
use log::{error, info};

pub struct ClipboardHelper {
    clipboard: arboard::Clipboard,
}

impl ClipboardHelper {
    pub fn new() -> Option<Self> {
        match arboard::Clipboard::new() {
            Ok(clipboard) => Some(Self { clipboard }),
            Err(e) => {
                error!("Failed to initialize clipboard: {}", e);
                None
            }
        }
    }

    /// Copy a map position in the same "X: 21.4, Y: 13.2" form the
    /// client uses for <flag> links.
    pub fn copy_map_position(&mut self, name: &str, pos: Vec2) {
        let text = format_map_position(name, pos);
        match self.clipboard.set_text(text.as_str()) {
            Ok(()) => info!("Copied \"{}\"", text),
            Err(e) => error!("Failed to copy to clipboard: {}", e),
        }
    }
}

pub fn format_map_position(name: &str, pos: Vec2) -> String {
    if name.trim().is_empty() {
        format!("X: {:.1}, Y: {:.1}", pos.x, pos.y)
    } else {
        format!("{} (X: {:.1}, Y: {:.1})", name, pos.x, pos.y)
    }
}

/// imgui clipboard backend backed by arboard, so Ctrl+V works in the
/// filter and model id inputs.
pub struct ImguiClipboardBackend {
    clipboard: arboard::Clipboard,
}

impl ImguiClipboardBackend {
    pub fn new() -> Option<Self> {
        arboard::Clipboard::new()
            .ok()
            .map(|clipboard| Self { clipboard })
    }
}

impl imgui::ClipboardBackend for ImguiClipboardBackend {
    fn get(&mut self) -> Option<String> {
        self.clipboard.get_text().ok()
    }

    fn set(&mut self, value: &str) {
        let _ = self.clipboard.set_text(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_text() {
        assert_eq!(
            format_map_position("Namazu", Vec2::new(21.4, 13.2)),
            "Namazu (X: 21.4, Y: 13.2)"
        );
        assert_eq!(format_map_position("", Vec2::new(5.0, 6.0)), "X: 5.0, Y: 6.0");
    }
}
