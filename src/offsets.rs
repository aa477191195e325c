// FFXIV x64 client (DX11): Memory Offsets
// Addresses marked RVA are relative to the game module base; everything else
// is a field offset inside the structure named in the section header.
// Re-verify after every client patch.

// ── Object table (GameObjectManager) ────────────────────────────────
pub const OBJECT_TABLE: usize = 0x021A_1D70; // RVA, GameObject*[596]
pub const OBJECT_TABLE_SIZE: usize = 596;
pub const POINTER_SIZE: usize = 8;

// ── Fields within a GameObject / Character ──────────────────────────
pub const OBJECT_NAME: usize = 0x0030; // char[64], UTF-8, null-terminated
pub const OBJECT_NAME_MAX_LEN: usize = 64;
pub const OBJECT_KIND: usize = 0x008C; // u8, ObjectKind
pub const OBJECT_POSITION: usize = 0x00B0; // f32 x3
pub const OBJECT_RENDER_FLAGS: usize = 0x0114; // i32, 0 = drawn
pub const CHARACTER_MODEL_CHARA_ID: usize = 0x01B4; // i32
pub const CHARACTER_MODEL_CHARA_ID_2: usize = 0x01B8; // i32, -1 = unset
pub const OBJECT_READ_SIZE: usize = 0x01C0;

// ObjectKind values treated as characters
pub const KIND_PC: u8 = 1;
pub const KIND_BATTLE_NPC: u8 = 2;
pub const KIND_EVENT_NPC: u8 = 3;
pub const KIND_COMPANION: u8 = 9;
pub const KIND_RETAINER: u8 = 10;

// ── Control / TargetSystem ──────────────────────────────────────────
pub const CONTROL_LOCAL_PLAYER: usize = 0x0218_F3A8; // RVA, Character*
pub const TARGET_SYSTEM_CURRENT: usize = 0x0218_9DD0; // RVA, GameObject*

// ── AgentMap ────────────────────────────────────────────────────────
pub const AGENT_MAP_PTR: usize = 0x0217_E830; // RVA, AgentMap*
pub const AGENT_ADDON_ID: usize = 0x0020; // u32, 0 = agent inactive
pub const AGENT_MAP_MARKER_INFO_ARRAY: usize = 0x00D0; // MapMarkerInfo[132]
pub const AGENT_MINI_MAP_MARKER_ARRAY: usize = 0x2650; // MiniMapMarker[100]
pub const AGENT_CURRENT_OFFSET_X: usize = 0x5A18; // i16
pub const AGENT_CURRENT_OFFSET_Y: usize = 0x5A1A; // i16
pub const AGENT_CURRENT_SIZE_FACTOR: usize = 0x5A1C; // i16
pub const AGENT_CURRENT_MAP_ID: usize = 0x5A98; // u32
pub const AGENT_UPDATE_FLAGS: usize = 0x5B7C; // u32 bitfield
pub const AGENT_MAP_MARKER_COUNT: usize = 0x5B9C; // u8
pub const AGENT_MINI_MAP_MARKER_COUNT: usize = 0x5BA0; // u8

// ── Marker records ──────────────────────────────────────────────────
pub const MAP_MARKER_INFO_SIZE: usize = 0x48;
pub const MAP_MARKER_INFO_BASE: usize = 0x00; // MapMarkerBase within MapMarkerInfo
pub const MINI_MAP_MARKER_SIZE: usize = 0x40;
pub const MINI_MAP_MARKER_BASE: usize = 0x08; // MapMarkerBase within MiniMapMarker

// Fields within MapMarkerBase
pub const MARKER_SUBTEXT_ORIENTATION: usize = 0x00; // u8
pub const MARKER_SUBTEXT_STYLE: usize = 0x01; // u8
pub const MARKER_ICON_ID: usize = 0x04; // u32
pub const MARKER_SCALE: usize = 0x0C; // i32, 0 = default
pub const MARKER_SUBTEXT: usize = 0x10; // char*
pub const MARKER_INDEX: usize = 0x18; // u8
pub const MARKER_X: usize = 0x1C; // i16, world x * 16
pub const MARKER_Y: usize = 0x1E; // i16, world z * 16

// ── RaptureAtkUnitManager (addon visibility) ────────────────────────
pub const ATK_UNIT_MANAGER: usize = 0x021B_4E60; // RVA, RaptureAtkUnitManager*
pub const UNIT_MANAGER_LOADED_LIST: usize = 0x9C90; // AtkUnitList
pub const UNIT_LIST_ENTRIES: usize = 0x0008; // AtkUnitBase*[256]
pub const UNIT_LIST_COUNT: usize = 0x0808; // u16
pub const UNIT_LIST_CAPACITY: usize = 256;
pub const UNIT_NAME: usize = 0x0008; // char[32]
pub const UNIT_NAME_MAX_LEN: usize = 32;
pub const UNIT_VISIBILITY_FLAGS: usize = 0x0182; // u8
pub const UNIT_VISIBLE_BIT: u8 = 0x20;
pub const NAVI_MAP_ADDON: &str = "_NaviMap";
