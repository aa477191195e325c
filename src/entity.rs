use glam::Vec3;
use log::{debug, trace};
use std::io;

use crate::memory::{is_valid_ptr, ProcessMemory};
use crate::offsets;

/// In-memory value of an unset secondary model id.
const MODEL_ID_UNSET: i32 = -1;

// ─── Game object snapshot ───────────────────────────────────────────

/// One live object copied out of the client's object table.
///
/// Only valid for the tick it was read in; the client reuses slots freely.
#[derive(Debug, Clone, PartialEq)]
pub struct GameObject {
    pub address: usize,
    pub name: String,
    pub kind: u8,
    pub position: Vec3,
    pub render_flags: i32,
    pub model_id: i32,
    pub secondary_model_id: Option<i32>,
}

impl GameObject {
    pub fn from_raw_bytes(address: usize, data: &[u8]) -> Option<Self> {
        if data.len() < offsets::OBJECT_READ_SIZE {
            debug!(
                "object 0x{:X}: data too short ({} < {})",
                address,
                data.len(),
                offsets::OBJECT_READ_SIZE
            );
            return None;
        }

        let name = read_cstring(data, offsets::OBJECT_NAME, offsets::OBJECT_NAME_MAX_LEN);
        let kind = data[offsets::OBJECT_KIND];
        let position = Vec3::new(
            read_f32(data, offsets::OBJECT_POSITION),
            read_f32(data, offsets::OBJECT_POSITION + 4),
            read_f32(data, offsets::OBJECT_POSITION + 8),
        );
        let render_flags = read_i32(data, offsets::OBJECT_RENDER_FLAGS);
        let model_id = read_i32(data, offsets::CHARACTER_MODEL_CHARA_ID);
        let secondary = read_i32(data, offsets::CHARACTER_MODEL_CHARA_ID_2);

        trace!(
            "object 0x{:X}: kind={} name=\"{}\" pos={} flags={} model={}/{}",
            address,
            kind,
            name,
            position,
            render_flags,
            model_id,
            secondary
        );

        Some(GameObject {
            address,
            name,
            kind,
            position,
            render_flags,
            model_id,
            secondary_model_id: (secondary != MODEL_ID_UNSET).then_some(secondary),
        })
    }

    /// Address of the name buffer inside the client's copy of this object.
    pub fn name_address(&self) -> usize {
        self.address + offsets::OBJECT_NAME
    }

    pub fn is_character(&self) -> bool {
        matches!(
            self.kind,
            offsets::KIND_PC
                | offsets::KIND_BATTLE_NPC
                | offsets::KIND_EVENT_NPC
                | offsets::KIND_COMPANION
                | offsets::KIND_RETAINER
        )
    }

    /// The model id the allow-list is matched against: the secondary id
    /// when the client has set one, the primary id otherwise.
    pub fn type_discriminant(&self) -> i32 {
        self.secondary_model_id.unwrap_or(self.model_id)
    }

    pub fn is_visible(&self) -> bool {
        self.render_flags == 0
    }

    pub fn is_nameless(&self) -> bool {
        self.name.trim().is_empty()
    }

    pub fn distance_to(&self, reference: Vec3) -> f32 {
        self.position.distance(reference)
    }
}

// ─── Object table scan ──────────────────────────────────────────────

/// Copy every slot of the object table. Null or unreadable slots come back
/// as `None`; only a failure to read the slot array itself is an error.
pub fn scan_object_table(memory: &dyn ProcessMemory) -> io::Result<Vec<Option<GameObject>>> {
    let base = memory.module_base()?;
    let table_size = offsets::OBJECT_TABLE_SIZE * offsets::POINTER_SIZE;
    let table = memory.read_exact(base + offsets::OBJECT_TABLE, table_size)?;

    let slots = table
        .chunks_exact(offsets::POINTER_SIZE)
        .map(|raw| {
            let address = read_u64(raw, 0) as usize;
            if !is_valid_ptr(address) {
                return None;
            }
            match memory.read_memory(address, offsets::OBJECT_READ_SIZE) {
                Ok(data) => GameObject::from_raw_bytes(address, &data),
                Err(e) => {
                    debug!("object 0x{:X}: read failed: {}", address, e);
                    None
                }
            }
        })
        .collect::<Vec<_>>();

    trace!(
        "object table: {} of {} slots populated",
        slots.iter().filter(|s| s.is_some()).count(),
        slots.len()
    );
    Ok(slots)
}

/// Read a single object by address, as for the current target.
pub fn read_object(memory: &dyn ProcessMemory, address: usize) -> Option<GameObject> {
    let data = memory.read_memory(address, offsets::OBJECT_READ_SIZE).ok()?;
    GameObject::from_raw_bytes(address, &data)
}

// ─── Helpers ────────────────────────────────────────────────────────

fn read_u64(data: &[u8], offset: usize) -> u64 {
    data.get(offset..offset + 8)
        .and_then(|s| s.try_into().ok())
        .map(u64::from_le_bytes)
        .unwrap_or(0)
}

fn read_i32(data: &[u8], offset: usize) -> i32 {
    data.get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .map(i32::from_le_bytes)
        .unwrap_or(0)
}

fn read_f32(data: &[u8], offset: usize) -> f32 {
    data.get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .map(f32::from_le_bytes)
        .unwrap_or(0.0)
}

pub(crate) fn read_cstring(data: &[u8], offset: usize, max_len: usize) -> String {
    if offset >= data.len() {
        return String::new();
    }
    let end = (offset + max_len).min(data.len());
    let slice = &data[offset..end];
    let null_pos = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
    String::from_utf8_lossy(&slice[..null_pos]).into_owned()
}
