//! Fakes shared by the unit tests.

use glam::Vec3;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;

use crate::entity::GameObject;
use crate::host::HostState;
use crate::marker::{check_slot, ChannelKind, MapAgent, MarkerRecord};
use crate::memory::ProcessMemory;
use crate::offsets;
use crate::projection::MapProjection;

/// Raw bytes of one object record as the client lays it out.
pub fn raw_object(
    name: &str,
    kind: u8,
    position: [f32; 3],
    render_flags: i32,
    model_id: i32,
    secondary_model_id: i32,
) -> Vec<u8> {
    let mut data = vec![0u8; offsets::OBJECT_READ_SIZE];
    let name = &name.as_bytes()[..name.len().min(offsets::OBJECT_NAME_MAX_LEN - 1)];
    data[offsets::OBJECT_NAME..offsets::OBJECT_NAME + name.len()].copy_from_slice(name);
    data[offsets::OBJECT_KIND] = kind;
    for (i, axis) in position.iter().enumerate() {
        let at = offsets::OBJECT_POSITION + i * 4;
        data[at..at + 4].copy_from_slice(&axis.to_le_bytes());
    }
    let fields = [
        (offsets::OBJECT_RENDER_FLAGS, render_flags),
        (offsets::CHARACTER_MODEL_CHARA_ID, model_id),
        (offsets::CHARACTER_MODEL_CHARA_ID_2, secondary_model_id),
    ];
    for (at, value) in fields {
        data[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
    data
}

pub fn object(name: &str, kind: u8, model_id: i32, position: [f32; 3]) -> GameObject {
    GameObject {
        address: 0x2000_0000,
        name: name.to_string(),
        kind,
        position: Vec3::from_array(position),
        render_flags: 0,
        model_id,
        secondary_model_id: None,
    }
}

pub fn character(name: &str, model_id: i32, position: [f32; 3]) -> GameObject {
    object(name, offsets::KIND_BATTLE_NPC, model_id, position)
}

/// A client standing on `map_id` with both map views open.
pub fn host_on_map(map_id: u32) -> HostState {
    HostState {
        local_player: Some(Vec3::ZERO),
        agent_address: Some(0x2_0000_0000),
        agent_active: true,
        navi_map_visible: true,
        current_map_id: map_id,
        projection: MapProjection {
            size_factor: 100,
            offset_x: 0,
            offset_y: 0,
        },
        target_model_id: None,
    }
}

// ─── Fake map agent ─────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeAgent {
    pub full_count: u8,
    pub mini_count: u8,
    pub flags: u32,
    pub full_writes: Vec<(usize, MarkerRecord)>,
    pub mini_writes: Vec<(usize, MarkerRecord)>,
    pub fail_writes: bool,
}

impl FakeAgent {
    pub fn count(&self, kind: ChannelKind) -> u8 {
        match kind {
            ChannelKind::FullMap => self.full_count,
            ChannelKind::MiniMap => self.mini_count,
        }
    }

    pub fn take_flags(&mut self) -> u32 {
        std::mem::take(&mut self.flags)
    }
}

impl MapAgent for FakeAgent {
    fn marker_count(&self, kind: ChannelKind) -> io::Result<u8> {
        Ok(self.count(kind))
    }

    fn set_marker_count(&mut self, kind: ChannelKind, count: u8) -> io::Result<()> {
        match kind {
            ChannelKind::FullMap => self.full_count = count,
            ChannelKind::MiniMap => self.mini_count = count,
        }
        Ok(())
    }

    fn write_marker(
        &mut self,
        kind: ChannelKind,
        index: usize,
        record: &MarkerRecord,
    ) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "write refused"));
        }
        check_slot(kind, index)?;
        match kind {
            ChannelKind::FullMap => self.full_writes.push((index, record.clone())),
            ChannelKind::MiniMap => self.mini_writes.push((index, record.clone())),
        }
        Ok(())
    }

    fn raise_update_flags(&mut self, flags: u32) -> io::Result<()> {
        self.flags |= flags;
        Ok(())
    }
}

// ─── Fake process memory ────────────────────────────────────────────

/// Sparse byte-addressed memory; unset bytes read as zero.
pub struct FakeMemory {
    base: usize,
    bytes: RefCell<HashMap<usize, u8>>,
    writes: Cell<usize>,
}

impl FakeMemory {
    pub fn new(base: usize) -> Self {
        Self {
            base,
            bytes: RefCell::new(HashMap::new()),
            writes: Cell::new(0),
        }
    }

    pub fn put(&self, address: usize, data: &[u8]) {
        let mut bytes = self.bytes.borrow_mut();
        for (i, b) in data.iter().enumerate() {
            bytes.insert(address + i, *b);
        }
    }

    pub fn bytes(&self, address: usize, size: usize) -> Vec<u8> {
        let bytes = self.bytes.borrow();
        (0..size)
            .map(|i| bytes.get(&(address + i)).copied().unwrap_or(0))
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl ProcessMemory for FakeMemory {
    fn attach(&mut self, _pid: u32) -> io::Result<()> {
        Ok(())
    }

    fn read_memory(&self, address: usize, size: usize) -> io::Result<Vec<u8>> {
        Ok(self.bytes(address, size))
    }

    fn write_memory(&self, address: usize, data: &[u8]) -> io::Result<()> {
        self.writes.set(self.writes.get() + 1);
        self.put(address, data);
        Ok(())
    }

    fn detach(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn is_attached(&self) -> bool {
        true
    }

    fn module_base(&self) -> io::Result<usize> {
        Ok(self.base)
    }
}
