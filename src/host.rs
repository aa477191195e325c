use glam::Vec3;
use log::{debug, trace};
use std::io;

use crate::entity::{self, read_cstring};
use crate::marker::{check_slot, ChannelKind, MapAgent, MarkerRecord};
use crate::memory::ProcessMemory;
use crate::offsets;
use crate::projection::MapProjection;

/// Everything a tick needs to know about the client, read once up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostState {
    pub local_player: Option<Vec3>,
    pub agent_address: Option<usize>,
    pub agent_active: bool,
    pub navi_map_visible: bool,
    pub current_map_id: u32,
    pub projection: MapProjection,
    /// Model id of the current target, if it is a character.
    pub target_model_id: Option<i32>,
}

pub fn read_host_state(memory: &dyn ProcessMemory) -> io::Result<HostState> {
    let base = memory.module_base()?;
    let mut state = HostState::default();

    if let Some(player) = memory.read_ptr(base + offsets::CONTROL_LOCAL_PLAYER)? {
        state.local_player = entity::read_object(memory, player).map(|obj| obj.position);
    }

    if let Some(target) = memory.read_ptr(base + offsets::TARGET_SYSTEM_CURRENT)? {
        state.target_model_id = entity::read_object(memory, target)
            .filter(|obj| obj.is_character())
            .map(|obj| obj.type_discriminant());
    }

    if let Some(agent) = memory.read_ptr(base + offsets::AGENT_MAP_PTR)? {
        state.agent_address = Some(agent);
        state.agent_active = memory.read_u32(agent + offsets::AGENT_ADDON_ID)? != 0;
        state.current_map_id = memory.read_u32(agent + offsets::AGENT_CURRENT_MAP_ID)?;
        state.projection = MapProjection {
            size_factor: memory.read_i16(agent + offsets::AGENT_CURRENT_SIZE_FACTOR)?,
            offset_x: memory.read_i16(agent + offsets::AGENT_CURRENT_OFFSET_X)?,
            offset_y: memory.read_i16(agent + offsets::AGENT_CURRENT_OFFSET_Y)?,
        };
    }

    state.navi_map_visible = match memory.read_ptr(base + offsets::ATK_UNIT_MANAGER)? {
        Some(manager) => addon_visible(memory, manager, offsets::NAVI_MAP_ADDON)?,
        None => false,
    };

    trace!(
        "host: player={:?} map={} active={} navimap={} projection={:?}",
        state.local_player,
        state.current_map_id,
        state.agent_active,
        state.navi_map_visible,
        state.projection
    );
    Ok(state)
}

/// Walk the loaded-addon list looking for `name` and report its visibility.
fn addon_visible(memory: &dyn ProcessMemory, manager: usize, name: &str) -> io::Result<bool> {
    let list = manager + offsets::UNIT_MANAGER_LOADED_LIST;
    let count = memory.read_exact(list + offsets::UNIT_LIST_COUNT, 2)?;
    let count = (u16::from_le_bytes([count[0], count[1]]) as usize).min(offsets::UNIT_LIST_CAPACITY);
    if count == 0 {
        return Ok(false);
    }

    let entries = memory.read_exact(list + offsets::UNIT_LIST_ENTRIES, count * offsets::POINTER_SIZE)?;
    for raw in entries.chunks_exact(offsets::POINTER_SIZE) {
        let mut ptr = [0u8; 8];
        ptr.copy_from_slice(raw);
        let unit = u64::from_le_bytes(ptr) as usize;
        if !crate::memory::is_valid_ptr(unit) {
            continue;
        }
        let Ok(raw_name) = memory.read_exact(unit + offsets::UNIT_NAME, offsets::UNIT_NAME_MAX_LEN)
        else {
            continue;
        };
        if read_cstring(&raw_name, 0, offsets::UNIT_NAME_MAX_LEN) == name {
            let flags = memory.read_u8(unit + offsets::UNIT_VISIBILITY_FLAGS)?;
            return Ok(flags & offsets::UNIT_VISIBLE_BIT != 0);
        }
    }
    debug!("addon {} not loaded", name);
    Ok(false)
}

// ─── Memory-backed map agent ────────────────────────────────────────

/// `MapAgent` over the client's AgentMap, written through process memory.
pub struct ProcessMapAgent<'a> {
    memory: &'a dyn ProcessMemory,
    agent: usize,
}

impl<'a> ProcessMapAgent<'a> {
    pub fn new(memory: &'a dyn ProcessMemory, agent: usize) -> Self {
        Self { memory, agent }
    }

    fn count_address(&self, kind: ChannelKind) -> usize {
        self.agent
            + match kind {
                ChannelKind::FullMap => offsets::AGENT_MAP_MARKER_COUNT,
                ChannelKind::MiniMap => offsets::AGENT_MINI_MAP_MARKER_COUNT,
            }
    }

    fn array_address(&self, kind: ChannelKind) -> usize {
        self.agent
            + match kind {
                ChannelKind::FullMap => offsets::AGENT_MAP_MARKER_INFO_ARRAY,
                ChannelKind::MiniMap => offsets::AGENT_MINI_MAP_MARKER_ARRAY,
            }
    }
}

impl MapAgent for ProcessMapAgent<'_> {
    fn marker_count(&self, kind: ChannelKind) -> io::Result<u8> {
        self.memory.read_u8(self.count_address(kind))
    }

    fn set_marker_count(&mut self, kind: ChannelKind, count: u8) -> io::Result<()> {
        self.memory.write_memory(self.count_address(kind), &[count])
    }

    fn write_marker(
        &mut self,
        kind: ChannelKind,
        index: usize,
        record: &MarkerRecord,
    ) -> io::Result<()> {
        check_slot(kind, index)?;
        let address = self.array_address(kind) + kind.stride() * index;
        self.memory.write_memory(address, &record.to_slot_bytes(kind))
    }

    fn raise_update_flags(&mut self, flags: u32) -> io::Result<()> {
        let address = self.agent + offsets::AGENT_UPDATE_FLAGS;
        let current = self.memory.read_u32(address)?;
        if current & flags == flags {
            return Ok(());
        }
        self.memory.write_memory(address, &(current | flags).to_le_bytes())
    }
}
