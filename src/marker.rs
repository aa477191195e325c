use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::io;

use crate::entity::GameObject;
use crate::host::HostState;
use crate::offsets;

// ─── Channel variants ───────────────────────────────────────────────

/// The two marker arrays the map agent renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    FullMap,
    MiniMap,
}

impl ChannelKind {
    /// Allocated length of the client's array. Never write past it.
    pub const fn capacity(self) -> usize {
        match self {
            Self::FullMap => 132,
            Self::MiniMap => 100,
        }
    }

    pub const fn map_changed_flag(self) -> u32 {
        match self {
            Self::FullMap => 1 << 1,
            Self::MiniMap => 1 << 17,
        }
    }

    pub const fn redraw_flag(self) -> u32 {
        match self {
            Self::FullMap => 1 << 6,
            Self::MiniMap => 1 << 21,
        }
    }

    /// Size of one slot in the client's array.
    pub const fn stride(self) -> usize {
        match self {
            Self::FullMap => offsets::MAP_MARKER_INFO_SIZE,
            Self::MiniMap => offsets::MINI_MAP_MARKER_SIZE,
        }
    }

    /// Where the shared marker fields start inside one slot.
    pub const fn marker_base(self) -> usize {
        match self {
            Self::FullMap => offsets::MAP_MARKER_INFO_BASE,
            Self::MiniMap => offsets::MINI_MAP_MARKER_BASE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FullMap => "map",
            Self::MiniMap => "minimap",
        }
    }
}

// ─── Marker record ──────────────────────────────────────────────────

/// One icon on the map, in the client's native marker coordinates
/// (world units * 16).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRecord {
    pub x: i16,
    pub y: i16,
    pub icon_id: u32,
    pub index: u8,
    pub scale: i32,
    /// Address of a null-terminated name inside the client, 0 for none.
    pub subtext: usize,
    pub subtext_style: u8,
    pub subtext_orientation: u8,
}

impl MarkerRecord {
    pub fn for_object(
        obj: &GameObject,
        index: u8,
        icon_id: u32,
        scale: i32,
        subtext_style: u8,
        subtext_orientation: u8,
    ) -> Self {
        Self {
            x: to_marker_units(obj.position.x),
            y: to_marker_units(obj.position.z),
            icon_id,
            index,
            scale,
            subtext: if obj.is_nameless() { 0 } else { obj.name_address() },
            subtext_style,
            subtext_orientation,
        }
    }

    /// Encode one full slot for `kind`. Bytes outside the marker fields
    /// are zeroed.
    pub fn to_slot_bytes(&self, kind: ChannelKind) -> Vec<u8> {
        let mut slot = vec![0u8; kind.stride()];
        let base = kind.marker_base();
        slot[base + offsets::MARKER_SUBTEXT_ORIENTATION] = self.subtext_orientation;
        slot[base + offsets::MARKER_SUBTEXT_STYLE] = self.subtext_style;
        put(&mut slot, base + offsets::MARKER_ICON_ID, &self.icon_id.to_le_bytes());
        put(&mut slot, base + offsets::MARKER_SCALE, &self.scale.to_le_bytes());
        put(&mut slot, base + offsets::MARKER_SUBTEXT, &(self.subtext as u64).to_le_bytes());
        slot[base + offsets::MARKER_INDEX] = self.index;
        put(&mut slot, base + offsets::MARKER_X, &self.x.to_le_bytes());
        put(&mut slot, base + offsets::MARKER_Y, &self.y.to_le_bytes());
        slot
    }
}

fn to_marker_units(world: f32) -> i16 {
    // `as` saturates at the i16 bounds.
    (world * 16.0).round() as i16
}

fn put(slot: &mut [u8], offset: usize, bytes: &[u8]) {
    slot[offset..offset + bytes.len()].copy_from_slice(bytes);
}

// ─── Host sink ──────────────────────────────────────────────────────

/// The client's map agent as seen by a marker channel: a count field and a
/// fixed-length record array per channel, plus the shared update flags.
pub trait MapAgent {
    fn marker_count(&self, kind: ChannelKind) -> io::Result<u8>;
    fn set_marker_count(&mut self, kind: ChannelKind, count: u8) -> io::Result<()>;
    /// Implementations must reject `index >= kind.capacity()`.
    fn write_marker(&mut self, kind: ChannelKind, index: usize, record: &MarkerRecord)
        -> io::Result<()>;
    fn raise_update_flags(&mut self, flags: u32) -> io::Result<()>;
}

pub fn check_slot(kind: ChannelKind, index: usize) -> io::Result<()> {
    if index >= kind.capacity() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} marker slot {} out of range (capacity {})", kind.label(), index, kind.capacity()),
        ));
    }
    Ok(())
}

// ─── Marker channel ─────────────────────────────────────────────────

/// Drives one marker array through Begin / write / End each tick.
///
/// The full map keeps a table of the client's own marker count per map and
/// rewinds to it on every `begin`, so our markers always follow the
/// built-in ones. The minimap has no such baseline; raising its
/// map-changed flag makes the client rebuild it instead.
pub struct MarkerChannel {
    kind: ChannelKind,
    default_counts: HashMap<u32, u8>,
    last_map: u32,
    count: usize,
}

impl MarkerChannel {
    /// Baselines larger than the array are clamped to its capacity.
    pub fn full_map(mut default_counts: HashMap<u32, u8>) -> Self {
        let capacity = ChannelKind::FullMap.capacity() as u8;
        for (map_id, count) in default_counts.iter_mut() {
            if *count > capacity {
                warn!("map {} has {} default markers, clamping to {}", map_id, count, capacity);
                *count = capacity;
            }
        }
        Self {
            kind: ChannelKind::FullMap,
            default_counts,
            last_map: 0,
            count: 0,
        }
    }

    pub fn mini_map() -> Self {
        Self {
            kind: ChannelKind::MiniMap,
            default_counts: HashMap::new(),
            last_map: 0,
            count: 0,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn available(&self) -> usize {
        self.kind.capacity().saturating_sub(self.count)
    }

    fn clamp_to_capacity(&self, count: u8) -> u8 {
        let capacity = self.kind.capacity() as u8;
        if count > capacity {
            debug!("{}: host count {} clamped to {}", self.kind.label(), count, capacity);
        }
        count.min(capacity)
    }

    /// Returns false when the channel must be skipped this tick.
    pub fn begin(&mut self, host: &HostState, agent: &mut dyn MapAgent) -> io::Result<bool> {
        if host.local_player.is_none() {
            return Ok(false);
        }
        match self.kind {
            ChannelKind::FullMap => {
                if !host.agent_active {
                    return Ok(false);
                }
                let Some(&baseline) = self.default_counts.get(&host.current_map_id) else {
                    trace!("map {} has no default marker count, skipping", host.current_map_id);
                    return Ok(false);
                };
                agent.set_marker_count(self.kind, baseline)?;
                self.count = baseline as usize;
                if self.last_map != host.current_map_id {
                    info!(
                        "Map changed {} -> {} (baseline {} markers)",
                        self.last_map, host.current_map_id, baseline
                    );
                    agent.raise_update_flags(self.kind.map_changed_flag())?;
                    self.last_map = host.current_map_id;
                }
            }
            ChannelKind::MiniMap => {
                if !host.navi_map_visible {
                    return Ok(false);
                }
                let current = self.clamp_to_capacity(agent.marker_count(self.kind)?);
                self.count = current as usize;
                agent.raise_update_flags(self.kind.map_changed_flag())?;
            }
        }
        Ok(true)
    }

    /// Write one marker for `obj` in the next free slot. Returns false when
    /// the channel is full.
    pub fn write_marker(
        &mut self,
        agent: &mut dyn MapAgent,
        obj: &GameObject,
        icon_id: u32,
        scale: i32,
        subtext_style: u8,
        text_position: u8,
    ) -> io::Result<bool> {
        if self.count >= self.kind.capacity() {
            return Ok(false);
        }
        let index = self.count;
        let record =
            MarkerRecord::for_object(obj, index as u8, icon_id, scale, subtext_style, text_position);
        agent.write_marker(self.kind, index, &record)?;
        self.count += 1;
        agent.set_marker_count(self.kind, self.count as u8)?;
        trace!(
            "{} marker {} -> \"{}\" at ({}, {})",
            self.kind.label(),
            index,
            obj.name,
            record.x,
            record.y
        );
        Ok(true)
    }

    pub fn end(&mut self, agent: &mut dyn MapAgent) -> io::Result<()> {
        debug!("{}: {} markers after tick", self.kind.label(), self.count);
        agent.raise_update_flags(self.kind.redraw_flag())
    }

    /// Drop our markers right away, e.g. after drawing was switched off.
    pub fn reset(&mut self, host: &HostState, agent: &mut dyn MapAgent) -> io::Result<()> {
        if self.kind == ChannelKind::FullMap {
            if let Some(&baseline) = self.default_counts.get(&host.current_map_id) {
                agent.set_marker_count(self.kind, baseline)?;
                self.count = baseline as usize;
            }
        }
        info!("{} markers reset", self.kind.label());
        agent.raise_update_flags(self.kind.map_changed_flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_data::{MapMarkerData, MapMarkerRow, MapRow};
    use crate::testing::{character, host_on_map, FakeAgent};

    fn full_map_channel() -> MarkerChannel {
        MarkerChannel::full_map(HashMap::from([(10, 4), (20, 0)]))
    }

    #[test]
    fn record_uses_sixteenth_world_units() {
        let obj = character("Namazu", 1793, [10.5, 99.0, -3.0]);
        let record = MarkerRecord::for_object(&obj, 7, 60421, 0, 0, 3);
        assert_eq!(record.x, 168);
        assert_eq!(record.y, -48);
        assert_eq!(record.index, 7);
        assert_eq!(record.subtext, obj.name_address());

        let nameless = character(" ", 1793, [0.03, 0.0, -0.03]);
        let record = MarkerRecord::for_object(&nameless, 0, 60421, 0, 0, 3);
        assert_eq!((record.x, record.y), (0, 0));
        assert_eq!(record.subtext, 0);
    }

    #[test]
    fn far_positions_saturate() {
        let obj = character("edge", 1793, [5000.0, 0.0, -5000.0]);
        let record = MarkerRecord::for_object(&obj, 0, 1, 0, 0, 0);
        assert_eq!((record.x, record.y), (i16::MAX, i16::MIN));
    }

    #[test]
    fn slot_layout() {
        let record = MarkerRecord {
            x: -2,
            y: 300,
            icon_id: 60421,
            index: 5,
            scale: 100,
            subtext: 0x1_2345_6789,
            subtext_style: 1,
            subtext_orientation: 3,
        };

        let full = record.to_slot_bytes(ChannelKind::FullMap);
        assert_eq!(full.len(), offsets::MAP_MARKER_INFO_SIZE);
        assert_eq!(full[offsets::MARKER_SUBTEXT_ORIENTATION], 3);
        assert_eq!(full[offsets::MARKER_SUBTEXT_STYLE], 1);
        assert_eq!(&full[0x04..0x08], &60421u32.to_le_bytes());
        assert_eq!(&full[0x10..0x18], &0x1_2345_6789u64.to_le_bytes());
        assert_eq!(full[offsets::MARKER_INDEX], 5);
        assert_eq!(&full[0x1C..0x1E], &(-2i16).to_le_bytes());
        assert_eq!(&full[0x1E..0x20], &300i16.to_le_bytes());

        let mini = record.to_slot_bytes(ChannelKind::MiniMap);
        assert_eq!(mini.len(), offsets::MINI_MAP_MARKER_SIZE);
        assert!(mini[..offsets::MINI_MAP_MARKER_BASE].iter().all(|&b| b == 0));
        assert_eq!(mini[offsets::MINI_MAP_MARKER_BASE + offsets::MARKER_INDEX], 5);
    }

    #[test]
    fn begin_requires_local_player() {
        let mut agent = FakeAgent::default();
        let mut host = host_on_map(10);
        host.local_player = None;
        assert!(!full_map_channel().begin(&host, &mut agent).unwrap());
        assert!(!MarkerChannel::mini_map().begin(&host, &mut agent).unwrap());
        assert_eq!(agent.flags, 0);
    }

    #[test]
    fn full_map_begin_requires_active_agent_and_known_map() {
        let mut agent = FakeAgent::default();
        let mut channel = full_map_channel();

        let mut host = host_on_map(10);
        host.agent_active = false;
        assert!(!channel.begin(&host, &mut agent).unwrap());

        let host = host_on_map(99);
        assert!(!channel.begin(&host, &mut agent).unwrap());
        assert_eq!(agent.flags, 0);
        assert_eq!(agent.full_count, 0);
    }

    #[test]
    fn full_map_begin_rewinds_to_baseline() {
        let mut agent = FakeAgent::default();
        agent.full_count = 50;
        let mut channel = full_map_channel();
        assert!(channel.begin(&host_on_map(10), &mut agent).unwrap());
        assert_eq!(agent.full_count, 4);
        assert_eq!(channel.count(), 4);
        assert_eq!(channel.available(), 128);
    }

    #[test]
    fn map_changed_raised_only_on_transition() {
        let mut agent = FakeAgent::default();
        let mut channel = full_map_channel();
        let changed = ChannelKind::FullMap.map_changed_flag();

        assert!(channel.begin(&host_on_map(10), &mut agent).unwrap());
        assert_eq!(agent.take_flags() & changed, changed);

        assert!(channel.begin(&host_on_map(10), &mut agent).unwrap());
        assert_eq!(agent.take_flags() & changed, 0);

        assert!(channel.begin(&host_on_map(20), &mut agent).unwrap());
        assert_eq!(agent.take_flags() & changed, changed);

        assert!(channel.begin(&host_on_map(20), &mut agent).unwrap());
        assert_eq!(agent.take_flags() & changed, 0);
    }

    #[test]
    fn minimap_begin_keeps_count_and_requests_rebuild() {
        let mut agent = FakeAgent::default();
        agent.mini_count = 6;
        let mut channel = MarkerChannel::mini_map();

        let mut host = host_on_map(10);
        host.navi_map_visible = false;
        assert!(!channel.begin(&host, &mut agent).unwrap());

        host.navi_map_visible = true;
        host.agent_active = false;
        assert!(channel.begin(&host, &mut agent).unwrap());
        assert_eq!(agent.mini_count, 6);
        assert_eq!(channel.count(), 6);
        assert_eq!(agent.take_flags(), ChannelKind::MiniMap.map_changed_flag());
    }

    #[test]
    fn writes_land_at_consecutive_slots() {
        let mut agent = FakeAgent::default();
        let mut channel = full_map_channel();
        assert!(channel.begin(&host_on_map(10), &mut agent).unwrap());

        for i in 0..3 {
            let obj = character(&format!("n{}", i), 1793, [i as f32, 0.0, 0.0]);
            assert!(channel.write_marker(&mut agent, &obj, 60421, 0, 0, 3).unwrap());
        }
        let slots: Vec<usize> = agent.full_writes.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, vec![4, 5, 6]);
        assert!(agent.full_writes.iter().all(|(slot, r)| r.index as usize == *slot));
        assert_eq!(agent.full_count, 7);
    }

    #[test]
    fn count_never_exceeds_capacity() {
        for kind in [ChannelKind::FullMap, ChannelKind::MiniMap] {
            let mut agent = FakeAgent::default();
            let mut channel = match kind {
                ChannelKind::FullMap => MarkerChannel::full_map(HashMap::from([(10, 0)])),
                ChannelKind::MiniMap => MarkerChannel::mini_map(),
            };
            assert!(channel.begin(&host_on_map(10), &mut agent).unwrap());

            let obj = character("n", 1793, [0.0; 3]);
            let mut written = 0;
            for _ in 0..kind.capacity() + 25 {
                if channel.write_marker(&mut agent, &obj, 1, 0, 0, 0).unwrap() {
                    written += 1;
                }
                assert!(channel.count() <= kind.capacity());
            }
            assert_eq!(written, kind.capacity());
            assert_eq!(agent.count(kind) as usize, kind.capacity());
            assert_eq!(channel.available(), 0);
        }
    }

    #[test]
    fn oversized_baseline_is_clamped_to_capacity() {
        let data = MapMarkerData {
            maps: vec![MapRow {
                id: 10,
                marker_range: 5,
            }],
            markers: (0..200).map(|_| MapMarkerRow { range: 5 }).collect(),
        };
        let mut channel = MarkerChannel::full_map(data.default_counts());
        let mut agent = FakeAgent::default();

        assert!(channel.begin(&host_on_map(10), &mut agent).unwrap());
        assert_eq!(channel.count(), 132);
        assert_eq!(agent.full_count, 132);
        let obj = character("n", 1793, [0.0; 3]);
        assert!(!channel.write_marker(&mut agent, &obj, 1, 0, 0, 0).unwrap());
        assert!(agent.full_writes.is_empty());

        agent.full_count = 0;
        channel.reset(&host_on_map(10), &mut agent).unwrap();
        assert_eq!(agent.full_count, 132);
    }

    #[test]
    fn minimap_count_from_host_is_clamped_to_capacity() {
        let mut agent = FakeAgent {
            mini_count: 180,
            ..FakeAgent::default()
        };
        let mut channel = MarkerChannel::mini_map();
        assert!(channel.begin(&host_on_map(10), &mut agent).unwrap());
        assert_eq!(channel.count(), 100);
        assert_eq!(channel.available(), 0);
        let obj = character("n", 1793, [0.0; 3]);
        assert!(!channel.write_marker(&mut agent, &obj, 1, 0, 0, 0).unwrap());
        assert!(agent.mini_writes.is_empty());
    }

    #[test]
    fn end_raises_redraw_flag_per_channel() {
        let mut agent = FakeAgent::default();
        full_map_channel().end(&mut agent).unwrap();
        assert_eq!(agent.take_flags(), 1 << 6);
        MarkerChannel::mini_map().end(&mut agent).unwrap();
        assert_eq!(agent.take_flags(), 1 << 21);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut agent = FakeAgent::default();
        let mut channel = full_map_channel();
        let host = host_on_map(10);
        assert!(channel.begin(&host, &mut agent).unwrap());
        let obj = character("n", 1793, [0.0; 3]);
        channel.write_marker(&mut agent, &obj, 1, 0, 0, 3).unwrap();
        agent.take_flags();

        channel.reset(&host, &mut agent).unwrap();
        let once = agent.full_count;
        assert_eq!(agent.take_flags(), ChannelKind::FullMap.map_changed_flag());
        channel.reset(&host, &mut agent).unwrap();
        assert_eq!(agent.full_count, once);
        assert_eq!(once, 4);
        assert_eq!(agent.take_flags(), ChannelKind::FullMap.map_changed_flag());
    }

    #[test]
    fn reset_on_unknown_map_only_raises_flag() {
        let mut agent = FakeAgent::default();
        agent.full_count = 9;
        full_map_channel().reset(&host_on_map(77), &mut agent).unwrap();
        assert_eq!(agent.full_count, 9);
        assert_eq!(agent.take_flags(), ChannelKind::FullMap.map_changed_flag());

        MarkerChannel::mini_map().reset(&host_on_map(77), &mut agent).unwrap();
        assert_eq!(agent.take_flags(), ChannelKind::MiniMap.map_changed_flag());
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        assert!(check_slot(ChannelKind::MiniMap, 99).is_ok());
        let err = check_slot(ChannelKind::MiniMap, 100).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(check_slot(ChannelKind::FullMap, 131).is_ok());
        assert!(check_slot(ChannelKind::FullMap, 132).is_err());
    }
}
