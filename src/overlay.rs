use log::{debug, warn};
use std::collections::HashMap;
use std::io;

use crate::config::RadarConfig;
use crate::entity::GameObject;
use crate::filter::TargetFilter;
use crate::host::HostState;
use crate::marker::{ChannelKind, MapAgent, MarkerChannel};

/// Markers written per channel in the last tick. `None` = channel skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub full_map: Option<usize>,
    pub mini_map: Option<usize>,
}

/// Puts the radar targets on the client's map and minimap once per tick.
pub struct OverlayController {
    channels: [MarkerChannel; 2],
}

impl OverlayController {
    pub fn new(default_counts: HashMap<u32, u8>) -> Self {
        Self {
            channels: [
                MarkerChannel::full_map(default_counts),
                MarkerChannel::mini_map(),
            ],
        }
    }

    pub fn tick(
        &mut self,
        host: &HostState,
        slots: &[Option<GameObject>],
        config: &RadarConfig,
        agent: &mut dyn MapAgent,
    ) -> TickReport {
        let mut report = TickReport::default();
        if host.local_player.is_none() {
            return report;
        }

        let targets = TargetFilter::from_config(config).apply(slots);
        let icon_id = config.icon_id();
        let text_position = config.text_position();

        for channel in &mut self.channels {
            let kind = channel.kind();
            let drawn = draw_channel(
                channel,
                host,
                &targets,
                agent,
                icon_id,
                config.map_icon_scale,
                text_position,
            );
            match drawn {
                Ok(Some(written)) => {
                    debug!("{}: wrote {} of {} targets", kind.label(), written, targets.len());
                    match kind {
                        ChannelKind::FullMap => report.full_map = Some(written),
                        ChannelKind::MiniMap => report.mini_map = Some(written),
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("{} markers skipped this tick: {}", kind.label(), e),
            }
        }
        report
    }

    /// Clear our markers from both channels right away.
    pub fn reset(&mut self, host: &HostState, agent: &mut dyn MapAgent) {
        for channel in &mut self.channels {
            if let Err(e) = channel.reset(host, agent) {
                warn!("{} reset failed: {}", channel.kind().label(), e);
            }
        }
    }
}

fn draw_channel(
    channel: &mut MarkerChannel,
    host: &HostState,
    targets: &[&GameObject],
    agent: &mut dyn MapAgent,
    icon_id: u32,
    scale: i32,
    text_position: u8,
) -> io::Result<Option<usize>> {
    if !channel.begin(host, agent)? {
        return Ok(None);
    }
    let mut written = 0;
    for obj in targets.iter().take(channel.available()) {
        if !channel.write_marker(agent, obj, icon_id, scale, 0, text_position)? {
            break;
        }
        written += 1;
    }
    if written < targets.len() {
        debug!(
            "{} full at {} markers, {} targets left out",
            channel.kind().label(),
            channel.count(),
            targets.len() - written
        );
    }
    channel.end(agent)?;
    Ok(Some(written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{character, host_on_map, FakeAgent};

    fn controller() -> OverlayController {
        OverlayController::new(HashMap::from([(10, 4), (20, 0)]))
    }

    fn namazu(count: usize) -> Vec<Option<GameObject>> {
        (0..count)
            .map(|i| Some(character(&format!("Namazu {}", i), 1793, [i as f32, 0.0, 0.0])))
            .collect()
    }

    #[test]
    fn empty_table_still_signals_redraw() {
        let mut agent = FakeAgent::default();
        let report = controller().tick(&host_on_map(10), &[], &RadarConfig::default(), &mut agent);
        assert_eq!(
            report,
            TickReport {
                full_map: Some(0),
                mini_map: Some(0)
            }
        );
        assert!(agent.full_writes.is_empty());
        assert!(agent.mini_writes.is_empty());
        assert_eq!(agent.full_count, 4);
        assert_ne!(agent.flags & ChannelKind::FullMap.redraw_flag(), 0);
        assert_ne!(agent.flags & ChannelKind::MiniMap.redraw_flag(), 0);
    }

    #[test]
    fn overflow_is_skipped_silently() {
        let mut agent = FakeAgent::default();
        let slots = namazu(150);
        let report = controller().tick(&host_on_map(20), &slots, &RadarConfig::default(), &mut agent);

        assert_eq!(report.full_map, Some(132));
        assert_eq!(report.mini_map, Some(100));
        let slots_written: Vec<usize> = agent.full_writes.iter().map(|(s, _)| *s).collect();
        assert_eq!(slots_written, (0..132).collect::<Vec<_>>());
        assert_eq!(agent.full_count, 132);
        assert_eq!(agent.mini_count, 100);
    }

    #[test]
    fn both_channels_get_the_same_targets() {
        let mut agent = FakeAgent::default();
        let mut slots = namazu(3);
        slots.push(Some(character("Stranger", 42, [0.0; 3])));
        slots.push(None);
        let report = controller().tick(&host_on_map(10), &slots, &RadarConfig::default(), &mut agent);

        assert_eq!(report.full_map, Some(3));
        assert_eq!(report.mini_map, Some(3));
        let full: Vec<i16> = agent.full_writes.iter().map(|(_, r)| r.x).collect();
        let mini: Vec<i16> = agent.mini_writes.iter().map(|(_, r)| r.x).collect();
        assert_eq!(full, vec![0, 16, 32]);
        assert_eq!(full, mini);
        assert!(agent.full_writes.iter().all(|(_, r)| r.icon_id == 60421 && r.subtext_orientation == 3));
    }

    #[test]
    fn unknown_map_skips_only_the_full_map() {
        let mut agent = FakeAgent::default();
        let report = controller().tick(&host_on_map(99), &namazu(2), &RadarConfig::default(), &mut agent);
        assert_eq!(report.full_map, None);
        assert_eq!(report.mini_map, Some(2));
        assert_eq!(agent.flags & ChannelKind::FullMap.redraw_flag(), 0);
    }

    #[test]
    fn no_local_player_writes_nothing() {
        let mut agent = FakeAgent::default();
        let mut host = host_on_map(10);
        host.local_player = None;
        let report = controller().tick(&host, &namazu(2), &RadarConfig::default(), &mut agent);
        assert_eq!(report, TickReport::default());
        assert_eq!(agent.flags, 0);
    }

    #[test]
    fn map_change_flag_follows_map_transitions() {
        let mut agent = FakeAgent::default();
        let mut overlay = controller();
        let config = RadarConfig::default();
        let changed = ChannelKind::FullMap.map_changed_flag();

        overlay.tick(&host_on_map(10), &[], &config, &mut agent);
        assert_ne!(agent.take_flags() & changed, 0);
        overlay.tick(&host_on_map(20), &[], &config, &mut agent);
        assert_ne!(agent.take_flags() & changed, 0);
        overlay.tick(&host_on_map(20), &[], &config, &mut agent);
        assert_eq!(agent.take_flags() & changed, 0);
    }

    #[test]
    fn write_failure_skips_channel_without_panicking() {
        let mut agent = FakeAgent::default();
        agent.fail_writes = true;
        let report = controller().tick(&host_on_map(10), &namazu(2), &RadarConfig::default(), &mut agent);
        assert_eq!(report, TickReport::default());
    }

    #[test]
    fn icon_settings_flow_into_records() {
        let mut agent = FakeAgent::default();
        let config = RadarConfig {
            map_icon_id: 60001,
            map_icon_scale: 150,
            map_icon_text: false,
            ..RadarConfig::default()
        };
        controller().tick(&host_on_map(10), &namazu(1), &config, &mut agent);
        let (_, record) = &agent.full_writes[0];
        assert_eq!(record.icon_id, 60001);
        assert_eq!(record.scale, 150);
        assert_eq!(record.subtext_orientation, 0);
    }

    #[test]
    fn reset_clears_both_channels() {
        let mut agent = FakeAgent::default();
        let mut overlay = controller();
        let host = host_on_map(10);
        overlay.tick(&host, &namazu(5), &RadarConfig::default(), &mut agent);
        agent.take_flags();

        overlay.reset(&host, &mut agent);
        assert_eq!(agent.full_count, 4);
        assert_eq!(
            agent.take_flags(),
            ChannelKind::FullMap.map_changed_flag() | ChannelKind::MiniMap.map_changed_flag()
        );
    }
}
