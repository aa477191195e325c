use glam::Vec3;
use imgui::{Condition, TableColumnFlags, TableColumnSetup, TableFlags};

use crate::clipboard::ClipboardHelper;
use crate::config::RadarConfig;
use crate::entity::GameObject;
use crate::filter;
use crate::host::HostState;

#[derive(Default)]
pub struct RadarUiState {
    pub allow_list_editor_open: bool,
    pub model_id_input: String,
}

fn fixed_column(name: &str) -> TableColumnSetup<&str> {
    TableColumnSetup {
        flags: TableColumnFlags::WIDTH_FIXED,
        ..TableColumnSetup::new(name)
    }
}

// ─── Radar window ────────────────────────────────────────────────────

/// Draw the target table and its settings. Returns true when map drawing
/// was switched on or off, so the caller can clear markers right away.
pub fn draw_radar_window(
    ui: &imgui::Ui,
    config: &mut RadarConfig,
    ui_state: &mut RadarUiState,
    host: Option<&HostState>,
    objects: &[Option<GameObject>],
    clipboard: &mut Option<ClipboardHelper>,
) -> bool {
    if !config.window_visible {
        return false;
    }

    let mut draw_toggled = false;
    let mut opened = true;
    ui.window("NamazuRadar")
        .size([600.0, 350.0], Condition::FirstUseEver)
        .opened(&mut opened)
        .build(|| {
            ui.set_next_item_width(250.0);
            ui.input_text("Filter##NamazuFilter", &mut config.filter_string)
                .build();
            ui.same_line();
            ui.checkbox("IncludeNameless", &mut config.include_nameless);
            ui.same_line();
            if ui.button("Config##ModelCharaConfigButton") {
                ui_state.allow_list_editor_open = !ui_state.allow_list_editor_open;
            }

            ui.checkbox("HideInvisible", &mut config.hide_invisible);
            ui.same_line();
            ui.checkbox("SortByDistance", &mut config.sort_by_distance);
            ui.same_line();
            if ui.checkbox("DrawOnMap", &mut config.draw_on_map) {
                draw_toggled = true;
            }

            if config.draw_on_map {
                ui.set_next_item_width(100.0);
                ui.input_int("Icon", &mut config.map_icon_id)
                    .step(1)
                    .step_fast(1)
                    .build();
                ui.same_line();
                ui.set_next_item_width(100.0);
                imgui::Drag::new("Scale")
                    .range(0, 1000)
                    .speed(1.0)
                    .build(ui, &mut config.map_icon_scale);
                if ui.is_item_hovered() {
                    ui.tooltip_text("0 = Default Scale");
                }
                ui.same_line();
                ui.checkbox("Name", &mut config.map_icon_text);
            }
            ui.separator();

            let Some(host) = host else {
                ui.text_disabled("Attach to the game client to scan for targets.");
                return;
            };
            draw_target_table(ui, config, host, objects, clipboard);
        });

    if !opened {
        config.window_visible = false;
    }
    draw_toggled
}

fn draw_target_table(
    ui: &imgui::Ui,
    config: &RadarConfig,
    host: &HostState,
    objects: &[Option<GameObject>],
    clipboard: &mut Option<ClipboardHelper>,
) {
    let columns = if config.hide_invisible { 3 } else { 4 };
    let Some(_table) = ui.begin_table_with_flags(
        "##NamazuTable",
        columns,
        TableFlags::ROW_BG | TableFlags::SCROLL_Y,
    ) else {
        return;
    };

    ui.table_setup_scroll_freeze(0, 1);
    ui.table_setup_column_with(fixed_column("Name"));
    ui.table_setup_column_with(fixed_column("Position"));
    ui.table_setup_column_with(fixed_column("Distance"));
    if !config.hide_invisible {
        ui.table_setup_column_with(fixed_column("Visible"));
    }
    ui.table_headers_row();

    let Some(player) = host.local_player else {
        return;
    };
    // A zero size factor means the map agent has no map loaded yet.
    let projection = (host.projection.size_factor != 0).then_some(host.projection);

    for (row, obj) in filter::radar_entries(objects, config, player).into_iter().enumerate() {
        ui.table_next_column();
        ui.text(&obj.name);

        ui.table_next_column();
        match projection.map(|p| p.project(obj.position, true)) {
            Some(pos) => {
                ui.text(format!("{:.1} {:.1}", pos.x, pos.y));
                let popup_id = format!("##position_ctx_{}", row);
                if ui.is_item_hovered() && ui.is_mouse_released(imgui::MouseButton::Right) {
                    ui.open_popup(&popup_id);
                }
                if let Some(_popup) = ui.begin_popup(&popup_id) {
                    if ui.selectable("Copy Position") {
                        if let Some(cb) = clipboard.as_mut() {
                            cb.copy_map_position(&obj.name, pos);
                        }
                    }
                }
            }
            None => ui.text_disabled("-"),
        }

        ui.table_next_column();
        ui.text(format!("{:.2}", obj.distance_to(player)));

        if !config.hide_invisible {
            ui.table_next_column();
            ui.text(if obj.is_visible() { "Yes" } else { "No" });
        }
    }
}

// ─── Allow-list editor ──────────────────────────────────────────────

pub fn draw_allow_list_editor(
    ui: &imgui::Ui,
    config: &mut RadarConfig,
    ui_state: &mut RadarUiState,
    target_model_id: Option<i32>,
) {
    if !ui_state.allow_list_editor_open {
        return;
    }

    let mut opened = true;
    ui.window("Edit ModelChara Filter")
        .size([400.0, 300.0], Condition::FirstUseEver)
        .opened(&mut opened)
        .build(|| {
            ui.set_next_item_width(150.0);
            ui.input_text("ModelChara Id##ModelCharaInput", &mut ui_state.model_id_input)
                .chars_decimal(true)
                .build();
            ui.same_line();
            if ui.button("Add##AddModelChara") {
                if let Some(id) = parse_model_id(&ui_state.model_id_input) {
                    config.allow_list.add(id);
                }
            }

            ui.text(format!("Current Target: {}", target_model_id.unwrap_or(-1)));
            ui.same_line();
            if ui.button("Add Target") {
                if let Some(id) = target_model_id.filter(|id| *id >= 0) {
                    config.allow_list.add(id);
                }
            }

            ui.separator();
            if config.allow_list.is_empty() {
                ui.text_disabled("No ids: the radar will list nothing.");
                return;
            }
            ui.text(format!("{} ids", config.allow_list.len()));
            let Some(_table) = ui.begin_table_with_flags(
                "##ModelCharaIdTable",
                2,
                TableFlags::ROW_BG | TableFlags::SCROLL_Y,
            ) else {
                return;
            };
            ui.table_setup_scroll_freeze(0, 1);
            ui.table_setup_column_with(fixed_column("Id"));
            ui.table_setup_column_with(fixed_column("##Buttons"));
            ui.table_headers_row();

            let ids: Vec<i32> = config.allow_list.iter().collect();
            for id in ids {
                ui.table_next_column();
                ui.text(id.to_string());

                ui.table_next_column();
                if ui.button(format!("Delete##delete{}", id)) {
                    config.allow_list.remove(id);
                }
            }
        });

    if !opened {
        ui_state.allow_list_editor_open = false;
    }
}

fn parse_model_id(input: &str) -> Option<i32> {
    input.trim().parse().ok()
}

/// Distance to the closest target, shown in the app bar.
pub fn nearest_distance(
    objects: &[Option<GameObject>],
    config: &RadarConfig,
    player: Vec3,
) -> Option<f32> {
    filter::TargetFilter::from_config(config)
        .apply(objects)
        .iter()
        .map(|obj| obj.distance_to(player))
        .min_by(|a, b| a.total_cmp(b))
}
