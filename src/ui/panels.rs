use std::path::Path;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use multitrial_raster::SlicingMode;
use multitrial_raster::data::table::load_raster_file;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – slicing controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Raster");
    ui.separator();

    let Some(raster) = &state.raster else {
        ui.label("No raster loaded.");
        return;
    };

    ui.label(format!("{} spikes", raster.spike_count()));
    ui.label(format!(
        "{} neurons × {} trials",
        state.tensor.neuron_ids().len(),
        state.tensor.trial_ids().len()
    ));
    if let Some((lo, hi)) = state.tensor.time_range() {
        ui.label(format!("time {lo:.3} – {hi:.3} s"));
    }
    if let Some(lengths) = raster.length_mismatch() {
        ui.label(
            RichText::new(format!("array lengths differ: {lengths:?}")).color(Color32::YELLOW),
        );
    }
    let has_factors = raster.factor_idx().is_some();
    ui.separator();

    // Clone what we need so we can mutate state inside the closures.
    let neuron_ids = state.tensor.neuron_ids().to_vec();
    let trial_ids = state.tensor.trial_ids().to_vec();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Slicing mode ----
            ui.strong("Show");
            let mut mode = state.mode;
            for candidate in [SlicingMode::ByNeuron, SlicingMode::ByTrial] {
                ui.radio_value(&mut mode, candidate, candidate.label());
            }
            state.set_mode(mode);
            ui.separator();

            // ---- Selected ids ----
            ui.strong("Selected neuron");
            id_combo(ui, "neuron_select", &neuron_ids, state.selected_neuron, |id| {
                state.select_neuron(id)
            });
            ui.strong("Selected trial");
            id_combo(ui, "trial_select", &trial_ids, state.selected_trial, |id| {
                state.select_trial(id)
            });

            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("◀ Prev").clicked() {
                    state.step_selection(-1);
                }
                if ui.small_button("Next ▶").clicked() {
                    state.step_selection(1);
                }
            });
            ui.separator();

            ui.add_enabled(
                has_factors,
                egui::Checkbox::new(&mut state.color_by_factor, "Color by factor"),
            );
        });
}

/// Combo box over `ids`; calls `on_select` when the user picks a new one.
fn id_combo(
    ui: &mut Ui,
    salt: &str,
    ids: &[i64],
    current: Option<i64>,
    mut on_select: impl FnMut(i64),
) {
    let text = current.map(|id| id.to_string()).unwrap_or_default();
    egui::ComboBox::from_id_salt(salt)
        .selected_text(text)
        .show_ui(ui, |ui: &mut Ui| {
            for &id in ids {
                if ui
                    .selectable_label(current == Some(id), id.to_string())
                    .clicked()
                {
                    on_select(id);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open NPY folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(path) = &state.source {
            ui.label(format!("{} – {} rows", path.display(), state.rows.len()));
        }

        ui.separator();

        if ui
            .add_enabled(state.raster.is_some(), egui::Button::new("Share URL"))
            .clicked()
        {
            state.share();
        }

        if let Some(url) = state.share_url.clone() {
            ui.hyperlink_to("open figure", &url);
            if ui.small_button("Copy").clicked() {
                ui.ctx().copy_text(url);
            }
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open raster data")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        open_path(state, &path);
    }
}

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open folder of .npy arrays")
        .pick_folder();

    if let Some(path) = folder {
        open_path(state, &path);
    }
}

/// Load a raster table or npy folder into the state, reporting failures in
/// the status line.
pub fn open_path(state: &mut AppState, path: &Path) {
    match load_raster_file(path) {
        Ok(raster) => {
            log::info!(
                "Loaded {} spikes from {}",
                raster.spike_count(),
                path.display()
            );
            state.set_raster(raster, path);
        }
        Err(e) => {
            log::error!("Failed to load {}: {e}", path.display());
            state.status_message = Some(format!("Error: {e}"));
        }
    }
}
