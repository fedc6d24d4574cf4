use std::collections::BTreeMap;

use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, MarkerShape, Plot, PlotPoints, Points};

use multitrial_raster::SlicingMode;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Raster plot (central panel)
// ---------------------------------------------------------------------------

/// Render the sliced raster: one row of spike marks per trial or neuron,
/// at y = that row's id.
pub fn raster_plot(ui: &mut Ui, state: &AppState) {
    if state.raster.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a raster to preview it  (File → Open…)");
        });
        return;
    }

    let row_kind = match state.mode {
        SlicingMode::ByNeuron => "Trial",
        SlicingMode::ByTrial => "Neuron",
    };

    // Group points by colour so each colour is one plot item.
    let mut groups: BTreeMap<i64, Vec<[f64; 2]>> = BTreeMap::new();
    for row in &state.rows {
        let y = row.index_id as f64;
        for (&t, &factor) in row.times.iter().zip(&row.factors) {
            let key = if state.color_by_factor { factor } else { row.index_id };
            groups.entry(key).or_default().push([t, y]);
        }
    }

    let mut plot = Plot::new("raster_plot")
        .x_axis_label("Time (s)")
        .y_axis_label(row_kind)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if state.color_by_factor {
        plot = plot.legend(Legend::default());
    }

    plot.show(ui, |plot_ui| {
        for (key, points) in groups {
            let (color, name) = if state.color_by_factor {
                (state.factor_colors.color_for(key), format!("factor {key}"))
            } else {
                (state.id_colors.color_for(key), format!("{row_kind} {key}"))
            };

            let series = Points::new(PlotPoints::from(points))
                .name(name)
                .color(color)
                .shape(MarkerShape::Circle)
                .filled(true)
                .radius(2.0);
            plot_ui.points(series);
        }

        if state.rows.iter().all(|r| r.times.is_empty()) {
            let (t0, _) = state.tensor.time_range().unwrap_or((0.0, 0.0));
            plot_ui.text(
                egui_plot::Text::new(
                    egui_plot::PlotPoint::new(t0, 0.0),
                    "no spikes in this slice",
                )
                .color(Color32::GRAY),
            );
        }
    });
}
