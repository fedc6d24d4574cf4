use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: unit / trial / factor id → Color32
// ---------------------------------------------------------------------------

/// Maps a set of integer ids to distinct colours.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<i64, Color32>,
}

impl ColorMap {
    /// Build a colour map over the given ids.
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        let ids: Vec<i64> = ids.into_iter().collect();
        let palette = generate_palette(ids.len());
        ColorMap {
            mapping: ids.into_iter().zip(palette).collect(),
        }
    }

    /// Look up the colour for an id; unknown ids are grey.
    pub fn color_for(&self, id: i64) -> Color32 {
        self.mapping.get(&id).copied().unwrap_or(Color32::GRAY)
    }
}
