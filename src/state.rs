use std::path::{Path, PathBuf};

use multitrial_raster::{
    Config, FigurlService, MultitrialRaster, RasterRow, SlicingMode, SpikeTensor,
};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Loaded raster (None until user opens a file).
    pub raster: Option<MultitrialRaster>,

    /// Spikes grouped by neuron and trial.
    pub tensor: SpikeTensor,

    /// Where the raster was loaded from.
    pub source: Option<PathBuf>,

    /// Which axis is held fixed.
    pub mode: SlicingMode,

    pub selected_neuron: Option<i64>,
    pub selected_trial: Option<i64>,

    /// Rows of the current slice (cached).
    pub rows: Vec<RasterRow>,

    /// Colour spikes by factor instead of by row id.
    pub color_by_factor: bool,

    /// Colours per neuron / trial id.
    pub id_colors: ColorMap,

    /// Colours per factor id.
    pub factor_colors: ColorMap,

    /// Last URL produced by "Share".
    pub share_url: Option<String>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Ingest a newly loaded raster, build the tensor and select the first ids.
    pub fn set_raster(&mut self, raster: MultitrialRaster, source: &Path) {
        self.tensor = SpikeTensor::from_raster(&raster);
        self.selected_neuron = self.tensor.neuron_ids().first().copied();
        self.selected_trial = self.tensor.trial_ids().first().copied();

        let mut ids: Vec<i64> = self.tensor.neuron_ids().to_vec();
        ids.extend_from_slice(self.tensor.trial_ids());
        ids.sort_unstable();
        ids.dedup();
        self.id_colors = ColorMap::new(ids);

        let mut factors: Vec<i64> = raster
            .factor_idx()
            .map(|f| f.to_i64_vec())
            .unwrap_or_default();
        factors.sort_unstable();
        factors.dedup();
        self.color_by_factor = !factors.is_empty();
        self.factor_colors = ColorMap::new(factors);

        self.raster = Some(raster);
        self.source = Some(source.to_path_buf());
        self.share_url = None;
        self.status_message = None;
        self.reslice();
    }

    /// Id of the neuron or trial the current mode holds fixed.
    pub fn selected_id(&self) -> Option<i64> {
        match self.mode {
            SlicingMode::ByNeuron => self.selected_neuron,
            SlicingMode::ByTrial => self.selected_trial,
        }
    }

    /// Recompute `rows` after a mode or selection change.
    pub fn reslice(&mut self) {
        self.rows = match self.selected_id() {
            Some(id) => self.tensor.slice(self.mode, id),
            None => Vec::new(),
        };
    }

    pub fn set_mode(&mut self, mode: SlicingMode) {
        if self.mode != mode {
            self.mode = mode;
            self.reslice();
        }
    }

    pub fn select_neuron(&mut self, id: i64) {
        self.selected_neuron = Some(id);
        self.reslice();
    }

    pub fn select_trial(&mut self, id: i64) {
        self.selected_trial = Some(id);
        self.reslice();
    }

    /// Step the fixed id to the previous (`-1`) or next (`+1`) distinct id.
    pub fn step_selection(&mut self, delta: isize) {
        let (ids, current) = match self.mode {
            SlicingMode::ByNeuron => (self.tensor.neuron_ids(), self.selected_neuron),
            SlicingMode::ByTrial => (self.tensor.trial_ids(), self.selected_trial),
        };
        let Some(pos) = current.and_then(|c| ids.iter().position(|&id| id == c)) else {
            return;
        };
        let next = pos as isize + delta;
        if next < 0 || next as usize >= ids.len() {
            return;
        }
        let id = ids[next as usize];
        match self.mode {
            SlicingMode::ByNeuron => self.select_neuron(id),
            SlicingMode::ByTrial => self.select_trial(id),
        }
    }

    /// Produce a shareable URL for the loaded raster, labelled by file name.
    pub fn share(&mut self) {
        let Some(raster) = &self.raster else {
            return;
        };
        let label = self
            .source
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Multi-trial raster".to_string());

        let service = FigurlService::from_config(&Config::from_env());
        match raster.url(&service, &label) {
            Ok(url) => {
                self.share_url = Some(url);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to produce figure URL: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}
