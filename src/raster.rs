use std::collections::BTreeMap;

use crate::data::array::NumericArray;
use crate::error::Result;
use crate::figure::{FigureData, FigureHandle, RenderingService};

/// View implementation that renders multi-trial rasters.
pub const VIEW_URL: &str = "gs://figurl/multitrial-raster-1";

pub const SPIKE_TIME: &str = "spike_time";
pub const TRIAL_IDX: &str = "trial_idx";
pub const NEURON_IDX: &str = "neuron_idx";
pub const FACTOR_IDX: &str = "factor_idx";

// ---------------------------------------------------------------------------
// MultitrialRaster – the bundle handed to the rendering service
// ---------------------------------------------------------------------------

/// One multi-trial spike raster: an entry per spike in each array.
///
/// Array lengths are not checked.  Data normally comes from a controlled
/// pipeline; [`MultitrialRaster::length_mismatch`] reports disagreement when a
/// caller wants to know.
#[derive(Debug, Clone, PartialEq)]
pub struct MultitrialRaster {
    spike_time: NumericArray,
    trial_idx: NumericArray,
    neuron_idx: NumericArray,
    factor_idx: Option<NumericArray>,
}

impl MultitrialRaster {
    pub fn new(
        spike_time: impl Into<NumericArray>,
        trial_idx: impl Into<NumericArray>,
        neuron_idx: impl Into<NumericArray>,
    ) -> Self {
        Self {
            spike_time: spike_time.into(),
            trial_idx: trial_idx.into(),
            neuron_idx: neuron_idx.into(),
            factor_idx: None,
        }
    }

    /// Attach a per-spike grouping label (e.g. a decomposition factor).
    pub fn with_factor_idx(mut self, factor_idx: impl Into<NumericArray>) -> Self {
        self.factor_idx = Some(factor_idx.into());
        self
    }

    pub fn spike_time(&self) -> &NumericArray {
        &self.spike_time
    }

    pub fn trial_idx(&self) -> &NumericArray {
        &self.trial_idx
    }

    pub fn neuron_idx(&self) -> &NumericArray {
        &self.neuron_idx
    }

    pub fn factor_idx(&self) -> Option<&NumericArray> {
        self.factor_idx.as_ref()
    }

    /// Number of spikes, taken from `spike_time`.
    pub fn spike_count(&self) -> usize {
        self.spike_time.len()
    }

    /// Lengths of every array when they disagree, `None` when consistent.
    pub fn length_mismatch(&self) -> Option<BTreeMap<&str, usize>> {
        let lengths: BTreeMap<&str, usize> = self
            .figure_data()
            .into_iter()
            .map(|(name, arr)| (name, arr.len()))
            .collect();
        let first = self.spike_time.len();
        lengths.values().any(|&n| n != first).then_some(lengths)
    }

    /// The payload sent to the rendering service.  `factor_idx` is present
    /// only when the raster has one.
    pub fn figure_data(&self) -> FigureData<'_> {
        let mut data = FigureData::new();
        data.insert(SPIKE_TIME, &self.spike_time);
        data.insert(TRIAL_IDX, &self.trial_idx);
        data.insert(NEURON_IDX, &self.neuron_idx);
        if let Some(factor_idx) = &self.factor_idx {
            data.insert(FACTOR_IDX, factor_idx);
        }
        data
    }

    /// Build the figure for this raster and return its shareable URL.
    ///
    /// Whatever the service returns, URL or error, is handed back unchanged.
    pub fn url<R: RenderingService>(&self, service: &R, label: &str) -> Result<String> {
        let figure = service.construct_figure(VIEW_URL, &self.figure_data())?;
        figure.url(label)
    }
}
