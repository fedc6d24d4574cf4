use std::collections::{BTreeMap, BTreeSet};

use crate::raster::MultitrialRaster;

// ---------------------------------------------------------------------------
// Spike tensor: neuron × trial → spike train
// ---------------------------------------------------------------------------

/// Which axis a raster view holds fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlicingMode {
    /// One neuron, a row per trial ("trials vs time").
    #[default]
    ByNeuron,
    /// One trial, a row per neuron ("neurons vs time").
    ByTrial,
}

impl SlicingMode {
    pub fn label(&self) -> &'static str {
        match self {
            SlicingMode::ByNeuron => "Trials vs Time",
            SlicingMode::ByTrial => "Neurons vs Time",
        }
    }
}

/// Spikes of one neuron in one trial, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpikeTrain {
    pub times: Vec<f64>,
    pub factors: Vec<i64>,
}

/// One row of a sliced raster: the trial id (slicing by neuron) or the
/// neuron id (slicing by trial) and its spikes.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterRow {
    pub index_id: i64,
    pub times: Vec<f64>,
    pub factors: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct SpikeTensor {
    trains: BTreeMap<i64, BTreeMap<i64, SpikeTrain>>,
    neuron_ids: Vec<i64>,
    trial_ids: Vec<i64>,
    time_range: Option<(f64, f64)>,
}

impl SpikeTensor {
    /// Group the raster's spikes by neuron and trial.
    ///
    /// Every (neuron, trial) pair of observed ids gets a train, possibly
    /// empty.  Spikes past the end of the shortest index array are dropped;
    /// a missing or short `factor_idx` reads as factor 0.
    pub fn from_raster(raster: &MultitrialRaster) -> Self {
        let times = raster.spike_time().to_f64_vec();
        let trials = raster.trial_idx().to_i64_vec();
        let neurons = raster.neuron_idx().to_i64_vec();
        let factors = raster
            .factor_idx()
            .map(|f| f.to_i64_vec())
            .unwrap_or_default();

        let n = times.len().min(trials.len()).min(neurons.len());
        if n < times.len().max(trials.len()).max(neurons.len()) {
            log::warn!("raster arrays differ in length; using the first {n} spikes");
        }

        let distinct = |ids: &[i64]| -> Vec<i64> {
            ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
        };
        let neuron_ids = distinct(&neurons[..n]);
        let trial_ids = distinct(&trials[..n]);

        let mut trains: BTreeMap<i64, BTreeMap<i64, SpikeTrain>> = neuron_ids
            .iter()
            .map(|&neuron| {
                let per_trial = trial_ids
                    .iter()
                    .map(|&trial| (trial, SpikeTrain::default()))
                    .collect();
                (neuron, per_trial)
            })
            .collect();

        let mut time_range: Option<(f64, f64)> = None;
        for i in 0..n {
            let t = times[i];
            if let Some(train) = trains
                .get_mut(&neurons[i])
                .and_then(|per_trial| per_trial.get_mut(&trials[i]))
            {
                train.times.push(t);
                train.factors.push(factors.get(i).copied().unwrap_or(0));
            }
            if !t.is_nan() {
                time_range = Some(match time_range {
                    None => (t, t),
                    Some((lo, hi)) => (lo.min(t), hi.max(t)),
                });
            }
        }

        Self {
            trains,
            neuron_ids,
            trial_ids,
            time_range,
        }
    }

    /// Sorted distinct neuron ids.
    pub fn neuron_ids(&self) -> &[i64] {
        &self.neuron_ids
    }

    /// Sorted distinct trial ids.
    pub fn trial_ids(&self) -> &[i64] {
        &self.trial_ids
    }

    /// Earliest and latest spike time.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.time_range
    }

    pub fn train(&self, neuron: i64, trial: i64) -> Option<&SpikeTrain> {
        self.trains.get(&neuron)?.get(&trial)
    }

    /// Rows for the given mode and selected id, sorted by row id.  An id
    /// that never occurs yields no rows.
    pub fn slice(&self, mode: SlicingMode, selected_id: i64) -> Vec<RasterRow> {
        let row = |index_id: i64, train: &SpikeTrain| RasterRow {
            index_id,
            times: train.times.clone(),
            factors: train.factors.clone(),
        };
        match mode {
            SlicingMode::ByNeuron => self
                .trains
                .get(&selected_id)
                .map(|per_trial| per_trial.iter().map(|(&t, train)| row(t, train)).collect())
                .unwrap_or_default(),
            SlicingMode::ByTrial => self
                .trains
                .iter()
                .filter_map(|(&neuron, per_trial)| {
                    per_trial.get(&selected_id).map(|train| row(neuron, train))
                })
                .collect(),
        }
    }
}
