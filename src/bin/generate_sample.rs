use std::path::Path;

use anyhow::{Context, Result};

use multitrial_raster::MultitrialRaster;
use multitrial_raster::data::table::{write_raster_npy_dir, write_raster_parquet};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Exponential inter-spike interval for a Poisson process.
    fn exponential(&mut self, rate: f64) -> f64 {
        -(self.next_f64().max(1e-15)).ln() / rate
    }
}

/// Firing rate (Hz) of a neuron at time `t` within a trial, given which
/// response factor it belongs to.
fn rate(t: f64, factor: i64, baseline: f64) -> f64 {
    // Each factor peaks at a different latency after stimulus onset (t = 0.5 s).
    let latency = 0.6 + 0.25 * factor as f64;
    let bump = 40.0 * (-(t - latency).powi(2) / (2.0 * 0.05f64.powi(2))).exp();
    baseline + bump
}

/// Thinning (Lewis–Shedler) sampler of an inhomogeneous Poisson train on [0, duration).
fn spike_train(rng: &mut SimpleRng, factor: i64, baseline: f64, duration: f64) -> Vec<f64> {
    let max_rate = baseline + 40.0;
    let mut t = 0.0;
    let mut spikes = Vec::new();
    loop {
        t += rng.exponential(max_rate);
        if t >= duration {
            return spikes;
        }
        if rng.next_f64() * max_rate < rate(t, factor, baseline) {
            spikes.push(t);
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let n_neurons = 24;
    let n_trials = 40;
    let n_factors = 3;
    let duration = 2.0;

    let mut spike_time: Vec<f64> = Vec::new();
    let mut trial_idx: Vec<i64> = Vec::new();
    let mut neuron_idx: Vec<i64> = Vec::new();
    let mut factor_idx: Vec<i64> = Vec::new();

    for trial in 0..n_trials {
        for neuron in 0..n_neurons {
            let factor = neuron % n_factors;
            let baseline = 2.0 + (neuron % 5) as f64;
            for t in spike_train(&mut rng, factor, baseline, duration) {
                spike_time.push(t);
                trial_idx.push(trial);
                neuron_idx.push(neuron);
                factor_idx.push(factor);
            }
        }
    }

    let n_spikes = spike_time.len();
    let raster = MultitrialRaster::new(spike_time, trial_idx, neuron_idx).with_factor_idx(factor_idx);

    let parquet_path = Path::new("sample_raster.parquet");
    write_raster_parquet(&raster, parquet_path)
        .with_context(|| format!("writing {}", parquet_path.display()))?;

    let npy_dir = Path::new("sample_raster");
    write_raster_npy_dir(&raster, npy_dir)
        .with_context(|| format!("writing {}", npy_dir.display()))?;

    println!(
        "Wrote {n_spikes} spikes ({n_neurons} neurons × {n_trials} trials) to {} and {}/",
        parquet_path.display(),
        npy_dir.display()
    );
    Ok(())
}
