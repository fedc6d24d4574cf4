use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use multitrial_raster::data::table::load_raster_file;
use multitrial_raster::{
    AnyLoader, Config, DataLoader, FigurlService, GatewayLoader, MultitrialRaster, StoreLoader,
};

const EXAMPLE_SPIKE_TIME: &str =
    "ipfs://bafybeib4qcvuvhlbyiztnwxsd6jz4cg2esdhm5x4pwm62lncmqnu7ssmm4?label=spike_time.npy";
const EXAMPLE_TRIAL_IDX: &str =
    "ipfs://bafybeif5diuwh4esl7klhqidb2ydzk34uiap2k542xo7vaykuxd2mmbfmu?label=trial_idx.npy";
const EXAMPLE_NEURON_IDX: &str =
    "ipfs://bafybeie4lhu53hzoouyedzoqixm7ozptm63gz6ntpd5okifvwwjv346o34?label=neuron_idx.npy";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Load spike raster arrays and print a shareable figure URL"
)]
struct Args {
    /// Locator of the spike time array
    #[arg(long, default_value = EXAMPLE_SPIKE_TIME)]
    spike_time: String,

    /// Locator of the trial index array
    #[arg(long, default_value = EXAMPLE_TRIAL_IDX)]
    trial_idx: String,

    /// Locator of the neuron index array
    #[arg(long, default_value = EXAMPLE_NEURON_IDX)]
    neuron_idx: String,

    /// Locator of an optional per-spike factor index array
    #[arg(long)]
    factor_idx: Option<String>,

    /// Read the raster from a local table instead of locators
    #[arg(long, conflicts_with_all = ["spike_time", "trial_idx", "neuron_idx", "factor_idx"])]
    table: Option<PathBuf>,

    /// Label shown with the figure
    #[arg(short, long, default_value = "Multi-trial raster")]
    label: String,

    /// JSON config file; environment variables still take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::from_env(),
    };
    log::debug!("{config:?}");

    let raster = match &args.table {
        Some(path) => {
            load_raster_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => load_from_locators(&args, &config)?,
    };

    if let Some((lo, hi)) = raster.spike_time().min_max() {
        println!("{lo} {hi}");
    }
    if let Some(lengths) = raster.length_mismatch() {
        log::warn!("array lengths differ: {lengths:?}");
    }

    let service = FigurlService::from_config(&config);
    let url = raster
        .url(&service, &args.label)
        .context("producing figure URL")?;
    println!("{url}");
    Ok(())
}

fn load_from_locators(args: &Args, config: &Config) -> Result<MultitrialRaster> {
    let mut gateway = GatewayLoader::new(&config.ipfs_gateway);
    if let Some(dir) = &config.cache_dir {
        gateway = gateway.with_cache_dir(dir);
    }
    let loader = AnyLoader {
        gateway,
        store: StoreLoader::local(&config.store_dir),
    };

    println!("Loading data...");
    let load = |uri: &str| loader.load(uri).with_context(|| format!("loading {uri}"));

    let raster = MultitrialRaster::new(
        load(&args.spike_time)?,
        load(&args.trial_idx)?,
        load(&args.neuron_idx)?,
    );
    Ok(match &args.factor_idx {
        Some(uri) => raster.with_factor_idx(load(uri)?),
        None => raster,
    })
}
