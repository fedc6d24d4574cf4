//! Package multi-trial spike raster arrays into shareable figure URLs.
//!
//! ```no_run
//! use multitrial_raster::{Config, DataLoader, FigurlService, GatewayLoader, MultitrialRaster};
//!
//! # fn main() -> multitrial_raster::Result<()> {
//! let config = Config::from_env();
//! let loader = GatewayLoader::new(&config.ipfs_gateway);
//! let raster = MultitrialRaster::new(
//!     loader.load("ipfs://bafybeib4qcvuvhlbyiztnwxsd6jz4cg2esdhm5x4pwm62lncmqnu7ssmm4?label=spike_time.npy")?,
//!     loader.load("ipfs://bafybeif5diuwh4esl7klhqidb2ydzk34uiap2k542xo7vaykuxd2mmbfmu?label=trial_idx.npy")?,
//!     loader.load("ipfs://bafybeie4lhu53hzoouyedzoqixm7ozptm63gz6ntpd5okifvwwjv346o34?label=neuron_idx.npy")?,
//! );
//! let url = raster.url(&FigurlService::from_config(&config), "Multi-trial raster")?;
//! println!("{url}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod figure;
pub mod raster;
pub mod store;
pub mod tensor;

pub use config::Config;
pub use data::array::NumericArray;
pub use data::loader::{AnyLoader, DataLoader, GatewayLoader, StoreLoader};
pub use data::uri::{ContentUri, Scheme};
pub use error::{Error, Result};
pub use figure::figurl::{Figure, FigurlService};
pub use figure::{FigureData, FigureHandle, RenderingService};
pub use raster::{MultitrialRaster, VIEW_URL};
pub use store::{ContentStore, LocalStore, MemoryStore};
pub use tensor::{RasterRow, SlicingMode, SpikeTensor};
