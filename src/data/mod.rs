/// Data layer: arrays, locators, and the ways to load them.
///
/// Architecture:
/// ```text
///  ipfs://… / sha256://…          .parquet / .csv / .json / npy dir
///        │                                  │
///        ▼                                  ▼
///   ┌──────────┐                      ┌──────────┐
///   │  loader   │  fetch → npy        │  table    │  columns by name
///   └──────────┘                      └──────────┘
///        │                                  │
///        ▼                                  ▼
///   ┌──────────────┐               ┌──────────────────┐
///   │ NumericArray  │  ─────────▶  │ MultitrialRaster  │
///   └──────────────┘               └──────────────────┘
/// ```

pub mod array;
pub mod loader;
pub mod npy;
pub mod table;
pub mod uri;
