//! Figure layer: hand named arrays to a rendering service, get a URL back.
//!
//! ```text
//!   BTreeMap<name, &NumericArray>   +  view identifier
//!        │
//!        ▼
//!   ┌──────────────────┐
//!   │ RenderingService │  serialize, store content-addressed
//!   └──────────────────┘
//!        │  FigureHandle
//!        ▼
//!   ┌──────────────────┐
//!   │   url(label)     │  https://figurl.org/f?v=...&d=...&label=...
//!   └──────────────────┘
//! ```

use std::collections::BTreeMap;

use crate::data::array::NumericArray;
use crate::error::Result;

pub mod figurl;

/// Named arrays making up one figure's payload.  Ordered so serialization is
/// canonical.
pub type FigureData<'a> = BTreeMap<&'a str, &'a NumericArray>;

/// Something that can turn a view identifier plus data into a figure.
pub trait RenderingService {
    type Figure: FigureHandle;

    fn construct_figure(&self, view_url: &str, data: &FigureData<'_>) -> Result<Self::Figure>;
}

/// A constructed, data-backed figure.
pub trait FigureHandle {
    /// Shareable URL for this figure, displayed under `label`.
    fn url(&self, label: &str) -> Result<String>;
}
