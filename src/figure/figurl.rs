use crate::config::Config;
use crate::data::uri::{ContentUri, percent_encode};
use crate::error::Result;
use crate::store::{ContentStore, LocalStore};

use super::{FigureData, FigureHandle, RenderingService};

pub const DEFAULT_BASE_URL: &str = "https://figurl.org";

// ---------------------------------------------------------------------------
// figurl-style service: payload → content store → URL
// ---------------------------------------------------------------------------

/// Serializes figure data to canonical JSON, stores it in `S`, and encodes the
/// resulting locator into a viewer URL.
#[derive(Debug)]
pub struct FigurlService<S> {
    store: S,
    base_url: String,
}

impl<S: ContentStore> FigurlService<S> {
    pub fn new(store: S) -> Self {
        Self::with_base_url(store, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(store: S, base_url: impl Into<String>) -> Self {
        Self {
            store,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl FigurlService<LocalStore> {
    /// Service backed by the local store and base URL from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::with_base_url(LocalStore::new(&config.store_dir), &config.figurl_base_url)
    }
}

/// Canonical payload bytes: compact JSON, keys sorted.
pub fn serialize_figure_data(data: &FigureData<'_>) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(data)?)
}

impl<S: ContentStore> RenderingService for FigurlService<S> {
    type Figure = Figure;

    fn construct_figure(&self, view_url: &str, data: &FigureData<'_>) -> Result<Figure> {
        let bytes = serialize_figure_data(data)?;
        let data_uri = self.store.store_bytes(&bytes)?;
        log::debug!(
            "stored {} byte payload for {view_url} as {data_uri}",
            bytes.len()
        );
        Ok(Figure {
            base_url: self.base_url.clone(),
            view_url: view_url.to_string(),
            data_uri,
        })
    }
}

/// Handle to a stored figure payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Figure {
    pub base_url: String,
    pub view_url: String,
    pub data_uri: ContentUri,
}

impl FigureHandle for Figure {
    fn url(&self, label: &str) -> Result<String> {
        let url = format!(
            "{}/f?v={}&d={}&label={}",
            self.base_url,
            self.view_url,
            self.data_uri.base(),
            percent_encode(label)
        );
        log::info!("figure URL: {url}");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::array::NumericArray;
    use crate::store::{MemoryStore, sha256_hex};

    #[test]
    fn url_embeds_view_locator_and_quoted_label() {
        let spikes = NumericArray::Float64(vec![0.1, 0.2]);
        let data: FigureData = [("spike_time", &spikes)].into_iter().collect();

        let service = FigurlService::new(MemoryStore::new());
        let figure = service
            .construct_figure("gs://figurl/multitrial-raster-1", &data)
            .unwrap();
        let url = figure.url("Multi-trial raster").unwrap();

        let expected_hash = sha256_hex(&serialize_figure_data(&data).unwrap());
        assert_eq!(
            url,
            format!(
                "https://figurl.org/f?v=gs://figurl/multitrial-raster-1&d=sha256://{expected_hash}&label=Multi-trial%20raster"
            )
        );
    }

    #[test]
    fn payload_is_stored_and_retrievable() {
        let idx = NumericArray::Int64(vec![5, 5, 7]);
        let data: FigureData = [("neuron_idx", &idx)].into_iter().collect();

        let service = FigurlService::with_base_url(MemoryStore::new(), "http://localhost:3000/");
        let figure = service.construct_figure("view", &data).unwrap();
        assert_eq!(figure.base_url, "http://localhost:3000");

        let stored = service.store().load_bytes(&figure.data_uri).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(json["neuron_idx"]["dtype"], "int64");
        assert_eq!(json["neuron_idx"]["shape"][0], 3);
    }
}
