use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use multitrial_raster::store::sha256_hex;
use multitrial_raster::{
    DataLoader, Error, FigureData, FigureHandle, FigurlService, MemoryStore, MultitrialRaster,
    NumericArray, RenderingService, Result, VIEW_URL,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Rendering service that hashes the payload it receives and records it.
#[derive(Default)]
struct HashingService {
    calls: Cell<usize>,
    last_view: RefCell<Option<String>>,
    last_payload: RefCell<Option<BTreeMap<String, NumericArray>>>,
}

struct HashedFigure {
    digest: String,
}

impl RenderingService for HashingService {
    type Figure = HashedFigure;

    fn construct_figure(&self, view_url: &str, data: &FigureData<'_>) -> Result<HashedFigure> {
        self.calls.set(self.calls.get() + 1);
        *self.last_view.borrow_mut() = Some(view_url.to_string());
        *self.last_payload.borrow_mut() = Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), (*v).clone()))
                .collect(),
        );
        let bytes = serde_json::to_vec(data)?;
        Ok(HashedFigure {
            digest: sha256_hex(&bytes),
        })
    }
}

impl FigureHandle for HashedFigure {
    fn url(&self, label: &str) -> Result<String> {
        Ok(format!("mock://{}/{}", self.digest, sha256_hex(label.as_bytes())))
    }
}

/// Rendering service that always fails.
struct FailingService;

impl RenderingService for FailingService {
    type Figure = HashedFigure;

    fn construct_figure(&self, _view_url: &str, _data: &FigureData<'_>) -> Result<HashedFigure> {
        Err(Error::Http {
            status: 503,
            url: "https://figurl.example/upload".into(),
        })
    }
}

/// Loader that cannot resolve anything.
struct UnresolvableLoader;

impl DataLoader for UnresolvableLoader {
    fn load(&self, uri: &str) -> Result<NumericArray> {
        Err(Error::NotFound(uri.to_string()))
    }
}

fn scenario_raster() -> MultitrialRaster {
    MultitrialRaster::new(
        vec![0.1, 0.2, 0.3],
        vec![0i64, 0, 1],
        vec![5i64, 5, 7],
    )
}

// ---------------------------------------------------------------------------
// Determinism and sensitivity
// ---------------------------------------------------------------------------

#[test]
fn equal_data_and_label_give_identical_urls() {
    let service = HashingService::default();
    let a = scenario_raster().url(&service, "raster").unwrap();
    let b = scenario_raster().url(&service, "raster").unwrap();
    assert_eq!(a, b);
    assert_eq!(service.calls.get(), 2);
}

#[test]
fn different_labels_give_different_urls() {
    let service = HashingService::default();
    let raster = scenario_raster();
    let a = raster.url(&service, "raster").unwrap();
    let b = raster.url(&service, "raster v2").unwrap();
    assert_ne!(a, b);
}

#[test]
fn different_array_content_gives_different_urls() {
    let service = HashingService::default();
    let a = scenario_raster().url(&service, "raster").unwrap();
    let shifted = MultitrialRaster::new(vec![0.1, 0.2, 0.35], vec![0i64, 0, 1], vec![5i64, 5, 7]);
    let b = shifted.url(&service, "raster").unwrap();
    assert_ne!(a, b);
}

#[test]
fn figurl_service_urls_are_deterministic_and_sensitive() {
    let service = FigurlService::new(MemoryStore::new());
    let raster = scenario_raster();

    let a = raster.url(&service, "raster").unwrap();
    let b = raster.url(&service, "raster").unwrap();
    assert_eq!(a, b);
    assert_eq!(service.store().len(), 1);

    let relabelled = raster.url(&service, "other").unwrap();
    assert_ne!(a, relabelled);

    let with_factor = raster.clone().with_factor_idx(vec![0i64, 1, 1]);
    let c = with_factor.url(&service, "raster").unwrap();
    assert_ne!(a, c);
    assert_eq!(service.store().len(), 2);

    assert!(a.starts_with("https://figurl.org/f?v=gs://figurl/multitrial-raster-1&d=sha256://"));
    assert!(a.ends_with("&label=raster"));
}

// ---------------------------------------------------------------------------
// Payload shape
// ---------------------------------------------------------------------------

#[test]
fn scenario_payload_has_three_equal_length_arrays() {
    let service = HashingService::default();
    let raster = scenario_raster();
    let url = raster.url(&service, "raster").unwrap();

    let payload = service.last_payload.borrow().clone().unwrap();
    let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["neuron_idx", "spike_time", "trial_idx"]);
    assert!(payload.values().all(|arr| arr.len() == 3));
    assert_eq!(payload["spike_time"], NumericArray::Float64(vec![0.1, 0.2, 0.3]));
    assert_eq!(payload["trial_idx"], NumericArray::Int64(vec![0, 0, 1]));
    assert_eq!(payload["neuron_idx"], NumericArray::Int64(vec![5, 5, 7]));
    assert_eq!(service.last_view.borrow().as_deref(), Some(VIEW_URL));

    // The URL is exactly what the service produced for this payload and label.
    let expected_digest = sha256_hex(&serde_json::to_vec(&raster.figure_data()).unwrap());
    assert_eq!(
        url,
        format!("mock://{expected_digest}/{}", sha256_hex(b"raster"))
    );
}

#[test]
fn missing_factor_idx_is_omitted_not_an_error() {
    let service = HashingService::default();
    scenario_raster().url(&service, "raster").unwrap();
    assert!(!service
        .last_payload
        .borrow()
        .as_ref()
        .unwrap()
        .contains_key("factor_idx"));

    scenario_raster()
        .with_factor_idx(vec![2i64, 2, 0])
        .url(&service, "raster")
        .unwrap();
    assert_eq!(
        service.last_payload.borrow().as_ref().unwrap()["factor_idx"],
        NumericArray::Int64(vec![2, 2, 0])
    );
}

#[test]
fn mismatched_lengths_pass_through_unvalidated() {
    // Lengths are the caller's responsibility; the bundle forwards as-is.
    let skewed = MultitrialRaster::new(vec![0.1, 0.2, 0.3], vec![0i64, 0], vec![5i64]);
    assert!(skewed.length_mismatch().is_some());

    let service = HashingService::default();
    assert!(skewed.url(&service, "raster").is_ok());
    let payload = service.last_payload.borrow().clone().unwrap();
    assert_eq!(payload["trial_idx"].len(), 2);
    assert_eq!(payload["neuron_idx"].len(), 1);
}

// ---------------------------------------------------------------------------
// Failure propagation
// ---------------------------------------------------------------------------

#[test]
fn loader_failure_aborts_before_rendering() {
    let loader = UnresolvableLoader;
    let service = HashingService::default();

    let produce = || -> Result<String> {
        let raster = MultitrialRaster::new(
            loader.load("ipfs://bafymissing?label=spike_time.npy")?,
            loader.load("ipfs://bafymissing?label=trial_idx.npy")?,
            loader.load("ipfs://bafymissing?label=neuron_idx.npy")?,
        );
        raster.url(&service, "raster")
    };

    assert!(matches!(produce(), Err(Error::NotFound(uri)) if uri.contains("spike_time")));
    assert_eq!(service.calls.get(), 0);
}

#[test]
fn service_errors_propagate_unchanged() {
    match scenario_raster().url(&FailingService, "raster") {
        Err(Error::Http { status, url }) => {
            assert_eq!(status, 503);
            assert_eq!(url, "https://figurl.example/upload");
        }
        other => panic!("expected the service's Http error, got {other:?}"),
    }
}
