use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use super::array::NumericArray;
use super::npy::decode_npy;
use super::uri::{ContentUri, Scheme};
use crate::error::{Error, Result};
use crate::store::{ContentStore, LocalStore};

// ---------------------------------------------------------------------------
// Loader interface
// ---------------------------------------------------------------------------

/// Resolves a content-addressed locator to a numeric array.
pub trait DataLoader {
    fn load(&self, uri: &str) -> Result<NumericArray>;
}

// ---------------------------------------------------------------------------
// IPFS over an HTTP gateway
// ---------------------------------------------------------------------------

/// Fetches `ipfs://` content through `{gateway}/ipfs/{cid}`.
///
/// With a cache directory, fetched blobs are kept under
/// `<cache>/ipfs/<cid>` and served from disk on later loads.
pub struct GatewayLoader {
    gateway: String,
    cache_dir: Option<PathBuf>,
    agent: ureq::Agent,
}

impl GatewayLoader {
    pub fn new(gateway: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(15))
            .timeout_read(Duration::from_secs(120))
            .build();
        Self {
            gateway: gateway.into().trim_end_matches('/').to_string(),
            cache_dir: None,
            agent,
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn gateway_url(&self, cid: &str) -> String {
        format!("{}/ipfs/{}", self.gateway, cid)
    }

    fn cache_path(&self, cid: &str) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|d| d.join("ipfs").join(cid))
    }

    fn fetch(&self, cid: &str) -> Result<Vec<u8>> {
        if let Some(path) = self.cache_path(cid) {
            if path.is_file() {
                log::debug!("cache hit for {cid}");
                return Ok(std::fs::read(path)?);
            }
        }

        let url = self.gateway_url(cid);
        log::debug!("GET {url}");
        let response = self.agent.get(&url).call()?;
        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes)?;
        log::debug!("fetched {} bytes for {cid}", bytes.len());

        if let Some(path) = self.cache_path(cid) {
            // A failed cache write only costs a refetch next time.
            let written = path
                .parent()
                .map_or(Ok(()), std::fs::create_dir_all)
                .and_then(|_| std::fs::write(&path, &bytes));
            if let Err(e) = written {
                log::warn!("could not cache {cid} at {}: {e}", path.display());
            }
        }
        Ok(bytes)
    }
}

impl DataLoader for GatewayLoader {
    fn load(&self, uri: &str) -> Result<NumericArray> {
        let uri: ContentUri = uri.parse()?;
        if uri.scheme != Scheme::Ipfs {
            return Err(Error::UnsupportedScheme(uri.scheme.to_string()));
        }
        let array = decode_npy(&self.fetch(&uri.hash)?)?;
        log::info!(
            "loaded {} ({})",
            uri.label.as_deref().unwrap_or(&uri.hash),
            array
        );
        Ok(array)
    }
}

// ---------------------------------------------------------------------------
// sha256:// content from a store
// ---------------------------------------------------------------------------

/// Loads `.npy` blobs previously written to a [`ContentStore`].
pub struct StoreLoader<S> {
    store: S,
}

impl<S: ContentStore> StoreLoader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl StoreLoader<LocalStore> {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::new(LocalStore::new(root))
    }
}

impl<S: ContentStore> DataLoader for StoreLoader<S> {
    fn load(&self, uri: &str) -> Result<NumericArray> {
        let uri: ContentUri = uri.parse()?;
        decode_npy(&self.store.load_bytes(&uri)?)
    }
}

// ---------------------------------------------------------------------------
// Dispatch on scheme
// ---------------------------------------------------------------------------

/// Sends `ipfs://` locators to a gateway and `sha256://` ones to a store.
pub struct AnyLoader<S> {
    pub gateway: GatewayLoader,
    pub store: StoreLoader<S>,
}

impl<S: ContentStore> DataLoader for AnyLoader<S> {
    fn load(&self, uri: &str) -> Result<NumericArray> {
        let parsed: ContentUri = uri.parse()?;
        match parsed.scheme {
            Scheme::Ipfs => self.gateway.load(uri),
            Scheme::Sha256 => self.store.load(uri),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::npy::encode_npy;
    use crate::store::MemoryStore;

    #[test]
    fn store_loader_round_trips_npy_blobs() {
        let store = MemoryStore::new();
        let arr = NumericArray::Int64(vec![5, 5, 7]);
        let uri = store.store_bytes(&encode_npy(&arr).unwrap()).unwrap();

        let loader = StoreLoader::new(store);
        let labelled = uri.with_label("neuron_idx.npy").to_string();
        assert_eq!(loader.load(&labelled).unwrap(), arr);
    }

    #[test]
    fn gateway_loader_refuses_sha256_locators() {
        let loader = GatewayLoader::new("http://127.0.0.1:9");
        assert!(matches!(
            loader.load(&format!("sha256://{}", "ab".repeat(32))),
            Err(Error::UnsupportedScheme(s)) if s == "sha256"
        ));
    }

    #[test]
    fn gateway_loader_serves_cached_blobs_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let arr = NumericArray::Float64(vec![0.1, 0.2]);
        std::fs::create_dir_all(dir.path().join("ipfs")).unwrap();
        std::fs::write(dir.path().join("ipfs/bafytest"), encode_npy(&arr).unwrap()).unwrap();

        // Port 9 (discard) is never served; a network attempt would fail.
        let loader = GatewayLoader::new("http://127.0.0.1:9/").with_cache_dir(dir.path());
        assert_eq!(loader.gateway_url("bafytest"), "http://127.0.0.1:9/ipfs/bafytest");
        assert_eq!(loader.load("ipfs://bafytest?label=t.npy").unwrap(), arr);
    }

    /// Serve one canned HTTP response on a local port and return its base URL.
    fn one_shot_server(status_line: &'static str) -> String {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            let mut stream = reader.into_inner();
            write!(
                stream,
                "{status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )
            .unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn unreachable_gateway_is_a_transport_error() {
        let loader = GatewayLoader::new("http://127.0.0.1:9");
        assert!(matches!(loader.load("ipfs://bafyx"), Err(Error::Transport(_))));
    }

    #[test]
    fn non_success_status_is_an_http_error() {
        let gateway = one_shot_server("HTTP/1.1 404 Not Found");
        let loader = GatewayLoader::new(gateway.as_str());
        match loader.load("ipfs://bafymissing") {
            Err(Error::Http { status, url }) => {
                assert_eq!(status, 404);
                assert_eq!(url, format!("{gateway}/ipfs/bafymissing"));
            }
            other => panic!("expected an Http error, got {other:?}"),
        }
    }

    #[test]
    fn any_loader_dispatches_on_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let from_gateway = NumericArray::Float64(vec![0.1, 0.2]);
        std::fs::create_dir_all(dir.path().join("ipfs")).unwrap();
        std::fs::write(
            dir.path().join("ipfs/bafycached"),
            encode_npy(&from_gateway).unwrap(),
        )
        .unwrap();

        let store = MemoryStore::new();
        let from_store = NumericArray::Int32(vec![1, 2, 3]);
        let stored = store.store_bytes(&encode_npy(&from_store).unwrap()).unwrap();

        let loader = AnyLoader {
            gateway: GatewayLoader::new("http://127.0.0.1:9").with_cache_dir(dir.path()),
            store: StoreLoader::new(store),
        };
        assert_eq!(loader.load(&stored.to_string()).unwrap(), from_store);
        assert_eq!(loader.load("ipfs://bafycached").unwrap(), from_gateway);
        // Not cached, so this one has to go to the (dead) gateway.
        assert!(matches!(
            loader.load("ipfs://bafyuncached"),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn locators_that_would_escape_the_cache_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let loader = GatewayLoader::new("http://127.0.0.1:9").with_cache_dir(dir.path());
        for bad in ["ipfs:///etc/passwd", "ipfs://../outside", "ipfs://caf\u{e9}"] {
            assert!(
                matches!(loader.load(bad), Err(Error::InvalidUri { .. })),
                "{bad} should be rejected"
            );
        }

        let store_loader = StoreLoader::local(dir.path());
        assert!(matches!(
            store_loader.load("sha256://a\u{e9}\u{e9}\u{e9}\u{e9}"),
            Err(Error::InvalidUri { .. })
        ));
    }

    #[test]
    fn malformed_locator_fails_before_any_fetch() {
        let loader = StoreLoader::new(MemoryStore::new());
        assert!(matches!(
            loader.load("not-a-locator"),
            Err(Error::InvalidUri { .. })
        ));
    }
}
