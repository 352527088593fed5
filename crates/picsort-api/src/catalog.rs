// Catalog HTTP client
//
// Wraps `reqwest::Client` with the single endpoint the sync layer needs:
// `GET /api/pics/?is_random=<bool>`. Status and body decoding are checked
// here so callers only ever see a typed `CatalogResponse` or an `Error`.

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::protocol::CatalogResponse;
use crate::transport::TransportConfig;

const CATALOG_PATH: &str = "api/pics/";

/// HTTP client for the catalog snapshot endpoint.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `http://127.0.0.1:8000`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Fetch the current catalog snapshot and settings.
    pub async fn fetch(&self, is_random: bool) -> Result<CatalogResponse, Error> {
        let mut url = self.base_url.join(CATALOG_PATH)?;
        url.query_pairs_mut()
            .append_pair("is_random", if is_random { "true" } else { "false" });

        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
