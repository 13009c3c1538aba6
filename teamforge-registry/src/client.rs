//! ABOUTME: Typed HTTP client for one registered worker's RPC surface
//! ABOUTME: Injects the worker's shared secret into outgoing requests iff one was configured

use teamforge_core::rpc::{ConfigResponse, HealthResponse};

/// A client bound to one worker's base URL, with an optional credential
/// injected as the `x-api-key` header on every request.
pub struct WorkerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WorkerClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: if api_key.is_empty() { None } else { Some(api_key) },
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }
        req
    }

    pub async fn get_health(&self) -> Result<HealthResponse, reqwest::Error> {
        self.request(reqwest::Method::GET, "/health")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Fetch the worker's identity fields (name/type/version), surfaced by the
    /// registry as the cached `WorkerInfo` scalars.
    pub async fn get_config(&self) -> Result<ConfigResponse, reqwest::Error> {
        self.request(reqwest::Method::GET, "/config")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Forward an arbitrary `GET` path and return the raw JSON body, used by
    /// the control plane's verbatim-forwarding proxy operations.
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value, reqwest::Error> {
        self.request(reqwest::Method::GET, path)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Forward an arbitrary `GET` path and return the raw text body, used for
    /// the log-file fetch proxy whose responses aren't JSON.
    pub async fn get_text(&self, path: &str) -> Result<String, reqwest::Error> {
        self.request(reqwest::Method::GET, path)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}
