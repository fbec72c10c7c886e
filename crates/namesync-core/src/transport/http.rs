//! HTTP + WebSocket transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Greeting, Reply, SubmitBody, Transport, UpdateBody};
use crate::config::Config;
use crate::error::{TransportError, TransportResult};
use crate::models::{NameRecord, Snapshot};
use crate::sync::{dedup_ids, SnapshotSubscription};

/// Longest response body quoted in a status error
const MAX_ERROR_BODY: usize = 200;

/// Transport talking to the real backend
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    /// REST base address without trailing slash, e.g. `http://host:3300/api`
    api_url: String,
    /// Push channel address; `None` disables live updates
    ws_url: Option<String>,
}

impl HttpTransport {
    /// Create a transport for the given base addresses
    pub fn new(api_url: &str, ws_url: Option<&str>, timeout: Duration) -> TransportResult<Self> {
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        check_url(&api_url, &["http", "https"])?;
        let ws_url = match ws_url {
            Some(url) => {
                check_url(url, &["ws", "wss"])?;
                Some(url.to_string())
            }
            None => None,
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            client,
            api_url,
            ws_url,
        })
    }

    /// Create a transport from the loaded configuration
    pub fn from_config(config: &Config) -> TransportResult<Self> {
        Self::new(&config.api_url, config.live_url(), config.request_timeout())
    }

    /// REST base address
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Send a request and decode a JSON body from a success response
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> TransportResult<T> {
        debug!("Request {}", path);
        let response = request.send().await.map_err(|source| TransportError::Network {
            endpoint: path.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Network {
                endpoint: path.to_string(),
                source,
            })?;

        if !status.is_success() {
            debug!("{} answered {}", path, status);
            return Err(TransportError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Decode {
            endpoint: path.to_string(),
            details: e.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_greeting(&self) -> TransportResult<Greeting> {
        let request = self.client.get(self.endpoint("/message"));
        self.send_json(request, "/message").await
    }

    async fn submit_name(&self, name: &str) -> TransportResult<Reply> {
        let request = self.client.post(self.endpoint("/hello")).json(&SubmitBody {
            name: name.to_string(),
        });
        self.send_json(request, "/hello").await
    }

    async fn list_all(&self) -> TransportResult<Snapshot> {
        let request = self.client.get(self.endpoint("/all"));
        let records: Option<Vec<NameRecord>> = self.send_json(request, "/all").await?;
        Ok(dedup_ids(records.unwrap_or_default()))
    }

    async fn delete_all(&self) -> TransportResult<Reply> {
        let request = self.client.delete(self.endpoint("/delete"));
        self.send_json(request, "/delete").await
    }

    async fn update_name(&self, old_name: &str, new_name: &str) -> TransportResult<Reply> {
        let request = self.client.put(self.endpoint("/update")).json(&UpdateBody {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        });
        match self.send_json(request, "/update").await {
            Err(TransportError::Status { endpoint, status, .. })
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                Err(TransportError::NotFound { endpoint })
            }
            other => other,
        }
    }

    async fn subscribe_snapshots(&self) -> TransportResult<SnapshotSubscription> {
        let Some(ref ws_url) = self.ws_url else {
            return Err(TransportError::Unavailable(
                "live updates are disabled (no ws_url configured)".to_string(),
            ));
        };
        Ok(SnapshotSubscription::connect(ws_url.clone()))
    }
}

fn check_url(url: &str, schemes: &[&str]) -> TransportResult<()> {
    let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        details: e.to_string(),
    })?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(TransportError::InvalidUrl {
            url: url.to_string(),
            details: format!("expected scheme {}", schemes.join(" or ")),
        });
    }
    Ok(())
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_ERROR_BODY {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", cut)
    }
}
