//! # Registry HTTP Client
//!
//! reqwest implementation of [`RegistryClient`] for the registry admin API.
//!
//! Wire protocol:
//! - `GET {base}/{id}` single record; 404 and 401 mean not found
//! - `GET {base}` all records
//! - `POST {base}` create, 201; 409 means the id is taken
//! - `PUT {base}/{id}` update, 200
//! - `DELETE {base}/{id}` delete, 204; 404 means already gone
//!
//! Each call is a single request bounded by the client timeout.

use crate::observability::metrics;
use crate::registry::client::{RegistryClient, RegistryError};
use crate::registry::endpoint::EndpointKey;
use crate::registry::types::OAuth2ClientRecord;
use async_trait::async_trait;
use reqwest::{header, Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, info_span, Instrument};

/// Transport settings shared by every pooled client
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    pub request_timeout: Duration,
    /// PEM bundle of additional trusted roots
    pub trust_store_pem: Option<Vec<u8>>,
    pub insecure_skip_verify: bool,
}

/// HTTP client bound to one registry endpoint
pub struct HttpRegistryClient {
    http_client: Client,
    base_url: Url,
    forwarded_proto: Option<String>,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistryClient")
            .field("base_url", &self.base_url.as_str())
            .field("forwarded_proto", &self.forwarded_proto)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpRegistryClient {
    /// Build a client for `key`
    ///
    /// # Errors
    /// Returns an error if the endpoint URL or the trust store is invalid
    pub fn new(
        key: &EndpointKey,
        api_key: Option<String>,
        options: &HttpOptions,
    ) -> Result<Self, RegistryError> {
        let base_url = key.base_url()?;

        let mut builder = Client::builder().timeout(options.request_timeout);
        if let Some(pem) = &options.trust_store_pem {
            let certificates = reqwest::Certificate::from_pem_bundle(pem)
                .map_err(|e| RegistryError::Build(format!("invalid trust store: {e}")))?;
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }
        if options.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http_client = builder
            .build()
            .map_err(|e| RegistryError::Build(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            forwarded_proto: key.forwarded_proto.clone(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn record_url(&self, id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        body: Option<&OAuth2ClientRecord>,
    ) -> Result<Response, RegistryError> {
        let mut request = self
            .http_client
            .request(method.clone(), url.clone())
            .header(header::ACCEPT, "application/json");
        if let Some(proto) = &self.forwarded_proto {
            request = request.header("X-Forwarded-Proto", proto);
        }
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(|source| RegistryError::Transport {
            method: method_name(&method),
            url: url.to_string(),
            source,
        })
    }

    async fn decode<T: DeserializeOwned>(
        method: &Method,
        url: &Url,
        response: Response,
    ) -> Result<T, RegistryError> {
        response.json().await.map_err(|source| RegistryError::Decode {
            method: method_name(method),
            url: url.to_string(),
            source,
        })
    }

    async fn instrumented<T, F>(&self, operation: &'static str, url: &Url, call: F) -> Result<T, RegistryError>
    where
        F: std::future::Future<Output = Result<T, RegistryError>>,
    {
        let span = info_span!("registry.request", operation = operation, url = %url);
        let start = Instant::now();
        let result = call.instrument(span).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::record_registry_request(operation, outcome, start.elapsed().as_secs_f64());
        result
    }
}

fn method_name(method: &Method) -> &'static str {
    if *method == Method::GET {
        "GET"
    } else if *method == Method::POST {
        "POST"
    } else if *method == Method::PUT {
        "PUT"
    } else if *method == Method::DELETE {
        "DELETE"
    } else {
        "OTHER"
    }
}

fn unexpected(method: &Method, url: &Url, status: StatusCode) -> RegistryError {
    RegistryError::UnexpectedStatus {
        method: method_name(method),
        url: url.to_string(),
        status: status.to_string(),
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn get(&self, id: &str) -> Result<Option<OAuth2ClientRecord>, RegistryError> {
        let url = self.record_url(id);
        self.instrumented("get", &url, async {
            let response = self.send(Method::GET, &url, None).await?;
            match response.status() {
                StatusCode::OK => Ok(Some(Self::decode(&Method::GET, &url, response).await?)),
                StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED => {
                    debug!(client.id = id, "Client not found in registry");
                    Ok(None)
                }
                status => Err(unexpected(&Method::GET, &url, status)),
            }
        })
        .await
    }

    async fn list(&self) -> Result<Vec<OAuth2ClientRecord>, RegistryError> {
        let url = self.base_url.clone();
        self.instrumented("list", &url, async {
            let response = self.send(Method::GET, &url, None).await?;
            match response.status() {
                StatusCode::OK => Self::decode(&Method::GET, &url, response).await,
                status => Err(unexpected(&Method::GET, &url, status)),
            }
        })
        .await
    }

    async fn create(&self, record: &OAuth2ClientRecord) -> Result<OAuth2ClientRecord, RegistryError> {
        let url = self.base_url.clone();
        self.instrumented("create", &url, async {
            let response = self.send(Method::POST, &url, Some(record)).await?;
            match response.status() {
                StatusCode::CREATED | StatusCode::OK => {
                    Self::decode(&Method::POST, &url, response).await
                }
                StatusCode::CONFLICT => Err(RegistryError::AlreadyExists {
                    method: "POST",
                    url: url.to_string(),
                }),
                status => Err(unexpected(&Method::POST, &url, status)),
            }
        })
        .await
    }

    async fn update(&self, record: &OAuth2ClientRecord) -> Result<OAuth2ClientRecord, RegistryError> {
        let id = record
            .client_id
            .as_deref()
            .ok_or(RegistryError::MissingClientId)?;
        let url = self.record_url(id);
        self.instrumented("update", &url, async {
            let response = self.send(Method::PUT, &url, Some(record)).await?;
            match response.status() {
                StatusCode::OK => Self::decode(&Method::PUT, &url, response).await,
                status => Err(unexpected(&Method::PUT, &url, status)),
            }
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        let url = self.record_url(id);
        self.instrumented("delete", &url, async {
            let response = self.send(Method::DELETE, &url, None).await?;
            match response.status() {
                StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!(client.id = id, "Client already absent from registry");
                    Ok(())
                }
                status => Err(unexpected(&Method::DELETE, &url, status)),
            }
        })
        .await
    }
}
