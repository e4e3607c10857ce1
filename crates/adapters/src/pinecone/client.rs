//! Pinecone controller REST adapter.

use crate::pinecone::base_url::{controller_base_url, index_host_base_url};
use crate::pinecone::error::{
    ControlErrorContext, deadline_error, invalid_response_error, map_http_error,
    map_transport_error,
};
use index_provisioner_ports::{
    BoxFuture, CreateIndexRequest, IndexControlPort, IndexControlProviderInfo, IndexDescription,
    IndexName, SnapshotName, UpdateIndexRequest,
};
use index_provisioner_shared::{
    ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, SecretString,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Pinecone controller adapter configuration.
#[derive(Debug, Clone)]
pub struct PineconeControlConfig {
    /// API key sent on every request.
    pub api_key: SecretString,
    /// Environment the controller URL is derived from.
    pub environment: Box<str>,
    /// Explicit controller base URL, overriding the derived one.
    pub base_url: Option<Box<str>>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl PineconeControlConfig {
    /// Validates configuration invariants for the controller adapter.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_blank() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Pinecone API key is required",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Pinecone timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct CreateIndexBody<'a> {
    name: &'a str,
    dimension: u32,
    metric: &'static str,
    pods: u32,
    replicas: u32,
    pod_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata_config: Option<MetadataConfigBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_collection: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct MetadataConfigBody<'a> {
    indexed: &'a [String],
}

#[derive(Debug, Serialize)]
struct ConfigureIndexBody {
    replicas: u32,
    pod_type: String,
}

#[derive(Debug, Serialize)]
struct CreateCollectionBody<'a> {
    name: &'a str,
    source: &'a str,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    database: DatabaseInfo,
    #[serde(default)]
    status: Option<DatabaseStatus>,
}

#[derive(Debug, Deserialize)]
struct DatabaseInfo {
    name: String,
    #[serde(default)]
    pod_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatabaseStatus {
    #[serde(default)]
    host: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexStatsResponse {
    #[serde(rename = "totalVectorCount", default)]
    total_vector_count: Option<u64>,
}

/// Pinecone controller client implementing [`IndexControlPort`].
#[derive(Clone)]
pub struct PineconeControlClient {
    provider: IndexControlProviderInfo,
    client: reqwest::Client,
    base_url: Box<str>,
    timeout: Duration,
}

impl PineconeControlClient {
    /// Creates a controller client from configuration.
    pub fn new(config: PineconeControlConfig) -> Result<Self> {
        config.validate()?;
        let base_url = controller_base_url(&config.environment, config.base_url.as_deref())?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut api_key = HeaderValue::from_str(config.api_key.expose()).map_err(|_| {
            ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Pinecone API key contains invalid header characters",
            )
        })?;
        api_key.set_sensitive(true);
        // Sent as `Api-Key`; header names are case-insensitive on the wire.
        headers.insert(HeaderName::from_static("api-key"), api_key);

        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("controller", "client_init_failed"),
                    format!("failed to build Pinecone controller client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;

        Ok(Self {
            provider: IndexControlProviderInfo {
                id: "pinecone".into(),
                name: "Pinecone controller".into(),
            },
            client,
            base_url,
            timeout,
        })
    }

    /// Controller base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn context(
        operation: &'static str,
        index: Option<&str>,
        endpoint: &str,
    ) -> ControlErrorContext {
        ControlErrorContext {
            operation,
            index_name: index.map(ToOwned::to_owned),
            endpoint: Some(endpoint.to_owned()),
        }
    }

    fn url(&self, base: &str, segments: &[&str], ctx: &ControlErrorContext) -> Result<Url> {
        let mut url = Url::parse(base).map_err(|error| invalid_url(&error, ctx))?;
        url.path_segments_mut()
            .map_err(|()| invalid_url(&"URL cannot be a base", ctx))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        ctx: &ControlErrorContext,
    ) -> Result<String> {
        let request = self.client.request(method, url);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(result) => result.map_err(|error| map_transport_error(&error, ctx))?,
            Err(_) => return Err(deadline_error(ctx)),
        };

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|error| map_transport_error(&error, ctx))?;

        if !status.is_success() {
            return Err(map_http_error(
                format!("HTTP {}: {payload}", status.as_u16()),
                status.as_u16(),
                ctx,
            ));
        }
        Ok(payload)
    }

    async fn send_json<T: for<'de> Deserialize<'de>, B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        ctx: &ControlErrorContext,
    ) -> Result<T> {
        let payload = self.send(method, url, body, ctx).await?;
        serde_json::from_str(&payload).map_err(|error| invalid_response_error(error, ctx))
    }

    async fn create(&self, request: CreateIndexRequest) -> Result<()> {
        let ctx = Self::context("pinecone.create_index", Some(request.name.as_str()), "/databases");
        let url = self.url(&self.base_url, &["databases"], &ctx)?;
        let body = CreateIndexBody {
            name: request.name.as_str(),
            dimension: request.dimension,
            metric: request.metric.as_str(),
            pods: request.pods,
            replicas: request.replicas,
            pod_type: request.pod_type.to_string(),
            metadata_config: request
                .metadata_config
                .as_ref()
                .map(|config| MetadataConfigBody {
                    indexed: &config.field_names,
                }),
            source_collection: request.source_collection.as_deref(),
        };
        self.send(Method::POST, url, Some(&body), &ctx).await?;
        Ok(())
    }

    async fn configure(&self, request: UpdateIndexRequest) -> Result<()> {
        let endpoint = format!("/databases/{}", request.name);
        let ctx = Self::context("pinecone.configure_index", Some(request.name.as_str()), &endpoint);
        let url = self.url(&self.base_url, &["databases", request.name.as_str()], &ctx)?;
        let body = ConfigureIndexBody {
            replicas: request.replicas,
            pod_type: request.pod_type.to_string(),
        };
        self.send(Method::PATCH, url, Some(&body), &ctx).await?;
        Ok(())
    }

    async fn delete(&self, name: IndexName) -> Result<()> {
        let endpoint = format!("/databases/{name}");
        let ctx = Self::context("pinecone.delete_index", Some(name.as_str()), &endpoint);
        let url = self.url(&self.base_url, &["databases", name.as_str()], &ctx)?;
        self.send::<()>(Method::DELETE, url, None, &ctx).await?;
        Ok(())
    }

    async fn describe(&self, name: IndexName) -> Result<IndexDescription> {
        let endpoint = format!("/databases/{name}");
        let ctx = Self::context("pinecone.describe_index", Some(name.as_str()), &endpoint);
        let url = self.url(&self.base_url, &["databases", name.as_str()], &ctx)?;
        let response: DescribeIndexResponse =
            self.send_json::<_, ()>(Method::GET, url, None, &ctx).await?;

        let Some(pod_type) = response.database.pod_type else {
            return Err(invalid_response_error("database.pod_type is missing", &ctx));
        };
        let described = IndexName::parse(&response.database.name)
            .map_err(|error| invalid_response_error(error, &ctx))?;

        let host = response.status.and_then(|status| status.host);
        let vector_count = match host {
            Some(host) => self.vector_count(&described, &host).await,
            None => None,
        };

        Ok(IndexDescription {
            name: described,
            pod_type: pod_type.into_boxed_str(),
            vector_count,
        })
    }

    /// Reads the stored vector count from the index host.
    ///
    /// Failures yield `None`; deletes never proceed on an unknown count.
    async fn vector_count(&self, name: &IndexName, host: &str) -> Option<u64> {
        let ctx = Self::context(
            "pinecone.describe_index_stats",
            Some(name.as_str()),
            "/describe_index_stats",
        );
        let stats = async {
            let base = index_host_base_url(host)?;
            let url = self.url(&base, &["describe_index_stats"], &ctx)?;
            let empty = serde_json::json!({});
            self.send_json::<IndexStatsResponse, _>(Method::POST, url, Some(&empty), &ctx)
                .await
        };
        match stats.await {
            Ok(stats) => stats.total_vector_count,
            Err(error) => {
                tracing::warn!(
                    index = %name,
                    code = %error.code,
                    "vector count unavailable: {}",
                    error.message
                );
                None
            },
        }
    }

    async fn list(&self) -> Result<Vec<IndexName>> {
        let ctx = Self::context("pinecone.list_indexes", None, "/databases");
        let url = self.url(&self.base_url, &["databases"], &ctx)?;
        let names: Vec<String> = self.send_json::<_, ()>(Method::GET, url, None, &ctx).await?;

        let mut indexes = Vec::with_capacity(names.len());
        for name in names {
            match IndexName::parse(&name) {
                Ok(index) => indexes.push(index),
                Err(_) => tracing::debug!(name = %name, "ignoring unparseable index name"),
            }
        }
        Ok(indexes)
    }

    async fn snapshot(&self, name: SnapshotName, source: IndexName) -> Result<()> {
        let ctx = Self::context("pinecone.create_collection", Some(source.as_str()), "/collections");
        let url = self.url(&self.base_url, &["collections"], &ctx)?;
        let body = CreateCollectionBody {
            name: name.as_str(),
            source: source.as_str(),
        };
        self.send(Method::POST, url, Some(&body), &ctx).await?;
        Ok(())
    }
}

impl IndexControlPort for PineconeControlClient {
    fn provider(&self) -> &IndexControlProviderInfo {
        &self.provider
    }

    fn create_index(
        &self,
        _ctx: &RequestContext,
        request: CreateIndexRequest,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.create(request).await })
    }

    fn update_index(
        &self,
        _ctx: &RequestContext,
        request: UpdateIndexRequest,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.configure(request).await })
    }

    fn delete_index(
        &self,
        _ctx: &RequestContext,
        name: IndexName,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.delete(name).await })
    }

    fn describe_index(
        &self,
        _ctx: &RequestContext,
        name: IndexName,
    ) -> BoxFuture<'_, Result<IndexDescription>> {
        Box::pin(async move { self.describe(name).await })
    }

    fn list_indexes(
        &self,
        _ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<Vec<IndexName>>> {
        Box::pin(async move { self.list().await })
    }

    fn create_snapshot(
        &self,
        _ctx: &RequestContext,
        name: SnapshotName,
        source: IndexName,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.snapshot(name, source).await })
    }
}

fn invalid_url(detail: &dyn std::fmt::Display, ctx: &ControlErrorContext) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::invalid_input(), format!("invalid request URL: {detail}"))
        .with_metadata("operation", ctx.operation)
}
