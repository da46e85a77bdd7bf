//! [`BlocksApi`] over HTTP with `reqwest`.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};
use ubr_types::{
    AddToPageRequest, AddToPageResponse, BlockDefinition, BlockId, EmptyBody, PageBlockRecord,
    PageId, ReorderRequest, SectionId,
};
use url::Url;

use crate::api::{ApiError, BlocksApi};
use crate::config::{ClientConfig, ConfigError};
use crate::constants::NONCE_HEADER;

/// HTTP client for the host's page-blocks REST API.
#[derive(Clone, Debug)]
pub struct HttpApi {
    client: Client,
    base: String,
    timeout: Duration,
}

impl HttpApi {
    /// Build a client from config. The token is baked into default headers so
    /// no request can go out without it.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&config.auth_token).map_err(|e| ConfigError::Invalid {
            field: "auth token",
            reason: e.to_string(),
        })?;
        headers.insert(NONCE_HEADER, token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::Invalid {
                field: "http client",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base: config.api_base()?,
            timeout: config.request_timeout(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base, path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|e| ApiError::Url(format!("{raw}: {e}")))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "request");
        Ok(self.client.request(method, url))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if status.is_success() {
            trace!(%status, "response");
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl BlocksApi for HttpApi {
    async fn list_blocks(&self) -> Result<Vec<BlockDefinition>, ApiError> {
        let builder = self.request(Method::GET, "blocks")?;
        self.send_json(builder).await
    }

    async fn add_block_to_page(
        &self,
        page: PageId,
        block: &BlockId,
    ) -> Result<AddToPageResponse, ApiError> {
        let body = AddToPageRequest {
            block_id: block.clone(),
        };
        let builder = self
            .request(Method::POST, &format!("blocks/add-to-page/{page}"))?
            .json(&body);
        self.send_json(builder).await
    }

    async fn page_blocks(&self, page: PageId) -> Result<Vec<PageBlockRecord>, ApiError> {
        let builder = self
            .request(Method::POST, &format!("page-blocks/{page}"))?
            .json(&EmptyBody {});
        self.send_json(builder).await
    }

    async fn delete_page_block(&self, section: &SectionId) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, &format!("page-blocks-delete/{section}"))?;
        self.send(builder).await.map(drop)
    }

    async fn reorder_page_blocks(&self, page: PageId, order: &[SectionId]) -> Result<(), ApiError> {
        let body = ReorderRequest {
            block_order: order.to_vec(),
        };
        let builder = self
            .request(Method::POST, &format!("page-blocks-reorder/{page}"))?
            .json(&body);
        self.send(builder).await.map(drop)
    }
}
