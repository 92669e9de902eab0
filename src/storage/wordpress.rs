//! WordPress.com REST (v1.1) sink implementation.
//!
//! Endpoints used, relative to `{api_base}/sites/{site}`:
//!
//! - `POST posts/new`          create a post
//! - `GET  posts`              paginated listing (`number`, `page`, `fields`)
//! - `GET  posts/slug:{slug}`  single post by slug
//! - `GET  options/{key}`      read a setting
//! - `POST options/{key}`      write a setting

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{PostHandle, PostPage, PostPayload, PostSummary, SiteConfig};
use crate::services::Credential;
use crate::storage::RemoteSink;
use crate::utils::http::retry_after;

/// WordPress.com site backend.
#[derive(Clone)]
pub struct WordPressSink {
    client: Client,
    site_url: Url,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    found: Option<u64>,
    #[serde(default)]
    posts: Vec<PostSummary>,
}

#[derive(Deserialize)]
struct OptionResponse {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

impl WordPressSink {
    /// Create a sink for `site` under the REST root `api_base`.
    pub fn new(client: Client, api_base: &str, site: &str) -> Result<Self> {
        let mut site_url = Url::parse(api_base)?;
        site_url
            .path_segments_mut()
            .map_err(|_| AppError::config(format!("api base {api_base} cannot hold a path")))?
            .pop_if_empty()
            .extend(["sites", site]);
        Ok(Self { client, site_url })
    }

    pub fn from_config(client: Client, config: &SiteConfig) -> Result<Self> {
        Self::new(client, &config.api_base, &config.site)
    }

    /// Build an endpoint URL from path segments below the site root.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.site_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config("site URL cannot hold a path"))?
            .extend(segments);
        Ok(url)
    }

    /// Send with the bearer credential and map error statuses.
    async fn send(&self, request: RequestBuilder, cred: &Credential) -> Result<Response> {
        let response = self.execute(request, cred).await?;
        check_status(response).await
    }

    async fn execute(&self, request: RequestBuilder, cred: &Credential) -> Result<Response> {
        let request = request.bearer_auth(cred.token()).build()?;
        let method = request.method().clone();
        let response = self.client.execute(request).await?;
        log::debug!("{} {} -> {}", method, response.url().path(), response.status());
        Ok(response)
    }

    async fn get_optional<T: DeserializeOwned>(
        &self,
        url: Url,
        cred: &Credential,
    ) -> Result<Option<T>> {
        let response = self.execute(self.client.get(url), cred).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        decode(response).await.map(Some)
    }
}

/// Map non-success statuses onto the error taxonomy.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(AppError::AuthExpired),
        StatusCode::TOO_MANY_REQUESTS => Err(AppError::RateLimited {
            retry_after: retry_after(&response),
        }),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            if status.is_server_error() {
                Err(AppError::Unavailable {
                    status: status.as_u16(),
                    message,
                })
            } else {
                Err(AppError::rejected(status.as_u16(), message))
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl RemoteSink for WordPressSink {
    async fn create_post(&self, cred: &Credential, payload: &PostPayload) -> Result<PostHandle> {
        let url = self.endpoint(&["posts", "new"])?;
        let response = self.send(self.client.post(url).json(payload), cred).await?;
        decode(response).await
    }

    async fn list_posts(
        &self,
        cred: &Credential,
        page: u32,
        page_size: u32,
        fields: &[&str],
    ) -> Result<PostPage> {
        let mut url = self.endpoint(&["posts"])?;
        url.query_pairs_mut()
            .append_pair("number", &page_size.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("fields", &fields.join(","));

        let response = self.send(self.client.get(url), cred).await?;
        let list: ListResponse = decode(response).await?;

        let seen = u64::from(page) * u64::from(page_size);
        Ok(PostPage {
            has_more: list.found.map(|found| found > seen),
            items: list.posts,
        })
    }

    async fn get_post_by_slug(
        &self,
        cred: &Credential,
        slug: &str,
    ) -> Result<Option<PostSummary>> {
        let segment = format!("slug:{slug}");
        let url = self.endpoint(&["posts", &segment])?;
        self.get_optional(url, cred).await
    }

    async fn get_setting(&self, cred: &Credential, key: &str) -> Result<Option<String>> {
        let url = self.endpoint(&["options", key])?;
        let option: Option<OptionResponse> = self.get_optional(url, cred).await?;
        Ok(option.and_then(|o| o.value))
    }

    async fn set_setting(&self, cred: &Credential, key: &str, value: &str) -> Result<()> {
        let url = self.endpoint(&["options", key])?;
        let body = serde_json::json!({ "value": value });
        self.send(self.client.post(url).json(&body), cred).await?;
        Ok(())
    }
}
