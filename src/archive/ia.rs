//! HTTP client for the Internet Archive: login, item metadata lookup, and
//! directory-listing fetches.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE, COOKIE, SET_COOKIE, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::error::FetchError;
use super::{ArchiveService, ListingClient};

const DEFAULT_USER_AGENT: &str = concat!("ia-audit/", env!("CARGO_PKG_VERSION"));

/// Format label the archive assigns to per-page JP2 zip derivatives.
const JP2_ZIP_FORMAT: &str = "Single Page Processed JP2 ZIP";

/// Archive account used to obtain session cookies.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ItemMetadata {
    #[serde(default)]
    files: Vec<MetadataFile>,
}

#[derive(Debug, Deserialize)]
struct MetadataFile {
    name: String,
    #[serde(default)]
    format: Option<String>,
}

impl MetadataFile {
    fn is_jp2_zip(&self) -> bool {
        self.format.as_deref() == Some(JP2_ZIP_FORMAT) || self.name.ends_with("_jp2.zip")
    }
}

pub struct IaClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    cookies: OnceCell<String>,
}

impl IaClient {
    pub fn new(
        base_url: &url::Url,
        credentials: Option<Credentials>,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            credentials,
            cookies: OnceCell::new(),
        })
    }

    async fn login(&self, credentials: &Credentials) -> Result<String, FetchError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", &credentials.username)
            .append_pair("password", &credentials.password)
            .append_pair("remember", "true")
            .append_pair("action", "login")
            .append_pair("submit-to-login", "Log in")
            .finish();

        let response = self
            .client
            .post(format!("{}/account/login", self.base_url))
            .header(USER_AGENT, DEFAULT_USER_AGENT)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(body)
            .send()
            .await?;

        let cookies = session_cookies(response.headers().get_all(SET_COOKIE).iter());
        if cookies.is_empty() {
            tracing::warn!(
                status = response.status().as_u16(),
                "Archive login returned no session cookies"
            );
        } else {
            tracing::debug!("Archive login succeeded");
        }
        Ok(cookies)
    }
}

/// Collapse `Set-Cookie` headers into a single `Cookie` header value.
fn session_cookies<'a>(headers: impl Iterator<Item = &'a HeaderValue>) -> String {
    headers
        .filter_map(|value| value.to_str().ok())
        .filter_map(|raw| cookie::Cookie::parse(raw).ok())
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl ArchiveService for IaClient {
    async fn login_cookies(&self) -> Result<String, FetchError> {
        let cookies = self
            .cookies
            .get_or_try_init(|| async {
                match &self.credentials {
                    Some(credentials) => self.login(credentials).await,
                    None => Ok(String::new()),
                }
            })
            .await?;
        Ok(cookies.clone())
    }

    async fn remote_file_link(&self, item_id: &str) -> Result<String, FetchError> {
        let metadata: ItemMetadata = self
            .client
            .get(format!("{}/metadata/{}", self.base_url, item_id))
            .header(USER_AGENT, DEFAULT_USER_AGENT)
            .send()
            .await?
            .json()
            .await?;

        Ok(metadata
            .files
            .iter()
            .find(|file| file.is_jp2_zip())
            .map(|file| format!("{}/download/{}/{}", self.base_url, item_id, file.name))
            .unwrap_or_default())
    }
}

#[async_trait]
impl ListingClient for IaClient {
    async fn get_listing(&self, url: &str, cookies: &str) -> Result<Option<String>, FetchError> {
        let mut request = self.client.get(url).header(USER_AGENT, DEFAULT_USER_AGENT);
        if !cookies.is_empty() {
            request = request.header(COOKIE, cookies);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            tracing::debug!(url, status = response.status().as_u16(), "Listing request not successful");
        }
        let body = response.text().await?;
        Ok(Some(body))
    }
}
