//! HTTP asset fetcher.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

use crate::error::{FetchError, Result};
use crate::normalize::{normalize_reference, output_filename};
use crate::{deadline_seconds, temp_dir, AssetFetcher, FetchedAsset};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("vidshop/", env!("CARGO_PKG_VERSION"));

/// Downloads assets over HTTP(S).
///
/// Drive links are normalized to their direct-download form. If Drive
/// answers with its "can't scan this file" interstitial, the confirm token
/// on that page is followed once.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the client cannot be built.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Create a fetcher that shares an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// Aborts the wrapped task when dropped, so an abandoned fetch stops
/// downloading and its temporary directory is removed.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(
        &self,
        reference: &str,
        filename_hint: &str,
        deadline: Duration,
        max_bytes: u64,
    ) -> Result<FetchedAsset> {
        let url = normalize_reference(reference)?;
        let filename = output_filename(filename_hint);
        let started = Instant::now();

        tracing::debug!(
            url = %url,
            filename = %filename,
            ?deadline,
            max_bytes,
            "Starting asset download"
        );

        let mut task = AbortOnDrop(tokio::spawn(download(
            self.client.clone(),
            url,
            filename,
            max_bytes,
        )));

        match tokio::time::timeout(deadline, &mut task.0).await {
            Ok(Ok(result)) => {
                if let Ok(asset) = &result {
                    tracing::info!(
                        size_bytes = asset.size_bytes(),
                        elapsed_ms = started.elapsed().as_millis(),
                        "Asset downloaded"
                    );
                }
                result
            }
            Ok(Err(join_err)) => Err(FetchError::Task(join_err.to_string())),
            Err(_) => {
                tracing::warn!(?deadline, "Asset download timed out");
                Err(FetchError::Timeout {
                    seconds: deadline_seconds(deadline),
                })
            }
        }
    }
}

async fn download(
    client: Client,
    url: Url,
    filename: String,
    max_bytes: u64,
) -> Result<FetchedAsset> {
    let mut response = send(&client, url.clone()).await?;

    if is_html(&response) {
        let page = response.text().await?;
        let token = confirm_token(&page).ok_or(FetchError::NotShared)?;

        let mut confirmed = url;
        confirmed.query_pairs_mut().append_pair("confirm", &token);
        tracing::debug!(url = %confirmed, "Following download confirmation");

        response = send(&client, confirmed).await?;
        if is_html(&response) {
            return Err(FetchError::NotShared);
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    if let Some(announced) = response.content_length() {
        if announced > max_bytes {
            return Err(FetchError::TooLarge {
                size_bytes: announced,
                limit_bytes: max_bytes,
            });
        }
    }

    let dir = temp_dir()?;
    let path = dir.path().join(&filename);
    let mut file = tokio::fs::File::create(&path).await?;

    let mut size_bytes: u64 = 0;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        size_bytes += chunk.len() as u64;
        if size_bytes > max_bytes {
            return Err(FetchError::TooLarge {
                size_bytes,
                limit_bytes: max_bytes,
            });
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(FetchedAsset::new(dir, path, size_bytes, content_type))
}

async fn send(client: &Client, url: Url) -> Result<Response> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
        });
    }
    Ok(response)
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().starts_with("text/html"))
}

/// Extract the download confirmation token from a Drive interstitial page.
///
/// Older pages carry it in a link (`...&confirm=TOKEN&...`), newer ones in a
/// hidden form field (`name="confirm" value="TOKEN"`).
fn confirm_token(page: &str) -> Option<String> {
    let is_token_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';

    if let Some(start) = page.find("confirm=") {
        let token: String = page[start + "confirm=".len()..]
            .chars()
            .take_while(|c| is_token_char(*c))
            .collect();
        if !token.is_empty() {
            return Some(token);
        }
    }

    let marker = r#"name="confirm" value=""#;
    let start = page.find(marker)? + marker.len();
    let token: String = page[start..].chars().take_while(|c| is_token_char(*c)).collect();
    (!token.is_empty()).then_some(token)
}
