use crate::core::config::TileLoadingConfig;
use crate::rendering::surface::DecodedImage;
use crate::{MapError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Turns a tile URL into decoded pixels. Runs on the spawner, never on the
/// control thread.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<DecodedImage>;
}

/// Fetches tiles over HTTP and decodes them with the `image` crate.
///
/// Public tile servers (OpenStreetMap in particular) reject requests without a
/// descriptive User-Agent, so one is always set.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &TileLoadingConfig) -> Result<Self> {
        Self::new(
            &config.user_agent,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    /// Reuse an existing client (shared connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<DecodedImage> {
        log::debug!("fetching tile {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MapError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        decode_tile(&bytes)
    }
}

/// Decodes PNG or JPEG bytes into RGBA8.
pub fn decode_tile(bytes: &[u8]) -> Result<DecodedImage> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage::new(width, height, rgba.into_raw()))
}
