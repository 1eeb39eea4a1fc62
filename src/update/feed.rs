// ABOUTME: Release feed: where the latest server build is published and how to fetch it.
// ABOUTME: HTTP implementation reads the download-links JSON and streams the archive to disk.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use tokio::io::AsyncWriteExt;

use super::error::{
    ClientSnafu, DownloadSnafu, DownloadStatusSnafu, DownloadWriteSnafu, MetadataFetchSnafu,
    MetadataParseSnafu, MetadataStatusSnafu, MissingPlatformLinkSnafu, UpdateError,
    VersionTokenSnafu,
};
use crate::config::UpdateSettings;
use crate::notify::CancelFlag;

/// Longest wait on the network before the cancel flag is checked again.
const CANCEL_POLL: Duration = Duration::from_secs(1);

static VERSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)*)\.zip$").expect("constant regex pattern is valid")
});

/// The newest published release for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseInfo {
    /// Version token from the archive filename, e.g. `1.21.113.1`.
    pub version: String,
    pub download_url: String,
}

impl ReleaseInfo {
    /// Final path segment of the download URL.
    pub fn file_name(&self) -> &str {
        self.download_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("release.zip")
    }
}

#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    async fn latest_release(&self) -> Result<ReleaseInfo, UpdateError>;

    /// Stream the release archive to `dest`, returning the bytes written.
    ///
    /// Returns `UpdateError::Cancelled` within a second of `cancel` being raised;
    /// the partial file is removed on every failure.
    async fn download(
        &self,
        release: &ReleaseInfo,
        dest: &Path,
        cancel: &CancelFlag,
    ) -> Result<u64, UpdateError>;
}

#[derive(Debug, Deserialize)]
struct LinksDocument {
    result: LinksResult,
}

#[derive(Debug, Deserialize)]
struct LinksResult {
    links: Vec<DownloadLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadLink {
    download_type: String,
    download_url: String,
}

/// Version token embedded in `<product>-<version>.zip` at the end of `url`.
pub fn version_from_url(url: &str, product: &str) -> Option<String> {
    let file_name = url.rsplit('/').next()?;
    let rest = file_name.strip_prefix(product)?.strip_prefix('-')?;
    let captures = VERSION_TOKEN.captures(rest)?;
    Some(captures.get(1)?.as_str().to_string())
}

#[derive(Debug, Clone)]
pub struct HttpReleaseFeed {
    client: reqwest::Client,
    metadata_url: String,
    platform: String,
    product: String,
}

impl HttpReleaseFeed {
    pub fn new(settings: &UpdateSettings) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()
            .context(ClientSnafu)?;
        Ok(Self {
            client,
            metadata_url: settings.metadata_url.clone(),
            platform: settings.platform.clone(),
            product: settings.product.clone(),
        })
    }

    fn select_release(&self, document: LinksDocument) -> Result<ReleaseInfo, UpdateError> {
        let link = document
            .result
            .links
            .into_iter()
            .find(|link| link.download_type == self.platform)
            .context(MissingPlatformLinkSnafu {
                platform: self.platform.clone(),
            })?;

        let version = version_from_url(&link.download_url, &self.product).context(
            VersionTokenSnafu {
                url: link.download_url.clone(),
            },
        )?;

        Ok(ReleaseInfo {
            version,
            download_url: link.download_url,
        })
    }

    async fn stream_to_file(
        &self,
        release: &ReleaseInfo,
        dest: &Path,
        cancel: &CancelFlag,
    ) -> Result<u64, UpdateError> {
        let url = release.download_url.as_str();
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .context(DownloadSnafu { url })?;

        let status = response.status();
        if !status.is_success() {
            return DownloadStatusSnafu {
                url,
                status: status.as_u16(),
            }
            .fail();
        }

        let total = response.content_length().filter(|len| *len > 0);
        let mut file = tokio::fs::File::create(dest)
            .await
            .context(DownloadWriteSnafu { path: dest })?;
        let mut written: u64 = 0;
        let mut next_step: u64 = 20;

        loop {
            if cancel.is_cancelled() {
                return Err(UpdateError::Cancelled);
            }

            let chunk = match tokio::time::timeout(CANCEL_POLL, response.chunk()).await {
                Ok(chunk) => chunk.context(DownloadSnafu { url })?,
                Err(_) => continue,
            };
            let Some(bytes) = chunk else {
                break;
            };

            file.write_all(&bytes)
                .await
                .context(DownloadWriteSnafu { path: dest })?;
            written += bytes.len() as u64;

            if let Some(total) = total {
                let percent = written * 100 / total;
                while next_step <= 100 && percent >= next_step {
                    tracing::info!("download {}% ({} / {} bytes)", next_step, written, total);
                    next_step += 20;
                }
            }
        }

        file.flush()
            .await
            .context(DownloadWriteSnafu { path: dest })?;
        Ok(written)
    }
}

#[async_trait]
impl ReleaseFeed for HttpReleaseFeed {
    async fn latest_release(&self) -> Result<ReleaseInfo, UpdateError> {
        let url = self.metadata_url.as_str();
        tracing::debug!("fetching release metadata from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context(MetadataFetchSnafu { url })?;

        let status = response.status();
        if !status.is_success() {
            return MetadataStatusSnafu {
                url,
                status: status.as_u16(),
            }
            .fail();
        }

        let document: LinksDocument = response.json().await.context(MetadataParseSnafu)?;
        self.select_release(document)
    }

    async fn download(
        &self,
        release: &ReleaseInfo,
        dest: &Path,
        cancel: &CancelFlag,
    ) -> Result<u64, UpdateError> {
        tracing::info!("downloading {} to {}", release.download_url, dest.display());
        let result = self.stream_to_file(release, dest, cancel).await;
        match &result {
            Ok(bytes) => tracing::info!("download finished ({} bytes)", bytes),
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(dest).await
                    && remove.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!("failed to remove {}: {}", dest.display(), remove);
                }
                if e.is_informational() {
                    tracing::info!("download cancelled");
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> HttpReleaseFeed {
        let settings = UpdateSettings {
            platform: "serverBedrockLinux".to_string(),
            ..UpdateSettings::default()
        };
        HttpReleaseFeed::new(&settings).unwrap()
    }

    fn document(json: &str) -> LinksDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extracts_version_token() {
        assert_eq!(
            version_from_url(
                "https://example.com/bin-linux/bedrock-server-1.21.113.1.zip",
                "bedrock-server"
            ),
            Some("1.21.113.1".to_string())
        );
        assert_eq!(
            version_from_url("https://example.com/bedrock-server-latest.zip", "bedrock-server"),
            None
        );
        assert_eq!(
            version_from_url("https://example.com/other-1.2.3.4.zip", "bedrock-server"),
            None
        );
    }

    #[test]
    fn selects_platform_link() {
        let release = feed()
            .select_release(document(
                r#"{"result":{"links":[
                    {"downloadType":"serverBedrockWindows","downloadUrl":"https://x/bin-win/bedrock-server-1.21.113.1.zip"},
                    {"downloadType":"serverBedrockLinux","downloadUrl":"https://x/bin-linux/bedrock-server-1.21.113.1.zip"}
                ]}}"#,
            ))
            .unwrap();
        assert_eq!(release.version, "1.21.113.1");
        assert_eq!(
            release.download_url,
            "https://x/bin-linux/bedrock-server-1.21.113.1.zip"
        );
        assert_eq!(release.file_name(), "bedrock-server-1.21.113.1.zip");
    }

    #[test]
    fn missing_platform_is_an_error() {
        let err = feed()
            .select_release(document(r#"{"result":{"links":[]}}"#))
            .unwrap_err();
        assert!(matches!(err, UpdateError::MissingPlatformLink { .. }));
    }
}
