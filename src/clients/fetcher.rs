/// Document fetcher
///
/// Retrieves raw text from a URL or a local file path. No interpretation.
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::Config;
use crate::error::FetchError;

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch the text behind `source`, preserving it byte-for-byte after UTF-8 decoding
    async fn fetch(&self, source: &str) -> Result<String, FetchError>;
}

/// Fetches `http(s)://` locators over HTTP and everything else from disk
pub struct HttpDocumentFetcher {
    client: reqwest::Client,
}

impl HttpDocumentFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| FetchError::Unreachable {
                source_url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable {
                source_url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                source_url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Unreachable {
            source_url: url.to_string(),
            reason: e.to_string(),
        })?;

        decode(url, bytes.to_vec())
    }

    async fn fetch_file(&self, path: &str) -> Result<String, FetchError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| FetchError::ReadFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        decode(path, bytes)
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, source: &str) -> Result<String, FetchError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(FetchError::EmptySource);
        }

        debug!("Fetching document: {}", source);

        let text = if source.starts_with("http://") || source.starts_with("https://") {
            self.fetch_http(source).await?
        } else {
            let path = source.strip_prefix("file://").unwrap_or(source);
            self.fetch_file(path).await?
        };

        debug!("Fetched {} bytes from {}", text.len(), source);
        Ok(text)
    }
}

fn decode(source: &str, bytes: Vec<u8>) -> Result<String, FetchError> {
    String::from_utf8(bytes).map_err(|_| FetchError::Decode {
        source_url: source.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fetcher() -> HttpDocumentFetcher {
        HttpDocumentFetcher::new(&Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_file_text_is_preserved_verbatim() {
        let text = "  Roles are assigned.\r\n\tNo periodic review.\n\n";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        let fetched = fetcher()
            .fetch(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(fetched, text);
    }

    #[tokio::test]
    async fn test_file_scheme_is_accepted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"policy").unwrap();

        let locator = format!("file://{}", file.path().display());
        assert_eq!(fetcher().fetch(&locator).await.unwrap(), "policy");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decode_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00]).unwrap();

        let err = fetcher()
            .fetch(file.path().to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let err = fetcher().fetch("/no/such/evidence.txt").await.unwrap_err();
        assert!(matches!(err, FetchError::ReadFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_locator_is_rejected() {
        let err = fetcher().fetch("   ").await.unwrap_err();
        assert!(matches!(err, FetchError::EmptySource));
    }
}
