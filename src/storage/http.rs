//! HTTP object-store client (bucket-style REST API).

use async_trait::async_trait;

use super::{BlobStore, StorageError};

/// Client for a hosted object store exposing the common bucket REST shape:
/// `POST {base}/object/{bucket}/{key}` to write (with upsert header),
/// `GET {base}/object/{bucket}/{key}` to read,
/// `{base}/object/public/{bucket}/{key}` as the public URL.
pub struct HttpBlobStore {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, bucket: &str, api_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("HTTP client construction");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, key)
    }

    fn map_send_error(&self, e: reqwest::Error) -> StorageError {
        if e.is_connect() || e.is_timeout() {
            StorageError::Connection(format!("{}: {e}", self.base_url))
        } else {
            StorageError::Connection(e.to_string())
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .http
            .post(self.object_url(key))
            .bearer_auth(&self.api_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .http
            .get(self.object_url(key))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_shape() {
        let store = HttpBlobStore::new("https://store.example.test/", "proposals", "secret");
        assert_eq!(
            store.public_url("abc-bid.pdf"),
            "https://store.example.test/object/public/proposals/abc-bid.pdf"
        );
    }

    #[test]
    fn trailing_slash_trimmed_from_base_url() {
        let store = HttpBlobStore::new("https://store.example.test///", "proposals", "secret");
        assert!(!store.object_url("k").contains("///object"));
    }
}
