//! Artwork download
//!
//! Fetches an image URL and keeps the response metadata a constrained HTTP
//! client cares about alongside the body bytes.

use crate::Result;
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub status: StatusCode,
    pub requested_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub transfer_encoding: Option<String>,
    pub etag: Option<String>,
    pub cache_control: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedImage {
    pub fn redirected(&self) -> bool {
        self.final_url != self.requested_url
    }

    pub fn is_chunked(&self) -> bool {
        self.transfer_encoding
            .as_deref()
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"))
    }
}

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    pub fn new() -> Self {
        Self::new_with_client(Client::new())
    }

    pub fn new_with_client(client: Client) -> Self {
        Self { client }
    }

    /// Follows redirects. Non-success statuses are returned, not raised, so
    /// callers can report them.
    pub async fn fetch(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<FetchedImage> {
        tracing::debug!("Fetching image {} {:?}", url, query);

        let request = self.client.get(url).query(query).timeout(timeout).build()?;
        let requested_url = request.url().to_string();

        let response = self.client.execute(request).await.map_err(|e| {
            tracing::warn!("Failed to fetch {}: {}", requested_url, e);
            e
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(FetchedImage {
            status,
            requested_url,
            final_url,
            content_type: header_text(&headers, header::CONTENT_TYPE),
            content_length: header_text(&headers, header::CONTENT_LENGTH),
            transfer_encoding: header_text(&headers, header::TRANSFER_ENCODING),
            etag: header_text(&headers, header::ETAG),
            cache_control: header_text(&headers, header::CACHE_CONTROL),
            body,
        })
    }
}

impl Default for ImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_captures_headers_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/art.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "image/jpeg")
                    .insert_header("ETag", "\"abc\"")
                    .insert_header("Cache-Control", "max-age=60")
                    .set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]),
            )
            .mount(&server)
            .await;

        let url = format!("{}/art.jpg", server.uri());
        let fetched = ImageFetcher::new()
            .fetch(&url, &[], Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(fetched.status, StatusCode::OK);
        assert_eq!(fetched.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(fetched.content_length.as_deref(), Some("4"));
        assert_eq!(fetched.etag.as_deref(), Some("\"abc\""));
        assert_eq!(fetched.cache_control.as_deref(), Some("max-age=60"));
        assert_eq!(fetched.body, vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert!(!fetched.redirected());
        assert!(!fetched.is_chunked());
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let server = MockServer::start().await;

        Mock::given(path("/old"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/new", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"GIF89a".to_vec()))
            .mount(&server)
            .await;

        let url = format!("{}/old", server.uri());
        let fetched = ImageFetcher::new()
            .fetch(&url, &[], Duration::from_secs(5))
            .await
            .unwrap();

        assert!(fetched.redirected());
        assert!(fetched.final_url.ends_with("/new"));
        assert_eq!(fetched.body, b"GIF89a".to_vec());
    }

    #[tokio::test]
    async fn test_fetch_sends_query_and_keeps_error_status() {
        let server = MockServer::start().await;

        Mock::given(path("/art.jpg"))
            .and(query_param("size", "180"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/art.jpg", server.uri());
        let fetched = ImageFetcher::new()
            .fetch(&url, &[("size", "180".to_string())], Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(fetched.status, StatusCode::NOT_FOUND);
        assert!(fetched.body.is_empty());
    }

    #[test]
    fn test_chunked_detection_is_case_insensitive() {
        let fetched = FetchedImage {
            status: StatusCode::OK,
            requested_url: "http://a".to_string(),
            final_url: "http://a".to_string(),
            content_type: None,
            content_length: None,
            transfer_encoding: Some("Chunked".to_string()),
            etag: None,
            cache_control: None,
            body: Vec::new(),
        };
        assert!(fetched.is_chunked());
    }
}
