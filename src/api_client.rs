//! Client for the chapter API
//!
//! Uses the global HTTP client for connection pooling and reuse.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::globals::get_http_client;

/// Catalog entry as served by `/api/chapters`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub text_url: Option<String>,
    #[serde(default)]
    pub notes_url: Option<String>,
}

/// A normalized chapter as served by `/api/chapter/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterPayload {
    pub id: String,
    pub title: String,
    pub text_html: String,
    pub notes_html: String,
    #[serde(default)]
    pub previous_id: Option<String>,
    #[serde(default)]
    pub next_id: Option<String>,
}

/// An auxiliary page as served by `/api/ref/{file}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferencePayload {
    pub title: String,
    pub html: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
}

impl ApiClient {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub async fn fetch_chapters(&self) -> Result<Vec<ChapterSummary>> {
        self.get_json("api/chapters").await
    }

    pub async fn fetch_chapter(&self, id: &str) -> Result<ChapterPayload> {
        self.get_json(&format!("api/chapter/{}", urlencoding::encode(id)))
            .await
    }

    pub async fn fetch_reference(&self, file: &str) -> Result<ReferencePayload> {
        self.get_json(&format!("api/ref/{}", urlencoding::encode(file)))
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self
            .base
            .join(path)
            .with_context(|| format!("Invalid API path: {}", path))?;

        let response = get_http_client()
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "no error details".to_string());
            anyhow::bail!("Server returned {}: {}", status, message);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::get};
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn fake_server() -> Url {
        let app = Router::new()
            .route(
                "/api/chapters",
                get(|| async { Json(json!([{ "id": "p1c1", "title": "Part 1, Chapter 1" }])) }),
            )
            .route(
                "/api/chapter/p1c1",
                get(|| async {
                    Json(json!({
                        "id": "p1c1",
                        "title": "Part 1, Chapter 1",
                        "textHtml": "<p>All happy families</p>",
                        "notesHtml": ""
                    }))
                }),
            )
            .route(
                "/api/chapter/p9c9",
                get(|| async {
                    (StatusCode::NOT_FOUND, Json(json!({ "error": "Unknown chapter: p9c9" })))
                }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{}/", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_chapters_accepts_short_form() {
        let client = ApiClient::new(fake_server().await);
        let chapters = client.fetch_chapters().await.unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].text_url, None);
    }

    #[tokio::test]
    async fn test_fetch_chapter() {
        let client = ApiClient::new(fake_server().await);
        let chapter = client.fetch_chapter("p1c1").await.unwrap();
        assert_eq!(chapter.text_html, "<p>All happy families</p>");
        assert!(chapter.notes_html.is_empty());
    }

    #[tokio::test]
    async fn test_error_body_surfaces() {
        let client = ApiClient::new(fake_server().await);
        let err = client.fetch_chapter("p9c9").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("Unknown chapter: p9c9"));
    }
}
