//! Fetching and normalizing pages from the source host

use futures::future;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

use crate::catalog::ChapterCatalog;
use crate::error::ApiError;
use crate::globals::get_http_client;
use crate::pipeline::{self, NOTES_ROOT, TEXT_ROOT};

/// Auxiliary reference pages: plain names with an `.htm` extension, nothing
/// that could climb out of the source directory or reach another host.
static SAFE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+\.htm$").expect("BUG: reference filename regex is valid")
});

/// A chapter ready for the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedChapter {
    pub id: String,
    pub title: String,
    pub text_html: String,
    pub notes_html: String,
    pub previous_id: Option<String>,
    pub next_id: Option<String>,
}

/// An auxiliary page from the source site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferencePage {
    pub title: String,
    pub html: String,
}

/// Download one page, failing on transport errors and non-success statuses
pub async fn fetch_page(url: &Url) -> Result<String, ApiError> {
    let response = get_http_client()
        .get(url.clone())
        .header("Accept", "text/html,application/xhtml+xml")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ApiError::Upstream(format!(
            "{} returned status {}",
            url,
            response.status()
        )));
    }

    Ok(response.text().await?)
}

async fn fetch_optional(url: Option<&Url>) -> Result<Option<String>, ApiError> {
    match url {
        Some(url) => fetch_page(url).await.map(Some),
        None => Ok(None),
    }
}

/// Fetch a chapter's text and (if it has one) annotations page concurrently,
/// then normalize both. Either fetch failing fails the whole chapter.
pub async fn get_chapter(
    catalog: &ChapterCatalog,
    id: &str,
) -> Result<NormalizedChapter, ApiError> {
    let descriptor = catalog
        .get(id)
        .ok_or_else(|| ApiError::NotFound(id.to_string()))?
        .clone();
    let previous_id = catalog.previous(id).map(|chapter| chapter.id.clone());
    let next_id = catalog.next(id).map(|chapter| chapter.id.clone());

    let (text_source, notes_source) = future::try_join(
        fetch_page(&descriptor.text_url),
        fetch_optional(descriptor.notes_url.as_ref()),
    )
    .await?;

    let chapter = tokio::task::spawn_blocking(move || {
        let text = pipeline::normalize_page(&text_source, TEXT_ROOT, &descriptor.text_url);
        let notes_html = match (notes_source, descriptor.notes_url.as_ref()) {
            (Some(source), Some(notes_url)) => {
                pipeline::normalize_page(&source, NOTES_ROOT, notes_url).html
            }
            _ => String::new(),
        };
        NormalizedChapter {
            id: descriptor.id,
            title: descriptor.title,
            text_html: text.html,
            notes_html,
            previous_id,
            next_id,
        }
    })
    .await?;

    tracing::debug!(
        id = %chapter.id,
        text_bytes = chapter.text_html.len(),
        notes_bytes = chapter.notes_html.len(),
        "chapter normalized"
    );
    Ok(chapter)
}

pub fn is_safe_reference(file: &str) -> bool {
    SAFE_REFERENCE.is_match(file)
}

/// Fetch and normalize an auxiliary page by bare filename
pub async fn get_reference(source_base: &Url, file: &str) -> Result<ReferencePage, ApiError> {
    if !is_safe_reference(file) {
        return Err(ApiError::InvalidReference(file.to_string()));
    }

    let url = source_base
        .join(file)
        .map_err(|e| ApiError::InvalidReference(format!("{}: {}", file, e)))?;
    let source = fetch_page(&url).await?;

    let fallback_title = file.to_string();
    let page = tokio::task::spawn_blocking(move || {
        pipeline::normalize_page(&source, TEXT_ROOT, &url)
    })
    .await?;

    Ok(ReferencePage {
        title: page.title.unwrap_or(fallback_title),
        html: page.html,
    })
}
