//! Reader session state and core logic
//!
//! One `App` owns everything the reader shows: the catalog and its href index,
//! the current chapter with its annotations tree, and the overlay stack. A new
//! chapter replaces the chapter state wholesale and always closes the overlay.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};
use tokio::sync::mpsc;
use url::Url;

use crate::api_client::{ApiClient, ChapterPayload, ChapterSummary, ReferencePayload};
use crate::config::{DEFAULT_SOURCE_BASE, parse_base_url};
use crate::links::{ChapterHrefIndex, ClassifiedLink, LinkDisposition, classify_links};
use crate::overlay::OverlayStack;
use crate::render_md::fragment_to_text;
use crate::snippets::{AnnotationsDocument, lookup_commentary};
use crate::upstream::is_safe_reference;

/// Messages sent from background tasks to the main app
#[derive(Debug)]
pub enum AppMessage {
    ChaptersLoaded(Vec<ChapterSummary>),
    ChapterLoaded(ChapterPayload),
    /// A preview, tagged with the chapter it was requested from
    ReferenceLoaded {
        chapter_id: Option<String>,
        reference: ReferencePayload,
    },
    LoadFailed(String),
}

/// Application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Waiting for the catalog or a chapter
    Loading,
    /// Showing a chapter (and possibly the overlay)
    Reading,
    /// Choosing a chapter from the catalog
    PickingChapter,
    /// Showing error message
    Error,
}

/// Rendered text plus its links, with a link cursor and scroll position
#[derive(Debug, Clone)]
pub struct PageView {
    pub title: String,
    pub text: String,
    pub links: Vec<ClassifiedLink>,
    pub selected_link: usize,
    pub scroll: u16,
}

impl PageView {
    fn new(title: &str, html: &str, index: &ChapterHrefIndex, source_base: &Url) -> Self {
        Self {
            title: title.to_string(),
            text: fragment_to_text(html),
            links: classify_links(html, index, source_base),
            selected_link: 0,
            scroll: 0,
        }
    }

    pub fn selected(&self) -> Option<&ClassifiedLink> {
        self.links.get(self.selected_link)
    }

    fn next_link(&mut self) {
        if !self.links.is_empty() {
            self.selected_link = (self.selected_link + 1) % self.links.len();
        }
    }

    fn previous_link(&mut self) {
        if !self.links.is_empty() {
            if self.selected_link == 0 {
                self.selected_link = self.links.len() - 1;
            } else {
                self.selected_link -= 1;
            }
        }
    }

    fn scroll_by(&mut self, delta: i32) {
        self.scroll = if delta < 0 {
            self.scroll.saturating_sub(delta.unsigned_abs() as u16)
        } else {
            self.scroll.saturating_add(delta as u16)
        };
    }
}

/// The chapter on screen
pub struct LoadedChapter {
    pub id: String,
    pub view: PageView,
    pub annotations: Option<AnnotationsDocument>,
    pub previous_id: Option<String>,
    pub next_id: Option<String>,
}

/// Main application structure
pub struct App {
    pub state: AppState,
    api: ApiClient,
    tx: mpsc::UnboundedSender<AppMessage>,
    pub chapters: Vec<ChapterSummary>,
    href_index: ChapterHrefIndex,
    source_base: Url,
    /// Catalog position of the chapter shown (the selection control)
    pub selected_chapter: usize,
    /// Cursor inside the chapter picker
    pub picker_index: usize,
    pub chapter: Option<LoadedChapter>,
    pub overlay: OverlayStack,
    /// Rendered top overlay entry
    pub overlay_view: Option<PageView>,
    pub error_message: Option<String>,
    /// Status message shown in UI
    pub status_message: String,
}

impl App {
    /// Create new app instance
    pub fn new(api: ApiClient, tx: mpsc::UnboundedSender<AppMessage>) -> Result<Self> {
        Ok(Self {
            state: AppState::Loading,
            api,
            tx,
            chapters: Vec::new(),
            href_index: ChapterHrefIndex::default(),
            source_base: parse_base_url(DEFAULT_SOURCE_BASE)?,
            selected_chapter: 0,
            picker_index: 0,
            chapter: None,
            overlay: OverlayStack::new(),
            overlay_view: None,
            error_message: None,
            status_message: String::new(),
        })
    }

    /// Fetch the catalog in the background
    pub fn request_chapters(&mut self) {
        self.state = AppState::Loading;
        self.status_message = "Loading chapter list...".to_string();

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = match api.fetch_chapters().await {
                Ok(chapters) => AppMessage::ChaptersLoaded(chapters),
                Err(e) => AppMessage::LoadFailed(format!("Failed to load chapter list: {:#}", e)),
            };
            let _ = tx.send(message);
        });
    }

    pub fn handle_message(&mut self, message: AppMessage) {
        match message {
            AppMessage::ChaptersLoaded(chapters) => self.finish_chapters(chapters),
            AppMessage::ChapterLoaded(payload) => self.finish_chapter(payload),
            AppMessage::ReferenceLoaded {
                chapter_id,
                reference,
            } => {
                let current = self.chapter.as_ref().map(|chapter| chapter.id.as_str());
                if self.state != AppState::Reading || current != chapter_id.as_deref() {
                    tracing::debug!(title = %reference.title, "dropping stale preview");
                    return;
                }
                self.overlay.push(reference.html, reference.title);
                self.refresh_overlay_view();
            }
            AppMessage::LoadFailed(err) => {
                tracing::error!(error = %err, "load failed");
                self.show_error(&err);
            }
        }
    }

    fn finish_chapters(&mut self, chapters: Vec<ChapterSummary>) {
        self.href_index = ChapterHrefIndex::from_chapters(&chapters);
        if self.href_index.is_empty() {
            tracing::warn!("catalog has no text URLs; chapter links will not resolve");
        }
        if let Some(base) = source_base_of(&chapters) {
            self.source_base = base;
        }
        tracing::info!(
            chapters = chapters.len(),
            indexed = self.href_index.len(),
            source = %self.source_base,
            "catalog loaded"
        );
        self.chapters = chapters;

        match self.chapters.first().map(|chapter| chapter.id.clone()) {
            Some(first) => self.load_chapter(&first),
            None => self.show_error("The server returned no chapters"),
        }
    }

    /// Load a chapter in the background. The overlay closes immediately; an
    /// earlier load still in flight is not cancelled, so whichever response
    /// arrives last is what stays on screen. The selection only moves once a
    /// chapter actually arrives.
    pub fn load_chapter(&mut self, id: &str) {
        self.close_overlay();
        self.state = AppState::Loading;
        self.status_message = format!("Loading {}...", self.chapter_title(id));

        let api = self.api.clone();
        let tx = self.tx.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            let message = match api.fetch_chapter(&id).await {
                Ok(payload) => AppMessage::ChapterLoaded(payload),
                Err(e) => AppMessage::LoadFailed(format!("Failed to load chapter: {:#}", e)),
            };
            let _ = tx.send(message);
        });
    }

    fn finish_chapter(&mut self, payload: ChapterPayload) {
        if let Some(position) = self.chapters.iter().position(|c| c.id == payload.id) {
            self.selected_chapter = position;
            self.picker_index = position;
        }

        let view = PageView::new(
            &payload.title,
            &payload.text_html,
            &self.href_index,
            &self.source_base,
        );
        let annotations = AnnotationsDocument::parse(&payload.notes_html);
        self.status_message = format!(
            "{} links{}",
            view.links.len(),
            if annotations.is_some() { ", annotated" } else { "" }
        );

        self.close_overlay();
        self.chapter = Some(LoadedChapter {
            id: payload.id,
            view,
            annotations,
            previous_id: payload.previous_id,
            next_id: payload.next_id,
        });
        self.state = AppState::Reading;
    }

    fn chapter_title(&self, id: &str) -> String {
        self.chapters
            .iter()
            .find(|chapter| chapter.id == id)
            .map(|chapter| chapter.title.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Links of whatever has focus: the overlay when shown, else the chapter
    pub fn active_view(&self) -> Option<&PageView> {
        if self.overlay.is_visible() {
            self.overlay_view.as_ref()
        } else {
            self.chapter.as_ref().map(|chapter| &chapter.view)
        }
    }

    fn active_view_mut(&mut self) -> Option<&mut PageView> {
        if self.overlay.is_visible() {
            self.overlay_view.as_mut()
        } else {
            self.chapter.as_mut().map(|chapter| &mut chapter.view)
        }
    }

    pub fn next_link(&mut self) {
        if let Some(view) = self.active_view_mut() {
            view.next_link();
        }
    }

    pub fn previous_link(&mut self) {
        if let Some(view) = self.active_view_mut() {
            view.previous_link();
        }
    }

    /// Scroll the focused pane. The chapter text stays put while the overlay
    /// is visible.
    pub fn scroll(&mut self, delta: i32) {
        let view = if self.overlay.state().locks_scroll() {
            self.overlay_view.as_mut()
        } else {
            self.chapter.as_mut().map(|chapter| &mut chapter.view)
        };
        if let Some(view) = view {
            view.scroll_by(delta);
        }
    }

    /// Follow the selected link according to its disposition
    pub fn activate_selected_link(&mut self) {
        if self.state == AppState::Loading {
            return;
        }
        let Some(link) = self.active_view().and_then(PageView::selected).cloned() else {
            return;
        };
        tracing::debug!(href = %link.href, disposition = ?link.disposition, "link activated");

        match link.disposition {
            LinkDisposition::Annotation { phrase } => self.open_commentary(&phrase),
            LinkDisposition::Chapter { id } => self.load_chapter(&id),
            LinkDisposition::SourceDocument { url } => self.open_external(&url),
            LinkDisposition::External { href } => self.open_external(&href),
        }
    }

    /// Push the commentary for `phrase` onto the overlay
    pub fn open_commentary(&mut self, phrase: &str) {
        let annotations = self
            .chapter
            .as_ref()
            .and_then(|chapter| chapter.annotations.as_ref());
        let html = lookup_commentary(annotations, phrase).into_html();
        let title = if phrase.is_empty() { "Commentary" } else { phrase };
        self.overlay.push(html, title);
        self.refresh_overlay_view();
    }

    /// Show the selected source-site page inside the overlay
    pub fn preview_selected_reference(&mut self) {
        if self.state == AppState::Loading {
            return;
        }
        let Some(link) = self.active_view().and_then(PageView::selected) else {
            return;
        };
        let LinkDisposition::SourceDocument { url } = &link.disposition else {
            self.status_message = "Only source-site pages can be previewed".to_string();
            return;
        };
        let Some(file) = reference_filename(url) else {
            self.status_message = format!("Cannot preview {}", url);
            return;
        };

        self.status_message = format!("Loading {}...", file);
        let chapter_id = self.chapter.as_ref().map(|chapter| chapter.id.clone());
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = match api.fetch_reference(&file).await {
                Ok(reference) => AppMessage::ReferenceLoaded {
                    chapter_id,
                    reference,
                },
                Err(e) => AppMessage::LoadFailed(format!("Failed to load {}: {:#}", file, e)),
            };
            let _ = tx.send(message);
        });
    }

    fn open_external(&mut self, url: &str) {
        match open_url(url) {
            Ok(()) => self.status_message = format!("Opened {} in browser", url),
            Err(e) => self.show_error(&format!("Failed to open URL: {:#}", e)),
        }
    }

    /// Back: previous overlay entry, or close at depth one
    pub fn overlay_back(&mut self) {
        self.overlay.pop();
        self.refresh_overlay_view();
    }

    pub fn close_overlay(&mut self) {
        self.overlay.close_completely();
        self.overlay_view = None;
    }

    /// A click on the dimmed area around the overlay panel
    pub fn backdrop_clicked(&mut self) {
        if self.overlay.is_visible() {
            self.close_overlay();
        }
    }

    fn refresh_overlay_view(&mut self) {
        self.overlay_view = self.overlay.top().map(|entry| {
            PageView::new(&entry.title, &entry.html, &self.href_index, &self.source_base)
        });
    }

    /// Neighbours come from the loaded chapter, else from the catalog order
    pub fn next_chapter(&mut self) {
        if self.state == AppState::Loading {
            return;
        }
        let next = match self.chapter.as_ref() {
            Some(chapter) => chapter.next_id.clone(),
            None => self
                .chapters
                .get(self.selected_chapter + 1)
                .map(|chapter| chapter.id.clone()),
        };
        if let Some(id) = next {
            self.load_chapter(&id);
        }
    }

    pub fn previous_chapter(&mut self) {
        if self.state == AppState::Loading {
            return;
        }
        let previous = match self.chapter.as_ref() {
            Some(chapter) => chapter.previous_id.clone(),
            None => self
                .selected_chapter
                .checked_sub(1)
                .and_then(|index| self.chapters.get(index))
                .map(|chapter| chapter.id.clone()),
        };
        if let Some(id) = previous {
            self.load_chapter(&id);
        }
    }

    pub fn open_picker(&mut self) {
        if !self.chapters.is_empty() {
            self.picker_index = self.selected_chapter;
            self.state = AppState::PickingChapter;
        }
    }

    pub fn close_picker(&mut self) {
        self.state = AppState::Reading;
    }

    pub fn picker_next(&mut self) {
        if !self.chapters.is_empty() {
            self.picker_index = (self.picker_index + 1) % self.chapters.len();
        }
    }

    pub fn picker_previous(&mut self) {
        if !self.chapters.is_empty() {
            self.picker_index = self
                .picker_index
                .checked_sub(1)
                .unwrap_or(self.chapters.len() - 1);
        }
    }

    pub fn confirm_picker(&mut self) {
        if let Some(chapter) = self.chapters.get(self.picker_index) {
            let id = chapter.id.clone();
            self.load_chapter(&id);
        }
    }

    /// Show error message
    pub fn show_error(&mut self, message: &str) {
        self.error_message = Some(message.to_string());
        self.state = AppState::Error;
    }

    /// Dismiss error
    pub fn dismiss_error(&mut self) {
        self.error_message = None;
        self.state = AppState::Reading;
    }
}

/// Directory of the first chapter page: the source site's base
fn source_base_of(chapters: &[ChapterSummary]) -> Option<Url> {
    chapters
        .iter()
        .find_map(|chapter| chapter.text_url.as_deref())
        .and_then(|text_url| Url::parse(text_url).ok())
        .and_then(|text_url| text_url.join("./").ok())
}

/// Bare filename of a source-site page, if it is one `/api/ref` accepts
fn reference_filename(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let file = url.path_segments()?.next_back()?.to_string();
    is_safe_reference(&file).then_some(file)
}

/// Open URL in default browser
fn open_url(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut command = Command::new("open");
        command.arg(url);
        command
    };

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", "", url]);
        command
    };

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        command
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Failed to open browser")?;
    Ok(())
}
