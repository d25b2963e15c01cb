//! Chapter catalog
//!
//! The source edition's structure is fixed data: five parts with known
//! chapter counts, one page per chapter named after its part and chapter
//! numbers, and an annotations page for the annotated chapters.

use serde::Serialize;
use url::Url;

/// Chapters per part, part 1 first
pub const CHAPTER_COUNTS: [u32; 5] = [43, 11, 8, 1, 6];

/// Parts whose chapters have an annotations page
const ANNOTATED_PARTS: &[u32] = &[1];

/// The single-page part, addressed by its part number alone
const SINGLETON_PART: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDescriptor {
    pub id: String,
    pub part: u32,
    pub chapter: u32,
    pub title: String,
    pub text_url: Url,
    pub notes_url: Option<Url>,
}

/// Immutable, ordered list of every chapter
#[derive(Debug, Clone)]
pub struct ChapterCatalog {
    chapters: Vec<ChapterDescriptor>,
}

impl ChapterCatalog {
    /// Build the catalog with page URLs under `source_base`
    pub fn build(source_base: &Url) -> Self {
        Self {
            chapters: build_chapters(source_base),
        }
    }

    pub fn chapters(&self) -> &[ChapterDescriptor] {
        &self.chapters
    }

    pub fn get(&self, id: &str) -> Option<&ChapterDescriptor> {
        self.chapters.iter().find(|chapter| chapter.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.chapters.iter().position(|chapter| chapter.id == id)
    }

    /// Next chapter in catalog order
    pub fn next(&self, id: &str) -> Option<&ChapterDescriptor> {
        self.position(id).and_then(|index| self.chapters.get(index + 1))
    }

    /// Previous chapter in catalog order
    pub fn previous(&self, id: &str) -> Option<&ChapterDescriptor> {
        self.position(id)
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| self.chapters.get(index))
    }
}

/// Derive every chapter descriptor from the part/chapter tables
pub fn build_chapters(source_base: &Url) -> Vec<ChapterDescriptor> {
    let mut chapters = Vec::new();
    for (part, &count) in (1u32..).zip(CHAPTER_COUNTS.iter()) {
        for chapter in 1..=count {
            let token = page_token(part, chapter);
            let title = if part == SINGLETON_PART {
                format!("Part {}", part)
            } else {
                format!("Part {}, Chapter {}", part, chapter)
            };
            let notes_url = has_annotations(part, chapter)
                .then(|| join_page(source_base, &format!("ada{}ann.htm", token)));

            chapters.push(ChapterDescriptor {
                id: format!("p{}c{}", part, chapter),
                part,
                chapter,
                title,
                text_url: join_page(source_base, &format!("ada{}.htm", token)),
                notes_url,
            });
        }
    }
    chapters
}

/// Filename token: the part number alone for the singleton part, otherwise
/// part and chapter numbers concatenated (part 2 chapter 1 is `21`).
fn page_token(part: u32, chapter: u32) -> String {
    if part == SINGLETON_PART {
        part.to_string()
    } else {
        format!("{}{}", part, chapter)
    }
}

fn has_annotations(part: u32, _chapter: u32) -> bool {
    ANNOTATED_PARTS.contains(&part)
}

fn join_page(base: &Url, filename: &str) -> Url {
    // Plain alphanumeric filenames always resolve against an http(s) base
    base.join(filename).unwrap_or_else(|_| base.clone())
}
