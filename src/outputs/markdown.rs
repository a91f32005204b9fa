//! Per-topic markdown rendering with reference-style links.
//!
//! Every URL that appears in a topic document gets a small integer ID from
//! a document-scoped [`LinkRegistry`], assigned in first-use order. Links
//! render as `[label][id]` and each tutorial section closes with its own
//! `[id]: url` block listing the URLs that section referenced, sorted by
//! ID. A URL shared between sections (a common tag, say) keeps one ID for
//! the whole document.

use crate::models::TutorialSummary;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt::Write;

/// Display name of the site, used in document titles.
const SITE_NAME: &str = "Real Python";

/// Placeholder body for tutorials whose introduction could not be extracted.
const NO_INTRO_NOTICE: &str = "> No introduction available";

/// Document-scoped registry assigning each distinct URL a stable integer ID.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    ids: HashMap<String, usize>,
    urls: Vec<String>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ID for `url`, allocating the next integer (starting at 1) on
    /// first use.
    pub fn id_for(&mut self, url: &str) -> usize {
        if let Some(&id) = self.ids.get(url) {
            return id;
        }
        self.urls.push(url.to_string());
        let id = self.urls.len();
        self.ids.insert(url.to_string(), id);
        id
    }

    /// The URL registered under `id`, if any.
    pub fn url_for(&self, id: usize) -> Option<&str> {
        self.urls.get(id.checked_sub(1)?).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Render one topic's full markdown document.
pub fn render_topic(topic_name: &str, summaries: &[TutorialSummary]) -> String {
    let mut registry = LinkRegistry::new();
    let mut document = String::new();

    writeln!(
        document,
        "# {topic_name} tutorials and courses from {SITE_NAME}"
    )
    .unwrap();
    writeln!(document).unwrap();

    for summary in summaries {
        document.push_str(&render_section(&mut registry, summary));
    }

    document
}

/// Render one tutorial section: linked heading, optional metadata line,
/// introduction (or notice), and the section's reference block.
pub fn render_section(registry: &mut LinkRegistry, tutorial: &TutorialSummary) -> String {
    let mut used: Vec<usize> = Vec::new();
    let mut section = String::new();

    let article_id = reference(registry, &mut used, &tutorial.url);
    writeln!(section, "## [{}][{}]", tutorial.title, article_id).unwrap();
    writeln!(section).unwrap();

    if let (Some(author), Some(tags), Some(comments)) =
        (&tutorial.author, &tutorial.tags, &tutorial.comments)
    {
        let author_id = reference(registry, &mut used, &author.url);
        let tag_links = tags
            .iter()
            .map(|tag| format!("[{}][{}]", tag.name, reference(registry, &mut used, &tag.url)))
            .join(", ");
        let comments_label = if comments.count == 1 {
            "1 comment".to_string()
        } else {
            format!("{} comments", comments.count)
        };
        let comments_id = reference(registry, &mut used, &comments.url);
        let date_segment = tutorial
            .date
            .map(|date| format!("on {} ", date.format("%a, %d %b %Y")))
            .unwrap_or_default();

        writeln!(
            section,
            "by [{}][{}] {date_segment}with tags: {tag_links} ([{comments_label}][{comments_id}])",
            author.name, author_id
        )
        .unwrap();
        writeln!(section).unwrap();
    }

    match tutorial.introduction.as_deref() {
        Some(introduction) if !introduction.is_empty() => {
            section.push_str(introduction);
            section.push_str("\n\n");
        }
        _ => {
            section.push_str(NO_INTRO_NOTICE);
            section.push_str("\n\n");
        }
    }

    used.sort_unstable();
    for id in &used {
        let url = registry.url_for(*id).expect("every used ID was registered");
        writeln!(section, "[{id}]: {url}").unwrap();
    }
    section.push('\n');

    section
}

/// Register `url` and remember its ID as used by the current section.
fn reference(registry: &mut LinkRegistry, used: &mut Vec<usize>, url: &str) -> usize {
    let id = registry.id_for(url);
    if !used.contains(&id) {
        used.push(id);
    }
    id
}
