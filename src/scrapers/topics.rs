//! Topic discovery from the site root's navigation sidebar.
//!
//! Topics are enumerated exactly once per run and collected into a
//! [`TopicCatalog`]; every later component receives the catalog by
//! reference instead of re-fetching or sharing hidden global state.

use crate::errors::{DigestError, Result};
use crate::fetch::{SiteClient, BASE_URL};
use crate::models::{Topic, TopicCatalog};
use scraper::{Html, Selector};
use tracing::{info, instrument};
use url::Url;

/// Fetch the site root and enumerate the topic sidebar.
#[instrument(level = "info", skip_all)]
pub async fn discover_topics(client: &mut SiteClient) -> Result<TopicCatalog> {
    let page = client.get(BASE_URL).await?;
    let document = Html::parse_document(&page.body);
    let base = Url::parse(BASE_URL)?;

    let topics = extract_topics(&document, &base)?;
    info!(count = topics.len(), "Discovered topics");
    Ok(TopicCatalog::new(topics))
}

/// Pull (name, absolute URL) topic pairs out of a parsed site-root page.
///
/// The sidebar is the fixed `div.sidebar-module.sidebar-module-inset.border`
/// container; its badge-style anchors are the topics, kept in document
/// order. A root page without that container fails with
/// [`DigestError::MissingTopicSidebar`].
pub fn extract_topics(document: &Html, base: &Url) -> Result<Vec<Topic>> {
    let sidebar_selector =
        Selector::parse("div.sidebar-module.sidebar-module-inset.border").unwrap();
    let badge_selector = Selector::parse("a.badge.badge-light.text-muted").unwrap();

    let sidebar = document
        .select(&sidebar_selector)
        .next()
        .ok_or_else(|| DigestError::MissingTopicSidebar {
            url: base.to_string(),
        })?;

    let mut topics = Vec::new();
    for anchor in sidebar.select(&badge_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let name = anchor.text().collect::<String>().trim().to_string();
        if name.is_empty() {
            continue;
        }
        topics.push(Topic {
            name,
            url: base.join(href)?.to_string(),
        });
    }

    Ok(topics)
}
