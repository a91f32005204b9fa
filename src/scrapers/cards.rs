//! Listing-page card extraction and the pagination walker.
//!
//! A topic listing is an unknown number of pages of article "cards". The
//! walker decides once per topic whether the listing is paginated (presence
//! of the page-navigation element on page 1) and then scans successive
//! `{topic_url}/page/{n}/` pages until a full scan yields no card it hasn't
//! already seen. Deduplication uses [`Card`] structural equality over the
//! extracted fields, because the site's pagination can overlap or reorder
//! cards between pages; counting cards would not terminate correctly.

use crate::errors::{DigestError, Result};
use crate::fetch::SiteClient;
use crate::models::{Card, Topic, TopicTag};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use url::Url;

/// `Mon D, YYYY` date as it appears in card text and article bylines.
pub(crate) static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z]{3} \d{1,2}, \d{4})").unwrap());

pub(crate) const DATE_FORMAT: &str = "%b %d, %Y";

/// Whether a listing page links to further pages.
pub fn has_multiple_pages(document: &Html) -> bool {
    let nav_selector = Selector::parse(r#"nav[aria-label="Page Navigation"]"#).unwrap();
    document.select(&nav_selector).next().is_some()
}

/// Extract every article card from a parsed listing page.
///
/// Relative hrefs resolve against `base_url`. Fails with
/// [`DigestError::MissingTitle`] / [`DigestError::MissingCardLink`] when a
/// card lacks its heading or article anchor.
pub fn extract_cards(document: &Html, base_url: &Url) -> Result<Vec<Card>> {
    let card_selector = Selector::parse("div.card.border-0").unwrap();
    document
        .select(&card_selector)
        .map(|card| build_card(card, base_url))
        .collect()
}

fn build_card(card: ElementRef<'_>, base_url: &Url) -> Result<Card> {
    let title_selector = Selector::parse("h2.card-title").unwrap();
    let anchor_selector = Selector::parse("a").unwrap();
    let join_selector = Selector::parse(r#"a[href="/account/join/"]"#).unwrap();
    let badge_selector = Selector::parse("a.badge.badge-light.text-muted").unwrap();

    let title = card
        .select(&title_selector)
        .next()
        .map(|h| h.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DigestError::MissingTitle {
            url: base_url.to_string(),
        })?;

    let href = card
        .select(&anchor_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or_else(|| DigestError::MissingCardLink {
            url: base_url.to_string(),
        })?;
    let url = base_url.join(href)?.to_string();

    let is_premium = card.select(&join_selector).next().is_some();

    let card_text = card.text().collect::<String>();
    let date = DATE_RE
        .find(&card_text)
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), DATE_FORMAT).ok());

    let tags: Vec<TopicTag> = card
        .select(&badge_selector)
        .filter_map(|badge| {
            badge.value().attr("href").map(|href| {
                Ok(TopicTag {
                    name: badge.text().collect::<String>().trim().to_string(),
                    url: base_url.join(href)?.to_string(),
                })
            })
        })
        .collect::<Result<_>>()?;
    let tags = if tags.is_empty() { None } else { Some(tags) };

    Ok(Card {
        title,
        url,
        is_premium,
        date,
        tags,
    })
}

/// Walk a topic's listing pages and collect its cards, deduplicated, in
/// page-then-card order.
///
/// Termination:
/// - page 1 has no page-navigation element: that single page is all there is;
/// - a scan introduces zero previously-unseen cards: the listing is done;
/// - a page beyond the first answers 404: the listing ran out of pages.
///
/// Any other fetch or extraction failure propagates; a transient network
/// error is an error, not an end-of-results signal.
#[instrument(level = "info", skip_all, fields(topic = %topic.name))]
pub async fn collect_topic_cards(client: &mut SiteClient, topic: &Topic) -> Result<Vec<Card>> {
    let topic_url = Url::parse(&topic.url)?;

    let first_page = client.get(&topic.url).await?;
    let first_document = Html::parse_document(&first_page.body);
    let multipaged = has_multiple_pages(&first_document);

    let mut seen: HashSet<Card> = HashSet::new();
    let mut collected: Vec<Card> = Vec::new();

    let new_on_first = absorb(extract_cards(&first_document, &topic_url)?, &mut seen, &mut collected);
    debug!(page = 1, new_cards = new_on_first, "Scanned listing page");

    if !multipaged {
        info!(cards = collected.len(), pages = 1, "Collected topic cards");
        return Ok(collected);
    }

    let mut page = 1usize;
    if new_on_first > 0 {
        loop {
            page += 1;
            let page_url = topic_url.join(&format!("page/{page}/"))?;
            let body = match client.get(page_url.as_str()).await {
                Ok(response) => response.body,
                Err(DigestError::UnsuccessfulFetch { status: 404, .. }) => {
                    debug!(page, "Listing page not found; end of results");
                    break;
                }
                Err(e) => return Err(e),
            };

            let document = Html::parse_document(&body);
            let new_cards = absorb(extract_cards(&document, &topic_url)?, &mut seen, &mut collected);
            debug!(page, new_cards, total = collected.len(), "Scanned listing page");

            if new_cards == 0 {
                break;
            }
        }
    }

    info!(cards = collected.len(), pages = page, "Collected topic cards");
    Ok(collected)
}

/// Append the unseen cards to `collected`, preserving scan order; returns
/// how many were new.
fn absorb(cards: Vec<Card>, seen: &mut HashSet<Card>, collected: &mut Vec<Card>) -> usize {
    let mut new_cards = 0usize;
    for card in cards {
        if seen.insert(card.clone()) {
            collected.push(card);
            new_cards += 1;
        }
    }
    new_cards
}
