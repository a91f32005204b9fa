//! Lazy per-article metadata and introduction extraction.
//!
//! A [`Tutorial`] starts as nothing but its listing-card fields. Every
//! derived field (paywall flag, author, date, tags, comment data, the
//! introduction markdown) is computed independently, on first use, and at
//! most once; the article page itself is fetched and parsed a single time.
//!
//! The availability flags (`has_author`, `has_date`, `has_tags`,
//! `has_comments`) are the only way to learn whether a value exists, and
//! they must be consulted before the matching value accessor: reading a
//! value whose flag was never resolved (or resolved false) is a programming
//! error and panics instead of silently returning nothing.
//!
//! Paywalled articles (the page `<title>` carries the fixed "Membership"
//! marker) yield no page-derived metadata at all. Premium and `/courses/`
//! articles never have a comments widget, so comment availability is
//! decided from the URL alone, before any secondary fetch.

use crate::errors::{DigestError, Result};
use crate::fetch::SiteClient;
use crate::models::{Author, Card, Comments, Lazy, TopicTag, TutorialSummary};
use crate::scrapers::cards::{DATE_FORMAT, DATE_RE};
use crate::scrapers::comments;
use crate::utils::fragment_to_markdown;
use chrono::NaiveDate;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use tracing::{instrument, warn};
use url::Url;

/// Substring of the page `<title>` that marks a members-only article.
const PAYWALL_MARKER: &str = "Membership";

/// Fixed notice rendered in place of a paywalled introduction.
pub const PAYWALL_NOTICE: &str = "> No introduction available (behind paywall)";

/// One article, scraped lazily.
#[derive(Debug)]
pub struct Tutorial {
    pub title: String,
    pub url: String,
    pub is_premium: bool,
    card_date: Option<NaiveDate>,
    card_tags: Option<Vec<TopicTag>>,
    document: Option<Html>,
    paywalled: Option<bool>,
    author: Lazy<Author>,
    date: Lazy<NaiveDate>,
    tags: Lazy<Vec<TopicTag>>,
    comments_available: Option<bool>,
    comments: Lazy<Comments>,
    introduction: Option<String>,
}

impl Tutorial {
    /// Take ownership of a listing card; everything else is derived later.
    pub fn from_card(card: Card) -> Self {
        Self {
            title: card.title,
            url: card.url,
            is_premium: card.is_premium,
            card_date: card.date,
            card_tags: card.tags,
            document: None,
            paywalled: None,
            author: Lazy::Unknown,
            date: Lazy::Unknown,
            tags: Lazy::Unknown,
            comments_available: None,
            comments: Lazy::Unknown,
            introduction: None,
        }
    }

    /// Course articles live under `/courses/`; they share the premium
    /// extraction path and never render a comments widget.
    pub fn is_course(&self) -> bool {
        self.url.contains("/courses/")
    }

    async fn ensure_document(&mut self, client: &mut SiteClient) -> Result<()> {
        if self.document.is_none() {
            let page = client.get(&self.url).await?;
            self.document = Some(Html::parse_document(&page.body));
        }
        Ok(())
    }

    fn document(&self) -> &Html {
        self.document
            .as_ref()
            .expect("article document fetched before extraction")
    }

    /// Whether the article page is behind the membership paywall.
    pub async fn behind_paywall(&mut self, client: &mut SiteClient) -> Result<bool> {
        if self.paywalled.is_none() {
            self.ensure_document(client).await?;
            let title_selector = Selector::parse("title").unwrap();
            let flagged = self
                .document()
                .select(&title_selector)
                .next()
                .map(|t| t.text().collect::<String>().contains(PAYWALL_MARKER))
                .unwrap_or(false);
            self.paywalled = Some(flagged);
        }
        Ok(self.paywalled == Some(true))
    }

    /// Resolve author availability, extracting on first call.
    pub async fn has_author(&mut self, client: &mut SiteClient) -> Result<bool> {
        if self.author.is_unknown() {
            if self.behind_paywall(client).await? {
                self.author = Lazy::Absent;
            } else {
                let article_url = Url::parse(&self.url)?;
                let extracted = {
                    let container = find_metadata_container(self.document(), &self.url)?;
                    find_author(container, &article_url)?
                };
                self.author = match extracted {
                    Some(author) => Lazy::Present(author),
                    None => Lazy::Absent,
                };
            }
        }
        Ok(self.author.is_present())
    }

    /// The author. Panics unless `has_author` resolved true.
    pub fn author(&self) -> &Author {
        self.author.expect_present("author")
    }

    /// Resolve date availability. The listing card's date wins; the
    /// article-page byline is only consulted when the card carried none.
    pub async fn has_date(&mut self, client: &mut SiteClient) -> Result<bool> {
        if self.date.is_unknown() {
            if let Some(date) = self.card_date {
                self.date = Lazy::Present(date);
            } else if self.behind_paywall(client).await? {
                self.date = Lazy::Absent;
            } else {
                self.date = match find_page_date(self.document()) {
                    Some(date) => Lazy::Present(date),
                    None => Lazy::Absent,
                };
            }
        }
        Ok(self.date.is_present())
    }

    /// The publish date. Panics unless `has_date` resolved true.
    pub fn date(&self) -> NaiveDate {
        *self.date.expect_present("date")
    }

    /// Resolve tag availability. Card badges win; otherwise the article
    /// page's metadata container is scanned.
    pub async fn has_tags(&mut self, client: &mut SiteClient) -> Result<bool> {
        if self.tags.is_unknown() {
            if let Some(tags) = self.card_tags.clone() {
                self.tags = Lazy::Present(tags);
            } else if self.behind_paywall(client).await? {
                self.tags = Lazy::Absent;
            } else {
                let article_url = Url::parse(&self.url)?;
                let extracted = {
                    let container = find_metadata_container(self.document(), &self.url)?;
                    find_container_tags(container, &article_url)?
                };
                self.tags = if extracted.is_empty() {
                    Lazy::Absent
                } else {
                    Lazy::Present(extracted)
                };
            }
        }
        Ok(self.tags.is_present())
    }

    /// The topic tags. Panics unless `has_tags` resolved true.
    pub fn tags(&self) -> &[TopicTag] {
        self.tags.expect_present("tags")
    }

    /// Resolve comment availability.
    ///
    /// Premium and course articles never render the widget, so they are
    /// answered from the URL alone, before any page or count-service
    /// fetch. Everything else depends on the reader-comments anchor being
    /// present in the metadata container.
    pub async fn has_comments(&mut self, client: &mut SiteClient) -> Result<bool> {
        if self.comments_available.is_none() {
            if self.is_premium || self.is_course() {
                self.comments_available = Some(false);
            } else if self.behind_paywall(client).await? {
                self.comments_available = Some(false);
            } else {
                let anchored = {
                    let container = find_metadata_container(self.document(), &self.url)?;
                    comment_anchor_href(container).is_some()
                };
                self.comments_available = Some(anchored);
            }
        }
        Ok(self.comments_available == Some(true))
    }

    /// Fetch and cache the comment data. Panics unless `has_comments`
    /// resolved true; the secondary count query runs on the first call only.
    pub async fn comments(&mut self, client: &mut SiteClient) -> Result<Comments> {
        if self.comments_available != Some(true) {
            panic!("comments accessed without a positive availability check");
        }
        if self.comments.is_unknown() {
            let (identifier, anchor_href) = {
                let container = find_metadata_container(self.document(), &self.url)?;
                let identifier = disqus_identifier(container).ok_or_else(|| {
                    DigestError::MissingCommentWidget {
                        url: self.url.clone(),
                    }
                })?;
                let href = comment_anchor_href(container)
                    .unwrap_or_else(|| "#reader-comments".to_string());
                (identifier, href)
            };

            let query_url = comments::count_query_url(client.comment_endpoint(), &identifier);
            let count = comments::resolve_comment_count(client, &query_url).await?;
            let url = Url::parse(&self.url)?.join(&anchor_href)?.to_string();
            self.comments = Lazy::Present(Comments { count, url });
        }
        Ok(self.comments.expect_present("comments").clone())
    }

    /// The introduction as markdown, computed once.
    ///
    /// Paywalled articles yield the fixed notice. Premium/course articles
    /// take their content-wrapper children verbatim; everything else walks
    /// the article body from its first paragraph to the layout boundary.
    pub async fn markdown_introduction(&mut self, client: &mut SiteClient) -> Result<String> {
        if self.introduction.is_none() {
            let text = if self.behind_paywall(client).await? {
                PAYWALL_NOTICE.to_string()
            } else {
                let fragments = {
                    let body = find_article_body(self.document(), &self.url)?;
                    if self.is_premium || self.is_course() {
                        course_intro_fragments(body, &self.url)?
                    } else {
                        article_intro_fragments(body, &self.url)?
                    }
                };
                fragments
                    .iter()
                    .map(|html| fragment_to_markdown(html))
                    .filter(|md| !md.is_empty())
                    .join("\n\n")
            };
            self.introduction = Some(text);
        }
        Ok(self
            .introduction
            .clone()
            .expect("introduction computed above"))
    }

    /// Run every lazy extraction and produce the render-ready summary.
    ///
    /// Per-field degradations applied here: an unparsable or unidentifiable
    /// comment count downgrades to "no comment data", and a missing
    /// introduction paragraph downgrades to the renderer's notice. Anything
    /// else (fetch failures, a missing metadata container) propagates.
    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    pub async fn summarize(&mut self, client: &mut SiteClient) -> Result<TutorialSummary> {
        let author = if self.has_author(client).await? {
            Some(self.author().clone())
        } else {
            None
        };
        let date = if self.has_date(client).await? {
            Some(self.date())
        } else {
            None
        };
        let tags = if self.has_tags(client).await? {
            Some(self.tags().to_vec())
        } else {
            None
        };

        let comments = if self.has_comments(client).await? {
            match self.comments(client).await {
                Ok(comments) => Some(comments),
                Err(
                    e @ (DigestError::CommentParse { .. }
                    | DigestError::MissingCommentWidget { .. }),
                ) => {
                    warn!(error = %e, "No usable comment data; rendering without it");
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let introduction = match self.markdown_introduction(client).await {
            Ok(text) => Some(text),
            Err(e @ DigestError::MissingIntroElement { .. }) => {
                warn!(error = %e, "No introduction found; rendering notice");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(TutorialSummary {
            title: self.title.clone(),
            url: self.url.clone(),
            is_premium: self.is_premium,
            author,
            date,
            tags,
            comments,
            introduction,
        })
    }
}

/// The metadata container is the parent of the tag-icon marker. Every
/// non-paywalled article page is expected to have one.
fn find_metadata_container<'a>(document: &'a Html, url: &str) -> Result<ElementRef<'a>> {
    let marker_selector = Selector::parse("span.fa-tags").unwrap();
    document
        .select(&marker_selector)
        .next()
        .and_then(|marker| marker.parent())
        .and_then(ElementRef::wrap)
        .ok_or_else(|| DigestError::MissingMetadataContainer {
            url: url.to_string(),
        })
}

/// First match of the three author link shapes: by-line anchor, team
/// anchor, then the generic profile anchor.
fn find_author(container: ElementRef<'_>, article_url: &Url) -> Result<Option<Author>> {
    let byline = Selector::parse(r##"a[href="#author"]"##).unwrap();
    let team = Selector::parse(r##"a[href="#team"]"##).unwrap();
    let profile = Selector::parse(r#"a.text-muted[href="/"]"#).unwrap();

    let anchor = container
        .select(&byline)
        .next()
        .or_else(|| container.select(&team).next())
        .or_else(|| container.select(&profile).next());

    let Some(anchor) = anchor else {
        return Ok(None);
    };
    let Some(href) = anchor.value().attr("href") else {
        return Ok(None);
    };
    Ok(Some(Author {
        name: anchor.text().collect::<String>().trim().to_string(),
        url: article_url.join(href)?.to_string(),
    }))
}

/// Byline date: the text sibling immediately following the clock icon.
fn find_page_date(document: &Html) -> Option<NaiveDate> {
    let clock_selector = Selector::parse("span.fa-clock-o").unwrap();
    let clock = document.select(&clock_selector).next()?;
    let sibling = clock.next_sibling()?;
    let text = sibling.value().as_text()?;
    let matched = DATE_RE.find(text)?;
    NaiveDate::parse_from_str(matched.as_str(), DATE_FORMAT).ok()
}

fn find_container_tags(container: ElementRef<'_>, article_url: &Url) -> Result<Vec<TopicTag>> {
    let badge_selector = Selector::parse("a.badge.badge-light.text-muted").unwrap();
    container
        .select(&badge_selector)
        .filter_map(|badge| {
            badge.value().attr("href").map(|href| {
                Ok(TopicTag {
                    name: badge.text().collect::<String>().trim().to_string(),
                    url: article_url.join(href)?.to_string(),
                })
            })
        })
        .collect()
}

fn comment_anchor_href(container: ElementRef<'_>) -> Option<String> {
    let anchor_selector = Selector::parse(r##"a[href="#reader-comments"]"##).unwrap();
    container
        .select(&anchor_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.to_string())
}

fn disqus_identifier(container: ElementRef<'_>) -> Option<String> {
    let widget_selector = Selector::parse("span.disqus-comment-count").unwrap();
    container
        .select(&widget_selector)
        .next()
        .and_then(|span| span.value().attr("data-disqus-identifier"))
        .map(|id| id.to_string())
}

fn find_article_body<'a>(document: &'a Html, url: &str) -> Result<ElementRef<'a>> {
    let body_selector = Selector::parse("div.article-body").unwrap();
    document
        .select(&body_selector)
        .next()
        .ok_or_else(|| DigestError::MissingIntroElement {
            url: url.to_string(),
        })
}

/// Walk the article body: skip to the first plain paragraph, then collect
/// sibling elements until a `div` or an attributed paragraph ends the
/// introduction. Attributed paragraphs correlate with special layouts such
/// as interviews, which have no conventional introduction to take.
fn article_intro_fragments(body: ElementRef<'_>, url: &str) -> Result<Vec<String>> {
    let mut children = body.children();

    let first_paragraph = loop {
        let Some(node) = children.next() else {
            return Err(DigestError::MissingIntroElement {
                url: url.to_string(),
            });
        };
        if let Some(element) = ElementRef::wrap(node) {
            if element.value().name() == "p" {
                break element;
            }
        }
    };

    let mut fragments = vec![first_paragraph.html()];
    for node in children {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let name = element.value().name();
        let has_attrs = element.value().attrs().next().is_some();
        if name == "div" || (name == "p" && has_attrs) {
            break;
        }
        fragments.push(element.html());
    }

    Ok(fragments)
}

/// Premium/course introductions live in a fixed content wrapper; its
/// element children are taken verbatim.
fn course_intro_fragments(body: ElementRef<'_>, url: &str) -> Result<Vec<String>> {
    let wrapper_selector = Selector::parse("div.mb-4").unwrap();
    let wrapper = body
        .select(&wrapper_selector)
        .next()
        .ok_or_else(|| DigestError::MissingIntroElement {
            url: url.to_string(),
        })?;

    Ok(wrapper
        .children()
        .filter_map(ElementRef::wrap)
        .map(|element| element.html())
        .collect())
}
