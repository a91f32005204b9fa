//! Data models for topics, listing cards, and resolved tutorials.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Topic`] / [`TopicCatalog`]: the site's topic navigation, discovered once
//! - [`Card`]: one article summary scraped from a listing page
//! - [`Lazy`]: the three-state cell backing lazily-extracted article fields
//! - [`TutorialSummary`]: a fully-resolved article ready for rendering
//!
//! [`Card`] carries only extracted, normalized fields and derives `Eq`/`Hash`
//! over them, so the pagination walker can deduplicate cards across
//! overlapping or reordered listing pages without ever comparing raw markup.

use chrono::NaiveDate;

/// An article author: display name plus profile URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Author {
    pub name: String,
    pub url: String,
}

/// A topic badge attached to an article: tag name plus listing URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicTag {
    pub name: String,
    pub url: String,
}

/// Reader-comment data for an article: count plus anchor URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comments {
    pub count: u32,
    pub url: String,
}

/// One article summary as scraped from a topic listing page.
///
/// Equality and hashing cover every field, so two cards built from
/// identical listing markup on different pages compare equal and a
/// `HashSet<Card>` deduplicates them. An article with no tag badges
/// carries `tags: None`, never `Some(vec![])`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Card {
    /// Article title, whitespace-trimmed.
    pub title: String,
    /// Absolute article URL, resolved against the listing page.
    pub url: String,
    /// Whether the card advertises a members-only article.
    pub is_premium: bool,
    /// Publish date when the card text carried one.
    pub date: Option<NaiveDate>,
    /// Topic badges on the card, `None` when there are none.
    pub tags: Option<Vec<TopicTag>>,
}

/// A topic as enumerated from the site's navigation sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    /// Topic name, unique across the site.
    pub name: String,
    /// Absolute listing URL for the topic.
    pub url: String,
}

/// The full set of topics discovered from the site root, in sidebar order.
///
/// Built once at startup and passed by reference wherever topic lookup is
/// needed; nothing mutates it after construction.
#[derive(Debug, Clone)]
pub struct TopicCatalog {
    topics: Vec<Topic>,
}

impl TopicCatalog {
    pub fn new(topics: Vec<Topic>) -> Self {
        Self { topics }
    }

    /// All topics in sidebar order.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Look up a topic by exact name.
    pub fn get(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.name == name)
    }

    /// Resolve a requested topic selection against the catalog.
    ///
    /// An empty request selects every topic in sidebar order. Otherwise the
    /// requested names are resolved in request order; the first name not in
    /// the catalog fails with [`DigestError::UnknownTopic`], listing the
    /// valid options.
    ///
    /// [`DigestError::UnknownTopic`]: crate::errors::DigestError::UnknownTopic
    pub fn select(&self, requested: &[String]) -> crate::errors::Result<Vec<Topic>> {
        if requested.is_empty() {
            return Ok(self.topics.clone());
        }
        let mut selected = Vec::with_capacity(requested.len());
        for name in requested {
            match self.get(name) {
                Some(topic) => selected.push(topic.clone()),
                None => {
                    return Err(crate::errors::DigestError::UnknownTopic {
                        name: name.clone(),
                        available: self
                            .topics
                            .iter()
                            .map(|t| t.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
            }
        }
        Ok(selected)
    }
}

/// Three-state cell for a lazily-extracted article field.
///
/// Distinguishes "not yet computed" from "computed and absent" from
/// "computed and present", so a field is derived at most once and a missing
/// value is never re-derived on every access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Lazy<T> {
    /// Extraction has not run yet.
    #[default]
    Unknown,
    /// Extraction ran and found nothing.
    Absent,
    /// Extraction ran and produced a value.
    Present(T),
}

impl<T> Lazy<T> {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Lazy::Unknown)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Lazy::Present(_))
    }

    /// The value, if computed and present.
    pub fn get(&self) -> Option<&T> {
        match self {
            Lazy::Present(value) => Some(value),
            _ => None,
        }
    }

    /// The value. Panics when the field was never computed or is absent;
    /// callers must check the matching availability flag first.
    pub fn expect_present(&self, field: &str) -> &T {
        match self {
            Lazy::Present(value) => value,
            Lazy::Absent => panic!("{field} accessed but the article has none"),
            Lazy::Unknown => panic!("{field} accessed before its availability was established"),
        }
    }
}

/// A fully-resolved tutorial, ready for markdown rendering.
///
/// Produced from a [`Card`] after lazy metadata extraction has run; every
/// optional field is `None` when the article didn't carry it (or was
/// paywalled). `introduction: None` instructs the renderer to substitute
/// the fixed "no introduction available" notice.
#[derive(Debug, Clone)]
pub struct TutorialSummary {
    pub title: String,
    pub url: String,
    pub is_premium: bool,
    pub author: Option<Author>,
    pub date: Option<NaiveDate>,
    pub tags: Option<Vec<TopicTag>>,
    pub comments: Option<Comments>,
    pub introduction: Option<String>,
}

impl TutorialSummary {
    /// Whether the inline metadata line can be rendered: author, tags and
    /// comments must all be available.
    pub fn has_metadata_line(&self) -> bool {
        self.author.is_some() && self.tags.is_some() && self.comments.is_some()
    }

    /// A summary with nothing but the card's identity fields, used when
    /// per-article extraction failed and the renderer must still emit a
    /// heading plus placeholder.
    pub fn placeholder(title: &str, url: &str, is_premium: bool) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            is_premium,
            author: None,
            date: None,
            tags: None,
            comments: None,
            introduction: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_card(title: &str) -> Card {
        Card {
            title: title.to_string(),
            url: format!("https://realpython.com/{}/", title.to_lowercase()),
            is_premium: false,
            date: NaiveDate::from_ymd_opt(2023, 11, 7),
            tags: Some(vec![TopicTag {
                name: "basics".to_string(),
                url: "https://realpython.com/tutorials/basics/".to_string(),
            }]),
        }
    }

    #[test]
    fn test_card_equality_is_reflexive_symmetric_transitive() {
        let a = sample_card("Alpha");
        let b = sample_card("Alpha");
        let c = sample_card("Alpha");

        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(b, c);
        assert_eq!(a, c);
    }

    #[test]
    fn test_cards_from_identical_fields_hash_identically() {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        assert!(seen.insert(sample_card("Alpha")));
        assert!(!seen.insert(sample_card("Alpha")));
        assert!(seen.insert(sample_card("Beta")));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_card_inequality_on_premium_flag() {
        let free = sample_card("Alpha");
        let mut premium = sample_card("Alpha");
        premium.is_premium = true;
        assert_ne!(free, premium);
    }

    #[test]
    fn test_catalog_select_all_preserves_sidebar_order() {
        let catalog = TopicCatalog::new(vec![
            Topic {
                name: "django".to_string(),
                url: "https://realpython.com/tutorials/django/".to_string(),
            },
            Topic {
                name: "basics".to_string(),
                url: "https://realpython.com/tutorials/basics/".to_string(),
            },
        ]);

        let all = catalog.select(&[]).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "django");
        assert_eq!(all[1].name, "basics");
    }

    #[test]
    fn test_catalog_select_unknown_topic_lists_options() {
        let catalog = TopicCatalog::new(vec![Topic {
            name: "basics".to_string(),
            url: "https://realpython.com/tutorials/basics/".to_string(),
        }]);

        let err = catalog.select(&["rust".to_string()]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("rust"));
        assert!(msg.contains("basics"));
    }

    #[test]
    fn test_lazy_transitions() {
        let mut field: Lazy<u32> = Lazy::default();
        assert!(field.is_unknown());
        assert!(field.get().is_none());

        field = Lazy::Absent;
        assert!(!field.is_unknown());
        assert!(!field.is_present());

        field = Lazy::Present(7);
        assert!(field.is_present());
        assert_eq!(field.get(), Some(&7));
        assert_eq!(*field.expect_present("value"), 7);
    }

    #[test]
    #[should_panic(expected = "before its availability")]
    fn test_lazy_unknown_access_panics() {
        let field: Lazy<u32> = Lazy::Unknown;
        field.expect_present("comments");
    }

    #[test]
    fn test_summary_metadata_line_requires_all_three() {
        let mut summary = TutorialSummary::placeholder("T", "https://example.com/t/", false);
        assert!(!summary.has_metadata_line());

        summary.author = Some(Author {
            name: "A".to_string(),
            url: "https://example.com/#author".to_string(),
        });
        summary.tags = Some(vec![]);
        assert!(!summary.has_metadata_line());

        summary.comments = Some(Comments {
            count: 1,
            url: "https://example.com/t/#reader-comments".to_string(),
        });
        assert!(summary.has_metadata_line());
    }
}
