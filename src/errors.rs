//! Error taxonomy for the crawl/extract/render pipeline.
//!
//! The variants fall into five families with different handling policies:
//!
//! | Family | Variants | Handling |
//! |--------|----------|----------|
//! | Fetch failure | [`UnsuccessfulFetch`], [`RetriesExhausted`] | Propagated; a 404 on listing page ≥ 2 is end-of-pages |
//! | Structural extraction | [`MissingTitle`], [`MissingMetadataContainer`], [`MissingIntroElement`], [`MissingTopicSidebar`] | Logged per article/topic, batch continues |
//! | Data integrity | [`CommentParse`] | Logged, treated as "no comment data" |
//! | Configuration | [`UnknownTopic`] | Raised before any listing crawl |
//! | Transport/IO | `Http`, `UrlParse`, `CachePersist`, `Io` | Wrapped via `#[from]` |
//!
//! [`UnsuccessfulFetch`]: DigestError::UnsuccessfulFetch
//! [`RetriesExhausted`]: DigestError::RetriesExhausted
//! [`MissingTitle`]: DigestError::MissingTitle
//! [`MissingMetadataContainer`]: DigestError::MissingMetadataContainer
//! [`MissingIntroElement`]: DigestError::MissingIntroElement
//! [`MissingTopicSidebar`]: DigestError::MissingTopicSidebar
//! [`CommentParse`]: DigestError::CommentParse
//! [`UnknownTopic`]: DigestError::UnknownTopic

use thiserror::Error;

/// Errors produced while crawling, extracting, or rendering tutorials.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The server answered with a status outside {200, 429}.
    #[error("unsuccessful fetch of {url}: status {status}")]
    UnsuccessfulFetch { url: String, status: u16 },

    /// Every throttle retry was consumed without a successful response.
    #[error("gave up on {url} after {attempts} rate-limited attempts")]
    RetriesExhausted { url: String, attempts: usize },

    /// A listing card had no heading element to take a title from.
    #[error("listing card on {url} has no title heading")]
    MissingTitle { url: String },

    /// A listing card had no anchor to take the article URL from.
    #[error("listing card on {url} has no article link")]
    MissingCardLink { url: String },

    /// A non-paywalled article page lacked the tag-icon metadata container.
    #[error("article {url} has no metadata container")]
    MissingMetadataContainer { url: String },

    /// The article body never produced a paragraph to open the introduction.
    #[error("article {url} has no introduction paragraph")]
    MissingIntroElement { url: String },

    /// The site root page lacked the topic navigation sidebar.
    #[error("no topic sidebar found on {url}")]
    MissingTopicSidebar { url: String },

    /// An article advertises reader comments but carries no comment-widget
    /// identifier to query the count with.
    #[error("article {url} has no comment-widget identifier")]
    MissingCommentWidget { url: String },

    /// The comment-count response arrived but did not match the expected shape.
    #[error("could not parse comment count from {url}; body: {body_preview}")]
    CommentParse { url: String, body_preview: String },

    /// A selected topic is not on the site. Lists the valid names.
    #[error("unknown topic {name:?}; available topics: {available}")]
    UnknownTopic { name: String, available: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("cache (de)serialization error: {0}")]
    CachePersist(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, DigestError>;

impl DigestError {
    /// True for errors that indicate the site's HTML shape diverged from
    /// expectations. These are surfaced per article and never retried.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DigestError::MissingTitle { .. }
                | DigestError::MissingCardLink { .. }
                | DigestError::MissingMetadataContainer { .. }
                | DigestError::MissingCommentWidget { .. }
                | DigestError::MissingIntroElement { .. }
                | DigestError::MissingTopicSidebar { .. }
        )
    }
}
