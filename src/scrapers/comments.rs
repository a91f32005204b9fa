//! Comment-count resolution against the site's Disqus count endpoint.
//!
//! Comment counts are not in the article HTML; the site's widget issues a
//! secondary query to a count service whose response is a JavaScript
//! callback wrapping a JSON fragment. Only the `"comments":<digits>` field
//! matters here, so the body is matched with a regex rather than parsed as
//! a document. A response that fetched fine but doesn't contain that field
//! is a data-integrity failure ([`DigestError::CommentParse`]), distinct
//! from a fetch failure.

use crate::errors::{DigestError, Result};
use crate::fetch::SiteClient;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

/// The count-data endpoint of the site's Disqus forum.
pub const COUNT_ENDPOINT: &str = "https://realpython.disqus.com/count-data.js";

static COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""comments":(\d+)"#).unwrap());

/// Build the count-query URL for one comment-widget identifier.
///
/// The identifier (usually the article URL) is percent-encoded in full and
/// passed as the `1` query parameter, matching the widget's own requests.
pub fn count_query_url(endpoint: &str, identifier: &str) -> String {
    format!("{}?1={}", endpoint, urlencoding::encode(identifier))
}

/// Fetch a count-query URL and parse the comment count out of its body.
#[instrument(level = "debug", skip(client))]
pub async fn resolve_comment_count(client: &mut SiteClient, query_url: &str) -> Result<u32> {
    let response = client.get(query_url).await?;
    let count = parse_comment_count(&response.body).ok_or_else(|| DigestError::CommentParse {
        url: query_url.to_string(),
        body_preview: truncate_for_log(&response.body, 300),
    })?;
    debug!(count, "Resolved comment count");
    Ok(count)
}

/// The first `"comments":<digits>` field in a count-query response body.
pub fn parse_comment_count(body: &str) -> Option<u32> {
    COUNT_RE
        .captures(body)
        .and_then(|captures| captures[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_comment_count() {
        let body = r#"displayCount({"counts":[{"id":"1","comments":42,"reactions":0}]})"#;
        assert_eq!(parse_comment_count(body), Some(42));
    }

    #[test]
    fn test_parse_comment_count_missing_key() {
        let body = r#"displayCount({"counts":[]})"#;
        assert_eq!(parse_comment_count(body), None);
    }

    #[test]
    fn test_parse_comment_count_zero() {
        assert_eq!(parse_comment_count(r#"{"comments":0}"#), Some(0));
    }

    #[test]
    fn test_count_query_url_encodes_identifier() {
        let url = count_query_url(COUNT_ENDPOINT, "https://realpython.com/python-basics/");
        assert_eq!(
            url,
            "https://realpython.disqus.com/count-data.js?1=https%3A%2F%2Frealpython.com%2Fpython-basics%2F"
        );
    }

    #[tokio::test]
    async fn test_resolve_comment_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/count-data.js"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"displayCount({"counts":[{"comments":7}]})"#),
            )
            .mount(&server)
            .await;

        let mut client = SiteClient::new().unwrap();
        let query_url = count_query_url(
            &format!("{}/count-data.js", server.uri()),
            "https://realpython.com/python-basics/",
        );
        assert_eq!(resolve_comment_count(&mut client, &query_url).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_resolve_unexpected_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/count-data.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not what anyone expected"))
            .mount(&server)
            .await;

        let mut client = SiteClient::new().unwrap();
        let query_url = count_query_url(&format!("{}/count-data.js", server.uri()), "id");

        match resolve_comment_count(&mut client, &query_url).await {
            Err(DigestError::CommentParse { body_preview, .. }) => {
                assert!(body_preview.contains("not what anyone expected"));
            }
            other => panic!("expected CommentParse, got {other:?}"),
        }
    }
}
