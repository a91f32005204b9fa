//! # Tutorial Digest
//!
//! Crawls the topic listings of a tutorial-publishing site, extracts each
//! article's metadata (title, author, publish date, tags, comment count)
//! and introductory paragraphs, and writes one cross-referenced markdown
//! digest per topic.
//!
//! ## Usage
//!
//! ```sh
//! tutorial_digest basics django -o ./generated_markdown
//! ```
//!
//! ## Architecture
//!
//! The application is a strictly sequential pipeline:
//! 1. **Discovery**: enumerate the topic catalog from the site root sidebar
//! 2. **Pagination**: walk each topic's listing pages until no new cards
//! 3. **Extraction**: lazily pull per-article metadata and introductions
//! 4. **Output**: render one reference-linked markdown file per topic
//!
//! Every HTTP response is cached on disk keyed by URL, so re-runs only hit
//! the network for pages they haven't seen; the cache is saved on every
//! exit path, including failed runs.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cache;
mod cli;
mod errors;
mod fetch;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::Cli;
use fetch::SiteClient;
use models::TutorialSummary;
use scrapers::article::Tutorial;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("tutorial_digest starting up");

    let args = Cli::parse();
    debug!(?args.topics, ?args.output_dir, args.include_premium, "Parsed CLI arguments");

    // Early check: ensure the markdown output dir is writable
    if let Err(e) = utils::ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let mut client = SiteClient::new()?;
    client.cache_mut().load(&args.cache_file)?;

    let outcome = run(&mut client, &args).await;

    // The cache save runs whether the crawl succeeded or not, so a failed
    // run still keeps every response it fetched.
    if let Err(e) = client.cache().save(&args.cache_file) {
        error!(path = %args.cache_file, error = %e, "Failed to save response cache");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        cached_responses = client.cache().len(),
        "Execution complete"
    );

    outcome.map_err(Into::into)
}

/// Crawl the selected topics and write one markdown digest per topic.
async fn run(client: &mut SiteClient, args: &Cli) -> errors::Result<()> {
    let catalog = scrapers::topics::discover_topics(client).await?;
    let selected = catalog.select(&args.topics)?;
    info!(
        selected = selected.len(),
        available = catalog.topics().len(),
        "Topics selected"
    );

    for topic in &selected {
        info!(topic = %topic.name, "Crawling topic");
        let cards = match scrapers::cards::collect_topic_cards(client, topic).await {
            Ok(cards) => cards,
            Err(e) => {
                error!(topic = %topic.name, error = %e, "Topic listing crawl failed; skipping topic");
                continue;
            }
        };

        let mut summaries: Vec<TutorialSummary> = Vec::new();
        let mut failed = 0usize;
        for card in cards {
            if card.is_premium && !args.include_premium {
                continue;
            }

            let (title, url, premium) = (card.title.clone(), card.url.clone(), card.is_premium);
            let mut tutorial = Tutorial::from_card(card);
            match tutorial.summarize(client).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    failed += 1;
                    if e.is_structural() {
                        warn!(url = %url, error = %e, "Article HTML diverged from expectations; rendering placeholder");
                    } else {
                        error!(url = %url, error = %e, "Article fetch failed; rendering placeholder");
                    }
                    summaries.push(TutorialSummary::placeholder(&title, &url, premium));
                }
            }
        }
        info!(
            topic = %topic.name,
            tutorials = summaries.len(),
            failed,
            "Topic extraction finished"
        );

        let markdown = outputs::markdown::render_topic(&topic.name, &summaries);
        let path = format!("{}/{} tutorials and courses.md", args.output_dir, topic.name);
        info!(path = %path, "Writing Markdown");
        tokio::fs::write(&path, markdown).await?;
    }

    Ok(())
}
