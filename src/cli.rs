//! Command-line interface definitions.
//!
//! All options can be provided via command-line flags; the cache path also
//! honors an environment variable so scheduled runs can share one cache.

use clap::Parser;

/// Command-line arguments for the tutorial digest generator.
///
/// # Examples
///
/// ```sh
/// # Crawl every topic into ./generated_markdown
/// tutorial_digest
///
/// # Only two topics, premium tutorials included
/// tutorial_digest basics django --include-premium
///
/// # Custom output directory and cache location
/// tutorial_digest -o ./digests --cache-file /var/cache/tutorial_digest.json
/// ```
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Only crawl tutorials of the given topic(s); omit to crawl all topics
    #[arg(value_name = "TOPIC")]
    pub topics: Vec<String>,

    /// Directory in which to store generated markdown files
    #[arg(short, long, default_value = "generated_markdown")]
    pub output_dir: String,

    /// Include premium tutorials (a.k.a. courses) in generated files
    #[arg(short = 'p', long)]
    pub include_premium: bool,

    /// File the response cache is loaded from and saved to
    #[arg(long, env = "TUTORIAL_DIGEST_CACHE", default_value = "requests_cache.json")]
    pub cache_file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["tutorial_digest"]);
        assert!(cli.topics.is_empty());
        assert_eq!(cli.output_dir, "generated_markdown");
        assert!(!cli.include_premium);
        assert_eq!(cli.cache_file, "requests_cache.json");
    }

    #[test]
    fn test_cli_topic_order_is_preserved() {
        let cli = Cli::parse_from(["tutorial_digest", "django", "basics"]);
        assert_eq!(cli.topics, vec!["django", "basics"]);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "tutorial_digest",
            "basics",
            "-o",
            "/tmp/digests",
            "--include-premium",
            "--cache-file",
            "/tmp/cache.json",
        ]);
        assert_eq!(cli.output_dir, "/tmp/digests");
        assert!(cli.include_premium);
        assert_eq!(cli.cache_file, "/tmp/cache.json");
    }
}
