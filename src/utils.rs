//! Shared helpers: throttle countdown, log truncation, markdown conversion,
//! and output-directory validation.

use std::error::Error;
use std::fs as stdfs;
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;
use tracing::{info, instrument};

/// Sleep for `secs` seconds, logging a per-second countdown so an operator
/// watching the console can see the throttle wait drain.
pub async fn sleep_with_countdown(secs: u64) {
    for remaining in (1..=secs).rev() {
        info!(remaining, "Sleeping before retry");
        sleep(Duration::from_secs(1)).await;
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte
/// count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", &s[..max], s.len() - max)
    }
}

/// Convert one HTML fragment to markdown.
///
/// The converter pads block elements with surrounding newlines; those are
/// trimmed here so fragments can be joined with exactly one blank line.
pub fn fragment_to_markdown(html: &str) -> String {
    html2md::parse_html(html).trim().to_string()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
