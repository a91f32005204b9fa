//! Output generation for the per-topic markdown digests.
//!
//! One file per topic, written into the output directory the CLI names:
//!
//! ```text
//! output_dir/
//! ├── basics tutorials and courses.md
//! ├── django tutorials and courses.md
//! └── ...
//! ```
//!
//! [`markdown`] owns the document structure: reference-style links with
//! document-scoped integer IDs, per-tutorial metadata lines, and the
//! introduction blocks.

pub mod markdown;
