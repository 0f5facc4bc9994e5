//! Source document parsers.
//!
//! Each parser declares a `supports` predicate over file paths and a `parse`
//! function that returns a normalized `SourceDocument`.

use std::path::Path;

use crate::error::Result;
use crate::model::SourceDocument;

/// Parser trait implemented by source authoring formats.
pub trait DocumentParser {
    fn supports(path: &Path) -> bool;
    fn parse(identity: &str, content: &str) -> Result<SourceDocument>;
}

pub mod markdown_frontmatter;

pub use markdown_frontmatter::MarkdownFrontmatterParser;
