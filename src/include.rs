//! Field selection for the answers API `include` parameter.
//!
//! The selection file lists one field expression per line. Everything from a
//! `#` (and the spaces before it) to the end of the line is a comment. The
//! remaining text of all lines is concatenated without separators, so entries
//! are expected to carry their own commas.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

#[allow(clippy::expect_used)]
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" *#.*").expect("comment pattern is valid"));

/// Build the `include` value from the selection file's text
pub fn parse_include(text: &str) -> String {
    text.lines()
        .map(|line| COMMENT.replace_all(line, ""))
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

/// Read and parse the selection file
pub fn load_include(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::config(
            "include_file",
            format!("cannot read field selection {}: {}", path.display(), e),
        )
    })?;
    let include = parse_include(&text);
    tracing::debug!(path = %path.display(), len = include.len(), "loaded field selection");
    Ok(include)
}
