// src/yamlio/reader.rs

//! Tagged YAML document extraction from a text log stream.
//!
//! Solver logs interleave free-form text with YAML documents delimited by a
//! line starting with `---` (optionally carrying a tag such as `!Kpoints`)
//! and closed by a line starting with `...`:
//!
//! ```text
//! ...solver chatter...
//! --- !Kpoints
//! reduced_coordinates_of_qpoints: [[0,0,0],[0.5,0,0]]
//! ...
//! ...more chatter...
//! ```
//!
//! An open delimiter with no matching close before end-of-stream is always a
//! [`MalformedSection`](crate::errors::AbiflowError::MalformedSection) error,
//! on both the tag-lookup path and the document-iteration path.

use std::fs;
use std::path::Path;

use crate::errors::{AbiflowError, Result};

const OPEN_DELIM: &str = "---";
const CLOSE_DELIM: &str = "...";

/// Scans a log stream for embedded YAML documents.
///
/// Maintains a line cursor; [`rewind`](Self::rewind) resets it. Not
/// thread-safe: a reader must not be shared across concurrent probe parses.
#[derive(Debug, Clone)]
pub struct YamlDocReader {
    lines: Vec<String>,
    cursor: usize,
}

impl YamlDocReader {
    pub fn from_string(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            lines: text.lines().map(|l| l.to_string()).collect(),
            cursor: 0,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_string(text))
    }

    /// Reset the read cursor to the start of the stream.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Scan forward from the current cursor for the first document whose
    /// opening `---` line contains `tag`, and return its body (the raw text
    /// between the delimiters, exclusive).
    ///
    /// Returns `Ok(None)` if no such opening line exists before
    /// end-of-stream. Returns `MalformedSection` if an opening line is found
    /// with no closing `...` line after it.
    ///
    /// On success the cursor is left just past the closing delimiter, so
    /// repeated calls walk successive documents with the same tag.
    pub fn next_doc_with_tag(&mut self, tag: &str) -> Result<Option<String>> {
        while self.cursor < self.lines.len() {
            let line = &self.lines[self.cursor];
            self.cursor += 1;

            if line.starts_with(OPEN_DELIM) && line.contains(tag) {
                return self.read_body_until_close(tag).map(Some);
            }
        }

        Ok(None)
    }

    /// Lazy iterator over all documents from the current cursor position,
    /// regardless of tag. Rewind first to scan the whole stream.
    ///
    /// A trailing `---` with no closing `...` yields an error item.
    pub fn docs(&mut self) -> Docs<'_> {
        Docs { reader: self }
    }

    /// Rewind and collect every document body in the stream.
    pub fn all_docs(&mut self) -> Result<Vec<String>> {
        self.rewind();
        self.docs().collect()
    }

    fn read_body_until_close(&mut self, context: &str) -> Result<String> {
        let start = self.cursor;

        while self.cursor < self.lines.len() {
            if self.lines[self.cursor].starts_with(CLOSE_DELIM) {
                let body = self.lines[start..self.cursor].join("\n");
                // Step past the closing delimiter.
                self.cursor += 1;
                return Ok(body);
            }
            self.cursor += 1;
        }

        Err(AbiflowError::MalformedSection(format!(
            "document opened at line {} ({context}) has no closing `{CLOSE_DELIM}` before end-of-stream",
            start
        )))
    }
}

/// Iterator returned by [`YamlDocReader::docs`].
pub struct Docs<'a> {
    reader: &'a mut YamlDocReader,
}

impl Iterator for Docs<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let r = &mut self.reader;

        while r.cursor < r.lines.len() {
            let line = &r.lines[r.cursor];
            r.cursor += 1;

            if line.starts_with(OPEN_DELIM) {
                return Some(r.read_body_until_close("untagged"));
            }
        }

        None
    }
}
