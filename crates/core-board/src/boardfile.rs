//! The board-file data contract: UTF-8 text in, `(rows, cols, cells)` out.
//!
//! This module deliberately knows nothing about *where* the text came from (a
//! CLI argument, an upload, a fixture in a test) — that sourcing is an adapter
//! concern. It only understands the textual shape described in the crate docs.

use std::path::Path;

use crate::error::BoardFileError;

/// Parses board-file text into `(rows, cols, cells)`, row-major. `cells[i]` is
/// always `Some` — a freshly parsed board has no removed cells yet.
pub fn parse_str(text: &str) -> Result<(usize, usize, Vec<Option<String>>), BoardFileError> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    let dimension_line = lines.next().ok_or_else(|| BoardFileError::MalformedDimensionLine {
        line: String::new(),
    })?;
    let (rows, cols) = parse_dimensions(dimension_line)?;

    let contents: Vec<&str> = lines.collect();
    let expected = rows * cols;
    if contents.len() != expected {
        return Err(BoardFileError::WrongCardCount {
            expected,
            found: contents.len(),
        });
    }

    let mut cells = Vec::with_capacity(expected);
    for (idx, content) in contents.into_iter().enumerate() {
        if content.is_empty() || content.chars().any(char::is_whitespace) {
            return Err(BoardFileError::IllegalContent {
                // +2: 1-indexed, plus the dimension line itself.
                line_no: idx + 2,
                content: content.to_string(),
            });
        }
        cells.push(Some(content.to_string()));
    }

    Ok((rows, cols, cells))
}

/// Reads `path` and parses it as board-file text.
pub fn parse_file(path: impl AsRef<Path>) -> Result<(usize, usize, Vec<Option<String>>), BoardFileError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| BoardFileError::MissingFile {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&text)
}

fn parse_dimensions(line: &str) -> Result<(usize, usize), BoardFileError> {
    let malformed = || BoardFileError::MalformedDimensionLine {
        line: line.to_string(),
    };
    let (rows_str, cols_str) = line.split_once('x').ok_or_else(malformed)?;
    let rows: usize = rows_str.parse().map_err(|_| malformed())?;
    let cols: usize = cols_str.parse().map_err(|_| malformed())?;
    if rows == 0 || cols == 0 {
        return Err(malformed());
    }
    Ok((rows, cols))
}
