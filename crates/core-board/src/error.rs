//! Typed failures surfaced by `core-board`. Both enums are `thiserror`-derived so
//! callers get a real `std::error::Error` impl without hand-rolled `Display`
//! bodies, matching how the rest of the workspace reports input-validation
//! failures.

use core_cell::Coordinate;
use thiserror::Error;

/// Failures from `flip`. Game-rule "soft" failures (no card, contended target)
/// are *not* represented here — they are handled per the rule table and return
/// `Ok`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("coordinate {coord} is out of bounds for a {rows}x{cols} board")]
    OutOfBounds {
        coord: Coordinate,
        rows: usize,
        cols: usize,
    },
}

/// Board-file data-contract failures (see the board file format in the crate
/// docs). Each variant corresponds to one of the four categories the format
/// distinguishes: missing file, malformed dimension line, wrong card count,
/// illegal content.
#[derive(Debug, Error)]
pub enum BoardFileError {
    #[error("could not read board file {path}: {source}")]
    MissingFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dimension line {line:?}: expected `RxC` with positive integers")]
    MalformedDimensionLine { line: String },

    #[error("expected {expected} card lines for a board of that size, found {found}")]
    WrongCardCount { expected: usize, found: usize },

    #[error("illegal card content on line {line_no} ({content:?}): must be non-empty and contain no whitespace")]
    IllegalContent { line_no: usize, content: String },
}
