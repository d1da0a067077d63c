//! The Memory Scramble Board Core: a concurrent, multi-actor card-matching
//! board with no busy-waiting, no deadlock, and a single global monitor
//! serializing every mutation.
//!
//! This crate is the hard part of the system described in the workspace docs —
//! the card-ownership state machine. It does not know about HTTP, CLI
//! arguments, or how its output text eventually reaches a player; callers own
//! all of that. What it promises is the flip protocol (§4.5 in the design
//! notes), the bulk `transform` operation (§4.6), and a textual view (§6) that
//! always reflects a consistent snapshot.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use core_board::Board;
//! use core_cell::Coordinate;
//!
//! let board = Board::from_str("2x1\nX\nX\n")?;
//! let view = board.flip(Coordinate::new(0, 0), "alice").await?;
//! println!("{view}");
//! # Ok(())
//! # }
//! ```

mod board;
pub mod boardfile;
pub mod error;

pub use board::{ActorView, Board};
pub use error::{BoardError, BoardFileError};
