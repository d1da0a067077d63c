//! Suspension primitives shared by the board core: per-cell waiter queues and a
//! board-wide change broadcast. Both are plain data structures — neither owns a
//! lock of its own, since both are always accessed from inside `core-board`'s
//! single monitor.

mod changebus;
mod waiter;

pub use changebus::ChangeBus;
pub use waiter::WaiterRegistry;
