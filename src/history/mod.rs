//! Linear undo/redo over confirmed service edits.

pub mod operation;
pub mod replay;
pub mod stack;

pub use operation::{Edit, Mutation, OpKind, Operation};
pub use replay::{Applied, dispatch};
pub use stack::{DEFAULT_HISTORY_CAP, Direction, History, HistoryError, Replay, ReplayReport};
