pub mod config;
pub mod dependency;
pub mod snapshot;
pub mod task;

pub use config::*;
pub use dependency::*;
pub use snapshot::*;
pub use task::*;
