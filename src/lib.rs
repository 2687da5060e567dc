pub mod cli;
pub mod graph;
pub mod history;
pub mod io;
pub mod model;
pub mod service;
pub mod session;
pub mod tui;
pub mod util;
