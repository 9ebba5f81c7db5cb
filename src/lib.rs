pub mod config;
pub mod graph;
pub mod selection;
pub mod slug;
pub mod ui;

pub use crate::config::{ConfigError, GraphConfig};
pub use crate::graph::{GraphDb, GraphDbError, GraphRepository};
pub use crate::selection::{SelectionSnapshot, SelectionState, ViewMode};
