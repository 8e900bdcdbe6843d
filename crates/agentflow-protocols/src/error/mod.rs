//! Error types for the AgentFlow protocol layer.

mod memory;
mod model;
mod registry;
mod tool;

pub use memory::*;
pub use model::*;
pub use registry::*;
pub use tool::*;
