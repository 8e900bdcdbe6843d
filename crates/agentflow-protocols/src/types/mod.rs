//! Common types shared by every AgentFlow crate.

mod common;
mod content;
mod event;
mod state;

pub use common::*;
pub use content::*;
pub use event::*;
pub use state::*;
