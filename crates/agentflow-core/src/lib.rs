//! # AgentFlow Core
//!
//! Name-keyed registries used by the workflow layer to resolve references.
//!
//! - [`BaseRegistry`] - generic concurrent `name -> Arc<T>` map
//! - [`ToolRegistry`] - the tools leaf nodes may bind

pub mod registry;

pub use registry::{BaseRegistry, Registerable, ToolRegistry};
