//! # AgentFlow Workflow
//!
//! Declarative side of the engine: workflows are described as a flat list
//! of named [`TaskNodeConfig`]s plus an entry point, assembled with a
//! [`WorkflowBuilder`] or loaded from TOML/JSON, and stored in a
//! [`WorkflowRegistry`]. A [`NodeFactory`] turns a definition into a tree
//! of executable runtime nodes, and the [`Orchestrator`] ties tools,
//! workflows, sessions and execution together.

pub mod builder;
pub mod definition;
pub mod error;
pub mod executor;
pub mod factory;
pub mod orchestrator;
pub mod registry;
pub mod validation;

pub use builder::WorkflowBuilder;
pub use definition::{CompositeConfig, LeafConfig, LoopConfig, TaskNodeConfig, WorkflowDefinition};
pub use error::WorkflowError;
pub use executor::{RunOutcome, WorkflowExecutor, WorkflowRun};
pub use factory::{ModelDefaults, NodeFactory};
pub use orchestrator::{NodeSummary, Orchestrator, WorkflowInfo};
pub use registry::WorkflowRegistry;
pub use validation::validate_definition;
