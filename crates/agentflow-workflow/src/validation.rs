//! Structural validation of workflow definitions.
//!
//! Every problem found is collected, then reported together as a single
//! [`WorkflowError::Configuration`].

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::definition::{TaskNodeConfig, WorkflowDefinition};
use crate::error::WorkflowError;

/// Validate a workflow definition.
///
/// Checks that the entry point is set and declared, node names are unique,
/// child references resolve without duplicates or cycles, loop bounds are
/// positive and sibling branches of a parallel node never write the same
/// output key.
pub fn validate_definition(definition: &WorkflowDefinition) -> Result<(), WorkflowError> {
    let mut issues = Vec::new();

    if definition.name.trim().is_empty() {
        issues.push("workflow name cannot be empty".to_string());
    }

    validate_entry_point(definition, &mut issues);
    let nodes = validate_names(definition, &mut issues);
    for node in &definition.nodes {
        validate_node(node, &nodes, &mut issues);
    }

    // Subtree walks below assume an acyclic graph.
    if validate_acyclic(definition, &nodes, &mut issues) {
        validate_parallel_writes(definition, &nodes, &mut issues);
    }

    if issues.is_empty() {
        debug!(workflow = %definition.name, nodes = definition.nodes.len(), "Workflow definition valid");
        Ok(())
    } else {
        Err(WorkflowError::Configuration(format!(
            "workflow '{}': {}",
            definition.name,
            issues.join("; ")
        )))
    }
}

fn validate_entry_point(definition: &WorkflowDefinition, issues: &mut Vec<String>) {
    if definition.entry_point.trim().is_empty() {
        issues.push("entry point must be set".to_string());
    } else if !definition.contains_node(&definition.entry_point) {
        issues.push(format!(
            "entry point '{}' is not a declared node",
            definition.entry_point
        ));
    }
}

/// Index nodes by name, reporting empty and duplicate names.
fn validate_names<'a>(
    definition: &'a WorkflowDefinition,
    issues: &mut Vec<String>,
) -> HashMap<&'a str, &'a TaskNodeConfig> {
    let mut nodes = HashMap::new();
    for node in &definition.nodes {
        let name = node.name();
        if name.trim().is_empty() {
            issues.push(format!("a {} node has an empty name", node.kind()));
            continue;
        }
        if nodes.insert(name, node).is_some() {
            issues.push(format!("duplicate node name '{}'", name));
        }
    }
    nodes
}

fn validate_node(
    node: &TaskNodeConfig,
    nodes: &HashMap<&str, &TaskNodeConfig>,
    issues: &mut Vec<String>,
) {
    let name = node.name();

    match node {
        TaskNodeConfig::Leaf(leaf) => {
            let mut seen = HashSet::new();
            for tool in &leaf.tools {
                if !seen.insert(tool.as_str()) {
                    issues.push(format!("node '{}' lists tool '{}' twice", name, tool));
                }
            }
            if let Some(t) = leaf.temperature {
                if !(0.0..=2.0).contains(&t) {
                    issues.push(format!(
                        "node '{}' temperature {} is outside 0.0..=2.0",
                        name, t
                    ));
                }
            }
            if leaf.max_output_tokens == Some(0) {
                issues.push(format!("node '{}' max_output_tokens must be positive", name));
            }
            if leaf.output_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                issues.push(format!("node '{}' has an empty output_key", name));
            }
        }
        TaskNodeConfig::Loop(config) if config.max_iterations == 0 => {
            issues.push(format!("loop node '{}' max_iterations must be at least 1", name));
        }
        _ => {}
    }

    let mut seen = HashSet::new();
    for child in node.children() {
        if !seen.insert(child.as_str()) {
            issues.push(format!("node '{}' references child '{}' twice", name, child));
        }
        if !nodes.contains_key(child.as_str()) {
            issues.push(format!(
                "node '{}' references undeclared node '{}'",
                name, child
            ));
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Report every cycle among child references. Returns `true` if none.
fn validate_acyclic(
    definition: &WorkflowDefinition,
    nodes: &HashMap<&str, &TaskNodeConfig>,
    issues: &mut Vec<String>,
) -> bool {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut path = Vec::new();
    let before = issues.len();

    for node in &definition.nodes {
        visit(node.name(), nodes, &mut marks, &mut path, issues);
    }

    issues.len() == before
}

fn visit<'a>(
    name: &'a str,
    nodes: &HashMap<&'a str, &'a TaskNodeConfig>,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    issues: &mut Vec<String>,
) {
    match marks.get(name) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            let start = path.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle: Vec<&str> = path[start..].to_vec();
            cycle.push(name);
            issues.push(format!("cycle detected: {}", cycle.join(" -> ")));
            return;
        }
        None => {}
    }

    // Undeclared references are reported by `validate_node`.
    let Some(&node) = nodes.get(name) else {
        return;
    };

    marks.insert(name, Mark::Visiting);
    path.push(name);
    for child in node.children() {
        visit(child.as_str(), nodes, marks, path, issues);
    }
    path.pop();
    marks.insert(name, Mark::Done);
}

/// Reject parallel nodes whose branches write overlapping output keys.
///
/// Only `output_key` writes are known statically; state written by tools
/// is not covered.
fn validate_parallel_writes(
    definition: &WorkflowDefinition,
    nodes: &HashMap<&str, &TaskNodeConfig>,
    issues: &mut Vec<String>,
) {
    let mut memo: HashMap<&str, HashSet<&str>> = HashMap::new();

    for node in &definition.nodes {
        let TaskNodeConfig::Parallel(parallel) = node else {
            continue;
        };

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for child in &parallel.children {
            let keys = write_set(child.as_str(), nodes, &mut memo);
            let mut keys: Vec<&str> = keys.into_iter().collect();
            keys.sort_unstable();
            for key in keys {
                if let Some(other) = owners.insert(key, child.as_str()) {
                    issues.push(format!(
                        "parallel node '{}': branches '{}' and '{}' both write '{}'",
                        parallel.name, other, child, key
                    ));
                }
            }
        }
    }
}

/// Output keys written anywhere in the subtree rooted at `name`.
fn write_set<'a>(
    name: &'a str,
    nodes: &HashMap<&'a str, &'a TaskNodeConfig>,
    memo: &mut HashMap<&'a str, HashSet<&'a str>>,
) -> HashSet<&'a str> {
    if let Some(keys) = memo.get(name) {
        return keys.clone();
    }

    let mut keys = HashSet::new();
    if let Some(&node) = nodes.get(name) {
        if let Some(key) = node.output_key() {
            keys.insert(key);
        }
        for child in node.children() {
            keys.extend(write_set(child.as_str(), nodes, memo));
        }
    }

    memo.insert(name, keys.clone());
    keys
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
