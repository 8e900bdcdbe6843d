//! `{key}` substitution of session state into instructions.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use agentflow_protocols::types::{SessionState, render_value};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Replace each `{key}` with the current value of `state[key]`.
///
/// Placeholders naming keys absent from the state are left as written.
pub fn render_instruction(template: &str, state: &SessionState) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match state.get(&caps[1]) {
            Some(value) => render_value(&value),
            None => caps[0].to_string(),
        })
        .into_owned()
}
