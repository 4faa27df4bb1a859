//! Prompt template rendering.
//!
//! Templates are plain text with `{repository_url}`, `{commit_hash}` and
//! `{args}` placeholders. `{{` and `}}` produce literal braces; any other
//! `{name}` is left untouched.

use crate::domain::{RepositoryIdentity, Task};
use crate::error::Result;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Externally supplied prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Render the prompt for a task. Fails when the task identity cannot be derived.
    pub fn render(&self, task: &Task) -> Result<String> {
        let identity = task.identity()?;
        Ok(self.render_with(&identity, &format_args_listing(task)))
    }

    fn render_with(&self, identity: &RepositoryIdentity, args: &str) -> String {
        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures| match &caps[0] {
                "{{" => "{".to_string(),
                "}}" => "}".to_string(),
                whole => match caps.get(1).map(|m| m.as_str()) {
                    Some("repository_url") => identity.repository_url.clone(),
                    Some("commit_hash") => identity.commit_hash.clone(),
                    Some("args") => args.to_string(),
                    _ => whole.to_string(),
                },
            })
            .into_owned()
    }
}

/// One `- key: value` line per argument, sorted by key, without `repository_url`.
pub fn format_args_listing(task: &Task) -> String {
    let mut keys: Vec<&String> = task
        .args
        .keys()
        .filter(|k| k.as_str() != "repository_url")
        .collect();
    keys.sort();

    keys.into_iter()
        .map(|key| {
            let value = match &task.args[key] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("- {}: {}\n", key, value)
        })
        .collect()
}
