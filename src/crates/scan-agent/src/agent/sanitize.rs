//! Tool-name normalization for provider function-calling rules.

use regex::Regex;
use std::sync::LazyLock;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("disallowed-char pattern is valid"));
static UNDERSCORE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("underscore-run pattern is valid"));

/// Normalize a tool name to `[A-Za-z0-9_-]`.
///
/// Disallowed characters become `_`, runs of `_` collapse to one, and leading
/// or trailing `_` are stripped. Idempotent.
pub fn sanitize_tool_name(name: &str) -> String {
    let replaced = DISALLOWED.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUN.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}
