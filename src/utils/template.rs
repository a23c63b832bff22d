//! Placeholder substitution for templates and command arguments
//!
//! Two syntaxes are understood:
//! - brace style: `{name}`, with `{{` and `}}` producing literal braces
//! - percent style: `%(name)s` or `%(name)d`, with `%%` producing `%`
//!
//! [`render`] tries brace style first and falls back to percent style when
//! the text refers to a key the variables do not contain, or has no brace
//! placeholder but does have a percent one, so templates written for either
//! convention work (Perl sources are full of `{...}`).

use crate::error::{InstallError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

/// Substitution variables, keyed by parameter name
pub type Vars = BTreeMap<String, String>;

const BRACE_PATTERN: &str = r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}";
const PERCENT_PATTERN: &str = r"%%|%\(([A-Za-z_][A-Za-z0-9_]*)\)([sd])";

/// Substitute `{name}` placeholders
pub fn format_braces(text: &str, vars: &Vars) -> Result<String> {
    brace_pass(text, vars).map(|(output, _)| output)
}

/// Brace substitution plus the number of placeholders replaced
fn brace_pass(text: &str, vars: &Vars) -> Result<(String, usize)> {
    let pattern = Regex::new(BRACE_PATTERN)?;
    let mut replaced = 0;
    let output = substitute(text, &pattern, |caps| match caps.get(1) {
        Some(name) => {
            replaced += 1;
            lookup(vars, name.as_str())
        }
        None if &caps[0] == "{{" => Ok("{".to_string()),
        None => Ok("}".to_string()),
    })?;
    Ok((output, replaced))
}

/// Substitute `%(name)s` / `%(name)d` placeholders
pub fn format_percent(text: &str, vars: &Vars) -> Result<String> {
    let pattern = Regex::new(PERCENT_PATTERN)?;
    substitute(text, &pattern, |caps| {
        let Some(name) = caps.get(1) else {
            return Ok("%".to_string());
        };
        let value = lookup(vars, name.as_str())?;
        if caps.get(2).map(|m| m.as_str()) == Some("d") && value.parse::<i64>().is_err() {
            return Err(InstallError::invalid_value(
                name.as_str(),
                format!("'{value}' is not an integer"),
            ));
        }
        Ok(value)
    })
}

/// Render a template body, brace style first, percent style as fallback
pub fn render(text: &str, vars: &Vars) -> Result<String> {
    match brace_pass(text, vars) {
        Ok((output, replaced)) => {
            if replaced > 0 || !has_percent_placeholder(text)? {
                Ok(output)
            } else {
                format_percent(text, vars)
            }
        }
        Err(e) if e.is_missing_key() => {
            debug!("brace substitution failed ({}), trying percent style", e);
            format_percent(text, vars)
        }
        Err(e) => Err(e),
    }
}

fn has_percent_placeholder(text: &str) -> Result<bool> {
    let pattern = Regex::new(PERCENT_PATTERN)?;
    let found = pattern.captures_iter(text).any(|caps| caps.get(1).is_some());
    Ok(found)
}

fn lookup(vars: &Vars, name: &str) -> Result<String> {
    vars.get(name)
        .cloned()
        .ok_or_else(|| InstallError::missing_key(name))
}

fn substitute<F>(text: &str, pattern: &Regex, mut replace: F) -> Result<String>
where
    F: FnMut(&regex::Captures<'_>) -> Result<String>,
{
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        output.push_str(&text[last..whole.start()]);
        output.push_str(&replace(&caps)?);
        last = whole.end();
    }

    output.push_str(&text[last..]);
    Ok(output)
}
