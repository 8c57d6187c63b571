//! `${NAME:default}` placeholder substitution.
//!
//! A placeholder is replaced by the value of the variable `NAME` when the
//! variable source knows it, otherwise by the inline default. Defaults may
//! themselves contain placeholders (`${PRIMARY:${FALLBACK:none}}`). A
//! backslash before `${` keeps the placeholder text literally.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

/// Lookup of placeholder variables.
pub trait VariableSource: Send + Sync {
    /// Returns the value of `name`, or `None` when it is not defined.
    fn get(&self, name: &str) -> Option<String>;
}

/// Variables read from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl VariableSource for ProcessEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl VariableSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

impl VariableSource for BTreeMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        BTreeMap::get(self, name).cloned()
    }
}

/// Failure to substitute the placeholders of one value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderError {
    #[error("unresolved placeholder '{name}'")]
    Unresolved { name: String },

    #[error("unterminated placeholder")]
    Unterminated,

    #[error("placeholder defaults nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Deepest chain of nested defaults that is expanded.
pub const MAX_PLACEHOLDER_DEPTH: usize = 32;

/// Substitutes every placeholder in `value`.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use config_core::placeholders::resolve_placeholders;
///
/// let vars: HashMap<String, String> = HashMap::new();
/// let resolved = resolve_placeholders("http://${HOST:localhost}:8080", &vars).unwrap();
/// assert_eq!(resolved, "http://localhost:8080");
/// ```
pub fn resolve_placeholders(
    value: &str,
    variables: &dyn VariableSource,
) -> Result<String, PlaceholderError> {
    resolve_at_depth(value, variables, 0)
}

fn resolve_at_depth(
    value: &str,
    variables: &dyn VariableSource,
    depth: usize,
) -> Result<String, PlaceholderError> {
    if depth > MAX_PLACEHOLDER_DEPTH {
        return Err(PlaceholderError::TooDeep {
            limit: MAX_PLACEHOLDER_DEPTH,
        });
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        if rest[..start].ends_with('\\') {
            out.push_str(&rest[..start - 1]);
            out.push_str("${");
            rest = &rest[start + 2..];
            continue;
        }

        out.push_str(&rest[..start]);
        let body_start = start + 2;
        let body_len = closing_brace(&rest[body_start..]).ok_or(PlaceholderError::Unterminated)?;
        let body = &rest[body_start..body_start + body_len];
        out.push_str(&expand(body, variables, depth)?);
        rest = &rest[body_start + body_len + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Whether `value` contains at least one unescaped placeholder.
pub fn has_placeholder(value: &str) -> bool {
    value.match_indices("${").any(|(index, _)| !value[..index].ends_with('\\'))
}

fn expand(
    body: &str,
    variables: &dyn VariableSource,
    depth: usize,
) -> Result<String, PlaceholderError> {
    let (name, default) = match body.split_once(':') {
        Some((name, default)) => (name.trim(), Some(default)),
        None => (body.trim(), None),
    };

    if let Some(value) = variables.get(name) {
        return Ok(value);
    }

    match default {
        Some(default) => resolve_at_depth(default, variables, depth + 1),
        None => Err(PlaceholderError::Unresolved {
            name: name.to_string(),
        }),
    }
}

/// Byte offset of the `}` closing a placeholder body, honouring nesting.
fn closing_brace(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'$' if bytes.get(index + 1) == Some(&b'{') => {
                depth += 1;
                index += 2;
                continue;
            }
            b'}' if depth == 0 => return Some(index),
            b'}' => depth -= 1,
            _ => {}
        }
        index += 1;
    }
    None
}

#[cfg(test)]
#[path = "placeholders_tests.rs"]
mod tests;
