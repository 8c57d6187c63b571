//! Document parsing and flattening.
//!
//! Every supported format is reduced to a flat `key -> value` map. Nested
//! mappings become dotted keys (`server.port`) and sequences become indexed
//! keys (`hosts[0]`). Empty mappings and sequences contribute no keys and
//! `null` becomes an empty string.

use std::collections::BTreeMap;

use serde_yaml::Value;

use crate::document::{DocumentFormat, SourceDocument};
use crate::errors::{ConfigError, ConfigResult};

/// Flat property map produced by the parsers.
pub type FlatProperties = BTreeMap<String, String>;

/// Parses a document into flattened properties according to its extension.
///
/// # Errors
///
/// Returns `ConfigError::MalformedDocument` naming the document and the
/// position of the failure when the content cannot be parsed.
pub fn parse_document(document: &SourceDocument) -> ConfigResult<FlatProperties> {
    let name = document.name();
    let format = document.format().ok_or_else(|| ConfigError::MalformedDocument {
        source_name: name.to_string(),
        line: 0,
        column: 0,
        reason: "unsupported document extension".to_string(),
    })?;

    match format {
        DocumentFormat::Properties => {
            let text = std::str::from_utf8(document.content())
                .map_err(|e| malformed(name, 0, 0, format!("invalid UTF-8: {}", e)))?;
            parse_properties(name, text)
        }
        DocumentFormat::Yaml => parse_yaml(name, document.content()),
        DocumentFormat::Json => parse_json(name, document.content()),
    }
}

/// Parses YAML content.
pub fn parse_yaml(name: &str, content: &[u8]) -> ConfigResult<FlatProperties> {
    if is_blank(content) {
        return Ok(FlatProperties::new());
    }

    let value: Value = serde_yaml::from_slice(content).map_err(|e| {
        let (line, column) = e
            .location()
            .map(|l| (l.line(), l.column()))
            .unwrap_or((0, 0));
        malformed(name, line, column, e.to_string())
    })?;

    flatten_root(name, value)
}

/// Parses JSON content.
pub fn parse_json(name: &str, content: &[u8]) -> ConfigResult<FlatProperties> {
    if is_blank(content) {
        return Ok(FlatProperties::new());
    }

    let json: serde_json::Value = serde_json::from_slice(content)
        .map_err(|e| malformed(name, e.line(), e.column(), e.to_string()))?;
    let value = serde_yaml::to_value(json).map_err(|e| malformed(name, 0, 0, e.to_string()))?;

    flatten_root(name, value)
}

/// Parses Java-style `.properties` content.
///
/// Supports `key=value`, `key: value` and `key value` separators, `#` and `!`
/// comments, trailing-backslash line continuations and the usual escapes
/// including `\uXXXX`.
pub fn parse_properties(name: &str, text: &str) -> ConfigResult<FlatProperties> {
    let mut properties = FlatProperties::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let line_number = index + 1;
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = trimmed.to_string();
        while has_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (raw_key, raw_value) = split_entry(&logical);
        let key = unescape(raw_key).map_err(|reason| malformed(name, line_number, 1, reason))?;
        let value = unescape(raw_value)
            .map_err(|reason| malformed(name, line_number, raw_key.len() + 1, reason))?;
        properties.insert(key, value);
    }

    Ok(properties)
}

fn flatten_root(name: &str, value: Value) -> ConfigResult<FlatProperties> {
    let mut properties = FlatProperties::new();
    match value {
        Value::Null => {}
        Value::Mapping(_) => flatten_into(name, "", &value, &mut properties)?,
        Value::Tagged(tagged) => return flatten_root(name, tagged.value),
        _ => {
            return Err(malformed(
                name,
                1,
                1,
                "top-level value must be a mapping".to_string(),
            ))
        }
    }
    Ok(properties)
}

fn flatten_into(
    name: &str,
    prefix: &str,
    value: &Value,
    out: &mut FlatProperties,
) -> ConfigResult<()> {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                let key = scalar_key(key).ok_or_else(|| {
                    malformed(
                        name,
                        0,
                        0,
                        format!("non-scalar key under '{}'", display_prefix(prefix)),
                    )
                })?;
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(name, &path, child, out)?;
            }
        }
        Value::Sequence(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(name, &format!("{prefix}[{index}]"), child, out)?;
            }
        }
        Value::Tagged(tagged) => flatten_into(name, prefix, &tagged.value, out)?,
        scalar => {
            out.insert(prefix.to_string(), scalar_text(scalar).unwrap_or_default());
        }
    }
    Ok(())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn scalar_key(key: &Value) -> Option<String> {
    match key {
        Value::Null => None,
        other => scalar_text(other),
    }
}

fn display_prefix(prefix: &str) -> &str {
    if prefix.is_empty() {
        "<root>"
    } else {
        prefix
    }
}

fn is_blank(content: &[u8]) -> bool {
    content.iter().all(u8::is_ascii_whitespace)
}

/// A line continues when it ends in an odd number of backslashes.
fn has_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Splits a logical line into raw key and raw value at the first unescaped
/// separator.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (index, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = index;
                break;
            }
            c if c.is_whitespace() => {
                key_end = index;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start();
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start();
    }
    (key, rest)
}

/// Decodes `.properties` escapes. `\${` stays escaped so placeholder
/// substitution still sees it as a literal.
fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('$') if chars.peek() == Some(&'{') => out.push_str("\\$"),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("invalid unicode escape '\\u{}'", hex))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn malformed(name: &str, line: usize, column: usize, reason: String) -> ConfigError {
    ConfigError::MalformedDocument {
        source_name: name.to_string(),
        line,
        column,
        reason,
    }
}

#[cfg(test)]
#[path = "parsers_tests.rs"]
mod tests;
