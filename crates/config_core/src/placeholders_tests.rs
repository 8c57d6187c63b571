//! Tests for placeholder substitution.

use super::*;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn default_used_when_variable_unset() {
    let resolved = resolve_placeholders("${FOO:bar}", &vars(&[])).unwrap();
    assert_eq!(resolved, "bar");
}

#[test]
fn variable_wins_over_default() {
    let resolved = resolve_placeholders("${FOO:bar}", &vars(&[("FOO", "baz")])).unwrap();
    assert_eq!(resolved, "baz");
}

#[test]
fn empty_default_is_allowed() {
    let resolved = resolve_placeholders("[${FOO:}]", &vars(&[])).unwrap();
    assert_eq!(resolved, "[]");
}

#[test]
fn missing_variable_without_default_fails() {
    let err = resolve_placeholders("jdbc:${DB_URL}", &vars(&[])).unwrap_err();
    assert_eq!(
        err,
        PlaceholderError::Unresolved {
            name: "DB_URL".to_string()
        }
    );
}

#[test]
fn multiple_placeholders_with_surrounding_text() {
    let resolved = resolve_placeholders(
        "http://${HOST:localhost}:${PORT}/api",
        &vars(&[("PORT", "9000")]),
    )
    .unwrap();
    assert_eq!(resolved, "http://localhost:9000/api");
}

#[test]
fn nested_default_is_resolved() {
    let resolved =
        resolve_placeholders("${PRIMARY:${FALLBACK:none}}", &vars(&[("FALLBACK", "f")])).unwrap();
    assert_eq!(resolved, "f");

    let resolved = resolve_placeholders("${PRIMARY:${FALLBACK:none}}", &vars(&[])).unwrap();
    assert_eq!(resolved, "none");
}

#[test]
fn default_may_contain_colons() {
    let resolved = resolve_placeholders("${URL:http://localhost:80}", &vars(&[])).unwrap();
    assert_eq!(resolved, "http://localhost:80");
}

#[test]
fn escaped_placeholder_is_literal() {
    let resolved = resolve_placeholders("cost \\${AMOUNT}", &vars(&[])).unwrap();
    assert_eq!(resolved, "cost ${AMOUNT}");
    assert!(!has_placeholder("cost \\${AMOUNT}"));
}

#[test]
fn unterminated_placeholder_fails() {
    let err = resolve_placeholders("${FOO:bar", &vars(&[])).unwrap_err();
    assert_eq!(err, PlaceholderError::Unterminated);
}

#[test]
fn nesting_up_to_the_limit_resolves() {
    let depth = MAX_PLACEHOLDER_DEPTH;
    let value = format!("{}x{}", "${A:".repeat(depth), "}".repeat(depth));
    assert_eq!(resolve_placeholders(&value, &vars(&[])).unwrap(), "x");
}

#[test]
fn nesting_past_the_limit_fails() {
    let depth = MAX_PLACEHOLDER_DEPTH + 1;
    let value = format!("{}x{}", "${A:".repeat(depth), "}".repeat(depth));
    let err = resolve_placeholders(&value, &vars(&[])).unwrap_err();
    assert_eq!(
        err,
        PlaceholderError::TooDeep {
            limit: MAX_PLACEHOLDER_DEPTH
        }
    );
}

#[test]
fn very_deep_nesting_fails_without_overflowing() {
    let depth = 200_000;
    let value = format!("{}x{}", "${A:".repeat(depth), "}".repeat(depth));
    let err = resolve_placeholders(&value, &vars(&[])).unwrap_err();
    assert!(matches!(err, PlaceholderError::TooDeep { .. }));
}

#[test]
fn plain_values_pass_through() {
    let resolved = resolve_placeholders("no placeholders $here {x}", &vars(&[])).unwrap();
    assert_eq!(resolved, "no placeholders $here {x}");
    assert!(!has_placeholder("no placeholders $here {x}"));
    assert!(has_placeholder("a ${B}"));
}

#[test]
fn variable_values_are_not_reexpanded() {
    let resolved = resolve_placeholders("${A}", &vars(&[("A", "${B}")])).unwrap();
    assert_eq!(resolved, "${B}");
}

#[test]
fn btree_map_is_a_variable_source() {
    let mut map = BTreeMap::new();
    map.insert("FOO".to_string(), "baz".to_string());
    assert_eq!(resolve_placeholders("${FOO:bar}", &map).unwrap(), "baz");
}
