//! Placeholder substitution for context values.
//!
//! Strings may reference context descriptions with `{name}` syntax; the
//! replacement is looked up in the owning [`Context`](super::Context) and
//! normalized again, so descriptions can refer to each other. Use `\{` and
//! `\}` to produce literal braces. A string that consists of exactly one
//! `{name}` token resolves to the raw described value, without forcing it
//! to a string.
//!
//! Substitution is depth-bounded: descriptions that refer to themselves,
//! directly or through a chain, fail with
//! [`ContextError::RecursionLimit`] instead of recursing forever.

use toml::Value;

use super::{Context, ContextError};

/// Maximum substitution depth before a reference chain is treated as cyclic.
pub(crate) const MAX_DEPTH: usize = 64;

/// Applies substitution to a value, recursively for arrays and tables.
pub(crate) fn apply(ctx: &Context, value: &Value, depth: usize) -> Result<Value, ContextError> {
    if depth >= MAX_DEPTH {
        return Err(ContextError::RecursionLimit(MAX_DEPTH));
    }
    match value {
        Value::String(s) => apply_str(ctx, s, depth),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(apply(ctx, item, depth + 1)?);
            }
            Ok(Value::Array(out))
        }
        Value::Table(table) => {
            let mut out = toml::Table::new();
            for (key, item) in table {
                out.insert(key.clone(), apply(ctx, item, depth + 1)?);
            }
            Ok(Value::Table(out))
        }
        other => Ok(other.clone()),
    }
}

/// Substitutes `{name}` references in a string.
fn apply_str(ctx: &Context, text: &str, depth: usize) -> Result<Value, ContextError> {
    if depth >= MAX_DEPTH {
        return Err(ContextError::RecursionLimit(MAX_DEPTH));
    }
    if let Some(token) = strict_token(text) {
        return expand_token(ctx, token, depth).map(|(_, value)| value);
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\\' => match chars.peek() {
                // Escape sequence: \{ -> {, \} -> }
                Some((_, brace @ ('{' | '}'))) => {
                    out.push(*brace);
                    chars.next();
                }
                _ => out.push('\\'),
            },
            '{' => match matching_brace(text, pos) {
                Some(end) => {
                    let token = &text[pos + 1..end];
                    let (name, value) = expand_token(ctx, token, depth)?;
                    out.push_str(&scalar_text(&value).ok_or_else(|| {
                        ContextError::NonScalarInterpolation(name)
                    })?);
                    while let Some((inner, _)) = chars.peek() {
                        if *inner > end {
                            break;
                        }
                        chars.next();
                    }
                }
                // Unbalanced brace, keep it literal.
                None => out.push('{'),
            },
            other => out.push(other),
        }
    }
    Ok(Value::String(out))
}

/// Resolves one `{...}` token to its described value.
///
/// The token text is itself substituted first, so a reference name can be
/// assembled from other descriptions. Returns the resolved name together
/// with the normalized value; unknown names resolve to the empty string.
fn expand_token(ctx: &Context, token: &str, depth: usize) -> Result<(String, Value), ContextError> {
    let resolved = apply_str(ctx, token, depth + 1)?;
    let name = scalar_text(&resolved)
        .ok_or_else(|| ContextError::NonScalarInterpolation(token.to_owned()))?;
    let raw = ctx
        .description(&name)
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()));
    let value = apply(ctx, &raw, depth + 1)?;
    Ok((name, value))
}

/// Returns the inner token when the whole string is a single `{...}` group.
fn strict_token(text: &str) -> Option<&str> {
    if !text.starts_with('{') {
        return None;
    }
    let end = matching_brace(text, 0)?;
    if end != text.len() - 1 || end == 1 {
        return None;
    }
    Some(&text[1..end])
}

/// Finds the byte offset of the brace closing the group opened at `open`.
///
/// Escaped braces do not affect nesting.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut level = 0usize;
    let mut escaped = false;
    for (pos, ch) in text[open..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '{' => level += 1,
            '}' => {
                level -= 1;
                if level == 0 {
                    return Some(open + pos);
                }
            }
            _ => {}
        }
    }
    None
}

/// Renders a leaf value as plain text; `None` for arrays and tables.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(dt) => Some(dt.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::Context;
    use toml::Value;

    fn ctx() -> Context {
        let mut ctx = Context::new("subject", "env");
        ctx.describe("host", "localhost").describe("port", 8080i64);
        ctx
    }

    #[test]
    fn plain_strings_pass_through() {
        let ctx = ctx();
        assert_eq!(
            ctx.normalize(&Value::String("no references".into())).unwrap(),
            Value::String("no references".into())
        );
    }

    #[test]
    fn references_are_substituted() {
        let ctx = ctx();
        assert_eq!(
            ctx.normalize(&Value::String("http://{host}:{port}/".into()))
                .unwrap(),
            Value::String("http://localhost:8080/".into())
        );
    }

    #[test]
    fn strict_match_keeps_the_raw_value() {
        let ctx = ctx();
        assert_eq!(
            ctx.normalize(&Value::String("{port}".into())).unwrap(),
            Value::Integer(8080)
        );
    }

    #[test]
    fn escaped_braces_become_literal() {
        let ctx = ctx();
        assert_eq!(
            ctx.normalize(&Value::String(r"\{host\} is {host}".into()))
                .unwrap(),
            Value::String("{host} is localhost".into())
        );
    }

    #[test]
    fn unknown_references_resolve_empty() {
        let ctx = ctx();
        assert_eq!(
            ctx.normalize(&Value::String("[{missing}]".into())).unwrap(),
            Value::String("[]".into())
        );
    }

    #[test]
    fn chained_references_resolve() {
        let mut ctx = ctx();
        ctx.describe("url", "http://{host}/{page}")
            .describe("page", "index");
        assert_eq!(
            ctx.about("url", "").unwrap(),
            Value::String("http://localhost/index".into())
        );
    }

    #[test]
    fn nested_tokens_assemble_the_reference_name() {
        let mut ctx = ctx();
        ctx.describe("which", "host");
        assert_eq!(
            ctx.normalize(&Value::String("{{which}}".into())).unwrap(),
            Value::String("localhost".into())
        );
    }

    #[test]
    fn arrays_and_tables_recurse() {
        let ctx = ctx();
        let value = Value::Array(vec![
            Value::String("{host}".into()),
            Value::String("{port}".into()),
        ]);
        let out = ctx.normalize(&value).unwrap();
        assert_eq!(
            out,
            Value::Array(vec![Value::String("localhost".into()), Value::Integer(8080)])
        );
    }

    #[test]
    fn cyclic_descriptions_fail_with_recursion_limit() {
        let mut ctx = Context::new("s", "e");
        ctx.describe("a", "{b}").describe("b", "{a}");
        let err = ctx.about("a", "").unwrap_err();
        assert!(matches!(
            err,
            super::super::ContextError::RecursionLimit(_)
        ));
    }

    #[test]
    fn unbalanced_brace_is_kept_literal() {
        let ctx = ctx();
        assert_eq!(
            ctx.normalize(&Value::String("open { only".into())).unwrap(),
            Value::String("open { only".into())
        );
    }
}
