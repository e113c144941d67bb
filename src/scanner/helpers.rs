//! String-level helpers for the line rules. Hand-written, no regex.

/// Tab stops count as this many columns of indentation.
pub const TAB_WIDTH: usize = 4;

/// Measures leading whitespace. Returns `(columns, saw_tab)`.
pub fn measure_indent(raw: &str) -> (usize, bool) {
    let mut columns = 0usize;
    let mut saw_tab = false;
    for ch in raw.chars() {
        match ch {
            ' ' => columns += 1,
            '\t' => {
                columns += TAB_WIDTH;
                saw_tab = true;
            }
            _ => break,
        }
    }
    (columns, saw_tab)
}

/// Result of stripping a trailing `#` comment.
pub struct StrippedLine<'a> {
    pub code: &'a str,
    /// A string literal was still open at end of line.
    pub unterminated: bool,
}

/// Removes a `#` comment that is not inside a string literal.
pub fn strip_comment(line: &str) -> StrippedLine<'_> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '#' => {
                return StrippedLine {
                    code: line[..idx].trim_end(),
                    unterminated: false,
                }
            }
            _ => {}
        }
    }
    StrippedLine {
        code: line.trim_end(),
        unterminated: quote.is_some(),
    }
}

/// Returns the text after `keyword` if the line starts with it as a whole
/// word. The remainder is trimmed.
pub fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    match rest.chars().next() {
        None => Some(""),
        Some(ch) if ch.is_whitespace() || ch == ':' || ch == '(' => Some(rest.trim()),
        Some(_) => None,
    }
}

pub fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.'
}

/// Splits a leading identifier (letters, digits, `_`, `.`) off `input`.
pub fn split_identifier(input: &str) -> Option<(&str, &str)> {
    let end = input
        .char_indices()
        .find(|(_, ch)| !is_ident_char(*ch))
        .map(|(idx, _)| idx)
        .unwrap_or(input.len());
    if end == 0 {
        return None;
    }
    Some((&input[..end], &input[end..]))
}

/// Symbol name rule: starts with an ASCII letter or `_`, continues with
/// ASCII letters, digits, `_` or `.`.
pub fn is_valid_symbol_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
}

/// Label names: a symbol name, optionally with a leading `.` for local
/// labels.
pub fn is_valid_label_name(name: &str) -> bool {
    let bare = name.strip_prefix('.').unwrap_or(name);
    is_valid_symbol_name(bare) && !bare.ends_with('.') && !bare.contains("..")
}

/// Parses a string literal at the start of `input` (after leading
/// whitespace). Returns the unescaped contents and the remainder.
pub fn parse_string_literal(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    let mut chars = input.char_indices();
    let (_, quote) = chars.next()?;
    if quote != '"' && quote != '\'' && quote != '`' {
        return None;
    }
    let mut value = String::new();
    let mut escaped = false;
    for (idx, ch) in chars {
        if escaped {
            value.push(match ch {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            let rest = &input[idx + ch.len_utf8()..];
            return Some((value, rest));
        } else {
            value.push(ch);
        }
    }
    None
}

/// Returns `(before, params)` for `name(params)`; `params` excludes the
/// parentheses. Parentheses are matched with nesting.
pub fn split_params(input: &str) -> (&str, Option<&str>) {
    let Some(open) = input.find('(') else {
        return (input.trim(), None);
    };
    let mut depth = 0usize;
    for (idx, ch) in input[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let close = open + idx;
                    return (input[..open].trim(), Some(input[open + 1..close].trim()));
                }
            }
            _ => {}
        }
    }
    (input[..open].trim(), Some(input[open + 1..].trim()))
}

/// Finds the top-level `=` of an assignment (not `==`, `<=`, `>=`, `!=`,
/// or inside brackets/strings).
pub fn split_assignment(input: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let bytes = input.as_bytes();
    for (idx, ch) in input.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '=' if depth == 0 => {
                let prev = idx.checked_sub(1).map(|p| bytes[p]);
                let next = bytes.get(idx + 1).copied();
                if next == Some(b'=') || matches!(prev, Some(b'=' | b'<' | b'>' | b'!')) {
                    continue;
                }
                return Some((input[..idx].trim(), input[idx + 1..].trim()));
            }
            _ => {}
        }
    }
    None
}

/// Reads the value of a `key=` keyword argument whose value is a string
/// literal, e.g. `color="#c8ffc8"` inside a call argument list.
pub fn keyword_string_arg(args: &str, key: &str) -> Option<String> {
    let mut search = args;
    while let Some(pos) = search.find(key) {
        let before_ok = search[..pos]
            .chars()
            .next_back()
            .map_or(true, |ch| !is_ident_char(ch));
        let after = search[pos + key.len()..].trim_start();
        if before_ok {
            if let Some(value) = after.strip_prefix('=') {
                if !value.starts_with('=') {
                    return parse_string_literal(value).map(|(text, _)| text);
                }
            }
        }
        search = &search[pos + key.len()..];
    }
    None
}

/// Reads the first positional string literal in a call argument list.
pub fn first_positional_string(args: &str) -> Option<String> {
    let first = args.trim_start();
    parse_string_literal(first).map(|(text, _)| text)
}

/// Counts words in dialogue text, ignoring `{tag}` markup.
pub fn count_words(text: &str) -> usize {
    let mut plain = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '{' => in_tag = true,
            '}' if in_tag => {
                in_tag = false;
                plain.push(' ');
            }
            _ if !in_tag => plain.push(ch),
            _ => {}
        }
    }
    plain.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comment_respects_strings() {
        let stripped = strip_comment(r#"e "Issue #4 is fixed" # note"#);
        assert_eq!(stripped.code, r#"e "Issue #4 is fixed""#);
        assert!(!stripped.unterminated);

        let open = strip_comment(r#"e "never closed"#);
        assert!(open.unterminated);
    }

    #[test]
    fn test_string_literal_escapes() {
        let (text, rest) = parse_string_literal(r#""say \"hi\"" with dissolve"#).expect("literal");
        assert_eq!(text, r#"say "hi""#);
        assert_eq!(rest.trim(), "with dissolve");
        assert!(parse_string_literal("no quotes").is_none());
        assert!(parse_string_literal("\"open").is_none());
    }

    #[test]
    fn test_symbol_names() {
        assert!(is_valid_symbol_name("ok_name"));
        assert!(is_valid_symbol_name("persistent.seen"));
        assert!(!is_valid_symbol_name("1bad"));
        assert!(!is_valid_symbol_name(""));
        assert!(!is_valid_symbol_name("has space"));
        assert!(is_valid_label_name(".local"));
        assert!(!is_valid_label_name("a..b"));
    }

    #[test]
    fn test_split_assignment_skips_comparisons() {
        assert_eq!(split_assignment("x = y == 2"), Some(("x", "y == 2")));
        assert_eq!(split_assignment("a == b"), None);
        assert_eq!(
            split_assignment(r#"e = Character("E", what_prefix="=")"#),
            Some(("e", r#"Character("E", what_prefix="=")"#))
        );
    }

    #[test]
    fn test_keyword_args() {
        let args = r##""Eileen", color="#c8ffc8", what_color = "#fff""##;
        assert_eq!(first_positional_string(args).as_deref(), Some("Eileen"));
        assert_eq!(keyword_string_arg(args, "color").as_deref(), Some("#c8ffc8"));
        assert_eq!(keyword_string_arg(args, "what_color").as_deref(), Some("#fff"));
        assert_eq!(keyword_string_arg(args, "image"), None);
    }

    #[test]
    fn test_split_params_nested() {
        assert_eq!(split_params("route(a, f(b))"), ("route", Some("a, f(b)")));
        assert_eq!(split_params("plain"), ("plain", None));
    }

    #[test]
    fn test_count_words_ignores_tags() {
        assert_eq!(count_words("Hello {b}bold{/b} world"), 3);
        assert_eq!(count_words(""), 0);
    }
}
