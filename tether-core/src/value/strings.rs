//! Quoted-string helpers for the shared textual convention.
//!
//! Unlike the cell serializer, these escape properly: backslash, the
//! delimiter itself, newline, and tab. `str_repr` and `parse_string` are
//! inverses for any delimiter.

/// Render `s` as a delimited string literal with escapes applied.
pub fn str_repr(s: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            ch if ch == delimiter => {
                out.push('\\');
                out.push(delimiter);
            }
            ch => out.push(ch),
        }
    }
    out.push(delimiter);
    out
}

/// Parse a delimited string literal at the start of `expression`.
///
/// Returns the unescaped content and the byte index one past the closing
/// delimiter, or `None` when the input does not start with the delimiter,
/// contains an unknown escape, or ends before the literal closes.
pub fn parse_first_string(expression: &str, delimiter: char) -> Option<(String, usize)> {
    let mut chars = expression.char_indices();
    match chars.next() {
        Some((_, ch)) if ch == delimiter => {}
        _ => return None,
    }

    let mut output = String::new();
    while let Some((i, ch)) = chars.next() {
        if ch == delimiter {
            return Some((output, i + ch.len_utf8()));
        } else if ch == '\\' {
            let (_, escaped) = chars.next()?;
            match escaped {
                '\\' => output.push('\\'),
                'n' => output.push('\n'),
                't' => output.push('\t'),
                ch if ch == delimiter => output.push(delimiter),
                _ => return None,
            }
        } else {
            output.push(ch);
        }
    }

    // Ran out of input before the closing delimiter.
    None
}

/// Parse `expression` as exactly one delimited string literal.
pub fn parse_string(expression: &str, delimiter: char) -> Option<String> {
    match parse_first_string(expression, delimiter) {
        Some((parsed, end)) if end == expression.len() => Some(parsed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_escapes_specials() {
        assert_eq!(str_repr("plain", '\''), "'plain'");
        assert_eq!(str_repr("it's", '\''), "'it\\'s'");
        assert_eq!(str_repr("a\\b", '\''), "'a\\\\b'");
        assert_eq!(str_repr("line\nbreak\ttab", '"'), "\"line\\nbreak\\ttab\"");
    }

    #[test]
    fn parse_inverts_repr() {
        for s in ["", "plain", "it's", "a\\b", "line\nbreak\ttab", "\"mixed'"] {
            for delimiter in ['\'', '"'] {
                let repr = str_repr(s, delimiter);
                assert_eq!(parse_string(&repr, delimiter), Some(s.to_owned()));
            }
        }
    }

    #[test]
    fn parse_first_reports_continuation() {
        let (parsed, end) = parse_first_string("'abc' + rest", '\'').expect("parse");
        assert_eq!(parsed, "abc");
        assert_eq!(&"'abc' + rest"[end..], " + rest");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(parse_first_string("no quote", '\''), None);
        assert_eq!(parse_first_string("'unterminated", '\''), None);
        assert_eq!(parse_first_string("'bad \\q escape'", '\''), None);
        // Trailing content fails the exact-parse variant.
        assert_eq!(parse_string("'abc' ", '\''), None);
    }
}
