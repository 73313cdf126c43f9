//! Reader and writer for the `.properties` text format the credential files use.
//!
//! Parsing follows the Java properties grammar: comment lines start with `#`
//! or `!`, a key ends at the first unescaped `=`, `:` or whitespace, and a line
//! ending in an odd number of backslashes continues on the next line. The
//! writer escapes enough that every key and value reads back unchanged.

use buildcreds_core::CredentialSet;
use thiserror::Error;

const HEADER: &str = "# buildcreds encrypted credentials";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertiesError {
    #[error("malformed \\uXXXX escape on line {line}")]
    MalformedUnicode { line: usize },
}

/// Parse properties text into an ordered credential set.
pub fn parse(input: &str) -> Result<CredentialSet, PropertiesError> {
    let mut credentials = CredentialSet::new();
    let mut logical = String::new();
    let mut start_line = 0;
    let mut continuing = false;

    for (idx, raw) in input.lines().enumerate() {
        let line = trim_leading(raw);
        if !continuing {
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            start_line = idx + 1;
        }

        let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            logical.push_str(&line[..line.len() - 1]);
            continuing = true;
            continue;
        }

        logical.push_str(line);
        continuing = false;
        let (key, value) = split_entry(&logical, start_line)?;
        credentials.set(key, value);
        logical.clear();
    }

    // A continuation on the last line just ends the entry.
    if continuing {
        let (key, value) = split_entry(&logical, start_line)?;
        credentials.set(key, value);
    }

    Ok(credentials)
}

/// Render a credential set, one `identifier=value` line per entry, in order.
pub fn render(credentials: &CredentialSet) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + credentials.len() * 96);
    out.push_str(HEADER);
    out.push('\n');
    for (identifier, value) in credentials.iter() {
        escape_into(&mut out, identifier, true);
        out.push('=');
        escape_into(&mut out, value, false);
        out.push('\n');
    }
    out
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

fn trim_leading(s: &str) -> &str {
    s.trim_start_matches(is_blank)
}

fn split_entry(logical: &str, line: usize) -> Result<(String, String), PropertiesError> {
    let mut key_end = logical.len();
    let mut value_start = logical.len();
    let mut escaped = false;

    for (idx, c) in logical.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = idx;
                value_start = idx + 1;
                break;
            }
            c if is_blank(c) => {
                key_end = idx;
                let rest = trim_leading(&logical[idx..]);
                let mut offset = logical.len() - rest.len();
                if rest.starts_with('=') || rest.starts_with(':') {
                    offset += 1;
                }
                value_start = offset;
                break;
            }
            _ => {}
        }
    }

    let key = unescape(&logical[..key_end], line)?;
    let value = unescape(trim_leading(&logical[value_start..]), line)?;
    Ok((key, value))
}

fn unescape(s: &str, line: usize) -> Result<String, PropertiesError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let unit = read_unit(&mut chars, line)?;
                out.push(decode_unit(unit, &mut chars, line)?);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn read_unit(chars: &mut std::str::Chars<'_>, line: usize) -> Result<u16, PropertiesError> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 {
        return Err(PropertiesError::MalformedUnicode { line });
    }
    u16::from_str_radix(&digits, 16).map_err(|_| PropertiesError::MalformedUnicode { line })
}

/// Decode one UTF-16 unit, consuming a trailing `\uXXXX` low surrogate if needed.
fn decode_unit(
    unit: u16,
    chars: &mut std::str::Chars<'_>,
    line: usize,
) -> Result<char, PropertiesError> {
    if !(0xD800..0xDC00).contains(&unit) {
        return char::from_u32(u32::from(unit)).ok_or(PropertiesError::MalformedUnicode { line });
    }
    if chars.next() != Some('\\') || chars.next() != Some('u') {
        return Err(PropertiesError::MalformedUnicode { line });
    }
    let low = read_unit(chars, line)?;
    char::decode_utf16([unit, low])
        .next()
        .and_then(Result::ok)
        .ok_or(PropertiesError::MalformedUnicode { line })
}

fn escape_into(out: &mut String, s: &str, is_key: bool) {
    for (idx, c) in s.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || idx == 0 => out.push_str("\\ "),
            c if c.is_control() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{unit:04X}"));
                }
            }
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_separators_comments_and_blank_lines() {
        let input = "# header\n\n! bang comment\na=1\nb : 2\nc 3\n   d=  4\ne\n";
        let set = parse(input).expect("parse");
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "")]
        );
    }

    #[test]
    fn joins_continuation_lines() {
        let input = "long=abc\\\n    def\\\n  ghi\nnext=1\n";
        let set = parse(input).expect("parse");
        assert_eq!(set.get("long"), Some("abcdefghi"));
        assert_eq!(set.get("next"), Some("1"));
    }

    #[test]
    fn even_trailing_backslashes_do_not_continue() {
        let set = parse("path=C\\:\\\\\nnext=1\n").expect("parse");
        assert_eq!(set.get("path"), Some("C:\\"));
        assert_eq!(set.get("next"), Some("1"));
    }

    #[test]
    fn decodes_unicode_escapes_including_surrogates() {
        let set = parse("k=caf\\u00e9 \\uD83D\\uDE00\n").expect("parse");
        assert_eq!(set.get("k"), Some("café 😀"));
    }

    #[test]
    fn rejects_malformed_unicode() {
        let err = parse("ok=1\nbad=\\u12\n").expect_err("malformed");
        assert_eq!(err, PropertiesError::MalformedUnicode { line: 2 });
    }

    #[test]
    fn render_escapes_awkward_keys_and_values() {
        let set: CredentialSet = [
            ("db.pw", "abc+/=="),
            ("key with=sep:#!", " leading\tand\nnewline\\"),
        ]
        .into_iter()
        .collect();

        let text = render(&set);
        assert!(text.starts_with(HEADER));
        assert!(text.contains("db.pw=abc+/\\=\\=\n"));
        assert_eq!(parse(&text).expect("parse"), set);
    }

    #[test]
    fn duplicate_keys_keep_last_value() {
        let set = parse("a=1\nb=2\na=3\n").expect("parse");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![("a", "3"), ("b", "2")]);
    }
}
