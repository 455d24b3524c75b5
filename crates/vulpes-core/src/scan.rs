//! Comment-aware structural scanning over shader text.
//!
//! Every helper here works on *masked* text: a copy of the source in which comment bytes are
//! replaced by spaces (newlines survive). The masked copy has the same byte length as the
//! original, so offsets found in one are valid in the other. Recognition stays structural:
//! balanced delimiters, identifier boundaries and top-level statement boundaries, nothing more.

use itertools::Itertools;
use std::ops::Range;

/// Blank out `//` and `/* */` comments, keeping byte offsets and line structure.
pub fn mask_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'/', Some(b'/')) => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out.push(b' ');
                    i += 1;
                }
            }
            (b'/', Some(b'*')) => {
                out.extend_from_slice(b"  ");
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    out.push(if bytes[i] == b'\n' { b'\n' } else { b' ' });
                    i += 1;
                }
                if i < bytes.len() {
                    out.extend_from_slice(b"  ");
                    i += 2;
                }
            }
            (byte, _) => {
                out.push(byte);
                i += 1;
            }
        }
    }
    // Comment boundaries are ASCII, so whole code characters are copied untouched.
    String::from_utf8_lossy(&out).into_owned()
}

pub fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// True when `candidate` is a valid identifier in both dialects.
pub fn is_identifier(candidate: &str) -> bool {
    let mut bytes = candidate.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => bytes.all(is_ident_byte),
        _ => false,
    }
}

/// The candidate itself when [`is_identifier`] accepts it.
pub fn ensure_identifier(candidate: &str) -> crate::Result<&str> {
    if is_identifier(candidate) {
        Ok(candidate)
    } else {
        Err(crate::Error::InvalidIdentifier(candidate.to_string()))
    }
}

/// Position of the delimiter closing the one at `open`, counting nesting of the same kind.
pub fn find_matching(masked: &str, open: usize) -> Option<usize> {
    let bytes = masked.as_bytes();
    let open_byte = *bytes.get(open)?;
    let close_byte = match open_byte {
        b'{' => b'}',
        b'(' => b')',
        b'[' => b']',
        _ => return None,
    };
    let mut depth = 0usize;
    for (offset, &byte) in bytes[open..].iter().enumerate() {
        if byte == open_byte {
            depth += 1;
        } else if byte == close_byte {
            depth -= 1;
            if depth == 0 {
                return Some(open + offset);
            }
        }
    }
    None
}

/// Shrink `range` so it starts and ends on non-whitespace bytes.
pub fn trim_range(masked: &str, range: Range<usize>) -> Range<usize> {
    let bytes = masked.as_bytes();
    let mut start = range.start;
    let mut end = range.end;
    while start < end && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    start..end
}

/// Split the argument list between the parentheses at `open` and `close` on top-level commas.
///
/// Returns trimmed argument ranges; an empty list yields no ranges.
pub fn split_args(masked: &str, open: usize, close: usize) -> Vec<Range<usize>> {
    let bytes = masked.as_bytes();
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut start = open + 1;
    for i in open + 1..close {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => {
                args.push(trim_range(masked, start..i));
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = trim_range(masked, start..close);
    if !(args.is_empty() && last.is_empty()) {
        args.push(last);
    }
    args
}

/// Offsets of every whole-identifier occurrence of `ident`.
pub fn find_identifier(masked: &str, ident: &str) -> Vec<usize> {
    let bytes = masked.as_bytes();
    masked
        .match_indices(ident)
        .map(|(pos, _)| pos)
        .filter(|&pos| {
            let before = pos.checked_sub(1).map(|i| bytes[i]);
            let after = bytes.get(pos + ident.len()).copied();
            !before.is_some_and(is_ident_byte) && !after.is_some_and(is_ident_byte)
        })
        .collect_vec()
}

pub fn contains_identifier(masked: &str, ident: &str) -> bool {
    !find_identifier(masked, ident).is_empty()
}

/// The identifier-like word ending right before `pos`, skipping whitespace.
///
/// Returns `None` when the nearest non-whitespace byte is punctuation.
pub fn previous_word(masked: &str, pos: usize) -> Option<&str> {
    let bytes = masked.as_bytes();
    let mut end = pos;
    while end > 0 && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && is_ident_byte(bytes[start - 1]) {
        start -= 1;
    }
    (start < end).then(|| &masked[start..end])
}

/// First non-whitespace offset at or after `pos`.
pub fn next_non_space(masked: &str, pos: usize) -> Option<usize> {
    masked.as_bytes()[pos.min(masked.len())..]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|offset| pos + offset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A preprocessor line (`#define`, `#if`, ...).
    Directive,
    /// A `;`-terminated statement, possibly with a brace initializer.
    Statement,
    /// A header followed by a compound block: functions and struct definitions.
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevelItem {
    pub kind: ItemKind,
    pub range: Range<usize>,
    /// Content strictly between the braces of a [`ItemKind::Block`].
    pub body: Option<Range<usize>>,
}

impl TopLevelItem {
    /// Text before the opening brace of a block, or the whole statement.
    pub fn header(&self) -> Range<usize> {
        match &self.body {
            Some(body) => self.range.start..body.start - 1,
            None => self.range.clone(),
        }
    }
}

/// Split text into brace-depth-zero items.
///
/// A `{` that follows an `=` in the same statement is an initializer and stays part of the
/// statement. Unbalanced input ends the scan with a block running to the end of the text.
pub fn top_level_items(masked: &str) -> Vec<TopLevelItem> {
    let bytes = masked.as_bytes();
    let mut items = Vec::new();
    let mut start: Option<usize> = None;
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if start.is_none() {
            if byte.is_ascii_whitespace() {
                i += 1;
                continue;
            }
            if byte == b'#' {
                let end = directive_end(bytes, i);
                items.push(TopLevelItem {
                    kind: ItemKind::Directive,
                    range: i..end,
                    body: None,
                });
                i = end;
                continue;
            }
            start = Some(i);
        }
        let item_start = start.unwrap_or(i);
        match byte {
            b'(' | b'[' => match find_matching(masked, i) {
                Some(close) => i = close + 1,
                None => {
                    items.push(unterminated(item_start, bytes.len()));
                    return items;
                }
            },
            b'{' => {
                let is_initializer = masked[item_start..i].contains('=');
                let Some(close) = find_matching(masked, i) else {
                    items.push(unterminated(item_start, bytes.len()));
                    return items;
                };
                if is_initializer {
                    i = close + 1;
                    continue;
                }
                let mut end = close + 1;
                if let Some(next) = next_non_space(masked, end) {
                    if bytes[next] == b';' {
                        end = next + 1;
                    }
                }
                items.push(TopLevelItem {
                    kind: ItemKind::Block,
                    range: item_start..end,
                    body: Some(i + 1..close),
                });
                start = None;
                i = end;
            }
            b';' => {
                items.push(TopLevelItem {
                    kind: ItemKind::Statement,
                    range: item_start..i + 1,
                    body: None,
                });
                start = None;
                i += 1;
            }
            _ => i += 1,
        }
    }
    items
}

fn unterminated(start: usize, end: usize) -> TopLevelItem {
    TopLevelItem {
        kind: ItemKind::Block,
        range: start..end,
        body: None,
    }
}

fn directive_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] == b'\n' && (i == 0 || bytes[i - 1] != b'\\') {
            return i;
        }
        i += 1;
    }
    bytes.len()
}

/// Non-overlapping replacements applied to a text in one pass.
#[derive(Debug, Default, Clone)]
pub struct TextEdits {
    edits: Vec<(Range<usize>, String)>,
}

impl TextEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.edits.push((range, text.into()));
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.edits.push((at..at, text.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Apply every edit; an edit overlapping an earlier one is dropped.
    pub fn apply(mut self, text: &str) -> String {
        self.edits.sort_by_key(|(range, _)| range.start);
        let mut out = String::with_capacity(text.len() + self.edits.len() * 16);
        let mut cursor = 0;
        for (range, replacement) in self.edits {
            if range.start < cursor {
                tracing::debug!(?range, "dropping overlapping text edit");
                continue;
            }
            out.push_str(&text[cursor..range.start]);
            out.push_str(&replacement);
            cursor = range.end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn masks_comments_preserving_offsets() {
        let text = "float a; // { not code }\n/* ( */ float b;";
        let masked = mask_comments(text);
        assert_eq!(masked.len(), text.len());
        assert!(!masked.contains('{'));
        assert!(!masked.contains('('));
        assert_eq!(&masked[33..41], "float b;");
    }

    #[test]
    fn matches_braces_nested_five_deep() {
        let text = "void f() { a { b { c { d { e } } } } } tail }";
        let open = text.find('{').unwrap();
        let close = find_matching(text, open).unwrap();
        assert_eq!(&text[close..], "} tail }");
    }

    #[test]
    fn unbalanced_delimiter_has_no_match() {
        assert_eq!(find_matching("{ { }", 0), None);
        assert_eq!(find_matching("abc", 0), None);
    }

    #[test]
    fn splits_arguments_on_top_level_commas() {
        let text = "f(a, g(b, c), d[1, 2] ,  e )";
        let close = find_matching(text, 1).unwrap();
        let args: Vec<&str> = split_args(text, 1, close)
            .into_iter()
            .map(|r| &text[r])
            .collect();
        assert_eq!(args, vec!["a", "g(b, c)", "d[1, 2]", "e"]);
        assert!(split_args("f(  )", 1, 4).is_empty());
    }

    #[test]
    fn identifier_search_respects_boundaries() {
        let text = "vec2 myvec2 vec2_s vec2";
        assert_eq!(find_identifier(text, "vec2"), vec![0, 19]);
    }

    #[test]
    fn identifiers_are_validated() {
        assert_eq!(ensure_identifier("_fx2"), Ok("_fx2"));
        assert_eq!(
            ensure_identifier("2fx"),
            Err(crate::Error::InvalidIdentifier("2fx".to_string()))
        );
        assert!(!is_identifier("my-effect"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn previous_word_skips_whitespace() {
        let text = "float  wobble(x) + wobble(y)";
        assert_eq!(previous_word(text, 7), Some("float"));
        assert_eq!(previous_word(text, 19), None);
    }

    #[test]
    fn splits_top_level_items() {
        let text = "#define N 3\nconst float3 p[N] = { a, b };\nstruct S { float x; };\nfloat f(float t) { return t; }\nfloat g;";
        let items = top_level_items(text);
        let kinds: Vec<ItemKind> = items.iter().map(|item| item.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ItemKind::Directive,
                ItemKind::Statement,
                ItemKind::Block,
                ItemKind::Block,
                ItemKind::Statement
            ]
        );
        assert_eq!(&text[items[1].range.clone()], "const float3 p[N] = { a, b };");
        assert_eq!(&text[items[2].range.clone()], "struct S { float x; };");
        assert_eq!(&text[items[3].body.clone().unwrap()], " return t; ");
        assert_eq!(&text[items[3].header()], "float f(float t) ");
    }

    #[test]
    fn edits_apply_in_offset_order() {
        let mut edits = TextEdits::new();
        edits.insert(3, ", b");
        edits.replace(0..1, "g");
        assert_eq!(edits.apply("f(a) + x"), "g(a, b) + x");
    }
}
