//! Structural parser for WGSL `struct` blocks.
//!
//! Operates on comment-stripped source. This is a hand-written scanner with
//! explicit token consumption rather than pattern matching: struct bodies are
//! split at top-level commas (commas inside `<...>` type parameters stay
//! put), and each field keeps its full parameterized type spelling.

use tracing::trace;

/// One field of a parsed struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedField {
    pub name: String,
    pub type_name: String,
    /// `@location(N)` index, or -1 when the field has none.
    pub location: i32,
    /// `@builtin(...)` fields occupy no buffer space and carry no location.
    pub is_builtin: bool,
}

/// A `struct Name { ... }` block in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStruct {
    pub name: String,
    pub fields: Vec<ParsedField>,
}

/// Extract every top-level `struct Name { ... }` block from stripped source.
///
/// Struct bodies may not nest braces. Field segments that do not end in a
/// `name: Type` pair are silently skipped.
pub fn parse_structs(source: &str) -> Vec<ParsedStruct> {
    let bytes = source.as_bytes();
    let mut structs = Vec::new();
    let mut i = 0;

    while let Some(at) = find_keyword(source, i, "struct") {
        let mut cursor = at + "struct".len();
        cursor = skip_whitespace(bytes, cursor);
        let (name, after_name) = take_identifier(source, cursor);
        if name.is_empty() {
            i = cursor;
            continue;
        }
        cursor = skip_whitespace(bytes, after_name);
        if bytes.get(cursor) != Some(&b'{') {
            i = cursor;
            continue;
        }
        let Some(close) = source[cursor + 1..].find('}').map(|p| cursor + 1 + p) else {
            break;
        };
        let body = &source[cursor + 1..close];
        let fields: Vec<ParsedField> = split_top_level(body)
            .into_iter()
            .filter_map(parse_field)
            .collect();
        trace!(name, field_count = fields.len(), "parsed struct");
        structs.push(ParsedStruct {
            name: name.to_string(),
            fields,
        });
        i = close + 1;
    }

    structs
}

/// Find `keyword` at an identifier boundary, starting at `from`.
pub(crate) fn find_keyword(source: &str, from: usize, keyword: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut start = from;
    while let Some(pos) = source[start..].find(keyword).map(|p| start + p) {
        let before_ok = pos == 0 || !is_ident_byte(bytes[pos - 1]);
        let after = pos + keyword.len();
        let after_ok = after >= bytes.len() || !is_ident_byte(bytes[after]);
        if before_ok && after_ok {
            return Some(pos);
        }
        start = pos + keyword.len();
    }
    None
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

pub(crate) fn take_identifier(source: &str, start: usize) -> (&str, usize) {
    let bytes = source.as_bytes();
    let mut end = start;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    (&source[start..end], end)
}

/// Split a struct body at commas outside `<...>` type parameters.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                segments.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&body[start..]);
    segments
}

/// Parse one field segment; `None` for segments with no `name: Type` shape.
fn parse_field(segment: &str) -> Option<ParsedField> {
    let segment = segment.trim();
    if segment.is_empty() {
        return None;
    }

    let is_builtin = segment.contains("@builtin(");
    let mut location = -1;
    if !is_builtin {
        if let Some(pos) = segment.find("@location(") {
            let rest = &segment[pos + "@location(".len()..];
            if let Some(end) = rest.find(')') {
                location = rest[..end].trim().parse().unwrap_or(-1);
            }
        }
    }

    // Consume leading attributes so only `name: Type` remains.
    let mut rest = segment;
    loop {
        rest = rest.trim_start();
        let Some(after_at) = rest.strip_prefix('@') else {
            break;
        };
        let (attr, mut cursor) = take_identifier(after_at, 0);
        if attr.is_empty() {
            return None;
        }
        cursor = skip_whitespace(after_at.as_bytes(), cursor);
        if after_at.as_bytes().get(cursor) == Some(&b'(') {
            cursor = after_at[cursor + 1..].find(')').map(|p| cursor + 2 + p)?;
        }
        rest = &after_at[cursor..];
    }

    let colon = rest.find(':')?;
    let name = rest[..colon].trim();
    let type_name = rest[colon + 1..].trim();
    if !is_identifier(name) || type_name.is_empty() {
        trace!(segment, "skipping field segment");
        return None;
    }

    Some(ParsedField {
        name: name.to_string(),
        type_name: type_name.to_string(),
        location,
        is_builtin,
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
