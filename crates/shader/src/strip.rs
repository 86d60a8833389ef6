/// Remove `//` line comments and (possibly nested) `/* ... */` block comments.
///
/// Line structure is preserved: every newline in the input appears in the
/// output, so 1-based line numbers reported against the stripped text match
/// the original source. Unterminated block comments consume to end of input.
pub fn strip_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut depth = 0usize;
    let mut in_line_comment = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '\n' {
            // Newlines always survive, even inside comments.
            in_line_comment = false;
            out.push('\n');
            i += 1;
        } else if in_line_comment {
            i += 1;
        } else if depth > 0 {
            if c == '/' && next == Some('*') {
                depth += 1;
                i += 2;
            } else if c == '*' && next == Some('/') {
                depth -= 1;
                i += 2;
            } else {
                i += 1;
            }
        } else if c == '/' && next == Some('/') {
            in_line_comment = true;
            i += 2;
        } else if c == '/' && next == Some('*') {
            depth = 1;
            i += 2;
        } else {
            out.push(c);
            i += 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_line_comments() {
        let src = "let a = 1; // trailing\n// whole line\nlet b = 2;";
        assert_eq!(strip_comments(src), "let a = 1; \n\nlet b = 2;");
    }

    #[test]
    fn removes_block_comments() {
        let src = "let a /* inner */ = 1;";
        assert_eq!(strip_comments(src), "let a  = 1;");
    }

    #[test]
    fn handles_nested_block_comments() {
        let src = "a /* outer /* inner */ still outer */ b";
        assert_eq!(strip_comments(src), "a  b");
    }

    #[test]
    fn preserves_line_count() {
        let src = "one\n/* two\nthree */ four\nfive // six\n";
        let stripped = strip_comments(src);
        assert_eq!(src.lines().count(), stripped.lines().count());
    }

    #[test]
    fn unterminated_block_consumes_to_end() {
        let src = "kept /* lost forever";
        assert_eq!(strip_comments(src), "kept ");
    }

    #[test]
    fn stray_close_token_is_kept() {
        // `*/` with no opener is ordinary text as far as the stripper cares.
        let src = "a */ b";
        assert_eq!(strip_comments(src), "a */ b");
    }

    #[test]
    fn stripping_is_idempotent() {
        let src = "x /* c1 */ y // c2\nz /* /* n */ */ w\n";
        let once = strip_comments(src);
        assert_eq!(strip_comments(&once), once);
    }
}
