//! Input line normalization.
//!
//! Turns the raw preprocessed stream into the logical sub-lines the rest of
//! the pipeline consumes: continuation lines are joined, C-preprocessor
//! residue and trailing comments are stripped, and `;`-separated statements
//! are split apart.

/// Split a preprocessed source into logical sub-lines.
///
/// `comment` is the architecture's comment introducer (`@`, `//` or `#`).
/// Occurrences prefixed with `\` are macro escapes, not comments.
pub fn logical_lines(source: &str, comment: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending = String::new();
    for raw in source.lines() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        // Join continuation lines before any splitting
        if let Some(head) = raw.strip_suffix('\\') {
            pending.push_str(head);
            continue;
        }
        pending.push_str(raw);
        let line = std::mem::take(&mut pending);
        split_line(&line, comment, &mut lines);
    }
    if !pending.is_empty() {
        split_line(&pending, comment, &mut lines);
    }
    lines
}

fn split_line(line: &str, comment: &str, out: &mut Vec<String>) {
    // Lines the C preprocessor left behind (#line markers, # comments)
    if line.trim_start().starts_with('#') {
        return;
    }
    let line = strip_comment(line, comment);
    for stmt in line.split(';') {
        out.push(stmt.to_string());
    }
}

/// Truncate at the first comment introducer that is not escaped with `\`.
fn strip_comment<'a>(line: &'a str, comment: &str) -> &'a str {
    let mut search_from = 0;
    while let Some(rel) = line[search_from..].find(comment) {
        let pos = search_from + rel;
        if pos > 0 && line.as_bytes()[pos - 1] == b'\\' {
            search_from = pos + comment.len();
            continue;
        }
        return &line[..pos];
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(source: &str, comment: &str) -> Vec<String> {
        logical_lines(source, comment)
    }

    #[test]
    fn test_plain_lines() {
        assert_eq!(read("mov r0, r1\nadd r0, #1\n", "@"), vec![
            "mov r0, r1",
            "add r0, #1"
        ]);
    }

    #[test]
    fn test_cpp_residue_stripped() {
        let lines = read("# 1 \"input.S\"\nnop\n  # comment\n", "@");
        assert_eq!(lines, vec!["nop"]);
    }

    #[test]
    fn test_comment_stripping() {
        assert_eq!(read("mov r0, r1 @ copy\n", "@"), vec!["mov r0, r1 "]);
        assert_eq!(read("add x0, x1 // sum\n", "//"), vec!["add x0, x1 "]);
    }

    #[test]
    fn test_escaped_comment_char_kept() {
        // \@ is the macro expansion counter on arm, not a comment
        assert_eq!(read("b label_\\@\n", "@"), vec!["b label_\\@"]);
        assert_eq!(read("b label_\\@ @ tail\n", "@"), vec!["b label_\\@ "]);
    }

    #[test]
    fn test_semicolon_split() {
        assert_eq!(read("nop; nop;nop\n", "@"), vec!["nop", " nop", "nop"]);
    }

    #[test]
    fn test_continuation_join() {
        assert_eq!(read(".macro m a, \\\nb\n", "@"), vec![".macro m a, b"]);
    }

    #[test]
    fn test_carriage_returns_removed() {
        assert_eq!(read("nop\r\nnop\r\n", "@"), vec!["nop", "nop"]);
    }
}
