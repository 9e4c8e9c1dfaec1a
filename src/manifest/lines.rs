//! Physical to logical line conversion
//!
//! Strips comments and joins `\` continuations before any parsing happens.

use regex::Regex;
use std::sync::LazyLock;

/// `#` at line start or after whitespace begins a comment
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(^|\s+)#.*$").unwrap());

/// One logical line, possibly spanning several physical lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Joined text with comments removed, trimmed
    pub text: String,
    /// First physical line (1-based)
    pub line: usize,
    /// Last physical line
    pub end_line: usize,
}

impl LogicalLine {
    pub fn new(text: impl Into<String>, line: usize, end_line: usize) -> Self {
        Self {
            text: text.into(),
            line,
            end_line,
        }
    }
}

/// Iterate physical lines with `\r\n` handled
pub fn physical_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

fn strip_comment(line: &str) -> &str {
    match COMMENT_RE.find(line) {
        Some(m) => &line[..m.start()],
        None => line,
    }
}

/// Split manifest content into non-blank logical lines
pub fn logical_lines(content: &str) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, raw) in physical_lines(content).enumerate() {
        let number = index + 1;

        if raw.trim_start().starts_with('#') {
            // A comment line ends any continuation in progress
            if let Some((start, text)) = pending.take() {
                push_line(&mut lines, text, start, number - 1);
            }
            continue;
        }

        let text = strip_comment(raw);
        match text.strip_suffix('\\') {
            Some(head) => {
                let (_, buffer) = pending.get_or_insert_with(|| (number, String::new()));
                buffer.push_str(head);
            }
            None => {
                let (start, mut buffer) = pending.take().unwrap_or((number, String::new()));
                buffer.push_str(text);
                push_line(&mut lines, buffer, start, number);
            }
        }
    }

    if let Some((start, text)) = pending {
        let end = physical_lines(content).count();
        push_line(&mut lines, text, start, end);
    }

    lines
}

fn push_line(lines: &mut Vec<LogicalLine>, text: String, line: usize, end_line: usize) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        lines.push(LogicalLine::new(trimmed, line, end_line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_comments_and_blanks() {
        let content = "# header\n\npytz>=2024.1\n   \n  # indented comment\nrequests\n";
        let lines = logical_lines(content);
        assert_eq!(
            lines,
            vec![
                LogicalLine::new("pytz>=2024.1", 3, 3),
                LogicalLine::new("requests", 6, 6),
            ]
        );
    }

    #[test]
    fn test_inline_comment_removed() {
        let lines = logical_lines("flask>=2.0  # web framework\n");
        assert_eq!(lines[0].text, "flask>=2.0");
    }

    #[test]
    fn test_hash_inside_token_kept() {
        let lines = logical_lines("https://example.com/pkg.zip#egg=pkg\n");
        assert_eq!(lines[0].text, "https://example.com/pkg.zip#egg=pkg");
    }

    #[test]
    fn test_continuation_joined() {
        let content = "numpy==1.26.4 \\\n    --hash=sha256:abc \\\n    --hash=sha256:def\nscipy\n";
        let lines = logical_lines(content);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].text,
            "numpy==1.26.4     --hash=sha256:abc     --hash=sha256:def"
        );
        assert_eq!((lines[0].line, lines[0].end_line), (1, 3));
        assert_eq!((lines[1].line, lines[1].end_line), (4, 4));
    }

    #[test]
    fn test_continuation_at_end_of_file() {
        let lines = logical_lines("pandas>=2.0 \\");
        assert_eq!(lines, vec![LogicalLine::new("pandas>=2.0", 1, 1)]);
    }

    #[test]
    fn test_comment_line_stops_continuation() {
        let lines = logical_lines("attrs \\\n# note\ncattrs\n");
        assert_eq!(
            lines,
            vec![
                LogicalLine::new("attrs", 1, 1),
                LogicalLine::new("cattrs", 3, 3),
            ]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let lines = logical_lines("a==1\r\nb==2\r\n");
        assert_eq!(lines[0].text, "a==1");
        assert_eq!(lines[1].text, "b==2");
        assert_eq!(lines[1].line, 2);
    }
}
