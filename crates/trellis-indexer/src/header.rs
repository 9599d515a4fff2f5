//! Text-only metrics: non-empty line count and the leading header comment

/// Count lines containing at least one non-whitespace character.
pub fn count_lines(content: &str) -> u32 {
    content.lines().filter(|l| !l.trim().is_empty()).count() as u32
}

/// Extract the leading header comment.
///
/// After a byte-order mark and a `#!` interpreter line, either one block
/// comment (delimiters and leading `*` stripped per line) or a run of
/// consecutive `//` line comments (markers stripped). Blank lines before the
/// comment are skipped; any other line ends the scan.
pub fn header_comment(content: &str) -> String {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.lines().peekable();
    if lines.peek().is_some_and(|l| l.starts_with("#!")) {
        lines.next();
    }
    while lines.peek().is_some_and(|l| l.trim().is_empty()) {
        lines.next();
    }

    let Some(first) = lines.peek().copied().map(str::trim_start) else {
        return String::new();
    };

    if first.starts_with("/*") {
        let mut body = Vec::new();
        for line in lines {
            let mut text = line.trim();
            let closes = text.contains("*/");
            if let Some(rest) = text.strip_prefix("/*") {
                text = rest.trim_start_matches('*');
            }
            if let Some(idx) = text.find("*/") {
                text = &text[..idx];
            }
            body.push(strip_leading_star(text).to_string());
            if closes {
                break;
            }
        }
        return join_trimmed(body);
    }

    if first.starts_with("//") {
        let body = lines
            .map_while(|l| l.trim_start().strip_prefix("//"))
            .map(|l| l.trim_start_matches('/').trim().to_string())
            .collect();
        return join_trimmed(body);
    }

    String::new()
}

fn strip_leading_star(line: &str) -> &str {
    let line = line.trim();
    match line.strip_prefix('*') {
        Some(rest) => rest.trim(),
        None => line,
    }
}

/// Join lines, dropping blank lines at either end.
fn join_trimmed(mut lines: Vec<String>) -> String {
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    lines[start..].join("\n")
}
