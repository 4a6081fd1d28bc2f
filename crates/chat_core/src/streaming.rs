//! Detection of the unterminated Markdown construct at the end of a partial
//! message.
//!
//! While tokens are still arriving the text can end inside a link, an image
//! reference, an HTML tag, an emphasis run or a table. Rendering that tail
//! verbatim shows broken syntax, so the renderer draws everything before it
//! and a placeholder for the construct itself.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteKind {
    Image,
    Link,
    Table,
    Html,
    Emphasis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incomplete<'a> {
    pub kind: IncompleteKind,
    pub raw: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingTail<'a> {
    /// Prefix that is safe to render as-is.
    pub complete: &'a str,
    pub pending: Option<Incomplete<'a>>,
}

pub fn split_incomplete_tail(text: &str) -> StreamingTail<'_> {
    match find_incomplete(text) {
        Some((start, kind)) => StreamingTail {
            complete: &text[..start],
            pending: Some(Incomplete {
                kind,
                raw: &text[start..],
            }),
        },
        None => StreamingTail {
            complete: text,
            pending: None,
        },
    }
}

fn find_incomplete(text: &str) -> Option<(usize, IncompleteKind)> {
    if in_open_fence(text) {
        return None;
    }
    if let Some(block_start) = table_block_start(text) {
        return incomplete_table(text, block_start).map(|start| (start, IncompleteKind::Table));
    }
    let para_start = text.rfind("\n\n").map(|idx| idx + 2).unwrap_or(0);
    incomplete_inline(&text[para_start..]).map(|(idx, kind)| (para_start + idx, kind))
}

fn in_open_fence(text: &str) -> bool {
    text.lines()
        .filter(|line| line.trim_start().starts_with("```"))
        .count()
        % 2
        == 1
}

fn is_table_line(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

/// Offset of the first line of the table block the text ends in, if any.
fn table_block_start(text: &str) -> Option<usize> {
    let body = text.trim_end_matches('\n');
    let mut end = body.len();
    let mut block_start = None;
    loop {
        let line_start = body[..end].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        if !is_table_line(&body[line_start..end]) {
            break;
        }
        block_start = Some(line_start);
        if line_start == 0 {
            break;
        }
        end = line_start - 1;
    }
    block_start
}

fn incomplete_table(text: &str, block_start: usize) -> Option<usize> {
    let block = &text[block_start..];
    let lines: Vec<&str> = block.trim_end_matches('\n').lines().collect();
    let header = lines.first()?;
    let separator_ok = lines
        .get(1)
        .is_some_and(|separator| is_separator(separator, header));
    if !separator_ok {
        return Some(block_start);
    }
    if lines.len() > 2 && !text.ends_with('\n') {
        let last = lines[lines.len() - 1];
        if !last.trim_end().ends_with('|') {
            let last_start = text.len() - last.len();
            return Some(last_start);
        }
    }
    None
}

fn is_separator(line: &str, header: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('-')
        && trimmed.ends_with('|')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' '))
        && trimmed.matches('|').count() == header.trim().matches('|').count()
}

/// Byte mask of positions that sit outside inline code spans.
fn code_mask(para: &str) -> Vec<bool> {
    let mut mask = Vec::with_capacity(para.len());
    let mut in_code = false;
    for byte in para.bytes() {
        if byte == b'`' {
            in_code = !in_code;
            mask.push(false);
        } else {
            mask.push(!in_code);
        }
    }
    mask
}

fn incomplete_inline(para: &str) -> Option<(usize, IncompleteKind)> {
    let outside = code_mask(para);
    let candidates = [
        incomplete_bracket(para, &outside),
        incomplete_html(para, &outside).map(|idx| (idx, IncompleteKind::Html)),
        incomplete_emphasis(para, &outside).map(|idx| (idx, IncompleteKind::Emphasis)),
    ];
    candidates
        .into_iter()
        .flatten()
        .min_by_key(|(idx, _)| *idx)
}

fn incomplete_bracket(para: &str, outside: &[bool]) -> Option<(usize, IncompleteKind)> {
    let bytes = para.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if outside[idx] && bytes[idx] == b'[' {
            let is_image = idx > 0 && bytes[idx - 1] == b'!' && outside[idx - 1];
            if !bracket_closes(&para[idx..]) {
                return Some(if is_image {
                    (idx - 1, IncompleteKind::Image)
                } else {
                    (idx, IncompleteKind::Link)
                });
            }
        }
        idx += 1;
    }
    None
}

/// `s` starts at `[`. Plain bracketed text counts as closed once something
/// other than `(` follows the `]`.
fn bracket_closes(s: &str) -> bool {
    let Some(close) = s.find(']') else {
        return false;
    };
    match s[close + 1..].chars().next() {
        None => false,
        Some('(') => s[close + 1..].contains(')'),
        Some(_) => true,
    }
}

fn incomplete_html(para: &str, outside: &[bool]) -> Option<usize> {
    if let Some(open) = para.rfind("<sup>") {
        if outside[open] && !para[open..].contains("</sup>") {
            return Some(open);
        }
    }
    let bytes = para.as_bytes();
    let open = para.rfind('<')?;
    if !outside[open] {
        return None;
    }
    let starts_tag = bytes
        .get(open + 1)
        .is_none_or(|next| next.is_ascii_alphabetic() || *next == b'/');
    (starts_tag && !para[open..].contains('>')).then_some(open)
}

fn incomplete_emphasis(para: &str, outside: &[bool]) -> Option<usize> {
    let mut earliest: Option<usize> = None;
    for delimiter in ["**", "__", "~~"] {
        let hits = delimiter_hits(para, outside, delimiter);
        if let Some(open) = unmatched_opener(para, &hits, delimiter.len()) {
            earliest = Some(earliest.map_or(open, |e| e.min(open)));
        }
    }
    let singles = single_star_hits(para, outside);
    if let Some(open) = unmatched_opener(para, &singles, 1) {
        earliest = Some(earliest.map_or(open, |e| e.min(open)));
    }
    earliest
}

fn delimiter_hits(para: &str, outside: &[bool], delimiter: &str) -> Vec<usize> {
    let mut hits = Vec::new();
    let mut idx = 0;
    while idx < para.len() {
        if outside[idx] && para.as_bytes()[idx..].starts_with(delimiter.as_bytes()) {
            hits.push(idx);
            idx += delimiter.len();
        } else {
            idx += 1;
        }
    }
    hits
}

/// Lone `*` that can delimit emphasis: not part of `**`, not a list bullet,
/// not an operator between spaces.
fn single_star_hits(para: &str, outside: &[bool]) -> Vec<usize> {
    let bytes = para.as_bytes();
    let mut hits = Vec::new();
    for idx in 0..bytes.len() {
        if bytes[idx] != b'*' || !outside[idx] {
            continue;
        }
        let prev = idx.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(idx + 1).copied();
        if prev == Some(b'*') || next == Some(b'*') {
            continue;
        }
        let at_line_start = para[..idx].rsplit('\n').next().is_some_and(|l| l.trim().is_empty());
        let next_is_space = next.is_some_and(|b| b.is_ascii_whitespace());
        let prev_is_space = prev.is_none_or(|b| b.is_ascii_whitespace());
        if next_is_space && (at_line_start || prev_is_space) {
            continue;
        }
        hits.push(idx);
    }
    hits
}

fn unmatched_opener(para: &str, hits: &[usize], width: usize) -> Option<usize> {
    if hits.len() % 2 == 0 {
        return None;
    }
    let last = *hits.last()?;
    let follows_word = para[last + width..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_whitespace());
    follows_word.then_some(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_kind(text: &str) -> Option<IncompleteKind> {
        split_incomplete_tail(text).pending.map(|p| p.kind)
    }

    #[test]
    fn dangling_link_is_cut_at_bracket() {
        let tail = split_incomplete_tail("See [the docs](https://exa");
        assert_eq!(tail.complete, "See ");
        assert_eq!(tail.pending.unwrap().kind, IncompleteKind::Link);
    }

    #[test]
    fn finished_link_is_complete() {
        assert_eq!(pending_kind("See [the docs](https://example.com) now"), None);
        assert_eq!(pending_kind("Item [1] is fine"), None);
    }

    #[test]
    fn truncated_image_reference() {
        let tail = split_incomplete_tail("Look: ![chart](http");
        assert_eq!(tail.complete, "Look: ");
        assert_eq!(tail.pending.unwrap().kind, IncompleteKind::Image);
    }

    #[test]
    fn open_emphasis_run() {
        let tail = split_incomplete_tail("This is **very imp");
        assert_eq!(tail.complete, "This is ");
        assert_eq!(tail.pending.unwrap().kind, IncompleteKind::Emphasis);
        assert_eq!(pending_kind("This is **very** important"), None);
        assert_eq!(pending_kind("* bullet item"), None);
        assert_eq!(pending_kind("2 * 3 = 6"), None);
    }

    #[test]
    fn unclosed_marker_tag() {
        let tail = split_incomplete_tail("AI grows fast<sup>1");
        assert_eq!(tail.complete, "AI grows fast");
        assert_eq!(tail.pending.unwrap().kind, IncompleteKind::Html);
        assert_eq!(pending_kind("AI grows fast<sup>1</sup>"), None);
    }

    #[test]
    fn table_without_separator_is_pending() {
        let text = "Intro\n\n| a | b |\n";
        let tail = split_incomplete_tail(text);
        assert_eq!(tail.complete, "Intro\n\n");
        assert_eq!(tail.pending.unwrap().kind, IncompleteKind::Table);
    }

    #[test]
    fn partial_table_row_is_pending() {
        let text = "| a | b |\n|---|---|\n| 1 | 2 |\n| 3 ";
        let tail = split_incomplete_tail(text);
        assert_eq!(tail.complete, "| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert_eq!(tail.pending.unwrap().raw, "| 3 ");
    }

    #[test]
    fn nothing_is_pending_inside_code_fence() {
        assert_eq!(pending_kind("```rust\nlet v = [1, 2"), None);
    }

    #[test]
    fn brackets_in_inline_code_are_ignored() {
        assert_eq!(pending_kind("use `v[0` here"), None);
    }
}
