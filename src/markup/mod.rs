//! Classifies assistant text into dialogue and the three inline stylistic
//! conventions: `*action*`, `[scene]` and `(thought)`.
//!
//! Every convention is matched by its own single pass over the input and the
//! results are merged by offset. The function is total, so it can be called on
//! partially streamed text: an unterminated bracket simply stays dialogue
//! until its closing delimiter arrives.

use serde::{ Serialize, Deserialize };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Dialogue,
    Narration,
    Background,
    Thought,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupSegment {
    pub kind: SegmentKind,
    pub content: String,
}

impl MarkupSegment {
    fn new(kind: SegmentKind, content: &str) -> Self {
        Self { kind, content: content.to_string() }
    }
}

struct Convention {
    open: u8,
    close: u8,
    kind: SegmentKind,
}

// Scan order doubles as the tie-break for matches starting at the same offset.
const CONVENTIONS: [Convention; 3] = [
    Convention { open: b'*', close: b'*', kind: SegmentKind::Narration },
    Convention { open: b'[', close: b']', kind: SegmentKind::Background },
    Convention { open: b'(', close: b')', kind: SegmentKind::Thought },
];

#[derive(Debug, Clone, Copy)]
struct Match {
    start: usize,
    end: usize,
    kind: SegmentKind,
}

impl Match {
    fn inner<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start + 1..self.end - 1]
    }
}

/// Finds every non-overlapping `open content close` span where content is
/// non-empty and free of `close`. Delimiters are ASCII, so every offset is a
/// char boundary.
fn scan(text: &str, convention: &Convention, out: &mut Vec<Match>) {
    let bytes = text.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let open = match memchr(convention.open, &bytes[pos..]) {
            Some(i) => pos + i,
            None => break,
        };
        let close = match memchr(convention.close, &bytes[open + 1..]) {
            Some(i) => open + 1 + i,
            // No closer anywhere after this opener, so none for later openers either.
            None => break,
        };
        if close == open + 1 {
            pos = open + 1;
            continue;
        }
        out.push(Match { start: open, end: close + 1, kind: convention.kind });
        pos = close + 1;
    }
}

fn memchr(needle: u8, haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}

fn push_dialogue(segments: &mut Vec<MarkupSegment>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        segments.push(MarkupSegment::new(SegmentKind::Dialogue, trimmed));
    }
}

pub fn segment(text: &str) -> Vec<MarkupSegment> {
    let mut matches = Vec::new();
    for convention in &CONVENTIONS {
        scan(text, convention, &mut matches);
    }
    if matches.is_empty() {
        return vec![MarkupSegment::new(SegmentKind::Dialogue, text)];
    }
    // Stable: equal offsets keep scan order.
    matches.sort_by_key(|m| m.start);

    let mut segments = Vec::with_capacity(matches.len() * 2 + 1);
    let mut cursor = 0;
    for m in &matches {
        if cursor < m.start {
            push_dialogue(&mut segments, &text[cursor..m.start]);
        }
        segments.push(MarkupSegment::new(m.kind, m.inner(text)));
        // A match nested in an earlier one pulls the cursor back to its own end.
        cursor = m.end;
    }
    if cursor < text.len() {
        push_dialogue(&mut segments, &text[cursor..]);
    }

    if segments.is_empty() {
        segments.push(MarkupSegment::new(SegmentKind::Dialogue, text));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(kind: SegmentKind, content: &str) -> MarkupSegment {
        MarkupSegment::new(kind, content)
    }

    #[test]
    fn plain_text_is_one_untrimmed_dialogue() {
        assert_eq!(segment("hello world"), vec![seg(SegmentKind::Dialogue, "hello world")]);
        assert_eq!(segment("  spaced  "), vec![seg(SegmentKind::Dialogue, "  spaced  ")]);
        assert_eq!(segment(""), vec![seg(SegmentKind::Dialogue, "")]);
    }

    #[test]
    fn classifies_all_three_conventions_in_order() {
        let out = segment("*smiles* Hello [a quiet room] (I wonder...) how are you?");
        assert_eq!(
            out,
            vec![
                seg(SegmentKind::Narration, "smiles"),
                seg(SegmentKind::Dialogue, "Hello"),
                seg(SegmentKind::Background, "a quiet room"),
                seg(SegmentKind::Thought, "I wonder..."),
                seg(SegmentKind::Dialogue, "how are you?"),
            ]
        );
    }

    #[test]
    fn unterminated_markup_stays_dialogue() {
        assert_eq!(segment("*waves hi"), vec![seg(SegmentKind::Dialogue, "*waves hi")]);
        assert_eq!(segment("Look [over th"), vec![seg(SegmentKind::Dialogue, "Look [over th")]);
    }

    #[test]
    fn empty_delimiters_do_not_match() {
        assert_eq!(segment("** ok"), vec![seg(SegmentKind::Dialogue, "** ok")]);
        // The second `*` of the empty pair opens the real match.
        assert_eq!(
            segment("**bold* rest"),
            vec![
                seg(SegmentKind::Dialogue, "*"),
                seg(SegmentKind::Narration, "bold"),
                seg(SegmentKind::Dialogue, "rest"),
            ]
        );
    }

    #[test]
    fn typed_content_is_not_trimmed_and_whitespace_dialogue_is_dropped() {
        let out = segment("*  sighs  *   (hmm)");
        assert_eq!(
            out,
            vec![seg(SegmentKind::Narration, "  sighs  "), seg(SegmentKind::Thought, "hmm")]
        );
    }

    #[test]
    fn openers_of_the_same_kind_are_part_of_the_content() {
        assert_eq!(segment("[[map]"), vec![seg(SegmentKind::Background, "[map")]);
        assert_eq!(segment("((ok)"), vec![seg(SegmentKind::Thought, "(ok")]);
    }

    #[test]
    fn nested_match_moves_the_cursor_to_its_own_end() {
        // narration spans 0..11, the thought inside it spans 3..8
        let out = segment("*a (bcd) e* tail");
        assert_eq!(
            out,
            vec![
                seg(SegmentKind::Narration, "a (bcd) e"),
                seg(SegmentKind::Thought, "bcd"),
                seg(SegmentKind::Dialogue, "e* tail"),
            ]
        );
    }

    #[test]
    fn unmatched_text_keeps_surrounding_whitespace() {
        assert_eq!(segment("\n  *waves\t"), vec![seg(SegmentKind::Dialogue, "\n  *waves\t")]);
        assert_eq!(segment("  [  "), vec![seg(SegmentKind::Dialogue, "  [  ")]);
    }

    #[test]
    fn handles_multibyte_text() {
        let out = segment("*미소 짓는다* 안녕하세요! (긴장된다)");
        assert_eq!(
            out,
            vec![
                seg(SegmentKind::Narration, "미소 짓는다"),
                seg(SegmentKind::Dialogue, "안녕하세요!"),
                seg(SegmentKind::Thought, "긴장된다"),
            ]
        );
    }

    #[test]
    fn is_deterministic() {
        let text = "[rain] *looks up* (again?) Fine. *shrugs";
        assert_eq!(segment(text), segment(text));
    }

    #[test]
    fn truncated_prefixes_never_panic() {
        let full = "*웃으며* 좋아요 [교실 안] (잘 될까?) 시작하자!";
        for (i, _) in full.char_indices() {
            let _ = segment(&full[..i]);
        }
    }
}
