//! Post-processing: deterministic cleanup of backend translations.
//!
//! Backends occasionally return text that is correct as language but awkward
//! to set into a fixed rectangle: Windows line endings, zero-width
//! characters the base-14 fonts cannot render, or runs of spaces. These
//! rules fix that without touching the wording. A translation that is empty
//! after cleanup is treated as an empty backend result by the pipeline.
//!
//! Rules (applied in order):
//! 1. Normalise line endings (CRLF → LF)
//! 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 3. Collapse runs of horizontal whitespace to one space
//! 4. Collapse 2+ consecutive blank lines down to 1
//! 5. Trim
//!
//! [`strip_added_quotes`] is not part of this chain; only the LLM backend
//! applies it, to quotes a chat model put around its answer.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw backend translation.
pub fn clean_translation(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = collapse_horizontal_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip invisible Unicode ──────────────────────────────────────────

const INVISIBLE: [char; 6] = [
    '\u{200B}', // zero-width space
    '\u{200C}', // zero-width non-joiner
    '\u{200D}', // zero-width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // BOM
    '\u{00AD}', // soft hyphen
];

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

// ── Rule 3: Collapse horizontal whitespace ───────────────────────────────────

static RE_HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());
static RE_LINE_EDGES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^ +| +$").unwrap());

fn collapse_horizontal_whitespace(input: &str) -> String {
    let s = RE_HSPACE.replace_all(input, " ");
    RE_LINE_EDGES.replace_all(&s, "").into_owned()
}

// ── Rule 4: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Quotes added by a chat model ─────────────────────────────────────────────

const QUOTE_PAIRS: [(char, char); 4] = [('"', '"'), ('“', '”'), ('«', '»'), ('\'', '\'')];

/// The quote pair wrapping all of `s`, if any.
fn wrapping_pair(s: &str) -> Option<(char, char)> {
    let mut chars = s.chars();
    let (first, last) = (chars.next()?, chars.next_back()?);
    QUOTE_PAIRS
        .iter()
        .copied()
        .find(|&(o, c)| first == o && last == c)
}

/// Strip one pair of quotes wrapping the whole of `answer`, unless `source`
/// was itself quoted or the pair also occurs inside the answer.
pub fn strip_added_quotes(answer: &str, source: &str) -> String {
    let answer = answer.trim();
    let Some((open, close)) = wrapping_pair(answer) else {
        return answer.to_string();
    };
    if wrapping_pair(source.trim()).is_some() {
        return answer.to_string();
    }
    let inner = &answer[open.len_utf8()..answer.len() - close.len_utf8()];
    if inner.contains(open) || inner.contains(close) {
        answer.to_string()
    } else {
        inner.to_string()
    }
}
