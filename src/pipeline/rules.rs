//! Rule-based correction: deterministic cleanup of extracted or OCR'd text.
//!
//! ## Why a rule stage before any AI?
//!
//! Both extraction paths leave mechanical damage that needs no semantics to
//! repair:
//!
//! - `pdftotext` emits form feeds between pages and Windows `\r\n` endings
//! - OCR engines split words at line-wrap hyphens (`exam-` / `ple`)
//! - scanners inject `Page 3 of 12` furniture into every page
//! - text layers carry invisible Unicode (zero-width spaces, BOM, soft hyphens)
//!
//! This module applies 8 cheap regex/string rules that fix those artifacts
//! without touching content. Running them unconditionally, before any AI
//! stage, means the expensive model never spends tokens on damage a regex can
//! undo, and a RulesOnly deployment still gets clean text. Each rule is
//! independently testable.
//!
//! ## Rule order and idempotence
//!
//! Rules must run in this order: line endings and form feeds first so later
//! line-based rules see `\n`-separated input, de-hyphenation before trailing
//! trim so the continuation line is still adjacent, blank-line collapse after
//! page-marker removal so the holes it leaves are closed. The composite is
//! idempotent: `apply_rules(apply_rules(t)) == apply_rules(t)`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all correction rules to raw extracted or recognized text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Convert form feeds (pdftotext page breaks) to blank lines
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 4. Rejoin words split by line-wrap hyphenation
/// 5. Remove standalone page-marker lines (`Page 3`, `3 of 12`, `3/12`)
/// 6. Trim trailing whitespace per line
/// 7. Collapse interior space runs (keeps leading indentation)
/// 8. Collapse 3+ consecutive newlines to 2 and end with exactly one newline
pub fn apply_rules(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = form_feeds_to_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    let s = rejoin_hyphenated_words(&s);
    let s = remove_page_markers(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_interior_spaces(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Form feeds to blank lines ────────────────────────────────────────

fn form_feeds_to_blank_lines(input: &str) -> String {
    input.replace('\u{0C}', "\n\n")
}

// ── Rule 3: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Rejoin hyphenated line breaks ────────────────────────────────────
//
// A lowercase letter, a hyphen, a newline, then a lowercase letter is almost
// always a typesetting wrap ("exam-\nple"). Uppercase continuations are left
// alone: those are usually real compounds broken across lines ("UTF-\n8",
// "Jean-\nPaul").

static RE_WRAP_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})-\n(\p{Ll})").unwrap());

fn rejoin_hyphenated_words(input: &str) -> String {
    // A word wrapped twice ("a-\nb-\nc") leaves a fresh match behind each
    // pass, so iterate to the fixpoint rather than replacing once.
    let mut s = input.to_string();
    loop {
        let next = RE_WRAP_HYPHEN.replace_all(&s, "$1$2").to_string();
        if next == s {
            return s;
        }
        s = next;
    }
}

// ── Rule 5: Remove standalone page-marker lines ──────────────────────────────
//
// Only unambiguous page furniture is removed: `Page 3`, `Page 3 of 12`,
// `3 of 12`, `3 / 12`, optionally wrapped in dashes. A bare number line is
// kept; it is too likely to be data.

static RE_PAGE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*-?[ \t]*(?:page[ \t]+\d+(?:[ \t]+of[ \t]+\d+)?|\d+[ \t]*(?:of|/)[ \t]*\d+)[ \t]*-?[ \t]*$")
        .unwrap()
});

fn remove_page_markers(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in input.lines() {
        if RE_PAGE_MARKER.is_match(line) {
            continue;
        }
        out.push(line);
    }
    out.join("\n")
}

// ── Rule 6: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 7: Collapse interior space runs ─────────────────────────────────────
//
// OCR engines pad columns and word gaps with arbitrary space runs. Leading
// indentation is preserved so list structure survives.

static RE_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S)[ \t]{2,}").unwrap());

fn collapse_interior_spaces(input: &str) -> String {
    RE_SPACE_RUN.replace_all(input, "$1 ").to_string()
}

// ── Rule 8: Collapse blank lines, single final newline ───────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
