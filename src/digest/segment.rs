// src/digest/segment.rs
//! Sentence segmentation for scraped channel posts.
//!
//! Cleanup: HTML entities/tags, URLs, decorative glyphs, whitespace runs. Splitting
//! happens after `.`, `!` or `?` followed by whitespace and an uppercase letter,
//! except after abbreviations (`A.`, `U.S.`, `т.е.`, `Mr.`). The `regex` crate has no
//! look-around, so the boundary regex only finds candidates and the neighbourhood is
//! checked in code.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::Sentence;
use crate::config::SegmenterConfig;

static RE_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)</?[a-z][^>]*>").expect("tag regex"));
static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:https?:|www\.)[^\s()\[\]<>]+").expect("url regex"));
static RE_EMPTY_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\)|\[\s*\]").expect("bracket regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static RE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("boundary regex"));

/// Splits a post into candidate sentences.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<Sentence>;
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    RE_WS.replace_all(s, " ").trim().to_string()
}

/// Regex/rule based segmenter tuned for mixed Russian/English news posts.
#[derive(Debug, Clone)]
pub struct RuleSegmenter {
    min_chars: usize,
    max_chars: usize,
    glyphs: Vec<char>,
}

impl RuleSegmenter {
    pub fn new(cfg: &SegmenterConfig) -> Self {
        Self {
            min_chars: cfg.min_chars,
            max_chars: cfg.max_chars,
            glyphs: cfg.decorative_glyphs.chars().collect(),
        }
    }

    /// Strip markup, URLs and decorative glyphs; collapse whitespace.
    pub fn clean(&self, text: &str) -> String {
        let decoded = html_escape::decode_html_entities(text);
        let out = RE_TAGS.replace_all(&decoded, " ");
        let out = RE_URL.replace_all(&out, "");
        let out = RE_EMPTY_BRACKETS.replace_all(&out, "");
        let out: String = out
            .chars()
            .map(|c| if self.glyphs.contains(&c) { ' ' } else { c })
            .collect();
        collapse_whitespace(&out)
    }

    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        let mut start = 0;
        for m in RE_BOUNDARY.find_iter(text) {
            // punctuation is ASCII, so one byte
            let punct_end = m.start() + 1;
            let next_is_upper = text[m.end()..]
                .chars()
                .next()
                .is_some_and(char::is_uppercase);
            if !next_is_upper || ends_with_abbreviation(&text[start..punct_end]) {
                continue;
            }
            pieces.push(&text[start..punct_end]);
            start = m.end();
        }
        if start < text.len() {
            pieces.push(&text[start..]);
        }
        pieces
    }

    fn accept(&self, s: &str) -> bool {
        let n = s.chars().count();
        n > self.min_chars && n < self.max_chars && s.chars().any(char::is_alphabetic)
    }
}

impl Default for RuleSegmenter {
    fn default() -> Self {
        Self::new(&SegmenterConfig::default())
    }
}

impl Segmenter for RuleSegmenter {
    fn segment(&self, text: &str) -> Vec<Sentence> {
        let cleaned = self.clean(text);
        if cleaned.is_empty() {
            return Vec::new();
        }
        self.split(&cleaned)
            .into_iter()
            .map(str::trim)
            .filter(|s| self.accept(s))
            .enumerate()
            .map(|(index, s)| Sentence {
                text: s.to_string(),
                index,
            })
            .collect()
    }
}

/// True when the piece ends in a dot that belongs to an abbreviation rather than
/// closing a sentence: initials (`A.`), dotted runs (`U.S.`, `т.е.`) and two-letter
/// titles (`Mr.`, `Ст.`).
fn ends_with_abbreviation(piece: &str) -> bool {
    let tail: Vec<char> = piece.chars().rev().take(4).collect();
    if tail.first() != Some(&'.') {
        return false;
    }
    if tail.len() == 4 && tail[1].is_alphanumeric() && tail[2] == '.' && tail[3].is_alphanumeric()
    {
        return true;
    }

    let token = piece.rsplit(char::is_whitespace).next().unwrap_or("");
    let core: Vec<char> = token
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches('.')
        .chars()
        .collect();
    match core.as_slice() {
        [c] => c.is_alphabetic(),
        [a, b] => a.is_uppercase() && b.is_lowercase(),
        _ => false,
    }
}
