// src/digest/report.rs
//! Fixed-width text report: header, one block per group, analysis footer.
//!
//! Widths are counted in `char`s. Delivery transports cap message size, so the
//! rendered text can be cut into chunks at line breaks with [`chunk_report`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::segment::collapse_whitespace;
use super::types::Group;
use crate::config::ReportConfig;

const RULE: char = '═';
const BLOCK_FILL: char = '─';
const ELLIPSIS: char = '…';

/// Rendered report text plus the moment it was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub text: String,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn chunks(&self, max_chars: usize) -> Vec<String> {
        chunk_report(&self.text, max_chars)
    }
}

#[derive(Debug, Clone)]
pub struct ReportFormatter {
    cfg: ReportConfig,
}

impl ReportFormatter {
    pub fn new(cfg: &ReportConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn render(&self, groups: &[Group], analysis: Option<&str>) -> Report {
        Report {
            text: self.render_text(groups, analysis),
            generated_at: Utc::now(),
        }
    }

    /// Empty `groups` renders the no-data block in place of both the group blocks and
    /// the analysis section; `analysis` is ignored in that case.
    pub fn render_text(&self, groups: &[Group], analysis: Option<&str>) -> String {
        let width = self.cfg.line_width;
        let labels = &self.cfg.labels;
        let rule = RULE.to_string().repeat(width);

        let mut out = vec![
            rule.clone(),
            center(&labels.title, width, ' '),
            rule.clone(),
            String::new(),
        ];

        let non_empty: Vec<&Group> = groups.iter().filter(|g| !g.is_empty()).collect();
        if non_empty.is_empty() {
            out.push(rule.clone());
            out.push(center(&labels.no_data, width, ' '));
        } else {
            for group in non_empty {
                out.push(center(
                    &format!("▌ {} {} ▌", labels.block, group.index),
                    width,
                    BLOCK_FILL,
                ));
                for item in &group.items {
                    out.extend(self.item_lines(&item.summary));
                }
                out.push(String::new());
            }
            out.push(rule.clone());
            out.push(labels.conclusions.clone());
            match analysis.map(str::trim).filter(|a| !a.is_empty()) {
                Some(text) => out.push(text.to_string()),
                None => out.push(labels.analysis_unavailable.clone()),
            }
        }

        out.push(String::new());
        out.push(center(&labels.footer, width, ' '));
        out.push(rule);
        out.join("\n")
    }

    fn item_lines(&self, summary: &str) -> Vec<String> {
        let clean = truncate_at_word(&collapse_whitespace(summary), self.cfg.item_char_cap);
        let bullet = format!("{} {}", self.cfg.labels.bullet, clean);
        wrap(&bullet, self.cfg.wrap_width, "  ", "    ")
    }
}

/// Pad `text` on both sides with `fill` up to `width` chars (extra fill goes right).
/// Text wider than `width` is returned unchanged.
pub fn center(text: &str, width: usize, fill: char) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let pad = width - len;
    let left = pad / 2;
    let mut out = String::with_capacity(text.len() + pad * fill.len_utf8());
    out.extend(std::iter::repeat(fill).take(left));
    out.push_str(text);
    out.extend(std::iter::repeat(fill).take(pad - left));
    out
}

/// Cut to at most `cap` chars. A cut inside a word backs off to the previous word
/// boundary; the result then ends in `…`.
pub fn truncate_at_word(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_string();
    }
    let keep = cap.saturating_sub(1);
    let cut = byte_offset(text, keep);
    let head = &text[..cut];
    let mid_word = !head.ends_with(char::is_whitespace)
        && !text[cut..].starts_with(char::is_whitespace);
    let head = match head.rfind(char::is_whitespace) {
        Some(pos) if mid_word => &head[..pos],
        _ => head,
    };
    let mut out = head.trim_end().to_string();
    out.push(ELLIPSIS);
    out
}

/// Greedy word wrap. Words are only broken when a single word is wider than a line.
pub fn wrap(text: &str, width: usize, initial_indent: &str, subsequent_indent: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = initial_indent.to_string();
    let mut line_len = initial_indent.chars().count();
    let mut has_word = false;

    for word in text.split_whitespace() {
        let mut rest = word;
        while !rest.is_empty() {
            let rest_len = rest.chars().count();
            let sep = usize::from(has_word);
            if line_len + sep + rest_len <= width {
                if has_word {
                    line.push(' ');
                }
                line.push_str(rest);
                line_len += sep + rest_len;
                has_word = true;
                break;
            }
            if !has_word {
                // word longer than a whole line
                let room = width.saturating_sub(line_len).max(1);
                let split = byte_offset(rest, room);
                line.push_str(&rest[..split]);
                rest = &rest[split..];
            }
            lines.push(std::mem::replace(&mut line, subsequent_indent.to_string()));
            line_len = subsequent_indent.chars().count();
            has_word = false;
        }
    }
    if has_word {
        lines.push(line);
    }
    lines
}

/// Split `text` into chunks of at most `max_chars` chars at line breaks.
///
/// Joining the chunks with `\n` gives back the original text, except when a single
/// line is longer than `max_chars`: such a line is cut at char boundaries.
pub fn chunk_report(text: &str, max_chars: usize) -> Vec<String> {
    let max = max_chars.max(1);
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Option<(String, usize)> = None;

    for line in text.split('\n') {
        let len = line.chars().count();
        if len > max {
            if let Some((chunk, _)) = current.take() {
                chunks.push(chunk);
            }
            let mut rest = line;
            while !rest.is_empty() {
                let cut = byte_offset(rest, max);
                chunks.push(rest[..cut].to_string());
                rest = &rest[cut..];
            }
            continue;
        }
        current = match current.take() {
            Some((mut chunk, used)) if used + 1 + len <= max => {
                chunk.push('\n');
                chunk.push_str(line);
                Some((chunk, used + 1 + len))
            }
            Some((chunk, _)) => {
                chunks.push(chunk);
                Some((line.to_string(), len))
            }
            None => Some((line.to_string(), len)),
        };
    }
    if let Some((chunk, _)) = current {
        chunks.push(chunk);
    }
    chunks
}

/// Byte offset of the `n`-th char (or the end of the string).
fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::types::ProcessedItem;

    fn group(index: usize, summaries: &[&str]) -> Group {
        Group {
            index,
            items: summaries
                .iter()
                .enumerate()
                .map(|(i, s)| ProcessedItem {
                    source_index: i,
                    summary: s.to_string(),
                    embedding: vec![],
                    score: 1.0,
                })
                .collect(),
        }
    }

    fn formatter() -> ReportFormatter {
        ReportFormatter::new(&ReportConfig::default())
    }

    #[test]
    fn centers_with_extra_padding_on_the_right() {
        assert_eq!(center("ab", 5, '-'), "-ab--");
        assert_eq!(center("abc", 3, '-'), "abc");
        assert_eq!(center("▌ Блок 1 ▌", 14, '─'), "──▌ Блок 1 ▌──");
    }

    #[test]
    fn truncation_backs_off_to_word_boundary() {
        assert_eq!(truncate_at_word("short", 10), "short");
        assert_eq!(truncate_at_word("alpha beta gamma", 9), "alpha…");
        // cut lands on a space: keep the whole first word
        assert_eq!(truncate_at_word("alpha beta gamma", 7), "alpha…");
        assert_eq!(truncate_at_word("абвгдежзик", 5), "абвг…");
    }

    #[test]
    fn wrap_respects_width_and_indents() {
        let text = "→ one two three four five six seven eight nine ten";
        let lines = wrap(text, 20, "  ", "    ");
        assert!(lines.iter().all(|l| l.chars().count() <= 20), "{lines:?}");
        assert!(lines[0].starts_with("  → one"));
        assert!(lines[1..].iter().all(|l| l.starts_with("    ")));
        let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split_whitespace()).collect();
        assert_eq!(rejoined.join(" "), text);
    }

    #[test]
    fn wrap_hard_breaks_only_overlong_words() {
        let lines = wrap("aaaaaaaaaaaaaaaaaaaaaaaaa b", 12, "  ", "    ");
        assert_eq!(lines, vec!["  aaaaaaaaaa", "    aaaaaaaa", "    aaaaaaa", "    b"]);
    }

    #[test]
    fn renders_blocks_and_analysis() {
        let groups = vec![group(1, &["Нефть подорожала на 2,5%."]), group(2, &["Рубль укрепился."])];
        let text = formatter().render_text(&groups, Some("1. Факт один."));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "═".repeat(60));
        assert_eq!(lines[1].trim(), "ФИНАНСОВЫЙ БЮЛЛЕТЕНЬ");
        assert_eq!(lines[1].chars().count(), 60);
        assert!(lines[4].contains("▌ Блок 1 ▌"));
        assert!(lines[4].starts_with('─') && lines[4].ends_with('─'));
        assert_eq!(lines[5], "  → Нефть подорожала на 2,5%.");
        assert!(text.contains("▌ Блок 2 ▌"));
        assert!(text.contains("КЛЮЧЕВЫЕ ВЫВОДЫ:\n1. Факт один.\n"));
        assert_eq!(lines[lines.len() - 2].trim(), "Отчет сгенерирован автоматически");
        assert!(lines.iter().all(|l| l.chars().count() <= 60));
    }

    #[test]
    fn missing_analysis_prints_notice() {
        let groups = vec![group(1, &["Индекс вырос."])];
        for analysis in [None, Some("   ")] {
            let text = formatter().render_text(&groups, analysis);
            assert!(text.contains("Анализ недоступен"), "{text}");
        }
    }

    #[test]
    fn no_groups_renders_no_data_block() {
        let text = formatter().render_text(&[], Some("ignored"));
        assert!(text.contains("⚠ Нет данных для анализа"));
        assert!(!text.contains("КЛЮЧЕВЫЕ ВЫВОДЫ"));
        assert!(!text.contains("ignored"));
        assert!(!text.contains("Блок"));
    }

    #[test]
    fn long_items_are_capped_before_wrapping() {
        let long = "слово ".repeat(100);
        let groups = vec![group(1, &[long.as_str()])];
        let text = formatter().render_text(&groups, None);
        let body: Vec<&str> = text
            .lines()
            .filter(|l| l.contains("слово"))
            .flat_map(|l| l.split_whitespace())
            .collect();
        let joined = body.join(" ");
        assert!(joined.ends_with('…'));
        // bullet + space + capped text
        assert!(joined.chars().count() <= 2 + 300);
    }

    #[test]
    fn chunks_split_at_line_breaks() {
        let text = "aaaa\nbbbb\ncccc\ndd";
        let chunks = chunk_report(text, 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc\ndd"]);
        assert_eq!(chunks.join("\n"), text);
        assert!(chunk_report("", 10).is_empty());
    }

    #[test]
    fn overlong_line_is_the_only_mid_line_split() {
        let chunks = chunk_report("ab\nабвгдеж\ncd", 3);
        assert_eq!(chunks, vec!["ab", "абв", "где", "ж", "cd"]);
    }

    #[test]
    fn report_chunks_match_free_function() {
        let report = formatter().render(&[group(1, &["Индекс вырос."])], None);
        assert_eq!(report.chunks(4096), vec![report.text.clone()]);
        assert!(report.chunks(100).iter().all(|c| c.chars().count() <= 100));
    }
}
