// tests/text_properties.rs
//
// Property-style checks for segmentation and scoring over a seeded corpus of
// generated texts.

use channel_digest::config::{ScoringConfig, SegmenterConfig, WeightPreset};
use channel_digest::digest::{LexicalScorer, RuleSegmenter, Scorer, Segmenter};
use rand::{rngs::StdRng, seq::IndexedRandom, Rng, SeedableRng};

const WORDS: &[&str] = &[
    "Нефть", "акции", "USD", "рост", "85,46", "2025", "https://t.me/x", "■", "Brent", "т.е.",
    "U.S.", "прибыль", "<b>", "</b>", "&amp;", "12", "кризис", "рубль", "Газ", "курс", "А.",
    "биржа", "1.5", "•", "",
];
const PUNCT: &[&str] = &[" ", " ", " ", ". ", "! ", "? ", ", ", "\n", "  "];

fn corpus(n: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|_| {
            let len = rng.random_range(0..80);
            let mut s = String::new();
            for _ in 0..len {
                s.push_str(WORDS.choose(&mut rng).unwrap());
                s.push_str(PUNCT.choose(&mut rng).unwrap());
            }
            s
        })
        .collect()
}

#[test]
fn sentences_respect_bounds_and_are_never_numeric() {
    for (min, max) in [(20, 500), (5, 40), (0, 1000)] {
        let seg = RuleSegmenter::new(&SegmenterConfig {
            min_chars: min,
            max_chars: max,
            ..Default::default()
        });
        for text in corpus(300) {
            for (i, s) in seg.segment(&text).iter().enumerate() {
                let n = s.text.chars().count();
                assert!(n > min && n < max, "{n} outside ({min}, {max}): {:?}", s.text);
                assert!(s.text.chars().any(char::is_alphabetic), "numeric: {:?}", s.text);
                assert!(!s.text.contains("http"), "url survived: {:?}", s.text);
                assert_eq!(s.index, i);
            }
        }
    }
}

#[test]
fn segmentation_is_deterministic() {
    let seg = RuleSegmenter::default();
    for text in corpus(50) {
        assert_eq!(seg.segment(&text), seg.segment(&text));
    }
}

#[test]
fn scores_are_deterministic_and_non_negative() {
    for preset in [WeightPreset::Compact, WeightPreset::Embedding] {
        let scorer = LexicalScorer::new(&ScoringConfig {
            preset,
            ..Default::default()
        })
        .unwrap();
        for text in corpus(300) {
            let a = scorer.breakdown(&text);
            let b = scorer.breakdown(&text);
            assert_eq!(a, b);
            assert!(a.total >= 0.0 && a.total.is_finite(), "{a:?}");
            assert!((0.0..=1.0).contains(&a.length));
        }
    }
}

#[test]
fn whitespace_variants_score_the_same() {
    let scorer = LexicalScorer::new(&ScoringConfig::default()).unwrap();
    let a = scorer.score("Акции   выросли\nна 2,5%  USD");
    let b = scorer.score("Акции выросли на 2,5% USD");
    assert_eq!(a, b);
}
