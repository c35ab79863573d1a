//! Target entry builder.
//!
//! Derives the full matching feature bundle for "the next expected line":
//! head tokens and phonemes, head bigrams, whole-line n-grams (token and
//! phoneme form) and the n-gram position index used by anchor rescue.
//! Precomputed script fields are preferred; everything can be derived from
//! raw text when they are absent.
//!
//! Exactly one entry is live at a time and it always describes
//! `committed position + 1`; the engine rebuilds it on every advance.

use std::collections::HashMap;

use crate::config::AlignConfig;
use crate::normalize::{canonical, Normalizer};
use crate::phoneme::{phonemes_or_empty, PhonemeConverter};
use crate::script::{LineNgramSource, Script, ScriptLine};

/// Matching feature bundle for the next expected script line.
#[derive(Debug, Clone)]
pub struct TargetEntry {
    /// Position of the line this entry describes.
    pub position: usize,
    /// First `head_len` normalized tokens of the line.
    pub head_tokens: Vec<String>,
    /// Phoneme strings aligned 1:1 with `head_tokens`; empty string = none.
    pub head_phonemes: Vec<String>,
    /// Adjacent head-token pairs. Always derived from `head_tokens`, never
    /// read from precomputed data.
    pub head_bigrams: Vec<(String, String)>,
    /// Whole-line n-grams, token form.
    pub line_ngrams: Vec<Vec<String>>,
    /// Whole-line n-grams, phoneme form (same ordinals as `line_ngrams` when
    /// derived here; upstream ordering when precomputed).
    pub phoneme_ngrams: Vec<Vec<String>>,
    /// Canonicalized n-gram → ordinal of its first occurrence in the line.
    pub ngram_index: HashMap<String, usize>,
    /// True when an upcoming line shares this line's canonical opening, so
    /// head-prefix evidence alone is ambiguous.
    pub repeat_cluster: bool,
}

impl TargetEntry {
    /// Build the entry for the line at `position`, or `None` when the script
    /// is exhausted.
    pub fn build(
        script: &Script,
        position: usize,
        normalizer: &Normalizer,
        converter: &dyn PhonemeConverter,
        config: &AlignConfig,
    ) -> Option<Self> {
        let line = script.get(position)?;

        let head_tokens = head_tokens(line, normalizer, config.head_len);
        let head_phonemes = match &line.head_phonemes {
            Some(ph) if ph.len() >= head_tokens.len() => ph[..head_tokens.len()].to_vec(),
            _ => phonemes_or_empty(converter, &head_tokens),
        };

        let head_bigrams = head_tokens
            .windows(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        let (line_ngrams, line_tokens) = line_ngrams(line, normalizer, config.ngram_size);

        let phoneme_ngrams = match &line.phoneme_ngrams {
            Some(pre) => pre.clone(),
            None => line_tokens
                .map(|tokens| phoneme_windows(converter, &tokens, config.ngram_size))
                .unwrap_or_default(),
        };

        let mut ngram_index = HashMap::new();
        for (ordinal, gram) in line_ngrams.iter().enumerate() {
            ngram_index.entry(ngram_key(gram)).or_insert(ordinal);
        }

        let repeat_cluster = in_repeat_cluster(script, position, normalizer, config);

        Some(Self {
            position,
            head_tokens,
            head_phonemes,
            head_bigrams,
            line_ngrams,
            phoneme_ngrams,
            ngram_index,
            repeat_cluster,
        })
    }

    /// True if any phoneme is actually available for the head.
    pub fn has_head_phonemes(&self) -> bool {
        self.head_phonemes.iter().any(|p| !p.is_empty())
    }
}

/// Canonical lookup key for an n-gram.
pub fn ngram_key(gram: &[String]) -> String {
    gram.iter()
        .map(|t| canonical(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn head_tokens(line: &ScriptLine, normalizer: &Normalizer, head_len: usize) -> Vec<String> {
    match &line.head_tokens {
        Some(pre) => pre.iter().take(head_len).cloned().collect(),
        None => {
            let mut tokens = normalizer.tokenize(&line.text);
            tokens.truncate(head_len);
            tokens
        }
    }
}

/// Whole-line n-grams plus, when known, the flat token list they came from
/// (needed for phoneme conversion; precomputed n-grams carry no flat list).
fn line_ngrams(
    line: &ScriptLine,
    normalizer: &Normalizer,
    n: usize,
) -> (Vec<Vec<String>>, Option<Vec<String>>) {
    match &line.ngrams {
        Some(LineNgramSource::Precomputed(grams)) => (grams.clone(), None),
        Some(LineNgramSource::Raw(tokens)) => (token_windows(tokens, n), Some(tokens.clone())),
        None => {
            let tokens = normalizer.tokenize(&line.text);
            (token_windows(&tokens, n), Some(tokens))
        }
    }
}

fn token_windows(tokens: &[String], n: usize) -> Vec<Vec<String>> {
    if n == 0 || tokens.len() < n {
        return Vec::new();
    }
    tokens.windows(n).map(|w| w.to_vec()).collect()
}

fn phoneme_windows(
    converter: &dyn PhonemeConverter,
    tokens: &[String],
    n: usize,
) -> Vec<Vec<String>> {
    let phonemes = phonemes_or_empty(converter, tokens);
    if phonemes.iter().all(|p| p.is_empty()) {
        return Vec::new();
    }
    if n == 0 || phonemes.len() < n {
        return Vec::new();
    }
    phonemes.windows(n).map(|w| w.to_vec()).collect()
}

/// Canonical opening signature used for repeat-cluster detection.
fn head_signature(line: &ScriptLine, normalizer: &Normalizer, prefix_len: usize) -> String {
    let tokens = head_tokens(line, normalizer, prefix_len);
    ngram_key(&tokens)
}

fn in_repeat_cluster(
    script: &Script,
    position: usize,
    normalizer: &Normalizer,
    config: &AlignConfig,
) -> bool {
    let target = match script.get(position) {
        Some(line) => line,
        None => return false,
    };
    let signature = head_signature(target, normalizer, config.repeat_prefix_len);
    if signature.is_empty() {
        return false;
    }

    (1..=config.repeat_lookahead)
        .filter_map(|offset| script.get(position + offset))
        .any(|line| head_signature(line, normalizer, config.repeat_prefix_len) == signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phoneme::NullConverter;

    fn build(script: &Script, position: usize) -> Option<TargetEntry> {
        TargetEntry::build(
            script,
            position,
            &Normalizer::default(),
            &NullConverter,
            &AlignConfig::default(),
        )
    }

    fn script(texts: &[&str]) -> Script {
        Script::from_lines(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| ScriptLine::new(i, "A", *t))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn head_derived_from_raw_text() {
        let s = script(&["Bonjour, mon ami ! Comment allez-vous ce soir ?"]);
        let entry = build(&s, 0).unwrap();
        assert_eq!(entry.head_tokens, vec!["bonjour", "mon", "ami", "comment"]);
        assert_eq!(
            entry.head_bigrams,
            vec![
                ("bonjour".to_string(), "mon".to_string()),
                ("mon".to_string(), "ami".to_string()),
                ("ami".to_string(), "comment".to_string()),
            ]
        );
    }

    #[test]
    fn precomputed_head_is_preferred_over_raw_text() {
        let mut line = ScriptLine::new(0, "A", "totally different words here");
        line.head_tokens = Some(vec!["bonjour".into(), "mon".into()]);
        let s = Script::from_lines(vec![line]).unwrap();
        let entry = build(&s, 0).unwrap();
        assert_eq!(entry.head_tokens, vec!["bonjour", "mon"]);
    }

    #[test]
    fn ngrams_recomputed_from_raw_text_when_absent() {
        let s = script(&["au revoir alors mon ami"]);
        let entry = build(&s, 0).unwrap();
        assert_eq!(entry.line_ngrams.len(), 3);
        assert_eq!(
            entry.line_ngrams[0],
            vec!["au".to_string(), "revoir".to_string(), "alors".to_string()]
        );
        assert_eq!(entry.ngram_index.get("au revoir alors"), Some(&0));
        assert_eq!(entry.ngram_index.get("alors mon ami"), Some(&2));
    }

    #[test]
    fn precomputed_ngrams_are_used_verbatim() {
        let mut line = ScriptLine::new(0, "A", "ignored text");
        line.ngrams = Some(LineNgramSource::Precomputed(vec![
            vec!["au".into(), "revoir".into(), "alors".into()],
        ]));
        let s = Script::from_lines(vec![line]).unwrap();
        let entry = build(&s, 0).unwrap();
        assert_eq!(entry.line_ngrams.len(), 1);
        assert_eq!(entry.ngram_index.get("au revoir alors"), Some(&0));
        // No flat token list available, so no phoneme n-grams either.
        assert!(entry.phoneme_ngrams.is_empty());
    }

    #[test]
    fn ngram_index_keeps_first_occurrence_on_ties() {
        let s = script(&["encore une fois et encore une fois"]);
        let entry = build(&s, 0).unwrap();
        assert_eq!(entry.ngram_index.get("encore une fois"), Some(&0));
    }

    #[test]
    fn short_lines_have_no_ngrams() {
        let s = script(&["oui madame"]);
        let entry = build(&s, 0).unwrap();
        assert!(entry.line_ngrams.is_empty());
        assert!(entry.ngram_index.is_empty());
    }

    #[test]
    fn repeat_cluster_detected_within_lookahead() {
        let s = script(&[
            "encore une fois mes amis",
            "encore une danse pour vous",
            "tout autre chose ici",
        ]);
        assert!(build(&s, 0).unwrap().repeat_cluster);
        assert!(!build(&s, 1).unwrap().repeat_cluster);
    }

    #[test]
    fn repeat_cluster_respects_lookahead_bound() {
        let mut cfg = AlignConfig::default();
        cfg.repeat_lookahead = 1;
        let s = script(&[
            "encore une fois",
            "tout autre chose",
            "encore une danse",
        ]);
        let entry = TargetEntry::build(
            &s,
            0,
            &Normalizer::default(),
            &NullConverter,
            &cfg,
        )
        .unwrap();
        assert!(!entry.repeat_cluster);
    }

    #[test]
    fn repeat_cluster_false_for_empty_lookahead() {
        let s = script(&["encore une fois", "encore une danse"]);
        assert!(!build(&s, 1).unwrap().repeat_cluster);
    }

    #[test]
    fn repeat_cluster_signature_is_accent_insensitive() {
        let s = script(&["hélas pour moi", "helas pour eux"]);
        assert!(build(&s, 0).unwrap().repeat_cluster);
    }

    #[test]
    fn out_of_range_position_yields_none() {
        let s = script(&["seule ligne"]);
        assert!(build(&s, 1).is_none());
    }
}
