//! Evidence selection: which window words are allowed to score.
//!
//! Primary path is head filtering: keep window words that overlap the
//! target's head tokens textually, canonically or phonetically. When that
//! produces nothing usable, anchor rescue scans the window's n-grams against
//! the whole line: a performer who swallowed the opening words but is audibly
//! mid-line is still on the right line, and that evidence must not be lost.
//!
//! A frame with no evidence from either path is skipped outright; the caller
//! mutates no decision state for it.

use crate::config::AlignConfig;
use crate::events::MatchStrategy;
use crate::normalize::canonical;
use crate::target::{ngram_key, TargetEntry};

/// Evidence selected from one ASR window.
#[derive(Debug, Clone)]
pub struct Evidence {
    /// Window words admitted as evidence, in window order.
    pub words: Vec<String>,
    /// Phoneme strings aligned with `words` (empty string = none).
    pub phonemes: Vec<String>,
    /// Which selection path produced this evidence.
    pub strategy: MatchStrategy,
    /// Position bias of the matched anchor, in [0.5, 1.0]; rescue only.
    pub anchor_bias: Option<f64>,
}

/// Normalized edit-distance similarity between two phoneme strings.
///
/// Empty strings never match anything; "no phoneme" must not equal
/// "no phoneme".
pub fn phonetic_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Does a window word count as a match for one head token?
pub(crate) fn word_matches(
    word: &str,
    word_phoneme: &str,
    head_token: &str,
    head_phoneme: &str,
    threshold: f64,
) -> bool {
    word == head_token
        || canonical(word) == canonical(head_token)
        || phonetic_similarity(word_phoneme, head_phoneme) >= threshold
}

/// Select evidence from a normalized window against the live target.
///
/// Returns `None` when the frame must be skipped (no head overlap and no
/// anchor hit).
pub fn select_evidence(
    window: &[String],
    window_phonemes: &[String],
    target: &TargetEntry,
    config: &AlignConfig,
) -> Option<Evidence> {
    let kept = head_filter(window, window_phonemes, target, config);

    let needs_rescue = kept.is_empty()
        || (kept.len() == 1 && !matches_first_head(&kept[0], target, config));

    if !needs_rescue {
        let (words, phonemes) = kept.into_iter().unzip();
        return Some(Evidence {
            words,
            phonemes,
            strategy: MatchStrategy::HeadEvidence,
            anchor_bias: None,
        });
    }

    // A lone window word that is not the line's opening is not usable head
    // evidence; without an anchor hit the whole frame is skipped.
    anchor_rescue(window, window_phonemes, target, config)
}

fn head_filter(
    window: &[String],
    window_phonemes: &[String],
    target: &TargetEntry,
    config: &AlignConfig,
) -> Vec<(String, String)> {
    window
        .iter()
        .enumerate()
        .filter(|(i, word)| {
            let word_phoneme = window_phonemes.get(*i).map(String::as_str).unwrap_or("");
            target.head_tokens.iter().enumerate().any(|(j, head)| {
                let head_phoneme = target.head_phonemes.get(j).map(String::as_str).unwrap_or("");
                word_matches(word, word_phoneme, head, head_phoneme, config.phonetic_threshold)
            })
        })
        .map(|(i, word)| {
            (
                word.clone(),
                window_phonemes.get(i).cloned().unwrap_or_default(),
            )
        })
        .collect()
}

fn matches_first_head(kept: &(String, String), target: &TargetEntry, config: &AlignConfig) -> bool {
    let Some(first) = target.head_tokens.first() else {
        return false;
    };
    let first_phoneme = target.head_phonemes.first().map(String::as_str).unwrap_or("");
    word_matches(
        &kept.0,
        &kept.1,
        first,
        first_phoneme,
        config.phonetic_threshold,
    )
}

/// Credit multiplier for an anchor found at `ordinal` of `total` n-grams.
///
/// Earlier occurrences count for more, but any hit keeps at least half
/// credit: recognizing mid-line content despite a missed opening is still
/// strong evidence of the correct line.
pub fn anchor_bias(ordinal: usize, total: usize, head_bias_factor: f64) -> f64 {
    let span = total.saturating_sub(1).max(1) as f64;
    (1.0 - (ordinal as f64 / span) * head_bias_factor).max(0.5)
}

fn anchor_rescue(
    window: &[String],
    window_phonemes: &[String],
    target: &TargetEntry,
    config: &AlignConfig,
) -> Option<Evidence> {
    let n = config.ngram_size;
    if n == 0 || window.len() < n {
        return None;
    }

    // Textual pass: canonical n-gram lookup in the line's position index.
    // Left-to-right, first hit wins.
    for (start, gram) in window.windows(n).enumerate() {
        if let Some(&ordinal) = target.ngram_index.get(&ngram_key(gram)) {
            let bias = anchor_bias(ordinal, target.line_ngrams.len(), config.head_bias_factor);
            return Some(Evidence {
                words: gram.to_vec(),
                phonemes: aligned_slice(window_phonemes, start, n),
                strategy: MatchStrategy::AnchorRescue,
                anchor_bias: Some(bias),
            });
        }
    }

    // Phonetic pass: every aligned phoneme pair must clear the threshold
    // against some whole-line phoneme n-gram.
    if target.phoneme_ngrams.is_empty() || window_phonemes.len() < n {
        return None;
    }
    for (start, gram) in window_phonemes.windows(n).enumerate() {
        if gram.iter().any(|p| p.is_empty()) {
            continue;
        }
        for (ordinal, line_gram) in target.phoneme_ngrams.iter().enumerate() {
            if line_gram.len() == n
                && gram
                    .iter()
                    .zip(line_gram)
                    .all(|(a, b)| phonetic_similarity(a, b) >= config.phonetic_threshold)
            {
                let bias =
                    anchor_bias(ordinal, target.phoneme_ngrams.len(), config.head_bias_factor);
                return Some(Evidence {
                    words: window[start..start + n].to_vec(),
                    phonemes: gram.to_vec(),
                    strategy: MatchStrategy::AnchorRescue,
                    anchor_bias: Some(bias),
                });
            }
        }
    }

    None
}

fn aligned_slice(phonemes: &[String], start: usize, len: usize) -> Vec<String> {
    (start..start + len)
        .map(|i| phonemes.get(i).cloned().unwrap_or_default())
        .collect()
}
