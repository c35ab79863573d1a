//! Feature scoring: evidence words → one bounded frame probability.
//!
//! Four features, each in [0, 1], combined as a weighted sum plus an anchor
//! term when rescue produced the evidence. The resulting probability is
//! clipped away from both certainties: one recognition frame must never be
//! allowed to decide a transition on its own.

use crate::config::AlignConfig;
use crate::evidence::{phonetic_similarity, word_matches, Evidence};
use crate::normalize::canonical;
use crate::rarity::RarityTable;
use crate::target::TargetEntry;

/// Probability floor/ceiling applied to the composite score.
pub const PROBABILITY_CLIP: (f64, f64) = (0.05, 0.95);

/// How many of the head's rarest tokens the rarity feature looks for.
const RARITY_TOKENS: usize = 2;

/// Per-frame feature breakdown, kept for logging and tests.
#[derive(Debug, Clone, Copy)]
pub struct FeatureScores {
    /// Position-wise head prefix agreement in [0, 1].
    pub prefix_match: f64,
    /// 1.0 when any adjacent evidence pair hits a head bigram.
    pub bigram_hit: f64,
    /// Fraction of the head's rarest tokens present in the evidence.
    pub rarity: f64,
    /// Similarity of the concatenated leading phoneme prefixes; 0.5 when
    /// phonemes are unavailable.
    pub phonetic_prefix: f64,
    /// Weighted sum of the four features plus any anchor term, unclipped.
    pub composite: f64,
    /// `composite` clipped to [0.05, 0.95]; the value the accumulator sees.
    pub probability: f64,
}

/// Score selected evidence against the live target.
pub fn score_evidence(
    evidence: &Evidence,
    target: &TargetEntry,
    rarity_table: &RarityTable,
    config: &AlignConfig,
) -> FeatureScores {
    let prefix_match = prefix_match(evidence, target, config);
    let bigram_hit = bigram_hit(evidence, target, config);
    let rarity = rarity_coverage(evidence, target, rarity_table);
    let phonetic_prefix = phonetic_prefix(evidence, target);

    let mut composite = config.weight_prefix * prefix_match
        + config.weight_bigram * bigram_hit
        + config.weight_rarity * rarity
        + config.weight_phonetic * phonetic_prefix;

    if let Some(bias) = evidence.anchor_bias {
        composite += config.anchor_weight * bias;
    }

    FeatureScores {
        prefix_match,
        bigram_hit,
        rarity,
        phonetic_prefix,
        composite,
        probability: composite.clamp(PROBABILITY_CLIP.0, PROBABILITY_CLIP.1),
    }
}

fn prefix_match(evidence: &Evidence, target: &TargetEntry, config: &AlignConfig) -> f64 {
    let compared = evidence.words.len().min(target.head_tokens.len());
    if compared == 0 {
        return 0.0;
    }

    let matches = (0..compared)
        .filter(|&i| {
            word_matches(
                &evidence.words[i],
                evidence.phonemes.get(i).map(String::as_str).unwrap_or(""),
                &target.head_tokens[i],
                target.head_phonemes.get(i).map(String::as_str).unwrap_or(""),
                config.phonetic_threshold,
            )
        })
        .count();

    matches as f64 / compared as f64
}

fn bigram_hit(evidence: &Evidence, target: &TargetEntry, config: &AlignConfig) -> f64 {
    if target.head_bigrams.is_empty() || evidence.words.len() < 2 {
        return 0.0;
    }

    let textual = evidence.words.windows(2).any(|pair| {
        target.head_bigrams.iter().any(|(a, b)| {
            (pair[0] == *a && pair[1] == *b)
                || (canonical(&pair[0]) == canonical(a) && canonical(&pair[1]) == canonical(b))
        })
    });
    if textual {
        return 1.0;
    }

    let phonetic = evidence.phonemes.windows(2).any(|pair| {
        if pair[0].is_empty() || pair[1].is_empty() {
            return false;
        }
        target.head_phonemes.windows(2).any(|head_pair| {
            phonetic_similarity(&pair[0], &head_pair[0]) >= config.phonetic_threshold
                && phonetic_similarity(&pair[1], &head_pair[1]) >= config.phonetic_threshold
        })
    });

    if phonetic {
        1.0
    } else {
        0.0
    }
}

fn rarity_coverage(evidence: &Evidence, target: &TargetEntry, table: &RarityTable) -> f64 {
    let rare = table.rarest(&target.head_tokens, RARITY_TOKENS);
    if rare.is_empty() {
        return 0.0;
    }

    let evidence_canon: Vec<String> = evidence.words.iter().map(|w| canonical(w)).collect();
    let found = rare
        .iter()
        .filter(|&&idx| evidence_canon.contains(&canonical(&target.head_tokens[idx])))
        .count();

    found as f64 / rare.len() as f64
}

fn phonetic_prefix(evidence: &Evidence, target: &TargetEntry) -> f64 {
    let len = evidence.words.len().min(target.head_tokens.len());
    let evidence_concat: String = evidence.phonemes.iter().take(len).map(String::as_str).collect();
    let head_concat: String = target
        .head_phonemes
        .iter()
        .take(len)
        .map(String::as_str)
        .collect();

    if evidence_concat.is_empty() || head_concat.is_empty() {
        // Neutral: missing phonetic data must not punish the frame.
        return 0.5;
    }
    phonetic_similarity(&evidence_concat, &head_concat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MatchStrategy;
    use crate::normalize::Normalizer;
    use crate::phoneme::NullConverter;
    use crate::script::{Script, ScriptLine};
    use approx::assert_relative_eq;

    fn fixtures(texts: &[&str]) -> (Script, RarityTable) {
        let script = Script::from_lines(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| ScriptLine::new(i, "A", *t))
                .collect(),
        )
        .unwrap();
        let rarity = RarityTable::build(&script, &Normalizer::default());
        (script, rarity)
    }

    fn target(script: &Script, position: usize) -> crate::target::TargetEntry {
        crate::target::TargetEntry::build(
            script,
            position,
            &Normalizer::default(),
            &NullConverter,
            &AlignConfig::default(),
        )
        .unwrap()
    }

    fn head_evidence(words: &[&str]) -> Evidence {
        Evidence {
            words: words.iter().map(|w| w.to_string()).collect(),
            phonemes: vec![String::new(); words.len()],
            strategy: MatchStrategy::HeadEvidence,
            anchor_bias: None,
        }
    }

    #[test]
    fn exact_head_match_scores_all_textual_features_full() {
        let (script, rarity) = fixtures(&["bonjour mon ami", "toute autre chose"]);
        let t = target(&script, 0);
        let ev = head_evidence(&["bonjour", "mon", "ami"]);
        let scores = score_evidence(&ev, &t, &rarity, &AlignConfig::default());

        assert_relative_eq!(scores.prefix_match, 1.0);
        assert_relative_eq!(scores.bigram_hit, 1.0);
        assert_relative_eq!(scores.rarity, 1.0);
        assert_relative_eq!(scores.phonetic_prefix, 0.5);
        // 0.4 + 0.2 + 0.2 + 0.2 × 0.5
        assert_relative_eq!(scores.probability, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn prefix_match_is_positional() {
        let (script, rarity) = fixtures(&["bonjour mon ami comment"]);
        let t = target(&script, 0);
        // Same words, shifted by one: position-wise only "mon"≠"bonjour" etc.
        let ev = head_evidence(&["mon", "ami", "comment"]);
        let scores = score_evidence(&ev, &t, &rarity, &AlignConfig::default());
        assert_relative_eq!(scores.prefix_match, 0.0);
    }

    #[test]
    fn prefix_match_grows_with_matched_superset() {
        let (script, rarity) = fixtures(&["bonjour mon ami comment"]);
        let t = target(&script, 0);
        let cfg = AlignConfig::default();

        let partial = score_evidence(&head_evidence(&["bonjour", "mon"]), &t, &rarity, &cfg);
        let fuller =
            score_evidence(&head_evidence(&["bonjour", "mon", "ami"]), &t, &rarity, &cfg);
        assert!(fuller.prefix_match >= partial.prefix_match);
    }

    #[test]
    fn bigram_hit_accepts_canonical_equality() {
        let (script, rarity) = fixtures(&["hélas mon ami"]);
        let t = target(&script, 0);
        let ev = head_evidence(&["helas", "mon"]);
        let scores = score_evidence(&ev, &t, &rarity, &AlignConfig::default());
        assert_relative_eq!(scores.bigram_hit, 1.0);
    }

    #[test]
    fn bigram_hit_zero_for_single_word_evidence() {
        let (script, rarity) = fixtures(&["bonjour mon ami"]);
        let t = target(&script, 0);
        let scores = score_evidence(
            &head_evidence(&["bonjour"]),
            &t,
            &rarity,
            &AlignConfig::default(),
        );
        assert_relative_eq!(scores.bigram_hit, 0.0);
    }

    #[test]
    fn rarity_counts_fraction_of_two_rarest_head_tokens() {
        let (script, rarity) = fixtures(&[
            "le magnifique hibou chante",
            "le chien dort",
            "le chat dort",
        ]);
        let t = target(&script, 0);
        let cfg = AlignConfig::default();

        // "magnifique" and "hibou" are the rare ones; "le" is everywhere.
        let both = score_evidence(
            &head_evidence(&["magnifique", "hibou"]),
            &t,
            &rarity,
            &cfg,
        );
        assert_relative_eq!(both.rarity, 1.0);

        let one = score_evidence(&head_evidence(&["le", "hibou"]), &t, &rarity, &cfg);
        assert_relative_eq!(one.rarity, 0.5);
    }

    #[test]
    fn phonetic_prefix_compares_concatenated_prefixes() {
        let (script, rarity) = fixtures(&["bonjour mon ami"]);
        let mut t = target(&script, 0);
        t.head_phonemes = vec!["bO~ZuR".into(), "mO~".into(), "ami".into()];

        let ev = Evidence {
            words: vec!["bonjour".into(), "mon".into()],
            phonemes: vec!["bO~ZuR".into(), "mO~".into()],
            strategy: MatchStrategy::HeadEvidence,
            anchor_bias: None,
        };
        let scores = score_evidence(&ev, &t, &rarity, &AlignConfig::default());
        assert_relative_eq!(scores.phonetic_prefix, 1.0);
    }

    #[test]
    fn anchor_bias_raises_composite() {
        let (script, rarity) = fixtures(&["non pas cela au revoir alors mes amis"]);
        let t = target(&script, 0);
        let cfg = AlignConfig::default();

        let plain = Evidence {
            words: vec!["au".into(), "revoir".into(), "alors".into()],
            phonemes: vec![String::new(); 3],
            strategy: MatchStrategy::AnchorRescue,
            anchor_bias: None,
        };
        let anchored = Evidence {
            anchor_bias: Some(1.0),
            ..plain.clone()
        };

        let without = score_evidence(&plain, &t, &rarity, &cfg);
        let with = score_evidence(&anchored, &t, &rarity, &cfg);
        assert!(with.composite > without.composite);
        assert_relative_eq!(with.composite - without.composite, cfg.anchor_weight, epsilon = 1e-12);
    }

    #[test]
    fn probability_is_clipped_away_from_certainty() {
        let (script, rarity) = fixtures(&["bonjour mon ami"]);
        let t = target(&script, 0);
        let mut cfg = AlignConfig::default();
        cfg.anchor_weight = 5.0;

        let ev = Evidence {
            words: vec!["bonjour".into(), "mon".into(), "ami".into()],
            phonemes: vec![String::new(); 3],
            strategy: MatchStrategy::AnchorRescue,
            anchor_bias: Some(1.0),
        };
        let high = score_evidence(&ev, &t, &rarity, &cfg);
        assert_relative_eq!(high.probability, PROBABILITY_CLIP.1);

        // With phonemes on both sides but nothing matching, every feature
        // bottoms out and the floor clip kicks in.
        let mut t = t;
        t.head_phonemes = vec!["bO~ZuR".into(), "mO~".into(), "ami".into()];
        let mismatch = Evidence {
            words: vec!["zut".into()],
            phonemes: vec!["zyt".into()],
            strategy: MatchStrategy::HeadEvidence,
            anchor_bias: None,
        };
        let low = score_evidence(&mismatch, &t, &rarity, &AlignConfig::default());
        assert_relative_eq!(low.probability, PROBABILITY_CLIP.0);
    }
}
