//! Corpus rarity index over the full script.
//!
//! Inverse-document-frequency weighting at line granularity: a token that
//! appears in few lines identifies its line strongly, one that appears
//! everywhere identifies nothing. Built once at session construction and
//! immutable afterwards, so it is shared without locking.

use std::collections::{HashMap, HashSet};

use crate::normalize::{canonical, Normalizer};
use crate::script::Script;

/// Canonical token → rarity weight (higher = rarer).
#[derive(Debug, Clone)]
pub struct RarityTable {
    weights: HashMap<String, f64>,
    /// Weight assigned to tokens the corpus never produced. A word the whole
    /// script contains exactly never is maximally identifying when it does
    /// match, so unknowns get the highest observed weight.
    max_weight: f64,
}

impl RarityTable {
    /// Build the table from every line of the script.
    pub fn build(script: &Script, normalizer: &Normalizer) -> Self {
        let line_count = script.len().max(1);
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for line in script.lines() {
            let uniq: HashSet<String> = normalizer
                .tokenize(&line.text)
                .iter()
                .map(|t| canonical(t))
                .collect();
            for token in uniq {
                *doc_freq.entry(token).or_insert(0) += 1;
            }
        }

        let mut max_weight = 0.0f64;
        let weights: HashMap<String, f64> = doc_freq
            .into_iter()
            .map(|(token, df)| {
                let w = (line_count as f64 / df as f64).ln();
                max_weight = max_weight.max(w);
                (token, w)
            })
            .collect();

        Self {
            weights,
            max_weight,
        }
    }

    /// Rarity weight for a token, at any normalization level (canonicalized
    /// internally before lookup).
    pub fn weight(&self, token: &str) -> f64 {
        self.weights
            .get(&canonical(token))
            .copied()
            .unwrap_or(self.max_weight)
    }

    /// Indices of the `k` rarest tokens in `tokens`, rarest first.
    pub fn rarest(&self, tokens: &[String], k: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..tokens.len()).collect();
        order.sort_by(|&a, &b| {
            self.weight(&tokens[b])
                .partial_cmp(&self.weight(&tokens[a]))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order.truncate(k);
        order
    }
}
