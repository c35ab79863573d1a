//! Word normalization shared by the ASR window and script-line sides.
//!
//! Both sides of every comparison go through the same pipeline so that
//! recognition output and script text meet on equal footing:
//!
//! 1. Lowercase.
//! 2. Replace everything outside {letters, digits, whitespace, apostrophe,
//!    hyphen} with whitespace. Extended Latin letters survive (`à`, `œ`, …).
//! 3. Split on whitespace.
//! 4. Split elided clitics on apostrophe variants (`j'ai` → `j`, `ai`).
//! 5. Drop filler words (hesitation sounds).
//!
//! [`canonical`] additionally folds accents and strips apostrophes/hyphens,
//! giving the loose form used for equality checks and n-gram index keys.

use std::collections::HashSet;

/// Apostrophe code points produced by keyboards, ASR engines and typesetters.
const APOSTROPHES: [char; 3] = ['\'', '\u{2019}', '\u{02BC}'];

/// Hesitation sounds dropped from both the ASR stream and script heads.
///
/// French first (the tool's home turf), English alongside: recognition
/// engines emit both regardless of the performance language.
const DEFAULT_FILLERS: [&str; 12] = [
    "euh", "heu", "hem", "hum", "hmm", "mmh", "ben", "bah", "uh", "um", "er", "uhm",
];

/// Tokenizer with a configurable filler-word set.
#[derive(Debug, Clone)]
pub struct Normalizer {
    fillers: HashSet<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_FILLERS.iter().map(|f| f.to_string()))
    }
}

impl Normalizer {
    /// Create a normalizer with an explicit filler set (already lowercase).
    pub fn new(fillers: impl IntoIterator<Item = String>) -> Self {
        Self {
            fillers: fillers.into_iter().collect(),
        }
    }

    /// Normalize raw text into the canonical word stream.
    ///
    /// Never fails: empty or all-filtered input yields an empty list.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let scrubbed: String = lowered
            .chars()
            .map(|c| if keep_char(c) { c } else { ' ' })
            .collect();

        let mut tokens = Vec::new();
        for raw in scrubbed.split_whitespace() {
            for part in clitic_split(raw) {
                if !part.is_empty() && !self.fillers.contains(&part) {
                    tokens.push(part);
                }
            }
        }
        tokens
    }

    /// Normalize an already-tokenized word list (e.g. an ASR window).
    ///
    /// Words may arrive pre-normalized or raw; the pipeline is idempotent.
    pub fn tokenize_words<S: AsRef<str>>(&self, words: &[S]) -> Vec<String> {
        let mut tokens = Vec::new();
        for word in words {
            tokens.extend(self.tokenize(word.as_ref()));
        }
        tokens
    }
}

fn keep_char(c: char) -> bool {
    c.is_alphabetic() || c.is_ascii_digit() || c.is_whitespace() || c == '-' || APOSTROPHES.contains(&c)
}

/// Split an apostrophe-joined elided form into its constituent tokens.
///
/// Falls back to the token itself when splitting yields nothing usable.
pub fn clitic_split(token: &str) -> Vec<String> {
    let parts: Vec<String> = token
        .split(|c| APOSTROPHES.contains(&c))
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect();

    if parts.is_empty() {
        vec![token.to_string()]
    } else {
        parts
    }
}

/// Loose comparison form: accents folded to base letters, apostrophes and
/// hyphens stripped. Assumes lowercase input (everything downstream of
/// [`Normalizer::tokenize`] is).
pub fn canonical(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for c in token.chars() {
        if c == '-' || APOSTROPHES.contains(&c) {
            continue;
        }
        match fold_accent(c) {
            Some(folded) => out.push_str(folded),
            None => out.push(c),
        }
    }
    out
}

/// Fold one accented Latin letter to its base form.
fn fold_accent(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => "o",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'ç' => "c",
        'ñ' => "n",
        'œ' => "oe",
        'æ' => "ae",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        let n = Normalizer::default();
        assert_eq!(
            n.tokenize("Bonjour, mon AMI !"),
            vec!["bonjour", "mon", "ami"]
        );
    }

    #[test]
    fn keeps_accents_and_hyphens_in_tokens() {
        let n = Normalizer::default();
        assert_eq!(
            n.tokenize("Peut-être à Orléans…"),
            vec!["peut-être", "à", "orléans"]
        );
    }

    #[test]
    fn drops_fillers() {
        let n = Normalizer::default();
        assert_eq!(n.tokenize("euh bonjour hum ben oui"), vec!["bonjour", "oui"]);
    }

    #[test]
    fn custom_filler_set() {
        let n = Normalizer::new(["alors".to_string()]);
        assert_eq!(n.tokenize("alors bonjour euh"), vec!["bonjour", "euh"]);
    }

    #[test]
    fn splits_clitics_on_apostrophe_variants() {
        let n = Normalizer::default();
        assert_eq!(n.tokenize("j'ai"), vec!["j", "ai"]);
        assert_eq!(n.tokenize("l\u{2019}homme"), vec!["l", "homme"]);
    }

    #[test]
    fn clitic_split_falls_back_on_degenerate_input() {
        assert_eq!(clitic_split("'"), vec!["'"]);
        assert_eq!(clitic_split("ami"), vec!["ami"]);
    }

    #[test]
    fn empty_and_all_filtered_input_yield_empty() {
        let n = Normalizer::default();
        assert!(n.tokenize("").is_empty());
        assert!(n.tokenize("?!… ,,, 	").is_empty());
        assert!(n.tokenize("euh hum").is_empty());
    }

    #[test]
    fn canonical_folds_accents_and_joins() {
        assert_eq!(canonical("peut-être"), "peutetre");
        assert_eq!(canonical("l'âme"), "lame");
        assert_eq!(canonical("cœur"), "coeur");
        assert_eq!(canonical("garçon"), "garcon");
    }

    #[test]
    fn tokenize_words_is_idempotent_on_normalized_input() {
        let n = Normalizer::default();
        let once = n.tokenize("J'ai vu l'étoile");
        let twice = n.tokenize_words(&once);
        assert_eq!(once, twice);
    }
}
