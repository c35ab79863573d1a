//! Grapheme-to-phoneme conversion seam.
//!
//! The converter is an external collaborator (typically a dictionary-backed
//! G2P service). The trait is the extensibility point: wire in a real
//! converter, or leave [`NullConverter`] in place for text-only matching;
//! every consumer degrades gracefully when phonemes are absent.
//!
//! Conversion must not fail loudly: a word the converter cannot handle is
//! simply `None`, which downstream code treats as "no phoneme available".

/// Contract for grapheme-to-phoneme backends.
pub trait PhonemeConverter: Send + Sync {
    /// Convert one normalized word to a phoneme string.
    ///
    /// `None` means the word has no usable phonetic form (unknown word,
    /// backend failure, …). Implementations must not panic.
    fn convert(&self, word: &str) -> Option<String>;

    /// Convert a batch of words. The default implementation maps `convert`;
    /// backends with a cheaper bulk path may override.
    fn batch_convert(&self, words: &[String]) -> Vec<Option<String>> {
        words.iter().map(|w| self.convert(w)).collect()
    }
}

/// Converter that knows no phonemes at all. Matching falls back to the
/// textual features only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConverter;

impl PhonemeConverter for NullConverter {
    fn convert(&self, _word: &str) -> Option<String> {
        None
    }
}

/// Convert a batch, substituting the empty string where no phoneme exists.
///
/// The empty-string convention keeps phoneme lists aligned 1:1 with their
/// token lists; consumers test `is_empty()` before using an entry.
pub fn phonemes_or_empty(converter: &dyn PhonemeConverter, words: &[String]) -> Vec<String> {
    converter
        .batch_convert(words)
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperCaser;

    impl PhonemeConverter for UpperCaser {
        fn convert(&self, word: &str) -> Option<String> {
            if word == "mystery" {
                None
            } else {
                Some(word.to_uppercase())
            }
        }
    }

    #[test]
    fn null_converter_yields_nothing() {
        assert_eq!(NullConverter.convert("bonjour"), None);
        assert_eq!(
            NullConverter.batch_convert(&["a".into(), "b".into()]),
            vec![None, None]
        );
    }

    #[test]
    fn failed_conversions_become_empty_strings_in_aligned_output() {
        let words = vec!["bonjour".to_string(), "mystery".to_string()];
        let phonemes = phonemes_or_empty(&UpperCaser, &words);
        assert_eq!(phonemes, vec!["BONJOUR".to_string(), String::new()]);
    }
}
