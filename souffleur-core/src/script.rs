//! Script data model.
//!
//! Lines are loaded, validated and persisted by the host's document layer;
//! this crate only reads them. All derived match data (heads, n-grams,
//! phonemes) is optional; the target builder falls back to deriving it from
//! the raw text when a field is absent.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SouffleurError};

/// Where whole-line n-grams come from for a given line.
///
/// Upstream tooling ships either the flat token list of the line or
/// already-shaped n-grams. The variant is resolved once at load time; nothing
/// downstream sniffs shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum LineNgramSource {
    /// Flat normalized token list of the whole line.
    Raw(Vec<String>),
    /// N-grams already shaped by the precomputation pipeline.
    Precomputed(Vec<Vec<String>>),
}

/// One line of the performance script. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptLine {
    /// Ordinal position within the script.
    pub position: usize,
    /// Speaker label (display-only for this crate).
    pub speaker: String,
    /// Raw line text as written.
    pub text: String,
    /// Whole-line phonetic transcription, when precomputed.
    #[serde(default)]
    pub phonetic: Option<String>,
    /// Precomputed head tokens (the first few normalized words).
    #[serde(default)]
    pub head_tokens: Option<Vec<String>>,
    /// Precomputed head phonemes, aligned 1:1 with `head_tokens`.
    #[serde(default)]
    pub head_phonemes: Option<Vec<String>>,
    /// Whole-line n-gram source (token level).
    #[serde(default)]
    pub ngrams: Option<LineNgramSource>,
    /// Precomputed whole-line phoneme n-grams.
    #[serde(default)]
    pub phoneme_ngrams: Option<Vec<Vec<String>>>,
}

impl ScriptLine {
    /// Bare line with no precomputed match data.
    pub fn new(position: usize, speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            position,
            speaker: speaker.into(),
            text: text.into(),
            phonetic: None,
            head_tokens: None,
            head_phonemes: None,
            ngrams: None,
            phoneme_ngrams: None,
        }
    }
}

/// Ordered, indexable collection of script lines, stable for the lifetime of
/// an alignment session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    lines: Vec<ScriptLine>,
}

impl Script {
    /// Wrap loaded lines. The script must contain at least one line.
    pub fn from_lines(lines: Vec<ScriptLine>) -> Result<Self> {
        if lines.is_empty() {
            return Err(SouffleurError::EmptyScript);
        }
        Ok(Self { lines })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&ScriptLine> {
        self.lines.get(position)
    }

    pub fn lines(&self) -> impl Iterator<Item = &ScriptLine> {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_script_is_rejected() {
        assert!(matches!(
            Script::from_lines(vec![]),
            Err(SouffleurError::EmptyScript)
        ));
    }

    #[test]
    fn line_deserializes_with_camel_case_and_defaults() {
        let json = r#"{
            "position": 3,
            "speaker": "ARLEQUIN",
            "text": "Bonjour mon ami",
            "headTokens": ["bonjour", "mon", "ami"]
        }"#;

        let line: ScriptLine = serde_json::from_str(json).expect("deserialize line");
        assert_eq!(line.position, 3);
        assert_eq!(line.speaker, "ARLEQUIN");
        assert_eq!(
            line.head_tokens.as_deref(),
            Some(&["bonjour".to_string(), "mon".to_string(), "ami".to_string()][..])
        );
        assert!(line.phonetic.is_none());
        assert!(line.ngrams.is_none());
    }

    #[test]
    fn ngram_source_round_trips_as_tagged_variant() {
        let raw = LineNgramSource::Raw(vec!["au".into(), "revoir".into()]);
        let json = serde_json::to_value(&raw).expect("serialize");
        assert_eq!(json["kind"], "raw");
        assert_eq!(json["data"][1], "revoir");

        let back: LineNgramSource = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, raw);

        let pre = LineNgramSource::Precomputed(vec![vec!["au".into(), "revoir".into()]]);
        let json = serde_json::to_value(&pre).expect("serialize");
        assert_eq!(json["kind"], "precomputed");
        let back: LineNgramSource = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, pre);
    }
}
