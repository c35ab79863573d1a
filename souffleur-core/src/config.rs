//! Tuning knobs for the alignment engine.
//!
//! Every threshold the decision logic consults lives here, so a control
//! console can expose them without touching engine code. Defaults are tuned
//! for sub-second ASR windows over conversational stage French.

/// Configuration for an alignment session.
#[derive(Debug, Clone)]
pub struct AlignConfig {
    /// Number of leading line tokens used as the head match signal. Default: 4.
    pub head_len: usize,
    /// N-gram size for whole-line anchor matching. Default: 3.
    pub ngram_size: usize,
    /// Normalized edit-distance similarity two phoneme strings must reach to
    /// count as a phonetic match, in [0, 1]. Default: 0.85.
    pub phonetic_threshold: f64,

    /// Weight of the head prefix-match feature. Default: 0.4.
    pub weight_prefix: f64,
    /// Weight of the head bigram-hit feature. Default: 0.2.
    pub weight_bigram: f64,
    /// Weight of the rare-word coverage feature. Default: 0.2.
    pub weight_rarity: f64,
    /// Weight of the phonetic prefix-similarity feature. Default: 0.2.
    pub weight_phonetic: f64,
    /// Extra credit applied to anchor-rescued evidence, scaled by the
    /// position bias of the matched n-gram. Default: 0.5.
    pub anchor_weight: f64,
    /// How steeply an anchor's credit decays with its position in the line.
    /// 0 = position ignored, 1 = a line-final anchor is worth the 0.5 floor.
    /// Default: 0.5.
    pub head_bias_factor: f64,

    /// Accumulated LLR needed to commit a transition. Default: 2.0.
    pub llr_on: f64,
    /// Accumulated LLR at which the current hypothesis is rejected and the
    /// accumulator reset. Default: −2.0.
    pub llr_off: f64,
    /// Per-frame forgetting factor of the LLR accumulator, in (0, 1].
    /// 1.0 is textbook SPRT; lower values tolerate transient noise.
    /// Default: 0.85.
    pub llr_decay: f64,
    /// Frame probability at or above which the consecutive-confirmation
    /// counter advances. Default: 0.6.
    pub on_probability: f64,
    /// Confirmation frames required before a commit (heads of ≤1 token always
    /// need just one). Default: 2.
    pub confirm_frames: u32,
    /// Confirmation frames inside a repeat cluster, where the cross-frame
    /// first-word vote corroborates. Default: 1.
    pub confirm_frames_repeat: u32,

    /// Canonical head-prefix length compared when detecting repeat clusters.
    /// Default: 2.
    pub repeat_prefix_len: usize,
    /// How many upcoming lines are checked for a shared opening. Default: 3.
    pub repeat_lookahead: usize,

    /// Capacity of the first-word sliding window. Default: 3.
    pub first_word_window: usize,
    /// First-word hits required for the repeat-cluster vote path. Default: 2.
    pub first_word_min_hits: usize,
    /// Minimum accumulated LLR for the vote path. Default: 0.5.
    pub first_word_min_llr: f64,

    /// Filler-word override; `None` uses the built-in hesitation set.
    pub fillers: Option<Vec<String>>,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            head_len: 4,
            ngram_size: 3,
            phonetic_threshold: 0.85,
            weight_prefix: 0.4,
            weight_bigram: 0.2,
            weight_rarity: 0.2,
            weight_phonetic: 0.2,
            anchor_weight: 0.5,
            head_bias_factor: 0.5,
            llr_on: 2.0,
            llr_off: -2.0,
            llr_decay: 0.85,
            on_probability: 0.6,
            confirm_frames: 2,
            confirm_frames_repeat: 1,
            repeat_prefix_len: 2,
            repeat_lookahead: 3,
            first_word_window: 3,
            first_word_min_hits: 2,
            first_word_min_llr: 0.5,
            fillers: None,
        }
    }
}
