//! Events emitted to the host.
//!
//! Both event types are serde-serializable with camelCase fields so the host
//! can forward them over its own event bus (IPC, websocket, …) unchanged.
//! They are broadcast out-of-band relative to the call that produced them
//! (see the engine's outbox dispatch).

use serde::{Deserialize, Serialize};

use crate::script::ScriptLine;

/// Which evidence path produced a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    /// Window words overlapped the target's head tokens.
    HeadEvidence,
    /// Head evidence was absent; a whole-line n-gram anchored the match.
    AnchorRescue,
    /// Repeat-cluster corroboration: enough first-word hits across frames.
    RepeatClusterVote,
}

/// Proposal that the performance has moved to a new script line.
///
/// Consumed immediately by the host's arbitration layer; the engine retains
/// nothing beyond emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchProposal {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// The proposed target line.
    pub line: ScriptLine,
    /// Confidence in [0, 1], derived from the accumulated log-likelihood.
    pub confidence: f32,
    /// Evidence path that triggered the decision.
    pub strategy: MatchStrategy,
    /// Normalized window words that served as evidence.
    pub evidence_words: Vec<String>,
    /// Phoneme strings aligned with `evidence_words` (empty string = none).
    pub evidence_phonemes: Vec<String>,
}

/// The committed position changed: either the engine committed a transition
/// or an external authority synced a different position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionChangedEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// New committed line index; `None` means "before the first line".
    pub position: Option<usize>,
}
