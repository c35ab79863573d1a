//! `AlignmentSession`: the sequential decision engine and its host surface.
//!
//! ## Per-frame flow
//!
//! ```text
//! process_window(words)
//!     └─► Normalizer → Evidence Selector (head filter | anchor rescue)
//!              └─► Feature Scorer → frame probability p
//!                       └─► LLR accumulator + confirmation counters
//!                                └─► commit | reject | keep accumulating
//! ```
//!
//! A committed transition emits a [`MatchProposal`] and a
//! [`PositionChangedEvent`], advances the committed position and rebuilds the
//! target entry for the next line.
//!
//! ## Threading
//!
//! The host calls in from two independent contexts, the recognition worker
//! (`process_window`) and the arbitration layer (`set_committed_position`),
//! so the whole `DecisionState` sits behind one coarse `parking_lot::Mutex`.
//! Events are never sent while the lock is held: they are collected into an
//! outbox and dispatched after release, because a subscriber may synchronously
//! call back into `set_committed_position`.

pub mod sprt;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::AlignConfig;
use crate::error::{Result, SouffleurError};
use crate::events::{MatchProposal, MatchStrategy, PositionChangedEvent};
use crate::evidence::{select_evidence, word_matches, Evidence};
use crate::normalize::Normalizer;
use crate::phoneme::{phonemes_or_empty, PhonemeConverter};
use crate::rarity::RarityTable;
use crate::score::score_evidence;
use crate::script::Script;
use crate::target::TargetEntry;
use self::sprt::LlrAccumulator;

/// Broadcast channel capacity: plenty for sub-second frame rates with a
/// briefly stalled consumer.
const BROADCAST_CAP: usize = 256;

/// Coarse session state, observable by control surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// A target line is live and frames are being scored against it.
    Tracking,
    /// The target pointer ran past the last line; frames are no-ops.
    EndOfScript,
}

/// Counters for observing the frame loop. All relaxed; they feed dashboards,
/// not decisions.
#[derive(Debug, Default)]
pub struct SessionDiagnostics {
    pub frames_in: AtomicUsize,
    pub frames_skipped: AtomicUsize,
    pub head_frames: AtomicUsize,
    pub rescue_frames: AtomicUsize,
    pub commits: AtomicUsize,
    pub rejects: AtomicUsize,
}

impl SessionDiagnostics {
    pub fn reset(&self) {
        self.frames_in.store(0, Ordering::Relaxed);
        self.frames_skipped.store(0, Ordering::Relaxed);
        self.head_frames.store(0, Ordering::Relaxed);
        self.rescue_frames.store(0, Ordering::Relaxed);
        self.commits.store(0, Ordering::Relaxed);
        self.rejects.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            head_frames: self.head_frames.load(Ordering::Relaxed),
            rescue_frames: self.rescue_frames.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            rejects: self.rejects.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsSnapshot {
    pub frames_in: usize,
    pub frames_skipped: usize,
    pub head_frames: usize,
    pub rescue_frames: usize,
    pub commits: usize,
    pub rejects: usize,
}

/// Everything the decision logic mutates, guarded as one unit: the LLR and
/// counters are only meaningful against the currently live target, so they
/// are replaced together or not at all.
struct DecisionState {
    /// Committed line index; `None` before the first line.
    committed: Option<usize>,
    /// Feature bundle for `committed + 1`; `None` once the script is exhausted.
    target: Option<TargetEntry>,
    llr: LlrAccumulator,
    consecutive: u32,
    /// Recent first-word-match marks; consulted only inside repeat clusters.
    first_word_hits: VecDeque<bool>,
}

/// Events produced under the lock, dispatched after it is released.
#[derive(Default)]
struct Outbox {
    proposal: Option<MatchProposal>,
    position: Option<PositionChangedEvent>,
}

/// One alignment session over one script.
///
/// `AlignmentSession` is `Send + Sync` (all mutability is interior). Wrap it
/// in an `Arc` and hand clones to the recognition worker and the arbitration
/// layer.
pub struct AlignmentSession {
    config: AlignConfig,
    script: Script,
    normalizer: Normalizer,
    rarity: RarityTable,
    converter: Box<dyn PhonemeConverter>,
    state: Mutex<DecisionState>,
    proposal_tx: broadcast::Sender<MatchProposal>,
    position_tx: broadcast::Sender<PositionChangedEvent>,
    /// Monotonically increasing event sequence counter.
    seq: AtomicU64,
    diagnostics: SessionDiagnostics,
}

impl AlignmentSession {
    /// Create a session positioned before the first line.
    pub fn new(script: Script, converter: Box<dyn PhonemeConverter>, config: AlignConfig) -> Self {
        let normalizer = match &config.fillers {
            Some(fillers) => Normalizer::new(fillers.iter().cloned()),
            None => Normalizer::default(),
        };
        let rarity = RarityTable::build(&script, &normalizer);
        let target = TargetEntry::build(&script, 0, &normalizer, converter.as_ref(), &config);

        let (proposal_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (position_tx, _) = broadcast::channel(BROADCAST_CAP);

        Self {
            state: Mutex::new(DecisionState {
                committed: None,
                target,
                llr: LlrAccumulator::new(config.llr_decay),
                consecutive: 0,
                first_word_hits: VecDeque::with_capacity(config.first_word_window),
            }),
            config,
            script,
            normalizer,
            rarity,
            converter,
            proposal_tx,
            position_tx,
            seq: AtomicU64::new(0),
            diagnostics: SessionDiagnostics::default(),
        }
    }

    /// Subscribe to transition proposals.
    pub fn subscribe_proposals(&self) -> broadcast::Receiver<MatchProposal> {
        self.proposal_tx.subscribe()
    }

    /// Subscribe to committed-position changes.
    pub fn subscribe_positions(&self) -> broadcast::Receiver<PositionChangedEvent> {
        self.position_tx.subscribe()
    }

    /// Current session status (snapshot).
    pub fn status(&self) -> SessionStatus {
        if self.state.lock().target.is_some() {
            SessionStatus::Tracking
        } else {
            SessionStatus::EndOfScript
        }
    }

    /// Currently committed line index; `None` before the first line.
    pub fn committed_position(&self) -> Option<usize> {
        self.state.lock().committed
    }

    /// Confidence in the live target so far, in [0, 1]; 0.5 is neutral.
    ///
    /// Host-side staleness policies ("uncertain for too long") watch this.
    pub fn confidence(&self) -> f64 {
        self.state.lock().llr.confidence()
    }

    /// Snapshot of the frame-loop counters.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// External authority sync: adopt `position` as the committed line.
    ///
    /// Syncing the already-committed position is idempotent: decision state
    /// is kept, but the target entry is still refreshed (useful for initial
    /// sync). Any other position resets the accumulator, the confirmation
    /// counter and the first-word window together with the target.
    ///
    /// # Errors
    /// `SouffleurError::PositionOutOfRange` if `position` does not name a
    /// script line.
    pub fn set_committed_position(&self, position: Option<usize>) -> Result<()> {
        if let Some(p) = position {
            if p >= self.script.len() {
                warn!(position = p, len = self.script.len(), "position sync out of range");
                return Err(SouffleurError::PositionOutOfRange {
                    position: p,
                    len: self.script.len(),
                });
            }
        }

        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock();
            let idempotent = state.committed == position;
            state.committed = position;
            self.rebuild_target(&mut state);

            if !idempotent {
                Self::reset_decision(&mut state);
                outbox.position = Some(PositionChangedEvent {
                    seq: self.next_seq(),
                    position,
                });
                info!(?position, "position synced from external authority");
            } else {
                debug!(?position, "idempotent position sync, target refreshed");
            }
        }
        self.dispatch(outbox);
        Ok(())
    }

    /// Feed one recognition frame: the most recent window of recognized
    /// words, raw or already normalized.
    ///
    /// Performs at most one scoring pass and emits at most one proposal.
    /// Never fails; frames without usable evidence mutate nothing.
    pub fn process_window<S: AsRef<str>>(&self, words: &[S]) {
        self.diagnostics.frames_in.fetch_add(1, Ordering::Relaxed);

        let window = self.normalizer.tokenize_words(words);
        let window_phonemes = phonemes_or_empty(self.converter.as_ref(), &window);

        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock();
            let Some(target) = state.target.clone() else {
                debug!("end of script, frame ignored");
                return;
            };

            let Some(evidence) =
                select_evidence(&window, &window_phonemes, &target, &self.config)
            else {
                // Insufficient evidence: skip the frame. Distinct from a
                // rejection: no score, no accumulator movement, only a
                // neutral mark in the first-word window.
                self.diagnostics.frames_skipped.fetch_add(1, Ordering::Relaxed);
                Self::push_first_word_mark(&mut state, false, self.config.first_word_window);
                debug!(window = window.len(), target = target.position, "frame skipped");
                return;
            };

            match evidence.strategy {
                MatchStrategy::HeadEvidence => {
                    self.diagnostics.head_frames.fetch_add(1, Ordering::Relaxed)
                }
                _ => self.diagnostics.rescue_frames.fetch_add(1, Ordering::Relaxed),
            };

            let scores = score_evidence(&evidence, &target, &self.rarity, &self.config);
            let first_word_hit = self.hits_first_head(&evidence, &target);
            Self::push_first_word_mark(&mut state, first_word_hit, self.config.first_word_window);

            let llr = state.llr.update(scores.probability);
            if scores.probability >= self.config.on_probability {
                state.consecutive += 1;
            } else {
                state.consecutive = 0;
            }

            debug!(
                target = target.position,
                strategy = ?evidence.strategy,
                p = format_args!("{:.3}", scores.probability),
                llr = format_args!("{:.3}", llr),
                consecutive = state.consecutive,
                "frame scored"
            );

            let required = self.required_frames(&target);
            let committed_by_llr = llr >= self.config.llr_on && state.consecutive >= required;
            let committed_by_vote = target.repeat_cluster
                && Self::window_hits(&state.first_word_hits) >= self.config.first_word_min_hits
                && llr >= self.config.first_word_min_llr;

            if committed_by_llr || committed_by_vote {
                let strategy = if committed_by_llr {
                    evidence.strategy
                } else {
                    MatchStrategy::RepeatClusterVote
                };
                self.commit(&mut state, &target, &evidence, strategy, &mut outbox);
            } else if llr <= self.config.llr_off {
                // Strong disconfirmation of the current hypothesis: start
                // fresh against the same target.
                self.diagnostics.rejects.fetch_add(1, Ordering::Relaxed);
                Self::reset_decision(&mut state);
                info!(target = target.position, "hypothesis rejected, accumulator reset");
            }
        }
        self.dispatch(outbox);
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn commit(
        &self,
        state: &mut DecisionState,
        target: &TargetEntry,
        evidence: &Evidence,
        strategy: MatchStrategy,
        outbox: &mut Outbox,
    ) {
        let line = self
            .script
            .get(target.position)
            .expect("live target always names a script line")
            .clone();
        let confidence = state.llr.confidence() as f32;

        info!(
            position = target.position,
            ?strategy,
            confidence = format_args!("{:.3}", confidence),
            "transition committed"
        );

        outbox.proposal = Some(MatchProposal {
            seq: self.next_seq(),
            line,
            confidence,
            strategy,
            evidence_words: evidence.words.clone(),
            evidence_phonemes: evidence.phonemes.clone(),
        });
        outbox.position = Some(PositionChangedEvent {
            seq: self.next_seq(),
            position: Some(target.position),
        });

        state.committed = Some(target.position);
        self.rebuild_target(state);
        Self::reset_decision(state);
        self.diagnostics.commits.fetch_add(1, Ordering::Relaxed);
    }

    fn rebuild_target(&self, state: &mut DecisionState) {
        let next = state.committed.map_or(0, |p| p + 1);
        state.target = TargetEntry::build(
            &self.script,
            next,
            &self.normalizer,
            self.converter.as_ref(),
            &self.config,
        );
        if state.target.is_none() {
            info!(len = self.script.len(), "script exhausted");
        }
    }

    fn reset_decision(state: &mut DecisionState) {
        state.llr.reset();
        state.consecutive = 0;
        state.first_word_hits.clear();
    }

    fn push_first_word_mark(state: &mut DecisionState, hit: bool, capacity: usize) {
        state.first_word_hits.push_back(hit);
        while state.first_word_hits.len() > capacity {
            state.first_word_hits.pop_front();
        }
    }

    fn window_hits(window: &VecDeque<bool>) -> usize {
        window.iter().filter(|&&h| h).count()
    }

    /// Did any evidence word match the target's opening word? A rescued
    /// mid-line fragment that does not reach back to the opening counts as a
    /// miss: the first-word vote exists to tell shared openings apart.
    fn hits_first_head(&self, evidence: &Evidence, target: &TargetEntry) -> bool {
        let Some(first) = target.head_tokens.first() else {
            return false;
        };
        let first_phoneme = target.head_phonemes.first().map(String::as_str).unwrap_or("");
        evidence.words.iter().enumerate().any(|(i, word)| {
            word_matches(
                word,
                evidence.phonemes.get(i).map(String::as_str).unwrap_or(""),
                first,
                first_phoneme,
                self.config.phonetic_threshold,
            )
        })
    }

    fn required_frames(&self, target: &TargetEntry) -> u32 {
        if target.head_tokens.len() <= 1 {
            1
        } else if target.repeat_cluster {
            self.config.confirm_frames_repeat
        } else {
            self.config.confirm_frames
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn dispatch(&self, outbox: Outbox) {
        // Runs after the lock is released: a subscriber may synchronously
        // call back into set_committed_position.
        if let Some(proposal) = outbox.proposal {
            let _ = self.proposal_tx.send(proposal);
        }
        if let Some(position) = outbox.position {
            let _ = self.position_tx.send(position);
        }
    }
}

impl std::fmt::Debug for AlignmentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignmentSession")
            .field("committed", &self.committed_position())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
