//! # souffleur-core
//!
//! Script-alignment decision engine for live theatrical subtitling.
//!
//! ## Architecture
//!
//! ```text
//! ASR window ─► Normalizer ─► Evidence Selector ─► Feature Scorer
//!                                  │ (consults TargetEntry)      │
//!                                  │                             ▼
//! Script ──► RarityTable           │                  Sequential Decision
//!    │                             │                  Engine (leaky LLR)
//!    └─► TargetEntry Builder ◄─────┴──────────────────────┐    │
//!              ▲                                 advance   │    ▼
//!              └───────────────────────────────────────────┴─► MatchProposal
//! ```
//!
//! The engine never performs recognition, rendering or persistence; it is a
//! library-level decision core driven by its host. Audio, ASR, script
//! loading, grapheme-to-phoneme conversion and proposal arbitration are
//! external collaborators behind narrow seams.
//!
//! Frames degrade instead of failing: missing phonetic data neutralizes the
//! affected feature, a failing converter falls back to text-only matching,
//! and a frame without usable evidence is skipped without touching decision
//! state. Nothing on the frame path returns an error.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod evidence;
pub mod normalize;
pub mod phoneme;
pub mod rarity;
pub mod score;
pub mod script;
pub mod target;

// Convenience re-exports for downstream crates
pub use config::AlignConfig;
pub use engine::{AlignmentSession, DiagnosticsSnapshot, SessionStatus};
pub use error::{Result, SouffleurError};
pub use events::{MatchProposal, MatchStrategy, PositionChangedEvent};
pub use phoneme::{NullConverter, PhonemeConverter};
pub use script::{LineNgramSource, Script, ScriptLine};
