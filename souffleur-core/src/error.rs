use thiserror::Error;

/// All errors produced by souffleur-core.
///
/// The per-frame evidence path never fails: recognition noise is absorbed by
/// degrading evidence quality (see the evidence and score modules). Errors
/// only exist at the host-API boundary.
#[derive(Debug, Error)]
pub enum SouffleurError {
    #[error("script contains no lines")]
    EmptyScript,

    #[error("position {position} is out of range for a script of {len} lines")]
    PositionOutOfRange { position: usize, len: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SouffleurError>;
