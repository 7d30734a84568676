//! Unified error types surfaced by the runtime API.
//!
//! Wraps pipeline rejections and worker coordination failures so clients can
//! bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use vitals_core::{CharacterId, ErrorSeverity, ModifyError, VitalsError};

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{0} is not registered with this runtime")]
    UnknownCharacter(CharacterId),

    #[error("{0} was registered twice")]
    DuplicateCharacter(CharacterId),

    #[error("character worker command channel closed")]
    CommandChannelClosed,

    #[error("character worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("character worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Modify(#[from] ModifyError),
}

impl VitalsError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownCharacter(_) | Self::DuplicateCharacter(_) => ErrorSeverity::Validation,
            Self::CommandChannelClosed | Self::ReplyChannelClosed(_) => ErrorSeverity::Recoverable,
            Self::WorkerJoin(_) => ErrorSeverity::Fatal,
            Self::Modify(error) => error.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCharacter(_) => "UNKNOWN_CHARACTER",
            Self::DuplicateCharacter(_) => "DUPLICATE_CHARACTER",
            Self::CommandChannelClosed => "COMMAND_CHANNEL_CLOSED",
            Self::ReplyChannelClosed(_) => "REPLY_CHANNEL_CLOSED",
            Self::WorkerJoin(_) => "WORKER_JOIN",
            Self::Modify(error) => error.error_code(),
        }
    }
}
