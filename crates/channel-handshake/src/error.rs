// Error types for chain sessions and handshake runs

use thiserror::Error;

use crate::channel::{HandshakeIdentity, PhaseState};
use crate::relay::Phase;

/// Errors a chain session reports back to the coordinator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Chain {chain_id} unreachable: {message}")]
    Unreachable { chain_id: String, message: String },

    #[error("Chain {chain_id} has no {what} at {path}")]
    NotFound {
        chain_id: String,
        what: String,
        path: String,
    },

    #[error("Chain {chain_id} rejected transaction (code {code}): {log}")]
    Rejected {
        chain_id: String,
        code: u32,
        log: String,
    },

    #[error("Chain {chain_id} returned an unreadable response: {message}")]
    Decode { chain_id: String, message: String },
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainError::Unreachable { .. } | ChainError::Decode { .. } => ErrorKind::QueryFailure,
            ChainError::NotFound { .. } => ErrorKind::RecordNotFound,
            ChainError::Rejected { .. } => ErrorKind::SubmissionRejected,
        }
    }
}

/// Next timeout does not fit in a block height
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Timeout height overflow: {height} + {horizon}")]
pub struct TimeoutOverflow {
    pub height: u64,
    pub horizon: u64,
}

/// Coarse classification of a failed run, for operators and exit reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    QueryFailure,
    RecordNotFound,
    SubmissionRejected,
    MalformedInput,
    /// An endpoint already left Idle; nothing was submitted
    AlreadyInProgress,
    TimeoutOverflow,
}

/// Errors ending a handshake run
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// A phase failed; nothing after it was submitted
    #[error("{phase} phase failed (last completed: {}): {source}", describe_completed(.last_completed))]
    Phase {
        phase: Phase,
        last_completed: Option<Phase>,
        #[source]
        source: ChainError,
    },

    #[error("Handshake for {identity} already in progress on {chain_id} (state {state})")]
    AlreadyInProgress {
        chain_id: String,
        identity: HandshakeIdentity,
        state: PhaseState,
    },

    #[error("Existing handshake check on {chain_id} failed: {source}")]
    ExistingCheck {
        chain_id: String,
        #[source]
        source: ChainError,
    },

    #[error("{phase} phase failed (last completed: {}): {source}", describe_completed(.last_completed))]
    TimeoutOverflow {
        phase: Phase,
        last_completed: Option<Phase>,
        #[source]
        source: TimeoutOverflow,
    },

    #[error("Malformed input {source_name}: {reason}")]
    MalformedInput { source_name: String, reason: String },
}

fn describe_completed(phase: &Option<Phase>) -> String {
    phase.map_or_else(|| "none".to_string(), |p| p.to_string())
}

impl HandshakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandshakeError::Phase { source, .. } | HandshakeError::ExistingCheck { source, .. } => {
                source.kind()
            }
            HandshakeError::AlreadyInProgress { .. } => ErrorKind::AlreadyInProgress,
            HandshakeError::TimeoutOverflow { .. } => ErrorKind::TimeoutOverflow,
            HandshakeError::MalformedInput { .. } => ErrorKind::MalformedInput,
        }
    }

    /// Phase that was executing when the run stopped
    pub fn phase(&self) -> Option<Phase> {
        match self {
            HandshakeError::Phase { phase, .. } | HandshakeError::TimeoutOverflow { phase, .. } => {
                Some(*phase)
            }
            _ => None,
        }
    }

    pub fn last_completed(&self) -> Option<Phase> {
        match self {
            HandshakeError::Phase { last_completed, .. }
            | HandshakeError::TimeoutOverflow { last_completed, .. } => *last_completed,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_error_kinds() {
        let unreachable = ChainError::Unreachable {
            chain_id: "a".to_string(),
            message: "connection refused".to_string(),
        };
        let missing = ChainError::NotFound {
            chain_id: "a".to_string(),
            what: "channel".to_string(),
            path: "1/channels/connection-0/channel-0".to_string(),
        };
        let rejected = ChainError::Rejected {
            chain_id: "b".to_string(),
            code: 5,
            log: "invalid proof".to_string(),
        };

        assert_eq!(unreachable.kind(), ErrorKind::QueryFailure);
        assert_eq!(missing.kind(), ErrorKind::RecordNotFound);
        assert_eq!(rejected.kind(), ErrorKind::SubmissionRejected);
    }

    #[test]
    fn test_phase_error_reports_progress() {
        let err = HandshakeError::Phase {
            phase: Phase::Ack,
            last_completed: Some(Phase::Try),
            source: ChainError::Rejected {
                chain_id: "chain-a".to_string(),
                code: 12,
                log: "timeout passed".to_string(),
            },
        };

        assert_eq!(err.phase(), Some(Phase::Ack));
        assert_eq!(err.last_completed(), Some(Phase::Try));
        assert_eq!(err.kind(), ErrorKind::SubmissionRejected);
        let text = err.to_string();
        assert!(text.contains("Ack phase failed"));
        assert!(text.contains("last completed: Try"));
    }

    #[test]
    fn test_first_phase_error_has_no_completed_phase() {
        let err = HandshakeError::Phase {
            phase: Phase::Init,
            last_completed: None,
            source: ChainError::Unreachable {
                chain_id: "chain-b".to_string(),
                message: "dns".to_string(),
            },
        };
        assert!(err.to_string().contains("last completed: none"));
    }

    #[test]
    fn test_timeout_overflow_keeps_phase_context() {
        let err = HandshakeError::TimeoutOverflow {
            phase: Phase::Try,
            last_completed: Some(Phase::Init),
            source: TimeoutOverflow {
                height: u64::MAX - 5,
                horizon: 1000,
            },
        };

        assert_eq!(err.phase(), Some(Phase::Try));
        assert_eq!(err.last_completed(), Some(Phase::Init));
        assert_eq!(err.kind(), ErrorKind::TimeoutOverflow);
        assert!(err.to_string().contains("last completed: Init"));
    }

    #[test]
    fn test_in_progress_has_its_own_kind() {
        let err = HandshakeError::AlreadyInProgress {
            chain_id: "chain-b".to_string(),
            identity: HandshakeIdentity::new("connection-5", "channel-9"),
            state: PhaseState::OpenTry,
        };
        assert_eq!(err.kind(), ErrorKind::AlreadyInProgress);
        assert_eq!(err.phase(), None);
    }
}
