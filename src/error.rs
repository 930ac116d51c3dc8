use thiserror::Error;

/// Failures reported by a [`RestCall`](crate::rest::RestCall) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestError {
    #[error("unknown rest command: {category} {command}")]
    UnknownCommand { category: String, command: String },
    #[error("invalid argument for {command}: {argument}")]
    InvalidArgument { command: String, argument: String },
    #[error("rest endpoint unavailable: {0}")]
    Unavailable(String),
}

/// Coarse classification of a [`FunctionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller broke the dispatch contract (bad index, channel tag, disabled item).
    CallerContractViolation,
    /// The host's rest call-back failed.
    UpstreamFailure,
    /// The action needs a live session and none is bound.
    PreconditionMissing,
    /// Registry used outside its `init`/`cleanup` window.
    Lifecycle,
}

#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("function index {index} out of range (registry holds {len} items)")]
    InvalidArgument { index: usize, len: usize },
    #[error("unrecognised invocation channel: {0}")]
    InvalidChannel(String),
    #[error("function {index} is disabled")]
    Disabled { index: usize },
    #[error("function registry is not active")]
    NotActive,
    #[error("function registry is already active")]
    AlreadyActive,
    #[error("{0} requires a connected radio")]
    PreconditionMissing(&'static str),
    #[error(transparent)]
    Upstream(#[from] RestError),
    #[error("failed to encode result: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl FunctionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } | Self::InvalidChannel(_) | Self::Disabled { .. } => {
                ErrorKind::CallerContractViolation
            }
            Self::Upstream(_) => ErrorKind::UpstreamFailure,
            Self::PreconditionMissing(_) => ErrorKind::PreconditionMissing,
            Self::NotActive | Self::AlreadyActive => ErrorKind::Lifecycle,
            // Encoding a value we produced ourselves only fails on a broken upstream payload.
            Self::Serialize(_) => ErrorKind::UpstreamFailure,
        }
    }
}

pub type Result<T, E = FunctionError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            FunctionError::InvalidArgument { index: 9, len: 5 }.kind(),
            ErrorKind::CallerContractViolation
        );
        assert_eq!(
            FunctionError::InvalidChannel("Fax".into()).kind(),
            ErrorKind::CallerContractViolation
        );
        assert_eq!(
            FunctionError::from(RestError::Unavailable("down".into())).kind(),
            ErrorKind::UpstreamFailure
        );
        assert_eq!(
            FunctionError::PreconditionMissing("Toggle MOX").kind(),
            ErrorKind::PreconditionMissing
        );
        assert_eq!(FunctionError::NotActive.kind(), ErrorKind::Lifecycle);
    }

    #[test]
    fn test_upstream_message_is_transparent() {
        let err = FunctionError::from(RestError::UnknownCommand {
            category: "RADIO".into(),
            command: "NOPE".into(),
        });
        assert_eq!(err.to_string(), "unknown rest command: RADIO NOPE");
    }
}
