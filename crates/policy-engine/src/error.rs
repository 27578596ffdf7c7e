use thiserror::Error;

/// Validation and lookup errors surfaced by the registry and evaluator.
///
/// Every variant is a synchronous configuration error reported to the caller
/// at registration, binding, or lookup time; none are transient or retryable.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A policy with this name is already registered.
    #[error("duplicate policy name: '{name}'")]
    DuplicateName { name: String },

    /// The referenced policy does not exist in the registry.
    #[error("unknown policy: '{name}'")]
    UnknownPolicy { name: String },

    /// The binding target already carries a policy of this kind.
    #[error("{message}")]
    Conflict { message: String },

    /// The policy declares no default outcome, so evaluation would not be
    /// total.
    #[error("policy '{name}' has no default outcome")]
    NoDefaultRule { name: String },

    /// An outcome or binding shape disagrees with the policy kind.
    #[error("policy '{name}': {message}")]
    KindMismatch { name: String, message: String },

    /// A discriminant pattern failed to compile.
    #[error("policy '{name}': invalid discriminant pattern '{pattern}'")]
    InvalidPattern { name: String, pattern: String },
}

impl PolicyError {
    /// Create a conflict error with a custom message.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a kind-mismatch error for the named policy.
    pub fn kind_mismatch(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KindMismatch {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
