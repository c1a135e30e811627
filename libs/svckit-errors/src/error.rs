//! The closed set of failures that may cross the HTTP boundary.

use crate::broken_rule::{BrokenRule, BrokenRuleError};

/// Marker produced when an in-flight operation is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Failure kinds produced explicitly by the repository, service and API layers.
///
/// The translation middleware dispatches on this discriminant; nothing
/// downstream inspects concrete error types.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// One or more business rules were violated; the caller can fix the input.
    #[error(transparent)]
    BusinessRuleViolation(#[from] BrokenRuleError),

    /// The request was structurally invalid (malformed body, bad query, ...).
    #[error("validation failed: {message}")]
    ValidationFailure { message: String },

    /// The operation was cancelled before it completed.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// Anything else: a defect or an infrastructure fault.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailure {
            message: message.into(),
        }
    }

    pub fn unclassified<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unclassified(anyhow::Error::new(err))
    }

    /// Short label used for span and log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BusinessRuleViolation(_) => "business_rule_violation",
            Self::ValidationFailure { .. } => "validation_failure",
            Self::Cancelled(_) => "cancelled",
            Self::Unclassified(_) => "unclassified",
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl From<BrokenRule> for ServiceError {
    fn from(rule: BrokenRule) -> Self {
        Self::BusinessRuleViolation(rule.into())
    }
}
