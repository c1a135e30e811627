//! Business-rule violations (pure data model)

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category reported for rules that don't name a more specific one.
pub const DEFAULT_RULE_TYPE: &str = "BrokenRule";

/// How serious a broken rule is.
///
/// The string form (`Info`, `Warning`, `Error`, `Fatal`) is what goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attempt to build an `ErrorCode` from an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a broken-rule error code must not be empty")]
pub struct EmptyErrorCode;

/// Stable, non-empty key of a broken rule.
///
/// Domain code declares its codes as constants with [`ErrorCode::from_static`],
/// which rejects an empty literal at compile time. Codes built at runtime go
/// through the fallible [`ErrorCode::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode(Cow<'static, str>);

impl ErrorCode {
    /// # Panics
    /// Panics if `code` is empty; in a `const` item that is a compile error.
    #[must_use]
    pub const fn from_static(code: &'static str) -> Self {
        assert!(!code.is_empty(), "error code must not be empty");
        Self(Cow::Borrowed(code))
    }

    /// # Errors
    /// Returns `EmptyErrorCode` if `code` is empty or whitespace only.
    pub fn new(code: impl Into<Cow<'static, str>>) -> Result<Self, EmptyErrorCode> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(EmptyErrorCode);
        }
        Ok(Self(code))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ErrorCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ErrorCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ErrorCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<ErrorCode> for &str {
    fn eq(&self, other: &ErrorCode) -> bool {
        *self == other.0
    }
}

/// A single violated business rule.
///
/// Built once by domain code and never mutated afterwards: all fields are
/// private and the parameters are captured as an owned snapshot.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct BrokenRule {
    error_code: ErrorCode,
    severity: Severity,
    rule_type: Cow<'static, str>,
    parameters: Vec<Value>,
}

impl BrokenRule {
    /// Create a rule with the given stable error code and severity.
    pub fn new(error_code: ErrorCode, severity: Severity) -> Self {
        Self {
            error_code,
            severity,
            rule_type: Cow::Borrowed(DEFAULT_RULE_TYPE),
            parameters: Vec::new(),
        }
    }

    /// Shorthand for a rule with `Severity::Error`.
    pub fn error(error_code: ErrorCode) -> Self {
        Self::new(error_code, Severity::Error)
    }

    /// Name the category reported as `errorType`.
    pub fn with_type(mut self, rule_type: impl Into<Cow<'static, str>>) -> Self {
        self.rule_type = rule_type.into();
        self
    }

    /// Attach positional format arguments for the resolved message template.
    pub fn with_params<I, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.parameters = params.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn error_code(&self) -> &str {
        self.error_code.as_str()
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn rule_type(&self) -> &str {
        &self.rule_type
    }

    #[must_use]
    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }
}

impl fmt::Display for BrokenRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error_code, self.severity)
    }
}

/// Attempt to build a `BrokenRuleError` from an empty collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a broken-rule error requires at least one broken rule")]
pub struct EmptyBrokenRules;

/// One or more broken rules raised together by a single operation.
///
/// Never empty: the only fallible constructor rejects an empty collection.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenRuleError {
    rules: Vec<BrokenRule>,
}

impl BrokenRuleError {
    /// # Errors
    /// Returns `EmptyBrokenRules` if `rules` yields nothing.
    pub fn new(rules: impl IntoIterator<Item = BrokenRule>) -> Result<Self, EmptyBrokenRules> {
        let rules: Vec<BrokenRule> = rules.into_iter().collect();
        if rules.is_empty() {
            return Err(EmptyBrokenRules);
        }
        Ok(Self { rules })
    }

    #[must_use]
    pub fn rules(&self) -> &[BrokenRule] {
        &self.rules
    }

    /// Highest severity among the contained rules.
    #[must_use]
    pub fn max_severity(&self) -> Severity {
        self.rules
            .iter()
            .map(BrokenRule::severity)
            .max()
            .unwrap_or(Severity::Error)
    }
}

impl From<BrokenRule> for BrokenRuleError {
    fn from(rule: BrokenRule) -> Self {
        Self { rules: vec![rule] }
    }
}

impl fmt::Display for BrokenRuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("broken rules: ")?;
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{rule}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BrokenRuleError {}

/// Collects violations so an operation reports all of them at once.
///
/// ```
/// use svckit_errors::{BrokenRule, BrokenRules, ErrorCode};
///
/// const NAME_REQUIRED: ErrorCode = ErrorCode::from_static("Name_Required");
///
/// let name = "";
/// let mut rules = BrokenRules::new();
/// rules.check(!name.trim().is_empty(), || BrokenRule::error(NAME_REQUIRED));
/// assert!(rules.into_result().is_err());
/// ```
#[derive(Debug, Default)]
pub struct BrokenRules {
    rules: Vec<BrokenRule>,
}

impl BrokenRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: BrokenRule) {
        self.rules.push(rule);
    }

    /// Record the rule built by `rule` when `holds` is false.
    pub fn check(&mut self, holds: bool, rule: impl FnOnce() -> BrokenRule) {
        if !holds {
            self.rules.push(rule());
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// # Errors
    /// Returns a `BrokenRuleError` carrying every recorded rule, in order.
    pub fn into_result(self) -> Result<(), BrokenRuleError> {
        match BrokenRuleError::new(self.rules) {
            Ok(err) => Err(err),
            Err(EmptyBrokenRules) => Ok(()),
        }
    }
}
