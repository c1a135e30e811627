//! Error model shared by every layer of the products service.
//!
//! This crate is pure data with no HTTP framework dependencies. It provides:
//! - `BrokenRule` / `BrokenRuleError`: business-rule violations, reported in batches
//! - `ServiceError`: the closed set of failure kinds lower layers hand to the HTTP boundary
//! - `ErrorDetail` / `ExceptionDetail`: the JSON error contract returned to callers
//! - `ResourceProvider`: error code to display-template lookup and positional formatting
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod broken_rule;
pub mod error;
pub mod resources;
pub mod wire;

pub use broken_rule::{
    BrokenRule, BrokenRuleError, BrokenRules, EmptyBrokenRules, EmptyErrorCode, ErrorCode, Severity,
};
pub use error::{Cancelled, ServiceError};
pub use resources::{ResourceError, ResourceProvider, StaticResourceProvider, format_template};
pub use wire::{
    ErrorDetail, ExceptionDetail, ExceptionDiagnostic, UNHANDLED_EXCEPTION_CODE,
    VALIDATION_ERROR_CODE, VALIDATION_ERROR_TYPE,
};
