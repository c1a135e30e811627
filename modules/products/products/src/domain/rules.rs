//! Business rules for product input.

use svckit_errors::{BrokenRule, BrokenRules, ErrorCode};

pub const NAME_REQUIRED: ErrorCode = ErrorCode::from_static("Name_Required");
pub const NAME_TOO_LONG: ErrorCode = ErrorCode::from_static("Name_TooLong");
pub const PRODUCT_ALREADY_EXISTS: ErrorCode = ErrorCode::from_static("Product_AlreadyExists");

/// Check the rules that depend only on the name itself.
///
/// `name` is expected to be trimmed already.
pub fn check_name(rules: &mut BrokenRules, name: &str, max_len: usize) {
    rules.check(!name.is_empty(), || BrokenRule::error(NAME_REQUIRED));
    rules.check(name.chars().count() <= max_len, || {
        BrokenRule::error(NAME_TOO_LONG).with_params([max_len])
    });
}

#[must_use]
pub fn already_exists(name: &str) -> BrokenRule {
    BrokenRule::error(PRODUCT_ALREADY_EXISTS).with_params([name])
}
