//! Default display messages for the module's error codes.

use svckit_errors::StaticResourceProvider;

const MESSAGES: &str = include_str!("messages.json");

/// Catalog shipped with the module; the server layers config overrides on top.
///
/// # Errors
/// Returns an error if the embedded catalog is malformed.
pub fn default_resources() -> Result<StaticResourceProvider, serde_json::Error> {
    StaticResourceProvider::from_json(MESSAGES)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::rules;
    use svckit_errors::{ErrorCode, ResourceProvider, UNHANDLED_EXCEPTION_CODE};

    #[test]
    fn every_rule_code_has_a_message() {
        let catalog = default_resources().unwrap();
        let codes = [
            rules::NAME_REQUIRED,
            rules::NAME_TOO_LONG,
            rules::PRODUCT_ALREADY_EXISTS,
        ];
        let codes = codes.iter().map(ErrorCode::as_str);
        for code in codes.chain([UNHANDLED_EXCEPTION_CODE]) {
            assert!(catalog.resolve(code).is_ok(), "missing message for {code}");
        }
    }
}
