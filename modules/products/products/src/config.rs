use serde::{Deserialize, Serialize};

/// Products module configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductsConfig {
    /// Longest accepted product name, in characters.
    pub max_name_len: usize,
}

impl Default for ProductsConfig {
    fn default() -> Self {
        Self { max_name_len: 100 }
    }
}
