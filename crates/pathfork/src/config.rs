//! Router configuration.

use serde::Deserialize;

/// Path handling options applied to both registered patterns and request
/// paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Treat `/users/` like `/users` (the root `/` is kept).
    pub ignore_trailing_slash: bool,

    /// Collapse runs of `/` into one before routing.
    pub ignore_duplicate_slashes: bool,

    /// Percent-decode captured parameter values (default: true).
    ///
    /// Matching always runs on the raw path, so an encoded `%2F` never
    /// splits a segment.
    pub decode_params: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            ignore_trailing_slash: false,
            ignore_duplicate_slashes: false,
            decode_params: true,
        }
    }
}

impl RouterConfig {
    /// Enable or disable trailing-slash insensitivity.
    pub fn ignore_trailing_slash(mut self, enabled: bool) -> Self {
        self.ignore_trailing_slash = enabled;
        self
    }

    /// Enable or disable duplicate-slash collapsing.
    pub fn ignore_duplicate_slashes(mut self, enabled: bool) -> Self {
        self.ignore_duplicate_slashes = enabled;
        self
    }

    /// Enable or disable percent-decoding of parameter values.
    pub fn decode_params(mut self, enabled: bool) -> Self {
        self.decode_params = enabled;
        self
    }
}
