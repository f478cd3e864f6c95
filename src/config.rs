//! Configuration for filter parsing and PATCH application.
//!
//! Both structs are plain values with sensible defaults; build them once and
//! pass them by reference to the parser or the patch engine.

/// Limits applied while parsing filter and path expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    /// Maximum filter length in bytes.
    pub max_length: usize,
    /// Maximum nesting of groups, `not` and value-path brackets.
    pub max_depth: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_length: 4096,
            max_depth: 32,
        }
    }
}

impl FilterConfig {
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Policy for the patch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchConfig {
    /// Limits for paths and value filters inside PATCH operations.
    pub filter: FilterConfig,
    /// Rewrite `remove` operations that carry `[{"value": id}, ...]` instead
    /// of a value filter into one filtered removal per id.
    pub normalize_member_removal: bool,
    /// Reject values whose JSON shape does not fit the attribute type.
    pub enforce_value_types: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            normalize_member_removal: true,
            enforce_value_types: true,
        }
    }
}

impl PatchConfig {
    pub fn with_filter_config(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_member_removal_normalization(mut self, enabled: bool) -> Self {
        self.normalize_member_removal = enabled;
        self
    }

    pub fn with_value_type_enforcement(mut self, enabled: bool) -> Self {
        self.enforce_value_types = enabled;
        self
    }
}
