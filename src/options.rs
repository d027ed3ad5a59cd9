//! Extraction configuration.
//!
//! Every field has a default so callers (and the napi bridge, which receives
//! these as JSON) only spell out what they want to change.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PRAGMA: &str = "React.createElement";
pub const DEFAULT_PRAGMA_FRAG: &str = "React.Fragment";
pub const DEFAULT_UI_LIBRARY: &str = "react";

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_LOOP_ITERATION_LIMIT: u64 = 1_000_000;
pub const DEFAULT_RECURSION_LIMIT: usize = 512;
pub const DEFAULT_STACK_SIZE_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE TRANSFORM
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// When false the source is executed exactly as supplied.
    pub enabled: bool,
    /// Dotted path of the element factory JSX elements are lowered to.
    pub pragma: String,
    /// Dotted path used as the tag of lowered `<>...</>` fragments.
    pub pragma_frag: String,
    /// Rewrite `import`/`export` statements onto `require`/`exports`.
    pub lower_modules: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            pragma: DEFAULT_PRAGMA.to_string(),
            pragma_frag: DEFAULT_PRAGMA_FRAG.to_string(),
            lower_modules: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractOptions {
    pub transform: TransformOptions,
    /// Package name `require` answers with the framework shim.
    pub ui_library: String,
    /// Wall-clock budget for one extraction. Zero disables it.
    pub timeout_ms: u64,
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    /// Engine stack limit in bytes.
    pub stack_size_limit: usize,
    /// OS stack size of the sandbox worker thread.
    pub worker_stack_size: usize,
    /// Fail with `IncompleteDescriptor` instead of tolerating missing fields.
    pub require_fields: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            transform: TransformOptions::default(),
            ui_library: DEFAULT_UI_LIBRARY.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            loop_iteration_limit: DEFAULT_LOOP_ITERATION_LIMIT,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            stack_size_limit: DEFAULT_STACK_SIZE_LIMIT,
            worker_stack_size: DEFAULT_WORKER_STACK_SIZE,
            require_fields: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options: ExtractOptions =
            serde_json::from_str(r#"{ "timeoutMs": 250, "transform": { "pragma": "h" } }"#)
                .unwrap();

        assert_eq!(options.timeout_ms, 250);
        assert_eq!(options.transform.pragma, "h");
        assert_eq!(options.transform.pragma_frag, DEFAULT_PRAGMA_FRAG);
        assert!(options.transform.enabled);
        assert_eq!(options.ui_library, "react");
        assert!(!options.require_fields);
    }
}
