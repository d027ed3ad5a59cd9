//! # Widget Sandbox
//!
//! Extracts the metadata descriptor (`type`, `title`, `icon`, `version`,
//! `isInvisibleWidget`, `isGlobalWidget`) from a widget module's source text
//! by running the module far enough to populate its exports.
//!
//! ## Pipeline
//!
//! 1. **Transform**: JSX and `import`/`export` are lowered with oxc. A source
//!    oxc cannot parse is executed as-is and the call reports `TransformDegraded`.
//! 2. **Environment**: a fresh boa `Context` per call, holding a synthetic host
//!    (document, console, storage, timers, network stand-ins), the UI-library
//!    shim, and the module's own `exports`/`module`/`require`.
//! 3. **Execution**: the module runs inside `with (scope) { ... }` where `scope`
//!    is a Proxy whose `has` trap always answers true. Unknown identifiers read
//!    as `undefined`; `window`/`globalThis`/`self` read as the scope itself.
//!    `Function` and `eval` compile their code inside the same scope.
//! 4. **Extraction**: the first object found at `module.exports.type`,
//!    `module.exports.types`, `exports.type`, `exports.types` is the descriptor.
//!
//! ## Isolation
//!
//! Nothing survives a call: storage, timers and export objects live in the
//! call's own context, which runs on its own worker thread under a wall-clock
//! budget and engine loop/recursion limits. Scheduled timer callbacks are
//! recorded and never run.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod descriptor;
mod error;
mod executor;
mod extract;
mod host;
mod jsx_lowerer;
mod module_lowerer;
mod options;
mod scope;
mod shim;
mod transform;

#[cfg(test)]
mod sandbox_tests;

pub use descriptor::{
    check_descriptor, extract, has_widget_suffix, ExportLocation, ExportSurface, Extraction,
    FieldValue, WidgetDescriptor, REQUIRED_FIELDS, WIDGET_TYPE_SUFFIX,
};
pub use error::*;
pub use executor::{
    configure_limits, describe_js_error, execute, run_isolated, worker_cancelled, wrap_source,
};
pub use extract::{
    extract_many, extract_widget_info, extract_widget_report, run_in_sandbox, ExtractionReport,
    SandboxOutcome,
};
pub use host::{
    build_host_environment, HostEnvironment, PendingTimer, SharedStorage, SharedTimers,
    StorageArea, TimerKind, TimerQueue,
};
pub use options::{ExtractOptions, TransformOptions};
pub use scope::{
    bind_scope, module_bindings, Bindings, ResolvableScope, DYNAMIC_CODE_BINDINGS, SELF_REFERENCES,
};
pub use shim::{
    build_element_factory, build_require_resolver, FrameworkShim, WidgetArchetype, FRAGMENT_TAG,
};
pub use transform::{transform_source, TransformOutcome};

/// Node bridge: `optionsJson` is an optional JSON-encoded `ExtractOptions`.
/// Resolves to the JSON-encoded `ExtractionReport`; failures are thrown as
/// `[code] message`.
#[cfg(feature = "napi")]
#[napi]
pub fn extract_widget_info_native(
    source: String,
    options_json: Option<String>,
) -> napi::Result<String> {
    let options: ExtractOptions = match options_json {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| napi::Error::from_reason(format!("Options parse error: {}", e)))?,
        None => ExtractOptions::default(),
    };

    let report = extract_widget_report(&source, &options)
        .map_err(|e| napi::Error::from_reason(format!("[{}] {}", e.code(), e)))?;

    serde_json::to_string(&report)
        .map_err(|e| napi::Error::from_reason(format!("Report serialization error: {}", e)))
}
