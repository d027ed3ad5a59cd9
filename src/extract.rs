//! Extraction pipeline
//!
//! source -> [`transform_source`] -> fresh engine context on a worker thread
//! (host environment + framework shim + module bindings bound into one scope)
//! -> [`execute`] -> [`extract`] -> report.

use boa_engine::{Context, JsError};
use rayon::prelude::*;
use serde::Serialize;

use crate::descriptor::{extract, ExportLocation, ExportSurface, Extraction, WidgetDescriptor};
use crate::error::{ExtractError, ExtractWarning};
use crate::executor::{configure_limits, describe_js_error, execute, run_isolated};
use crate::host::build_host_environment;
use crate::options::ExtractOptions;
use crate::scope::{bind_scope, module_bindings};
use crate::shim::FrameworkShim;
use crate::transform::transform_source;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub descriptor: WidgetDescriptor,
    pub location: ExportLocation,
    pub warnings: Vec<ExtractWarning>,
    /// Timer/animation-frame registrations still outstanding when the module
    /// finished loading. They were never run.
    pub pending_timers: usize,
    /// Whether the executed text was the normalized form of the source.
    pub transformed: bool,
}

/// Result of running one module inside its own engine context.
#[derive(Debug)]
pub struct SandboxOutcome {
    pub extraction: Extraction,
    pub pending_timers: usize,
}

pub fn extract_widget_info(source: &str) -> Result<WidgetDescriptor, ExtractError> {
    extract_widget_report(source, &ExtractOptions::default()).map(|report| report.descriptor)
}

pub fn extract_widget_report(
    source: &str,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let transformed = transform_source(source, &options.transform);

    let mut warnings = Vec::new();
    if let Some(message) = &transformed.degraded {
        warnings.push(ExtractWarning::TransformDegraded {
            message: message.clone(),
        });
    }
    let was_transformed = options.transform.enabled && !transformed.is_degraded();

    let code = transformed.code;
    let sandbox_options = options.clone();
    let outcome = run_isolated(options, move || run_in_sandbox(&code, &sandbox_options))?;

    let Extraction {
        descriptor,
        location,
        advisories,
    } = outcome.extraction;
    for advisory in &advisories {
        tracing::warn!("{}", advisory);
    }
    warnings.extend(advisories);

    if options.require_fields {
        let missing = descriptor.missing_fields();
        if !missing.is_empty() {
            return Err(ExtractError::IncompleteDescriptor {
                missing: missing.into_iter().map(str::to_string).collect(),
            });
        }
    }

    Ok(ExtractionReport {
        descriptor,
        location,
        warnings,
        pending_timers: outcome.pending_timers,
        transformed: was_transformed,
    })
}

/// Independent extractions in parallel. Results keep the input order.
pub fn extract_many<S>(
    sources: &[S],
    options: &ExtractOptions,
) -> Vec<Result<ExtractionReport, ExtractError>>
where
    S: AsRef<str> + Sync,
{
    sources
        .par_iter()
        .map(|source| extract_widget_report(source.as_ref(), options))
        .collect()
}

/// Builds a pristine environment in a new context and runs `code` in it.
/// Runs on the calling thread; [`extract_widget_report`] wraps it in a worker.
pub fn run_in_sandbox(code: &str, options: &ExtractOptions) -> Result<SandboxOutcome, ExtractError> {
    let mut context = Context::default();
    configure_limits(&mut context, options);

    let host = build_host_environment(&mut context).map_err(|err| setup_failure(&err, &mut context))?;
    let shim = FrameworkShim::build(&mut context, &options.ui_library)
        .map_err(|err| setup_failure(&err, &mut context))?;
    let caller = module_bindings(&mut context, shim.resolver().clone().into());
    let scope = bind_scope(host.bindings(), &shim.bindings(), &caller, &mut context)
        .map_err(|err| setup_failure(&err, &mut context))?;

    tracing::debug!(ui_library = %options.ui_library, "sandbox ready");

    execute(code, &scope, &mut context)?;

    let surface = ExportSurface::read(&scope, &mut context)?;
    let extraction = extract(&surface, &mut context)?;
    let pending_timers = host.timers().borrow().len();

    Ok(SandboxOutcome {
        extraction,
        pending_timers,
    })
}

fn setup_failure(error: &JsError, context: &mut Context) -> ExtractError {
    ExtractError::sandbox(describe_js_error(error, context))
}
