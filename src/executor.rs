//! Executor
//!
//! Runs normalized module text against a [`ResolvableScope`]. The text is
//! wrapped as
//!
//! ```text
//! (function (global) {
//! with (global) {
//!   ...module...
//! }
//! })
//! ```
//!
//! and the resulting function is called with the scope proxy as both `this`
//! and its only argument, so every bare identifier resolves through the proxy
//! before the engine's own globals are consulted.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use boa_engine::object::builtins::JsFunction;
use boa_engine::vm::RuntimeLimits;
use boa_engine::{Context, JsError, JsValue, Source};

use crate::error::ExtractError;
use crate::options::ExtractOptions;
use crate::scope::ResolvableScope;

pub const SCOPE_PARAMETER: &str = "global";

const WORKER_NAME: &str = "widget-sandbox";

thread_local! {
    static CANCELLED: RefCell<Option<Arc<AtomicBool>>> = const { RefCell::new(None) };
}

/// Whether the caller waiting on the current worker thread has given up on it.
/// Always false outside [`run_isolated`].
pub fn worker_cancelled() -> bool {
    CANCELLED.with(|slot| {
        slot.borrow()
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    })
}

pub fn wrap_source(code: &str) -> String {
    format!(
        "(function ({param}) {{\nwith ({param}) {{\n{code}\n}}\n}})",
        param = SCOPE_PARAMETER,
        code = code
    )
}

pub fn configure_limits(context: &mut Context, options: &ExtractOptions) {
    let mut limits = RuntimeLimits::default();
    limits.set_loop_iteration_limit(options.loop_iteration_limit);
    limits.set_recursion_limit(options.recursion_limit);
    limits.set_stack_size_limit(options.stack_size_limit);
    context.set_runtime_limits(limits);
}

pub fn execute(code: &str, scope: &ResolvableScope, context: &mut Context) -> Result<(), ExtractError> {
    let wrapped = wrap_source(code);
    let callable = context
        .eval(Source::from_bytes(wrapped.as_bytes()))
        .map_err(|err| execution_error(&err, context))?;

    let function = callable
        .as_object()
        .and_then(|object| JsFunction::from_object(object.clone()))
        .ok_or_else(|| ExtractError::execution("module wrapper did not evaluate to a function"))?;

    let scope_value = JsValue::from(scope.proxy().clone());
    function
        .call(&scope_value, &[scope_value.clone()], context)
        .map_err(|err| execution_error(&err, context))?;

    tracing::debug!("widget module executed");
    Ok(())
}

fn execution_error(error: &JsError, context: &mut Context) -> ExtractError {
    ExtractError::execution(describe_js_error(error, context))
}

/// `TypeError: x is not a function` for native errors, the thrown value's
/// display form for anything else.
pub fn describe_js_error(error: &JsError, context: &mut Context) -> String {
    match error.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => error.to_string(),
    }
}

/// Runs `job` on a dedicated worker thread and waits at most
/// `options.timeout_ms` for its result. A worker that overruns is abandoned;
/// it owns its engine context, so nothing it does afterwards is observable.
///
/// The abandoned worker is also flagged as cancelled (see
/// [`worker_cancelled`]). Scope lookups then throw, which unwinds module code
/// that keeps resolving identifiers, nested loops included. A module that
/// catches that error and keeps spinning without touching the scope is only
/// stopped by the engine's loop limit, so its thread may keep running.
pub fn run_isolated<T, F>(options: &ExtractOptions, job: F) -> Result<T, ExtractError>
where
    F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let worker_flag = Arc::clone(&cancelled);

    let mut builder = thread::Builder::new().name(WORKER_NAME.to_string());
    if options.worker_stack_size > 0 {
        builder = builder.stack_size(options.worker_stack_size);
    }
    builder
        .spawn(move || {
            CANCELLED.with(|slot| *slot.borrow_mut() = Some(worker_flag));
            let _ = tx.send(job());
        })
        .map_err(|err| ExtractError::sandbox(format!("failed to spawn sandbox worker: {}", err)))?;

    let received = if options.timeout_ms == 0 {
        rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
    } else {
        rx.recv_timeout(Duration::from_millis(options.timeout_ms))
    };

    match received {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            cancelled.store(true, Ordering::Relaxed);
            tracing::warn!(timeout_ms = options.timeout_ms, "widget execution timed out");
            Err(ExtractError::TimedOut {
                timeout_ms: options.timeout_ms,
            })
        }
        Err(RecvTimeoutError::Disconnected) => {
            tracing::error!("sandbox worker terminated without a result");
            Err(ExtractError::sandbox("sandbox worker terminated without a result"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_source_uses_with_scope() {
        let wrapped = wrap_source("exports.a = 1;");
        assert!(wrapped.starts_with("(function (global) {\nwith (global) {\n"));
        assert!(wrapped.contains("exports.a = 1;"));
        assert!(wrapped.ends_with("}\n})"));
    }

    #[test]
    fn test_run_isolated_returns_job_result() {
        let options = ExtractOptions::default();
        let value = run_isolated(&options, || Ok(41 + 1)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_run_isolated_times_out() {
        let options = ExtractOptions {
            timeout_ms: 20,
            ..ExtractOptions::default()
        };
        let result: Result<(), ExtractError> = run_isolated(&options, || {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        assert_eq!(result, Err(ExtractError::TimedOut { timeout_ms: 20 }));
    }

    #[test]
    fn test_timed_out_worker_is_told_to_stop() {
        let options = ExtractOptions {
            timeout_ms: 20,
            ..ExtractOptions::default()
        };
        let (stopped_tx, stopped_rx) = mpsc::channel();
        let result: Result<(), ExtractError> = run_isolated(&options, move || {
            while !worker_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            let _ = stopped_tx.send(());
            Ok(())
        });
        assert_eq!(result, Err(ExtractError::TimedOut { timeout_ms: 20 }));
        assert!(stopped_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(!worker_cancelled());
    }

    #[test]
    fn test_run_isolated_reports_worker_panic() {
        let options = ExtractOptions::default();
        let result: Result<(), ExtractError> = run_isolated(&options, || panic!("worker died"));
        assert!(matches!(result, Err(ExtractError::Sandbox { .. })));
    }
}
