//! Source transformer
//!
//! Normalizes a widget module into plain script the sandbox can run: JSX is
//! lowered onto the element factory, `import`/`export` onto `require`/`exports`,
//! and a leading `"use strict"` is removed because the executor depends on
//! sloppy-mode `with` scoping. Parse failures are not fatal: the original text
//! is returned untouched and the reason is reported as a degradation.

use crate::jsx_lowerer::JsxLowerer;
use crate::module_lowerer::ModuleLowerer;
use crate::options::TransformOptions;
use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast_visit::VisitMut;
use oxc_codegen::Codegen;
use oxc_parser::{Parser, ParserReturn};
use oxc_span::SourceType;
use regex::Regex;

lazy_static! {
    static ref LEADING_USE_STRICT: Regex = Regex::new(r#"^\s*['"]use strict['"];?"#).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    pub code: String,
    /// Why normalization was skipped, if it was.
    pub degraded: Option<String>,
}

impl TransformOutcome {
    fn untouched(source: &str) -> Self {
        Self {
            code: source.to_string(),
            degraded: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

pub fn transform_source(source: &str, options: &TransformOptions) -> TransformOutcome {
    if !options.enabled {
        return TransformOutcome::untouched(source);
    }

    match normalize(source, options) {
        Ok(code) => TransformOutcome {
            code,
            degraded: None,
        },
        Err(message) => {
            tracing::warn!(
                "JSX transform failed, executing the original source instead: {}",
                message
            );
            TransformOutcome {
                code: source.to_string(),
                degraded: Some(message),
            }
        }
    }
}

fn normalize(source: &str, options: &TransformOptions) -> Result<String, String> {
    let allocator = Allocator::default();

    // Script first, module second: the same order an "unambiguous" loader uses.
    let script_type = SourceType::default().with_module(false).with_jsx(true);
    let mut ret = Parser::new(&allocator, source, script_type).parse();
    if !ret.errors.is_empty() {
        let module_type = SourceType::default().with_module(true).with_jsx(true);
        let module_ret = Parser::new(&allocator, source, module_type).parse();
        if !module_ret.errors.is_empty() {
            return Err(describe_parse_errors(&ret));
        }
        ret = module_ret;
    }

    let mut program = ret.program;
    program
        .directives
        .retain(|directive| directive.directive != "use strict");

    let mut jsx = JsxLowerer::new(&allocator, &options.pragma, &options.pragma_frag);
    jsx.visit_program(&mut program);

    let mut modules = ModuleLowerer::new(&allocator);
    if options.lower_modules {
        modules.lower_program(&mut program);
    }

    tracing::debug!(
        jsx_nodes = jsx.lowered,
        module_statements = modules.lowered,
        "widget source normalized"
    );

    let code = Codegen::new().build(&program).code;
    Ok(strip_use_strict(&code))
}

pub(crate) fn strip_use_strict(code: &str) -> String {
    LEADING_USE_STRICT.replace(code, "").into_owned()
}

fn describe_parse_errors(ret: &ParserReturn<'_>) -> String {
    ret.errors
        .iter()
        .map(|error| error.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
