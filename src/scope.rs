//! Scope binder
//!
//! Widget code refers to browser globals as bare identifiers (`document`,
//! `localStorage`, `React`). Rather than touching the engine's real global
//! object, every binding is merged into one table and exposed through a Proxy
//! that the executor installs with `with (global) { ... }`:
//!
//! - the `has` trap always answers true, so no identifier lookup ever escapes
//!   to the real global scope and undeclared names never throw (once a
//!   timed-out worker is cancelled it throws instead);
//! - the `get` trap answers self-reference names (`window`, `globalThis`, ...)
//!   with the proxy itself, then the merged table, then the engine's builtins
//!   (`Math`, `JSON`, `Promise`), and `undefined` for everything else.
//!
//! Writes land on the table, which is how `exports.type = ...` and
//! `module.exports = ...` become observable after execution.
//!
//! `Function` and `eval` are replaced by stand-ins that compile their body
//! inside the same scope, so dynamically built code sees the emulated host
//! and `Function('return this')()` yields the scope rather than the engine's
//! global. A body that fails to compile or throws yields `undefined`.

use boa_engine::object::builtins::{JsFunction, JsProxyBuilder};
use boa_engine::object::{JsObject, ObjectInitializer};
use boa_engine::property::{Attribute, PropertyKey};
use boa_engine::{Context, JsArgs, JsNativeError, JsResult, JsString, JsValue, Source};

use crate::executor::worker_cancelled;

/// Names that resolve to the scope object itself.
pub const SELF_REFERENCES: &[&str] = &[
    "window",
    "globalThis",
    "self",
    "global",
    "top",
    "parent",
    "frames",
];

/// Stand-ins installed on every scope unless a layer already binds the name.
pub const DYNAMIC_CODE_BINDINGS: &[&str] = &["Function", "eval"];

/// Evaluated in the engine's own global scope, where `Function` is still the
/// builtin constructor. Called with the scope proxy.
const DYNAMIC_CODE_PRELUDE: &str = r#"(function (scope) {
    var NativeFunction = Function;
    var slice = Array.prototype.slice;

    function compile(params, body) {
        var factory = NativeFunction(
            'scope',
            'with (scope) { return function anonymous(' + params + '\n) {\n' + body + '\n}; }'
        );
        return factory(scope);
    }

    function ScopedFunction() {
        var args = slice.call(arguments);
        var body = args.length > 0 ? String(args.pop()) : '';
        var params = args.map(String).join(',');
        var compiled = null;
        try {
            compiled = compile(params, body);
        } catch (e) {
            compiled = null;
        }
        return function () {
            if (compiled === null) {
                return undefined;
            }
            try {
                return compiled.apply(scope, arguments);
            } catch (e) {
                return undefined;
            }
        };
    }

    ScopedFunction.prototype = NativeFunction.prototype;

    function scopedEval(code) {
        if (typeof code !== 'string') {
            return code;
        }
        var compiled;
        try {
            compiled = compile('', 'return (' + code + '\n);');
        } catch (e) {
            try {
                compiled = compile('', code);
            } catch (e2) {
                return undefined;
            }
        }
        try {
            return compiled.call(scope);
        } catch (e) {
            return undefined;
        }
    }

    return { Function: ScopedFunction, eval: scopedEval };
})"#;

// ═══════════════════════════════════════════════════════════════════════════════
// BINDINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered name -> value set. Inserting an existing name replaces its value in place.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, JsValue)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<JsValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&JsValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVABLE SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct ResolvableScope {
    table: JsObject,
    proxy: JsObject,
}

impl ResolvableScope {
    /// The object handed to the executor as the `with` target.
    pub fn proxy(&self) -> &JsObject {
        &self.proxy
    }

    /// Resolves `name` exactly as a bare identifier inside the module would.
    pub fn lookup(&self, name: &str, context: &mut Context) -> JsResult<JsValue> {
        self.proxy.get(JsString::from(name), context)
    }

    pub fn contains(&self, name: &str, context: &mut Context) -> JsResult<bool> {
        self.proxy.has_property(JsString::from(name), context)
    }

    /// Current value bound under `name` in the merged table, without fall-through.
    pub fn binding(&self, name: &str, context: &mut Context) -> JsResult<Option<JsValue>> {
        let key = JsString::from(name);
        if !self.table.has_own_property(key.clone(), context)? {
            return Ok(None);
        }
        self.table.get(key, context).map(Some)
    }
}

/// Merges the three binding layers (later layers win on conflicts) and wraps
/// the result in the resolving proxy.
pub fn bind_scope(
    host: &Bindings,
    shim: &Bindings,
    caller: &Bindings,
    context: &mut Context,
) -> JsResult<ResolvableScope> {
    let table = JsObject::with_null_proto();
    for layer in [host, shim, caller] {
        for (name, value) in layer.iter() {
            table.create_data_property_or_throw(JsString::from(name), value.clone(), context)?;
        }
    }

    let proxy: JsObject = JsProxyBuilder::new(table.clone())
        .has(scope_has)
        .get(scope_get)
        .build(context)
        .into();

    install_dynamic_code(&table, &proxy, context)?;

    Ok(ResolvableScope { table, proxy })
}

fn install_dynamic_code(table: &JsObject, proxy: &JsObject, context: &mut Context) -> JsResult<()> {
    let factory = context.eval(Source::from_bytes(DYNAMIC_CODE_PRELUDE))?;
    let Some(factory) = factory
        .as_object()
        .and_then(|object| JsFunction::from_object(object.clone()))
    else {
        return Ok(());
    };
    let stand_ins = factory.call(&JsValue::undefined(), &[proxy.clone().into()], context)?;
    let Some(stand_ins) = stand_ins.as_object() else {
        return Ok(());
    };

    for name in DYNAMIC_CODE_BINDINGS {
        let key = JsString::from(*name);
        if table.has_own_property(key.clone(), context)? {
            continue;
        }
        let value = stand_ins.get(key.clone(), context)?;
        table.create_data_property_or_throw(key, value, context)?;
    }
    Ok(())
}

fn scope_has(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    if worker_cancelled() {
        return Err(JsNativeError::error()
            .with_message("widget execution cancelled after timeout")
            .into());
    }
    Ok(JsValue::from(true))
}

/// `get(target, key, receiver)`
fn scope_get(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let Some(table) = args.get_or_undefined(0).as_object() else {
        return Ok(JsValue::undefined());
    };
    let key = args.get_or_undefined(1).to_property_key(context)?;

    if let PropertyKey::String(name) = &key {
        let name = name.to_std_string_escaped();
        if SELF_REFERENCES.contains(&name.as_str()) {
            return Ok(args.get_or_undefined(2).clone());
        }
    }

    if table.has_property(key.clone(), context)? {
        return table.get(key, context);
    }

    let builtins = context.global_object();
    if builtins.has_property(key.clone(), context)? {
        return builtins.get(key, context);
    }

    Ok(JsValue::undefined())
}

/// Caller layer for a single execution: a fresh `exports` object, a `module`
/// whose `exports` starts out as that same object, and the `require` resolver.
pub fn module_bindings(context: &mut Context, require: JsValue) -> Bindings {
    let exports = ObjectInitializer::new(context).build();
    let module = ObjectInitializer::new(context)
        .property(JsString::from("exports"), exports.clone(), Attribute::all())
        .property(JsString::from("id"), JsString::from("."), Attribute::all())
        .build();

    let mut bindings = Bindings::new();
    bindings.insert("exports", exports);
    bindings.insert("module", module);
    bindings.insert("require", require);
    bindings
}
