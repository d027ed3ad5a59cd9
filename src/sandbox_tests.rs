use boa_engine::object::JsObject;
use boa_engine::{Context, JsString, JsValue};

use crate::error::ExtractError;
use crate::executor::execute;
use crate::host::{build_host_environment, HostEnvironment, TimerKind};
use crate::scope::{bind_scope, module_bindings, Bindings, ResolvableScope};
use crate::shim::{FrameworkShim, WidgetArchetype};

struct Sandbox {
    context: Context,
    host: HostEnvironment,
    scope: ResolvableScope,
}

impl Sandbox {
    fn new() -> Self {
        let mut context = Context::default();
        let host = build_host_environment(&mut context).unwrap();
        let shim = FrameworkShim::build(&mut context, "react").unwrap();
        let caller = module_bindings(&mut context, shim.resolver().clone().into());
        let scope = bind_scope(host.bindings(), &shim.bindings(), &caller, &mut context).unwrap();
        Self {
            context,
            host,
            scope,
        }
    }

    fn run(&mut self, code: &str) -> Result<(), ExtractError> {
        execute(code, &self.scope, &mut self.context)
    }

    /// Runs `code` and returns `String(exports.result)`.
    fn eval(&mut self, code: &str) -> String {
        self.run(code).unwrap();
        let exports = self.scope.binding("exports", &mut self.context).unwrap().unwrap();
        let exports = exports.as_object().map(|object| object.clone()).unwrap();
        exports
            .get(JsString::from("result"), &mut self.context)
            .unwrap()
            .to_string(&mut self.context)
            .unwrap()
            .to_std_string_escaped()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST EMULATOR
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_document_elements_track_attributes_and_children() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        var el = document.createElement('input');
        el.setAttribute('data-id', 7);
        var child = document.createElement('span');
        el.appendChild(child);
        el.appendChild(document.createTextNode('x'));
        el.removeChild(child);
        exports.result = [
            el.tagName,
            el.getAttribute('data-id'),
            String(el.getAttribute('missing')),
            el.children.length,
            typeof el.value,
            el.classList.contains('a'),
            el.getBoundingClientRect().width
        ].join('|');
        "#,
    );
    assert_eq!(result, "INPUT|7|null|1|string|false|0");
}

#[test]
fn test_document_containers_and_queries() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        document.body.appendChild(document.createElement('div'));
        exports.result = [
            document.body.children.length,
            document.head.tagName,
            document.documentElement.tagName,
            document.readyState,
            String(document.querySelector('.x')),
            document.querySelectorAll('.x').length,
            String(document.getElementById('x'))
        ].join('|');
        "#,
    );
    assert_eq!(result, "1|HEAD|HTML|complete|null|0|null");
}

#[test]
fn test_console_accepts_any_method() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        console.log('x');
        console.table([]);
        console.somethingVendorSpecific(1, 2);
        exports.result = typeof console.whatever;
        "#,
    );
    assert_eq!(result, "function");
}

#[test]
fn test_performance_now_is_monotonic() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        var a = performance.now();
        for (var i = 0; i < 1000; i++) {}
        var b = performance.now();
        exports.result = typeof a === 'number' && b >= a && performance.timeOrigin > 0;
        "#,
    );
    assert_eq!(result, "true");
}

#[test]
fn test_storage_is_backed_by_call_local_map() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        localStorage.setItem('k', 42);
        localStorage.setItem('gone', 'x');
        localStorage.removeItem('gone');
        sessionStorage.setItem('s', 'v');
        exports.result = [
            localStorage.getItem('k'),
            String(localStorage.getItem('nope')),
            localStorage.length,
            localStorage.key(0),
            String(localStorage.key(5)),
            sessionStorage.length
        ].join('|');
        sessionStorage.clear();
        "#,
    );
    assert_eq!(result, "42|null|1|k|null|1");
    assert_eq!(sandbox.host.local_storage().borrow().get("k"), Some("42"));
    assert!(sandbox.host.session_storage().borrow().is_empty());
}

#[test]
fn test_timers_are_recorded_not_run() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        var hits = 0;
        var a = setTimeout(function () { hits++; }, 10);
        var b = setInterval(function () { hits++; }, 10);
        requestAnimationFrame(function () { hits++; });
        queueMicrotask(function () { hits++; });
        clearInterval(b);
        exports.result = [typeof a, a > 0, hits].join('|');
        "#,
    );
    assert_eq!(result, "number|true|0");

    let timers = sandbox.host.timers();
    let timers = timers.borrow();
    assert_eq!(timers.len(), 3);
    let kinds: Vec<TimerKind> = timers.pending().map(|timer| timer.kind).collect();
    assert_eq!(
        kinds,
        vec![TimerKind::Timeout, TimerKind::AnimationFrame, TimerKind::Microtask]
    );
}

#[test]
fn test_network_stand_ins_are_inert() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        var xhr = new XMLHttpRequest();
        xhr.open('GET', '/api');
        xhr.setRequestHeader('a', 'b');
        xhr.send();
        var image = new Image();
        var pending = fetch('/api');
        exports.result = [xhr.status, xhr.statusText, image.src === '', pending instanceof Promise].join('|');
        "#,
    );
    assert_eq!(result, "200|OK|true|true");
}

#[test]
fn test_descriptor_objects_have_static_fields() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        exports.result = [
            navigator.language,
            navigator.languages.length,
            navigator.userAgent.indexOf('Chrome') > 0,
            screen.orientation.type,
            screen.width,
            location.href === '',
            history.length,
            matchMedia('(min-width: 1px)').matches,
            innerWidth
        ].join('|');
        "#,
    );
    assert_eq!(result, "en-US|2|true|landscape-primary|1920|true|1|false|1920");
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE BINDER
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_unknown_identifiers_read_as_undefined() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval("exports.result = typeof someUnknownThing + '|' + String(someUnknownThing);");
    assert_eq!(result, "undefined|undefined");
}

#[test]
fn test_window_aliases_resolve_to_scope() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        window.foo = 5;
        exports.result = [foo, globalThis === window, self === window, window.document === document].join('|');
        "#,
    );
    assert_eq!(result, "5|true|true|true");
}

#[test]
fn test_engine_builtins_fall_through() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        "exports.result = [Math.max(1, 2), JSON.stringify({ a: 1 }), typeof Promise, Array.isArray([])].join('|');",
    );
    assert_eq!(result, r#"2|{"a":1}|function|true"#);
}

#[test]
fn test_dynamic_functions_compile_inside_scope() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        var g = Function('return this')();
        g.setThroughFunction = 1;
        window.offset = 10;
        var add = new Function('a', 'b', 'return a + b + offset');
        exports.result = [
            new Function('return typeof document')(),
            g === window,
            setThroughFunction,
            add(1, 2),
            add instanceof Function,
            typeof Function.prototype.call
        ].join('|');
        "#,
    );
    assert_eq!(result, "object|true|1|13|true|function");

    let global = sandbox.context.global_object();
    assert!(!global
        .has_property(JsString::from("setThroughFunction"), &mut sandbox.context)
        .unwrap());
}

#[test]
fn test_dynamic_code_failures_yield_undefined() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        exports.result = [
            String(new Function('throw new Error("boom")')()),
            String(Function('return (')()),
            String(eval('{')),
            eval('1 + 1'),
            eval('typeof localStorage'),
            eval(5)
        ].join('|');
        "#,
    );
    assert_eq!(result, "undefined|undefined|undefined|2|object|5");
}

#[test]
fn test_caller_layer_can_override_dynamic_code() {
    let mut context = Context::default();
    let mut caller = Bindings::new();
    caller.insert("eval", 7);
    let scope = bind_scope(&Bindings::new(), &Bindings::new(), &caller, &mut context).unwrap();

    assert_eq!(scope.lookup("eval", &mut context).unwrap().as_number(), Some(7.0));
    assert!(scope.binding("Function", &mut context).unwrap().is_some());
}

#[test]
fn test_layer_precedence() {
    let mut context = Context::default();
    let mut host = Bindings::new();
    host.insert("x", 1);
    host.insert("onlyHost", 10);
    let mut shim = Bindings::new();
    shim.insert("x", 2);
    shim.insert("onlyShim", 20);
    let mut caller = Bindings::new();
    caller.insert("x", 3);

    let scope = bind_scope(&host, &shim, &caller, &mut context).unwrap();

    assert_eq!(scope.lookup("x", &mut context).unwrap().as_number(), Some(3.0));
    assert_eq!(scope.lookup("onlyHost", &mut context).unwrap().as_number(), Some(10.0));
    assert_eq!(scope.lookup("onlyShim", &mut context).unwrap().as_number(), Some(20.0));
    assert!(scope.lookup("nothingHere", &mut context).unwrap().is_undefined());
    assert!(scope.contains("nothingHere", &mut context).unwrap());
    assert!(scope.binding("nothingHere", &mut context).unwrap().is_none());
    assert!(scope.binding("Math", &mut context).unwrap().is_none());
    assert!(scope.lookup("Math", &mut context).unwrap().is_object());

    let window = scope.lookup("window", &mut context).unwrap();
    let window: JsObject = window.as_object().map(|object| object.clone()).unwrap();
    assert!(JsObject::equals(&window, scope.proxy()));
}

#[test]
fn test_bindings_replace_in_place() {
    let mut bindings = Bindings::new();
    bindings.insert("a", 1);
    bindings.insert("b", 2);
    bindings.insert("a", JsValue::from(JsString::from("again")));
    assert_eq!(bindings.len(), 2);
    let names: Vec<&str> = bindings.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(bindings.get("a").map(|value| value.is_string()).unwrap_or(false));
}

// ═══════════════════════════════════════════════════════════════════════════════
// FRAMEWORK SHIM
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_require_resolves_library_and_degrades_unknown() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        var R = require('react');
        var J = require('react/jsx-runtime');
        var other = require('lodash');
        var nothing = require();
        exports.result = [R === React, J === React, typeof other, Object.keys(other).length, typeof nothing].join('|');
        "#,
    );
    assert_eq!(result, "true|true|object|0|object");
}

#[test]
fn test_element_factory_is_structural() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        var node = React.createElement('div', null, 'a', 'b');
        var auto = React.jsx('span', { id: 1 });
        exports.result = [node.tag, typeof node.props, node.children.length, auto.props.id, React.Fragment].join('|');
        "#,
    );
    assert_eq!(result, "div|object|2|1|react.fragment");
}

#[test]
fn test_archetypes_can_be_subclassed() {
    let mut sandbox = Sandbox::new();
    let result = sandbox.eval(
        r#"
        class A extends VisibleWidget {}
        class B extends InvisibleWidget {}
        class C extends React.Component {}
        var a = new A({ x: 1 });
        var b = new B();
        b.setProps({});
        b.emit('change', 1);
        b.widgetError('oops', null);
        exports.result = [typeof a.render, typeof b.render, a.props.x, typeof b.props, new C({ y: 2 }).props.y].join('|');
        "#,
    );
    assert_eq!(result, "function|undefined|1|object|2");
}

#[test]
fn test_shim_exposes_both_archetypes() {
    let mut context = Context::default();
    let shim = FrameworkShim::build(&mut context, "react").unwrap();
    for archetype in WidgetArchetype::ALL {
        let class = shim.archetype(archetype).unwrap();
        assert!(class.is_callable());
    }
    let bindings = shim.bindings();
    assert!(bindings.contains("React"));
    assert!(bindings.contains("VisibleWidget"));
    assert!(bindings.contains("InvisibleWidget"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXECUTOR
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_explicit_throw_becomes_execution_failed() {
    let mut sandbox = Sandbox::new();
    let err = sandbox.run("throw new Error('boom');").unwrap_err();
    match err {
        ExtractError::ExecutionFailed { message } => assert!(message.contains("boom"), "{}", message),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_calling_missing_capability_fails_execution() {
    let mut sandbox = Sandbox::new();
    let err = sandbox.run("document.body.notAFunction();").unwrap_err();
    assert!(matches!(err, ExtractError::ExecutionFailed { .. }));
}

#[test]
fn test_syntax_error_fails_execution() {
    let mut sandbox = Sandbox::new();
    let err = sandbox.run("this is not ] javascript").unwrap_err();
    assert!(matches!(err, ExtractError::ExecutionFailed { .. }));
}

#[test]
fn test_execution_does_not_touch_engine_globals() {
    let mut sandbox = Sandbox::new();
    sandbox.run("window.leaked = 1; var alsoLeaked = 2;").unwrap();
    let global = sandbox.context.global_object();
    assert!(!global
        .has_property(JsString::from("leaked"), &mut sandbox.context)
        .unwrap());
    assert!(!global
        .has_property(JsString::from("alsoLeaked"), &mut sandbox.context)
        .unwrap());
}
