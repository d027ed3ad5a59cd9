//! Host emulator
//!
//! Builds the synthetic browser globals a widget module may touch while it is
//! loaded: `document`, `console`, `performance`, storage areas, timers,
//! `navigator`/`location`/`history`/`screen`, and inert network stand-ins.
//!
//! Everything is constructed fresh per [`build_host_environment`] call inside
//! the caller's engine context. Nothing here reads or writes the engine's
//! real global object; the values are only reachable through the bindings the
//! scope binder layers onto its proxy.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use boa_engine::object::builtins::{JsArray, JsProxyBuilder};
use boa_engine::object::{FunctionObjectBuilder, JsObject, ObjectInitializer};
use boa_engine::property::{Attribute, PropertyKey};
use boa_engine::{Context, JsArgs, JsResult, JsString, JsValue, NativeFunction, Source};
use boa_gc::{empty_trace, Finalize, Trace};

use crate::scope::Bindings;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/99.0.9999.99 Safari/537.36";

/// Delay recorded for `requestAnimationFrame` registrations.
pub const ANIMATION_FRAME_MS: u64 = 16;

pub const CONSOLE_METHODS: &[&str] = &[
    "log",
    "info",
    "warn",
    "error",
    "debug",
    "trace",
    "dir",
    "dirxml",
    "table",
    "group",
    "groupCollapsed",
    "groupEnd",
    "clear",
    "count",
    "countReset",
    "assert",
    "time",
    "timeLog",
    "timeEnd",
    "timeStamp",
    "profile",
    "profileEnd",
];

type HostFn = fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>;

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory backing store for one `localStorage`/`sessionStorage` stand-in.
#[derive(Debug, Default)]
pub struct StorageArea {
    entries: BTreeMap<String, String>,
}

impl StorageArea {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Key at `index` in the area's iteration order.
    pub fn key(&self, index: usize) -> Option<&str> {
        self.entries.keys().nth(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type SharedStorage = Rc<RefCell<StorageArea>>;

// ═══════════════════════════════════════════════════════════════════════════════
// TIMERS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Timeout,
    Interval,
    AnimationFrame,
    Microtask,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: u32,
    pub kind: TimerKind,
    pub delay_ms: u64,
}

/// Registrations made by the module. Callbacks are recorded, never invoked.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u32,
    pending: BTreeMap<u32, PendingTimer>,
}

impl TimerQueue {
    /// Ids start at 1 so a returned handle is always truthy.
    pub fn schedule(&mut self, kind: TimerKind, delay_ms: u64) -> u32 {
        self.next_id += 1;
        let id = self.next_id;
        self.pending.insert(id, PendingTimer { id, kind, delay_ms });
        id
    }

    pub fn cancel(&mut self, id: u32) -> bool {
        self.pending.remove(&id).is_some()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingTimer> {
        self.pending.values()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

pub type SharedTimers = Rc<RefCell<TimerQueue>>;

// ═══════════════════════════════════════════════════════════════════════════════
// NATIVE CAPTURES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Finalize)]
struct StorageCapture {
    area: SharedStorage,
}

unsafe impl Trace for StorageCapture {
    empty_trace!();
}

#[derive(Finalize)]
struct TimerCapture {
    timers: SharedTimers,
    kind: TimerKind,
}

unsafe impl Trace for TimerCapture {
    empty_trace!();
}

#[derive(Finalize)]
struct ClockCapture {
    origin: Instant,
    origin_epoch_ms: f64,
}

unsafe impl Trace for ClockCapture {
    empty_trace!();
}

impl ClockCapture {
    fn start() -> Self {
        let origin_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        Self {
            origin: Instant::now(),
            origin_epoch_ms,
        }
    }

    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════════

pub struct HostEnvironment {
    bindings: Bindings,
    local_storage: SharedStorage,
    session_storage: SharedStorage,
    timers: SharedTimers,
}

impl HostEnvironment {
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn local_storage(&self) -> SharedStorage {
        Rc::clone(&self.local_storage)
    }

    pub fn session_storage(&self) -> SharedStorage {
        Rc::clone(&self.session_storage)
    }

    pub fn timers(&self) -> SharedTimers {
        Rc::clone(&self.timers)
    }
}

/// Network and media classes are plain JS so that `new XMLHttpRequest()` and
/// `fetch(...).then(...)` behave like real constructors and promises.
const HOST_PRELUDE: &str = r#"(function () {
    class XMLHttpRequest {
        constructor() {
            this.readyState = 0;
            this.status = 200;
            this.statusText = 'OK';
            this.responseText = '';
            this.response = '';
            this.onload = null;
            this.onerror = null;
            this.onreadystatechange = null;
        }
        open() {}
        send() {}
        setRequestHeader() {}
        getResponseHeader() { return null; }
        getAllResponseHeaders() { return ''; }
        abort() {}
        addEventListener() {}
        removeEventListener() {}
    }
    class Image {
        constructor(width, height) {
            this.src = '';
            this.alt = '';
            this.onload = null;
            this.onerror = null;
            this.width = width || 0;
            this.height = height || 0;
        }
        addEventListener() {}
        removeEventListener() {}
    }
    function fetch() {
        return Promise.resolve({
            ok: true,
            status: 200,
            statusText: 'OK',
            headers: { get() { return null; }, has() { return false; } },
            json() { return Promise.resolve({}); },
            text() { return Promise.resolve(''); },
            blob() { return Promise.resolve({ size: 0, type: '' }); },
            arrayBuffer() { return Promise.resolve(new ArrayBuffer(0)); },
        });
    }
    return { XMLHttpRequest, Image, fetch };
})()"#;

const PRELUDE_EXPORTS: &[&str] = &["XMLHttpRequest", "Image", "fetch"];

pub fn build_host_environment(context: &mut Context) -> JsResult<HostEnvironment> {
    let local_storage = SharedStorage::default();
    let session_storage = SharedStorage::default();
    let timers = SharedTimers::default();
    let mut bindings = Bindings::new();

    let location = build_location(context);
    let document = build_document(context, location.clone());
    bindings.insert("document", document);
    bindings.insert("console", build_console(context));
    bindings.insert("performance", build_performance(context));
    bindings.insert("localStorage", build_storage(context, &local_storage));
    bindings.insert("sessionStorage", build_storage(context, &session_storage));
    bindings.insert("navigator", build_navigator(context));
    bindings.insert("location", location);
    bindings.insert("history", build_history(context));
    bindings.insert("screen", build_screen(context));

    register_timers(context, &timers, &mut bindings);
    register_window_surface(context, &mut bindings);

    let prelude = context.eval(Source::from_bytes(HOST_PRELUDE))?;
    if let Some(classes) = prelude.as_object() {
        for name in PRELUDE_EXPORTS {
            bindings.insert(name, classes.get(JsString::from(*name), context)?);
        }
    }

    tracing::debug!(bindings = bindings.len(), "host environment built");

    Ok(HostEnvironment {
        bindings,
        local_storage,
        session_storage,
        timers,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATELESS STUBS
// ═══════════════════════════════════════════════════════════════════════════════

fn noop(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::undefined())
}

fn returns_null(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::null())
}

fn returns_false(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(false))
}

fn returns_true(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(true))
}

fn returns_empty_array(
    _this: &JsValue,
    _args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    Ok(JsArray::new(context).into())
}

fn returns_empty_object(
    _this: &JsValue,
    _args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    Ok(ObjectInitializer::new(context).build().into())
}

fn host_function(context: &mut Context, name: &str, function: HostFn) -> JsValue {
    FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(function))
        .name(JsString::from(name))
        .length(0)
        .constructor(false)
        .build()
        .into()
}

fn text(value: &str) -> JsValue {
    JsString::from(value).into()
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

const DOCUMENT_METHODS: &[(&str, HostFn)] = &[
    ("querySelector", returns_null),
    ("querySelectorAll", returns_empty_array),
    ("getElementById", returns_null),
    ("getElementsByClassName", returns_empty_array),
    ("getElementsByTagName", returns_empty_array),
    ("getElementsByName", returns_empty_array),
    ("addEventListener", noop),
    ("removeEventListener", noop),
    ("createElement", document_create_element),
    ("createElementNS", document_create_element_ns),
    ("createTextNode", document_create_text_node),
    ("createComment", document_create_comment),
    ("createDocumentFragment", document_create_fragment),
];

fn build_document(context: &mut Context, location: JsObject) -> JsObject {
    let body = build_element(context, "body");
    let head = build_element(context, "head");
    let document_element = build_element(context, "html");

    let mut document = ObjectInitializer::new(context);
    for (name, function) in DOCUMENT_METHODS {
        document.function(NativeFunction::from_fn_ptr(*function), JsString::from(*name), 1);
    }
    document
        .property(JsString::from("body"), body, Attribute::all())
        .property(JsString::from("head"), head, Attribute::all())
        .property(JsString::from("documentElement"), document_element, Attribute::all())
        .property(JsString::from("title"), text(""), Attribute::all())
        .property(JsString::from("cookie"), text(""), Attribute::all())
        .property(JsString::from("readyState"), text("complete"), Attribute::all())
        .property(JsString::from("location"), location, Attribute::all());
    document.build()
}

fn document_create_element(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let tag = args.get_or_undefined(0).to_string(context)?.to_std_string_escaped();
    Ok(build_element(context, &tag).into())
}

fn document_create_element_ns(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let tag = args.get_or_undefined(1).to_string(context)?.to_std_string_escaped();
    Ok(build_element(context, &tag).into())
}

fn document_create_text_node(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let value = args.get_or_undefined(0).to_string(context)?;
    Ok(ObjectInitializer::new(context)
        .property(JsString::from("nodeValue"), value.clone(), Attribute::all())
        .property(JsString::from("textContent"), value, Attribute::all())
        .build()
        .into())
}

fn document_create_comment(
    _this: &JsValue,
    _args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    Ok(ObjectInitializer::new(context)
        .property(JsString::from("nodeValue"), text(""), Attribute::all())
        .build()
        .into())
}

fn document_create_fragment(
    _this: &JsValue,
    _args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    Ok(build_element(context, "#document-fragment").into())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

const ELEMENT_METHODS: &[(&str, HostFn)] = &[
    ("setAttribute", element_set_attribute),
    ("getAttribute", element_get_attribute),
    ("removeAttribute", element_remove_attribute),
    ("hasAttribute", element_has_attribute),
    ("appendChild", element_append_child),
    ("removeChild", element_remove_child),
    ("addEventListener", noop),
    ("removeEventListener", noop),
    ("focus", noop),
    ("blur", noop),
    ("click", noop),
    ("submit", noop),
    ("reset", noop),
    ("getBoundingClientRect", element_bounding_rect),
    ("querySelector", returns_null),
    ("querySelectorAll", returns_empty_array),
];

/// Element stand-in. Attributes live in the element's own `attributes`
/// object and appended children in its `children` array, so both can be read
/// back by the module.
pub(crate) fn build_element(context: &mut Context, tag_name: &str) -> JsObject {
    let class_list = ObjectInitializer::new(context)
        .function(NativeFunction::from_fn_ptr(noop), JsString::from("add"), 1)
        .function(NativeFunction::from_fn_ptr(noop), JsString::from("remove"), 1)
        .function(NativeFunction::from_fn_ptr(returns_false), JsString::from("contains"), 1)
        .function(NativeFunction::from_fn_ptr(returns_false), JsString::from("toggle"), 1)
        .build();
    let style = ObjectInitializer::new(context).build();
    let attributes = ObjectInitializer::new(context).build();
    let children = JsArray::new(context);
    let upper = tag_name.to_uppercase();

    let mut element = ObjectInitializer::new(context);
    for (name, function) in ELEMENT_METHODS {
        element.function(NativeFunction::from_fn_ptr(*function), JsString::from(*name), 1);
    }
    element
        .property(JsString::from("tagName"), text(&upper), Attribute::all())
        .property(JsString::from("nodeName"), text(&upper), Attribute::all())
        .property(JsString::from("style"), style, Attribute::all())
        .property(JsString::from("classList"), class_list, Attribute::all())
        .property(JsString::from("attributes"), attributes, Attribute::all())
        .property(JsString::from("children"), children, Attribute::all())
        .property(JsString::from("scrollTop"), 0, Attribute::all())
        .property(JsString::from("offsetTop"), 0, Attribute::all())
        .property(JsString::from("src"), text(""), Attribute::all())
        .property(JsString::from("href"), text(""), Attribute::all())
        .property(JsString::from("innerHTML"), text(""), Attribute::all())
        .property(JsString::from("innerText"), text(""), Attribute::all())
        .property(JsString::from("textContent"), text(""), Attribute::all());

    match tag_name.to_ascii_lowercase().as_str() {
        "input" | "textarea" => {
            element
                .property(JsString::from("value"), text(""), Attribute::all())
                .property(JsString::from("checked"), false, Attribute::all());
        }
        "img" => {
            element
                .property(JsString::from("alt"), text(""), Attribute::all())
                .property(JsString::from("onload"), JsValue::null(), Attribute::all())
                .property(JsString::from("onerror"), JsValue::null(), Attribute::all());
        }
        "script" => {
            element
                .property(JsString::from("async"), false, Attribute::all())
                .property(JsString::from("defer"), false, Attribute::all())
                .property(JsString::from("onload"), JsValue::null(), Attribute::all())
                .property(JsString::from("onerror"), JsValue::null(), Attribute::all());
        }
        _ => {}
    }

    element.build()
}

fn element_part(this: &JsValue, part: &str, context: &mut Context) -> JsResult<Option<JsObject>> {
    let Some(element) = this.as_object() else {
        return Ok(None);
    };
    let value = element.get(JsString::from(part), context)?;
    Ok(value.as_object().map(|object| object.clone()))
}

fn element_set_attribute(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let name = args.get_or_undefined(0).to_string(context)?;
    let value = args.get_or_undefined(1).to_string(context)?;
    if let Some(attributes) = element_part(this, "attributes", context)? {
        attributes.set(name, value, false, context)?;
    }
    Ok(JsValue::undefined())
}

fn element_get_attribute(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let name = args.get_or_undefined(0).to_string(context)?;
    let Some(attributes) = element_part(this, "attributes", context)? else {
        return Ok(JsValue::null());
    };
    if !attributes.has_own_property(name.clone(), context)? {
        return Ok(JsValue::null());
    }
    attributes.get(name, context)
}

fn element_remove_attribute(
    this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let name = args.get_or_undefined(0).to_string(context)?;
    if let Some(attributes) = element_part(this, "attributes", context)? {
        attributes.delete_property_or_throw(name, context)?;
    }
    Ok(JsValue::undefined())
}

fn element_has_attribute(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let name = args.get_or_undefined(0).to_string(context)?;
    let Some(attributes) = element_part(this, "attributes", context)? else {
        return Ok(JsValue::from(false));
    };
    Ok(JsValue::from(attributes.has_own_property(name, context)?))
}

fn element_append_child(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let child = args.get_or_undefined(0).clone();
    if let Some(children) = element_part(this, "children", context)? {
        JsArray::from_object(children)?.push(child.clone(), context)?;
    }
    Ok(child)
}

fn element_remove_child(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let child = args.get_or_undefined(0).clone();
    let (Some(element), Some(children)) = (
        this.as_object().map(|object| object.clone()),
        element_part(this, "children", context)?,
    ) else {
        return Ok(child);
    };

    let length = children.get(JsString::from("length"), context)?.to_length(context)?;
    let mut kept = Vec::new();
    for index in 0..length {
        let item = children.get(index as u32, context)?;
        if !item.strict_equals(&child) {
            kept.push(item);
        }
    }
    let rebuilt = JsArray::from_iter(kept, context);
    element.set(JsString::from("children"), rebuilt, false, context)?;
    Ok(child)
}

fn element_bounding_rect(_this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let mut rect = ObjectInitializer::new(context);
    for edge in ["top", "left", "bottom", "right", "width", "height", "x", "y"] {
        rect.property(JsString::from(edge), 0, Attribute::all());
    }
    Ok(rect.build().into())
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSOLE / PERFORMANCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Every standard method is a no-op, and reading any other string key yields
/// a fresh no-op function, so `console.someVendorMethod()` never throws.
fn build_console(context: &mut Context) -> JsObject {
    let mut console = ObjectInitializer::new(context);
    for name in CONSOLE_METHODS {
        console.function(NativeFunction::from_fn_ptr(noop), JsString::from(*name), 0);
    }
    let console = console.build();

    JsProxyBuilder::new(console)
        .get(console_get)
        .build(context)
        .into()
}

fn console_get(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let Some(target) = args.get_or_undefined(0).as_object() else {
        return Ok(JsValue::undefined());
    };
    let key = args.get_or_undefined(1).to_property_key(context)?;
    if target.has_property(key.clone(), context)? {
        return target.get(key, context);
    }
    if matches!(key, PropertyKey::Symbol(_)) {
        return Ok(JsValue::undefined());
    }
    Ok(host_function(context, "", noop))
}

fn build_performance(context: &mut Context) -> JsObject {
    let clock = ClockCapture::start();
    let time_origin = clock.origin_epoch_ms;
    let now = unsafe {
        NativeFunction::from_closure_with_captures(
            |_this, _args, clock: &ClockCapture, _context| Ok(JsValue::from(clock.now())),
            clock,
        )
    };

    ObjectInitializer::new(context)
        .function(now, JsString::from("now"), 0)
        .function(NativeFunction::from_fn_ptr(noop), JsString::from("mark"), 1)
        .function(NativeFunction::from_fn_ptr(noop), JsString::from("measure"), 1)
        .property(JsString::from("timeOrigin"), time_origin, Attribute::all())
        .build()
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE STAND-INS
// ═══════════════════════════════════════════════════════════════════════════════

type StorageFn = fn(&JsValue, &[JsValue], &StorageCapture, &mut Context) -> JsResult<JsValue>;

fn storage_native(area: &SharedStorage, function: StorageFn) -> NativeFunction {
    unsafe {
        NativeFunction::from_closure_with_captures(
            function,
            StorageCapture {
                area: Rc::clone(area),
            },
        )
    }
}

fn build_storage(context: &mut Context, area: &SharedStorage) -> JsObject {
    let length = FunctionObjectBuilder::new(context.realm(), storage_native(area, storage_length))
        .name(JsString::from("length"))
        .length(0)
        .constructor(false)
        .build();

    ObjectInitializer::new(context)
        .function(storage_native(area, storage_get_item), JsString::from("getItem"), 1)
        .function(storage_native(area, storage_set_item), JsString::from("setItem"), 2)
        .function(storage_native(area, storage_remove_item), JsString::from("removeItem"), 1)
        .function(storage_native(area, storage_clear), JsString::from("clear"), 0)
        .function(storage_native(area, storage_key), JsString::from("key"), 1)
        .accessor(JsString::from("length"), Some(length), None, Attribute::CONFIGURABLE)
        .build()
}

fn storage_get_item(
    _this: &JsValue,
    args: &[JsValue],
    capture: &StorageCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let key = args.get_or_undefined(0).to_string(context)?.to_std_string_escaped();
    let area = capture.area.borrow();
    Ok(area.get(&key).map(text).unwrap_or_else(JsValue::null))
}

fn storage_set_item(
    _this: &JsValue,
    args: &[JsValue],
    capture: &StorageCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let key = args.get_or_undefined(0).to_string(context)?.to_std_string_escaped();
    let value = args.get_or_undefined(1).to_string(context)?.to_std_string_escaped();
    capture.area.borrow_mut().set(key, value);
    Ok(JsValue::undefined())
}

fn storage_remove_item(
    _this: &JsValue,
    args: &[JsValue],
    capture: &StorageCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let key = args.get_or_undefined(0).to_string(context)?.to_std_string_escaped();
    capture.area.borrow_mut().remove(&key);
    Ok(JsValue::undefined())
}

fn storage_clear(
    _this: &JsValue,
    _args: &[JsValue],
    capture: &StorageCapture,
    _context: &mut Context,
) -> JsResult<JsValue> {
    capture.area.borrow_mut().clear();
    Ok(JsValue::undefined())
}

fn storage_key(
    _this: &JsValue,
    args: &[JsValue],
    capture: &StorageCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let index = args.get_or_undefined(0).to_number(context)?;
    if !index.is_finite() || index < 0.0 {
        return Ok(JsValue::null());
    }
    let area = capture.area.borrow();
    Ok(area
        .key(index as usize)
        .map(text)
        .unwrap_or_else(JsValue::null))
}

fn storage_length(
    _this: &JsValue,
    _args: &[JsValue],
    capture: &StorageCapture,
    _context: &mut Context,
) -> JsResult<JsValue> {
    Ok(JsValue::from(capture.area.borrow().len() as f64))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TIMERS
// ═══════════════════════════════════════════════════════════════════════════════

type TimerFn = fn(&JsValue, &[JsValue], &TimerCapture, &mut Context) -> JsResult<JsValue>;

const TIMER_FUNCTIONS: &[(&str, TimerKind, TimerFn)] = &[
    ("setTimeout", TimerKind::Timeout, schedule_timer),
    ("setInterval", TimerKind::Interval, schedule_timer),
    ("requestAnimationFrame", TimerKind::AnimationFrame, schedule_timer),
    ("queueMicrotask", TimerKind::Microtask, schedule_timer),
    ("clearTimeout", TimerKind::Timeout, cancel_timer),
    ("clearInterval", TimerKind::Interval, cancel_timer),
    ("cancelAnimationFrame", TimerKind::AnimationFrame, cancel_timer),
];

fn register_timers(context: &mut Context, timers: &SharedTimers, bindings: &mut Bindings) {
    for (name, kind, function) in TIMER_FUNCTIONS {
        let native = unsafe {
            NativeFunction::from_closure_with_captures(
                *function,
                TimerCapture {
                    timers: Rc::clone(timers),
                    kind: *kind,
                },
            )
        };
        let function = FunctionObjectBuilder::new(context.realm(), native)
            .name(JsString::from(*name))
            .length(1)
            .constructor(false)
            .build();
        bindings.insert(name, function);
    }
}

fn schedule_timer(
    _this: &JsValue,
    args: &[JsValue],
    capture: &TimerCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let delay_ms = match capture.kind {
        TimerKind::AnimationFrame => ANIMATION_FRAME_MS,
        TimerKind::Microtask => 0,
        TimerKind::Timeout | TimerKind::Interval => {
            let delay = args.get_or_undefined(1).to_number(context)?;
            if delay.is_finite() && delay > 0.0 {
                delay as u64
            } else {
                0
            }
        }
    };
    let id = capture.timers.borrow_mut().schedule(capture.kind, delay_ms);
    if capture.kind == TimerKind::Microtask {
        return Ok(JsValue::undefined());
    }
    Ok(JsValue::from(f64::from(id)))
}

fn cancel_timer(
    _this: &JsValue,
    args: &[JsValue],
    capture: &TimerCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let id = args.get_or_undefined(0).to_number(context)?;
    if id.is_finite() && id >= 0.0 {
        capture.timers.borrow_mut().cancel(id as u32);
    }
    Ok(JsValue::undefined())
}

// ═══════════════════════════════════════════════════════════════════════════════
// WINDOW-LEVEL SURFACE
// ═══════════════════════════════════════════════════════════════════════════════

const WINDOW_FUNCTIONS: &[(&str, HostFn)] = &[
    ("addEventListener", noop),
    ("removeEventListener", noop),
    ("dispatchEvent", returns_true),
    ("alert", noop),
    ("confirm", returns_false),
    ("prompt", returns_null),
    ("matchMedia", match_media),
    ("getComputedStyle", returns_empty_object),
    ("scrollTo", noop),
    ("scrollBy", noop),
];

fn register_window_surface(context: &mut Context, bindings: &mut Bindings) {
    for (name, function) in WINDOW_FUNCTIONS {
        let value = host_function(context, name, *function);
        bindings.insert(name, value);
    }
    bindings.insert("innerWidth", 1920);
    bindings.insert("innerHeight", 1080);
    bindings.insert("devicePixelRatio", 1);
}

fn match_media(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let media = args.get_or_undefined(0).to_string(context)?;
    let mut query = ObjectInitializer::new(context);
    for name in ["addListener", "removeListener", "addEventListener", "removeEventListener"] {
        query.function(NativeFunction::from_fn_ptr(noop), JsString::from(name), 1);
    }
    query
        .property(JsString::from("matches"), false, Attribute::all())
        .property(JsString::from("media"), media, Attribute::all())
        .property(JsString::from("onchange"), JsValue::null(), Attribute::all());
    Ok(query.build().into())
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTOR OBJECTS
// ═══════════════════════════════════════════════════════════════════════════════

fn build_navigator(context: &mut Context) -> JsObject {
    let languages = JsArray::from_iter([text("en-US"), text("en")], context);
    ObjectInitializer::new(context)
        .property(JsString::from("userAgent"), text(USER_AGENT), Attribute::all())
        .property(JsString::from("language"), text("en-US"), Attribute::all())
        .property(JsString::from("languages"), languages, Attribute::all())
        .property(JsString::from("platform"), text("Win32"), Attribute::all())
        .property(JsString::from("cookieEnabled"), true, Attribute::all())
        .property(JsString::from("onLine"), true, Attribute::all())
        .property(JsString::from("hardwareConcurrency"), 4, Attribute::all())
        .property(JsString::from("maxTouchPoints"), 0, Attribute::all())
        .build()
}

fn build_location(context: &mut Context) -> JsObject {
    let mut location = ObjectInitializer::new(context);
    for field in ["href", "origin", "protocol", "host", "hostname", "port", "pathname", "search", "hash"] {
        location.property(JsString::from(field), text(""), Attribute::all());
    }
    for method in ["assign", "replace", "reload"] {
        location.function(NativeFunction::from_fn_ptr(noop), JsString::from(method), 1);
    }
    location.build()
}

fn build_history(context: &mut Context) -> JsObject {
    let mut history = ObjectInitializer::new(context);
    for method in ["back", "forward", "go", "pushState", "replaceState"] {
        history.function(NativeFunction::from_fn_ptr(noop), JsString::from(method), 0);
    }
    history
        .property(JsString::from("length"), 1, Attribute::all())
        .property(JsString::from("state"), JsValue::null(), Attribute::all());
    history.build()
}

fn build_screen(context: &mut Context) -> JsObject {
    let orientation = ObjectInitializer::new(context)
        .property(JsString::from("type"), text("landscape-primary"), Attribute::all())
        .property(JsString::from("angle"), 0, Attribute::all())
        .build();
    ObjectInitializer::new(context)
        .property(JsString::from("width"), 1920, Attribute::all())
        .property(JsString::from("height"), 1080, Attribute::all())
        .property(JsString::from("availWidth"), 1920, Attribute::all())
        .property(JsString::from("availHeight"), 1080, Attribute::all())
        .property(JsString::from("colorDepth"), 24, Attribute::all())
        .property(JsString::from("pixelDepth"), 24, Attribute::all())
        .property(JsString::from("orientation"), orientation, Attribute::all())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_area_orders_keys_by_name() {
        let mut area = StorageArea::default();
        area.set("b", "2");
        area.set("a", "1");
        assert_eq!(area.key(0), Some("a"));
        assert_eq!(area.get("b"), Some("2"));
        assert_eq!(area.remove("a"), Some("1".to_string()));
        assert_eq!(area.len(), 1);
        area.clear();
        assert!(area.is_empty());
    }

    #[test]
    fn test_timer_ids_are_truthy_and_cancellable() {
        let mut queue = TimerQueue::default();
        let first = queue.schedule(TimerKind::Timeout, 10);
        let second = queue.schedule(TimerKind::AnimationFrame, ANIMATION_FRAME_MS);
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert!(queue.cancel(first));
        assert!(!queue.cancel(first));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending().next().map(|t| t.kind), Some(TimerKind::AnimationFrame));
    }
}
