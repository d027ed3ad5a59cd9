//! Framework shim
//!
//! Minimal stand-ins for the UI library a widget module is written against:
//! a structural element factory, the two widget base classes, and a
//! `require` that hands back the library for its own package name.

use boa_engine::object::builtins::{JsArray, JsFunction};
use boa_engine::object::{FunctionObjectBuilder, JsObject, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{Context, JsArgs, JsResult, JsString, JsValue, NativeFunction, Source};
use boa_gc::{custom_trace, Finalize, Trace};

use crate::scope::Bindings;

/// Tag used for `<>...</>` fragments.
pub const FRAGMENT_TAG: &str = "react.fragment";

/// Name the library object is bound under in the scope.
pub const LIBRARY_BINDING: &str = "React";

// ═══════════════════════════════════════════════════════════════════════════════
// ARCHETYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetArchetype {
    /// Rendering-capable base class.
    Visible,
    Invisible,
}

impl WidgetArchetype {
    pub const ALL: [WidgetArchetype; 2] = [WidgetArchetype::Visible, WidgetArchetype::Invisible];

    pub fn class_name(self) -> &'static str {
        match self {
            WidgetArchetype::Visible => "VisibleWidget",
            WidgetArchetype::Invisible => "InvisibleWidget",
        }
    }

    pub fn renders(self) -> bool {
        matches!(self, WidgetArchetype::Visible)
    }

    /// Lifecycle methods the class exposes, all inert.
    pub fn methods(self) -> &'static [&'static str] {
        match self {
            WidgetArchetype::Visible => &["setProps", "emit", "widgetError", "render"],
            WidgetArchetype::Invisible => &["setProps", "emit", "widgetError"],
        }
    }

    /// Class expression evaluated once per context.
    pub fn class_source(self) -> String {
        let methods: String = self
            .methods()
            .iter()
            .map(|method| format!("    {}() {{}}\n", method))
            .collect();
        format!(
            "(class {} {{\n    constructor(props) {{ this.props = props || {{}}; }}\n{}}})",
            self.class_name(),
            methods
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIBRARY
// ═══════════════════════════════════════════════════════════════════════════════

const LIBRARY_PRELUDE: &str = r#"(function () {
    class Component {
        constructor(props) {
            this.props = props || {};
            this.state = {};
        }
        setState() {}
        forceUpdate() {}
        render() { return null; }
    }
    class PureComponent extends Component {}
    return {
        Component,
        PureComponent,
        memo(component) { return component; },
        forwardRef(render) { return render; },
        createContext(defaultValue) {
            return { Provider: 'react.provider', Consumer: 'react.consumer', _currentValue: defaultValue };
        },
    };
})()"#;

pub struct FrameworkShim {
    library: JsObject,
    resolver: JsFunction,
    archetypes: Vec<(WidgetArchetype, JsValue)>,
}

impl FrameworkShim {
    pub fn build(context: &mut Context, ui_library: &str) -> JsResult<Self> {
        let prelude = context.eval(Source::from_bytes(LIBRARY_PRELUDE))?;
        let library = match prelude.as_object() {
            Some(library) => library.clone(),
            None => ObjectInitializer::new(context).build(),
        };

        let factory = build_element_factory(context);
        for name in ["createElement", "jsx", "jsxs", "jsxDEV"] {
            library.set(JsString::from(name), factory.clone(), false, context)?;
        }
        library.set(
            JsString::from("Fragment"),
            JsString::from(FRAGMENT_TAG),
            false,
            context,
        )?;

        let resolver = build_require_resolver(context, library.clone(), ui_library);

        let mut archetypes = Vec::with_capacity(WidgetArchetype::ALL.len());
        for archetype in WidgetArchetype::ALL {
            let source = archetype.class_source();
            let class = context.eval(Source::from_bytes(source.as_bytes()))?;
            archetypes.push((archetype, class));
        }

        Ok(Self {
            library,
            resolver,
            archetypes,
        })
    }

    pub fn resolver(&self) -> &JsFunction {
        &self.resolver
    }

    pub fn archetype(&self, archetype: WidgetArchetype) -> Option<&JsValue> {
        self.archetypes
            .iter()
            .find(|(kind, _)| *kind == archetype)
            .map(|(_, class)| class)
    }

    /// Shim layer of the scope: the library object and both base classes.
    pub fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.insert(LIBRARY_BINDING, self.library.clone());
        for (archetype, class) in &self.archetypes {
            bindings.insert(archetype.class_name(), class.clone());
        }
        bindings
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENT FACTORY
// ═══════════════════════════════════════════════════════════════════════════════

/// `createElement(tag, props, ...children)` -> `{ tag, props, children }`.
pub fn build_element_factory(context: &mut Context) -> JsFunction {
    FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(create_element))
        .name(JsString::from("createElement"))
        .length(2)
        .constructor(false)
        .build()
}

fn create_element(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let tag = args.get_or_undefined(0).clone();
    let props: JsValue = match args.get_or_undefined(1).as_object() {
        Some(props) => props.clone().into(),
        None => ObjectInitializer::new(context).build().into(),
    };
    let children = JsArray::from_iter(args.iter().skip(2).cloned(), context);

    Ok(ObjectInitializer::new(context)
        .property(JsString::from("tag"), tag, Attribute::all())
        .property(JsString::from("props"), props, Attribute::all())
        .property(JsString::from("children"), children, Attribute::all())
        .build()
        .into())
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUIRE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Finalize)]
struct ResolverCapture {
    library: JsObject,
    library_name: String,
}

unsafe impl Trace for ResolverCapture {
    custom_trace!(this, mark, {
        mark(&this.library);
    });
}

/// Never throws: unknown packages resolve to a fresh empty object.
pub fn build_require_resolver(context: &mut Context, library: JsObject, ui_library: &str) -> JsFunction {
    let resolve = unsafe {
        NativeFunction::from_closure_with_captures(
            resolve_module,
            ResolverCapture {
                library,
                library_name: ui_library.to_string(),
            },
        )
    };
    FunctionObjectBuilder::new(context.realm(), resolve)
        .name(JsString::from("require"))
        .length(1)
        .constructor(false)
        .build()
}

fn resolve_module(
    _this: &JsValue,
    args: &[JsValue],
    capture: &ResolverCapture,
    context: &mut Context,
) -> JsResult<JsValue> {
    let requested = args
        .get_or_undefined(0)
        .as_string()
        .map(|name| name.to_std_string_escaped());
    if let Some(name) = requested {
        if is_library_request(&name, &capture.library_name) {
            return Ok(capture.library.clone().into());
        }
    }
    Ok(ObjectInitializer::new(context).build().into())
}

/// `react` and `react/...` both resolve to the library.
pub fn is_library_request(requested: &str, library: &str) -> bool {
    requested == library
        || requested
            .strip_prefix(library)
            .is_some_and(|rest| rest.starts_with('/'))
}
