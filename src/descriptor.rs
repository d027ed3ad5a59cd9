//! Metadata extractor
//!
//! Reads the post-execution export surface, finds the descriptor object at
//! one of the conventional locations and maps it onto [`WidgetDescriptor`].

use boa_engine::object::JsObject;
use boa_engine::{Context, JsResult, JsString, JsValue};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractWarning};
use crate::executor::describe_js_error;
use crate::scope::ResolvableScope;

pub const WIDGET_TYPE_SUFFIX: &str = "_WIDGET";

/// Scalar fields a complete descriptor carries.
pub const REQUIRED_FIELDS: [&str; 4] = ["type", "title", "icon", "version"];

lazy_static! {
    static ref WIDGET_TYPE: Regex = Regex::new(r"^.+_WIDGET$").unwrap();
}

/// A descriptor's scalar field exactly as the module wrote it.
///
/// Serialized untagged, so `version: 1.1` reaches the bridge as the number
/// `1.1` and `version: '1.1'` as the string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Decimal digits of a JS bigint.
    BigInt(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(text) => write!(f, "{}", text),
            FieldValue::Number(number) => write!(f, "{}", number),
            FieldValue::Bool(flag) => write!(f, "{}", flag),
            FieldValue::BigInt(digits) => write!(f, "{}n", digits),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetDescriptor {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub widget_type: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<FieldValue>,
    pub is_invisible_widget: bool,
    pub is_global_widget: bool,
}

impl WidgetDescriptor {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let values = [&self.widget_type, &self.title, &self.icon, &self.version];
        REQUIRED_FIELDS
            .iter()
            .zip(values)
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| *field)
            .collect()
    }

    pub fn has_conventional_type(&self) -> bool {
        self.widget_type
            .as_ref()
            .and_then(FieldValue::as_text)
            .is_some_and(has_widget_suffix)
    }
}

pub fn has_widget_suffix(widget_type: &str) -> bool {
    WIDGET_TYPE.is_match(widget_type)
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPORT SURFACE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportLocation {
    #[serde(rename = "module.exports.type")]
    ModuleExportsType,
    #[serde(rename = "module.exports.types")]
    ModuleExportsTypes,
    #[serde(rename = "exports.type")]
    ExportsType,
    #[serde(rename = "exports.types")]
    ExportsTypes,
}

impl ExportLocation {
    /// First match wins.
    pub const SEARCH_ORDER: [ExportLocation; 4] = [
        ExportLocation::ModuleExportsType,
        ExportLocation::ModuleExportsTypes,
        ExportLocation::ExportsType,
        ExportLocation::ExportsTypes,
    ];

    pub fn path(self) -> &'static str {
        match self {
            ExportLocation::ModuleExportsType => "module.exports.type",
            ExportLocation::ModuleExportsTypes => "module.exports.types",
            ExportLocation::ExportsType => "exports.type",
            ExportLocation::ExportsTypes => "exports.types",
        }
    }

    fn key(self) -> &'static str {
        match self {
            ExportLocation::ModuleExportsType | ExportLocation::ExportsType => "type",
            ExportLocation::ModuleExportsTypes | ExportLocation::ExportsTypes => "types",
        }
    }

    fn on_module(self) -> bool {
        matches!(
            self,
            ExportLocation::ModuleExportsType | ExportLocation::ModuleExportsTypes
        )
    }
}

/// `module.exports` and `exports` as they stand after the module ran.
pub struct ExportSurface {
    module_exports: JsValue,
    exports: JsValue,
}

impl ExportSurface {
    pub fn new(module_exports: JsValue, exports: JsValue) -> Self {
        Self {
            module_exports,
            exports,
        }
    }

    /// Reads the current bindings, so a module that reassigns `exports` or
    /// `module.exports` is seen with its final values.
    pub fn read(scope: &ResolvableScope, context: &mut Context) -> Result<Self, ExtractError> {
        Self::read_bindings(scope, context).map_err(|err| read_failure(&err, context))
    }

    fn read_bindings(scope: &ResolvableScope, context: &mut Context) -> JsResult<Self> {
        let module = scope
            .binding("module", context)?
            .unwrap_or_else(JsValue::undefined);
        let module_exports = match module.as_object() {
            Some(module) => module.get(JsString::from("exports"), context)?,
            None => JsValue::undefined(),
        };
        let exports = scope
            .binding("exports", context)?
            .unwrap_or_else(JsValue::undefined);
        Ok(Self::new(module_exports, exports))
    }

    fn container(&self, location: ExportLocation) -> &JsValue {
        if location.on_module() {
            &self.module_exports
        } else {
            &self.exports
        }
    }

    /// First conventional location holding an object (functions included).
    pub fn locate(&self, context: &mut Context) -> JsResult<Option<(ExportLocation, JsObject)>> {
        for location in ExportLocation::SEARCH_ORDER {
            let Some(container) = self.container(location).as_object() else {
                continue;
            };
            let candidate = container.get(JsString::from(location.key()), context)?;
            if let Some(descriptor) = candidate.as_object() {
                return Ok(Some((location, descriptor.clone())));
            }
        }
        Ok(None)
    }
}

fn read_failure(error: &boa_engine::JsError, context: &mut Context) -> ExtractError {
    ExtractError::execution(format!(
        "reading widget exports failed: {}",
        describe_js_error(error, context)
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub descriptor: WidgetDescriptor,
    pub location: ExportLocation,
    pub advisories: Vec<ExtractWarning>,
}

pub fn extract(surface: &ExportSurface, context: &mut Context) -> Result<Extraction, ExtractError> {
    let (location, object) = surface
        .locate(context)
        .map_err(|err| read_failure(&err, context))?
        .ok_or(ExtractError::DescriptorMissing)?;

    tracing::debug!(location = location.path(), "widget descriptor located");

    let mut advisories = Vec::new();
    let descriptor = read_descriptor(&object, context, &mut advisories)
        .map_err(|err| read_failure(&err, context))?;
    advisories.extend(check_descriptor(&descriptor));

    Ok(Extraction {
        descriptor,
        location,
        advisories,
    })
}

fn read_descriptor(
    object: &JsObject,
    context: &mut Context,
    advisories: &mut Vec<ExtractWarning>,
) -> JsResult<WidgetDescriptor> {
    Ok(WidgetDescriptor {
        widget_type: read_text_field(object, "type", context, advisories)?,
        title: read_text_field(object, "title", context, advisories)?,
        icon: read_text_field(object, "icon", context, advisories)?,
        version: read_text_field(object, "version", context, advisories)?,
        is_invisible_widget: object
            .get(JsString::from("isInvisibleWidget"), context)?
            .to_boolean(),
        is_global_widget: object
            .get(JsString::from("isGlobalWidget"), context)?
            .to_boolean(),
    })
}

/// Strings, numbers, booleans and bigints pass through with their JS type
/// intact; anything but a string also earns an advisory. Objects and symbols
/// have no scalar form and are dropped with one.
fn read_text_field(
    object: &JsObject,
    field: &str,
    context: &mut Context,
    advisories: &mut Vec<ExtractWarning>,
) -> JsResult<Option<FieldValue>> {
    let value = object.get(JsString::from(field), context)?;
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    if let Some(text) = value.as_string() {
        return Ok(Some(FieldValue::Text(text.to_std_string_escaped())));
    }

    let kind = js_type_name(&value);
    let scalar = if let Some(number) = value.as_number() {
        Some(FieldValue::Number(number))
    } else if let Some(flag) = value.as_boolean() {
        Some(FieldValue::Bool(flag))
    } else if let Some(bigint) = value.as_bigint() {
        Some(FieldValue::BigInt(bigint.to_string()))
    } else {
        None
    };

    match scalar {
        Some(scalar) => {
            advisories.push(ExtractWarning::field(
                field,
                format!("expected a string, found {} `{}`", kind, scalar),
            ));
            Ok(Some(scalar))
        }
        None => {
            advisories.push(ExtractWarning::field(
                field,
                format!("expected a string, found {}; value ignored", kind),
            ));
            Ok(None)
        }
    }
}

fn js_type_name(value: &JsValue) -> &'static str {
    if value.is_number() {
        "number"
    } else if value.is_boolean() {
        "boolean"
    } else if value.is_bigint() {
        "bigint"
    } else if value.is_symbol() {
        "symbol"
    } else if value.is_callable() {
        "function"
    } else {
        "object"
    }
}

pub fn check_descriptor(descriptor: &WidgetDescriptor) -> Vec<ExtractWarning> {
    let mut advisories: Vec<ExtractWarning> = descriptor
        .missing_fields()
        .into_iter()
        .map(|field| ExtractWarning::field(field, "missing"))
        .collect();

    if let Some(widget_type) = descriptor.widget_type.as_ref().and_then(FieldValue::as_text) {
        if !has_widget_suffix(widget_type) {
            advisories.push(ExtractWarning::field(
                "type",
                format!(
                    "`{}` does not follow the <NAME>{} naming convention",
                    widget_type, WIDGET_TYPE_SUFFIX
                ),
            ));
        }
    }
    advisories
}
