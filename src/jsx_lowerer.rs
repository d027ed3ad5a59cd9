//! JSX lowering for widget modules
//!
//! Rewrites JSX into nested calls against the configured element factory:
//! `<Panel title="a">{x}</Panel>` becomes `React.createElement(Panel, { title: "a" }, x)`.

use oxc_allocator::{Allocator, Box as oxc_box, CloneIn};
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::walk_mut::walk_expression;
use oxc_ast_visit::VisitMut;
use oxc_span::SPAN;
use oxc_syntax::identifier::is_identifier_name;

// ═══════════════════════════════════════════════════════════════════════════════
// JSX LOWERER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct JsxLowerer<'a> {
    pub ast: AstBuilder<'a>,
    pragma: Vec<String>,
    pragma_frag: Vec<String>,
    /// Number of elements and fragments rewritten so far.
    pub lowered: usize,
}

impl<'a> JsxLowerer<'a> {
    pub fn new(allocator: &'a Allocator, pragma: &str, pragma_frag: &str) -> Self {
        Self {
            ast: AstBuilder::new(allocator),
            pragma: split_path(pragma),
            pragma_frag: split_path(pragma_frag),
            lowered: 0,
        }
    }

    fn alloc_str(&self, text: &str) -> &'a str {
        self.ast.allocator.alloc_str(text)
    }

    /// `React.createElement` -> member expression chain rooted at a bare identifier.
    fn path_expression(&self, segments: &[String]) -> Expression<'a> {
        let mut segments = segments.iter();
        let head = match segments.next() {
            Some(head) => self.alloc_str(head),
            None => "undefined",
        };
        let mut expr = self.ast.expression_identifier(SPAN, head);
        for segment in segments {
            let name = self.alloc_str(segment);
            expr = Expression::from(self.ast.member_expression_static(
                SPAN,
                expr,
                self.ast.identifier_name(SPAN, name),
                false,
            ));
        }
        expr
    }

    fn factory_call(&self, args: oxc_allocator::Vec<'a, Argument<'a>>) -> Expression<'a> {
        let callee = self.path_expression(&self.pragma);
        self.ast.expression_call(
            SPAN,
            callee,
            None::<oxc_box<TSTypeParameterInstantiation>>,
            args,
            false,
        )
    }

    fn lower_jsx_element(&mut self, element: &JSXElement<'a>) -> Expression<'a> {
        self.lowered += 1;

        let tag = self.lower_tag(&element.opening_element.name);
        let props = self.lower_attributes(&element.opening_element.attributes);

        let mut args = self.ast.vec();
        args.push(Argument::from(tag));
        args.push(Argument::from(props));
        self.push_children(&mut args, &element.children);

        self.factory_call(args)
    }

    fn lower_jsx_fragment(&mut self, fragment: &JSXFragment<'a>) -> Expression<'a> {
        self.lowered += 1;

        let mut args = self.ast.vec();
        args.push(Argument::from(self.path_expression(&self.pragma_frag)));
        args.push(Argument::from(self.ast.expression_identifier(SPAN, "null")));
        self.push_children(&mut args, &fragment.children);

        self.factory_call(args)
    }

    /// Intrinsic tags stay strings; component tags are real references.
    fn lower_tag(&self, name: &JSXElementName<'a>) -> Expression<'a> {
        match name {
            JSXElementName::Identifier(id) => {
                let tag = self.alloc_str(&id.name.to_string());
                self.ast.expression_string_literal(SPAN, tag, None)
            }
            JSXElementName::IdentifierReference(id) => {
                let tag = self.alloc_str(&id.name.to_string());
                self.ast.expression_identifier(SPAN, tag)
            }
            JSXElementName::NamespacedName(ns) => {
                let tag = self.alloc_str(&format!("{}:{}", ns.namespace.name, ns.name.name));
                self.ast.expression_string_literal(SPAN, tag, None)
            }
            JSXElementName::MemberExpression(me) => self.lower_member_tag(me),
            JSXElementName::ThisExpression(_) => self.ast.expression_this(SPAN),
        }
    }

    fn lower_member_tag(&self, me: &JSXMemberExpression<'a>) -> Expression<'a> {
        let object = match &me.object {
            JSXMemberExpressionObject::IdentifierReference(id) => {
                let name = self.alloc_str(&id.name.to_string());
                self.ast.expression_identifier(SPAN, name)
            }
            JSXMemberExpressionObject::MemberExpression(inner) => self.lower_member_tag(inner),
            _ => self.ast.expression_this(SPAN),
        };
        let property = self.alloc_str(&me.property.name.to_string());
        Expression::from(self.ast.member_expression_static(
            SPAN,
            object,
            self.ast.identifier_name(SPAN, property),
            false,
        ))
    }

    fn attribute_key(&self, name: &JSXAttributeName<'a>) -> PropertyKey<'a> {
        let text = match name {
            JSXAttributeName::Identifier(id) => id.name.to_string(),
            JSXAttributeName::NamespacedName(ns) => {
                format!("{}:{}", ns.namespace.name, ns.name.name)
            }
        };
        let text = self.alloc_str(&text);
        // data-* / aria-* names cannot be printed as bare keys
        if is_identifier_name(text) {
            PropertyKey::StaticIdentifier(self.ast.alloc(self.ast.identifier_name(SPAN, text)))
        } else {
            PropertyKey::StringLiteral(self.ast.alloc(self.ast.string_literal(SPAN, text, None)))
        }
    }

    fn lower_attributes(&mut self, items: &[JSXAttributeItem<'a>]) -> Expression<'a> {
        let mut properties = self.ast.vec();

        for item in items {
            match item {
                JSXAttributeItem::Attribute(attr) => {
                    let key = self.attribute_key(&attr.name);
                    let value = match &attr.value {
                        Some(JSXAttributeValue::StringLiteral(s)) => {
                            Expression::StringLiteral(s.clone_in(self.ast.allocator))
                        }
                        Some(JSXAttributeValue::Element(el)) => self.lower_jsx_element(el),
                        Some(JSXAttributeValue::ExpressionContainer(container)) => self
                            .lower_jsx_expression(&container.expression)
                            .unwrap_or_else(|| self.ast.expression_identifier(SPAN, "undefined")),
                        Some(JSXAttributeValue::Fragment(frag)) => self.lower_jsx_fragment(frag),
                        None => self.ast.expression_boolean_literal(SPAN, true),
                    };

                    properties.push(self.ast.object_property_kind_object_property(
                        SPAN,
                        PropertyKind::Init,
                        key,
                        value,
                        false,
                        false,
                        false,
                    ));
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    let mut spread_expr = spread.argument.clone_in(self.ast.allocator);
                    self.visit_expression(&mut spread_expr);
                    properties.push(
                        self.ast
                            .object_property_kind_spread_property(SPAN, spread_expr),
                    );
                }
            }
        }

        if properties.is_empty() {
            self.ast.expression_identifier(SPAN, "null")
        } else {
            self.ast.expression_object(SPAN, properties)
        }
    }

    fn push_children(
        &mut self,
        args: &mut oxc_allocator::Vec<'a, Argument<'a>>,
        children: &[JSXChild<'a>],
    ) {
        for child in children {
            match child {
                JSXChild::Text(t) => {
                    if let Some(text) = clean_jsx_text(&t.value) {
                        let text = self.alloc_str(&text);
                        args.push(Argument::from(
                            self.ast.expression_string_literal(SPAN, text, None),
                        ));
                    }
                }
                JSXChild::Element(el) => {
                    args.push(Argument::from(self.lower_jsx_element(el)));
                }
                JSXChild::Fragment(frag) => {
                    args.push(Argument::from(self.lower_jsx_fragment(frag)));
                }
                JSXChild::ExpressionContainer(container) => {
                    if let Some(expr) = self.lower_jsx_expression(&container.expression) {
                        args.push(Argument::from(expr));
                    }
                }
                JSXChild::Spread(spread) => {
                    let mut arg = spread.expression.clone_in(self.ast.allocator);
                    self.visit_expression(&mut arg);
                    args.push(self.ast.argument_spread_element(SPAN, arg));
                }
            }
        }
    }

    /// `None` for `{}` / `{/* comment */}` containers.
    fn lower_jsx_expression(&mut self, jsx_expr: &JSXExpression<'a>) -> Option<Expression<'a>> {
        let mut expr = jsx_expr
            .as_expression()
            .map(|e| e.clone_in(self.ast.allocator))?;
        self.visit_expression(&mut expr);
        Some(expr)
    }
}

impl<'a> VisitMut<'a> for JsxLowerer<'a> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        match expr {
            Expression::JSXElement(element) => {
                let lowered = self.lower_jsx_element(element);
                *expr = lowered;
            }
            Expression::JSXFragment(fragment) => {
                let lowered = self.lower_jsx_fragment(fragment);
                *expr = lowered;
            }
            _ => {
                walk_expression(self, expr);
            }
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collapses JSX text the way the React preset does: every line is trimmed on
/// the side that touches a line break, blank lines vanish, and the surviving
/// lines are joined with a single space.
pub(crate) fn clean_jsx_text(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len().saturating_sub(1);
    let mut out = String::new();

    for (index, line) in lines.iter().enumerate() {
        let line = line.replace('\t', " ").replace('\r', "");
        let mut text = line.as_str();
        if index != 0 {
            text = text.trim_start_matches(' ');
        }
        if index != last {
            text = text.trim_end_matches(' ');
        }
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(text);
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
