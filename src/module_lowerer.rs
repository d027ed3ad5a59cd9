//! ES module lowering
//!
//! Widget modules run inside a plain function body, where `import` and `export`
//! are syntax errors. This pass rewrites them onto the CommonJS surface the
//! sandbox provides (`require`, `exports`).

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_parser::Parser;
use oxc_span::{SourceType, SPAN};

pub struct ModuleLowerer<'a> {
    pub ast: AstBuilder<'a>,
    next_temp: usize,
    /// Number of import/export statements rewritten.
    pub lowered: usize,
}

impl<'a> ModuleLowerer<'a> {
    pub fn new(allocator: &'a Allocator) -> Self {
        Self {
            ast: AstBuilder::new(allocator),
            next_temp: 0,
            lowered: 0,
        }
    }

    pub fn lower_program(&mut self, program: &mut Program<'a>) {
        let body = std::mem::replace(&mut program.body, self.ast.vec());
        let mut lowered = self.ast.vec();

        for stmt in body.into_iter() {
            match stmt {
                Statement::ImportDeclaration(decl) => {
                    self.lowered += 1;
                    let code = self.import_code(&decl);
                    self.push_code(&mut lowered, &code);
                }
                Statement::ExportNamedDeclaration(mut decl) => {
                    self.lowered += 1;
                    if decl.export_kind.is_type() {
                        continue;
                    }
                    if let Some(declaration) = decl.declaration.take() {
                        let names = declared_names(&declaration);
                        if let Some(stmt) = declaration_statement(declaration) {
                            lowered.push(stmt);
                            let code: String = names
                                .iter()
                                .map(|name| format!("exports.{name} = {name};\n"))
                                .collect();
                            self.push_code(&mut lowered, &code);
                        }
                    } else {
                        let code = self.export_specifiers_code(&decl);
                        self.push_code(&mut lowered, &code);
                    }
                }
                Statement::ExportDefaultDeclaration(decl) => {
                    self.lowered += 1;
                    self.lower_export_default(decl.unbox().declaration, &mut lowered);
                }
                Statement::ExportAllDeclaration(decl) => {
                    self.lowered += 1;
                    if decl.export_kind.is_type() {
                        continue;
                    }
                    let source = js_string_literal(&decl.source.value);
                    let code = match &decl.exported {
                        Some(exported) => format!(
                            "exports[{}] = require({});\n",
                            js_string_literal(&exported.name()),
                            source
                        ),
                        None => format!("Object.assign(exports, require({}));\n", source),
                    };
                    self.push_code(&mut lowered, &code);
                }
                other => lowered.push(other),
            }
        }

        program.body = lowered;
    }

    fn temp_name(&mut self) -> String {
        let name = format!("_widgetImport{}", self.next_temp);
        self.next_temp += 1;
        name
    }

    fn import_code(&mut self, decl: &ImportDeclaration<'a>) -> String {
        let source = js_string_literal(&decl.source.value);
        if decl.import_kind.is_type() {
            return String::new();
        }
        let Some(specifiers) = &decl.specifiers else {
            return format!("require({});\n", source);
        };

        let module = self.temp_name();
        let mut code = format!("var {} = require({});\n", module, source);
        for specifier in specifiers {
            match specifier {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    code.push_str(&format!(
                        "var {local} = {module} && {module}.default !== undefined ? {module}.default : {module};\n",
                        local = s.local.name,
                        module = module
                    ));
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    code.push_str(&format!("var {} = {};\n", s.local.name, module));
                }
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    if s.import_kind.is_type() {
                        continue;
                    }
                    code.push_str(&format!(
                        "var {} = {}[{}];\n",
                        s.local.name,
                        module,
                        js_string_literal(&s.imported.name())
                    ));
                }
            }
        }
        code
    }

    fn export_specifiers_code(&mut self, decl: &ExportNamedDeclaration<'a>) -> String {
        let reexport_module = match &decl.source {
            Some(source) => {
                let module = self.temp_name();
                let header = format!(
                    "var {} = require({});\n",
                    module,
                    js_string_literal(&source.value)
                );
                Some((module, header))
            }
            None => None,
        };

        let mut code = reexport_module
            .as_ref()
            .map(|(_, header)| header.clone())
            .unwrap_or_default();

        for specifier in &decl.specifiers {
            if specifier.export_kind.is_type() {
                continue;
            }
            let exported = js_string_literal(&specifier.exported.name());
            let local = specifier.local.name();
            let value = match &reexport_module {
                Some((module, _)) => format!("{}[{}]", module, js_string_literal(&local)),
                None => local.to_string(),
            };
            code.push_str(&format!("exports[{}] = {};\n", exported, value));
        }
        code
    }

    fn lower_export_default(
        &mut self,
        kind: ExportDefaultDeclarationKind<'a>,
        out: &mut oxc_allocator::Vec<'a, Statement<'a>>,
    ) {
        let value = match kind {
            ExportDefaultDeclarationKind::FunctionDeclaration(mut func) => match func
                .id
                .as_ref()
                .map(|id| id.name.to_string())
            {
                Some(name) => {
                    let code = format!("exports.default = {};\n", name);
                    out.push(Statement::FunctionDeclaration(func));
                    self.push_code(out, &code);
                    return;
                }
                None => {
                    func.r#type = FunctionType::FunctionExpression;
                    Expression::FunctionExpression(func)
                }
            },
            ExportDefaultDeclarationKind::ClassDeclaration(mut class) => match class
                .id
                .as_ref()
                .map(|id| id.name.to_string())
            {
                Some(name) => {
                    let code = format!("exports.default = {};\n", name);
                    out.push(Statement::ClassDeclaration(class));
                    self.push_code(out, &code);
                    return;
                }
                None => {
                    class.r#type = ClassType::ClassExpression;
                    Expression::ClassExpression(class)
                }
            },
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => return,
            other => other.into_expression(),
        };

        let target = self.ast.member_expression_static(
            SPAN,
            self.ast.expression_identifier(SPAN, "exports"),
            self.ast.identifier_name(SPAN, "default"),
            false,
        );
        let assignment = self.ast.expression_assignment(
            SPAN,
            AssignmentOperator::Assign,
            AssignmentTarget::from(SimpleAssignmentTarget::from(target)),
            value,
        );
        out.push(self.ast.statement_expression(SPAN, assignment));
    }

    /// Parses generated glue code into the same arena and splices it in.
    fn push_code(&self, out: &mut oxc_allocator::Vec<'a, Statement<'a>>, code: &str) {
        if code.is_empty() {
            return;
        }
        let text: &'a str = self.ast.allocator.alloc_str(code);
        let source_type = SourceType::default().with_module(false);
        let ret = Parser::new(self.ast.allocator, text, source_type).parse();
        for stmt in ret.program.body.into_iter() {
            out.push(stmt);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATION HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn declaration_statement<'a>(declaration: Declaration<'a>) -> Option<Statement<'a>> {
    match declaration {
        Declaration::VariableDeclaration(decl) => Some(Statement::VariableDeclaration(decl)),
        Declaration::FunctionDeclaration(decl) => Some(Statement::FunctionDeclaration(decl)),
        Declaration::ClassDeclaration(decl) => Some(Statement::ClassDeclaration(decl)),
        _ => None,
    }
}

/// Names a declaration binds, in source order.
pub(crate) fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
    let mut names = Vec::new();
    match declaration {
        Declaration::VariableDeclaration(decl) => {
            for declarator in &decl.declarations {
                collect_binding_names(&declarator.id, &mut names);
            }
        }
        Declaration::FunctionDeclaration(decl) => {
            if let Some(id) = &decl.id {
                names.push(id.name.to_string());
            }
        }
        Declaration::ClassDeclaration(decl) => {
            if let Some(id) = &decl.id {
                names.push(id.name.to_string());
            }
        }
        _ => {}
    }
    names
}

fn collect_binding_names(pattern: &BindingPattern<'_>, names: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => {
            names.push(id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_binding_names(&prop.value, names);
            }
            if let Some(rest) = &obj.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for pattern in arr.elements.iter().flatten() {
                collect_binding_names(pattern, names);
            }
            if let Some(rest) = &arr.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPattern::AssignmentPattern(assign) => {
            collect_binding_names(&assign.left, names);
        }
    }
}

/// JSON string syntax is valid JavaScript string syntax.
pub(crate) fn js_string_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
