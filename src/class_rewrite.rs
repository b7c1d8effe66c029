//! Component class rewriting.
//!
//! Constructors of classes extending `Component` are rewritten so that every
//! `this` goes through the view-model proxy, and every `this.<prop> = ...`
//! assignment reading from attrs is re-run when the attrs path changes:
//!
//! ```text
//! constructor(attrs) {              constructor(attrs) {
//!   super(attrs);                     super(attrs);
//!   this.title = attrs.title;         const __vm<P> = this[$$<P>].proxy;
//! }                                   const fn_1<P> = () => {
//!                                       __vm<P>.title = attrs.title;
//!                                     };
//!                                     fn_1<P>();
//!                                     attrs[$$<P>].__watch("title", fn_1<P>);
//!                                   }
//! ```

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, AssignmentTarget, BindingPattern, Class, ClassElement, ComputedMemberExpression,
    Expression, Function, MethodDefinitionKind, Statement, StaticMemberExpression,
    ThisExpression,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use oxc_syntax::scope::ScopeFlags;
use serde_json::Value;
use std::path::Path;

use crate::edits::{apply_edits, apply_edits_within, Edit};
use crate::member::{member_chain, Link};
use crate::options::CompilerOptions;
use crate::validate::{CompilerError, SourceLocation, ERR_COMPONENT_CLASS, WARN_CLASS_WATCH};

#[derive(Debug, Clone, PartialEq)]
pub struct ClassRewrite {
    pub code: String,
    /// Number of constructors rewritten.
    pub classes: usize,
    pub warnings: Vec<CompilerError>,
}

fn location(source: &str, offset: u32) -> SourceLocation {
    SourceLocation::default().advance(source, offset as usize)
}

fn error_at(source: &str, offset: u32, message: &str) -> CompilerError {
    CompilerError::at(ERR_COMPONENT_CLASS, message, &location(source, offset))
}

/// Leading whitespace of the line containing `offset`.
fn line_indent(source: &str, offset: u32) -> &str {
    let head = &source[..offset as usize];
    let line_start = head.rfind('\n').map_or(0, |i| i + 1);
    let line = &source[line_start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

// ═══════════════════════════════════════════════════════════════════════════════
// `this` COLLECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// `this` expressions bound to the constructor: arrow functions share it,
/// functions and classes do not.
#[derive(Default)]
struct ThisCollector {
    spans: Vec<Span>,
}

impl<'a> Visit<'a> for ThisCollector {
    fn visit_this_expression(&mut self, it: &ThisExpression) {
        self.spans.push(it.span);
    }

    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_class(&mut self, _it: &Class<'a>) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRS PATH COLLECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Watched paths of `attrs` read by an expression, in first-use order.
struct AttrsPathCollector<'s> {
    attrs: &'s str,
    source: &'s str,
    paths: Vec<Value>,
    warnings: Vec<CompilerError>,
}

impl<'s> AttrsPathCollector<'s> {
    fn new(attrs: &'s str, source: &'s str) -> Self {
        Self { attrs, source, paths: Vec::new(), warnings: Vec::new() }
    }

    /// Returns false when `top` is not an identifier-rooted chain, so the
    /// caller walks into it instead.
    fn record<'a>(&mut self, top: Link<'_, 'a>) -> bool {
        let Ok(chain) = member_chain(top) else {
            return false;
        };
        if chain.root.name.as_str() != self.attrs {
            for link in &chain.links {
                if let Link::Computed(m) = link {
                    self.visit_expression(&m.expression);
                }
            }
            return true;
        }
        if chain.has_dynamic_key() {
            let loc = location(self.source, chain.span.start);
            self.warnings.push(CompilerError::at(
                WARN_CLASS_WATCH,
                "computed member expression is not supported.",
                &loc,
            ));
            return true;
        }
        let segments: Vec<Value> = chain.links.iter().filter_map(|l| l.segment()).collect();
        let private = segments
            .iter()
            .any(|s| s.as_str().is_some_and(|s| s.starts_with('_')));
        if private {
            return true;
        }
        let path = if chain.links.iter().any(|l| l.is_computed()) {
            Value::Array(segments)
        } else {
            let names: Vec<&str> = segments.iter().filter_map(|s| s.as_str()).collect();
            Value::String(names.join("."))
        };
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
        true
    }
}

impl<'a> Visit<'a> for AttrsPathCollector<'_> {
    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        if !self.record(Link::Static(it)) {
            walk::walk_static_member_expression(self, it);
        }
    }

    fn visit_computed_member_expression(&mut self, it: &ComputedMemberExpression<'a>) {
        if !self.record(Link::Computed(it)) {
            walk::walk_computed_member_expression(self, it);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTRUCTOR REWRITE
// ═══════════════════════════════════════════════════════════════════════════════

struct ClassRewriter<'s> {
    source: &'s str,
    postfix: &'s str,
    edits: Vec<Edit>,
    classes: usize,
    warnings: Vec<CompilerError>,
    error: Option<CompilerError>,
}

impl<'s> ClassRewriter<'s> {
    fn vm_name(&self) -> String {
        format!("__vm{}", self.postfix)
    }

    fn rewrite_class(&mut self, class: &Class) -> Result<(), CompilerError> {
        let extends_component = matches!(
            &class.super_class,
            Some(Expression::Identifier(id)) if id.name.as_str() == "Component"
        );
        if !extends_component {
            return Ok(());
        }
        let constructor = class.body.body.iter().find_map(|el| match el {
            ClassElement::MethodDefinition(m) if m.kind == MethodDefinitionKind::Constructor => {
                Some(m)
            }
            _ => None,
        });
        let Some(constructor) = constructor else {
            return Ok(());
        };
        let class_name = class.id.as_ref().map_or("-", |id| id.name.as_str());
        self.rewrite_constructor(&constructor.value, constructor.span.start, class_name)?;
        self.classes += 1;
        Ok(())
    }

    fn rewrite_constructor(
        &mut self,
        func: &Function,
        start: u32,
        class_name: &str,
    ) -> Result<(), CompilerError> {
        let attrs = match func.params.items.first().map(|p| &p.pattern) {
            Some(BindingPattern::BindingIdentifier(id)) => id.name.to_string(),
            _ => {
                return Err(error_at(
                    self.source,
                    start,
                    &format!("constructor of {} must accept at least one argument.", class_name),
                ))
            }
        };
        let Some(body) = &func.body else {
            return Ok(());
        };

        let vm = self.vm_name();
        let mut found_super = false;
        for (i, stmt) in body.statements.iter().enumerate() {
            let span = stmt.span();
            if let Statement::ReturnStatement(_) = stmt {
                return Err(error_at(
                    self.source,
                    span.start,
                    &format!("constructor of '{}' can't have return statement.", class_name),
                ));
            }
            if let Some(call) = super_call(stmt) {
                let passes_attrs = matches!(
                    call.first(),
                    Some(Argument::Identifier(id)) if id.name.as_str() == attrs
                );
                if !passes_attrs {
                    return Err(error_at(
                        self.source,
                        span.start,
                        &format!(
                            "constructor of {} must pass first argument '{}' to super-class",
                            class_name, attrs
                        ),
                    ));
                }
                found_super = true;
                let indent = line_indent(self.source, span.start);
                self.edits.push(Edit::insert(
                    span.end,
                    format!(
                        "\n{}const {} = this[$${}].proxy;",
                        indent, vm, self.postfix
                    ),
                ));
                continue;
            }

            let mut this_refs = ThisCollector::default();
            this_refs.visit_statement(stmt);
            if this_refs.spans.is_empty() {
                continue;
            }
            if !found_super {
                return Err(error_at(
                    self.source,
                    this_refs.spans[0].start,
                    "can't use 'this' before call super().",
                ));
            }
            let this_edits: Vec<Edit> = this_refs
                .spans
                .iter()
                .map(|s| Edit::replace(s.start, s.end, vm.as_str()))
                .collect();

            let paths = match watched_assignment(stmt) {
                Some(right) => {
                    let mut collector = AttrsPathCollector::new(&attrs, self.source);
                    collector.visit_expression(right);
                    self.warnings.append(&mut collector.warnings);
                    collector.paths
                }
                None => Vec::new(),
            };
            if paths.is_empty() {
                self.edits.extend(this_edits);
                continue;
            }

            let code = apply_edits_within(self.source, &this_edits, span.start, span.end)?;
            let indent = line_indent(self.source, span.start);
            let fn_name = format!("fn_{}{}", i, self.postfix);
            let mut lines = vec![
                format!("const {} = () => {{", fn_name),
                format!("{}  {}", indent, code),
                format!("{}}};", indent),
                format!("{}{}();", indent, fn_name),
            ];
            for path in &paths {
                lines.push(format!(
                    "{}{}[$${}].__watch({}, {});",
                    indent, attrs, self.postfix, path, fn_name
                ));
            }
            self.edits.push(Edit::replace(span.start, span.end, lines.join("\n")));
        }
        Ok(())
    }
}

impl<'a> Visit<'a> for ClassRewriter<'_> {
    fn visit_class(&mut self, class: &Class<'a>) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.rewrite_class(class) {
            self.error = Some(err);
            return;
        }
        walk::walk_class(self, class);
    }
}

fn super_call<'b, 'a>(stmt: &'b Statement<'a>) -> Option<&'b oxc_allocator::Vec<'a, Argument<'a>>> {
    let Statement::ExpressionStatement(es) = stmt else {
        return None;
    };
    match &es.expression {
        Expression::CallExpression(call) if matches!(call.callee, Expression::Super(_)) => {
            Some(&call.arguments)
        }
        _ => None,
    }
}

/// Right side of `this.<prop> = <expr>;` when `<prop>` is public.
fn watched_assignment<'b, 'a>(stmt: &'b Statement<'a>) -> Option<&'b Expression<'a>> {
    let Statement::ExpressionStatement(es) = stmt else {
        return None;
    };
    let Expression::AssignmentExpression(assign) = &es.expression else {
        return None;
    };
    match &assign.left {
        AssignmentTarget::StaticMemberExpression(m)
            if matches!(m.object, Expression::ThisExpression(_))
                && !m.property.name.starts_with('_') =>
        {
            Some(&assign.right)
        }
        _ => None,
    }
}

/// Rewrites every component class constructor of a module.
pub fn rewrite_component(
    source: &str,
    resource_path: &str,
    options: &CompilerOptions,
) -> Result<ClassRewrite, CompilerError> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(Path::new(resource_path))
        .unwrap_or_default()
        .with_module(true);
    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(diag) = ret.errors.first() {
        let offset = diag
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map_or(0, |l| l.offset() as u32);
        return Err(error_at(source, offset, &diag.to_string()));
    }

    let mut rewriter = ClassRewriter {
        source,
        postfix: &options.symbol_postfix,
        edits: Vec::new(),
        classes: 0,
        warnings: Vec::new(),
        error: None,
    };
    rewriter.visit_program(&ret.program);
    if let Some(err) = rewriter.error {
        return Err(err);
    }
    if rewriter.classes == 0 {
        return Ok(ClassRewrite {
            code: source.to_string(),
            classes: 0,
            warnings: rewriter.warnings,
        });
    }

    rewriter.edits.push(Edit::insert(
        0,
        format!(
            "import {{ $$ as $${} }} from '{}';\n",
            options.symbol_postfix, options.runtime_module
        ),
    ));
    let code = apply_edits(source, &rewriter.edits)?;
    tracing::debug!(
        file = resource_path,
        classes = rewriter.classes,
        "component constructors rewritten"
    );
    Ok(ClassRewrite {
        code,
        classes: rewriter.classes,
        warnings: rewriter.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::WARN_CLASS_WATCH;
    use pretty_assertions::assert_eq;

    fn options() -> CompilerOptions {
        CompilerOptions {
            symbol_postfix: "_p".to_string(),
            ..CompilerOptions::default()
        }
    }

    fn rewrite(source: &str) -> Result<ClassRewrite, CompilerError> {
        rewrite_component(source, "app.c.js", &options())
    }

    #[test]
    fn test_watches_attrs_read_by_assignment() {
        let source = "class App extends Component {\n  constructor(attrs) {\n    super(attrs);\n    this.title = attrs.title + attrs.sub.name;\n    this._cache = attrs.x;\n  }\n}\n";
        let out = rewrite(source).unwrap();
        assert_eq!(
            out.code,
            "import { $$ as $$_p } from 'jinge';\n\
class App extends Component {\n  constructor(attrs) {\n    super(attrs);\n    const __vm_p = this[$$_p].proxy;\n    const fn_1_p = () => {\n      __vm_p.title = attrs.title + attrs.sub.name;\n    };\n    fn_1_p();\n    attrs[$$_p].__watch(\"title\", fn_1_p);\n    attrs[$$_p].__watch(\"sub.name\", fn_1_p);\n    __vm_p._cache = attrs.x;\n  }\n}\n"
        );
        assert_eq!(out.classes, 1);
    }

    #[test]
    fn test_literal_computed_key_watches_array_path() {
        let source = "class A extends Component {\n  constructor(a) {\n    super(a);\n    this.v = a.list[0];\n  }\n}";
        let out = rewrite(source).unwrap();
        assert!(out.code.contains("a[$$_p].__watch([\"list\",0], fn_1_p);"));
    }

    #[test]
    fn test_dynamic_key_warns_and_is_not_watched() {
        let source = "class A extends Component {\n  constructor(a) {\n    super(a);\n    this.v = a.list[i];\n  }\n}";
        let out = rewrite(source).unwrap();
        assert!(!out.code.contains("__watch"));
        assert!(out.code.contains("__vm_p.v = a.list[i];"));
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].code, WARN_CLASS_WATCH);
        assert_eq!(out.warnings[0].line, 4);
    }

    #[test]
    fn test_nested_function_keeps_own_this() {
        let source = "class A extends Component {\n  constructor(a) {\n    super(a);\n    this.run(() => this.x, function () { return this; });\n  }\n}";
        let out = rewrite(source).unwrap();
        assert!(out
            .code
            .contains("__vm_p.run(() => __vm_p.x, function () { return this; });"));
    }

    #[test]
    fn test_constructor_errors() {
        let err = rewrite("class A extends Component {\n  constructor() { super(); }\n}").unwrap_err();
        assert_eq!(err.message, "constructor of A must accept at least one argument.");
        assert_eq!(err.line, 2);

        let err = rewrite("class A extends Component {\n  constructor(a) { super(); }\n}").unwrap_err();
        assert_eq!(err.message, "constructor of A must pass first argument 'a' to super-class");

        let err = rewrite("class A extends Component {\n  constructor(a) { this.x = 1; super(a); }\n}")
            .unwrap_err();
        assert_eq!(err.message, "can't use 'this' before call super().");

        let err = rewrite("class A extends Component {\n  constructor(a) { super(a); return; }\n}")
            .unwrap_err();
        assert_eq!(err.message, "constructor of 'A' can't have return statement.");
    }

    #[test]
    fn test_component_declared_inside_method_is_rewritten() {
        let source = "class Host {\n  make() {\n    return class extends Component {\n      constructor(a) {\n        super(a);\n        this.x = 1;\n      }\n    };\n  }\n}\n";
        let out = rewrite(source).unwrap();
        assert_eq!(out.classes, 1);
        assert!(out.code.contains("        super(a);\n        const __vm_p = this[$$_p].proxy;"));
        assert!(out.code.contains("__vm_p.x = 1;"));
    }

    #[test]
    fn test_other_classes_are_untouched() {
        let source = "class A extends Base {\n  constructor(a) { super(a); this.x = a.x; }\n}";
        let out = rewrite(source).unwrap();
        assert_eq!(out.code, source);
        assert_eq!(out.classes, 0);
    }
}
