//! Expression compiler.
//!
//! Compiles one template expression (attribute value, text interpolation)
//! into either a constant code string or the five sections of a reactive
//! binding: declarations, calculations, initial invocations, update
//! functions and watch registrations.
//!
//! Generated code keeps a few placeholders that only the caller can fill:
//!
//! - `$ROOT_INDEX$` distinguishes bindings sharing one generated scope
//! - `$RENDER_START$` / `$RENDER_END$` wrap the value where it is consumed
//! - `$REL_COM$` is the component whose destruction releases the watchers
//! - `$MODEL_START$` / `$MODEL_END$` wrap object and array literals
//!
//! A member chain with a dynamic key (`list[idx]`) gets its own nested
//! scope. The key is compiled recursively, and the chain is re-watched
//! only when the tuple of accessed path segments actually changes.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    CallExpression, ComputedMemberExpression, Expression, IdentifierReference, NewExpression,
    ObjectProperty, PrivateFieldExpression, StaticMemberExpression, TaggedTemplateExpression,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use serde_json::Value;

use crate::edits::{apply_edits_within, Edit};
use crate::member::{member_chain, ChainError, Link, MemberChain};
use crate::parse::find_balanced_brace_end;
use crate::scope::{ExprScope, CONST_GLOBALS};
use crate::tpl::{replace_tpl, REL_COM};
use crate::validate::{
    CompilerError, SourceLocation, ERR_CALL_IN_EXPRESSION, ERR_EXPRESSION_SYNTAX,
    ERR_UNSUPPORTED_EXPRESSION,
};

pub const ROOT_INDEX: &str = "$ROOT_INDEX$";

// ═══════════════════════════════════════════════════════════════════════════════
// RESULT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// `(scope variable, JSON path)` of one reactive dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPath {
    pub vm: String,
    pub n: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExprCodes {
    pub declarations: Vec<String>,
    pub calculations: Vec<String>,
    pub initializers: Vec<String>,
    pub updates: Vec<String>,
    pub watches: Vec<String>,
}

impl ExprCodes {
    fn extend(&mut self, other: ExprCodes) {
        self.declarations.extend(other.declarations);
        self.calculations.extend(other.calculations);
        self.initializers.extend(other.initializers);
        self.updates.extend(other.updates);
        self.watches.extend(other.watches);
    }

    /// All five sections with the placeholders of `slot` filled in.
    pub fn render(&self, slot: &RenderSlot) -> String {
        join_sections(
            &[
                &self.declarations,
                &self.calculations,
                &self.initializers,
                &self.updates,
                &self.watches,
            ],
            slot,
        )
    }

    /// Declarations, calculations and initial invocations.
    pub fn render_setup(&self, slot: &RenderSlot) -> String {
        join_sections(&[&self.declarations, &self.calculations, &self.initializers], slot)
    }

    /// Update functions and watch registrations.
    pub fn render_watch(&self, slot: &RenderSlot) -> String {
        join_sections(&[&self.updates, &self.watches], slot)
    }
}

fn join_sections(sections: &[&Vec<String>], slot: &RenderSlot) -> String {
    let code = sections
        .iter()
        .flat_map(|s| s.iter())
        .filter(|c| !c.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    slot.instantiate(&code)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledExpr {
    Const { code: String, model: bool },
    Reactive { codes: ExprCodes, model: bool },
}

impl CompiledExpr {
    pub fn is_const(&self) -> bool {
        matches!(self, CompiledExpr::Const { .. })
    }

    /// Whether the expression is an object or array literal.
    pub fn is_model(&self) -> bool {
        match self {
            CompiledExpr::Const { model, .. } | CompiledExpr::Reactive { model, .. } => *model,
        }
    }
}

/// Wraps a constant object/array literal into a view model.
pub fn model_code(code: &str, model: bool) -> String {
    if model {
        format!("vm$POSTFIX$({})", code)
    } else {
        code.to_string()
    }
}

/// Where a reactive binding is consumed.
#[derive(Debug, Clone)]
pub struct RenderSlot<'a> {
    pub root_index: usize,
    pub render_start: &'a str,
    pub render_end: &'a str,
    pub rel_com: &'a str,
    pub wrap_model: bool,
}

impl<'a> RenderSlot<'a> {
    pub fn new(root_index: usize, render_start: &'a str, render_end: &'a str) -> Self {
        Self {
            root_index,
            render_start,
            render_end,
            rel_com: REL_COM,
            wrap_model: true,
        }
    }

    pub fn with_rel_com(mut self, rel_com: &'a str) -> Self {
        self.rel_com = rel_com;
        self
    }

    pub fn without_model(mut self) -> Self {
        self.wrap_model = false;
        self
    }

    pub fn instantiate(&self, code: &str) -> String {
        let index = self.root_index.to_string();
        let (model_start, model_end) = if self.wrap_model {
            ("vm$POSTFIX$(", ")")
        } else {
            ("(", ")")
        };
        replace_tpl(
            code,
            &[
                ("ROOT_INDEX", &index),
                ("RENDER_START", self.render_start),
                ("RENDER_END", self.render_end),
                ("REL_COM", self.rel_com),
                ("MODEL_START", model_start),
                ("MODEL_END", model_end),
            ],
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Any,
    Object,
    Array,
}

/// Compiles a JavaScript expression whose first character sits at `origin`.
pub fn compile_expression(
    text: &str,
    origin: &SourceLocation,
    scope: ExprScope,
) -> Result<CompiledExpr, CompilerError> {
    compile_with_prefix(text, origin, 0, scope)
}

/// Compiles literal text with `${}` interpolations as a template literal.
pub fn compile_template_text(
    text: &str,
    origin: &SourceLocation,
    scope: ExprScope,
) -> Result<CompiledExpr, CompilerError> {
    compile_with_prefix(&to_template_literal(text), origin, 1, scope)
}

/// Wraps `text` in backticks, escaping everything outside interpolations.
pub fn to_template_literal(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 2);
    out.push('`');
    let mut i = 0;
    let mut literal_start = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = find_balanced_brace_end(bytes, i + 1) {
                escape_literal(&text[literal_start..i], &mut out);
                out.push_str(&text[i..end]);
                i = end;
                literal_start = end;
                continue;
            }
        }
        i += 1;
    }
    escape_literal(&text[literal_start..], &mut out);
    out.push('`');
    out
}

fn escape_literal(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}

fn compile_with_prefix(
    text: &str,
    origin: &SourceLocation,
    prefix_len: usize,
    scope: ExprScope,
) -> Result<CompiledExpr, CompilerError> {
    let lead = text.len() - text.trim_start().len();
    let origin = origin.advance(text, lead.saturating_sub(prefix_len));
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CompilerError::at(ERR_EXPRESSION_SYNTAX, "expression is empty", &origin));
    }
    let shape = if trimmed.starts_with('{') {
        Shape::Object
    } else if trimmed.starts_with('[') {
        Shape::Array
    } else {
        Shape::Any
    };
    let (source, offset) = if shape == Shape::Object {
        (format!("({})", trimmed), prefix_len + 1)
    } else {
        (trimmed.to_string(), prefix_len)
    };

    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);
    let expr = Parser::new(&allocator, &source, source_type)
        .parse_expression()
        .map_err(|diagnostics| {
            let detail = diagnostics
                .first()
                .map(|d| d.to_string())
                .unwrap_or_default();
            CompilerError::at(
                ERR_EXPRESSION_SYNTAX,
                &format!("expression syntax error: {} ({})", detail, trimmed),
                &origin,
            )
        })?;

    let target = match shape {
        Shape::Object => match unwrap_parens(&expr) {
            e @ Expression::ObjectExpression(_) => e,
            _ => {
                return Err(CompilerError::at(
                    ERR_EXPRESSION_SYNTAX,
                    "expression starting with '{' must be an object literal",
                    &origin,
                ))
            }
        },
        Shape::Array => match &expr {
            e @ Expression::ArrayExpression(_) => e,
            _ => {
                return Err(CompilerError::at(
                    ERR_EXPRESSION_SYNTAX,
                    "expression starting with '[' must be an array literal",
                    &origin,
                ))
            }
        },
        Shape::Any => &expr,
    };

    let mut walker = ExprWalker::new(scope, &source, vec![ROOT_INDEX.to_string()], origin, offset);
    walker.visit_expression(target);
    if let Some(err) = walker.error.take() {
        return Err(err);
    }
    let model = shape != Shape::Any;
    match walker.finish(target.span(), model)? {
        Finished::Const(code) => Ok(CompiledExpr::Const { code, model }),
        Finished::Reactive(codes) => Ok(CompiledExpr::Reactive { codes, model }),
    }
}

fn unwrap_parens<'b, 'a>(mut expr: &'b Expression<'a>) -> &'b Expression<'a> {
    while let Expression::ParenthesizedExpression(p) = expr {
        expr = &p.expression;
    }
    expr
}

// ═══════════════════════════════════════════════════════════════════════════════
// WALKER
// ═══════════════════════════════════════════════════════════════════════════════

enum Finished {
    Const(String),
    Reactive(ExprCodes),
}

struct ExprWalker<'s> {
    scope: ExprScope<'s>,
    source: &'s str,
    level_path: Vec<String>,
    edits: Vec<Edit>,
    watch_paths: Vec<WatchPath>,
    is_const: bool,
    computed_count: usize,
    nested: ExprCodes,
    error: Option<CompilerError>,
    origin: SourceLocation,
    offset: usize,
}

impl<'s> ExprWalker<'s> {
    fn new(
        scope: ExprScope<'s>,
        source: &'s str,
        level_path: Vec<String>,
        origin: SourceLocation,
        offset: usize,
    ) -> Self {
        Self {
            scope,
            source,
            level_path,
            edits: Vec::new(),
            watch_paths: Vec::new(),
            is_const: true,
            computed_count: 0,
            nested: ExprCodes::default(),
            error: None,
            origin,
            offset,
        }
    }

    fn level_id(&self) -> String {
        self.level_path.join("_")
    }

    fn location_of(&self, span: Span) -> SourceLocation {
        let at = (span.start as usize).saturating_sub(self.offset);
        self.origin.advance(self.source, at)
    }

    fn fail(&mut self, code: &str, message: &str, span: Span) {
        if self.error.is_none() {
            let loc = self.location_of(span);
            self.error = Some(CompilerError::at(code, message, &loc));
        }
    }

    fn fail_chain(&mut self, err: ChainError) {
        match err {
            ChainError::Call(span) => self.fail(
                ERR_CALL_IN_EXPRESSION,
                "Function call is not allowed in expression",
                span,
            ),
            ChainError::Unsupported(span) => self.fail(
                ERR_UNSUPPORTED_EXPRESSION,
                "expression not support: member access must start from an identifier",
                span,
            ),
        }
    }

    fn add_path(&mut self, vm: String, path: Vec<Value>) {
        let n = Value::Array(path).to_string();
        if !self.watch_paths.iter().any(|p| p.vm == vm && p.n == n) {
            self.watch_paths.push(WatchPath { vm, n });
        }
    }

    /// Rewritten form of a bare identifier, registering its watch path.
    fn convert_identifier(&mut self, ident: &IdentifierReference) -> Option<String> {
        let name = ident.name.as_str();
        if self.scope.is_import(name) {
            return Some(self.scope.import_name(name));
        }
        if CONST_GLOBALS.contains(name) {
            return None;
        }
        let (vm, prop) = self.scope.vm_target(name);
        let code = format!("{}.{}", vm, prop);
        self.add_path(vm, vec![Value::String(prop)]);
        self.is_const = false;
        Some(code)
    }

    fn member(&mut self, top: Link) {
        if self.error.is_some() {
            return;
        }
        let chain = match member_chain(top) {
            Ok(chain) => chain,
            Err(err) => return self.fail_chain(err),
        };
        let root_name = chain.root.name.as_str();
        if self.scope.is_import(root_name) {
            // Imported modules are constant; only their dynamic keys can change.
            let code = self.scope.import_name(root_name);
            self.edits.push(Edit::replace(chain.root.span.start, chain.root.span.end, code));
            for link in &chain.links {
                if let Link::Computed(c) = link {
                    if link.segment().is_none() {
                        self.visit_expression(&c.expression);
                    }
                }
            }
            return;
        }
        if chain.has_dynamic_key() {
            self.computed_chain(&chain);
        } else {
            self.static_chain(&chain);
        }
    }

    fn static_chain(&mut self, chain: &MemberChain) {
        let (vm, prop) = self.scope.vm_target(chain.root.name.as_str());
        self.edits.push(Edit::replace(
            chain.root.span.start,
            chain.root.span.end,
            format!("{}.{}", vm, prop),
        ));
        let mut path = vec![Value::String(prop)];
        for link in &chain.links {
            if let Some(seg) = link.segment() {
                path.push(seg);
            }
            if !link.optional() {
                self.edits.push(Edit::insert(link.object().span().end, link.optional_marker()));
            }
        }
        self.add_path(vm, path);
        self.is_const = false;
    }

    fn computed_chain(&mut self, chain: &MemberChain) {
        let lv = format!("{}_{}", self.level_id(), self.computed_count);
        self.computed_count += 1;
        let mut lv_path = self.level_path.clone();
        lv_path.push((self.computed_count - 1).to_string());

        let (vm, prop) = self.scope.vm_target(chain.root.name.as_str());
        let mut repls = vec![Edit::replace(
            chain.root.span.start,
            chain.root.span.end,
            format!("{}.{}", vm, prop),
        )];
        let mut segments = vec![Value::String(prop).to_string()];
        let mut key_index = 0usize;
        let mut key_codes = ExprCodes::default();

        for link in &chain.links {
            match (link, link.segment()) {
                (_, Some(seg)) => segments.push(seg.to_string()),
                (Link::Computed(c), None) => {
                    let mut llv = lv_path.clone();
                    llv.push(key_index.to_string());
                    key_index += 1;
                    let llv_id = llv.join("_");
                    let key_span = c.expression.span();

                    let mut nested = ExprWalker::new(self.scope, self.source, llv, self.origin, self.offset);
                    nested.visit_expression(&c.expression);
                    if let Some(err) = nested.error.take() {
                        self.error = Some(err);
                        return;
                    }
                    match nested.finish(key_span, false) {
                        Ok(Finished::Const(code)) => {
                            repls.push(Edit::replace(key_span.start, key_span.end, code.clone()));
                            segments.push(code);
                        }
                        Ok(Finished::Reactive(codes)) => {
                            repls.push(Edit::replace(key_span.start, key_span.end, format!("_{}", llv_id)));
                            segments.push(format!("_{}", llv_id));
                            key_codes.extend(codes);
                        }
                        Err(err) => {
                            self.error = Some(err);
                            return;
                        }
                    }
                }
                (Link::Static(_), None) => {}
            }
            if !link.optional() {
                repls.push(Edit::insert(link.object().span().end, link.optional_marker()));
            }
        }

        let chain_code = match apply_edits_within(self.source, &repls, chain.span.start, chain.span.end) {
            Ok(code) => code,
            Err(err) => {
                self.error = Some(err.into());
                return;
            }
        };
        let parent = self.level_id();

        self.nested.extend(key_codes);
        self.nested.declarations.push(format!("let _{lv};\nlet _{lv}_p;"));
        self.nested.calculations.push(format!(
            "function _calc_{lv}() {{\n  _{lv} = {chain_code};\n}}"
        ));
        self.nested.initializers.push(format!("_calc_{lv}();"));
        self.nested.updates.push(format!(
            "function _update_{lv}() {{\n  _calc_{lv}();\n  _update_{parent}();\n}}"
        ));
        self.nested.updates.push(format!(
            "function _notify_{lv}() {{
  const _np = [{segments}];
  const _eq = _{lv}_p && arrayEqual$POSTFIX$(_{lv}_p, _np);
  if (_{lv}_p && !_eq) {{
    {vm}[$$$POSTFIX$].__unwatch(_{lv}_p, _update_{lv}, $REL_COM$);
  }}
  if (!_{lv}_p || !_eq) {{
    _{lv}_p = _np;
    {vm}[$$$POSTFIX$].__watch(_{lv}_p, _update_{lv}, $REL_COM$);
  }}
}}",
            segments = segments.join(", "),
        ));
        self.nested.watches.push(format!("_notify_{lv}();"));

        self.edits.push(Edit::replace(chain.span.start, chain.span.end, format!("_{}", lv)));
        self.is_const = false;
    }

    fn watch_lines(&self, handler: &str) -> Vec<String> {
        self.watch_paths
            .iter()
            .map(|p| format!("{}[$$$POSTFIX$].__watch({}, {}, $REL_COM$);", p.vm, p.n, handler))
            .collect()
    }

    fn finish(self, span: Span, model: bool) -> Result<Finished, CompilerError> {
        let code = apply_edits_within(self.source, &self.edits, span.start, span.end)?;
        if self.is_const {
            return Ok(Finished::Const(code));
        }
        let id = self.level_id();
        let value = if model {
            format!("$MODEL_START${}$MODEL_END$", code)
        } else {
            code
        };
        let mut codes = ExprCodes::default();

        if self.level_path.len() == 1 {
            if self.computed_count == 0 {
                codes.calculations.push(format!(
                    "const fn_{id} = () => {{\n  $RENDER_START${value}$RENDER_END$\n}};"
                ));
                codes.initializers.push(format!("fn_{id}();"));
                codes.watches = self.watch_lines(&format!("fn_{}", id));
                return Ok(Finished::Reactive(codes));
            }
            codes.updates.push(format!("function _update_{id}() {{\n  _calc_{id}();\n}}"));
            let watches = self.watch_lines(&format!("_update_{}", id));
            let nested = self.nested;
            codes.declarations = nested.declarations;
            codes.calculations = nested.calculations;
            codes.calculations.push(format!(
                "function _calc_{id}() {{\n  $RENDER_START${value}$RENDER_END$\n}}"
            ));
            codes.initializers = nested.initializers;
            codes.initializers.push(format!("_calc_{id}();"));
            codes.updates.extend(nested.updates);
            codes.watches = nested.watches;
            codes.watches.extend(watches);
            return Ok(Finished::Reactive(codes));
        }

        let parent = self.level_path[..self.level_path.len() - 1].join("_");
        let watches = self.watch_lines(&format!("_update_{}", id));
        codes.updates.push(format!(
            "function _update_{id}() {{\n  _calc_{id}();\n  _notify_{parent}();\n  _update_{parent}();\n}}"
        ));
        let nested = self.nested;
        codes.declarations.push(format!("let _{id};"));
        codes.declarations.extend(nested.declarations);
        codes.calculations = nested.calculations;
        codes.calculations.push(format!("function _calc_{id}() {{\n  _{id} = {value};\n}}"));
        codes.initializers = nested.initializers;
        codes.initializers.push(format!("_calc_{id}();"));
        codes.updates.extend(nested.updates);
        codes.watches = nested.watches;
        codes.watches.extend(watches);
        Ok(Finished::Reactive(codes))
    }
}

impl<'a, 's> Visit<'a> for ExprWalker<'s> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        if self.error.is_some() {
            return;
        }
        if let Some(code) = self.convert_identifier(ident) {
            self.edits.push(Edit::replace(ident.span.start, ident.span.end, code));
        }
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand {
            if let Expression::Identifier(ident) = &prop.value {
                if let Some(code) = self.convert_identifier(ident) {
                    let expanded = format!("{}: {}", ident.name, code);
                    self.edits.push(Edit::replace(ident.span.start, ident.span.end, expanded));
                }
                return;
            }
        }
        oxc_ast_visit::walk::walk_object_property(self, prop);
    }

    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        self.member(Link::Static(it));
    }

    fn visit_computed_member_expression(&mut self, it: &ComputedMemberExpression<'a>) {
        self.member(Link::Computed(it));
    }

    fn visit_private_field_expression(&mut self, it: &PrivateFieldExpression<'a>) {
        self.fail(ERR_UNSUPPORTED_EXPRESSION, "expression not support: private field", it.span);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        self.fail(ERR_CALL_IN_EXPRESSION, "Function call is not allowed in expression", it.span);
    }

    fn visit_new_expression(&mut self, it: &NewExpression<'a>) {
        self.fail(ERR_CALL_IN_EXPRESSION, "Function call is not allowed in expression", it.span);
    }

    fn visit_tagged_template_expression(&mut self, it: &TaggedTemplateExpression<'a>) {
        self.fail(ERR_CALL_IN_EXPRESSION, "Function call is not allowed in expression", it.span);
    }
}
