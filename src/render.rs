//! Render-function generation: walks the template tree and composes the
//! code fragment of every node.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{ImportDeclarationSpecifier, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;
use std::collections::HashSet;

use crate::alias::{AliasImports, AliasRegistry};
use crate::component::component_element;
use crate::element::html_element;
use crate::expression::{compile_template_text, CompiledExpr, RenderSlot};
use crate::parse::decode_entities;
use crate::scope::{ExprScope, Parent, ParentSub, VM};
use crate::tags::{is_html_tag, is_svg_tag};
use crate::tpl::{prepend_tab2, replace_tpl, PUSH_ROOT_ELE, TEXT_CONST, TEXT_EXPR};
use crate::validate::{
    CommentNode, CompilerError, ElementNode, SourceLocation, TemplateNode, TextNode,
    ERR_COMMENT_IMPORT, ERR_RESERVED_TAG, ERR_SLOT_SIBLINGS, ERR_UNKNOWN_TAG,
    WARN_ALIAS_SHADOWS_HTML,
};
use crate::visitor::TemplateVisitor;

lazy_static! {
    static ref IMPORT_KEYWORD: Regex = Regex::new(r"(^|[\s;])import($|\s)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Html,
    Component,
    Text,
}

/// Code of one node, as it appears in its parent's element list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedElement {
    pub kind: ElementKind,
    pub sub: Option<ParentSub>,
    /// Slot key when the element is passed to its parent component.
    pub arg_pass: Option<String>,
    pub value: String,
}

impl ParsedElement {
    pub fn html(value: String) -> Self {
        Self { kind: ElementKind::Html, sub: None, arg_pass: None, value }
    }

    pub fn text(value: String) -> Self {
        Self { kind: ElementKind::Text, sub: None, arg_pass: None, value }
    }

    pub fn component(sub: ParentSub, value: String) -> Self {
        Self { kind: ElementKind::Component, sub: Some(sub), arg_pass: None, value }
    }

    pub fn argument(key: String, value: String) -> Self {
        Self {
            kind: ElementKind::Component,
            sub: Some(ParentSub::Argument),
            arg_pass: Some(key),
            value,
        }
    }

    fn is_argument(&self) -> bool {
        self.kind == ElementKind::Component && self.sub == Some(ParentSub::Argument)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub render_fn: String,
    pub alias_imports: String,
    pub imports: String,
    pub warnings: Vec<CompilerError>,
}

pub struct RenderVisitor<'c> {
    aliases: &'c AliasRegistry,
    import_postfix: &'c str,
    add_debug_name: bool,
    vms: Vec<VM>,
    parent: Parent,
    stack: Vec<(Vec<VM>, Parent)>,
    imports: HashSet<String>,
    import_codes: Vec<String>,
    alias_imports: AliasImports,
    need_handle_comment: bool,
    warnings: Vec<CompilerError>,
}

impl<'c> RenderVisitor<'c> {
    pub fn new(aliases: &'c AliasRegistry, import_postfix: &'c str, add_debug_name: bool) -> Self {
        Self {
            aliases,
            import_postfix,
            add_debug_name,
            vms: Vec::new(),
            parent: Parent::root(),
            stack: Vec::new(),
            imports: HashSet::new(),
            import_codes: Vec::new(),
            alias_imports: AliasImports::default(),
            need_handle_comment: true,
            warnings: Vec::new(),
        }
    }

    /// Compiles a whole template into its render function.
    pub fn visit_template(mut self, nodes: &[TemplateNode]) -> Result<RenderOutput, CompilerError> {
        let elements = self.visit_children(nodes)?;
        Ok(RenderOutput {
            render_fn: self.gen_render(&elements, 0),
            alias_imports: self.alias_imports.get_code(),
            imports: self.import_codes.join("\n").trim().to_string(),
            warnings: self.warnings,
        })
    }

    pub(crate) fn parent(&self) -> &Parent {
        &self.parent
    }

    pub(crate) fn scope(&self) -> ExprScope<'_> {
        ExprScope::new(&self.vms, &self.imports, self.import_postfix)
    }

    pub(crate) fn add_debug_name(&self) -> bool {
        self.add_debug_name
    }

    pub(crate) fn warn(&mut self, code: &str, message: &str, location: &SourceLocation) {
        tracing::debug!(code, line = location.line, "{}", message);
        self.warnings.push(CompilerError::at(code, message, location));
    }

    fn enter(&mut self, vms: &[VM], parent: Parent) {
        let prev = std::mem::replace(&mut self.parent, parent);
        self.stack.push((self.vms.clone(), prev));
        self.vms.extend(vms.iter().cloned());
    }

    fn exit(&mut self) {
        if let Some((vms, parent)) = self.stack.pop() {
            self.vms = vms;
            self.parent = parent;
        }
    }

    /// Visits `children` with `vms` bound and `parent` as the enclosing context.
    pub(crate) fn visit_child_nodes(
        &mut self,
        children: &[TemplateNode],
        vms: &[VM],
        parent: Parent,
    ) -> Result<Vec<ParsedElement>, CompilerError> {
        if children.is_empty() {
            return Ok(Vec::new());
        }
        self.enter(vms, parent);
        let result = self.visit_children(children);
        self.exit();
        result
    }

    pub(crate) fn join_elements(elements: &[ParsedElement]) -> String {
        elements
            .iter()
            .map(|e| e.value.as_str())
            .collect::<Vec<_>>()
            .join(",\n")
    }

    /// `function(component) { ... return [elements]; }`, binding `vm_<level>`
    /// to the rendering component when `vm_level >= 0`.
    pub(crate) fn gen_render(&self, elements: &[ParsedElement], vm_level: i64) -> String {
        let mut body = if vm_level >= 0 {
            format!("const vm_{} = component;\n", vm_level)
        } else {
            String::new()
        };
        body.push_str(&format!("return [\n{}\n];", Self::join_elements(elements)));
        let body = prepend_tab2(&body);
        format!("function(component) {{\n{}\n}}", body)
    }

    /// Children of one component are all slot-pass elements or none is.
    /// Returns whether they all are.
    pub(crate) fn assert_arg_pass(
        &self,
        location: &SourceLocation,
        elements: &[ParsedElement],
        component: &str,
    ) -> Result<bool, CompilerError> {
        let mixed = || {
            CompilerError::at(
                ERR_SLOT_SIBLINGS,
                &format!(
                    "children of <{}> must satisfy the requirement that all of them contain slot-pass: attribute or none of them contain slot-pass: attribute",
                    component
                ),
                location,
            )
        };
        let mut found = 0i8;
        let mut keys: HashSet<&str> = HashSet::new();
        for el in elements {
            if el.is_argument() {
                if found < 0 {
                    return Err(mixed());
                }
                let key = el.arg_pass.as_deref().unwrap_or("default");
                if !keys.insert(key) {
                    return Err(CompilerError::at(
                        ERR_SLOT_SIBLINGS,
                        &format!(
                            "slot-pass: attribute name must be unique under <{}>, but found duplicate: {}",
                            component, key
                        ),
                        location,
                    ));
                }
                found = 1;
            } else {
                if found > 0 {
                    return Err(mixed());
                }
                found = -1;
            }
        }
        Ok(found > 0)
    }

    fn handle_comment_imports(&mut self, comment: &CommentNode) -> Result<(), CompilerError> {
        let code = comment.value.as_str();
        if !IMPORT_KEYWORD.is_match(code) {
            return Ok(());
        }
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, SourceType::default().with_module(true)).parse();
        if !ret.errors.is_empty() {
            return Err(CompilerError::at(
                ERR_COMMENT_IMPORT,
                "keyword \"import\" is found in comment, but got error when trying to parse it as js code.",
                &comment.location,
            ));
        }
        let mut lines = Vec::new();
        for stmt in &ret.program.body {
            let Statement::ImportDeclaration(decl) = stmt else {
                continue;
            };
            let Some(specifiers) = decl.specifiers.as_ref().filter(|s| !s.is_empty()) else {
                continue;
            };
            let mut parts = Vec::with_capacity(specifiers.len());
            for spec in specifiers {
                let (imported, local) = match spec {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        (s.imported.name().to_string(), s.local.name.to_string())
                    }
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        ("default".to_string(), s.local.name.to_string())
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => {
                        return Err(CompilerError::at(
                            ERR_COMMENT_IMPORT,
                            "unsupport import type: namespace imports are not allowed in comment imports",
                            &comment.location,
                        ))
                    }
                };
                parts.push(format!("{} as {}{}", imported, local, self.import_postfix));
                self.imports.insert(local);
            }
            lines.push(format!("import {{ {} }} from '{}';", parts.join(", "), decl.source.value));
        }
        self.import_codes.push(lines.join("\n"));
        Ok(())
    }

    fn resolve_element(&mut self, element: &ElementNode) -> Result<ParsedElement, CompilerError> {
        let tag = element.tag.as_str();
        if tag.starts_with('_') && tag != crate::attributes::SLOT_TAG {
            return Err(CompilerError::at(
                ERR_RESERVED_TAG,
                "html tag starts with \"_\" is compiler preserved tag name. Current version only support: \"<_slot>\".",
                &element.location,
            ));
        }
        if tag == crate::attributes::SLOT_TAG {
            return component_element(self, tag, tag, element);
        }
        if let Some(local) = self.aliases.resolve(tag, &mut self.alias_imports) {
            if is_html_tag(tag) {
                self.warn(
                    WARN_ALIAS_SHADOWS_HTML,
                    &format!("component alias <{}> shadows the html element of the same name.", tag),
                    &element.location,
                );
            }
            return component_element(self, tag, &local, element);
        }
        if self.imports.contains(tag) {
            let local = format!("{}{}", tag, self.import_postfix);
            return component_element(self, tag, &local, element);
        }
        if self.parent.is_svg {
            if !is_svg_tag(tag) {
                return Err(CompilerError::at(
                    ERR_UNKNOWN_TAG,
                    &format!("{} is not known svg tag.", tag),
                    &element.location,
                ));
            }
        } else if !is_html_tag(tag) {
            let message = if tag.starts_with(|c: char| c.is_ascii_uppercase()) {
                format!(
                    "<{}> looks like a component, but it is neither imported in the top comment nor configured as a component alias.",
                    tag
                )
            } else {
                format!(
                    "'{}' is not known html tag, do you forget to config component alias or import it on the top?",
                    tag
                )
            };
            return Err(CompilerError::at(ERR_UNKNOWN_TAG, &message, &element.location));
        }
        html_element(self, tag, element)
    }
}

impl<'c> TemplateVisitor for RenderVisitor<'c> {
    type Output = ParsedElement;
    type Error = CompilerError;

    fn visit_text(&mut self, text: &TextNode) -> Result<Option<ParsedElement>, CompilerError> {
        let raw = if self.parent.is_pre_or_code {
            text.value.as_str()
        } else {
            text.value.trim()
        };
        if raw.is_empty() {
            return Ok(None);
        }
        self.need_handle_comment = false;
        let lead = if self.parent.is_pre_or_code {
            0
        } else {
            text.value.len() - text.value.trim_start().len()
        };
        let origin = text.location.advance(&text.value, lead);
        let decoded = decode_entities(raw);
        match compile_template_text(&decoded, &origin, self.scope())? {
            CompiledExpr::Const { code, .. } => {
                let value = if self.parent.is_component() {
                    replace_tpl(TEXT_CONST, &[("VAL", &code)])
                } else {
                    code
                };
                Ok(Some(ParsedElement::text(value)))
            }
            CompiledExpr::Reactive { codes, .. } => {
                let slot = RenderSlot::new(0, "setText$POSTFIX$(el, ", ");").without_model();
                let push = if self.parent.is_component() { PUSH_ROOT_ELE } else { "" };
                let value = replace_tpl(
                    TEXT_EXPR,
                    &[("CODE", &prepend_tab2(&codes.render(&slot))), ("PUSH_ELE", push)],
                );
                Ok(Some(ParsedElement::text(value)))
            }
        }
    }

    fn visit_element(&mut self, element: &ElementNode) -> Result<Option<ParsedElement>, CompilerError> {
        self.need_handle_comment = false;
        self.resolve_element(element).map(Some)
    }

    fn visit_comment(&mut self, comment: &CommentNode) -> Result<Option<ParsedElement>, CompilerError> {
        if self.need_handle_comment {
            self.handle_comment_imports(comment)?;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompilerOptions;
    use crate::parse::parse_template;
    use pretty_assertions::assert_eq;

    fn render(source: &str) -> Result<RenderOutput, CompilerError> {
        let registry = AliasRegistry::from_options(&CompilerOptions::default()).unwrap();
        let nodes = parse_template(source)?;
        RenderVisitor::new(&registry, "_i", false).visit_template(&nodes)
    }

    #[test]
    fn test_constant_text_at_root() {
        let out = render("hello").unwrap();
        assert_eq!(
            out.render_fn,
            "function(component) {\n  const vm_0 = component;\n  return [\n  textRenderFn$POSTFIX$(component, `hello`)\n  ];\n}"
        );
    }

    #[test]
    fn test_comment_imports_register_components() {
        let out = render(
            "<!-- import { Button } from './button'; import Card from './card'; -->\n<Button/><Card/>",
        )
        .unwrap();
        assert_eq!(
            out.imports,
            "import { Button as Button_i } from './button';\nimport { default as Card_i } from './card';"
        );
        assert!(out.render_fn.contains("Button_i.create(attrs)"));
        assert!(out.render_fn.contains("Card_i.create(attrs)"));
    }

    #[test]
    fn test_comment_after_element_is_ignored() {
        let err = render("<div></div><!-- import { X } from 'x' --><X/>").unwrap_err();
        assert_eq!(err.code, ERR_UNKNOWN_TAG);
        assert!(err.message.contains("looks like a component"));
    }

    #[test]
    fn test_namespace_import_rejected() {
        let err = render("<!-- import * as all from 'x' -->").unwrap_err();
        assert_eq!(err.code, ERR_COMMENT_IMPORT);
    }

    #[test]
    fn test_reserved_and_unknown_tags() {
        assert_eq!(render("<_t>x</_t>").unwrap_err().code, ERR_RESERVED_TAG);
        let err = render("<svg><div></div></svg>").unwrap_err();
        assert_eq!(err.message, "div is not known svg tag.");
        let err = render("<blink></blink>").unwrap_err();
        assert!(err.message.starts_with("'blink' is not known html tag"));
    }
}
