//! Event listener values: `on:click="save"`, `on|stop:click="save(item, $event)"`.

use oxc_allocator::Allocator;
use oxc_ast::ast::{Argument, Expression, IdentifierReference, ObjectProperty};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};

use crate::edits::{apply_edits_within, Edit};
use crate::scope::ExprScope;
use crate::tpl::json_str;
use crate::validate::{CompilerError, SourceLocation, ERR_LISTENER};

/// Modifiers written as `on|stop,prevent:name`, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerTags(pub Vec<String>);

impl ListenerTags {
    pub fn parse(spec: &str) -> Self {
        let mut tags = Vec::new();
        for t in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|x: &String| x == t) {
                tags.push(t.to_string());
            }
        }
        ListenerTags(tags)
    }

    pub fn has(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    /// `{"stop":true,"prevent":true}`
    pub fn to_json(&self) -> String {
        let body = self
            .0
            .iter()
            .map(|t| format!("{}:true", json_str(t)))
            .collect::<Vec<_>>()
            .join(",");
        format!("{{{}}}", body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub name: String,
    /// Handler body statement.
    pub code: String,
    pub tags: Option<ListenerTags>,
}

fn unsupported(origin: &SourceLocation) -> CompilerError {
    CompilerError::at(ERR_LISTENER, "unsupport listener expression", origin)
        .with_hint("use a method name (`save`) or a call of a method name (`save(item, $event)`)")
}

/// `$args` spreads the runtime arguments and `$event` is the first of them.
fn listener_var(scope: &ExprScope, name: &str) -> String {
    match name {
        "$args" => "...args".to_string(),
        "$event" => "args[0]".to_string(),
        _ => vm_reflect(scope, name),
    }
}

fn vm_reflect(scope: &ExprScope, name: &str) -> String {
    let (vm, prop) = scope.vm_target(name);
    format!("{}.{}", vm, prop)
}

struct ArgRewriter<'s> {
    scope: ExprScope<'s>,
    edits: Vec<Edit>,
}

impl<'a, 's> Visit<'a> for ArgRewriter<'s> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        let code = listener_var(&self.scope, ident.name.as_str());
        self.edits.push(Edit::replace(ident.span.start, ident.span.end, code));
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand {
            if let Expression::Identifier(ident) = &prop.value {
                let code = format!("{}: {}", ident.name, listener_var(&self.scope, ident.name.as_str()));
                self.edits.push(Edit::replace(ident.span.start, ident.span.end, code));
                return;
            }
        }
        oxc_ast_visit::walk::walk_object_property(self, prop);
    }
}

/// Compiles a listener value into the statement run by the handler.
pub fn compile_listener(
    value: &str,
    origin: &SourceLocation,
    scope: ExprScope,
) -> Result<String, CompilerError> {
    let source = value.trim();
    if source.is_empty() {
        return Err(CompilerError::at(ERR_LISTENER, "listener requires a value", origin));
    }
    let allocator = Allocator::default();
    let expr = Parser::new(&allocator, source, SourceType::default().with_module(true))
        .parse_expression()
        .map_err(|_| unsupported(origin))?;

    match &expr {
        Expression::Identifier(id) => Ok(format!("{}(...args);", vm_reflect(&scope, id.name.as_str()))),
        Expression::CallExpression(call) => {
            let callee = match &call.callee {
                Expression::Identifier(id) => vm_reflect(&scope, id.name.as_str()),
                _ => return Err(unsupported(origin)),
            };
            let mut args = Vec::with_capacity(call.arguments.len());
            for arg in &call.arguments {
                match arg {
                    Argument::Identifier(id) => args.push(listener_var(&scope, id.name.as_str())),
                    other => {
                        let mut rewriter = ArgRewriter { scope, edits: Vec::new() };
                        rewriter.visit_argument(other);
                        let span = other.span();
                        args.push(apply_edits_within(source, &rewriter.edits, span.start, span.end)?);
                    }
                }
            }
            Ok(format!("{}({});", callee, args.join(", ")))
        }
        _ => Err(unsupported(origin)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::VM;
    use std::collections::HashSet;

    fn compile(value: &str, vms: &[VM]) -> Result<String, CompilerError> {
        let imports = HashSet::new();
        compile_listener(value, &SourceLocation::default(), ExprScope::new(vms, &imports, "_i"))
    }

    #[test]
    fn test_identifier_listener_forwards_args() {
        assert_eq!(compile("onSave", &[]).unwrap(), "vm_0.onSave(...args);");
    }

    #[test]
    fn test_call_listener_rewrites_arguments() {
        let vms = vec![VM { name: "item".into(), level: 1, reflect: "each".into() }];
        assert_eq!(
            compile("remove(item.id, $event, $args, { item })", &vms).unwrap(),
            "vm_0.remove(vm_1.each.id, args[0], ...args, { item: vm_1.each });"
        );
    }

    #[test]
    fn test_unsupported_listener() {
        let err = compile("a.b()", &[]).unwrap_err();
        assert_eq!(err.code, ERR_LISTENER);
        assert!(compile("x + 1", &[]).is_err());
    }

    #[test]
    fn test_tags_json_keeps_order() {
        let tags = ListenerTags::parse("stop, prevent,stop");
        assert_eq!(tags.to_json(), r#"{"stop":true,"prevent":true}"#);
        assert!(tags.has("prevent"));
    }
}
