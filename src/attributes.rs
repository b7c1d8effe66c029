//! Attribute classification.
//!
//! Attribute names follow `category:name`, with the category optional:
//!
//! | category | shorthand | meaning |
//! |---|---|---|
//! | `str` | `s` | literal text, `${}` interpolations allowed (default) |
//! | `expr` | `e` | JavaScript expression |
//! | `on`, `on\|stop,prevent` | `@name` | event listener |
//! | `vm-use` | `vm` | binds a render parameter of a passed slot |
//! | `vm-pass` | `vp` | hands a render parameter to the slot being used |
//! | `slot-pass` | `sp` | passes the element to the parent component as a named slot |
//! | `slot-use`, `slot-use\|path` | `su` | renders a slot received by this component |
//! | `ref` | | registers the element under a ref name |
//!
//! Binding attributes are resolved first, so that value attributes and
//! listeners compiled afterwards see the render parameters the element itself
//! introduces.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::expression::{compile_expression, compile_template_text, CompiledExpr, ExprCodes};
use crate::listener::{compile_listener, Listener, ListenerTags};
use crate::parse::decode_entities;
use crate::scope::{ExprScope, Parent, ParentSub, VM};
use crate::validate::{
    AttributeIR, CompilerError, SourceLocation, ERR_ATTRIBUTE_FORMAT, ERR_DUPLICATE_ATTRIBUTE,
    ERR_LISTENER, ERR_SLOT_USAGE, ERR_VM_BINDING,
};

lazy_static! {
    static ref ATTR_NAME: Regex = Regex::new(r"^[\w\d$_-][\w\d$_.|-]*$").unwrap();
    static ref VM_NAME: Regex = Regex::new(r"^[\w\d$_]+$").unwrap();
}

pub const SLOT_TAG: &str = "_slot";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementMode {
    Html,
    Component,
}

/// `slot-use:<fn>`, optionally reading the slots of `component` instead of
/// the current component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgUse {
    pub component: Option<String>,
    pub fn_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstAttr {
    pub name: String,
    pub code: String,
    pub model: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgAttr {
    pub name: String,
    pub codes: ExprCodes,
    pub model: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmPass {
    pub name: String,
    pub expr: CompiledExpr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAttributes {
    pub const_attrs: Vec<ConstAttr>,
    pub arg_attrs: Vec<ArgAttr>,
    pub listeners: Vec<Listener>,
    pub vms: Vec<VM>,
    pub vm_pass: Vec<VmPass>,
    pub arg_pass: Option<String>,
    pub ref_name: Option<String>,
    pub arg_use: Option<ArgUse>,
}

impl ParsedAttributes {
    /// Deepest level introduced by this element, `-1` when it binds nothing.
    pub fn vm_level(&self) -> i64 {
        self.vms.last().map_or(-1, |v| v.level as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Str,
    Expr,
    On,
    VmUse,
    VmPass,
    SlotPass,
    SlotUse,
    Ref,
}

fn category_of(raw: &str, location: &SourceLocation) -> Result<Category, CompilerError> {
    let c = match raw.to_ascii_lowercase().as_str() {
        "str" | "s" => Category::Str,
        "expr" | "e" | "" => Category::Expr,
        "on" => Category::On,
        "vm" | "vm-use" => Category::VmUse,
        "vp" | "vm-pass" => Category::VmPass,
        "sp" | "slot-pass" => Category::SlotPass,
        "su" | "slot-use" => Category::SlotUse,
        "ref" => Category::Ref,
        "_t" => {
            return Err(CompilerError::at(
                ERR_ATTRIBUTE_FORMAT,
                "attribute type _t is reserved and not supported",
                location,
            ))
        }
        other => {
            return Err(CompilerError::at(
                ERR_ATTRIBUTE_FORMAT,
                &format!("unkown attribute type {}", other),
                location,
            ))
        }
    };
    Ok(c)
}

struct PendingValue<'n> {
    name: &'n str,
    value: String,
    is_str: bool,
    location: SourceLocation,
}

struct PendingListener<'n> {
    name: &'n str,
    value: String,
    tags: Option<ListenerTags>,
    location: SourceLocation,
}

struct PendingVmPass<'n> {
    name: &'n str,
    value: String,
    location: SourceLocation,
}

/// Classifies and compiles the attributes of one element.
///
/// `scope` holds the bindings visible from the element's parent.
pub fn parse_attributes(
    mode: ElementMode,
    tag: &str,
    attrs: &[AttributeIR],
    parent: &Parent,
    scope: ExprScope,
) -> Result<ParsedAttributes, CompilerError> {
    let mut result = ParsedAttributes::default();
    if attrs.is_empty() {
        if mode == ElementMode::Component && tag == SLOT_TAG {
            result.arg_use = Some(ArgUse {
                component: None,
                fn_name: "default".to_string(),
            });
        }
        return Ok(result);
    }

    let mut values: Vec<PendingValue> = Vec::new();
    let mut value_names: HashSet<&str> = HashSet::new();
    let mut listeners: Vec<PendingListener> = Vec::new();
    let mut vm_pass: Vec<PendingVmPass> = Vec::new();

    for attr in attrs {
        let loc = &attr.location;
        let full = attr.name.as_str();
        let (raw_category, name) = match full.strip_prefix('@') {
            Some(event) => ("on", event),
            None => {
                let mut parts = full.split(':');
                let first = parts.next().unwrap_or_default();
                match (parts.next(), parts.next()) {
                    (None, _) => ("str", first),
                    (Some(second), None) => (first, second),
                    (Some(_), Some(_)) => {
                        return Err(CompilerError::at(ERR_ATTRIBUTE_FORMAT, "bad attribute format.", loc))
                    }
                }
            }
        };
        let (base, modifier) = match raw_category.split_once('|') {
            Some((b, m)) => (b, Some(m)),
            None => (raw_category, None),
        };
        let category = category_of(base, loc)?;
        if modifier.is_some() && !matches!(category, Category::On | Category::SlotUse) {
            return Err(CompilerError::at(
                ERR_ATTRIBUTE_FORMAT,
                &format!("attribute type {} does not accept '|' modifiers", base),
                loc,
            ));
        }
        if !ATTR_NAME.is_match(name) {
            return Err(CompilerError::at(
                ERR_ATTRIBUTE_FORMAT,
                r"attribute name must match /^[\w\d$_-][\w\d$_.|-]*$/",
                loc,
            ));
        }
        let value_loc = attr.value_location.unwrap_or(attr.location);
        let value = attr
            .value
            .as_deref()
            .map(|v| decode_entities(v.trim()))
            .unwrap_or_default();

        match category {
            Category::Ref => {
                if result.ref_name.is_some() {
                    return Err(CompilerError::at(
                        ERR_DUPLICATE_ATTRIBUTE,
                        "ref attribute can only be used once!",
                        loc,
                    ));
                }
                result.ref_name = Some(name.to_string());
            }
            Category::VmUse => {
                let local = if value.is_empty() { name.to_string() } else { value };
                if !VM_NAME.is_match(&local) {
                    return Err(CompilerError::at(
                        ERR_VM_BINDING,
                        &format!(r"vm-use type attribute value must match /^[\w\d$_]+$/, but got: {}", local),
                        loc,
                    ));
                }
                if !VM_NAME.is_match(name) {
                    return Err(CompilerError::at(
                        ERR_VM_BINDING,
                        &format!(
                            r"vm-use type attribute reflect variable name must match /^[\w\d$_]+$/, but got: {}",
                            name
                        ),
                        loc,
                    ));
                }
                if result.vms.iter().any(|v| v.name == local) {
                    return Err(CompilerError::at(
                        ERR_VM_BINDING,
                        &format!("vm-use type attribute name duplicated: {}", local),
                        loc,
                    ));
                }
                if scope.lookup(&local).is_some() {
                    return Err(CompilerError::at(
                        ERR_VM_BINDING,
                        &format!(
                            "vm-use attribute reflect variable name \"{}\" has been declared in parent context.",
                            local
                        ),
                        loc,
                    ));
                }
                let level = scope.vms.last().map_or(1, |v| v.level + 1);
                result.vms.push(VM {
                    name: local,
                    level,
                    reflect: name.to_string(),
                });
            }
            Category::VmPass => {
                if mode == ElementMode::Html {
                    return Err(CompilerError::at(
                        ERR_VM_BINDING,
                        "vm-pass attribute can't be used on html element",
                        loc,
                    ));
                }
                if !VM_NAME.is_match(name) {
                    return Err(CompilerError::at(
                        ERR_VM_BINDING,
                        r"vm-pass type attribute reflect variable name must match /^[\w\d$_]+$/",
                        loc,
                    ));
                }
                if vm_pass.iter().any(|v| v.name == name) {
                    return Err(CompilerError::at(
                        ERR_VM_BINDING,
                        &format!("vm-pass type attribute name duplicated: {}", name),
                        loc,
                    ));
                }
                let value = if value.is_empty() { name.to_string() } else { value };
                vm_pass.push(PendingVmPass { name, value, location: value_loc });
            }
            Category::SlotPass => {
                if result.arg_pass.is_some() {
                    return Err(CompilerError::at(
                        ERR_SLOT_USAGE,
                        "slot-pass: attribute can only be used once!",
                        loc,
                    ));
                }
                if parent.sub == Some(ParentSub::Argument) {
                    return Err(CompilerError::at(
                        ERR_SLOT_USAGE,
                        "if parent component has slot-pass: or vm-use: attribute, child component can't also have slot-pass: attribute. Try to put component under <_slot>.",
                        loc,
                    ));
                }
                if !parent.is_component() {
                    return Err(CompilerError::at(
                        ERR_SLOT_USAGE,
                        "slot-pass: attribute can only be used as root child of Component element.",
                        loc,
                    ));
                }
                result.arg_pass = Some(name.to_string());
            }
            Category::SlotUse => {
                if result.arg_use.is_some() {
                    return Err(CompilerError::at(
                        ERR_SLOT_USAGE,
                        "slot-use: attribute can only be used once!",
                        loc,
                    ));
                }
                let component = modifier.filter(|m| !m.is_empty()).map(|path| {
                    let mut segments: Vec<String> = path.split('.').map(str::to_string).collect();
                    let (vm, prop) = scope.vm_target(&segments[0]);
                    segments[0] = format!("{}.{}", vm, prop);
                    segments.join(".")
                });
                result.arg_use = Some(ArgUse {
                    component,
                    fn_name: name.to_string(),
                });
            }
            Category::On => {
                if listeners.iter().any(|l| l.name == name) {
                    return Err(CompilerError::at(
                        ERR_LISTENER,
                        &format!("event name is duplicated: {}", name),
                        loc,
                    ));
                }
                listeners.push(PendingListener {
                    name,
                    value,
                    tags: modifier.map(ListenerTags::parse),
                    location: value_loc,
                });
            }
            Category::Str | Category::Expr => {
                if !value_names.insert(name) {
                    return Err(CompilerError::at(
                        ERR_DUPLICATE_ATTRIBUTE,
                        &format!("duplicated attribute: {}", name),
                        loc,
                    ));
                }
                let (value, is_str) = if value.is_empty() {
                    if category == Category::Expr {
                        return Err(CompilerError::at(
                            ERR_ATTRIBUTE_FORMAT,
                            "Attribute with expression type must have value.",
                            loc,
                        ));
                    }
                    ("true".to_string(), false)
                } else {
                    (value, category == Category::Str)
                };
                values.push(PendingValue {
                    name,
                    value,
                    is_str,
                    location: value_loc,
                });
            }
        }
    }

    check_combination(mode, tag, &result, parent, !vm_pass.is_empty(), &attrs[0].location)?;

    // Only a slot-pass element exposes its own vm-use bindings to its
    // attributes. A component with bare `vm-use:` (implicit default slot)
    // evaluates its attributes in the parent scope; the bindings apply to
    // its children only.
    let extended: Vec<VM>;
    let inner = if result.arg_pass.is_some() && tag != SLOT_TAG && !result.vms.is_empty() {
        extended = scope.vms.iter().chain(result.vms.iter()).cloned().collect();
        ExprScope { vms: &extended, ..scope }
    } else {
        scope
    };

    for pending in values {
        let compiled = if pending.is_str {
            compile_template_text(&pending.value, &pending.location, inner)?
        } else {
            compile_expression(&pending.value, &pending.location, inner)?
        };
        match compiled {
            CompiledExpr::Const { code, model } => result.const_attrs.push(ConstAttr {
                name: pending.name.to_string(),
                code,
                model,
            }),
            CompiledExpr::Reactive { codes, model } => result.arg_attrs.push(ArgAttr {
                name: pending.name.to_string(),
                codes,
                model,
            }),
        }
    }
    for pending in listeners {
        let code = compile_listener(&pending.value, &pending.location, inner)?;
        result.listeners.push(Listener {
            name: pending.name.to_string(),
            code,
            tags: pending.tags,
        });
    }
    for pending in vm_pass {
        let expr = compile_expression(&pending.value, &pending.location, inner)?;
        result.vm_pass.push(VmPass {
            name: pending.name.to_string(),
            expr,
        });
    }

    if tag == SLOT_TAG
        && (result.ref_name.is_some()
            || !result.const_attrs.is_empty()
            || !result.arg_attrs.is_empty()
            || !result.listeners.is_empty())
    {
        return Err(CompilerError::at(
            ERR_SLOT_USAGE,
            "<_slot> component can only have slot-pass: or slot-use: attribute",
            &attrs[0].location,
        ));
    }
    Ok(result)
}

fn check_combination(
    mode: ElementMode,
    tag: &str,
    result: &ParsedAttributes,
    parent: &Parent,
    has_vm_pass: bool,
    at: &SourceLocation,
) -> Result<(), CompilerError> {
    let fail = |code: &str, msg: &str| Err(CompilerError::at(code, msg, at));
    if result.arg_pass.is_some() && result.arg_use.is_some() {
        return fail(
            ERR_SLOT_USAGE,
            "slot-pass: and slot-use: attribute can't be both used on same element",
        );
    }
    if !result.vms.is_empty() && result.arg_pass.is_none() && mode == ElementMode::Html {
        return fail(ERR_VM_BINDING, "vm-use: attribute require slot-pass: attribute on html element.");
    }
    if has_vm_pass && result.arg_use.is_none() {
        return fail(ERR_VM_BINDING, "vm-pass: attribute require slot-use: attribute");
    }
    if result.arg_use.is_some() && !result.vms.is_empty() {
        return fail(ERR_VM_BINDING, "vm-use: attribute can't be used with slot-use: attribute");
    }
    if result.arg_pass.is_some()
        && matches!(parent.sub, Some(ParentSub::Root) | Some(ParentSub::Parameter))
    {
        return fail(
            ERR_SLOT_USAGE,
            "slot-pass: attribute can only be used on Component element's root child.",
        );
    }
    if tag == SLOT_TAG && result.arg_pass.is_none() && result.arg_use.is_none() {
        return fail(
            ERR_SLOT_USAGE,
            "<_slot> component require \"slot-pass:\" or \"slot-use:\" attribute.",
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str, value: Option<&str>) -> AttributeIR {
        AttributeIR {
            name: name.to_string(),
            value: value.map(str::to_string),
            location: SourceLocation::new(1, 6),
            value_location: value.map(|_| SourceLocation::new(1, 10)),
        }
    }

    fn parse(
        mode: ElementMode,
        tag: &str,
        attrs: &[AttributeIR],
        parent: &Parent,
        vms: &[VM],
    ) -> Result<ParsedAttributes, CompilerError> {
        let imports = HashSet::new();
        parse_attributes(mode, tag, attrs, parent, ExprScope::new(vms, &imports, "_i"))
    }

    #[test]
    fn test_constant_and_reactive_split() {
        let result = parse(
            ElementMode::Html,
            "input",
            &[
                attr("type", Some("text")),
                attr(":value", Some("name")),
                attr("disabled", None),
            ],
            &Parent::root(),
            &[],
        )
        .unwrap();
        let consts: Vec<(&str, &str)> = result
            .const_attrs
            .iter()
            .map(|a| (a.name.as_str(), a.code.as_str()))
            .collect();
        assert_eq!(consts, vec![("type", "`text`"), ("disabled", "true")]);
        assert_eq!(result.arg_attrs.len(), 1);
        assert_eq!(result.arg_attrs[0].name, "value");
    }

    #[test]
    fn test_shorthand_categories() {
        let result = parse(
            ElementMode::Component,
            "Item",
            &[
                attr("sp:row", None),
                attr("vm:each", Some("item")),
                attr("@click", Some("select(item)")),
            ],
            &Parent::component(ParentSub::Normal),
            &[],
        )
        .unwrap();
        assert_eq!(result.arg_pass.as_deref(), Some("row"));
        assert_eq!(result.vms[0].name, "item");
        assert_eq!(result.vms[0].level, 1);
        // the listener sees the binding introduced by the same element
        assert_eq!(result.listeners[0].code, "vm_0.select(vm_1.each);");
    }

    #[test]
    fn test_bare_vm_use_keeps_attributes_in_parent_scope() {
        let result = parse(
            ElementMode::Component,
            "for",
            &[attr("vm:each", Some("item")), attr(":loop", Some("item"))],
            &Parent::root(),
            &[],
        )
        .unwrap();
        assert_eq!(result.vms[0].name, "item");
        let rendered = result.arg_attrs[0]
            .codes
            .render(&crate::expression::RenderSlot::new(0, "v = ", ";"));
        assert!(rendered.contains("v = vm_0.item;"));
    }

    #[test]
    fn test_vm_use_shadowing_parent_is_rejected() {
        let parents = vec![VM { name: "item".into(), level: 1, reflect: "each".into() }];
        let err = parse(
            ElementMode::Component,
            "for",
            &[attr("vm:each", Some("item"))],
            &Parent::component(ParentSub::Normal),
            &parents,
        )
        .unwrap_err();
        assert_eq!(err.code, ERR_VM_BINDING);
        assert!(err.message.contains("declared in parent context"));
    }

    #[test]
    fn test_slot_pass_requires_component_parent() {
        let err = parse(
            ElementMode::Html,
            "span",
            &[attr("slot-pass:a", None)],
            &Parent::html(false, false),
            &[],
        )
        .unwrap_err();
        assert_eq!(err.code, ERR_SLOT_USAGE);
        let err = parse(
            ElementMode::Html,
            "span",
            &[attr("slot-pass:a", None)],
            &Parent::root(),
            &[],
        )
        .unwrap_err();
        assert!(err.message.contains("root child"));
    }

    #[test]
    fn test_slot_rules() {
        let bare = parse(ElementMode::Component, SLOT_TAG, &[], &Parent::root(), &[]).unwrap();
        assert_eq!(
            bare.arg_use,
            Some(ArgUse { component: None, fn_name: "default".into() })
        );
        let err = parse(
            ElementMode::Component,
            SLOT_TAG,
            &[attr("class", Some("x"))],
            &Parent::root(),
            &[],
        )
        .unwrap_err();
        assert_eq!(err.code, ERR_SLOT_USAGE);
        let used = parse(
            ElementMode::Component,
            SLOT_TAG,
            &[attr("slot-use|tab.owner:header", None)],
            &Parent::root(),
            &[],
        )
        .unwrap();
        assert_eq!(
            used.arg_use,
            Some(ArgUse { component: Some("vm_0.tab.owner".into()), fn_name: "header".into() })
        );
    }

    #[test]
    fn test_rejected_formats() {
        let cases = [
            attr("a:b:c", Some("x")),
            attr("_t:title", Some("x")),
            attr("foo:title", Some("x")),
            attr("e:title", None),
            attr("vp:x", Some("y")),
        ];
        for case in cases {
            assert!(
                parse(ElementMode::Html, "div", &[case.clone()], &Parent::root(), &[]).is_err(),
                "{} should be rejected",
                case.name
            );
        }
        let dup = parse(
            ElementMode::Html,
            "div",
            &[attr("title", Some("a")), attr(":title", Some("b"))],
            &Parent::root(),
            &[],
        )
        .unwrap_err();
        assert_eq!(dup.code, ERR_DUPLICATE_ATTRIBUTE);
    }
}
