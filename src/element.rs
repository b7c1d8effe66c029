//! Html and svg element code generation.

use crate::attributes::{parse_attributes, ArgAttr, ElementMode};
use crate::component::parameter_element;
use crate::expression::RenderSlot;
use crate::listener::Listener;
use crate::render::{ParsedElement, RenderVisitor};
use crate::scope::Parent;
use crate::tags::{HTML_BOOL_IDL_ATTRS, HTML_COMMON_IDL_ATTRS};
use crate::tpl::{
    convert_attribute_name, json_str, prepend_tab, prepend_tab2, replace_tpl, PUSH_ROOT_ELE,
    SET_REF_ELE,
};
use crate::validate::{CompilerError, ElementNode};

fn is_class_or_style(name: &str) -> bool {
    name == "class" || name == "style"
}

/// `$RENDER_START$` / `$RENDER_END$` for a reactive attribute of `tag`.
fn attr_setter(tag: &str, name: &str) -> (String, &'static str) {
    if let Some(idl) = HTML_BOOL_IDL_ATTRS.get(name).filter(|a| a.applies_to(tag)) {
        return (format!("el.{} = !!(", idl.property(name)), ");");
    }
    if let Some(idl) = HTML_COMMON_IDL_ATTRS.get(name).filter(|a| a.applies_to(tag)) {
        return (format!("el.{} = ", idl.property(name)), ";");
    }
    if is_class_or_style(name) {
        let mut cap = name.to_string();
        cap[..1].make_ascii_uppercase();
        return (format!("set{}Attribute$POSTFIX$(el, ", cap), ");");
    }
    (format!("setAttribute$POSTFIX$(el, {}, ", json_str(name)), ");")
}

fn reactive_attr_code(tag: &str, index: usize, attr: &ArgAttr) -> String {
    let (start, end) = attr_setter(tag, &attr.name);
    attr.codes
        .render(&RenderSlot::new(index, &start, end).without_model())
}

fn listener_code(listener: &Listener) -> String {
    let mut body = prepend_tab2(&listener.code);
    let mut opts = String::new();
    if let Some(tags) = &listener.tags {
        if tags.has("stop") {
            body.push_str("\n  args[0].stopPropagation();");
        }
        if tags.has("prevent") {
            body.push_str("\n  args[0].preventDefault();");
        }
        opts = format!(", {}", tags.to_json());
    }
    format!(
        "addEvent$POSTFIX$(el, {}, function(...args) {{\n{}\n}}{});",
        json_str(&listener.name),
        body,
        opts
    )
}

pub(crate) fn html_element(
    v: &mut RenderVisitor,
    tag: &str,
    node: &ElementNode,
) -> Result<ParsedElement, CompilerError> {
    let result = parse_attributes(ElementMode::Html, tag, &node.attributes, v.parent(), v.scope())?;
    let is_svg = v.parent().is_svg || tag == "svg";
    let is_pre = tag == "pre" || tag == "code";
    let elements = v.visit_child_nodes(&node.children, &result.vms, Parent::html(is_svg, is_pre))?;

    let wrapped = result.arg_use.is_some() || result.arg_pass.is_some();
    let push = if v.parent().is_component() || wrapped { PUSH_ROOT_ELE } else { "" };
    let set_ref = result
        .ref_name
        .as_deref()
        .map(|name| replace_tpl(SET_REF_ELE, &[("NAME", name)]))
        .unwrap_or_default();

    let factory = format!(
        "create{}Element{}$POSTFIX$",
        if is_svg { "SVG" } else { "" },
        if result.const_attrs.is_empty() { "WithoutAttrs" } else { "" }
    );
    let mut args = vec![json_str(tag)];
    if !result.const_attrs.is_empty() {
        let entries: Vec<String> = result
            .const_attrs
            .iter()
            .map(|at| {
                // html attributes receive plain values, never view models
                let code = if at.model && is_class_or_style(&at.name) {
                    format!("{}2str$POSTFIX$({})", at.name, at.code)
                } else {
                    at.code.clone()
                };
                format!("  {}: {}", convert_attribute_name(&at.name), code)
            })
            .collect();
        args.push(format!("{{\n{}\n}}", entries.join(",\n")));
    }
    if !elements.is_empty() {
        args.push(RenderVisitor::join_elements(&elements));
    }
    let create = format!("{}(\n{}\n)", factory, prepend_tab2(&args.join(",\n")));

    let needs_scope = !result.arg_attrs.is_empty()
        || !result.listeners.is_empty()
        || !set_ref.is_empty()
        || !push.is_empty();
    let code = if needs_scope {
        let mut body = vec![format!("const el = {};", create)];
        body.extend(
            result
                .arg_attrs
                .iter()
                .enumerate()
                .map(|(i, at)| reactive_attr_code(tag, i, at)),
        );
        body.extend(result.listeners.iter().map(listener_code));
        body.push(set_ref);
        body.push(push.to_string());
        body.push("return el;".to_string());
        format!("(() => {{\n{}\n}})()", prepend_tab(&body.join("\n"), true, 2))
    } else {
        create
    };

    let vm_level = result.vm_level();
    let el = ParsedElement::html(code);
    if let Some(arg_use) = &result.arg_use {
        return Ok(parameter_element(v, &[el], arg_use, &result.vm_pass, vm_level));
    }
    if let Some(key) = result.arg_pass {
        let value = v.gen_render(&[el], vm_level);
        return Ok(ParsedElement::argument(key, value));
    }
    Ok(el)
}
