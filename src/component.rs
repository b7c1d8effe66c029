//! Component element code generation, including slot passing (`slot-pass:`)
//! and slot rendering (`slot-use:`) placeholders.

use crate::attributes::{parse_attributes, ArgUse, ElementMode, VmPass, SLOT_TAG};
use crate::expression::{model_code, CompiledExpr, RenderSlot};
use crate::render::{ParsedElement, RenderVisitor};
use crate::scope::{Parent, ParentSub};
use crate::tpl::{
    convert_attribute_name, json_str, member_access, prepend_tab, prepend_tab2, replace_tpl,
    PARAMETER, PUSH_COM_ELE, PUSH_ROOT_ELE, SET_REF_ELE,
};
use crate::validate::{CompilerError, ElementNode, ERR_SLOT_USAGE, WARN_FOR_WITHOUT_EACH};

const VM_PASS_REL_COM: &str = "el[$$$POSTFIX$]";

pub(crate) fn component_element(
    v: &mut RenderVisitor,
    tag: &str,
    component: &str,
    node: &ElementNode,
) -> Result<ParsedElement, CompilerError> {
    let result = parse_attributes(ElementMode::Component, tag, &node.attributes, v.parent(), v.scope())?;
    if tag == "for" && !result.vms.iter().any(|vm| vm.reflect == "each") {
        v.warn(WARN_FOR_WITHOUT_EACH, "<for> component require vm:each attribute.", &node.location);
    }

    let sub = if result.arg_pass.is_some() || !result.vms.is_empty() {
        ParentSub::Argument
    } else if result.arg_use.is_some() {
        ParentSub::Parameter
    } else {
        ParentSub::Normal
    };
    let mut elements = v.visit_child_nodes(&node.children, &result.vms, Parent::component(sub))?;
    if tag == SLOT_TAG && elements.is_empty() && result.arg_pass.is_some() {
        return Err(CompilerError::at(
            ERR_SLOT_USAGE,
            "<_slot> component with slot-pass: attribute must have child.",
            &node.location,
        ));
    }
    let has_arg = v.assert_arg_pass(&node.location, &elements, tag)?;
    if !result.vms.is_empty() && result.arg_pass.is_none() && has_arg {
        return Err(CompilerError::at(
            ERR_SLOT_USAGE,
            "if component has vm-use: attribute but do not have slot-pass: attribute, it's root children can't have slot-pass: attribute.",
            &node.location,
        ));
    }

    let vm_level = result.vm_level();
    if tag == SLOT_TAG {
        if let Some(arg_use) = &result.arg_use {
            return Ok(parameter_element(v, &elements, arg_use, &result.vm_pass, vm_level));
        }
        if let Some(key) = result.arg_pass {
            let value = v.gen_render(&elements, vm_level);
            return Ok(ParsedElement::argument(key, value));
        }
    }

    if !elements.is_empty() && !has_arg {
        let value = v.gen_render(&elements, vm_level);
        elements = vec![ParsedElement::argument("default".to_string(), value)];
    }

    let mut meta = Vec::new();
    if v.add_debug_name() {
        meta.push(format!("debugName: \"attrs_of_<{}>\"", tag));
    }
    meta.push("context: component[__$POSTFIX$].context".to_string());
    if !result.listeners.is_empty() {
        let entries: Vec<String> = result
            .listeners
            .iter()
            .map(|lt| {
                let opts = lt.tags.as_ref().map_or_else(|| "null".to_string(), |t| t.to_json());
                format!(
                    "{}: {{\n  fn: function(...args) {{\n{}\n  }},\n  opts: {}\n}}",
                    convert_attribute_name(&lt.name),
                    prepend_tab(&lt.code, false, 4),
                    opts
                )
            })
            .collect();
        meta.push(format!("listeners: {{\n{}\n}}", prepend_tab2(&entries.join(",\n"))));
    }
    if !elements.is_empty() {
        let slots: Vec<String> = elements
            .iter()
            .map(|el| {
                let key = el.arg_pass.as_deref().unwrap_or("default");
                format!("{}: {}", json_str(key), el.value)
            })
            .collect();
        meta.push(format!("slots: {{\n{}\n}}", prepend_tab2(&slots.join(",\n"))));
    }

    let mut fields = vec![format!("[__$POSTFIX$]: {{\n{}\n}}", prepend_tab2(&meta.join(",\n")))];
    fields.extend(
        result
            .arg_attrs
            .iter()
            .map(|at| format!("{}: null", convert_attribute_name(&at.name))),
    );
    fields.extend(result.const_attrs.iter().map(|at| {
        format!("{}: {}", convert_attribute_name(&at.name), model_code(&at.code, at.model))
    }));

    let mut body = vec![format!(
        "const attrs = attrs$POSTFIX$({{\n{}\n}});",
        prepend_tab2(&fields.join(",\n"))
    )];
    for (i, at) in result.arg_attrs.iter().enumerate() {
        let start = format!("{} = ", member_access("attrs", &at.name));
        body.push(at.codes.render(&RenderSlot::new(i, &start, ";")));
    }
    body.push(format!("const el = {}.create(attrs);", component));
    if let Some(name) = &result.ref_name {
        body.push(replace_tpl(SET_REF_ELE, &[("NAME", name)]));
    }
    let wrapped = result.arg_use.is_some() || result.arg_pass.is_some();
    let push = if v.parent().is_component() || wrapped { PUSH_ROOT_ELE } else { PUSH_COM_ELE };
    body.push(push.to_string());
    body.push("return assertRenderResults$POSTFIX$(el.__render());".to_string());

    let code = format!("...(() => {{\n{}\n}})()", prepend_tab(&body.join("\n"), true, 2));
    let el = ParsedElement::component(ParentSub::Normal, code);

    if let Some(arg_use) = &result.arg_use {
        return Ok(parameter_element(v, &[el], arg_use, &result.vm_pass, vm_level));
    }
    if let Some(key) = result.arg_pass {
        let value = v.gen_render(&[el], vm_level);
        return Ok(ParsedElement::argument(key, value));
    }
    Ok(el)
}

/// A `slot-use:` placeholder rendering the slot passed by the outer template,
/// or `elements` when none was passed.
pub(crate) fn parameter_element(
    v: &RenderVisitor,
    elements: &[ParsedElement],
    arg_use: &ArgUse,
    vm_pass: &[VmPass],
    vm_level: i64,
) -> ParsedElement {
    let mut init = String::new();
    let mut set = Vec::new();
    let mut watch = Vec::new();
    let mut params = Vec::new();
    for (i, vp) in vm_pass.iter().enumerate() {
        match &vp.expr {
            CompiledExpr::Const { code, model } => {
                init.push_str(&format!("{}: {}, ", vp.name, model_code(code, *model)));
            }
            CompiledExpr::Reactive { codes, .. } => {
                init.push_str(&format!("{}: null, ", vp.name));
                let start = format!("{} = ", member_access("attrs", &vp.name));
                let slot = RenderSlot::new(i, &start, ";").with_rel_com(VM_PASS_REL_COM);
                set.push(codes.render_setup(&slot));
                watch.push(codes.render_watch(&slot));
            }
        }
        params.push(json_str(&vp.name));
    }

    let debug_name = if v.add_debug_name() {
        "debugName: \"attrs_of_<parameter>\","
    } else {
        ""
    };
    let push = if v.parent().is_component() { PUSH_ROOT_ELE } else { PUSH_COM_ELE };
    let default = if elements.is_empty() {
        "null".to_string()
    } else {
        prepend_tab2(&v.gen_render(elements, vm_level))
    };
    let renderer = arg_use.component.as_deref().unwrap_or("vm_0");
    let params = format!("[{}]", params.join(","));
    let set = prepend_tab2(&set.join("\n"));
    let watch = prepend_tab2(&watch.join("\n"));
    let value = replace_tpl(
        PARAMETER,
        &[
            ("VM_RENDERER", renderer),
            ("ARG_USE", &arg_use.fn_name),
            ("DEFAULT", default.trim_start()),
            ("VM_PASS_INIT", &init),
            ("VM_DEBUG_NAME", debug_name),
            ("VM_PASS_SET", &set),
            ("VM_PASS_PARAM", &params),
            ("VM_PASS_WATCH", &watch),
            ("PUSH_ELE", push),
        ],
    );
    ParsedElement::component(ParentSub::Parameter, value)
}
