//! Whole-template scenarios for elements, components and slots.

#[cfg(test)]
mod tests {
    use crate::alias::AliasRegistry;
    use crate::options::CompilerOptions;
    use crate::parse::parse_template;
    use crate::render::{RenderOutput, RenderVisitor};
    use crate::validate::{
        CompilerError, ERR_SLOT_SIBLINGS, ERR_SLOT_USAGE, WARN_ALIAS_SHADOWS_HTML,
        WARN_FOR_WITHOUT_EACH,
    };

    const CARD: &str = "<!-- import Card from './card'; -->\n";

    fn render_with(options: &CompilerOptions, source: &str) -> Result<RenderOutput, CompilerError> {
        let registry = AliasRegistry::from_options(options).unwrap();
        let nodes = parse_template(source)?;
        RenderVisitor::new(&registry, "_i", options.add_debug_name).visit_template(&nodes)
    }

    fn render(source: &str) -> Result<RenderOutput, CompilerError> {
        render_with(&CompilerOptions::default(), source)
    }

    fn render_fn(source: &str) -> String {
        render(source).unwrap().render_fn
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // HTML ELEMENTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_static_element_needs_no_scope() {
        let code = render_fn("<p class=\"a\"><b>x</b></p>");
        assert!(code.contains("createElement$POSTFIX$(\n"));
        assert!(code.contains("class: `a`"));
        assert!(code.contains("createElementWithoutAttrs$POSTFIX$(\n"));
        assert!(!code.contains("nonRootCompNodes"));
    }

    #[test]
    fn test_reactive_attribute_listener_and_ref() {
        let code = render_fn("<input :value=\"name\" on|stop:input=\"update($event)\" ref:box/>");
        assert!(code.contains("el.value = vm_0.name;"));
        assert!(code.contains("vm_0[$$$POSTFIX$].__watch([\"name\"], fn_0, component[$$$POSTFIX$]);"));
        assert!(code.contains("addEvent$POSTFIX$(el, \"input\", function(...args) {"));
        assert!(code.contains("vm_0.update(args[0]);"));
        assert!(code.contains("args[0].stopPropagation();"));
        assert!(code.contains("}, {\"stop\":true});"));
        assert!(code.contains("vm_0.__setRef('box', el, component);"));
        assert!(code.contains("component[__$POSTFIX$].rootNodes.push(el);"));
    }

    #[test]
    fn test_svg_children_use_svg_factory() {
        let code = render_fn("<svg><circle r=\"1\"/></svg>");
        assert!(code.contains("createSVGElementWithoutAttrs$POSTFIX$(\n"));
        assert!(code.contains("createSVGElement$POSTFIX$(\n"));
    }

    #[test]
    fn test_const_class_model_is_stringified() {
        let code = render_fn("<div :class=\"{ on: true }\"></div>");
        assert!(code.contains("class: class2str$POSTFIX$({ on: true })"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // COMPONENTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_component_attrs_and_named_slots() {
        let code = render_fn(&format!(
            "{}<Card title=\"x\" :count=\"n\"><h1 slot-pass:header>T</h1><p slot-pass:body>${{text}}</p></Card>",
            CARD
        ));
        assert!(code.contains("const attrs = attrs$POSTFIX$({"));
        assert!(code.contains("context: component[__$POSTFIX$].context"));
        assert!(code.contains("\"header\": function(component) {"));
        assert!(code.contains("\"body\": function(component) {"));
        assert!(code.contains("count: null"));
        assert!(code.contains("title: `x`"));
        assert!(code.contains("attrs.count = vm_0.n;"));
        assert!(code.contains("const el = Card_i.create(attrs);"));
        assert!(code.contains("return assertRenderResults$POSTFIX$(el.__render());"));
        assert!(code.contains("...(() => {"));
    }

    #[test]
    fn test_children_become_default_slot() {
        let code = render_fn(&format!("{}<Card><span>a</span></Card>", CARD));
        assert!(code.contains("\"default\": function(component) {"));
    }

    #[test]
    fn test_vm_use_binds_slot_scope() {
        let output = render("<for vm:each=\"item\" e:loop=\"list\"><span>${item.name}</span></for>").unwrap();
        assert!(output.warnings.is_empty());
        assert!(output.render_fn.contains("const vm_1 = component;"));
        assert!(output.render_fn.contains("vm_1.each?.name"));
        assert!(output.render_fn.contains("attrs.loop = vm_0.list;"));
        assert!(output.alias_imports.contains("ForComponent as ForComponent_"));
    }

    #[test]
    fn test_vm_use_binding_is_invisible_to_siblings() {
        let code = render_fn(
            "<for vm:each=\"item\" e:loop=\"list\"><span>${item.name}</span></for><p>${item}</p>",
        );
        assert!(code.contains("vm_1.each?.name"));
        assert!(code.contains("setText$POSTFIX$(el, `${vm_0.item}`);"));
        assert!(code.contains("vm_0[$$$POSTFIX$].__watch([\"item\"], fn_0, component[$$$POSTFIX$]);"));
    }

    #[test]
    fn test_for_without_each_warns() {
        let output = render("<for e:loop=\"list\"></for>").unwrap();
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].code, WARN_FOR_WITHOUT_EACH);
    }

    #[test]
    fn test_alias_shadowing_html_warns() {
        let options =
            CompilerOptions::from_json(r#"{"componentAlias":{"@ui/kit":{"Button":"button"}}}"#)
                .unwrap();
        let output = render_with(&options, "<button></button>").unwrap();
        assert_eq!(output.warnings[0].code, WARN_ALIAS_SHADOWS_HTML);
        assert!(output.alias_imports.contains("from '@ui/kit';"));
    }

    #[test]
    fn test_debug_name_is_opt_in() {
        let options = CompilerOptions { add_debug_name: true, ..CompilerOptions::default() };
        let output = render_with(&options, &format!("{}<Card/>", CARD)).unwrap();
        assert!(output.render_fn.contains("debugName: \"attrs_of_<Card>\""));
        assert!(!render_fn(&format!("{}<Card/>", CARD)).contains("debugName"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SLOTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_mixed_slot_children_are_rejected() {
        let err = render(&format!(
            "{}<Card><div slot-pass:header>h</div><span>x</span></Card>",
            CARD
        ))
        .unwrap_err();
        assert_eq!(err.code, ERR_SLOT_SIBLINGS);
        assert!(err.message.starts_with("children of <Card> must satisfy"));
    }

    #[test]
    fn test_untagged_children_share_one_default_slot() {
        let code = render_fn(&format!("{}<Card><a>1</a><b>2</b><i>3</i></Card>", CARD));
        assert_eq!(code.matches("\"default\": function(component) {").count(), 1);
        assert!(code.contains("`1`"));
        assert!(code.contains("`2`"));
        assert!(code.contains("`3`"));
    }

    #[test]
    fn test_single_tagged_child_among_untagged_is_rejected() {
        let err = render(&format!(
            "{}<Card><a>1</a><b slot-pass:x>2</b><i>3</i></Card>",
            CARD
        ))
        .unwrap_err();
        assert_eq!(err.code, ERR_SLOT_SIBLINGS);
        assert!(err.message.contains("all of them contain slot-pass: attribute or none"));
    }

    #[test]
    fn test_duplicate_slot_keys_are_rejected() {
        let err = render(&format!(
            "{}<Card><div slot-pass:a>1</div><div slot-pass:a>2</div></Card>",
            CARD
        ))
        .unwrap_err();
        assert_eq!(err.code, ERR_SLOT_SIBLINGS);
        assert!(err.message.ends_with("found duplicate: a"));
    }

    #[test]
    fn test_slot_pass_at_template_root_is_rejected() {
        let err = render("<div slot-pass:a></div>").unwrap_err();
        assert_eq!(err.code, ERR_SLOT_USAGE);
    }

    #[test]
    fn test_slot_use_placeholder() {
        let code = render_fn("<div><_slot/></div>");
        assert!(code.contains("const __ac = vm_0[__$POSTFIX$].slots;"));
        assert!(code.contains("__ac && __ac['default'] ? __ac['default'] : null;"));
        assert!(code.contains("const el = (new ParameterComponent$POSTFIX$(attrs, []))[$$$POSTFIX$].proxy;"));
        assert!(code.contains("component[__$POSTFIX$].nonRootCompNodes.push(el);"));
    }

    #[test]
    fn test_vm_pass_watches_against_parameter() {
        let code = render_fn("<_slot slot-use:row vm-pass:item=\"current\"><i>none</i></_slot>");
        assert!(code.contains("__ac['row']"));
        assert!(code.contains("item: null,"));
        assert!(code.contains("attrs.item = vm_0.current;"));
        assert!(code.contains("vm_0[$$$POSTFIX$].__watch([\"current\"], fn_0, el[$$$POSTFIX$]);"));
        assert!(code.contains("(new ParameterComponent$POSTFIX$(attrs, [\"item\"]))[$$$POSTFIX$].proxy;"));
        assert!(code.contains("__ac['row'] : function(component) {"));
    }

    #[test]
    fn test_slot_with_plain_attribute_is_rejected() {
        let err = render("<_slot slot-use:row class=\"x\"/>").unwrap_err();
        assert_eq!(err.code, ERR_SLOT_USAGE);
    }
}
