//! Expression compiler scenarios: watch registration, constant folding,
//! binding resolution and nested scopes of dynamic member keys.

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    use crate::expression::{compile_expression, compile_template_text, CompiledExpr, RenderSlot};
    use crate::scope::{ExprScope, VM};
    use crate::validate::{
        CompilerError, SourceLocation, ERR_CALL_IN_EXPRESSION, ERR_EXPRESSION_SYNTAX,
        ERR_UNSUPPORTED_EXPRESSION,
    };

    fn compile_in(text: &str, vms: &[VM], imports: &[&str]) -> Result<CompiledExpr, CompilerError> {
        let imports: HashSet<String> = imports.iter().map(|s| s.to_string()).collect();
        compile_expression(text, &SourceLocation::default(), ExprScope::new(vms, &imports, "_i"))
    }

    fn compile(text: &str) -> CompiledExpr {
        compile_in(text, &[], &[]).unwrap()
    }

    fn rendered(expr: &CompiledExpr) -> String {
        match expr {
            CompiledExpr::Const { code, .. } => code.clone(),
            CompiledExpr::Reactive { codes, .. } => codes.render(&RenderSlot::new(0, "v = ", ";")),
        }
    }

    fn each(name: &str, level: u32) -> VM {
        VM { name: name.to_string(), level, reflect: "each".to_string() }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // WATCH PATHS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_member_chain_is_optional_and_watched_whole() {
        assert_eq!(
            rendered(&compile("a.b.c")),
            "const fn_0 = () => {\n  v = vm_0.a?.b?.c;\n};\nfn_0();\n\
             vm_0[$$$POSTFIX$].__watch([\"a\",\"b\",\"c\"], fn_0, component[$$$POSTFIX$]);"
        );
    }

    #[test]
    fn test_each_path_is_watched_once() {
        let code = rendered(&compile("a + a.b + a + a.b"));
        assert!(code.contains("v = vm_0.a + vm_0.a?.b + vm_0.a + vm_0.a?.b;"));
        let watches: Vec<&str> = code.lines().filter(|l| l.contains("__watch(")).collect();
        assert_eq!(
            watches,
            vec![
                "vm_0[$$$POSTFIX$].__watch([\"a\"], fn_0, component[$$$POSTFIX$]);",
                "vm_0[$$$POSTFIX$].__watch([\"a\",\"b\"], fn_0, component[$$$POSTFIX$]);",
            ]
        );
    }

    #[test]
    fn test_literal_keys_stay_in_static_path() {
        let code = rendered(&compile("list[0][\"first name\"]"));
        assert!(code.contains("v = vm_0.list?.[0]?.[\"first name\"];"));
        assert!(code.contains("__watch([\"list\",0,\"first name\"], fn_0,"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // CONSTANTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_constants_compile_to_themselves() {
        for text in ["1 + 2", "'a' + `b`", "undefined", "NaN || Infinity", "[1, 2]"] {
            let expr = compile(text);
            assert!(expr.is_const(), "{} should be constant", text);
            assert_eq!(rendered(&expr), text);
        }
        let first = compile("{ a: 1, b: [true] }");
        assert_eq!(first, compile("{ a: 1, b: [true] }"));
        assert!(first.is_model());
        assert_eq!(rendered(&first), "{ a: 1, b: [true] }");
    }

    #[test]
    fn test_imported_roots_are_constant() {
        let expr = compile_in("styles.title", &[], &["styles"]).unwrap();
        assert_eq!(expr, CompiledExpr::Const { code: "styles_i.title".to_string(), model: false });
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // BINDINGS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_bindings_resolve_to_their_level() {
        let vms = vec![each("item", 1), each("cell", 2)];
        let code = rendered(&compile_in("item.name + cell + title", &vms, &[]).unwrap());
        assert!(code.contains("v = vm_1.each?.name + vm_2.each + vm_0.title;"));
        assert!(code.contains("vm_1[$$$POSTFIX$].__watch([\"each\",\"name\"], fn_0,"));
        assert!(code.contains("vm_2[$$$POSTFIX$].__watch([\"each\"], fn_0,"));
        assert!(code.contains("vm_0[$$$POSTFIX$].__watch([\"title\"], fn_0,"));
    }

    #[test]
    fn test_shorthand_property_is_expanded() {
        let expr = compile("{ a, b: 1 }");
        assert!(!expr.is_const());
        assert!(rendered(&expr).contains("v = vm$POSTFIX$({ a: vm_0.a, b: 1 });"));
    }

    #[test]
    fn test_text_interpolation() {
        let imports = HashSet::new();
        let scope = ExprScope::new(&[], &imports, "_i");
        let expr = compile_template_text("Hi `${name}`\n", &SourceLocation::default(), scope).unwrap();
        assert!(rendered(&expr).contains("v = `Hi \\`${vm_0.name}\\`\\n`;"));
        let expr = compile_template_text("plain", &SourceLocation::default(), scope).unwrap();
        assert_eq!(rendered(&expr), "`plain`");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // DYNAMIC KEYS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_dynamic_key_rewatches_on_change() {
        let code = rendered(&compile("list[idx]"));
        assert!(code.starts_with("let _0_0_0;\nlet _0_0;\nlet _0_0_p;\n"));
        assert!(code.contains("function _calc_0_0_0() {\n  _0_0_0 = vm_0.idx;\n}"));
        assert!(code.contains("function _calc_0_0() {\n  _0_0 = vm_0.list?.[_0_0_0];\n}"));
        assert!(code.contains("function _calc_0() {\n  v = _0_0;\n}"));
        assert!(code.contains("_calc_0_0_0();\n_calc_0_0();\n_calc_0();"));
        assert!(code.contains(
            "function _update_0_0_0() {\n  _calc_0_0_0();\n  _notify_0_0();\n  _update_0_0();\n}"
        ));
        assert!(code.contains("const _np = [\"list\", _0_0_0];"));
        assert!(code.contains(
            "vm_0[$$$POSTFIX$].__unwatch(_0_0_p, _update_0_0, component[$$$POSTFIX$]);"
        ));
        assert!(code.contains("vm_0[$$$POSTFIX$].__watch([\"idx\"], _update_0_0_0, component[$$$POSTFIX$]);"));
        assert!(code.ends_with("_notify_0_0();"));
    }

    #[test]
    fn test_constant_dynamic_key_is_inlined() {
        let code = rendered(&compile("list[1 + 1].name"));
        assert!(code.contains("_0_0 = vm_0.list?.[1 + 1]?.name;"));
        assert!(code.contains("const _np = [\"list\", 1 + 1, \"name\"];"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // REJECTIONS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_calls_are_rejected() {
        for text in ["a.b()", "fn(x)", "new Date()", "tag`x`"] {
            let err = compile_in(text, &[], &[]).unwrap_err();
            assert_eq!(err.code, ERR_CALL_IN_EXPRESSION, "{}", text);
        }
    }

    #[test]
    fn test_unsupported_shapes() {
        assert_eq!(compile_in("(a || b).c", &[], &[]).unwrap_err().code, ERR_UNSUPPORTED_EXPRESSION);
        assert_eq!(compile_in("a +", &[], &[]).unwrap_err().code, ERR_EXPRESSION_SYNTAX);
        assert_eq!(compile_in("  ", &[], &[]).unwrap_err().code, ERR_EXPRESSION_SYNTAX);
        assert_eq!(compile_in("[1] + 1", &[], &[]).unwrap_err().code, ERR_EXPRESSION_SYNTAX);
    }
}
