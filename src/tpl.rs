//! Fixed fragments of generated code.
//!
//! Runtime symbols carry the `$POSTFIX$` placeholder; the assembler swaps it
//! for the configured symbol postfix once the whole render function exists.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

pub const POSTFIX: &str = "$POSTFIX$";

pub const TEXT_CONST: &str = "textRenderFn$POSTFIX$(component, $VAL$)";

pub const TEXT_EXPR: &str = "(() => {
  const el = createTextNode$POSTFIX$();
$CODE$
  $PUSH_ELE$
  return el;
})()";

pub const EMPTY: &str = "emptyRenderFn$POSTFIX$";
pub const ERROR: &str = "errorRenderFn$POSTFIX$";

pub const PUSH_ROOT_ELE: &str = "component[__$POSTFIX$].rootNodes.push(el);";
pub const PUSH_COM_ELE: &str = "component[__$POSTFIX$].nonRootCompNodes.push(el);";
pub const SET_REF_ELE: &str = "vm_0.__setRef('$NAME$', el, component);";

pub const REL_COM: &str = "component[$$$POSTFIX$]";

pub const PARAMETER: &str = "...(() => {
  const __ac = $VM_RENDERER$[__$POSTFIX$].slots;
  const renderFn = __ac && __ac['$ARG_USE$'] ? __ac['$ARG_USE$'] : $DEFAULT$;
  const attrs = attrs$POSTFIX$({
    $VM_PASS_INIT$
    [__$POSTFIX$]: {
      $VM_DEBUG_NAME$
      context: component[__$POSTFIX$].context,
      slots: {
        default: renderFn || emptyRenderFn$POSTFIX$
      }
    }
  });
$VM_PASS_SET$
  const el = (new ParameterComponent$POSTFIX$(attrs, $VM_PASS_PARAM$))[$$$POSTFIX$].proxy;
$VM_PASS_WATCH$
  $PUSH_ELE$
  return assertRenderResults$POSTFIX$(el.__render());
})()";

lazy_static! {
    static ref LEADING_BLANK: Regex = Regex::new(r"^(\s*\n)+").unwrap();
    static ref TRAILING_BLANK: Regex = Regex::new(r"(\n\s*)+$").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n\s*\n").unwrap();
    static ref LINE_START: Regex = Regex::new(r"\n(\s*\S)").unwrap();
    static ref SIMPLE_PROP: Regex = Regex::new(r"^[\w$]+$").unwrap();
}

/// Replaces every `$KEY$` of `tpl` with its value.
pub fn replace_tpl(tpl: &str, ctx: &[(&str, &str)]) -> String {
    let mut out = tpl.to_string();
    for (key, value) in ctx {
        out = out.replace(&format!("${}$", key), value);
    }
    out
}

/// Indents every line of `code` by `width` spaces and drops blank lines.
pub fn prepend_tab(code: &str, trim_edges: bool, width: usize) -> String {
    if code.is_empty() || width == 0 {
        return code.to_string();
    }
    let mut s = code.to_string();
    if trim_edges {
        s = LEADING_BLANK.replace(&s, "").into_owned();
        s = TRAILING_BLANK.replace(&s, "").into_owned();
    }
    let spaces = " ".repeat(width);
    if !s.starts_with('\n') {
        s = format!("{}{}", spaces, s);
    }
    // `\n\s*\n` is greedy, so one pass folds runs of blank lines.
    s = BLANK_LINES.replace_all(&s, "\n").into_owned();
    LINE_START
        .replace_all(&s, |caps: &Captures| format!("\n{}{}", spaces, &caps[1]))
        .into_owned()
}

pub fn prepend_tab2(code: &str) -> String {
    prepend_tab(code, false, 2)
}

/// Object key for an attribute name: bare when it is a simple identifier or a
/// computed `[key]`, JSON-quoted otherwise.
pub fn convert_attribute_name(name: &str) -> String {
    if (name.starts_with('[') && name.ends_with(']')) || SIMPLE_PROP.is_match(name) {
        name.to_string()
    } else {
        json_str(name)
    }
}

/// `obj.name` or `obj["name"]`.
pub fn member_access(obj: &str, name: &str) -> String {
    if SIMPLE_PROP.is_match(name) && !name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{}.{}", obj, name)
    } else {
        format!("{}[{}]", obj, json_str(name))
    }
}

pub fn json_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_tpl() {
        let out = replace_tpl(SET_REF_ELE, &[("NAME", "input")]);
        assert_eq!(out, "vm_0.__setRef('input', el, component);");
        assert_eq!(
            replace_tpl(REL_COM, &[("POSTFIX", "_x")]),
            "component[$$_x]"
        );
    }

    #[test]
    fn test_prepend_tab_indents_and_folds_blank_lines() {
        assert_eq!(prepend_tab2("a\n\n  b\nc"), "  a\n    b\n  c");
        assert_eq!(prepend_tab("\n\na\n\n", true, 4), "    a");
    }

    #[test]
    fn test_convert_attribute_name() {
        assert_eq!(convert_attribute_name("title"), "title");
        assert_eq!(convert_attribute_name("data-id"), "\"data-id\"");
        assert_eq!(convert_attribute_name("[__x]"), "[__x]");
    }

    #[test]
    fn test_member_access() {
        assert_eq!(member_access("attrs", "title"), "attrs.title");
        assert_eq!(member_access("attrs", "aria-label"), "attrs[\"aria-label\"]");
    }
}
