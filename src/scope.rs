//! Lexical scope of template expressions: view-model bindings introduced by
//! `vm-use:` attributes and the enclosing element context.

use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    /// Globals that never resolve to a view-model property.
    pub static ref CONST_GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("undefined");
        s.insert("NaN");
        s.insert("Infinity");
        s
    };
}

/// A view-model binding: `vm-use:reflect="name"` at nesting `level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VM {
    pub name: String,
    pub level: u32,
    pub reflect: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    Html,
    Component,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentSub {
    Root,
    Argument,
    Parameter,
    Normal,
}

/// Context of the element whose children are being visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub kind: ParentKind,
    pub sub: Option<ParentSub>,
    pub is_svg: bool,
    pub is_pre_or_code: bool,
}

impl Parent {
    pub fn root() -> Self {
        Parent {
            kind: ParentKind::Component,
            sub: Some(ParentSub::Root),
            is_svg: false,
            is_pre_or_code: false,
        }
    }

    pub fn html(is_svg: bool, is_pre_or_code: bool) -> Self {
        Parent {
            kind: ParentKind::Html,
            sub: None,
            is_svg,
            is_pre_or_code,
        }
    }

    pub fn component(sub: ParentSub) -> Self {
        Parent {
            kind: ParentKind::Component,
            sub: Some(sub),
            is_svg: false,
            is_pre_or_code: false,
        }
    }

    pub fn is_component(&self) -> bool {
        self.kind == ParentKind::Component
    }
}

/// Names an expression can see while it is compiled.
#[derive(Debug, Clone, Copy)]
pub struct ExprScope<'a> {
    pub vms: &'a [VM],
    /// Identifiers declared by the file's comment imports.
    pub imports: &'a HashSet<String>,
    pub import_postfix: &'a str,
}

impl<'a> ExprScope<'a> {
    pub fn new(vms: &'a [VM], imports: &'a HashSet<String>, import_postfix: &'a str) -> Self {
        Self {
            vms,
            imports,
            import_postfix,
        }
    }

    /// Innermost binding named `name`.
    pub fn lookup(&self, name: &str) -> Option<&'a VM> {
        self.vms.iter().rev().find(|v| v.name == name)
    }

    pub fn is_import(&self, name: &str) -> bool {
        self.imports.contains(name)
    }

    /// `(vm_<level>, property)` a reactive identifier reads from.
    pub fn vm_target(&self, name: &str) -> (String, String) {
        match self.lookup(name) {
            Some(vm) => (format!("vm_{}", vm.level), vm.reflect.clone()),
            None => ("vm_0".to_string(), name.to_string()),
        }
    }

    pub fn import_name(&self, name: &str) -> String {
        format!("{}{}", name, self.import_postfix)
    }
}
