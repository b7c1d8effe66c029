#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_TEMPLATE_SYNTAX: &str = "JINGE-ERR-SYNTAX-001";
pub const ERR_EXPRESSION_SYNTAX: &str = "JINGE-ERR-SYNTAX-002";
pub const ERR_CALL_IN_EXPRESSION: &str = "JINGE-ERR-EXPR-001";
pub const ERR_UNSUPPORTED_EXPRESSION: &str = "JINGE-ERR-EXPR-002";
pub const ERR_ATTRIBUTE_FORMAT: &str = "JINGE-ERR-ATTR-001";
pub const ERR_DUPLICATE_ATTRIBUTE: &str = "JINGE-ERR-ATTR-002";
pub const ERR_VM_BINDING: &str = "JINGE-ERR-ATTR-003";
pub const ERR_SLOT_USAGE: &str = "JINGE-ERR-SLOT-001";
pub const ERR_SLOT_SIBLINGS: &str = "JINGE-ERR-SLOT-002";
pub const ERR_UNKNOWN_TAG: &str = "JINGE-ERR-TAG-001";
pub const ERR_RESERVED_TAG: &str = "JINGE-ERR-TAG-002";
pub const ERR_COMMENT_IMPORT: &str = "JINGE-ERR-IMPORT-001";
pub const ERR_LISTENER: &str = "JINGE-ERR-LISTENER-001";
pub const ERR_EDIT_CONFLICT: &str = "JINGE-ERR-EDIT-001";
pub const ERR_COMPONENT_CLASS: &str = "JINGE-ERR-CLASS-001";
pub const WARN_FOR_WITHOUT_EACH: &str = "JINGE-WARN-001";
pub const WARN_ALIAS_SHADOWS_HTML: &str = "JINGE-WARN-002";
pub const WARN_CLASS_WATCH: &str = "JINGE-WARN-003";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_TEMPLATE_SYNTAX => "Templates are well-formed markup with balanced tags.",
        ERR_EXPRESSION_SYNTAX => "Every template expression is a single JavaScript expression.",
        ERR_CALL_IN_EXPRESSION => {
            "Template expressions never call functions, so their dependencies are decidable."
        }
        ERR_UNSUPPORTED_EXPRESSION => {
            "Member chains are rooted at an identifier and use identifier or computed keys."
        }
        ERR_ATTRIBUTE_FORMAT => "Attributes follow the `category:name` micro-syntax.",
        ERR_DUPLICATE_ATTRIBUTE => "Each attribute is declared once per element.",
        ERR_VM_BINDING => "Every view-model binding name is unique along its ancestor chain.",
        ERR_SLOT_USAGE => "Slots are passed to components and used inside component templates.",
        ERR_SLOT_SIBLINGS => {
            "Children of one component are all named slots or all default slot content."
        }
        ERR_UNKNOWN_TAG => "Every tag resolves to an alias, an import or a known html/svg tag.",
        ERR_RESERVED_TAG => "Tags starting with `_` are reserved by the compiler.",
        ERR_COMMENT_IMPORT => "Comment imports bind default or named specifiers only.",
        ERR_LISTENER => "Listeners are a method name or a call of a method name.",
        ERR_EDIT_CONFLICT => "Source rewrites never overlap.",
        ERR_COMPONENT_CLASS => "Component constructors receive attrs and pass them to super.",
        WARN_FOR_WITHOUT_EACH => "<for> renders each item through a vm:each binding.",
        WARN_ALIAS_SHADOWS_HTML => "Aliases do not hide html elements of the same name.",
        WARN_CLASS_WATCH => "Only statically known attrs paths are watched.",
        _ => "Unknown rule.",
    }
}

fn get_error_type(code: &str) -> &'static str {
    match code {
        ERR_TEMPLATE_SYNTAX | ERR_EXPRESSION_SYNTAX => "SYNTAX",
        c if c.starts_with("JINGE-WARN") => "WARNING",
        _ => "SEMANTIC",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            error_type: get_error_type(code).to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            context,
            hints,
        }
    }

    /// Error positioned at a template location; the file is filled in by the
    /// per-file entry point.
    pub fn at(code: &str, message: &str, location: &SourceLocation) -> Self {
        Self::new(code, message, "", location.line, location.column)
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hints.push(hint.to_string());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IR TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// 1-based line and column inside the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Location of the byte `offset` of `text`, where `text` itself starts at `self`.
    pub fn advance(&self, text: &str, offset: usize) -> SourceLocation {
        let mut loc = *self;
        let head = text.get(..offset.min(text.len())).unwrap_or(text);
        for ch in head.chars() {
            if ch == '\n' {
                loc.line += 1;
                loc.column = 1;
            } else {
                loc.column += 1;
            }
        }
        loc
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TemplateNode {
    Text(TextNode),
    Element(ElementNode),
    Comment(CommentNode),
}

impl TemplateNode {
    pub fn location(&self) -> &SourceLocation {
        match self {
            TemplateNode::Text(t) => &t.location,
            TemplateNode::Element(e) => &e.location,
            TemplateNode::Comment(c) => &c.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub value: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub value: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<AttributeIR>,
    pub children: Vec<TemplateNode>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeIR {
    pub name: String,
    /// Raw (still entity-encoded) value; `None` for bare attributes.
    pub value: Option<String>,
    pub location: SourceLocation,
    /// Position of the first character of the value.
    pub value_location: Option<SourceLocation>,
}
