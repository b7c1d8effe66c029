use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

// ═══════════════════════════════════════════════════════════════════════════════
// KNOWN TAGS
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    pub static ref HTML_TAGS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for tag in [
            "a", "abbr", "address", "area", "article", "aside", "audio", "b", "base", "bdi",
            "bdo", "blockquote", "body", "br", "button", "canvas", "caption", "cite", "code",
            "col", "colgroup", "data", "datalist", "dd", "del", "details", "dfn", "dialog",
            "div", "dl", "dt", "em", "embed", "fieldset", "figcaption", "figure", "footer",
            "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr",
            "html", "i", "iframe", "img", "input", "ins", "kbd", "label", "legend", "li",
            "link", "main", "map", "mark", "math", "menu", "meta", "meter", "nav",
            "noscript", "object", "ol", "optgroup", "option", "output", "p", "param",
            "picture", "pre", "progress", "q", "rp", "rt", "ruby", "s", "samp", "script",
            "search", "section", "select", "slot", "small", "source", "span", "strong",
            "style", "sub", "summary", "sup", "svg", "table", "tbody", "td", "template",
            "textarea", "tfoot", "th", "thead", "time", "title", "tr", "track", "u", "ul",
            "var", "video", "wbr",
        ] {
            s.insert(tag);
        }
        s
    };

    pub static ref SVG_TAGS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for tag in [
            "a", "altGlyph", "altGlyphDef", "altGlyphItem", "animate", "animateColor",
            "animateMotion", "animateTransform", "circle", "clipPath", "color-profile",
            "cursor", "defs", "desc", "ellipse", "feBlend", "feColorMatrix",
            "feComponentTransfer", "feComposite", "feConvolveMatrix", "feDiffuseLighting",
            "feDisplacementMap", "feDistantLight", "feFlood", "feFuncA", "feFuncB",
            "feFuncG", "feFuncR", "feGaussianBlur", "feImage", "feMerge", "feMergeNode",
            "feMorphology", "feOffset", "fePointLight", "feSpecularLighting", "feSpotLight",
            "feTile", "feTurbulence", "filter", "font", "font-face", "font-face-format",
            "font-face-name", "font-face-src", "font-face-uri", "foreignObject", "g",
            "glyph", "glyphRef", "hkern", "image", "line", "linearGradient", "marker",
            "mask", "metadata", "missing-glyph", "mpath", "path", "pattern", "polygon",
            "polyline", "radialGradient", "rect", "script", "set", "stop", "style", "svg",
            "switch", "symbol", "text", "textPath", "title", "tref", "tspan", "use", "view",
            "vkern",
        ] {
            s.insert(tag);
        }
        s
    };

    /// Elements that never have children or a closing tag.
    pub static ref VOID_TAGS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for tag in [
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
            "param", "source", "track", "wbr",
        ] {
            s.insert(tag);
        }
        s
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDL ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

/// A DOM property assigned directly instead of through `setAttribute`.
#[derive(Debug, Clone, Copy)]
pub struct IdlAttr {
    /// `None` means every tag.
    pub tags: Option<&'static [&'static str]>,
    pub reflect: Option<&'static str>,
}

impl IdlAttr {
    pub fn applies_to(&self, tag: &str) -> bool {
        self.tags.map_or(true, |tags| tags.contains(&tag))
    }

    pub fn property<'a>(&self, attr: &'a str) -> &'a str {
        self.reflect.unwrap_or(attr)
    }
}

lazy_static! {
    pub static ref HTML_BOOL_IDL_ATTRS: HashMap<&'static str, IdlAttr> = {
        let mut m = HashMap::new();
        m.insert("autocomplete", IdlAttr { tags: Some(&["form", "input"]), reflect: None });
        m.insert(
            "autofocus",
            IdlAttr { tags: Some(&["button", "input", "select", "textarea"]), reflect: None },
        );
        m.insert("autoplay", IdlAttr { tags: Some(&["audio", "video"]), reflect: None });
        m.insert("controls", IdlAttr { tags: Some(&["audio", "video"]), reflect: None });
        m.insert(
            "disabled",
            IdlAttr {
                tags: Some(&[
                    "a", "button", "fieldset", "input", "optgroup", "option", "select",
                    "textarea",
                ]),
                reflect: None,
            },
        );
        m.insert(
            "readonly",
            IdlAttr { tags: Some(&["input", "textarea"]), reflect: Some("readOnly") },
        );
        m.insert(
            "required",
            IdlAttr { tags: Some(&["input", "textarea", "select"]), reflect: None },
        );
        m.insert("checked", IdlAttr { tags: Some(&["input"]), reflect: None });
        m.insert("selected", IdlAttr { tags: Some(&["option"]), reflect: None });
        m.insert("multiple", IdlAttr { tags: Some(&["input", "select"]), reflect: None });
        m.insert("muted", IdlAttr { tags: Some(&["video", "audio"]), reflect: None });
        m.insert("draggable", IdlAttr { tags: None, reflect: None });
        m
    };

    pub static ref HTML_COMMON_IDL_ATTRS: HashMap<&'static str, IdlAttr> = {
        let mut m = HashMap::new();
        m.insert(
            "value",
            IdlAttr {
                tags: Some(&["button", "input", "option", "progress", "select"]),
                reflect: None,
            },
        );
        m
    };
}

pub fn is_html_tag(tag: &str) -> bool {
    HTML_TAGS.contains(tag)
}

pub fn is_svg_tag(tag: &str) -> bool {
    SVG_TAGS.contains(tag)
}

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idl_tables() {
        let readonly = HTML_BOOL_IDL_ATTRS.get("readonly").unwrap();
        assert!(readonly.applies_to("input"));
        assert!(!readonly.applies_to("div"));
        assert_eq!(readonly.property("readonly"), "readOnly");
        assert!(HTML_BOOL_IDL_ATTRS.get("draggable").unwrap().applies_to("span"));
        assert!(HTML_COMMON_IDL_ATTRS.get("value").unwrap().applies_to("select"));
    }

    #[test]
    fn test_svg_tags_keep_case() {
        assert!(is_svg_tag("linearGradient"));
        assert!(!is_svg_tag("lineargradient"));
        assert!(is_html_tag("svg"));
    }
}
