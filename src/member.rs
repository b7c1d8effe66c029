//! Member-access chain analysis (`a.b[c]["d"]`).

use oxc_ast::ast::{
    ComputedMemberExpression, Expression, IdentifierReference, StaticMemberExpression,
};
use oxc_span::{GetSpan, Span};
use serde_json::Value;

/// One `.prop` or `[expr]` step of a chain.
#[derive(Clone, Copy)]
pub enum Link<'b, 'a> {
    Static(&'b StaticMemberExpression<'a>),
    Computed(&'b ComputedMemberExpression<'a>),
}

impl<'b, 'a> Link<'b, 'a> {
    pub fn object(&self) -> &'b Expression<'a> {
        match self {
            Link::Static(m) => &m.object,
            Link::Computed(m) => &m.object,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Link::Static(m) => m.span,
            Link::Computed(m) => m.span,
        }
    }

    pub fn optional(&self) -> bool {
        match self {
            Link::Static(m) => m.optional,
            Link::Computed(m) => m.optional,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Link::Computed(_))
    }

    /// Static path segment, `None` for a dynamic computed key.
    pub fn segment(&self) -> Option<Value> {
        match self {
            Link::Static(m) => Some(Value::String(m.property.name.to_string())),
            Link::Computed(m) => literal_key(&m.expression),
        }
    }

    /// Text inserted after the object to make this step optional.
    pub fn optional_marker(&self) -> &'static str {
        if self.is_computed() {
            "?."
        } else {
            "?"
        }
    }
}

pub struct MemberChain<'b, 'a> {
    pub root: &'b IdentifierReference<'a>,
    /// Steps ordered from the root outwards.
    pub links: Vec<Link<'b, 'a>>,
    pub span: Span,
}

impl<'b, 'a> MemberChain<'b, 'a> {
    pub fn has_dynamic_key(&self) -> bool {
        self.links.iter().any(|l| l.segment().is_none())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainError {
    /// A call appears inside the chain.
    Call(Span),
    /// The chain is not rooted at an identifier.
    Unsupported(Span),
}

pub fn member_chain<'b, 'a>(top: Link<'b, 'a>) -> Result<MemberChain<'b, 'a>, ChainError> {
    let span = top.span();
    let mut links = vec![top];
    let mut object = top.object();
    let root = loop {
        match object {
            Expression::Identifier(id) => break &**id,
            Expression::StaticMemberExpression(m) => {
                links.push(Link::Static(&**m));
                object = &m.object;
            }
            Expression::ComputedMemberExpression(m) => {
                links.push(Link::Computed(&**m));
                object = &m.object;
            }
            Expression::ParenthesizedExpression(p) => object = &p.expression,
            Expression::CallExpression(c) => return Err(ChainError::Call(c.span)),
            other => return Err(ChainError::Unsupported(other.span())),
        }
    };
    links.reverse();
    Ok(MemberChain { root, links, span })
}

/// String and numeric literal keys are part of a static path.
pub fn literal_key(expr: &Expression) -> Option<Value> {
    match expr {
        Expression::StringLiteral(s) => Some(Value::String(s.value.to_string())),
        Expression::NumericLiteral(n) => Some(json_number(n.value)),
        _ => None,
    }
}

pub fn json_number(v: f64) -> Value {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9_007_199_254_740_992.0 {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn with_chain(code: &str, f: impl FnOnce(Result<MemberChain, ChainError>)) {
        let allocator = Allocator::default();
        let expr = Parser::new(&allocator, code, SourceType::default().with_module(true))
            .parse_expression()
            .unwrap();
        let top = match &expr {
            Expression::StaticMemberExpression(m) => Link::Static(&**m),
            Expression::ComputedMemberExpression(m) => Link::Computed(&**m),
            _ => panic!("not a member expression"),
        };
        f(member_chain(top));
    }

    #[test]
    fn test_chain_segments() {
        with_chain("a.b[0][\"c\"]", |chain| {
            let chain = chain.unwrap();
            assert_eq!(chain.root.name.as_str(), "a");
            let segs: Vec<Value> = chain.links.iter().map(|l| l.segment().unwrap()).collect();
            assert_eq!(serde_json::to_string(&segs).unwrap(), r#"["b",0,"c"]"#);
            assert!(!chain.has_dynamic_key());
        });
    }

    #[test]
    fn test_dynamic_key_detected() {
        with_chain("list[idx].name", |chain| {
            let chain = chain.unwrap();
            assert!(chain.has_dynamic_key());
            assert_eq!(chain.links.len(), 2);
            assert!(chain.links[0].is_computed());
        });
    }

    #[test]
    fn test_unsupported_roots() {
        with_chain("(a || b).c", |chain| {
            assert!(matches!(chain, Err(ChainError::Unsupported(_))));
        });
        with_chain("a.b().c", |chain| {
            assert!(matches!(chain, Err(ChainError::Call(_))));
        });
    }
}
