use crate::validate::{CommentNode, ElementNode, TemplateNode, TextNode};

/// The TemplateVisitor trait defines the single traversal mechanism for template trees.
///
/// Rules:
/// 1. Nodes are visited in document order.
/// 2. Each `visit_*` returns the fragment produced for its node, or `None`.
/// 3. Implementers recurse into children through `visit_children` so that
///    per-scope state is entered and left in one place.
pub trait TemplateVisitor {
    type Output;
    type Error;

    fn visit_node(&mut self, node: &TemplateNode) -> Result<Option<Self::Output>, Self::Error> {
        walk_node(self, node)
    }

    fn visit_text(&mut self, text: &TextNode) -> Result<Option<Self::Output>, Self::Error>;

    fn visit_element(&mut self, element: &ElementNode) -> Result<Option<Self::Output>, Self::Error>;

    fn visit_comment(&mut self, _comment: &CommentNode) -> Result<Option<Self::Output>, Self::Error> {
        // Comments render nothing by default
        Ok(None)
    }

    fn visit_children(&mut self, children: &[TemplateNode]) -> Result<Vec<Self::Output>, Self::Error> {
        walk_children(self, children)
    }
}

pub fn walk_node<V: TemplateVisitor + ?Sized>(
    visitor: &mut V,
    node: &TemplateNode,
) -> Result<Option<V::Output>, V::Error> {
    match node {
        TemplateNode::Text(text) => visitor.visit_text(text),
        TemplateNode::Element(element) => visitor.visit_element(element),
        TemplateNode::Comment(comment) => visitor.visit_comment(comment),
    }
}

/// Visits `children` in order, keeping the fragments that were produced.
pub fn walk_children<V: TemplateVisitor + ?Sized>(
    visitor: &mut V,
    children: &[TemplateNode],
) -> Result<Vec<V::Output>, V::Error> {
    let mut out = Vec::with_capacity(children.len());
    for node in children {
        if let Some(fragment) = visitor.visit_node(node)? {
            out.push(fragment);
        }
    }
    Ok(out)
}
