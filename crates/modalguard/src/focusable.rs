#![forbid(unsafe_code)]

//! Focusable-set resolution.
//!
//! [`resolve`] computes the ordered sequence of elements inside a dialog
//! root that are eligible to receive keyboard focus. The result is a pure
//! snapshot in document order; dialog content is mutable between openings,
//! so the set is recomputed on every open and never cached.
//!
//! Focusability is the union of:
//! - `a` / `area` carrying `href`,
//! - `input` / `select` / `textarea` / `button` without `disabled`,
//! - embedded content (`iframe` / `object` / `embed`),
//! - any element carrying `contenteditable`,
//! - any element whose `tabindex` does not start with `-`.
//!
//! The union matters: a disabled form control with an explicit non-negative
//! `tabindex` is still a member, and a hyperlink with `tabindex="-1"` is
//! still a member through the `href` clause. Both match the behavior of the
//! equivalent selector-list union.

use modalguard_dom::{Document, NodeId};

/// Ordered sequence of focusable elements inside an open dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusableSet {
    members: Vec<NodeId>,
}

impl FocusableSet {
    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// First member in document order.
    pub fn first(&self) -> Option<NodeId> {
        self.members.first().copied()
    }

    /// Last member in document order.
    pub fn last(&self) -> Option<NodeId> {
        self.members.last().copied()
    }

    /// Position of a node within the set.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.members.iter().position(|m| *m == node)
    }

    /// Members in document order.
    pub fn members(&self) -> &[NodeId] {
        &self.members
    }
}

/// Resolve the focusable descendants of `dialog_root`, in document order.
///
/// The root itself is never a member (it carries the transient
/// `tabindex="-1"` focus marker while open). No side effects.
pub fn resolve(doc: &Document, dialog_root: NodeId) -> FocusableSet {
    let members = doc
        .descendants(dialog_root)
        .into_iter()
        .filter(|node| is_focusable(doc, *node))
        .collect();
    FocusableSet { members }
}

fn is_focusable(doc: &Document, node: NodeId) -> bool {
    let tag = doc.tag(node);
    let by_tag = match tag.as_str() {
        "a" | "area" => doc.has_attribute(node, "href"),
        "input" | "select" | "textarea" | "button" => !doc.has_attribute(node, "disabled"),
        "iframe" | "object" | "embed" => true,
        _ => false,
    };
    by_tag
        || doc.has_attribute(node, "contenteditable")
        || doc
            .attribute(node, "tabindex")
            .is_some_and(|v| !v.starts_with('-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn doc_with_root() -> (Document, NodeId) {
        let doc = Document::new();
        let root = doc.create_element("div");
        doc.append_child(doc.root(), root).unwrap();
        (doc, root)
    }

    #[test]
    fn hyperlinks_require_href() {
        let (doc, root) = doc_with_root();
        let bare = doc.create_element("a");
        let linked = doc.create_element("a");
        doc.set_attribute(linked, "href", "#section");
        doc.append_child(root, bare).unwrap();
        doc.append_child(root, linked).unwrap();

        let set = resolve(&doc, root);
        assert_eq!(set.members(), &[linked]);
    }

    #[test]
    fn disabled_form_controls_excluded() {
        let (doc, root) = doc_with_root();
        let live = doc.create_element("button");
        let dead = doc.create_element("input");
        doc.set_attribute(dead, "disabled", "");
        doc.append_child(root, live).unwrap();
        doc.append_child(root, dead).unwrap();

        let set = resolve(&doc, root);
        assert_eq!(set.members(), &[live]);
    }

    #[test]
    fn embedded_content_always_included() {
        let (doc, root) = doc_with_root();
        for tag in ["iframe", "object", "embed"] {
            let node = doc.create_element(tag);
            doc.append_child(root, node).unwrap();
        }
        assert_eq!(resolve(&doc, root).len(), 3);
    }

    #[test]
    fn tabindex_prefix_semantics() {
        let (doc, root) = doc_with_root();
        let positive = doc.create_element("div");
        doc.set_attribute(positive, "tabindex", "0");
        let negative = doc.create_element("div");
        doc.set_attribute(negative, "tabindex", "-1");
        doc.append_child(root, positive).unwrap();
        doc.append_child(root, negative).unwrap();

        let set = resolve(&doc, root);
        assert_eq!(set.members(), &[positive]);
    }

    #[test]
    fn union_overrides_single_clause_exclusions() {
        let (doc, root) = doc_with_root();
        // Disabled, but reachable through the tabindex clause.
        let disabled_with_tabindex = doc.create_element("input");
        doc.set_attribute(disabled_with_tabindex, "disabled", "");
        doc.set_attribute(disabled_with_tabindex, "tabindex", "0");
        // Negative tabindex, but reachable through the href clause.
        let link_negative = doc.create_element("a");
        doc.set_attribute(link_negative, "href", "#x");
        doc.set_attribute(link_negative, "tabindex", "-1");
        doc.append_child(root, disabled_with_tabindex).unwrap();
        doc.append_child(root, link_negative).unwrap();

        let set = resolve(&doc, root);
        assert_eq!(set.members(), &[disabled_with_tabindex, link_negative]);
    }

    #[test]
    fn editable_elements_included() {
        let (doc, root) = doc_with_root();
        let editor = doc.create_element("div");
        doc.set_attribute(editor, "contenteditable", "");
        doc.append_child(root, editor).unwrap();
        assert_eq!(resolve(&doc, root).members(), &[editor]);
    }

    #[test]
    fn root_itself_never_a_member() {
        let (doc, root) = doc_with_root();
        doc.set_attribute(root, "tabindex", "-1");
        let button = doc.create_element("button");
        doc.append_child(root, button).unwrap();
        assert_eq!(resolve(&doc, root).members(), &[button]);
    }

    #[test]
    fn nested_members_in_document_order() {
        let (doc, root) = doc_with_root();
        let section = doc.create_element("div");
        let first = doc.create_element("button");
        let nested = doc.create_element("input");
        let last = doc.create_element("button");
        doc.append_child(root, first).unwrap();
        doc.append_child(root, section).unwrap();
        doc.append_child(section, nested).unwrap();
        doc.append_child(root, last).unwrap();

        let set = resolve(&doc, root);
        assert_eq!(set.members(), &[first, nested, last]);
        assert_eq!(set.first(), Some(first));
        assert_eq!(set.last(), Some(last));
        assert_eq!(set.position(nested), Some(1));
        assert_eq!(set.position(section), None);
    }

    /// Tag/attribute shape for one generated node.
    #[derive(Debug, Clone, Copy)]
    enum Shape {
        Button,
        DisabledButton,
        Link,
        BareLink,
        Tabindexed,
        NegativeTabindexed,
        Plain,
    }

    impl Shape {
        fn build(self, doc: &Document) -> NodeId {
            match self {
                Shape::Button => doc.create_element("button"),
                Shape::DisabledButton => {
                    let n = doc.create_element("button");
                    doc.set_attribute(n, "disabled", "");
                    n
                }
                Shape::Link => {
                    let n = doc.create_element("a");
                    doc.set_attribute(n, "href", "#p");
                    n
                }
                Shape::BareLink => doc.create_element("a"),
                Shape::Tabindexed => {
                    let n = doc.create_element("span");
                    doc.set_attribute(n, "tabindex", "0");
                    n
                }
                Shape::NegativeTabindexed => {
                    let n = doc.create_element("span");
                    doc.set_attribute(n, "tabindex", "-1");
                    n
                }
                Shape::Plain => doc.create_element("span"),
            }
        }

        fn expected_focusable(self) -> bool {
            matches!(self, Shape::Button | Shape::Link | Shape::Tabindexed)
        }
    }

    fn shape_strategy() -> impl Strategy<Value = Shape> {
        prop_oneof![
            Just(Shape::Button),
            Just(Shape::DisabledButton),
            Just(Shape::Link),
            Just(Shape::BareLink),
            Just(Shape::Tabindexed),
            Just(Shape::NegativeTabindexed),
            Just(Shape::Plain),
        ]
    }

    proptest! {
        /// Resolution keeps document order and matches the predicate,
        /// regardless of nesting depth.
        #[test]
        fn resolution_matches_predicate_in_document_order(
            shapes in proptest::collection::vec((shape_strategy(), 0u8..3), 0..24)
        ) {
            let (doc, root) = doc_with_root();
            // Depth hint nests each node under the previous one (up to the
            // hint) to exercise preorder traversal, not just flat children.
            let mut parents = vec![root];
            let mut created: Vec<(NodeId, Shape)> = Vec::new();
            for (shape, depth) in shapes {
                let node = shape.build(&doc);
                let parent = parents[(depth as usize).min(parents.len() - 1)];
                doc.append_child(parent, node).unwrap();
                parents.push(node);
                created.push((node, shape));
            }

            let preorder = doc.descendants(root);
            let expected: Vec<NodeId> = preorder
                .iter()
                .copied()
                .filter(|n| {
                    created
                        .iter()
                        .find(|(id, _)| id == n)
                        .is_some_and(|(_, s)| s.expected_focusable())
                })
                .collect();

            let set = resolve(&doc, root);
            prop_assert_eq!(set.members(), expected.as_slice());

            // Resolving again yields the same snapshot (pure).
            let again = resolve(&doc, root);
            prop_assert_eq!(again.members(), set.members());
        }
    }
}
