//! Cleanup pass over parsed query trees.
//!
//! Children are normalized before their parent. Subtrees without any leaf are
//! removed, and a branch whose only content is a single child is replaced by that
//! child. The result contains neither empty nor pass-through branches.

use crate::expr::{Branch, QueryNode};

/// Normalizes `node`, returning `None` if nothing but empty branches remain.
pub fn normalize(node: QueryNode) -> Option<QueryNode> {
    match node {
        QueryNode::Leaf(term) => Some(QueryNode::Leaf(term)),
        QueryNode::Branch(branch) => normalize_branch(branch),
    }
}

fn normalize_branch(branch: Branch) -> Option<QueryNode> {
    let mut cleaned = Branch::default();
    for (combinator, children) in branch.into_buckets() {
        cleaned
            .bucket_mut(combinator)
            .extend(children.into_iter().filter_map(normalize));
    }

    if cleaned.is_empty() {
        return None;
    }

    match cleaned.into_sole_child() {
        // collapsing may expose another wrapper
        Ok(child) => normalize(child),
        Err(cleaned) => Some(QueryNode::Branch(cleaned)),
    }
}

/// True if no branch in the tree is empty or a single-child wrapper.
#[cfg(test)]
pub(crate) fn is_normalized(node: &QueryNode) -> bool {
    let mut normalized = true;
    node.walk(&mut |node| {
        if let QueryNode::Branch(branch) = node {
            let populated: Vec<_> = branch.buckets().collect();
            let wrapper = populated.len() == 1 && populated[0].1.len() == 1;
            if populated.is_empty() || wrapper {
                normalized = false;
            }
        }
    });
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::FieldName;

    fn leaf(value: &str) -> QueryNode {
        QueryNode::leaf(FieldName::Any, value)
    }

    fn empty() -> QueryNode {
        QueryNode::Branch(Branch::default())
    }

    fn samples() -> Vec<QueryNode> {
        vec![
            leaf("a"),
            empty(),
            QueryNode::and(vec![empty(), QueryNode::or(vec![empty()])]),
            QueryNode::and(vec![leaf("a")]),
            QueryNode::and(vec![QueryNode::or(vec![QueryNode::and_not(vec![leaf("a")])])]),
            QueryNode::and(vec![leaf("a"), empty(), leaf("b")]),
            QueryNode::and(vec![QueryNode::or(vec![leaf("a"), leaf("b")]), empty()]),
            QueryNode::Branch(Branch {
                and: vec![leaf("a")],
                or: vec![empty()],
                and_not: vec![QueryNode::or(vec![leaf("b")])],
            }),
            QueryNode::Branch(Branch {
                and: vec![empty()],
                or: vec![QueryNode::and(vec![leaf("a"), QueryNode::or(vec![leaf("b")])])],
                and_not: vec![],
            }),
        ]
    }

    #[test]
    fn test_leaf_is_kept() {
        assert_eq!(normalize(leaf("a")), Some(leaf("a")));
    }

    #[test]
    fn test_empty_branches_vanish() {
        assert_eq!(normalize(empty()), None);
        assert_eq!(
            normalize(QueryNode::and(vec![empty(), QueryNode::or(vec![empty()])])),
            None
        );
    }

    #[test]
    fn test_singleton_collapse_cascades() {
        let nested =
            QueryNode::and(vec![QueryNode::or(vec![QueryNode::and_not(vec![leaf("a")])])]);
        assert_eq!(normalize(nested), Some(leaf("a")));
    }

    #[test]
    fn test_collapse_after_dropping_empty_children() {
        let node = QueryNode::Branch(Branch {
            and: vec![empty()],
            or: vec![leaf("a")],
            and_not: vec![],
        });
        assert_eq!(normalize(node), Some(leaf("a")));
    }

    #[test]
    fn test_multi_bucket_branch_is_kept() {
        let node = QueryNode::Branch(Branch {
            and: vec![leaf("a")],
            or: vec![empty()],
            and_not: vec![QueryNode::or(vec![leaf("b")])],
        });
        let expected = QueryNode::Branch(Branch {
            and: vec![leaf("a")],
            or: vec![],
            and_not: vec![leaf("b")],
        });
        assert_eq!(normalize(node), Some(expected));
    }

    #[test]
    fn test_children_order_is_preserved() {
        let node = QueryNode::and(vec![leaf("a"), empty(), QueryNode::or(vec![leaf("b")]), leaf("c")]);
        assert_eq!(
            normalize(node),
            Some(QueryNode::and(vec![leaf("a"), leaf("b"), leaf("c")]))
        );
    }

    #[test]
    fn test_idempotent() {
        for sample in samples() {
            let once = normalize(sample.clone());
            let twice = once.clone().and_then(normalize);
            assert_eq!(once, twice, "Sample: {:?}", sample);
        }
    }

    #[test]
    fn test_result_is_normalized() {
        for sample in samples() {
            if let Some(node) = normalize(sample.clone()) {
                assert!(is_normalized(&node), "Sample: {:?}, got {:?}", sample, node);
            }
        }
    }

    #[test]
    fn test_is_normalized_detects_wrappers() {
        assert!(!is_normalized(&QueryNode::and(vec![leaf("a")])));
        assert!(!is_normalized(&QueryNode::or(vec![leaf("a"), empty()])));
        assert!(is_normalized(&QueryNode::or(vec![leaf("a"), leaf("b")])));
    }
}
