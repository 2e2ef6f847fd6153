use serde::ser::{Serialize, SerializeMap, Serializer};
use strum::IntoEnumIterator;

use crate::token_type::TokenType;

/// Search fields a term can be scoped to.
///
/// Variants are declared in the order the scanner tries the field functions:
/// longer names first, so `TITLE-ABS-KEY(` is never read as `TITLE`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::IntoStaticStr,
)]
pub enum FieldName {
    #[strum(serialize = "TITLE-ABS-KEY")]
    #[serde(rename = "TITLE-ABS-KEY")]
    TitleAbsKey,
    #[strum(serialize = "TITLE-ABS")]
    #[serde(rename = "TITLE-ABS")]
    TitleAbs,
    #[strum(serialize = "TITLE")]
    #[serde(rename = "TITLE")]
    Title,
    #[strum(serialize = "AUTHKEY")]
    #[serde(rename = "AUTHKEY")]
    Authkey,
    /// A bare quoted term without a field function.
    #[strum(serialize = "ANY")]
    #[serde(rename = "ANY")]
    Any,
}

impl FieldName {
    /// Field names that may appear as a function call, e.g. `TITLE("...")`.
    pub fn functions() -> impl Iterator<Item = FieldName> {
        FieldName::iter().filter(|field| *field != FieldName::Any)
    }

    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

/// A predicate over a single search field, e.g. `AUTHKEY("recycling")`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldTerm {
    pub field: FieldName,
    pub value: String,
}

impl FieldTerm {
    pub fn new(field: FieldName, value: impl Into<String>) -> Self {
        FieldTerm { field, value: value.into() }
    }
}

/// The three buckets a branch sorts its children into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display, strum_macros::EnumIter)]
pub enum Combinator {
    #[default]
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
    #[strum(serialize = "AND_NOT")]
    AndNot,
}

impl Combinator {
    /// Maps an operator token to the bucket it selects. Non-operators map to `None`.
    pub fn from_token(variant: TokenType) -> Option<Self> {
        match variant {
            TokenType::And => Some(Combinator::And),
            TokenType::Or => Some(Combinator::Or),
            TokenType::AndNot => Some(Combinator::AndNot),
            _ => None,
        }
    }
}

/// A combinator node. Children are kept per bucket in insertion order; more than one
/// bucket may be populated, e.g. `A AND NOT B` yields `AND: [A]` next to `AND_NOT: [B]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Branch {
    #[serde(rename = "AND", skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<QueryNode>,
    #[serde(rename = "OR", skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<QueryNode>,
    #[serde(rename = "AND_NOT", skip_serializing_if = "Vec::is_empty")]
    pub and_not: Vec<QueryNode>,
}

impl Branch {
    pub fn bucket(&self, combinator: Combinator) -> &Vec<QueryNode> {
        match combinator {
            Combinator::And => &self.and,
            Combinator::Or => &self.or,
            Combinator::AndNot => &self.and_not,
        }
    }

    pub fn bucket_mut(&mut self, combinator: Combinator) -> &mut Vec<QueryNode> {
        match combinator {
            Combinator::And => &mut self.and,
            Combinator::Or => &mut self.or,
            Combinator::AndNot => &mut self.and_not,
        }
    }

    pub fn push(&mut self, combinator: Combinator, node: QueryNode) {
        self.bucket_mut(combinator).push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.and.is_empty() && self.or.is_empty() && self.and_not.is_empty()
    }

    /// Iterates over the populated buckets in `AND`, `OR`, `AND_NOT` order.
    pub fn buckets(&self) -> impl Iterator<Item = (Combinator, &Vec<QueryNode>)> {
        Combinator::iter()
            .map(move |combinator| (combinator, self.bucket(combinator)))
            .filter(|(_, children)| !children.is_empty())
    }

    pub fn into_buckets(self) -> [(Combinator, Vec<QueryNode>); 3] {
        [
            (Combinator::And, self.and),
            (Combinator::Or, self.or),
            (Combinator::AndNot, self.and_not),
        ]
    }

    /// Returns the only child if exactly one bucket holds exactly one node,
    /// otherwise gives the branch back unchanged.
    pub fn into_sole_child(mut self) -> Result<QueryNode, Branch> {
        let populated: Vec<Combinator> = self.buckets().map(|(combinator, _)| combinator).collect();
        match populated.as_slice() {
            [combinator] if self.bucket(*combinator).len() == 1 => {
                match self.bucket_mut(*combinator).pop() {
                    Some(child) => Ok(child),
                    None => Err(self),
                }
            }
            _ => Err(self),
        }
    }
}

/// A node of the parsed query tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    Leaf(FieldTerm),
    Branch(Branch),
}

impl QueryNode {
    pub fn leaf(field: FieldName, value: impl Into<String>) -> Self {
        QueryNode::Leaf(FieldTerm::new(field, value))
    }

    pub fn and(children: Vec<QueryNode>) -> Self {
        QueryNode::Branch(Branch { and: children, ..Branch::default() })
    }

    pub fn or(children: Vec<QueryNode>) -> Self {
        QueryNode::Branch(Branch { or: children, ..Branch::default() })
    }

    pub fn and_not(children: Vec<QueryNode>) -> Self {
        QueryNode::Branch(Branch { and_not: children, ..Branch::default() })
    }

    /// Visits this node and all of its descendants, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a QueryNode)) {
        visit(self);
        if let QueryNode::Branch(branch) = self {
            for (_, children) in branch.buckets() {
                for child in children {
                    child.walk(visit);
                }
            }
        }
    }
}

/// Leaves serialize as `{"field": {"field": NAME, "value": VALUE}}`, branches as an
/// object holding only their populated `AND` / `OR` / `AND_NOT` arrays.
impl Serialize for QueryNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueryNode::Leaf(term) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("field", term)?;
                map.end()
            }
            QueryNode::Branch(branch) => branch.serialize(serializer),
        }
    }
}
