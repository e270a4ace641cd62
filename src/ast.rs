// Indexer forms of a compiled query
// What follows a value in a path: keys, indices, slices, filters and projections

use std::fmt;

use regex::Regex;

use crate::evaluator::Operand;
use crate::value::Slicer;

/// One constant member of a `[...]` or `.x` selector list.
#[derive(Debug, Clone)]
pub enum Selector {
    Index(i64),
    Key(String),
    Slice(Slicer),
    /// Every key of an object that the pattern matches.
    KeyPattern(Regex),
}

impl Selector {
    /// True when this selector can pick out more than one child.
    pub fn is_multi(&self) -> bool {
        matches!(self, Selector::Slice(_) | Selector::KeyPattern(_))
    }
}

/// A postfix step applied to the value on its left.
///
/// Inside `Filter` and the projections `@` refers to the value being
/// indexed, not to the query's root.
#[derive(Debug, Clone)]
pub enum Indexer {
    /// `.key`, `[0]`, `[1, "a", 2:5]`, `` .`re` ``
    Select(Vec<Selector>),
    /// `.*` / `[*]`
    Wildcard,
    /// `..key`
    Recursive(String),
    /// `[expr]`: boolean mask, or a computed index/key
    Filter(Operand),
    /// `{e1, e2}`
    ArrayProjection(Vec<Operand>),
    /// `{k1: e1, k2: e2}`
    ObjectProjection(Vec<(String, Operand)>),
}

impl Indexer {
    /// A single key or index: yields one child rather than a container.
    pub fn is_single(&self) -> bool {
        match self {
            Indexer::Select(selectors) => selectors.len() == 1 && !selectors[0].is_multi(),
            Indexer::ArrayProjection(_) | Indexer::ObjectProjection(_) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Index(i) => write!(f, "{}", i),
            Selector::Key(k) => write!(f, "{:?}", k),
            Selector::Slice(s) => write!(f, "{}", s),
            Selector::KeyPattern(re) => write!(f, "`{}`", re.as_str()),
        }
    }
}

impl fmt::Display for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indexer::Select(selectors) => {
                let parts: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Indexer::Wildcard => write!(f, "[*]"),
            Indexer::Recursive(key) => write!(f, "..{}", key),
            Indexer::Filter(_) => write!(f, "[<filter>]"),
            Indexer::ArrayProjection(ops) => write!(f, "{{<{} items>}}", ops.len()),
            Indexer::ObjectProjection(pairs) => {
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                write!(f, "{{{}}}", keys.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jnode;

    #[test]
    fn test_single_vs_multi() {
        assert!(Indexer::Select(vec![Selector::Key("a".into())]).is_single());
        assert!(Indexer::Select(vec![Selector::Index(-1)]).is_single());
        assert!(!Indexer::Select(vec![Selector::Index(0), Selector::Index(1)]).is_single());
        assert!(!Indexer::Select(vec![Selector::Slice(Slicer::default())]).is_single());
        assert!(!Indexer::Wildcard.is_single());
        assert!(!Indexer::Recursive("a".into()).is_single());
        assert!(Indexer::ArrayProjection(vec![Operand::Const(jnode!(1))]).is_single());
        assert!(!Indexer::Filter(Operand::Const(jnode!(true))).is_single());
    }

    #[test]
    fn test_display() {
        let ix = Indexer::Select(vec![
            Selector::Index(1),
            Selector::Key("b".into()),
            Selector::Slice(Slicer::new(None, Some(2), None)),
        ]);
        assert_eq!(ix.to_string(), "[1, \"b\", :2]");
        assert_eq!(Indexer::Recursive("x".into()).to_string(), "..x");
    }
}
