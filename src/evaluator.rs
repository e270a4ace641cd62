// Expression evaluator
// Deferred "current JSON" expressions and the indexer machinery that walks them

use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

use crate::ast::{Indexer, Selector};
use crate::binops::Binop;
use crate::functions::ArgFunction;
use crate::utils::{slice_indices, wrap_index};
use crate::value::{Dtype, JNode, JValue, ValueError};

/// Deepest tree `..key` will descend into.
pub const MAX_RECURSION_DEPTH: usize = 512;

/// Evaluator errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluatorError {
    #[error("Type error in {name}: {message}")]
    TypeError { name: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot apply {indexer} to {found}")]
    NotIndexable { indexer: String, found: Dtype },

    #[error("Value error: {0}")]
    ValueError(String),

    #[error("Maximum recursion depth ({0}) exceeded")]
    RecursionLimit(usize),

    #[error(transparent)]
    Value(#[from] ValueError),
}

impl EvaluatorError {
    pub fn type_error(name: impl Into<String>, message: impl Into<String>) -> Self {
        EvaluatorError::TypeError {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The indexer found nothing to select (as opposed to a genuine failure).
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            EvaluatorError::NotFound(_) | EvaluatorError::NotIndexable { .. }
        )
    }
}

// ── Operands ─────────────────────────────────────────────────────────────────

/// A compiled sub-expression: either already a value, or a function of `@`.
#[derive(Debug, Clone)]
pub enum Operand {
    Const(JNode),
    Deferred(CurJson),
}

impl Operand {
    /// `@` itself.
    pub fn current() -> Self {
        Operand::Deferred(CurJson::identity())
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            Operand::Const(node) => node.dtype(),
            Operand::Deferred(cj) => cj.dtype,
        }
    }

    #[inline]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Operand::Deferred(_))
    }

    pub fn as_const(&self) -> Option<&JNode> {
        match self {
            Operand::Const(node) => Some(node),
            Operand::Deferred(_) => None,
        }
    }

    /// Value of this operand when `@` is `current`.
    pub fn resolve(&self, current: &JNode) -> Result<JNode, EvaluatorError> {
        match self {
            Operand::Const(node) => Ok(node.clone()),
            Operand::Deferred(cj) => cj.call(current),
        }
    }
}

/// A deferred expression together with the type it is known to produce
/// (`Dtype::UNKNOWN` when that depends on the input).
#[derive(Debug, Clone)]
pub struct CurJson {
    pub dtype: Dtype,
    pub expr: Box<CurJsonExpr>,
}

/// Operation codes of a deferred expression; operands are owned sub-trees.
#[derive(Debug, Clone)]
pub enum CurJsonExpr {
    Identity,
    Binop {
        op: &'static Binop,
        left: Operand,
        right: Operand,
    },
    Function {
        func: &'static ArgFunction,
        args: Vec<Operand>,
    },
    Index {
        base: Operand,
        indexers: Vec<Indexer>,
    },
    Array(Vec<Operand>),
    Object(Vec<(String, Operand)>),
}

impl CurJson {
    pub fn new(dtype: Dtype, expr: CurJsonExpr) -> Self {
        CurJson {
            dtype,
            expr: Box::new(expr),
        }
    }

    pub fn identity() -> Self {
        CurJson::new(Dtype::UNKNOWN, CurJsonExpr::Identity)
    }

    /// Evaluate against `current`, resolving every operand first.
    pub fn call(&self, current: &JNode) -> Result<JNode, EvaluatorError> {
        match self.expr.as_ref() {
            CurJsonExpr::Identity => Ok(current.clone()),
            CurJsonExpr::Binop { op, left, right } => {
                let left = left.resolve(current)?;
                let right = right.resolve(current)?;
                op.call(&left, &right)
            }
            CurJsonExpr::Function { func, args } => {
                let args = args
                    .iter()
                    .map(|arg| arg.resolve(current))
                    .collect::<Result<Vec<_>, _>>()?;
                func.call(args)
            }
            CurJsonExpr::Index { base, indexers } => {
                let base = base.resolve(current)?;
                apply_indexers(&base, indexers)
            }
            CurJsonExpr::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| item.resolve(current))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(JNode::array(items))
            }
            CurJsonExpr::Object(pairs) => {
                let mut map = IndexMap::with_capacity(pairs.len());
                for (key, value) in pairs {
                    map.insert(key.clone(), value.resolve(current)?);
                }
                Ok(JNode::object(map))
            }
        }
    }
}

// ── Indexing ─────────────────────────────────────────────────────────────────

/// Result of one indexer: a single child, or a container of selections.
enum Selected {
    One(JNode),
    Many(JNode),
}

fn not_indexable(indexer: &Indexer, node: &JNode) -> EvaluatorError {
    EvaluatorError::NotIndexable {
        indexer: indexer.to_string(),
        found: node.dtype(),
    }
}

/// Apply a chain of indexers to `node`.
///
/// After a multi-select the rest of the chain runs on every member, keeping
/// the container's shape; members it finds nothing in are dropped.
pub fn apply_indexers(node: &JNode, indexers: &[Indexer]) -> Result<JNode, EvaluatorError> {
    let (first, rest) = match indexers.split_first() {
        Some(split) => split,
        None => return Ok(node.clone()),
    };
    trace!(indexer = %first, dtype = %node.dtype(), "applying indexer");

    match apply_indexer(node, first)? {
        Selected::One(child) => apply_indexers(&child, rest),
        Selected::Many(selection) => {
            if rest.is_empty() {
                return Ok(selection);
            }
            match &selection.value {
                JValue::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items.iter() {
                        match apply_indexers(item, rest) {
                            Ok(v) => out.push(v),
                            Err(e) if e.is_miss() => {}
                            Err(e) => return Err(e),
                        }
                    }
                    Ok(JNode::array(out))
                }
                JValue::Object(map) => {
                    let mut out = IndexMap::with_capacity(map.len());
                    for (key, item) in map.iter() {
                        match apply_indexers(item, rest) {
                            Ok(v) => {
                                out.insert(key.clone(), v);
                            }
                            Err(e) if e.is_miss() => {}
                            Err(e) => return Err(e),
                        }
                    }
                    Ok(JNode::object(out))
                }
                _ => apply_indexers(&selection, rest),
            }
        }
    }
}

fn apply_indexer(node: &JNode, indexer: &Indexer) -> Result<Selected, EvaluatorError> {
    match indexer {
        Indexer::Select(selectors) => {
            if indexer.is_single() {
                select_one(node, &selectors[0], indexer).map(Selected::One)
            } else {
                select_many(node, selectors, indexer).map(Selected::Many)
            }
        }
        Indexer::Wildcard => {
            if node.is_container() {
                Ok(Selected::Many(node.clone()))
            } else {
                Err(not_indexable(indexer, node))
            }
        }
        Indexer::Recursive(key) => {
            if !node.is_container() {
                return Err(not_indexable(indexer, node));
            }
            let mut found = Vec::new();
            recursive_search(node, key, 0, &mut found)?;
            Ok(Selected::Many(JNode::array(found)))
        }
        Indexer::Filter(filter) => apply_filter(node, filter, indexer),
        Indexer::ArrayProjection(items) => {
            let items = items
                .iter()
                .map(|item| item.resolve(node))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Selected::One(JNode::array(items)))
        }
        Indexer::ObjectProjection(pairs) => {
            let mut map = IndexMap::with_capacity(pairs.len());
            for (key, value) in pairs {
                map.insert(key.clone(), value.resolve(node)?);
            }
            Ok(Selected::One(JNode::object(map)))
        }
    }
}

fn select_one(node: &JNode, selector: &Selector, indexer: &Indexer) -> Result<JNode, EvaluatorError> {
    match (selector, &node.value) {
        (Selector::Index(i), JValue::Array(items)) => wrap_index(*i, items.len())
            .map(|ix| items[ix].clone())
            .ok_or_else(|| {
                EvaluatorError::NotFound(format!(
                    "index {} in array of length {}",
                    i,
                    items.len()
                ))
            }),
        (Selector::Key(key), JValue::Object(map)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| EvaluatorError::NotFound(format!("key {:?}", key))),
        _ => Err(not_indexable(indexer, node)),
    }
}

fn select_many(node: &JNode, selectors: &[Selector], indexer: &Indexer) -> Result<JNode, EvaluatorError> {
    match &node.value {
        JValue::Array(items) => {
            let mut out = Vec::new();
            for selector in selectors {
                match selector {
                    Selector::Index(i) => {
                        if let Some(ix) = wrap_index(*i, items.len()) {
                            out.push(items[ix].clone());
                        }
                    }
                    Selector::Slice(slicer) => {
                        out.extend(
                            slice_indices(items.len(), slicer)
                                .into_iter()
                                .map(|ix| items[ix].clone()),
                        );
                    }
                    Selector::Key(_) | Selector::KeyPattern(_) => {
                        return Err(not_indexable(indexer, node))
                    }
                }
            }
            Ok(JNode::array(out))
        }
        JValue::Object(map) => {
            let mut out = IndexMap::new();
            for selector in selectors {
                match selector {
                    Selector::Key(key) => {
                        if let Some(v) = map.get(key) {
                            out.insert(key.clone(), v.clone());
                        }
                    }
                    Selector::KeyPattern(re) => {
                        for (key, v) in map.iter().filter(|(k, _)| re.is_match(k)) {
                            out.insert(key.clone(), v.clone());
                        }
                    }
                    Selector::Index(_) | Selector::Slice(_) => {
                        return Err(not_indexable(indexer, node))
                    }
                }
            }
            Ok(JNode::object(out))
        }
        _ => Err(not_indexable(indexer, node)),
    }
}

/// Depth-first collection of every value stored under `key`.
fn recursive_search(
    node: &JNode,
    key: &str,
    depth: usize,
    found: &mut Vec<JNode>,
) -> Result<(), EvaluatorError> {
    if depth >= MAX_RECURSION_DEPTH {
        return Err(EvaluatorError::RecursionLimit(MAX_RECURSION_DEPTH));
    }
    match &node.value {
        JValue::Object(map) => {
            for (k, child) in map.iter() {
                if k == key {
                    found.push(child.clone());
                }
                recursive_search(child, key, depth + 1, found)?;
            }
        }
        JValue::Array(items) => {
            for child in items.iter() {
                recursive_search(child, key, depth + 1, found)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn mask_error(message: impl Into<String>) -> EvaluatorError {
    EvaluatorError::ValueError(message.into())
}

fn expect_bool(node: &JNode) -> Result<bool, EvaluatorError> {
    node.as_bool().ok_or_else(|| {
        EvaluatorError::type_error(
            "filter",
            format!("boolean mask contains {}", node.dtype()),
        )
    })
}

/// `[expr]` where `@` is `node`.
fn apply_filter(node: &JNode, filter: &Operand, indexer: &Indexer) -> Result<Selected, EvaluatorError> {
    let mask = filter.resolve(node)?;
    match (&node.value, &mask.value) {
        (_, JValue::Bool(keep)) => {
            if node.is_container() {
                if *keep {
                    Ok(Selected::Many(node.clone()))
                } else if node.is_array() {
                    Ok(Selected::Many(JNode::array(Vec::new())))
                } else {
                    Ok(Selected::Many(JNode::object(IndexMap::new())))
                }
            } else if *keep {
                Ok(Selected::One(node.clone()))
            } else {
                Err(EvaluatorError::NotFound("filter rejected the value".to_string()))
            }
        }
        (JValue::Array(items), JValue::Array(flags)) => {
            if items.len() != flags.len() {
                return Err(mask_error(format!(
                    "boolean mask of length {} applied to array of length {}",
                    flags.len(),
                    items.len()
                )));
            }
            let mut out = Vec::new();
            for (item, flag) in items.iter().zip(flags.iter()) {
                if expect_bool(flag)? {
                    out.push(item.clone());
                }
            }
            Ok(Selected::Many(JNode::array(out)))
        }
        (JValue::Object(map), JValue::Object(flags)) => {
            if map.len() != flags.len() {
                return Err(mask_error("boolean mask has different keys than the object"));
            }
            let mut out = IndexMap::new();
            for (key, item) in map.iter() {
                let flag = flags
                    .get(key)
                    .ok_or_else(|| mask_error(format!("boolean mask is missing key {:?}", key)))?;
                if expect_bool(flag)? {
                    out.insert(key.clone(), item.clone());
                }
            }
            Ok(Selected::Many(JNode::object(out)))
        }
        (_, JValue::Int(i)) => select_one(node, &Selector::Index(*i), indexer).map(Selected::One),
        (_, JValue::Str(key)) => {
            select_one(node, &Selector::Key(key.to_string()), indexer).map(Selected::One)
        }
        _ => Err(EvaluatorError::type_error(
            "filter",
            format!(
                "cannot index {} with a {} result",
                node.dtype(),
                mask.dtype()
            ),
        )),
    }
}
