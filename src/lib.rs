// remespath - JSON parsing and the RemesPath query language
// Library entry points: parse JSON text, compile queries, evaluate them against trees

//! # remespath
//!
//! A JSON value model with a lenient, linting parser and a compiled query
//! language (RemesPath) that vectorizes over arrays and objects.
//!
//! ## Architecture
//!
//! - `value` - the `JNode` tree and `Dtype` type masks
//! - `json_parser` - JSON text to `JNode`, with extensions and lint mode
//! - `printer` - compact and pretty serialization with line tracking
//! - `lexer` / `parser` - query text to compiled operands
//! - `compiler` - constant folding and deferred-expression construction
//! - `evaluator` - deferred expressions and indexer chains
//! - `binops` / `functions` - the operator and function catalogs
//!
//! ```
//! use remespath::{parse, search, ParserOptions};
//!
//! let root = parse(r#"{"a": [1, 2, 3, 4]}"#, ParserOptions::default()).unwrap();
//! let big = search("@.a[@ > 2]", &root).unwrap();
//! assert_eq!(big.to_compact_string(false), "[3, 4]");
//! ```

use thiserror::Error;
use tracing::debug;

pub mod ast;
pub mod binops;
pub mod compiler;
pub mod datetime;
pub mod evaluator;
pub mod functions;
pub mod json_parser;
pub mod lexer;
pub mod parser;
pub mod printer;
mod signature;
mod utils;
pub mod value;

pub use evaluator::{EvaluatorError, Operand};
pub use json_parser::{parse, parse_with_lint, JsonParseError, JsonParser, ParserOptions};
pub use parser::ParserError;
pub use signature::Signature;
pub use value::{Dtype, JNode, JValue, Slicer, ValueError};

/// Anything that can go wrong between query text and result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemesPathError {
    #[error("Query error: {0}")]
    Parse(ParserError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluatorError),
}

impl From<ParserError> for RemesPathError {
    fn from(e: ParserError) -> Self {
        match e {
            ParserError::Evaluation(inner) => RemesPathError::Evaluation(inner),
            other => RemesPathError::Parse(other),
        }
    }
}

/// A compiled RemesPath query that can be evaluated against any number of
/// roots.
///
/// # Examples
///
/// ```
/// use remespath::{JNode, Query};
///
/// let query = Query::compile("len(@) + 1").unwrap();
/// let three = JNode::array(vec![JNode::from(1), JNode::from(2), JNode::from(3)]);
/// assert_eq!(query.evaluate(&three).unwrap(), JNode::from(4));
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    operand: Operand,
}

impl Query {
    pub fn compile(query: &str) -> Result<Self, RemesPathError> {
        let operand = parser::compile(query)?;
        Ok(Query {
            source: query.to_string(),
            operand,
        })
    }

    /// Evaluate with `@` bound to `root`. The root is never modified.
    pub fn evaluate(&self, root: &JNode) -> Result<JNode, RemesPathError> {
        debug!(query = %self.source, root = %root.dtype(), "evaluating query");
        Ok(self.operand.resolve(root)?)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the result does not depend on the input at all.
    pub fn is_constant(&self) -> bool {
        !self.operand.is_deferred()
    }

    /// Type the result is known to have before evaluation.
    pub fn dtype(&self) -> Dtype {
        self.operand.dtype()
    }
}

/// Compile `query` and evaluate it once against `root`.
pub fn search(query: &str, root: &JNode) -> Result<JNode, RemesPathError> {
    Query::compile(query)?.evaluate(root)
}

// ── Collaborators ────────────────────────────────────────────────────────────

/// Turns a tree into rows according to some schema.
pub trait Tabularizer {
    type Schema;
    type Error;

    fn tabularize(&self, json: &JNode, schema: &Self::Schema) -> Result<JNode, Self::Error>;
}

/// Renders a tree as YAML text.
pub trait YamlDumper {
    fn dump(&self, json: &JNode, indent: usize) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_errors_become_evaluation_errors() {
        let err = Query::compile("1 + 'a'").unwrap_err();
        assert!(matches!(err, RemesPathError::Evaluation(EvaluatorError::TypeError { .. })));

        let err = Query::compile("1 +").unwrap_err();
        assert!(matches!(err, RemesPathError::Parse(ParserError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_query_reuse() {
        let query = Query::compile("@.x * 2").unwrap();
        assert!(!query.is_constant());
        assert_eq!(query.source(), "@.x * 2");
        let a = parse(r#"{"x": 2}"#, ParserOptions::default()).unwrap();
        let b = parse(r#"{"x": [1.5]}"#, ParserOptions::default()).unwrap();
        assert_eq!(query.evaluate(&a).unwrap(), JNode::from(4));
        assert_eq!(
            query.evaluate(&b).unwrap(),
            JNode::array(vec![JNode::from(3.0)])
        );
    }

    #[test]
    fn test_top_level_miss_is_not_found() {
        let root = parse(r#"{"x": 1}"#, ParserOptions::default()).unwrap();
        assert!(matches!(
            search("@.y", &root),
            Err(RemesPathError::Evaluation(EvaluatorError::NotFound(_)))
        ));
    }

    #[test]
    fn test_constant_query() {
        let query = Query::compile("s_upper('abc')").unwrap();
        assert!(query.is_constant());
        assert_eq!(query.dtype(), Dtype::STR);
        assert_eq!(query.evaluate(&JNode::null()).unwrap(), JNode::from("ABC"));
    }
}
