// RemesPath query parser
// Precedence climbing straight into compiled operands

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::ast::{Indexer, Selector};
use crate::binops::{self, Binop};
use crate::compiler::{
    compile_array, compile_binop, compile_function, compile_index, compile_object, compile_uminus,
};
use crate::evaluator::{EvaluatorError, Operand};
use crate::functions;
use crate::lexer::{Lexer, Token};
use crate::value::{Dtype, JNode, JValue};

/// Parser errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    #[error("Unexpected character {ch:?} at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Unclosed string literal starting at position {pos}")]
    UnclosedString { pos: usize },

    #[error("Unclosed regex literal starting at position {pos}")]
    UnclosedRegex { pos: usize },

    #[error("Invalid regex at position {pos}: {message}")]
    InvalidRegex { pos: usize, message: String },

    #[error("Invalid escape sequence {escape} at position {pos}")]
    InvalidEscape { escape: String, pos: usize },

    #[error("Invalid number {text:?} at position {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("Invalid slice at position {pos}")]
    InvalidSlice { pos: usize },

    #[error("Unexpected token {found} at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("Expected {expected}, found {found} at position {pos}")]
    Expected {
        expected: String,
        found: String,
        pos: usize,
    },

    #[error("Unknown function {name:?} at position {pos}")]
    UnknownFunction { name: String, pos: usize },

    #[error("{name} takes between {min} and {max} arguments, got {actual}")]
    ArgCount {
        name: String,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("{name} argument {} must be {expected}, got {found}", .position + 1)]
    ArgType {
        name: String,
        position: usize,
        expected: Dtype,
        found: Dtype,
    },

    #[error("Query nested deeper than {limit} levels at position {pos}")]
    TooDeep { limit: usize, pos: usize },

    /// Raised while folding a constant sub-expression.
    #[error(transparent)]
    Evaluation(#[from] EvaluatorError),
}

/// Deepest nesting of sub-expressions a query may have.
pub const MAX_QUERY_DEPTH: usize = 128;

/// Parser for RemesPath queries
///
/// There is no separate syntax tree: every production hands its pieces to the
/// compiler, which folds what it can.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    position: usize,
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParserError> {
        let mut lexer = Lexer::new(input);
        let (current_token, position) = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            position,
            depth: 0,
        })
    }

    fn advance(&mut self) -> Result<(), ParserError> {
        let (token, position) = self.lexer.next_token()?;
        self.current_token = token;
        self.position = position;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParserError> {
        if self.current_token == expected {
            self.advance()
        } else {
            Err(self.expected(&expected.describe()))
        }
    }

    fn expected(&self, what: &str) -> ParserError {
        ParserError::Expected {
            expected: what.to_string(),
            found: self.current_token.describe(),
            pos: self.position,
        }
    }

    fn unexpected(&self) -> ParserError {
        ParserError::UnexpectedToken {
            found: self.current_token.describe(),
            pos: self.position,
        }
    }

    /// Runs `f` one nesting level deeper, failing past [`MAX_QUERY_DEPTH`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParserError>,
    ) -> Result<T, ParserError> {
        if self.depth >= MAX_QUERY_DEPTH {
            return Err(ParserError::TooDeep {
                limit: MAX_QUERY_DEPTH,
                pos: self.position,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Binary operator for the current token, lowest precedence first:
    /// `& | ^`, comparisons, `+ -`, `* / // %`, and `**` above unary minus.
    fn binding_power(&self, token: &Token) -> Option<&'static Binop> {
        let op = match token {
            Token::Ampersand => &binops::BITWISE_AND,
            Token::Pipe => &binops::BITWISE_OR,
            Token::Caret => &binops::BITWISE_XOR,
            Token::Equal => &binops::EQUAL,
            Token::NotEqual => &binops::NOT_EQUAL,
            Token::LessThan => &binops::LESS_THAN,
            Token::LessThanOrEqual => &binops::LESS_THAN_OR_EQUAL,
            Token::GreaterThan => &binops::GREATER_THAN,
            Token::GreaterThanOrEqual => &binops::GREATER_THAN_OR_EQUAL,
            Token::Match => &binops::HAS_PATTERN,
            Token::In => &binops::IS_IN,
            Token::Plus => &binops::ADD,
            Token::Minus => &binops::SUBTRACT,
            Token::Star => &binops::MULTIPLY,
            Token::Slash => &binops::DIVIDE,
            Token::SlashSlash => &binops::FLOOR_DIVIDE,
            Token::Percent => &binops::MODULO,
            Token::StarStar => &binops::POWER,
            _ => return None,
        };
        Some(op)
    }

    /// Parse an expression whose operators all bind at least as tightly as
    /// `min_prec`.
    fn parse_expression(&mut self, min_prec: u8) -> Result<Operand, ParserError> {
        self.nested(|p| p.parse_expression_inner(min_prec))
    }

    fn parse_expression_inner(&mut self, min_prec: u8) -> Result<Operand, ParserError> {
        let mut lhs = if self.current_token == Token::Minus {
            self.advance()?;
            self.parse_negation()?
        } else {
            self.parse_postfix()?
        };

        while let Some(op) = self.binding_power(&self.current_token) {
            if op.precedence < min_prec {
                break;
            }
            self.advance()?;
            // `**` is right-associative
            let next_prec = if std::ptr::eq(op, &binops::POWER) {
                op.precedence
            } else {
                op.precedence + 1
            };
            let rhs = self.parse_expression(next_prec)?;
            lhs = compile_binop(op, lhs, rhs)?;
        }

        Ok(lhs)
    }

    /// Everything after a unary minus. `-a ** b` becomes one `-(a ** b)` node.
    fn parse_negation(&mut self) -> Result<Operand, ParserError> {
        if self.current_token == Token::Minus {
            self.advance()?;
            let inner = self.nested(Self::parse_negation)?;
            return compile_uminus(inner);
        }
        let base = self.parse_postfix()?;
        if self.current_token == Token::StarStar {
            self.advance()?;
            let exponent = self.parse_expression(binops::NEG_POWER.precedence)?;
            return compile_binop(&binops::NEG_POWER, base, exponent);
        }
        compile_uminus(base)
    }

    /// A primary followed by any number of indexers.
    fn parse_postfix(&mut self) -> Result<Operand, ParserError> {
        let base = self.parse_primary()?;
        let mut indexers = Vec::new();
        loop {
            let indexer = match self.current_token {
                Token::Dot => {
                    self.advance()?;
                    self.parse_dot_indexer()?
                }
                Token::DotDot => {
                    self.advance()?;
                    Indexer::Recursive(self.parse_key()?)
                }
                Token::LeftBracket => {
                    self.advance()?;
                    self.parse_bracket_indexer()?
                }
                Token::LeftBrace => {
                    self.advance()?;
                    self.parse_projection()?
                }
                _ => break,
            };
            indexers.push(indexer);
        }
        compile_index(base, indexers)
    }

    /// Parse a primary expression (literals, `@`, grouping, containers, calls)
    fn parse_primary(&mut self) -> Result<Operand, ParserError> {
        let pos = self.position;
        let node = match self.current_token.clone() {
            Token::At => {
                self.advance()?;
                return Ok(Operand::current());
            }
            Token::Int(n) => JNode::from(n),
            Token::Float(f) => JNode::from(f),
            Token::String(s) => JNode::from(s),
            Token::True => JNode::from(true),
            Token::False => JNode::from(false),
            Token::Null => JNode::null(),
            Token::Slice(slicer) => JNode::slice(slicer),
            Token::Regex(pattern) => JNode::regex(compile_regex(&pattern, pos)?),
            Token::LeftParen => {
                self.advance()?;
                let inner = self.parse_expression(0)?;
                self.expect(Token::RightParen)?;
                return Ok(inner);
            }
            Token::LeftBracket => {
                self.advance()?;
                let items = self.parse_list(Token::RightBracket)?;
                return Ok(compile_array(items));
            }
            Token::LeftBrace => {
                self.advance()?;
                let pairs = self.parse_pairs()?;
                return Ok(compile_object(pairs));
            }
            Token::Identifier(name) => {
                self.advance()?;
                if self.current_token != Token::LeftParen {
                    return Err(ParserError::UnexpectedToken {
                        found: format!("identifier {:?}", name),
                        pos,
                    });
                }
                self.advance()?;
                let func = functions::lookup(&name)
                    .ok_or(ParserError::UnknownFunction { name, pos })?;
                let args = self.parse_list(Token::RightParen)?;
                return compile_function(func, args);
            }
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        Ok(Operand::Const(node))
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_list(&mut self, close: Token) -> Result<Vec<Operand>, ParserError> {
        let mut items = Vec::new();
        if self.current_token == close {
            self.advance()?;
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression(0)?);
            if self.current_token == Token::Comma {
                self.advance()?;
            } else {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    /// `key: expr` pairs up to and including `}`.
    fn parse_pairs(&mut self) -> Result<Vec<(String, Operand)>, ParserError> {
        let mut pairs = Vec::new();
        if self.current_token == Token::RightBrace {
            self.advance()?;
            return Ok(pairs);
        }
        loop {
            let key = self.parse_key()?;
            self.expect(Token::Colon)?;
            pairs.push((key, self.parse_expression(0)?));
            if self.current_token == Token::Comma {
                self.advance()?;
            } else {
                self.expect(Token::RightBrace)?;
                return Ok(pairs);
            }
        }
    }

    /// An unquoted or quoted key name.
    fn parse_key(&mut self) -> Result<String, ParserError> {
        let key = match &self.current_token {
            Token::Identifier(name) => name.clone(),
            Token::String(s) => s.clone(),
            Token::True => "true".to_string(),
            Token::False => "false".to_string(),
            Token::Null => "null".to_string(),
            Token::In => "in".to_string(),
            _ => return Err(self.expected("a key")),
        };
        self.advance()?;
        Ok(key)
    }

    fn parse_dot_indexer(&mut self) -> Result<Indexer, ParserError> {
        match self.current_token.clone() {
            Token::Star => {
                self.advance()?;
                Ok(Indexer::Wildcard)
            }
            Token::Regex(pattern) => {
                let re = compile_regex(&pattern, self.position)?;
                self.advance()?;
                Ok(Indexer::Select(vec![Selector::KeyPattern(re)]))
            }
            _ => Ok(Indexer::Select(vec![Selector::Key(self.parse_key()?)])),
        }
    }

    /// After `[`: a wildcard, a list of constant selectors, or one filter
    /// expression.
    fn parse_bracket_indexer(&mut self) -> Result<Indexer, ParserError> {
        if self.current_token == Token::Star {
            self.advance()?;
            self.expect(Token::RightBracket)?;
            return Ok(Indexer::Wildcard);
        }

        let pos = self.position;
        let mut items = self.parse_list(Token::RightBracket)?;
        if items.is_empty() {
            return Err(ParserError::Expected {
                expected: "an index, key, slice or filter".to_string(),
                found: Token::RightBracket.describe(),
                pos,
            });
        }

        if items.len() == 1 {
            if let Some(selector) = items[0].as_const().and_then(as_selector) {
                return Ok(Indexer::Select(vec![selector]));
            }
            return Ok(Indexer::Filter(items.remove(0)));
        }

        let mut selectors = Vec::with_capacity(items.len());
        for item in &items {
            match item.as_const().and_then(as_selector) {
                Some(selector) => selectors.push(selector),
                None => {
                    return Err(ParserError::Expected {
                        expected: "constant indices, keys or slices".to_string(),
                        found: format!("{} expression", item.dtype()),
                        pos,
                    })
                }
            }
        }
        Ok(Indexer::Select(selectors))
    }

    /// After `{`: `{k: e, ...}` builds an object, `{e, ...}` an array.
    fn parse_projection(&mut self) -> Result<Indexer, ParserError> {
        let is_object = matches!(self.current_token, Token::Identifier(_) | Token::String(_))
            && self.lexer_peek_is_colon();
        if is_object {
            Ok(Indexer::ObjectProjection(self.parse_pairs()?))
        } else {
            Ok(Indexer::ArrayProjection(self.parse_list(Token::RightBrace)?))
        }
    }

    fn lexer_peek_is_colon(&self) -> bool {
        let mut lookahead = self.lexer.clone();
        matches!(lookahead.next_token(), Ok((Token::Colon, _)))
    }

    pub fn parse(&mut self) -> Result<Operand, ParserError> {
        let operand = self.parse_expression(0)?;

        if self.current_token != Token::Eof {
            return Err(self.expected("end of query"));
        }

        Ok(operand)
    }
}

fn compile_regex(pattern: &str, pos: usize) -> Result<Regex, ParserError> {
    Regex::new(pattern).map_err(|e| ParserError::InvalidRegex {
        pos,
        message: e.to_string(),
    })
}

/// Constants that can sit in a `[...]` selector list.
fn as_selector(node: &JNode) -> Option<Selector> {
    match &node.value {
        JValue::Int(i) => Some(Selector::Index(*i)),
        JValue::Str(s) => Some(Selector::Key(s.to_string())),
        JValue::Slice(slicer) => Some(Selector::Slice(slicer.clone())),
        JValue::Regex(re) => Some(Selector::KeyPattern(re.clone())),
        _ => None,
    }
}

/// Compile a RemesPath query.
///
/// This is the main entry point for parsing.
pub fn compile(query: &str) -> Result<Operand, ParserError> {
    let mut parser = Parser::new(query)?;
    let operand = parser.parse()?;
    debug!(query, deferred = operand.is_deferred(), dtype = %operand.dtype(), "compiled query");
    Ok(operand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jnode;

    fn eval(query: &str, root: &JNode) -> JNode {
        compile(query).unwrap().resolve(root).unwrap()
    }

    fn constant(query: &str) -> JNode {
        match compile(query).unwrap() {
            Operand::Const(node) => node,
            Operand::Deferred(_) => panic!("{} should fold to a constant", query),
        }
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(constant("42"), jnode!(42));
        assert_eq!(constant("'hi'"), jnode!("hi"));
        assert_eq!(constant("null"), JNode::null());
        assert_eq!(constant("true"), jnode!(true));
        assert_eq!(constant("-5"), jnode!(-5));
        assert!(constant("NaN").as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_parse_precedence() {
        assert_eq!(constant("1 + 2 * 3"), jnode!(7));
        assert_eq!(constant("(1 + 2) * 3"), jnode!(9));
        assert_eq!(constant("2 ** 3 ** 2"), jnode!(512.0));
        assert_eq!(constant("10 - 4 - 3"), jnode!(3));
        assert_eq!(constant("1 + 2 > 2"), jnode!(true));
        assert_eq!(constant("3 > 2 & 1 > 2"), jnode!(false));
        assert_eq!(constant("7 // 2 % 2"), jnode!(1));
    }

    #[test]
    fn test_parse_unary_minus() {
        assert_eq!(constant("-2 ** 2"), jnode!(-4.0));
        assert_eq!(constant("2 ** -1"), jnode!(0.5));
        assert_eq!(constant("-2 * 3"), jnode!(-6));
        assert_eq!(constant("--3"), jnode!(3));
        assert_eq!(constant("1 - -1"), jnode!(2));
    }

    #[test]
    fn test_parse_containers() {
        assert_eq!(constant("[1, 'a', [true]]"), jnode!([1, "a", [true]]));
        assert_eq!(constant("{a: 1, 'b c': [2]}"), jnode!({"a": 1, "b c": [2]}));
        assert_eq!(constant("[]"), jnode!([]));
        assert_eq!(constant("{}"), jnode!({}));
    }

    #[test]
    fn test_parse_function_call() {
        assert_eq!(constant("len([1, 2, 3])"), jnode!(3));
        assert_eq!(constant("s_slice('abcd', 1:3)"), jnode!("bc"));
        assert_eq!(constant("sorted([3, 1, 2], true)"), jnode!([3, 2, 1]));
    }

    #[test]
    fn test_parse_constant_indexing_folds() {
        assert_eq!(constant("[1, 2, 3][-1]"), jnode!(3));
        assert_eq!(constant("{a: {b: 7}}.a.b"), jnode!(7));
        assert_eq!(constant("[1, 2, 3, 4][@ > 2]"), jnode!([3, 4]));
    }

    #[test]
    fn test_parse_paths() {
        let root = jnode!({"a": [{"b": 1}, {"b": 2}], "c d": 3});
        assert_eq!(eval("@.a[0].b", &root), jnode!(1));
        assert_eq!(eval("@.a[:].b", &root), jnode!([1, 2]));
        assert_eq!(eval("@.a[*].b", &root), jnode!([1, 2]));
        assert_eq!(eval("@.'c d'", &root), jnode!(3));
        assert_eq!(eval("@[\"c d\"]", &root), jnode!(3));
        assert_eq!(eval("@..b", &root), jnode!([1, 2]));
        assert_eq!(eval("@.*[0]", &root), jnode!({"a": {"b": 1}}));
    }

    #[test]
    fn test_parse_selector_lists() {
        let root = jnode!([0, 1, 2, 3, 4, 5]);
        assert_eq!(eval("@[0, 2:4, -1]", &root), jnode!([0, 2, 3, 5]));
        assert_eq!(eval("@[::2]", &root), jnode!([0, 2, 4]));
        let obj = jnode!({"ab": 1, "b": 2, "ac": 3});
        assert_eq!(eval("@['ab', 'b']", &obj), jnode!({"ab": 1, "b": 2}));
        assert_eq!(eval("@.`^a`", &obj), jnode!({"ab": 1, "ac": 3}));
    }

    #[test]
    fn test_parse_filters() {
        let root = jnode!([1, 2, 3, 4]);
        assert_eq!(eval("@[@ > 2]", &root), jnode!([3, 4]));
        assert_eq!(eval("@[@ % 2 == 0] * 10", &root), jnode!([20, 40]));
        let rows = jnode!([{"n": "x", "v": 1}, {"n": "y", "v": 5}]);
        assert_eq!(eval("@[@[:].v > 2].n", &rows), jnode!(["y"]));
        assert_eq!(eval("@[:].v[@ < 2]", &rows), jnode!([1]));
    }

    #[test]
    fn test_parse_projections() {
        let root = jnode!({"a": 1, "b": [2, 3]});
        assert_eq!(eval("@{@.a, len(@.b)}", &root), jnode!([1, 2]));
        assert_eq!(eval("@{x: @.a, y: @.b[0]}", &root), jnode!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_deferred_function_call() {
        let query = compile("len(@) + 1").unwrap();
        assert!(query.is_deferred());
        assert_eq!(query.resolve(&jnode!([1, 2, 3])).unwrap(), jnode!(4));
        assert_eq!(query.resolve(&jnode!({"a": 1, "b": 2})).unwrap(), jnode!(3));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(compile("1 +"), Err(ParserError::UnexpectedToken { .. })));
        assert!(matches!(compile("(1"), Err(ParserError::Expected { .. })));
        assert!(matches!(compile("[1, 2"), Err(ParserError::Expected { .. })));
        assert!(matches!(compile("1 2"), Err(ParserError::Expected { .. })));
        assert!(matches!(compile("foo(1)"), Err(ParserError::UnknownFunction { .. })));
        assert!(matches!(compile("foo"), Err(ParserError::UnexpectedToken { .. })));
        assert!(matches!(compile("len()"), Err(ParserError::ArgCount { .. })));
        assert!(matches!(compile("s_len(1)"), Err(ParserError::ArgType { .. })));
        assert!(matches!(compile("@[]"), Err(ParserError::Expected { .. })));
        assert!(matches!(compile("`(`"), Err(ParserError::InvalidRegex { .. })));
        assert!(matches!(
            compile("1 / 'a'"),
            Err(ParserError::Evaluation(EvaluatorError::TypeError { .. }))
        ));
    }

    #[test]
    fn test_arg_type_message() {
        let message = compile("s_len(1)").unwrap_err().to_string();
        assert!(message.starts_with("s_len argument 1 must be str"), "{}", message);
        assert!(message.ends_with("got int"), "{}", message);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "(".repeat(100_000) + "1" + &")".repeat(100_000);
        assert!(matches!(compile(&deep), Err(ParserError::TooDeep { .. })));
        let negated = "-".repeat(100_000) + "1";
        assert!(matches!(compile(&negated), Err(ParserError::TooDeep { .. })));

        let fine = "[".repeat(50) + "@" + &"]".repeat(50);
        assert!(compile(&fine).is_ok());
        assert_eq!(
            compile(&("-".repeat(10) + "2")).unwrap().as_const(),
            Some(&JNode::from(2))
        );
    }
}
