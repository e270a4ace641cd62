// Binary operators
// Arithmetic, bitwise, comparison, membership and regex-match operators with broadcasting

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use regex::Regex;

use crate::evaluator::EvaluatorError;
use crate::value::{Dtype, JNode, JValue};

type BinopFn = fn(&JNode, &JNode) -> Result<JNode, EvaluatorError>;

/// A binary operator descriptor. All instances are statics.
pub struct Binop {
    pub name: &'static str,
    /// Binding strength for precedence climbing, higher binds tighter.
    pub precedence: u8,
    /// Type of a scalar result.
    pub result: Dtype,
    /// When false the right operand is passed whole (`in`).
    pub broadcast_right: bool,
    func: BinopFn,
}

impl fmt::Debug for Binop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binop({:?})", self.name)
    }
}

impl Binop {
    /// Apply the operator, broadcasting over containers.
    ///
    /// Two arrays zip by position and two objects by key; a container paired
    /// with a scalar maps over the container.
    pub fn call(&self, left: &JNode, right: &JNode) -> Result<JNode, EvaluatorError> {
        match (&left.value, &right.value) {
            (JValue::Array(a), JValue::Array(b)) if self.broadcast_right => {
                if a.len() != b.len() {
                    return Err(EvaluatorError::ValueError(format!(
                        "{} on arrays of different lengths ({} and {})",
                        self.name,
                        a.len(),
                        b.len()
                    )));
                }
                let out = a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| self.call(x, y))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(JNode::array(out))
            }
            (JValue::Object(a), JValue::Object(b)) if self.broadcast_right => {
                if a.len() != b.len() {
                    return Err(self.key_mismatch());
                }
                let mut out = IndexMap::with_capacity(a.len());
                for (key, x) in a.iter() {
                    let y = b.get(key).ok_or_else(|| self.key_mismatch())?;
                    out.insert(key.clone(), self.call(x, y)?);
                }
                Ok(JNode::object(out))
            }
            (JValue::Array(a), _) => {
                let out = a
                    .iter()
                    .map(|x| self.call(x, right))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(JNode::array(out))
            }
            (JValue::Object(a), _) => {
                let mut out = IndexMap::with_capacity(a.len());
                for (key, x) in a.iter() {
                    out.insert(key.clone(), self.call(x, right)?);
                }
                Ok(JNode::object(out))
            }
            (_, JValue::Array(b)) if self.broadcast_right => {
                let out = b
                    .iter()
                    .map(|y| self.call(left, y))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(JNode::array(out))
            }
            (_, JValue::Object(b)) if self.broadcast_right => {
                let mut out = IndexMap::with_capacity(b.len());
                for (key, y) in b.iter() {
                    out.insert(key.clone(), self.call(left, y)?);
                }
                Ok(JNode::object(out))
            }
            _ => (self.func)(left, right),
        }
    }

    /// Static type of `left op right`: unknown whenever either side may be
    /// a container, since broadcasting changes the shape.
    pub fn result_type(&self, left: Dtype, right: Dtype) -> Dtype {
        let right_shapes = self.broadcast_right && right.intersects(Dtype::ITERABLE);
        if left.intersects(Dtype::ITERABLE) || right_shapes {
            Dtype::UNKNOWN
        } else {
            self.result
        }
    }

    fn key_mismatch(&self) -> EvaluatorError {
        EvaluatorError::ValueError(format!("{} on objects with different keys", self.name))
    }
}

// ── Operator table ───────────────────────────────────────────────────────────

const fn binop(name: &'static str, precedence: u8, result: Dtype, func: BinopFn) -> Binop {
    Binop {
        name,
        precedence,
        result,
        broadcast_right: true,
        func,
    }
}

pub static BITWISE_AND: Binop = binop("&", 0, Dtype::INT.or(Dtype::BOOL), bitwise_and);
pub static BITWISE_OR: Binop = binop("|", 0, Dtype::INT.or(Dtype::BOOL), bitwise_or);
pub static BITWISE_XOR: Binop = binop("^", 0, Dtype::INT.or(Dtype::BOOL), bitwise_xor);

pub static EQUAL: Binop = binop("==", 1, Dtype::BOOL, is_equal);
pub static NOT_EQUAL: Binop = binop("!=", 1, Dtype::BOOL, is_not_equal);
pub static LESS_THAN: Binop = binop("<", 1, Dtype::BOOL, less_than);
pub static LESS_THAN_OR_EQUAL: Binop = binop("<=", 1, Dtype::BOOL, less_than_or_equal);
pub static GREATER_THAN: Binop = binop(">", 1, Dtype::BOOL, greater_than);
pub static GREATER_THAN_OR_EQUAL: Binop = binop(">=", 1, Dtype::BOOL, greater_than_or_equal);
pub static HAS_PATTERN: Binop = binop("=~", 1, Dtype::BOOL, has_pattern);
pub static IS_IN: Binop = Binop {
    name: "in",
    precedence: 1,
    result: Dtype::BOOL,
    broadcast_right: false,
    func: is_in,
};

pub static ADD: Binop = binop("+", 2, Dtype::FLOAT_OR_INT.or(Dtype::STR), add);
pub static SUBTRACT: Binop = binop("-", 2, Dtype::FLOAT_OR_INT, subtract);

pub static MULTIPLY: Binop = binop("*", 3, Dtype::FLOAT_OR_INT, multiply);
pub static DIVIDE: Binop = binop("/", 3, Dtype::FLOAT, divide);
pub static FLOOR_DIVIDE: Binop = binop("//", 3, Dtype::FLOAT_OR_INT, floor_divide);
pub static MODULO: Binop = binop("%", 3, Dtype::FLOAT_OR_INT, modulo);

pub static POWER: Binop = binop("**", 5, Dtype::FLOAT, power);
/// `-a ** b`, evaluated as `-(a ** b)`.
pub static NEG_POWER: Binop = binop("-**", 5, Dtype::FLOAT, neg_power);

// ── Numeric helpers ──────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

fn to_num(name: &str, node: &JNode) -> Result<Num, EvaluatorError> {
    match node.value {
        JValue::Int(n) => Ok(Num::Int(n)),
        JValue::Bool(b) => Ok(Num::Int(b as i64)),
        JValue::Float(f) => Ok(Num::Float(f)),
        _ => Err(EvaluatorError::type_error(
            name,
            format!("expected a number, got {}", node.dtype()),
        )),
    }
}

fn to_float(name: &str, node: &JNode) -> Result<f64, EvaluatorError> {
    node.as_f64().ok_or_else(|| {
        EvaluatorError::type_error(name, format!("expected a number, got {}", node.dtype()))
    })
}

/// Int if both sides are integral (bools count), float otherwise.
fn arithmetic(
    name: &str,
    a: &JNode,
    b: &JNode,
    int_op: fn(i64, i64) -> Result<i64, EvaluatorError>,
    float_op: fn(f64, f64) -> Result<f64, EvaluatorError>,
) -> Result<JNode, EvaluatorError> {
    match (to_num(name, a)?, to_num(name, b)?) {
        (Num::Int(x), Num::Int(y)) => Ok(JNode::from(int_op(x, y)?)),
        (x, y) => Ok(JNode::from(float_op(as_f64(x), as_f64(y))?)),
    }
}

#[inline]
fn as_f64(n: Num) -> f64 {
    match n {
        Num::Int(i) => i as f64,
        Num::Float(f) => f,
    }
}

fn zero_division(name: &str) -> EvaluatorError {
    EvaluatorError::ValueError(format!("division by zero in {}", name))
}

fn floor_div_i64(x: i64, y: i64) -> Result<i64, EvaluatorError> {
    if y == 0 {
        return Err(zero_division("//"));
    }
    let q = x.wrapping_div(y);
    if x.wrapping_rem(y) != 0 && ((x < 0) != (y < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn mod_i64(x: i64, y: i64) -> Result<i64, EvaluatorError> {
    if y == 0 {
        return Err(zero_division("%"));
    }
    let r = x.wrapping_rem(y);
    if r != 0 && ((r < 0) != (y < 0)) {
        Ok(r + y)
    } else {
        Ok(r)
    }
}

fn mod_f64(x: f64, y: f64) -> Result<f64, EvaluatorError> {
    if y == 0.0 {
        return Err(zero_division("%"));
    }
    let r = x % y;
    if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
        Ok(r + y)
    } else {
        Ok(r)
    }
}

// ── Operator implementations ─────────────────────────────────────────────────

fn add(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    if let (JValue::Str(x), JValue::Str(y)) = (&a.value, &b.value) {
        let mut s = String::with_capacity(x.len() + y.len());
        s.push_str(x);
        s.push_str(y);
        return Ok(JNode::string(s));
    }
    arithmetic("+", a, b, |x, y| Ok(x.wrapping_add(y)), |x, y| Ok(x + y))
}

fn subtract(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    arithmetic("-", a, b, |x, y| Ok(x.wrapping_sub(y)), |x, y| Ok(x - y))
}

fn multiply(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    arithmetic("*", a, b, |x, y| Ok(x.wrapping_mul(y)), |x, y| Ok(x * y))
}

fn divide(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(to_float("/", a)? / to_float("/", b)?))
}

fn floor_divide(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    arithmetic("//", a, b, floor_div_i64, |x, y| {
        if y == 0.0 {
            Err(zero_division("//"))
        } else {
            Ok((x / y).floor())
        }
    })
}

fn modulo(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    arithmetic("%", a, b, mod_i64, mod_f64)
}

fn power(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(to_float("**", a)?.powf(to_float("**", b)?)))
}

fn neg_power(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(-to_float("**", a)?.powf(to_float("**", b)?)))
}

fn bitwise(
    name: &str,
    a: &JNode,
    b: &JNode,
    int_op: fn(i64, i64) -> i64,
    bool_op: fn(bool, bool) -> bool,
) -> Result<JNode, EvaluatorError> {
    match (&a.value, &b.value) {
        (JValue::Bool(x), JValue::Bool(y)) => Ok(JNode::from(bool_op(*x, *y))),
        (JValue::Int(_), JValue::Int(_) | JValue::Bool(_))
        | (JValue::Bool(_), JValue::Int(_)) => match (to_num(name, a)?, to_num(name, b)?) {
            (Num::Int(x), Num::Int(y)) => Ok(JNode::from(int_op(x, y))),
            _ => Err(EvaluatorError::type_error(name, "expected ints or bools")),
        },
        _ => Err(EvaluatorError::type_error(
            name,
            format!("cannot combine {} and {}", a.dtype(), b.dtype()),
        )),
    }
}

fn bitwise_and(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    bitwise("&", a, b, |x, y| x & y, |x, y| x && y)
}

fn bitwise_or(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    bitwise("|", a, b, |x, y| x | y, |x, y| x || y)
}

fn bitwise_xor(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    bitwise("^", a, b, |x, y| x ^ y, |x, y| x ^ y)
}

fn is_equal(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(a.equals(b)?))
}

fn is_not_equal(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(!a.equals(b)?))
}

fn less_than(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(a.compare(b)? == Ordering::Less))
}

fn less_than_or_equal(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(a.compare(b)? != Ordering::Greater))
}

fn greater_than(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(a.compare(b)? == Ordering::Greater))
}

fn greater_than_or_equal(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(a.compare(b)? != Ordering::Less))
}

/// Compile a pattern argument given either as a regex or as a string.
pub(crate) fn to_regex(name: &str, pattern: &JNode) -> Result<Regex, EvaluatorError> {
    match &pattern.value {
        JValue::Regex(re) => Ok(re.clone()),
        JValue::Str(s) => Regex::new(s).map_err(|e| {
            EvaluatorError::ValueError(format!("invalid pattern {:?} in {}: {}", s, name, e))
        }),
        _ => Err(EvaluatorError::type_error(
            name,
            format!("expected a string or regex pattern, got {}", pattern.dtype()),
        )),
    }
}

fn has_pattern(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    let s = a.as_str().ok_or_else(|| {
        EvaluatorError::type_error("=~", format!("left operand must be a string, got {}", a.dtype()))
    })?;
    Ok(JNode::from(to_regex("=~", b)?.is_match(s)))
}

fn is_in(a: &JNode, b: &JNode) -> Result<JNode, EvaluatorError> {
    match &b.value {
        JValue::Array(items) => Ok(JNode::from(items.iter().any(|x| x.loose_equals(a)))),
        JValue::Object(map) => match a.as_str() {
            Some(key) => Ok(JNode::from(map.contains_key(key))),
            None => Err(EvaluatorError::type_error(
                "in",
                format!("object keys are strings, got {}", a.dtype()),
            )),
        },
        _ => Err(EvaluatorError::type_error(
            "in",
            format!("right operand must be an array or object, got {}", b.dtype()),
        )),
    }
}

// ── In-place updates ─────────────────────────────────────────────────────────

fn update_in_place(
    name: &str,
    target: &mut JNode,
    other: &JNode,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<(), EvaluatorError> {
    let value = match (to_num(name, target)?, to_num(name, other)?) {
        (Num::Int(x), Num::Int(y)) => JValue::Int(int_op(x, y)),
        (x, y) => JValue::Float(float_op(as_f64(x), as_f64(y))),
    };
    target.value = value;
    Ok(())
}

/// `target += other`; becomes a float if either side is a float.
pub fn plus_equals(target: &mut JNode, other: &JNode) -> Result<(), EvaluatorError> {
    update_in_place("+=", target, other, i64::wrapping_add, |x, y| x + y)
}

/// `target -= other`
pub fn minus_equals(target: &mut JNode, other: &JNode) -> Result<(), EvaluatorError> {
    update_in_place("-=", target, other, i64::wrapping_sub, |x, y| x - y)
}

/// `target *= other`
pub fn times_equals(target: &mut JNode, other: &JNode) -> Result<(), EvaluatorError> {
    update_in_place("*=", target, other, i64::wrapping_mul, |x, y| x * y)
}

/// `target **= other`; always leaves a float.
pub fn pow_equals(target: &mut JNode, other: &JNode) -> Result<(), EvaluatorError> {
    let x = to_float("**=", target)?;
    let y = to_float("**=", other)?;
    target.value = JValue::Float(x.powf(y));
    Ok(())
}
