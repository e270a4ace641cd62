// Built-in function implementations
// Aggregate functions consume whole containers; vectorized ones map over their first argument

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::binops::{plus_equals, to_regex};
use crate::evaluator::EvaluatorError;
use crate::signature::Signature;
use crate::utils::{char_at, flatten_once, slice_str};
use crate::value::{Dtype, JNode, JValue};

type FuncImpl = fn(&[JNode]) -> Result<JNode, EvaluatorError>;

/// A named function descriptor. All instances are statics.
pub struct ArgFunction {
    pub name: &'static str,
    pub signature: Signature,
    /// Broadcast one level over an array or object first argument.
    pub is_vectorized: bool,
    func: FuncImpl,
}

impl fmt::Debug for ArgFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArgFunction({}, {})", self.name, self.signature.result_type)
    }
}

impl ArgFunction {
    /// Check argument types, pad omitted optional arguments with `null` and
    /// run the function.
    pub fn call(&self, mut args: Vec<JNode>) -> Result<JNode, EvaluatorError> {
        for (position, arg) in args.iter().enumerate() {
            self.signature
                .check_runtime(self.name, position, arg.dtype())?;
        }
        if args.len() < self.signature.max_args {
            args.resize(self.signature.max_args, JNode::null());
        }
        if self.is_vectorized {
            self.call_vectorized(&args)
        } else {
            (self.func)(&args)
        }
    }

    /// Static type of a call given the static types of its arguments.
    pub fn result_type(&self, arg_types: &[Dtype]) -> Dtype {
        let first = arg_types.first().copied().unwrap_or(Dtype::NULL);
        if self.is_vectorized && first.intersects(Dtype::ITERABLE) {
            Dtype::UNKNOWN
        } else {
            self.signature.result_type
        }
    }

    /// Does `arg` (at `position`) travel alongside the elements of `first`?
    fn zips_with(&self, position: usize, first: &JNode, arg: &JNode) -> bool {
        if !self.signature.accepts(position).intersects(Dtype::ARR_OR_OBJ) {
            return false;
        }
        match (&first.value, &arg.value) {
            (JValue::Array(a), JValue::Array(b)) => a.len() == b.len(),
            (JValue::Object(a), JValue::Object(b)) => {
                a.len() == b.len() && a.keys().all(|k| b.contains_key(k))
            }
            _ => false,
        }
    }

    fn call_vectorized(&self, args: &[JNode]) -> Result<JNode, EvaluatorError> {
        let first = &args[0];
        let zipped: Vec<bool> = args
            .iter()
            .enumerate()
            .map(|(i, arg)| i > 0 && self.zips_with(i, first, arg))
            .collect();

        match &first.value {
            JValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (ix, item) in items.iter().enumerate() {
                    let call_args: Vec<JNode> = args
                        .iter()
                        .enumerate()
                        .map(|(i, arg)| match (i, zipped[i], &arg.value) {
                            (0, _, _) => item.clone(),
                            (_, true, JValue::Array(other)) => other[ix].clone(),
                            _ => arg.clone(),
                        })
                        .collect();
                    out.push(self.call_scalar(&call_args)?);
                }
                Ok(JNode::array(out))
            }
            JValue::Object(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (key, item) in map.iter() {
                    let call_args: Vec<JNode> = args
                        .iter()
                        .enumerate()
                        .map(|(i, arg)| match (i, zipped[i], &arg.value) {
                            (0, _, _) => item.clone(),
                            (_, true, JValue::Object(other)) => {
                                other.get(key).cloned().unwrap_or_default()
                            }
                            _ => arg.clone(),
                        })
                        .collect();
                    out.insert(key.clone(), self.call_scalar(&call_args)?);
                }
                Ok(JNode::object(out))
            }
            _ => self.call_scalar(args),
        }
    }

    fn call_scalar(&self, args: &[JNode]) -> Result<JNode, EvaluatorError> {
        let accepted = self.signature.accepts(0);
        let expected = accepted.without(Dtype::ITERABLE);
        if !accepted.contains(Dtype::ANYTHING) && !args[0].dtype().intersects(expected) {
            return Err(EvaluatorError::type_error(
                self.name,
                format!("expected {} elements, got {}", expected, args[0].dtype()),
            ));
        }
        (self.func)(args)
    }
}

// ── Argument helpers ─────────────────────────────────────────────────────────

fn type_error(name: &str, expected: &str, found: &JNode) -> EvaluatorError {
    EvaluatorError::type_error(name, format!("expected {}, got {}", expected, found.dtype()))
}

fn array_arg<'a>(name: &str, node: &'a JNode) -> Result<&'a Vec<JNode>, EvaluatorError> {
    node.as_array().ok_or_else(|| type_error(name, "an array", node))
}

fn object_arg<'a>(name: &str, node: &'a JNode) -> Result<&'a IndexMap<String, JNode>, EvaluatorError> {
    node.as_object().ok_or_else(|| type_error(name, "an object", node))
}

fn str_arg<'a>(name: &str, node: &'a JNode) -> Result<&'a str, EvaluatorError> {
    node.as_str().ok_or_else(|| type_error(name, "a string", node))
}

fn float_arg(name: &str, node: &JNode) -> Result<f64, EvaluatorError> {
    node.as_f64().ok_or_else(|| type_error(name, "a number", node))
}

fn int_arg(name: &str, node: &JNode) -> Result<i64, EvaluatorError> {
    node.as_i64().ok_or_else(|| type_error(name, "an int", node))
}

/// Optional boolean flag; `null` means false.
fn flag_arg(name: &str, node: &JNode) -> Result<bool, EvaluatorError> {
    match node.value {
        JValue::Null => Ok(false),
        JValue::Bool(b) => Ok(b),
        _ => Err(type_error(name, "a bool", node)),
    }
}

/// `elt[key]` for a string key on an object or an int key on an array.
fn member<'a>(name: &str, elt: &'a JNode, key: &JNode) -> Result<&'a JNode, EvaluatorError> {
    match (&elt.value, &key.value) {
        (JValue::Object(map), JValue::Str(k)) => map
            .get(k.as_ref())
            .ok_or_else(|| EvaluatorError::NotFound(format!("key {:?} in {}", k, name))),
        (JValue::Array(items), JValue::Int(i)) => crate::utils::wrap_index(*i, items.len())
            .map(|ix| &items[ix])
            .ok_or_else(|| EvaluatorError::NotFound(format!("index {} in {}", i, name))),
        _ => Err(EvaluatorError::type_error(
            name,
            format!("cannot look up {} key in {}", key.dtype(), elt.dtype()),
        )),
    }
}

/// Sort with a fallible comparator, surfacing the first comparison error.
fn try_sort<F>(items: &mut [JNode], mut cmp: F) -> Result<(), EvaluatorError>
where
    F: FnMut(&JNode, &JNode) -> Result<Ordering, EvaluatorError>,
{
    let mut error = None;
    items.sort_by(|a, b| match cmp(a, b) {
        Ok(ord) => ord,
        Err(e) => {
            error.get_or_insert(e);
            Ordering::Equal
        }
    });
    match error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn sorted_floats(name: &str, items: &[JNode]) -> Result<Vec<f64>, EvaluatorError> {
    let mut nums = items
        .iter()
        .map(|x| float_arg(name, x))
        .collect::<Result<Vec<_>, _>>()?;
    nums.sort_by(|a, b| crate::value::cmp_floats(*a, *b));
    Ok(nums)
}

// ── Aggregate functions ──────────────────────────────────────────────────────

fn len(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    match &args[0].value {
        JValue::Array(items) => Ok(JNode::from(items.len())),
        JValue::Object(map) => Ok(JNode::from(map.len())),
        _ => Err(type_error("len", "an array or object", &args[0])),
    }
}

fn sum(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let mut total = JNode::from(0.0);
    for item in array_arg("sum", &args[0])?.iter() {
        plus_equals(&mut total, item)?;
    }
    Ok(total)
}

fn mean(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let items = array_arg("mean", &args[0])?;
    let total = sum(args)?;
    Ok(JNode::from(float_arg("mean", &total)? / items.len() as f64))
}

fn extreme(name: &str, args: &[JNode], want: Ordering, empty: f64) -> Result<JNode, EvaluatorError> {
    let mut best: Option<(&JNode, f64)> = None;
    for item in array_arg(name, &args[0])?.iter() {
        let x = float_arg(name, item)?;
        let better = match best {
            None => true,
            Some((_, b)) => x.partial_cmp(&b) == Some(want),
        };
        if better {
            best = Some((item, x));
        }
    }
    Ok(best.map_or_else(|| JNode::from(empty), |(node, _)| node.clone()))
}

fn max(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    extreme("max", args, Ordering::Greater, f64::NEG_INFINITY)
}

fn min(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    extreme("min", args, Ordering::Less, f64::INFINITY)
}

fn extreme_by(name: &str, args: &[JNode], want: Ordering) -> Result<JNode, EvaluatorError> {
    let items = array_arg(name, &args[0])?;
    let mut iter = items.iter();
    let mut best = iter
        .next()
        .ok_or_else(|| EvaluatorError::ValueError(format!("{} of an empty array", name)))?;
    let mut best_key = member(name, best, &args[1])?;
    for item in iter {
        let key = member(name, item, &args[1])?;
        if key.compare(best_key)? == want {
            best = item;
            best_key = key;
        }
    }
    Ok(best.clone())
}

fn max_by(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    extreme_by("max_by", args, Ordering::Greater)
}

fn min_by(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    extreme_by("min_by", args, Ordering::Less)
}

fn sort_by(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let mut items = array_arg("sort_by", &args[0])?.clone();
    let key = &args[1];
    for item in items.iter() {
        member("sort_by", item, key)?;
    }
    try_sort(&mut items, |a, b| {
        let ka = member("sort_by", a, key)?;
        let kb = member("sort_by", b, key)?;
        Ok(ka.compare(kb)?)
    })?;
    if flag_arg("sort_by", &args[2])? {
        items.reverse();
    }
    Ok(JNode::array(items))
}

fn sorted(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let mut items = array_arg("sorted", &args[0])?.clone();
    try_sort(&mut items, |a, b| Ok(a.compare(b)?))?;
    if flag_arg("sorted", &args[1])? {
        items.reverse();
    }
    Ok(JNode::array(items))
}

/// Hashable identity of a value: its type plus its canonical text.
fn structural_key(node: &JNode) -> (u16, String) {
    (node.dtype().bits(), node.to_compact_string(true))
}

fn unique(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let mut seen = HashSet::new();
    let mut items: Vec<JNode> = array_arg("unique", &args[0])?
        .iter()
        .filter(|x| seen.insert(structural_key(x)))
        .cloned()
        .collect();
    if flag_arg("unique", &args[1])? {
        try_sort(&mut items, |a, b| Ok(a.compare(b)?))?;
    }
    Ok(JNode::array(items))
}

fn value_counts(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let mut counts: IndexMap<(u16, String), (JNode, i64)> = IndexMap::new();
    for item in array_arg("value_counts", &args[0])?.iter() {
        if item.is_null() || item.is_container() {
            return Err(EvaluatorError::ValueError(format!(
                "value_counts cannot count {} values",
                item.dtype()
            )));
        }
        counts
            .entry(structural_key(item))
            .or_insert_with(|| (item.clone(), 0))
            .1 += 1;
    }
    let pairs = counts
        .into_values()
        .map(|(value, count)| JNode::array(vec![value, JNode::from(count)]))
        .collect();
    Ok(JNode::array(pairs))
}

fn group_by(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let mut groups: IndexMap<String, Vec<JNode>> = IndexMap::new();
    for item in array_arg("group_by", &args[0])?.iter() {
        let value = member("group_by", item, &args[1])?;
        let label = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_compact_string(true),
        };
        groups.entry(label).or_default().push(item.clone());
    }
    Ok(JNode::object(
        groups
            .into_iter()
            .map(|(k, v)| (k, JNode::array(v)))
            .collect(),
    ))
}

fn flatten(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let mut items = array_arg("flatten", &args[0])?.clone();
    let depth = match args[1].value {
        JValue::Null => 1,
        _ => int_arg("flatten", &args[1])?,
    };
    for _ in 0..depth {
        items = flatten_once(&items);
    }
    Ok(JNode::array(items))
}

fn index(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let items = array_arg("index", &args[0])?;
    let target = &args[1];
    let found = if flag_arg("index", &args[2])? {
        items.iter().rposition(|x| x.loose_equals(target))
    } else {
        items.iter().position(|x| x.loose_equals(target))
    };
    found
        .map(JNode::from)
        .ok_or_else(|| EvaluatorError::NotFound(format!("{} in the array", target)))
}

fn irange(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let first = int_arg("irange", &args[0])?;
    let (start, stop) = match args[1].value {
        JValue::Null => (0, first),
        _ => (first, int_arg("irange", &args[1])?),
    };
    let step = match args[2].value {
        JValue::Null => 1,
        _ => int_arg("irange", &args[2])?,
    };
    if step == 0 {
        return Err(EvaluatorError::ValueError("irange step cannot be 0".to_string()));
    }
    let mut nums = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        nums.push(JNode::from(i));
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(JNode::array(nums))
}

fn keys(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let map = object_arg("keys", &args[0])?;
    Ok(JNode::array(map.keys().map(|k| JNode::from(k.as_str())).collect()))
}

fn values(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let map = object_arg("values", &args[0])?;
    Ok(JNode::array(map.values().cloned().collect()))
}

/// Linear interpolation between the two closest ranks.
fn quantile(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let nums = sorted_floats("quantile", array_arg("quantile", &args[0])?)?;
    let q = float_arg("quantile", &args[1])?;
    if nums.is_empty() {
        return Err(EvaluatorError::ValueError(
            "cannot find quantiles of an empty array".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(EvaluatorError::ValueError(format!(
            "quantile must be between 0 and 1, got {}",
            q
        )));
    }
    let rank = q * (nums.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let frac = rank - lower as f64;
    let value = match nums.get(lower + 1) {
        Some(upper) if frac > 0.0 => nums[lower] * (1.0 - frac) + upper * frac,
        _ => nums[lower],
    };
    Ok(JNode::from(value))
}

fn s_join(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let sep = str_arg("s_join", &args[0])?;
    let parts = array_arg("s_join", &args[1])?
        .iter()
        .map(|x| str_arg("s_join", x))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(JNode::string(parts.join(sep)))
}

// ── Vectorized functions ─────────────────────────────────────────────────────

fn abs(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    match args[0].value {
        JValue::Int(n) => Ok(JNode::from(n.wrapping_abs())),
        JValue::Float(f) => Ok(JNode::from(f.abs())),
        _ => Err(type_error("abs", "a number", &args[0])),
    }
}

/// `round(x)` is the nearest int; `round(x, n)` keeps `n` decimal places as
/// a float. Ints come back unchanged.
///
/// Halves round away from zero (`round(2.5)` is 3, `round(-2.5)` is -3),
/// matching `f64::round`, not banker's rounding.
fn round(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    match args[0].value {
        JValue::Int(n) => Ok(JNode::from(n)),
        JValue::Float(f) => match args[1].value {
            JValue::Null => {
                let r = f.round();
                if !r.is_finite() || r < i64::MIN as f64 || r >= i64::MAX as f64 {
                    return Err(EvaluatorError::ValueError(format!(
                        "cannot round {} to an int",
                        f
                    )));
                }
                Ok(JNode::from(r as i64))
            }
            _ => {
                let places = int_arg("round", &args[1])?;
                let scale = 10f64.powi(places.clamp(-308, 308) as i32);
                Ok(JNode::from((f * scale).round() / scale))
            }
        },
        _ => Err(type_error("round", "a number", &args[0])),
    }
}

fn to_str(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    match &args[0].value {
        JValue::Str(_) => Ok(args[0].clone()),
        _ => Ok(JNode::string(args[0].to_compact_string(false))),
    }
}

fn to_int(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    match &args[0].value {
        JValue::Int(n) => Ok(JNode::from(*n)),
        JValue::Bool(b) => Ok(JNode::from(*b as i64)),
        JValue::Float(f) if f.is_finite() => Ok(JNode::from(f.trunc() as i64)),
        JValue::Str(s) => s.trim().parse::<i64>().map(JNode::from).map_err(|_| {
            EvaluatorError::ValueError(format!("cannot convert {:?} to an int", s))
        }),
        _ => Err(type_error("int", "a number or numeric string", &args[0])),
    }
}

fn to_float(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    match &args[0].value {
        JValue::Str(s) => s.trim().parse::<f64>().map(JNode::from).map_err(|_| {
            EvaluatorError::ValueError(format!("cannot convert {:?} to a float", s))
        }),
        _ => float_arg("float", &args[0]).map(JNode::from),
    }
}

fn not(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    match args[0].value {
        JValue::Bool(b) => Ok(JNode::from(!b)),
        _ => Err(type_error("not", "a bool", &args[0])),
    }
}

fn is_str(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(args[0].dtype() == Dtype::STR))
}

fn is_num(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(args[0].dtype().intersects(Dtype::NUM)))
}

fn is_expr(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(args[0].is_container()))
}

fn isna(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(matches!(args[0].value, JValue::Float(f) if f.is_nan())))
}

fn log(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let x = float_arg("log", &args[0])?;
    match args[1].value {
        JValue::Null => Ok(JNode::from(x.ln())),
        _ => Ok(JNode::from(x.log(float_arg("log", &args[1])?))),
    }
}

fn log2(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(float_arg("log2", &args[0])?.log2()))
}

fn ifelse(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    match args[0].value {
        JValue::Bool(true) => Ok(args[1].clone()),
        JValue::Bool(false) => Ok(args[2].clone()),
        _ => Err(type_error("ifelse", "a bool condition", &args[0])),
    }
}

fn s_len(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(str_arg("s_len", &args[0])?.chars().count()))
}

fn s_count(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let s = str_arg("s_count", &args[0])?;
    Ok(JNode::from(to_regex("s_count", &args[1])?.find_iter(s).count()))
}

fn s_find(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let s = str_arg("s_find", &args[0])?;
    let re = to_regex("s_find", &args[1])?;
    Ok(JNode::array(
        re.find_iter(s).map(|m| JNode::from(m.as_str())).collect(),
    ))
}

fn s_split(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let s = str_arg("s_split", &args[0])?;
    let re = to_regex("s_split", &args[1])?;
    Ok(JNode::array(re.split(s).map(JNode::from).collect()))
}

fn s_lower(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    Ok(JNode::string(str_arg("s_lower", &args[0])?.to_lowercase()))
}

fn s_upper(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    Ok(JNode::string(str_arg("s_upper", &args[0])?.to_uppercase()))
}

fn s_strip(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    Ok(JNode::from(str_arg("s_strip", &args[0])?.trim()))
}

fn s_slice(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let s = str_arg("s_slice", &args[0])?;
    match &args[1].value {
        JValue::Slice(slicer) => Ok(JNode::string(slice_str(s, slicer))),
        JValue::Int(i) => char_at(s, *i)
            .map(|c| JNode::string(c.to_string()))
            .ok_or_else(|| {
                EvaluatorError::NotFound(format!("index {} in a string of length {}", i, s.chars().count()))
            }),
        _ => Err(type_error("s_slice", "an int or slice", &args[1])),
    }
}

fn s_sub(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let s = str_arg("s_sub", &args[0])?;
    let re = to_regex("s_sub", &args[1])?;
    let replacement = str_arg("s_sub", &args[2])?;
    Ok(JNode::string(re.replace_all(s, replacement).into_owned()))
}

fn s_mul(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    let s = str_arg("s_mul", &args[0])?;
    let n = int_arg("s_mul", &args[1])?;
    Ok(JNode::string(s.repeat(n.max(0) as usize)))
}

fn uminus(args: &[JNode]) -> Result<JNode, EvaluatorError> {
    match args[0].value {
        JValue::Int(n) => Ok(JNode::from(n.wrapping_neg())),
        JValue::Float(f) => Ok(JNode::from(-f)),
        _ => Err(type_error("-", "a number", &args[0])),
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────────

const ARR: Dtype = Dtype::ARR.or(Dtype::UNKNOWN);
const OBJ: Dtype = Dtype::OBJ.or(Dtype::UNKNOWN);
const ITERABLE: Dtype = Dtype::ITERABLE;
const KEY: Dtype = Dtype::STR.or(Dtype::INT);
const NUM_V: Dtype = Dtype::FLOAT_OR_INT.or(Dtype::ITERABLE);
const STR_V: Dtype = Dtype::STR.or(Dtype::ITERABLE);
const ANY_V: Dtype = Dtype::ANYTHING;
const BOOL_V: Dtype = Dtype::BOOL.or(Dtype::ITERABLE);
const FLAG: Dtype = Dtype::BOOL.or(Dtype::NULL);
const PATTERN: Dtype = Dtype::STR_OR_REGEX;

const fn aggregate(
    name: &'static str,
    result: Dtype,
    min_args: usize,
    max_args: usize,
    input_types: &'static [Dtype],
    func: FuncImpl,
) -> ArgFunction {
    ArgFunction {
        name,
        signature: Signature::new(result, min_args, max_args, input_types),
        is_vectorized: false,
        func,
    }
}

const fn vectorized(
    name: &'static str,
    result: Dtype,
    min_args: usize,
    max_args: usize,
    input_types: &'static [Dtype],
    func: FuncImpl,
) -> ArgFunction {
    ArgFunction {
        name,
        signature: Signature::new(result, min_args, max_args, input_types),
        is_vectorized: true,
        func,
    }
}

pub static FUNCTIONS: &[ArgFunction] = &[
    // aggregates
    aggregate("len", Dtype::INT, 1, 1, &[ITERABLE], len),
    aggregate("sum", Dtype::FLOAT, 1, 1, &[ARR], sum),
    aggregate("mean", Dtype::FLOAT, 1, 1, &[ARR], mean),
    aggregate("avg", Dtype::FLOAT, 1, 1, &[ARR], mean),
    aggregate("max", Dtype::NUM, 1, 1, &[ARR], max),
    aggregate("min", Dtype::NUM, 1, 1, &[ARR], min),
    aggregate("max_by", Dtype::ARR_OR_OBJ, 2, 2, &[ARR, KEY], max_by),
    aggregate("min_by", Dtype::ARR_OR_OBJ, 2, 2, &[ARR, KEY], min_by),
    aggregate("sort_by", Dtype::ARR, 2, 3, &[ARR, KEY, FLAG], sort_by),
    aggregate("sorted", Dtype::ARR, 1, 2, &[ARR, FLAG], sorted),
    aggregate("unique", Dtype::ARR, 1, 2, &[ARR, FLAG], unique),
    aggregate("value_counts", Dtype::ARR, 1, 1, &[ARR], value_counts),
    aggregate("group_by", Dtype::OBJ, 2, 2, &[ARR, KEY], group_by),
    aggregate("flatten", Dtype::ARR, 1, 2, &[ARR, Dtype::INT], flatten),
    aggregate("index", Dtype::INT, 2, 3, &[ARR, Dtype::SCALAR, FLAG], index),
    aggregate("irange", Dtype::ARR, 1, 3, &[Dtype::INT, Dtype::INT, Dtype::INT], irange),
    aggregate("keys", Dtype::ARR, 1, 1, &[OBJ], keys),
    aggregate("values", Dtype::ARR, 1, 1, &[OBJ], values),
    aggregate("quantile", Dtype::FLOAT, 2, 2, &[ARR, Dtype::FLOAT_OR_INT], quantile),
    aggregate("s_join", Dtype::STR, 2, 2, &[Dtype::STR, ARR], s_join),
    // vectorized
    vectorized("abs", Dtype::FLOAT_OR_INT, 1, 1, &[NUM_V], abs),
    vectorized("round", Dtype::FLOAT_OR_INT, 1, 2, &[NUM_V, Dtype::INT], round),
    vectorized("str", Dtype::STR, 1, 1, &[ANY_V], to_str),
    vectorized("int", Dtype::INT, 1, 1, &[ANY_V], to_int),
    vectorized("float", Dtype::FLOAT, 1, 1, &[ANY_V], to_float),
    vectorized("not", Dtype::BOOL, 1, 1, &[BOOL_V], not),
    vectorized("is_str", Dtype::BOOL, 1, 1, &[ANY_V], is_str),
    vectorized("is_num", Dtype::BOOL, 1, 1, &[ANY_V], is_num),
    vectorized("is_expr", Dtype::BOOL, 1, 1, &[ANY_V], is_expr),
    vectorized("isna", Dtype::BOOL, 1, 1, &[ANY_V], isna),
    vectorized("log", Dtype::FLOAT, 1, 2, &[NUM_V, Dtype::FLOAT_OR_INT], log),
    vectorized("log2", Dtype::FLOAT, 1, 1, &[NUM_V], log2),
    vectorized("ifelse", Dtype::UNKNOWN, 3, 3, &[ANY_V, ANY_V, ANY_V], ifelse),
    vectorized("s_len", Dtype::INT, 1, 1, &[STR_V], s_len),
    vectorized("s_count", Dtype::INT, 2, 2, &[STR_V, PATTERN], s_count),
    vectorized("s_find", Dtype::ARR, 2, 2, &[STR_V, PATTERN], s_find),
    vectorized("s_split", Dtype::ARR, 2, 2, &[STR_V, PATTERN], s_split),
    vectorized("s_lower", Dtype::STR, 1, 1, &[STR_V], s_lower),
    vectorized("s_upper", Dtype::STR, 1, 1, &[STR_V], s_upper),
    vectorized("s_strip", Dtype::STR, 1, 1, &[STR_V], s_strip),
    vectorized("s_slice", Dtype::STR, 2, 2, &[STR_V, Dtype::INT_OR_SLICE], s_slice),
    vectorized("s_sub", Dtype::STR, 3, 3, &[STR_V, PATTERN, Dtype::STR], s_sub),
    vectorized("s_mul", Dtype::STR, 2, 2, &[STR_V, Dtype::INT], s_mul),
];

/// Unary minus; not callable by name.
pub static UMINUS: ArgFunction = vectorized("-", Dtype::FLOAT_OR_INT, 1, 1, &[NUM_V], uminus);

static FUNCTION_INDEX: Lazy<HashMap<&'static str, &'static ArgFunction>> =
    Lazy::new(|| FUNCTIONS.iter().map(|f| (f.name, f)).collect());

/// Find a function by the name used in queries.
pub fn lookup(name: &str) -> Option<&'static ArgFunction> {
    FUNCTION_INDEX.get(name).copied()
}
