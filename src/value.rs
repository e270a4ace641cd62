// JNode: line-numbered, Rc-wrapped JSON value
// Shared by the JSON parser, the printer and the RemesPath evaluator

use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use thiserror::Error;

use crate::datetime::{format_date, format_datetime};

// ── Type tags ────────────────────────────────────────────────────────────────

/// Bitmask classifying a value's variant.
///
/// Functions and operators declare the types they accept as masks; an
/// argument is accepted iff its tag intersects the mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dtype(u16);

impl Dtype {
    pub const BOOL: Dtype = Dtype(1);
    pub const INT: Dtype = Dtype(2);
    pub const FLOAT: Dtype = Dtype(4);
    pub const STR: Dtype = Dtype(8);
    pub const NULL: Dtype = Dtype(16);
    pub const OBJ: Dtype = Dtype(32);
    pub const ARR: Dtype = Dtype(64);
    /// Not yet known: the value of a deferred expression.
    pub const UNKNOWN: Dtype = Dtype(128);
    pub const REGEX: Dtype = Dtype(256);
    pub const SLICE: Dtype = Dtype(512);
    pub const DATE: Dtype = Dtype(1024);
    pub const DATETIME: Dtype = Dtype(2048);

    pub const FLOAT_OR_INT: Dtype = Dtype::FLOAT.or(Dtype::INT);
    pub const NUM: Dtype = Dtype::FLOAT_OR_INT.or(Dtype::BOOL);
    pub const ITERABLE: Dtype = Dtype::UNKNOWN.or(Dtype::ARR).or(Dtype::OBJ);
    pub const STR_OR_REGEX: Dtype = Dtype::STR.or(Dtype::REGEX);
    pub const INT_OR_SLICE: Dtype = Dtype::INT.or(Dtype::SLICE);
    pub const ARR_OR_OBJ: Dtype = Dtype::ARR.or(Dtype::OBJ);
    pub const DATE_OR_DATETIME: Dtype = Dtype::DATE.or(Dtype::DATETIME);
    pub const SCALAR: Dtype = Dtype::NUM
        .or(Dtype::STR)
        .or(Dtype::NULL)
        .or(Dtype::REGEX)
        .or(Dtype::DATE_OR_DATETIME);
    pub const ANYTHING: Dtype = Dtype::SCALAR.or(Dtype::ITERABLE).or(Dtype::SLICE);

    const NAMES: [(Dtype, &'static str); 12] = [
        (Dtype::BOOL, "bool"),
        (Dtype::INT, "int"),
        (Dtype::FLOAT, "float"),
        (Dtype::STR, "str"),
        (Dtype::NULL, "null"),
        (Dtype::OBJ, "obj"),
        (Dtype::ARR, "arr"),
        (Dtype::UNKNOWN, "unknown"),
        (Dtype::REGEX, "regex"),
        (Dtype::SLICE, "slice"),
        (Dtype::DATE, "date"),
        (Dtype::DATETIME, "datetime"),
    ];

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn or(self, other: Dtype) -> Dtype {
        Dtype(self.0 | other.0)
    }

    #[inline]
    pub const fn intersects(self, other: Dtype) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn contains(self, other: Dtype) -> bool {
        self.0 & other.0 == other.0
    }

    /// The bits of `self` that are not in `other`.
    #[inline]
    pub const fn without(self, other: Dtype) -> Dtype {
        Dtype(self.0 & !other.0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Dtype {
    type Output = Dtype;

    fn bitor(self, rhs: Dtype) -> Dtype {
        self.or(rhs)
    }
}

impl BitAnd for Dtype {
    type Output = Dtype;

    fn bitand(self, rhs: Dtype) -> Dtype {
        Dtype(self.0 & rhs.0)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "nothing");
        }
        let mut first = true;
        for (tag, name) in Dtype::NAMES {
            if self.contains(tag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dtype({})", self)
    }
}

// ── Slices ───────────────────────────────────────────────────────────────────

/// A `start:stop:step` slice with Python semantics; any bound may be omitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slicer {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slicer {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Slicer { start, stop, step }
    }
}

impl fmt::Display for Slicer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{}", start)?;
        }
        write!(f, ":")?;
        if let Some(stop) = self.stop {
            write!(f, "{}", stop)?;
        }
        if let Some(step) = self.step {
            write!(f, ":{}", step)?;
        }
        Ok(())
    }
}

// ── Values ───────────────────────────────────────────────────────────────────

/// Payload of a [`JNode`].
///
/// Containers are wrapped in `Rc` so cloning a subtree is O(1); mutation goes
/// through `Rc::make_mut`. `Regex` and `Slice` are produced only by queries.
#[derive(Clone, Debug)]
pub enum JValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Regex(Regex),
    Slice(Slicer),
    Array(Rc<Vec<JNode>>),
    Object(Rc<IndexMap<String, JNode>>),
}

/// A JSON value together with the (0-based) line it starts on.
#[derive(Clone, Debug)]
pub struct JNode {
    pub value: JValue,
    pub line_num: usize,
}

/// Failed comparison between two values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Cannot compare {left} to {right}")]
    Incomparable { left: Dtype, right: Dtype },

    #[error("Cannot test {left} for equality with {right}")]
    MismatchedContainers { left: Dtype, right: Dtype },
}

// ── Type checks ──────────────────────────────────────────────────────────────

impl JNode {
    pub fn dtype(&self) -> Dtype {
        match &self.value {
            JValue::Null => Dtype::NULL,
            JValue::Bool(_) => Dtype::BOOL,
            JValue::Int(_) => Dtype::INT,
            JValue::Float(_) => Dtype::FLOAT,
            JValue::Str(_) => Dtype::STR,
            JValue::Date(_) => Dtype::DATE,
            JValue::DateTime(_) => Dtype::DATETIME,
            JValue::Regex(_) => Dtype::REGEX,
            JValue::Slice(_) => Dtype::SLICE,
            JValue::Array(_) => Dtype::ARR,
            JValue::Object(_) => Dtype::OBJ,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.value, JValue::Null)
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self.value, JValue::Array(_))
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self.value, JValue::Object(_))
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        self.is_array() || self.is_object()
    }

    /// True for arrays and objects with at least one child.
    pub fn is_nonempty_container(&self) -> bool {
        match &self.value {
            JValue::Array(arr) => !arr.is_empty(),
            JValue::Object(map) => !map.is_empty(),
            _ => false,
        }
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

impl JNode {
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            JValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            JValue::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Numeric view of ints, floats and bools.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            JValue::Int(n) => Some(n as f64),
            JValue::Float(f) => Some(f),
            JValue::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            JValue::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&Vec<JNode>> {
        match &self.value {
            JValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&IndexMap<String, JNode>> {
        match &self.value {
            JValue::Object(map) => Some(map),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<JNode>> {
        match &mut self.value {
            JValue::Array(arr) => Some(Rc::make_mut(arr)),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object_mut(&mut self) -> Option<&mut IndexMap<String, JNode>> {
        match &mut self.value {
            JValue::Object(map) => Some(Rc::make_mut(map)),
            _ => None,
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&JNode> {
        self.as_object().and_then(|m| m.get(key))
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&JNode> {
        self.as_array().and_then(|a| a.get(index))
    }
}

// ── Constructors ─────────────────────────────────────────────────────────────

impl JNode {
    #[inline]
    pub fn new(value: JValue, line_num: usize) -> Self {
        JNode { value, line_num }
    }

    #[inline]
    pub fn null() -> Self {
        JNode::new(JValue::Null, 0)
    }

    #[inline]
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        JNode::new(JValue::Str(s.into()), 0)
    }

    #[inline]
    pub fn array(v: Vec<JNode>) -> Self {
        JNode::new(JValue::Array(Rc::new(v)), 0)
    }

    #[inline]
    pub fn object(m: IndexMap<String, JNode>) -> Self {
        JNode::new(JValue::Object(Rc::new(m)), 0)
    }

    #[inline]
    pub fn regex(re: Regex) -> Self {
        JNode::new(JValue::Regex(re), 0)
    }

    #[inline]
    pub fn slice(slicer: Slicer) -> Self {
        JNode::new(JValue::Slice(slicer), 0)
    }

    #[inline]
    pub fn with_line(mut self, line_num: usize) -> Self {
        self.line_num = line_num;
        self
    }

    /// Sets the line number of this node and every descendant.
    pub fn set_line_numbers(&mut self, line_num: usize) {
        self.line_num = line_num;
        match &mut self.value {
            JValue::Array(arr) => {
                for child in Rc::make_mut(arr).iter_mut() {
                    child.set_line_numbers(line_num);
                }
            }
            JValue::Object(map) => {
                for child in Rc::make_mut(map).values_mut() {
                    child.set_line_numbers(line_num);
                }
            }
            _ => {}
        }
    }
}

impl Default for JNode {
    fn default() -> Self {
        JNode::null()
    }
}

// ── From impls ───────────────────────────────────────────────────────────────

impl From<JValue> for JNode {
    #[inline]
    fn from(value: JValue) -> Self {
        JNode::new(value, 0)
    }
}

impl From<bool> for JNode {
    #[inline]
    fn from(b: bool) -> Self {
        JValue::Bool(b).into()
    }
}

impl From<i64> for JNode {
    #[inline]
    fn from(n: i64) -> Self {
        JValue::Int(n).into()
    }
}

impl From<i32> for JNode {
    #[inline]
    fn from(n: i32) -> Self {
        JValue::Int(n as i64).into()
    }
}

impl From<usize> for JNode {
    #[inline]
    fn from(n: usize) -> Self {
        JValue::Int(n as i64).into()
    }
}

impl From<f64> for JNode {
    #[inline]
    fn from(n: f64) -> Self {
        JValue::Float(n).into()
    }
}

impl From<&str> for JNode {
    #[inline]
    fn from(s: &str) -> Self {
        JNode::string(s)
    }
}

impl From<String> for JNode {
    #[inline]
    fn from(s: String) -> Self {
        JNode::string(s)
    }
}

impl From<Vec<JNode>> for JNode {
    #[inline]
    fn from(v: Vec<JNode>) -> Self {
        JNode::array(v)
    }
}

impl From<IndexMap<String, JNode>> for JNode {
    #[inline]
    fn from(m: IndexMap<String, JNode>) -> Self {
        JNode::object(m)
    }
}

impl From<NaiveDate> for JNode {
    #[inline]
    fn from(d: NaiveDate) -> Self {
        JValue::Date(d).into()
    }
}

impl From<NaiveDateTime> for JNode {
    #[inline]
    fn from(dt: NaiveDateTime) -> Self {
        JValue::DateTime(dt).into()
    }
}

impl From<serde_json::Value> for JNode {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => JNode::null(),
            serde_json::Value::Bool(b) => b.into(),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => i.into(),
                None => n.as_f64().unwrap_or(f64::NAN).into(),
            },
            serde_json::Value::String(s) => s.into(),
            serde_json::Value::Array(arr) => {
                JNode::array(arr.into_iter().map(JNode::from).collect())
            }
            serde_json::Value::Object(map) => JNode::object(
                map.into_iter().map(|(k, v)| (k, JNode::from(v))).collect(),
            ),
        }
    }
}

/// Build a `JNode` with JSON-like syntax.
#[macro_export]
macro_rules! jnode {
    (null) => {
        $crate::value::JNode::null()
    };

    (true) => {
        $crate::value::JNode::from(true)
    };

    (false) => {
        $crate::value::JNode::from(false)
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::value::JNode::array(vec![ $( $crate::jnode!($elem) ),* ])
    };

    ({ $($key:tt : $val:tt),* $(,)? }) => {
        {
            #[allow(unused_mut)]
            let mut map = indexmap::IndexMap::new();
            $(
                map.insert(($key).to_string(), $crate::jnode!($val));
            )*
            $crate::value::JNode::object(map)
        }
    };

    ($other:expr) => {
        $crate::value::JNode::from($other)
    };
}

// ── Comparison ───────────────────────────────────────────────────────────────

/// Total order on floats where NaN equals NaN and sorts below every number.
pub(crate) fn cmp_floats(a: f64, b: f64) -> Ordering {
    match a.partial_cmp(&b) {
        Some(ord) => ord,
        None => match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            _ => Ordering::Greater,
        },
    }
}

impl JNode {
    /// Orders two scalars.
    ///
    /// Ints, floats and bools compare numerically with each other; every
    /// other variant only compares with itself. `null` equals `null` and is
    /// incomparable with anything else.
    pub fn compare(&self, other: &JNode) -> Result<Ordering, ValueError> {
        match (&self.value, &other.value) {
            (JValue::Int(a), JValue::Int(b)) => Ok(a.cmp(b)),
            (JValue::Bool(a), JValue::Bool(b)) => Ok(a.cmp(b)),
            (JValue::Str(a), JValue::Str(b)) => Ok(a.cmp(b)),
            (JValue::Null, JValue::Null) => Ok(Ordering::Equal),
            (JValue::Date(a), JValue::Date(b)) => Ok(a.cmp(b)),
            (JValue::DateTime(a), JValue::DateTime(b)) => Ok(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Ok(cmp_floats(a, b)),
                _ => Err(ValueError::Incomparable {
                    left: self.dtype(),
                    right: other.dtype(),
                }),
            },
        }
    }

    /// Structural equality.
    ///
    /// Arrays compare pairwise in order, objects by key set and values
    /// regardless of key order. Comparing a container with a value of a
    /// different shape is an error, as is any pair `compare` rejects.
    pub fn equals(&self, other: &JNode) -> Result<bool, ValueError> {
        match (&self.value, &other.value) {
            (JValue::Array(a), JValue::Array(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.equals(y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (JValue::Object(a), JValue::Object(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (k, v) in a.iter() {
                    match b.get(k) {
                        Some(w) if v.equals(w)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            (JValue::Array(_), _)
            | (_, JValue::Array(_))
            | (JValue::Object(_), _)
            | (_, JValue::Object(_)) => Err(ValueError::MismatchedContainers {
                left: self.dtype(),
                right: other.dtype(),
            }),
            (JValue::Regex(a), JValue::Regex(b)) => Ok(a.as_str() == b.as_str()),
            (JValue::Slice(a), JValue::Slice(b)) => Ok(a == b),
            _ => Ok(self.compare(other)? == Ordering::Equal),
        }
    }

    /// Like `equals`, but values of incompatible types are simply unequal.
    pub fn loose_equals(&self, other: &JNode) -> bool {
        self.equals(other).unwrap_or(false)
    }
}

// ── PartialEq ────────────────────────────────────────────────────────────────

impl PartialEq for JValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JValue::Null, JValue::Null) => true,
            (JValue::Bool(a), JValue::Bool(b)) => a == b,
            (JValue::Int(a), JValue::Int(b)) => a == b,
            (JValue::Float(a), JValue::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (JValue::Str(a), JValue::Str(b)) => a == b,
            (JValue::Date(a), JValue::Date(b)) => a == b,
            (JValue::DateTime(a), JValue::DateTime(b)) => a == b,
            (JValue::Regex(a), JValue::Regex(b)) => a.as_str() == b.as_str(),
            (JValue::Slice(a), JValue::Slice(b)) => a == b,
            (JValue::Array(a), JValue::Array(b)) => a == b,
            (JValue::Object(a), JValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// Variant-strict structural equality that ignores line numbers.
impl PartialEq for JNode {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

// ── Serialization (interop with serde-based consumers) ──────────────────────

impl Serialize for JNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.value {
            JValue::Null => serializer.serialize_none(),
            JValue::Bool(b) => serializer.serialize_bool(*b),
            JValue::Int(n) => serializer.serialize_i64(*n),
            JValue::Float(f) => serializer.serialize_f64(*f),
            JValue::Str(s) => serializer.serialize_str(s),
            JValue::Date(d) => serializer.serialize_str(&format_date(d)),
            JValue::DateTime(dt) => serializer.serialize_str(&format_datetime(dt)),
            JValue::Regex(re) => serializer.serialize_str(re.as_str()),
            JValue::Slice(s) => serializer.serialize_str(&s.to_string()),
            JValue::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for v in arr.iter() {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            JValue::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dtype_masks() {
        assert!(Dtype::NUM.contains(Dtype::BOOL));
        assert!(Dtype::ITERABLE.intersects(Dtype::ARR));
        assert!(!Dtype::SCALAR.intersects(Dtype::OBJ));
        assert_eq!(Dtype::INT | Dtype::FLOAT, Dtype::FLOAT_OR_INT);
        assert_eq!(Dtype::FLOAT_OR_INT.to_string(), "int|float");
        assert_eq!((Dtype::STR & Dtype::NUM).to_string(), "nothing");
    }

    #[test]
    fn test_dtype_of_values() {
        assert_eq!(jnode!(null).dtype(), Dtype::NULL);
        assert_eq!(jnode!(1).dtype(), Dtype::INT);
        assert_eq!(jnode!(1.5).dtype(), Dtype::FLOAT);
        assert_eq!(jnode!("a").dtype(), Dtype::STR);
        assert_eq!(jnode!([1, 2]).dtype(), Dtype::ARR);
        assert_eq!(jnode!({"a": 1}).dtype(), Dtype::OBJ);
        assert_eq!(JNode::slice(Slicer::default()).dtype(), Dtype::SLICE);
    }

    #[test]
    fn test_clone_is_cheap() {
        let big = JNode::array((0..1000).map(JNode::from).collect::<Vec<_>>());
        let copy = big.clone();
        match (&big.value, &copy.value) {
            (JValue::Array(a), JValue::Array(b)) => assert!(Rc::ptr_eq(a, b)),
            _ => panic!("expected arrays"),
        }
    }

    #[test]
    fn test_make_mut_copies_on_write() {
        let original = jnode!([1, 2, 3]);
        let mut copy = original.clone();
        copy.as_array_mut().unwrap().push(jnode!(4));
        assert_eq!(original.as_array().unwrap().len(), 3);
        assert_eq!(copy.as_array().unwrap().len(), 4);

        let original = jnode!({"a": 1});
        let mut copy = original.clone();
        copy.as_object_mut().unwrap().insert("b".to_string(), jnode!(2));
        assert_eq!(original, jnode!({"a": 1}));
        assert_eq!(copy, jnode!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_compare_numeric_promotion() {
        assert_eq!(jnode!(1).compare(&jnode!(1.5)).unwrap(), Ordering::Less);
        assert_eq!(jnode!(true).compare(&jnode!(1)).unwrap(), Ordering::Equal);
        assert_eq!(jnode!("b").compare(&jnode!("a")).unwrap(), Ordering::Greater);
        assert_eq!(jnode!(f64::NAN).compare(&jnode!(-1e300)).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_compare_incompatible_fails() {
        assert!(jnode!(null).compare(&jnode!(1)).is_err());
        assert!(jnode!("1").compare(&jnode!(1)).is_err());
        assert!(jnode!(null).compare(&jnode!(null)).is_ok());
    }

    #[test]
    fn test_equals_containers() {
        let a = jnode!({"a": 1, "b": [1, 2.0]});
        let b = jnode!({"b": [1.0, 2], "a": 1});
        assert!(a.equals(&b).unwrap());
        assert!(!jnode!([1, 2]).equals(&jnode!([2, 1])).unwrap());
        assert!(jnode!([1]).equals(&jnode!({"a": 1})).is_err());
        assert!(jnode!({"a": 1}).equals(&jnode!(1)).is_err());
        assert!(!jnode!([1]).loose_equals(&jnode!(1)));
    }

    #[test]
    fn test_partial_eq_is_variant_strict() {
        assert_ne!(jnode!(1), jnode!(1.0));
        assert_eq!(jnode!(f64::NAN), jnode!(f64::NAN));
        assert_eq!(jnode!(1).with_line(5), jnode!(1));
    }

    #[test]
    fn test_from_serde_json() {
        let node: JNode = json!({"i": 3, "f": 2.5, "s": "x", "n": null, "a": [true]}).into();
        assert_eq!(node.get("i"), Some(&jnode!(3)));
        assert_eq!(node.get("f"), Some(&jnode!(2.5)));
        assert_eq!(node.get("a").and_then(|a| a.get_index(0)), Some(&jnode!(true)));
    }

    #[test]
    fn test_serde_serialize() {
        let node = jnode!({"a": [1, 2.5, "x", null]});
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v, json!({"a": [1, 2.5, "x", null]}));
    }

    #[test]
    fn test_set_line_numbers() {
        let mut node = jnode!({"a": [1, {"b": 2}]});
        node.set_line_numbers(7);
        let inner = node.get("a").unwrap().get_index(1).unwrap().get("b").unwrap();
        assert_eq!(inner.line_num, 7);
    }

    #[test]
    fn test_slicer_display() {
        assert_eq!(Slicer::new(Some(1), None, None).to_string(), "1:");
        assert_eq!(Slicer::new(None, Some(-1), Some(2)).to_string(), ":-1:2");
        assert_eq!(Slicer::default().to_string(), ":");
    }
}
