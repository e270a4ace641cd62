// Utility functions and helpers
// Python-style slice arithmetic and array flattening shared by the evaluator and functions

use crate::value::{JNode, JValue, Slicer};

/// Positions selected by `slicer` from a sequence of length `len`.
///
/// Negative bounds count from the end and out-of-range bounds are clamped.
/// A step of zero selects nothing.
pub fn slice_indices(len: usize, slicer: &Slicer) -> Vec<usize> {
    let len = len as i64;
    let step = slicer.step.unwrap_or(1);
    if step == 0 || len == 0 {
        return Vec::new();
    }

    let clamp = |bound: i64, lo: i64, hi: i64| {
        let b = if bound < 0 { bound + len } else { bound };
        b.clamp(lo, hi)
    };

    let mut indices = Vec::new();
    if step > 0 {
        let start = slicer.start.map_or(0, |s| clamp(s, 0, len));
        let stop = slicer.stop.map_or(len, |s| clamp(s, 0, len));
        let mut i = start;
        while i < stop {
            indices.push(i as usize);
            i += step;
        }
    } else {
        let start = slicer.start.map_or(len - 1, |s| clamp(s, -1, len - 1));
        let stop = slicer.stop.map_or(-1, |s| clamp(s, -1, len - 1));
        let mut i = start;
        while i > stop {
            indices.push(i as usize);
            i += step;
        }
    }
    indices
}

/// Resolve a possibly negative index against `len`.
#[inline]
pub fn wrap_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved >= 0 && (resolved as usize) < len {
        Some(resolved as usize)
    } else {
        None
    }
}

pub fn slice_vec<T: Clone>(items: &[T], slicer: &Slicer) -> Vec<T> {
    slice_indices(items.len(), slicer)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}

/// Slice a string by characters.
pub fn slice_str(s: &str, slicer: &Slicer) -> String {
    let chars: Vec<char> = s.chars().collect();
    slice_vec(&chars, slicer).into_iter().collect()
}

/// Character at a possibly negative position.
pub fn char_at(s: &str, index: i64) -> Option<char> {
    let count = s.chars().count();
    wrap_index(index, count).and_then(|i| s.chars().nth(i))
}

/// Splice the children of nested arrays into their parent, one level deep.
pub fn flatten_once(items: &[JNode]) -> Vec<JNode> {
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        match &item.value {
            JValue::Array(inner) => result.extend(inner.iter().cloned()),
            _ => result.push(item.clone()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jnode;

    fn s(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Slicer {
        Slicer::new(start, stop, step)
    }

    #[test]
    fn test_slice_indices_forward() {
        assert_eq!(slice_indices(5, &s(Some(1), Some(3), None)), vec![1, 2]);
        assert_eq!(slice_indices(5, &s(None, None, Some(2))), vec![0, 2, 4]);
        assert_eq!(slice_indices(5, &s(Some(-2), None, None)), vec![3, 4]);
        assert_eq!(slice_indices(5, &s(Some(2), Some(100), None)), vec![2, 3, 4]);
        assert_eq!(slice_indices(5, &s(Some(4), Some(1), None)), Vec::<usize>::new());
    }

    #[test]
    fn test_slice_indices_backward() {
        assert_eq!(slice_indices(4, &s(None, None, Some(-1))), vec![3, 2, 1, 0]);
        assert_eq!(slice_indices(5, &s(Some(3), Some(0), Some(-2))), vec![3, 1]);
        assert_eq!(slice_indices(5, &s(Some(-1), Some(-3), Some(-1))), vec![4, 3]);
    }

    #[test]
    fn test_slice_indices_degenerate() {
        assert!(slice_indices(0, &Slicer::default()).is_empty());
        assert!(slice_indices(3, &s(None, None, Some(0))).is_empty());
    }

    #[test]
    fn test_wrap_index() {
        assert_eq!(wrap_index(-1, 3), Some(2));
        assert_eq!(wrap_index(3, 3), None);
        assert_eq!(wrap_index(-4, 3), None);
    }

    #[test]
    fn test_string_slicing() {
        assert_eq!(slice_str("héllo", &s(Some(1), Some(3), None)), "él");
        assert_eq!(slice_str("abc", &s(None, None, Some(-1))), "cba");
        assert_eq!(char_at("abc", -1), Some('c'));
        assert_eq!(char_at("abc", 5), None);
    }

    #[test]
    fn test_flatten_once() {
        let arr = jnode!([1, [2, [3]], 4]);
        let flat = flatten_once(arr.as_array().unwrap());
        assert_eq!(JNode::array(flat), jnode!([1, 2, [3], 4]));
    }
}
