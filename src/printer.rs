// JSON text output for JNode trees
// Compact and pretty forms, plus variants that renumber lines to match the text

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::datetime::{format_date, format_datetime};
use crate::value::{JNode, JValue};

impl JNode {
    /// Single-line JSON with `", "` between children and `": "` after keys.
    pub fn to_compact_string(&self, sort_keys: bool) -> String {
        let mut out = String::new();
        write_compact(self, sort_keys, &mut out);
        out
    }

    /// Multi-line JSON, indenting each nesting level by `indent` spaces.
    ///
    /// A container-valued object entry puts the container on the line after
    /// its key; scalar values (and empty containers) stay on the key's line.
    pub fn pretty_print(&self, indent: usize, sort_keys: bool) -> String {
        let mut out = String::new();
        write_pretty(self, indent, sort_keys, 0, &mut out);
        out
    }

    /// Same text as [`JNode::to_compact_string`]; every node is given the
    /// root's line number (`cur_line`, or the root's current one).
    pub fn to_compact_string_and_change_line_numbers(
        &mut self,
        sort_keys: bool,
        cur_line: Option<usize>,
    ) -> String {
        let line = cur_line.unwrap_or(self.line_num);
        self.set_line_numbers(line);
        self.to_compact_string(sort_keys)
    }

    /// Same text as [`JNode::pretty_print`]; every node's line number is
    /// rewritten to the line it starts on, counting from `cur_line` (or the
    /// root's current line number).
    pub fn pretty_print_and_change_line_numbers(
        &mut self,
        indent: usize,
        sort_keys: bool,
        cur_line: Option<usize>,
    ) -> String {
        let line = cur_line.unwrap_or(self.line_num);
        assign_pretty_lines(self, sort_keys, line);
        self.pretty_print(indent, sort_keys)
    }
}

impl fmt::Display for JNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_compact_string(false))
    }
}

/// Keys in output order: insertion order, or case-insensitive when sorting.
fn ordered_keys(map: &IndexMap<String, JNode>, sort_keys: bool) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    if sort_keys {
        keys.sort_by_cached_key(|k| k.to_lowercase());
    }
    keys
}

fn escape_json_string(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if c < '\x20' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if (c as u32) > 0xFF => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units).iter() {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
            c => out.push(c),
        }
    }
}

fn push_quoted(s: &str, out: &mut String) {
    out.push('"');
    escape_json_string(s, out);
    out.push('"');
}

pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        // Debug keeps a trailing ".0" on integral values and switches to
        // exponent notation for very large or small magnitudes.
        format!("{:?}", f)
    }
}

fn write_scalar(node: &JNode, out: &mut String) {
    match &node.value {
        JValue::Null => out.push_str("null"),
        JValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        JValue::Int(n) => out.push_str(&n.to_string()),
        JValue::Float(f) => out.push_str(&format_float(*f)),
        JValue::Str(s) => push_quoted(s, out),
        JValue::Date(d) => push_quoted(&format_date(d), out),
        JValue::DateTime(dt) => push_quoted(&format_datetime(dt), out),
        JValue::Regex(re) => push_quoted(re.as_str(), out),
        JValue::Slice(s) => push_quoted(&s.to_string(), out),
        JValue::Array(_) | JValue::Object(_) => {}
    }
}

fn write_compact(node: &JNode, sort_keys: bool, out: &mut String) {
    match &node.value {
        JValue::Array(arr) => {
            out.push('[');
            for (i, child) in arr.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_compact(child, sort_keys, out);
            }
            out.push(']');
        }
        JValue::Object(map) => {
            out.push('{');
            for (i, key) in ordered_keys(map, sort_keys).into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                push_quoted(key, out);
                out.push_str(": ");
                write_compact(&map[key.as_str()], sort_keys, out);
            }
            out.push('}');
        }
        _ => write_scalar(node, out),
    }
}

fn push_indent(out: &mut String, width: usize) {
    out.extend(std::iter::repeat(' ').take(width));
}

/// Writes `node` starting at the current cursor; `depth` is the nesting
/// level of the node's own brackets.
fn write_pretty(node: &JNode, indent: usize, sort_keys: bool, depth: usize, out: &mut String) {
    if !node.is_nonempty_container() {
        write_compact(node, sort_keys, out);
        return;
    }
    let child_dent = indent * (depth + 1);
    match &node.value {
        JValue::Array(arr) => {
            out.push_str("[\n");
            for (i, child) in arr.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                push_indent(out, child_dent);
                write_pretty(child, indent, sort_keys, depth + 1, out);
            }
            out.push('\n');
            push_indent(out, indent * depth);
            out.push(']');
        }
        JValue::Object(map) => {
            out.push_str("{\n");
            for (i, key) in ordered_keys(map, sort_keys).into_iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                let child = &map[key.as_str()];
                push_indent(out, child_dent);
                push_quoted(key, out);
                out.push(':');
                if child.is_nonempty_container() {
                    out.push('\n');
                    push_indent(out, child_dent);
                } else {
                    out.push(' ');
                }
                write_pretty(child, indent, sort_keys, depth + 1, out);
            }
            out.push('\n');
            push_indent(out, indent * depth);
            out.push('}');
        }
        _ => {}
    }
}

/// Mirrors the layout of `write_pretty`; returns the line of the node's
/// last character.
fn assign_pretty_lines(node: &mut JNode, sort_keys: bool, line: usize) -> usize {
    node.line_num = line;
    if !node.is_nonempty_container() {
        return line;
    }
    let mut cur = line;
    match &mut node.value {
        JValue::Array(arr) => {
            for child in Rc::make_mut(arr).iter_mut() {
                cur = assign_pretty_lines(child, sort_keys, cur + 1);
            }
        }
        JValue::Object(map) => {
            let keys: Vec<String> = ordered_keys(map, sort_keys).into_iter().cloned().collect();
            let map = Rc::make_mut(map);
            for key in keys {
                if let Some(child) = map.get_mut(&key) {
                    let start = if child.is_nonempty_container() { cur + 2 } else { cur + 1 };
                    cur = assign_pretty_lines(child, sort_keys, start);
                }
            }
        }
        _ => {}
    }
    cur + 1
}

#[cfg(test)]
mod tests {
    use crate::jnode;
    use crate::value::JNode;

    #[test]
    fn test_compact_scalars() {
        assert_eq!(jnode!(null).to_compact_string(true), "null");
        assert_eq!(jnode!(true).to_compact_string(true), "true");
        assert_eq!(jnode!(-17).to_compact_string(true), "-17");
        assert_eq!(jnode!(3.0).to_compact_string(true), "3.0");
        assert_eq!(jnode!(0.25).to_compact_string(true), "0.25");
        assert_eq!(jnode!(1e20).to_compact_string(true), "1e20");
        assert_eq!(jnode!(f64::NAN).to_compact_string(true), "NaN");
        assert_eq!(jnode!(f64::INFINITY).to_compact_string(true), "Infinity");
        assert_eq!(jnode!(f64::NEG_INFINITY).to_compact_string(true), "-Infinity");
    }

    #[test]
    fn test_string_escapes() {
        let s = JNode::string("a\"b\\c\nd\te\u{8}\u{c}\u{1}");
        assert_eq!(s.to_compact_string(true), r#""a\"b\\c\nd\te\b\f\u0001""#);
        assert_eq!(JNode::string("\u{e9}").to_compact_string(true), "\"\u{e9}\"");
        assert_eq!(JNode::string("\u{ae77}").to_compact_string(true), r#""\uae77""#);
        assert_eq!(JNode::string("\u{1F600}").to_compact_string(true), r#""\ud83d\ude00""#);
    }

    #[test]
    fn test_compact_containers_and_sorting() {
        let node = jnode!({"b": [1, 2], "A": {"z": null}, "c": "x"});
        assert_eq!(
            node.to_compact_string(false),
            r#"{"b": [1, 2], "A": {"z": null}, "c": "x"}"#
        );
        assert_eq!(
            node.to_compact_string(true),
            r#"{"A": {"z": null}, "b": [1, 2], "c": "x"}"#
        );
        assert_eq!(node.to_string(), node.to_compact_string(false));
    }

    #[test]
    fn test_pretty_print_layout() {
        let node = jnode!({"a": [1, {"b": 2}], "c": 3, "d": []});
        let expected = "{\n  \"a\":\n  [\n    1,\n    {\n      \"b\": 2\n    }\n  ],\n  \"c\": 3,\n  \"d\": []\n}";
        assert_eq!(node.pretty_print(2, true), expected);
    }

    #[test]
    fn test_pretty_print_scalar_root() {
        assert_eq!(jnode!("x").pretty_print(4, true), "\"x\"");
        assert_eq!(jnode!({}).pretty_print(4, true), "{}");
    }

    #[test]
    fn test_compact_line_renumbering() {
        let mut node = jnode!([1, [2, 3]]);
        let text = node.to_compact_string_and_change_line_numbers(true, Some(4));
        assert_eq!(text, "[1, [2, 3]]");
        assert_eq!(node.line_num, 4);
        assert_eq!(node.get_index(1).unwrap().get_index(1).unwrap().line_num, 4);
    }

    #[test]
    fn test_pretty_line_renumbering_matches_text() {
        let mut node = jnode!({"b": [10, {"x": 20}], "a": 30});
        let text = node.pretty_print_and_change_line_numbers(4, true, None);
        assert_eq!(text, node.pretty_print(4, true));
        let lines: Vec<&str> = text.lines().collect();
        let a = node.get("a").unwrap();
        assert!(lines[a.line_num].contains("30"));
        let b = node.get("b").unwrap();
        assert_eq!(lines[b.line_num].trim(), "[");
        assert!(lines[b.get_index(0).unwrap().line_num].contains("10"));
        let inner = b.get_index(1).unwrap();
        assert_eq!(lines[inner.line_num].trim(), "{");
        assert!(lines[inner.get("x").unwrap().line_num].contains("20"));
    }

    #[test]
    fn test_pretty_line_renumbering_offset() {
        let mut node = jnode!([1, 2]).with_line(10);
        node.pretty_print_and_change_line_numbers(4, true, None);
        assert_eq!(node.line_num, 10);
        assert_eq!(node.get_index(1).unwrap().line_num, 12);
    }
}
