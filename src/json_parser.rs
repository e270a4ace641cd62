// JSON reader for JNode trees
// Recursive descent with optional JSON5-style extensions and a linting mode

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::datetime;
use crate::value::{JNode, JValue};

/// Which non-standard syntax the parser accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Accept `'single quoted'` strings and keys.
    pub allow_single_quoted_strings: bool,
    /// Accept `// line` and `/* block */` comments between tokens.
    pub allow_comments: bool,
    /// Promote strings shaped like dates/datetimes to `Date`/`DateTime`.
    pub allow_datetimes: bool,
    /// Accept `NaN`, `Infinity` and `-Infinity`.
    pub allow_nan_inf: bool,
    /// Record structural problems and recover instead of failing.
    pub lint: bool,
    /// Deepest container nesting accepted before the parse fails, even in
    /// lint mode.
    pub max_depth: usize,
}

/// Nesting limit used by [`ParserOptions::default`].
pub const DEFAULT_MAX_DEPTH: usize = 256;

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            allow_single_quoted_strings: false,
            allow_comments: false,
            allow_datetimes: false,
            allow_nan_inf: true,
            lint: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParserOptions {
    /// Every extension enabled, lint mode off.
    pub fn lenient() -> Self {
        ParserOptions {
            allow_single_quoted_strings: true,
            allow_comments: true,
            allow_datetimes: true,
            allow_nan_inf: true,
            lint: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A structural problem in JSON text; `pos` counts characters from the start.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at position {pos} (line {line})")]
pub struct JsonParseError {
    pub pos: usize,
    pub line: usize,
    pub message: String,
}

pub struct JsonParser {
    options: ParserOptions,
    input: Vec<char>,
    position: usize,
    line: usize,
    depth: usize,
    lint: Vec<JsonParseError>,
}

impl JsonParser {
    pub fn new(options: ParserOptions) -> Self {
        JsonParser {
            options,
            input: Vec::new(),
            position: 0,
            line: 0,
            depth: 0,
            lint: Vec::new(),
        }
    }

    /// Problems recorded by the last `parse` in lint mode.
    pub fn lint(&self) -> &[JsonParseError] {
        &self.lint
    }

    pub fn take_lint(&mut self) -> Vec<JsonParseError> {
        std::mem::take(&mut self.lint)
    }

    /// Parse one JSON document.
    ///
    /// In lint mode this only fails when the text holds no value at all;
    /// every other problem is recorded and the best-effort tree returned.
    pub fn parse(&mut self, text: &str) -> Result<JNode, JsonParseError> {
        self.input = text.chars().collect();
        self.position = 0;
        self.line = 0;
        self.depth = 0;
        self.lint.clear();

        if self.current() == Some('\u{feff}') {
            self.advance();
        }
        self.skip_ignorable()?;
        if self.current().is_none() {
            return Err(self.error("no JSON value found"));
        }
        let root = self.parse_value()?;
        self.skip_ignorable()?;
        if self.current().is_some() {
            self.report("extra content after the end of the JSON document")?;
        }
        debug!(
            chars = self.input.len(),
            lint = self.lint.len(),
            "parsed JSON document"
        );
        Ok(root)
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current() {
            if ch == '\n' {
                self.line += 1;
            }
            self.position += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> JsonParseError {
        JsonParseError {
            pos: self.position,
            line: self.line,
            message: message.into(),
        }
    }

    /// Fails outside lint mode; in lint mode records the problem and lets
    /// the caller recover.
    fn report(&mut self, message: impl Into<String>) -> Result<(), JsonParseError> {
        let err = self.error(message);
        if self.options.lint {
            trace!(pos = err.pos, message = %err.message, "lint");
            self.lint.push(err);
            Ok(())
        } else {
            Err(err)
        }
    }

    /// Skips whitespace and (if allowed, or linting) comments.
    fn skip_ignorable(&mut self) -> Result<(), JsonParseError> {
        loop {
            match self.current() {
                Some(ch) if ch.is_whitespace() => self.advance(),
                Some('/') if matches!(self.peek(1), Some('/') | Some('*')) => {
                    if !self.options.allow_comments {
                        self.report("comments are not allowed")?;
                    }
                    self.skip_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), JsonParseError> {
        self.advance();
        if self.current() == Some('/') {
            while let Some(ch) = self.current() {
                if ch == '\n' {
                    break;
                }
                self.advance();
            }
            return Ok(());
        }
        self.advance();
        loop {
            match self.current() {
                None => return self.report("unterminated block comment"),
                Some('*') if self.peek(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.advance(),
            }
        }
    }

    // ── Values ──────────────────────────────────────────────────────────

    fn parse_value(&mut self) -> Result<JNode, JsonParseError> {
        let line = self.line;
        match self.current() {
            None => {
                self.report("unexpected end of input; expected a value")?;
                Ok(JNode::null().with_line(line))
            }
            Some(open @ ('{' | '[')) => self.parse_container(open),
            Some('"') => self.parse_string_value('"'),
            Some('\'') => {
                if !self.options.allow_single_quoted_strings {
                    self.report("single-quoted strings are not allowed")?;
                }
                self.parse_string_value('\'')
            }
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.parse_number(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.parse_keyword(),
            Some(ch @ (',' | ']' | '}')) => {
                self.report(format!("expected a value, found '{}'", ch))?;
                Ok(JNode::null().with_line(line))
            }
            Some(ch) => {
                self.report(format!("unexpected character '{}'", ch))?;
                self.advance();
                Ok(JNode::null().with_line(line))
            }
        }
    }

    fn parse_container(&mut self, open: char) -> Result<JNode, JsonParseError> {
        if self.depth >= self.options.max_depth {
            return Err(self.error(format!(
                "maximum nesting depth exceeded ({})",
                self.options.max_depth
            )));
        }
        self.depth += 1;
        let result = if open == '{' {
            self.parse_object()
        } else {
            self.parse_array()
        };
        self.depth -= 1;
        result
    }

    fn parse_keyword(&mut self) -> Result<JNode, JsonParseError> {
        let line = self.line;
        let word = self.read_identifier();
        let value = match word.as_str() {
            "true" => JValue::Bool(true),
            "false" => JValue::Bool(false),
            "null" => JValue::Null,
            "NaN" | "Infinity" => {
                if !self.options.allow_nan_inf {
                    self.report(format!("{} is not allowed", word))?;
                }
                JValue::Float(if word == "NaN" { f64::NAN } else { f64::INFINITY })
            }
            _ => {
                self.report(format!("unexpected identifier '{}'", word))?;
                JValue::Null
            }
        };
        Ok(JNode::new(value, line))
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.position].iter().collect()
    }

    fn read_digits(&mut self) -> usize {
        let start = self.position;
        while self.current().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        self.position - start
    }

    fn parse_number(&mut self) -> Result<JNode, JsonParseError> {
        let line = self.line;
        let start = self.position;
        if self.current() == Some('-') {
            self.advance();
            if self.current() == Some('I') {
                let word = self.read_identifier();
                if word != "Infinity" {
                    self.report(format!("invalid number '-{}'", word))?;
                    return Ok(JNode::null().with_line(line));
                }
                if !self.options.allow_nan_inf {
                    self.report("-Infinity is not allowed")?;
                }
                return Ok(JNode::new(JValue::Float(f64::NEG_INFINITY), line));
            }
        }
        let leading_zero = self.current() == Some('0');
        let digits = self.read_digits();
        if digits == 0 {
            self.report("invalid number: expected a digit")?;
            return Ok(JNode::null().with_line(line));
        }
        if leading_zero && digits > 1 {
            self.report("invalid number: leading zeros are not allowed")?;
        }
        let mut is_float = false;
        if self.current() == Some('.') {
            is_float = true;
            self.advance();
            if self.read_digits() == 0 {
                self.report("invalid number: expected a digit after the decimal point")?;
            }
        }
        if matches!(self.current(), Some('e') | Some('E')) {
            is_float = true;
            self.advance();
            if matches!(self.current(), Some('+') | Some('-')) {
                self.advance();
            }
            if self.read_digits() == 0 {
                self.report("invalid number: expected a digit in the exponent")?;
            }
        }
        let text: String = self.input[start..self.position].iter().collect();
        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(JNode::new(JValue::Int(n), line));
            }
        }
        match text.trim_end_matches(|c: char| matches!(c, 'e' | 'E' | '+' | '-' | '.')).parse::<f64>() {
            Ok(f) => Ok(JNode::new(JValue::Float(f), line)),
            Err(_) => {
                self.report(format!("invalid number '{}'", text))?;
                Ok(JNode::null().with_line(line))
            }
        }
    }

    fn parse_string_value(&mut self, quote: char) -> Result<JNode, JsonParseError> {
        let line = self.line;
        let s = self.read_string(quote)?;
        if self.options.allow_datetimes {
            if let Some(value) = datetime::promote(&s) {
                return Ok(JNode::new(value, line));
            }
        }
        Ok(JNode::new(JValue::Str(s.into()), line))
    }

    /// Reads a quoted string, cursor on the opening quote.
    fn read_string(&mut self, quote: char) -> Result<String, JsonParseError> {
        let mut result = String::new();
        self.advance();
        loop {
            match self.current() {
                None | Some('\n') => {
                    self.report("unterminated string")?;
                    return Ok(result);
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance();
                    self.read_escape(quote, &mut result)?;
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }
    }

    /// Cursor just past a backslash.
    fn read_escape(&mut self, quote: char, out: &mut String) -> Result<(), JsonParseError> {
        let ch = match self.current() {
            Some(ch) => ch,
            None => return Ok(()),
        };
        let unescaped = match ch {
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            'b' => '\u{0008}',
            'f' => '\u{000C}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => {
                self.advance();
                return self.read_unicode_escape(out);
            }
            c if c == quote => c,
            c => {
                self.report(format!("invalid escape sequence '\\{}'", c))?;
                c
            }
        };
        out.push(unescaped);
        self.advance();
        Ok(())
    }

    fn read_hex4(&mut self) -> Option<u32> {
        let mut code = 0u32;
        for i in 0..4 {
            let digit = self.peek(i)?.to_digit(16)?;
            code = code * 16 + digit;
        }
        for _ in 0..4 {
            self.advance();
        }
        Some(code)
    }

    /// Cursor just past `\u`; joins UTF-16 surrogate pairs.
    fn read_unicode_escape(&mut self, out: &mut String) -> Result<(), JsonParseError> {
        let code = match self.read_hex4() {
            Some(code) => code,
            None => {
                self.report("invalid unicode escape")?;
                out.push('u');
                return Ok(());
            }
        };
        if (0xD800..0xDC00).contains(&code)
            && self.current() == Some('\\')
            && self.peek(1) == Some('u')
        {
            let save = (self.position, self.line);
            self.advance();
            self.advance();
            match self.read_hex4() {
                Some(low) if (0xDC00..0xE000).contains(&low) => {
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    if let Some(c) = char::from_u32(combined) {
                        out.push(c);
                        return Ok(());
                    }
                }
                _ => {}
            }
            (self.position, self.line) = save;
        }
        match char::from_u32(code) {
            Some(c) => out.push(c),
            None => {
                self.report(format!("invalid unicode code point {:04x}", code))?;
                out.push(char::REPLACEMENT_CHARACTER);
            }
        }
        Ok(())
    }

    // ── Containers ──────────────────────────────────────────────────────

    fn parse_array(&mut self) -> Result<JNode, JsonParseError> {
        let line = self.line;
        self.advance();
        let mut children = Vec::new();
        self.skip_ignorable()?;
        if self.current() == Some(']') {
            self.advance();
            return Ok(JNode::array(children).with_line(line));
        }
        loop {
            self.skip_ignorable()?;
            match self.current() {
                Some(']') => {
                    self.report("trailing comma in array")?;
                    self.advance();
                    break;
                }
                None => {
                    self.report("unterminated array")?;
                    break;
                }
                _ => {}
            }
            children.push(self.parse_value()?);
            self.skip_ignorable()?;
            match self.current() {
                Some(',') => self.advance(),
                Some(']') => {
                    self.advance();
                    break;
                }
                Some('}') => {
                    self.report("array closed with '}'")?;
                    self.advance();
                    break;
                }
                None => {
                    self.report("unterminated array")?;
                    break;
                }
                Some(_) => self.report("expected ',' or ']' after array element")?,
            }
        }
        Ok(JNode::array(children).with_line(line))
    }

    fn parse_object(&mut self) -> Result<JNode, JsonParseError> {
        let line = self.line;
        self.advance();
        let mut children = IndexMap::new();
        self.skip_ignorable()?;
        if self.current() == Some('}') {
            self.advance();
            return Ok(JNode::object(children).with_line(line));
        }
        'pairs: loop {
            self.skip_ignorable()?;
            let key = match self.current() {
                Some('"') => self.read_string('"')?,
                Some('\'') => {
                    if !self.options.allow_single_quoted_strings {
                        self.report("single-quoted strings are not allowed")?;
                    }
                    self.read_string('\'')?
                }
                Some('}') => {
                    self.report("trailing comma in object")?;
                    self.advance();
                    break;
                }
                None => {
                    self.report("unterminated object")?;
                    break;
                }
                Some(ch) if ch.is_alphabetic() || ch == '_' => {
                    self.report("object keys must be quoted strings")?;
                    self.read_identifier()
                }
                Some(ch) => {
                    self.report(format!("expected a string key, found '{}'", ch))?;
                    loop {
                        match self.current() {
                            None => break 'pairs,
                            Some(',') => {
                                self.advance();
                                continue 'pairs;
                            }
                            Some('}') => {
                                self.advance();
                                break 'pairs;
                            }
                            Some(_) => self.advance(),
                        }
                    }
                }
            };
            self.skip_ignorable()?;
            if self.current() == Some(':') {
                self.advance();
            } else {
                self.report(format!("expected ':' after key \"{}\"", key))?;
            }
            self.skip_ignorable()?;
            let value = self.parse_value()?;
            children.insert(key, value);
            self.skip_ignorable()?;
            match self.current() {
                Some(',') => self.advance(),
                Some('}') => {
                    self.advance();
                    break;
                }
                Some(']') => {
                    self.report("object closed with ']'")?;
                    self.advance();
                    break;
                }
                None => {
                    self.report("unterminated object")?;
                    break;
                }
                Some(_) => self.report("expected ',' or '}' after object value")?,
            }
        }
        Ok(JNode::object(children).with_line(line))
    }
}

/// Parse `text` with the given options.
pub fn parse(text: &str, options: ParserOptions) -> Result<JNode, JsonParseError> {
    JsonParser::new(options).parse(text)
}

/// Parse `text` in lint mode, returning the recovered tree and every problem found.
pub fn parse_with_lint(
    text: &str,
    options: ParserOptions,
) -> Result<(JNode, Vec<JsonParseError>), JsonParseError> {
    let mut parser = JsonParser::new(ParserOptions {
        lint: true,
        ..options
    });
    let root = parser.parse(text)?;
    Ok((root, parser.take_lint()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jnode;

    fn strict(text: &str) -> Result<JNode, JsonParseError> {
        parse(text, ParserOptions::default())
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(strict("17").unwrap(), jnode!(17));
        assert_eq!(strict("-2.5e1").unwrap(), jnode!(-25.0));
        assert_eq!(strict("1.0").unwrap(), jnode!(1.0));
        assert_eq!(strict("\"hi\"").unwrap(), jnode!("hi"));
        assert_eq!(strict("true").unwrap(), jnode!(true));
        assert_eq!(strict(" null ").unwrap(), jnode!(null));
    }

    #[test]
    fn test_int_overflow_falls_back_to_float() {
        assert_eq!(strict("123456789012345678901").unwrap(), jnode!(1.2345678901234568e20));
    }

    #[test]
    fn test_nan_and_infinity() {
        let node = strict("[NaN, Infinity, -Infinity]").unwrap();
        let arr = node.as_array().unwrap();
        assert!(matches!(arr[0].value, JValue::Float(f) if f.is_nan()));
        assert_eq!(arr[1], jnode!(f64::INFINITY));
        assert_eq!(arr[2], jnode!(f64::NEG_INFINITY));
        let opts = ParserOptions { allow_nan_inf: false, ..Default::default() };
        assert!(parse("NaN", opts).is_err());
    }

    #[test]
    fn test_parse_general_document() {
        let text = r#"{"a":[-1, true, {"b" :  0.5, "c": "\uae77"},null],
"a\u10ff":[true, false, {},    "\u043ea", []], "back'slas\"h": ["\"'\f\n\b\t\/"]}"#;
        let node = strict(text).unwrap();
        assert_eq!(node.get("a").unwrap().get_index(2).unwrap().get("c"), Some(&jnode!("\u{ae77}")));
        assert_eq!(node.get("a\u{10ff}").unwrap().as_array().unwrap().len(), 5);
        assert_eq!(
            node.get("back'slas\"h").unwrap().get_index(0),
            Some(&jnode!("\"'\u{c}\n\u{8}\t/"))
        );
    }

    #[test]
    fn test_surrogate_pairs() {
        assert_eq!(strict(r#""\ud83d\ude00""#).unwrap(), jnode!("\u{1F600}"));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let node = strict(r#"{"a": 1, "a": 2}"#).unwrap();
        assert_eq!(node.get("a"), Some(&jnode!(2)));
        assert_eq!(node.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_line_numbers() {
        let node = strict("{\n\"a\": 1,\n\"b\": [\n2\n]\n}").unwrap();
        assert_eq!(node.line_num, 0);
        assert_eq!(node.get("a").unwrap().line_num, 1);
        assert_eq!(node.get("b").unwrap().line_num, 2);
        assert_eq!(node.get("b").unwrap().get_index(0).unwrap().line_num, 3);
    }

    #[test]
    fn test_strict_errors() {
        for bad in [
            "{\"a\":}",
            "[1, 2",
            "[1 2]",
            "[1,]",
            "{\"a\" 1}",
            "\"abc",
            "\"\\q\"",
            "01x",
            "-",
            "1.",
            "[1] 2",
            "",
            "{a: 1}",
        ] {
            assert!(strict(bad).is_err(), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_error_position() {
        let err = strict("[1, 2 3]").unwrap_err();
        assert_eq!(err.pos, 6);
        assert!(err.message.contains("expected ','"));
    }

    #[test]
    fn test_extensions_disabled_by_default() {
        assert!(strict("'a'").is_err());
        assert!(strict("[1, // c\n 2]").is_err());
        assert_eq!(strict("\"2020-01-01\"").unwrap(), jnode!("2020-01-01"));
    }

    #[test]
    fn test_extensions_enabled() {
        let node = parse(
            "/* dates */ {'d': '2020-01-31', // day\n 'dt': \"2020-01-31 10:11:12.5\"}",
            ParserOptions::lenient(),
        )
        .unwrap();
        assert!(matches!(node.get("d").unwrap().value, JValue::Date(_)));
        assert!(matches!(node.get("dt").unwrap().value, JValue::DateTime(_)));
    }

    #[test]
    fn test_lint_missing_value() {
        let (node, lint) = parse_with_lint("{\"a\":}", ParserOptions::default()).unwrap();
        assert_eq!(node, jnode!({"a": null}));
        assert_eq!(lint.len(), 1);
    }

    #[test]
    fn test_lint_collects_every_problem() {
        let (node, lint) =
            parse_with_lint("[1 2, 'x', {\"k\" 3,}, tru", ParserOptions::default()).unwrap();
        assert_eq!(node, jnode!([1, 2, "x", {"k": 3}, null]));
        // missing comma, single quotes, missing colon, trailing comma,
        // bad identifier, unterminated array
        assert_eq!(lint.len(), 6);
        assert!(lint.windows(2).all(|w| w[0].pos <= w[1].pos));
    }

    #[test]
    fn test_lint_mismatched_bracket_and_extra_content() {
        let (node, lint) = parse_with_lint("[1, 2} 3", ParserOptions::default()).unwrap();
        assert_eq!(node, jnode!([1, 2]));
        assert_eq!(lint.len(), 2);
    }

    #[test]
    fn test_lint_empty_input_still_fails() {
        assert!(parse_with_lint("   ", ParserOptions::default()).is_err());
    }

    #[test]
    fn test_options_from_json() {
        let opts: ParserOptions = serde_json::from_str(r#"{"allow_comments": true}"#).unwrap();
        assert!(opts.allow_comments);
        assert!(opts.allow_nan_inf);
        assert!(!opts.lint);
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_leading_zeros_rejected() {
        assert!(strict("01").is_err());
        assert!(strict("-01").is_err());
        assert!(strict("[1, 007]").is_err());
        assert_eq!(strict("0").unwrap(), jnode!(0));
        assert_eq!(strict("-0.5").unwrap(), jnode!(-0.5));
        assert_eq!(strict("0e3").unwrap(), jnode!(0.0));

        let (node, lint) = parse_with_lint("[01, 2]", ParserOptions::default()).unwrap();
        assert_eq!(node, jnode!([1, 2]));
        assert_eq!(lint.len(), 1);
        assert!(lint[0].message.contains("leading zeros"));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "[".repeat(100_000) + &"]".repeat(100_000);
        let err = strict(&deep).unwrap_err();
        assert!(err.message.contains("maximum nesting depth exceeded"));
        assert_eq!(err.pos, DEFAULT_MAX_DEPTH);
        assert!(parse_with_lint(&deep, ParserOptions::default()).is_err());

        let opts = ParserOptions { max_depth: 3, ..Default::default() };
        assert!(parse(r#"[{"a": [1]}]"#, opts).is_ok());
        assert!(parse(r#"[{"a": [[1]]}]"#, opts).is_err());
        let at_limit = "[".repeat(DEFAULT_MAX_DEPTH) + &"]".repeat(DEFAULT_MAX_DEPTH);
        assert!(strict(&at_limit).is_ok());
    }
}
