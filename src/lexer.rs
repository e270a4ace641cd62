// RemesPath lexer
// Turns a query string into (token, position) pairs

use regex::Regex;

use crate::parser::ParserError;
use crate::value::Slicer;

/// Token types for the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Float(f64),
    String(String),
    /// Pattern text of a backtick literal; already validated.
    Regex(String),
    Slice(Slicer),
    True,
    False,
    Null,

    Identifier(String),
    /// `@`, the current JSON
    At,

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Match,
    In,
    Ampersand,
    Pipe,
    Caret,

    // Punctuation
    Dot,
    DotDot,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Colon,

    Eof,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Eof => "end of query".to_string(),
            other => format!("{:?}", other),
        }
    }
}

/// Lexer for tokenizing RemesPath queries
///
/// A `:` directly inside `{...}` separates a key from its value; anywhere
/// else it belongs to a slice literal.
#[derive(Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    brackets: Vec<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            brackets: Vec::new(),
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn in_braces(&self) -> bool {
        self.brackets.last() == Some(&'{')
    }

    fn read_string(&mut self, quote_char: char) -> Result<String, ParserError> {
        let start = self.position;
        let mut result = String::new();
        self.advance();

        loop {
            match self.current() {
                None => return Err(ParserError::UnclosedString { pos: start }),
                Some(ch) if ch == quote_char => {
                    self.advance();
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        None => return Err(ParserError::UnclosedString { pos: start }),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some('/') => result.push('/'),
                        Some('b') => result.push('\u{0008}'),
                        Some('f') => result.push('\u{000C}'),
                        Some('n') => result.push('\n'),
                        Some('r') => result.push('\r'),
                        Some('t') => result.push('\t'),
                        Some('u') => {
                            let escape_pos = self.position - 1;
                            self.advance();
                            let mut hex = String::new();
                            for _ in 0..4 {
                                match self.current() {
                                    Some(h) if h.is_ascii_hexdigit() => {
                                        hex.push(h);
                                        self.advance();
                                    }
                                    _ => {
                                        return Err(ParserError::InvalidEscape {
                                            escape: format!("\\u{}", hex),
                                            pos: escape_pos,
                                        })
                                    }
                                }
                            }
                            let ch = u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| ParserError::InvalidEscape {
                                    escape: format!("\\u{}", hex),
                                    pos: escape_pos,
                                })?;
                            result.push(ch);
                            continue;
                        }
                        Some(ch) => {
                            return Err(ParserError::InvalidEscape {
                                escape: format!("\\{}", ch),
                                pos: self.position - 1,
                            })
                        }
                    }
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }
    }

    /// Backtick-delimited regex; "\`" stands for a literal backtick and
    /// every other backslash is left for the regex engine.
    fn read_regex(&mut self) -> Result<String, ParserError> {
        let start = self.position;
        let mut pattern = String::new();
        self.advance();
        loop {
            match self.current() {
                None => return Err(ParserError::UnclosedRegex { pos: start }),
                Some('`') => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek(1) == Some('`') => {
                    pattern.push('`');
                    self.advance();
                    self.advance();
                }
                Some(ch) => {
                    pattern.push(ch);
                    self.advance();
                }
            }
        }
        Regex::new(&pattern).map_err(|e| ParserError::InvalidRegex {
            pos: start,
            message: e.to_string(),
        })?;
        Ok(pattern)
    }

    fn read_number(&mut self) -> Result<Token, ParserError> {
        let start = self.position;
        let mut is_float = false;

        while self.current().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.current() == Some('.') && self.peek(1).map_or(false, |c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.current().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.current(), Some('e') | Some('E')) {
            let sign = usize::from(matches!(self.peek(1), Some('+') | Some('-')));
            if self.peek(1 + sign).map_or(false, |c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..=sign {
                    self.advance();
                }
                while self.current().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text: String = self.input[start..self.position].iter().collect();
        let invalid = || ParserError::InvalidNumber {
            text: text.clone(),
            pos: start,
        };
        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Token::Int(n));
            }
        }
        text.parse::<f64>().map(Token::Float).map_err(|_| invalid())
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

    /// Optional signed integer bound of a slice.
    fn read_slice_bound(&mut self) -> Result<Option<i64>, ParserError> {
        let start = self.position;
        if self.current() == Some('-') {
            if !self.peek(1).map_or(false, |c| c.is_ascii_digit()) {
                return Ok(None);
            }
            self.advance();
        }
        if !self.current().map_or(false, |c| c.is_ascii_digit()) {
            return Ok(None);
        }
        while self.current().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        let text: String = self.input[start..self.position].iter().collect();
        text.parse::<i64>()
            .map(Some)
            .map_err(|_| ParserError::InvalidNumber { text, pos: start })
    }

    /// Reads `start:stop:step` if one begins here; otherwise leaves the
    /// cursor where it was.
    fn try_read_slice(&mut self) -> Result<Option<Slicer>, ParserError> {
        let start = self.position;
        let mut bounds = vec![self.read_slice_bound()?];
        self.skip_whitespace();
        if self.current() != Some(':') {
            self.position = start;
            return Ok(None);
        }
        while self.current() == Some(':') {
            self.advance();
            self.skip_whitespace();
            bounds.push(self.read_slice_bound()?);
            self.skip_whitespace();
        }
        if bounds.len() > 3 {
            return Err(ParserError::InvalidSlice { pos: start });
        }
        Ok(Some(Slicer::new(
            bounds[0],
            bounds.get(1).copied().flatten(),
            bounds.get(2).copied().flatten(),
        )))
    }

    pub fn next_token(&mut self) -> Result<(Token, usize), ParserError> {
        self.skip_whitespace();
        let pos = self.position;

        let ch = match self.current() {
            None => return Ok((Token::Eof, pos)),
            Some(ch) => ch,
        };

        let slice_start = ch == ':'
            || ch.is_ascii_digit()
            || (ch == '-' && self.peek(1).map_or(false, |c| c.is_ascii_digit()));
        if slice_start && !self.in_braces() {
            if let Some(slicer) = self.try_read_slice()? {
                return Ok((Token::Slice(slicer), pos));
            }
        }

        let token = match ch {
            '"' | '\'' => Token::String(self.read_string(ch)?),
            '`' => Token::Regex(self.read_regex()?),
            c if c.is_ascii_digit() => self.read_number()?,
            c if c.is_alphabetic() || c == '_' => match self.read_identifier().as_str() {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                "NaN" => Token::Float(f64::NAN),
                "Infinity" => Token::Float(f64::INFINITY),
                "in" => Token::In,
                other => Token::Identifier(other.to_string()),
            },
            _ => {
                let (token, width) = match (ch, self.peek(1)) {
                    ('*', Some('*')) => (Token::StarStar, 2),
                    ('/', Some('/')) => (Token::SlashSlash, 2),
                    ('=', Some('=')) => (Token::Equal, 2),
                    ('=', Some('~')) => (Token::Match, 2),
                    ('!', Some('=')) => (Token::NotEqual, 2),
                    ('<', Some('=')) => (Token::LessThanOrEqual, 2),
                    ('>', Some('=')) => (Token::GreaterThanOrEqual, 2),
                    ('.', Some('.')) => (Token::DotDot, 2),
                    ('@', _) => (Token::At, 1),
                    ('+', _) => (Token::Plus, 1),
                    ('-', _) => (Token::Minus, 1),
                    ('*', _) => (Token::Star, 1),
                    ('/', _) => (Token::Slash, 1),
                    ('%', _) => (Token::Percent, 1),
                    ('<', _) => (Token::LessThan, 1),
                    ('>', _) => (Token::GreaterThan, 1),
                    ('&', _) => (Token::Ampersand, 1),
                    ('|', _) => (Token::Pipe, 1),
                    ('^', _) => (Token::Caret, 1),
                    ('.', _) => (Token::Dot, 1),
                    (',', _) => (Token::Comma, 1),
                    (':', _) => (Token::Colon, 1),
                    ('[', _) => (Token::LeftBracket, 1),
                    (']', _) => (Token::RightBracket, 1),
                    ('(', _) => (Token::LeftParen, 1),
                    (')', _) => (Token::RightParen, 1),
                    ('{', _) => (Token::LeftBrace, 1),
                    ('}', _) => (Token::RightBrace, 1),
                    (c, _) => return Err(ParserError::UnexpectedChar { ch: c, pos }),
                };
                for _ in 0..width {
                    self.advance();
                }
                token
            }
        };

        match token {
            Token::LeftBracket => self.brackets.push('['),
            Token::LeftParen => self.brackets.push('('),
            Token::LeftBrace => self.brackets.push('{'),
            Token::RightBracket | Token::RightParen | Token::RightBrace => {
                self.brackets.pop();
            }
            _ => {}
        }
        Ok((token, pos))
    }

    /// Lex the whole input; the last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<(Token, usize)>, ParserError> {
        let mut tokens = Vec::new();
        loop {
            let (token, pos) = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, pos));
            if done {
                return Ok(tokens);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(query: &str) -> Vec<Token> {
        Lexer::new(query)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_lexer_numbers() {
        assert_eq!(
            lex("42 3.14 2.5e10 1E-5 99999999999999999999"),
            vec![
                Token::Int(42),
                Token::Float(3.14),
                Token::Float(2.5e10),
                Token::Float(1e-5),
                Token::Float(1e20),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_negative_number_is_minus_then_int() {
        assert_eq!(lex("-3"), vec![Token::Minus, Token::Int(3), Token::Eof]);
    }

    #[test]
    fn test_lexer_strings() {
        assert_eq!(
            lex(r#""hello" 'world' "with\nnewline" 'it\'s'"#),
            vec![
                Token::String("hello".to_string()),
                Token::String("world".to_string()),
                Token::String("with\nnewline".to_string()),
                Token::String("it's".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_regex() {
        assert_eq!(
            lex(r"`(?i)[a-z]{5}\d` `a\`b`"),
            vec![
                Token::Regex(r"(?i)[a-z]{5}\d".to_string()),
                Token::Regex("a`b".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_keywords() {
        assert_eq!(
            lex("true false null in foo_1"),
            vec![
                Token::True,
                Token::False,
                Token::Null,
                Token::In,
                Token::Identifier("foo_1".to_string()),
                Token::Eof
            ]
        );
        assert!(matches!(lex("NaN")[0], Token::Float(f) if f.is_nan()));
    }

    #[test]
    fn test_lexer_operators() {
        assert_eq!(
            lex("+ - * ** / // % == != < <= > >= =~ & | ^"),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::StarStar,
                Token::Slash,
                Token::SlashSlash,
                Token::Percent,
                Token::Equal,
                Token::NotEqual,
                Token::LessThan,
                Token::LessThanOrEqual,
                Token::GreaterThan,
                Token::GreaterThanOrEqual,
                Token::Match,
                Token::Ampersand,
                Token::Pipe,
                Token::Caret,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_slices() {
        assert_eq!(
            lex("@[1:3] @[:] @[::-1] @[-2:]"),
            vec![
                Token::At,
                Token::LeftBracket,
                Token::Slice(Slicer::new(Some(1), Some(3), None)),
                Token::RightBracket,
                Token::At,
                Token::LeftBracket,
                Token::Slice(Slicer::default()),
                Token::RightBracket,
                Token::At,
                Token::LeftBracket,
                Token::Slice(Slicer::new(None, None, Some(-1))),
                Token::RightBracket,
                Token::At,
                Token::LeftBracket,
                Token::Slice(Slicer::new(Some(-2), None, None)),
                Token::RightBracket,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_colon_inside_braces() {
        assert_eq!(
            lex("{a: 1, b: @[0:2]}"),
            vec![
                Token::LeftBrace,
                Token::Identifier("a".to_string()),
                Token::Colon,
                Token::Int(1),
                Token::Comma,
                Token::Identifier("b".to_string()),
                Token::Colon,
                Token::At,
                Token::LeftBracket,
                Token::Slice(Slicer::new(Some(0), Some(2), None)),
                Token::RightBracket,
                Token::RightBrace,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_paths() {
        assert_eq!(
            lex("@..a.*"),
            vec![
                Token::At,
                Token::DotDot,
                Token::Identifier("a".to_string()),
                Token::Dot,
                Token::Star,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_positions() {
        let tokens = Lexer::new("@.foo + 1").tokenize().unwrap();
        let positions: Vec<usize> = tokens.iter().map(|(_, p)| *p).collect();
        assert_eq!(positions, vec![0, 1, 2, 6, 8, 9]);
    }

    #[test]
    fn test_lexer_errors() {
        assert!(matches!(
            Lexer::new("'abc").tokenize(),
            Err(ParserError::UnclosedString { pos: 0 })
        ));
        assert!(matches!(
            Lexer::new("@ + `abc").tokenize(),
            Err(ParserError::UnclosedRegex { pos: 4 })
        ));
        assert!(matches!(
            Lexer::new("`(`").tokenize(),
            Err(ParserError::InvalidRegex { .. })
        ));
        assert!(matches!(
            Lexer::new("@ # 2").tokenize(),
            Err(ParserError::UnexpectedChar { ch: '#', pos: 2 })
        ));
        assert!(matches!(
            Lexer::new("@[1:2:3:4]").tokenize(),
            Err(ParserError::InvalidSlice { pos: 2 })
        ));
    }
}
