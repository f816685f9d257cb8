use crate::context::Value;
use crate::source::SourceBuf;
use std::error::Error;
use std::fmt::Display;
use std::fs::File;

pub const QUOTE: u8 = b'"';
pub const LINE_FEED: u8 = b'\n';
const VERTICAL_TAB: u8 = 0x0b;

/// Longest token in bytes. Longer runs are split into consecutive tokens.
pub const MAX_TOKEN_LEN: usize = 1023;

#[derive(Debug)]
pub(crate) enum LexErrorKind {
    FileOpenError(Box<dyn Error>),
    MemoryMapError(Box<dyn Error>),
}

impl LexErrorKind {
    fn throw<T>(self) -> Result<T, LexError> {
        let msg = match &self {
            LexErrorKind::FileOpenError(err) => {
                format!("the file does not exist or cannot be opened, details: {}", err)
            }
            LexErrorKind::MemoryMapError(err) => {
                format!("failed to memory map file, details: {}", err)
            }
        };
        Err(LexError { msg, kind: self })
    }
}

impl Display for LexErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug)]
pub struct LexError {
    pub(crate) msg: String,
    pub(crate) kind: LexErrorKind,
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl Error for LexError {}

/// Minimal lexical unit: the literal text plus the line it starts on
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(text: &str, line: usize) -> Token {
        Token {
            text: text.to_string(),
            line,
        }
    }

    /// The content of a quoted string literal, `None` if the token is not one
    pub fn unquote(&self) -> Option<&str> {
        unquote(&self.text)
    }
}

/// Strips the delimiting double quotes off a string literal
pub fn unquote(text: &str) -> Option<&str> {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return Some(&text[1..text.len() - 1]);
    }

    None
}

/// Reads a `push`/`randint` argument.
///
/// Only digits and `.` are accepted, plus a `-` in front. The value is the longest prefix of the
/// form `-?digits(.digits)?`, so `1.2.3` reads as `1.2` and `-` or `.` read as 0.
pub fn numeric_literal(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let accepted = !bytes.is_empty()
        && bytes
            .iter()
            .enumerate()
            .all(|(i, &byte)| byte.is_ascii_digit() || byte == b'.' || (i == 0 && byte == b'-'));
    if !accepted {
        return None;
    }

    let digits = |mut end: usize| {
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        end
    };
    let mut end = digits(usize::from(bytes[0] == b'-'));
    if end < bytes.len() && bytes[end] == b'.' {
        end = digits(end + 1);
    }

    Some(text[..end].parse::<Value>().unwrap_or(0.0))
}

fn is_space(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == VERTICAL_TAB
}

fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

/// The component responsible for reading the source and splitting it into tokens
#[derive(Debug)]
pub struct Lexer {
    source: SourceBuf,
    index: usize,
    line: usize,
}

impl Lexer {
    pub fn new(file_name: &str) -> Result<Lexer, LexError> {
        let file = match File::open(file_name) {
            Ok(content) => content,
            Err(err) => return LexErrorKind::FileOpenError(Box::new(err)).throw(),
        };
        let source = match SourceBuf::map(&file) {
            Ok(content) => content,
            Err(err) => return LexErrorKind::MemoryMapError(Box::new(err)).throw(),
        };

        Ok(Lexer {
            source,
            index: 0,
            line: 1,
        })
    }

    pub fn from_text(text: &str) -> Lexer {
        Lexer {
            source: SourceBuf::Owned(text.as_bytes().to_vec()),
            index: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.index).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.index += 1;
        if byte == LINE_FEED {
            self.line += 1;
        }

        Some(byte)
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            if !is_space(byte) {
                break;
            }
            self.bump();
        }
    }

    /// A token may not exceed `MAX_TOKEN_LEN`, but is never cut inside a UTF-8 sequence
    fn full(&self, len: usize) -> bool {
        len >= MAX_TOKEN_LEN && !self.peek().map_or(false, is_continuation)
    }

    fn string(&mut self, text: &mut Vec<u8>) {
        while !self.full(text.len()) {
            match self.bump() {
                Some(byte) => {
                    text.push(byte);
                    if byte == QUOTE {
                        break;
                    }
                }
                None => break,
            }
        }
    }

    fn word(&mut self, text: &mut Vec<u8>) {
        while !self.full(text.len()) {
            match self.peek() {
                Some(byte) if !is_space(byte) => {
                    self.bump();
                    text.push(byte);
                }
                _ => break,
            }
        }
    }

    /// Scans the next token, `None` once the source is exhausted
    pub fn token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let line = self.line;
        let first = self.bump()?;
        let mut text = vec![first];
        if first == QUOTE {
            self.string(&mut text);
        } else {
            self.word(&mut text);
        }

        Some(Token {
            text: String::from_utf8_lossy(&text).into_owned(),
            line,
        })
    }

    /// Scans the whole source
    pub fn produce_tokens(mut self) -> Vec<Token> {
        let mut tokens = vec![];
        while let Some(token) = self.token() {
            tokens.push(token);
        }
        tokens
    }
}

impl Iterator for &mut Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.token()
    }
}

#[cfg(test)]
mod tests {
    use super::{numeric_literal, unquote, LexError, Lexer, Token, MAX_TOKEN_LEN};

    fn texts(source: &str) -> Vec<String> {
        Lexer::from_text(source)
            .produce_tokens()
            .into_iter()
            .map(|token| token.text)
            .collect()
    }

    #[test]
    fn lex_words_and_lines() {
        let tokens = Lexer::from_text("push 1\n\n  push\t2\nsum\n").produce_tokens();
        assert_eq!(
            tokens,
            vec![
                Token::new("push", 1),
                Token::new("1", 1),
                Token::new("push", 3),
                Token::new("2", 3),
                Token::new("sum", 4),
            ]
        );
    }

    #[test]
    fn lex_string_literal() {
        assert_eq!(
            texts("print \"hello,  world\" printnl \"\""),
            vec!["print", "\"hello,  world\"", "printnl", "\"\""]
        );
    }

    #[test]
    fn lex_string_glued_to_next_token() {
        assert_eq!(texts("\"a b\"halt"), vec!["\"a b\"", "halt"]);
    }

    #[test]
    fn lex_unterminated_string() {
        assert_eq!(texts("print \"open ended\n"), vec!["print", "\"open ended\n"]);
    }

    #[test]
    fn lex_string_counts_lines() {
        let tokens = Lexer::from_text("print \"a\nb\"\nhalt").produce_tokens();
        assert_eq!(tokens[2], Token::new("halt", 3));
    }

    #[test]
    fn lex_comment_markers_are_plain_tokens() {
        assert_eq!(texts("--> note <-- pop"), vec!["-->", "note", "<--", "pop"]);
        assert_eq!(texts("-->note"), vec!["-->note"]);
    }

    #[test]
    fn lex_splits_long_tokens() {
        let long = "x".repeat(MAX_TOKEN_LEN + 5);
        let tokens = texts(&long);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].len(), MAX_TOKEN_LEN);
        assert_eq!(tokens[1], "xxxxx");
    }

    #[test]
    fn lex_never_splits_a_code_point() {
        let long = format!("{}é", "x".repeat(MAX_TOKEN_LEN - 1));
        let tokens = texts(&long);
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].ends_with('é'));
    }

    #[test]
    fn lex_empty_source() {
        assert!(texts(" \n\t ").is_empty());
    }

    #[test]
    fn unquote_round_trip() {
        let tokens = Lexer::from_text("printnl \"keep  the spaces\"").produce_tokens();
        assert_eq!(tokens[1].unquote(), Some("keep  the spaces"));
        assert_eq!(unquote("\"\""), Some(""));
        assert_eq!(unquote("\""), None);
        assert_eq!(unquote("plain"), None);
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(numeric_literal("42"), Some(42.0));
        assert_eq!(numeric_literal("-2.5"), Some(-2.5));
        assert_eq!(numeric_literal(".5"), Some(0.5));
        assert_eq!(numeric_literal("5."), Some(5.0));
        assert_eq!(numeric_literal("1.2.3"), Some(1.2));
        assert_eq!(numeric_literal("-"), Some(0.0));
        assert_eq!(numeric_literal("."), Some(0.0));
        assert_eq!(numeric_literal("1-2"), None);
        assert_eq!(numeric_literal("1e5"), None);
        assert_eq!(numeric_literal("+1"), None);
        assert_eq!(numeric_literal("abc"), None);
        assert_eq!(numeric_literal("\"1\""), None);
        assert_eq!(numeric_literal(""), None);
    }

    #[test]
    fn lex_file() -> Result<(), LexError> {
        let mut lexer = Lexer::new("resources/arithmetic.fsn")?;
        let first = (&mut lexer).next();
        assert_eq!(first, Some(Token::new("-->", 1)));

        Ok(())
    }

    #[test]
    fn lex_missing_file() {
        assert!(Lexer::new("resources/missing.fsn").is_err());
    }
}
