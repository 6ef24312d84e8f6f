//! Hand-written maximal-munch lexer.
//!
//! The lexer is a total function `next_token(source, cursor) -> (Token, Cursor)`.
//! Every byte of the input ends up in exactly one token (whitespace and
//! comments included), so concatenating the token spans reproduces the
//! buffer. String bodies are lexed as opener / content / closer; the cursor
//! remembers when it sits inside a string so lexing can restart from any
//! cursor it handed out.

use serde::Serialize;

use crate::Span;
use crate::error::DiagnosticKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // keywords
    Addon,
    Signer,
    Action,
    Output,
    Variable,
    Input,
    Import,
    True,
    False,
    Null,

    // punctuation
    Equals,       // =
    OpenBrace,    // {
    CloseBrace,   // }
    DoubleQuote,  // "
    SingleQuote,  // '
    TripleQuote,  // """
    OpenBracket,  // [
    Comma,        // ,
    CloseBracket, // ]
    Colon,        // :
    Dot,          // .
    OpenParen,    // (
    CloseParen,   // )
    Star,         // *
    Slash,        // /
    Plus,         // +
    Minus,        // -

    // content
    Identifier,
    StringContent,
    HexNumber,
    Integer,
    Float,

    // trivia
    LineComment,
    BlockComment,
    Whitespace,

    // unrecognized character
    Error,

    // always emitted at end
    Eof,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Addon
                | TokenKind::Signer
                | TokenKind::Action
                | TokenKind::Output
                | TokenKind::Variable
                | TokenKind::Input
                | TokenKind::Import
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }

    /// Keywords that open a top-level statement
    pub fn is_statement_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Addon
                | TokenKind::Signer
                | TokenKind::Action
                | TokenKind::Output
                | TokenKind::Variable
                | TokenKind::Input
                | TokenKind::Import
        )
    }

    /// Look up a fully scanned identifier span in the reserved word set
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "addon" => TokenKind::Addon,
            "signer" => TokenKind::Signer,
            "action" => TokenKind::Action,
            "output" => TokenKind::Output,
            "variable" => TokenKind::Variable,
            "input" => TokenKind::Input,
            "import" => TokenKind::Import,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => return None,
        };
        Some(kind)
    }

    /// Human readable name used in diagnostics
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Addon => "`addon`",
            TokenKind::Signer => "`signer`",
            TokenKind::Action => "`action`",
            TokenKind::Output => "`output`",
            TokenKind::Variable => "`variable`",
            TokenKind::Input => "`input`",
            TokenKind::Import => "`import`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Null => "`null`",
            TokenKind::Equals => "`=`",
            TokenKind::OpenBrace => "`{`",
            TokenKind::CloseBrace => "`}`",
            TokenKind::DoubleQuote => "`\"`",
            TokenKind::SingleQuote => "`'`",
            TokenKind::TripleQuote => "`\"\"\"`",
            TokenKind::OpenBracket => "`[`",
            TokenKind::Comma => "`,`",
            TokenKind::CloseBracket => "`]`",
            TokenKind::Colon => "`:`",
            TokenKind::Dot => "`.`",
            TokenKind::OpenParen => "`(`",
            TokenKind::CloseParen => "`)`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Identifier => "identifier",
            TokenKind::StringContent => "string content",
            TokenKind::HexNumber | TokenKind::Integer | TokenKind::Float => "number",
            TokenKind::LineComment | TokenKind::BlockComment => "comment",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Error => "illegal character",
            TokenKind::Eof => "end of input",
        }
    }
}

/// Which delimiter opened the string the cursor is inside of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StringStyle {
    Double,
    Single,
    Triple,
}

impl StringStyle {
    pub fn delimiter(self) -> &'static str {
        match self {
            StringStyle::Double => "\"",
            StringStyle::Single => "'",
            StringStyle::Triple => "\"\"\"",
        }
    }

    pub fn token(self) -> TokenKind {
        match self {
            StringStyle::Double => TokenKind::DoubleQuote,
            StringStyle::Single => TokenKind::SingleQuote,
            StringStyle::Triple => TokenKind::TripleQuote,
        }
    }

    pub fn from_token(kind: TokenKind) -> Option<StringStyle> {
        match kind {
            TokenKind::DoubleQuote => Some(StringStyle::Double),
            TokenKind::SingleQuote => Some(StringStyle::Single),
            TokenKind::TripleQuote => Some(StringStyle::Triple),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// 1-based line of the first byte
    pub line: u32,
    /// 1-based byte column of the first byte
    pub column: u32,
    /// Lexical error carried by this token, if any
    pub error: Option<DiagnosticKind>,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

/// Resumable lexer position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    offset: u32,
    line: u32,
    column: u32,
    in_string: Option<StringStyle>,
}

impl Cursor {
    /// Cursor at the start of a buffer
    pub const fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
            in_string: None,
        }
    }

    /// Cursor outside any string at `offset`, moved forward to the next
    /// character boundary if needed
    pub fn at(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset += 1;
        }
        let before = &source.as_bytes()[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        Self {
            offset: offset as u32,
            line,
            column: (offset - line_start) as u32 + 1,
            in_string: None,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn in_string(&self) -> Option<StringStyle> {
        self.in_string
    }

    fn advanced(self, bytes: &[u8]) -> Self {
        let mut next = self;
        for &b in bytes {
            if b == b'\n' {
                next.line += 1;
                next.column = 1;
            } else {
                next.column += 1;
            }
        }
        next.offset += bytes.len() as u32;
        next
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::start()
    }
}

/// Lex one token starting at `cursor`.
///
/// Never fails: unrecognized input becomes an `Error` token, unterminated
/// strings and comments become content tokens running to the end of input
/// with `error` set. At end of input an empty `Eof` token is returned and
/// the cursor does not move.
pub fn next_token(source: &str, cursor: Cursor) -> (Token, Cursor) {
    let bytes = source.as_bytes();
    let start = (cursor.offset as usize).min(bytes.len());

    if let Some(style) = cursor.in_string {
        return lex_string_body(source, cursor, style);
    }

    if start >= bytes.len() {
        let token = make_token(TokenKind::Eof, cursor, start, start, None);
        return (token, cursor);
    }

    let rest = &bytes[start..];
    let (kind, len, error, in_string) = match rest[0] {
        b' ' | b'\t' | b'\r' | b'\n' => {
            let len = rest
                .iter()
                .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
                .count();
            (TokenKind::Whitespace, len, None, None)
        }
        b'#' => (TokenKind::LineComment, line_comment_len(rest), None, None),
        b'/' => match rest.get(1) {
            Some(b'/') => (TokenKind::LineComment, line_comment_len(rest), None, None),
            Some(b'*') => {
                let (len, closed) = block_comment_len(rest);
                let error = (!closed).then_some(DiagnosticKind::UnterminatedComment);
                (TokenKind::BlockComment, len, error, None)
            }
            _ => (TokenKind::Slash, 1, None, None),
        },
        b'"' if rest.starts_with(b"\"\"\"") => (
            TokenKind::TripleQuote,
            3,
            None,
            Some(StringStyle::Triple),
        ),
        b'"' => (TokenKind::DoubleQuote, 1, None, Some(StringStyle::Double)),
        b'\'' => (TokenKind::SingleQuote, 1, None, Some(StringStyle::Single)),
        b'0' if rest.get(1) == Some(&b'x') && rest.get(2).is_some_and(u8::is_ascii_hexdigit) => {
            let digits = rest[2..].iter().take_while(|b| b.is_ascii_hexdigit()).count();
            (TokenKind::HexNumber, 2 + digits, None, None)
        }
        b'0'..=b'9' => {
            let int_len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
            let fraction = rest.get(int_len) == Some(&b'.')
                && rest.get(int_len + 1).is_some_and(u8::is_ascii_digit);
            if fraction {
                let frac_len = rest[int_len + 1..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                (TokenKind::Float, int_len + 1 + frac_len, None, None)
            } else {
                (TokenKind::Integer, int_len, None, None)
            }
        }
        b if is_ident_start(b) => {
            let len = rest.iter().take_while(|&&b| is_ident_continue(b)).count();
            let text = &source[start..start + len];
            let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Identifier);
            (kind, len, None, None)
        }
        b'=' => (TokenKind::Equals, 1, None, None),
        b'{' => (TokenKind::OpenBrace, 1, None, None),
        b'}' => (TokenKind::CloseBrace, 1, None, None),
        b'[' => (TokenKind::OpenBracket, 1, None, None),
        b',' => (TokenKind::Comma, 1, None, None),
        b']' => (TokenKind::CloseBracket, 1, None, None),
        b':' => (TokenKind::Colon, 1, None, None),
        b'.' => (TokenKind::Dot, 1, None, None),
        b'(' => (TokenKind::OpenParen, 1, None, None),
        b')' => (TokenKind::CloseParen, 1, None, None),
        b'*' => (TokenKind::Star, 1, None, None),
        b'+' => (TokenKind::Plus, 1, None, None),
        b'-' => (TokenKind::Minus, 1, None, None),
        b => (
            TokenKind::Error,
            utf8_len(b).min(rest.len()),
            Some(DiagnosticKind::IllegalCharacter),
            None,
        ),
    };

    let end = start + len;
    let token = make_token(kind, cursor, start, end, error);
    let mut next = cursor.advanced(&bytes[start..end]);
    next.in_string = in_string;
    (token, next)
}

fn lex_string_body(source: &str, cursor: Cursor, style: StringStyle) -> (Token, Cursor) {
    let bytes = source.as_bytes();
    let start = (cursor.offset as usize).min(bytes.len());
    let delimiter = style.delimiter().as_bytes();
    let rest = &bytes[start..];

    if rest.starts_with(delimiter) {
        let end = start + delimiter.len();
        let token = make_token(style.token(), cursor, start, end, None);
        let mut next = cursor.advanced(&bytes[start..end]);
        next.in_string = None;
        return (token, next);
    }

    // content runs to the closing delimiter; no escapes are recognized
    let (len, error) = match find(rest, delimiter) {
        Some(len) => (len, None),
        None => (rest.len(), Some(DiagnosticKind::UnterminatedString)),
    };
    let end = start + len;
    let token = make_token(TokenKind::StringContent, cursor, start, end, error);
    let mut next = cursor.advanced(&bytes[start..end]);
    // an unterminated string forces end of input, so drop the string state
    next.in_string = if error.is_some() { None } else { Some(style) };
    (token, next)
}

fn make_token(
    kind: TokenKind,
    cursor: Cursor,
    start: usize,
    end: usize,
    error: Option<DiagnosticKind>,
) -> Token {
    Token {
        kind,
        span: Span::new(start as u32, end as u32),
        line: cursor.line,
        column: cursor.column,
        error,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn line_comment_len(rest: &[u8]) -> usize {
    rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len())
}

/// Length of a nested block comment and whether it was closed
fn block_comment_len(rest: &[u8]) -> (usize, bool) {
    let mut depth = 0usize;
    let mut i = 0;
    while i < rest.len() {
        if rest[i..].starts_with(b"/*") {
            depth += 1;
            i += 2;
        } else if rest[i..].starts_with(b"*/") {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return (i, true);
            }
        } else {
            i += 1;
        }
    }
    (rest.len(), false)
}

fn utf8_len(first: u8) -> usize {
    match first {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Lazy token iterator over a buffer, ending after the single `Eof` token
pub struct Lexer<'a> {
    source: &'a str,
    cursor: Cursor,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: Cursor::start(),
            done: false,
        }
    }

    /// Resume lexing from a cursor previously returned by `next_token`
    pub fn resume(source: &'a str, cursor: Cursor) -> Self {
        Self {
            source,
            cursor,
            done: false,
        }
    }

    pub fn tokenize(self) -> Vec<Token> {
        self.collect()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let (token, cursor) = next_token(self.source, self.cursor);
        self.cursor = cursor;
        self.done = token.kind == TokenKind::Eof;
        Some(token)
    }
}
