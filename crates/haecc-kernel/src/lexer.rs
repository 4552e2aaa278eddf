//! Lexer for haeccstable source lines.
//!
//! Converts source text into a stream of tokens using the logos lexer generator.
//! Every token carries its byte span and a 1-based line/column position so that
//! errors can point at the offending character.
//!
//! # Token Categories
//!
//! - **Keywords**: declaration kinds (`video_invar`, `layer_obj`, `var`, ...),
//!   `func`, `process`, `return`
//! - **Literals**: strings (either quote style), integers, floats
//! - **Identifiers**: plain names and `$`-prefixed process names
//! - **Punctuation**: `= ( ) { } , . ; + - * /`

use std::fmt;
use std::ops::Range;

use logos::Logos;
use thiserror::Error;

/// A token with its location in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Range<usize>,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Range<usize>, line: usize, column: usize) -> Self {
        Self {
            token,
            span,
            line,
            column,
        }
    }
}

/// What went wrong while lexing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexErrorKind {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
    /// `$` not followed by a letter or underscore.
    InvalidProcessIdent,
    InvalidNumber,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexErrorKind::UnexpectedCharacter => write!(f, "unexpected character"),
            LexErrorKind::UnterminatedString => write!(f, "unterminated string"),
            LexErrorKind::InvalidProcessIdent => {
                write!(f, "'$' must be followed by a process name")
            }
            LexErrorKind::InvalidNumber => write!(f, "invalid number"),
        }
    }
}

/// A lexing failure with its position.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{detail} at line {line}, column {column}")]
pub struct LexError {
    pub kind: LexErrorKind,
    /// Kind plus the offending text, when there is any worth showing.
    pub detail: String,
    pub line: usize,
    pub column: usize,
}

/// Tokens produced by the lexer.
///
/// Keywords are listed before `Ident`; logos prefers the exact token when both
/// match the same text, and the longer identifier when a keyword is only a prefix.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // ═══════════════════════════════════════════════════════════════════
    // Keywords
    // ═══════════════════════════════════════════════════════════════════
    #[token("video_invar")]
    VideoInvar,

    #[token("video_outvar")]
    VideoOutvar,

    #[token("audio_invar")]
    AudioInvar,

    #[token("audio_outvar")]
    AudioOutvar,

    #[token("number_var")]
    NumberVar,

    #[token("window_var")]
    WindowVar,

    #[token("layer_obj")]
    LayerObj,

    #[token("buffer_obj")]
    BufferObj,

    #[token("var")]
    Var,

    #[token("func")]
    #[token("function")]
    Func,

    #[token("process")]
    Process,

    #[token("return")]
    Return,

    // ═══════════════════════════════════════════════════════════════════
    // Punctuation
    // ═══════════════════════════════════════════════════════════════════
    #[token("=")]
    Eq,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token(";")]
    Semi,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    // ═══════════════════════════════════════════════════════════════════
    // Literals and identifiers
    // ═══════════════════════════════════════════════════════════════════
    /// String in either quote style, quotes removed and escapes processed.
    #[regex(r#""([^"\\\n]|\\.)*""#, lex_string)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, lex_string)]
    String(String),

    /// A quote with no closing partner on the same line.
    /// The callback always fails, so this variant is never produced.
    #[regex(r#""([^"\\\n]|\\.)*\\?"#, lex_unterminated_string)]
    #[regex(r#"'([^'\\\n]|\\.)*\\?"#, lex_unterminated_string)]
    UnterminatedString,

    /// Float: digits on both sides of the dot. `5.` lexes as `Int(5) Dot`.
    #[regex(r"[0-9]+\.[0-9]+", lex_float)]
    Float(f64),

    #[regex(r"[0-9]+", lex_int)]
    Int(i64),

    /// Process identifier, always including its leading `$`.
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*", lex_process_ident)]
    ProcessIdent(String),

    /// A `$` that does not start a process name.
    /// The callback always fails, so this variant is never produced.
    #[token("$", lex_bare_dollar)]
    BareDollar,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", lex_ident)]
    Ident(String),

    // ═══════════════════════════════════════════════════════════════════
    // Comments (skipped)
    // ═══════════════════════════════════════════════════════════════════
    #[regex(r"#[^\n]*", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    Comment,

    /// End of input. Synthesized by [`tokenize`], never matched.
    Eof,
}

impl Token {
    /// True for the keywords that start a variable, layer or buffer declaration.
    pub fn is_declaration_keyword(&self) -> bool {
        matches!(
            self,
            Token::VideoInvar
                | Token::VideoOutvar
                | Token::AudioInvar
                | Token::AudioOutvar
                | Token::NumberVar
                | Token::WindowVar
                | Token::LayerObj
                | Token::BufferObj
                | Token::Var
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::VideoInvar => write!(f, "video_invar"),
            Token::VideoOutvar => write!(f, "video_outvar"),
            Token::AudioInvar => write!(f, "audio_invar"),
            Token::AudioOutvar => write!(f, "audio_outvar"),
            Token::NumberVar => write!(f, "number_var"),
            Token::WindowVar => write!(f, "window_var"),
            Token::LayerObj => write!(f, "layer_obj"),
            Token::BufferObj => write!(f, "buffer_obj"),
            Token::Var => write!(f, "var"),
            Token::Func => write!(f, "func"),
            Token::Process => write!(f, "process"),
            Token::Return => write!(f, "return"),
            Token::Eq => write!(f, "'='"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::Comma => write!(f, "','"),
            Token::Dot => write!(f, "'.'"),
            Token::Semi => write!(f, "';'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::String(s) => write!(f, "string {s:?}"),
            Token::Float(x) => write!(f, "number {x}"),
            Token::Int(n) => write!(f, "number {n}"),
            Token::ProcessIdent(name) => write!(f, "'{name}'"),
            Token::Ident(name) => write!(f, "'{name}'"),
            Token::UnterminatedString | Token::BareDollar | Token::Comment => {
                write!(f, "invalid token")
            }
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Lex a quoted string literal, stripping quotes and processing escapes.
fn lex_string(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    unescape(&s[1..s.len() - 1])
}

fn lex_unterminated_string(_lex: &mut logos::Lexer<Token>) -> Result<(), LexErrorKind> {
    Err(LexErrorKind::UnterminatedString)
}

fn lex_int(lex: &mut logos::Lexer<Token>) -> Result<i64, LexErrorKind> {
    lex.slice().parse().map_err(|_| LexErrorKind::InvalidNumber)
}

fn lex_float(lex: &mut logos::Lexer<Token>) -> Result<f64, LexErrorKind> {
    lex.slice().parse().map_err(|_| LexErrorKind::InvalidNumber)
}

fn lex_process_ident(lex: &mut logos::Lexer<Token>) -> String {
    lex.slice().to_string()
}

fn lex_bare_dollar(_lex: &mut logos::Lexer<Token>) -> Result<(), LexErrorKind> {
    Err(LexErrorKind::InvalidProcessIdent)
}

fn lex_ident(lex: &mut logos::Lexer<Token>) -> String {
    lex.slice().to_string()
}

/// Process escapes: `\n`, `\t`, `\\` and escaped quotes.
/// Any other escaped character is kept without its backslash.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Maps byte offsets to 1-based line/column pairs.
struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line - 1];
        let column = self
            .source
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        (line, column + 1)
    }
}

/// Tokenize source text.
///
/// The returned stream always ends with [`Token::Eof`]. Lexing stops at the
/// first error.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, LexError> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();

    for (result, span) in Token::lexer(source).spanned() {
        let (line, column) = index.position(span.start);
        match result {
            Ok(token) => tokens.push(Spanned::new(token, span, line, column)),
            Err(kind) => {
                let text = &source[span.clone()];
                let detail = match kind {
                    LexErrorKind::UnexpectedCharacter => {
                        format!("{kind} '{}'", text.chars().next().unwrap_or(' '))
                    }
                    _ => kind.to_string(),
                };
                return Err(LexError {
                    kind,
                    detail,
                    line,
                    column,
                });
            }
        }
    }

    let (line, column) = index.position(source.len());
    tokens.push(Spanned::new(
        Token::Eof,
        source.len()..source.len(),
        line,
        column,
    ));
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("lexer should succeed")
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Keyword tests
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn keywords() {
        assert_eq!(lex("video_invar"), vec![Token::VideoInvar, Token::Eof]);
        assert_eq!(lex("window_var"), vec![Token::WindowVar, Token::Eof]);
        assert_eq!(lex("func"), vec![Token::Func, Token::Eof]);
        assert_eq!(lex("function"), vec![Token::Func, Token::Eof]);
        assert_eq!(lex("return"), vec![Token::Return, Token::Eof]);
    }

    #[test]
    fn keywords_are_whole_words() {
        assert_eq!(lex("variable"), vec![Token::Ident("variable".into()), Token::Eof]);
        assert_eq!(lex("var_x"), vec![Token::Ident("var_x".into()), Token::Eof]);
        assert_eq!(lex("processes"), vec![Token::Ident("processes".into()), Token::Eof]);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Literal tests
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn numbers() {
        assert_eq!(lex("42"), vec![Token::Int(42), Token::Eof]);
        assert_eq!(lex("2.5"), vec![Token::Float(2.5), Token::Eof]);
    }

    #[test]
    fn trailing_dot_is_not_consumed() {
        assert_eq!(lex("5."), vec![Token::Int(5), Token::Dot, Token::Eof]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            lex(r#""a\nb\t\"c\" \\ \q""#),
            vec![Token::String("a\nb\t\"c\" \\ q".into()), Token::Eof]
        );
        assert_eq!(lex(r"'it\'s'"), vec![Token::String("it's".into()), Token::Eof]);
    }

    #[test]
    fn unterminated_string() {
        let err = tokenize(r#"print("oops)"#).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.column, 7);
    }

    #[test]
    fn process_ident_keeps_sigil() {
        assert_eq!(
            lex("$spin(1)"),
            vec![
                Token::ProcessIdent("$spin".into()),
                Token::LParen,
                Token::Int(1),
                Token::RParen,
                Token::Eof
            ]
        );
    }

    #[test]
    fn bare_dollar_is_an_error() {
        let err = tokenize("$1").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::InvalidProcessIdent);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(lex("x # trailing"), vec![Token::Ident("x".into()), Token::Eof]);
        assert_eq!(lex("// whole line"), vec![Token::Eof]);
        assert_eq!(lex("a / b"), vec![
            Token::Ident("a".into()),
            Token::Slash,
            Token::Ident("b".into()),
            Token::Eof
        ]);
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = tokenize("var x\n  = 1").unwrap();
        let eq = &tokens[2];
        assert_eq!(eq.token, Token::Eq);
        assert_eq!((eq.line, eq.column), (2, 3));
    }

    #[test]
    fn unexpected_character_reports_position() {
        let err = tokenize("var x = @").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter);
        assert_eq!((err.line, err.column), (1, 9));
        assert!(err.to_string().contains("'@'"));
    }
}
