//! Lexer tests using rstest for parameterization.

use haecc_kernel::lexer::{tokenize, LexErrorKind, Token};
use rstest::rstest;

/// Tokens of `source` without the trailing Eof.
fn tokens(source: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = tokenize(source)
        .expect("lexing should succeed")
        .into_iter()
        .map(|t| t.token)
        .collect();
    assert_eq!(tokens.pop(), Some(Token::Eof));
    tokens
}

fn ident(name: &str) -> Token {
    Token::Ident(name.to_string())
}

#[rstest]
#[case("video_invar", Token::VideoInvar)]
#[case("video_outvar", Token::VideoOutvar)]
#[case("audio_invar", Token::AudioInvar)]
#[case("audio_outvar", Token::AudioOutvar)]
#[case("number_var", Token::NumberVar)]
#[case("window_var", Token::WindowVar)]
#[case("layer_obj", Token::LayerObj)]
#[case("buffer_obj", Token::BufferObj)]
#[case("var", Token::Var)]
#[case("func", Token::Func)]
#[case("function", Token::Func)]
#[case("process", Token::Process)]
#[case("return", Token::Return)]
fn keywords(#[case] source: &str, #[case] expected: Token) {
    assert_eq!(tokens(source), vec![expected]);
}

#[rstest]
#[case("variable")]
#[case("vars")]
#[case("layer_object")]
#[case("processes")]
#[case("_var")]
#[case("returned")]
fn keyword_prefixes_are_identifiers(#[case] source: &str) {
    assert_eq!(tokens(source), vec![ident(source)]);
}

#[rstest]
#[case("42", Token::Int(42))]
#[case("0", Token::Int(0))]
#[case("3.14", Token::Float(3.14))]
#[case("10.0", Token::Float(10.0))]
fn numbers(#[case] source: &str, #[case] expected: Token) {
    assert_eq!(tokens(source), vec![expected]);
}

#[test]
fn trailing_dot_is_not_a_float() {
    assert_eq!(tokens("5."), vec![Token::Int(5), Token::Dot]);
}

#[test]
fn minus_is_its_own_token() {
    assert_eq!(tokens("-3"), vec![Token::Minus, Token::Int(3)]);
}

#[rstest]
#[case(r#""hello""#, "hello")]
#[case(r#"'single'"#, "single")]
#[case(r#""a\nb""#, "a\nb")]
#[case(r#""tab\there""#, "tab\there")]
#[case(r#""say \"hi\"""#, "say \"hi\"")]
#[case(r#"'it\'s'"#, "it's")]
#[case(r#""back\\slash""#, "back\\slash")]
#[case(r#""""#, "")]
fn strings(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(tokens(source), vec![Token::String(expected.to_string())]);
}

#[test]
fn full_declaration() {
    assert_eq!(
        tokens("video_invar webcam = capture(0);"),
        vec![
            Token::VideoInvar,
            ident("webcam"),
            Token::Eq,
            ident("capture"),
            Token::LParen,
            Token::Int(0),
            Token::RParen,
            Token::Semi,
        ]
    );
}

#[test]
fn process_definition() {
    assert_eq!(
        tokens("process $spin(speed) { return rotate(speed) }"),
        vec![
            Token::Process,
            Token::ProcessIdent("$spin".into()),
            Token::LParen,
            ident("speed"),
            Token::RParen,
            Token::LBrace,
            Token::Return,
            ident("rotate"),
            Token::LParen,
            ident("speed"),
            Token::RParen,
            Token::RBrace,
        ]
    );
}

#[rstest]
#[case("+ - * /", vec![Token::Plus, Token::Minus, Token::Star, Token::Slash])]
#[case("{ } ( ) , . ; =", vec![
    Token::LBrace, Token::RBrace, Token::LParen, Token::RParen,
    Token::Comma, Token::Dot, Token::Semi, Token::Eq,
])]
fn punctuation(#[case] source: &str, #[case] expected: Vec<Token>) {
    assert_eq!(tokens(source), expected);
}

#[rstest]
#[case("var x = 1 # trailing comment")]
#[case("var x = 1 // trailing comment")]
fn comments_are_skipped(#[case] source: &str) {
    assert_eq!(
        tokens(source),
        vec![Token::Var, ident("x"), Token::Eq, Token::Int(1)]
    );
}

#[test]
fn multi_line_positions() {
    let spanned = tokenize("var a = 1\n  var b = 2").unwrap();
    let b = spanned.iter().find(|t| t.token == ident("b")).unwrap();
    assert_eq!((b.line, b.column), (2, 7));
}

#[rstest]
#[case(r#"print("oops)"#, LexErrorKind::UnterminatedString, 1, 7)]
#[case("var x = $", LexErrorKind::InvalidProcessIdent, 1, 9)]
#[case("var x = $1", LexErrorKind::InvalidProcessIdent, 1, 9)]
#[case("var x = @", LexErrorKind::UnexpectedCharacter, 1, 9)]
#[case("var a = 1\nvar b = ~", LexErrorKind::UnexpectedCharacter, 2, 9)]
fn errors(
    #[case] source: &str,
    #[case] kind: LexErrorKind,
    #[case] line: usize,
    #[case] column: usize,
) {
    let err = tokenize(source).unwrap_err();
    assert_eq!(err.kind, kind);
    assert_eq!((err.line, err.column), (line, column));
}
