//! Parser for haeccstable source lines.
//!
//! Transforms a token stream from the lexer into a [`ParseResult`]. The
//! statement shape is chosen by an explicit match on the first one or two
//! tokens; chumsky combinators then parse the chosen shape. Choosing the shape
//! up front keeps error messages specific: a `process` without a `$` name is
//! rejected before any parameter is read.

use chumsky::error::RichReason;
use chumsky::{input::ValueInput, prelude::*};
use std::path::PathBuf;

use crate::ast::{Args, DeclKind, Expr, NamedArg, ParseResult, PrintVariant, VarKind};
use crate::lexer::{self, Spanned, Token};

/// Span type used throughout the parser.
pub type Span = SimpleSpan;

/// Statement shapes, chosen from the leading tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Declaration,
    Function,
    Process,
    Member,
    Print,
    Call,
    ProcessCall,
}

/// Parse one line of source.
///
/// `import <path>` is recognized on the raw text, since paths are not
/// tokens. Lexer failures come back as [`ParseResult::ParseError`].
pub fn parse_line(source: &str) -> ParseResult {
    let trimmed = source.trim();
    if let Some(rest) = trimmed.strip_prefix("import") {
        if rest.is_empty() {
            return ParseResult::error("import requires a path");
        }
        if rest.starts_with(char::is_whitespace) {
            let path = rest.trim().trim_end_matches(';').trim();
            let path = path.trim_matches(|c| c == '"' || c == '\'');
            return ParseResult::Import {
                path: PathBuf::from(path),
            };
        }
    }

    match lexer::tokenize(source) {
        Ok(tokens) => parse(&tokens),
        Err(e) => ParseResult::error(format!("Lexer error: {e}")),
    }
}

/// Parse a token stream ending in [`Token::Eof`].
pub fn parse(tokens: &[Spanned<Token>]) -> ParseResult {
    let shape = match classify(tokens) {
        Ok(shape) => shape,
        Err(result) => return result,
    };

    // Convert tokens to (Token, SimpleSpan) pairs, dropping the synthesized Eof
    let end = tokens.last().map(|t| t.span.start).unwrap_or(0);
    let pairs: Vec<(Token, Span)> = tokens
        .iter()
        .filter(|t| t.token != Token::Eof)
        .map(|t| (t.token.clone(), (t.span.start..t.span.end).into()))
        .collect();
    let end_span: Span = (end..end).into();

    match run(shape, pairs.as_slice().map(end_span, |(t, s)| (t, s))) {
        Ok(result) => result,
        Err((offset, message)) => {
            let (line, column) = position_of(tokens, offset);
            ParseResult::error(format!(
                "Parse error at line {line}, column {column}: {message}"
            ))
        }
    }
}

/// Pick the statement shape from the leading tokens.
fn classify(tokens: &[Spanned<Token>]) -> Result<Shape, ParseResult> {
    let first = tokens.first().map(|t| &t.token).unwrap_or(&Token::Eof);
    let second = tokens.get(1).map(|t| &t.token).unwrap_or(&Token::Eof);

    match (first, second) {
        (Token::Eof, _) => Err(ParseResult::Empty),
        (token, _) if token.is_declaration_keyword() => Ok(Shape::Declaration),
        (Token::Func, _) => Ok(Shape::Function),
        (Token::Process, Token::Ident(name)) => Err(ParseResult::error(format!(
            "Process names must start with '$'. Did you mean '${name}'?"
        ))),
        (Token::Process, _) => Ok(Shape::Process),
        (Token::Ident(_), Token::Dot) => Ok(Shape::Member),
        (Token::Ident(name), Token::LParen) if name == "print" || name == "println" => {
            Ok(Shape::Print)
        }
        (Token::Ident(_), Token::LParen) => Ok(Shape::Call),
        (Token::ProcessIdent(_), Token::LParen) => Ok(Shape::ProcessCall),
        (token, _) => {
            let (line, column) = tokens
                .first()
                .map(|t| (t.line, t.column))
                .unwrap_or((1, 1));
            Err(ParseResult::error(format!(
                "Unexpected {token} at line {line}, column {column}"
            )))
        }
    }
}

/// Run the parser for `shape` over the whole input.
///
/// Errors come back as the byte offset of the first failure and a message.
fn run<'tokens, I>(shape: Shape, input: I) -> Result<ParseResult, (usize, String)>
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let parser = match shape {
        Shape::Declaration => declaration_parser::<I>().boxed(),
        Shape::Function => function_parser::<I>().boxed(),
        Shape::Process => process_parser::<I>().boxed(),
        Shape::Member => member_parser::<I>().boxed(),
        Shape::Print => print_parser::<I>().boxed(),
        Shape::Call => call_parser::<I>().boxed(),
        Shape::ProcessCall => process_call_parser::<I>().boxed(),
    };

    parser
        .then_ignore(just(Token::Semi).or_not())
        .then_ignore(end())
        .parse(input)
        .into_result()
        .map_err(|errs| {
            errs.first()
                .map(|e| (e.span().start, describe(e)))
                .unwrap_or_else(|| (0, "invalid statement".to_string()))
        })
}

/// Human-readable text for a chumsky error.
fn describe(err: &Rich<'_, Token, Span>) -> String {
    if let RichReason::Custom(message) = err.reason() {
        return message.to_string();
    }

    let found = err
        .found()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "end of input".to_string());
    let mut expected: Vec<String> = err.expected().map(|p| p.to_string()).collect();
    expected.sort();
    expected.dedup();

    if expected.is_empty() {
        format!("unexpected {found}")
    } else {
        format!("unexpected {found}, expected {}", expected.join(" or "))
    }
}

/// Line and column of the token starting at or after `offset`.
fn position_of(tokens: &[Spanned<Token>], offset: usize) -> (usize, usize) {
    tokens
        .iter()
        .find(|t| t.span.start >= offset)
        .or_else(|| tokens.last())
        .map(|t| (t.line, t.column))
        .unwrap_or((1, 1))
}

// ═══════════════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════════════

/// Declaration: `KIND name = expr`. Layers and buffers may omit `= expr`.
fn declaration_parser<'tokens, I>(
) -> impl Parser<'tokens, I, ParseResult, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let keyword = select! {
        Token::VideoInvar => DeclKind::Variable(VarKind::VideoIn),
        Token::VideoOutvar => DeclKind::Variable(VarKind::VideoOut),
        Token::AudioInvar => DeclKind::Variable(VarKind::AudioIn),
        Token::AudioOutvar => DeclKind::Variable(VarKind::AudioOut),
        Token::NumberVar => DeclKind::Variable(VarKind::Number),
        Token::WindowVar => DeclKind::Variable(VarKind::Window),
        Token::Var => DeclKind::Variable(VarKind::Generic),
        Token::LayerObj => DeclKind::Layer,
        Token::BufferObj => DeclKind::Buffer,
    };

    keyword
        .then(ident_parser())
        .then(just(Token::Eq).ignore_then(value_parser(expr_parser())).or_not())
        .try_map(|((var_kind, name), expr), span| match expr {
            Some(expr) => Ok(ParseResult::VariableDeclaration {
                var_kind,
                name,
                expr,
            }),
            None if var_kind.allows_bare() => Ok(ParseResult::VariableDeclaration {
                var_kind,
                name,
                expr: Expr::Unknown,
            }),
            None => Err(Rich::custom(span, format!("expected '=' after '{name}'"))),
        })
        .labelled("declaration")
        .boxed()
}

/// Function definition: `func name(a, b) = expr`
fn function_parser<'tokens, I>(
) -> impl Parser<'tokens, I, ParseResult, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    just(Token::Func)
        .ignore_then(ident_parser())
        .then(params_parser())
        .then_ignore(just(Token::Eq))
        .then(value_parser(expr_parser()))
        .map(|((name, params), expr)| ParseResult::FunctionDefinition { name, params, expr })
        .labelled("function definition")
        .boxed()
}

/// Process definition: `process $name(a, b) { ... return expr }`
///
/// Body tokens before `return` are skipped; only the returned expression is kept.
fn process_parser<'tokens, I>(
) -> impl Parser<'tokens, I, ParseResult, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let skipped = any()
        .filter(|t: &Token| !matches!(t, Token::Return | Token::RBrace))
        .repeated();
    let returned = just(Token::Return)
        .ignore_then(expr_parser())
        .then_ignore(just(Token::Semi).or_not());

    just(Token::Process)
        .ignore_then(select! { Token::ProcessIdent(name) => name }.labelled("process name"))
        .then(params_parser())
        .then(
            skipped
                .ignore_then(returned.or_not())
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .map(|((name, params), body)| ParseResult::ProcessDefinition { name, params, body })
        .labelled("process definition")
        .boxed()
}

/// What follows `object.member`.
#[derive(Debug, Clone)]
enum Member {
    Call(Args),
    Assign(Expr),
    Access,
}

/// Method call, property assignment or property access on `object.member`.
fn member_parser<'tokens, I>(
) -> impl Parser<'tokens, I, ParseResult, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let tail = choice((
        paren_args_parser().map(Member::Call),
        just(Token::Eq)
            .ignore_then(value_parser(expr_parser()))
            .map(Member::Assign),
        empty().to(Member::Access),
    ));

    ident_parser()
        .then_ignore(just(Token::Dot))
        .then(ident_parser())
        .then(tail)
        .map(|((object, member), tail)| match tail {
            Member::Call(args) => ParseResult::MethodCall {
                object,
                method: member,
                args,
            },
            Member::Assign(value) => ParseResult::PropertyAssignment {
                object,
                property: member,
                value,
            },
            Member::Access => ParseResult::PropertyAccess {
                object,
                property: member,
            },
        })
        .labelled("member expression")
        .boxed()
}

/// `print(args...)` / `println(args...)`, positional arguments only.
fn print_parser<'tokens, I>(
) -> impl Parser<'tokens, I, ParseResult, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let variant = ident_parser().map(|name| {
        if name == "println" {
            PrintVariant::Println
        } else {
            PrintVariant::Print
        }
    });

    variant
        .then(
            expr_parser()
                .separated_by(just(Token::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .map(|(variant, args)| ParseResult::PrintStatement { variant, args })
        .labelled("print statement")
        .boxed()
}

/// Function call: `name(args)`
fn call_parser<'tokens, I>(
) -> impl Parser<'tokens, I, ParseResult, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    ident_parser()
        .then(paren_args_parser())
        .map(|(name, args)| ParseResult::FunctionCall { name, args })
        .labelled("function call")
}

/// Process call: `$name(args)`
fn process_call_parser<'tokens, I>(
) -> impl Parser<'tokens, I, ParseResult, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! { Token::ProcessIdent(name) => name }
        .then(paren_args_parser())
        .map(|(process, args)| ParseResult::ProcessCall { process, args })
        .labelled("process call")
}

// ═══════════════════════════════════════════════════════════════════════════
// Expressions and arguments
// ═══════════════════════════════════════════════════════════════════════════

fn ident_parser<'tokens, I>(
) -> impl Parser<'tokens, I, String, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! { Token::Ident(name) => name }.labelled("identifier")
}

/// Parameter list: `(a, b, c)`
fn params_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Vec<String>, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    ident_parser()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .labelled("parameters")
}

/// Expression: literal, negative number, call, identifier or tuple.
fn expr_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let literal = select! {
            Token::Int(n) => Expr::int(n),
            Token::Float(x) => Expr::float(x),
            Token::String(s) => Expr::string(s),
        };

        let negative = just(Token::Minus).ignore_then(select! {
            Token::Int(n) => Expr::int(-n),
            Token::Float(x) => Expr::float(-x),
        });

        // Calls may name a process in expression position: `var x = $p(1)`
        let callee = select! {
            Token::Ident(name) => name,
            Token::ProcessIdent(name) => name,
        };
        let call = callee
            .then(
                args_parser(expr.clone())
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|(name, args)| Expr::Call { name, args });

        let identifier = ident_parser().map(Expr::Identifier);

        let tuple = expr
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(Expr::Tuple);

        choice((literal, negative, call, identifier, tuple))
            .labelled("expression")
            .boxed()
    })
}

/// Tokens that can begin an expression.
fn starts_expression(token: &Token) -> bool {
    matches!(
        token,
        Token::Int(_)
            | Token::Float(_)
            | Token::String(_)
            | Token::Ident(_)
            | Token::LParen
            | Token::Minus
    )
}

/// Tokens that end a value inside an argument list or statement.
fn ends_value(token: &Token) -> bool {
    matches!(token, Token::Comma | Token::RParen | Token::Semi)
}

/// A value position: a real expression, or [`Expr::Unknown`] when the tokens
/// there cannot start one (`var x = $p`, `var x =`).
fn value_parser<'tokens, I, E>(
    expr: E,
) -> impl Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token, Span>>> + Clone + 'tokens,
{
    let unknown = any()
        .filter(|t: &Token| !starts_expression(t) && !ends_value(t))
        .then_ignore(any().filter(|t: &Token| !ends_value(t)).repeated())
        .to(Expr::Unknown);

    expr.or(unknown).or(empty().to(Expr::Unknown))
}

/// One element of an argument list.
#[derive(Debug, Clone)]
enum ArgItem {
    Positional(Expr),
    Named(NamedArg),
}

/// Argument list contents. `ident = value` is always a named argument.
fn args_parser<'tokens, I, E>(
    expr: E,
) -> impl Parser<'tokens, I, Args, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    E: Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token, Span>>> + Clone + 'tokens,
{
    let named = ident_parser()
        .then_ignore(just(Token::Eq))
        .then(value_parser(expr.clone()))
        .map(|(name, value)| ArgItem::Named(NamedArg { name, value }));
    let positional = expr.map(ArgItem::Positional);

    choice((named, positional))
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .map(|items| {
            let mut args = Args::default();
            for item in items {
                match item {
                    ArgItem::Positional(expr) => args.positional.push(expr),
                    ArgItem::Named(arg) => args.named.push(arg),
                }
            }
            args
        })
        .labelled("arguments")
}

/// Parenthesized argument list.
fn paren_args_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Args, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    args_parser(expr_parser()).delimited_by(just(Token::LParen), just(Token::RParen))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Value;

    #[test]
    fn parses_declaration() {
        let result = parse_line("video_invar webcam = capture(0)");
        assert_eq!(
            result,
            ParseResult::VariableDeclaration {
                var_kind: DeclKind::Variable(VarKind::VideoIn),
                name: "webcam".into(),
                expr: Expr::Call {
                    name: "capture".into(),
                    args: Args::positional(vec![Expr::int(0)]),
                },
            }
        );
    }

    #[test]
    fn process_without_sigil_suggests_dollar() {
        match parse_line("process foo(x) { return x }") {
            ParseResult::ParseError { message } => {
                assert!(message.contains("$foo"), "message: {message}");
                assert!(message.contains("must start with '$'"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn process_with_sigil() {
        assert_eq!(
            parse_line("process $foo(x) { return x }"),
            ParseResult::ProcessDefinition {
                name: "$foo".into(),
                params: vec!["x".into()],
                body: Some(Expr::ident("x")),
            }
        );
    }

    #[test]
    fn one_tuple_stays_tuple() {
        match parse_line("var t = (5)") {
            ParseResult::VariableDeclaration { expr, .. } => {
                assert_eq!(expr, Expr::Tuple(vec![Expr::int(5)]));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse_line(""), ParseResult::Empty);
        assert_eq!(parse_line("   # just a comment"), ParseResult::Empty);
    }

    #[test]
    fn errors_carry_position() {
        match parse_line("var x = 1 2") {
            ParseResult::ParseError { message } => {
                assert!(message.contains("column 11"), "message: {message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn negative_literals() {
        match parse_line("main.transform(-10, 2.5)") {
            ParseResult::MethodCall { args, .. } => {
                assert_eq!(args.positional, vec![Expr::int(-10), Expr::float(2.5)]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_value_when_no_expression_starts() {
        match parse_line("var p = $spin") {
            ParseResult::VariableDeclaration { expr, .. } => assert_eq!(expr, Expr::Unknown),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn string_literal_argument() {
        match parse_line(r#"print("hi")"#) {
            ParseResult::PrintStatement { args, .. } => {
                assert_eq!(args, vec![Expr::Literal(Value::String("hi".into()))]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
