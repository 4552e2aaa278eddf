//! `print` / `println` formatting.
//!
//! Three modes, tried in order:
//!
//! 1. printf-style when the first argument is a string with `%d %i %s %f %.Nf %%`
//! 2. positional `{}` substitution when the first argument is a string with `{}`
//! 3. otherwise every argument joined by single spaces

use std::sync::LazyLock;

use regex::{Captures, Regex};

use haecc_types::{Expr, Value};

use super::resolve_literal;
use crate::store::EntityStore;

/// Digits past this carry nothing an `f64` can hold.
const MAX_PRECISION: usize = 17;

static PRINTF_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%(?:\.(\d+))?([disf%])").expect("printf directive regex is valid")
});

/// Format print arguments into one output line.
pub fn format_print(args: &[Expr], store: &EntityStore) -> String {
    let Some((first, rest)) = args.split_first() else {
        return String::new();
    };

    if let Expr::Literal(Value::String(template)) = first {
        if PRINTF_SPEC.is_match(template) {
            return printf(template, rest, store);
        }
        if template.contains("{}") {
            return braces(template, rest, store);
        }
    }

    args.iter()
        .map(|a| render(a, store))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of one argument. Number variables print their value, other
/// identifiers print their name.
fn render(expr: &Expr, store: &EntityStore) -> String {
    match resolve_literal(expr, store) {
        Some(value) => value.to_string(),
        None => expr.to_string(),
    }
}

fn printf(template: &str, args: &[Expr], store: &EntityStore) -> String {
    let mut args = args.iter();
    PRINTF_SPEC
        .replace_all(template, |caps: &Captures| {
            let conversion = &caps[2];
            if conversion == "%" {
                return "%".to_string();
            }
            let Some(arg) = args.next() else {
                // Not enough arguments: leave the specifier as written
                return caps[0].to_string();
            };
            let number = resolve_literal(arg, store).and_then(Value::as_f64);
            match (conversion, number) {
                ("d" | "i", Some(n)) => format!("{}", n.trunc() as i64),
                ("f", Some(n)) => {
                    let precision = caps
                        .get(1)
                        .map(|p| p.as_str().parse().unwrap_or(usize::MAX).min(MAX_PRECISION))
                        .unwrap_or(6);
                    format!("{n:.precision$}")
                }
                _ => render(arg, store),
            }
        })
        .into_owned()
}

fn braces(template: &str, args: &[Expr], store: &EntityStore) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut pieces = template.split("{}").peekable();
    while let Some(piece) = pieces.next() {
        out.push_str(piece);
        if pieces.peek().is_some() {
            match args.next() {
                Some(arg) => out.push_str(&render(arg, store)),
                None => out.push_str("{}"),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use crate::ast::ParseResult;
    use rstest::rstest;

    fn print(line: &str) -> String {
        print_with(&EntityStore::new(), line)
    }

    fn print_with(store: &EntityStore, line: &str) -> String {
        match parse_line(line) {
            ParseResult::PrintStatement { args, .. } => format_print(&args, store),
            other => panic!("not a print statement: {other:?}"),
        }
    }

    #[rstest]
    #[case::printf_int(r#"print("x = %d", 42)"#, "x = 42")]
    #[case::braces(r#"print("a={}, b={}", 1, 2)"#, "a=1, b=2")]
    #[case::join(r#"print("no placeholders", 1, 2)"#, "no placeholders 1 2")]
    #[case::precision(r#"println("%.2f fps", 29.971)"#, "29.97 fps")]
    #[case::default_float(r#"print("%f", 1)"#, "1.000000")]
    #[case::percent(r#"print("100%% done %s", "now")"#, "100% done now")]
    #[case::missing_arg(r#"print("%d and %d", 1)"#, "1 and %d")]
    #[case::missing_brace_arg(r#"print("{} {}", 1)"#, "1 {}")]
    #[case::precision_capped(r#"print("%.999999999f", 1)"#, "1.00000000000000000")]
    #[case::precision_overflow(r#"print("%.99999999999999999999999f", 0.5)"#, "0.50000000000000000")]
    #[case::empty("print()", "")]
    #[case::identifier("print(webcam)", "webcam")]
    fn formats(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(print(line), expected);
    }

    #[test]
    fn number_variables_print_their_value() {
        let mut store = EntityStore::new();
        crate::interpreter::evaluate(&parse_line("number_var speed = 3"), &mut store);
        assert_eq!(print_with(&store, r#"print("speed = %d", speed)"#), "speed = 3");
        assert_eq!(print_with(&store, "print(speed, 4)"), "3 4");
    }
}
