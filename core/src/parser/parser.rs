use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use super::ast::{Block, Expr, ExprKind, FunctionDecl, Param, Stmt, StmtKind, VarDecl};
use super::error::{ParseError, ParseErrorKind};
use super::syntax::{AssignOp, BinaryOp, Span, UnaryOp};
use crate::values::VarType;

lazy_static! {
    // Note: precedence is defined lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        // (lowest precedence)
        .op(Op::infix(Rule::range, Assoc::Left))         // `..`

        // Logical operators.
        .op(Op::infix(Rule::or, Assoc::Left))            // `||`
        .op(Op::infix(Rule::and, Assoc::Left))           // `&&`

        // Bitwise operators.
        .op(Op::infix(Rule::bit_or, Assoc::Left))        // `|`
        .op(Op::infix(Rule::bit_xor, Assoc::Left))       // `^`
        .op(Op::infix(Rule::bit_and, Assoc::Left))       // `&`

        // Comparison operators.
        .op(
            Op::infix(Rule::eq, Assoc::Left) |
            Op::infix(Rule::ne, Assoc::Left)
        )                                                // `==`, `!=`
        .op(
            Op::infix(Rule::lt, Assoc::Left) |
            Op::infix(Rule::le, Assoc::Left) |
            Op::infix(Rule::gt, Assoc::Left) |
            Op::infix(Rule::ge, Assoc::Left)
        )                                                // `<`, `<=`, `>`, `>=`

        // Arithmetic operators.
        .op(
            Op::infix(Rule::add, Assoc::Left) |
            Op::infix(Rule::sub, Assoc::Left)
        )                                                // `+`, `-`
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left) |
            Op::infix(Rule::rem, Assoc::Left)
        )                                                // `*`, `/`, `%`
        .op(Op::prefix(Rule::neg) | Op::prefix(Rule::not)) // `-`, `!`
        // (highest precedence)
        ;
}

#[derive(Parser)]
#[grammar = "parser/mathvm.pest"]
pub struct MathVmParser;

/// Parse a whole program. The result is the outermost block of the entry function.
pub fn parse(source: &str) -> Result<Block, ParseError> {
    let mut pairs = MathVmParser::parse(Rule::main, source)?;
    let main = pairs
        .next()
        .ok_or_else(|| missing("program", Span::new(0, source.len())))?;
    let span = Span::from(main.as_span());
    parse_items(main.into_inner(), span)
}

fn missing(what: &str, span: Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::Other {
            message: format!("missing {}", what),
        },
        span,
    )
}

fn expect<'i>(
    inner: &mut impl Iterator<Item = Pair<'i, Rule>>,
    what: &str,
    span: &Span,
) -> Result<Pair<'i, Rule>, ParseError> {
    inner.next().ok_or_else(|| missing(what, span.clone()))
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_function
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_while
            | Rule::kw_for
            | Rule::kw_in
            | Rule::kw_return
            | Rule::kw_print
    )
}

/// Inner pairs of `pair`, without keyword tokens.
fn children<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

// === Declarations ===

fn parse_items(pairs: Pairs<'_, Rule>, span: Span) -> Result<Block, ParseError> {
    let mut block = Block {
        variables: Vec::new(),
        functions: Vec::new(),
        statements: Vec::new(),
        span,
    };
    for pair in pairs {
        match pair.as_rule() {
            Rule::EOI => {}
            Rule::function_decl => {
                let position = block.statements.len();
                block.functions.push(parse_function(pair, position)?);
            }
            Rule::var_decl => parse_var_decl(pair, &mut block)?,
            _ => block.statements.push(parse_statement(pair)?),
        }
    }
    Ok(block)
}

fn parse_block(pair: Pair<'_, Rule>) -> Result<Block, ParseError> {
    let span = Span::from(pair.as_span());
    parse_items(pair.into_inner(), span)
}

fn parse_type(pair: Pair<'_, Rule>) -> Result<VarType, ParseError> {
    VarType::from_name(pair.as_str()).ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::InvalidType {
                name: pair.as_str().to_string(),
            },
            pair.as_span().into(),
        )
    })
}

/// `int x = e;` declares `x` in the block and stores `e` at the point of declaration.
fn parse_var_decl(pair: Pair<'_, Rule>, block: &mut Block) -> Result<(), ParseError> {
    let span = Span::from(pair.as_span());
    let position = block.statements.len();
    let mut inner = pair.into_inner();
    let ty = parse_type(expect(&mut inner, "variable type", &span)?)?;
    let name = expect(&mut inner, "variable name", &span)?.as_str().to_string();
    if let Some(init) = inner.next() {
        let value = parse_expr(init)?;
        block.statements.push(Stmt {
            kind: StmtKind::Store {
                name: name.clone(),
                op: AssignOp::Assign,
                value,
            },
            span: span.clone(),
        });
    }
    block.variables.push(VarDecl {
        name,
        ty,
        position,
        span,
    });
    Ok(())
}

fn parse_function(pair: Pair<'_, Rule>, position: usize) -> Result<FunctionDecl, ParseError> {
    let span = Span::from(pair.as_span());
    let mut inner = children(pair).peekable();
    let return_type = parse_type(expect(&mut inner, "return type", &span)?)?;
    let name = expect(&mut inner, "function name", &span)?.as_str().to_string();

    let mut params = Vec::new();
    if let Some(list) = inner.next_if(|p| p.as_rule() == Rule::params) {
        for param in list.into_inner() {
            let param_span = Span::from(param.as_span());
            let mut parts = param.into_inner();
            let ty = parse_type(expect(&mut parts, "parameter type", &param_span)?)?;
            let name = expect(&mut parts, "parameter name", &param_span)?.as_str().to_string();
            params.push(Param {
                name,
                ty,
                span: param_span,
            });
        }
    }

    let body = parse_block(expect(&mut inner, "function body", &span)?)?;
    Ok(FunctionDecl {
        name,
        return_type,
        params,
        body,
        position,
        span,
    })
}

// === Statements ===

fn parse_statement(pair: Pair<'_, Rule>) -> Result<Stmt, ParseError> {
    let span = Span::from(pair.as_span());
    let kind = match pair.as_rule() {
        Rule::block => StmtKind::Block(parse_block(pair)?),

        Rule::if_stmt => {
            let mut inner = children(pair);
            let cond = parse_expr(expect(&mut inner, "condition", &span)?)?;
            let then_branch = parse_statement(expect(&mut inner, "then branch", &span)?)?;
            let else_branch = match inner.next() {
                Some(stmt) => Some(Box::new(parse_statement(stmt)?)),
                None => None,
            };
            StmtKind::If {
                cond,
                then_branch: Box::new(then_branch),
                else_branch,
            }
        }

        Rule::while_stmt => {
            let mut inner = children(pair);
            let cond = parse_expr(expect(&mut inner, "condition", &span)?)?;
            let body = parse_statement(expect(&mut inner, "loop body", &span)?)?;
            StmtKind::While {
                cond,
                body: Box::new(body),
            }
        }

        Rule::for_stmt => {
            let mut inner = children(pair);
            let var = expect(&mut inner, "loop variable", &span)?;
            let var_span = Span::from(var.as_span());
            let range = parse_expr(expect(&mut inner, "range", &span)?)?;
            let body = parse_statement(expect(&mut inner, "loop body", &span)?)?;
            StmtKind::For {
                var: var.as_str().to_string(),
                var_span,
                range,
                body: Box::new(body),
            }
        }

        Rule::return_stmt => {
            let value = match children(pair).next() {
                Some(expr) => Some(parse_expr(expr)?),
                None => None,
            };
            StmtKind::Return(value)
        }

        Rule::print_stmt => {
            let args = children(pair).map(parse_expr).collect::<Result<_, _>>()?;
            StmtKind::Print(args)
        }

        Rule::assignment => {
            let mut inner = pair.into_inner();
            let name = expect(&mut inner, "assignment target", &span)?.as_str().to_string();
            let op = match expect(&mut inner, "assignment operator", &span)?.as_str() {
                "+=" => AssignOp::AddAssign,
                "-=" => AssignOp::SubAssign,
                _ => AssignOp::Assign,
            };
            let value = parse_expr(expect(&mut inner, "assigned value", &span)?)?;
            StmtKind::Store { name, op, value }
        }

        Rule::expr_stmt => {
            let mut inner = pair.into_inner();
            StmtKind::Expr(parse_expr(expect(&mut inner, "expression", &span)?)?)
        }

        rule => {
            return Err(ParseError::new(
                ParseErrorKind::Other {
                    message: format!("Unhandled rule: {:?}", rule),
                },
                span,
            ));
        }
    };
    Ok(Stmt { kind, span })
}

// === Expressions ===

pub fn parse_expr(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    PRATT_PARSER
        .map_primary(parse_primary)
        .map_prefix(|op, rhs| {
            let operand = match rhs {
                Err(err) if op.as_rule() == Rule::neg => return negated_literal(&op, err),
                rhs => rhs?,
            };
            let span = Span::new(op.as_span().start(), operand.span.0.end);
            let op = match op.as_rule() {
                Rule::neg => UnaryOp::Neg,
                Rule::not => UnaryOp::Not,
                rule => {
                    return Err(ParseError::new(
                        ParseErrorKind::Other {
                            message: format!("Unknown prefix operator: {:?}", rule),
                        },
                        span,
                    ));
                }
            };
            Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ))
        })
        .map_infix(|lhs, op, rhs| {
            let (left, right) = (lhs?, rhs?);
            let span = Span::combine(&left.span, &right.span);
            let op = match op.as_rule() {
                Rule::range => BinaryOp::Range,
                Rule::or => BinaryOp::Or,
                Rule::and => BinaryOp::And,
                Rule::bit_or => BinaryOp::BitOr,
                Rule::bit_xor => BinaryOp::BitXor,
                Rule::bit_and => BinaryOp::BitAnd,
                Rule::eq => BinaryOp::Eq,
                Rule::ne => BinaryOp::Ne,
                Rule::lt => BinaryOp::Lt,
                Rule::le => BinaryOp::Le,
                Rule::gt => BinaryOp::Gt,
                Rule::ge => BinaryOp::Ge,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                Rule::rem => BinaryOp::Mod,
                rule => {
                    return Err(ParseError::new(
                        ParseErrorKind::Other {
                            message: format!("Unknown binary operator: {:?}", rule),
                        },
                        span,
                    ));
                }
            };
            Ok(Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            ))
        })
        .parse(pair.into_inner())
}

/// `-9223372036854775808` only fits in an `i64` with its sign, so a minus
/// directly in front of an out-of-range literal is folded into it.
fn negated_literal(op: &Pair<'_, Rule>, err: ParseError) -> Result<Expr, ParseError> {
    let ParseErrorKind::InvalidNumber { text } = &err.kind else {
        return Err(err);
    };
    let sign = op.as_span();
    let gap = sign.get_input().get(sign.end()..err.span.0.start);
    if !gap.is_some_and(|gap| gap.trim().is_empty()) {
        return Err(err);
    }
    match format!("-{}", text).parse::<i64>() {
        Ok(value) => Ok(Expr::new(ExprKind::Int(value), Span::new(sign.start(), err.span.0.end))),
        Err(_) => Err(err),
    }
}

fn parse_primary(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    let span = Span::from(pair.as_span());
    let kind = match pair.as_rule() {
        Rule::expression => return parse_expr(pair),

        Rule::int => {
            let value = pair.as_str().parse().map_err(|_| {
                ParseError::new(
                    ParseErrorKind::InvalidNumber {
                        text: pair.as_str().to_string(),
                    },
                    span.clone(),
                )
            })?;
            ExprKind::Int(value)
        }

        Rule::double => {
            let value = pair.as_str().parse().map_err(|_| {
                ParseError::new(
                    ParseErrorKind::InvalidNumber {
                        text: pair.as_str().to_string(),
                    },
                    span.clone(),
                )
            })?;
            ExprKind::Double(value)
        }

        Rule::string => {
            let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            ExprKind::Str(unescape(raw, &span)?)
        }

        Rule::ident => ExprKind::Load(pair.as_str().to_string()),

        Rule::call => {
            let mut inner = pair.into_inner();
            let name = expect(&mut inner, "function name", &span)?.as_str().to_string();
            let args = inner.map(parse_expr).collect::<Result<_, _>>()?;
            ExprKind::Call { name, args }
        }

        rule => {
            return Err(ParseError::new(
                ParseErrorKind::Other {
                    message: format!("Unhandled rule: {:?}", rule),
                },
                span,
            ));
        }
    };
    Ok(Expr::new(kind, span))
}

fn unescape(raw: &str, span: &Span) -> Result<String, ParseError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('"') => '"',
            other => {
                let mut sequence = String::from("\\");
                sequence.extend(other);
                return Err(ParseError::new(
                    ParseErrorKind::InvalidEscape { sequence },
                    span.clone(),
                ));
            }
        };
        out.push(escaped);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> ExprKind {
        let block = parse(&format!("{};", source)).unwrap();
        match block.statements.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Expr(e)) => e.kind,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(expr("42"), ExprKind::Int(42));
        assert_eq!(expr("1.5"), ExprKind::Double(1.5));
        assert_eq!(expr("2e3"), ExprKind::Double(2000.0));
        assert_eq!(expr("'it\\'s'"), ExprKind::Str("it's".to_string()));
        assert_eq!(expr("\"a\\tb\\n\""), ExprKind::Str("a\tb\n".to_string()));
        assert_eq!(expr("''"), ExprKind::Str(String::new()));
    }

    #[test]
    fn test_invalid_escape() {
        let err = parse("print('\\q');").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::InvalidEscape {
                sequence: "\\q".to_string()
            }
        );
    }

    #[test]
    fn test_integer_overflow_is_reported() {
        let err = parse("99999999999999999999;").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
        assert_eq!(err.span, Span(0..20));
    }

    #[test]
    fn test_most_negative_integer_literal() {
        assert_eq!(expr("-9223372036854775808"), ExprKind::Int(i64::MIN));
        assert_eq!(expr("- 9223372036854775808"), ExprKind::Int(i64::MIN));

        let err = parse("-9223372036854775809;").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
        let err = parse("-(9223372036854775808);").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
        let err = parse("1 - 9223372036854775808;").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
    }

    #[test]
    fn test_binary_span_covers_operands() {
        let block = parse("a + b * c;").unwrap();
        let Some(StmtKind::Expr(e)) = block.statements.first().map(|s| &s.kind) else {
            panic!("expected expression statement");
        };
        assert_eq!(e.span, Span(0..9));
    }
}
