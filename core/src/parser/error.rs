use crate::api::{Diagnostic, Severity};
use crate::parser::{Rule, Span};

/// Parser error with its location in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// Specific kinds of parse errors
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken { expected: String, found: String },
    /// Integer literal that does not fit in 64 bits, or malformed double
    InvalidNumber { text: String },
    /// Unknown escape sequence inside a string literal
    InvalidEscape { sequence: String },
    /// `void` used where a value type is required
    InvalidType { name: String },
    /// Other parse errors (catch-all for Pest errors we don't specifically handle)
    Other { message: String },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Convert to a Diagnostic for API boundary
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (message, code, help) = match &self.kind {
            ParseErrorKind::UnexpectedToken { expected, found } => {
                (format!("Expected {}, found {}", expected, found), "P001", None)
            }
            ParseErrorKind::InvalidNumber { text } => (
                format!("Invalid number literal '{}'", text),
                "P002",
                Some("Integer literals must fit in a signed 64-bit integer".to_string()),
            ),
            ParseErrorKind::InvalidEscape { sequence } => (
                format!("Unknown escape sequence '{}'", sequence),
                "P003",
                Some("Supported escapes are \\n, \\t, \\r, \\\\, \\' and \\\"".to_string()),
            ),
            ParseErrorKind::InvalidType { name } => (
                format!("'{}' is not allowed here", name),
                "P004",
                Some("Use int, double or string".to_string()),
            ),
            ParseErrorKind::Other { message } => (message.clone(), "P999", None),
        };

        Diagnostic {
            severity: Severity::Error,
            message,
            span: self.span.clone(),
            related: Vec::new(),
            help,
            code: Some(code.to_string()),
        }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let diagnostic = self.to_diagnostic();
        write!(f, "{}: {}", diagnostic.severity, diagnostic.message)?;

        if let Some(ref code) = diagnostic.code {
            write!(f, " [{}]", code)?;
        }

        if let Some(ref help) = diagnostic.help {
            write!(f, "\nhelp: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        convert_pest_error(err)
    }
}

/// Convert Pest error to human-readable ParseError
pub fn convert_pest_error(err: pest::error::Error<Rule>) -> ParseError {
    use pest::error::ErrorVariant;

    let span = match err.location {
        pest::error::InputLocation::Pos(pos) => Span(pos..pos),
        pest::error::InputLocation::Span((start, end)) => Span(start..end),
    };

    let kind = match err.variant {
        ErrorVariant::ParsingError {
            positives,
            negatives,
        } => ParseErrorKind::UnexpectedToken {
            expected: format_expected_rules(&positives),
            found: format_found_rules(&negatives),
        },
        ErrorVariant::CustomError { message } => ParseErrorKind::Other { message },
    };

    ParseError::new(kind, span)
}

fn concept(rule: Rule) -> &'static str {
    match rule {
        Rule::int | Rule::double | Rule::string => "literal",
        Rule::ident | Rule::call => "identifier",
        Rule::type_name => "type",
        Rule::assign_op => "assignment",
        Rule::range
        | Rule::or
        | Rule::and
        | Rule::eq
        | Rule::ne
        | Rule::le
        | Rule::ge
        | Rule::lt
        | Rule::gt
        | Rule::bit_or
        | Rule::bit_xor
        | Rule::bit_and
        | Rule::add
        | Rule::sub
        | Rule::mul
        | Rule::div
        | Rule::rem => "operator",
        Rule::kw_else => "'else'",
        Rule::kw_in => "'in'",
        Rule::block => "block",
        Rule::EOI => "end of input",
        Rule::function_decl | Rule::var_decl => "declaration",
        Rule::if_stmt
        | Rule::while_stmt
        | Rule::for_stmt
        | Rule::return_stmt
        | Rule::print_stmt
        | Rule::assignment
        | Rule::expr_stmt => "statement",
        _ => "expression",
    }
}

/// Format expected rules in a human-readable way
fn format_expected_rules(rules: &[Rule]) -> String {
    let mut concepts: Vec<&str> = Vec::new();
    for rule in rules {
        let name = concept(*rule);
        if !concepts.contains(&name) {
            concepts.push(name);
        }
    }

    match concepts.split_last() {
        None => "something else".to_string(),
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}

/// Format found rules in a human-readable way
fn format_found_rules(rules: &[Rule]) -> String {
    match rules.first() {
        None => "unexpected token".to_string(),
        Some(rule) => concept(*rule).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_to_diagnostic() {
        let error = ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: "expression".to_string(),
                found: "operator".to_string(),
            },
            Span(10..20),
        );

        let diagnostic = error.to_diagnostic();
        assert_eq!(diagnostic.severity, Severity::Error);
        assert!(diagnostic.message.contains("Expected expression"));
        assert!(diagnostic.message.contains("found operator"));
        assert_eq!(diagnostic.code, Some("P001".to_string()));
        assert_eq!(diagnostic.span, Span(10..20));
    }

    #[test]
    fn test_format_expected_rules() {
        assert_eq!(format_expected_rules(&[Rule::int, Rule::double]), "literal");
        assert_eq!(
            format_expected_rules(&[Rule::add, Rule::ident, Rule::EOI]),
            "operator, identifier or end of input"
        );
        assert_eq!(format_expected_rules(&[]), "something else");
    }
}
