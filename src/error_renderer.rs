//! Error rendering using ariadne
//!
//! Compilation errors are shown with the offending source snippet and the
//! diagnostic's label, code and help. Runtime errors have no source span and
//! render as a single line.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

/// Render an error with formatting to stderr
///
/// # Example
/// ```no_run
/// use mathvm::{Engine, EngineOptions, render_error};
///
/// let engine = Engine::new(EngineOptions::default());
/// if let Err(e) = engine.compile("int x; x = ;") {
///     render_error(&e);
/// }
/// ```
pub fn render_error(error: &Error) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, writer, true)
}

/// Render an error to a String (useful for tests, logs, etc.)
pub fn render_error_to_string(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Name the source is reported under.
const SOURCE_ID: &str = "<input>";

fn render_error_to_writer(
    error: &Error,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Compilation { diagnostic, source } => {
            render_diagnostic(source, diagnostic, writer, use_color)
        }
        Error::Runtime {
            message,
            function,
            address,
        } => writeln!(
            writer,
            "Runtime error in {} at address {}: {}",
            function, address, message
        ),
        Error::ResourceExceeded(msg) => writeln!(writer, "Resource limit exceeded: {}", msg),
        Error::Api(msg) => writeln!(writer, "API error: {}", msg),
    }
}

fn render_diagnostic(
    source: &str,
    diagnostic: &Diagnostic,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let mut colors = ColorGenerator::new();
    colors.next();

    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
    };
    let span = (SOURCE_ID, diagnostic.span.0.clone());

    let mut report = Report::build(kind, span.clone())
        .with_message(&diagnostic.message)
        .with_config(ariadne::Config::default().with_color(use_color))
        .with_label(
            Label::new(span)
                .with_message(&diagnostic.message)
                .with_color(colors.next()),
        );
    if let Some(code) = &diagnostic.code {
        report = report.with_code(code);
    }
    for related in &diagnostic.related {
        report = report.with_label(
            Label::new((SOURCE_ID, related.span.0.clone()))
                .with_message(&related.message)
                .with_color(colors.next()),
        );
    }
    if let Some(help) = &diagnostic.help {
        report = report.with_help(help);
    }

    report
        .finish()
        .write((SOURCE_ID, Source::from(source)), writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Engine, EngineOptions};

    #[test]
    fn test_render_parse_error() {
        let engine = Engine::new(EngineOptions::default());

        let source = "int x; x = + ;"; // Invalid syntax
        let result = engine.compile(source);

        assert!(result.is_err());
        if let Err(e) = result {
            let output = render_error_to_string_no_color(&e);

            assert!(output.contains("Error") || output.contains("error"));
            // Should show the source
            assert!(output.contains("int x; x = + ;"));
        }
    }

    #[test]
    fn test_render_translation_error() {
        let engine = Engine::new(EngineOptions::default());

        let source = "int x; x = 'a' + 1;";
        let e = engine.compile(source).unwrap_err();
        let output = render_error_to_string_no_color(&e);

        assert!(output.contains("C005"));
        assert!(output.contains("cannot be applied to string"));
        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_render_duplicate_points_at_first_declaration() {
        let engine = Engine::new(EngineOptions::default());

        let e = engine.compile("int x;\ndouble x;").unwrap_err();
        let output = render_error_to_string_no_color(&e);

        assert!(output.contains("C013"));
        assert!(output.contains("already declared"));
        assert!(output.contains("first declared here"));
        assert!(output.contains("int x;"));
    }

    #[test]
    fn test_render_runtime_error() {
        let engine = Engine::new(EngineOptions::default());

        let e = engine.run("int z; print(1 / z);", std::io::sink()).unwrap_err();
        let output = render_error_to_string_no_color(&e);

        assert!(output.starts_with("Runtime error in <top> at address"));
        assert!(output.contains("Division by zero"));
    }
}
