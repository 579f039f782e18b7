use dynexpr_diagnostic::{Diagnostic, DiagnosticCode, Label, Span};

#[test]
fn test_diagnostic_formatting() {
  let source = "let b = \"asdfasdf";

  let error = Diagnostic::new(DiagnosticCode::UnterminatedString, "unterminated string literal")
    .with_label(Label::primary(
      Span::new(8, 1, 9, 10),
      Some("string is never closed".to_string()),
    ))
    .with_help("close the string with a matching `\"` before the end of the expression");

  let rendered = error.render_plain(source);
  assert!(rendered.contains("E0001"));
  assert!(rendered.contains("unterminated string literal"));
  assert!(rendered.contains("string is never closed"));
  assert!(rendered.contains("close the string"));
}

#[test]
fn primary_offset_reports_the_first_primary_label() {
  let error = Diagnostic::new(DiagnosticCode::UnknownIdentifier, "unknown identifier `foo`")
    .with_label(Label::secondary(Span::new(0, 1, 1, 3), None))
    .with_label(Label::primary(Span::new(12, 1, 13, 3), None));

  assert_eq!(error.primary_offset(), Some(12));
}

#[test]
fn diagnostic_without_primary_label_has_no_offset() {
  let error = Diagnostic::new(DiagnosticCode::DivisionByZero, "division by zero");
  assert_eq!(error.primary_offset(), None);
}
