use dynexpr_diagnostic::Diagnostic;

/// A syntactic or binding failure at a known byte position: an unknown
/// identifier, an ambiguous overload, a type mismatch, reserved-word
/// misuse, an assignment to a non-l-value, or assignment disabled by
/// policy. Parse-time failures are never recovered inside the core —
/// the first one aborts the parse and surfaces here.
#[derive(Debug, thiserror::Error)]
#[error("{}", diagnostic.message)]
pub struct ParseError {
  pub diagnostic: Diagnostic,
}

impl ParseError {
  pub fn new(diagnostic: Diagnostic) -> Self {
    Self { diagnostic }
  }

  /// Byte offset the failure was raised at, if the diagnostic carries a
  /// primary label (it always does for parser-raised errors).
  pub fn offset(&self) -> Option<usize> {
    self.diagnostic.primary_offset()
  }
}

impl From<Diagnostic> for ParseError {
  fn from(diagnostic: Diagnostic) -> Self {
    Self::new(diagnostic)
  }
}
